use std::fmt::Display;

/// Longest chain of keys a single resolution may walk
pub const MAX_RESOLUTION_DEPTH: usize = 32;

/// Keys currently under construction, outermost first
///
/// Passed down by value through recursive resolution, never stored on a container.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolutionPath(Vec<String>);

impl ResolutionPath {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.0.iter().any(|in_flight| in_flight == key)
    }

    /// Copy of this path with `key` appended
    pub fn with(&self, key: &str) -> Self {
        let mut keys = self.0.clone();
        keys.push(key.to_owned());
        Self(keys)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn keys(&self) -> &[String] {
        &self.0
    }
}

impl Display for ResolutionPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0.join(" -> "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn with_leaves_original_untouched() {
        let root = ResolutionPath::new().with("a");
        let nested = root.with("b");

        assert_eq!(root.keys(), ["a"]);
        assert_eq!(nested.keys(), ["a", "b"]);
        assert!(nested.contains("a"));
        assert!(!root.contains("b"));
        assert_eq!(nested.to_string(), "a -> b");
    }
}
