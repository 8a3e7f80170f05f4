use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::errors::ConfigError;

/// Nested key/value configuration, addressed with dotted paths like `database.pool.size`
pub trait Config: Send + Sync {
    fn find_value(&self, key: &str) -> Option<Value>;

    /// The section as a map, empty if it does not exist
    fn find_section(&self, section: &str) -> Map<String, Value> {
        match self.find_value(section) {
            Some(Value::Object(section)) => section,
            _ => Map::new(),
        }
    }

    fn require_value(&self, key: &str) -> Result<Value, ConfigError> {
        self.find_value(key)
            .ok_or_else(|| ConfigError::MissingValue(key.to_owned()))
    }

    fn require_section(&self, section: &str) -> Result<Map<String, Value>, ConfigError> {
        match self.find_value(section) {
            Some(Value::Object(map)) => Ok(map),
            Some(_) => Err(ConfigError::NotASection(section.to_owned())),
            None => Err(ConfigError::MissingSection(section.to_owned())),
        }
    }
}

impl dyn Config {
    /// Finds a value and deserializes it
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, ConfigError> {
        self.find_value(key)
            .map(|value| deserialize(key, value))
            .transpose()
    }
}

pub(crate) fn deserialize<T: DeserializeOwned>(key: &str, value: Value) -> Result<T, ConfigError> {
    serde_json::from_value(value).map_err(|error| ConfigError::InvalidValue {
        key: key.to_owned(),
        error: Arc::new(error),
    })
}

/// In memory config tree
///
/// Mutated while the application is assembled, then shared read only through [ConfigTree::into_shared].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigTree {
    root: Map<String, Value>,
}

impl ConfigTree {
    /// Initializes an empty tree
    pub fn new() -> Self {
        Self::default()
    }

    /// Tree from a JSON object, anything else yields an empty tree
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::Object(root) => ConfigTree { root },
            _ => ConfigTree::new(),
        }
    }

    /// Sets a value, creating missing sections along the way
    ///
    /// Plain values in the way are replaced by sections.
    pub fn set(&mut self, node: &str, value: impl Into<Value>) -> &mut Self {
        let mut segments: Vec<&str> = node.split('.').collect();
        let Some(leaf) = segments.pop() else {
            return self;
        };

        let mut current = &mut self.root;
        for segment in segments {
            let entry = current
                .entry(segment.to_owned())
                .or_insert_with(|| Value::Object(Map::new()));
            if !entry.is_object() {
                *entry = Value::Object(Map::new());
            }
            let Value::Object(next) = entry else {
                unreachable!("entry was just made a section");
            };
            current = next;
        }

        current.insert(leaf.to_owned(), value.into());
        self
    }

    /// Can optionally set a value
    ///
    /// `None` leaves the tree untouched and just returns `self` for chaining
    pub fn maybe_set(&mut self, node: &str, value: Option<impl Into<Value>>) -> &mut Self {
        match value {
            Some(value) => self.set(node, value),
            None => self,
        }
    }

    /// Replaces a whole section
    pub fn set_section(&mut self, node: &str, section: Map<String, Value>) -> &mut Self {
        self.set(node, Value::Object(section))
    }

    /// Deep merges `config` into the tree, values of `config` win
    pub fn merge(&mut self, config: Map<String, Value>) -> &mut Self {
        merge_into(&mut self.root, config);
        self
    }

    /// Deep merges `config` into the section at `node`
    pub fn merge_section(&mut self, node: &str, config: Map<String, Value>) -> &mut Self {
        let mut section = self.find_section(node);
        merge_into(&mut section, config);
        self.set_section(node, section)
    }

    /// Removes a node, returning what was there
    pub fn remove(&mut self, node: &str) -> Option<Value> {
        let (parent, leaf) = match node.rsplit_once('.') {
            Some((parent, leaf)) => (Some(parent), leaf),
            None => (None, node),
        };

        let section = match parent {
            Some(parent) => match lookup_mut(&mut self.root, parent)? {
                Value::Object(section) => section,
                _ => return None,
            },
            None => &mut self.root,
        };
        section.remove(leaf)
    }

    /// Clears the whole tree
    pub fn reset(&mut self) -> &mut Self {
        self.root.clear();
        self
    }

    pub fn is_empty(&self) -> bool {
        self.root.is_empty()
    }

    /// Freezes the tree for sharing
    pub fn into_shared(self) -> Arc<dyn Config> {
        Arc::new(self)
    }
}

impl Config for ConfigTree {
    fn find_value(&self, key: &str) -> Option<Value> {
        let mut segments = key.split('.');
        let first = segments.next()?;
        let mut current = self.root.get(first)?;
        for segment in segments {
            current = current.as_object()?.get(segment)?;
        }
        Some(current.clone())
    }
}

fn lookup_mut<'a>(root: &'a mut Map<String, Value>, node: &str) -> Option<&'a mut Value> {
    let mut segments = node.split('.');
    let mut current = root.get_mut(segments.next()?)?;
    for segment in segments {
        current = current.as_object_mut()?.get_mut(segment)?;
    }
    Some(current)
}

fn merge_into(target: &mut Map<String, Value>, source: Map<String, Value>) {
    for (key, value) in source {
        match (target.get_mut(&key), value) {
            (Some(Value::Object(existing)), Value::Object(incoming)) => {
                merge_into(existing, incoming)
            }
            (_, value) => {
                target.insert(key, value);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn object(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            other => panic!("Expected an object, got {other}"),
        }
    }

    #[test]
    fn set_creates_sections() {
        let mut tree = ConfigTree::new();
        tree.set("database.pool.size", 8).set("database.host", "localhost");

        assert_eq!(tree.find_value("database.pool.size"), Some(json!(8)));
        assert_eq!(
            tree.find_section("database"),
            object(json!({ "pool": { "size": 8 }, "host": "localhost" }))
        );
        assert_eq!(tree.find_value("database.port"), None);
    }

    #[test]
    fn set_replaces_plain_values_in_the_way() {
        let mut tree = ConfigTree::new();
        tree.set("logging", "off").set("logging.level", "debug");

        assert_eq!(tree.find_value("logging.level"), Some(json!("debug")));
    }

    #[test]
    fn merge_is_deep() {
        let mut tree = ConfigTree::from_value(json!({
            "server": { "host": "localhost", "port": 80 },
            "name": "app"
        }));

        tree.merge(object(json!({ "server": { "port": 8080 } })));
        tree.merge_section("server", object(json!({ "tls": { "enabled": true } })));

        assert_eq!(
            tree.require_section("server").unwrap(),
            object(json!({ "host": "localhost", "port": 8080, "tls": { "enabled": true } }))
        );
        assert_eq!(tree.find_value("name"), Some(json!("app")));
    }

    #[test]
    fn remove_and_reset() {
        let mut tree = ConfigTree::new();
        tree.set("a.b", 1).set("a.c", 2).set("d", 3);

        assert_eq!(tree.remove("a.b"), Some(json!(1)));
        assert_eq!(tree.remove("a.b"), None);
        assert_eq!(tree.remove("missing.node"), None);
        assert_eq!(tree.find_section("a"), object(json!({ "c": 2 })));

        tree.reset();
        assert!(tree.is_empty());
    }

    #[test]
    fn require_distinguishes_missing_from_plain() {
        let mut tree = ConfigTree::new();
        tree.set("name", "app");

        assert!(matches!(
            tree.require_section("name"),
            Err(ConfigError::NotASection(node)) if node == "name"
        ));
        assert!(matches!(
            tree.require_section("other"),
            Err(ConfigError::MissingSection(_))
        ));
        assert!(matches!(
            tree.require_value("other"),
            Err(ConfigError::MissingValue(_))
        ));
    }

    #[test]
    fn shared_config_deserializes() {
        let mut tree = ConfigTree::new();
        tree.set("ports", json!([80, 443])).maybe_set("unset", None::<bool>);
        let config = tree.into_shared();

        assert_eq!(config.get::<Vec<u16>>("ports").unwrap(), Some(vec![80, 443]));
        assert_eq!(config.get::<bool>("unset").unwrap(), None);
        assert!(matches!(
            config.get::<String>("ports"),
            Err(ConfigError::InvalidValue { key, .. }) if key == "ports"
        ));
    }
}
