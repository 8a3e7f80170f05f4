use std::{
    fmt::Debug,
    sync::{Arc, OnceLock},
};

use crate::{errors::ResolveError, types::Instance};

type Settle = Box<dyn Fn() -> Result<Instance, ResolveError> + Send + Sync>;

/// Stand-in for an instance that is still under construction
///
/// Handed out to break a dependency cycle. Resolving it before the cycle completed
/// is an error, afterwards it returns the very instance memoized in the container.
#[derive(Clone)]
pub struct Pending(Arc<PendingInner>);
struct PendingInner {
    key: String,
    once: OnceLock<Instance>,
    settle: Settle,
}
impl Debug for Pending {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pending")
            .field("key", &self.0.key)
            .field("initialized", &self.is_initialized())
            .finish()
    }
}

impl Pending {
    pub(crate) fn new(
        key: &str,
        settle: impl Fn() -> Result<Instance, ResolveError> + Send + Sync + 'static,
    ) -> Self {
        Pending(Arc::new(PendingInner {
            key: key.to_owned(),
            once: OnceLock::new(),
            settle: Box::new(settle),
        }))
    }

    /// Key of the slot this proxy stands in for
    pub fn key(&self) -> &str {
        &self.0.key
    }

    pub fn is_initialized(&self) -> bool {
        self.0.once.get().is_some()
    }

    /// The real instance
    ///
    /// Failures are not kept: the cycle that caused them may have completed by the next call.
    pub fn get(&self) -> Result<Instance, ResolveError> {
        if let Some(instance) = self.0.once.get() {
            return Ok(instance.clone());
        }

        // The container memoizes the slot, racing threads all get the same instance
        let instance = (self.0.settle)()?;
        Ok(self.0.once.get_or_init(|| instance).clone())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    #[test]
    fn keeps_first_success_only() {
        let attempts = Arc::new(AtomicUsize::new(0));
        let counter = attempts.clone();
        let pending = Pending::new("service", move || {
            match counter.fetch_add(1, Ordering::SeqCst) {
                0 => Err(ResolveError::Aborted {
                    key: "service".into(),
                }),
                _ => Ok(Instance::new(5_u8)),
            }
        });

        assert!(pending.get().is_err());
        assert!(!pending.is_initialized());

        let first = pending.get().unwrap();
        let second = pending.clone().get().unwrap();
        assert!(first.ptr_eq(&second));
        assert_eq!(attempts.load(Ordering::SeqCst), 2);
    }
}
