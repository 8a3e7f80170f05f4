use std::{
    fmt::Debug,
    ops::Deref,
    sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError},
};

use crate::{
    dependency::{downcast, Dependency},
    errors::{DependencyNotFound, ResolveError},
    types::{Injectable, Instance},
};

type LoadFn = Box<dyn FnOnce() -> Result<Option<Instance>, ResolveError> + Send>;
type AfterFn = Box<dyn FnOnce(Option<&Instance>) + Send>;

enum LoaderState {
    Armed {
        initializer: LoadFn,
        after: Option<AfterFn>,
    },
    Fired,
}

/// One shot handle producing a dependency on first use
///
/// The first invocation clears the handle, runs the initializer and the after handler,
/// then forwards to the produced object. Invoking it again is a usage error and panics,
/// keep the produced instance instead.
#[derive(Clone)]
pub struct LazyLoader(Arc<Mutex<LoaderState>>);
impl Debug for LazyLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LazyLoader")
            .field("loaded", &self.is_loaded())
            .finish()
    }
}

impl LazyLoader {
    pub fn new(
        initializer: impl FnOnce() -> Result<Option<Instance>, ResolveError> + Send + 'static,
    ) -> Self {
        LazyLoader(Arc::new(Mutex::new(LoaderState::Armed {
            initializer: Box::new(initializer),
            after: None,
        })))
    }

    /// Runs once the initializer produced its value, before it is forwarded
    ///
    /// # Panics
    /// - If the loader was already invoked
    pub fn set_after_handler(&self, handler: impl FnOnce(Option<&Instance>) + Send + 'static) {
        match &mut *self.lock() {
            LoaderState::Armed { after, .. } => *after = Some(Box::new(handler)),
            LoaderState::Fired => panic!("LazyLoader already invoked, the after handler would never run"),
        }
    }

    pub fn is_loaded(&self) -> bool {
        matches!(*self.lock(), LoaderState::Fired)
    }

    /// Invokes the loader, returning the produced object
    ///
    /// # Panics
    /// - If the loader was already invoked
    pub fn load(&self) -> Result<Option<Instance>, ResolveError> {
        let state = std::mem::replace(&mut *self.lock(), LoaderState::Fired);
        let LoaderState::Armed { initializer, after } = state else {
            panic!("LazyLoader invoked twice, keep the loaded instance instead");
        };

        let instance = initializer()?;
        if let Some(after) = after {
            after(instance.as_ref());
        }
        Ok(instance)
    }

    /// Invokes the loader and calls `method` on the produced object
    ///
    /// Returns `Ok(None)` if nothing was produced.
    ///
    /// # Panics
    /// - If the loader was already invoked
    pub fn call<T: Injectable, R>(
        &self,
        method: impl FnOnce(&T) -> R,
    ) -> Result<Option<R>, ResolveError> {
        match self.load()? {
            Some(instance) => {
                let target = downcast::<T>(&instance)?;
                Ok(Some(method(&target)))
            }
            None => Ok(None),
        }
    }

    fn lock(&self) -> MutexGuard<'_, LoaderState> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Typed dependency that may not be available yet
///
/// Taken from a pending proxy or a lazy loader. Should only be accessed
/// once the construction that handed it out has completed.
///
/// ### Panics
///
/// [Deferred::get] and deref panic when accessed
/// - while the dependency is still under construction
/// - after resolving the dependency failed
///
/// Use [Deferred::try_get] to get the error instead.
pub struct Deferred<T: Injectable>(Arc<DeferredInner<T>>);
struct DeferredInner<T: Injectable> {
    key: String,
    container: String,
    once: OnceLock<Result<Arc<T>, ResolveError>>,
    source: Mutex<Option<Dependency>>,
}
impl<T: Injectable> Clone for Deferred<T> {
    fn clone(&self) -> Self {
        Deferred(self.0.clone())
    }
}
impl<T: Injectable + Debug> Debug for Deferred<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.0.once.get() {
            Some(Ok(instance)) => f.debug_tuple("Deferred").field(instance).finish(),
            Some(Err(error)) => f.debug_tuple("Deferred").field(error).finish(),
            None => f.debug_tuple("Deferred").field(&self.0.key).finish(),
        }
    }
}
impl<T: Injectable> Deref for Deferred<T> {
    type Target = Arc<T>;

    fn deref(&self) -> &Self::Target {
        self.get()
    }
}

impl<T: Injectable> Deferred<T> {
    pub(crate) fn new(key: &str, container: &str, dependency: Dependency) -> Self {
        Deferred(Arc::new(DeferredInner {
            key: key.to_owned(),
            container: container.to_owned(),
            once: OnceLock::new(),
            source: Mutex::new(Some(dependency)),
        }))
    }

    pub fn key(&self) -> &str {
        &self.0.key
    }

    pub fn is_initialized(&self) -> bool {
        self.0.once.get().is_some()
    }

    /// Accesses the dependency
    ///
    /// # Panics
    /// - If it can't be resolved (yet)
    pub fn get(&self) -> &Arc<T> {
        match self.try_get() {
            Ok(instance) => instance,
            Err(error) => panic!("Deferred '{}' accessed before it could be resolved: {error}", self.0.key),
        }
    }

    /// Try to access the dependency
    ///
    /// A proxy whose cycle is still under construction may be tried again later,
    /// every other outcome is kept.
    pub fn try_get(&self) -> Result<&Arc<T>, ResolveError> {
        if let Some(result) = self.0.once.get() {
            return result.as_ref().map_err(Clone::clone);
        }

        // Lock source, so it is not taken out while we check
        let mut source = self.0.source.lock().unwrap_or_else(PoisonError::into_inner);

        // Double check once - it might have been set while we waited for the lock
        if let Some(result) = self.0.once.get() {
            return result.as_ref().map_err(Clone::clone);
        }

        let result = match source.take() {
            Some(Dependency::Pending(pending)) => match pending.get() {
                Ok(instance) => downcast::<T>(&instance),
                Err(error) => {
                    *source = Some(Dependency::Pending(pending));
                    return Err(error);
                }
            },
            Some(dependency) => match dependency.into_instance() {
                Ok(Some(instance)) => downcast::<T>(&instance),
                Ok(None) => Err(self.not_found()),
                Err(error) => Err(error),
            },
            None => Err(ResolveError::Aborted {
                key: self.0.key.clone(),
            }),
        };

        self.0
            .once
            .get_or_init(|| result)
            .as_ref()
            .map_err(Clone::clone)
    }

    fn not_found(&self) -> ResolveError {
        DependencyNotFound {
            key: self.0.key.clone(),
            container: self.0.container.clone(),
            required_by: None,
            location: None,
        }
        .into()
    }
}
