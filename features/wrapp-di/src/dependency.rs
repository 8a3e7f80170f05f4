use std::{any::type_name, collections::HashMap, fmt::Debug, sync::Arc};

use crate::{
    errors::{DependencyNotFound, ResolveError},
    resolver::{lazy::Deferred, lazy::LazyLoader, pending::Pending},
    types::{Injectable, Instance},
};

/// A resolved dependency slot, as handed to constructors
#[derive(Clone)]
pub enum Dependency {
    /// Fully constructed
    Ready(Instance),
    /// Stand-in for an instance whose construction is still in flight
    Pending(Pending),
    /// Resolved on first use
    Lazy(LazyLoader),
    /// Optional dependency that could not be resolved
    Absent,
}
impl Debug for Dependency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Dependency::Ready(instance) => f.debug_tuple("Ready").field(instance).finish(),
            Dependency::Pending(pending) => f.debug_tuple("Pending").field(pending).finish(),
            Dependency::Lazy(_) => f.write_str("Lazy"),
            Dependency::Absent => f.write_str("Absent"),
        }
    }
}

impl Dependency {
    pub fn is_ready(&self) -> bool {
        matches!(self, Dependency::Ready(_))
    }

    pub fn as_instance(&self) -> Option<&Instance> {
        match self {
            Dependency::Ready(instance) => Some(instance),
            _ => None,
        }
    }

    /// The real instance, forcing pending and lazy handles
    pub fn into_instance(self) -> Result<Option<Instance>, ResolveError> {
        match self {
            Dependency::Ready(instance) => Ok(Some(instance)),
            Dependency::Pending(pending) => pending.get().map(Some),
            Dependency::Lazy(loader) => loader.load(),
            Dependency::Absent => Ok(None),
        }
    }

    /// Same as [Dependency::into_instance] followed by a downcast
    pub fn into_arc<T: Injectable>(self) -> Result<Option<Arc<T>>, ResolveError> {
        self.into_instance()?
            .map(|instance| downcast::<T>(&instance))
            .transpose()
    }
}

pub(crate) fn downcast<T: Injectable>(instance: &Instance) -> Result<Arc<T>, ResolveError> {
    instance
        .downcast::<T>()
        .map_err(|actual_type| ResolveError::DowncastFailed {
            required_type: type_name::<T>(),
            actual_type,
        })
}

/// Shared conversions for positional and named dependencies
struct Converter<'a> {
    container: &'a str,
}
impl Converter<'_> {
    fn required<T: Injectable>(&self, key: &str, dependency: Dependency) -> Result<Arc<T>, ResolveError> {
        self.optional(dependency)?.ok_or_else(|| self.not_found(key))
    }

    fn optional<T: Injectable>(&self, dependency: Dependency) -> Result<Option<Arc<T>>, ResolveError> {
        dependency.into_arc::<T>()
    }

    fn deferred<T: Injectable>(&self, key: &str, dependency: Dependency) -> Result<Deferred<T>, ResolveError> {
        match dependency {
            Dependency::Absent => Err(self.not_found(key)),
            dependency => Ok(Deferred::new(key, self.container, dependency)),
        }
    }

    fn not_found(&self, key: &str) -> ResolveError {
        DependencyNotFound {
            key: key.to_owned(),
            container: self.container.to_owned(),
            required_by: None,
            location: None,
        }
        .into()
    }
}

/// Resolved dependencies in declaration order, for constructor injection
pub struct Arguments {
    product: &'static str,
    container: String,
    entries: std::vec::IntoIter<(String, Dependency)>,
    declared: usize,
    position: usize,
}
impl Arguments {
    pub(crate) fn new(product: &'static str, container: &str, entries: Vec<(String, Dependency)>) -> Self {
        Arguments {
            product,
            container: container.to_owned(),
            declared: entries.len(),
            entries: entries.into_iter(),
            position: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.len() == 0
    }

    /// Next raw dependency together with its key
    pub fn next_entry(&mut self) -> Result<(String, Dependency), ResolveError> {
        self.position += 1;
        self.entries.next().ok_or(ResolveError::MissingArgument {
            product: self.product,
            position: self.position,
            declared: self.declared,
        })
    }

    pub fn next_dependency(&mut self) -> Result<Dependency, ResolveError> {
        self.next_entry().map(|(_, dependency)| dependency)
    }

    /// Next argument, which must be available now
    pub fn take<T: Injectable>(&mut self) -> Result<Arc<T>, ResolveError> {
        let (key, dependency) = self.next_entry()?;
        self.converter().required(&key, dependency)
    }

    pub fn take_optional<T: Injectable>(&mut self) -> Result<Option<Arc<T>>, ResolveError> {
        let (_, dependency) = self.next_entry()?;
        self.converter().optional(dependency)
    }

    /// Next argument, accepting proxies and lazy loaders without forcing them
    pub fn take_deferred<T: Injectable>(&mut self) -> Result<Deferred<T>, ResolveError> {
        let (key, dependency) = self.next_entry()?;
        self.converter().deferred(&key, dependency)
    }

    fn converter(&self) -> Converter<'_> {
        Converter {
            container: &self.container,
        }
    }
}

/// Resolved dependencies by property name, for property injection
pub struct Dependencies {
    product: &'static str,
    container: String,
    entries: HashMap<String, Dependency>,
}
impl Dependencies {
    pub(crate) fn new(product: &'static str, container: &str, entries: HashMap<String, Dependency>) -> Self {
        Dependencies {
            product,
            container: container.to_owned(),
            entries,
        }
    }

    /// Type being injected
    pub fn product(&self) -> &'static str {
        self.product
    }

    pub fn contains(&self, property: &str) -> bool {
        self.entries.contains_key(property)
    }

    /// Property names still waiting to be taken
    pub fn properties(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn remove(&mut self, property: &str) -> Option<Dependency> {
        self.entries.remove(property)
    }

    pub fn take<T: Injectable>(&mut self, property: &str) -> Result<Arc<T>, ResolveError> {
        let dependency = self.remove(property).unwrap_or(Dependency::Absent);
        self.converter().required(property, dependency)
    }

    pub fn take_optional<T: Injectable>(&mut self, property: &str) -> Result<Option<Arc<T>>, ResolveError> {
        let dependency = self.remove(property).unwrap_or(Dependency::Absent);
        self.converter().optional(dependency)
    }

    pub fn take_deferred<T: Injectable>(&mut self, property: &str) -> Result<Deferred<T>, ResolveError> {
        let dependency = self.remove(property).unwrap_or(Dependency::Absent);
        self.converter().deferred(property, dependency)
    }

    fn converter(&self) -> Converter<'_> {
        Converter {
            container: &self.container,
        }
    }
}
