use std::{
    collections::HashMap,
    fmt::Debug,
    panic::Location,
    sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError, Weak},
    thread::{self, ThreadId},
};

use crate::{
    binding::{AliasInitializer, Binding, InitializerFn},
    dependency::Dependency,
    descriptor::Descriptor,
    errors::{DependencyNotFound, ResolveError},
    path::ResolutionPath,
    recipe::Recipe,
    resolver::{Request, Resolver},
    types::{Injectable, Instance, TypeInfo},
};

/// What to look up: a plain key, or a descriptor with its key and types
#[derive(Debug, Clone, Copy)]
pub enum Lookup<'a> {
    Key(&'a str),
    Descriptor(&'a Descriptor),
}
impl<'a> From<&'a str> for Lookup<'a> {
    fn from(key: &'a str) -> Self {
        Lookup::Key(key)
    }
}
impl<'a> From<&'a String> for Lookup<'a> {
    fn from(key: &'a String) -> Self {
        Lookup::Key(key)
    }
}
impl<'a> From<&'a Descriptor> for Lookup<'a> {
    fn from(descriptor: &'a Descriptor) -> Self {
        Lookup::Descriptor(descriptor)
    }
}
impl Lookup<'_> {
    /// Key reported in errors
    pub fn name(&self) -> &str {
        match self {
            Lookup::Key(key) => key,
            Lookup::Descriptor(descriptor) => descriptor.key(),
        }
    }

    fn is_lazy(&self) -> bool {
        matches!(self, Lookup::Descriptor(descriptor) if descriptor.is_lazy())
    }
}

/// Container holding frozen bindings and memoizing whatever they resolve to
#[derive(Clone)]
pub struct Container(Arc<ContainerInner>);

struct ContainerInner {
    label: String,
    slots: HashMap<String, Slot>,
    resolver: Arc<Resolver>,
    parent: Option<ParentScope>,
}

/// Non owning handle to a container
#[derive(Clone)]
pub struct WeakContainer(Weak<ContainerInner>);
impl WeakContainer {
    pub fn upgrade(&self) -> Option<Container> {
        self.0.upgrade().map(Container)
    }
}

/// Link from a child container to the scope it delegates to
#[derive(Clone)]
pub enum ParentScope {
    /// The child keeps the parent alive
    Owned(Container),
    /// A released parent turns the child into a root container
    Weak(WeakContainer),
}
impl ParentScope {
    pub fn owned(parent: &Container) -> Self {
        ParentScope::Owned(parent.clone())
    }

    pub fn weak(parent: &Container) -> Self {
        ParentScope::Weak(parent.downgrade())
    }

    pub(crate) fn get(&self) -> Option<Container> {
        match self {
            ParentScope::Owned(parent) => Some(parent.clone()),
            ParentScope::Weak(parent) => parent.upgrade(),
        }
    }
}

struct Slot {
    state: Mutex<SlotState>,
    settled: Condvar,
}
struct SlotState {
    binding: Binding,
    /// Thread currently resolving this slot
    resolving: Option<ThreadId>,
}
impl Slot {
    fn new(binding: Binding) -> Self {
        Slot {
            state: Mutex::new(SlotState {
                binding,
                resolving: None,
            }),
            settled: Condvar::new(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, SlotState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn wait<'a>(&self, state: MutexGuard<'a, SlotState>) -> MutexGuard<'a, SlotState> {
        self.settled
            .wait(state)
            .unwrap_or_else(PoisonError::into_inner)
    }
}

/// Marks a slot as being resolved by the current thread until settled
///
/// Dropped without settling (unwinding), the slot records an aborted resolution.
struct InFlight<'a> {
    slot: &'a Slot,
    key: &'a str,
    settled: bool,
}
impl InFlight<'_> {
    fn settle(mut self, binding: Option<Binding>) {
        self.settled = true;
        let mut state = self.slot.lock();
        if let Some(binding) = binding {
            state.binding = binding;
        }
        state.resolving = None;
        self.slot.settled.notify_all();
    }
}
impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if self.settled {
            return;
        }
        tracing::error!("Resolution of '{}' aborted", self.key);
        let mut state = self.slot.lock();
        state.binding = Binding::Failed(ResolveError::Aborted {
            key: self.key.to_owned(),
        });
        state.resolving = None;
        self.slot.settled.notify_all();
    }
}

enum Work {
    Recipe(Arc<Recipe>),
    Alias(AliasInitializer),
    Initializer(InitializerFn),
}

impl Debug for Container {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut map = f.debug_struct("Container");
        map.field("label", &self.0.label);
        let mut keys: Vec<_> = self.0.slots.keys().collect();
        keys.sort();
        for key in keys {
            let description = self.0.slots[key].lock().binding.describe();
            map.field(key, &description);
        }
        map.finish()
    }
}

impl Container {
    pub(crate) fn new(
        label: String,
        bindings: HashMap<String, Binding>,
        resolver: Arc<Resolver>,
        parent: Option<ParentScope>,
    ) -> Self {
        let slots = bindings
            .into_iter()
            .map(|(key, binding)| (key, Slot::new(binding)))
            .collect();

        Self(Arc::new(ContainerInner {
            label,
            slots,
            resolver,
            parent,
        }))
    }

    pub fn label(&self) -> &str {
        &self.0.label
    }

    pub fn resolver(&self) -> &Arc<Resolver> {
        &self.0.resolver
    }

    /// Parent scope, if there is one and it is still alive
    pub fn parent(&self) -> Option<Container> {
        self.0.parent.as_ref().and_then(ParentScope::get)
    }

    pub fn downgrade(&self) -> WeakContainer {
        WeakContainer(Arc::downgrade(&self.0))
    }

    /// Keys bound in this container, ancestors excluded
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.slots.keys().map(String::as_str)
    }

    /// Local key a lookup resolves to
    ///
    /// A descriptor tries its own key first, then each declared type in order.
    pub fn find_key<'a>(&self, lookup: impl Into<Lookup<'a>>) -> Option<&str> {
        let slots = &self.0.slots;
        let local = |candidate: &str| slots.get_key_value(candidate).map(|(key, _)| key.as_str());

        let lookup: Lookup<'_> = lookup.into();
        match lookup {
            Lookup::Key(key) => local(key),
            Lookup::Descriptor(descriptor) => descriptor.candidate_keys().find_map(local),
        }
    }

    /// Resolves a dependency, searching the parent scopes if it is not bound here
    ///
    /// Returns `Ok(None)` if nothing in the scope chain binds it,
    /// and the memoized failure if resolving it failed before.
    pub fn find_dependency<'a>(
        &self,
        lookup: impl Into<Lookup<'a>>,
    ) -> Result<Option<Dependency>, ResolveError> {
        self.find_in_scope(lookup.into(), None, &ResolutionPath::new())
    }

    /// Same as [Container::find_dependency], but a missing dependency is an error
    #[track_caller]
    pub fn resolve_dependency<'a>(
        &self,
        lookup: impl Into<Lookup<'a>>,
    ) -> Result<Dependency, ResolveError> {
        let location = Location::caller();
        let lookup: Lookup<'_> = lookup.into();
        self.find_dependency(lookup)?
            .ok_or_else(|| self.not_found(lookup.name(), None, Some(location)))
    }

    /// Resolves and downcasts, forcing deferred handles
    #[track_caller]
    pub fn require<'a, T: Injectable>(
        &self,
        lookup: impl Into<Lookup<'a>>,
    ) -> Result<Arc<T>, ResolveError> {
        let location = Location::caller();
        let lookup: Lookup<'_> = lookup.into();
        let missing = || self.not_found(lookup.name(), None, Some(location));

        self.find_dependency(lookup)?
            .ok_or_else(&missing)?
            .into_arc::<T>()?
            .ok_or_else(&missing)
    }

    /// The value behind a lookup, only if it has already been constructed
    pub fn get_dependency_if_initialized<'a>(
        &self,
        lookup: impl Into<Lookup<'a>>,
    ) -> Option<Instance> {
        let lookup: Lookup<'_> = lookup.into();
        match self.find_key(lookup) {
            Some(key) => match &self.0.slots.get(key)?.lock().binding {
                Binding::Value(instance) => Some(instance.clone()),
                _ => None,
            },
            None => self.parent()?.get_dependency_if_initialized(lookup),
        }
    }

    /// Bound here or in any ancestor
    pub fn has_dependency<'a>(&self, lookup: impl Into<Lookup<'a>>) -> bool {
        let lookup: Lookup<'_> = lookup.into();
        self.find_key(lookup).is_some()
            || self
                .parent()
                .is_some_and(|parent| parent.has_dependency(lookup))
    }

    pub(crate) fn find_in_scope(
        &self,
        lookup: Lookup<'_>,
        owner: Option<TypeInfo>,
        path: &ResolutionPath,
    ) -> Result<Option<Dependency>, ResolveError> {
        match self.find_key(lookup) {
            Some(key) => self.resolve_slot(key, lookup.is_lazy(), owner, path),
            None => match self.parent() {
                Some(parent) => parent.find_in_scope(lookup, owner, path),
                None => Ok(None),
            },
        }
    }

    /// Final value of a slot whose construction was deferred
    ///
    /// Fails if the slot is still being built on this thread, the cycle could not be broken.
    pub(crate) fn settle(
        &self,
        key: &str,
        path: &ResolutionPath,
    ) -> Result<Instance, ResolveError> {
        match self.resolve_slot(key, false, None, &ResolutionPath::new())? {
            Some(Dependency::Ready(instance)) => Ok(instance),
            Some(_) => Err(self.circular(key, path)),
            None => Err(self.not_found(key, None, None)),
        }
    }

    pub(crate) fn not_found(
        &self,
        key: &str,
        owner: Option<TypeInfo>,
        location: Option<&'static Location<'static>>,
    ) -> ResolveError {
        DependencyNotFound {
            key: key.to_owned(),
            container: self.0.label.clone(),
            required_by: owner,
            location,
        }
        .into()
    }

    pub(crate) fn circular(&self, key: &str, path: &ResolutionPath) -> ResolveError {
        ResolveError::CircularDependency {
            key: key.to_owned(),
            container: self.0.label.clone(),
            path: path.clone(),
        }
    }

    fn resolve_slot(
        &self,
        key: &str,
        lazy: bool,
        owner: Option<TypeInfo>,
        path: &ResolutionPath,
    ) -> Result<Option<Dependency>, ResolveError> {
        let Some(slot) = self.0.slots.get(key) else {
            return Ok(None);
        };
        let current = thread::current().id();

        let mut state = slot.lock();
        // Single flight - wait for other threads building this slot
        while matches!(state.resolving, Some(thread) if thread != current) {
            state = slot.wait(state);
        }
        let in_flight = state.resolving.is_some();
        let resolvable = self.0.resolver.can_resolve_dependency(&state.binding);

        let work = match &mut state.binding {
            Binding::Value(instance) => return Ok(Some(Dependency::Ready(instance.clone()))),
            Binding::Failed(error) => return Err(error.clone()),
            Binding::Recipe(recipe) if resolvable => Work::Recipe(recipe.clone()),
            Binding::Recipe(_) => return Ok(None),
            Binding::Alias(alias) => Work::Alias(alias.clone()),
            Binding::Initializer(initializer) => match initializer.take() {
                Some(initializer) => Work::Initializer(initializer),
                // Only an initializer running further up this thread's stack can be fired but unsettled
                None => return Err(self.circular(key, path)),
            },
        };

        if in_flight {
            drop(state);
            tracing::debug!("'{key}' is already being resolved on this thread");
            return self.run(key, work, lazy, true, owner, path);
        }

        state.resolving = Some(current);
        drop(state);
        let guard = InFlight {
            slot,
            key,
            settled: false,
        };

        let outcome = self.run(key, work, lazy, false, owner, path);
        let memo = match &outcome {
            Ok(Some(Dependency::Ready(instance))) => {
                tracing::debug!("Resolved '{key}' to {}", instance.info);
                Some(Binding::Value(instance.clone()))
            }
            // Proxies and missing aliases leave the binding untouched
            Ok(_) => None,
            Err(error) => {
                tracing::error!("Resolving '{key}' failed: {error}");
                Some(Binding::Failed(error.clone()))
            }
        };
        guard.settle(memo);

        outcome
    }

    fn run(
        &self,
        key: &str,
        work: Work,
        lazy: bool,
        in_flight: bool,
        owner: Option<TypeInfo>,
        path: &ResolutionPath,
    ) -> Result<Option<Dependency>, ResolveError> {
        match work {
            Work::Recipe(recipe) => {
                let request = Request {
                    key,
                    lazy,
                    in_flight,
                };
                self.0
                    .resolver
                    .resolve_dependency(&recipe, self, request, path)
                    .map(Some)
            }
            Work::Alias(alias) => {
                let path = Resolver::enter(path, key)?;
                alias.execute(self, owner, &path)
            }
            Work::Initializer(initializer) => {
                tracing::debug!("Running initializer for '{key}'");
                initializer(self)
                    .map(|instance| Some(Dependency::Ready(instance)))
                    .map_err(|error| ResolveError::initializer(key, error))
            }
        }
    }
}
