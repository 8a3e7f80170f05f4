use std::{collections::HashMap, fmt::Debug, sync::Arc};

use crate::{
    binding::{AliasInitializer, Binding, Initializer},
    container::{Container, ParentScope},
    errors::BindError,
    recipe::{AutoResolve, Constructible, InjectDependencies, Recipe},
    resolver::Resolver,
    types::{type_key, DynError, Injectable, Instance},
};

/// What `bind` does with keys that are already bound
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OnConflict {
    /// Reject the whole call, nothing gets bound
    #[default]
    Fail,
    /// Leave bound keys alone, bind the rest
    Skip,
}

/// Collects bindings, then freezes them into a [Container]
///
/// Building takes a snapshot and clears the builder, so it can be reused for the next container.
pub struct ContainerBuilder {
    label: String,
    bindings: HashMap<String, Binding>,
}
impl Debug for ContainerBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut keys: Vec<&String> = self.bindings.keys().collect();
        keys.sort();
        f.debug_struct("ContainerBuilder")
            .field("label", &self.label)
            .field("keys", &keys)
            .finish()
    }
}
impl Default for ContainerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ContainerBuilder {
    pub fn new() -> Self {
        ContainerBuilder {
            label: "root".to_owned(),
            bindings: HashMap::new(),
        }
    }

    /// Label of built containers, shows up in errors
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }
}

impl ContainerBuilder {
    /// Binds `recipe` under the first key, every other key becomes an alias of it
    pub fn bind<K: Into<String>>(
        &mut self,
        keys: impl IntoIterator<Item = K>,
        recipe: Recipe,
        on_conflict: OnConflict,
    ) -> Result<&mut Self, BindError> {
        recipe.validate()?;
        self.bind_binding(keys, Binding::recipe(recipe), on_conflict)
    }

    /// Binds `T` under its type key, built through [Constructible::construct]
    pub fn bind_constructible<T: Constructible>(
        &mut self,
        on_conflict: OnConflict,
    ) -> Result<&mut Self, BindError> {
        self.bind([type_key::<T>()], Recipe::constructor::<T>(), on_conflict)
    }

    /// Binds `T` under its type key, built through property injection
    pub fn bind_injectable<T: InjectDependencies>(
        &mut self,
        on_conflict: OnConflict,
    ) -> Result<&mut Self, BindError> {
        self.bind([type_key::<T>()], Recipe::injectable::<T>(), on_conflict)
    }

    pub fn bind_auto_resolving<T: AutoResolve>(
        &mut self,
        on_conflict: OnConflict,
    ) -> Result<&mut Self, BindError> {
        self.bind([type_key::<T>()], Recipe::auto_resolving::<T>(), on_conflict)
    }

    pub fn bind_plain<T: Injectable + Default>(
        &mut self,
        on_conflict: OnConflict,
    ) -> Result<&mut Self, BindError> {
        self.bind([type_key::<T>()], Recipe::plain::<T>(), on_conflict)
    }

    /// Binds a ready value under the first key, every other key becomes an alias of it
    pub fn bind_instance<K: Into<String>>(
        &mut self,
        keys: impl IntoIterator<Item = K>,
        instance: Instance,
        on_conflict: OnConflict,
    ) -> Result<&mut Self, BindError> {
        self.bind_binding(keys, Binding::value(instance), on_conflict)
    }

    /// Binds a callback that runs once, on first resolution
    pub fn bind_initializer<K: Into<String>>(
        &mut self,
        keys: impl IntoIterator<Item = K>,
        initializer: impl FnOnce(&Container) -> Result<Instance, DynError> + Send + 'static,
        on_conflict: OnConflict,
    ) -> Result<&mut Self, BindError> {
        self.bind_binding(
            keys,
            Binding::Initializer(Initializer::new(initializer)),
            on_conflict,
        )
    }

    /// Sets a raw value under `key`
    pub fn set<T: Injectable>(
        &mut self,
        key: impl Into<String>,
        value: T,
    ) -> Result<&mut Self, BindError> {
        self.set_binding(key, Binding::value(Instance::new(value)))
    }

    /// Binds `binding` as is under `key`, which must still be free
    pub fn set_binding(
        &mut self,
        key: impl Into<String>,
        binding: Binding,
    ) -> Result<&mut Self, BindError> {
        let key = key.into();
        if self.is_bound(&key) {
            return Err(BindError::AlreadyBound(key));
        }
        tracing::debug!("Setting '{key}' to {}", binding.describe());
        self.bindings.insert(key, binding);
        Ok(self)
    }

    pub fn is_bound(&self, key: &str) -> bool {
        self.bindings.contains_key(key)
    }

    /// Human readable summary of what is bound under `key`
    pub fn key_description(&self, key: &str) -> Option<String> {
        self.bindings.get(key).map(Binding::describe)
    }

    /// Freezes the collected bindings into a container, leaving the builder empty
    pub fn build_container(
        &mut self,
        resolver: Arc<Resolver>,
        parent: Option<ParentScope>,
    ) -> Container {
        let bindings = std::mem::take(&mut self.bindings);
        tracing::debug!(
            "Building container '{}' with {} bindings",
            self.label,
            bindings.len()
        );
        Container::new(self.label.clone(), bindings, resolver, parent)
    }

    /// Root container with its own resolver
    pub fn build(&mut self) -> Container {
        self.build_container(Arc::new(Resolver::new()), None)
    }

    /// Child container sharing the resolver of its parent
    pub fn build_scope(&mut self, parent: ParentScope) -> Container {
        let resolver = match parent.get() {
            Some(parent) => parent.resolver().clone(),
            None => Arc::new(Resolver::new()),
        };
        self.build_container(resolver, Some(parent))
    }

    fn bind_binding<K: Into<String>>(
        &mut self,
        keys: impl IntoIterator<Item = K>,
        binding: Binding,
        on_conflict: OnConflict,
    ) -> Result<&mut Self, BindError> {
        let keys: Vec<String> = keys.into_iter().map(Into::into).collect();
        let Some(first) = keys.first() else {
            return Err(BindError::NoKeys);
        };

        let target = match on_conflict {
            // Check everything first, a failed call must not leave half its keys bound
            OnConflict::Fail => {
                if let Some(bound) = keys.iter().find(|key| self.is_bound(key)) {
                    return Err(BindError::AlreadyBound(bound.clone()));
                }
                first
            }
            OnConflict::Skip => {
                let Some(free) = keys.iter().find(|key| !self.is_bound(key)) else {
                    tracing::warn!("All of {keys:?} are already bound, dropping {}", binding.describe());
                    return Ok(self);
                };
                if free != first {
                    tracing::warn!("'{first}' is already bound, binding to '{free}' instead");
                }
                free
            }
        };

        self.insert(target, binding);
        for alias in keys.iter().filter(|key| *key != target) {
            self.insert(alias, Binding::Alias(AliasInitializer::required(target.clone())));
        }
        Ok(self)
    }

    fn insert(&mut self, key: &str, binding: Binding) {
        if self.is_bound(key) {
            tracing::debug!("Skipping '{key}', it is already bound");
            return;
        }
        tracing::debug!("Binding '{key}' to {}", binding.describe());
        self.bindings.insert(key.to_owned(), binding);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extra_keys_become_aliases_of_the_first() {
        let mut builder = ContainerBuilder::new();
        builder
            .bind(["primary", "secondary"], Recipe::plain::<u8>(), OnConflict::Fail)
            .unwrap();

        assert!(builder.is_bound("primary"));
        assert_eq!(
            builder.key_description("secondary").as_deref(),
            Some("alias of 'primary'")
        );
        assert_eq!(
            builder.key_description("primary").as_deref(),
            Some("recipe for u8")
        );
    }

    #[test]
    fn failing_bind_leaves_builder_untouched() {
        let mut builder = ContainerBuilder::new();
        builder.set("taken", 1_u8).unwrap();

        let error = builder
            .bind(["fresh", "taken"], Recipe::plain::<u8>(), OnConflict::Fail)
            .unwrap_err();

        assert_eq!(error, BindError::AlreadyBound("taken".into()));
        assert!(!builder.is_bound("fresh"));
    }

    #[test]
    fn skip_binds_only_free_keys() {
        let mut builder = ContainerBuilder::new();
        builder.set("taken", 1_u8).unwrap();

        builder
            .bind(["taken", "fresh", "spare"], Recipe::plain::<u16>(), OnConflict::Skip)
            .unwrap();

        assert_eq!(
            builder.key_description("taken").as_deref(),
            Some("value of type u8")
        );
        assert_eq!(
            builder.key_description("fresh").as_deref(),
            Some("recipe for u16")
        );
        assert_eq!(
            builder.key_description("spare").as_deref(),
            Some("alias of 'fresh'")
        );
    }

    #[test]
    fn skip_with_every_key_bound_binds_nothing() {
        let mut builder = ContainerBuilder::new();
        builder.set("taken", 1_u8).unwrap();

        builder
            .bind(["taken"], Recipe::plain::<u16>(), OnConflict::Skip)
            .unwrap();

        assert_eq!(
            builder.key_description("taken").as_deref(),
            Some("value of type u8")
        );
    }

    #[test]
    fn set_refuses_to_replace_a_binding() {
        let mut builder = ContainerBuilder::new();
        builder
            .bind(["svc"], Recipe::plain::<u16>(), OnConflict::Fail)
            .unwrap();

        let error = builder.set("svc", 1_u8).unwrap_err();
        assert_eq!(error, BindError::AlreadyBound("svc".into()));

        let error = builder
            .set_binding("svc", Binding::value(Instance::new(2_u8)))
            .unwrap_err();
        assert_eq!(error, BindError::AlreadyBound("svc".into()));
        assert_eq!(
            builder.key_description("svc").as_deref(),
            Some("recipe for u16")
        );
    }

    #[test]
    fn bind_needs_a_key() {
        let mut builder = ContainerBuilder::new();

        let error = builder
            .bind(Vec::<String>::new(), Recipe::plain::<u8>(), OnConflict::Fail)
            .unwrap_err();
        assert_eq!(error, BindError::NoKeys);
    }

    #[test]
    fn building_clears_the_builder() {
        let mut builder = ContainerBuilder::new().with_label("app");
        builder.set("answer", 42_u32).unwrap();

        let container = builder.build();

        assert_eq!(container.label(), "app");
        assert!(container.has_dependency("answer"));
        assert!(!builder.is_bound("answer"));
    }
}
