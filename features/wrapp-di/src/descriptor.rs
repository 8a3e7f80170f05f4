use std::{fmt::Debug, sync::Arc};

use crate::{
    container::Container,
    errors::ResolveError,
    types::{type_key, Injectable, Instance, TypeInfo},
};

/// Supplies a dependency in place of the container
///
/// Returning `Ok(None)` hands the descriptor back to its default value, or reports it missing.
pub trait Provider: Send + Sync {
    fn provide(
        &self,
        container: &Container,
        descriptor: &Descriptor,
        owner: Option<TypeInfo>,
    ) -> Result<Option<Instance>, ResolveError>;
}

/// Declares one dependency slot of a constructible type
#[derive(Clone)]
pub struct Descriptor {
    key: String,
    property: String,
    types: Vec<String>,
    required: bool,
    lazy: bool,
    default_value: Option<Instance>,
    provider: Option<Arc<dyn Provider>>,
}
impl Debug for Descriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Descriptor")
            .field("key", &self.key)
            .field("property", &self.property)
            .field("types", &self.types)
            .field("required", &self.required)
            .field("lazy", &self.lazy)
            .field("default_value", &self.default_value)
            .field("provider", &self.provider.is_some())
            .finish()
    }
}

impl Descriptor {
    /// A required, eager dependency looked up by `key`
    pub fn new(key: impl Into<String>) -> Self {
        let key = key.into();
        Descriptor {
            property: key.clone(),
            key,
            types: Vec::new(),
            required: true,
            lazy: false,
            default_value: None,
            provider: None,
        }
    }

    /// A dependency keyed by the type name of `T`
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self::new(type_key::<T>()).with_type::<T>()
    }

    /// Property the value is injected into, defaults to the key
    pub fn property(mut self, property: impl Into<String>) -> Self {
        self.property = property.into();
        self
    }

    /// Adds an acceptable type, tried after the key and earlier types
    pub fn with_type<T: ?Sized + 'static>(self) -> Self {
        self.with_type_key(type_key::<T>())
    }

    pub fn with_type_key(mut self, type_key: impl Into<String>) -> Self {
        let type_key = type_key.into();
        if !self.types.contains(&type_key) {
            self.types.push(type_key);
        }
        self
    }

    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    pub fn lazy(mut self) -> Self {
        self.lazy = true;
        self
    }

    /// Value used when the dependency is optional and missing, or a provider yields nothing
    pub fn default_value<T: Injectable>(mut self, value: T) -> Self {
        self.default_value = Some(Instance::new(value));
        self
    }

    pub fn provider(mut self, provider: impl Provider + 'static) -> Self {
        self.provider = Some(Arc::new(provider));
        self
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn property_name(&self) -> &str {
        &self.property
    }

    pub fn types(&self) -> &[String] {
        &self.types
    }

    pub fn is_required(&self) -> bool {
        self.required
    }

    pub fn is_lazy(&self) -> bool {
        self.lazy
    }

    pub fn default(&self) -> Option<&Instance> {
        self.default_value.as_ref()
    }

    pub fn get_provider(&self) -> Option<&Arc<dyn Provider>> {
        self.provider.as_ref()
    }

    /// Key then types, in lookup order
    pub(crate) fn candidate_keys(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.key.as_str()).chain(self.types.iter().map(String::as_str))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    trait Greeter {}

    #[test]
    fn candidates_start_with_key() {
        let descriptor = Descriptor::new("greeter")
            .with_type::<dyn Greeter>()
            .with_type_key("fallback")
            .with_type_key("fallback");

        let candidates: Vec<_> = descriptor.candidate_keys().collect();
        assert_eq!(candidates, ["greeter", type_key::<dyn Greeter>(), "fallback"]);
        assert_eq!(descriptor.property_name(), "greeter");
    }

    #[test]
    fn defaults_to_required_and_eager() {
        let descriptor = Descriptor::of::<String>();

        assert!(descriptor.is_required());
        assert!(!descriptor.is_lazy());
        assert_eq!(descriptor.key(), type_key::<String>());
    }
}
