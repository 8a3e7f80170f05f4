use std::{collections::HashMap, marker::PhantomData, sync::Arc};

use serde::de::DeserializeOwned;
use serde_json::Value;
use wrapp_di::{
    type_key, BindError, Container, ContainerBuilder, Descriptor, Injectable, Instance, Provider,
    ResolveError, TypeInfo,
};

use crate::config::deserialize;

/// Per component configuration, looked up by component name
pub trait ComponentRegistry: Send + Sync {
    fn find_component_config(&self, name: &str) -> Option<Value>;
}

/// Key the shared [ComponentRegistry] is bound under
pub fn registry_key() -> &'static str {
    type_key::<dyn ComponentRegistry>()
}

pub fn bind_registry(
    builder: &mut ContainerBuilder,
    registry: Arc<dyn ComponentRegistry>,
) -> Result<&mut ContainerBuilder, BindError> {
    builder.set(registry_key(), registry)
}

/// A registry backed by a plain map
#[derive(Debug, Clone, Default)]
pub struct ComponentMap {
    components: HashMap<String, Value>,
}

impl ComponentMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the config of a component, replacing an earlier one
    pub fn register(&mut self, name: impl Into<String>, config: impl Into<Value>) -> &mut Self {
        self.components.insert(name.into(), config.into());
        self
    }

    pub fn into_shared(self) -> Arc<dyn ComponentRegistry> {
        Arc::new(self)
    }
}

impl ComponentRegistry for ComponentMap {
    fn find_component_config(&self, name: &str) -> Option<Value> {
        self.components.get(name).cloned()
    }
}

/// Supplies a dependency from the component registry bound in the container
///
/// The descriptor key names the component, its config is deserialized into `T`.
pub struct FromRegistry<T> {
    _type: PhantomData<fn() -> T>,
}
impl<T> Default for FromRegistry<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> FromRegistry<T> {
    pub fn new() -> Self {
        FromRegistry { _type: PhantomData }
    }
}

impl<T: DeserializeOwned + Injectable> FromRegistry<T> {
    /// Descriptor for the component `name`, supplied by this provider
    pub fn descriptor(self, name: impl Into<String>) -> Descriptor {
        Descriptor::new(name).with_type::<T>().provider(self)
    }
}

impl<T: DeserializeOwned + Injectable> Provider for FromRegistry<T> {
    fn provide(
        &self,
        container: &Container,
        descriptor: &Descriptor,
        _owner: Option<TypeInfo>,
    ) -> Result<Option<Instance>, ResolveError> {
        let Some(registry) = container.find_dependency(registry_key())? else {
            tracing::debug!("No registry bound, '{}' stays unresolved", descriptor.key());
            return Ok(None);
        };
        let Some(registry) = registry.into_arc::<Arc<dyn ComponentRegistry>>()? else {
            return Ok(None);
        };

        match registry.find_component_config(descriptor.key()) {
            Some(config) => deserialize::<T>(descriptor.key(), config)
                .map(|config| Some(Instance::new(config)))
                .map_err(|error| ResolveError::provider(descriptor.key(), error)),
            None => Ok(None),
        }
    }
}
