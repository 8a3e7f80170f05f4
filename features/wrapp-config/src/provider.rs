use std::{marker::PhantomData, sync::Arc};

use serde::de::DeserializeOwned;
use wrapp_di::{
    type_key, BindError, Container, ContainerBuilder, Descriptor, Injectable, Instance, Provider,
    ResolveError, TypeInfo,
};

use crate::config::{deserialize, Config};

/// Key the shared [Config] is bound under
pub fn config_key() -> &'static str {
    type_key::<dyn Config>()
}

/// Binds `config` so [FromConfig] providers can find it
pub fn bind_config(
    builder: &mut ContainerBuilder,
    config: Arc<dyn Config>,
) -> Result<&mut ContainerBuilder, BindError> {
    builder.set(config_key(), config)
}

/// Supplies a dependency from the config bound in the container
///
/// The descriptor key, optionally prefixed with a section, is the config path.
/// The value found there is deserialized into `T`.
///
/// # Example
/// ```rust
/// use serde::Deserialize;
/// use wrapp_config::{config::ConfigTree, provider::{bind_config, FromConfig}};
/// use wrapp_di::{ContainerBuilder, Descriptor};
///
/// #[derive(Deserialize)]
/// struct Pool {
///     size: u32,
/// }
///
/// let mut tree = ConfigTree::new();
/// tree.set("database.pool.size", 8);
///
/// let mut builder = ContainerBuilder::new();
/// bind_config(&mut builder, tree.into_shared()).unwrap();
/// let container = builder.build();
///
/// let descriptor = FromConfig::<Pool>::section("database").descriptor("pool");
/// let pool = container.resolver()
///     .resolve(&container, &descriptor, None, &Default::default())
///     .unwrap()
///     .into_arc::<Pool>()
///     .unwrap()
///     .unwrap();
/// assert_eq!(pool.size, 8);
/// ```
pub struct FromConfig<T> {
    section: Option<String>,
    _type: PhantomData<fn() -> T>,
}
impl<T> Default for FromConfig<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> FromConfig<T> {
    pub fn new() -> Self {
        FromConfig {
            section: None,
            _type: PhantomData,
        }
    }

    /// Looks keys up below `section`
    pub fn section(section: impl Into<String>) -> Self {
        FromConfig {
            section: Some(section.into()),
            _type: PhantomData,
        }
    }

    /// Config path for a descriptor
    pub fn config_path(&self, descriptor: &Descriptor) -> String {
        match &self.section {
            Some(section) => format!("{section}.{}", descriptor.key()),
            None => descriptor.key().to_owned(),
        }
    }
}

impl<T: DeserializeOwned + Injectable> FromConfig<T> {
    /// Descriptor for `key`, supplied by this provider
    pub fn descriptor(self, key: impl Into<String>) -> Descriptor {
        Descriptor::new(key).with_type::<T>().provider(self)
    }
}

impl<T: DeserializeOwned + Injectable> Provider for FromConfig<T> {
    fn provide(
        &self,
        container: &Container,
        descriptor: &Descriptor,
        _owner: Option<TypeInfo>,
    ) -> Result<Option<Instance>, ResolveError> {
        let Some(config) = container.find_dependency(config_key())? else {
            tracing::debug!("No config bound, '{}' stays unresolved", descriptor.key());
            return Ok(None);
        };
        let Some(config) = config.into_arc::<Arc<dyn Config>>()? else {
            return Ok(None);
        };

        let path = self.config_path(descriptor);
        match config.find_value(&path) {
            Some(value) => deserialize::<T>(&path, value)
                .map(|value| Some(Instance::new(value)))
                .map_err(|error| ResolveError::provider(&path, error)),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn section_prefixes_the_key() {
        let descriptor = Descriptor::new("size");

        assert_eq!(FromConfig::<u8>::new().config_path(&descriptor), "size");
        assert_eq!(
            FromConfig::<u8>::section("database.pool").config_path(&descriptor),
            "database.pool.size"
        );
    }
}
