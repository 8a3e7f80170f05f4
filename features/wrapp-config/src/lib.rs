//! Wrapp Config provides configuration lookups that can be injected in the rest of the
//! application.
//!
//! Wrapp Config is split into two major parts:
//! 1. Config sources: the [Config](config::Config) tree and the
//!    [ComponentRegistry](registry::ComponentRegistry)
//! 2. Providers: [FromConfig](provider::FromConfig) and [FromRegistry](registry::FromRegistry),
//!    which let descriptors pull their value out of a bound source
//!
//! # Examples
//!
//! ```rust
//! use std::sync::Arc;
//! use serde::Deserialize;
//! use wrapp_config::{config::ConfigTree, provider::{bind_config, FromConfig}};
//! use wrapp_di::{Arguments, Constructible, ContainerBuilder, Descriptor, DynError, OnConflict};
//!
//! #[derive(Deserialize)]
//! struct ServerConfig {
//!     host: String,
//!     port: u16,
//! }
//!
//! struct Server {
//!     config: Arc<ServerConfig>,
//! }
//! impl Constructible for Server {
//!     fn descriptors() -> Vec<Descriptor> {
//!         vec![FromConfig::<ServerConfig>::new().descriptor("server")]
//!     }
//!
//!     fn construct(mut arguments: Arguments) -> Result<Self, DynError> {
//!         Ok(Server { config: arguments.take()? })
//!     }
//! }
//!
//! let mut tree = ConfigTree::new();
//! tree.set("server.host", "localhost").set("server.port", 8080);
//!
//! let mut builder = ContainerBuilder::new();
//! bind_config(&mut builder, tree.into_shared()).unwrap();
//! builder.bind_constructible::<Server>(OnConflict::Fail).unwrap();
//!
//! let container = builder.build();
//! let server = container.require::<Server>(wrapp_di::type_key::<Server>()).unwrap();
//! assert_eq!(server.config.host, "localhost");
//! assert_eq!(server.config.port, 8080);
//! ```
//!
//! Wrapp Config consists of the following components:
//!
//! 1. Config - the config trait and the mutable config tree
//! 2. Provider - for injecting config values into descriptors
//! 3. Registry - for per component configuration
//! 4. Errors - for config errors

pub mod config;
pub mod errors;
pub mod provider;
pub mod registry;
