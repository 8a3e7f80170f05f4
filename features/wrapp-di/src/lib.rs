//! Keyed dependency resolution
//!
//! Bindings are collected in a [ContainerBuilder] and frozen into a [Container].
//! The container builds every key at most once, on first lookup, and hands out the same
//! instance (or the same failure) from then on. Keys it does not bind are looked up in
//! its parent scope.
//!
//! Recipes are built by the [Resolver]: it resolves the declared [Descriptor]s of a type,
//! breaks cycles with pending proxies and hands lazy dependencies out as [LazyLoader]s.
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use wrapp_di::{Arguments, Constructible, ContainerBuilder, Descriptor, DynError, OnConflict};
//!
//! struct Greeter {
//!     name: Arc<String>,
//! }
//! impl Constructible for Greeter {
//!     fn descriptors() -> Vec<Descriptor> {
//!         vec![Descriptor::new("name")]
//!     }
//!
//!     fn construct(mut arguments: Arguments) -> Result<Self, DynError> {
//!         Ok(Greeter { name: arguments.take()? })
//!     }
//! }
//!
//! let mut builder = ContainerBuilder::new();
//! builder.set("name", String::from("world")).unwrap();
//! builder.bind_constructible::<Greeter>(OnConflict::Fail).unwrap();
//!
//! let container = builder.build();
//! let greeter = container.require::<Greeter>(wrapp_di::type_key::<Greeter>()).unwrap();
//! assert_eq!(*greeter.name, "world");
//! ```

pub mod binding;
pub mod builder;
pub mod container;
pub mod dependency;
pub mod descriptor;
pub mod errors;
pub mod path;
pub mod recipe;
pub mod resolver;
pub mod types;

pub use binding::{AliasInitializer, Binding, Initializer};
pub use builder::{ContainerBuilder, OnConflict};
pub use container::{Container, Lookup, ParentScope, WeakContainer};
pub use dependency::{Arguments, Dependencies, Dependency};
pub use descriptor::{Descriptor, Provider};
pub use errors::{BindError, DependencyNotFound, ResolveError};
pub use path::{ResolutionPath, MAX_RESOLUTION_DEPTH};
pub use recipe::{AutoResolve, Constructible, InjectDependencies, Recipe};
pub use resolver::{lazy::Deferred, lazy::LazyLoader, pending::Pending, Request, Resolver};
pub use types::{type_key, DynError, Injectable, Instance, TypeInfo};
