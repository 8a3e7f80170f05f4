#![allow(dead_code)]

use std::sync::Arc;

use tracing_subscriber::EnvFilter;
use wrapp_di::{
    type_key, Arguments, Constructible, Container, ContainerBuilder, Deferred, Descriptor,
    DynError, OnConflict, Recipe,
};

/// Logs to the test output, filtered by RUST_LOG
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Builds the parent first, taking its child eagerly
#[derive(Debug)]
pub struct Parent {
    pub child: Arc<Child>,
}
impl Constructible for Parent {
    fn descriptors() -> Vec<Descriptor> {
        vec![Descriptor::new("child")]
    }

    fn construct(mut arguments: Arguments) -> Result<Self, DynError> {
        Ok(Parent {
            child: arguments.take()?,
        })
    }
}

/// Points back at its parent, which is still under construction
#[derive(Debug)]
pub struct Child {
    pub parent: Deferred<Parent>,
}
impl Constructible for Child {
    fn descriptors() -> Vec<Descriptor> {
        vec![Descriptor::new("parent")]
    }

    fn construct(mut arguments: Arguments) -> Result<Self, DynError> {
        Ok(Child {
            parent: arguments.take_deferred()?,
        })
    }
}

pub fn family() -> Container {
    let mut builder = ContainerBuilder::new().with_label("family");
    builder
        .bind(["parent"], Recipe::constructor::<Parent>(), OnConflict::Fail)
        .unwrap()
        .bind(["child"], Recipe::constructor::<Child>(), OnConflict::Fail)
        .unwrap();
    builder.build()
}

/// Does nothing but exist, its descriptors are resolved anyway
#[derive(Default)]
pub struct Link;

/// `links` keys, each one depending on the next
pub fn chain(links: usize) -> Container {
    let mut builder = ContainerBuilder::new().with_label("chain");
    for link in 0..links {
        let mut recipe = Recipe::plain::<Link>();
        if link + 1 < links {
            recipe = recipe.with_descriptors(vec![Descriptor::new(format!("link{}", link + 1))]);
        }
        builder
            .bind([format!("link{link}")], recipe, OnConflict::Fail)
            .unwrap();
    }
    builder.build()
}

pub fn key_of<T: ?Sized + 'static>() -> &'static str {
    type_key::<T>()
}
