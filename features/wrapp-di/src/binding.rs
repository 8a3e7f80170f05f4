use std::{fmt::Debug, sync::Arc};

use crate::{
    container::{Container, Lookup},
    dependency::Dependency,
    errors::ResolveError,
    path::ResolutionPath,
    recipe::Recipe,
    types::{DynError, Instance, TypeInfo},
};

/// Content of one container slot
///
/// Recipes, initializers and aliases settle into a value or a failure on first resolution.
pub enum Binding {
    /// A ready value
    Value(Instance),
    /// Built by the resolver
    Recipe(Arc<Recipe>),
    /// Runs once
    Initializer(Initializer),
    /// Forwards to another key
    Alias(AliasInitializer),
    /// A memoized failure, handed out on every lookup
    Failed(ResolveError),
}
impl Debug for Binding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.describe())
    }
}

impl Binding {
    pub fn value(instance: Instance) -> Self {
        Binding::Value(instance)
    }

    pub fn recipe(recipe: Recipe) -> Self {
        Binding::Recipe(Arc::new(recipe))
    }

    /// Short human readable summary
    pub fn describe(&self) -> String {
        match self {
            Binding::Value(instance) => format!("value of type {}", instance.info),
            Binding::Recipe(recipe) => format!("recipe for {}", recipe.target()),
            Binding::Initializer(initializer) if initializer.was_called() => {
                "initializer (called)".to_owned()
            }
            Binding::Initializer(_) => "initializer".to_owned(),
            Binding::Alias(alias) => format!("alias of '{}'", alias.alias()),
            Binding::Failed(error) => format!("failed: {error}"),
        }
    }

    pub fn is_settled(&self) -> bool {
        matches!(self, Binding::Value(_) | Binding::Failed(_))
    }
}

pub(crate) type InitializerFn = Box<dyn FnOnce(&Container) -> Result<Instance, DynError> + Send>;

enum InitializerState {
    Armed(InitializerFn),
    Fired,
}

/// A callback producing a slot's value exactly once
pub struct Initializer(InitializerState);

impl Initializer {
    pub fn new(
        initializer: impl FnOnce(&Container) -> Result<Instance, DynError> + Send + 'static,
    ) -> Self {
        Initializer(InitializerState::Armed(Box::new(initializer)))
    }

    pub fn was_called(&self) -> bool {
        matches!(self.0, InitializerState::Fired)
    }

    /// Disarms the initializer, handing out its callback once
    pub(crate) fn take(&mut self) -> Option<InitializerFn> {
        match std::mem::replace(&mut self.0, InitializerState::Fired) {
            InitializerState::Armed(initializer) => Some(initializer),
            InitializerState::Fired => None,
        }
    }
}

/// Resolves a slot by looking up another key
///
/// The container memoizes the outcome in the alias' own slot,
/// so both keys end up sharing the same instance.
#[derive(Debug, Clone)]
pub struct AliasInitializer {
    alias: String,
    required: bool,
}

impl AliasInitializer {
    /// A missing target resolves to nothing
    pub fn new(alias: impl Into<String>) -> Self {
        AliasInitializer {
            alias: alias.into(),
            required: false,
        }
    }

    /// A missing target is reported as not found
    pub fn required(alias: impl Into<String>) -> Self {
        AliasInitializer {
            alias: alias.into(),
            required: true,
        }
    }

    pub fn alias(&self) -> &str {
        &self.alias
    }

    pub fn is_required(&self) -> bool {
        self.required
    }

    pub(crate) fn execute(
        &self,
        container: &Container,
        owner: Option<TypeInfo>,
        path: &ResolutionPath,
    ) -> Result<Option<Dependency>, ResolveError> {
        match container.find_in_scope(Lookup::Key(&self.alias), owner, path)? {
            Some(dependency) => Ok(Some(dependency)),
            None if self.required => Err(container.not_found(&self.alias, owner, None)),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn initializer_hands_out_callback_once() {
        let mut initializer = Initializer::new(|_| Ok(Instance::new(1_u8)));

        assert!(!initializer.was_called());
        assert!(initializer.take().is_some());
        assert!(initializer.was_called());
        assert!(initializer.take().is_none());
    }

    #[test]
    fn describes_bindings() {
        assert_eq!(
            Binding::value(Instance::new(1_u8)).describe(),
            "value of type u8"
        );
        assert_eq!(
            Binding::Alias(AliasInitializer::new("db")).describe(),
            "alias of 'db'"
        );
    }
}
