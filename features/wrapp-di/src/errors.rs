use std::{panic::Location, sync::Arc};

use thiserror::Error;

use crate::{path::ResolutionPath, types::DynError, types::TypeInfo};

/// Errors while resolving a dependency
///
/// All errors must be clone, a failed slot hands out the same error on every lookup.
#[derive(Error, Debug, Clone)]
pub enum ResolveError {
    /// Nothing in the scope chain could provide the dependency
    #[error(transparent)]
    NotFound(#[from] DependencyNotFound),

    /// A deferred proxy was used before the cycle it broke could complete
    #[error("A circular dependency '{key}' was detected in container '{container}', but resolving it yields another proxy (resolving keys: {path})")]
    CircularDependency {
        key: String,
        container: String,
        path: ResolutionPath,
    },

    /// The resolution path grew beyond the allowed depth
    #[error("Maximum resolution depth of {max_depth} exceeded (resolving keys: {path})")]
    MaxResolutionDepth {
        max_depth: usize,
        path: ResolutionPath,
    },

    /// Construction of a recipe failed
    #[error("Construction of '{product}' for '{key}' failed - error: {error}")]
    ConstructionFailed {
        product: &'static str,
        key: String,
        error: Arc<DynError>,
    },

    /// An initializer binding failed
    #[error("Initializer for '{key}' failed - error: {error}")]
    InitializerFailed { key: String, error: Arc<DynError> },

    /// A descriptor provider failed
    #[error("Provider for '{key}' failed - error: {error}")]
    ProviderFailed { key: String, error: Arc<DynError> },

    #[error("Failed to downcast, required: '{required_type}' actual: '{actual_type}'")]
    DowncastFailed {
        required_type: &'static str,
        actual_type: &'static str,
    },

    /// The container behind a proxy or loader has been dropped
    #[error("The container resolving '{key}' is no longer available")]
    ScopeReleased { key: String },

    /// Resolution of the key unwound before it could complete
    #[error("Resolution of '{key}' was aborted")]
    Aborted { key: String },

    /// A constructor asked for more arguments than were declared
    #[error("'{product}' requested argument #{position}, but only {declared} were declared")]
    MissingArgument {
        product: &'static str,
        position: usize,
        declared: usize,
    },
}

impl ResolveError {
    /// Wraps an error returned by user code
    ///
    /// Resolution errors raised inside a constructor are passed on unchanged.
    pub(crate) fn construction(product: &'static str, key: &str, error: DynError) -> Self {
        match error.downcast::<ResolveError>() {
            Ok(resolve_error) => *resolve_error,
            Err(error) => ResolveError::ConstructionFailed {
                product,
                key: key.to_owned(),
                error: Arc::new(error),
            },
        }
    }

    pub(crate) fn initializer(key: &str, error: DynError) -> Self {
        match error.downcast::<ResolveError>() {
            Ok(resolve_error) => *resolve_error,
            Err(error) => ResolveError::InitializerFailed {
                key: key.to_owned(),
                error: Arc::new(error),
            },
        }
    }

    /// Wraps an error raised by a [Provider](crate::descriptor::Provider)
    pub fn provider(key: &str, error: impl Into<DynError>) -> Self {
        let error: DynError = error.into();
        match error.downcast::<ResolveError>() {
            Ok(resolve_error) => *resolve_error,
            Err(error) => ResolveError::ProviderFailed {
                key: key.to_owned(),
                error: Arc::new(error),
            },
        }
    }

    /// True if the dependency was simply not there
    pub fn is_not_found(&self) -> bool {
        matches!(self, ResolveError::NotFound(_))
    }
}

/// A required dependency is missing from the whole scope chain
#[derive(Error, Debug, Clone)]
pub struct DependencyNotFound {
    pub key: String,
    /// Label of the container asked first
    pub container: String,
    /// The type whose recipe declared the dependency
    pub required_by: Option<TypeInfo>,
    /// Where the lookup was started
    pub location: Option<&'static Location<'static>>,
}
impl std::fmt::Display for DependencyNotFound {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "The dependency '{}' is not found in container '{}'",
            self.key, self.container
        )?;
        if let Some(location) = self.location {
            write!(f, ", required at {location}")?;
        }
        if let Some(required_by) = self.required_by {
            write!(f, " by '{required_by}'")?;
        }
        Ok(())
    }
}

/// Errors when registering bindings
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BindError {
    #[error("Key '{0}' is already bound")]
    AlreadyBound(String),

    /// `bind` needs at least one key
    #[error("No key given to bind")]
    NoKeys,

    #[error("Lazy dependency '{key}' of '{product}' must declare a single type, found {types:?}")]
    AmbiguousLazyType {
        product: &'static str,
        key: String,
        types: Vec<String>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_errors_survive_a_round_trip_through_dyn_error() {
        let original = ResolveError::Aborted { key: "db".into() };
        let boxed: DynError = Box::new(original);

        let error = ResolveError::construction("Service", "service", boxed);
        assert!(matches!(error, ResolveError::Aborted { key } if key == "db"));
    }

    #[test]
    fn foreign_errors_are_wrapped() {
        let boxed: DynError = "disk on fire".into();

        let error = ResolveError::construction("Service", "service", boxed);
        assert_eq!(
            error.to_string(),
            "Construction of 'Service' for 'service' failed - error: disk on fire"
        );
    }

    #[test]
    fn not_found_message_names_owner() {
        let error = DependencyNotFound {
            key: "db".into(),
            container: "root".into(),
            required_by: Some(TypeInfo::of::<u8>()),
            location: None,
        };

        assert_eq!(
            error.to_string(),
            "The dependency 'db' is not found in container 'root' by 'u8'"
        );
    }
}
