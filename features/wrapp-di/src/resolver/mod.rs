use std::sync::Arc;

use crate::{
    binding::Binding,
    container::{Container, Lookup},
    dependency::Dependency,
    descriptor::Descriptor,
    errors::ResolveError,
    path::{ResolutionPath, MAX_RESOLUTION_DEPTH},
    recipe::Recipe,
    types::TypeInfo,
};

pub mod lazy;
pub mod pending;

use lazy::LazyLoader;
use pending::Pending;

/// A recipe slot the container asks the resolver to build
#[derive(Debug, Clone, Copy)]
pub struct Request<'a> {
    /// Key of the slot holding the recipe
    pub key: &'a str,
    /// The lookup asked for a lazy dependency
    pub lazy: bool,
    /// The slot is already being built further up this thread's stack
    pub in_flight: bool,
}

/// Walks recipe descriptors and instantiates their targets
///
/// Stateless, a single resolver is shared by a container and all its children.
#[derive(Debug, Default)]
pub struct Resolver {
    _private: (),
}

impl Resolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Only recipes are built by the resolver, everything else the container settles itself
    pub fn can_resolve_dependency(&self, binding: &Binding) -> bool {
        matches!(binding, Binding::Recipe(_))
    }

    /// Extends `path` by `key`, failing once the chain gets too deep
    pub fn enter(path: &ResolutionPath, key: &str) -> Result<ResolutionPath, ResolveError> {
        let path = path.with(key);
        if path.len() > MAX_RESOLUTION_DEPTH {
            tracing::error!("Resolving '{key}' exceeds the maximum depth of {MAX_RESOLUTION_DEPTH}");
            return Err(ResolveError::MaxResolutionDepth {
                max_depth: MAX_RESOLUTION_DEPTH,
                path,
            });
        }
        Ok(path)
    }

    /// Builds the target of `recipe`
    ///
    /// Lazy requests and keys already under construction get a pending proxy instead,
    /// which breaks cycles between recipes.
    pub fn resolve_dependency(
        &self,
        recipe: &Arc<Recipe>,
        container: &Container,
        request: Request<'_>,
        path: &ResolutionPath,
    ) -> Result<Dependency, ResolveError> {
        let Request {
            key,
            lazy,
            in_flight,
        } = request;

        if lazy || in_flight || path.contains(key) {
            tracing::debug!("Deferring '{key}' behind a proxy (resolving keys: {path})");
            return Ok(Dependency::Pending(self.defer(container, key, path)));
        }

        let path = Self::enter(path, key)?;
        let owner = recipe.target();
        tracing::debug!("Building '{key}' as {owner}");

        let resolved = self.resolve_dependencies(container, recipe.descriptors(), Some(owner), &path)?;
        recipe
            .instantiate(key, container, resolved)
            .map(Dependency::Ready)
    }

    /// Resolves every descriptor, in declaration order
    ///
    /// Lazy descriptors become loaders, unless their value is already around.
    pub fn resolve_dependencies(
        &self,
        container: &Container,
        descriptors: &[Descriptor],
        owner: Option<TypeInfo>,
        path: &ResolutionPath,
    ) -> Result<Vec<Dependency>, ResolveError> {
        descriptors
            .iter()
            .map(|descriptor| {
                if !descriptor.is_lazy() {
                    return self.resolve(container, descriptor, owner, path);
                }

                if descriptor.get_provider().is_none() {
                    if let Some(instance) = container.get_dependency_if_initialized(descriptor) {
                        return Ok(Dependency::Ready(instance));
                    }
                }
                Ok(Dependency::Lazy(self.loader(container, descriptor, owner)))
            })
            .collect()
    }

    /// Resolves one descriptor
    ///
    /// A provider gets the first say, a value it can't supply falls back to the default.
    /// Without a provider only optional dependencies fall back, required ones must be bound.
    /// Failures of optional dependencies are swallowed either way.
    pub fn resolve(
        &self,
        container: &Container,
        descriptor: &Descriptor,
        owner: Option<TypeInfo>,
        path: &ResolutionPath,
    ) -> Result<Dependency, ResolveError> {
        let resolved = match descriptor.get_provider() {
            Some(provider) => match provider.provide(container, descriptor, owner) {
                Ok(Some(instance)) => Ok(Dependency::Ready(instance)),
                Ok(None) if descriptor.is_required() && descriptor.default().is_none() => {
                    Err(container.not_found(descriptor.key(), owner, None))
                }
                Ok(None) => Ok(Self::default_of(descriptor)),
                Err(error) => Err(error),
            },
            None => match container.find_in_scope(Lookup::Descriptor(descriptor), owner, path) {
                Ok(Some(dependency)) => Ok(dependency),
                Ok(None) if descriptor.is_required() => {
                    Err(container.not_found(descriptor.key(), owner, None))
                }
                Ok(None) => Ok(Self::default_of(descriptor)),
                Err(error) => Err(error),
            },
        };

        match resolved {
            Err(error) if !descriptor.is_required() => {
                tracing::debug!(
                    "Optional dependency '{}' failed, using its default: {error}",
                    descriptor.key()
                );
                Ok(Self::default_of(descriptor))
            }
            resolved => resolved,
        }
    }

    fn default_of(descriptor: &Descriptor) -> Dependency {
        match descriptor.default() {
            Some(instance) => Dependency::Ready(instance.clone()),
            None => Dependency::Absent,
        }
    }

    fn defer(&self, container: &Container, key: &str, path: &ResolutionPath) -> Pending {
        let container = container.downgrade();
        let slot = key.to_owned();
        let path = path.clone();

        Pending::new(key, move || {
            let container = container
                .upgrade()
                .ok_or_else(|| ResolveError::ScopeReleased { key: slot.clone() })?;
            container.settle(&slot, &path)
        })
    }

    fn loader(
        &self,
        container: &Container,
        descriptor: &Descriptor,
        owner: Option<TypeInfo>,
    ) -> LazyLoader {
        let container = container.downgrade();
        let descriptor = descriptor.clone();

        LazyLoader::new(move || {
            let Some(container) = container.upgrade() else {
                tracing::debug!("Container of lazy '{}' is gone", descriptor.key());
                return Ok(None);
            };
            tracing::debug!("Loading lazy '{}'", descriptor.key());

            let resolver = Arc::clone(container.resolver());
            resolver
                .resolve(&container, &descriptor, owner, &ResolutionPath::new())?
                .into_instance()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enter_stops_past_the_maximum_depth() {
        let mut path = ResolutionPath::new();
        for depth in 0..MAX_RESOLUTION_DEPTH {
            path = Resolver::enter(&path, &format!("key{depth}")).unwrap();
        }
        assert_eq!(path.len(), MAX_RESOLUTION_DEPTH);

        let error = Resolver::enter(&path, "one_too_many").unwrap_err();
        assert!(matches!(
            error,
            ResolveError::MaxResolutionDepth { max_depth: 32, path } if path.len() == 33
        ));
    }

    #[test]
    fn only_recipes_are_resolvable() {
        let resolver = Resolver::new();

        assert!(resolver.can_resolve_dependency(&Binding::recipe(Recipe::plain::<u8>())));
        assert!(!resolver.can_resolve_dependency(&Binding::value(crate::types::Instance::new(1_u8))));
    }
}
