use std::fmt::Debug;

use crate::{
    container::Container,
    dependency::{Arguments, Dependencies, Dependency},
    descriptor::Descriptor,
    errors::{BindError, ResolveError},
    types::{DynError, Injectable, Instance, TypeInfo},
};

/// A type built by passing its resolved dependencies to a constructor
pub trait Constructible: Injectable + Sized {
    /// Dependencies in the order `construct` takes them
    fn descriptors() -> Vec<Descriptor>;

    /// Builds the instance
    ///
    /// Arguments arrive in the order of [Constructible::descriptors].
    fn construct(arguments: Arguments) -> Result<Self, DynError>;
}

/// A type that is default constructed and then injected property by property
pub trait InjectDependencies: Injectable + Default {
    /// Dependencies keyed by their property name
    fn descriptors() -> Vec<Descriptor>;

    fn inject_dependencies(&mut self, dependencies: Dependencies) -> Result<(), DynError>;

    /// Called once every property has been injected
    fn initialize_after_inject(&mut self) -> Result<(), DynError> {
        Ok(())
    }
}

/// A type that pulls its own dependencies from the container
pub trait AutoResolve: Injectable + Default {
    fn resolve_dependencies(&mut self, container: &Container) -> Result<(), DynError>;
}

enum Build {
    Constructor(fn(Arguments) -> Result<Instance, DynError>),
    Inject(fn(Dependencies) -> Result<Instance, DynError>),
    AutoResolve(fn(&Container) -> Result<Instance, DynError>),
    Plain(fn() -> Instance),
}

/// How to build one instance of a type
pub struct Recipe {
    target: TypeInfo,
    use_constructor: bool,
    descriptors: Vec<Descriptor>,
    build: Build,
}
impl Debug for Recipe {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Recipe")
            .field("target", &self.target.type_name)
            .field("use_constructor", &self.use_constructor)
            .field("descriptors", &self.descriptors)
            .finish()
    }
}

impl Recipe {
    /// Constructor injection
    pub fn constructor<T: Constructible>() -> Self {
        fn build<T: Constructible>(arguments: Arguments) -> Result<Instance, DynError> {
            T::construct(arguments).map(Instance::new)
        }

        Recipe {
            target: TypeInfo::of::<T>(),
            use_constructor: true,
            descriptors: T::descriptors(),
            build: Build::Constructor(build::<T>),
        }
    }

    /// Property injection
    pub fn injectable<T: InjectDependencies>() -> Self {
        fn build<T: InjectDependencies>(dependencies: Dependencies) -> Result<Instance, DynError> {
            let mut instance = T::default();
            instance.inject_dependencies(dependencies)?;
            instance.initialize_after_inject()?;
            Ok(Instance::new(instance))
        }

        Recipe {
            target: TypeInfo::of::<T>(),
            use_constructor: false,
            descriptors: T::descriptors(),
            build: Build::Inject(build::<T>),
        }
    }

    /// The instance resolves its own dependencies
    pub fn auto_resolving<T: AutoResolve>() -> Self {
        fn build<T: AutoResolve>(container: &Container) -> Result<Instance, DynError> {
            let mut instance = T::default();
            instance.resolve_dependencies(container)?;
            Ok(Instance::new(instance))
        }

        Recipe {
            target: TypeInfo::of::<T>(),
            use_constructor: false,
            descriptors: Vec::new(),
            build: Build::AutoResolve(build::<T>),
        }
    }

    /// A bare default instance, nothing injected
    pub fn plain<T: Injectable + Default>() -> Self {
        fn build<T: Injectable + Default>() -> Instance {
            Instance::new(T::default())
        }

        Recipe {
            target: TypeInfo::of::<T>(),
            use_constructor: false,
            descriptors: Vec::new(),
            build: Build::Plain(build::<T>),
        }
    }

    /// Replaces the extracted descriptors
    pub fn with_descriptors(mut self, descriptors: Vec<Descriptor>) -> Self {
        self.descriptors = descriptors;
        self
    }

    pub fn target(&self) -> TypeInfo {
        self.target
    }

    pub fn use_constructor(&self) -> bool {
        self.use_constructor
    }

    pub fn descriptors(&self) -> &[Descriptor] {
        &self.descriptors
    }

    /// Checks descriptor invariants
    pub(crate) fn validate(&self) -> Result<(), BindError> {
        for descriptor in &self.descriptors {
            if descriptor.is_lazy() && descriptor.types().len() > 1 {
                return Err(BindError::AmbiguousLazyType {
                    product: self.target.type_name,
                    key: descriptor.key().to_owned(),
                    types: descriptor.types().to_vec(),
                });
            }
        }
        Ok(())
    }

    /// Builds the target from dependencies resolved for [Recipe::descriptors]
    pub(crate) fn instantiate(
        &self,
        key: &str,
        container: &Container,
        resolved: Vec<Dependency>,
    ) -> Result<Instance, ResolveError> {
        let product = self.target.type_name;
        let result = match self.build {
            Build::Constructor(construct) => {
                let entries = self
                    .descriptors
                    .iter()
                    .map(|descriptor| descriptor.key().to_owned())
                    .zip(resolved)
                    .collect();
                construct(Arguments::new(product, container.label(), entries))
            }
            Build::Inject(inject) => {
                let entries = self
                    .descriptors
                    .iter()
                    .map(|descriptor| descriptor.property_name().to_owned())
                    .zip(resolved)
                    .collect();
                inject(Dependencies::new(product, container.label(), entries))
            }
            Build::AutoResolve(resolve) => resolve(container),
            Build::Plain(build) => Ok(build()),
        };

        result.map_err(|error| ResolveError::construction(product, key, error))
    }
}
