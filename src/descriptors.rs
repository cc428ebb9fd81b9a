//! Framework-side service descriptors.

use std::fmt;
use std::sync::Arc;

use crate::error::DiResult;
use crate::keyed::ServiceKey;
use crate::lifetime::Lifetime;
use crate::provider::ResolverContext;
use crate::registration::{Activator, AnyArc, ConstraintFn, CtorFn, GenericCtorFn};
use crate::service_type::{GenericDefinition, ServiceType};

/// One framework-side registration, before it is copied into the registry.
///
/// Descriptors are what a [`ServiceCollection`](crate::ServiceCollection)
/// holds. They can be inspected for diagnostics or built by hand and added
/// with [`ServiceCollection::add`](crate::ServiceCollection::add).
///
/// # Examples
///
/// ```rust
/// use ferrous_bridge::{Lifetime, ServiceCollection, ServiceDescriptor};
/// use std::sync::Arc;
///
/// trait Logger: Send + Sync {}
/// struct ConsoleLogger;
/// impl Logger for ConsoleLogger {}
///
/// let mut services = ServiceCollection::new();
/// services.add_singleton(42u32);
/// services.add_keyed_singleton("port", 5432u32);
/// services.add_singleton_trait(Arc::new(ConsoleLogger) as Arc<dyn Logger>);
/// services.add(ServiceDescriptor::factory(Lifetime::Scoped, |_| String::from("req")));
///
/// let descriptors = services.descriptors();
/// assert_eq!(descriptors.len(), 4);
///
/// let keyed = descriptors.iter().find(|d| d.is_keyed()).unwrap();
/// assert_eq!(keyed.type_name(), "u32");
/// assert_eq!(keyed.key().unwrap().to_string(), "port");
///
/// let scoped = descriptors.iter().filter(|d| d.lifetime() == Lifetime::Scoped).count();
/// assert_eq!(scoped, 1);
/// ```
#[derive(Clone)]
pub struct ServiceDescriptor {
    service: ServiceType,
    implementation: ServiceType,
    lifetime: Lifetime,
    key: Option<ServiceKey>,
    pub(crate) activator: Activator,
}

impl ServiceDescriptor {
    fn closed(service: ServiceType, lifetime: Lifetime, ctor: Arc<CtorFn>) -> Self {
        Self {
            implementation: service.clone(),
            service,
            lifetime,
            key: None,
            activator: Activator::Closed(ctor),
        }
    }

    /// Singleton backed by an existing value.
    pub fn instance<T: Send + Sync + 'static>(value: T) -> Self {
        let value: AnyArc = Arc::new(value);
        Self::closed(
            ServiceType::of::<T>(),
            Lifetime::Singleton,
            Arc::new(move |_: &ResolverContext<'_>| -> DiResult<AnyArc> { Ok(value.clone()) }),
        )
    }

    /// Instances built by `factory` with the given lifetime.
    pub fn factory<T, F>(lifetime: Lifetime, factory: F) -> Self
    where
        T: Send + Sync + 'static,
        F: Fn(&ResolverContext<'_>) -> T + Send + Sync + 'static,
    {
        Self::closed(
            ServiceType::of::<T>(),
            lifetime,
            Arc::new(move |ctx: &ResolverContext<'_>| -> DiResult<AnyArc> {
                Ok(Arc::new(factory(ctx)))
            }),
        )
    }

    /// Singleton trait object backed by an existing value.
    pub fn trait_instance<T: ?Sized + Send + Sync + 'static>(value: Arc<T>) -> Self {
        let value: AnyArc = Arc::new(value);
        Self::closed(
            ServiceType::of::<T>(),
            Lifetime::Singleton,
            Arc::new(move |_: &ResolverContext<'_>| -> DiResult<AnyArc> { Ok(value.clone()) }),
        )
    }

    /// Trait objects built by `factory` with the given lifetime.
    pub fn trait_factory<T, F>(lifetime: Lifetime, factory: F) -> Self
    where
        T: ?Sized + Send + Sync + 'static,
        F: Fn(&ResolverContext<'_>) -> Arc<T> + Send + Sync + 'static,
    {
        Self::closed(
            ServiceType::of::<T>(),
            lifetime,
            Arc::new(move |ctx: &ResolverContext<'_>| -> DiResult<AnyArc> {
                Ok(Arc::new(factory(ctx)))
            }),
        )
    }

    /// Service known only by its runtime descriptor, such as a closed generic.
    ///
    /// `factory` returns the instance already type-erased.
    pub fn erased<F>(service: ServiceType, lifetime: Lifetime, factory: F) -> Self
    where
        F: Fn(&ResolverContext<'_>) -> DiResult<AnyArc> + Send + Sync + 'static,
    {
        Self::closed(service, lifetime, Arc::new(factory))
    }

    /// Open generic definition; `factory` gets the requested type arguments.
    pub fn open_generic<F>(definition: GenericDefinition, lifetime: Lifetime, factory: F) -> Self
    where
        F: Fn(&ResolverContext<'_>, &[ServiceType]) -> DiResult<AnyArc> + Send + Sync + 'static,
    {
        let ctor: Arc<GenericCtorFn> = Arc::new(factory);
        Self {
            service: definition.open(),
            implementation: definition.open(),
            lifetime,
            key: None,
            activator: Activator::OpenGeneric { ctor, constraint: None },
        }
    }

    /// Restricts the type arguments an open generic accepts. No effect on
    /// closed descriptors.
    pub fn with_constraint<F>(mut self, constraint: F) -> Self
    where
        F: Fn(&[ServiceType]) -> bool + Send + Sync + 'static,
    {
        if let Activator::OpenGeneric { constraint: slot, .. } = &mut self.activator {
            let constraint: Arc<ConstraintFn> = Arc::new(constraint);
            *slot = Some(constraint);
        }
        self
    }

    /// Registers the descriptor under `key`.
    pub fn with_key(mut self, key: impl Into<ServiceKey>) -> Self {
        self.key = Some(key.into());
        self
    }

    /// Records the implementation type of a closed descriptor.
    pub fn implemented_by<I: ?Sized + 'static>(mut self) -> Self {
        self.implementation = ServiceType::of::<I>();
        self
    }

    /// Records the implementing definition of an open generic descriptor.
    pub fn implemented_by_generic(mut self, definition: GenericDefinition) -> Self {
        self.implementation = definition.open();
        self
    }

    pub fn service(&self) -> &ServiceType {
        &self.service
    }

    pub fn implementation(&self) -> &ServiceType {
        &self.implementation
    }

    pub fn lifetime(&self) -> Lifetime {
        self.lifetime
    }

    pub fn key(&self) -> Option<&ServiceKey> {
        self.key.as_ref()
    }

    /// Readable service type name.
    pub fn type_name(&self) -> String {
        self.service.to_string()
    }

    pub fn is_keyed(&self) -> bool {
        self.key.is_some()
    }

    pub fn is_open_generic(&self) -> bool {
        self.implementation.is_generic_definition()
    }
}

impl fmt::Debug for ServiceDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceDescriptor")
            .field("service", &self.service.to_string())
            .field("implementation", &self.implementation.to_string())
            .field("lifetime", &self.lifetime)
            .field("key", &self.key)
            .finish()
    }
}
