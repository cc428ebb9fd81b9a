//! Framework-side service collection.
//!
//! A [`ServiceCollection`] records registrations as
//! [`ServiceDescriptor`]s. Building it copies them into a fresh [`Kernel`](crate::Kernel)
//! through [`ServiceProviderFactory`] and returns the root provider.

use std::sync::Arc;

use crate::descriptors::ServiceDescriptor;
use crate::error::DiResult;
use crate::factory::ServiceProviderFactory;
use crate::keyed::ServiceKey;
use crate::lifetime::Lifetime;
use crate::provider::{ResolverContext, ScopedServiceProvider};
use crate::registration::AnyArc;
use crate::service_type::{GenericDefinition, ServiceType};

/// Ordered list of framework-side registrations.
///
/// Later registrations of the same service win single-service lookups;
/// every unkeyed registration takes part in enumeration.
///
/// # Examples
///
/// ```rust
/// use ferrous_bridge::{ServiceCollection, Resolver};
///
/// let mut services = ServiceCollection::new();
/// services.add_singleton(String::from("first"));
/// services.add_singleton(String::from("second"));
///
/// let provider = services.build();
/// assert_eq!(&*provider.get_required::<String>().unwrap(), "second");
/// assert_eq!(provider.get_all::<String>().unwrap().len(), 2);
/// ```
#[derive(Clone, Default)]
pub struct ServiceCollection {
    descriptors: Vec<ServiceDescriptor>,
}

impl ServiceCollection {
    /// Creates a new empty service collection.
    pub fn new() -> Self {
        Self::default()
    }

    // ----- Concrete Type Registrations -----

    /// Registers a singleton instance.
    ///
    /// ```rust
    /// # use ferrous_bridge::ServiceCollection;
    /// struct Config {
    ///     database_url: String,
    /// }
    ///
    /// let mut services = ServiceCollection::new();
    /// services.add_singleton(Config {
    ///     database_url: "postgres://localhost".to_string(),
    /// });
    /// ```
    pub fn add_singleton<T: Send + Sync + 'static>(&mut self, value: T) -> &mut Self {
        self.add(ServiceDescriptor::instance(value))
    }

    /// Registers a singleton built on first request.
    pub fn add_singleton_factory<T, F>(&mut self, factory: F) -> &mut Self
    where
        T: Send + Sync + 'static,
        F: Fn(&ResolverContext<'_>) -> T + Send + Sync + 'static,
    {
        self.add(ServiceDescriptor::factory(Lifetime::Singleton, factory))
    }

    /// Registers a factory producing one instance per scope.
    ///
    /// Requests made outside any entered scope share the Root's instance.
    pub fn add_scoped_factory<T, F>(&mut self, factory: F) -> &mut Self
    where
        T: Send + Sync + 'static,
        F: Fn(&ResolverContext<'_>) -> T + Send + Sync + 'static,
    {
        self.add(ServiceDescriptor::factory(Lifetime::Scoped, factory))
    }

    /// Registers a factory called on every request.
    pub fn add_transient_factory<T, F>(&mut self, factory: F) -> &mut Self
    where
        T: Send + Sync + 'static,
        F: Fn(&ResolverContext<'_>) -> T + Send + Sync + 'static,
    {
        self.add(ServiceDescriptor::factory(Lifetime::Transient, factory))
    }

    // ----- Trait Registrations -----

    /// Registers a singleton trait object.
    ///
    /// ```rust
    /// # use ferrous_bridge::{ServiceCollection, Resolver};
    /// # use std::sync::Arc;
    /// trait Clock: Send + Sync {
    ///     fn now(&self) -> u64;
    /// }
    /// struct Fixed;
    /// impl Clock for Fixed {
    ///     fn now(&self) -> u64 { 7 }
    /// }
    ///
    /// let mut services = ServiceCollection::new();
    /// services.add_singleton_trait(Arc::new(Fixed) as Arc<dyn Clock>);
    /// let clock = services.build().get_required_trait::<dyn Clock>().unwrap();
    /// assert_eq!(clock.now(), 7);
    /// ```
    pub fn add_singleton_trait<T>(&mut self, value: Arc<T>) -> &mut Self
    where
        T: ?Sized + Send + Sync + 'static,
    {
        self.add(ServiceDescriptor::trait_instance(value))
    }

    /// Registers a trait object factory with the given lifetime.
    pub fn add_trait_factory<T, F>(&mut self, lifetime: Lifetime, factory: F) -> &mut Self
    where
        T: ?Sized + Send + Sync + 'static,
        F: Fn(&ResolverContext<'_>) -> Arc<T> + Send + Sync + 'static,
    {
        self.add(ServiceDescriptor::trait_factory(lifetime, factory))
    }

    // ----- Keyed Registrations -----

    /// Registers a singleton instance under `key`.
    pub fn add_keyed_singleton<T: Send + Sync + 'static>(
        &mut self,
        key: impl Into<ServiceKey>,
        value: T,
    ) -> &mut Self {
        self.add(ServiceDescriptor::instance(value).with_key(key))
    }

    /// Registers a factory under `key`.
    ///
    /// The factory can read the key through [`ResolverContext::service_key`].
    ///
    /// ```rust
    /// # use ferrous_bridge::{Lifetime, ServiceCollection, Resolver};
    /// struct Queue(String);
    ///
    /// let mut services = ServiceCollection::new();
    /// for name in ["orders", "emails"] {
    ///     services.add_keyed_factory(name, Lifetime::Singleton, |ctx| {
    ///         Queue(ctx.service_key().map(|k| k.to_string()).unwrap_or_default())
    ///     });
    /// }
    ///
    /// let provider = services.build();
    /// assert_eq!(provider.get_required_keyed::<Queue>("emails").unwrap().0, "emails");
    /// ```
    pub fn add_keyed_factory<T, F>(&mut self, key: impl Into<ServiceKey>, lifetime: Lifetime, factory: F) -> &mut Self
    where
        T: Send + Sync + 'static,
        F: Fn(&ResolverContext<'_>) -> T + Send + Sync + 'static,
    {
        self.add(ServiceDescriptor::factory(lifetime, factory).with_key(key))
    }

    /// Registers a trait object factory under `key`.
    pub fn add_keyed_trait_factory<T, F>(
        &mut self,
        key: impl Into<ServiceKey>,
        lifetime: Lifetime,
        factory: F,
    ) -> &mut Self
    where
        T: ?Sized + Send + Sync + 'static,
        F: Fn(&ResolverContext<'_>) -> Arc<T> + Send + Sync + 'static,
    {
        self.add(ServiceDescriptor::trait_factory(lifetime, factory).with_key(key))
    }

    // ----- Open Generics -----

    /// Registers an open generic definition.
    ///
    /// The factory receives the arguments of the closed type being requested.
    pub fn add_open_generic<F>(&mut self, definition: GenericDefinition, lifetime: Lifetime, factory: F) -> &mut Self
    where
        F: Fn(&ResolverContext<'_>, &[ServiceType]) -> DiResult<AnyArc> + Send + Sync + 'static,
    {
        self.add(ServiceDescriptor::open_generic(definition, lifetime, factory))
    }

    /// Registers an open generic definition that only closes over arguments
    /// accepted by `constraint`.
    pub fn add_open_generic_constrained<C, F>(
        &mut self,
        definition: GenericDefinition,
        lifetime: Lifetime,
        constraint: C,
        factory: F,
    ) -> &mut Self
    where
        C: Fn(&[ServiceType]) -> bool + Send + Sync + 'static,
        F: Fn(&ResolverContext<'_>, &[ServiceType]) -> DiResult<AnyArc> + Send + Sync + 'static,
    {
        self.add(ServiceDescriptor::open_generic(definition, lifetime, factory).with_constraint(constraint))
    }

    /// Appends a prepared descriptor.
    pub fn add(&mut self, descriptor: ServiceDescriptor) -> &mut Self {
        self.descriptors.push(descriptor);
        self
    }

    /// Registered descriptors, in registration order.
    pub fn descriptors(&self) -> &[ServiceDescriptor] {
        &self.descriptors
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }

    pub(crate) fn into_descriptors(self) -> Vec<ServiceDescriptor> {
        self.descriptors
    }

    /// Copies the collection into a new registry and returns its root provider.
    pub fn build(self) -> ScopedServiceProvider {
        let factory = ServiceProviderFactory::new();
        let kernel = factory.create_builder(self);
        factory.create_service_provider(&kernel)
    }
}
