//! Resolver traits for service resolution.

use std::any::type_name;
use std::sync::Arc;

use crate::error::{DiError, DiResult};
use crate::keyed::ServiceKey;
use crate::provider::ServiceList;
use crate::registration::AnyArc;
use crate::service_type::ServiceType;
use crate::traits::Dispose;

/// Core resolver trait for object-safe service resolution.
///
/// Implemented by [`ScopedServiceProvider`](crate::ScopedServiceProvider),
/// [`ServiceScope`](crate::ServiceScope) and the
/// [`ResolverContext`](crate::ResolverContext) handed to factories. Each
/// forces its own scope for the duration of the call.
///
/// Most users should use the [`Resolver`] trait instead, which provides
/// typed generic methods built on top of this one.
pub trait ResolverCore: Send + Sync {
    /// Resolves `service`, optionally keyed.
    ///
    /// A `None` key is the unkeyed path. With `optional` set, absence yields
    /// `Ok(None)`; otherwise it fails with [`DiError::NotRegistered`]. Any
    /// other failure propagates either way. A collection-shaped `service`
    /// resolves to a [`ServiceList`].
    fn resolve_service(
        &self,
        service: &ServiceType,
        key: Option<&ServiceKey>,
        optional: bool,
    ) -> DiResult<Option<AnyArc>>;

    /// Registers a synchronous disposal hook with the owning scope.
    fn push_disposer(&self, hook: Box<dyn FnOnce() + Send>);
}

fn downcast<T: Send + Sync + 'static>(any: AnyArc) -> DiResult<Arc<T>> {
    any.downcast::<T>()
        .map_err(|_| DiError::TypeMismatch(type_name::<T>().to_string()))
}

// Trait objects are stored as Arc<Arc<dyn Trait>>
fn downcast_trait<T: ?Sized + Send + Sync + 'static>(any: AnyArc) -> DiResult<Arc<T>> {
    any.downcast::<Arc<T>>()
        .map(|boxed| (*boxed).clone())
        .map_err(|_| DiError::TypeMismatch(type_name::<T>().to_string()))
}

fn into_list(any: AnyArc) -> DiResult<Arc<ServiceList>> {
    downcast::<ServiceList>(any)
}

/// High-level resolver interface with generic methods for type-safe service resolution.
///
/// Concrete services are resolved with the plain methods, trait objects with
/// the `_trait` variants. The `get*` methods return `Ok(None)` when nothing is
/// registered; the `get_required*` methods turn that into
/// [`DiError::NotRegistered`].
///
/// # Examples
///
/// ```
/// use ferrous_bridge::{ServiceCollection, Resolver};
/// use std::sync::Arc;
///
/// trait Logger: Send + Sync {
///     fn log(&self, msg: &str) -> String;
/// }
///
/// struct ConsoleLogger;
/// impl Logger for ConsoleLogger {
///     fn log(&self, msg: &str) -> String {
///         format!("LOG: {}", msg)
///     }
/// }
///
/// let mut collection = ServiceCollection::new();
/// collection.add_singleton(42usize);
/// collection.add_singleton_trait(Arc::new(ConsoleLogger) as Arc<dyn Logger>);
///
/// let provider = collection.build();
///
/// assert_eq!(*provider.get_required::<usize>().unwrap(), 42);
/// assert!(provider.get::<u8>().unwrap().is_none());
///
/// let logger = provider.get_required_trait::<dyn Logger>().unwrap();
/// assert_eq!(logger.log("ready"), "LOG: ready");
/// ```
pub trait Resolver: ResolverCore {
    /// Resolves a concrete service if one is registered.
    fn get<T: Send + Sync + 'static>(&self) -> DiResult<Option<Arc<T>>> {
        self.resolve_service(&ServiceType::of::<T>(), None, true)?
            .map(downcast::<T>)
            .transpose()
    }

    /// Resolves a concrete service.
    ///
    /// # Examples
    ///
    /// ```
    /// use ferrous_bridge::{DiError, ServiceCollection, Resolver};
    ///
    /// let mut collection = ServiceCollection::new();
    /// collection.add_singleton("configuration".to_string());
    ///
    /// let provider = collection.build();
    /// assert_eq!(&*provider.get_required::<String>().unwrap(), "configuration");
    /// assert!(matches!(provider.get_required::<u64>(), Err(DiError::NotRegistered(_))));
    /// ```
    fn get_required<T: Send + Sync + 'static>(&self) -> DiResult<Arc<T>> {
        let any = self
            .resolve_service(&ServiceType::of::<T>(), None, false)?
            .ok_or_else(|| DiError::NotRegistered(type_name::<T>().to_string()))?;
        downcast::<T>(any)
    }

    /// Resolves a trait object if one is registered.
    fn get_trait<T: ?Sized + Send + Sync + 'static>(&self) -> DiResult<Option<Arc<T>>> {
        self.resolve_service(&ServiceType::of::<T>(), None, true)?
            .map(downcast_trait::<T>)
            .transpose()
    }

    /// Resolves a trait object.
    fn get_required_trait<T: ?Sized + Send + Sync + 'static>(&self) -> DiResult<Arc<T>> {
        let any = self
            .resolve_service(&ServiceType::of::<T>(), None, false)?
            .ok_or_else(|| DiError::NotRegistered(type_name::<T>().to_string()))?;
        downcast_trait::<T>(any)
    }

    /// Resolves the concrete service registered under `key`, if any.
    fn get_keyed<T: Send + Sync + 'static>(&self, key: impl Into<ServiceKey>) -> DiResult<Option<Arc<T>>> {
        let key = key.into();
        self.resolve_service(&ServiceType::of::<T>(), Some(&key), true)?
            .map(downcast::<T>)
            .transpose()
    }

    /// Resolves the concrete service registered under `key`.
    ///
    /// # Examples
    ///
    /// ```
    /// use ferrous_bridge::{ServiceCollection, Resolver};
    ///
    /// let mut collection = ServiceCollection::new();
    /// collection.add_keyed_singleton("primary", "db-1".to_string());
    /// collection.add_keyed_singleton("replica", "db-2".to_string());
    ///
    /// let provider = collection.build();
    /// assert_eq!(&*provider.get_required_keyed::<String>("replica").unwrap(), "db-2");
    /// assert!(provider.get::<String>().unwrap().is_none());
    /// ```
    fn get_required_keyed<T: Send + Sync + 'static>(&self, key: impl Into<ServiceKey>) -> DiResult<Arc<T>> {
        let key = key.into();
        let any = self
            .resolve_service(&ServiceType::of::<T>(), Some(&key), false)?
            .ok_or_else(|| DiError::NotRegistered(format!("{} (key {})", type_name::<T>(), key)))?;
        downcast::<T>(any)
    }

    /// Resolves the trait object registered under `key`, if any.
    fn get_keyed_trait<T: ?Sized + Send + Sync + 'static>(
        &self,
        key: impl Into<ServiceKey>,
    ) -> DiResult<Option<Arc<T>>> {
        let key = key.into();
        self.resolve_service(&ServiceType::of::<T>(), Some(&key), true)?
            .map(downcast_trait::<T>)
            .transpose()
    }

    /// Resolves the trait object registered under `key`.
    fn get_required_keyed_trait<T: ?Sized + Send + Sync + 'static>(
        &self,
        key: impl Into<ServiceKey>,
    ) -> DiResult<Arc<T>> {
        let key = key.into();
        let any = self
            .resolve_service(&ServiceType::of::<T>(), Some(&key), false)?
            .ok_or_else(|| DiError::NotRegistered(format!("{} (key {})", type_name::<T>(), key)))?;
        downcast_trait::<T>(any)
    }

    /// Resolves every unkeyed registration of a concrete service, in
    /// registration order.
    fn get_all<T: Send + Sync + 'static>(&self) -> DiResult<Vec<Arc<T>>> {
        let service = ServiceType::collection_of(ServiceType::of::<T>());
        match self.resolve_service(&service, None, true)? {
            Some(any) => into_list(any)?.downcast::<T>(),
            None => Ok(Vec::new()),
        }
    }

    /// Resolves every unkeyed implementation of a trait, in registration order.
    ///
    /// # Examples
    ///
    /// ```
    /// use ferrous_bridge::{ServiceCollection, Resolver};
    /// use std::sync::Arc;
    ///
    /// trait Plugin: Send + Sync {
    ///     fn name(&self) -> &'static str;
    /// }
    /// struct Audit;
    /// struct Metrics;
    /// impl Plugin for Audit { fn name(&self) -> &'static str { "audit" } }
    /// impl Plugin for Metrics { fn name(&self) -> &'static str { "metrics" } }
    ///
    /// let mut collection = ServiceCollection::new();
    /// collection.add_singleton_trait(Arc::new(Audit) as Arc<dyn Plugin>);
    /// collection.add_singleton_trait(Arc::new(Metrics) as Arc<dyn Plugin>);
    ///
    /// let provider = collection.build();
    /// let names: Vec<_> = provider
    ///     .get_all_trait::<dyn Plugin>()
    ///     .unwrap()
    ///     .iter()
    ///     .map(|p| p.name())
    ///     .collect();
    /// assert_eq!(names, ["audit", "metrics"]);
    /// ```
    fn get_all_trait<T: ?Sized + Send + Sync + 'static>(&self) -> DiResult<Vec<Arc<T>>> {
        let service = ServiceType::collection_of(ServiceType::of::<T>());
        match self.resolve_service(&service, None, true)? {
            Some(any) => into_list(any)?.downcast_trait::<T>(),
            None => Ok(Vec::new()),
        }
    }

    /// Resolves every registration of a concrete service under `key`, in
    /// registration order.
    fn get_keyed_all<T: Send + Sync + 'static>(&self, key: impl Into<ServiceKey>) -> DiResult<Vec<Arc<T>>> {
        let key = key.into();
        let service = ServiceType::collection_of(ServiceType::of::<T>());
        match self.resolve_service(&service, Some(&key), true)? {
            Some(any) => into_list(any)?.downcast::<T>(),
            None => Ok(Vec::new()),
        }
    }

    /// Registers a service for disposal with the owning scope.
    ///
    /// Call this from factories. Hooks run in LIFO order when the scope is
    /// disposed.
    fn register_disposer<T: Dispose>(&self, service: Arc<T>) {
        self.push_disposer(Box::new(move || service.dispose()));
    }
}

impl<R: ResolverCore + ?Sized> Resolver for R {}
