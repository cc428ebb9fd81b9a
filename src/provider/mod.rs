//! The scoped resolution engine.
//!
//! [`ScopedServiceProvider`] answers framework-style requests against any
//! [`ComponentRegistry`]. Every call runs with the provider's scope forced as
//! ambient, hides keyed registrations from unkeyed lookups, and arbitrates
//! between several unkeyed candidates by their provenance.

use std::fmt;
use std::sync::Arc;

use crate::error::{DiError, DiResult};
use crate::keyed::{KeyedRegistrationIndex, ServiceKey};
use crate::registration::{AnyArc, RegistrationHandle};
use crate::registry::ComponentRegistry;
use crate::scope::{Scope, ScopeStore};
use crate::service_type::ServiceType;
use crate::traits::ResolverCore;

pub mod context;
pub mod enumeration;
pub mod precedence;
pub mod scope;

pub use context::ResolverContext;
pub use enumeration::ServiceList;
pub use precedence::{arbitrate, Precedence};
pub use scope::ServiceScope;

/// Service provider bound to one scope of a registry.
///
/// The scope is captured when the provider is created: the ambient scope of
/// the creating flow, or the Root when none is forced. Cloning is cheap.
///
/// # Examples
///
/// ```
/// use ferrous_bridge::{ServiceCollection, ServiceType, ServiceKey};
///
/// let mut services = ServiceCollection::new();
/// services.add_singleton(5u8);
/// services.add_keyed_singleton("big", 250u8);
/// let provider = services.build();
///
/// let small = provider.get_required_service(&ServiceType::of::<u8>()).unwrap();
/// assert_eq!(*small.downcast::<u8>().unwrap(), 5);
///
/// let key = ServiceKey::from("big");
/// let big = provider.get_keyed_service(&ServiceType::of::<u8>(), Some(&key)).unwrap().unwrap();
/// assert_eq!(*big.downcast::<u8>().unwrap(), 250);
///
/// assert!(provider.is_service(&ServiceType::of::<u8>()));
/// assert!(provider.is_keyed_service(&ServiceType::of::<u8>(), Some(&key)));
/// assert!(!provider.is_keyed_service(&ServiceType::of::<u8>(), Some(&ServiceKey::from("huge"))));
/// ```
#[derive(Clone)]
pub struct ScopedServiceProvider {
    registry: Arc<dyn ComponentRegistry>,
    scope: Scope,
}

impl ScopedServiceProvider {
    /// Creates a provider over `registry`, bound to the current ambient scope.
    pub fn new(registry: Arc<dyn ComponentRegistry>) -> Self {
        let root = registry.root_scope();
        let scope = ScopeStore::current(&root);
        Self { registry, scope }
    }

    pub(crate) fn with_scope(registry: Arc<dyn ComponentRegistry>, scope: Scope) -> Self {
        Self { registry, scope }
    }

    /// Scope this provider resolves in.
    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    pub fn registry(&self) -> &Arc<dyn ComponentRegistry> {
        &self.registry
    }

    fn engine<R>(&self, f: impl FnOnce(Resolution<'_>) -> R) -> R {
        let _forced = ScopeStore::force_scope(&self.scope);
        f(Resolution::new(&*self.registry))
    }

    /// Resolves `service`, or `None` when nothing unkeyed is registered.
    pub fn get_service(&self, service: &ServiceType) -> DiResult<Option<AnyArc>> {
        self.engine(|engine| engine.resolve(service, None, true))
    }

    /// Resolves `service`, failing with [`DiError::NotRegistered`] when absent.
    pub fn get_required_service(&self, service: &ServiceType) -> DiResult<AnyArc> {
        self.engine(|engine| engine.resolve(service, None, false))?
            .ok_or_else(|| DiError::NotRegistered(service.to_string()))
    }

    /// Resolves `service` under `key`. A `None` key is [`get_service`](Self::get_service).
    pub fn get_keyed_service(&self, service: &ServiceType, key: Option<&ServiceKey>) -> DiResult<Option<AnyArc>> {
        self.engine(|engine| engine.resolve(service, key, true))
    }

    /// Resolves `service` under `key`, failing when absent.
    pub fn get_required_keyed_service(&self, service: &ServiceType, key: Option<&ServiceKey>) -> DiResult<AnyArc> {
        self.engine(|engine| engine.resolve(service, key, false))?
            .ok_or_else(|| DiError::NotRegistered(service.to_string()))
    }

    /// Whether `service` can be resolved.
    ///
    /// Open generic definitions never are. A collection shape is a service
    /// when its element type, or a service its element implements, is.
    ///
    /// "Services its element implements" means service types of registrations
    /// whose implementation is the element type
    /// ([`ComponentRegistry::services_implemented_by`]). An element that
    /// implements a registered trait without being registered as an
    /// implementation itself does not count.
    pub fn is_service(&self, service: &ServiceType) -> bool {
        Resolution::new(&*self.registry).is_service(service)
    }

    /// Whether anything is registered under `key`, for any service type.
    /// A `None` key is [`is_service`](Self::is_service).
    pub fn is_keyed_service(&self, service: &ServiceType, key: Option<&ServiceKey>) -> bool {
        Resolution::new(&*self.registry).is_keyed_service(service, key)
    }

    /// Creates a nested scope under this provider's scope.
    ///
    /// The ambient binding is left alone; the returned scope's provider
    /// forces the nested scope for its own calls.
    pub fn create_scope(&self) -> ServiceScope {
        let child = self.scope.create_child();
        ServiceScope::new(Self::with_scope(self.registry.clone(), child))
    }

    /// Disposes this provider's scope.
    ///
    /// For the root provider that tears down everything the Root tracks,
    /// singletons included. Idempotent.
    pub fn dispose(&self) {
        self.scope.dispose();
    }
}

impl ResolverCore for ScopedServiceProvider {
    fn resolve_service(
        &self,
        service: &ServiceType,
        key: Option<&ServiceKey>,
        optional: bool,
    ) -> DiResult<Option<AnyArc>> {
        self.engine(|engine| engine.resolve(service, key, optional))
    }

    fn push_disposer(&self, hook: Box<dyn FnOnce() + Send>) {
        self.scope.push_disposer(hook);
    }
}

impl fmt::Debug for ScopedServiceProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScopedServiceProvider")
            .field("registry", &self.registry.registry_id())
            .field("scope", &self.scope)
            .finish()
    }
}

/// One resolution against a registry, under whatever scope is ambient.
pub(crate) struct Resolution<'a> {
    registry: &'a dyn ComponentRegistry,
}

impl<'a> Resolution<'a> {
    pub(crate) fn new(registry: &'a dyn ComponentRegistry) -> Self {
        Self { registry }
    }

    pub(crate) fn resolve(
        &self,
        service: &ServiceType,
        key: Option<&ServiceKey>,
        optional: bool,
    ) -> DiResult<Option<AnyArc>> {
        match key {
            None => self.resolve_unkeyed(service, optional),
            Some(key) => self.resolve_keyed(service, key, optional),
        }
    }

    fn resolve_unkeyed(&self, service: &ServiceType, optional: bool) -> DiResult<Option<AnyArc>> {
        if let Some(element) = service.collection_element() {
            let list = enumeration::resolve_all(self.registry, element)?;
            return Ok(Some(Arc::new(list) as AnyArc));
        }

        let candidates: Vec<Arc<RegistrationHandle>> = self
            .registry
            .handlers(service)
            .into_iter()
            .filter(|handle| !handle.is_keyed())
            .collect();

        match candidates.as_slice() {
            [] if optional => Ok(None),
            [] => Err(DiError::NotRegistered(service.to_string())),
            [only] => self.registry.resolve_by_name(only.name(), service).map(Some),
            _ => {
                let decision = arbitrate(&candidates);
                let selected = match decision {
                    Precedence::Selected(handle) => handle.name(),
                    Precedence::Native => "<registry default>",
                };
                tracing::debug!(
                    service = %service,
                    candidates = candidates.len(),
                    rule = decision.rule(),
                    selected,
                    "arbitrated ambiguous service"
                );
                match decision {
                    Precedence::Native => self.registry.resolve(service).map(Some),
                    Precedence::Selected(handle) => self.registry.resolve_by_name(handle.name(), service).map(Some),
                }
            }
        }
    }

    fn resolve_keyed(&self, service: &ServiceType, key: &ServiceKey, optional: bool) -> DiResult<Option<AnyArc>> {
        let index = KeyedRegistrationIndex::get_instance(self.registry);

        if self.registry.has_component(service) {
            if let Some(entry) = index.get_key(self.registry, key, service) {
                return entry.resolve(self.registry, service).map(Some);
            }
        }

        if let Some(element) = service.collection_element() {
            let entries: Vec<_> = index
                .get_keyed_registrations(self.registry, element)
                .iter()
                .filter(|entry| &entry.key == key)
                .cloned()
                .collect();
            if !entries.is_empty() {
                let mut items = Vec::with_capacity(entries.len());
                for entry in &entries {
                    match entry.resolve(self.registry, element) {
                        Ok(instance) => items.push(instance),
                        Err(err) if err.is_generic_mismatch() => continue,
                        Err(err) => return Err(err),
                    }
                }
                return Ok(Some(Arc::new(ServiceList::new(element.clone(), items)) as AnyArc));
            }
        }

        if optional {
            Ok(None)
        } else {
            Err(DiError::NotRegistered(format!("{} (key {})", service, key)))
        }
    }

    pub(crate) fn is_service(&self, service: &ServiceType) -> bool {
        if service.is_generic_definition() {
            return false;
        }
        if let Some(element) = service.collection_element() {
            return self.registry.has_component(element)
                || self
                    .registry
                    .services_implemented_by(element)
                    .iter()
                    .any(|implemented| self.registry.has_component(implemented));
        }
        self.registry.has_component(service)
    }

    pub(crate) fn is_keyed_service(&self, service: &ServiceType, key: Option<&ServiceKey>) -> bool {
        match key {
            None => self.is_service(service),
            Some(key) => KeyedRegistrationIndex::get_instance(self.registry).has_key(self.registry, key),
        }
    }
}
