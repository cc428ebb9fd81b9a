//! Keyed services and the lazily built keyed-registration index.
//!
//! Keyed registrations are ordinary components whose name starts with
//! [`KEYED_REGISTRATION_PREFIX`](crate::KEYED_REGISTRATION_PREFIX) and whose
//! handle carries a [`ServiceKey`]. The index maps `(key, service type)` to the
//! handle to resolve, and is built from registry metadata the first time a
//! keyed lookup touches a given service type.
//!
//! The per-type entries do not observe later registry changes: components
//! registered after the first keyed lookup for a type stay invisible to keyed
//! lookups of that type. Key membership ([`KeyedRegistrationIndex::has_key`])
//! is always read live.

use std::fmt;
use std::sync::Arc;

use once_cell::sync::OnceCell;
use parking_lot::RwLock;

use crate::error::DiResult;
use crate::internal::FastMap;
use crate::registration::{AnyArc, RegistrationHandle};
use crate::registry::{ComponentRegistry, RegistryId};
use crate::service_type::ServiceType;

/// Discriminator value for keyed services.
///
/// # Examples
///
/// ```rust
/// use ferrous_bridge::ServiceKey;
///
/// assert_eq!(ServiceKey::from("primary"), ServiceKey::from(String::from("primary")));
/// assert_ne!(ServiceKey::from(1), ServiceKey::from("1"));
/// assert_eq!(ServiceKey::from(7).to_string(), "7");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ServiceKey {
    Str(Arc<str>),
    Int(i64),
}

impl fmt::Display for ServiceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServiceKey::Str(s) => f.write_str(s),
            ServiceKey::Int(i) => write!(f, "{}", i),
        }
    }
}

impl From<&str> for ServiceKey {
    fn from(value: &str) -> Self {
        ServiceKey::Str(Arc::from(value))
    }
}

impl From<String> for ServiceKey {
    fn from(value: String) -> Self {
        ServiceKey::Str(Arc::from(value))
    }
}

impl From<&ServiceKey> for ServiceKey {
    fn from(value: &ServiceKey) -> Self {
        value.clone()
    }
}

impl From<i64> for ServiceKey {
    fn from(value: i64) -> Self {
        ServiceKey::Int(value)
    }
}

impl From<i32> for ServiceKey {
    fn from(value: i32) -> Self {
        ServiceKey::Int(value as i64)
    }
}

impl From<u32> for ServiceKey {
    fn from(value: u32) -> Self {
        ServiceKey::Int(value as i64)
    }
}

/// A keyed handle found in the index.
#[derive(Debug, Clone)]
pub struct KeyedRegistration {
    pub key: ServiceKey,
    pub handle: Arc<RegistrationHandle>,
}

impl KeyedRegistration {
    /// Resolves this registration as `requested` through the registry.
    pub fn resolve(&self, registry: &dyn ComponentRegistry, requested: &ServiceType) -> DiResult<AnyArc> {
        registry.resolve_by_name(self.handle.name(), requested)
    }
}

type TypeEntries = Arc<OnceCell<Arc<[KeyedRegistration]>>>;

/// Derived `(key, service type) -> registration` index for one registry.
///
/// Each registry owns its index and hands it out through
/// [`ComponentRegistry::keyed_index`]. Entries for a service type are built
/// once, on the first keyed query for that type; concurrent first queries
/// race to a single winner and every later reader shares the result.
pub struct KeyedRegistrationIndex {
    registry: RegistryId,
    by_type: RwLock<FastMap<ServiceType, TypeEntries>>,
}

impl KeyedRegistrationIndex {
    /// An empty index for the registry `registry`.
    pub fn new(registry: RegistryId) -> Self {
        Self {
            registry,
            by_type: RwLock::new(FastMap::default()),
        }
    }

    /// The index owned by `registry`.
    pub fn get_instance(registry: &dyn ComponentRegistry) -> Arc<Self> {
        registry.keyed_index()
    }

    pub fn registry_id(&self) -> RegistryId {
        self.registry
    }

    fn entries_cell(&self, service: &ServiceType) -> TypeEntries {
        if let Some(cell) = self.by_type.read().get(service) {
            return cell.clone();
        }
        self.by_type.write().entry(service.clone()).or_default().clone()
    }

    /// Every keyed registration for `service`, in registration order.
    pub fn get_keyed_registrations(
        &self,
        registry: &dyn ComponentRegistry,
        service: &ServiceType,
    ) -> Arc<[KeyedRegistration]> {
        self.entries_cell(service)
            .get_or_init(|| {
                registry
                    .handlers(service)
                    .into_iter()
                    .filter(|handle| handle.is_keyed())
                    .filter_map(|handle| {
                        let key = handle.service_key()?.clone();
                        Some(KeyedRegistration { key, handle })
                    })
                    .collect()
            })
            .clone()
    }

    /// The registration to use for `(key, service)`.
    ///
    /// When several registrations share the key the most recent one wins.
    pub fn get_key(
        &self,
        registry: &dyn ComponentRegistry,
        key: &ServiceKey,
        service: &ServiceType,
    ) -> Option<KeyedRegistration> {
        self.get_keyed_registrations(registry, service)
            .iter()
            .rev()
            .find(|entry| &entry.key == key)
            .cloned()
    }

    /// True if any registration, for any service type, carries `key`.
    ///
    /// Read from the registry on every call, so keys registered for types
    /// no keyed lookup has touched yet are seen.
    pub fn has_key(&self, registry: &dyn ComponentRegistry, key: &ServiceKey) -> bool {
        registry
            .registrations()
            .iter()
            .any(|handle| handle.is_keyed() && handle.service_key() == Some(key))
    }
}

impl fmt::Debug for KeyedRegistrationIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyedRegistrationIndex")
            .field("registry", &self.registry)
            .field("types", &self.by_type.read().len())
            .finish()
    }
}
