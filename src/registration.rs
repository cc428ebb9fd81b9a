//! Registration handles and activators.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use crate::error::DiResult;
use crate::keyed::ServiceKey;
use crate::lifetime::Lifetime;
use crate::provider::ResolverContext;
use crate::service_type::ServiceType;

/// Type-erased instance as stored and returned by the registry.
pub type AnyArc = Arc<dyn Any + Send + Sync>;

/// Name prefix marking a registration as keyed.
///
/// Keyed registrations are invisible to unkeyed lookups and enumeration.
pub const KEYED_REGISTRATION_PREFIX: &str = "keyed@";

pub(crate) type CtorFn = dyn for<'a> Fn(&ResolverContext<'a>) -> DiResult<AnyArc> + Send + Sync;
pub(crate) type GenericCtorFn =
    dyn for<'a> Fn(&ResolverContext<'a>, &[ServiceType]) -> DiResult<AnyArc> + Send + Sync;
pub(crate) type ConstraintFn = dyn Fn(&[ServiceType]) -> bool + Send + Sync;

/// How a registration produces its instance.
#[derive(Clone)]
pub(crate) enum Activator {
    /// Constructor for a closed implementation
    Closed(Arc<CtorFn>),
    /// Constructor for an open generic implementation, receiving the
    /// arguments of the requested closed type
    OpenGeneric {
        ctor: Arc<GenericCtorFn>,
        constraint: Option<Arc<ConstraintFn>>,
    },
}

/// Where a registration came from.
///
/// Drives precedence arbitration: an ambiguous set that contains at least one
/// [`Provenance::Adapter`] registration resolves last-wins, otherwise the
/// registry's own rule applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Provenance {
    /// Registered directly against the native registry
    Native,
    /// Copied from a [`ServiceCollection`](crate::ServiceCollection) by the adapter
    Adapter,
}

/// Read-only metadata for one component in the registry.
///
/// Handles are immutable once added, owned by the registry and observed by
/// the resolution engine. Identity is (service, implementation, name).
///
/// # Examples
///
/// ```rust
/// use ferrous_bridge::{RegistrationHandle, ServiceType, Provenance, KEYED_REGISTRATION_PREFIX};
///
/// let handle = RegistrationHandle::new(
///     ServiceType::of::<u32>(),
///     ServiceType::of::<u32>(),
///     format!("{}primary/u32", KEYED_REGISTRATION_PREFIX),
/// )
/// .with_provenance(Provenance::Adapter);
///
/// assert!(handle.is_keyed());
/// assert!(!handle.is_open_generic());
/// assert_eq!(handle.provenance(), Provenance::Adapter);
/// ```
#[derive(Clone)]
pub struct RegistrationHandle {
    service: ServiceType,
    implementation: ServiceType,
    name: String,
    lifetime: Lifetime,
    provenance: Provenance,
    is_default: bool,
    service_key: Option<ServiceKey>,
    sequence: u64,
}

impl RegistrationHandle {
    /// Creates a native singleton handle with the given identity.
    pub fn new(service: ServiceType, implementation: ServiceType, name: impl Into<String>) -> Self {
        Self {
            service,
            implementation,
            name: name.into(),
            lifetime: Lifetime::Singleton,
            provenance: Provenance::Native,
            is_default: false,
            service_key: None,
            sequence: 0,
        }
    }

    pub fn with_lifetime(mut self, lifetime: Lifetime) -> Self {
        self.lifetime = lifetime;
        self
    }

    pub fn with_provenance(mut self, provenance: Provenance) -> Self {
        self.provenance = provenance;
        self
    }

    pub fn with_default(mut self, is_default: bool) -> Self {
        self.is_default = is_default;
        self
    }

    pub fn with_service_key(mut self, key: Option<ServiceKey>) -> Self {
        self.service_key = key;
        self
    }

    /// Position in registration order, assigned by the registry.
    pub fn with_sequence(mut self, sequence: u64) -> Self {
        self.sequence = sequence;
        self
    }

    /// Declared service type.
    pub fn service(&self) -> &ServiceType {
        &self.service
    }

    /// Implementation type backing the service.
    pub fn implementation(&self) -> &ServiceType {
        &self.implementation
    }

    /// Stable registration name, unique within a registry.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn lifetime(&self) -> Lifetime {
        self.lifetime
    }

    pub fn provenance(&self) -> Provenance {
        self.provenance
    }

    /// Whether the native registry should prefer this handle.
    pub fn is_default(&self) -> bool {
        self.is_default
    }

    /// Key carried by a keyed registration.
    pub fn service_key(&self) -> Option<&ServiceKey> {
        self.service_key.as_ref()
    }

    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    /// True when the name follows the keyed-registration convention.
    #[inline]
    pub fn is_keyed(&self) -> bool {
        self.name.starts_with(KEYED_REGISTRATION_PREFIX)
    }

    /// True when the implementation is an open generic definition.
    #[inline]
    pub fn is_open_generic(&self) -> bool {
        self.implementation.is_generic_definition()
    }

    /// Whether this handle can produce an instance of `requested`.
    ///
    /// A handle serves its declared type exactly; a handle declared for an open
    /// definition also serves every closed type built from that definition.
    pub fn serves(&self, requested: &ServiceType) -> bool {
        if &self.service == requested {
            return true;
        }
        match (&self.service, requested) {
            (ServiceType::Generic(def), ServiceType::Closed(requested_def, _)) => def == requested_def,
            _ => false,
        }
    }
}

impl fmt::Debug for RegistrationHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegistrationHandle")
            .field("service", &self.service.to_string())
            .field("implementation", &self.implementation.to_string())
            .field("name", &self.name)
            .field("lifetime", &self.lifetime)
            .field("provenance", &self.provenance)
            .field("is_default", &self.is_default)
            .field("service_key", &self.service_key)
            .field("sequence", &self.sequence)
            .finish()
    }
}

/// Base name the registry uses when a registration does not supply one.
///
/// Keyed registrations get the [`KEYED_REGISTRATION_PREFIX`] followed by the
/// key, so the keyed flag can be recovered from the name alone.
pub(crate) fn generated_name(implementation: &ServiceType, key: Option<&ServiceKey>) -> String {
    match key {
        Some(key) => format!("{}{}/{}", KEYED_REGISTRATION_PREFIX, key, implementation),
        None => implementation.to_string(),
    }
}
