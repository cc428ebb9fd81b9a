//! The component registry the resolution engine sits on.
//!
//! [`ComponentRegistry`] is the capability the engine consumes: membership
//! tests, handler enumeration and resolution by type, by name or all at once.
//! [`Kernel`] is the in-process implementation shipped with the crate.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::error::DiResult;
use crate::keyed::KeyedRegistrationIndex;
use crate::registration::{AnyArc, RegistrationHandle};
use crate::scope::Scope;
use crate::service_type::ServiceType;

pub mod kernel;
pub use kernel::{Component, ComponentBuilder, ComponentRegistration, GenericComponent, IntoRegistration, Kernel};

/// Process-unique identity of a registry instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RegistryId(u64);

impl RegistryId {
    /// Allocates a fresh id.
    pub fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        RegistryId(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for RegistryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "registry-{}", self.0)
    }
}

/// Capabilities the resolution engine needs from the underlying registry.
///
/// Implementations must be internally synchronized: the engine calls them
/// concurrently from any number of threads and holds no lock of its own.
///
/// Handler sequences are always in registration order. For a closed generic
/// request they include the handlers registered for its open definition.
pub trait ComponentRegistry: Send + Sync {
    /// Identity of this registry; scopes carry it to find their registry.
    fn registry_id(&self) -> RegistryId;

    /// The one Root scope of this registry.
    fn root_scope(&self) -> Scope;

    /// The keyed-registration index owned by this registry.
    ///
    /// Must return the same index for the lifetime of the registry.
    fn keyed_index(&self) -> Arc<KeyedRegistrationIndex>;

    /// Whether at least one handler can serve `service`.
    fn has_component(&self, service: &ServiceType) -> bool;

    /// Every handler that can serve `service`, keyed ones included.
    fn handlers(&self, service: &ServiceType) -> Vec<Arc<RegistrationHandle>>;

    /// Every handler in the registry.
    fn registrations(&self) -> Vec<Arc<RegistrationHandle>>;

    /// Service types declared by registrations implemented by `implementation`.
    fn services_implemented_by(&self, implementation: &ServiceType) -> Vec<ServiceType>;

    /// Resolves `service` using the registry's own default precedence.
    fn resolve(&self, service: &ServiceType) -> DiResult<AnyArc>;

    /// Resolves the component called `name` as `service`.
    ///
    /// Fails with `NotRegistered` for an unknown name, `TypeMismatch` when the
    /// component does not serve `service`, and `GenericMismatch` when an open
    /// generic cannot be closed over the requested arguments.
    fn resolve_by_name(&self, name: &str, service: &ServiceType) -> DiResult<AnyArc>;

    /// Resolves every handler for `service` in registration order.
    fn resolve_all(&self, service: &ServiceType) -> DiResult<Vec<AnyArc>>;
}

impl<R: ComponentRegistry + ?Sized> ComponentRegistry for Arc<R> {
    fn registry_id(&self) -> RegistryId {
        (**self).registry_id()
    }

    fn root_scope(&self) -> Scope {
        (**self).root_scope()
    }

    fn keyed_index(&self) -> Arc<KeyedRegistrationIndex> {
        (**self).keyed_index()
    }

    fn has_component(&self, service: &ServiceType) -> bool {
        (**self).has_component(service)
    }

    fn handlers(&self, service: &ServiceType) -> Vec<Arc<RegistrationHandle>> {
        (**self).handlers(service)
    }

    fn registrations(&self) -> Vec<Arc<RegistrationHandle>> {
        (**self).registrations()
    }

    fn services_implemented_by(&self, implementation: &ServiceType) -> Vec<ServiceType> {
        (**self).services_implemented_by(implementation)
    }

    fn resolve(&self, service: &ServiceType) -> DiResult<AnyArc> {
        (**self).resolve(service)
    }

    fn resolve_by_name(&self, name: &str, service: &ServiceType) -> DiResult<AnyArc> {
        (**self).resolve_by_name(name, service)
    }

    fn resolve_all(&self, service: &ServiceType) -> DiResult<Vec<AnyArc>> {
        (**self).resolve_all(service)
    }
}
