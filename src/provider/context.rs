//! Resolver context for factory functions.

use std::fmt;

use crate::error::DiResult;
use crate::keyed::ServiceKey;
use crate::provider::Resolution;
use crate::registration::AnyArc;
use crate::registry::ComponentRegistry;
use crate::scope::{Scope, ScopeStore};
use crate::service_type::ServiceType;
use crate::traits::ResolverCore;

/// Context passed to factory functions for resolving dependencies.
///
/// Dependencies resolve through the same engine as the outer provider,
/// with the scope that owns the instance being built forced as ambient: a
/// singleton factory sees the Root scope, a scoped or transient one sees the
/// scope it was resolved in. Disposers go to that same scope.
///
/// # Examples
///
/// ```
/// use ferrous_bridge::{ServiceCollection, Resolver};
/// use std::sync::Arc;
///
/// struct Database { url: String }
/// struct UserService { db: Arc<Database> }
///
/// let mut services = ServiceCollection::new();
/// services.add_singleton(Database { url: "postgres://localhost".to_string() });
/// services.add_transient_factory::<UserService, _>(|resolver| UserService {
///     db: resolver.get_required::<Database>().unwrap(),
/// });
///
/// let provider = services.build();
/// let users = provider.get_required::<UserService>().unwrap();
/// assert_eq!(users.db.url, "postgres://localhost");
/// ```
pub struct ResolverContext<'a> {
    registry: &'a dyn ComponentRegistry,
    owner: &'a Scope,
    service_key: Option<&'a ServiceKey>,
}

impl<'a> ResolverContext<'a> {
    pub(crate) fn new(
        registry: &'a dyn ComponentRegistry,
        owner: &'a Scope,
        service_key: Option<&'a ServiceKey>,
    ) -> Self {
        Self {
            registry,
            owner,
            service_key,
        }
    }

    /// Key of the registration being built, for keyed registrations.
    pub fn service_key(&self) -> Option<&ServiceKey> {
        self.service_key
    }

    /// Scope that will own the instance being built.
    pub fn scope(&self) -> &Scope {
        self.owner
    }

    /// The registry the instance is being built from.
    pub fn registry(&self) -> &dyn ComponentRegistry {
        self.registry
    }
}

impl ResolverCore for ResolverContext<'_> {
    fn resolve_service(
        &self,
        service: &ServiceType,
        key: Option<&ServiceKey>,
        optional: bool,
    ) -> DiResult<Option<AnyArc>> {
        let _forced = ScopeStore::force_scope(self.owner);
        Resolution::new(self.registry).resolve(service, key, optional)
    }

    fn push_disposer(&self, hook: Box<dyn FnOnce() + Send>) {
        self.owner.push_disposer(hook);
    }
}

impl fmt::Debug for ResolverContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolverContext")
            .field("registry", &self.registry.registry_id())
            .field("owner", &self.owner.id())
            .field("service_key", &self.service_key)
            .finish()
    }
}
