//! Nested scopes handed out by a provider.

use crate::error::DiResult;
use crate::keyed::ServiceKey;
use crate::provider::ScopedServiceProvider;
use crate::registration::AnyArc;
use crate::scope::Scope;
use crate::service_type::ServiceType;
use crate::traits::ResolverCore;

/// A nested scope together with the provider bound to it.
///
/// Returned by [`ScopedServiceProvider::create_scope`]. Scoped services
/// resolved through it are cached in the nested scope; singletons still come
/// from the Root. Dropping the `ServiceScope` disposes the nested scope, which
/// never reaches the Root scope or the registry.
///
/// # Examples
///
/// ```
/// use ferrous_bridge::{ServiceCollection, Resolver};
/// use std::sync::atomic::{AtomicUsize, Ordering};
/// use std::sync::Arc;
///
/// struct RequestId(usize);
///
/// let counter = Arc::new(AtomicUsize::new(0));
/// let next = counter.clone();
///
/// let mut services = ServiceCollection::new();
/// services.add_scoped_factory::<RequestId, _>(move |_| RequestId(next.fetch_add(1, Ordering::SeqCst)));
/// let provider = services.build();
///
/// let first = provider.create_scope();
/// let second = provider.create_scope();
///
/// let a1 = first.get_required::<RequestId>().unwrap();
/// let a2 = first.get_required::<RequestId>().unwrap();
/// let b = second.get_required::<RequestId>().unwrap();
///
/// assert!(Arc::ptr_eq(&a1, &a2));
/// assert_ne!(a1.0, b.0);
/// ```
pub struct ServiceScope {
    provider: ScopedServiceProvider,
}

impl ServiceScope {
    pub(crate) fn new(provider: ScopedServiceProvider) -> Self {
        Self { provider }
    }

    /// Provider resolving within this scope.
    pub fn service_provider(&self) -> &ScopedServiceProvider {
        &self.provider
    }

    pub fn scope(&self) -> &Scope {
        self.provider.scope()
    }

    /// Disposes the nested scope. Idempotent.
    pub fn dispose(&self) {
        self.provider.scope().dispose();
    }
}

impl ResolverCore for ServiceScope {
    fn resolve_service(
        &self,
        service: &ServiceType,
        key: Option<&ServiceKey>,
        optional: bool,
    ) -> DiResult<Option<AnyArc>> {
        self.provider.resolve_service(service, key, optional)
    }

    fn push_disposer(&self, hook: Box<dyn FnOnce() + Send>) {
        self.provider.push_disposer(hook);
    }
}

impl std::fmt::Debug for ServiceScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceScope").field("scope", self.scope()).finish()
    }
}

impl Drop for ServiceScope {
    fn drop(&mut self) {
        self.dispose();
    }
}
