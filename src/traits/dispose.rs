//! Disposal trait for resource cleanup.

/// Trait for synchronous resource disposal.
///
/// Implement this for services that need structured teardown (flushing
/// caches, closing connections). Register the instance from its factory with
/// [`Resolver::register_disposer`](crate::Resolver::register_disposer); the hook
/// runs when the owning scope is disposed, last registered first.
///
/// Singletons are owned by the Root scope, scoped and transient instances by
/// the scope that was ambient when they were built.
///
/// # Examples
///
/// ```
/// use ferrous_bridge::{Dispose, ServiceCollection, Resolver};
/// use std::sync::atomic::{AtomicBool, Ordering};
/// use std::sync::Arc;
///
/// struct Connection {
///     closed: AtomicBool,
/// }
///
/// impl Dispose for Connection {
///     fn dispose(&self) {
///         self.closed.store(true, Ordering::SeqCst);
///     }
/// }
///
/// let conn = Arc::new(Connection { closed: AtomicBool::new(false) });
/// let tracked = conn.clone();
///
/// let mut services = ServiceCollection::new();
/// services.add_scoped_factory::<u32, _>(move |resolver| {
///     resolver.register_disposer(tracked.clone());
///     7
/// });
///
/// let provider = services.build();
/// let scope = provider.create_scope();
/// assert_eq!(*scope.service_provider().get_required::<u32>().unwrap(), 7);
///
/// scope.dispose();
/// assert!(conn.closed.load(Ordering::SeqCst));
/// ```
pub trait Dispose: Send + Sync + 'static {
    /// Perform synchronous cleanup of resources.
    fn dispose(&self);
}
