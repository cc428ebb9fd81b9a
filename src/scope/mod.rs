//! Lifetime scopes.
//!
//! A [`Scope`] groups the instances resolved while it is ambient and the
//! disposers their factories registered. Every registry owns exactly one Root
//! scope; nested scopes are created with [`Scope::create_child`] and form a
//! parent chain back to it.

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use once_cell::sync::OnceCell;
use parking_lot::Mutex;

use crate::error::{DiError, DiResult};
use crate::internal::{DisposeBag, FastMap};
use crate::registration::AnyArc;
use crate::registry::RegistryId;

pub mod store;
pub use store::{ForcedScope, ScopeStore};

/// Whether a scope is the registry's Root or a nested child.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScopeKind {
    Root,
    Nested,
}

pub(crate) type InstanceCell = Arc<OnceCell<AnyArc>>;

/// A disposable lifetime-grouping unit.
///
/// `Scope` is a cheap handle; clones share the same underlying scope and
/// identity is by reference ([`Scope::ptr_eq`]).
///
/// Disposing the Root scope tears down everything the registry tracks there,
/// singletons included. Disposing a nested scope only releases what that
/// scope tracked; it never reaches the Root.
///
/// # Examples
///
/// ```rust
/// use ferrous_bridge::{Kernel, ScopeKind};
///
/// let kernel = Kernel::new();
/// let root = kernel.root_scope();
/// let child = root.create_child();
///
/// assert_eq!(child.kind(), ScopeKind::Nested);
/// assert!(child.parent().unwrap().ptr_eq(&root));
///
/// child.dispose();
/// child.dispose(); // no-op
/// assert!(child.is_disposed());
/// assert!(!root.is_disposed());
/// ```
#[derive(Clone)]
pub struct Scope {
    inner: Arc<ScopeInner>,
}

struct ScopeInner {
    id: u64,
    registry: RegistryId,
    kind: ScopeKind,
    parent: Option<Scope>,
    disposed: AtomicBool,
    instances: Mutex<FastMap<String, InstanceCell>>,
    disposers: Mutex<DisposeBag>,
}

static NEXT_SCOPE_ID: AtomicU64 = AtomicU64::new(1);

impl Scope {
    fn with_parent(registry: RegistryId, kind: ScopeKind, parent: Option<Scope>) -> Self {
        let id = NEXT_SCOPE_ID.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(scope = id, %registry, ?kind, "scope created");
        Self {
            inner: Arc::new(ScopeInner {
                id,
                registry,
                kind,
                parent,
                disposed: AtomicBool::new(false),
                instances: Mutex::new(FastMap::default()),
                disposers: Mutex::new(DisposeBag::default()),
            }),
        }
    }

    /// The Root scope of a new registry.
    pub(crate) fn root(registry: RegistryId) -> Self {
        Self::with_parent(registry, ScopeKind::Root, None)
    }

    /// Creates a nested scope whose parent is `self`.
    pub fn create_child(&self) -> Scope {
        Self::with_parent(self.inner.registry, ScopeKind::Nested, Some(self.clone()))
    }

    /// Disposes the scope.
    ///
    /// Runs the registered disposers in reverse registration order and drops
    /// every cached instance. Idempotent: only the first call does anything.
    pub fn dispose(&self) {
        if self.inner.disposed.swap(true, Ordering::AcqRel) {
            return;
        }

        // Take the hooks out so none of them runs under our lock
        let mut bag = std::mem::take(&mut *self.inner.disposers.lock());
        let hooks = bag.len();
        bag.run_all_reverse();

        let instances = std::mem::take(&mut *self.inner.instances.lock());
        tracing::trace!(
            scope = self.inner.id,
            kind = ?self.inner.kind,
            hooks,
            instances = instances.len(),
            "scope disposed"
        );
    }

    pub fn is_disposed(&self) -> bool {
        self.inner.disposed.load(Ordering::Acquire)
    }

    pub fn kind(&self) -> ScopeKind {
        self.inner.kind
    }

    pub fn is_root(&self) -> bool {
        self.inner.kind == ScopeKind::Root
    }

    pub fn parent(&self) -> Option<&Scope> {
        self.inner.parent.as_ref()
    }

    /// Process-unique scope id, used in diagnostics and errors.
    pub fn id(&self) -> u64 {
        self.inner.id
    }

    /// Registry this scope belongs to.
    pub fn registry_id(&self) -> RegistryId {
        self.inner.registry
    }

    /// Reference identity.
    #[inline]
    pub fn ptr_eq(&self, other: &Scope) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// The cache cell for `key`, created empty on first use.
    pub(crate) fn instance_cell(&self, key: &str) -> DiResult<InstanceCell> {
        if self.is_disposed() {
            return Err(DiError::ScopeDisposed(self.inner.id));
        }
        let mut instances = self.inner.instances.lock();
        if let Some(cell) = instances.get(key) {
            return Ok(cell.clone());
        }
        let cell = InstanceCell::default();
        instances.insert(key.to_string(), cell.clone());
        Ok(cell)
    }

    /// Tracks a disposal hook. A hook pushed after disposal runs immediately.
    pub(crate) fn push_disposer(&self, hook: Box<dyn FnOnce() + Send>) {
        if self.is_disposed() {
            tracing::warn!(scope = self.inner.id, "disposer registered on a disposed scope, running it now");
            hook();
            return;
        }
        self.inner.disposers.lock().push(hook);
    }

    /// Number of cached instances, for diagnostics.
    pub fn cached_instances(&self) -> usize {
        self.inner.instances.lock().len()
    }
}

impl fmt::Debug for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scope")
            .field("id", &self.inner.id)
            .field("registry", &self.inner.registry)
            .field("kind", &self.inner.kind)
            .field("parent", &self.inner.parent.as_ref().map(Scope::id))
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

impl Drop for ScopeInner {
    fn drop(&mut self) {
        if !*self.disposed.get_mut() && !self.disposers.get_mut().is_empty() {
            tracing::warn!(
                scope = self.id,
                kind = ?self.kind,
                pending = self.disposers.get_mut().len(),
                "scope dropped without dispose; pending disposers will not run"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex as StdMutex;

    fn root() -> Scope {
        Scope::root(RegistryId::next())
    }

    #[test]
    fn child_keeps_parent_and_registry() {
        let root = root();
        let child = root.create_child();
        let grandchild = child.create_child();

        assert!(root.is_root());
        assert!(root.parent().is_none());
        assert_eq!(grandchild.kind(), ScopeKind::Nested);
        assert!(grandchild.parent().unwrap().ptr_eq(&child));
        assert_eq!(grandchild.registry_id(), root.registry_id());
        assert_ne!(grandchild.id(), child.id());
    }

    #[test]
    fn dispose_runs_hooks_lifo_once() {
        let scope = root().create_child();
        let log = Arc::new(StdMutex::new(Vec::new()));
        for i in 0..3 {
            let log = log.clone();
            scope.push_disposer(Box::new(move || log.lock().unwrap().push(i)));
        }

        scope.dispose();
        scope.dispose();
        assert_eq!(*log.lock().unwrap(), vec![2, 1, 0]);
    }

    #[test]
    fn nested_dispose_leaves_parent_alone() {
        let root = root();
        let cell = root.instance_cell("x").unwrap();
        cell.set(Arc::new(1u8) as AnyArc).unwrap();

        let child = root.create_child();
        child.instance_cell("x").unwrap();
        child.dispose();

        assert!(!root.is_disposed());
        assert_eq!(root.cached_instances(), 1);
        assert!(root.instance_cell("x").unwrap().get().is_some());
    }

    #[test]
    fn disposed_scope_refuses_cells() {
        let scope = root().create_child();
        scope.instance_cell("x").unwrap();
        scope.dispose();

        assert_eq!(scope.cached_instances(), 0);
        assert_eq!(scope.instance_cell("x").unwrap_err(), DiError::ScopeDisposed(scope.id()));
    }

    #[test]
    fn late_disposer_runs_immediately() {
        let scope = root().create_child();
        scope.dispose();

        let ran = Arc::new(AtomicBool::new(false));
        let flag = ran.clone();
        scope.push_disposer(Box::new(move || flag.store(true, Ordering::SeqCst)));
        assert!(ran.load(Ordering::SeqCst));
    }
}
