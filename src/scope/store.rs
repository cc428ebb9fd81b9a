//! Ambient scope binding per logical flow.
//!
//! Each logical flow carries a stack of forced scopes. Inside a future wrapped
//! by [`ScopeStore::flow`] the stack is a tokio task-local, so it follows the
//! future across `.await` points and worker threads. Everywhere else it is
//! thread-local. Neither propagates into `tokio::spawn`ed tasks or new threads:
//! those start empty and see the Root scope until they force one themselves.

use std::cell::RefCell;
use std::future::Future;
use std::marker::PhantomData;

use super::Scope;

tokio::task_local! {
    static FLOW_STACK: RefCell<Vec<Scope>>;
}

thread_local! {
    static THREAD_STACK: RefCell<Vec<Scope>> = const { RefCell::new(Vec::new()) };
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Slot {
    Flow,
    Thread,
}

fn active_slot() -> Slot {
    if FLOW_STACK.try_with(|_| ()).is_ok() {
        Slot::Flow
    } else {
        Slot::Thread
    }
}

/// Runs `f` on the active stack. Returns `None` only when a flow slot is no
/// longer reachable, which happens if a guard escapes its flow.
fn with_stack<R>(slot: Slot, f: impl FnOnce(&mut Vec<Scope>) -> R) -> Option<R> {
    match slot {
        Slot::Flow => FLOW_STACK.try_with(|stack| f(&mut stack.borrow_mut())).ok(),
        Slot::Thread => THREAD_STACK.try_with(|stack| f(&mut stack.borrow_mut())).ok(),
    }
}

/// Process-wide access to the ambient scope binding.
///
/// # Examples
///
/// ```rust
/// use ferrous_bridge::{Kernel, ScopeStore};
///
/// let kernel = Kernel::new();
/// let root = kernel.root_scope();
/// assert!(ScopeStore::current(&root).ptr_eq(&root));
///
/// let request = root.create_child();
/// {
///     let _guard = ScopeStore::force_scope(&request);
///     assert!(ScopeStore::current(&root).ptr_eq(&request));
/// }
/// assert!(ScopeStore::current(&root).ptr_eq(&root));
/// ```
pub struct ScopeStore;

impl ScopeStore {
    /// The scope currently active for `root`'s registry on this flow.
    ///
    /// Scopes forced for other registries are skipped; with none forced the
    /// answer is `root` itself.
    pub fn current(root: &Scope) -> Scope {
        let registry = root.registry_id();
        with_stack(active_slot(), |stack| {
            stack
                .iter()
                .rev()
                .find(|scope| scope.registry_id() == registry)
                .cloned()
        })
        .flatten()
        .unwrap_or_else(|| root.clone())
    }

    /// The innermost forced scope on this flow, whatever its registry.
    pub fn ambient() -> Option<Scope> {
        with_stack(active_slot(), |stack| stack.last().cloned()).flatten()
    }

    /// Makes `scope` ambient until the returned guard is dropped.
    ///
    /// Guards nest: dropping one restores exactly the binding that was in
    /// place when it was created, including while unwinding from a panic.
    /// A guard is bound to the flow that created it and is `!Send`; to keep a
    /// scope across `.await` points wrap the future with [`ScopeStore::flow_in`].
    pub fn force_scope(scope: &Scope) -> ForcedScope {
        let slot = active_slot();
        let depth = with_stack(slot, |stack| {
            let depth = stack.len();
            stack.push(scope.clone());
            depth
        })
        .unwrap_or_default();
        ForcedScope {
            slot,
            depth,
            _not_send: PhantomData,
        }
    }

    /// Runs `fut` as its own logical flow, starting from the caller's binding.
    ///
    /// Scopes forced inside `fut` stay with it across suspension points and
    /// never leak back to the caller or to other tasks sharing the thread.
    /// The caller's binding is captured here, not on first poll.
    pub fn flow<F: Future>(fut: F) -> impl Future<Output = F::Output> {
        let snapshot = Self::snapshot();
        FLOW_STACK.scope(RefCell::new(snapshot), fut)
    }

    /// Like [`ScopeStore::flow`], with `scope` forced for the whole flow.
    ///
    /// This is how a scope is explicitly handed to a spawned task:
    ///
    /// ```rust
    /// use ferrous_bridge::{Kernel, ScopeStore};
    ///
    /// # #[tokio::main]
    /// # async fn main() {
    /// let kernel = Kernel::new();
    /// let root = kernel.root_scope();
    /// let request = root.create_child();
    ///
    /// let handle = tokio::spawn(ScopeStore::flow_in(request.clone(), {
    ///     let root = root.clone();
    ///     async move {
    ///         tokio::task::yield_now().await;
    ///         ScopeStore::current(&root)
    ///     }
    /// }));
    /// assert!(handle.await.unwrap().ptr_eq(&request));
    /// # }
    /// ```
    pub fn flow_in<F: Future>(scope: Scope, fut: F) -> impl Future<Output = F::Output> {
        let mut snapshot = Self::snapshot();
        snapshot.push(scope);
        FLOW_STACK.scope(RefCell::new(snapshot), fut)
    }

    fn snapshot() -> Vec<Scope> {
        with_stack(active_slot(), |stack| stack.clone()).unwrap_or_default()
    }
}

/// Guard returned by [`ScopeStore::force_scope`].
#[must_use = "the scope is only forced while the guard is alive"]
pub struct ForcedScope {
    slot: Slot,
    depth: usize,
    _not_send: PhantomData<*const ()>,
}

impl Drop for ForcedScope {
    fn drop(&mut self) {
        let depth = self.depth;
        let _ = with_stack(self.slot, |stack| {
            debug_assert_eq!(stack.len(), depth + 1, "forced scopes released out of order");
            stack.truncate(depth)
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::RegistryId;

    fn root() -> Scope {
        Scope::root(RegistryId::next())
    }

    #[test]
    fn defaults_to_root() {
        let root = root();
        assert!(ScopeStore::current(&root).ptr_eq(&root));
    }

    #[test]
    fn nested_guards_restore_lifo() {
        let root = root();
        let a = root.create_child();
        let b = a.create_child();

        let ga = ScopeStore::force_scope(&a);
        {
            let _gb = ScopeStore::force_scope(&b);
            assert!(ScopeStore::current(&root).ptr_eq(&b));
        }
        assert!(ScopeStore::current(&root).ptr_eq(&a));
        drop(ga);
        assert!(ScopeStore::current(&root).ptr_eq(&root));
        assert!(ScopeStore::ambient().is_none());
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "forced scopes released out of order")]
    fn out_of_order_release_is_caught() {
        let root = root();
        let outer = ScopeStore::force_scope(&root.create_child());
        let _inner = ScopeStore::force_scope(&root.create_child());
        drop(outer);
    }

    #[test]
    fn other_registries_are_skipped() {
        let first = root();
        let second = root();
        let inner_first = first.create_child();

        let _g1 = ScopeStore::force_scope(&inner_first);
        let _g2 = ScopeStore::force_scope(&second.create_child());

        assert!(ScopeStore::current(&first).ptr_eq(&inner_first));
        assert_eq!(ScopeStore::ambient().unwrap().registry_id(), second.registry_id());
    }

    #[test]
    fn threads_do_not_inherit() {
        let root = root();
        let child = root.create_child();
        let _guard = ScopeStore::force_scope(&child);

        let seen = std::thread::scope(|s| s.spawn(|| ScopeStore::current(&root)).join().unwrap());
        assert!(seen.ptr_eq(&root));
        assert!(ScopeStore::current(&root).ptr_eq(&child));
    }

    #[test]
    fn binding_restored_after_panic() {
        let root = root();
        let child = root.create_child();

        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _guard = ScopeStore::force_scope(&child);
            panic!("boom");
        }));
        assert!(result.is_err());
        assert!(ScopeStore::current(&root).ptr_eq(&root));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn flow_survives_await() {
        let root = root();
        let child = root.create_child();

        let seen = ScopeStore::flow({
            let root = root.clone();
            let child = child.clone();
            async move {
                let _guard = ScopeStore::force_scope(&child);
                for _ in 0..10 {
                    tokio::task::yield_now().await;
                    assert!(ScopeStore::current(&root).ptr_eq(&child));
                }
                ScopeStore::current(&root)
            }
        })
        .await;

        assert!(seen.ptr_eq(&child));
        assert!(ScopeStore::current(&root).ptr_eq(&root));
    }

    #[tokio::test]
    async fn spawned_tasks_start_at_root() {
        let root = root();
        let child = root.create_child();

        let seen = ScopeStore::flow_in(child.clone(), {
            let root = root.clone();
            async move {
                let inner = ScopeStore::current(&root);
                let spawned = tokio::spawn({
                    let root = root.clone();
                    async move { ScopeStore::current(&root) }
                })
                .await
                .unwrap();
                (inner, spawned)
            }
        })
        .await;

        assert!(seen.0.ptr_eq(&child));
        assert!(seen.1.ptr_eq(&root));
    }
}
