//! Internal disposal bag for managing cleanup hooks.

/// Container for disposal hooks with LIFO execution order.
///
/// Every [`Scope`](crate::Scope) owns one. Hooks are pushed by factories through
/// [`Resolver::register_disposer`](crate::Resolver::register_disposer) and run
/// when the scope is disposed.
#[derive(Default)]
pub(crate) struct DisposeBag {
    hooks: Vec<Box<dyn FnOnce() + Send>>,
}

impl DisposeBag {
    /// Add a disposal hook.
    pub(crate) fn push(&mut self, f: Box<dyn FnOnce() + Send>) {
        self.hooks.push(f);
    }

    /// Execute all hooks in reverse order (LIFO).
    pub(crate) fn run_all_reverse(&mut self) {
        while let Some(f) = self.hooks.pop() {
            (f)();
        }
    }

    /// Check if the bag is empty (no disposers registered).
    pub(crate) fn is_empty(&self) -> bool {
        self.hooks.is_empty()
    }

    pub(crate) fn len(&self) -> usize {
        self.hooks.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[test]
    fn hooks_run_in_reverse_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut bag = DisposeBag::default();
        for i in 0..3 {
            let log = log.clone();
            bag.push(Box::new(move || log.lock().unwrap().push(i)));
        }
        assert_eq!(bag.len(), 3);

        bag.run_all_reverse();
        assert!(bag.is_empty());
        assert_eq!(*log.lock().unwrap(), vec![2, 1, 0]);
    }
}
