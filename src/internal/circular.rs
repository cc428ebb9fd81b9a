//! Circular dependency detection infrastructure.

use std::cell::RefCell;
use std::panic;

use crate::error::{DiError, DiResult};

const MAX_DEPTH: usize = 1024;

// Thread-local activation state for circular dependency detection
thread_local! {
    static ACTIVATION_TLS: RefCell<ActivationTls> = RefCell::new(ActivationTls::default());
}

#[derive(Default)]
struct ActivationTls {
    stack: Vec<String>,
    frozen: bool,
    depth: usize,
}

/// Panic payload carrying the cycle up to the outermost activation.
#[derive(Debug)]
struct CircularPanic {
    path: Vec<String>,
}

/// Guard for managing the thread-local activation stack
struct StackGuard {
    name: String,
}

impl StackGuard {
    fn new(name: &str) -> Self {
        ACTIVATION_TLS.with(|tls| {
            let mut tls = tls.borrow_mut();

            // Circular detection BEFORE pushing the new name
            if tls.stack.iter().any(|n| n == name) {
                let mut path = tls.stack.clone();
                path.push(name.to_string());
                tls.frozen = true; // freeze pops during unwind
                drop(tls);
                panic::panic_any(CircularPanic { path });
            }

            if tls.depth >= MAX_DEPTH {
                let depth = tls.depth;
                drop(tls);
                panic::panic_any(DiError::DepthExceeded(depth));
            }

            tls.stack.push(name.to_string());
            tls.depth += 1;
        });

        Self { name: name.to_string() }
    }
}

impl Drop for StackGuard {
    fn drop(&mut self) {
        ACTIVATION_TLS.with(|tls| {
            let mut tls = tls.borrow_mut();
            if tls.frozen {
                // Unwinding out of a detected cycle: the outermost frame resets
                if tls.stack.first().map(String::as_str) == Some(self.name.as_str()) {
                    *tls = ActivationTls::default();
                }
                return;
            }
            if let Some(last) = tls.stack.pop() {
                debug_assert_eq!(last, self.name);
            }
            tls.depth = tls.depth.saturating_sub(1);
        });
    }
}

/// Execute an activation with circular dependency detection.
///
/// Cycles and runaway depth unwind to the outermost activation on this
/// thread, where they are turned back into `DiError`.
pub(crate) fn with_circular_catch<T, F>(name: &str, f: F) -> DiResult<T>
where
    F: FnOnce() -> DiResult<T>,
{
    use std::panic::AssertUnwindSafe;

    let outermost = ACTIVATION_TLS.with(|tls| tls.borrow().stack.is_empty());
    if !outermost {
        let _guard = StackGuard::new(name);
        return f();
    }

    match panic::catch_unwind(AssertUnwindSafe(|| {
        let _guard = StackGuard::new(name);
        f()
    })) {
        Ok(result) => result,
        Err(payload) => {
            if let Some(circular) = payload.downcast_ref::<CircularPanic>() {
                Err(DiError::Circular(circular.path.clone()))
            } else if let Some(err) = payload.downcast_ref::<DiError>() {
                Err(err.clone())
            } else {
                // Re-panic for other types of panics
                panic::resume_unwind(payload);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recurse(names: &[&str], i: usize) -> DiResult<()> {
        let name = names[i % names.len()];
        with_circular_catch(name, || recurse(names, i + 1))
    }

    #[test]
    fn detects_cycle_with_full_path() {
        let err = recurse(&["A", "B", "C"], 0).unwrap_err();
        match err {
            DiError::Circular(path) => assert_eq!(path, vec!["A", "B", "C", "A"]),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn stack_is_clean_after_cycle() {
        let _ = recurse(&["X", "Y"], 0);
        let ok = with_circular_catch("X", || Ok(5));
        assert_eq!(ok.unwrap(), 5);
    }

    #[test]
    fn nested_distinct_names_succeed() {
        let value = with_circular_catch("outer", || with_circular_catch("inner", || Ok(1)));
        assert_eq!(value.unwrap(), 1);
    }
}
