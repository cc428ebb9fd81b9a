//! Component lifetime definitions.

/// Lifetimes controlling where a resolved instance is cached
///
/// The native registry keeps every cached instance inside a [`Scope`](crate::Scope):
/// singletons live in the container's Root scope, scoped instances in whichever
/// scope is ambient when they are first requested.
///
/// # Examples
///
/// ```rust
/// use ferrous_bridge::{ServiceCollection, Resolver};
/// use std::sync::Arc;
///
/// struct Database { url: String }
/// struct UnitOfWork;
/// struct Command;
///
/// let mut services = ServiceCollection::new();
/// services.add_singleton(Database { url: "postgres://localhost".to_string() });
/// services.add_scoped_factory::<UnitOfWork, _>(|_| UnitOfWork);
/// services.add_transient_factory::<Command, _>(|_| Command);
///
/// let provider = services.build();
/// let scope = provider.create_scope();
/// let sp = scope.service_provider();
///
/// // Singleton: same instance inside and outside the scope
/// let db1 = provider.get_required::<Database>().unwrap();
/// let db2 = sp.get_required::<Database>().unwrap();
/// assert!(Arc::ptr_eq(&db1, &db2));
///
/// // Scoped: one instance per scope
/// let uow1 = sp.get_required::<UnitOfWork>().unwrap();
/// let uow2 = sp.get_required::<UnitOfWork>().unwrap();
/// let outside = provider.get_required::<UnitOfWork>().unwrap();
/// assert!(Arc::ptr_eq(&uow1, &uow2));
/// assert!(!Arc::ptr_eq(&uow1, &outside));
///
/// // Transient: always new
/// let c1 = sp.get_required::<Command>().unwrap();
/// let c2 = sp.get_required::<Command>().unwrap();
/// assert!(!Arc::ptr_eq(&c1, &c2));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Lifetime {
    /// Single instance per container, cached in the Root scope
    Singleton,
    /// Single instance per ambient scope
    ///
    /// Requests made outside any explicitly entered scope are served from
    /// the Root scope, so they all share one instance.
    Scoped,
    /// New instance per resolution, never cached
    ///
    /// Disposers registered by a transient factory are still tracked by the
    /// ambient scope.
    Transient,
}

impl Lifetime {
    /// Lowercase name for diagnostics.
    pub fn as_str(&self) -> &'static str {
        match self {
            Lifetime::Singleton => "singleton",
            Lifetime::Scoped => "scoped",
            Lifetime::Transient => "transient",
        }
    }
}

impl std::fmt::Display for Lifetime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
