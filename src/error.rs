//! Error types for the resolution engine and the native registry.

use thiserror::Error;

/// Resolution errors
///
/// Represents the failure conditions that can surface while registering
/// components or resolving services through a [`ScopedServiceProvider`](crate::ScopedServiceProvider)
/// or directly against a [`Kernel`](crate::Kernel).
///
/// Every failure is a synchronous return-path signal. Nothing in the engine
/// retries: resolution is a pure lookup.
///
/// # Examples
///
/// ```rust
/// use ferrous_bridge::{DiError, ServiceCollection, Resolver};
///
/// let provider = ServiceCollection::new().build();
/// match provider.get_required::<String>() {
///     Err(DiError::NotRegistered(type_name)) => {
///         assert_eq!(type_name, "alloc::string::String");
///     }
///     _ => unreachable!(),
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DiError {
    /// No candidate matches a non-optional request
    #[error("Service not registered: {0}")]
    NotRegistered(String),
    /// A registration was found but does not serve the requested type,
    /// or the resolved value failed to downcast
    #[error("Type mismatch for: {0}")]
    TypeMismatch(String),
    /// An open generic registration cannot be closed over the requested arguments
    #[error("Open generic {implementation} cannot be instantiated as {requested}")]
    GenericMismatch {
        /// Implementation type of the open generic registration
        implementation: String,
        /// Closed service type that was requested
        requested: String,
    },
    /// Circular dependency detected (includes path)
    #[error("Circular dependency: {}", .0.join(" -> "))]
    Circular(Vec<String>),
    /// Maximum activation depth exceeded
    #[error("Max depth {0} exceeded")]
    DepthExceeded(usize),
    /// The scope owning the instance has already been disposed
    #[error("Scope {0} has been disposed")]
    ScopeDisposed(u64),
    /// A component with the same explicit name already exists
    #[error("A component named '{0}' is already registered")]
    DuplicateName(String),
    /// A component was registered without an instance or factory
    #[error("Component '{0}' has no instance or factory")]
    MissingActivator(String),
}

impl DiError {
    /// True for the failure that enumeration silently skips.
    pub fn is_generic_mismatch(&self) -> bool {
        matches!(self, DiError::GenericMismatch { .. })
    }
}

/// Result type for resolution operations
///
/// A convenience alias for `Result<T, DiError>` used throughout ferrous-bridge.
pub type DiResult<T> = Result<T, DiError>;
