//! # ferrous-bridge
//!
//! Scoped service resolution for Microsoft.Extensions.DependencyInjection-style
//! callers, answered by a Castle-Windsor-like native registry.
//!
//! ## Features
//!
//! - **Ambient scopes**: the current scope follows the logical flow, across `.await` points
//! - **Keyed isolation**: keyed registrations never answer unkeyed requests
//! - **Provenance-aware precedence**: framework registrations resolve last-wins,
//!   native ones keep the registry's own choice
//! - **Enumeration**: every unkeyed candidate, in registration order, open generics included
//! - **Circular dependency detection**: reported with the full activation path
//!
//! ## Quick Start
//!
//! ```rust
//! use ferrous_bridge::{ServiceCollection, Resolver};
//! use std::sync::Arc;
//!
//! struct Database {
//!     connection_string: String,
//! }
//!
//! struct UserService {
//!     db: Arc<Database>,
//! }
//!
//! let mut services = ServiceCollection::new();
//! services.add_singleton(Database {
//!     connection_string: "postgres://localhost".to_string(),
//! });
//! services.add_transient_factory::<UserService, _>(|ctx| UserService {
//!     db: ctx.get_required::<Database>().unwrap(),
//! });
//!
//! let provider = services.build();
//! let user_service = provider.get_required::<UserService>().unwrap();
//! assert_eq!(user_service.db.connection_string, "postgres://localhost");
//! ```
//!
//! ## Service Lifetimes
//!
//! - **Singleton**: cached by the Root scope for the life of the registry
//! - **Scoped**: cached by the ambient scope; the Root when nothing is entered
//! - **Transient**: created on every resolution
//!
//! ## Native Registrations
//!
//! ```rust
//! use ferrous_bridge::{Component, Kernel, Lifetime, Resolver, ScopedServiceProvider};
//! use std::sync::Arc;
//!
//! struct Clock(u64);
//!
//! let kernel = Kernel::new();
//! kernel.register(Component::for_service::<Clock>().factory(|_| Clock(1))).unwrap();
//! kernel
//!     .register(Component::for_service::<Clock>().keyed("frozen").lifetime(Lifetime::Singleton).instance(Clock(0)))
//!     .unwrap();
//!
//! let provider = ScopedServiceProvider::new(Arc::new(kernel));
//! assert_eq!(provider.get_required::<Clock>().unwrap().0, 1);
//! assert_eq!(provider.get_required_keyed::<Clock>("frozen").unwrap().0, 0);
//! ```
//!
//! ## Scoped Services
//!
//! ```rust
//! use ferrous_bridge::{ServiceCollection, Resolver};
//! use std::sync::atomic::{AtomicUsize, Ordering};
//! use std::sync::Arc;
//!
//! struct RequestId(usize);
//!
//! let counter = Arc::new(AtomicUsize::new(0));
//! let seen = counter.clone();
//!
//! let mut services = ServiceCollection::new();
//! services.add_scoped_factory(move |_| RequestId(seen.fetch_add(1, Ordering::SeqCst)));
//!
//! let provider = services.build();
//! let first = provider.create_scope();
//! let second = provider.create_scope();
//!
//! let a = first.get_required::<RequestId>().unwrap();
//! let b = second.get_required::<RequestId>().unwrap();
//! assert_ne!(a.0, b.0);
//! assert!(Arc::ptr_eq(&a, &first.get_required::<RequestId>().unwrap()));
//! ```

pub mod collection;
pub mod descriptors;
pub mod error;
pub mod factory;
pub mod keyed;
pub mod lifetime;
pub mod provider;
pub mod registry;
pub mod scope;
pub mod service_type;
pub mod traits;

mod internal;
mod registration;

pub use collection::ServiceCollection;
pub use descriptors::ServiceDescriptor;
pub use error::{DiError, DiResult};
pub use factory::ServiceProviderFactory;
pub use keyed::{KeyedRegistration, KeyedRegistrationIndex, ServiceKey};
pub use lifetime::Lifetime;
pub use provider::{arbitrate, Precedence, ResolverContext, ScopedServiceProvider, ServiceList, ServiceScope};
pub use registration::{AnyArc, Provenance, RegistrationHandle, KEYED_REGISTRATION_PREFIX};
pub use registry::{
    Component, ComponentBuilder, ComponentRegistration, ComponentRegistry, GenericComponent, IntoRegistration, Kernel,
    RegistryId,
};
pub use scope::{ForcedScope, Scope, ScopeKind, ScopeStore};
pub use service_type::{GenericDefinition, ServiceType};
pub use traits::{Dispose, Resolver, ResolverCore};
