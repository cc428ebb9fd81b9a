//! Copies framework-side descriptors into the native registry.

use std::sync::Arc;

use crate::collection::ServiceCollection;
use crate::descriptors::ServiceDescriptor;
use crate::provider::ScopedServiceProvider;
use crate::registration::{Activator, Provenance};
use crate::registry::{ComponentRegistration, Kernel};

/// Builds native registries from [`ServiceCollection`]s.
///
/// Every copied component is tagged [`Provenance::Adapter`], so ambiguous
/// sets it takes part in resolve last-wins. Unkeyed components are also
/// flagged as native defaults, which makes the kernel's own `resolve` agree.
///
/// # Examples
///
/// Mixing native and framework-side registrations in one kernel:
///
/// ```rust
/// use ferrous_bridge::{Component, Kernel, Resolver, ServiceCollection, ServiceProviderFactory};
///
/// let kernel = Kernel::new();
/// kernel.register(Component::for_service::<&'static str>().instance("native")).unwrap();
///
/// let mut services = ServiceCollection::new();
/// services.add_singleton("adapted");
///
/// let factory = ServiceProviderFactory::with_kernel(kernel);
/// let kernel = factory.create_builder(services);
/// let provider = factory.create_service_provider(&kernel);
///
/// assert_eq!(*provider.get_required::<&'static str>().unwrap(), "adapted");
/// ```
#[derive(Debug, Clone, Default)]
pub struct ServiceProviderFactory {
    kernel: Option<Kernel>,
}

impl ServiceProviderFactory {
    /// A factory that builds a fresh kernel per collection.
    pub fn new() -> Self {
        Self::default()
    }

    /// A factory that adds to an existing kernel.
    pub fn with_kernel(kernel: Kernel) -> Self {
        Self { kernel: Some(kernel) }
    }

    /// Copies every descriptor of `services` into the kernel, in order.
    pub fn create_builder(&self, services: ServiceCollection) -> Kernel {
        let kernel = self.kernel.clone().unwrap_or_default();
        let descriptors = services.into_descriptors();
        let count = descriptors.len();
        for descriptor in descriptors {
            let (registration, activator) = adapt(descriptor);
            kernel.register_generated(registration, activator);
        }
        tracing::debug!(registry = %kernel.root_scope().registry_id(), count, "copied service descriptors");
        kernel
    }

    /// Root provider over `kernel`.
    pub fn create_service_provider(&self, kernel: &Kernel) -> ScopedServiceProvider {
        ScopedServiceProvider::new(Arc::new(kernel.clone()))
    }
}

fn adapt(descriptor: ServiceDescriptor) -> (ComponentRegistration, Activator) {
    let mut registration =
        ComponentRegistration::new(descriptor.service().clone(), descriptor.implementation().clone());
    registration.lifetime = descriptor.lifetime();
    registration.provenance = Provenance::Adapter;
    registration.is_default = descriptor.key().is_none();
    registration.key = descriptor.key().cloned();
    (registration, descriptor.activator)
}
