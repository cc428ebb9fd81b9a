//! In-process native registry.
//!
//! [`Kernel`] owns components, their lifetimes and their Root scope. Its own
//! precedence rule for an ambiguous service is "last component flagged as
//! default, otherwise first registered". Components are added with the
//! [`Component`] builders.

use std::collections::hash_map::Entry;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use once_cell::sync::OnceCell;
use parking_lot::RwLock;

use crate::error::{DiError, DiResult};
use crate::internal::{with_circular_catch, FastMap};
use crate::keyed::{KeyedRegistrationIndex, ServiceKey};
use crate::lifetime::Lifetime;
use crate::provider::ResolverContext;
use crate::registration::{
    generated_name, Activator, AnyArc, ConstraintFn, CtorFn, GenericCtorFn, Provenance,
    RegistrationHandle, KEYED_REGISTRATION_PREFIX,
};
use crate::registry::{ComponentRegistry, RegistryId};
use crate::scope::{Scope, ScopeStore};
use crate::service_type::{GenericDefinition, ServiceType};

/// The native component registry.
///
/// Cloning a `Kernel` yields another handle to the same registry. When the
/// last handle is dropped the Root scope is disposed.
///
/// # Examples
///
/// ```rust
/// use ferrous_bridge::{Component, Kernel, Lifetime, ServiceType, ComponentRegistry};
///
/// struct Mailer(&'static str);
///
/// let kernel = Kernel::new();
/// kernel.register(Component::for_service::<Mailer>().instance(Mailer("smtp"))).unwrap();
/// kernel.register(Component::for_service::<Mailer>().instance(Mailer("ses"))).unwrap();
///
/// // Native precedence: first registered wins
/// let mailer = kernel.resolve(&ServiceType::of::<Mailer>()).unwrap();
/// assert_eq!(mailer.downcast::<Mailer>().unwrap().0, "smtp");
/// ```
#[derive(Clone)]
pub struct Kernel {
    inner: Arc<KernelInner>,
}

struct KernelInner {
    id: RegistryId,
    root: Scope,
    state: RwLock<KernelState>,
    keyed: OnceCell<Arc<KeyedRegistrationIndex>>,
}

#[derive(Default)]
struct KernelState {
    components: Vec<ComponentEntry>,
    by_service: FastMap<ServiceType, Vec<usize>>,
    by_name: FastMap<String, usize>,
}

struct ComponentEntry {
    handle: Arc<RegistrationHandle>,
    activator: Activator,
}

impl KernelState {
    /// Component indices serving `service`, in registration order.
    fn indices_for(&self, service: &ServiceType) -> Vec<usize> {
        let mut indices = self.by_service.get(service).cloned().unwrap_or_default();
        if let ServiceType::Closed(def, _) = service {
            if let Some(open) = self.by_service.get(&ServiceType::Generic(*def)) {
                indices.extend(open.iter().copied());
                indices.sort_unstable();
            }
        }
        indices
    }

    /// Reserves `name` for the next component.
    fn claim_name(&mut self, name: String) -> DiResult<String> {
        let index = self.components.len();
        match self.by_name.entry(name) {
            Entry::Occupied(taken) => Err(DiError::DuplicateName(taken.key().clone())),
            Entry::Vacant(slot) => {
                let name = slot.key().clone();
                slot.insert(index);
                Ok(name)
            }
        }
    }

    /// Reserves a generated name for `registration`. A taken name gets the
    /// first free `#<sequence>` suffix, starting at the component count.
    fn claim_generated_name(&mut self, registration: &ComponentRegistration) -> String {
        let base = generated_name(&registration.implementation, registration.key.as_ref());
        let mut name = base.clone();
        let mut sequence = self.components.len();
        while self.by_name.contains_key(&name) {
            name = format!("{}#{}", base, sequence);
            sequence += 1;
        }
        self.by_name.insert(name.clone(), self.components.len());
        name
    }

    fn entry(&self, index: usize) -> (Arc<RegistrationHandle>, Activator) {
        let entry = &self.components[index];
        (entry.handle.clone(), entry.activator.clone())
    }
}

impl Default for Kernel {
    fn default() -> Self {
        Self::new()
    }
}

impl Kernel {
    /// Creates an empty registry with its Root scope.
    pub fn new() -> Self {
        let id = RegistryId::next();
        Self {
            inner: Arc::new(KernelInner {
                id,
                root: Scope::root(id),
                state: RwLock::new(KernelState::default()),
                keyed: OnceCell::new(),
            }),
        }
    }

    /// Adds a component.
    ///
    /// Explicit names must be unique. Generated names that collide get a
    /// `#<sequence>` suffix.
    pub fn register(&self, registration: impl IntoRegistration) -> DiResult<Arc<RegistrationHandle>> {
        let mut registration = registration.into_registration();
        let activator = registration
            .activator
            .take()
            .ok_or_else(|| DiError::MissingActivator(registration.implementation.to_string()))?;

        let mut state = self.inner.state.write();
        let name = match registration.name.take() {
            Some(name) => {
                let name = match &registration.key {
                    Some(key) if !name.starts_with(KEYED_REGISTRATION_PREFIX) => {
                        format!("{}{}/{}", KEYED_REGISTRATION_PREFIX, key, name)
                    }
                    _ => name,
                };
                state.claim_name(name)?
            }
            None => state.claim_generated_name(&registration),
        };
        Ok(self.insert(&mut state, name, registration, activator))
    }

    /// Adds a component under a generated name. Cannot fail.
    pub(crate) fn register_generated(
        &self,
        registration: ComponentRegistration,
        activator: Activator,
    ) -> Arc<RegistrationHandle> {
        let mut state = self.inner.state.write();
        let name = state.claim_generated_name(&registration);
        self.insert(&mut state, name, registration, activator)
    }

    /// Stores a component under a name already claimed for it.
    fn insert(
        &self,
        state: &mut KernelState,
        name: String,
        registration: ComponentRegistration,
        activator: Activator,
    ) -> Arc<RegistrationHandle> {
        let index = state.components.len();
        debug_assert_eq!(state.by_name.get(&name), Some(&index));
        let handle = Arc::new(
            RegistrationHandle::new(registration.service.clone(), registration.implementation, name)
                .with_lifetime(registration.lifetime)
                .with_provenance(registration.provenance)
                .with_default(registration.is_default)
                .with_service_key(registration.key)
                .with_sequence(index as u64),
        );

        state.components.push(ComponentEntry {
            handle: handle.clone(),
            activator,
        });
        state.by_service.entry(registration.service).or_default().push(index);

        tracing::trace!(
            registry = %self.inner.id,
            service = %handle.service(),
            name = handle.name(),
            lifetime = %handle.lifetime(),
            provenance = ?handle.provenance(),
            "component registered"
        );
        handle
    }

    /// The Root scope.
    pub fn root_scope(&self) -> Scope {
        self.inner.root.clone()
    }

    /// Disposes the Root scope, tearing down singletons and everything else
    /// tracked there.
    pub fn dispose(&self) {
        self.inner.root.dispose();
    }

    pub fn is_disposed(&self) -> bool {
        self.inner.root.is_disposed()
    }

    /// Number of registered components.
    pub fn len(&self) -> usize {
        self.inner.state.read().components.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn activate(
        &self,
        handle: &RegistrationHandle,
        activator: &Activator,
        requested: &ServiceType,
    ) -> DiResult<AnyArc> {
        let root = &self.inner.root;
        let ambient = ScopeStore::current(root);
        if ambient.is_disposed() {
            return Err(DiError::ScopeDisposed(ambient.id()));
        }

        // Open generics cache one instance per closed type
        let (instance_key, args) = match activator {
            Activator::Closed(_) => (handle.name().to_string(), &[][..]),
            Activator::OpenGeneric { constraint, .. } => {
                let args = closed_arguments(handle, requested, constraint.as_deref())?;
                (format!("{}[{}]", handle.name(), requested), args)
            }
        };

        let owner = match handle.lifetime() {
            Lifetime::Singleton => root.clone(),
            Lifetime::Scoped | Lifetime::Transient => ambient,
        };

        let build = || {
            with_circular_catch(&instance_key, || {
                let ctx = ResolverContext::new(self, &owner, handle.service_key());
                match activator {
                    Activator::Closed(ctor) => ctor(&ctx),
                    Activator::OpenGeneric { ctor, .. } => ctor(&ctx, args),
                }
            })
        };

        if handle.lifetime() == Lifetime::Transient {
            return build();
        }

        let cell = owner.instance_cell(&instance_key)?;
        if let Some(value) = cell.get() {
            return Ok(value.clone());
        }
        let value = build()?;
        Ok(cell.get_or_init(|| value).clone())
    }

    fn lookup_name(&self, name: &str) -> Option<(Arc<RegistrationHandle>, Activator)> {
        let state = self.inner.state.read();
        state.by_name.get(name).map(|&index| state.entry(index))
    }

    /// Human-readable dump of every component.
    #[cfg(feature = "diagnostics")]
    pub fn to_debug_string(&self) -> String {
        use std::fmt::Write;

        let state = self.inner.state.read();
        let mut out = format!(
            "Kernel {} ({} components, root scope {})\n",
            self.inner.id,
            state.components.len(),
            self.inner.root.id()
        );
        for entry in &state.components {
            let handle = &entry.handle;
            let _ = writeln!(
                out,
                "  #{} {} -> {} [{}] {:?}{}{}",
                handle.sequence(),
                handle.service(),
                handle.implementation(),
                handle.lifetime(),
                handle.provenance(),
                if handle.is_default() { " default" } else { "" },
                handle
                    .service_key()
                    .map(|key| format!(" key={}", key))
                    .unwrap_or_default(),
            );
        }
        out
    }
}

/// Arguments to close an open generic over, validated against its definition.
fn closed_arguments<'r>(
    handle: &RegistrationHandle,
    requested: &'r ServiceType,
    constraint: Option<&ConstraintFn>,
) -> DiResult<&'r [ServiceType]> {
    let mismatch = || DiError::GenericMismatch {
        implementation: handle.implementation().to_string(),
        requested: requested.to_string(),
    };
    let arity = handle
        .implementation()
        .generic_definition()
        .map(|def| def.arity())
        .ok_or_else(mismatch)?;
    let args = match requested {
        ServiceType::Closed(_, args) => &args[..],
        _ => return Err(mismatch()),
    };
    if args.len() != arity {
        return Err(mismatch());
    }
    if let Some(constraint) = constraint {
        if !constraint(args) {
            return Err(mismatch());
        }
    }
    Ok(args)
}

impl ComponentRegistry for Kernel {
    fn registry_id(&self) -> RegistryId {
        self.inner.id
    }

    fn root_scope(&self) -> Scope {
        self.inner.root.clone()
    }

    fn keyed_index(&self) -> Arc<KeyedRegistrationIndex> {
        let id = self.inner.id;
        self.inner
            .keyed
            .get_or_init(|| Arc::new(KeyedRegistrationIndex::new(id)))
            .clone()
    }

    fn has_component(&self, service: &ServiceType) -> bool {
        !self.inner.state.read().indices_for(service).is_empty()
    }

    fn handlers(&self, service: &ServiceType) -> Vec<Arc<RegistrationHandle>> {
        let state = self.inner.state.read();
        state
            .indices_for(service)
            .into_iter()
            .map(|index| state.components[index].handle.clone())
            .collect()
    }

    fn registrations(&self) -> Vec<Arc<RegistrationHandle>> {
        self.inner
            .state
            .read()
            .components
            .iter()
            .map(|entry| entry.handle.clone())
            .collect()
    }

    fn services_implemented_by(&self, implementation: &ServiceType) -> Vec<ServiceType> {
        let state = self.inner.state.read();
        let mut services: Vec<ServiceType> = Vec::new();
        for entry in &state.components {
            let handle = &entry.handle;
            if handle.implementation() == implementation && !services.contains(handle.service()) {
                services.push(handle.service().clone());
            }
        }
        services
    }

    fn resolve(&self, service: &ServiceType) -> DiResult<AnyArc> {
        let (handle, activator) = {
            let state = self.inner.state.read();
            let unkeyed: Vec<usize> = state
                .indices_for(service)
                .into_iter()
                .filter(|&index| !state.components[index].handle.is_keyed())
                .collect();
            let chosen = unkeyed
                .iter()
                .rev()
                .find(|&&index| state.components[index].handle.is_default())
                .or_else(|| unkeyed.first())
                .copied()
                .ok_or_else(|| DiError::NotRegistered(service.to_string()))?;
            state.entry(chosen)
        };
        self.activate(&handle, &activator, service)
    }

    fn resolve_by_name(&self, name: &str, service: &ServiceType) -> DiResult<AnyArc> {
        let (handle, activator) = self
            .lookup_name(name)
            .ok_or_else(|| DiError::NotRegistered(format!("{} (component '{}')", service, name)))?;
        if !handle.serves(service) {
            return Err(DiError::TypeMismatch(format!(
                "{} (component '{}' serves {})",
                service,
                name,
                handle.service()
            )));
        }
        self.activate(&handle, &activator, service)
    }

    fn resolve_all(&self, service: &ServiceType) -> DiResult<Vec<AnyArc>> {
        let entries: Vec<_> = {
            let state = self.inner.state.read();
            state
                .indices_for(service)
                .into_iter()
                .map(|index| state.entry(index))
                .collect()
        };
        let mut instances = Vec::with_capacity(entries.len());
        for (handle, activator) in entries {
            match self.activate(&handle, &activator, service) {
                Ok(instance) => instances.push(instance),
                Err(err) if err.is_generic_mismatch() => continue,
                Err(err) => return Err(err),
            }
        }
        Ok(instances)
    }
}

impl fmt::Debug for Kernel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Kernel")
            .field("id", &self.inner.id)
            .field("components", &self.len())
            .field("root", &self.inner.root)
            .finish()
    }
}

impl Drop for KernelInner {
    fn drop(&mut self) {
        self.root.dispose();
    }
}

/// Everything the kernel needs to add one component.
pub struct ComponentRegistration {
    pub(crate) service: ServiceType,
    pub(crate) implementation: ServiceType,
    pub(crate) name: Option<String>,
    pub(crate) lifetime: Lifetime,
    pub(crate) provenance: Provenance,
    pub(crate) is_default: bool,
    pub(crate) key: Option<ServiceKey>,
    pub(crate) activator: Option<Activator>,
}

impl ComponentRegistration {
    pub(crate) fn new(service: ServiceType, implementation: ServiceType) -> Self {
        Self {
            service,
            implementation,
            name: None,
            lifetime: Lifetime::Singleton,
            provenance: Provenance::Native,
            is_default: false,
            key: None,
            activator: None,
        }
    }

    pub fn service(&self) -> &ServiceType {
        &self.service
    }

    pub fn implementation(&self) -> &ServiceType {
        &self.implementation
    }
}

/// Anything [`Kernel::register`] accepts.
pub trait IntoRegistration {
    fn into_registration(self) -> ComponentRegistration;
}

impl IntoRegistration for ComponentRegistration {
    fn into_registration(self) -> ComponentRegistration {
        self
    }
}

/// Entry point for native registrations.
///
/// # Examples
///
/// ```rust
/// use ferrous_bridge::{Component, Kernel, Lifetime};
/// use std::sync::Arc;
///
/// trait Clock: Send + Sync {
///     fn now(&self) -> u64;
/// }
/// struct Fixed;
/// impl Clock for Fixed {
///     fn now(&self) -> u64 { 42 }
/// }
///
/// let kernel = Kernel::new();
/// kernel
///     .register(
///         Component::for_service::<dyn Clock>()
///             .implemented_by::<Fixed>()
///             .named("clock.fixed")
///             .lifetime(Lifetime::Transient)
///             .trait_factory(|_| Arc::new(Fixed) as Arc<dyn Clock>),
///     )
///     .unwrap();
/// assert_eq!(kernel.len(), 1);
/// ```
pub struct Component;

impl Component {
    /// Starts a registration for the service type `S`.
    pub fn for_service<S: ?Sized + 'static>() -> ComponentBuilder<S> {
        ComponentBuilder {
            registration: ComponentRegistration::new(ServiceType::of::<S>(), ServiceType::of::<S>()),
            _service: PhantomData,
        }
    }

    /// Starts a registration for an open generic definition.
    pub fn for_generic(definition: GenericDefinition) -> GenericComponent {
        GenericComponent {
            registration: ComponentRegistration::new(definition.open(), definition.open()),
            ctor: None,
            constraint: None,
        }
    }
}

/// Builder for a component serving `S`.
pub struct ComponentBuilder<S: ?Sized> {
    registration: ComponentRegistration,
    _service: PhantomData<fn() -> Arc<S>>,
}

impl<S: ?Sized + 'static> ComponentBuilder<S> {
    /// Records the implementation type, used in generated names and diagnostics.
    pub fn implemented_by<I: ?Sized + 'static>(mut self) -> Self {
        self.registration.implementation = ServiceType::of::<I>();
        self
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.registration.name = Some(name.into());
        self
    }

    pub fn lifetime(mut self, lifetime: Lifetime) -> Self {
        self.registration.lifetime = lifetime;
        self
    }

    /// Flags the component as the preferred native default for its service.
    pub fn as_default(mut self) -> Self {
        self.registration.is_default = true;
        self
    }

    pub fn with_provenance(mut self, provenance: Provenance) -> Self {
        self.registration.provenance = provenance;
        self
    }

    /// Registers the component under `key`; unkeyed lookups will not see it.
    pub fn keyed(mut self, key: impl Into<ServiceKey>) -> Self {
        self.registration.key = Some(key.into());
        self
    }

    fn with_ctor(mut self, ctor: Arc<CtorFn>) -> Self {
        self.registration.activator = Some(Activator::Closed(ctor));
        self
    }
}

impl<S: Send + Sync + 'static> ComponentBuilder<S> {
    /// Uses a pre-built instance.
    pub fn instance(self, value: S) -> Self {
        let value: AnyArc = Arc::new(value);
        self.with_ctor(Arc::new(move |_: &ResolverContext<'_>| -> DiResult<AnyArc> { Ok(value.clone()) }))
    }

    /// Builds instances with `factory`.
    pub fn factory<F>(self, factory: F) -> Self
    where
        F: Fn(&ResolverContext<'_>) -> S + Send + Sync + 'static,
    {
        self.with_ctor(Arc::new(move |ctx: &ResolverContext<'_>| -> DiResult<AnyArc> {
            Ok(Arc::new(factory(ctx)))
        }))
    }

    /// Builds instances with a fallible `factory`.
    pub fn try_factory<F>(self, factory: F) -> Self
    where
        F: Fn(&ResolverContext<'_>) -> DiResult<S> + Send + Sync + 'static,
    {
        self.with_ctor(Arc::new(move |ctx: &ResolverContext<'_>| {
            factory(ctx).map(|value| Arc::new(value) as AnyArc)
        }))
    }
}

impl<S: ?Sized + Send + Sync + 'static> ComponentBuilder<S> {
    /// Uses a pre-built trait object.
    pub fn trait_instance(self, value: Arc<S>) -> Self {
        let value: AnyArc = Arc::new(value);
        self.with_ctor(Arc::new(move |_: &ResolverContext<'_>| -> DiResult<AnyArc> { Ok(value.clone()) }))
    }

    /// Builds trait objects with `factory`.
    pub fn trait_factory<F>(self, factory: F) -> Self
    where
        F: Fn(&ResolverContext<'_>) -> Arc<S> + Send + Sync + 'static,
    {
        self.with_ctor(Arc::new(move |ctx: &ResolverContext<'_>| -> DiResult<AnyArc> {
            Ok(Arc::new(factory(ctx)))
        }))
    }
}

impl<S: ?Sized> IntoRegistration for ComponentBuilder<S> {
    fn into_registration(self) -> ComponentRegistration {
        self.registration
    }
}

/// Builder for an open generic component.
///
/// The factory receives the arguments of the requested closed type and
/// returns the instance type-erased; the optional constraint rejects argument
/// lists the implementation cannot be closed over.
///
/// # Examples
///
/// ```rust
/// use ferrous_bridge::{AnyArc, Component, ComponentRegistry, GenericDefinition, Kernel, ServiceType};
/// use std::sync::Arc;
///
/// const LIST: GenericDefinition = GenericDefinition::new("List", 1);
///
/// let kernel = Kernel::new();
/// kernel
///     .register(
///         Component::for_generic(LIST)
///             .constraint(|args| args[0] == ServiceType::of::<u8>())
///             .factory(|_, _| Ok(Arc::new(vec![0u8; 4]) as AnyArc)),
///     )
///     .unwrap();
///
/// let bytes = kernel.resolve(&LIST.close([ServiceType::of::<u8>()])).unwrap();
/// assert_eq!(bytes.downcast::<Vec<u8>>().unwrap().len(), 4);
/// assert!(kernel
///     .resolve(&LIST.close([ServiceType::of::<u16>()]))
///     .unwrap_err()
///     .is_generic_mismatch());
/// ```
pub struct GenericComponent {
    registration: ComponentRegistration,
    ctor: Option<Arc<GenericCtorFn>>,
    constraint: Option<Arc<ConstraintFn>>,
}

impl GenericComponent {
    /// Records the implementing definition when it differs from the service.
    pub fn implemented_by(mut self, definition: GenericDefinition) -> Self {
        self.registration.implementation = definition.open();
        self
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.registration.name = Some(name.into());
        self
    }

    pub fn lifetime(mut self, lifetime: Lifetime) -> Self {
        self.registration.lifetime = lifetime;
        self
    }

    pub fn as_default(mut self) -> Self {
        self.registration.is_default = true;
        self
    }

    pub fn with_provenance(mut self, provenance: Provenance) -> Self {
        self.registration.provenance = provenance;
        self
    }

    pub fn keyed(mut self, key: impl Into<ServiceKey>) -> Self {
        self.registration.key = Some(key.into());
        self
    }

    pub fn factory<F>(mut self, factory: F) -> Self
    where
        F: Fn(&ResolverContext<'_>, &[ServiceType]) -> DiResult<AnyArc> + Send + Sync + 'static,
    {
        let ctor: Arc<GenericCtorFn> = Arc::new(factory);
        self.ctor = Some(ctor);
        self
    }

    pub fn constraint<F>(mut self, constraint: F) -> Self
    where
        F: Fn(&[ServiceType]) -> bool + Send + Sync + 'static,
    {
        let constraint: Arc<ConstraintFn> = Arc::new(constraint);
        self.constraint = Some(constraint);
        self
    }
}

impl IntoRegistration for GenericComponent {
    fn into_registration(self) -> ComponentRegistration {
        let mut registration = self.registration;
        let constraint = self.constraint;
        registration.activator = self
            .ctor
            .map(|ctor| Activator::OpenGeneric { ctor, constraint });
        registration
    }
}
