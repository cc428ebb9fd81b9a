//! "All instances of T" requests.

use std::any::type_name;
use std::slice;
use std::sync::Arc;

use crate::error::{DiError, DiResult};
use crate::registration::{AnyArc, RegistrationHandle};
use crate::registry::ComponentRegistry;
use crate::service_type::ServiceType;

/// Ordered, type-erased collection of instances of one element type.
///
/// This is what a collection-shaped request resolves to. The typed
/// [`Resolver::get_all`](crate::Resolver::get_all) family unwraps it.
#[derive(Clone)]
pub struct ServiceList {
    element: ServiceType,
    items: Vec<AnyArc>,
}

impl ServiceList {
    pub fn new(element: ServiceType, items: Vec<AnyArc>) -> Self {
        Self { element, items }
    }

    /// Element type of the collection.
    pub fn element(&self) -> &ServiceType {
        &self.element
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> slice::Iter<'_, AnyArc> {
        self.items.iter()
    }

    pub fn items(&self) -> &[AnyArc] {
        &self.items
    }

    pub fn into_items(self) -> Vec<AnyArc> {
        self.items
    }

    /// Items as concrete `T`.
    pub fn downcast<T: Send + Sync + 'static>(&self) -> DiResult<Vec<Arc<T>>> {
        self.items
            .iter()
            .map(|item| {
                item.clone()
                    .downcast::<T>()
                    .map_err(|_| DiError::TypeMismatch(type_name::<T>().to_string()))
            })
            .collect()
    }

    /// Items as trait objects `T`.
    pub fn downcast_trait<T: ?Sized + Send + Sync + 'static>(&self) -> DiResult<Vec<Arc<T>>> {
        self.items
            .iter()
            .map(|item| {
                item.clone()
                    .downcast::<Arc<T>>()
                    .map(|boxed| (*boxed).clone())
                    .map_err(|_| DiError::TypeMismatch(type_name::<T>().to_string()))
            })
            .collect()
    }
}

impl std::fmt::Debug for ServiceList {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceList")
            .field("element", &self.element.to_string())
            .field("len", &self.items.len())
            .finish()
    }
}

impl<'a> IntoIterator for &'a ServiceList {
    type Item = &'a AnyArc;
    type IntoIter = slice::Iter<'a, AnyArc>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

/// Resolves every unkeyed registration of `element`.
///
/// Keyed registrations never appear. When the set holds no keyed handles the
/// registry's own resolve-all is used as is; otherwise each unkeyed handle is
/// resolved by name and open generics that cannot be closed over `element`
/// are skipped.
pub(crate) fn resolve_all(registry: &dyn ComponentRegistry, element: &ServiceType) -> DiResult<ServiceList> {
    let (keyed, unkeyed): (Vec<Arc<RegistrationHandle>>, Vec<Arc<RegistrationHandle>>) = registry
        .handlers(element)
        .into_iter()
        .partition(|handle| handle.is_keyed());

    if unkeyed.is_empty() {
        return Ok(ServiceList::new(element.clone(), Vec::new()));
    }
    if keyed.is_empty() {
        return Ok(ServiceList::new(element.clone(), registry.resolve_all(element)?));
    }

    let mut items = Vec::with_capacity(unkeyed.len());
    for handle in &unkeyed {
        match registry.resolve_by_name(handle.name(), element) {
            Ok(instance) => items.push(instance),
            Err(err) if err.is_generic_mismatch() => {
                tracing::trace!(service = %element, name = handle.name(), "skipping incompatible open generic");
            }
            Err(err) => return Err(err),
        }
    }
    Ok(ServiceList::new(element.clone(), items))
}
