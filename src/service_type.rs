//! Runtime service type descriptors.

use std::any::TypeId;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// An open generic definition: a parameterized type not yet bound to arguments.
///
/// Rust erases generics at runtime, so a definition is identified by a stable
/// name and its arity rather than by reflection.
///
/// # Examples
///
/// ```rust
/// use ferrous_bridge::{GenericDefinition, ServiceType};
///
/// const REPOSITORY: GenericDefinition = GenericDefinition::new("Repository", 1);
///
/// let closed = REPOSITORY.close([ServiceType::of::<u32>()]);
/// assert_eq!(closed.to_string(), "Repository<u32>");
/// assert!(REPOSITORY.open().is_generic_definition());
/// assert!(!closed.is_generic_definition());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GenericDefinition {
    name: &'static str,
    arity: usize,
}

impl GenericDefinition {
    /// Declares a definition with the given name and number of type parameters.
    pub const fn new(name: &'static str, arity: usize) -> Self {
        Self { name, arity }
    }

    /// Definition name without parameters.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Number of type parameters.
    pub fn arity(&self) -> usize {
        self.arity
    }

    /// The open definition as a service type.
    pub fn open(self) -> ServiceType {
        ServiceType::Generic(self)
    }

    /// Binds the definition to concrete arguments.
    pub fn close<I>(self, args: I) -> ServiceType
    where
        I: IntoIterator<Item = ServiceType>,
    {
        ServiceType::Closed(self, args.into_iter().collect())
    }
}

/// Descriptor for a requested or registered service type.
///
/// `Type` covers concrete types and trait objects (`dyn Trait`), which are
/// compared by `TypeId` only; the name is kept for diagnostics.
/// `Generic` is an open definition, `Closed` a definition bound to arguments,
/// and `Collection` the "all instances of T" shape.
///
/// # Examples
///
/// ```rust
/// use ferrous_bridge::ServiceType;
///
/// trait Logger: Send + Sync {}
///
/// let logger = ServiceType::of::<dyn Logger>();
/// let all_loggers = ServiceType::collection_of(logger.clone());
///
/// assert_eq!(all_loggers.collection_element(), Some(&logger));
/// assert_eq!(ServiceType::of::<u8>(), ServiceType::of::<u8>());
/// assert_ne!(ServiceType::of::<u8>(), ServiceType::of::<u16>());
/// ```
#[derive(Debug, Clone)]
pub enum ServiceType {
    /// Concrete type or trait object
    Type(TypeId, &'static str),
    /// Open generic definition
    Generic(GenericDefinition),
    /// Generic definition bound to concrete arguments
    Closed(GenericDefinition, Arc<[ServiceType]>),
    /// Collection of the element type
    Collection(Arc<ServiceType>),
}

impl ServiceType {
    /// Descriptor for a Rust type or trait object.
    #[inline]
    pub fn of<T: ?Sized + 'static>() -> Self {
        ServiceType::Type(TypeId::of::<T>(), std::any::type_name::<T>())
    }

    /// Descriptor for "collection of `element`".
    pub fn collection_of(element: ServiceType) -> Self {
        ServiceType::Collection(Arc::new(element))
    }

    /// True for an open generic definition.
    pub fn is_generic_definition(&self) -> bool {
        matches!(self, ServiceType::Generic(_))
    }

    /// Element type when this is a collection shape.
    pub fn collection_element(&self) -> Option<&ServiceType> {
        match self {
            ServiceType::Collection(element) => Some(element),
            _ => None,
        }
    }

    /// The definition a closed or open generic type was built from.
    pub fn generic_definition(&self) -> Option<GenericDefinition> {
        match self {
            ServiceType::Generic(def) | ServiceType::Closed(def, _) => Some(*def),
            _ => None,
        }
    }

    /// Arguments of a closed generic; empty for every other shape.
    pub fn generic_arguments(&self) -> &[ServiceType] {
        match self {
            ServiceType::Closed(_, args) => args,
            _ => &[],
        }
    }

    /// Name used in diagnostics and generated registration names.
    pub fn display_name(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for ServiceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServiceType::Type(_, name) => f.write_str(name),
            ServiceType::Generic(def) => {
                write!(f, "{}<", def.name)?;
                for i in 0..def.arity {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    f.write_str("_")?;
                }
                f.write_str(">")
            }
            ServiceType::Closed(def, args) => {
                write!(f, "{}<", def.name)?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", arg)?;
                }
                f.write_str(">")
            }
            ServiceType::Collection(element) => write!(f, "Collection<{}>", element),
        }
    }
}

impl PartialEq for ServiceType {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            // TypeId only, the name is diagnostic
            (ServiceType::Type(a, _), ServiceType::Type(b, _)) => a == b,
            (ServiceType::Generic(a), ServiceType::Generic(b)) => a == b,
            (ServiceType::Closed(a, args_a), ServiceType::Closed(b, args_b)) => {
                a == b && args_a == args_b
            }
            (ServiceType::Collection(a), ServiceType::Collection(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for ServiceType {}

impl Hash for ServiceType {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match self {
            ServiceType::Type(id, _) => {
                0u8.hash(state);
                id.hash(state);
            }
            ServiceType::Generic(def) => {
                1u8.hash(state);
                def.hash(state);
            }
            ServiceType::Closed(def, args) => {
                2u8.hash(state);
                def.hash(state);
                args.hash(state);
            }
            ServiceType::Collection(element) => {
                3u8.hash(state);
                element.hash(state);
            }
        }
    }
}
