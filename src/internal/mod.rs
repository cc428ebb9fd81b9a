//! Internal implementation details.

pub(crate) mod circular;
pub(crate) mod dispose_bag;

pub(crate) use circular::with_circular_catch;
pub(crate) use dispose_bag::DisposeBag;

#[cfg(feature = "ahash")]
pub(crate) type FastMap<K, V> = ahash::AHashMap<K, V>;
#[cfg(not(feature = "ahash"))]
pub(crate) type FastMap<K, V> = std::collections::HashMap<K, V>;
