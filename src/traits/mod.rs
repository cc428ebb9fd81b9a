//! Resolution and disposal traits shared by providers, scopes and factory contexts.

mod dispose;
mod resolver;

pub use dispose::Dispose;
pub use resolver::{Resolver, ResolverCore};
