//! Arbitration between several unkeyed candidates for one service.

use std::sync::Arc;

use crate::registration::{Provenance, RegistrationHandle};

/// Outcome of [`arbitrate`].
#[derive(Debug, Clone, Copy)]
pub enum Precedence<'a> {
    /// Only native registrations are involved: defer to the registry's own
    /// default precedence.
    Native,
    /// Adapter precedence picked this handle.
    Selected(&'a Arc<RegistrationHandle>),
}

impl Precedence<'_> {
    /// Short rule name for logs.
    pub fn rule(&self) -> &'static str {
        match self {
            Precedence::Native => "native",
            Precedence::Selected(_) => "last-closed-wins",
        }
    }
}

/// Decides which of several unkeyed `candidates` serves a request.
///
/// When no candidate came through the adapter the choice belongs to the
/// registry. Otherwise the most recent closed registration wins, and when
/// every candidate is an open generic the most recent one does. The result
/// depends on nothing but the candidate sequence.
///
/// # Examples
///
/// ```rust
/// use ferrous_bridge::{arbitrate, Precedence, Provenance, RegistrationHandle, ServiceType};
/// use std::sync::Arc;
///
/// let handle = |name: &str, provenance| {
///     Arc::new(
///         RegistrationHandle::new(ServiceType::of::<u8>(), ServiceType::of::<u8>(), name)
///             .with_provenance(provenance),
///     )
/// };
///
/// let native = [handle("a", Provenance::Native), handle("b", Provenance::Native)];
/// assert!(matches!(arbitrate(&native), Precedence::Native));
///
/// let mixed = [handle("a", Provenance::Native), handle("b", Provenance::Adapter)];
/// match arbitrate(&mixed) {
///     Precedence::Selected(chosen) => assert_eq!(chosen.name(), "b"),
///     Precedence::Native => unreachable!(),
/// }
/// ```
pub fn arbitrate(candidates: &[Arc<RegistrationHandle>]) -> Precedence<'_> {
    if !candidates
        .iter()
        .any(|handle| handle.provenance() == Provenance::Adapter)
    {
        return Precedence::Native;
    }
    candidates
        .iter()
        .rev()
        .find(|handle| !handle.is_open_generic())
        .or_else(|| candidates.last())
        .map_or(Precedence::Native, Precedence::Selected)
}
