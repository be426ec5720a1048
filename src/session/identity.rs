//! Identity matching across the engine boundary
//!
//! The engine is free to rewrite names, damage, crews and owners; the
//! external identity is the only field we trust to survive the round trip.

use crate::campaign::{Person, Unit};
use crate::core::types::ExternalId;
use crate::engine::{EngineCrew, EngineEntity};

/// Anything that may carry an external identity
pub trait HasExternalId {
    fn external_id(&self) -> Option<&ExternalId>;
}

/// True iff both sides carry the same, non-empty identity
pub fn matches<A, B>(a: &A, b: &B) -> bool
where
    A: HasExternalId + ?Sized,
    B: HasExternalId + ?Sized,
{
    match (present(a), present(b)) {
        (Some(x), Some(y)) => x == y,
        _ => false,
    }
}

/// Position of the first item matching `probe`
pub fn position_of<T, Q>(items: &[T], probe: &Q) -> Option<usize>
where
    T: HasExternalId,
    Q: HasExternalId + ?Sized,
{
    items.iter().position(|item| matches(item, probe))
}

pub fn contains<T, Q>(items: &[T], probe: &Q) -> bool
where
    T: HasExternalId,
    Q: HasExternalId + ?Sized,
{
    position_of(items, probe).is_some()
}

fn present<T: HasExternalId + ?Sized>(item: &T) -> Option<&ExternalId> {
    item.external_id().filter(|id| !id.as_str().is_empty())
}

impl HasExternalId for ExternalId {
    fn external_id(&self) -> Option<&ExternalId> {
        Some(self)
    }
}

impl HasExternalId for Option<ExternalId> {
    fn external_id(&self) -> Option<&ExternalId> {
        self.as_ref()
    }
}

impl HasExternalId for Unit {
    fn external_id(&self) -> Option<&ExternalId> {
        Some(&self.external_id)
    }
}

impl HasExternalId for Person {
    fn external_id(&self) -> Option<&ExternalId> {
        Some(&self.external_id)
    }
}

impl HasExternalId for EngineEntity {
    fn external_id(&self) -> Option<&ExternalId> {
        self.external_id.as_ref()
    }
}

impl HasExternalId for EngineCrew {
    fn external_id(&self) -> Option<&ExternalId> {
        self.external_id.as_ref()
    }
}
