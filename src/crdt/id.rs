//! Character identity and the total order used for RGA tie-breaking.
//!
//! Each character minted by a replica gets a `CharId`: the pair of the
//! replica's site id and a strictly-per-replica logical clock. Uniqueness is
//! the minting replica's responsibility alone — two replicas never need to
//! coordinate to avoid collisions, since no replica ever mints on another's
//! behalf.

use std::fmt;
use std::sync::Arc;

/// Globally unique id for one RGA character.
///
/// `site` is interned by the owning [`CrdtManager`](crate::crdt::CrdtManager)
/// so that repeated ids from the same replica share one allocation.
///
/// [`CharId::SENTINEL`] is the reserved id `("", 0)` meaning "beginning of
/// document". It is never minted by [`CrdtManager::local_insert`] and is not
/// comparable via [`CharId::id_lt`] — callers must branch on
/// [`CharId::is_sentinel`] first.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CharId {
    pub site: Arc<str>,
    pub clock: u32,
}

impl CharId {
    /// Reserved id representing "before the first character".
    pub fn sentinel() -> Self {
        CharId {
            site: Arc::from(""),
            clock: 0,
        }
    }

    pub fn new(site: Arc<str>, clock: u32) -> Self {
        CharId { site, clock }
    }

    pub fn is_sentinel(&self) -> bool {
        self.clock == 0 && self.site.is_empty()
    }

    pub fn id_eq(&self, other: &CharId) -> bool {
        self == other
    }

    /// Strict total order over non-sentinel ids: compare `clock` first, then
    /// `site` lexicographically. Not meaningful for the sentinel — use
    /// [`CharId::is_sentinel`] before calling this in protocol code.
    pub fn id_lt(&self, other: &CharId) -> bool {
        debug_assert!(!self.is_sentinel() && !other.is_sentinel());
        (self.clock, &*self.site) < (other.clock, &*other.site)
    }
}

impl fmt::Display for CharId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_sentinel() {
            write!(f, "<sentinel>")
        } else {
            write!(f, "{}@{}", self.clock, self.site)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sentinel_is_sentinel() {
        assert!(CharId::sentinel().is_sentinel());
        assert!(!CharId::new(Arc::from("a"), 1).is_sentinel());
        assert!(!CharId::new(Arc::from(""), 1).is_sentinel());
    }

    #[test]
    fn id_lt_orders_by_clock_then_site() {
        let a1 = CharId::new(Arc::from("A"), 1);
        let b1 = CharId::new(Arc::from("B"), 1);
        let a2 = CharId::new(Arc::from("A"), 2);

        assert!(a1.id_lt(&b1));
        assert!(!b1.id_lt(&a1));
        assert!(a1.id_lt(&a2));
        assert!(b1.id_lt(&a2));
    }

    #[test]
    fn id_eq_matches_derived_eq() {
        let a = CharId::new(Arc::from("A"), 1);
        let a2 = CharId::new(Arc::from("A"), 1);
        assert!(a.id_eq(&a2));
    }
}
