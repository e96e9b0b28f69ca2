//! The Server Selector Strategy: a pure value computed once per invocation
//! from the operation, then reused unchanged for the retry attempt (spec.md
//! §4.2, property P5).
//!
//! Grounded on `examples/mongodb-mongo-rust-driver/src/sdam/description/topology.rs`'s
//! `SelectionCriteria`, which is likewise a small tagged enum the selection
//! engine matches on rather than a trait object — collapsed here to the
//! three variants spec.md names instead of that enum's full read-preference
//! and predicate-based variants.

use crate::read_preference::ReadPreference;

/// How to choose a server for one attempt of an operation.
///
/// Generic over `D`, the opaque server-description type a `Topology`'s
/// associated `ServerHandle::Description` provides, so `SameServer` can pin
/// to whatever identity the host topology uses.
#[derive(Clone, Debug, PartialEq)]
pub enum ServerSelector<D> {
    /// Select by read preference. The default path for any operation that
    /// is neither a cursor continuation nor a secondary-writable attempt.
    ByReadPreference(ReadPreference),

    /// Pin to the exact server identified by `D`. Used for CURSOR_ITERATING
    /// operations, which must continue against the server that opened the
    /// cursor (spec.md §4.2).
    SameServer(D),

    /// Select a secondary capable of serving a write, gated by the
    /// topology's common wire version. Used when the operation requests
    /// `try_secondary_write`.
    SecondaryWritable {
        common_wire_version: i32,
        read_preference: ReadPreference,
    },
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn selector_equality_is_structural() {
        let a: ServerSelector<u32> = ServerSelector::SameServer(7);
        let b: ServerSelector<u32> = ServerSelector::SameServer(7);
        assert_eq!(a, b);

        let c: ServerSelector<u32> = ServerSelector::SameServer(8);
        assert_ne!(a, c);
    }

    #[test]
    fn by_read_preference_variants_distinguish_modes() {
        let primary: ServerSelector<u32> = ServerSelector::ByReadPreference(ReadPreference::Primary);
        let secondary: ServerSelector<u32> =
            ServerSelector::ByReadPreference(ReadPreference::SecondaryPreferred);
        assert_ne!(primary, secondary);
    }
}
