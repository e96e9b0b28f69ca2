//! The read preference attached to an operation, consulted by the Server
//! Selector Strategy and the transaction-compatibility check.

use std::fmt;

/// How an operation should choose among available servers.
///
/// Mirrors the teacher's `selection_criteria::ReadPreference` mode set, minus
/// tag sets and max-staleness: this core only needs to distinguish `Primary`
/// from everything else for the transaction-compatibility check and the
/// selector computation in §4.2; tag-based filtering is the topology's
/// concern once it has a mode to act on.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum ReadPreference {
    /// Always read from the primary. The only mode a transaction in
    /// progress tolerates (spec.md §4.3).
    #[default]
    Primary,
    /// Always read from a secondary.
    Secondary,
    /// Prefer the primary, falling back to a secondary if none is available.
    PrimaryPreferred,
    /// Prefer a secondary, falling back to the primary if none is available.
    SecondaryPreferred,
    /// Read from whichever server reports the lowest latency.
    Nearest,
}

impl ReadPreference {
    /// Whether this preference is exactly `Primary`. A transaction in
    /// progress only tolerates this mode (spec.md §3, §4.3).
    pub fn is_primary(self) -> bool {
        matches!(self, ReadPreference::Primary)
    }
}

impl fmt::Display for ReadPreference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ReadPreference::Primary => "primary",
            ReadPreference::Secondary => "secondary",
            ReadPreference::PrimaryPreferred => "primaryPreferred",
            ReadPreference::SecondaryPreferred => "secondaryPreferred",
            ReadPreference::Nearest => "nearest",
        };
        f.write_str(s)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn default_is_primary() {
        assert_eq!(ReadPreference::default(), ReadPreference::Primary);
        assert!(ReadPreference::default().is_primary());
    }

    #[test]
    fn non_primary_modes_report_as_such() {
        assert!(!ReadPreference::SecondaryPreferred.is_primary());
    }
}
