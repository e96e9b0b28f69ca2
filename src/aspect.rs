//! Cross-cutting tags attached to an [`crate::operation::Operation`].

use bitflags::bitflags;

bitflags! {
    /// The set of aspects an operation carries. An operation's aspect membership never
    /// changes over the operation's lifetime; it is consulted by the executor to decide
    /// routing, retry eligibility, and cursor pinning behavior without needing to downcast
    /// the operation to a concrete type.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct AspectSet: u8 {
        /// The operation reads data and should be considered for retryable-read handling.
        const READ_OPERATION     = 0b0000_0001;
        /// The operation writes data and should be considered for retryable-write handling.
        const WRITE_OPERATION    = 0b0000_0010;
        /// The operation may be safely retried once after a recoverable failure, subject to
        /// the eligibility rules in the retry controller.
        const RETRYABLE          = 0b0000_0100;
        /// The operation continues an already-open cursor (e.g. a `getMore`-style fetch) and
        /// must stay pinned to the server that opened it.
        const CURSOR_ITERATING   = 0b0000_1000;
        /// The operation opens a new cursor. Combined with `RETRYABLE`, a network failure
        /// during this operation triggers the load-balanced pin-release rule (see
        /// `spec.md` §4.4).
        const CURSOR_CREATING    = 0b0001_0000;
    }
}

impl AspectSet {
    /// Whether this combination of aspects is one the executor knows how to handle.
    ///
    /// `CURSOR_ITERATING` and `CURSOR_CREATING` are mutually exclusive (a cursor is either
    /// being opened or continued, never both at once), and an operation must be at least a
    /// read or a write. A host crate that hand-assembles an `AspectSet` incorrectly trips
    /// this check rather than producing silently wrong routing.
    pub(crate) fn is_well_formed(self) -> bool {
        let is_cursor_contradiction =
            self.contains(AspectSet::CURSOR_ITERATING) && self.contains(AspectSet::CURSOR_CREATING);
        let is_rw_unspecified =
            !self.contains(AspectSet::READ_OPERATION) && !self.contains(AspectSet::WRITE_OPERATION);
        !is_cursor_contradiction && !is_rw_unspecified
    }
}
