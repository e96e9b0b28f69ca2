//! The Session Lifecycle Manager's value type: tracks ownership, pinning,
//! transaction state, and the monotonic transaction number.
//!
//! Grounded on `examples/mongodb-mongo-rust-driver/src/client/session.rs`'s
//! `ClientSession` (`txn_number`/`increment_txn_number`, `unpin`, the
//! `Drop` impl spawning best-effort async cleanup). That type also owns a
//! connection pool handle and change-stream resume state this core has no
//! use for; `Session` here keeps only the fields the Executor Entry and
//! Retry Controller read or mutate.

use uuid::Uuid;

/// Whether a session was supplied by the caller or synthesized by the
/// Executor Entry on the caller's behalf.
///
/// A tagged variant rather than a bare owner-token field, per the Design
/// Notes' preference for "an explicit tagged variant ... not a globally
/// unique symbol": the executor can match on this instead of comparing an
/// `Option<Uuid>` against a token it has to thread through separately.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionOwnership {
    /// Created by this invocation of the Executor Entry; `owner` uniquely
    /// identifies the invocation so nested or concurrent calls can each
    /// recognize the session they, and only they, are responsible for
    /// ending.
    Implicit { owner: Uuid },
    /// Supplied by the caller; the Executor Entry never ends this session.
    Explicit,
}

/// Transaction state tracked on a session, consulted by the compatibility
/// check in spec.md §4.3.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TransactionState {
    in_transaction: bool,
    committed: bool,
}

impl TransactionState {
    /// Whether a transaction is currently in progress on the owning session.
    pub fn in_transaction(&self) -> bool {
        self.in_transaction
    }

    /// Whether the in-progress (or most recently active) transaction has committed.
    pub fn is_committed(&self) -> bool {
        self.committed
    }

    /// Marks the transaction as started. Exposed for host-crate test
    /// doubles and for a real session layer's transaction-start path; this
    /// core never starts a transaction itself.
    pub fn start(&mut self) {
        self.in_transaction = true;
        self.committed = false;
    }

    /// Marks the in-progress transaction as committed, without clearing `in_transaction`
    /// (the compatibility check in spec.md §4.3 still applies until the next operation
    /// explicitly starts or clears the transaction).
    pub fn commit(&mut self) {
        self.committed = true;
    }

    /// Resets transaction state to "no transaction in progress".
    pub fn clear(&mut self) {
        self.in_transaction = false;
        self.committed = false;
    }
}

/// A logical session borrowed by the Executor Entry for the duration of one
/// invocation.
///
/// Session mutation (transaction-number increment, pin/unpin, the `ended`
/// flag) is serialized by the single-threaded execution contract described
/// in spec.md §5; `Session` itself does no internal locking.
#[derive(Debug)]
pub struct Session {
    ownership: SessionOwnership,
    ended: bool,
    snapshot_enabled: bool,
    pinned: bool,
    pending_pool_clear: bool,
    transaction: TransactionState,
    txn_number: i64,
}

impl Session {
    /// Constructs a new session with the given ownership. `snapshot_enabled`
    /// mirrors the caller's request for snapshot reads, checked against
    /// topology capability in the Executor Entry's session-acquisition step.
    pub fn new(ownership: SessionOwnership, snapshot_enabled: bool) -> Self {
        Self {
            ownership,
            ended: false,
            snapshot_enabled,
            pinned: false,
            pending_pool_clear: false,
            transaction: TransactionState::default(),
            txn_number: 0,
        }
    }

    /// Whether this session was created implicitly or supplied by the caller.
    pub fn ownership(&self) -> SessionOwnership {
        self.ownership
    }

    /// Whether this session was created implicitly by the given invocation,
    /// i.e. `owner` matches the token stamped on this session. Used at the
    /// Executor Entry's completion step to decide whether to end the
    /// session.
    pub fn is_owned_by(&self, owner: Uuid) -> bool {
        matches!(self.ownership, SessionOwnership::Implicit { owner: o } if o == owner)
    }

    /// Whether this session has already been ended.
    pub fn has_ended(&self) -> bool {
        self.ended
    }

    /// Whether this session requested snapshot reads.
    pub fn snapshot_enabled(&self) -> bool {
        self.snapshot_enabled
    }

    /// Whether this session is currently pinned to a server.
    pub fn is_pinned(&self) -> bool {
        self.pinned
    }

    /// Pins this session to the server it is next used against.
    pub fn pin(&mut self) {
        self.pinned = true;
    }

    /// Releases the pin with no pool-clearing implication, per the ordinary
    /// "transaction committed" unpin in spec.md §4.3 (`executor.rs`'s
    /// `maybe_unpin_committed_transaction`).
    pub fn unpin(&mut self) {
        self.pinned = false;
    }

    /// Releases the pin and marks the session's pool as needing to be
    /// cleared, per the load-balanced cursor network-error force-unpin rule
    /// in spec.md §4.4 (distinct from the plain [`Session::unpin`] spec.md
    /// §6 names as `unpin({force, forceClear}?)`). A `Topology` consults
    /// [`Session::needs_pool_clear`]/[`Session::take_pending_pool_clear`] to
    /// know it must evict pooled connections for the load-balanced service,
    /// a signal the plain unpin never raises.
    pub fn force_unpin(&mut self) {
        self.pinned = false;
        self.pending_pool_clear = true;
    }

    /// Whether a force-unpin has left a pool-clear pending for this session.
    pub fn needs_pool_clear(&self) -> bool {
        self.pending_pool_clear
    }

    /// Consumes the pending pool-clear flag, returning whether one was set.
    /// A `Topology`'s `select_server`/`end_session` implementation calls
    /// this once it has acted on the signal, so it fires exactly once per
    /// force-unpin.
    pub fn take_pending_pool_clear(&mut self) -> bool {
        std::mem::replace(&mut self.pending_pool_clear, false)
    }

    /// The transaction state tracked on this session.
    pub fn transaction(&self) -> &TransactionState {
        &self.transaction
    }

    /// Mutable access to the transaction state tracked on this session.
    pub fn transaction_mut(&mut self) -> &mut TransactionState {
        &mut self.transaction
    }

    /// The current transaction number, incremented once per retryable write
    /// invocation (spec.md §4.4, property P4).
    pub fn txn_number(&self) -> i64 {
        self.txn_number
    }

    /// Increments the transaction number. The Retry Controller calls this
    /// at most once per invocation, strictly before the first `execute`
    /// (spec.md §4.4, property P4).
    pub fn increment_txn_number(&mut self) {
        self.txn_number += 1;
    }

    /// Marks the session ended. Idempotent: ending an already-ended session
    /// is a no-op rather than an error, since both the explicit teardown
    /// path and the `Drop` backstop may race to call it.
    pub fn mark_ended(&mut self) {
        self.ended = true;
    }
}

impl Drop for Session {
    /// Best-effort diagnostic backstop for implicit-session teardown. A
    /// panic unwinding through an in-flight `Operation::execute` is now
    /// actually handled by `execute_operation` catching the unwind, awaiting
    /// `end_session`, and resuming the panic (spec.md §5), so this no longer
    /// needs to cover that case. What it still covers is a future dropped
    /// without ever being polled to completion (e.g. raced out by a
    /// `select!`/timeout) — no panic occurs there, so `catch_unwind` can't
    /// observe it, and logging that teardown was skipped is the only option
    /// available from inside `Drop`.
    ///
    /// Grounded on `ClientSession::drop` in the teacher, which spawns
    /// async pool check-in/abort work via an `AsyncDropToken` rather than
    /// relying on the caller to await a cleanup future. This crate has no
    /// runtime handle to spawn onto from inside `Drop` (the `Topology`
    /// implementing the real cleanup belongs to the host crate), so it can
    /// only log that cleanup was skipped.
    fn drop(&mut self) {
        if !self.ended {
            if let SessionOwnership::Implicit { owner } = self.ownership {
                #[cfg(feature = "tracing-unstable")]
                tracing::debug!(%owner, "implicit session dropped without being ended");
                #[cfg(not(feature = "tracing-unstable"))]
                let _ = owner;
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn implicit_session_reports_its_owner() {
        let owner = Uuid::new_v4();
        let session = Session::new(SessionOwnership::Implicit { owner }, false);
        assert!(session.is_owned_by(owner));
        assert!(!session.is_owned_by(Uuid::new_v4()));
    }

    #[test]
    fn explicit_session_is_never_owned() {
        let session = Session::new(SessionOwnership::Explicit, false);
        assert!(!session.is_owned_by(Uuid::new_v4()));
    }

    #[test]
    fn txn_number_increments_monotonically() {
        let mut session = Session::new(SessionOwnership::Explicit, false);
        assert_eq!(session.txn_number(), 0);
        session.increment_txn_number();
        assert_eq!(session.txn_number(), 1);
        session.increment_txn_number();
        assert_eq!(session.txn_number(), 2);
    }

    #[test]
    fn unpin_clears_pinned_state() {
        let mut session = Session::new(SessionOwnership::Explicit, false);
        session.pin();
        assert!(session.is_pinned());
        session.unpin();
        assert!(!session.is_pinned());
        assert!(!session.needs_pool_clear());
    }

    #[test]
    fn force_unpin_signals_a_pending_pool_clear() {
        let mut session = Session::new(SessionOwnership::Explicit, false);
        session.pin();
        session.force_unpin();
        assert!(!session.is_pinned());
        assert!(session.needs_pool_clear());
        assert!(session.take_pending_pool_clear());
        assert!(!session.needs_pool_clear());
    }

    #[test]
    fn mark_ended_is_idempotent() {
        let mut session = Session::new(SessionOwnership::Explicit, false);
        session.mark_ended();
        session.mark_ended();
        assert!(session.has_ended());
    }
}
