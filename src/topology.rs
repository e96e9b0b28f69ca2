//! Consumer-side interfaces the Executor Entry and Retry Controller depend
//! on: a topology handle capable of server selection and session issuance,
//! and the server handle it hands back.
//!
//! Grounded on `examples/mongodb-mongo-rust-driver/src/sdam.rs` and
//! `src/client/executor.rs`, which split the same two responsibilities
//! across `Topology` (selection, capability queries) and `SelectedServer`
//! (the handle an operation executes against) rather than folding server
//! identity into the selection call itself.

use uuid::Uuid;

use crate::config::ExecutorConfig;
use crate::error::Result;
use crate::selector::ServerSelector;
use crate::session::Session;

/// A read-only capability and selection surface over the topology. This
/// crate never constructs one; a host driver supplies an adapter over its
/// real topology monitor.
pub trait Topology: Send + Sync {
    /// The server-handle type this topology selects.
    type Server: ServerHandle;

    /// The resolved executor-level settings this topology was built with.
    /// `retry_reads`, `retry_writes`, and `supports_snapshot_reads` below
    /// default to reading straight from this value; a topology overrides
    /// one of them individually only if it needs to derive that particular
    /// answer dynamically instead of from a fixed config.
    fn config(&self) -> &ExecutorConfig;

    /// Whether the topology has not yet determined session support, per
    /// spec.md §4.1 step 2. While true, the Executor Entry forces a trivial
    /// selection to complete discovery before proceeding.
    fn should_check_for_session_support(&self) -> bool;

    /// Whether the topology (once discovery has settled) supports sessions
    /// at all.
    fn has_session_support(&self) -> bool;

    /// Whether the topology can serve snapshot reads. Defaults to
    /// `self.config().supports_snapshot_reads`.
    fn supports_snapshot_reads(&self) -> bool {
        self.config().supports_snapshot_reads
    }

    /// The wire version common to every server the topology currently
    /// tracks, consulted when building a `SecondaryWritable` selector.
    fn common_wire_version(&self) -> i32;

    /// Whether retryable reads are enabled. Defaults to
    /// `self.config().retry_reads`.
    fn retry_reads(&self) -> bool {
        self.config().retry_reads
    }

    /// Whether retryable writes are enabled. Defaults to
    /// `self.config().retry_writes`.
    fn retry_writes(&self) -> bool {
        self.config().retry_writes
    }

    /// Selects a server against the given selector, in the context of the
    /// given session (sessions influence pinning-aware selection on
    /// load-balanced deployments). `session` is absent for the topology
    /// readiness probe in spec.md §4.1 step 2, which runs before a session
    /// has been acquired.
    fn select_server(
        &self,
        selector: &ServerSelector<<Self::Server as ServerHandle>::Description>,
        session: Option<&Session>,
    ) -> impl std::future::Future<Output = Result<Self::Server>> + Send;

    /// Starts a new session. `owner` is `Some` when the Executor Entry is
    /// synthesizing an implicit session on the caller's behalf: the
    /// returned session must be tagged `SessionOwnership::Implicit { owner
    /// }` with that exact token, so the Executor Entry's completion step
    /// (spec.md §4.1 step 4) can recognize the session as its own to end.
    /// `owner` is `None` exactly when `explicit` is `true`, reflecting a
    /// caller-initiated session this crate never tears down itself.
    fn start_session(
        &self,
        owner: Option<Uuid>,
        explicit: bool,
    ) -> impl std::future::Future<Output = Result<Session>> + Send;

    /// Ends a session previously returned by `start_session`.
    fn end_session(&self, session: &mut Session) -> impl std::future::Future<Output = Result<()>> + Send;
}

/// A server handle returned by server selection, borrowed for the duration
/// of a single `Operation::execute` call.
pub trait ServerHandle: Send + Sync {
    /// The opaque identity type used by the `SameServer` selector to pin a
    /// cursor continuation to the server that opened it.
    type Description: Clone + PartialEq + Send + Sync + 'static;

    /// This server's identity, stashed on a cursor-opening operation so a
    /// later `getMore`-style continuation can reselect the same server.
    fn description(&self) -> Self::Description;

    /// Whether this server was reached through a load balancer, relevant to
    /// the load-balanced cursor network-error unpin rule (spec.md §4.4).
    fn load_balanced(&self) -> bool;

    /// This server's maximum supported wire protocol version, consulted for
    /// read-retry eligibility (wire >= 6) and `SecondaryWritable` selection.
    fn max_wire_version(&self) -> i32;

    /// Whether this server reports support for retryable writes.
    fn supports_retryable_writes(&self) -> bool;
}
