//! The Operation Descriptor contract (spec.md §3, §4.5).
//!
//! Grounded on `Operation`/`Retryability` in the teacher's own
//! `src/operation.rs`, trimmed to the handful of methods the Executor Entry
//! and Retry Controller actually call. The teacher's version additionally
//! builds wire commands and parses responses; this core is agnostic to both
//! and only needs the cross-cutting surface described here.

use crate::aspect::AspectSet;
use crate::error::Result;
use crate::read_preference::ReadPreference;
use crate::session::Session;
use crate::topology::ServerHandle;

/// The level of retryability an operation itself is willing to claim,
/// independent of topology settings or the error observed. Kept as its own
/// type, per `spec.md` §4.4's `canRetryRead`/`canRetryWrite` flags, rather
/// than inferring retry intent solely from `AspectSet::RETRYABLE`, since an
/// operation may carry the aspect yet decline retry for reasons local to its
/// own command shape (mirrors the teacher's `pub(crate) enum Retryability`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Retryability {
    /// Eligible for retryable-read handling.
    Read,
    /// Eligible for retryable-write handling.
    Write,
    /// Not retryable by this operation's own declaration.
    None,
}

/// A single logical database operation: a read, a write, or a cursor
/// continuation, dispatched by the Executor Entry against one server per
/// attempt.
///
/// Generic over `S: ServerHandle` rather than a boxed `dyn` handle: the
/// executor's own generic parameter over `Topology::Server` flows straight
/// through, so no object-safety workaround (and no extra `async-trait`
/// dependency) is needed for the `async fn` in this trait.
pub trait Operation: Send + Sync {
    /// The server handle type this operation executes against.
    type Server: ServerHandle;

    /// The successful result type.
    type Output: Send;

    /// The aspect membership of this operation. Queried by the selector
    /// computation and the retry-eligibility check; never changes over the
    /// operation's lifetime.
    fn aspects(&self) -> AspectSet;

    /// The effective read preference, defaulting to `Primary` if the
    /// operation did not specify one (spec.md §3).
    fn read_preference(&self) -> ReadPreference;

    /// The server description of the cursor this operation continues, if
    /// it carries `CURSOR_ITERATING`. Used to build a `SameServer` selector.
    fn server_description(&self) -> Option<&<Self::Server as ServerHandle>::Description>;

    /// Whether this operation should attempt to write against a secondary.
    fn try_secondary_write(&self) -> bool;

    /// Whether this operation bypasses the pin-release-on-commit check in
    /// spec.md §4.3.
    fn bypass_pinning_check(&self) -> bool;

    /// Whether this operation, if it carries `AspectSet::READ_OPERATION`,
    /// declares itself eligible for read retry.
    fn can_retry_read(&self) -> bool;

    /// Whether this operation, if it carries `AspectSet::WRITE_OPERATION`,
    /// declares itself eligible for write retry.
    fn can_retry_write(&self) -> bool;

    /// The retryability class this operation claims, independent of aspect
    /// membership or topology settings.
    fn retryability(&self) -> Retryability;

    /// Executes this operation against the given server, in the context of
    /// the given session. `will_retry_write` is passed as an argument
    /// rather than mutated onto the operation (spec.md §9's preferred
    /// re-architecture away from a mutable `options.willRetryWrite` field),
    /// so the descriptor remains immutable across both attempts.
    fn execute(
        &self,
        server: &Self::Server,
        session: &mut Session,
        will_retry_write: bool,
    ) -> impl std::future::Future<Output = Result<Self::Output>> + Send;
}
