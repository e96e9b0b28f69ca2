//! The Executor Entry and Retry Controller (spec.md §4.1, §4.4): the single
//! public function that sequences session acquisition, compatibility
//! checks, server selection, and the at-most-one-retry state machine.
//!
//! Grounded on `execute_operation_with_details`/`execute_operation_with_retry`
//! in `examples/mongodb-mongo-rust-driver/src/client/executor.rs`: the same
//! two-phase split (an outer entry point running precondition checks, an
//! inner loop owning the retry state), the same `Box::pin` recursion for
//! the topology-readiness probe, and the same pattern of carrying the first
//! attempt's error forward so a failed retry can fall back to it. The
//! panic-safe teardown below is grounded on the `AssertUnwindSafe(..).catch_unwind()`
//! pattern in `examples/mongodb-mongo-rust-driver/src/test/atlas_planned_maintenance_testing/mod.rs`.

use std::panic::AssertUnwindSafe;

use futures::FutureExt;
use uuid::Uuid;

use crate::aspect::AspectSet;
use crate::error::{Error, ErrorKind, Result, NO_WRITES_PERFORMED};
use crate::operation::{Operation, Retryability};
use crate::read_preference::ReadPreference;
use crate::selector::ServerSelector;
use crate::session::{Session, SessionOwnership};
use crate::topology::{ServerHandle, Topology};

/// Dispatches a single logical operation against one server in the given
/// topology: selects a server, attaches or creates a session, enforces
/// transaction/read-preference compatibility, and retries once if the
/// first attempt fails with a recoverable error.
///
/// This is the crate's sole public entry point, mirroring spec.md §2's
/// description of the Executor Entry as "the single public function that
/// sequences the above."
pub async fn execute_operation<Top, Op>(
    topology: &Top,
    op: &Op,
    session: Option<&mut Session>,
) -> Result<Op::Output>
where
    Top: Topology,
    Op: Operation<Server = Top::Server>,
{
    // Step 1: type gate. A programmer-error class, never retryable.
    if !op.aspects().is_well_formed() {
        return Err(Error::new(ErrorKind::RuntimeViolation {
            message: format!(
                "operation carries an ill-formed aspect set: {:?}",
                op.aspects()
            ),
        }));
    }

    // Step 2: topology readiness. A trivial selection forces discovery to
    // settle; the executor then re-enters itself. `Box::pin` is required
    // because this function is itself `async fn` and cannot otherwise
    // recurse.
    if topology.should_check_for_session_support() {
        #[cfg(feature = "tracing-unstable")]
        tracing::debug!("forcing topology discovery before operation dispatch");
        let probe = ServerSelector::ByReadPreference(ReadPreference::PrimaryPreferred);
        topology.select_server(&probe, None).await?;
        return Box::pin(execute_operation(topology, op, session)).await;
    }

    if !topology.has_session_support() && session.is_some() {
        return Err(Error::new(ErrorKind::Compatibility {
            message: "a session was supplied but the topology does not support sessions".into(),
        }));
    }

    // Step 3: session acquisition.
    let mut session = session;
    let mut implicit_session: Option<Session> = None;
    let mut implicit_owner: Option<Uuid> = None;

    match session.as_deref_mut() {
        Some(existing) => {
            if existing.has_ended() {
                return Err(Error::new(ErrorKind::ExpiredSession));
            }
            if existing.snapshot_enabled() && !topology.supports_snapshot_reads() {
                return Err(Error::new(ErrorKind::Compatibility {
                    message: "snapshot reads were requested but the topology cannot serve them"
                        .into(),
                }));
            }
        }
        None => {
            if topology.has_session_support() {
                let owner = Uuid::new_v4();
                implicit_owner = Some(owner);
                let started = topology.start_session(Some(owner), false).await?;
                implicit_session = Some(started);
            } else {
                // No session support anywhere in the topology and none was
                // supplied: proceed with a local placeholder the completion
                // step never treats as implicit-owned.
                implicit_session = Some(Session::new(SessionOwnership::Explicit, false));
            }
        }
    }

    if let Some(owned) = implicit_session.as_mut() {
        session = Some(owned);
    }
    let session = session.expect("session is always populated by this point");

    // The retry controller's future is caught rather than simply awaited so
    // that a panic unwinding through `Operation::execute` still runs the
    // implicit-session teardown below before propagating (spec.md §5, P2).
    // `AssertUnwindSafe` is needed because `&mut Session`/`&Top`/`&Op` are
    // not themselves `UnwindSafe`; the teardown step never inspects
    // partially-mutated state through those references after a catch, only
    // `implicit_session`/`implicit_owner`, which this function owns outright.
    let outcome = AssertUnwindSafe(run_with_retry(topology, op, session))
        .catch_unwind()
        .await;

    // Step 4: end the implicit session on every exit path, success, error,
    // or panic unwind, before resuming the unwind or returning the outcome.
    if let Some(owner) = implicit_owner {
        if let Some(mut owned) = implicit_session.take() {
            if owned.is_owned_by(owner) {
                match topology.end_session(&mut owned).await {
                    Ok(()) => {
                        #[cfg(feature = "tracing-unstable")]
                        tracing::debug!(%owner, "implicit session ended");
                    }
                    Err(_end_session_error) => {
                        #[cfg(feature = "tracing-unstable")]
                        tracing::warn!(%owner, error = %_end_session_error, "failed to end implicit session");
                    }
                }
                owned.mark_ended();
            }
        }
    }

    match outcome {
        Ok(result) => result,
        Err(panic_payload) => std::panic::resume_unwind(panic_payload),
    }
}

/// The Retry Controller: one attempt, classification on failure, and at
/// most one further attempt (spec.md §4.4).
async fn run_with_retry<Top, Op>(topology: &Top, op: &Op, session: &mut Session) -> Result<Op::Output>
where
    Top: Topology,
    Op: Operation<Server = Top::Server>,
{
    check_transaction_read_preference(op, session)?;
    maybe_unpin_committed_transaction(op, session);

    // Computed once and reused for the retry (spec.md §4.2, property P5).
    let selector = build_selector(topology, op)?;

    // Redundant per spec.md §4.3 / §9's open question: retained rather than
    // merged with the check above, since the session may enter a
    // transaction concurrently with selector setup.
    check_transaction_read_preference(op, session)?;

    #[cfg(feature = "tracing-unstable")]
    tracing::debug!("attempting server selection");
    let first_server = match topology.select_server(&selector, Some(&*session)).await {
        Ok(server) => server,
        Err(err) => {
            #[cfg(feature = "tracing-unstable")]
            tracing::warn!(error = %err, "server selection failed");
            return Err(err);
        }
    };

    let eligibility = retry_eligibility(topology, op, &first_server, session);
    if let Some(Retryability::Write) = eligibility {
        session.increment_txn_number();
    }
    let will_retry_write = matches!(eligibility, Some(Retryability::Write));

    match op.execute(&first_server, session, will_retry_write).await {
        Ok(result) => Ok(result),
        Err(first_error) => {
            let Some(class) = eligibility else {
                return Err(first_error);
            };

            // MMAPv1 special case takes priority over the ordinary label
            // check: the server never attaches RetryableWriteError here, so
            // without this branch the error would just fall through to
            // "deliver the first error" unreplaced.
            if class == Retryability::Write && first_error.is_mmapv1_retryable_write_rejection() {
                return Err(Error::new(ErrorKind::Diagnostic {
                    message: "This deployment does not support retryable writes. Please add \
                              retryWrites=false to your connection configuration."
                        .into(),
                })
                .with_source(first_error));
            }

            let should_retry = match class {
                Retryability::Read => first_error.is_read_retryable(),
                Retryability::Write => first_error.is_write_retryable(),
                Retryability::None => false,
            };
            if !should_retry {
                return Err(first_error);
            }

            #[cfg(feature = "tracing-unstable")]
            tracing::debug!(class = ?class, "retry entered after recoverable failure");

            if first_error.is_network_error()
                && first_server.load_balanced()
                && session.is_pinned()
                && !session.transaction().in_transaction()
                && op.aspects().contains(AspectSet::CURSOR_CREATING)
            {
                #[cfg(feature = "tracing-unstable")]
                tracing::debug!("force-unpinning session before load-balanced cursor retry");
                session.force_unpin();
            }

            #[cfg(feature = "tracing-unstable")]
            tracing::debug!("attempting server selection for retry");
            let second_server = match topology.select_server(&selector, Some(&*session)).await {
                Ok(server) => server,
                Err(err) => {
                    #[cfg(feature = "tracing-unstable")]
                    tracing::warn!(error = %err, "server selection failed on retry");
                    return Err(err);
                }
            };
            if !supports_retryable_class(&second_server, class) {
                #[cfg(feature = "tracing-unstable")]
                tracing::warn!("server selected for retry lacks the required retryable capability");
                return Err(Error::new(ErrorKind::ServerSelection {
                    message: "server selected for retry does not support the required \
                              retryable class"
                        .into(),
                }));
            }

            match op.execute(&second_server, session, will_retry_write).await {
                Ok(result) => Ok(result),
                Err(second_error) => {
                    // Mirrors the teacher's retry-path handling: a second
                    // failure is only surfaced as-is when it is itself a
                    // genuine server/retryable error that did *not* carry
                    // NoWritesPerformed; otherwise the original, more
                    // informative first error is delivered instead, since
                    // NoWritesPerformed means the retry attempt never
                    // actually touched data.
                    if (second_error.is_server_error()
                        || second_error.is_read_retryable()
                        || second_error.is_write_retryable())
                        && !second_error.contains_label(NO_WRITES_PERFORMED)
                    {
                        Err(second_error)
                    } else {
                        Err(first_error)
                    }
                }
            }
        }
    }
}

fn check_transaction_read_preference<Op: Operation>(op: &Op, session: &Session) -> Result<()> {
    if session.transaction().in_transaction() && !op.read_preference().is_primary() {
        return Err(Error::new(ErrorKind::Transaction {
            message: "read preference in a transaction must be primary".into(),
        }));
    }
    Ok(())
}

fn maybe_unpin_committed_transaction<Op: Operation>(op: &Op, session: &mut Session) {
    if session.is_pinned() && session.transaction().is_committed() && !op.bypass_pinning_check() {
        session.unpin();
    }
}

fn build_selector<Top, Op>(
    topology: &Top,
    op: &Op,
) -> Result<ServerSelector<<Op::Server as ServerHandle>::Description>>
where
    Top: Topology,
    Op: Operation<Server = Top::Server>,
{
    if op.aspects().contains(AspectSet::CURSOR_ITERATING) {
        let description = op.server_description().cloned().ok_or_else(|| {
            Error::new(ErrorKind::RuntimeViolation {
                message: "a CURSOR_ITERATING operation must carry a prior server description"
                    .into(),
            })
        })?;
        Ok(ServerSelector::SameServer(description))
    } else if op.try_secondary_write() {
        Ok(ServerSelector::SecondaryWritable {
            common_wire_version: topology.common_wire_version(),
            read_preference: op.read_preference(),
        })
    } else {
        Ok(ServerSelector::ByReadPreference(op.read_preference()))
    }
}

fn retry_eligibility<Top, Op>(
    topology: &Top,
    op: &Op,
    server: &Top::Server,
    session: &Session,
) -> Option<Retryability>
where
    Top: Topology,
    Op: Operation<Server = Top::Server>,
{
    let aspects = op.aspects();
    if !aspects.contains(AspectSet::RETRYABLE) || session.transaction().in_transaction() {
        return None;
    }

    if aspects.contains(AspectSet::READ_OPERATION)
        && op.can_retry_read()
        && topology.retry_reads()
        && server.max_wire_version() >= 6
        && op.retryability() == Retryability::Read
    {
        return Some(Retryability::Read);
    }

    if aspects.contains(AspectSet::WRITE_OPERATION)
        && op.can_retry_write()
        && topology.retry_writes()
        && server.supports_retryable_writes()
        && op.retryability() == Retryability::Write
    {
        return Some(Retryability::Write);
    }

    None
}

fn supports_retryable_class<S: ServerHandle>(server: &S, class: Retryability) -> bool {
    match class {
        Retryability::Read => server.max_wire_version() >= 6,
        Retryability::Write => server.supports_retryable_writes(),
        Retryability::None => true,
    }
}
