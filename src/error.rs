//! Contains the `Error` and `Result` types used throughout this crate.
//!
//! Grounded on `examples/mongodb-mongo-rust-driver/src/error.rs`: an `ErrorKind`
//! enum wrapped by an outer `Error` carrying a label set, plus a handful of classification
//! predicates the executor treats as opaque (`spec.md` §7).

use std::collections::HashSet;
use std::sync::Arc;

use thiserror::Error as ThisError;

/// The result type for all fallible operations in this crate.
pub type Result<T> = std::result::Result<T, Error>;

/// An error label indicating a failed write may be safely retried under the
/// transaction-number deduplication mechanism.
pub const RETRYABLE_WRITE_ERROR: &str = "RetryableWriteError";

/// An error label indicating a retryable write error occurred without the server having
/// performed the write, overriding the normal "replace the first error" retry policy (see
/// `spec.md` §4.4's retry-path handling).
pub const NO_WRITES_PERFORMED: &str = "NoWritesPerformed";

/// Illustrative codes a recoverable distributed document database might return for a
/// transient state-change condition (primary stepdown, node recovering, shutting down).
/// These are not bound to any concrete deployment's wire protocol; they exist so
/// `Error::is_read_retryable` has something concrete to match against, in the same shape as
/// the teacher's `RETRYABLE_READ_CODES` array.
const RECOVERABLE_STATE_CHANGE_CODES: [i32; 4] = [
    codes::NOT_PRIMARY,
    codes::NODE_IS_RECOVERING,
    codes::SHUTTING_DOWN,
    codes::INTERRUPTED_AT_SHUTDOWN,
];

/// Named constants for the codes in [`RECOVERABLE_STATE_CHANGE_CODES`].
pub mod codes {
    /// The server that received the command is no longer primary.
    pub const NOT_PRIMARY: i32 = 10_001;
    /// The server is in recovery and cannot currently serve the request.
    pub const NODE_IS_RECOVERING: i32 = 10_002;
    /// The server is shutting down.
    pub const SHUTTING_DOWN: i32 = 10_003;
    /// The request was interrupted by a shutdown in progress.
    pub const INTERRUPTED_AT_SHUTDOWN: i32 = 10_004;

    /// The legacy illegal-operation code a pre-document-locking storage
    /// engine (MMAPv1) returns when asked to execute a retryable write it
    /// cannot support. Paired with a message prefix check in the Retry
    /// Controller's MMAPv1 special case (spec.md §4.4).
    pub const MMAPV1_ILLEGAL_OPERATION: i32 = 20;
}

/// An error that can occur while executing an operation through this crate.
#[derive(Clone, Debug, ThisError)]
#[error("{kind}")]
pub struct Error {
    /// The classified kind of failure.
    pub kind: ErrorKind,
    labels: HashSet<String>,
    #[source]
    source: Option<Box<Error>>,
}

impl Error {
    /// Constructs a new error of the given kind with no labels.
    pub fn new(kind: ErrorKind) -> Self {
        Self {
            kind,
            labels: HashSet::new(),
            source: None,
        }
    }

    /// Constructs a new error of the given kind carrying the provided labels.
    pub fn with_labels(kind: ErrorKind, labels: impl IntoIterator<Item = String>) -> Self {
        Self {
            kind,
            labels: labels.into_iter().collect(),
            source: None,
        }
    }

    /// Attaches a source error, for diagnostics that wrap an underlying failure (e.g. the
    /// MMAPv1 rewrite in the retry controller).
    pub fn with_source(mut self, source: Error) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// Wraps an arbitrary host-supplied cause (BSON encoding, connection I/O, etc.) that this
    /// crate does not itself classify, per `ErrorKind::Other`.
    pub fn other(cause: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::new(ErrorKind::Other(Arc::new(cause)))
    }

    /// The labels attached to this error.
    pub fn labels(&self) -> &HashSet<String> {
        &self.labels
    }

    /// Whether this error carries the given label.
    pub fn contains_label(&self, label: &str) -> bool {
        self.labels.contains(label)
    }

    /// Adds a label to this error in place.
    pub fn add_label(&mut self, label: impl Into<String>) {
        self.labels.insert(label.into());
    }

    /// Whether this is a network-level failure (connection refused, reset, timed out).
    ///
    /// Distinguished from other retryable causes because it alone drives the
    /// load-balanced-cursor unpin rule in `spec.md` §4.4.
    pub fn is_network_error(&self) -> bool {
        matches!(self.kind, ErrorKind::Network { .. })
    }

    /// Whether a read operation should be retried if this error occurs. Network errors are
    /// always retryable for reads; beyond that, a fixed set of recoverable server codes
    /// apply. This predicate is intentionally the single place the retry controller asks
    /// "is this retryable" for reads — see `spec.md` §7's note that the predicate is
    /// supplied by the error layer and treated as opaque by the executor.
    pub fn is_read_retryable(&self) -> bool {
        if self.is_network_error() {
            return true;
        }
        match &self.kind {
            ErrorKind::Server { code, .. } => RECOVERABLE_STATE_CHANGE_CODES.contains(code),
            _ => false,
        }
    }

    /// Whether a write operation should be retried, per the `RetryableWriteError` label
    /// contract (`spec.md` §4.4/§7). Unlike reads, writes are retried purely off the label
    /// the server (or a lower layer) attaches, not off the error's own shape.
    pub fn is_write_retryable(&self) -> bool {
        self.contains_label(RETRYABLE_WRITE_ERROR)
    }

    /// Whether this is a server-side command failure (as opposed to a network, session, or
    /// programmer-error class).
    pub fn is_server_error(&self) -> bool {
        matches!(self.kind, ErrorKind::Server { .. })
    }

    /// Whether this is the MMAPv1 legacy-storage-engine rejection of a retryable write, per
    /// the special case in the retry controller.
    pub fn is_mmapv1_retryable_write_rejection(&self) -> bool {
        matches!(
            &self.kind,
            ErrorKind::Server { code, message }
                if *code == codes::MMAPV1_ILLEGAL_OPERATION && message.contains("Transaction numbers")
        )
    }
}

/// The classified kinds of failure the executor distinguishes, per `spec.md` §7.
#[derive(Clone, Debug, ThisError)]
#[non_exhaustive]
pub enum ErrorKind {
    /// The operation descriptor was malformed (e.g. a contradictory aspect combination).
    /// A programmer-error class: never retryable, never recoverable.
    #[error("malformed operation descriptor: {message}")]
    RuntimeViolation {
        /// A description of what was malformed.
        message: String,
    },

    /// The session supplied to an operation had already ended.
    #[error("the session provided to this operation has already ended")]
    ExpiredSession,

    /// A session or operation feature is not supported by the current topology (e.g.
    /// snapshot reads on a topology without snapshot-read support, or an explicit session
    /// supplied to a topology without session support at all).
    #[error("{message}")]
    Compatibility {
        /// A description of the incompatibility.
        message: String,
    },

    /// The effective read preference is incompatible with the session's active transaction.
    #[error("{message}")]
    Transaction {
        /// A description of the violation.
        message: String,
    },

    /// A server selection call failed.
    #[error("server selection failed: {message}")]
    ServerSelection {
        /// A description of the selection failure.
        message: String,
    },

    /// A network-level failure occurred while communicating with the server.
    #[error("network error: {message}")]
    Network {
        /// A description of the network failure.
        message: String,
    },

    /// The server returned a command failure.
    #[error("server error {code}: {message}")]
    Server {
        /// The server-reported error code.
        code: i32,
        /// The server-reported error message.
        message: String,
    },

    /// A diagnostic synthesized by this crate rather than reported by a collaborator (e.g.
    /// the MMAPv1 retryable-writes rewrite).
    #[error("{message}")]
    Diagnostic {
        /// The synthesized diagnostic message.
        message: String,
    },

    /// An arbitrary error from a host collaborator this crate does not classify itself (BSON
    /// encoding, connection I/O, and the like), passed through so it can still flow through
    /// this crate's `Result`. Mirrors the teacher's `Custom` variant.
    #[error("{0}")]
    Other(Arc<dyn std::error::Error + Send + Sync>),
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn network_errors_are_read_retryable() {
        let err = Error::new(ErrorKind::Network {
            message: "connection reset".into(),
        });
        assert!(err.is_read_retryable());
    }

    #[test]
    fn recoverable_server_code_is_read_retryable() {
        let err = Error::new(ErrorKind::Server {
            code: codes::NODE_IS_RECOVERING,
            message: "node is recovering".into(),
        });
        assert!(err.is_read_retryable());
    }

    #[test]
    fn arbitrary_server_code_is_not_read_retryable() {
        let err = Error::new(ErrorKind::Server {
            code: 99,
            message: "duplicate key".into(),
        });
        assert!(!err.is_read_retryable());
    }

    #[test]
    fn write_retry_is_purely_label_driven() {
        let mut err = Error::new(ErrorKind::Server {
            code: 99,
            message: "duplicate key".into(),
        });
        assert!(!err.is_write_retryable());
        err.add_label(RETRYABLE_WRITE_ERROR);
        assert!(err.is_write_retryable());
    }

    #[test]
    fn mmapv1_rejection_requires_both_code_and_message() {
        let matching = Error::new(ErrorKind::Server {
            code: codes::MMAPV1_ILLEGAL_OPERATION,
            message: "Transaction numbers are only allowed on a replica set member or mongos"
                .into(),
        });
        assert!(matching.is_mmapv1_retryable_write_rejection());

        let wrong_code = Error::new(ErrorKind::Server {
            code: 99,
            message: "Transaction numbers are not allowed".into(),
        });
        assert!(!wrong_code.is_mmapv1_retryable_write_rejection());

        let wrong_message = Error::new(ErrorKind::Server {
            code: codes::MMAPV1_ILLEGAL_OPERATION,
            message: "some other failure".into(),
        });
        assert!(!wrong_message.is_mmapv1_retryable_write_rejection());
    }

    #[derive(Debug, thiserror::Error)]
    #[error("bson encoding failed: {0}")]
    struct FakeBsonError(String);

    #[test]
    fn other_wraps_an_arbitrary_host_error() {
        let err = Error::other(FakeBsonError("unterminated document".into()));
        assert!(matches!(err.kind, ErrorKind::Other(_)));
        assert_eq!(err.to_string(), "bson encoding failed: unterminated document");
    }
}
