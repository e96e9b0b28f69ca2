//! Configuration for the executor, independent of any concrete `Topology`.
//!
//! Grounded on the `TypedBuilder`-derived option structs in
//! `examples/mongodb-mongo-rust-driver/src/client/options.rs` (e.g.
//! `TlsOptions`), which use the same `field_defaults(default, setter(into))`
//! builder shape this core adopts for `ExecutorConfig`.

use typed_builder::TypedBuilder;

/// Settings a host crate supplies once, independent of any single
/// operation, that the Retry Controller and Executor Entry consult.
///
/// These mirror `spec.md` §6's `options.retryReads`/`options.retryWrites`
/// and the snapshot-read capability check in §4.1 step 3; a real `Topology`
/// adapter would typically derive its own answers to those queries from a
/// value like this rather than hard-coding them.
#[derive(Clone, Debug, PartialEq, Eq, TypedBuilder)]
#[builder(field_defaults(default, setter(into)))]
pub struct ExecutorConfig {
    /// Whether retryable reads are enabled. Defaults to `true`, matching
    /// `spec.md` §6's documented default.
    #[builder(default = true)]
    pub retry_reads: bool,

    /// Whether retryable writes are enabled. Defaults to `false`.
    pub retry_writes: bool,

    /// Whether the topology this config describes can serve snapshot reads.
    pub supports_snapshot_reads: bool,
}
