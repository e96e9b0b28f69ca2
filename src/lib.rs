#![doc = include_str!("../README.md")]
#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]
#![warn(clippy::cast_possible_truncation)]
#![warn(clippy::cast_possible_wrap)]
#![cfg_attr(docsrs, feature(doc_auto_cfg))]

pub mod aspect;
pub mod config;
pub mod error;
mod executor;
pub mod operation;
pub mod read_preference;
pub mod selector;
pub mod session;
pub mod topology;

pub use config::ExecutorConfig;
pub use error::{Error, ErrorKind, Result};
pub use executor::execute_operation;
pub use operation::{Operation, Retryability};
pub use selector::ServerSelector;
pub use session::{Session, SessionOwnership, TransactionState};
pub use topology::{ServerHandle, Topology};
