//! opdispatch - operation builders and an operational-mode dispatcher
//!
//! Callers describe a network operation as typed parameters; the dispatcher
//! stages it and then, depending on the session's mode and per-call options,
//! executes it, hands back its finalized bytes, or wraps it in a schedule.
//!
//! The signer and network client are injected through [`services`]; nothing
//! in this crate constructs one.

pub mod config;
pub mod dispatch;
pub mod metrics;
pub mod observability;
pub mod operation;
pub mod services;
pub mod structured_logging;
pub mod tools;
pub mod types;

#[cfg(any(test, feature = "test_utils"))]
pub mod test_utils;

pub use config::DispatchConfig;
pub use dispatch::{Dispatcher, MetaOptions, OperationalMode, Session, SessionConfig};
pub use operation::{DispatchError, DispatchOutcome, OperationBuilder, StagedOperation};
pub use services::{NetworkClient, OperationReceipt, Services, Signer};
pub use types::{EntityId, OperationId};
