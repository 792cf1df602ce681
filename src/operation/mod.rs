//! Operation staging
//!
//! Everything between typed tool parameters and a realized operation:
//!
//! ## Architecture
//!
//! - **errors**: the single error taxonomy, with category and retryability hooks
//! - **keys**: key references, the `current_signer` token and the key resolver
//! - **staged**: the staged operation value and its byte form
//! - **context**: identities and resolver handed to operation families
//! - **schedule**: wrapping a staged operation in a schedule-create operation
//! - **builder**: the builder base contract (setters and consumers)
//! - **output**: the three normalized result shapes
//!
//! ## Lifecycle
//!
//! A builder is created per logical call, stages exactly one operation,
//! has cross-cutting fields applied to it and is consumed by exactly one of
//! `execute`, `get_bytes` or `execute_with_signer`. Nothing reaches the
//! network before that final step.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use opdispatch::operation::{OperationBuilder, OperationBody, StagedOperation};
//! use opdispatch::services::Services;
//! use opdispatch::types::EntityId;
//!
//! # async fn example(services: Services) -> Result<(), opdispatch::operation::DispatchError> {
//! let mut builder = OperationBuilder::new(services);
//! builder.stage(StagedOperation::new(OperationBody::TopicMessageSubmit {
//!     topic_id: EntityId::from_num(800),
//!     message: b"hello".to_vec(),
//! }));
//! builder.set_memo("greeting")?;
//!
//! let bytes = builder.get_bytes(None).await?;
//! # let _ = bytes;
//! # Ok(())
//! # }
//! ```

pub mod errors;
pub use errors::DispatchError;

pub mod builder;
pub mod context;
pub mod keys;
pub mod output;
pub mod schedule;
pub mod staged;

pub use builder::{finalize_operation, CrossCuttingOptions, OperationBuilder};
pub use context::StageContext;
pub use keys::{Key, KeyField, KeyRef, KeyResolver, PublicKey, CURRENT_SIGNER};
pub use output::{BytesResult, DispatchOutcome, ExecuteResult, ScheduleCreateResult};
pub use schedule::{ScheduleOptions, ScheduleWrapper};
pub use staged::{
    AccountAmount, OperationBody, OperationKind, ScheduledOperation, StagedOperation,
    TokenCreateBody,
};
