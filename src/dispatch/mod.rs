//! Operational-mode dispatcher
//!
//! One dispatch takes a tool, its JSON parameters and the per-call options
//! through the whole pipeline:
//!
//! 1. parse parameters and options
//! 2. substitute `current_signer` tokens with the signer's public key
//! 3. stage the operation and apply memo / explicit id / target endpoints
//! 4. decide whether to schedule (see [`decision`])
//! 5. realize: execute directly, return bytes, or create a schedule
//!
//! Nothing escapes as an error. Failures up to step 4 come back as a failed
//! [`ExecuteResult`]; failures while realizing use the shape of the chosen
//! path. Each dispatch reads one session snapshot at the start and keeps it.

pub mod decision;
pub mod options;
pub mod session;

pub use decision::should_schedule;
pub use options::MetaOptions;
pub use session::{OperationalMode, Session, SessionConfig};

use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info_span, Instrument};

use crate::metrics::{DispatchMetrics, Timer};
use crate::observability::TraceContext;
use crate::operation::{
    BytesResult, DispatchError, DispatchOutcome, ExecuteResult, KeyResolver, OperationBuilder,
    ScheduleCreateResult, ScheduleOptions, StageContext,
};
use crate::services::Services;
use crate::structured_logging::DispatchLogger;
use crate::tools::{
    CreateAccountTool, CreateFungibleTokenTool, CreateTopicTool, DeleteScheduleTool,
    OperationTool, SignScheduleTool, SubmitTopicMessageTool, TransferHbarTool,
};

/// Reported as the eventual payer when no acting-on-behalf-of identity is set
pub const UNKNOWN_PAYER: &str = "unknown";

/// How a staged operation will be realized
#[derive(Debug)]
enum Route {
    Direct,
    Bytes,
    Schedule(ScheduleOptions),
}

/// A staged, option-applied operation and the route chosen for it
struct Prepared {
    builder: OperationBuilder,
    route: Route,
    inner_memo: Option<String>,
}

pub struct Dispatcher {
    services: Services,
    session: Arc<Session>,
    metrics: Arc<DispatchMetrics>,
}

impl Dispatcher {
    pub fn new(services: Services, session: Arc<Session>, metrics: Arc<DispatchMetrics>) -> Self {
        Self {
            services,
            session,
            metrics,
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn metrics(&self) -> &DispatchMetrics {
        &self.metrics
    }

    /// Dispatch a tool call by tool name
    ///
    /// Unknown names fail like any other invalid input.
    pub async fn dispatch_named(
        &self,
        tool: &str,
        params: Value,
        options: MetaOptions,
    ) -> DispatchOutcome {
        match tool {
            TransferHbarTool::NAME => self.dispatch(&TransferHbarTool, params, options).await,
            CreateAccountTool::NAME => self.dispatch(&CreateAccountTool, params, options).await,
            CreateTopicTool::NAME => self.dispatch(&CreateTopicTool, params, options).await,
            SubmitTopicMessageTool::NAME => {
                self.dispatch(&SubmitTopicMessageTool, params, options).await
            }
            CreateFungibleTokenTool::NAME => {
                self.dispatch(&CreateFungibleTokenTool, params, options).await
            }
            SignScheduleTool::NAME => self.dispatch(&SignScheduleTool, params, options).await,
            DeleteScheduleTool::NAME => self.dispatch(&DeleteScheduleTool, params, options).await,
            unknown => {
                let err = DispatchError::invalid_input(
                    "tool",
                    format!("unknown tool '{}'", unknown),
                );
                let outcome = DispatchOutcome::Executed(ExecuteResult::failed(&err));
                self.metrics.record(&outcome, Some(err.category()));
                outcome
            }
        }
    }

    /// Dispatch one tool call
    pub async fn dispatch<T: OperationTool>(
        &self,
        tool: &T,
        params: Value,
        options: MetaOptions,
    ) -> DispatchOutcome {
        let trace = TraceContext::new(tool.name());
        let logger = DispatchLogger::new(trace.correlation_id().clone(), tool.name());
        let span = info_span!(
            "dispatch",
            tool = tool.name(),
            correlation_id = %trace.correlation_id()
        );
        let timer = Timer::start();

        let (outcome, failure) = self
            .run(tool, params, options, &trace, &logger)
            .instrument(span)
            .await;

        timer.observe_duration(&self.metrics.latency);
        self.metrics
            .record(&outcome, failure.as_ref().map(DispatchError::category));
        if let Some(err) = &failure {
            logger.log_failure(
                err.category(),
                &err.to_string(),
                err.operation_id(),
                trace.elapsed_ms(),
            );
        }
        outcome
    }

    async fn run<T: OperationTool>(
        &self,
        tool: &T,
        params: Value,
        options: MetaOptions,
        trace: &TraceContext,
        logger: &DispatchLogger,
    ) -> (DispatchOutcome, Option<DispatchError>) {
        let snapshot = self.session.snapshot();

        let prepared = match self
            .prepare(tool, params, options, &snapshot, trace, logger)
            .await
        {
            Ok(prepared) => prepared,
            Err(e) => return (DispatchOutcome::Executed(ExecuteResult::failed(&e)), Some(e)),
        };

        match prepared.route {
            Route::Direct => match prepared.builder.try_execute(None).await {
                Ok(result) => {
                    logger.log_executed(result.operation_id.as_deref(), trace.elapsed_ms());
                    (DispatchOutcome::Executed(result), None)
                }
                Err(e) => (DispatchOutcome::Executed(ExecuteResult::failed(&e)), Some(e)),
            },
            Route::Bytes => match prepared.builder.finalize_bytes(None).await {
                Ok(result) => {
                    logger.log_bytes_returned(result.operation_id.as_deref(), trace.elapsed_ms());
                    (DispatchOutcome::Bytes(result), None)
                }
                Err(e) => (DispatchOutcome::Executed(ExecuteResult::failed(&e)), Some(e)),
            },
            Route::Schedule(schedule_options) => {
                let kind = prepared
                    .builder
                    .staged_operation()
                    .map(|op| op.kind().as_str())
                    .unwrap_or("unknown");
                let description = schedule_options
                    .memo
                    .clone()
                    .unwrap_or_else(|| format!("Scheduled {} operation", kind));
                let eventual_payer = snapshot
                    .acting_on_behalf_of
                    .map(|id| id.to_string())
                    .unwrap_or_else(|| UNKNOWN_PAYER.to_string());

                match self
                    .create_schedule(prepared.builder, &schedule_options)
                    .await
                {
                    Ok(schedule_id) => {
                        logger.log_schedule_created(&schedule_id, &eventual_payer, trace.elapsed_ms());
                        (
                            DispatchOutcome::ScheduleCreated(ScheduleCreateResult::created(
                                schedule_id,
                                description,
                                eventual_payer,
                                prepared.inner_memo,
                            )),
                            None,
                        )
                    }
                    Err(e) => (
                        DispatchOutcome::ScheduleCreated(ScheduleCreateResult::failed(&e)),
                        Some(e),
                    ),
                }
            }
        }
    }

    /// Steps 1 to 4: everything before the network is touched
    async fn prepare<T: OperationTool>(
        &self,
        tool: &T,
        params: Value,
        mut options: MetaOptions,
        snapshot: &SessionConfig,
        trace: &TraceContext,
        logger: &DispatchLogger,
    ) -> Result<Prepared, DispatchError> {
        let mut params: T::Params = serde_json::from_value(params)
            .map_err(|e| DispatchError::invalid_input("params", e.to_string()))?;

        let resolver = KeyResolver::new(self.services.signer.clone());
        let mut key_fields = tool.key_fields(&mut params);
        key_fields.extend(options.key_fields());
        logger.log_keys_substituted(resolver.substitute(key_fields).await);

        let cross_cutting = options.cross_cutting()?;
        let operator = self.services.operator_id();
        let ctx = StageContext::new(operator, resolver.clone())
            .acting_on_behalf_of(snapshot.acting_on_behalf_of)
            .with_trace(trace.child_span("stage"));

        let op = tool.stage(params, &ctx).await?;
        let schedulable = tool.schedulable() && op.kind().is_schedulable();
        logger.log_staged(op.kind().as_str(), schedulable);

        let mut builder = OperationBuilder::new(self.services.clone());
        builder.stage(op);
        builder.apply(&cross_cutting)?;

        let schedule = should_schedule(schedulable, snapshot, options.schedule);
        if !schedulable && options.schedule == Some(true) {
            debug!(tool = tool.name(), "Ignoring schedule request for a non-schedulable operation");
        }
        logger.log_decision(snapshot.mode.as_str(), schedule);

        let route = if schedule {
            Route::Schedule(options.schedule_options(&resolver, operator).await?)
        } else {
            match snapshot.mode {
                OperationalMode::DirectExecution => Route::Direct,
                OperationalMode::ProvideBytes => Route::Bytes,
            }
        };
        let inner_memo = builder
            .staged_operation()
            .and_then(|op| op.memo())
            .map(str::to_string);

        Ok(Prepared {
            builder,
            route,
            inner_memo,
        })
    }

    /// Wrap, submit and return the created schedule id
    async fn create_schedule(
        &self,
        builder: OperationBuilder,
        options: &ScheduleOptions,
    ) -> Result<String, DispatchError> {
        let result = builder.try_execute(Some(options)).await?;
        result.schedule_id.ok_or_else(|| {
            DispatchError::internal("schedule-create succeeded without a schedule id")
        })
    }
}

/// Convenience for callers that only want the bytes path's payload
pub fn operation_bytes(outcome: &DispatchOutcome) -> Option<&BytesResult> {
    match outcome {
        DispatchOutcome::Bytes(result) => Some(result),
        _ => None,
    }
}
