//! Structured logging for dispatch lifecycle events

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::LoggingConfig;
use crate::observability::CorrelationId;

/// Install the global subscriber
///
/// `RUST_LOG` wins over the configured level. Fails if a global subscriber
/// is already installed.
pub fn init_logging(config: &LoggingConfig) -> anyhow::Result<()> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    let registry = tracing_subscriber::registry().with(filter);
    if config.json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_target(true))
            .try_init()?;
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_target(true))
            .try_init()?;
    }
    Ok(())
}

/// Logger bound to one dispatch's correlation id
#[derive(Debug, Clone)]
pub struct DispatchLogger {
    correlation_id: CorrelationId,
    tool: &'static str,
}

impl DispatchLogger {
    pub fn new(correlation_id: CorrelationId, tool: &'static str) -> Self {
        Self {
            correlation_id,
            tool,
        }
    }

    pub fn correlation_id(&self) -> &CorrelationId {
        &self.correlation_id
    }

    pub fn log_keys_substituted(&self, count: usize) {
        if count > 0 {
            tracing::debug!(
                correlation_id = %self.correlation_id,
                tool = self.tool,
                count,
                "Substituted current_signer tokens"
            );
        }
    }

    pub fn log_staged(&self, kind: &str, schedulable: bool) {
        tracing::debug!(
            correlation_id = %self.correlation_id,
            tool = self.tool,
            kind,
            schedulable,
            "Operation staged"
        );
    }

    pub fn log_decision(&self, mode: &str, should_schedule: bool) {
        tracing::debug!(
            correlation_id = %self.correlation_id,
            tool = self.tool,
            mode,
            should_schedule,
            "Dispatch decision"
        );
    }

    pub fn log_bytes_returned(&self, operation_id: Option<&str>, latency_ms: i64) {
        tracing::info!(
            correlation_id = %self.correlation_id,
            tool = self.tool,
            operation_id = ?operation_id,
            latency_ms,
            "Operation bytes returned"
        );
    }

    pub fn log_executed(&self, operation_id: Option<&str>, latency_ms: i64) {
        tracing::info!(
            correlation_id = %self.correlation_id,
            tool = self.tool,
            operation_id = ?operation_id,
            latency_ms,
            "Operation executed"
        );
    }

    pub fn log_schedule_created(&self, schedule_id: &str, payer: &str, latency_ms: i64) {
        tracing::info!(
            correlation_id = %self.correlation_id,
            tool = self.tool,
            schedule_id,
            scheduled_payer = payer,
            latency_ms,
            "Schedule created"
        );
    }

    /// `operation_id` is the attempted id, when the failure happened after framing
    pub fn log_failure(
        &self,
        category: &str,
        error: &str,
        operation_id: Option<&str>,
        latency_ms: i64,
    ) {
        tracing::warn!(
            correlation_id = %self.correlation_id,
            tool = self.tool,
            category,
            error,
            operation_id = ?operation_id,
            latency_ms,
            "Dispatch failed"
        );
    }
}
