//! Dispatch metrics
//!
//! Each [`DispatchMetrics`] owns a private registry, so several dispatchers
//! (or tests) never collide on metric names.

use prometheus::{
    Encoder, Histogram, HistogramOpts, IntCounter, IntCounterVec, Opts, Registry, TextEncoder,
};
use std::time::Instant;

use crate::operation::output::DispatchOutcome;

pub struct DispatchMetrics {
    registry: Registry,

    pub dispatch_total: IntCounter,
    pub executed_direct: IntCounter,
    pub bytes_returned: IntCounter,
    pub schedules_created: IntCounter,
    /// Labelled by [`crate::operation::DispatchError::category`]
    pub failures: IntCounterVec,

    pub latency: Histogram,
}

impl DispatchMetrics {
    pub fn new() -> anyhow::Result<Self> {
        let registry = Registry::new();

        let dispatch_total = IntCounter::with_opts(Opts::new(
            "dispatch_total",
            "Total number of dispatched tool calls",
        ))?;

        let executed_direct = IntCounter::with_opts(Opts::new(
            "dispatch_executed_direct",
            "Operations submitted directly",
        ))?;

        let bytes_returned = IntCounter::with_opts(Opts::new(
            "dispatch_bytes_returned",
            "Operations finalized and returned as bytes",
        ))?;

        let schedules_created = IntCounter::with_opts(Opts::new(
            "dispatch_schedules_created",
            "Schedule entities created",
        ))?;

        let failures = IntCounterVec::new(
            Opts::new("dispatch_failures", "Dispatches that ended in failure"),
            &["category"],
        )?;

        let latency = Histogram::with_opts(
            HistogramOpts::new("dispatch_latency_seconds", "End-to-end dispatch latency")
                .buckets(vec![0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0]),
        )?;

        registry.register(Box::new(dispatch_total.clone()))?;
        registry.register(Box::new(executed_direct.clone()))?;
        registry.register(Box::new(bytes_returned.clone()))?;
        registry.register(Box::new(schedules_created.clone()))?;
        registry.register(Box::new(failures.clone()))?;
        registry.register(Box::new(latency.clone()))?;

        Ok(Self {
            registry,
            dispatch_total,
            executed_direct,
            bytes_returned,
            schedules_created,
            failures,
            latency,
        })
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Count one finished dispatch
    ///
    /// `failure_category` is only read when the outcome is a failure.
    pub fn record(&self, outcome: &DispatchOutcome, failure_category: Option<&str>) {
        self.dispatch_total.inc();
        if !outcome.is_success() {
            self.failures
                .with_label_values(&[failure_category.unwrap_or("unknown")])
                .inc();
            return;
        }
        match outcome {
            DispatchOutcome::ScheduleCreated(_) => self.schedules_created.inc(),
            DispatchOutcome::Bytes(_) => self.bytes_returned.inc(),
            DispatchOutcome::Executed(_) => self.executed_direct.inc(),
        }
    }

    pub fn failure_count(&self, category: &str) -> u64 {
        self.failures.with_label_values(&[category]).get()
    }

    /// Text exposition of every metric in this registry
    pub fn gather(&self) -> anyhow::Result<String> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }
}

/// Timer helper for measuring dispatch duration
pub struct Timer {
    start: Instant,
}

impl Timer {
    pub fn start() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    pub fn elapsed_secs(&self) -> f64 {
        self.start.elapsed().as_secs_f64()
    }

    pub fn observe_duration(&self, histogram: &Histogram) {
        histogram.observe(self.elapsed_secs());
    }
}
