//! Prometheus metrics for the failover server.

use cloud_failover::TaskStatus;
use prometheus_client::encoding::EncodeLabelSet;
use prometheus_client::metrics::counter::Counter;
use prometheus_client::metrics::family::Family;
use prometheus_client::metrics::gauge::Gauge;
use prometheus_client::metrics::histogram::{Histogram, exponential_buckets};
use prometheus_client::registry::Registry;
use std::time::Duration;

/// Labels for execution outcome metrics
#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct OutcomeLabels {
    /// Outcome (succeeded, failed, skipped)
    pub outcome: String,
}

/// Labels for API request metrics
#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct EndpointLabels {
    /// Endpoint name (declare, trigger, reset, inspect, info)
    pub endpoint: String,
    pub method: String,
}

/// Metrics registry with all failover server metrics
pub struct MetricsRegistry {
    /// Prometheus registry
    pub registry: Registry,

    /// Failover executions by outcome
    executions_total: Family<OutcomeLabels, Counter>,
    /// Duration of executions that ran a cycle
    execution_duration_seconds: Histogram,
    /// Last observed task state (0=PASS, 1=RUN, 2=FAIL)
    task_state: Gauge,
    /// State resets performed
    resets_total: Counter,
    /// API requests by endpoint
    requests_total: Family<EndpointLabels, Counter>,
}

impl Default for MetricsRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl MetricsRegistry {
    pub fn new() -> Self {
        let mut registry = Registry::default();

        let executions_total = Family::<OutcomeLabels, Counter>::default();
        registry.register(
            "failover_executions",
            "Failover executions by outcome",
            executions_total.clone(),
        );

        // 50ms to ~7min
        let execution_duration_seconds = Histogram::new(exponential_buckets(0.05, 2.0, 14));
        registry.register(
            "failover_execution_duration_seconds",
            "Failover execution duration in seconds",
            execution_duration_seconds.clone(),
        );

        let task_state = Gauge::default();
        registry.register(
            "failover_task_state",
            "Last observed task state (0=PASS, 1=RUN, 2=FAIL)",
            task_state.clone(),
        );

        let resets_total = Counter::default();
        registry.register(
            "failover_resets",
            "Task state resets performed",
            resets_total.clone(),
        );

        let requests_total = Family::<EndpointLabels, Counter>::default();
        registry.register(
            "failover_requests",
            "API requests by endpoint",
            requests_total.clone(),
        );

        Self {
            registry,
            executions_total,
            execution_duration_seconds,
            task_state,
            resets_total,
            requests_total,
        }
    }

    /// Record a finished execution
    pub fn record_execution(&self, outcome: &str, duration: Duration) {
        self.executions_total
            .get_or_create(&OutcomeLabels {
                outcome: outcome.to_string(),
            })
            .inc();
        self.execution_duration_seconds
            .observe(duration.as_secs_f64());
    }

    /// Record a trigger that found a cycle already running locally
    pub fn record_skipped_execution(&self) {
        self.executions_total
            .get_or_create(&OutcomeLabels {
                outcome: "skipped".to_string(),
            })
            .inc();
    }

    pub fn set_task_state(&self, state: TaskStatus) {
        let value = match state {
            TaskStatus::Pass => 0,
            TaskStatus::Run => 1,
            TaskStatus::Fail => 2,
        };
        self.task_state.set(value);
    }

    pub fn record_reset(&self) {
        self.resets_total.inc();
    }

    pub fn record_request(&self, endpoint: &str, method: &str) {
        self.requests_total
            .get_or_create(&EndpointLabels {
                endpoint: endpoint.to_string(),
                method: method.to_string(),
            })
            .inc();
    }
}
