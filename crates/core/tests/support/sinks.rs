//! Recording metrics, error and notification sinks

use async_trait::async_trait;
use orderflow_core::{ErrorReporter, MetricsSink, Notifier};
use orderflow_domain::{ErrorContext, ExtractionConfig, OrderFlowError, Result};
use parking_lot::Mutex;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordedEvent {
    Start,
    Success(usize),
    Error(String),
}

#[derive(Default)]
pub struct RecordingMetrics {
    events: Mutex<Vec<(Uuid, RecordedEvent)>>,
}

impl RecordingMetrics {
    pub fn events(&self) -> Vec<RecordedEvent> {
        self.events.lock().iter().map(|(_, event)| event.clone()).collect()
    }

    pub fn run_ids(&self) -> Vec<Uuid> {
        self.events.lock().iter().map(|(id, _)| *id).collect()
    }
}

#[async_trait]
impl MetricsSink for RecordingMetrics {
    async fn record_start(&self, run_id: Uuid, _config: &ExtractionConfig) -> Result<()> {
        self.events.lock().push((run_id, RecordedEvent::Start));
        Ok(())
    }

    async fn record_success(
        &self,
        run_id: Uuid,
        _config: &ExtractionConfig,
        order_count: usize,
    ) -> Result<()> {
        self.events.lock().push((run_id, RecordedEvent::Success(order_count)));
        Ok(())
    }

    async fn record_error(
        &self,
        run_id: Uuid,
        _config: &ExtractionConfig,
        error: &OrderFlowError,
    ) -> Result<()> {
        self.events.lock().push((run_id, RecordedEvent::Error(error.label().to_string())));
        Ok(())
    }
}

#[derive(Default)]
pub struct RecordingReporter {
    reports: Mutex<Vec<(OrderFlowError, ErrorContext)>>,
}

impl RecordingReporter {
    pub fn reports(&self) -> Vec<(OrderFlowError, ErrorContext)> {
        self.reports.lock().clone()
    }
}

#[async_trait]
impl ErrorReporter for RecordingReporter {
    async fn handle(&self, error: &OrderFlowError, context: &ErrorContext) {
        self.reports.lock().push((error.clone(), context.clone()));
    }
}

#[derive(Default)]
pub struct RecordingNotifier {
    counts: Mutex<Vec<usize>>,
}

impl RecordingNotifier {
    pub fn counts(&self) -> Vec<usize> {
        self.counts.lock().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify_success(&self, _config: &ExtractionConfig, order_count: usize) -> Result<()> {
        self.counts.lock().push(order_count);
        Ok(())
    }
}
