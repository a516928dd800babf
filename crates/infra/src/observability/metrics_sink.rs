//! JSON-lines metrics sink
//!
//! Each run event becomes one line in an append-only file, so a crashed run
//! still leaves its `process_start` behind.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use orderflow_core::MetricsSink;
use orderflow_domain::{ExtractionConfig, MetricsEvent, OrderFlowError, Result};
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::debug;
use uuid::Uuid;

use crate::errors::to_domain;

pub struct JsonlMetricsSink {
    path: PathBuf,
    // Serializes appends so concurrent writers never interleave lines.
    write_lock: Mutex<()>,
}

impl JsonlMetricsSink {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self { path: path.as_ref().to_path_buf(), write_lock: Mutex::new(()) }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn append(&self, event: &MetricsEvent) -> Result<()> {
        let mut line = serde_json::to_string(event)?;
        line.push('\n');

        let _guard = self.write_lock.lock().await;
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await.map_err(to_domain)?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .map_err(to_domain)?;
        file.write_all(line.as_bytes()).await.map_err(to_domain)?;
        file.flush().await.map_err(to_domain)?;

        debug!(event = ?event.event, run_id = %event.run_id, "metrics.event_written");
        Ok(())
    }
}

#[async_trait]
impl MetricsSink for JsonlMetricsSink {
    async fn record_start(&self, run_id: Uuid, config: &ExtractionConfig) -> Result<()> {
        self.append(&MetricsEvent::start(run_id, config)).await
    }

    async fn record_success(
        &self,
        run_id: Uuid,
        config: &ExtractionConfig,
        order_count: usize,
    ) -> Result<()> {
        self.append(&MetricsEvent::success(run_id, config, order_count)).await
    }

    async fn record_error(
        &self,
        run_id: Uuid,
        config: &ExtractionConfig,
        error: &OrderFlowError,
    ) -> Result<()> {
        self.append(&MetricsEvent::error(run_id, config, error)).await
    }
}
