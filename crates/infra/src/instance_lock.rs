//! Single-instance lock using PID files
//!
//! Keeps two extraction runs from working on the same database at once. The
//! weekly reconciliation deletes and reinserts orders, which must not race
//! with another run's upserts.

use std::fs;
use std::path::{Path, PathBuf};

use orderflow_domain::{OrderFlowError, Result};

/// Single-instance lock manager
#[derive(Debug)]
pub struct InstanceLock {
    pid_file: PathBuf,
}

impl InstanceLock {
    /// Take the lock by writing the current PID to `pid_file`.
    ///
    /// A leftover file whose process is gone is replaced. Returns an error
    /// if the recorded process is still running.
    pub fn acquire<P: AsRef<Path>>(pid_file: P) -> Result<Self> {
        let pid_file = pid_file.as_ref().to_path_buf();

        if let Some(parent) = pid_file.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| {
                OrderFlowError::Internal(format!("Failed to create lock directory: {e}"))
            })?;
        }

        if pid_file.exists() {
            if let Ok(content) = fs::read_to_string(&pid_file) {
                if let Ok(pid) = content.trim().parse::<u32>() {
                    if Self::is_process_running(pid) {
                        tracing::warn!(existing_pid = pid, "instance_lock.process_active");
                        return Err(OrderFlowError::Internal(format!(
                            "Another extraction is already running (PID: {pid})"
                        )));
                    }
                    tracing::warn!(stale_pid = pid, "instance_lock.stale_pid_file_detected");
                }
            }
            if let Err(err) = fs::remove_file(&pid_file) {
                tracing::warn!(
                    error = %err,
                    path = %pid_file.display(),
                    "instance_lock.remove_stale_pid_failed"
                );
            }
        }

        let current_pid = std::process::id();
        fs::write(&pid_file, current_pid.to_string())
            .map_err(|e| OrderFlowError::Internal(format!("Failed to create PID file: {e}")))?;

        tracing::info!(pid = current_pid, path = %pid_file.display(), "instance_lock.acquired");

        Ok(Self { pid_file })
    }

    pub fn path(&self) -> &Path {
        &self.pid_file
    }

    #[cfg(target_os = "linux")]
    fn is_process_running(pid: u32) -> bool {
        Path::new("/proc").join(pid.to_string()).exists()
    }

    #[cfg(all(unix, not(target_os = "linux")))]
    fn is_process_running(pid: u32) -> bool {
        use std::process::Command;

        // `kill -0` probes for the process without signalling it
        Command::new("kill")
            .arg("-0")
            .arg(pid.to_string())
            .output()
            .map(|output| output.status.success())
            .unwrap_or(false)
    }

    #[cfg(not(unix))]
    fn is_process_running(pid: u32) -> bool {
        tracing::warn!(pid, "instance_lock.process_check_unsupported");
        false
    }
}

impl Drop for InstanceLock {
    fn drop(&mut self) {
        if let Err(e) = fs::remove_file(&self.pid_file) {
            tracing::warn!(
                error = %e,
                path = %self.pid_file.display(),
                "instance_lock.remove_pid_failed"
            );
        } else {
            tracing::info!(path = %self.pid_file.display(), "instance_lock.released");
        }
    }
}
