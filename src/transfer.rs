//! Bulk directory reconciliation via an external `rclone` process.
//!
//! The staged policy does not upload partition files itself; it delegates
//! cache-to-bucket reconciliation to rclone, driven by a config file
//! generated from the run's credentials. Exit code and captured output are
//! the only contract with the utility.

use std::fs;
use std::io::Write;
use std::process::Command;

use tempfile::TempDir;
use tracing::{error, info};

use crate::config::StoreConfig;
use crate::contract::{BulkTransfer, TransferMode, TransferOutcome, TransferPlan};
use crate::errors::MirrorError;

const REMOTE_NAME: &str = "mirror";

pub struct RcloneTransfer {
    bucket: String,
    config_path: std::path::PathBuf,
    // Holds the generated credential file; removed when the transfer is
    // dropped.
    _config_dir: TempDir,
}

impl RcloneTransfer {
    /// Writes a one-remote rclone config for the bucket's endpoint and
    /// credentials.
    pub fn new(store: &StoreConfig) -> Result<Self, MirrorError> {
        let config_dir = TempDir::new()?;
        let config_path = config_dir.path().join("rclone.conf");
        let mut file = fs::File::create(&config_path)?;
        writeln!(file, "[{REMOTE_NAME}]")?;
        writeln!(file, "type = s3")?;
        writeln!(file, "provider = Cloudflare")?;
        writeln!(file, "access_key_id = {}", store.access_key_id)?;
        writeln!(file, "secret_access_key = {}", store.secret_access_key)?;
        writeln!(file, "endpoint = {}", store.endpoint_url)?;

        Ok(RcloneTransfer {
            bucket: store.bucket.clone(),
            config_path,
            _config_dir: config_dir,
        })
    }
}

impl BulkTransfer for RcloneTransfer {
    fn transfer(&self, plan: &TransferPlan) -> Result<TransferOutcome, MirrorError> {
        let dest = format!("{REMOTE_NAME}:{}/{}", self.bucket, plan.dest_prefix);

        let mut command = Command::new("rclone");
        match plan.mode {
            // Additive: only missing or size-changed files move, and files
            // newer at the destination are left alone.
            TransferMode::Copy => command.arg("copy").arg("--size-only").arg("--update"),
            // Mirror: destination set becomes identical to the cache,
            // deletions included.
            TransferMode::Sync => command.arg("sync").arg("--size-only"),
        };
        command
            .arg("--config")
            .arg(&self.config_path)
            .arg("--include")
            .arg(&plan.include_glob)
            .arg(&plan.source_dir)
            .arg(&dest);

        info!(mode = ?plan.mode, include = %plan.include_glob, dest = %dest, "Launching rclone");

        let output = command.output().map_err(|e| {
            error!(error = ?e, "Failed to launch rclone process");
            MirrorError::Io(e)
        })?;

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();

        if output.status.success() {
            info!(dest = %dest, "rclone transfer completed");
            Ok(TransferOutcome { stdout, stderr })
        } else {
            let status = output.status.code().unwrap_or(-1);
            error!(status, dest = %dest, "rclone exited with non-zero code: {stderr}");
            Err(MirrorError::TransferFailure {
                status,
                stdout,
                stderr,
            })
        }
    }
}
