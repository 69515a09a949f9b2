//! # contract: trait seams for the mirror pipeline
//!
//! This module defines the interfaces the synchronisation core is written
//! against, plus the plain data types that cross them:
//!
//! - [`DatasetProvider`]: the remote dataset host (metadata + full rows).
//! - [`ObjectStoreGateway`]: the destination bucket (head/get/put/list).
//! - [`PartitionEncoder`]: turns a month's rows into one columnar file.
//! - [`BulkTransfer`]: external directory-level reconciliation utility.
//!
//! ## Mocking & Testing
//! All traits are annotated for `mockall` so consumers can generate
//! deterministic mocks for unit/integration tests. Mocks are exported under
//! the `test-export-mocks` feature.
//!
//! ## Error contract
//! Every method returns `Result<_, MirrorError>`; implementors convert
//! upstream errors into the taxonomy in [`crate::errors`]. In particular,
//! `exists` distinguishes "confirmed absent" (`Ok(false)`) from "check
//! failed" (`Err`), so a flaky store never silently skips reprocessing.

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use mockall::automock;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::errors::MirrorError;

/// Source-side metadata for one dataset repository.
#[derive(Debug, Clone)]
pub struct DatasetMeta {
    pub repo_id: String,
    /// When the source repository last changed, per the hub API.
    pub last_modified: DateTime<Utc>,
}

/// One daily price record as delivered by the source.
///
/// The `date` field is kept raw; partitioning parses it and rejects the
/// dataset on the first malformed value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceRow {
    pub symbol: String,
    pub date: String,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
    #[serde(default)]
    pub adj_close: Option<f64>,
}

/// Trait for the remote dataset host.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait DatasetProvider: Send + Sync {
    /// Fetch repository metadata, chiefly the last-modified timestamp.
    async fn fetch_metadata(&self, repo_id: &str) -> Result<DatasetMeta, MirrorError>;

    /// Fetch the full dataset as typed rows.
    async fn fetch_rows(&self, repo_id: &str) -> Result<Vec<PriceRow>, MirrorError>;
}

/// Trait for the destination bucket.
///
/// Keys are bucket-relative (e.g. `ds/stocks-daily-price/2024.02.parquet`);
/// the implementor owns bucket selection and credentials.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait ObjectStoreGateway: Send + Sync {
    /// Existence check. `Ok(false)` means confirmed absent; transport or
    /// permission failures surface as `Err`.
    async fn exists(&self, key: &str) -> Result<bool, MirrorError>;

    /// Download an object, `None` when it does not exist.
    async fn get(&self, key: &str) -> Result<Option<Bytes>, MirrorError>;

    /// Single-shot atomic overwrite.
    async fn put(&self, key: &str, body: Bytes, content_type: &str) -> Result<(), MirrorError>;

    /// List object keys under a prefix.
    async fn list(&self, prefix: &str) -> Result<Vec<String>, MirrorError>;
}

/// Trait for serializing one partition's rows into a columnar file body.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
pub trait PartitionEncoder: Send + Sync {
    fn encode(&self, rows: &[PriceRow]) -> Result<Bytes, MirrorError>;
}

/// Reconciliation semantics for a bulk transfer run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferMode {
    /// Additive: upload missing/changed files, never delete at destination.
    Copy,
    /// Mirror: make the destination set identical to the source, deletions
    /// included.
    Sync,
}

/// One directory-level reconciliation request against the bucket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferPlan {
    /// Local staging directory used as the transfer source root.
    pub source_dir: PathBuf,
    /// Destination prefix inside the bucket (e.g. `ds`).
    pub dest_prefix: String,
    /// Glob restricting the transfer to one dataset's files.
    pub include_glob: String,
    pub mode: TransferMode,
}

/// Captured result of a completed transfer invocation.
#[derive(Debug, Clone, Default)]
pub struct TransferOutcome {
    pub stdout: String,
    pub stderr: String,
}

/// Trait for the external copy/sync utility.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
pub trait BulkTransfer: Send + Sync {
    /// Run the external utility for one plan. A non-zero exit becomes
    /// [`MirrorError::TransferFailure`] carrying the captured output.
    fn transfer(&self, plan: &TransferPlan) -> Result<TransferOutcome, MirrorError>;
}
