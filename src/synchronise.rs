//! High-level pipeline: decides, per dataset and per month, what must be
//! (re)materialized and (re)uploaded, and keeps the changelog current.
//!
//! Two policies exist, selected by configuration:
//!   - **Direct** ([`mirror_direct`]): uploads straight to the bucket. A
//!     whole dataset is skipped when the changelog says the source has not
//!     changed; individual months are skipped when their object already
//!     exists (existence check only, no content diff).
//!   - **Staged** ([`mirror_staged`]): materializes months into the local
//!     cache, always refreshing the recent window, then delegates bucket
//!     reconciliation to the bulk transfer utility.
//!
//! # Responsibilities
//! - Strictly sequential processing: datasets in config order, months one at
//!   a time, newest first.
//! - Per-dataset failure isolation: one dataset's failure is recorded in the
//!   report and the batch moves on.
//! - The changelog is written only after a fully successful direct pass.
//!
//! # Callable From
//! - The CLI binary and the integration tests; all collaborators are trait
//!   objects from [`crate::contract`], so tests run against mocks.

use chrono::{DateTime, NaiveDate, Utc};
use tracing::{error, info, warn};

use crate::cache::LocalPartitionCache;
use crate::config::{short_name, MirrorConfig, MirrorPolicy};
use crate::contract::{
    BulkTransfer, DatasetProvider, ObjectStoreGateway, PartitionEncoder, TransferMode,
    TransferPlan,
};
use crate::errors::MirrorError;
use crate::ledger::{is_unchanged, FreshnessLedger};
use crate::partition::{partition_rows, recent_window, PartitionKey, RECENT_WINDOW_MONTHS};

/// Bucket key of one partition object.
pub fn partition_object_key(dataset: &str, key: PartitionKey) -> String {
    format!("ds/{dataset}/{key}.parquet")
}

/// Bucket prefix holding all of a dataset's objects.
pub fn dataset_prefix(dataset: &str) -> String {
    format!("ds/{dataset}")
}

/// Outcome report for a whole batch run.
#[derive(Debug)]
pub struct MirrorReport {
    pub datasets: Vec<DatasetReport>,
}

#[derive(Debug)]
pub struct DatasetReport {
    pub repo_id: String,
    pub dataset: String,
    pub outcome: DatasetOutcome,
}

#[derive(Debug)]
pub enum DatasetOutcome {
    /// Changelog says the source has not changed since the last pass.
    SkippedUnchanged { last_update: DateTime<Utc> },
    /// Direct policy completed; `uploaded` is in processing (descending
    /// month) order.
    Mirrored {
        uploaded: Vec<String>,
        skipped_existing: usize,
    },
    /// Staged policy completed and the cache was reconciled with the bucket.
    Staged {
        refreshed: Vec<String>,
        retained: usize,
        remote_partitions: usize,
    },
    /// This dataset failed; the batch continued without it.
    Failed { reason: String },
}

/// Processes every configured dataset in order, isolating failures.
pub async fn run_batch<P, S, E, T>(
    config: &MirrorConfig,
    provider: &P,
    store: &S,
    encoder: &E,
    transfer: &T,
    today: NaiveDate,
    now: DateTime<Utc>,
) -> MirrorReport
where
    P: DatasetProvider,
    S: ObjectStoreGateway,
    E: PartitionEncoder,
    T: BulkTransfer,
{
    info!(
        datasets = config.datasets.len(),
        policy = ?config.policy,
        "Starting mirror batch"
    );

    let cache = LocalPartitionCache::new(config.cache_dir.clone());
    let mut reports = Vec::with_capacity(config.datasets.len());

    for repo_id in &config.datasets {
        let dataset = short_name(repo_id);
        info!(repo_id = %repo_id, dataset = %dataset, "Processing dataset");

        let result = match config.policy {
            MirrorPolicy::Direct => {
                mirror_direct(repo_id, &dataset, provider, store, encoder, now).await
            }
            MirrorPolicy::Staged => {
                mirror_staged(
                    repo_id, &dataset, provider, store, encoder, &cache, transfer, config, today,
                )
                .await
            }
        };

        let outcome = match result {
            Ok(outcome) => outcome,
            Err(e) => {
                // One dataset's failure must not abort the batch.
                error!(repo_id = %repo_id, error = %e, "Dataset failed, continuing batch");
                if let MirrorError::TransferFailure { stdout, stderr, .. } = &e {
                    warn!(repo_id = %repo_id, "Transfer stdout: {stdout}");
                    warn!(repo_id = %repo_id, "Transfer stderr: {stderr}");
                }
                DatasetOutcome::Failed {
                    reason: e.to_string(),
                }
            }
        };

        reports.push(DatasetReport {
            repo_id: repo_id.clone(),
            dataset,
            outcome,
        });
    }

    MirrorReport { datasets: reports }
}

/// Existence-gated direct mirroring with a whole-dataset changelog skip.
pub async fn mirror_direct<P, S, E>(
    repo_id: &str,
    dataset: &str,
    provider: &P,
    store: &S,
    encoder: &E,
    now: DateTime<Utc>,
) -> Result<DatasetOutcome, MirrorError>
where
    P: DatasetProvider,
    S: ObjectStoreGateway,
    E: PartitionEncoder,
{
    let meta = provider.fetch_metadata(repo_id).await?;
    info!(repo_id = %repo_id, last_modified = %meta.last_modified, "Source last modified");

    let ledger = FreshnessLedger::new(store);
    let record = ledger.read(dataset).await?;
    if is_unchanged(record.as_ref(), meta.last_modified) {
        let last_update = record
            .map(|r| r.last_update)
            .unwrap_or(meta.last_modified);
        info!(
            repo_id = %repo_id,
            last_update = %last_update,
            "Source unchanged since last processing, skipping dataset"
        );
        return Ok(DatasetOutcome::SkippedUnchanged { last_update });
    }

    let rows = provider.fetch_rows(repo_id).await?;
    let partitions = partition_rows(rows)?;
    info!(repo_id = %repo_id, months = partitions.len(), "Partitioned dataset by month");

    let mut uploaded = Vec::new();
    let mut skipped_existing = 0usize;

    // Newest months first: they are the most likely to have changed and the
    // first the operator wants visible.
    for (key, month_rows) in partitions.iter().rev() {
        let object_key = partition_object_key(dataset, *key);

        if store.exists(&object_key).await? {
            info!(key = %object_key, "Partition already in bucket, skipping");
            skipped_existing += 1;
            continue;
        }

        let started = std::time::Instant::now();
        let body = encoder.encode(month_rows)?;
        store
            .put(&object_key, body, "application/octet-stream")
            .await?;
        info!(
            key = %object_key,
            rows = month_rows.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Uploaded partition"
        );
        uploaded.push(key.to_string());
    }

    // Only a fully successful pass gets recorded; a failed month above has
    // already returned and left the previous record in place.
    ledger
        .write(dataset, repo_id, meta.last_modified, now)
        .await?;

    Ok(DatasetOutcome::Mirrored {
        uploaded,
        skipped_existing,
    })
}

/// Recent-window force-refresh into the local cache, then bulk
/// reconciliation with the bucket.
#[allow(clippy::too_many_arguments)]
pub async fn mirror_staged<P, S, E, T>(
    repo_id: &str,
    dataset: &str,
    provider: &P,
    store: &S,
    encoder: &E,
    cache: &LocalPartitionCache,
    transfer: &T,
    config: &MirrorConfig,
    today: NaiveDate,
) -> Result<DatasetOutcome, MirrorError>
where
    P: DatasetProvider,
    S: ObjectStoreGateway,
    E: PartitionEncoder,
    T: BulkTransfer,
{
    // No changelog gate here: historical months are cheap to keep cached,
    // and recent months must be rechecked every run anyway.
    let rows = provider.fetch_rows(repo_id).await?;
    let partitions = partition_rows(rows)?;
    let window = recent_window(today, RECENT_WINDOW_MONTHS);

    let mut refreshed = Vec::new();
    let mut retained = 0usize;

    for (key, month_rows) in partitions.iter().rev() {
        let cached = cache.has(dataset, *key);
        let must_refresh = config.overwrite_cache || window.contains(key) || !cached;
        if !must_refresh {
            retained += 1;
            continue;
        }

        let body = encoder.encode(month_rows)?;
        cache.write(dataset, *key, &body)?;
        info!(dataset = %dataset, key = %key, rows = month_rows.len(), "Refreshed cached partition");
        refreshed.push(key.to_string());
    }

    let mode = if config.force_sync {
        TransferMode::Sync
    } else {
        TransferMode::Copy
    };
    let plan = TransferPlan {
        source_dir: cache.root().to_path_buf(),
        dest_prefix: "ds".to_string(),
        include_glob: format!("{dataset}/*.parquet"),
        mode,
    };
    let outcome = transfer.transfer(&plan)?;
    if !outcome.stdout.is_empty() {
        info!(dataset = %dataset, "Transfer output: {}", outcome.stdout.trim_end());
    }

    let remote_partitions = store
        .list(&dataset_prefix(dataset))
        .await?
        .into_iter()
        .filter(|key| key.ends_with(".parquet"))
        .count();

    Ok(DatasetOutcome::Staged {
        refreshed,
        retained,
        remote_partitions,
    })
}
