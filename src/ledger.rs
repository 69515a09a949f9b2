//! Durable per-dataset freshness records.
//!
//! One changelog object per dataset lives at `ds/<dataset>/changelog` and is
//! only ever written as a single-shot full overwrite after a complete
//! successful pass, so a rerun either sees the previous record or the new
//! one, never a partial write.

use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::contract::ObjectStoreGateway;
use crate::errors::MirrorError;

/// Persisted state of the last successful mirror pass for one dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangelogRecord {
    pub repo_id: String,
    pub last_update: DateTime<Utc>,
    pub processed_at: DateTime<Utc>,
}

/// Bucket key of a dataset's changelog object.
pub fn changelog_key(dataset: &str) -> String {
    format!("ds/{dataset}/changelog")
}

/// Reads and writes [`ChangelogRecord`]s through the object store gateway.
pub struct FreshnessLedger<'a, S: ObjectStoreGateway + ?Sized> {
    store: &'a S,
}

impl<'a, S: ObjectStoreGateway + ?Sized> FreshnessLedger<'a, S> {
    pub fn new(store: &'a S) -> Self {
        FreshnessLedger { store }
    }

    /// Returns the record for `dataset`, or `None` when no record exists or
    /// the stored object is not a valid record. A corrupt ledger means "no
    /// prior run", never a fatal error; storage failures still propagate.
    pub async fn read(&self, dataset: &str) -> Result<Option<ChangelogRecord>, MirrorError> {
        let key = changelog_key(dataset);
        let Some(body) = self.store.get(&key).await? else {
            return Ok(None);
        };
        match serde_json::from_slice::<ChangelogRecord>(&body) {
            Ok(record) => Ok(Some(record)),
            Err(e) => {
                warn!(key = %key, error = %e, "Changelog object is unparsable, treating as absent");
                Ok(None)
            }
        }
    }

    /// Overwrites the record for `dataset` in one put.
    pub async fn write(
        &self,
        dataset: &str,
        repo_id: &str,
        last_update: DateTime<Utc>,
        processed_at: DateTime<Utc>,
    ) -> Result<(), MirrorError> {
        let key = changelog_key(dataset);
        let record = ChangelogRecord {
            repo_id: repo_id.to_string(),
            last_update,
            processed_at,
        };
        let body = serde_json::to_vec_pretty(&record)
            .map_err(|e| MirrorError::Encode(format!("changelog serialization failed: {e}")))?;
        self.store
            .put(&key, Bytes::from(body), "application/json")
            .await?;
        info!(key = %key, last_update = %last_update, "Updated changelog");
        Ok(())
    }
}

/// Decision rule for the whole-dataset skip: unchanged iff a record exists
/// and its `last_update` is not older than the source's `last_modified`.
/// Absent records (including corrupt ones read back as `None`) are always
/// stale.
pub fn is_unchanged(record: Option<&ChangelogRecord>, last_modified: DateTime<Utc>) -> bool {
    match record {
        Some(rec) => rec.last_update >= last_modified,
        None => false,
    }
}
