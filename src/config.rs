use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Which synchronisation policy a run uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MirrorPolicy {
    /// Existence-gated uploads straight to the bucket, with a whole-dataset
    /// skip via the changelog.
    Direct,
    /// Materialize into the local cache (force-refreshing recent months),
    /// then reconcile the cache with the bucket via the bulk transfer
    /// utility.
    Staged,
}

/// Credentials and endpoint for the destination bucket.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub endpoint_url: String,
    pub access_key_id: String,
    pub secret_access_key: String,
    pub bucket: String,
}

/// The full, explicit configuration for one mirror run. Constructed once by
/// `load_config` and passed by reference; there are no process-wide
/// singletons.
#[derive(Debug)]
pub struct MirrorConfig {
    /// Source repository ids, processed in order.
    pub datasets: Vec<String>,
    pub policy: MirrorPolicy,
    pub store: StoreConfig,
    /// Optional auth token for the source hub.
    pub provider_token: Option<String>,
    /// Local staging directory for the staged policy.
    pub cache_dir: PathBuf,
    /// Re-materialize every cached partition, not just the recent window.
    pub overwrite_cache: bool,
    /// Mirror deletions to the bucket instead of additive copy.
    pub force_sync: bool,
    /// zstd level for partition files.
    pub compression_level: i32,
}

impl MirrorConfig {
    pub fn trace_loaded(&self) {
        info!(
            datasets = self.datasets.len(),
            policy = ?self.policy,
            bucket = %self.store.bucket,
            cache_dir = %self.cache_dir.display(),
            overwrite_cache = self.overwrite_cache,
            force_sync = self.force_sync,
            "Loaded MirrorConfig"
        );
        debug!(?self, "MirrorConfig loaded (full debug)");
    }
}

/// Derived short name of a dataset: lowercase last path segment of its repo
/// id. Used in every bucket key and cache path.
pub fn short_name(repo_id: &str) -> String {
    repo_id
        .rsplit('/')
        .next()
        .unwrap_or(repo_id)
        .to_lowercase()
}
