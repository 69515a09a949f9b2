//! Local staging cache of materialized partition files.
//!
//! Layout mirrors the bucket: `<root>/<dataset>/<YYYY.MM>.parquet`. The
//! staged policy fills this cache and then hands the whole directory to the
//! bulk transfer utility.

use std::fs;
use std::path::{Path, PathBuf};

use bytes::Bytes;
use tracing::debug;

use crate::errors::MirrorError;
use crate::partition::PartitionKey;

pub struct LocalPartitionCache {
    root: PathBuf,
}

impl LocalPartitionCache {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        LocalPartitionCache { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn dataset_dir(&self, dataset: &str) -> PathBuf {
        self.root.join(dataset)
    }

    pub fn partition_path(&self, dataset: &str, key: PartitionKey) -> PathBuf {
        self.dataset_dir(dataset).join(format!("{key}.parquet"))
    }

    /// Whether a materialized file for this dataset+month already exists.
    pub fn has(&self, dataset: &str, key: PartitionKey) -> bool {
        self.partition_path(dataset, key).is_file()
    }

    /// Writes (or overwrites) one partition file, creating directories as
    /// needed.
    pub fn write(
        &self,
        dataset: &str,
        key: PartitionKey,
        body: &Bytes,
    ) -> Result<PathBuf, MirrorError> {
        let dir = self.dataset_dir(dataset);
        fs::create_dir_all(&dir)?;
        let path = self.partition_path(dataset, key);
        fs::write(&path, body)?;
        debug!(path = %path.display(), bytes = body.len(), "Cached partition file");
        Ok(path)
    }
}
