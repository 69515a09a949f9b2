use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::{error, info};

use crate::config::{MirrorConfig, MirrorPolicy, StoreConfig};

#[derive(Deserialize)]
struct StaticConfig {
    datasets: Vec<String>,
    #[serde(default)]
    policy: PolicyYaml,
    #[serde(default)]
    cache_dir: Option<PathBuf>,
    #[serde(default = "default_compression_level")]
    compression_level: i32,
}

#[derive(Deserialize, Default)]
enum PolicyYaml {
    #[default]
    #[serde(rename = "direct")]
    Direct,
    #[serde(rename = "staged")]
    Staged,
}

fn default_compression_level() -> i32 {
    3
}

fn require_env(name: &str) -> Result<String> {
    match std::env::var(name) {
        Ok(value) => Ok(value),
        Err(e) => {
            error!(var = name, error = ?e, "Required environment variable not set");
            Err(anyhow::anyhow!("{name} environment variable not set: {e}"))
        }
    }
}

/// Loads a static YAML config file (no secrets) and injects required env
/// vars for credentials. Returns a fully merged MirrorConfig or an error.
pub fn load_config<P: AsRef<Path>>(
    path: P,
    overwrite_cache: bool,
    force_sync: bool,
) -> Result<MirrorConfig> {
    let path_ref = path.as_ref();
    info!(config_path = ?path_ref, "Loading configuration from file");

    let config_content = fs::read_to_string(path_ref).with_context(|| {
        error!(config_path = ?path_ref, "Failed to read config file");
        format!("Failed to read config file {path_ref:?}")
    })?;

    let static_conf: StaticConfig = match serde_yaml::from_str(&config_content) {
        Ok(conf) => {
            info!(config_path = ?path_ref, "Parsed config YAML successfully");
            conf
        }
        Err(e) => {
            error!(error = ?e, config_path = ?path_ref, "Failed to parse config YAML");
            return Err(anyhow::anyhow!("Failed to parse config YAML: {e}"));
        }
    };

    if static_conf.datasets.is_empty() {
        anyhow::bail!("Config must list at least one dataset repo id");
    }

    let store = StoreConfig {
        endpoint_url: require_env("R2_ENDPOINT_URL")?,
        access_key_id: require_env("R2_ACCESS_KEY_ID")?,
        secret_access_key: require_env("R2_SECRET_ACCESS_KEY")?,
        bucket: require_env("R2_BUCKET_NAME")?,
    };

    // Source hub token is optional: public datasets need none.
    let provider_token = std::env::var("HF_TOKEN").ok();

    let cache_dir = match static_conf.cache_dir {
        Some(dir) => dir,
        None => dirs::home_dir()
            .map(|home| home.join(".ds-mirror").join("cache"))
            .ok_or_else(|| anyhow::anyhow!("Cannot determine home directory for cache_dir"))?,
    };

    let policy = match static_conf.policy {
        PolicyYaml::Direct => MirrorPolicy::Direct,
        PolicyYaml::Staged => MirrorPolicy::Staged,
    };

    let config = MirrorConfig {
        datasets: static_conf.datasets,
        policy,
        store,
        provider_token,
        cache_dir,
        overwrite_cache,
        force_sync,
        compression_level: static_conf.compression_level,
    };
    config.trace_loaded();
    Ok(config)
}
