use std::env;
use std::fs::write;
use std::path::PathBuf;

use serial_test::serial;
use tempfile::NamedTempFile;

use ds_mirror::config::MirrorPolicy;

fn set_store_env() {
    env::set_var("R2_ENDPOINT_URL", "https://example.r2.cloudflarestorage.com");
    env::set_var("R2_ACCESS_KEY_ID", "test-access-key");
    env::set_var("R2_SECRET_ACCESS_KEY", "test-secret-key");
    env::set_var("R2_BUCKET_NAME", "test-bucket");
}

fn clear_store_env() {
    env::remove_var("R2_ENDPOINT_URL");
    env::remove_var("R2_ACCESS_KEY_ID");
    env::remove_var("R2_SECRET_ACCESS_KEY");
    env::remove_var("R2_BUCKET_NAME");
}

/// A static config plus required env vars produces a fully merged
/// MirrorConfig.
#[tokio::test]
#[serial]
async fn test_load_config_success_injects_env_credentials() {
    let config_yaml = r#"
datasets:
  - paperswithbacktest/Stocks-Daily-Price
  - paperswithbacktest/ETFs-Daily-Price
policy: staged
cache_dir: ./tmp/mirror-cache
compression_level: 5
"#;
    let config_file = NamedTempFile::new().expect("temp file");
    write(config_file.path(), config_yaml).unwrap();

    set_store_env();
    env::remove_var("HF_TOKEN");

    let config =
        ds_mirror::load_config::load_config(config_file.path(), true, false).expect("Config should load");

    assert_eq!(config.datasets.len(), 2);
    assert_eq!(config.datasets[0], "paperswithbacktest/Stocks-Daily-Price");
    assert_eq!(config.policy, MirrorPolicy::Staged);
    assert_eq!(config.cache_dir, PathBuf::from("./tmp/mirror-cache"));
    assert_eq!(config.compression_level, 5);
    assert!(config.overwrite_cache);
    assert!(!config.force_sync);
    assert!(config.provider_token.is_none());

    // Store credentials must come directly from environment.
    assert_eq!(config.store.bucket, "test-bucket");
    assert_eq!(config.store.access_key_id, "test-access-key");
    assert_eq!(config.store.secret_access_key, "test-secret-key");
    assert_eq!(
        config.store.endpoint_url,
        "https://example.r2.cloudflarestorage.com"
    );
}

/// Policy defaults to direct when the config file does not name one.
#[tokio::test]
#[serial]
async fn test_load_config_defaults_to_direct_policy() {
    let config_yaml = r#"
datasets:
  - paperswithbacktest/Stocks-Daily-Price
cache_dir: ./tmp/mirror-cache
"#;
    let config_file = NamedTempFile::new().expect("temp file");
    write(config_file.path(), config_yaml).unwrap();

    set_store_env();

    let config =
        ds_mirror::load_config::load_config(config_file.path(), false, false).expect("Config should load");
    assert_eq!(config.policy, MirrorPolicy::Direct);
    assert_eq!(config.compression_level, 3);
}

/// Missing required env vars makes the loader fail.
#[tokio::test]
#[serial]
async fn test_load_config_errors_on_missing_env() {
    let config_yaml = r#"
datasets:
  - paperswithbacktest/Stocks-Daily-Price
"#;
    let config_file = NamedTempFile::new().expect("temp file");
    write(config_file.path(), config_yaml).unwrap();

    clear_store_env();

    let err = ds_mirror::load_config::load_config(config_file.path(), false, false).unwrap_err();
    let msg = err.to_string();
    assert!(
        msg.contains("R2_ENDPOINT_URL"),
        "Must error for missing env var, got: {msg}"
    );
}

/// An empty dataset list is a configuration error, not an empty run.
#[tokio::test]
#[serial]
async fn test_load_config_rejects_empty_dataset_list() {
    let config_yaml = r#"
datasets: []
"#;
    let config_file = NamedTempFile::new().expect("temp file");
    write(config_file.path(), config_yaml).unwrap();

    set_store_env();

    let err = ds_mirror::load_config::load_config(config_file.path(), false, false).unwrap_err();
    assert!(err.to_string().contains("at least one dataset"));
}

/// Invalid YAML errors and reports as such.
#[tokio::test]
#[serial]
async fn test_load_config_errors_for_invalid_file() {
    let config_file = NamedTempFile::new().expect("temp file");
    write(config_file.path(), "datasets: [unterminated").unwrap();

    set_store_env();

    let err = ds_mirror::load_config::load_config(config_file.path(), false, false).unwrap_err();
    assert!(err.to_string().contains("Failed to parse config YAML"));
}
