use std::path::PathBuf;

use anyhow::Result;
use chrono::Utc;
use clap::{Parser, Subcommand};

use crate::columnar::ParquetEncoder;
use crate::huggingface::HfProvider;
use crate::load_config::load_config;
use crate::store::S3Gateway;
use crate::synchronise::run_batch;
use crate::transfer::RcloneTransfer;

/// CLI for ds-mirror: mirror monthly-partitioned price datasets into a
/// bucket.
#[derive(Parser)]
#[clap(
    name = "ds-mirror",
    version,
    about = "Mirror daily-price datasets into S3-compatible object storage, one parquet object per month"
)]
pub struct Cli {
    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Synchronize all configured datasets into the target bucket
    Sync {
        /// Path to the YAML config file
        #[clap(long)]
        config: PathBuf,
        /// Re-materialize every cached partition, not just the recent window
        /// (staged policy only)
        #[clap(long)]
        overwrite_cache: bool,
        /// Mirror deletions to the bucket instead of additive copy (staged
        /// policy only)
        #[clap(long)]
        force_sync: bool,
    },
}

/// Extracted async CLI logic entrypoint for integration tests and main()
pub async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Sync {
            config,
            overwrite_cache,
            force_sync,
        } => {
            let config = load_config(config, overwrite_cache, force_sync)?;

            let provider = HfProvider::new(config.provider_token.clone());
            let store = S3Gateway::new(&config.store)?;
            let encoder = ParquetEncoder::new(config.compression_level);
            let transfer = RcloneTransfer::new(&config.store)?;

            let now = Utc::now();
            let report = run_batch(
                &config,
                &provider,
                &store,
                &encoder,
                &transfer,
                now.date_naive(),
                now,
            )
            .await;

            println!("Mirror run complete.\nReport:");
            println!("{report:#?}");
            Ok(())
        }
    }
}
