#![doc = "ds-mirror: incremental mirroring of monthly-partitioned price datasets into object storage."]

//! This crate mirrors externally hosted daily-price datasets into an
//! S3-compatible bucket, one parquet object per calendar month, and keeps a
//! per-dataset changelog so reruns are idempotent and cheap.
//!
//! # Usage
//! The [`synchronise`] module holds the planning core; concrete adapters for
//! the Hugging Face hub, the bucket, parquet encoding, and rclone live in
//! their own modules behind the traits in [`contract`].

pub mod cache;
pub mod cli;
pub mod columnar;
pub mod config;
pub mod contract;
pub mod errors;
pub mod huggingface;
pub mod ledger;
pub mod load_config;
pub mod partition;
pub mod store;
pub mod synchronise;
pub mod transfer;
