//! # KAMs Journey Common Library
//!
//! Shared code for the KAMs Journey analytics backend:
//! - Error taxonomy shared by the loader and the read API
//! - Configuration resolution (CLI / TOML / compiled defaults)
//! - Storage initialisation and the declarative schema registry
//! - Row models for every ingested record type
//! - Batch ingestion of the modelling pipeline's JSON artifacts

pub mod config;
pub mod db;
pub mod error;
pub mod ingest;

pub use error::{Error, Result};
