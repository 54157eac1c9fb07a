// SEO Audit Crawl Orchestration Service - API Core
//
// This crate provides the backend API for submitting website crawls,
// tracking their lifecycle, and querying structured audit results.
// Crawl execution happens out-of-process in per-job compute units;
// this core orchestrates, ingests, and serves.

pub mod common;
pub mod config;
pub mod domains;
pub mod kernel;
pub mod server;

pub use config::*;
