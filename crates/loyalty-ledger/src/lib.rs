pub mod access;
pub mod config;
pub mod error;
pub mod ingest;
pub mod ledger;
pub mod points;
pub mod reporting;
pub mod router;
pub mod service;
pub mod store;
pub mod telemetry;
