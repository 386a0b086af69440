//! `baseliner-recon` — Baseline reconciliation engine.
//!
//! Pure engine crate: receives pre-loaded records and boundary rows, returns
//! classified results. No CLI or file-path dependencies.

pub mod annotate;
pub mod classify;
pub mod config;
pub mod engine;
pub mod error;
pub mod evidence;
pub mod matcher;
pub mod model;
pub mod subnet;

pub use config::RunConfig;
pub use engine::{run, RunInput};
pub use error::EngineError;
pub use model::{Record, RecordSet, RunReport, Verdict};
pub use subnet::SubnetTable;
