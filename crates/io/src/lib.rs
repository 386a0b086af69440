//! `baseliner-io` — File I/O for the reconciliation engine.
//!
//! CSV import/export, fabric (APIC-style) export loading, and the Excel
//! comparison report. The engine itself never touches a file path.

pub mod csv;
pub mod fabric;
pub mod xlsx;
