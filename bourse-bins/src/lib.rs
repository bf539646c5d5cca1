//! Bourse binaries support library
//!
//! - `common`: CLI arguments, configuration and logging setup
//! - `playbook`: random order generation and submission
//! - `report`: end-of-run trading report

pub mod common;
pub mod playbook;
pub mod report;
