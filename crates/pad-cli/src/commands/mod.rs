//! CLI command handlers
//!
//! # Modules
//!
//! - `publish`: sanitize a dataset and report the utility loss
//! - `describe`: describe the published data; `check-config`
//! - `io`: config loading and dataset JSON

pub mod describe;
pub mod io;
pub mod publish;
