//! Coverfall CLI library
//!
//! Exposes the CLI's building blocks so integration tests can exercise them
//! without spawning the binary.

pub mod batch;
pub mod config;
pub mod output;
pub mod result_cache;
pub mod terminal;
