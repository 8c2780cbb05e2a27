//! Test utilities for the coverfall resolution pipeline
//!
//! This crate provides mock implementations and test builders for testing
//! resolver behavior without network connectivity.

pub mod builders;
pub mod mocks;

// Re-export commonly used types
pub use builders::BookRefBuilder;
pub use mocks::{MockProber, MockVolumeLookup};
