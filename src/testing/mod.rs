//! Test infrastructure for driving the chip model.
//!
//! This module provides:
//! - A harness that owns a model and a port (no global state)
//! - Golden tests: configure from a script, inject a PHV, compare outputs
//!
//! # Usage
//!
//! ```bash
//! cargo run -- run tests/fixtures/two_stage.toml
//! ```

pub mod harness;
pub mod manifest;

pub use harness::ModelHarness;
pub use manifest::{GoldenManifest, GoldenResult, Mismatch};
