//! Golden tests defined by TOML manifests.
//!
//! A manifest names a configuration script, describes one input PHV and
//! lists the container values expected after the pipeline.
//!
//! # Example Manifest
//!
//! ```toml
//! [test]
//! name = "exact_match_hit"
//! description = "SRAM hit in stage 0 selects action set 1"
//! config = "exact_match_hit.cfg"
//!
//! [input]
//! ingress = true
//! version = 0
//! values = [[70, 0x2A], [1, 5]]
//!
//! [expected]
//! values = [[0, 6], [1, 5]]
//! ```
//!
//! `config` is resolved relative to the manifest's directory.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

use super::harness::ModelHarness;
use crate::parser::script::ConfigScript;

/// Golden test manifest.
#[derive(Debug, Clone, Deserialize)]
pub struct GoldenManifest {
    pub test: TestInfo,
    pub input: InputDef,
    pub expected: ExpectedDef,
    /// Directory the manifest was loaded from
    #[serde(skip)]
    pub base_dir: PathBuf,
}

/// Basic test metadata.
#[derive(Debug, Clone, Deserialize)]
pub struct TestInfo {
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Configuration script path
    pub config: String,
}

/// Input PHV definition.
#[derive(Debug, Clone, Deserialize)]
pub struct InputDef {
    #[serde(default = "default_ingress")]
    pub ingress: bool,
    #[serde(default)]
    pub version: u8,
    #[serde(default = "default_valid")]
    pub valid: bool,
    /// `[index, value]` pairs; other containers start at zero
    #[serde(default)]
    pub values: Vec<(usize, u32)>,
}

fn default_ingress() -> bool {
    true
}

fn default_valid() -> bool {
    true
}

/// Expected output definition.
#[derive(Debug, Clone, Deserialize)]
pub struct ExpectedDef {
    /// `[index, value]` pairs to check
    pub values: Vec<(usize, u32)>,
}

/// Result of running a manifest.
#[derive(Debug)]
pub struct GoldenResult {
    pub name: String,
    pub passed: bool,
    /// Containers compared
    pub checked: usize,
    pub mismatches: Vec<Mismatch>,
}

/// A container whose output differs from the expected value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Mismatch {
    pub index: usize,
    pub expected: u32,
    pub actual: u32,
}

impl GoldenManifest {
    /// Load a manifest from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read manifest {}", path.display()))?;
        let mut manifest: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse manifest {}", path.display()))?;
        manifest.base_dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
        Ok(manifest)
    }

    /// Path of the configuration script.
    pub fn config_path(&self) -> PathBuf {
        self.base_dir.join(&self.test.config)
    }

    /// Run on a fresh default harness.
    pub fn run(&self) -> Result<GoldenResult> {
        self.run_with(&mut ModelHarness::new())
    }

    /// Configure `harness`, inject the input PHV and compare the output.
    pub fn run_with(&self, harness: &mut ModelHarness) -> Result<GoldenResult> {
        let script = ConfigScript::from_file(self.config_path())?;
        harness
            .apply_script(&script)
            .with_context(|| format!("Failed to configure '{}'", self.test.name))?;

        let mut phv = harness.alloc_phv()?;
        if self.input.ingress {
            phv.set_ingress();
        } else {
            phv.set_egress();
        }
        phv.set_version(self.input.version, self.input.valid);
        for &(index, value) in &self.input.values {
            phv.try_set(index, value)
                .with_context(|| format!("input container {}", index))?;
        }

        let output = harness.process(phv)?.into_output();

        let mut mismatches = Vec::new();
        for &(index, expected) in &self.expected.values {
            let actual = output
                .try_get(index)
                .with_context(|| format!("expected container {}", index))?;
            if actual != expected {
                mismatches.push(Mismatch { index, expected, actual });
            }
        }

        let result = GoldenResult {
            name: self.test.name.clone(),
            passed: mismatches.is_empty(),
            checked: self.expected.values.len(),
            mismatches,
        };
        log::info!(
            "Golden test '{}': {}/{} containers match",
            result.name,
            result.checked - result.mismatches.len(),
            result.checked
        );
        Ok(result)
    }
}
