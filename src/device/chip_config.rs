//! Chip configuration trait and implementations.
//!
//! Pipeline dimensions (stage count, PHV layout, table sizes) come from a
//! `ChipConfig` instead of constants spread through the model, so a
//! different chip variant only needs another implementation.
//!
//! # Example
//!
//! ```
//! use mau_model::device::chip_config::{ChipConfig, TofinoLikeConfig};
//! use std::sync::Arc;
//!
//! let chip: Arc<dyn ChipConfig> = Arc::new(TofinoLikeConfig);
//! assert_eq!(chip.num_stages(), 12);
//! assert_eq!(chip.phv_layout().len(), 224);
//! ```

use crate::phv::{PhvError, PhvLayout};

/// Number of MAU stages in the default chip.
pub const DEFAULT_STAGES: usize = 12;

/// Exact-match SRAM entries per stage in the default chip.
pub const DEFAULT_EXACT_MATCH_ENTRIES: usize = 1024;

/// Action sets per stage. The miss-action and SRAM entry fields are 3 bits.
pub const MAX_ACTION_SETS: usize = 8;

/// Largest stage count the address map can express (5-bit stage field).
pub const MAX_STAGES: usize = 32;

/// Largest PHV the address map can express. Action memory words and the
/// match key select carry an 8-bit container field.
pub const MAX_CONTAINERS: usize = 256;

/// Chip configuration trait.
pub trait ChipConfig: Send + Sync + std::fmt::Debug {
    /// Number of MAU stages in the pipeline.
    fn num_stages(&self) -> usize;

    /// PHV container layout.
    fn phv_layout(&self) -> PhvLayout;

    /// Exact-match SRAM entries per stage.
    fn exact_match_entries(&self) -> usize;

    /// Action sets per stage.
    fn action_sets(&self) -> usize {
        MAX_ACTION_SETS
    }

    /// Name for display.
    fn name(&self) -> &'static str;
}

/// Default 12-stage chip with the standard 224-container PHV.
#[derive(Debug, Clone, Copy, Default)]
pub struct TofinoLikeConfig;

impl ChipConfig for TofinoLikeConfig {
    fn num_stages(&self) -> usize {
        DEFAULT_STAGES
    }

    fn phv_layout(&self) -> PhvLayout {
        PhvLayout::standard()
    }

    fn exact_match_entries(&self) -> usize {
        DEFAULT_EXACT_MATCH_ENTRIES
    }

    fn name(&self) -> &'static str {
        "12-stage MAU, 224-container PHV"
    }
}

/// Chip configuration with explicit dimensions.
///
/// The stage count is clamped to what the address map can express. A PHV
/// layout larger than [`MAX_CONTAINERS`] is rejected.
#[derive(Debug, Clone)]
pub struct CustomConfig {
    stages: usize,
    layout: PhvLayout,
    exact_match_entries: usize,
}

impl CustomConfig {
    /// Build a custom configuration.
    pub fn new(stages: usize, layout: PhvLayout, exact_match_entries: usize) -> Result<Self, PhvError> {
        if layout.len() > MAX_CONTAINERS {
            return Err(PhvError::InvalidLayout(format!(
                "{} containers exceed the addressable {}",
                layout.len(),
                MAX_CONTAINERS
            )));
        }
        Ok(Self {
            stages: clamp_stages(stages),
            layout,
            exact_match_entries,
        })
    }

    /// Default chip with a different stage count.
    pub fn with_stages(stages: usize) -> Self {
        Self {
            stages: clamp_stages(stages),
            layout: PhvLayout::standard(),
            exact_match_entries: DEFAULT_EXACT_MATCH_ENTRIES,
        }
    }
}

fn clamp_stages(stages: usize) -> usize {
    if stages > MAX_STAGES {
        log::warn!("Clamping stage count {} to {}", stages, MAX_STAGES);
    }
    stages.min(MAX_STAGES)
}

impl ChipConfig for CustomConfig {
    fn num_stages(&self) -> usize {
        self.stages
    }

    fn phv_layout(&self) -> PhvLayout {
        self.layout.clone()
    }

    fn exact_match_entries(&self) -> usize {
        self.exact_match_entries
    }

    fn name(&self) -> &'static str {
        "custom"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_dimensions() {
        let chip = TofinoLikeConfig;
        assert_eq!(chip.num_stages(), 12);
        assert_eq!(chip.exact_match_entries(), 1024);
        assert_eq!(chip.action_sets(), 8);
        assert_eq!(chip.phv_layout(), PhvLayout::standard());
    }

    #[test]
    fn test_custom_rejects_unaddressable_layout() {
        use crate::phv::{ContainerGroup, ContainerWidth};

        let layout = |count| PhvLayout::new(vec![ContainerGroup::new(ContainerWidth::Bits32, 0, count)]).unwrap();
        let err = CustomConfig::new(1, layout(300), 16).unwrap_err();
        assert!(matches!(err, PhvError::InvalidLayout(_)));

        let chip = CustomConfig::new(1, layout(MAX_CONTAINERS), 16).unwrap();
        assert_eq!(chip.phv_layout().len(), MAX_CONTAINERS);
    }

    #[test]
    fn test_custom_clamps_stages() {
        let chip = CustomConfig::with_stages(100);
        assert_eq!(chip.num_stages(), MAX_STAGES);
        assert_eq!(CustomConfig::with_stages(2).num_stages(), 2);
    }
}
