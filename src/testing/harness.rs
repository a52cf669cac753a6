//! Test-utility API over a chip model.
//!
//! `ModelHarness` bundles a `ChipModel` with one `Port` so a test can
//! configure the chip, build a PHV and push it through in a few calls,
//! without any process-wide state.

use std::sync::Arc;

use anyhow::Result;

use crate::device::chip_config::{ChipConfig, TofinoLikeConfig};
use crate::device::port::{Port, ProcessedPhv};
use crate::device::registers::{Register, RegisterAddress, RegisterError};
use crate::device::state::ChipModel;
use crate::parser::script::ConfigScript;
use crate::phv::{Phv, PhvError};

/// A chip model plus the port PHVs enter through.
pub struct ModelHarness {
    model: ChipModel,
    port: Port,
}

impl ModelHarness {
    /// Harness over the default chip.
    pub fn new() -> Self {
        Self::with_chip(Arc::new(TofinoLikeConfig), None)
    }

    /// Harness over `chip`, with an optional PHV pool limit.
    pub fn with_chip(chip: Arc<dyn ChipConfig>, pool_limit: Option<usize>) -> Self {
        Self {
            model: ChipModel::with_pool_limit(chip, pool_limit),
            port: Port::new(0),
        }
    }

    /// Harness over an existing model.
    pub fn from_model(model: ChipModel) -> Self {
        Self { model, port: Port::new(0) }
    }

    pub fn model(&self) -> &ChipModel {
        &self.model
    }

    pub fn model_mut(&mut self) -> &mut ChipModel {
        &mut self.model
    }

    pub fn port(&self) -> &Port {
        &self.port
    }

    /// Reset every stage.
    pub fn reset(&mut self) {
        self.model.reset();
    }

    /// Direct register write.
    pub fn out_word(&mut self, address: u32, value: u32) -> Result<(), RegisterError> {
        self.model.out_word(address, value)
    }

    /// Direct register write by name.
    pub fn write_register(&mut self, stage: usize, register: Register, value: u32) -> Result<(), RegisterError> {
        self.model.out_word(RegisterAddress::new(stage, register).encode(), value)
    }

    /// Indirect memory write.
    pub fn indirect_write(&mut self, address: u64, data0: u64, data1: u64) -> Result<(), RegisterError> {
        self.model.indirect_write(address, data0, data1)
    }

    /// Apply a configuration script.
    pub fn apply_script(&mut self, script: &ConfigScript) -> Result<()> {
        self.model.apply_script(script)
    }

    /// Allocate a zeroed PHV.
    pub fn alloc_phv(&self) -> Result<Phv, PhvError> {
        self.model.alloc_phv()
    }

    /// Push `phv` through the port.
    pub fn process(&mut self, phv: Phv) -> Result<ProcessedPhv, PhvError> {
        self.port.process_inbound(&mut self.model, phv)
    }
}

impl Default for ModelHarness {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::action::{ActionInstruction, AluOp};
    use crate::device::registers::IndirectAddress;
    use crate::device::stage::ExactMatchEntry;

    #[test]
    fn test_exact_match_hit_selects_action_set() {
        let mut h = ModelHarness::new();
        h.write_register(0, Register::StageControl, 0x1).unwrap();
        // Key on container 70 (8-bit), full mask
        h.write_register(0, Register::MatchKeySelect, 0x100 | 70).unwrap();
        h.write_register(0, Register::MatchKeyMask, 0xFF).unwrap();
        h.write_register(0, Register::MissAction, 0x100).unwrap();

        // Set 0 (miss): c0 = 1; set 2 (hit): c0 = c1 ^ c2
        h.write_register(0, Register::ActionInstruction { set: 0, container: 0 }, ActionInstruction::new(AluOp::Set, 0, 0).encode())
            .unwrap();
        h.write_register(0, Register::ActionOperand { set: 0, container: 0 }, 1).unwrap();
        h.write_register(0, Register::ActionInstruction { set: 2, container: 0 }, ActionInstruction::new(AluOp::Xor, 1, 2).encode())
            .unwrap();

        let entry = ExactMatchEntry { key: 0x2A, valid: true, action_set: 2 };
        h.indirect_write(IndirectAddress::exact_match(0, 5).encode(), entry.to_data(), 0).unwrap();

        let mut phv = h.alloc_phv().unwrap();
        phv.set_ingress();
        phv.set(70, 0x2A);
        phv.set(1, 0xF0F0_0000);
        phv.set(2, 0x0F0F_1234);
        let out = h.process(phv).unwrap().into_output();
        assert_eq!(out.get(0), 0xFFFF_1234);

        let mut phv = h.alloc_phv().unwrap();
        phv.set_ingress();
        phv.set(70, 0x2B);
        let out = h.process(phv).unwrap().into_output();
        assert_eq!(out.get(0), 1);

        let stats = h.model().stage(0).unwrap().stats();
        assert_eq!((stats.hits, stats.misses), (1, 1));
        assert_eq!(h.port().stats().processed, 2);
    }

    #[test]
    fn test_reset_disables_processing() {
        let mut h = ModelHarness::new();
        h.write_register(4, Register::StageControl, 0x2).unwrap();
        let phv = h.alloc_phv().unwrap();
        assert!(h.process(phv).unwrap().is_new());

        h.reset();
        let phv = h.alloc_phv().unwrap();
        assert!(!h.process(phv).unwrap().is_new());
    }
}
