//! Chip model state and register application.
//!
//! `ChipModel` is the explicitly owned replacement for a process-wide chip
//! singleton. It holds every MAU stage and the PHV pool, applies direct and
//! indirect register writes, and runs PHVs through the pipeline.
//!
//! # Configuration Process
//!
//! 1. Create a `ChipModel` for a chip configuration
//! 2. `reset()` to power-on state (a new model already is)
//! 3. Apply register writes (`out_word`, `indirect_write`) or a whole
//!    configuration script (`apply_script`)
//! 4. Allocate PHVs and hand them to a [`Port`](super::port::Port)
//!
//! # Example
//!
//! ```
//! use mau_model::device::ChipModel;
//!
//! let mut model = ChipModel::tofino_like();
//! model.out_word(0x0000_0000, 0x1).unwrap(); // stage 0: ingress enable
//! let mut phv = model.alloc_phv().unwrap();
//! phv.set_ingress();
//! ```

use std::sync::Arc;

use anyhow::{Context, Result};

use super::chip_config::{ChipConfig, TofinoLikeConfig, MAX_CONTAINERS};
use super::registers::{IndirectAddress, IndirectMemory, RegisterAddress, RegisterError};
use super::stage::MauStage;
use crate::parser::script::{ConfigScript, ScriptCommand};
use crate::phv::{Phv, PhvError, PhvLayout, PhvPool};

/// Counters for register traffic.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct WriteStats {
    /// Accepted direct writes
    pub direct_writes: usize,
    /// Accepted indirect writes
    pub indirect_writes: usize,
    /// Resets since construction
    pub resets: usize,
    /// Writes rejected with an error
    pub rejected: usize,
}

/// Software model of one MAU pipeline.
pub struct ChipModel {
    chip: Arc<dyn ChipConfig>,
    layout: Arc<PhvLayout>,
    stages: Vec<MauStage>,
    pool: PhvPool,
    stats: WriteStats,
}

impl ChipModel {
    /// Create a model for `chip` with an unbounded PHV pool.
    pub fn new(chip: Arc<dyn ChipConfig>) -> Self {
        Self::with_pool_limit(chip, None)
    }

    /// Create a model whose PHV pool allows at most `limit` PHVs in flight.
    pub fn with_pool_limit(chip: Arc<dyn ChipConfig>, limit: Option<usize>) -> Self {
        let layout = Arc::new(chip.phv_layout());
        if layout.len() > MAX_CONTAINERS {
            log::warn!(
                "{}: containers {}..{} are not addressable by actions or match keys",
                chip.name(),
                MAX_CONTAINERS,
                layout.len()
            );
        }
        let stages = Self::build_stages(chip.as_ref(), layout.len());
        log::info!(
            "Created chip model: {} ({} stages, {} PHV containers)",
            chip.name(),
            stages.len(),
            layout.len()
        );
        Self {
            pool: PhvPool::new(layout.clone(), limit),
            chip,
            layout,
            stages,
            stats: WriteStats::default(),
        }
    }

    /// Create the default 12-stage model.
    #[inline]
    pub fn tofino_like() -> Self {
        Self::new(Arc::new(TofinoLikeConfig))
    }

    fn build_stages(chip: &dyn ChipConfig, containers: usize) -> Vec<MauStage> {
        (0..chip.num_stages())
            .map(|i| MauStage::new(i, containers, chip.exact_match_entries(), chip.action_sets()))
            .collect()
    }

    /// Chip configuration.
    pub fn chip(&self) -> &dyn ChipConfig {
        self.chip.as_ref()
    }

    /// PHV layout shared by every PHV this model allocates.
    pub fn layout(&self) -> &Arc<PhvLayout> {
        &self.layout
    }

    /// The PHV pool.
    pub fn pool(&self) -> &PhvPool {
        &self.pool
    }

    /// Register traffic since construction.
    pub fn stats(&self) -> WriteStats {
        self.stats
    }

    /// Stage by index.
    pub fn stage(&self, index: usize) -> Option<&MauStage> {
        self.stages.get(index)
    }

    /// All stages in pipeline order.
    pub fn stages(&self) -> &[MauStage] {
        &self.stages
    }

    /// Return every stage to power-on state.
    ///
    /// PHVs already allocated stay valid; the pool is not touched.
    pub fn reset(&mut self) {
        for stage in &mut self.stages {
            stage.reset();
        }
        self.stats.resets += 1;
        log::info!("Chip model reset ({} stages)", self.stages.len());
    }

    /// Allocate a zeroed PHV from the pool.
    pub fn alloc_phv(&self) -> Result<Phv, PhvError> {
        self.pool.allocate()
    }

    fn stage_mut(&mut self, stage: usize) -> Result<&mut MauStage, RegisterError> {
        let stages = self.stages.len();
        self.stages
            .get_mut(stage)
            .ok_or(RegisterError::StageOutOfRange { stage, stages })
    }

    /// Direct register write.
    pub fn out_word(&mut self, address: u32, value: u32) -> Result<(), RegisterError> {
        let result = RegisterAddress::decode(address).and_then(|decoded| {
            log::trace!("OutWord 0x{:08X} ({}) = 0x{:08X}", address, decoded, value);
            self.stage_mut(decoded.stage)?.write_register(decoded.register, value)
        });
        self.record(result, false, || format!("OutWord 0x{:08X}", address))
    }

    /// Direct register read.
    pub fn read_word(&self, address: u32) -> Result<u32, RegisterError> {
        let decoded = RegisterAddress::decode(address)?;
        let stage = self.stages.get(decoded.stage).ok_or(RegisterError::StageOutOfRange {
            stage: decoded.stage,
            stages: self.stages.len(),
        })?;
        stage.read_register(decoded.register)
    }

    /// Indirect (memory) write of one 128-bit line.
    pub fn indirect_write(&mut self, address: u64, data0: u64, data1: u64) -> Result<(), RegisterError> {
        let result = IndirectAddress::decode(address).and_then(|decoded| {
            log::trace!(
                "IndirectWrite 0x{:010X} ({}) = 0x{:016X} 0x{:016X}",
                address,
                decoded,
                data0,
                data1
            );
            let stage = self.stage_mut(decoded.stage)?;
            match decoded.memory {
                IndirectMemory::ExactMatchSram => stage.write_entry(decoded.entry, data0, data1),
            }
        });
        self.record(result, true, || format!("IndirectWrite 0x{:010X}", address))
    }

    /// Indirect (memory) read of one 128-bit line.
    pub fn indirect_read(&self, address: u64) -> Result<(u64, u64), RegisterError> {
        let decoded = IndirectAddress::decode(address)?;
        let stage = self.stages.get(decoded.stage).ok_or(RegisterError::StageOutOfRange {
            stage: decoded.stage,
            stages: self.stages.len(),
        })?;
        match decoded.memory {
            IndirectMemory::ExactMatchSram => stage.read_entry(decoded.entry),
        }
    }

    fn record(
        &mut self,
        result: Result<(), RegisterError>,
        indirect: bool,
        describe: impl FnOnce() -> String,
    ) -> Result<(), RegisterError> {
        match &result {
            Ok(()) if indirect => self.stats.indirect_writes += 1,
            Ok(()) => self.stats.direct_writes += 1,
            Err(e) => {
                self.stats.rejected += 1;
                log::warn!("{} rejected: {}", describe(), e);
            }
        }
        result
    }

    /// Apply every command of a configuration script, in order.
    ///
    /// Stops at the first rejected write.
    pub fn apply_script(&mut self, script: &ConfigScript) -> Result<()> {
        for cmd in script.commands() {
            match cmd.command {
                ScriptCommand::Reset => self.reset(),
                ScriptCommand::Write { address, value } => self
                    .out_word(address, value)
                    .with_context(|| format!("line {}: write", cmd.line))?,
                ScriptCommand::IndirectWrite { address, data0, data1 } => self
                    .indirect_write(address, data0, data1)
                    .with_context(|| format!("line {}: indirect write", cmd.line))?,
            }
        }
        log::info!(
            "Applied configuration script: {} commands ({} direct, {} indirect so far)",
            script.len(),
            self.stats.direct_writes,
            self.stats.indirect_writes
        );
        Ok(())
    }

    /// True if at least one stage would act on `phv`.
    pub fn would_process(&self, phv: &Phv) -> bool {
        self.stages.iter().any(|s| s.accepts(phv))
    }

    /// Run `phv` through every stage in order, in place.
    pub fn run_pipeline(&mut self, phv: &mut Phv) -> Result<(), PhvError> {
        if !Arc::ptr_eq(phv.layout(), &self.layout) && phv.layout() != &self.layout {
            return Err(PhvError::LayoutMismatch);
        }
        for stage in &mut self.stages {
            stage.process(phv)?;
        }
        Ok(())
    }

    /// Print a configuration summary.
    pub fn print_summary(&self) {
        println!("Chip Model: {}", self.chip.name());
        println!("  Stages: {}", self.stages.len());
        println!("  PHV containers: {}", self.layout.len());
        println!(
            "  Writes: {} direct, {} indirect, {} rejected, {} resets",
            self.stats.direct_writes, self.stats.indirect_writes, self.stats.rejected, self.stats.resets
        );
        for stage in &self.stages {
            let ctl = stage.control();
            if !ctl.ingress_enable && !ctl.egress_enable {
                continue;
            }
            let stats = stage.stats();
            println!(
                "  Stage {:2}: ingress={} egress={} version_check={} processed={} hits={} misses={}",
                stage.index(),
                ctl.ingress_enable,
                ctl.egress_enable,
                ctl.version_check,
                stats.processed,
                stats.hits,
                stats.misses
            );
        }
    }
}
