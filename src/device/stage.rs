//! Match-action stage model.
//!
//! Each stage holds:
//! - A control register gating which PHVs it acts on (direction, version)
//! - A match key: one PHV container, masked
//! - An exact-match SRAM mapping key values to action sets
//! - Action sets: one instruction and one operand slot per PHV container
//!
//! # Processing
//!
//! ```text
//!   PHV ──► gate (valid version, direction, required version)
//!            │ pass-through if gated off
//!            ▼
//!          lookup (key container & mask) ──hit──► entry action set
//!            │ miss
//!            ▼
//!          miss action set (if enabled)
//!            │
//!            ▼
//!          execute: all slots read the pre-stage PHV, then commit
//! ```

use smallvec::SmallVec;

use super::action::ActionInstruction;
use super::registers::{IndirectAddress, Register, RegisterAddress, RegisterError};
use super::registers_spec::{exact_match as em, stage_control as sc};
use crate::phv::{Direction, Phv, PhvError};

/// Decoded STAGE_CONTROL register.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StageControl {
    /// Stage acts on ingress PHVs
    pub ingress_enable: bool,
    /// Stage acts on egress PHVs
    pub egress_enable: bool,
    /// PHV version must equal `version`
    pub version_check: bool,
    /// Required version (4 bits)
    pub version: u8,
}

impl StageControl {
    /// Decode from the raw register value.
    pub fn from_word(word: u32) -> Self {
        Self {
            ingress_enable: word & sc::CONTROL_INGRESS_ENABLE != 0,
            egress_enable: word & sc::CONTROL_EGRESS_ENABLE != 0,
            version_check: word & sc::CONTROL_VERSION_CHECK != 0,
            version: ((word >> sc::CONTROL_VERSION_SHIFT) & sc::CONTROL_VERSION_MASK) as u8,
        }
    }

    /// Encode into the raw register value.
    pub fn to_word(&self) -> u32 {
        let mut word = 0;
        if self.ingress_enable {
            word |= sc::CONTROL_INGRESS_ENABLE;
        }
        if self.egress_enable {
            word |= sc::CONTROL_EGRESS_ENABLE;
        }
        if self.version_check {
            word |= sc::CONTROL_VERSION_CHECK;
        }
        word | ((self.version as u32 & sc::CONTROL_VERSION_MASK) << sc::CONTROL_VERSION_SHIFT)
    }

    /// True if enabled for `direction`.
    pub fn enabled_for(&self, direction: Direction) -> bool {
        match direction {
            Direction::Ingress => self.ingress_enable,
            Direction::Egress => self.egress_enable,
        }
    }
}

/// Decoded exact-match SRAM entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExactMatchEntry {
    /// Key compared against the masked PHV key
    pub key: u32,
    /// Entry participates in lookups
    pub valid: bool,
    /// Action set run on a hit
    pub action_set: usize,
}

impl ExactMatchEntry {
    /// Decode from the first data word of the SRAM line.
    pub fn from_data(data0: u64) -> Self {
        Self {
            key: (data0 & em::KEY_MASK) as u32,
            valid: data0 & em::VALID_BIT != 0,
            action_set: ((data0 >> em::ACTION_SET_SHIFT) & em::ACTION_SET_MASK) as usize,
        }
    }

    /// Encode into the first data word of an SRAM line.
    pub fn to_data(&self) -> u64 {
        let mut data = self.key as u64;
        if self.valid {
            data |= em::VALID_BIT;
        }
        data | ((self.action_set as u64 & em::ACTION_SET_MASK) << em::ACTION_SET_SHIFT)
    }
}

/// One action set: an instruction and operand per container.
#[derive(Debug, Clone)]
struct ActionSet {
    instructions: Vec<ActionInstruction>,
    operands: Vec<u32>,
    /// Containers with a non-NOP instruction, ascending
    active: SmallVec<[usize; 8]>,
}

impl ActionSet {
    fn new(containers: usize) -> Self {
        Self {
            instructions: vec![ActionInstruction::default(); containers],
            operands: vec![0; containers],
            active: SmallVec::new(),
        }
    }

    fn set_instruction(&mut self, container: usize, instr: ActionInstruction) {
        self.instructions[container] = instr;
        let pos = self.active.binary_search(&container);
        match (instr.is_nop(), pos) {
            (false, Err(at)) => self.active.insert(at, container),
            (true, Ok(at)) => {
                self.active.remove(at);
            }
            _ => {}
        }
    }
}

/// Per-stage counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StageStats {
    /// PHVs the stage acted on
    pub processed: u64,
    /// PHVs passed through because of the gate
    pub skipped: u64,
    /// Lookups that hit an SRAM entry
    pub hits: u64,
    /// Lookups that missed
    pub misses: u64,
}

/// A single MAU stage.
#[derive(Debug, Clone)]
pub struct MauStage {
    index: usize,
    containers: usize,
    control: StageControl,
    key_select: u32,
    key_mask: u32,
    miss_action: u32,
    action_sets: Vec<ActionSet>,
    /// Exact-match SRAM lines (data0, data1)
    sram: Vec<[u64; 2]>,
    stats: StageStats,
}

impl MauStage {
    /// Create a stage in its power-on state.
    pub fn new(index: usize, containers: usize, sram_entries: usize, action_sets: usize) -> Self {
        Self {
            index,
            containers,
            control: StageControl::default(),
            key_select: 0,
            key_mask: u32::MAX,
            miss_action: 0,
            action_sets: (0..action_sets).map(|_| ActionSet::new(containers)).collect(),
            sram: vec![[0; 2]; sram_entries],
            stats: StageStats::default(),
        }
    }

    /// Stage index in the pipeline.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Return to power-on state.
    pub fn reset(&mut self) {
        *self = Self::new(self.index, self.containers, self.sram.len(), self.action_sets.len());
    }

    /// Decoded control register.
    pub fn control(&self) -> StageControl {
        self.control
    }

    /// Counters since the last reset.
    pub fn stats(&self) -> StageStats {
        self.stats
    }

    fn unmapped(&self, register: Register) -> RegisterError {
        RegisterError::Unmapped(RegisterAddress::new(self.index, register).encode() as u64)
    }

    fn check_slot(&self, register: Register, set: usize, container: usize) -> Result<(), RegisterError> {
        if set >= self.action_sets.len() || container >= self.containers {
            return Err(self.unmapped(register));
        }
        Ok(())
    }

    /// Write a register.
    pub fn write_register(&mut self, register: Register, value: u32) -> Result<(), RegisterError> {
        match register {
            Register::StageControl => {
                self.control = StageControl::from_word(value);
            }
            Register::MatchKeySelect => {
                let container = (value & sc::KEY_CONTAINER_MASK) as usize;
                if value & sc::KEY_ENABLE != 0 && container >= self.containers {
                    return Err(RegisterError::InvalidValue {
                        register: register.name(),
                        value,
                        reason: format!("key container {} out of range", container),
                    });
                }
                self.key_select = value;
            }
            Register::MatchKeyMask => {
                self.key_mask = value;
            }
            Register::MissAction => {
                let set = (value & sc::MISS_SET_MASK) as usize;
                if value & sc::MISS_ENABLE != 0 && set >= self.action_sets.len() {
                    return Err(RegisterError::InvalidValue {
                        register: register.name(),
                        value,
                        reason: format!("action set {} out of range", set),
                    });
                }
                self.miss_action = value;
            }
            Register::ActionInstruction { set, container } => {
                self.check_slot(register, set, container)?;
                let instr = ActionInstruction::decode(value, self.containers)?;
                self.action_sets[set].set_instruction(container, instr);
            }
            Register::ActionOperand { set, container } => {
                self.check_slot(register, set, container)?;
                self.action_sets[set].operands[container] = value;
            }
        }
        Ok(())
    }

    /// Read a register back.
    pub fn read_register(&self, register: Register) -> Result<u32, RegisterError> {
        Ok(match register {
            Register::StageControl => self.control.to_word(),
            Register::MatchKeySelect => self.key_select,
            Register::MatchKeyMask => self.key_mask,
            Register::MissAction => self.miss_action,
            Register::ActionInstruction { set, container } => {
                self.check_slot(register, set, container)?;
                self.action_sets[set].instructions[container].encode()
            }
            Register::ActionOperand { set, container } => {
                self.check_slot(register, set, container)?;
                self.action_sets[set].operands[container]
            }
        })
    }

    /// Write one exact-match SRAM line.
    pub fn write_entry(&mut self, entry: usize, data0: u64, data1: u64) -> Result<(), RegisterError> {
        let line = self
            .sram
            .get_mut(entry)
            .ok_or(RegisterError::Unmapped(IndirectAddress::exact_match(self.index, entry).encode()))?;
        *line = [data0, data1];
        Ok(())
    }

    /// Read one exact-match SRAM line.
    pub fn read_entry(&self, entry: usize) -> Result<(u64, u64), RegisterError> {
        self.sram
            .get(entry)
            .map(|line| (line[0], line[1]))
            .ok_or(RegisterError::Unmapped(IndirectAddress::exact_match(self.index, entry).encode()))
    }

    /// True if this stage acts on `phv`.
    pub fn accepts(&self, phv: &Phv) -> bool {
        let version = phv.version();
        if !version.valid || !self.control.enabled_for(phv.direction()) {
            return false;
        }
        !self.control.version_check || version.version == self.control.version
    }

    /// Select the action set for `phv`: SRAM hit, else the miss action.
    fn lookup(&mut self, phv: &Phv) -> Result<Option<usize>, PhvError> {
        if self.key_select & sc::KEY_ENABLE != 0 {
            let container = (self.key_select & sc::KEY_CONTAINER_MASK) as usize;
            let key = phv.try_get(container)? & self.key_mask;
            let mask = self.key_mask;
            let hit = self
                .sram
                .iter()
                .map(|line| ExactMatchEntry::from_data(line[0]))
                .enumerate()
                .find(|(_, e)| e.valid && (e.key & mask) == key && e.action_set < self.action_sets.len());

            if let Some((entry, e)) = hit {
                self.stats.hits += 1;
                log::debug!("stage {}: key 0x{:08X} hit entry {} -> set {}", self.index, key, entry, e.action_set);
                return Ok(Some(e.action_set));
            }
            self.stats.misses += 1;
            log::debug!("stage {}: key 0x{:08X} missed", self.index, key);
        }

        if self.miss_action & sc::MISS_ENABLE != 0 {
            Ok(Some((self.miss_action & sc::MISS_SET_MASK) as usize))
        } else {
            Ok(None)
        }
    }

    /// Run `phv` through this stage in place.
    pub fn process(&mut self, phv: &mut Phv) -> Result<(), PhvError> {
        if !self.accepts(phv) {
            self.stats.skipped += 1;
            log::trace!("stage {}: gated off for {} PHV {:?}", self.index, phv.direction(), phv.version());
            return Ok(());
        }
        self.stats.processed += 1;

        let Some(set) = self.lookup(phv)? else {
            return Ok(());
        };

        // Every slot reads the PHV as it entered the stage
        let action_set = &self.action_sets[set];
        let mut results: SmallVec<[(usize, u32); 8]> = SmallVec::new();
        for &container in &action_set.active {
            let instr = action_set.instructions[container];
            let a = if instr.op.uses_a() { phv.try_get(instr.src_a)? } else { 0 };
            let b = if instr.op.uses_b() { phv.try_get(instr.src_b)? } else { 0 };
            if let Some(value) = instr.execute(a, b, action_set.operands[container]) {
                results.push((container, value));
            }
        }

        log::debug!("stage {}: set {} wrote {} containers", self.index, set, results.len());
        for (container, value) in results {
            phv.try_set(container, value)?;
        }
        Ok(())
    }
}
