//! MAU pipeline model and register definitions.
//!
//! This module provides:
//! - Chip configuration (stage count, PHV layout, table sizes)
//! - The direct and indirect register address maps
//! - Per-stage state: control, match key, exact-match SRAM, action sets
//! - The chip model that owns every stage and the PHV pool
//! - Ports, which take PHVs through the pipeline
//!
//! # Pipeline Overview
//!
//! ```text
//!           +---------+   +---------+         +----------+
//!  Port ──► | Stage 0 |──►| Stage 1 |──► ... ─►| Stage 11 |──► out
//!           +---------+   +---------+         +----------+
//!            gate: direction enable, version valid/check
//!            match: key container & mask vs. exact-match SRAM
//!            action: VLIW slots, one per destination container
//! ```
//!
//! # Example
//!
//! ```
//! use mau_model::device::{ChipModel, Port, Register, RegisterAddress};
//!
//! let mut model = ChipModel::tofino_like();
//! let control = RegisterAddress::new(0, Register::StageControl).encode();
//! model.out_word(control, 0x1).unwrap();
//!
//! let mut phv = model.alloc_phv().unwrap();
//! phv.set_ingress();
//! let mut port = Port::new(0);
//! let result = port.process_inbound(&mut model, phv).unwrap();
//! assert_eq!(result.output().get(0), 0);
//! ```

pub mod action;
pub mod chip_config;
pub mod port;
pub mod registers;
pub mod registers_spec;
pub mod stage;
pub mod state;

pub use action::{ActionInstruction, AluOp};
pub use chip_config::{ChipConfig, CustomConfig, TofinoLikeConfig};
pub use port::{Port, PortStats, ProcessedPhv};
pub use registers::{
    IndirectAddress, IndirectMemory, Register, RegisterAddress, RegisterBlock, RegisterError, RegisterInfo,
};
pub use stage::{ExactMatchEntry, MauStage, StageControl, StageStats};
pub use state::{ChipModel, WriteStats};
