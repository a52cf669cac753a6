//! Ports: the PHV ingestion boundary.
//!
//! A port takes ownership of a PHV, runs it through the model's pipeline and
//! hands back a [`ProcessedPhv`]. Whether the result is the same PHV or a
//! freshly allocated one is part of the type, so the caller never has to
//! compare handles to know what it owns.
//!
//! ```text
//!   Phv ──► Port::process_inbound ──► ProcessedPhv::Same(phv)
//!                                     (no stage acts on it)
//!
//!                                 └─► ProcessedPhv::New { input, output }
//!                                     (output allocated from the pool)
//! ```

use super::state::ChipModel;
use crate::phv::{Phv, PhvError};

/// Result of running a PHV through a port.
#[derive(Debug)]
pub enum ProcessedPhv {
    /// No stage acted on the PHV; it is returned untouched.
    Same(Phv),
    /// The pipeline produced a new PHV. The input is handed back as well.
    New {
        /// PHV that entered the port
        input: Phv,
        /// PHV produced by the pipeline
        output: Phv,
    },
}

impl ProcessedPhv {
    /// The PHV leaving the pipeline.
    pub fn output(&self) -> &Phv {
        match self {
            ProcessedPhv::Same(phv) => phv,
            ProcessedPhv::New { output, .. } => output,
        }
    }

    /// Take the output PHV, releasing the input if it was a different one.
    pub fn into_output(self) -> Phv {
        match self {
            ProcessedPhv::Same(phv) => phv,
            ProcessedPhv::New { output, .. } => output,
        }
    }

    /// True if the output is a different PHV from the input.
    pub fn is_new(&self) -> bool {
        matches!(self, ProcessedPhv::New { .. })
    }
}

/// Per-port counters.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PortStats {
    /// PHVs received
    pub received: u64,
    /// PHVs passed through unchanged
    pub passed_through: u64,
    /// PHVs for which the pipeline produced a new PHV
    pub processed: u64,
}

/// A switch port feeding the pipeline.
#[derive(Debug, Clone)]
pub struct Port {
    id: u16,
    stats: PortStats,
}

impl Port {
    /// Create a port.
    pub fn new(id: u16) -> Self {
        Self {
            id,
            stats: PortStats::default(),
        }
    }

    /// Port number.
    pub fn id(&self) -> u16 {
        self.id
    }

    /// Counters.
    pub fn stats(&self) -> PortStats {
        self.stats
    }

    /// Run `phv` through `model`'s pipeline.
    ///
    /// If pool allocation for the output fails, the input PHV is dropped
    /// and `PhvError::PoolExhausted` is returned.
    pub fn process_inbound(&mut self, model: &mut ChipModel, phv: Phv) -> Result<ProcessedPhv, PhvError> {
        self.stats.received += 1;

        if !model.would_process(&phv) {
            self.stats.passed_through += 1;
            log::debug!("port {}: {} PHV passes through", self.id, phv.direction());
            return Ok(ProcessedPhv::Same(phv));
        }

        let mut output = model.pool().allocate_copy(&phv)?;
        model.run_pipeline(&mut output)?;
        self.stats.processed += 1;
        log::debug!("port {}: {} PHV processed", self.id, output.direction());

        Ok(ProcessedPhv::New { input: phv, output })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::action::{ActionInstruction, AluOp};
    use crate::device::chip_config::TofinoLikeConfig;
    use crate::device::registers::{Register, RegisterAddress};
    use std::sync::Arc;

    fn configure_set(model: &mut ChipModel, container: usize, value: u32) {
        let addr = |r| RegisterAddress::new(0, r).encode();
        model.out_word(addr(Register::StageControl), 0x1).unwrap();
        model.out_word(addr(Register::MissAction), 0x100).unwrap();
        model
            .out_word(
                addr(Register::ActionInstruction { set: 0, container }),
                ActionInstruction::new(AluOp::Set, 0, 0).encode(),
            )
            .unwrap();
        model
            .out_word(addr(Register::ActionOperand { set: 0, container }), value)
            .unwrap();
    }

    #[test]
    fn test_unconfigured_pipeline_returns_same_phv() {
        let mut model = ChipModel::tofino_like();
        let mut port = Port::new(0);
        let mut phv = model.alloc_phv().unwrap();
        phv.set_ingress();
        phv.set(5, 99);

        let result = port.process_inbound(&mut model, phv).unwrap();
        assert!(!result.is_new());
        assert_eq!(result.output().get(5), 99);
        assert_eq!(model.pool().live(), 1);
        assert_eq!(port.stats().passed_through, 1);
    }

    #[test]
    fn test_active_pipeline_returns_new_phv() {
        let mut model = ChipModel::tofino_like();
        configure_set(&mut model, 17, 0x2000_0385);
        let mut port = Port::new(3);
        let mut phv = model.alloc_phv().unwrap();
        phv.set_ingress();

        let result = port.process_inbound(&mut model, phv).unwrap();
        assert!(result.is_new());
        assert_eq!(model.pool().live(), 2);
        match &result {
            ProcessedPhv::New { input, output } => {
                assert_eq!(input.get(17), 0);
                assert_eq!(output.get(17), 0x2000_0385);
            }
            ProcessedPhv::Same(_) => unreachable!(),
        }

        // Taking the output releases the input's pool slot
        let output = result.into_output();
        assert_eq!(model.pool().live(), 1);
        drop(output);
        assert_eq!(model.pool().live(), 0);
    }

    #[test]
    fn test_egress_phv_skips_ingress_stage() {
        let mut model = ChipModel::tofino_like();
        configure_set(&mut model, 1, 1);
        let mut port = Port::new(0);
        let phv = model.alloc_phv().unwrap();
        let result = port.process_inbound(&mut model, phv).unwrap();
        assert!(!result.is_new());
    }

    #[test]
    fn test_invalid_version_passes_through() {
        let mut model = ChipModel::tofino_like();
        configure_set(&mut model, 1, 1);
        let mut port = Port::new(0);
        let mut phv = model.alloc_phv().unwrap();
        phv.set_ingress();
        phv.set_version(0, false);
        let result = port.process_inbound(&mut model, phv).unwrap();
        assert!(!result.is_new());
        assert_eq!(result.output().get(1), 0);
    }

    #[test]
    fn test_pool_exhaustion_is_reported() {
        let mut model = ChipModel::with_pool_limit(Arc::new(TofinoLikeConfig), Some(1));
        configure_set(&mut model, 1, 1);
        let mut port = Port::new(0);
        let mut phv = model.alloc_phv().unwrap();
        phv.set_ingress();
        let err = port.process_inbound(&mut model, phv).unwrap_err();
        assert_eq!(err, PhvError::PoolExhausted { limit: 1 });
        assert_eq!(model.pool().live(), 0);
    }
}
