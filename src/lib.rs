//! mau-model library
//!
//! Software model of a switch match-action pipeline: the packet header
//! vector (PHV), MAU stages configured through a register map, and the
//! ports PHVs enter through.

pub mod config;
pub mod device;
pub mod parser;
pub mod phv;
pub mod testing;
