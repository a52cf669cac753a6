//! End-to-end: configure from a script, inject a PHV, compare outputs.

use std::path::PathBuf;
use std::sync::Arc;

use mau_model::device::{ChipModel, Port, ProcessedPhv, TofinoLikeConfig};
use mau_model::parser::ConfigScript;
use mau_model::phv::{Phv, PhvError};
use mau_model::testing::{GoldenManifest, ModelHarness};

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests").join("fixtures").join(name)
}

fn configured_harness(pool_limit: Option<usize>) -> ModelHarness {
    let mut harness = ModelHarness::with_chip(Arc::new(TofinoLikeConfig), pool_limit);
    let script = ConfigScript::from_file(fixture("two_stage.cfg")).unwrap();
    harness.apply_script(&script).unwrap();
    harness
}

fn input_phv(harness: &ModelHarness, version: u8, key: u32) -> Phv {
    let mut phv = harness.alloc_phv().unwrap();
    phv.set_ingress();
    phv.set_version(version, true);
    phv.set(0, 0x1000_0000);
    phv.set(1, 0xFF);
    phv.set(2, 0x1);
    phv.set(64, key);
    phv.set(128, 0x5);
    phv
}

#[test]
fn golden_manifest_passes() {
    let manifest = GoldenManifest::from_file(&fixture("two_stage.toml")).unwrap();
    let result = manifest.run().unwrap();
    assert!(result.passed, "mismatches: {:?}", result.mismatches);
    assert_eq!(result.checked, 7);
}

#[test]
fn script_applies_every_command() {
    let harness = configured_harness(None);
    let stats = harness.model().stats();
    assert_eq!(stats.resets, 1);
    assert_eq!(stats.direct_writes, 19);
    assert_eq!(stats.indirect_writes, 3);
    assert_eq!(stats.rejected, 0);
}

#[test]
fn lookup_miss_runs_miss_action() {
    let mut harness = configured_harness(None);
    let phv = input_phv(&harness, 3, 0x12);
    let out = harness.process(phv).unwrap().into_output();

    assert_eq!(out.get(0), 0xDEAD);
    assert_eq!(out.get(1), 0xFF);
    assert_eq!(out.get(2), 0xDE52);
    assert_eq!(out.get(65), 0x20);
    assert_eq!(out.get(128), 0x5);
}

#[test]
fn version_mismatch_skips_checked_stage() {
    let mut harness = configured_harness(None);
    let phv = input_phv(&harness, 2, 0x11);
    let out = harness.process(phv).unwrap().into_output();

    // Stage 0 gated off; stage 1 still runs
    assert_eq!(out.get(0), 0x1000_0000);
    assert_eq!(out.get(2), 0x1000_00FF);
    assert_eq!(out.get(65), 0x10);
    assert_eq!(harness.model().stage(0).unwrap().stats().skipped, 1);
}

#[test]
fn egress_phv_only_sees_egress_stage() {
    let mut harness = configured_harness(None);
    let mut phv = input_phv(&harness, 3, 0x11);
    phv.set_egress();
    let out = harness.process(phv).unwrap().into_output();

    assert_eq!(out.get(3), 0x1234);
    assert_eq!(out.get(0), 0x1000_0000);
    assert_eq!(out.get(65), 0);
}

#[test]
fn invalid_version_is_returned_unchanged() {
    let mut harness = configured_harness(Some(1));
    let mut phv = input_phv(&harness, 3, 0x11);
    phv.set_version(3, false);

    // Pool is full, but no output PHV is needed
    match harness.process(phv).unwrap() {
        ProcessedPhv::Same(phv) => assert_eq!(phv.get(0), 0x1000_0000),
        ProcessedPhv::New { .. } => panic!("invalid PHV must pass through"),
    }
}

#[test]
fn processing_needs_a_free_pool_slot() {
    let mut harness = configured_harness(Some(2));
    let first = input_phv(&harness, 3, 0x11);
    let kept = harness.process(first).unwrap().into_output();
    assert_eq!(harness.model().pool().live(), 1);

    let second = input_phv(&harness, 3, 0x11);
    assert_eq!(harness.model().pool().live(), 2);
    let err = harness.process(second).unwrap_err();
    assert_eq!(err, PhvError::PoolExhausted { limit: 2 });

    // The rejected input was released
    assert_eq!(harness.model().pool().live(), 1);
    drop(kept);
    assert_eq!(harness.model().pool().live(), 0);
}

#[test]
fn models_are_independent() {
    let mut configured = configured_harness(None);
    let mut blank = ChipModel::new(Arc::new(TofinoLikeConfig));
    let mut port = Port::new(1);

    let phv = input_phv(&configured, 3, 0x11);
    assert!(configured.process(phv).unwrap().is_new());

    let mut phv = blank.alloc_phv().unwrap();
    phv.set_ingress();
    assert!(!port.process_inbound(&mut blank, phv).unwrap().is_new());
}
