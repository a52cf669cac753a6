//! mau-model: software model of a switch match-action pipeline

use std::collections::HashMap;
use std::env;
use std::path::Path;

use anyhow::bail;
use mau_model::config::Config;
use mau_model::device::registers::format_address;
use mau_model::device::{IndirectAddress, RegisterAddress, RegisterBlock};
use mau_model::parser::{ConfigScript, ScriptCommand};
use mau_model::testing::{GoldenManifest, ModelHarness};

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let args: Vec<String> = env::args().collect();
    match (args.get(1).map(String::as_str), args.get(2)) {
        (Some("run"), Some(path)) => run_manifest(Path::new(path)),
        (Some("decode"), Some(path)) => decode_script(Path::new(path)),
        (Some("sample-config"), _) => {
            print!("{}", Config::sample_config());
            Ok(())
        }
        _ => {
            eprintln!("Usage:");
            eprintln!("  {} run <manifest.toml>    run a golden test", args[0]);
            eprintln!("  {} decode <script.cfg>    analyze a configuration script", args[0]);
            eprintln!("  {} sample-config          print a sample config file", args[0]);
            std::process::exit(2);
        }
    }
}

/// Run a golden manifest and print the comparison
fn run_manifest(path: &Path) -> anyhow::Result<()> {
    let manifest = GoldenManifest::from_file(path)?;
    let mut harness = ModelHarness::from_model(Config::get().build_model());

    println!("Test: {}", manifest.test.name);
    if !manifest.test.description.is_empty() {
        println!("  {}", manifest.test.description);
    }
    println!("Config: {}", manifest.config_path().display());
    println!();

    let result = manifest.run_with(&mut harness)?;
    harness.model().print_summary();
    println!();

    for &(index, expected) in &manifest.expected.values {
        match result.mismatches.iter().find(|m| m.index == index) {
            Some(m) => println!("  c{:<3} expected 0x{:08X} got 0x{:08X}  MISMATCH", index, expected, m.actual),
            None => println!("  c{:<3} 0x{:08X}  ok", index, expected),
        }
    }
    println!();

    if result.passed {
        println!("PASS: {}/{} containers match", result.checked, result.checked);
        Ok(())
    } else {
        bail!(
            "FAIL: {} of {} containers differ",
            result.mismatches.len(),
            result.checked
        )
    }
}

/// Print register usage analysis for a configuration script
fn decode_script(path: &Path) -> anyhow::Result<()> {
    let script = ConfigScript::from_file(path)?;
    let summary = script.summary();
    println!("Configuration script: {}", path.display());
    println!(
        "  {} commands: {} resets, {} writes, {} indirect writes",
        script.len(),
        summary.resets,
        summary.writes,
        summary.indirect_writes
    );

    let mut stage_counts: HashMap<usize, usize> = HashMap::new();
    let mut block_counts: HashMap<RegisterBlock, usize> = HashMap::new();
    let mut register_hits: HashMap<&'static str, usize> = HashMap::new();
    let mut sram_counts: HashMap<usize, usize> = HashMap::new();
    let mut undecodable = 0;

    for cmd in script.commands() {
        match cmd.command {
            ScriptCommand::Reset => {}
            ScriptCommand::Write { address, .. } => match RegisterAddress::decode(address) {
                Ok(decoded) => {
                    *stage_counts.entry(decoded.stage).or_insert(0) += 1;
                    *block_counts.entry(decoded.register.block()).or_insert(0) += 1;
                    *register_hits.entry(decoded.register.name()).or_insert(0) += 1;
                }
                Err(_) => undecodable += 1,
            },
            ScriptCommand::IndirectWrite { address, .. } => match IndirectAddress::decode(address) {
                Ok(decoded) => *sram_counts.entry(decoded.stage).or_insert(0) += 1,
                Err(_) => undecodable += 1,
            },
        }
    }

    println!();
    println!("Register Analysis");
    println!("=================");

    let mut stages: Vec<_> = stage_counts.iter().collect();
    stages.sort_by_key(|(stage, _)| **stage);
    print!("Stages written: ");
    for (stage, count) in &stages {
        print!("{}:{} ", stage, count);
    }
    println!();

    println!();
    println!("By block:");
    let mut blocks: Vec<_> = block_counts.iter().collect();
    blocks.sort_by_key(|(_, count)| std::cmp::Reverse(**count));
    for (block, count) in blocks {
        println!("  {:12} {:4} writes", format!("{}", block), count);
    }

    if !register_hits.is_empty() {
        println!();
        println!("Top registers:");
        let mut regs: Vec<_> = register_hits.iter().collect();
        regs.sort_by_key(|(_, count)| std::cmp::Reverse(**count));
        for (name, count) in regs.iter().take(10) {
            println!("  {:30} {:4}", name, count);
        }
    }

    if !sram_counts.is_empty() {
        println!();
        println!("Exact-match SRAM lines:");
        let mut sram: Vec<_> = sram_counts.iter().collect();
        sram.sort_by_key(|(stage, _)| **stage);
        for (stage, count) in sram {
            println!("  stage {:2} {:4} entries", stage, count);
        }
    }

    if undecodable > 0 {
        println!();
        println!("Warning: {} writes to unmapped addresses", undecodable);
    }

    println!();
    println!("First 15 commands:");
    for (i, cmd) in script.commands().iter().take(15).enumerate() {
        match cmd.command {
            ScriptCommand::Write { address, value } => {
                println!("  [{:2}] WRITE    {} = 0x{:08X}", i, format_address(address), value)
            }
            other => println!("  [{:2}] {}", i, other),
        }
    }

    Ok(())
}
