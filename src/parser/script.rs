//! Register configuration scripts.
//!
//! A script is a line-oriented capture of the register traffic a control
//! plane sends to the chip:
//!
//! ```text
//! # stage 0: ingress enable, miss action set 0
//! reset
//! write    0x0000_0000 0x1
//! write    0x0000_000C 0x100
//! indirect 0x00_0000_0003 0x1_0000_0042 0   # SRAM entry 3
//! ```
//!
//! Numbers are `0x` hex or decimal; `_` separators are allowed. Anything
//! after `#` is ignored.
//!
//! # Example
//!
//! ```
//! use mau_model::parser::ConfigScript;
//!
//! let script = ConfigScript::parse("reset\nwrite 0x0 1\n")?;
//! assert_eq!(script.len(), 2);
//! assert_eq!(script.summary().writes, 1);
//! # Ok::<(), anyhow::Error>(())
//! ```

use std::fmt;
use std::path::Path;

use anyhow::{anyhow, bail, Context, Result};

/// One configuration command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScriptCommand {
    /// Return the model to power-on state
    Reset,
    /// Direct 32-bit register write
    Write { address: u32, value: u32 },
    /// Indirect write of one 128-bit memory line
    IndirectWrite { address: u64, data0: u64, data1: u64 },
}

impl fmt::Display for ScriptCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScriptCommand::Reset => write!(f, "reset"),
            ScriptCommand::Write { address, value } => write!(f, "write 0x{:08X} 0x{:08X}", address, value),
            ScriptCommand::IndirectWrite { address, data0, data1 } => {
                write!(f, "indirect 0x{:010X} 0x{:016X} 0x{:016X}", address, data0, data1)
            }
        }
    }
}

/// A command with the (1-based) line it came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScriptLine {
    pub line: usize,
    pub command: ScriptCommand,
}

/// Command counts.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ScriptSummary {
    pub resets: usize,
    pub writes: usize,
    pub indirect_writes: usize,
}

/// A parsed configuration script.
#[derive(Debug, Clone, Default)]
pub struct ConfigScript {
    commands: Vec<ScriptLine>,
}

impl ConfigScript {
    /// Parse script text.
    pub fn parse(text: &str) -> Result<Self> {
        let mut commands = Vec::new();
        for (i, raw) in text.lines().enumerate() {
            let line = i + 1;
            let content = raw.split('#').next().unwrap_or("").trim();
            if content.is_empty() {
                continue;
            }
            let command = parse_command(content).with_context(|| format!("line {}: {:?}", line, raw.trim()))?;
            commands.push(ScriptLine { line, command });
        }
        log::debug!("Parsed configuration script: {} commands", commands.len());
        Ok(Self { commands })
    }

    /// Load and parse a script file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read configuration script {}", path.display()))?;
        Self::parse(&text).with_context(|| format!("Failed to parse {}", path.display()))
    }

    /// Commands in file order.
    pub fn commands(&self) -> &[ScriptLine] {
        &self.commands
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Count commands by kind.
    pub fn summary(&self) -> ScriptSummary {
        let mut summary = ScriptSummary::default();
        for cmd in &self.commands {
            match cmd.command {
                ScriptCommand::Reset => summary.resets += 1,
                ScriptCommand::Write { .. } => summary.writes += 1,
                ScriptCommand::IndirectWrite { .. } => summary.indirect_writes += 1,
            }
        }
        summary
    }
}

fn parse_command(content: &str) -> Result<ScriptCommand> {
    let mut tokens = content.split_whitespace();
    let keyword = tokens.next().ok_or_else(|| anyhow!("empty command"))?;
    let args: Vec<&str> = tokens.collect();

    let expect_args = |n: usize| -> Result<()> {
        if args.len() != n {
            bail!("'{}' takes {} arguments, found {}", keyword, n, args.len());
        }
        Ok(())
    };

    match keyword.to_ascii_lowercase().as_str() {
        "reset" => {
            expect_args(0)?;
            Ok(ScriptCommand::Reset)
        }
        "write" => {
            expect_args(2)?;
            let address = u32::try_from(parse_number(args[0])?)
                .map_err(|_| anyhow!("address {} does not fit in 32 bits", args[0]))?;
            let value = u32::try_from(parse_number(args[1])?)
                .map_err(|_| anyhow!("value {} does not fit in 32 bits", args[1]))?;
            Ok(ScriptCommand::Write { address, value })
        }
        "indirect" => {
            expect_args(3)?;
            Ok(ScriptCommand::IndirectWrite {
                address: parse_number(args[0])?,
                data0: parse_number(args[1])?,
                data1: parse_number(args[2])?,
            })
        }
        other => bail!("unknown command '{}'", other),
    }
}

fn parse_number(token: &str) -> Result<u64> {
    let cleaned = token.replace('_', "");
    let parsed = match cleaned.strip_prefix("0x").or_else(|| cleaned.strip_prefix("0X")) {
        Some(hex) => u64::from_str_radix(hex, 16),
        None => cleaned.parse::<u64>(),
    };
    parsed.with_context(|| format!("invalid number '{}'", token))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_commands() {
        let script = ConfigScript::parse(
            "# header\n\
             reset\n\
             \n\
             write 0x0000_000C 256   # miss action\n\
             INDIRECT 0x3 0x1_0000_0042 0\n",
        )
        .unwrap();

        assert_eq!(script.len(), 3);
        assert_eq!(script.commands()[0], ScriptLine { line: 2, command: ScriptCommand::Reset });
        assert_eq!(
            script.commands()[1],
            ScriptLine { line: 4, command: ScriptCommand::Write { address: 0xC, value: 0x100 } }
        );
        assert_eq!(
            script.commands()[2].command,
            ScriptCommand::IndirectWrite { address: 3, data0: 0x1_0000_0042, data1: 0 }
        );
        assert_eq!(script.summary(), ScriptSummary { resets: 1, writes: 1, indirect_writes: 1 });
    }

    #[test]
    fn test_empty_script() {
        let script = ConfigScript::parse("# nothing\n\n   \n").unwrap();
        assert!(script.is_empty());
    }

    #[test]
    fn test_errors_name_the_line() {
        let err = ConfigScript::parse("reset\nwrite 0x10\n").unwrap_err();
        let msg = format!("{:#}", err);
        assert!(msg.contains("line 2"), "{}", msg);
        assert!(msg.contains("takes 2 arguments"), "{}", msg);

        let err = ConfigScript::parse("frobnicate 1\n").unwrap_err();
        assert!(format!("{:#}", err).contains("unknown command"));

        let err = ConfigScript::parse("write 0xZZ 1\n").unwrap_err();
        assert!(format!("{:#}", err).contains("invalid number"));
    }

    #[test]
    fn test_write_value_must_fit() {
        let err = ConfigScript::parse("write 0 0x1_0000_0000\n").unwrap_err();
        assert!(format!("{:#}", err).contains("32 bits"));
    }

    #[test]
    fn test_display_reparses() {
        let original = ScriptCommand::IndirectWrite { address: 0x8_0000_0001, data0: 7, data1: 9 };
        let script = ConfigScript::parse(&original.to_string()).unwrap();
        assert_eq!(script.commands()[0].command, original);
    }
}
