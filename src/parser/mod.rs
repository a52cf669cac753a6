//! Configuration input parsers
//!
//! - [`script`] - register configuration scripts (direct and indirect writes)

pub mod script;

pub use script::{ConfigScript, ScriptCommand, ScriptLine, ScriptSummary};
