//! Which command lines the proxy is willing to run.

use std::collections::BTreeSet;

use thiserror::Error;

/// Shell syntax that would let a whitelisted program start another one.
const CONTROL_OPERATORS: &[&str] = &[";", "&", "|", "`", "$(", ">", "<", "\n", "\r"];

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PolicyViolation {
    #[error("command not allowed: {0}")]
    NotWhitelisted(String),

    #[error("shell control operators are not allowed")]
    ControlOperator,
}

#[derive(Debug, Clone)]
pub struct CommandPolicy {
    allowed: BTreeSet<String>,
}

impl CommandPolicy {
    pub fn new(allowed: BTreeSet<String>) -> Self {
        Self { allowed }
    }

    /// Accept `line` only if its first word is whitelisted and nothing in it
    /// could chain, substitute or redirect.
    pub fn check(&self, line: &str) -> Result<(), PolicyViolation> {
        let program = line.split_whitespace().next().unwrap_or_default();
        if !self.allowed.contains(program) {
            return Err(PolicyViolation::NotWhitelisted(program.to_owned()));
        }
        if CONTROL_OPERATORS.iter().any(|op| line.contains(op)) {
            return Err(PolicyViolation::ControlOperator);
        }
        Ok(())
    }
}
