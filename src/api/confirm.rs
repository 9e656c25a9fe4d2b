//! Purpose: Blocking yes/no confirmation collaborator used before delete.
//! Exports: `Confirmation`, `TerminalConfirmation`, `AlwaysAffirm`.
//! Role: Caller-level gate; the orchestrator proceeds only on affirmative.

use std::io::{self, BufRead, IsTerminal, Write};

use crate::core::error::{Error, ErrorKind};

pub trait Confirmation {
    fn confirm(&self, prompt: &str) -> Result<bool, Error>;
}

/// Prompts on stderr and reads one line from stdin; `y`/`yes` affirms.
/// Non-interactive stdin declines, so scripted runs must pass an explicit
/// affirmation flag instead of hanging.
pub struct TerminalConfirmation;

impl Confirmation for TerminalConfirmation {
    fn confirm(&self, prompt: &str) -> Result<bool, Error> {
        if !io::stdin().is_terminal() {
            return Ok(false);
        }
        eprint!("{prompt} [y/N] ");
        io::stderr().flush().ok();
        let mut line = String::new();
        io::stdin().lock().read_line(&mut line).map_err(|err| {
            Error::new(ErrorKind::Io)
                .with_message("failed to read confirmation input")
                .with_source(err)
        })?;
        let answer = line.trim().to_ascii_lowercase();
        Ok(answer == "y" || answer == "yes")
    }
}

/// Unconditional yes, for `--yes` flags and tests.
pub struct AlwaysAffirm;

impl Confirmation for AlwaysAffirm {
    fn confirm(&self, _prompt: &str) -> Result<bool, Error> {
        Ok(true)
    }
}
