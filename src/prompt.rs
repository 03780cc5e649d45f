//! Interactive operator prompts
//!
//! Orchestration code asks the operator through this trait so it can run
//! headless in tests.

use crate::error::{Error, Result};
use dialoguer::{Confirm, Select};

/// Operator interaction capability
pub trait Prompt: Send + Sync {
    /// Ask a yes/no question
    fn confirm(&self, message: &str, default: bool) -> Result<bool>;

    /// Ask the operator to pick one of `items`, returning its index
    fn select(&self, message: &str, items: &[String]) -> Result<usize>;
}

/// Terminal prompts via dialoguer
#[derive(Debug, Default, Clone, Copy)]
pub struct TerminalPrompt;

impl Prompt for TerminalPrompt {
    fn confirm(&self, message: &str, default: bool) -> Result<bool> {
        Confirm::new()
            .with_prompt(message)
            .default(default)
            .interact()
            .map_err(|e| Error::Internal(format!("Failed to read confirmation: {e}")))
    }

    fn select(&self, message: &str, items: &[String]) -> Result<usize> {
        if items.is_empty() {
            return Err(Error::Internal(format!("No choices available for: {message}")));
        }
        Select::new()
            .with_prompt(message)
            .items(items)
            .default(0)
            .interact()
            .map_err(|e| Error::Internal(format!("Failed to read selection: {e}")))
    }
}

/// Ask for confirmation, turning a decline into [`Error::UserAborted`]
pub fn confirm_or_abort(prompt: &dyn Prompt, message: &str) -> Result<()> {
    if prompt.confirm(message, true)? {
        Ok(())
    } else {
        Err(Error::UserAborted)
    }
}
