// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Confirmation prompts.

use inquire::{Confirm, InquireError, Text};
use tracing::debug;

/// Ask user to type `YES` before something destructive happens.
///
/// Anything other than exactly `YES` declines. Cancelling or interrupting
/// the prompt declines as well.
///
/// # Errors
///
/// - Return [`PromptError`] if the terminal cannot be prompted at all.
pub fn confirm_destructive(question: &str) -> Result<bool> {
    let answer = Text::new(format!("{question} Type 'YES' to confirm:").as_str()).prompt();
    match answer {
        Ok(answer) => Ok(answer.trim() == "YES"),
        Err(error) => declined(error),
    }
}

/// Ask user a yes or no question that defaults to no.
///
/// # Errors
///
/// - Return [`PromptError`] if the terminal cannot be prompted at all.
pub fn confirm_optional(question: &str) -> Result<bool> {
    match Confirm::new(question).with_default(false).prompt() {
        Ok(answer) => Ok(answer),
        Err(error) => declined(error),
    }
}

fn declined(error: InquireError) -> Result<bool> {
    match error {
        InquireError::OperationCanceled | InquireError::OperationInterrupted => {
            debug!("prompt cancelled: {error}");
            Ok(false)
        }
        error => Err(PromptError(error)),
    }
}

/// Terminal could not be prompted.
#[derive(Debug, thiserror::Error)]
#[error("cannot prompt for confirmation")]
pub struct PromptError(#[source] pub InquireError);

/// Friendly result alias :3
pub type Result<T, E = PromptError> = std::result::Result<T, E>;
