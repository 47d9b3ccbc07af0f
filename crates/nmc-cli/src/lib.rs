#![doc = include_str!("../README.md")]

use std::io::IsTerminal;

mod color;

pub use color::{Color, install_color_eyre};
use inquire::{InquireError, Password, PasswordDisplayMode, error::InquireResult};

/// Prompt the user for a secret if the value is None
///
/// Fails instead of prompting when stdin is not a terminal, so scripted runs do not hang.
pub fn password_prompt_when_none(prompt: &str, val: Option<String>) -> InquireResult<String> {
    if let Some(val) = val {
        return Ok(val);
    }
    if !std::io::stdin().is_terminal() {
        return Err(InquireError::NotTTY);
    }

    Password::new(prompt)
        .with_display_mode(PasswordDisplayMode::Hidden)
        .without_confirmation()
        .prompt()
}
