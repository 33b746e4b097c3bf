use crate::output::Output;
use color_eyre::Result;
use dialoguer::{Confirm, Input};
use episode_sync_core::auth::is_valid_email;

/// Prompt for yes/no with optional default
pub fn prompt_yes_no_with_output(prompt: &str, default: Option<bool>, output: Option<&Output>) -> Result<bool> {
    let mut confirm_builder = Confirm::new().with_prompt(prompt);

    if let Some(default_value) = default {
        confirm_builder = confirm_builder.default(default_value);
    }

    confirm_builder.interact().map_err(|e| {
        if let Some(out) = output {
            out.error(format!("Failed to read confirmation: {}", e));
        }
        color_eyre::eyre::eyre!("Failed to read confirmation: {}", e)
    })
}

/// Prompt for an e-mail address until it looks valid
pub fn prompt_email(prompt: &str) -> Result<String> {
    Input::<String>::new()
        .with_prompt(prompt)
        .validate_with(|input: &String| -> Result<(), &str> {
            if is_valid_email(input.trim()) {
                Ok(())
            } else {
                Err("Please enter a valid e-mail address")
            }
        })
        .interact_text()
        .map(|email| email.trim().to_string())
        .map_err(|e| color_eyre::eyre::eyre!("Failed to read input: {}", e))
}
