use super::context::AppContext;
use super::prompts::{prompt_email, prompt_yes_no_with_output};
use super::sync_ui::is_interactive;
use crate::output::Output;
use color_eyre::eyre::eyre;
use color_eyre::Result;
use episode_sync_core::{AuthError, AuthOutcome, AuthorizationFlow, PollEvent};
use indicatif::{ProgressBar, ProgressStyle};
use owo_colors::OwoColorize;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

pub async fn run_authorize(email: Option<String>, yes: bool, output: &Output) -> Result<()> {
    let mut context = AppContext::load()?;

    if let Some(existing) = context.credentials.get_credentials() {
        if !yes {
            let prompt = format!(
                "Already authorized as {}. Authorize a different account?",
                existing.username
            );
            if !prompt_yes_no_with_output(&prompt, Some(false), Some(output))? {
                output.info("Keeping existing authorization");
                return Ok(());
            }
        }
    }

    let email = match email {
        Some(email) => email,
        None => prompt_email("TVmaze account e-mail")?,
    };

    let flow = AuthorizationFlow::new(Arc::new(context.remote()?), context.config.sync.poll_interval());

    let ticket = match flow.start(&email).await {
        Ok(ticket) => ticket,
        Err(AuthError::InvalidEmail(email)) => {
            output.error(format!("Invalid e-mail address: {}", email));
            return Err(eyre!("Invalid e-mail address: {}", email));
        }
        Err(e) => {
            output.error(format!("TVmaze authorization error: {}", e));
            return Err(e.into());
        }
    };

    if output.is_human() {
        output.println("");
        output.println("Open this link in a browser and confirm the authorization:");
        output.println(format!("  {}", ticket.confirm_url.cyan().underline()));
        output.println("TVmaze also sent the link to your e-mail. Press Ctrl-C to stop waiting.");
        output.println("");
    } else {
        output.json(&json!({
            "type": "authorization_started",
            "confirm_url": ticket.confirm_url,
        }));
    }

    let pending = flow.confirm(&ticket);

    let cancel = pending.cancel_token();
    let ctrl_c = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Ctrl-C received, cancelling authorization");
            cancel.cancel();
        }
    });

    let spinner = waiting_spinner(output.is_human() && is_interactive());
    let outcome = pending
        .wait_with(|event| {
            if let PollEvent::Pending { attempt } = event {
                spinner.set_message(format!("Waiting for confirmation (check {})", attempt));
            }
        })
        .await;
    spinner.finish_and_clear();
    ctrl_c.abort();

    match outcome {
        AuthOutcome::Confirmed(credentials) => {
            context.credentials.set_credentials(&credentials);
            context.credentials.save().map_err(|e| {
                eyre!(
                    "Failed to save credentials to {}: {}",
                    context.paths.credentials_file().display(),
                    e
                )
            })?;
            if output.is_human() {
                output.success(format!("Authorized as {}", credentials.username));
            } else {
                output.json(&json!({
                    "success": true,
                    "username": credentials.username,
                }));
            }
            Ok(())
        }
        AuthOutcome::Failed(message) => {
            output.error(format!("Authorization failed: {}", message));
            Err(eyre!("Authorization failed: {}", message))
        }
        AuthOutcome::Cancelled => {
            output.warn("Authorization cancelled");
            Ok(())
        }
    }
}

fn waiting_spinner(visible: bool) -> ProgressBar {
    if !visible {
        return ProgressBar::hidden();
    }

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏"),
    );
    spinner.set_message("Waiting for confirmation");
    spinner.enable_steady_tick(Duration::from_millis(120));
    spinner
}
