use super::context::AppContext;
use super::sync_ui::SyncProgress;
use crate::output::Output;
use color_eyre::Result;
use episode_sync_core::{SyncError, SyncReport, SyncStatus};
use serde_json::json;

pub async fn run_push_all(output: &Output) -> Result<()> {
    tracing::debug!("push-all command started");

    let context = AppContext::load()?;
    let engine = context.engine()?;
    let progress = SyncProgress::new(output.is_human());

    let result = engine.push_all(&progress).await;
    finish("push-all", result, output)
}

pub async fn run_push_recent(output: &Output) -> Result<()> {
    tracing::debug!("push-recent command started");

    let context = AppContext::load()?;
    let engine = context.engine()?;

    let result = engine.push_recent().await;
    finish("push-recent", result, output)
}

pub async fn run_pull(output: &Output) -> Result<()> {
    tracing::debug!("pull command started");

    let context = AppContext::load()?;
    let engine = context.engine()?;

    let result = engine.reconcile().await;
    finish("pull", result, output)
}

/// Report the terminal notification for an operation. Fatal conditions become an error.
fn finish(operation: &str, result: Result<SyncReport, SyncError>, output: &Output) -> Result<()> {
    let report = match result {
        Ok(report) => report,
        Err(SyncError::NotAuthorized) => {
            output.error("Not authorized on TVmaze. Run `mazesync authorize` first.");
            return Err(SyncError::NotAuthorized.into());
        }
        Err(SyncError::EmptyLibrary) => {
            output.warn("Kodi library has no TV shows, nothing to sync");
            return Ok(());
        }
        Err(e) => {
            output.error(format!("{} failed: {}", operation, e));
            return Err(e.into());
        }
    };

    if output.is_human() {
        print_summary(operation, &report, output);
    } else {
        output.json(&report_json(operation, &report));
    }

    Ok(())
}

fn print_summary(operation: &str, report: &SyncReport, output: &Output) {
    let seconds = report.duration.as_secs_f64();
    match report.status() {
        SyncStatus::Completed => output.success(format!("{} completed in {:.1}s", operation, seconds)),
        SyncStatus::CompletedWithErrors => {
            output.warn(format!("{} completed with errors in {:.1}s", operation, seconds))
        }
    }

    if report.shows_total > 0 {
        output.info(format!(
            "  Shows: {} pushed, {} skipped of {}",
            report.shows_pushed, report.shows_skipped, report.shows_total
        ));
    }
    if report.episodes_sent > 0 {
        output.info(format!("  Episodes sent: {}", report.episodes_sent));
    }
    output.info(format!("  Episodes marked watched in Kodi: {}", report.episodes_pulled));

    for error in &report.errors {
        output.error(format!("  {}", error));
    }
    for warning in &report.warnings {
        output.warn(format!("  {}", warning));
    }
}

fn report_json(operation: &str, report: &SyncReport) -> serde_json::Value {
    json!({
        "success": !report.has_errors(),
        "operation": operation,
        "status": match report.status() {
            SyncStatus::Completed => "completed",
            SyncStatus::CompletedWithErrors => "completed_with_errors",
        },
        "shows_total": report.shows_total,
        "shows_pushed": report.shows_pushed,
        "shows_skipped": report.shows_skipped,
        "episodes_sent": report.episodes_sent,
        "episodes_pulled": report.episodes_pulled,
        "errors": report.errors,
        "warnings": report.warnings,
        "duration_ms": report.duration.as_millis() as u64,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_report_json_with_errors() {
        let report = SyncReport {
            shows_total: 3,
            shows_pushed: 2,
            shows_skipped: 1,
            episodes_sent: 12,
            errors: vec!["Lost: status: 500, message: boom".to_string()],
            duration: Duration::from_millis(1500),
            ..Default::default()
        };

        let value = report_json("push-all", &report);
        assert_eq!(value["success"], false);
        assert_eq!(value["status"], "completed_with_errors");
        assert_eq!(value["episodes_sent"], 12);
        assert_eq!(value["duration_ms"], 1500);
        assert_eq!(value["errors"][0], "Lost: status: 500, message: boom");
    }

    #[test]
    fn test_report_json_completed() {
        let report = SyncReport {
            episodes_pulled: 4,
            ..Default::default()
        };

        let value = report_json("pull", &report);
        assert_eq!(value["success"], true);
        assert_eq!(value["status"], "completed");
        assert_eq!(value["episodes_pulled"], 4);
    }
}
