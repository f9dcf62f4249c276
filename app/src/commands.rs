//! Subcommand handlers.

use crate::state::AppState;
use anyhow::Result;
use lookout_core::{Platform, ScheduleConfig};
use lookout_scanner::{AggregateResult, RunStatus};
use lookout_scheduler::{next_run_at, CancellationToken, TriggerOutcome};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

/// Exit status of a single `lookout scan`.
pub fn scan_exit_code(outcome: &TriggerOutcome<AggregateResult>) -> u8 {
    match outcome {
        TriggerOutcome::Completed(result) => match result.status() {
            RunStatus::Completed => 0,
            RunStatus::PartiallyFailed => 2,
        },
        TriggerOutcome::Skipped => 3,
    }
}

/// `lookout scan`: one run now.
pub async fn scan(state: &AppState, platforms: &[Platform]) -> Result<ExitCode> {
    let outcome = match state.scheduler.trigger(state.scan_once(platforms)).await {
        TriggerOutcome::Completed(result) => TriggerOutcome::Completed(result?),
        TriggerOutcome::Skipped => TriggerOutcome::Skipped,
    };

    if let TriggerOutcome::Completed(result) = &outcome {
        print_summary(result);
    } else {
        println!("A scan is already running; nothing to do.");
    }

    Ok(ExitCode::from(scan_exit_code(&outcome)))
}

/// Interval between scheduled scans.
pub fn schedule_period(schedule: &ScheduleConfig) -> Duration {
    Duration::from_secs(schedule.interval_minutes.saturating_mul(60))
}

/// `lookout run`: scan every interval until Ctrl-C.
pub async fn daemon(state: Arc<AppState>) -> Result<ExitCode> {
    let period = schedule_period(&state.config.schedule);
    let cancel = CancellationToken::new();

    let signal_cancel = cancel.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("Interrupt received, shutting down"),
            Err(e) => error!(error = %e, "Failed to listen for Ctrl-C"),
        }
        signal_cancel.cancel();
    });

    let job_state = Arc::clone(&state);
    let stats = state
        .scheduler
        .run_every(
            period,
            state.config.schedule.run_on_start,
            cancel,
            move || {
                let state = Arc::clone(&job_state);
                async move {
                    match state.scan_once(&[]).await {
                        Ok(result) => {
                            info!(
                                next_run_at = %next_run_at(period),
                                total_posts = result.total_posts,
                                "Scheduled scan complete"
                            );
                        }
                        Err(e) => error!(error = %format!("{e:#}"), "Scheduled scan failed"),
                    }
                }
            },
        )
        .await;

    state.shutdown().await;
    info!(
        runs_started = stats.runs_started,
        runs_skipped = stats.runs_skipped,
        "Daemon stopped"
    );
    Ok(ExitCode::SUCCESS)
}

/// `lookout platforms`: list loaded definitions.
pub fn platforms(state: &AppState) {
    let definitions = state.registry.get_all();
    if definitions.is_empty() {
        println!("No platform definitions loaded.");
        return;
    }

    for definition in definitions {
        let enabled = state.config.scanning.platforms.contains(&definition.id());
        println!(
            "{:<10} {:<10} sources={:<2} {}",
            definition.id().as_str(),
            definition.name(),
            definition.sources.len(),
            if enabled { "enabled" } else { "disabled" }
        );
    }
}

/// `lookout leads`: print stored leads, newest first.
pub async fn leads(state: &AppState, limit: u32) -> Result<()> {
    let leads = state.database.recent_leads(limit).await?;
    if leads.is_empty() {
        println!("No leads stored yet.");
        return Ok(());
    }

    for lead in leads {
        println!(
            "{}  {:<9} {:<9} {:.2}  {}",
            lead.timestamp.format("%Y-%m-%d %H:%M"),
            lead.platform.as_str(),
            lead.intent_level.as_str(),
            lead.confidence,
            lead.post_link
        );
        if !lead.profile_link.is_empty() {
            println!("    author:   {}", lead.profile_link);
        }
        println!("    post:     {}", truncate(&lead.content, 160));
        println!("    response: {}", truncate(&lead.response, 160));
    }
    Ok(())
}

fn print_summary(result: &AggregateResult) {
    println!(
        "Run {} {} ({} leads)",
        result.run_id,
        result.status().as_str(),
        result.total_posts
    );
    for scan in result.per_platform.values() {
        match &scan.error {
            Some(error) => println!("  {:<9} failed: {}", scan.platform.as_str(), error),
            None => println!(
                "  {:<9} candidates={} leads={}{}",
                scan.platform.as_str(),
                scan.candidates,
                scan.posts_found,
                if scan.rate_limited { " (rate limited)" } else { "" }
            ),
        }
    }
    if result.status() == RunStatus::PartiallyFailed {
        warn!(failed = ?result.failed_platforms(), "Some platforms failed");
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let cut: String = text.chars().take(max_chars).collect();
    format!("{cut}...")
}

#[cfg(test)]
mod tests {
    use super::*;
    use lookout_scanner::ScanResult;
    use std::collections::BTreeMap;

    fn result_with(errors: &[(Platform, Option<&str>)]) -> AggregateResult {
        let mut per_platform = BTreeMap::new();
        for (platform, error) in errors {
            per_platform.insert(
                *platform,
                ScanResult {
                    platform: *platform,
                    candidates: 0,
                    posts_found: 0,
                    rate_limited: false,
                    error: error.map(ToString::to_string),
                },
            );
        }
        let now = chrono::Utc::now();
        AggregateResult {
            run_id: uuid::Uuid::nil(),
            started_at: now,
            finished_at: now,
            total_posts: 0,
            per_platform,
        }
    }

    #[test]
    fn test_exit_codes() {
        let ok = result_with(&[(Platform::Reddit, None)]);
        assert_eq!(scan_exit_code(&TriggerOutcome::Completed(ok)), 0);

        let partial = result_with(&[
            (Platform::Reddit, None),
            (Platform::LinkedIn, Some("verification_required")),
        ]);
        assert_eq!(scan_exit_code(&TriggerOutcome::Completed(partial)), 2);

        assert_eq!(scan_exit_code(&TriggerOutcome::Skipped), 3);
    }

    #[test]
    fn test_schedule_period() {
        let hourly = ScheduleConfig::default();
        assert_eq!(schedule_period(&hourly), Duration::from_secs(3600));

        let huge = ScheduleConfig {
            interval_minutes: u64::MAX,
            run_on_start: false,
        };
        assert_eq!(schedule_period(&huge), Duration::from_secs(u64::MAX));
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("abcdefghij", 4), "abcd...");
    }
}
