use anyhow::Result;

use crate::config::RunConfig;
use crate::job::{run_job, RunSummary};
use crate::matrix::http::HttpSheetBackend;
use crate::matrix::MatrixStore;
use crate::report::chart::SvgChartRenderer;
use crate::report::mail::HttpMailer;
use crate::reset::ResetOutcome;
use crate::source::http::HttpRecordSource;
use crate::utils::clock::{Clock, DefaultClock};
use crate::utils::dir::create_application_default_path;
use crate::utils::time::weekday_name;

/// Wires the real collaborators together and runs the full daily report once.
pub async fn process_run_command(config: RunConfig) -> Result<()> {
    let clock = DefaultClock;
    let asof = clock.time().with_timezone(&*config.source.utc_offset);

    let dir = config
        .dir
        .clone()
        .map_or_else(create_application_default_path, Ok)?;

    let source = HttpRecordSource::new(
        &config.source.tracker_api_url,
        &config.source.tracker_token,
        &config.source.time_block_db,
    )?;
    let matrix = MatrixStore::new(HttpSheetBackend::new(
        &config.sheet_api_url,
        &config.sheet_token,
        &config.spreadsheet_id,
    )?);
    let renderer = SvgChartRenderer::new(dir);
    let mailer = HttpMailer::new(
        &config.mail_api_url,
        &config.mail_token,
        &config.sender_email,
        &config.receiver_email,
    )?;

    let summary = run_job(
        asof,
        &config.daily_sheet,
        &source,
        &matrix,
        &renderer,
        &mailer,
        &clock,
    )
    .await?;

    print_summary(&summary);
    Ok(())
}

fn print_summary(summary: &RunSummary) {
    println!(
        "Synced {} ({}): {} categories, {:.1} hrs utilized",
        summary.data_date,
        weekday_name(chrono::Datelike::weekday(&summary.data_date)),
        summary.tally.len(),
        summary.tally.utilized_hours(),
    );
    if !summary.report_sent {
        println!("Report delivery failed, matrix row is saved. See logs for details");
    }
    match summary.reset {
        ResetOutcome::Performed { new_week_start } => {
            println!("Weekly reset performed, new week starts {new_week_start}");
        }
        ResetOutcome::Skipped { next_reset_on } => {
            println!("No reset today, next reset on {next_reset_on}");
        }
    }
}
