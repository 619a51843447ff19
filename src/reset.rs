use std::time::Duration;

use anyhow::Result;
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveTime};
use tracing::{info, warn};

use crate::error::JobError;
use crate::source::{RecordSource, ResetPatch, TimeBlockRecord, WeekWindow};
use crate::utils::clock::Clock;

/// Resets never run before this local time. The previous day's report job needs a window after
/// midnight in which the markers are still intact.
const RESET_CUTOFF_HOUR: u32 = 3;

const PATCH_ATTEMPTS: u32 = 3;
const PATCH_BACKOFF_BASE: Duration = Duration::from_millis(500);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResetOutcome {
    Skipped { next_reset_on: NaiveDate },
    Performed { new_week_start: NaiveDate },
}

/// Clears every per-day marker and advances the shared week start, once the 7-day window has
/// fully elapsed and the wall clock is past the cutoff. The store offers no multi-record
/// transaction, so the clearing loop retries each record with backoff and a reconciliation
/// pass re-reads the store and repairs whatever is still stale.
pub async fn maybe_reset(
    asof: DateTime<FixedOffset>,
    records: &[TimeBlockRecord],
    source: &dyn RecordSource,
    clock: &dyn Clock,
) -> Result<ResetOutcome> {
    let first = records.first().ok_or(JobError::EmptyRecordSet)?;
    let week_start = first
        .week_start
        .ok_or_else(|| JobError::MissingWeekStart(first.id.clone()))?;

    let window = WeekWindow { start: week_start };
    let next_start = window.next_start();
    let cutoff = NaiveTime::from_hms_opt(RESET_CUTOFF_HOUR, 0, 0).expect("cutoff is a valid time");

    if !window.elapsed_by(asof.date_naive()) || asof.time() < cutoff {
        info!("No reset | today={} | reset on={next_start}", asof.date_naive());
        return Ok(ResetOutcome::Skipped {
            next_reset_on: next_start,
        });
    }

    info!("Weekly reset started, advancing week start to {next_start}");
    let patch = ResetPatch {
        week_start: next_start,
    };

    let first_pass_failures = patch_all(records, &patch, source, clock).await;
    if !first_pass_failures.is_empty() {
        warn!(
            "{} records failed to patch, deferring to reconciliation",
            first_pass_failures.len()
        );
    }

    // Reconciliation: trust the store over our own bookkeeping of which patches landed.
    let current = source.fetch_all().await?;
    let stale: Vec<TimeBlockRecord> = current
        .into_iter()
        .filter(|record| !is_reset(record, next_start))
        .collect();

    if !stale.is_empty() {
        warn!("{} records still stale after reset, repatching", stale.len());
        let failed_ids = patch_all(&stale, &patch, source, clock).await;
        if !failed_ids.is_empty() {
            return Err(JobError::ResetPartial { failed_ids }.into());
        }
    }

    info!("Weekly reset completed");
    Ok(ResetOutcome::Performed {
        new_week_start: next_start,
    })
}

fn is_reset(record: &TimeBlockRecord, new_week_start: NaiveDate) -> bool {
    record.week_start == Some(new_week_start) && record.is_cleared()
}

/// Patches every record, returning the ids that still failed after retries.
async fn patch_all(
    records: &[TimeBlockRecord],
    patch: &ResetPatch,
    source: &dyn RecordSource,
    clock: &dyn Clock,
) -> Vec<String> {
    let mut failed = Vec::new();
    for record in records {
        if let Err(e) = patch_with_retry(&record.id, patch, source, clock).await {
            warn!("Giving up on record {}: {e:?}", record.id);
            failed.push(record.id.clone());
        }
    }
    failed
}

async fn patch_with_retry(
    id: &str,
    patch: &ResetPatch,
    source: &dyn RecordSource,
    clock: &dyn Clock,
) -> Result<()> {
    let mut delay = PATCH_BACKOFF_BASE;
    let mut attempt = 1;
    loop {
        match source.patch_record(id, patch).await {
            Ok(()) => return Ok(()),
            Err(e) if attempt < PATCH_ATTEMPTS => {
                warn!("Patch attempt {attempt} for record {id} failed: {e}");
                clock.sleep(delay).await;
                delay *= 2;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}
