use anyhow::{Context, Result};
use chrono::{DateTime, Datelike, Duration, FixedOffset, NaiveDate};
use tracing::{info, warn};

use crate::matrix::{MatrixStore, SheetBackend};
use crate::report::{send_report, ChartRenderer, Mailer};
use crate::reset::{maybe_reset, ResetOutcome};
use crate::source::RecordSource;
use crate::tally::{aggregate_day, CategoryTally};
use crate::utils::clock::Clock;
use crate::utils::time::{date_to_row_key, weekday_name};

/// What a finished run did, for the closing status output.
#[derive(Debug)]
pub struct RunSummary {
    pub data_date: NaiveDate,
    pub tally: CategoryTally,
    pub report_sent: bool,
    pub reset: ResetOutcome,
}

/// One full reporting pass over the day before `asof`: fetch, aggregate, land the matrix row,
/// mail the chart, and run the weekly reset check. The run's notion of "now" is `asof` alone,
/// threaded into every step.
pub async fn run_job<B: SheetBackend>(
    asof: DateTime<FixedOffset>,
    sheet_title: &str,
    source: &dyn RecordSource,
    matrix: &MatrixStore<B>,
    renderer: &dyn ChartRenderer,
    mailer: &dyn Mailer,
    clock: &dyn Clock,
) -> Result<RunSummary> {
    let records = source.fetch_all().await?;

    let data_date = asof.date_naive() - Duration::days(1);
    let day = data_date.weekday();
    info!("Aggregating {} blocks for {data_date} ({})", records.len(), weekday_name(day));
    let tally = aggregate_day(day, &records);

    let sheet = matrix
        .ensure_sheet(sheet_title)
        .await
        .context("failed to open the matrix sheet")?;
    matrix
        .upsert_row(&sheet, &date_to_row_key(data_date), &tally)
        .await
        .context("failed to upsert the day row")?;

    // The matrix row is the durable contract of a run. Report trouble is logged, not propagated.
    let report_sent = match send_report(renderer, mailer, data_date, day, &tally).await {
        Ok(()) => true,
        Err(e) => {
            warn!("Report step failed: {e:?}");
            false
        }
    };

    let reset = maybe_reset(asof, &records, source, clock).await?;

    Ok(RunSummary {
        data_date,
        tally,
        report_sent,
        reset,
    })
}

#[cfg(test)]
mod tests {
    use anyhow::anyhow;
    use chrono::{FixedOffset, TimeZone, Utc};

    use crate::error::JobError;
    use crate::matrix::{CellWrite, MockSheetBackend, SheetHandle, KEY_HEADER};
    use crate::report::{MockChartRenderer, MockMailer};
    use crate::source::{DayMark, MockRecordSource, TimeBlockRecord};
    use crate::utils::clock::FrozenClock;

    use super::*;

    /// 08:00 on 2024-01-09 in the tracker's home offset; the data date is Monday the 8th.
    fn asof() -> DateTime<FixedOffset> {
        FixedOffset::east_opt(5 * 3600 + 1800)
            .unwrap()
            .with_ymd_and_hms(2024, 1, 9, 8, 0, 0)
            .unwrap()
    }

    fn clock() -> FrozenClock {
        FrozenClock(Utc::now())
    }

    fn monday_record(id: &str, category: &str) -> TimeBlockRecord {
        let mut days: [DayMark; 7] = Default::default();
        days[0] = DayMark {
            worked: true,
            category: Some(category.to_string()),
        };
        TimeBlockRecord {
            id: id.into(),
            days,
            // The window that began on the data date; it has a week left to run.
            week_start: NaiveDate::from_ymd_opt(2024, 1, 8),
        }
    }

    /// Expectations shared by every upsert: an empty sheet with just the key header. Tests add
    /// their own append/batch expectations on top.
    fn sheet_backend_base() -> MockSheetBackend {
        let mut backend = MockSheetBackend::new();
        backend.expect_open_or_create().returning(|title| {
            Ok(SheetHandle {
                title: title.to_string(),
            })
        });
        backend
            .expect_read_header_row()
            .returning(|_| Ok(vec![KEY_HEADER.to_string()]));
        backend.expect_write_header_row().returning(|_, _| Ok(()));
        backend
            .expect_read_key_column()
            .returning(|_| Ok(vec![KEY_HEADER.to_string()]));
        backend
    }

    fn sheet_backend_for_one_row() -> MockSheetBackend {
        let mut backend = sheet_backend_base();
        backend.expect_append_row().returning(|_, _| Ok(()));
        backend.expect_batch_write_cells().returning(|_, _| Ok(()));
        backend
    }

    #[tokio::test]
    async fn fetch_failure_aborts_before_any_write() {
        let mut source = MockRecordSource::new();
        source
            .expect_fetch_all()
            .returning(|| Err(JobError::SourceFetch("query response missing results".into()).into()));

        let mut backend = MockSheetBackend::new();
        backend.expect_open_or_create().never();
        let matrix = MatrixStore::new(backend);

        let mut renderer = MockChartRenderer::new();
        renderer.expect_render().never();
        let mut mailer = MockMailer::new();
        mailer.expect_send().never();

        let result = run_job(asof(), "Daily", &source, &matrix, &renderer, &mailer, &clock()).await;

        assert!(result.is_err());
    }

    #[tokio::test]
    async fn aggregates_yesterday_and_upserts_by_date_key() -> Result<()> {
        let mut source = MockRecordSource::new();
        source
            .expect_fetch_all()
            .returning(|| Ok(vec![monday_record("a", "Deep Work")]));

        let mut backend = sheet_backend_base();
        backend
            .expect_append_row()
            .withf(|_, values| values.len() == 1 && values[0] == "2024-01-08")
            .times(1)
            .returning(|_, _| Ok(()));
        backend
            .expect_batch_write_cells()
            .withf(|_, writes| {
                writes.len() == 1
                    && writes[0]
                        == CellWrite {
                            row: 2,
                            col: 2,
                            value: 0.5,
                        }
            })
            .times(1)
            .returning(|_, _| Ok(()));
        let matrix = MatrixStore::new(backend);

        let mut renderer = MockChartRenderer::new();
        let artifact = tempfile::NamedTempFile::new()?;
        let path = artifact.path().to_path_buf();
        renderer
            .expect_render()
            .returning(move |_, _| Ok(path.clone()));
        let mut mailer = MockMailer::new();
        mailer.expect_send().times(1).returning(|_, _, _| Ok(()));

        let summary =
            run_job(asof(), "Daily", &source, &matrix, &renderer, &mailer, &clock()).await?;

        assert_eq!(summary.data_date, NaiveDate::from_ymd_opt(2024, 1, 8).unwrap());
        assert_eq!(summary.tally.get("Deep Work"), Some(0.5));
        assert!(summary.report_sent);
        assert_eq!(
            summary.reset,
            ResetOutcome::Skipped {
                next_reset_on: NaiveDate::from_ymd_opt(2024, 1, 15).unwrap()
            }
        );
        Ok(())
    }

    #[tokio::test]
    async fn report_failure_does_not_fail_the_run() -> Result<()> {
        let mut source = MockRecordSource::new();
        source
            .expect_fetch_all()
            .returning(|| Ok(vec![monday_record("a", "Deep Work")]));

        let matrix = MatrixStore::new(sheet_backend_for_one_row());

        let mut renderer = MockChartRenderer::new();
        renderer
            .expect_render()
            .returning(|_, _| Err(anyhow!("disk full")));
        let mut mailer = MockMailer::new();
        mailer.expect_send().never();

        let summary =
            run_job(asof(), "Daily", &source, &matrix, &renderer, &mailer, &clock()).await?;

        assert!(!summary.report_sent);
        assert!(matches!(summary.reset, ResetOutcome::Skipped { .. }));
        Ok(())
    }

    #[tokio::test]
    async fn empty_record_set_fails_the_reset_check() {
        let mut source = MockRecordSource::new();
        source.expect_fetch_all().returning(|| Ok(vec![]));

        let matrix = MatrixStore::new(sheet_backend_for_one_row());

        let mut renderer = MockChartRenderer::new();
        let mut mailer = MockMailer::new();
        // An empty tally still renders and mails; only the reset check rejects it.
        renderer.expect_render().returning(|_, _| {
            let path = std::env::temp_dir().join("daytally-empty-tally.svg");
            std::fs::write(&path, "<svg/>")?;
            Ok(path)
        });
        mailer.expect_send().returning(|_, _, _| Ok(()));

        let result = run_job(asof(), "Daily", &source, &matrix, &renderer, &mailer, &clock()).await;

        let error = result.unwrap_err();
        assert!(matches!(
            error.downcast_ref::<JobError>(),
            Some(JobError::EmptyRecordSet)
        ));
    }
}
