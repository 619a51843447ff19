pub mod chart;
pub mod mail;

use std::path::{Path, PathBuf};

use anyhow::Result;
use async_trait::async_trait;
use chrono::{NaiveDate, Weekday};
#[cfg(test)]
use mockall::automock;

use crate::error::JobError;
use crate::tally::CategoryTally;

/// Renders the day's tally into an artifact on disk and returns where it landed.
#[cfg_attr(test, automock)]
pub trait ChartRenderer: Sync + Send {
    fn render(&self, date: NaiveDate, tally: &CategoryTally) -> Result<PathBuf>;
}

/// Delivers a rendered artifact to the configured recipient.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait Mailer: Sync + Send {
    async fn send(&self, date: NaiveDate, day: Weekday, artifact: &Path) -> Result<()>;
}

/// Renders and mails the report. The matrix row is already durable by the time this runs, so
/// the caller logs failures from here instead of failing the run.
pub async fn send_report(
    renderer: &dyn ChartRenderer,
    mailer: &dyn Mailer,
    date: NaiveDate,
    day: Weekday,
    tally: &CategoryTally,
) -> Result<()> {
    let artifact = renderer.render(date, tally)?;
    if !artifact.is_file() {
        return Err(JobError::ReportArtifactMissing(artifact).into());
    }
    mailer.send(date, day, &artifact).await
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    fn tally() -> CategoryTally {
        let mut tally = CategoryTally::default();
        tally.add("Deep Work", 1.0);
        tally
    }

    #[tokio::test]
    async fn mails_the_rendered_artifact() -> Result<()> {
        let mut artifact = tempfile::NamedTempFile::new()?;
        artifact.write_all(b"<svg/>")?;
        let path = artifact.path().to_path_buf();

        let mut renderer = MockChartRenderer::new();
        renderer
            .expect_render()
            .times(1)
            .returning(move |_, _| Ok(path.clone()));

        let mut mailer = MockMailer::new();
        let expected = artifact.path().to_path_buf();
        mailer
            .expect_send()
            .withf(move |_, _, sent| sent == expected)
            .times(1)
            .returning(|_, _, _| Ok(()));

        let date = NaiveDate::from_ymd_opt(2024, 1, 7).unwrap();
        send_report(&renderer, &mailer, date, Weekday::Sun, &tally()).await
    }

    #[tokio::test]
    async fn missing_artifact_stops_before_mailing() {
        let missing = std::env::temp_dir().join("daytally-no-such-chart.svg");

        let mut renderer = MockChartRenderer::new();
        let rendered = missing.clone();
        renderer
            .expect_render()
            .returning(move |_, _| Ok(rendered.clone()));

        let mut mailer = MockMailer::new();
        mailer.expect_send().never();

        let date = NaiveDate::from_ymd_opt(2024, 1, 7).unwrap();
        let result = send_report(&renderer, &mailer, date, Weekday::Sun, &tally()).await;

        let error = result.unwrap_err();
        assert!(matches!(
            error.downcast_ref::<JobError>(),
            Some(JobError::ReportArtifactMissing(path)) if *path == missing
        ));
    }
}
