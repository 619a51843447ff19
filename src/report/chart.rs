use std::fmt::Write as _;
use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use tracing::info;

use crate::tally::CategoryTally;
use crate::utils::time::date_to_row_key;

use super::ChartRenderer;

const WIDTH: f64 = 1000.;
const HEIGHT: f64 = 600.;
const MARGIN_LEFT: f64 = 60.;
const MARGIN_RIGHT: f64 = 30.;
const MARGIN_TOP: f64 = 70.;
const MARGIN_BOTTOM: f64 = 120.;

const BACKGROUND: &str = "#E9F5DB";
const MAX_COLOR: &str = "#1f6f6f";
const MIN_COLOR: &str = "#9fc8c8";
const NORMAL_COLOR: &str = "#54a1a1";

/// Renders the tally as a vertical bar chart in svg, one file per data date under
/// `<output_dir>/charts/`.
pub struct SvgChartRenderer {
    output_dir: PathBuf,
}

impl SvgChartRenderer {
    pub fn new(output_dir: PathBuf) -> Self {
        Self { output_dir }
    }
}

impl ChartRenderer for SvgChartRenderer {
    fn render(&self, date: NaiveDate, tally: &CategoryTally) -> Result<PathBuf> {
        let charts_dir = self.output_dir.join("charts");
        std::fs::create_dir_all(&charts_dir)
            .with_context(|| format!("failed to create {charts_dir:?}"))?;

        let path = charts_dir.join(format!("{}.svg", date_to_row_key(date)));
        std::fs::write(&path, render_svg(date, tally))
            .with_context(|| format!("failed to write chart {path:?}"))?;

        info!("Chart saved to {path:?}");
        Ok(path)
    }
}

fn render_svg(date: NaiveDate, tally: &CategoryTally) -> String {
    // Zero-hour categories carry no bar; the rest are drawn tallest first.
    let mut bars: Vec<(&str, f64)> = tally.iter().filter(|(_, hours)| *hours > 0.).collect();
    bars.sort_by(|a, b| b.1.partial_cmp(&a.1).expect("tally hours are never NaN"));

    let mut svg = String::new();
    let _ = writeln!(
        svg,
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{WIDTH}" height="{HEIGHT}" viewBox="0 0 {WIDTH} {HEIGHT}">"#
    );
    let _ = writeln!(
        svg,
        r#"<rect width="{WIDTH}" height="{HEIGHT}" fill="{BACKGROUND}"/>"#
    );

    let _ = writeln!(
        svg,
        r#"<text x="{}" y="40" font-size="22" text-anchor="middle" font-family="sans-serif">{} Time Utilization: {} hrs</text>"#,
        WIDTH / 2.,
        date_to_row_key(date),
        format_hours(tally.utilized_hours()),
    );

    let plot_width = WIDTH - MARGIN_LEFT - MARGIN_RIGHT;
    let plot_height = HEIGHT - MARGIN_TOP - MARGIN_BOTTOM;
    let baseline = HEIGHT - MARGIN_BOTTOM;

    let _ = writeln!(
        svg,
        r#"<text x="20" y="{}" font-size="12" font-family="sans-serif" transform="rotate(-90 20 {})">Hours</text>"#,
        MARGIN_TOP + plot_height / 2.,
        MARGIN_TOP + plot_height / 2.,
    );

    if let Some(max_hours) = bars.first().map(|(_, hours)| *hours) {
        let min_hours = bars.last().map(|(_, hours)| *hours).unwrap_or(max_hours);
        let slot = plot_width / bars.len() as f64;
        let bar_width = slot * 0.4;

        for (index, (category, hours)) in bars.iter().enumerate() {
            let bar_height = hours / max_hours * plot_height;
            let x = MARGIN_LEFT + slot * index as f64 + (slot - bar_width) / 2.;
            let y = baseline - bar_height;
            let color = bar_color(*hours, max_hours, min_hours);

            let _ = writeln!(
                svg,
                r#"<rect x="{x:.1}" y="{y:.1}" width="{bar_width:.1}" height="{bar_height:.1}" fill="{color}"/>"#
            );
            let _ = writeln!(
                svg,
                r#"<text x="{:.1}" y="{:.1}" font-size="11" text-anchor="middle" font-family="sans-serif">{}h</text>"#,
                x + bar_width / 2.,
                y - 6.,
                format_hours(*hours),
            );
            let label_x = x + bar_width / 2.;
            let label_y = baseline + 16.;
            let _ = writeln!(
                svg,
                r#"<text x="{label_x:.1}" y="{label_y:.1}" font-size="11" text-anchor="end" font-family="sans-serif" transform="rotate(-45 {label_x:.1} {label_y:.1})">{}</text>"#,
                escape_text(category),
            );
        }
    }

    svg.push_str("</svg>\n");
    svg
}

fn bar_color(hours: f64, max: f64, min: f64) -> &'static str {
    if hours == max {
        MAX_COLOR
    } else if hours == min {
        MIN_COLOR
    } else {
        NORMAL_COLOR
    }
}

fn format_hours(hours: f64) -> String {
    format!("{hours:.1}")
}

fn escape_text(text: &str) -> String {
    text.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}

#[cfg(test)]
mod tests {
    use crate::tally::FREE_CATEGORY;

    use super::*;

    fn tally(entries: &[(&str, f64)]) -> CategoryTally {
        let mut tally = CategoryTally::default();
        for (category, hours) in entries {
            tally.add(category, *hours);
        }
        tally
    }

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 7).unwrap()
    }

    #[test]
    fn renders_one_bar_per_nonzero_category() {
        let svg = render_svg(
            date(),
            &tally(&[("Deep Work", 3.0), ("Reading", 1.0), ("Empty", 0.0)]),
        );

        // background + one rect per bar
        assert_eq!(svg.matches("<rect").count(), 3);
        assert!(svg.contains("Deep Work"));
        assert!(svg.contains("Reading"));
        assert!(!svg.contains("Empty"));
    }

    #[test]
    fn extremes_get_their_own_colors() {
        let svg = render_svg(
            date(),
            &tally(&[("A", 3.0), ("B", 2.0), ("C", 0.5)]),
        );

        assert!(svg.contains(MAX_COLOR));
        assert!(svg.contains(MIN_COLOR));
        assert!(svg.contains(NORMAL_COLOR));
    }

    #[test]
    fn title_reports_utilized_hours_without_free_time() {
        let svg = render_svg(date(), &tally(&[("Deep Work", 3.0), (FREE_CATEGORY, 5.0)]));

        assert!(svg.contains("Time Utilization: 3.0 hrs"));
    }

    #[test]
    fn empty_tally_still_renders_a_frame() {
        let svg = render_svg(date(), &CategoryTally::default());

        assert_eq!(svg.matches("<rect").count(), 1);
        assert!(svg.contains("Time Utilization: 0.0 hrs"));
    }

    #[test]
    fn category_names_are_escaped() {
        let svg = render_svg(date(), &tally(&[("R&D <misc>", 1.0)]));

        assert!(svg.contains("R&amp;D &lt;misc&gt;"));
        assert!(!svg.contains("<misc>"));
    }

    #[test]
    fn renderer_writes_the_artifact() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let renderer = SvgChartRenderer::new(dir.path().to_owned());

        let path = renderer.render(date(), &tally(&[("Deep Work", 1.5)]))?;

        assert!(path.is_file());
        assert_eq!(path.file_name().unwrap(), "2024-01-07.svg");
        let written = std::fs::read_to_string(&path)?;
        assert!(written.starts_with("<svg"));
        Ok(())
    }
}
