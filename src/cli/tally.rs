use ansi_term::{Colour, Style};
use anyhow::Result;
use chrono::{Datelike, Duration, Weekday};
use clap::Parser;

use crate::config::SourceConfig;
use crate::source::http::HttpRecordSource;
use crate::source::RecordSource;
use crate::tally::{aggregate_day, CategoryTally, FREE_CATEGORY};
use crate::utils::clock::{Clock, DefaultClock};
use crate::utils::time::weekday_name;

#[derive(Debug, Parser)]
pub struct TallyCommand {
    #[command(flatten)]
    config: SourceConfig,
    #[arg(
        long,
        value_parser = parse_weekday,
        help = "Day to tally. Accepts \"monday\" or \"mon\". Defaults to yesterday"
    )]
    day: Option<Weekday>,
}

fn parse_weekday(value: &str) -> Result<Weekday, String> {
    value
        .parse()
        .map_err(|_| format!("unknown weekday {value:?}"))
}

/// Fetches the current week and prints one day's tally. Nothing is written anywhere, which
/// makes this the dry-run counterpart of the `run` command.
pub async fn process_tally_command(
    TallyCommand { config, day }: TallyCommand,
) -> Result<()> {
    let clock = DefaultClock;
    let asof = clock.time().with_timezone(&*config.utc_offset);
    let day = day.unwrap_or_else(|| (asof.date_naive() - Duration::days(1)).weekday());

    let source = HttpRecordSource::new(
        &config.tracker_api_url,
        &config.tracker_token,
        &config.time_block_db,
    )?;
    let records = source.fetch_all().await?;
    let tally = aggregate_day(day, &records);

    print_tally(day, &tally);
    Ok(())
}

fn print_tally(day: Weekday, tally: &CategoryTally) {
    println!("{}", Style::new().bold().paint(weekday_name(day)));

    let mut entries: Vec<(&str, f64)> = tally.iter().collect();
    entries.sort_by(|a, b| b.1.partial_cmp(&a.1).expect("tally hours are never NaN"));
    let max_hours = entries
        .iter()
        .filter(|(category, _)| *category != FREE_CATEGORY)
        .map(|(_, hours)| *hours)
        .fold(0., f64::max);

    for (category, hours) in entries {
        let label = if category == FREE_CATEGORY {
            Style::new().dimmed().paint(category)
        } else if hours == max_hours {
            Colour::Green.paint(category)
        } else {
            Style::new().paint(category)
        };
        println!("{hours:>5.1}h\t{label}");
    }

    println!(
        "{}",
        Style::new().bold().paint(format!(
            "{:>5.1}h\tutilized of {:.1}h tracked",
            tally.utilized_hours(),
            tally.total_hours()
        ))
    );
}
