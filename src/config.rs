use std::fmt::Display;
use std::ops::Deref;
use std::path::PathBuf;
use std::str::FromStr;

use anyhow::anyhow;
use chrono::FixedOffset;

/// UTC offset of the tracker's home timezone in "+05:30" form. Wall-clock decisions of a run
/// (data date, reset cutoff) are made in this offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UtcOffset(FixedOffset);

impl FromStr for UtcOffset {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (sign, rest) = match s.as_bytes().first() {
            Some(b'-') => (-1, &s[1..]),
            Some(b'+') => (1, &s[1..]),
            _ => (1, s),
        };
        let (hours, minutes) = rest
            .split_once(':')
            .ok_or_else(|| anyhow!("expected an offset like +05:30, got {s:?}"))?;
        let hours: i32 = hours.parse()?;
        let minutes: i32 = minutes.parse()?;
        if hours > 23 || minutes > 59 {
            return Err(anyhow!("offset {s:?} is out of range"));
        }
        FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
            .ok_or_else(|| anyhow!("offset {s:?} is out of range"))
            .map(UtcOffset)
    }
}

impl Display for UtcOffset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Deref for UtcOffset {
    type Target = FixedOffset;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

/// Where the records come from. Enough to fetch and patch time blocks.
#[derive(Debug, clap::Args)]
pub struct SourceConfig {
    #[arg(
        long,
        env = "TRACKER_API_URL",
        default_value = "https://api.notion.com/v1",
        help = "Base url of the record store api"
    )]
    pub tracker_api_url: String,
    #[arg(
        long,
        env = "TRACKER_TOKEN",
        hide_env_values = true,
        help = "Bearer token for the record store"
    )]
    pub tracker_token: String,
    #[arg(long, env = "TIME_BLOCK_DB", help = "Identifier of the time block database")]
    pub time_block_db: String,
    #[arg(
        long,
        env = "UTC_OFFSET",
        default_value = "+05:30",
        help = "UTC offset the job interprets wall-clock time in"
    )]
    pub utc_offset: UtcOffset,
}

/// Everything a full report run touches on top of the record store: the sheet matrix, the
/// mail hop, and where artifacts land locally.
#[derive(Debug, clap::Args)]
pub struct RunConfig {
    #[command(flatten)]
    pub source: SourceConfig,
    #[arg(
        long,
        env = "SHEET_API_URL",
        default_value = "https://sheets.googleapis.com/v4/spreadsheets",
        help = "Base url of the sheet service"
    )]
    pub sheet_api_url: String,
    #[arg(
        long,
        env = "SHEET_TOKEN",
        hide_env_values = true,
        help = "Bearer token for the sheet service"
    )]
    pub sheet_token: String,
    #[arg(long, env = "SPREADSHEET_ID", help = "Spreadsheet holding the daily matrix")]
    pub spreadsheet_id: String,
    #[arg(
        long,
        env = "DAILY_SHEET",
        default_value = "Daily",
        help = "Title of the matrix sheet inside the spreadsheet"
    )]
    pub daily_sheet: String,
    #[arg(long, env = "MAIL_API_URL", help = "Endpoint of the mail api messages call")]
    pub mail_api_url: String,
    #[arg(
        long,
        env = "MAIL_TOKEN",
        hide_env_values = true,
        help = "Bearer token for the mail api"
    )]
    pub mail_token: String,
    #[arg(long, env = "SENDER_EMAIL", help = "Address the report is sent from")]
    pub sender_email: String,
    #[arg(long, env = "RECEIVER_EMAIL", help = "Address the report is sent to")]
    pub receiver_email: String,
    #[arg(
        long,
        help = "Directory for charts and logs. By default tries to save into $XDG_STATE_HOME or $HOME/.local/state"
    )]
    pub dir: Option<PathBuf>,
}
