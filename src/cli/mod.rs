pub mod run;
pub mod tally;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tally::TallyCommand;
use tracing::level_filters::LevelFilter;

use crate::config::RunConfig;
use crate::utils::dir::create_application_default_path;
use crate::utils::logging::{enable_logging, CLI_PREFIX};

#[derive(Parser, Debug)]
#[command(name = "Daytally", version, long_about = None)]
#[command(about = "Daily time-block reporting for a remote tracker", long_about = None)]
struct Args {
    #[command(subcommand)]
    commands: Commands,
    #[arg(long, help = "Enable logging")]
    log: bool,
}

#[derive(Subcommand, Debug)]
#[command(version, about, long_about = None)]
enum Commands {
    #[command(
        about = "Run the full daily report: aggregate yesterday, sync the matrix, mail the chart, check the weekly reset"
    )]
    Run {
        #[command(flatten)]
        config: RunConfig,
    },
    #[command(about = "Aggregate one day and print the tally without writing anywhere")]
    Tally {
        #[command(flatten)]
        command: TallyCommand,
    },
}

pub async fn run_cli() -> Result<()> {
    let args = Args::parse();

    let logging_level = if args.log {
        Some(LevelFilter::TRACE)
    } else {
        None
    };
    enable_logging(
        CLI_PREFIX,
        &create_application_default_path()?,
        logging_level,
        args.log,
    )?;

    match args.commands {
        Commands::Run { config } => run::process_run_command(config).await,
        Commands::Tally { command } => tally::process_tally_command(command).await,
    }
}
