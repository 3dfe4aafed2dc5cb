#[macro_use]
extern crate log;

use std::{fs::File, io::BufWriter, path::PathBuf};

use anyhow::Context;
use chrono::{NaiveDate, TimeDelta};
use clap::{Args, Parser, Subcommand};
use dotenv::dotenv;
use nightcycle::{
    algo::{DEFAULT_WINDOW_OFFSET, DailySleepAnalyzer},
    load_monitoring_files, write_minutes,
};

#[derive(Parser)]
pub struct NightcycleCli {
    #[clap(subcommand)]
    pub subcommand: NightcycleCommand,
}

#[derive(Args)]
pub struct WindowArgs {
    /// Local date of the morning the night ends on (YYYY-MM-DD)
    #[arg(long, env = "NIGHTCYCLE_DAY")]
    pub day: NaiveDate,
    /// Start of the 24h window relative to local midnight of `day`, in seconds
    #[arg(
        long,
        env = "NIGHTCYCLE_WINDOW_OFFSET",
        allow_negative_numbers = true,
        default_value_t = DEFAULT_WINDOW_OFFSET.num_seconds()
    )]
    pub window_offset: i64,
    /// Monitoring batch files (JSON)
    #[arg(required = true)]
    pub files: Vec<PathBuf>,
}

impl WindowArgs {
    fn window_offset(&self) -> TimeDelta {
        TimeDelta::seconds(self.window_offset)
    }
}

#[derive(Subcommand)]
pub enum NightcycleCommand {
    ///
    /// Detect sleep cycles and phases of one night
    ///
    Analyze {
        #[command(flatten)]
        window: WindowArgs,
        /// Print the analysis as JSON
        #[arg(long)]
        json: bool,
    },
    ///
    /// Write the per-minute classification of one night for debugging
    ///
    Dump {
        #[command(flatten)]
        window: WindowArgs,
        #[arg(long, short)]
        output: PathBuf,
    },
}

fn main() -> anyhow::Result<()> {
    let env_file = dotenv();

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    if let Err(error) = env_file {
        debug!("no .env loaded: {}", error);
    }

    let cli = NightcycleCli::parse();

    match cli.subcommand {
        NightcycleCommand::Analyze { window, json } => {
            let batches = load_monitoring_files(&window.files)?;
            let analysis =
                DailySleepAnalyzer::analyze(&batches, window.day, window.window_offset());

            if json {
                println!("{}", serde_json::to_string_pretty(&analysis)?);
            } else {
                println!("{}", analysis);
            }
            Ok(())
        }
        NightcycleCommand::Dump { window, output } => {
            let batches = load_monitoring_files(&window.files)?;
            let analyzer = DailySleepAnalyzer::new(&batches, window.day, window.window_offset())?;

            let file = File::create(&output)
                .with_context(|| format!("unable to create {}", output.display()))?;
            write_minutes(&analyzer, BufWriter::new(file))?;
            info!("minute dump written to {}", output.display());
            Ok(())
        }
    }
}
