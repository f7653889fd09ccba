use std::path::PathBuf;

use clap::Parser;

use crate::analyzer::{AnalyzeOptions, RISK_ANSWER_COUNT};
use crate::score::ScoreWeights;

/// Command line interface definition for git-vibecheck.
#[derive(Parser, Debug)]
#[command(name = "git-vibecheck")]
#[command(about = "Score AI-assisted coding sessions from git history")]
#[command(version)]
pub struct Cli {
    /// Repository to analyze (default: current directory)
    #[arg(short, long)]
    repo: Option<PathBuf>,

    /// Number of commits of history to analyze
    #[arg(short = 'n', long, default_value_t = 100)]
    limit: usize,

    /// Session inactivity gap in minutes
    #[arg(long, default_value_t = 60)]
    gap: i64,

    /// Five risk answers in [0,1] (0 = safest), comma-separated
    /// Example: --risk 0.2,0.1,0.5,0.3,0.0
    #[arg(long, value_delimiter = ',')]
    risk: Option<Vec<f64>>,

    /// Trust level you intend to grant (0-5); enables calibration recording
    #[arg(short, long, value_parser = clap::value_parser!(u8).range(0..=5))]
    declare: Option<u8>,

    /// Do not record a calibration sample even when a level is declared
    #[arg(long)]
    no_record: bool,

    /// Emit the full report as JSON instead of a text summary
    #[arg(long)]
    json: bool,
}

/// Validated run options for the application layer.
pub struct RunOpts {
    pub repo: Option<PathBuf>,
    pub json: bool,
    pub analyze: AnalyzeOptions,
}

impl Cli {
    /// Convert parsed CLI flags into run options.
    pub fn into_opts(self) -> Result<RunOpts, String> {
        let risk_answers = match self.risk {
            None => [0.5; RISK_ANSWER_COUNT],
            Some(values) => {
                if values.len() != RISK_ANSWER_COUNT {
                    return Err(format!(
                        "--risk expects {} comma-separated values, got {}",
                        RISK_ANSWER_COUNT,
                        values.len()
                    ));
                }
                let mut answers = [0.0; RISK_ANSWER_COUNT];
                for (slot, value) in answers.iter_mut().zip(&values) {
                    if !(0.0..=1.0).contains(value) {
                        return Err(format!("risk answer {} outside [0,1]", value));
                    }
                    *slot = *value;
                }
                answers
            }
        };

        Ok(RunOpts {
            repo: self.repo,
            json: self.json,
            analyze: AnalyzeOptions {
                limit: self.limit,
                gap_minutes: self.gap,
                risk_answers,
                declared_level: self.declare,
                record: !self.no_record,
                weights: ScoreWeights::default(),
            },
        })
    }
}
