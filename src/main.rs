use std::process;

use clap::Parser;

use git_vibecheck::analyzer::{self, Analysis};
use git_vibecheck::calibration::{CalibrationLearner, FileCalibrationStore};
use git_vibecheck::cli::Cli;
use git_vibecheck::git::Git;
use git_vibecheck::utils::{format_minutes, short_sha};

fn main() {
    env_logger::init();

    let cli = Cli::parse();
    let opts = match cli.into_opts() {
        Ok(opts) => opts,
        Err(msg) => {
            eprintln!("Error: {}", msg);
            process::exit(2);
        }
    };

    let git = match &opts.repo {
        Some(path) => Git::with_work_dir(path),
        None => Git::new(),
    };
    let repo_root = opts.repo.clone().unwrap_or_else(|| ".".into());
    let learner = CalibrationLearner::new(FileCalibrationStore::for_repo(repo_root));

    let analysis = analyzer::analyze(&git, &learner, &opts.analyze);

    if opts.json {
        match serde_json::to_string_pretty(&analysis) {
            Ok(json) => println!("{}", json),
            Err(e) => {
                eprintln!("Error: failed to serialize report: {}", e);
                process::exit(1);
            }
        }
    } else {
        print_summary(&analysis);
    }
}

fn print_summary(analysis: &Analysis) {
    println!(
        "Analyzed {} commits across {} sessions ({:.1} active hours)",
        analysis.window.commit_count,
        analysis.session_stats.session_count,
        analysis.session_stats.active_hours
    );

    if analysis.fix_chains.is_empty() {
        println!("No debug spirals detected");
    } else {
        for chain in &analysis.fix_chains {
            let pattern = chain
                .pattern
                .map(|p| format!(" [{}]", p.name()))
                .unwrap_or_default();
            let span = match (chain.commits.first(), chain.commits.last()) {
                (Some(first), Some(last)) => {
                    format!(" {}..{}", short_sha(&first.hash), short_sha(&last.hash))
                }
                _ => String::new(),
            };
            println!(
                "Spiral on '{}': {} fixes over {}{}{}",
                chain.component,
                chain.commit_count(),
                format_minutes(chain.duration_minutes),
                span,
                pattern
            );
        }
    }

    let m = &analysis.metrics;
    for (name, metric) in [
        ("velocity", &m.velocity),
        ("rework ratio", &m.rework_ratio),
        ("trust pass rate", &m.trust_pass_rate),
        ("spiral duration", &m.spiral_duration),
        ("flow efficiency", &m.flow_efficiency),
        ("file churn", &m.file_churn),
        ("time spiral", &m.time_spiral),
        ("velocity anomaly", &m.velocity_anomaly),
        ("code stability", &m.code_stability),
    ] {
        println!(
            "  {:<18} {:>7.1} {:<10} [{}] {}",
            name, metric.value, metric.unit, metric.rating, metric.detail
        );
    }

    println!(
        "VibeScore: {:.2}  (model: {:?})",
        analysis.vibe_score.value, analysis.model_phase
    );
    let r = &analysis.recommendation;
    println!(
        "Recommended trust level: {} (confidence {:.0}%, interval {:.1}-{:.1})",
        r.level,
        r.confidence * 100.0,
        r.interval.0,
        r.interval.1
    );
    if analysis.recorded {
        println!("Calibration sample recorded");
    }
}
