//! CLI entrypoint for the stratio conformance harness.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use stratio_harness::fixtures::{self, ScenarioSet};
use stratio_harness::report::ConformanceReport;
use stratio_harness::runner::ScenarioRunner;
use stratio_harness::structured_log::{ArtifactIndex, LogEmitter, validate_log_file};
use stratio_harness::verify::VerificationSummary;

/// Conformance tooling for the stratio stream stack.
#[derive(Debug, Parser)]
#[command(name = "stratio-harness")]
#[command(about = "Conformance testing harness for the stratio stream stack")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run a scenario set and write the evidence bundle.
    Run {
        /// Scenario JSON file; the built-in library when omitted.
        #[arg(long)]
        fixture: Option<PathBuf>,
        /// Campaign name recorded in logs and the report.
        #[arg(long, default_value = "conformance")]
        campaign: String,
        /// Output directory for the JSONL log, reports, and artifact index.
        #[arg(long, default_value = "target/conformance")]
        evidence: PathBuf,
        /// Run id used in trace ids and evidence file names.
        #[arg(long, default_value = "local")]
        run_id: String,
    },
    /// List the scenarios in a set without running them.
    List {
        /// Scenario JSON file; the built-in library when omitted.
        #[arg(long)]
        fixture: Option<PathBuf>,
    },
    /// Export the built-in scenario library as JSON.
    Export {
        /// Output path (prints to stdout if omitted).
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Validate a structured JSONL log against the schema.
    ValidateLog {
        /// JSONL log path.
        #[arg(long)]
        log: PathBuf,
    },
}

fn load_set(fixture: Option<&PathBuf>) -> Result<ScenarioSet, Box<dyn std::error::Error>> {
    match fixture {
        Some(path) => Ok(ScenarioSet::from_file(path)?),
        None => Ok(fixtures::builtin()),
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Command::Run {
            fixture,
            campaign,
            evidence,
            run_id,
        } => {
            let set = load_set(fixture.as_ref())?;
            eprintln!(
                "Running {} scenarios from family '{}'",
                set.scenarios.len(),
                set.family
            );

            std::fs::create_dir_all(&evidence)?;
            let log_path = evidence.join(format!("{run_id}.log.jsonl"));
            let mut emitter = LogEmitter::to_file(&log_path, &campaign, &run_id)?;
            let runner = ScenarioRunner::new(campaign.as_str());
            let results = runner.run_logged(&set, &mut emitter)?;
            emitter.flush()?;

            let summary = VerificationSummary::from_results(results);
            let report = ConformanceReport::new(
                "stratio conformance report",
                campaign.as_str(),
                summary,
            );
            let md_path = evidence.join(format!("{run_id}.report.md"));
            let json_path = evidence.join(format!("{run_id}.report.json"));
            std::fs::write(&md_path, report.to_markdown())?;
            std::fs::write(&json_path, report.to_json())?;

            let mut index = ArtifactIndex::new(run_id.as_str(), campaign.as_str());
            index.add_file(&log_path, "log")?;
            index.add_file(&md_path, "report")?;
            index.add_file(&json_path, "report")?;
            let index_path = evidence.join(format!("{run_id}.artifacts.json"));
            std::fs::write(&index_path, index.to_json()?)?;

            eprintln!(
                "Run complete: total={}, passed={}, failed={}",
                report.summary.total, report.summary.passed, report.summary.failed
            );
            eprintln!("Evidence written to {}", evidence.display());

            if !report.summary.all_passed() {
                return Err("conformance run failed".into());
            }
        }
        Command::List { fixture } => {
            let set = load_set(fixture.as_ref())?;
            for scenario in &set.scenarios {
                let layer = if scenario.text.is_some() {
                    "text"
                } else {
                    "buffered"
                };
                println!(
                    "{:<45} {:<18} {layer}",
                    scenario.name, scenario.contract
                );
            }
        }
        Command::Export { output } => {
            let json = fixtures::builtin().to_json()?;
            match output {
                Some(path) => {
                    std::fs::write(&path, json)?;
                    eprintln!("Wrote {}", path.display());
                }
                None => println!("{json}"),
            }
        }
        Command::ValidateLog { log } => {
            let (line_count, errors) = validate_log_file(&log)?;
            if !errors.is_empty() {
                for err in &errors {
                    eprintln!("{err}");
                }
                return Err(
                    format!("{} validation errors in {}", errors.len(), log.display()).into(),
                );
            }
            eprintln!("{line_count} lines valid in {}", log.display());
        }
    }

    Ok(())
}
