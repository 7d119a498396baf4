use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;

use indinator_bench::config::{BenchmarkConfig, ResolvedOutputs};
use indinator_bench::logging::init_logging;
use indinator_bench::simulation::SimulationRunner;
use indinator_core::kb::audit::{audit, audit_traits};
use indinator_core::kb::loader::read_traits;

/// Simulation harness for the twenty-questions engine.
#[derive(Debug, Parser)]
#[command(
    name = "indinator-bench",
    author,
    version,
    about = "Deterministic self-play harness for the guessing engine"
)]
struct Cli {
    /// Path to the YAML configuration file.
    #[arg(short, long, value_name = "FILE", default_value = "bench/bench.yaml")]
    config: PathBuf,

    /// Override the run identifier (substitutes {run_id} templates).
    #[arg(long, value_name = "RUN_ID")]
    run_id: Option<String>,

    /// Override the number of games to play.
    #[arg(long, value_name = "GAMES")]
    games: Option<usize>,

    /// Override the RNG seed for targets and respondents.
    #[arg(long, value_name = "SEED")]
    seed: Option<u64>,

    /// Exit after validating the configuration (no games are played).
    #[arg(long)]
    validate_only: bool,

    /// Print questions that barely split the catalog, then exit.
    #[arg(long)]
    audit: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let mut config = BenchmarkConfig::from_path(&cli.config)?;

    if let Some(run_id) = cli.run_id {
        config.run_id = run_id;
    }

    if let Some(games) = cli.games {
        config.games.count = games;
    }

    if let Some(seed) = cli.seed {
        config.games.seed = Some(seed);
    }

    config.validate()?;

    let outputs: ResolvedOutputs = config.resolved_outputs();
    let respondent_count = config.respondents.len();
    let run_id = config.run_id.clone();
    let games = config.games.count;

    println!(
        "Loaded configuration '{run_id}' with {respondent_count} respondent{} ({games} games)",
        if respondent_count == 1 { "" } else { "s" }
    );

    let traits_path = config.knowledge.traits.clone();

    let _logging_guard = init_logging(&config.logging, &outputs)?;
    let runner = SimulationRunner::new(config, outputs)
        .with_context(|| format!("preparing run '{run_id}'"))?;
    let kb = runner.knowledge_base();
    println!(
        "Knowledge base: {} entities, {} questions",
        kb.entity_count(),
        kb.question_count()
    );

    if cli.audit {
        let report = match &traits_path {
            Some(path) => {
                let traits = read_traits(path)
                    .with_context(|| format!("reading traits from {}", path.display()))?;
                audit_traits(kb, &traits)
            }
            None => audit(kb),
        };
        let flagged: Vec<_> = report
            .into_iter()
            .filter(|report| report.issue.is_some())
            .collect();
        for report in &flagged {
            println!(
                "  {:<24} +{:<3} -{:<3} ~{:<3} {:?}",
                report.question.as_str(),
                report.positives,
                report.negatives,
                report.neutral,
                report.issue
            );
        }
        println!("{} question(s) flagged", flagged.len());
        return Ok(());
    }

    if cli.validate_only {
        println!("Validation-only mode: simulation skipped.");
        return Ok(());
    }

    let summary = runner.run()?;
    println!(
        "Simulation complete for '{run_id}': {} games → {} rows at {}",
        summary.games_played,
        summary.rows_written,
        summary.jsonl_path.display()
    );
    println!("Summary table: {}", summary.summary_path.display());
    if let Some(telemetry_path) = summary.telemetry_path.as_ref() {
        println!("Telemetry log: {}", telemetry_path.display());
    }

    Ok(())
}
