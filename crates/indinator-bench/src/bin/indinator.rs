//! Interactive twenty questions in the terminal.

use std::fs;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::Parser;

use indinator_bench::logging::init_console_logging;
use indinator_core::game::serialization::SessionSnapshot;
use indinator_core::kb::{KnowledgeFiles, LikelihoodFile};
use indinator_core::model::likelihood::TraitModel;
use indinator_core::{Answer, EngineConfig, FeedbackOutcome, Session, Turn};

#[derive(Debug, Parser)]
#[command(name = "indinator", version, about = "Think of a character; I will guess it")]
struct Cli {
    #[arg(long, value_name = "FILE", default_value = "data/entities.json")]
    entities: PathBuf,

    #[arg(long, value_name = "FILE", default_value = "data/questions.json")]
    questions: PathBuf,

    /// Explicit likelihood table (takes precedence over --traits).
    #[arg(long, value_name = "FILE")]
    likelihoods: Option<PathBuf>,

    #[arg(long, value_name = "FILE", default_value = "data/traits.json")]
    traits: PathBuf,

    /// Override the guess threshold from INDINATOR_GUESS_THRESHOLD.
    #[arg(long, value_name = "P")]
    threshold: Option<f64>,

    /// Resume from a snapshot written by the `save` command. The game state
    /// comes from the snapshot; engine settings come from this invocation.
    #[arg(long, value_name = "FILE")]
    resume: Option<PathBuf>,

    /// Where `save` writes the session snapshot.
    #[arg(long, value_name = "FILE", default_value = "indinator-session.json")]
    save_to: PathBuf,

    /// After each game, write the final belief as new entity priors here.
    #[arg(long, value_name = "FILE")]
    learn: Option<PathBuf>,
}

fn main() -> Result<()> {
    init_console_logging();
    let cli = Cli::parse();

    let likelihoods = match &cli.likelihoods {
        Some(path) => LikelihoodFile::Table(path.clone()),
        None => LikelihoodFile::Traits(cli.traits.clone()),
    };
    let files = KnowledgeFiles {
        entities: cli.entities.clone(),
        questions: cli.questions.clone(),
        likelihoods,
    };
    let kb = Arc::new(
        files
            .load(TraitModel::default())
            .context("loading knowledge base")?,
    );

    let mut config = EngineConfig::from_env();
    if let Some(threshold) = cli.threshold {
        config.guess_threshold = threshold;
    }
    config.validate().context("invalid engine settings")?;

    let mut session = match &cli.resume {
        Some(path) => {
            let json = fs::read_to_string(path)
                .with_context(|| format!("reading snapshot {}", path.display()))?;
            let snapshot = SessionSnapshot::from_json(&json)?;
            let mut session = Session::restore(Arc::clone(&kb), snapshot)
                .with_context(|| format!("restoring snapshot {}", path.display()))?;
            session.set_config(config)?;
            session
        }
        None => Session::new(Arc::clone(&kb), config)?,
    };

    println!(
        "Think of one of {} characters. Answer with yes, no, probably, probably not or don't know.",
        kb.entity_count()
    );
    println!("Commands: top, stats, save, restart, quit.");

    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();

    loop {
        if session.phase().is_finished() {
            if !prompt_yes_no(&mut lines, "Play again?")? {
                return Ok(());
            }
            session.reset();
        }

        match session.next_turn()? {
            Turn::Ask(question) => {
                let text = kb
                    .question_index(question.as_str())
                    .map(|index| kb.question(index).text.clone())
                    .unwrap_or_else(|| question.to_string());
                let label = format!("Q{}: {text}", session.questions_asked() + 1);
                let Some(input) = prompt(&mut lines, &label)? else {
                    return Ok(());
                };
                match input.as_str() {
                    "quit" | "exit" => return Ok(()),
                    "restart" => {
                        session.reset();
                        continue;
                    }
                    "top" => {
                        for (name, p) in session.get_top_characters(5) {
                            println!("  {name:<24} {:.1}%", p * 100.0);
                        }
                        continue;
                    }
                    "stats" => {
                        let stats = session.stats();
                        println!(
                            "  turns {}, entropy {:.2} bits, {} candidates left",
                            stats.questions_asked, stats.entropy, stats.remaining_candidates
                        );
                        continue;
                    }
                    "save" => {
                        let json = SessionSnapshot::to_json(&session)?;
                        fs::write(&cli.save_to, json)
                            .with_context(|| format!("writing {}", cli.save_to.display()))?;
                        println!("  saved to {}", cli.save_to.display());
                        continue;
                    }
                    _ => {}
                }
                match input.parse::<Answer>() {
                    Ok(answer) => {
                        if let Err(err) =
                            session.update_probabilities(question.as_str(), answer, None, None)
                        {
                            println!("  {err}; ignoring that answer");
                        }
                    }
                    Err(err) => println!("  {err}"),
                }
            }
            Turn::Guess(guess) => {
                let correct = prompt_yes_no(
                    &mut lines,
                    &format!("Is it {}? ({:.0}% sure)", guess.name, guess.probability * 100.0),
                )?;
                match session.record_feedback(correct)? {
                    FeedbackOutcome::Solved => {
                        println!("Got it in {} questions.", session.questions_asked());
                        learn(&cli, &session)?;
                    }
                    FeedbackOutcome::Continue => println!("Hmm, let me ask a bit more."),
                    FeedbackOutcome::GaveUp => {
                        println!("I give up.");
                        reveal(&mut lines, &mut session)?;
                        learn(&cli, &session)?;
                    }
                }
            }
        }
    }
}

type Lines<'a> = io::Lines<io::StdinLock<'a>>;

/// `None` on end of input.
fn prompt(lines: &mut Lines<'_>, message: &str) -> Result<Option<String>> {
    print!("{message}\n> ");
    io::stdout().flush()?;
    match lines.next() {
        Some(line) => Ok(Some(line?.trim().to_lowercase())),
        None => Ok(None),
    }
}

fn prompt_yes_no(lines: &mut Lines<'_>, message: &str) -> Result<bool> {
    loop {
        let Some(input) = prompt(lines, message)? else {
            bail!("input closed");
        };
        match input.parse::<Answer>() {
            Ok(Answer::Yes | Answer::Probably) => return Ok(true),
            Ok(Answer::No | Answer::ProbablyNot) => return Ok(false),
            _ => println!("  please answer yes or no"),
        }
    }
}

/// Asks who the player had in mind and reinforces that character.
fn reveal(lines: &mut Lines<'_>, session: &mut Session) -> Result<()> {
    let Some(input) = prompt(lines, "Who was it?")? else {
        return Ok(());
    };
    match session.find_character(&input) {
        Some(name) => {
            let factor = session.config().boost_factor;
            session.boost_character(&name, factor)?;
            println!("Ah, {name}. I'll remember that.");
        }
        None => println!("I don't know '{input}' yet."),
    }
    Ok(())
}

fn learn(cli: &Cli, session: &Session) -> Result<()> {
    let Some(path) = &cli.learn else {
        return Ok(());
    };
    let json = serde_json::to_string_pretty(&session.export_priors())?;
    fs::write(path, json).with_context(|| format!("writing priors to {}", path.display()))?;
    Ok(())
}
