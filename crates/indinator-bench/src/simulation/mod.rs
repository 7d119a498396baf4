mod targets;

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use crate::analytics::{AnalyticsCollector, AnalyticsError};
use crate::config::{BenchmarkConfig, ResolvedOutputs};
use indinator_bot::{RespondContext, Respondent};
use indinator_core::kb::KnowledgeBaseError;
use indinator_core::{Answer, EngineError, FeedbackOutcome, KnowledgeBase, Session, Turn};
use rand::{RngCore, SeedableRng, rngs::StdRng};
use serde::Serialize;
use thiserror::Error;
use tracing::{Level, event};

pub use targets::TargetSchedule;

/// Plays configured respondents against the engine and records every game.
pub struct SimulationRunner {
    config: BenchmarkConfig,
    outputs: ResolvedOutputs,
    kb: Arc<KnowledgeBase>,
    schedule: TargetSchedule,
    logging_enabled: bool,
}

/// Summary details returned after a run.
pub struct RunSummary {
    pub games_played: usize,
    pub rows_written: usize,
    pub jsonl_path: PathBuf,
    pub summary_path: PathBuf,
    pub telemetry_path: Option<PathBuf>,
}

/// What happened in one game.
#[derive(Debug, Clone)]
pub struct GameOutcome {
    pub respondent: String,
    pub target: String,
    pub solved: bool,
    pub questions: usize,
    pub wrong_guesses: usize,
    pub final_guess: Option<String>,
    pub final_probability: f64,
    pub elapsed_ms: f64,
}

impl SimulationRunner {
    /// Loads the knowledge base and checks the configuration against it.
    pub fn new(config: BenchmarkConfig, outputs: ResolvedOutputs) -> Result<Self, RunnerError> {
        let files = config
            .knowledge
            .files()
            .ok_or_else(|| RunnerError::config("knowledge needs exactly one likelihood source"))?;
        let kb = Arc::new(files.load(config.knowledge.trait_model)?);
        let schedule = TargetSchedule::new(config.games.targets, &kb)
            .ok_or_else(|| RunnerError::config("entity priors cannot be sampled"))?;

        Ok(Self {
            logging_enabled: config.logging.enable_structured,
            config,
            outputs,
            kb,
            schedule,
        })
    }

    pub fn knowledge_base(&self) -> &Arc<KnowledgeBase> {
        &self.kb
    }

    /// Execute every game, streaming JSONL rows to disk.
    pub fn run(&self) -> Result<RunSummary, RunnerError> {
        ensure_parent(self.outputs.jsonl.parent())?;
        ensure_parent(self.outputs.summary_md.parent())?;

        let mut writer = BufWriter::new(File::create(&self.outputs.jsonl)?);
        let mut rng = StdRng::seed_from_u64(self.config.games.seed.unwrap_or(0));
        let mut session = Session::new(Arc::clone(&self.kb), self.config.engine)?;
        let mut analytics = AnalyticsCollector::new(&self.config);
        let mut rows_written = 0usize;

        for game_index in 0..self.config.games.count {
            let target = self.schedule.pick(game_index, &mut rng);
            let base_seed = rng.next_u64();

            for (slot, respondent_cfg) in self.config.respondents.iter().enumerate() {
                let mut respondent = respondent_cfg.kind.build(
                    respondent_cfg.name.clone(),
                    respondent_cfg.params,
                    base_seed.wrapping_add(slot as u64),
                );
                let outcome = self.play_game(&mut session, respondent.as_mut(), target)?;
                analytics.record_game(&outcome)?;
                write_game_row(&mut writer, &self.config.run_id, game_index, &outcome)?;
                rows_written += 1;

                if self.logging_enabled && tracing::enabled!(Level::INFO) {
                    event!(
                        target: "indinator_bench::game",
                        Level::INFO,
                        run_id = %self.config.run_id,
                        game_index = game_index as u32,
                        respondent = %outcome.respondent,
                        target_entity = %outcome.target,
                        solved = outcome.solved,
                        questions = outcome.questions as u32,
                        wrong_guesses = outcome.wrong_guesses as u32,
                        elapsed_ms = outcome.elapsed_ms
                    );
                }
            }
        }

        writer.flush()?;

        let summary = analytics.finalize()?;
        summary.write_markdown(&self.outputs.summary_md)?;

        let telemetry_path = if self.logging_enabled {
            Some(self.outputs.report_dir().join("telemetry.jsonl"))
        } else {
            None
        };

        Ok(RunSummary {
            games_played: self.config.games.count,
            rows_written,
            jsonl_path: self.outputs.jsonl.clone(),
            summary_path: self.outputs.summary_md.clone(),
            telemetry_path,
        })
    }

    fn play_game(
        &self,
        session: &mut Session,
        respondent: &mut dyn Respondent,
        target: usize,
    ) -> Result<GameOutcome, RunnerError> {
        session.reset();
        let start = Instant::now();
        let mut final_guess = None;
        let mut final_probability = 0.0;
        let mut solved = false;

        // Rejected guesses do not consume turns; bound them by the catalog size.
        let max_steps = self.config.engine.max_questions + self.kb.entity_count() + 1;
        for _ in 0..max_steps {
            match session.next_turn()? {
                Turn::Ask(question) => {
                    let question_index = self
                        .kb
                        .question_index(question.as_str())
                        .ok_or_else(|| EngineError::UnknownQuestion(question.to_string()))?;
                    let ctx = RespondContext {
                        kb: &self.kb,
                        target,
                        question: question_index,
                        turn: session.questions_asked(),
                    };
                    let answer = respondent.answer(&ctx);
                    match session.update_probabilities(question.as_str(), answer, None, None) {
                        Ok(()) => {}
                        // Contradictory answers from a noisy player are dropped.
                        Err(EngineError::DegenerateBelief { .. }) => {
                            session.update_probabilities(
                                question.as_str(),
                                Answer::Unknown,
                                None,
                                None,
                            )?;
                        }
                        Err(err) => return Err(err.into()),
                    }
                }
                Turn::Guess(guess) => {
                    let correct = respondent.confirm(&self.kb, target, &guess);
                    final_guess = Some(guess.entity.to_string());
                    final_probability = guess.probability;
                    match session.record_feedback(correct)? {
                        FeedbackOutcome::Solved => {
                            solved = true;
                            break;
                        }
                        FeedbackOutcome::GaveUp => break,
                        FeedbackOutcome::Continue => {}
                    }
                }
            }
        }

        Ok(GameOutcome {
            respondent: respondent.name().to_string(),
            target: self.kb.entity(target).id.to_string(),
            solved,
            questions: session.questions_asked(),
            wrong_guesses: session.wrong_guesses(),
            final_guess,
            final_probability,
            elapsed_ms: start.elapsed().as_secs_f64() * 1000.0,
        })
    }
}

fn ensure_parent(path: Option<&Path>) -> Result<(), RunnerError> {
    if let Some(dir) = path.filter(|dir| !dir.as_os_str().is_empty()) {
        fs::create_dir_all(dir)?;
    }
    Ok(())
}

fn write_game_row(
    writer: &mut BufWriter<File>,
    run_id: &str,
    game_index: usize,
    outcome: &GameOutcome,
) -> Result<(), RunnerError> {
    let row = GameLogRow {
        run_id,
        game_id: format!("G{game_index:05}"),
        respondent: &outcome.respondent,
        target: &outcome.target,
        solved: outcome.solved,
        questions: outcome.questions,
        guesses: outcome.wrong_guesses + usize::from(outcome.solved),
        final_guess: outcome.final_guess.as_deref(),
        final_probability: outcome.final_probability,
        elapsed_ms: outcome.elapsed_ms,
    };
    serde_json::to_writer(&mut *writer, &row)?;
    writer.write_all(b"\n")?;
    Ok(())
}

#[derive(Serialize)]
struct GameLogRow<'a> {
    run_id: &'a str,
    game_id: String,
    respondent: &'a str,
    target: &'a str,
    solved: bool,
    questions: usize,
    guesses: usize,
    final_guess: Option<&'a str>,
    final_probability: f64,
    elapsed_ms: f64,
}

#[derive(Debug, Error)]
pub enum RunnerError {
    #[error("failed to load knowledge base: {0}")]
    Knowledge(#[from] KnowledgeBaseError),
    #[error("engine error: {0}")]
    Engine(#[from] EngineError),
    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },
    #[error("failed to serialize log row: {source}")]
    Serialize {
        #[from]
        source: serde_json::Error,
    },
    #[error("invalid simulation setup: {message}")]
    Config { message: String },
    #[error("analytics error: {0}")]
    Analytics(#[from] AnalyticsError),
}

impl RunnerError {
    fn config(message: &str) -> Self {
        RunnerError::Config {
            message: message.to_string(),
        }
    }
}
