use std::collections::HashMap;
use std::fs;
use std::path::Path;

use serde::Serialize;
use statrs::distribution::{ContinuousCDF, Normal};
use thiserror::Error;

use crate::config::BenchmarkConfig;
use crate::simulation::GameOutcome;
use indinator_bot::RespondentKind;

const CONFIDENCE_LEVEL: f64 = 0.95;
const HARDEST_TARGETS: usize = 5;

#[derive(Debug, Error)]
pub enum AnalyticsError {
    #[error("respondent '{0}' played a game but is missing from configuration")]
    UnknownRespondent(String),
    #[error("failed to build reference distribution: {0}")]
    Distribution(String),
    #[error("{context}: {source}")]
    Io {
        context: &'static str,
        #[source]
        source: std::io::Error,
    },
}

pub struct AnalyticsCollector {
    run_id: String,
    max_questions: usize,
    respondents: HashMap<String, RespondentAccumulator>,
    respondent_order: Vec<String>,
    targets: HashMap<String, TargetReport>,
    target_order: Vec<String>,
}

impl AnalyticsCollector {
    pub fn new(config: &BenchmarkConfig) -> Self {
        let mut respondents = HashMap::new();
        let mut order = Vec::new();
        for respondent in &config.respondents {
            respondents.insert(
                respondent.name.clone(),
                RespondentAccumulator::new(respondent.name.clone(), respondent.kind),
            );
            order.push(respondent.name.clone());
        }

        Self {
            run_id: config.run_id.clone(),
            max_questions: config.engine.max_questions,
            respondents,
            respondent_order: order,
            targets: HashMap::new(),
            target_order: Vec::new(),
        }
    }

    pub fn record_game(&mut self, outcome: &GameOutcome) -> Result<(), AnalyticsError> {
        let acc = self
            .respondents
            .get_mut(&outcome.respondent)
            .ok_or_else(|| AnalyticsError::UnknownRespondent(outcome.respondent.clone()))?;
        acc.record(outcome);

        if !self.targets.contains_key(&outcome.target) {
            self.target_order.push(outcome.target.clone());
        }
        let target = self
            .targets
            .entry(outcome.target.clone())
            .or_insert_with(|| TargetReport {
                target: outcome.target.clone(),
                games: 0,
                solved: 0,
            });
        target.games += 1;
        if outcome.solved {
            target.solved += 1;
        }
        Ok(())
    }

    pub fn finalize(mut self) -> Result<AnalyticsSummary, AnalyticsError> {
        let z = z_score(CONFIDENCE_LEVEL)?;

        let mut reports = Vec::new();
        for name in &self.respondent_order {
            if let Some(acc) = self.respondents.remove(name) {
                reports.push(acc.into_report(z));
            }
        }

        let mut targets: Vec<TargetReport> = self
            .target_order
            .iter()
            .filter_map(|name| self.targets.remove(name))
            .collect();
        // Stable sort keeps first-seen order among equally hard targets.
        targets.sort_by(|a, b| a.solve_rate().total_cmp(&b.solve_rate()));

        Ok(AnalyticsSummary {
            run_id: self.run_id,
            max_questions: self.max_questions,
            respondents: reports,
            targets,
        })
    }
}

struct RespondentAccumulator {
    name: String,
    kind: RespondentKind,
    games: usize,
    solved: usize,
    questions: Vec<f64>,
    wrong_guesses: usize,
    total_ms: f64,
}

impl RespondentAccumulator {
    fn new(name: String, kind: RespondentKind) -> Self {
        Self {
            name,
            kind,
            games: 0,
            solved: 0,
            questions: Vec::new(),
            wrong_guesses: 0,
            total_ms: 0.0,
        }
    }

    fn record(&mut self, outcome: &GameOutcome) {
        self.games += 1;
        if outcome.solved {
            self.solved += 1;
        }
        self.questions.push(outcome.questions as f64);
        self.wrong_guesses += outcome.wrong_guesses;
        self.total_ms += outcome.elapsed_ms;
    }

    fn into_report(self, z: f64) -> RespondentReport {
        let per_game = |total: f64| {
            if self.games == 0 {
                0.0
            } else {
                total / self.games as f64
            }
        };

        RespondentReport {
            name: self.name.clone(),
            kind: self.kind,
            games: self.games,
            solved: self.solved,
            solve_rate: per_game(self.solved as f64),
            solve_ci95: wilson_interval(self.solved, self.games, z),
            mean_questions: per_game(self.questions.iter().sum()),
            questions_ci95: confidence_interval(&self.questions, z),
            mean_wrong_guesses: per_game(self.wrong_guesses as f64),
            average_ms_per_game: per_game(self.total_ms),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct AnalyticsSummary {
    pub run_id: String,
    pub max_questions: usize,
    pub respondents: Vec<RespondentReport>,
    /// Every target seen, hardest first.
    pub targets: Vec<TargetReport>,
}

impl AnalyticsSummary {
    pub fn write_markdown(&self, path: impl AsRef<Path>) -> Result<(), AnalyticsError> {
        let mut rows = String::new();
        rows.push_str(&format!("# Simulation Summary: {}\n\n", self.run_id));
        rows.push_str(&format!(
            "Question budget: {} per game\n\n",
            self.max_questions
        ));
        rows.push_str("| Respondent | Kind | Games | Solved % | 95% CI | Avg questions | 95% CI | Avg wrong guesses | Avg ms/game |\n");
        rows.push_str("|------------|------|-------|----------|--------|---------------|--------|-------------------|-------------|\n");

        for report in &self.respondents {
            rows.push_str(&format!(
                "| {name} | {kind} | {games} | {rate:.1}% | [{lo:.1}%, {hi:.1}%] | {questions:.2} | [{q_lo:.2}, {q_hi:.2}] | {wrong:.2} | {ms:.2} |\n",
                name = report.name,
                kind = report.kind,
                games = report.games,
                rate = report.solve_rate * 100.0,
                lo = report.solve_ci95.0 * 100.0,
                hi = report.solve_ci95.1 * 100.0,
                questions = report.mean_questions,
                q_lo = report.questions_ci95.0,
                q_hi = report.questions_ci95.1,
                wrong = report.mean_wrong_guesses,
                ms = report.average_ms_per_game,
            ));
        }

        let hardest: Vec<&TargetReport> = self
            .targets
            .iter()
            .filter(|target| target.solved < target.games)
            .take(HARDEST_TARGETS)
            .collect();
        if !hardest.is_empty() {
            rows.push_str("\n## Hardest targets\n\n");
            rows.push_str("| Target | Games | Solved % |\n");
            rows.push_str("|--------|-------|----------|\n");
            for target in hardest {
                rows.push_str(&format!(
                    "| {} | {} | {:.1}% |\n",
                    target.target,
                    target.games,
                    target.solve_rate() * 100.0
                ));
            }
        }

        fs::write(path.as_ref(), rows).map_err(|e| AnalyticsError::Io {
            context: "writing summary markdown",
            source: e,
        })?;
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RespondentReport {
    pub name: String,
    pub kind: RespondentKind,
    pub games: usize,
    pub solved: usize,
    pub solve_rate: f64,
    pub solve_ci95: (f64, f64),
    pub mean_questions: f64,
    pub questions_ci95: (f64, f64),
    pub mean_wrong_guesses: f64,
    pub average_ms_per_game: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct TargetReport {
    pub target: String,
    pub games: usize,
    pub solved: usize,
}

impl TargetReport {
    pub fn solve_rate(&self) -> f64 {
        if self.games == 0 {
            0.0
        } else {
            self.solved as f64 / self.games as f64
        }
    }
}

/// Two-sided standard normal quantile for the given confidence level.
fn z_score(level: f64) -> Result<f64, AnalyticsError> {
    let normal =
        Normal::new(0.0, 1.0).map_err(|err| AnalyticsError::Distribution(err.to_string()))?;
    Ok(normal.inverse_cdf(1.0 - (1.0 - level) / 2.0))
}

/// Wilson score interval for `successes` out of `trials`.
fn wilson_interval(successes: usize, trials: usize, z: f64) -> (f64, f64) {
    if trials == 0 {
        return (0.0, 0.0);
    }
    let n = trials as f64;
    let p = successes as f64 / n;
    let z2 = z * z;
    let denom = 1.0 + z2 / n;
    let center = (p + z2 / (2.0 * n)) / denom;
    let margin = z * (p * (1.0 - p) / n + z2 / (4.0 * n * n)).sqrt() / denom;
    ((center - margin).max(0.0), (center + margin).min(1.0))
}

fn confidence_interval(values: &[f64], z: f64) -> (f64, f64) {
    if values.is_empty() {
        return (0.0, 0.0);
    }
    let mean = values.iter().sum::<f64>() / values.len() as f64;
    if values.len() == 1 {
        return (mean, mean);
    }
    let variance = values
        .iter()
        .map(|value| (value - mean).powi(2))
        .sum::<f64>()
        / (values.len() as f64 - 1.0);
    let std_error = (variance / values.len() as f64).sqrt();
    let margin = z * std_error;
    (mean - margin, mean + margin)
}
