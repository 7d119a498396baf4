use indinator_bot::{RespondentKind, RespondentParams};
use indinator_core::EngineConfig;
use indinator_core::kb::{KnowledgeFiles, LikelihoodFile};
use indinator_core::model::likelihood::TraitModel;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::Level;

const RUN_ID_ALLOWED: &str = "abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789._-";

/// Root benchmark configuration loaded from YAML.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct BenchmarkConfig {
    pub run_id: String,
    pub games: GamesConfig,
    pub knowledge: KnowledgeConfig,
    #[serde(default)]
    pub engine: EngineConfig,
    pub respondents: Vec<RespondentConfig>,
    pub outputs: OutputsConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl BenchmarkConfig {
    /// Load configuration from a YAML file on disk. Relative knowledge paths
    /// are resolved against the directory holding the file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let path_buf = path.to_path_buf();
        let file = File::open(path).map_err(|source| ConfigError::Read {
            source,
            path: path_buf.clone(),
        })?;
        let reader = BufReader::new(file);
        let mut cfg: BenchmarkConfig =
            serde_yaml::from_reader(reader).map_err(|source| ConfigError::Parse {
                source,
                path: path_buf.clone(),
            })?;
        if let Some(base) = path.parent() {
            cfg.knowledge.rebase(base);
        }
        cfg.validate().map_err(|source| ConfigError::Invalid {
            path: path_buf,
            source,
        })?;
        Ok(cfg)
    }

    /// Validate the configuration without performing I/O.
    pub fn validate(&mut self) -> Result<(), ValidationError> {
        validate_run_id(&self.run_id)?;
        self.games.validate()?;
        self.knowledge.validate()?;
        self.engine
            .validate()
            .map_err(|err| ValidationError::InvalidField {
                field: "engine".to_string(),
                message: err.to_string(),
            })?;
        self.outputs.validate(&self.run_id)?;
        self.logging.normalize();
        validate_respondents(&self.respondents)?;
        Ok(())
    }

    /// Resolve output templates (e.g., `{run_id}` placeholders) into concrete paths.
    pub fn resolved_outputs(&self) -> ResolvedOutputs {
        ResolvedOutputs {
            jsonl: resolve_template(&self.run_id, &self.outputs.jsonl),
            summary_md: resolve_template(&self.run_id, &self.outputs.summary_md),
        }
    }
}

/// How many games to play and which targets the respondents hold in mind.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct GamesConfig {
    pub seed: Option<u64>,
    pub count: usize,
    #[serde(default)]
    pub targets: TargetMode,
}

impl GamesConfig {
    fn validate(&self) -> Result<(), ValidationError> {
        if self.count == 0 {
            return Err(ValidationError::InvalidField {
                field: "games.count".to_string(),
                message: "number of games must be greater than zero".to_string(),
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TargetMode {
    /// Cycle through the entities in catalog order.
    #[default]
    RoundRobin,
    /// Draw each target from the entity priors.
    Prior,
}

/// Knowledge base documents. Exactly one of `likelihoods` and `traits` is set.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct KnowledgeConfig {
    pub entities: PathBuf,
    pub questions: PathBuf,
    #[serde(default)]
    pub likelihoods: Option<PathBuf>,
    #[serde(default)]
    pub traits: Option<PathBuf>,
    #[serde(default)]
    pub trait_model: TraitModel,
}

impl KnowledgeConfig {
    fn validate(&self) -> Result<(), ValidationError> {
        match (&self.likelihoods, &self.traits) {
            (Some(_), Some(_)) => Err(ValidationError::InvalidField {
                field: "knowledge".to_string(),
                message: "set either likelihoods or traits, not both".to_string(),
            }),
            (None, None) => Err(ValidationError::InvalidField {
                field: "knowledge".to_string(),
                message: "one of likelihoods or traits is required".to_string(),
            }),
            _ => Ok(()),
        }
    }

    fn rebase(&mut self, base: &Path) {
        let join = |path: &mut PathBuf| {
            if path.is_relative() {
                *path = base.join(&*path);
            }
        };
        join(&mut self.entities);
        join(&mut self.questions);
        if let Some(path) = self.likelihoods.as_mut() {
            join(path);
        }
        if let Some(path) = self.traits.as_mut() {
            join(path);
        }
    }

    pub fn files(&self) -> Option<KnowledgeFiles> {
        let likelihoods = match (&self.likelihoods, &self.traits) {
            (Some(path), None) => LikelihoodFile::Table(path.clone()),
            (None, Some(path)) => LikelihoodFile::Traits(path.clone()),
            _ => return None,
        };
        Some(KnowledgeFiles {
            entities: self.entities.clone(),
            questions: self.questions.clone(),
            likelihoods,
        })
    }
}

/// Definition of a simulated player.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct RespondentConfig {
    pub name: String,
    pub kind: RespondentKind,
    #[serde(default)]
    pub params: RespondentParams,
}

/// Output artifact configuration.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct OutputsConfig {
    pub jsonl: String,
    pub summary_md: String,
}

impl OutputsConfig {
    fn validate(&self, run_id: &str) -> Result<(), ValidationError> {
        for (label, value) in [
            ("outputs.jsonl", &self.jsonl),
            ("outputs.summary_md", &self.summary_md),
        ] {
            if value.trim().is_empty() {
                return Err(ValidationError::InvalidField {
                    field: label.to_string(),
                    message: "path must not be empty".to_string(),
                });
            }

            let resolved = resolve_template(run_id, value);
            if resolved.components().count() == 0 {
                return Err(ValidationError::InvalidField {
                    field: label.to_string(),
                    message: "resolved path is invalid".to_string(),
                });
            }
        }
        Ok(())
    }
}

/// Logging configuration defaults to disabled structured logs.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct LoggingConfig {
    #[serde(default)]
    pub enable_structured: bool,
    #[serde(default = "default_tracing_level")]
    pub tracing_level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enable_structured: false,
            tracing_level: default_tracing_level(),
        }
    }
}

impl LoggingConfig {
    fn normalize(&mut self) {
        if self.tracing_level.trim().is_empty() {
            self.tracing_level = default_tracing_level();
        }
    }

    pub fn level(&self) -> Option<Level> {
        match self.tracing_level.to_ascii_lowercase().as_str() {
            "trace" => Some(Level::TRACE),
            "debug" => Some(Level::DEBUG),
            "info" => Some(Level::INFO),
            "warn" | "warning" => Some(Level::WARN),
            "error" => Some(Level::ERROR),
            _ => None,
        }
    }
}

fn default_tracing_level() -> String {
    "info".to_string()
}

fn validate_run_id(run_id: &str) -> Result<(), ValidationError> {
    if run_id.trim().is_empty() {
        return Err(ValidationError::InvalidField {
            field: "run_id".to_string(),
            message: "run_id must not be empty".to_string(),
        });
    }

    if !run_id.chars().all(|c| RUN_ID_ALLOWED.contains(c)) {
        return Err(ValidationError::InvalidField {
            field: "run_id".to_string(),
            message: "run_id may only contain alphanumeric characters, '.', '_' or '-'".to_string(),
        });
    }

    Ok(())
}

fn validate_respondents(respondents: &[RespondentConfig]) -> Result<(), ValidationError> {
    if respondents.is_empty() {
        return Err(ValidationError::InvalidField {
            field: "respondents".to_string(),
            message: "at least one respondent must be specified".to_string(),
        });
    }

    let mut seen = HashSet::new();
    for respondent in respondents {
        if respondent.name.trim().is_empty() {
            return Err(ValidationError::InvalidField {
                field: "respondents.name".to_string(),
                message: "respondent name must not be empty".to_string(),
            });
        }

        if !respondent
            .name
            .chars()
            .all(|c| RUN_ID_ALLOWED.contains(c) || c == '/')
        {
            return Err(ValidationError::InvalidField {
                field: format!("respondents[{}].name", respondent.name),
                message: "respondent name contains invalid characters".to_string(),
            });
        }

        if !seen.insert(respondent.name.clone()) {
            return Err(ValidationError::InvalidField {
                field: "respondents".to_string(),
                message: format!("respondent name '{}' defined more than once", respondent.name),
            });
        }

        respondent
            .params
            .validate()
            .map_err(|message| ValidationError::InvalidField {
                field: format!("respondents[{}].params", respondent.name),
                message,
            })?;
    }

    Ok(())
}

fn resolve_template(run_id: &str, template: &str) -> PathBuf {
    let replaced = template.replace("{run_id}", run_id);
    PathBuf::from(replaced)
}

/// Fully resolved output paths.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedOutputs {
    pub jsonl: PathBuf,
    pub summary_md: PathBuf,
}

impl ResolvedOutputs {
    /// Directory receiving the summary and structured telemetry.
    pub fn report_dir(&self) -> PathBuf {
        self.summary_md
            .parent()
            .filter(|dir| !dir.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."))
    }
}

/// Errors surfaced when loading configuration files.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path:?}: {source}")]
    Read {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },
    #[error("failed to parse config {path:?}: {source}")]
    Parse {
        #[source]
        source: serde_yaml::Error,
        path: PathBuf,
    },
    #[error("invalid configuration in {path:?}: {source}")]
    Invalid {
        path: PathBuf,
        source: ValidationError,
    },
}

impl ConfigError {
    pub fn path(&self) -> &Path {
        match self {
            ConfigError::Read { path, .. }
            | ConfigError::Parse { path, .. }
            | ConfigError::Invalid { path, .. } => path.as_path(),
        }
    }
}

/// Validation failures captured with contextual metadata.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("{field}: {message}")]
    InvalidField { field: String, message: String },
}
