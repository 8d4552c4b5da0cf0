//! Configuration management for Prism.
//!
//! Configuration is loaded and merged from multiple sources:
//! - Environment variables (`PRISM_*`)
//! - An optional YAML config file (`.prism/config.yaml`)
//! - Command-line flags (applied last via [`AppConfig::with_overrides`])
//!
//! The configuration is workspace-centric: corpus, model artifacts, and logs
//! all live relative to the workspace root unless overridden.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::{PrismError, PrismResult};

/// Main application configuration.
///
/// Holds every knob that affects pipeline behavior across the CLI and the
/// HTTP server. Constructed once at startup and passed by reference.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Path to the workspace root (contains .prism/, data/, logs/, models/)
    pub workspace: PathBuf,

    /// Optional config file path
    pub config_file: Option<PathBuf>,

    /// Path to the document corpus (one document per non-empty line)
    pub corpus_path: PathBuf,

    /// Path to the persisted ranking model artifact
    pub model_path: PathBuf,

    /// Path to the feedback interaction log (JSONL, append-only)
    pub feedback_log: PathBuf,

    /// Path to the per-query metrics log (JSONL, append-only)
    pub metrics_log: PathBuf,

    /// Path to the training event log (JSONL, append-only)
    pub training_log: PathBuf,

    /// Per-retriever candidate budget
    pub retrieval_top_k: usize,

    /// Number of ranked candidates handed to the synthesizer
    pub rank_top_k: usize,

    /// Confidence below which an answer is refused
    pub confidence_threshold: f32,

    /// Character budget for synthesized answer text
    pub max_answer_chars: usize,

    /// Lexical scorer selection: "bm25" or "overlap"
    pub lexical_scorer: String,

    /// Embedding provider settings
    pub embedding: EmbeddingSettings,

    /// HTTP server bind address
    pub server_bind: String,

    /// Drift-detection baselines
    pub baselines: Baselines,

    /// Minimum labeled interactions required before training runs
    pub min_feedback: usize,

    /// Log level override
    pub log_level: Option<String>,

    /// Verbose mode (enables debug logging)
    pub verbose: bool,

    /// Disable colored output
    pub no_color: bool,
}

/// Embedding provider configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingSettings {
    /// Provider name: "hash" (deterministic, offline) or "ollama"
    pub provider: String,

    /// Model identifier (meaningful for the ollama provider)
    pub model: String,

    /// Embedding vector dimension
    pub dimensions: usize,

    /// Ollama endpoint override
    pub endpoint: Option<String>,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            provider: "hash".to_string(),
            model: "hash-v1".to_string(),
            dimensions: 384,
            endpoint: None,
        }
    }
}

/// Baselines used by drift detection in the monitoring layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Baselines {
    /// P95 latency above this many milliseconds counts as drift
    pub latency_p95_ms: f64,

    /// Mean retrieval recall below this counts as drift
    pub recall_mean: f64,

    /// Refusal rate above this counts as drift
    pub refusal_rate: f64,
}

impl Default for Baselines {
    fn default() -> Self {
        Self {
            latency_p95_ms: 300.0,
            recall_mean: 0.75,
            refusal_rate: 0.08,
        }
    }
}

/// Full configuration file structure (.prism/config.yaml).
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ConfigFile {
    corpus: Option<CorpusSection>,
    retrieval: Option<RetrievalSection>,
    ranking: Option<RankingSection>,
    answer: Option<AnswerSection>,
    embedding: Option<EmbeddingSettings>,
    server: Option<ServerSection>,
    monitoring: Option<Baselines>,
    logging: Option<LoggingSection>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct CorpusSection {
    path: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct RetrievalSection {
    top_k: Option<usize>,
    lexical_scorer: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct RankingSection {
    top_k: Option<usize>,
    model_path: Option<String>,
    min_feedback: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct AnswerSection {
    confidence_threshold: Option<f32>,
    max_answer_chars: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ServerSection {
    bind: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct LoggingSection {
    level: Option<String>,
    color: Option<bool>,
}

impl Default for AppConfig {
    fn default() -> Self {
        let workspace = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        Self {
            corpus_path: workspace.join("data/internal_docs.md"),
            model_path: workspace.join("models/ranker.json"),
            feedback_log: workspace.join("logs/feedback.jsonl"),
            metrics_log: workspace.join("logs/metrics.jsonl"),
            training_log: workspace.join("models/training_log.jsonl"),
            workspace,
            config_file: None,
            retrieval_top_k: 50,
            rank_top_k: 5,
            confidence_threshold: 0.5,
            max_answer_chars: 256,
            lexical_scorer: "bm25".to_string(),
            embedding: EmbeddingSettings::default(),
            server_bind: "127.0.0.1:8080".to_string(),
            baselines: Baselines::default(),
            min_feedback: 50,
            log_level: None,
            verbose: false,
            no_color: false,
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables and defaults.
    ///
    /// Environment variables:
    /// - `PRISM_WORKSPACE`: Override workspace path
    /// - `PRISM_CONFIG`: Path to config file
    /// - `PRISM_CORPUS`: Path to the corpus file
    /// - `PRISM_BIND`: HTTP server bind address
    /// - `RUST_LOG`: Log level
    /// - `NO_COLOR`: Disable colored output
    pub fn load() -> PrismResult<Self> {
        let mut config = Self::default();

        if let Ok(workspace) = std::env::var("PRISM_WORKSPACE") {
            config = config.rebase(PathBuf::from(workspace));
        }

        if let Ok(config_file) = std::env::var("PRISM_CONFIG") {
            config.config_file = Some(PathBuf::from(config_file));
        }

        if !config.workspace.exists() {
            return Err(PrismError::Config(format!(
                "Workspace directory does not exist: {:?}",
                config.workspace
            )));
        }

        // Load from YAML config file if present
        let config_path = if let Some(ref cf) = config.config_file {
            cf.clone()
        } else {
            config.workspace.join(".prism/config.yaml")
        };

        if config_path.exists() {
            config = config.merge_yaml(&config_path)?;
        }

        // Environment variables override YAML config
        if let Ok(corpus) = std::env::var("PRISM_CORPUS") {
            config.corpus_path = PathBuf::from(corpus);
        }

        if let Ok(bind) = std::env::var("PRISM_BIND") {
            config.server_bind = bind;
        }

        config.log_level = std::env::var("RUST_LOG").ok();

        if std::env::var("NO_COLOR").is_ok() {
            config.no_color = true;
        }

        Ok(config)
    }

    /// Move the workspace root, re-anchoring every default-relative path.
    fn rebase(mut self, workspace: PathBuf) -> Self {
        self.corpus_path = workspace.join("data/internal_docs.md");
        self.model_path = workspace.join("models/ranker.json");
        self.feedback_log = workspace.join("logs/feedback.jsonl");
        self.metrics_log = workspace.join("logs/metrics.jsonl");
        self.training_log = workspace.join("models/training_log.jsonl");
        self.workspace = workspace;
        self
    }

    /// Merge YAML configuration file into this config.
    fn merge_yaml(&mut self, path: &PathBuf) -> PrismResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            PrismError::Config(format!("Failed to read config file {:?}: {}", path, e))
        })?;

        let config_file: ConfigFile = serde_yaml::from_str(&contents).map_err(|e| {
            PrismError::Config(format!("Failed to parse config file {:?}: {}", path, e))
        })?;

        let mut result = self.clone();

        if let Some(corpus) = config_file.corpus {
            if let Some(path) = corpus.path {
                result.corpus_path = result.workspace.join(path);
            }
        }

        if let Some(retrieval) = config_file.retrieval {
            if let Some(top_k) = retrieval.top_k {
                result.retrieval_top_k = top_k;
            }
            if let Some(scorer) = retrieval.lexical_scorer {
                result.lexical_scorer = scorer;
            }
        }

        if let Some(ranking) = config_file.ranking {
            if let Some(top_k) = ranking.top_k {
                result.rank_top_k = top_k;
            }
            if let Some(model_path) = ranking.model_path {
                result.model_path = result.workspace.join(model_path);
            }
            if let Some(min_feedback) = ranking.min_feedback {
                result.min_feedback = min_feedback;
            }
        }

        if let Some(answer) = config_file.answer {
            if let Some(threshold) = answer.confidence_threshold {
                result.confidence_threshold = threshold;
            }
            if let Some(max_chars) = answer.max_answer_chars {
                result.max_answer_chars = max_chars;
            }
        }

        if let Some(embedding) = config_file.embedding {
            result.embedding = embedding;
        }

        if let Some(server) = config_file.server {
            if let Some(bind) = server.bind {
                result.server_bind = bind;
            }
        }

        if let Some(monitoring) = config_file.monitoring {
            result.baselines = monitoring;
        }

        if let Some(logging) = config_file.logging {
            if let Some(level) = logging.level {
                result.log_level = Some(level);
            }
            if let Some(color) = logging.color {
                result.no_color = !color;
            }
        }

        Ok(result)
    }

    /// Apply CLI overrides to the configuration.
    ///
    /// CLI flags take precedence over environment variables and the YAML
    /// config file.
    pub fn with_overrides(
        mut self,
        workspace: Option<PathBuf>,
        config_file: Option<PathBuf>,
        corpus: Option<PathBuf>,
        log_level: Option<String>,
        verbose: bool,
        no_color: bool,
    ) -> Self {
        if let Some(workspace) = workspace {
            self = self.rebase(workspace);
        }

        if let Some(config_file) = config_file {
            self.config_file = Some(config_file);
        }

        if let Some(corpus) = corpus {
            self.corpus_path = corpus;
        }

        if let Some(log_level) = log_level {
            self.log_level = Some(log_level);
        }

        if verbose {
            self.verbose = true;
            // Verbose mode implies debug logging
            if self.log_level.is_none() {
                self.log_level = Some("debug".to_string());
            }
        }

        if no_color {
            self.no_color = true;
        }

        self
    }

    /// Validate pipeline knobs that have hard domain constraints.
    pub fn validate(&self) -> PrismResult<()> {
        if !(0.0..=1.0).contains(&self.confidence_threshold) {
            return Err(PrismError::Config(format!(
                "confidence_threshold must be in [0, 1], got {}",
                self.confidence_threshold
            )));
        }

        let known_scorers = ["bm25", "overlap"];
        if !known_scorers.contains(&self.lexical_scorer.as_str()) {
            return Err(PrismError::Config(format!(
                "Unknown lexical scorer: {}. Supported: {}",
                self.lexical_scorer,
                known_scorers.join(", ")
            )));
        }

        let known_providers = ["hash", "ollama"];
        if !known_providers.contains(&self.embedding.provider.as_str()) {
            return Err(PrismError::Config(format!(
                "Unknown embedding provider: {}. Supported: {}",
                self.embedding.provider,
                known_providers.join(", ")
            )));
        }

        if self.embedding.dimensions == 0 {
            return Err(PrismError::Config(
                "embedding dimensions must be non-zero".to_string(),
            ));
        }

        Ok(())
    }

    /// Get the path to the .prism directory.
    pub fn prism_dir(&self) -> PathBuf {
        self.workspace.join(".prism")
    }

    /// Ensure the state directories (.prism/, logs/, models/) exist.
    pub fn ensure_state_dirs(&self) -> PrismResult<()> {
        let mut dirs = vec![self.prism_dir()];
        for path in [&self.feedback_log, &self.metrics_log, &self.model_path] {
            if let Some(parent) = path.parent() {
                dirs.push(parent.to_path_buf());
            }
        }

        for dir in dirs {
            if !dir.exists() {
                std::fs::create_dir_all(&dir).map_err(|e| {
                    PrismError::Config(format!("Failed to create directory {:?}: {}", dir, e))
                })?;
            }
        }
        Ok(())
    }
}
