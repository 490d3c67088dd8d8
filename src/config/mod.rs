//! Configuration management.
//!
//! [`EngineConfig`] is assembled from defaults, an optional TOML file and
//! `MODELSCOUT_*` environment overrides, in that order.
//!
//! ```toml
//! [classifier]
//! use_llm = true
//! llm_timeout_ms = 1500
//!
//! [dispatch]
//! text_limit = 10
//! default_dimensions = ["architecture", "performance"]
//!
//! [llm]
//! provider = "ollama"
//! model = "llama3:latest"
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable naming an explicit config file.
pub const CONFIG_PATH_ENV: &str = "MODELSCOUT_CONFIG_PATH";

/// Main configuration for modelscout.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EngineConfig {
    /// Intent classifier settings.
    pub classifier: ClassifierConfig,
    /// Dispatcher settings.
    pub dispatch: DispatchConfig,
    /// External LLM service settings.
    pub llm: LlmConfig,
    /// Logging settings.
    pub logging: LoggingConfig,
    /// Metrics settings.
    pub metrics: MetricsConfig,
}

/// Intent classifier settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClassifierConfig {
    /// Consult the external LLM service before the rule tier.
    pub use_llm: bool,
    /// Timeout for each LLM call.
    pub llm_timeout_ms: u64,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            use_llm: false,
            llm_timeout_ms: 2_000,
        }
    }
}

/// Dispatcher settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DispatchConfig {
    /// Default result limit for text search.
    pub text_limit: usize,
    /// Default result limit for image search.
    pub image_limit: usize,
    /// Default result limit for metadata search.
    pub metadata_limit: usize,
    /// Collection holding model scripts and metadata.
    pub scripts_collection: String,
    /// Collection holding generated images.
    pub images_collection: String,
    /// Seconds added to "now" for a notebook's estimated completion.
    pub notebook_eta_secs: u64,
    /// Comparison dimensions used when the query names none.
    pub default_dimensions: Vec<String>,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            text_limit: 10,
            image_limit: 20,
            metadata_limit: 20,
            scripts_collection: "model_scripts".to_string(),
            images_collection: "generated_images".to_string(),
            notebook_eta_secs: 300,
            default_dimensions: vec!["architecture".to_string(), "performance".to_string()],
        }
    }
}

/// Available LLM backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LlmBackend {
    /// Ollama (local).
    #[default]
    Ollama,
    /// No external service.
    Disabled,
}

impl LlmBackend {
    /// Parses a backend string.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "ollama" => Self::Ollama,
            "none" | "disabled" | "off" => Self::Disabled,
            other => {
                tracing::warn!(provider = other, "Unknown LLM provider, disabling LLM tier");
                Self::Disabled
            },
        }
    }
}

/// External LLM service settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LlmConfig {
    /// Backend.
    pub provider: LlmBackend,
    /// Model name.
    pub model: String,
    /// Service URL.
    pub base_url: String,
    /// HTTP request timeout (0 disables).
    pub timeout_ms: u64,
    /// HTTP connect timeout (0 disables).
    pub connect_timeout_ms: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: LlmBackend::Ollama,
            model: "llama3:latest".to_string(),
            base_url: "http://localhost:11434".to_string(),
            timeout_ms: 30_000,
            connect_timeout_ms: 3_000,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable.
    #[default]
    Pretty,
    /// One JSON object per line.
    Json,
}

impl LogFormat {
    /// Parses a format string, defaulting to pretty.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        if s.trim().eq_ignore_ascii_case("json") {
            Self::Json
        } else {
            Self::Pretty
        }
    }
}

/// Logging settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LoggingConfig {
    /// Filter directive (`info`, `modelscout=debug`).
    pub level: Option<String>,
    /// Output format.
    pub format: LogFormat,
    /// Optional log file; stderr otherwise.
    pub file: Option<PathBuf>,
}

/// Metrics settings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MetricsConfig {
    /// Install the Prometheus recorder.
    pub enabled: bool,
}

/// Configuration file structure (for TOML parsing).
#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    /// Classifier section.
    pub classifier: Option<ConfigFileClassifier>,
    /// Dispatch section.
    pub dispatch: Option<ConfigFileDispatch>,
    /// LLM section.
    pub llm: Option<ConfigFileLlm>,
    /// Logging section.
    pub logging: Option<ConfigFileLogging>,
    /// Metrics section.
    pub metrics: Option<ConfigFileMetrics>,
}

/// Classifier section in config file.
#[derive(Debug, Deserialize, Default)]
pub struct ConfigFileClassifier {
    /// Use the LLM tier.
    pub use_llm: Option<bool>,
    /// LLM timeout.
    pub llm_timeout_ms: Option<u64>,
}

/// Dispatch section in config file.
#[derive(Debug, Deserialize, Default)]
pub struct ConfigFileDispatch {
    /// Text search limit.
    pub text_limit: Option<usize>,
    /// Image search limit.
    pub image_limit: Option<usize>,
    /// Metadata search limit.
    pub metadata_limit: Option<usize>,
    /// Scripts collection.
    pub scripts_collection: Option<String>,
    /// Images collection.
    pub images_collection: Option<String>,
    /// Notebook ETA.
    pub notebook_eta_secs: Option<u64>,
    /// Default comparison dimensions.
    pub default_dimensions: Option<Vec<String>>,
}

/// LLM section in config file.
#[derive(Debug, Deserialize, Default)]
pub struct ConfigFileLlm {
    /// Provider name.
    pub provider: Option<String>,
    /// Model name.
    pub model: Option<String>,
    /// Base URL.
    pub base_url: Option<String>,
    /// Request timeout.
    pub timeout_ms: Option<u64>,
    /// Connect timeout.
    pub connect_timeout_ms: Option<u64>,
}

/// Logging section in config file.
#[derive(Debug, Deserialize, Default)]
pub struct ConfigFileLogging {
    /// Filter directive.
    pub level: Option<String>,
    /// `pretty` or `json`.
    pub format: Option<String>,
    /// Log file path.
    pub file: Option<String>,
}

/// Metrics section in config file.
#[derive(Debug, Deserialize, Default)]
pub struct ConfigFileMetrics {
    /// Enable metrics.
    pub enabled: Option<bool>,
}

impl EngineConfig {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from a file path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_from_file(path: &Path) -> crate::Result<Self> {
        let contents =
            std::fs::read_to_string(path).map_err(|e| crate::Error::OperationFailed {
                operation: "read_config_file".to_string(),
                cause: format!("{}: {e}", path.display()),
            })?;

        Self::from_toml(&contents)
    }

    /// Parses configuration from TOML text.
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not a valid config file.
    pub fn from_toml(contents: &str) -> crate::Result<Self> {
        let file: ConfigFile =
            toml::from_str(contents).map_err(|e| crate::Error::OperationFailed {
                operation: "parse_config_file".to_string(),
                cause: e.to_string(),
            })?;

        Ok(Self::from_config_file(file))
    }

    /// Default config file locations, most specific first:
    /// 1. Platform-specific config dir (`~/Library/Application Support/modelscout/` on macOS)
    /// 2. XDG config dir (`~/.config/modelscout/` for Unix compatibility)
    #[must_use]
    pub fn default_paths() -> Vec<PathBuf> {
        let Some(base_dirs) = directories::BaseDirs::new() else {
            return Vec::new();
        };
        vec![
            base_dirs.config_dir().join("modelscout").join("config.toml"),
            base_dirs
                .home_dir()
                .join(".config")
                .join("modelscout")
                .join("config.toml"),
        ]
    }

    /// Returns the first default location that exists.
    #[must_use]
    pub fn default_path() -> Option<PathBuf> {
        Self::default_paths().into_iter().find(|path| path.exists())
    }

    /// Loads configuration from the default location.
    ///
    /// Returns default configuration if no readable config file is found.
    #[must_use]
    pub fn load_default() -> Self {
        for path in Self::default_paths().iter().filter(|path| path.exists()) {
            match Self::load_from_file(path) {
                Ok(config) => return config,
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "Ignoring unreadable config file");
                },
            }
        }

        Self::default()
    }

    /// Resolves configuration for the binary.
    ///
    /// An explicit path wins, then `MODELSCOUT_CONFIG_PATH`, then the default
    /// locations. Environment overrides are applied last.
    ///
    /// # Errors
    ///
    /// Returns an error if an explicitly named file cannot be loaded.
    pub fn load(explicit: Option<&Path>) -> crate::Result<Self> {
        let from_env = std::env::var(CONFIG_PATH_ENV).ok().map(PathBuf::from);
        let config = match explicit.map(Path::to_path_buf).or(from_env) {
            Some(path) => Self::load_from_file(&path)?,
            None => Self::load_default(),
        };
        Ok(config.with_env_overrides())
    }

    /// Applies `MODELSCOUT_*` environment overrides.
    #[must_use]
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides_from(|key| std::env::var(key).ok())
    }

    /// Applies overrides from an arbitrary variable lookup.
    #[must_use]
    pub fn with_overrides_from(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        fn parse_bool(value: &str) -> Option<bool> {
            match value.trim().to_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => Some(true),
                "0" | "false" | "no" | "off" => Some(false),
                _ => None,
            }
        }

        if let Some(v) = lookup("MODELSCOUT_USE_LLM").as_deref().and_then(parse_bool) {
            self.classifier.use_llm = v;
        }
        if let Some(v) = lookup("MODELSCOUT_LLM_TIMEOUT_MS").and_then(|v| v.parse().ok()) {
            self.classifier.llm_timeout_ms = v;
        }
        if let Some(v) = lookup("MODELSCOUT_LLM_PROVIDER") {
            self.llm.provider = LlmBackend::parse(&v);
        }
        if let Some(v) = lookup("MODELSCOUT_LLM_MODEL") {
            self.llm.model = v;
        }
        if let Some(v) = lookup("MODELSCOUT_LLM_BASE_URL").or_else(|| lookup("OLLAMA_HOST")) {
            self.llm.base_url = v;
        }
        if let Some(v) = lookup("MODELSCOUT_LOG_FORMAT") {
            self.logging.format = LogFormat::parse(&v);
        }
        if let Some(v) = lookup("MODELSCOUT_LOG_FILE") {
            self.logging.file = Some(PathBuf::from(v));
        }
        if let Some(v) = lookup("MODELSCOUT_METRICS_ENABLED").as_deref().and_then(parse_bool) {
            self.metrics.enabled = v;
        }
        self
    }

    /// Converts a `ConfigFile` to `EngineConfig`.
    fn from_config_file(file: ConfigFile) -> Self {
        let mut config = Self::default();

        if let Some(classifier) = file.classifier {
            if let Some(v) = classifier.use_llm {
                config.classifier.use_llm = v;
            }
            if let Some(v) = classifier.llm_timeout_ms {
                config.classifier.llm_timeout_ms = v;
            }
        }
        if let Some(dispatch) = file.dispatch {
            let d = &mut config.dispatch;
            if let Some(v) = dispatch.text_limit.filter(|v| *v > 0) {
                d.text_limit = v;
            }
            if let Some(v) = dispatch.image_limit.filter(|v| *v > 0) {
                d.image_limit = v;
            }
            if let Some(v) = dispatch.metadata_limit.filter(|v| *v > 0) {
                d.metadata_limit = v;
            }
            if let Some(v) = dispatch.scripts_collection {
                d.scripts_collection = v;
            }
            if let Some(v) = dispatch.images_collection {
                d.images_collection = v;
            }
            if let Some(v) = dispatch.notebook_eta_secs {
                d.notebook_eta_secs = v;
            }
            if let Some(v) = dispatch.default_dimensions.filter(|v| !v.is_empty()) {
                d.default_dimensions = v;
            }
        }
        if let Some(llm) = file.llm {
            if let Some(provider) = llm.provider {
                config.llm.provider = LlmBackend::parse(&provider);
            }
            if let Some(v) = llm.model {
                config.llm.model = v;
            }
            if let Some(v) = llm.base_url {
                config.llm.base_url = v;
            }
            if let Some(v) = llm.timeout_ms {
                config.llm.timeout_ms = v;
            }
            if let Some(v) = llm.connect_timeout_ms {
                config.llm.connect_timeout_ms = v;
            }
        }
        if let Some(logging) = file.logging {
            config.logging.level = logging.level;
            if let Some(v) = logging.format {
                config.logging.format = LogFormat::parse(&v);
            }
            config.logging.file = logging.file.map(PathBuf::from);
        }
        if let Some(metrics) = file.metrics {
            config.metrics.enabled = metrics.enabled.unwrap_or(false);
        }

        config
    }

    /// Enables or disables the LLM classifier tier.
    #[must_use]
    pub const fn with_llm(mut self, enabled: bool) -> Self {
        self.classifier.use_llm = enabled;
        self
    }
}
