//! Binary entry point for modelscout.
//!
//! Every command prints one JSON document on stdout; logs go to stderr or
//! the configured log file.

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(missing_docs)]
// Allow print_stderr in main binary for CLI output
#![allow(clippy::print_stderr)]
#![allow(clippy::print_stdout)]
// Allow needless_pass_by_value for command functions
#![allow(clippy::needless_pass_by_value)]
// Allow multiple crate versions from transitive dependencies
#![allow(clippy::multiple_crate_versions)]

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use modelscout::config::EngineConfig;
use modelscout::embedding::HashEmbedder;
use modelscout::llm::build_provider;
use modelscout::observability::{self, InitOptions, MetricsAnalytics};
use modelscout::security::{Role, RoleBasedAccessControl};
use modelscout::storage::MemoryVectorStore;
use modelscout::{Intent, QueryEngine, QueryParser};
use serde::Serialize;
use std::io;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

/// modelscout - understand and answer questions about a model catalog.
#[derive(Parser)]
#[command(name = "modelscout")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to configuration file.
    #[arg(short, long, global = true, env = "MODELSCOUT_CONFIG_PATH")]
    config: Option<PathBuf>,

    /// Print a Prometheus metrics snapshot to stderr on exit.
    #[arg(long, global = true)]
    metrics: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Available commands.
#[derive(Subcommand)]
enum Commands {
    /// Classify the intent of a query.
    Classify {
        /// The query text.
        text: String,
    },

    /// Extract search parameters from a query.
    Extract {
        /// The query text.
        text: String,

        /// Intent to extract for (classified when omitted).
        #[arg(short, long)]
        intent: Option<String>,
    },

    /// Classify, extract and preprocess a query.
    Parse {
        /// The query text.
        text: String,
    },

    /// Answer a query against a JSON catalog.
    Query {
        /// The query text.
        text: String,

        /// Catalog file: collection name to list of records.
        #[arg(long)]
        catalog: PathBuf,

        /// User on whose behalf to search; enables access control.
        #[arg(short, long)]
        user: Option<String>,

        /// Role granted to the user (admin, researcher, viewer).
        #[arg(short, long, requires = "user")]
        role: Option<String>,
    },

    /// Manage configuration.
    Config {
        /// Show the effective configuration.
        #[arg(long)]
        show: bool,
    },

    /// Generate shell completions.
    Completions {
        /// Target shell.
        shell: Shell,
    },
}

#[derive(Serialize)]
struct ClassifyOutput<'a> {
    text: &'a str,
    intent: Intent,
    source: modelscout::models::DetectionSource,
}

/// Main entry point.
fn main() -> ExitCode {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    if let Commands::Completions { shell } = &cli.command {
        clap_complete::generate(*shell, &mut Cli::command(), "modelscout", &mut io::stdout());
        return ExitCode::SUCCESS;
    }

    let config = match EngineConfig::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            return ExitCode::FAILURE;
        },
    };

    let observability = match observability::init(
        &config,
        InitOptions {
            verbose: cli.verbose,
            metrics: cli.metrics,
        },
    ) {
        Ok(handle) => handle,
        Err(e) => {
            eprintln!("Failed to initialize logging: {e}");
            return ExitCode::FAILURE;
        },
    };

    let result = run(cli.command, config);

    if cli.metrics {
        if let Some(snapshot) = observability.render_metrics() {
            eprintln!("{snapshot}");
        }
    }

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "Command failed");
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        },
    }
}

fn run(command: Commands, config: EngineConfig) -> Result<()> {
    match command {
        Commands::Classify { text } => cmd_classify(&config, &text),
        Commands::Extract { text, intent } => cmd_extract(&config, &text, intent.as_deref()),
        Commands::Parse { text } => cmd_parse(&config, &text),
        Commands::Query {
            text,
            catalog,
            user,
            role,
        } => cmd_query(config, &text, &catalog, user.as_deref(), role.as_deref()),
        Commands::Config { show } => cmd_config(&config, show),
        Commands::Completions { .. } => Ok(()),
    }
}

fn parser(config: &EngineConfig) -> QueryParser {
    let provider = if config.classifier.use_llm {
        build_provider(&config.llm)
    } else {
        None
    };
    QueryParser::from_config(&config.classifier, provider)
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let rendered = serde_json::to_string_pretty(value).context("serializing output")?;
    println!("{rendered}");
    Ok(())
}

fn cmd_classify(config: &EngineConfig, text: &str) -> Result<()> {
    let classification = parser(config).classifier().classify(text);
    print_json(&ClassifyOutput {
        text,
        intent: classification.intent,
        source: classification.source,
    })
}

fn cmd_extract(config: &EngineConfig, text: &str, intent: Option<&str>) -> Result<()> {
    let parser = parser(config);
    let intent = match intent {
        Some(name) => Intent::parse(name).with_context(|| format!("unknown intent '{name}'"))?,
        None => parser.classifier().classify(text).intent,
    };
    print_json(&parser.extractor().extract(text, intent))
}

fn cmd_parse(config: &EngineConfig, text: &str) -> Result<()> {
    print_json(&parser(config).parse(text))
}

fn cmd_query(
    config: EngineConfig,
    text: &str,
    catalog: &Path,
    user: Option<&str>,
    role: Option<&str>,
) -> Result<()> {
    let embedder = HashEmbedder::new();
    let store = MemoryVectorStore::load_catalog(catalog, &embedder)
        .with_context(|| format!("loading catalog {}", catalog.display()))?;

    let mut access_control = RoleBasedAccessControl::new();
    if let (Some(user), Some(role)) = (user, role) {
        let role = Role::parse(role).with_context(|| format!("unknown role '{role}'"))?;
        access_control = access_control.with_assignment(user, role);
    }

    let embedder = Arc::new(embedder);
    let engine = QueryEngine::builder(config)
        .vector_store(Arc::new(store))
        .text_embedder(embedder.clone())
        .image_embedder(embedder)
        .access_control(Arc::new(access_control))
        .analytics(Arc::new(MetricsAnalytics::new()))
        .build()?;

    let runtime = tokio::runtime::Runtime::new().context("starting async runtime")?;
    let answer = runtime.block_on(engine.answer(text, user));
    print_json(&answer)
}

fn cmd_config(config: &EngineConfig, show: bool) -> Result<()> {
    if show {
        print_json(config)
    } else {
        let path = EngineConfig::default_path()
            .map_or_else(|| "<none>".to_string(), |p| p.display().to_string());
        print_json(&serde_json::json!({ "default_path": path }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_query_arguments() {
        let cli = Cli::try_parse_from([
            "modelscout", "query", "compare gpt-2 and bert", "--catalog", "catalog.json",
            "--user", "lead", "--role", "researcher", "--verbose",
        ])
        .unwrap();

        assert!(cli.verbose);
        let Commands::Query { text, catalog, user, role } = cli.command else {
            panic!("expected the query command");
        };
        assert_eq!(text, "compare gpt-2 and bert");
        assert_eq!(catalog, PathBuf::from("catalog.json"));
        assert_eq!(user.as_deref(), Some("lead"));
        assert_eq!(role.as_deref(), Some("researcher"));
    }

    #[test]
    fn test_role_requires_user() {
        let result = Cli::try_parse_from([
            "modelscout", "query", "bert", "--catalog", "catalog.json", "--role", "admin",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_query_requires_catalog() {
        assert!(Cli::try_parse_from(["modelscout", "query", "bert"]).is_err());
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli =
            Cli::try_parse_from(["modelscout", "extract", "top 5 bert", "-i", "retrieval", "--metrics"])
                .unwrap();
        assert!(cli.metrics);
        assert!(matches!(
            cli.command,
            Commands::Extract { intent: Some(ref intent), .. } if intent == "retrieval"
        ));
    }

    #[test]
    fn test_cmd_query_rejects_unknown_role() {
        let mut catalog = tempfile::NamedTempFile::new().unwrap();
        catalog.write_all(br#"{"model_scripts": []}"#).unwrap();

        let err = cmd_query(
            EngineConfig::default(),
            "find bert",
            catalog.path(),
            Some("lead"),
            Some("overlord"),
        )
        .unwrap_err();
        assert!(err.to_string().contains("unknown role 'overlord'"));
    }

    #[test]
    fn test_cmd_query_reports_missing_catalog() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("absent.json");
        let err = cmd_query(EngineConfig::default(), "find bert", &missing, None, None).unwrap_err();
        assert!(err.to_string().starts_with("loading catalog"));
    }
}
