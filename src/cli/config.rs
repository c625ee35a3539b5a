use std::path::Path;

use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::matcher::ai_model::ModelSettings;
use crate::resume::keywords::{KeywordTableError, KeywordTables};
use crate::screen::scanner::ScanOptions;
use crate::session::session::{Analyzer, SessionConfig};

pub const DEFAULT_CONFIG_PATH: &str = "resume-autofill.yaml";

// ============================================================================
// CLI Argument Parsing (clap derive)
// ============================================================================

#[derive(Parser, Debug)]
#[command(
    name = "resume-autofill",
    version,
    about = "Fill job-application forms from structured resume data"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to config file (default: resume-autofill.yaml in current dir)
    #[arg(long, global = true)]
    pub config: Option<String>,

    /// Classifier provider (deepseek, kimi, qwen, zhipu, baichuan, volcengine, custom)
    #[arg(long, global = true)]
    pub provider: Option<String>,

    /// Classifier model name
    #[arg(long, global = true)]
    pub model: Option<String>,

    /// Classifier API key
    #[arg(long, global = true)]
    pub api_key: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List the fillable fields of a page snapshot
    Scan {
        /// Page snapshot JSON
        #[arg(long)]
        page: String,
    },

    /// Flatten a resume into matchable fields
    Flatten {
        /// Resume JSON
        #[arg(long)]
        resume: String,
    },

    /// Match a resume against a page snapshot and fill it
    Fill {
        /// Page snapshot JSON
        #[arg(long)]
        page: String,

        /// Resume JSON (default: the resume saved in --store)
        #[arg(long, required_unless_present = "store")]
        resume: Option<String>,

        /// Key-value store holding resumeData and modelSettings
        #[arg(long)]
        store: Option<String>,

        /// Field matcher: local or llm
        #[arg(long, default_value = "local")]
        analyzer: String,

        /// Write the filled page snapshot here
        #[arg(short, long)]
        output: Option<String>,
    },

    /// Answer NDJSON requests on stdin against a page snapshot
    Serve {
        /// Page snapshot JSON
        #[arg(long)]
        page: String,

        /// Key-value store holding resumeData and modelSettings
        #[arg(long)]
        store: Option<String>,

        /// Field matcher: local or llm
        #[arg(long, default_value = "llm")]
        analyzer: String,

        /// Write the final page snapshot here when input ends
        #[arg(short, long)]
        output: Option<String>,
    },

    /// Send one short prompt to the configured classifier provider
    TestConnection {
        /// Key-value store holding modelSettings
        #[arg(long)]
        store: Option<String>,
    },

    /// Save a resume into the key-value store
    Import {
        /// Store file (JSON object)
        #[arg(long)]
        store: String,

        /// Resume JSON
        #[arg(long)]
        resume: String,
    },
}

// ============================================================================
// Config File Model (optional YAML)
// ============================================================================

/// Optional YAML config file: `resume-autofill.yaml`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub classifier: ModelSettings,
    #[serde(default)]
    pub scan: ScanConfig,
    /// Keyword-table YAML replacing the built-in tables.
    #[serde(default)]
    pub keywords: Option<String>,
    /// JSONL trace output.
    #[serde(default)]
    pub trace: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanConfig {
    #[serde(default = "default_custom_hosts")]
    pub custom_component_hosts: Vec<String>,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            custom_component_hosts: default_custom_hosts(),
        }
    }
}

fn default_custom_hosts() -> Vec<String> {
    ScanOptions::default().custom_component_hosts
}

// ============================================================================
// Config File Loading
// ============================================================================

/// Load config from a YAML file. Returns defaults if file is missing or malformed.
pub fn load_config(path: Option<&str>) -> AppConfig {
    let config_path = path.unwrap_or(DEFAULT_CONFIG_PATH);
    match std::fs::read_to_string(config_path) {
        Ok(content) => match serde_yaml::from_str(&content) {
            Ok(config) => config,
            Err(e) => {
                warn!("ignoring malformed config '{}': {}", config_path, e);
                AppConfig::default()
            }
        },
        Err(e) => {
            debug!("no config at '{}': {}", config_path, e);
            AppConfig::default()
        }
    }
}

// ============================================================================
// Config Builders (merge CLI args with config file)
// ============================================================================

/// Classifier settings: CLI flags over the config file.
pub fn resolve_classifier(cli: &Cli, config: &AppConfig) -> ModelSettings {
    let flags = ModelSettings {
        provider: cli.provider.clone(),
        model: cli.model.clone(),
        api_key: cli.api_key.clone(),
        ..Default::default()
    };
    flags.over(&config.classifier)
}

pub fn parse_analyzer(name: &str) -> Result<Analyzer, String> {
    match name {
        "local" => Ok(Analyzer::Local),
        "llm" => Ok(Analyzer::Llm),
        other => Err(format!("Unknown analyzer '{}'. Use 'local' or 'llm'.", other)),
    }
}

/// Keyword tables from the configured file, or the built-in ones.
pub fn load_keyword_tables(config: &AppConfig) -> Result<KeywordTables, KeywordTableError> {
    match &config.keywords {
        Some(path) => KeywordTables::load(Path::new(path)),
        None => Ok(KeywordTables::builtin()),
    }
}

/// Build a session configuration from resolved CLI/config values.
pub fn build_session_config(
    config: &AppConfig,
    classifier: ModelSettings,
    analyzer: Analyzer,
) -> Result<SessionConfig, KeywordTableError> {
    let tables = load_keyword_tables(config)?;
    Ok(SessionConfig {
        scan: ScanOptions {
            custom_component_hosts: config.scan.custom_component_hosts.clone(),
        },
        tables,
        classifier,
        analyzer,
    })
}
