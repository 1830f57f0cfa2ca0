use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use serde::{Deserialize, Serialize};

use crate::context::context_model::ExtractionRules;
use crate::runner::runner::RunSettings;

/// Environment variable consulted when no API key is given on the command
/// line or in the config file.
pub const API_KEY_ENV: &str = "INPUT_SYNTHESIS_API_KEY";

// ============================================================================
// CLI Argument Parsing (clap derive)
// ============================================================================

#[derive(Parser, Debug)]
#[command(
    name = "input-synthesis",
    version,
    about = "LLM-driven text input generation for Android form screens"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Verbosity level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to config file (default: input-synthesis.yaml in current dir)
    #[arg(long, global = true)]
    pub config: Option<String>,

    /// Bearer token for the chat endpoint
    #[arg(long, global = true)]
    pub api_key: Option<String>,

    /// Model identifier sent with every chat request
    #[arg(long, global = true)]
    pub model_type: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run repeated trials against an app on a connected device
    Run {
        /// Path to the target app YAML file
        #[arg(long)]
        target: String,

        /// Device serial (default: the only attached device)
        #[arg(long)]
        serial: Option<String>,

        /// adb executable
        #[arg(long, default_value = "adb")]
        adb: String,

        /// Write the run report as JSON to this path
        #[arg(short, long)]
        output: Option<String>,
    },

    /// Print the screen context extracted from a saved hierarchy dump
    Context {
        #[command(flatten)]
        screen: ScreenArgs,
    },

    /// Print the prompt built from a saved hierarchy dump
    Prompt {
        #[command(flatten)]
        screen: ScreenArgs,
    },

    /// Validate a stored model reply against the expected field ids
    ParseReply {
        /// File holding the raw reply text
        #[arg(long)]
        reply: String,

        /// Comma-separated combined ids the reply must cover
        #[arg(long, value_delimiter = ',', required = true)]
        ids: Vec<String>,
    },
}

/// Inputs for the offline commands that work on a saved dump.
#[derive(Args, Debug, Clone)]
pub struct ScreenArgs {
    /// uiautomator hierarchy XML
    #[arg(long)]
    pub dump: String,

    #[arg(long)]
    pub package: String,

    #[arg(long)]
    pub app_name: String,

    #[arg(long, default_value = "")]
    pub activity: String,

    #[arg(long, default_value_t = 1080)]
    pub width: i32,

    #[arg(long, default_value_t = 2400)]
    pub height: i32,
}

// ============================================================================
// Config File Model (optional YAML)
// ============================================================================

/// Optional YAML config file: `input-synthesis.yaml`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub extraction: ExtractionRules,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Prompt template YAML; built-in templates when absent.
    #[serde(default)]
    pub templates: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    #[serde(default)]
    pub base_url: String,

    #[serde(default)]
    pub api_key: Option<String>,

    #[serde(default)]
    pub model_type: String,

    #[serde(default = "default_three", alias = "max_retries")]
    pub max_attempts: u32,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default = "default_true")]
    pub verify_ssl: bool,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            api_key: None,
            model_type: String::new(),
            max_attempts: 3,
            timeout_secs: 30,
            verify_ssl: true,
        }
    }
}

impl LlmConfig {
    /// Key from the CLI, then the config file, then the environment.
    pub fn resolve_api_key(&self, cli_key: Option<&str>) -> String {
        cli_key
            .map(str::to_string)
            .or_else(|| self.api_key.clone())
            .or_else(|| std::env::var(API_KEY_ENV).ok())
            .unwrap_or_default()
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    #[serde(default = "default_output_dir")]
    pub dir: String,

    #[serde(default = "default_three")]
    pub trials: u32,

    #[serde(default = "default_settle_ms")]
    pub settle_ms: u64,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: default_output_dir(),
            trials: 3,
            settle_ms: 2000,
        }
    }
}

impl OutputConfig {
    pub fn dump_dir(&self) -> PathBuf {
        PathBuf::from(&self.dir).join("xml_dumps")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_level")]
    pub level: String,

    #[serde(default = "default_trace_file")]
    pub trace_file: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            trace_file: default_trace_file(),
        }
    }
}

// Serde default helpers
fn default_three() -> u32 { 3 }
fn default_true() -> bool { true }
fn default_timeout_secs() -> u64 { 30 }
fn default_settle_ms() -> u64 { 2000 }
fn default_output_dir() -> String { "output".to_string() }
fn default_level() -> String { "info".to_string() }
fn default_trace_file() -> String { "synthesis_trace.jsonl".to_string() }

// ============================================================================
// Config File Loading
// ============================================================================

/// Load config from a YAML file. Returns defaults if file is missing or malformed.
pub fn load_config(path: Option<&str>) -> AppConfig {
    let config_path = path.unwrap_or("input-synthesis.yaml");
    match std::fs::read_to_string(config_path) {
        Ok(content) => serde_yaml::from_str(&content).unwrap_or_default(),
        Err(_) => AppConfig::default(),
    }
}

// ============================================================================
// Config Builders (merge CLI args with config file)
// ============================================================================

/// `EnvFilter` directive: `-v` raises the configured level to debug, `-vv` to trace.
pub fn log_filter(verbose: u8, configured: &str) -> String {
    match verbose {
        0 => configured.to_string(),
        1 => "debug".to_string(),
        _ => "trace".to_string(),
    }
}

pub fn build_run_settings(config: &AppConfig, model_type: Option<&str>) -> RunSettings {
    RunSettings {
        trials: config.output.trials,
        model_type: model_type.unwrap_or(&config.llm.model_type).to_string(),
        max_attempts: config.llm.max_attempts,
        settle: Duration::from_millis(config.output.settle_ms),
        ..RunSettings::default()
    }
}
