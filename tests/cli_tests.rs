use std::time::Duration;

use clap::Parser;
use input_synthesis::cli::commands::{cmd_parse_reply, load_screen};
use input_synthesis::cli::config::{
    AppConfig, Cli, Commands, LlmConfig, build_run_settings, load_config, log_filter,
};
use input_synthesis::context::context_model::ExtractionRules;

use crate::common::fixtures::{PKG, fenced, login_screen};

mod common;

// ============================================================================
// CLI Argument Parsing Tests
// ============================================================================

#[test]
fn cli_parse_run_minimal() {
    let cli = Cli::parse_from(["input-synthesis", "run", "--target", "apps/shop.yaml"]);
    match cli.command {
        Commands::Run {
            target,
            serial,
            adb,
            output,
        } => {
            assert_eq!(target, "apps/shop.yaml");
            assert!(serial.is_none());
            assert_eq!(adb, "adb");
            assert!(output.is_none());
        }
        _ => panic!("Expected Run command"),
    }
}

#[test]
fn cli_parse_run_all_args() {
    let cli = Cli::parse_from([
        "input-synthesis",
        "run",
        "--target",
        "shop.yaml",
        "--serial",
        "emulator-5554",
        "--adb",
        "/opt/android/adb",
        "-o",
        "report.json",
        "--model-type",
        "gpt-4o",
    ]);
    assert_eq!(cli.model_type.as_deref(), Some("gpt-4o"));
    match cli.command {
        Commands::Run {
            serial, adb, output, ..
        } => {
            assert_eq!(serial.as_deref(), Some("emulator-5554"));
            assert_eq!(adb, "/opt/android/adb");
            assert_eq!(output.as_deref(), Some("report.json"));
        }
        _ => panic!("Expected Run command"),
    }
}

#[test]
fn cli_parse_context_defaults() {
    let cli = Cli::parse_from([
        "input-synthesis",
        "context",
        "--dump",
        "screen.xml",
        "--package",
        PKG,
        "--app-name",
        "Shop",
    ]);
    match cli.command {
        Commands::Context { screen } => {
            assert_eq!(screen.dump, "screen.xml");
            assert_eq!(screen.package, PKG);
            assert_eq!(screen.activity, "");
            assert_eq!((screen.width, screen.height), (1080, 2400));
        }
        _ => panic!("Expected Context command"),
    }
}

#[test]
fn cli_parse_prompt_with_size() {
    let cli = Cli::parse_from([
        "input-synthesis",
        "prompt",
        "--dump",
        "screen.xml",
        "--package",
        PKG,
        "--app-name",
        "Shop",
        "--width",
        "720",
        "--height",
        "1280",
    ]);
    match cli.command {
        Commands::Prompt { screen } => assert_eq!((screen.width, screen.height), (720, 1280)),
        _ => panic!("Expected Prompt command"),
    }
}

#[test]
fn cli_parse_reply_splits_ids() {
    let cli = Cli::parse_from([
        "input-synthesis",
        "parse-reply",
        "--reply",
        "reply.txt",
        "--ids",
        "a:id/x,a:id/y::#::1",
    ]);
    match cli.command {
        Commands::ParseReply { reply, ids } => {
            assert_eq!(reply, "reply.txt");
            assert_eq!(ids, vec!["a:id/x", "a:id/y::#::1"]);
        }
        _ => panic!("Expected ParseReply command"),
    }
}

#[test]
fn cli_parse_reply_requires_ids() {
    assert!(Cli::try_parse_from(["input-synthesis", "parse-reply", "--reply", "r.txt"]).is_err());
}

#[test]
fn cli_parse_global_flags() {
    let cli = Cli::parse_from([
        "input-synthesis",
        "-vv",
        "--config",
        "custom.yaml",
        "--api-key",
        "secret",
        "run",
        "--target",
        "t.yaml",
    ]);
    assert_eq!(cli.verbose, 2);
    assert_eq!(cli.config.as_deref(), Some("custom.yaml"));
    assert_eq!(cli.api_key.as_deref(), Some("secret"));
}

// ============================================================================
// Config File Tests
// ============================================================================

#[test]
fn config_load_missing_file() {
    let config = load_config(Some("nonexistent_file_that_does_not_exist.yaml"));
    assert_eq!(config.llm.max_attempts, 3);
    assert_eq!(config.output.dir, "output");
}

#[test]
fn config_default_values() {
    let config = AppConfig::default();
    assert_eq!(config.llm.timeout(), Duration::from_secs(30));
    assert!(config.llm.verify_ssl);
    assert_eq!(config.output.trials, 3);
    assert_eq!(config.output.settle_ms, 2000);
    assert_eq!(config.logging.level, "info");
    assert_eq!(config.logging.trace_file, "synthesis_trace.jsonl");
    assert_eq!(config.extraction, ExtractionRules::default());
    assert!(config.templates.is_none());
}

#[test]
fn config_partial_yaml() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("input-synthesis.yaml");
    std::fs::write(
        &path,
        r#"
llm:
  base_url: "https://llm.internal/chat"
  model_type: "gpt-4o"
  max_retries: 5
  verify_ssl: false
output:
  dir: "runs"
extraction:
  denied_resource_ids: ["com.example:id/datePicker"]
"#,
    )
    .unwrap();

    let config = load_config(path.to_str());
    assert_eq!(config.llm.base_url, "https://llm.internal/chat");
    assert_eq!(config.llm.max_attempts, 5);
    assert!(!config.llm.verify_ssl);
    assert_eq!(config.llm.timeout_secs, 30);
    assert_eq!(config.output.dir, "runs");
    assert_eq!(config.output.trials, 3);
    assert!(config.output.dump_dir().ends_with("runs/xml_dumps"));
    assert_eq!(config.extraction.denied_resource_ids, vec!["com.example:id/datePicker"]);
    assert_eq!(config.extraction.input_classes, ExtractionRules::default().input_classes);
}

#[test]
fn config_malformed_yaml_falls_back_to_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bad.yaml");
    std::fs::write(&path, "llm: [unclosed").unwrap();

    let config = load_config(path.to_str());
    assert_eq!(config.llm.max_attempts, 3);
}

#[test]
fn config_yaml_roundtrip() {
    let mut config = AppConfig::default();
    config.llm.model_type = "claude".to_string();
    config.templates = Some("prompts.yaml".to_string());

    let yaml = serde_yaml::to_string(&config).unwrap();
    let parsed: AppConfig = serde_yaml::from_str(&yaml).unwrap();
    assert_eq!(parsed.llm.model_type, "claude");
    assert_eq!(parsed.templates.as_deref(), Some("prompts.yaml"));
}

#[test]
fn api_key_prefers_cli_then_config() {
    let llm = LlmConfig {
        api_key: Some("from-config".to_string()),
        ..LlmConfig::default()
    };
    assert_eq!(llm.resolve_api_key(Some("from-cli")), "from-cli");
    assert_eq!(llm.resolve_api_key(None), "from-config");
}

// ============================================================================
// Builders
// ============================================================================

#[test]
fn log_filter_levels() {
    assert_eq!(log_filter(0, "warn"), "warn");
    assert_eq!(log_filter(1, "warn"), "debug");
    assert_eq!(log_filter(3, "warn"), "trace");
}

#[test]
fn run_settings_wiring() {
    let mut config = AppConfig::default();
    config.llm.model_type = "from-config".to_string();
    config.llm.max_attempts = 4;
    config.output.trials = 7;
    config.output.settle_ms = 150;

    let settings = build_run_settings(&config, None);
    assert_eq!(settings.model_type, "from-config");
    assert_eq!(settings.max_attempts, 4);
    assert_eq!(settings.trials, 7);
    assert_eq!(settings.settle, Duration::from_millis(150));

    assert_eq!(build_run_settings(&config, Some("override")).model_type, "override");
}

// ============================================================================
// Offline commands
// ============================================================================

#[test]
fn load_screen_reads_saved_dump() {
    let dir = tempfile::tempdir().unwrap();
    let dump = dir.path().join("screen.xml");
    std::fs::write(&dump, login_screen()).unwrap();

    let cli = Cli::parse_from([
        "input-synthesis",
        "context",
        "--dump",
        dump.to_str().unwrap(),
        "--package",
        PKG,
        "--app-name",
        "Shop",
        "--activity",
        "com.example.shop.ui.LoginActivity",
    ]);
    let Commands::Context { screen } = cli.command else {
        panic!("Expected Context command");
    };

    let context = load_screen(&screen, &ExtractionRules::default()).unwrap();
    assert_eq!(context.global.input_count, 2);
    assert_eq!(context.global.activity, "com.example.shop.ui.LoginActivity");
}

#[test]
fn parse_reply_command_accepts_complete_reply() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("reply.txt");
    std::fs::write(&path, fenced(r#"{"a:id/x": "1"}"#)).unwrap();

    let ids = vec!["a:id/x".to_string()];
    assert!(cmd_parse_reply(path.to_str().unwrap(), &ids).unwrap());
}

#[test]
fn parse_reply_command_rejects_incomplete_reply() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("reply.txt");
    std::fs::write(&path, fenced(r#"{"a:id/x": "1"}"#)).unwrap();

    let ids = vec!["a:id/x".to_string(), "a:id/y".to_string()];
    assert!(!cmd_parse_reply(path.to_str().unwrap(), &ids).unwrap());
}

#[test]
fn parse_reply_command_missing_file_is_error() {
    assert!(cmd_parse_reply("no/such/reply.txt", &["a".to_string()]).is_err());
}
