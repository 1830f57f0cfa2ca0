use std::path::{Path, PathBuf};

use tracing::info;

use crate::cli::config::{AppConfig, ScreenArgs, build_run_settings};
use crate::context::context_model::{ExtractionRules, ScreenContext};
use crate::context::extractor::{AppIdentity, context_from_dump};
use crate::device::adb::AdbDevice;
use crate::prompt::engine::PromptEngine;
use crate::prompt::templates::load_templates;
use crate::report::console::format_console_report;
use crate::runner::runner::TrialRunner;
use crate::runner::target_model::load_target;
use crate::storage::jsonl::JsonlStore;
use crate::synthesis::chat::HttpChatBackend;
use crate::synthesis::extractor::parse_reply;
use crate::trace::logger::TraceLogger;

// ============================================================================
// run subcommand
// ============================================================================

/// Run all trials for one target and return whether every trial passed.
pub fn cmd_run(
    target_path: &str,
    serial: Option<&str>,
    adb: &str,
    output: Option<&str>,
    config: &AppConfig,
    api_key: Option<&str>,
    model_type: Option<&str>,
) -> Result<bool, Box<dyn std::error::Error>> {
    let target = load_target(Path::new(target_path))?;
    let engine = build_engine(config)?;
    let settings = build_run_settings(config, model_type);

    let backend = HttpChatBackend::new(
        &config.llm.base_url,
        &config.llm.resolve_api_key(api_key),
        config.llm.timeout(),
        config.llm.verify_ssl,
    )?;
    let store = JsonlStore::new(&config.output.dir);
    let trace = TraceLogger::new(&config.logging.trace_file);
    let mut device = AdbDevice::new(adb, serial);

    info!(
        app = %target.app_name,
        package = %target.package_name,
        model = %settings.model_type,
        trials = settings.trials,
        "starting run"
    );

    let report = TrialRunner::new(&mut device, &backend, settings)
        .with_engine(engine)
        .with_rules(config.extraction.clone())
        .with_dump_dir(config.output.dump_dir())
        .with_stores(&store, &store)
        .with_trace(&trace)
        .run_trials(&target)?;

    print!("{}", format_console_report(&report));

    if let Some(path) = output {
        std::fs::write(path, serde_json::to_string_pretty(&report)?)?;
    }

    Ok(report.all_passed())
}

// ============================================================================
// context / prompt subcommands (offline, from a saved dump)
// ============================================================================

pub fn cmd_context(screen: &ScreenArgs, config: &AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    let context = load_screen(screen, &config.extraction)?;
    println!("{}", serde_json::to_string_pretty(&context)?);
    Ok(())
}

pub fn cmd_prompt(screen: &ScreenArgs, config: &AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    let context = load_screen(screen, &config.extraction)?;
    let prompts = build_engine(config)?.build(&context);
    println!("{}", prompts.full);
    Ok(())
}

/// Read a saved dump and analyse it as if it came from the device.
pub fn load_screen(
    screen: &ScreenArgs,
    rules: &ExtractionRules,
) -> Result<ScreenContext, Box<dyn std::error::Error>> {
    let xml = std::fs::read_to_string(&screen.dump)?;
    let app = AppIdentity {
        app_name: screen.app_name.clone(),
        package_name: screen.package.clone(),
        activity: screen.activity.clone(),
    };
    let (_, context) = context_from_dump(&xml, &app, (screen.width, screen.height), rules)?;
    Ok(context)
}

// ============================================================================
// parse-reply subcommand
// ============================================================================

/// Print the values a reply yields, or why it would be rejected.
/// Returns whether the reply was accepted.
pub fn cmd_parse_reply(reply_path: &str, ids: &[String]) -> Result<bool, Box<dyn std::error::Error>> {
    let reply = std::fs::read_to_string(reply_path)?;
    match parse_reply(&reply, ids) {
        Ok(values) => {
            println!("{}", serde_json::to_string_pretty(&values)?);
            Ok(true)
        }
        Err(e) => {
            eprintln!("Reply rejected: {}", e);
            Ok(false)
        }
    }
}

fn build_engine(config: &AppConfig) -> Result<PromptEngine, Box<dyn std::error::Error>> {
    let path = config.templates.as_ref().map(PathBuf::from);
    Ok(PromptEngine::new(load_templates(path.as_deref())?))
}
