use std::path::PathBuf;
use std::thread;
use std::time::{Duration, Instant};

use tracing::{error, info, warn};

use crate::context::context_model::ExtractionRules;
use crate::context::extractor::ContextExtractor;
use crate::device::driver::Device;
use crate::error::RunError;
use crate::execution::actions::ActionExecutor;
use crate::execution::oracle::{DEFAULT_POLL, verify_oracle, wait_for_any};
use crate::prompt::engine::PromptEngine;
use crate::report::report_model::{RunReport, TrialOutcome};
use crate::runner::target_model::TargetConfig;
use crate::storage::jsonl::now_ms;
use crate::storage::store::{NullStore, PromptStore, ResultRecord, ResultStore};
use crate::synthesis::chat::ChatBackend;
use crate::synthesis::extractor::{FieldValues, InputSynthesizer};
use crate::trace::logger::TraceLogger;

/// Package whose stop returns the device to the launcher.
const SYSTEM_PACKAGE: &str = "android";

#[derive(Debug, Clone)]
pub struct RunSettings {
    pub trials: u32,
    pub model_type: String,
    pub max_attempts: u32,
    /// Pause after navigation before the screen is read.
    pub settle: Duration,
    pub launch_timeout: Duration,
    pub delay_detect_timeout: Duration,
    pub poll: Duration,
}

impl Default for RunSettings {
    fn default() -> Self {
        Self {
            trials: 3,
            model_type: String::new(),
            max_attempts: 3,
            settle: Duration::from_secs(2),
            launch_timeout: Duration::from_secs(30),
            delay_detect_timeout: Duration::from_secs(20),
            poll: DEFAULT_POLL,
        }
    }
}

/// Runs repeated trials of the whole pipeline against one target app.
pub struct TrialRunner<'a> {
    device: &'a mut dyn Device,
    backend: &'a dyn ChatBackend,
    settings: RunSettings,
    engine: PromptEngine,
    rules: ExtractionRules,
    dump_dir: Option<PathBuf>,
    prompt_store: &'a dyn PromptStore,
    result_store: &'a dyn ResultStore,
    trace: Option<&'a TraceLogger>,
}

impl<'a> TrialRunner<'a> {
    pub fn new(device: &'a mut dyn Device, backend: &'a dyn ChatBackend, settings: RunSettings) -> Self {
        Self {
            device,
            backend,
            settings,
            engine: PromptEngine::default(),
            rules: ExtractionRules::default(),
            dump_dir: None,
            prompt_store: &NullStore,
            result_store: &NullStore,
            trace: None,
        }
    }

    pub fn with_engine(mut self, engine: PromptEngine) -> Self {
        self.engine = engine;
        self
    }

    pub fn with_rules(mut self, rules: ExtractionRules) -> Self {
        self.rules = rules;
        self
    }

    pub fn with_dump_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.dump_dir = Some(dir.into());
        self
    }

    pub fn with_stores(mut self, prompts: &'a dyn PromptStore, results: &'a dyn ResultStore) -> Self {
        self.prompt_store = prompts;
        self.result_store = results;
        self
    }

    pub fn with_trace(mut self, trace: &'a TraceLogger) -> Self {
        self.trace = Some(trace);
        self
    }

    /// Run every trial. A fatal extraction error aborts the remaining trials;
    /// any other failure is recorded against its trial.
    pub fn run_trials(&mut self, target: &TargetConfig) -> Result<RunReport, RunError> {
        let started = Instant::now();
        let mut outcomes = Vec::new();

        for seq in 1..=self.settings.trials {
            info!(seq, total = self.settings.trials, package = %target.package_name, "trial started");

            let outcome = match self.run_trial(target, seq) {
                Ok(outcome) => outcome,
                Err(RunError::Context(e)) if e.is_fatal() => {
                    error!(error = %e, "screen cannot be tested, aborting run");
                    self.stop_apps(&target.package_name);
                    return Err(RunError::Context(e));
                }
                Err(e) => {
                    warn!(seq, error = %e, "trial failed");
                    self.stop_apps(&target.package_name);
                    TrialOutcome::failed(seq, e)
                }
            };

            info!(seq, passed = outcome.passed, "trial finished");
            outcomes.push(outcome);

            let cooldown = target.cooldown();
            if !cooldown.is_zero() {
                thread::sleep(cooldown);
            }
        }

        Ok(RunReport::from_trials(
            &target.app_name,
            &target.package_name,
            &self.settings.model_type,
            outcomes,
        )
        .with_duration(started.elapsed().as_millis()))
    }

    fn run_trial(&mut self, target: &TargetConfig, seq: u32) -> Result<TrialOutcome, RunError> {
        self.launch(target)?;

        if !wait_for_any(
            self.device,
            &target.delay_detect,
            self.settings.delay_detect_timeout,
            self.settings.poll,
        ) {
            info!("load markers not seen, continuing anyway");
        }

        if !ActionExecutor::new(self.device).execute_steps(&target.navigation_steps) {
            return Err(RunError::Navigation(target.package_name.clone()));
        }
        thread::sleep(self.settings.settle);
        info!("target screen reached");

        let mut extractor = ContextExtractor::new(&self.rules);
        if let Some(dir) = &self.dump_dir {
            extractor = extractor.with_dump_dir(dir);
        }
        let context = extractor.extract(self.device, &target.app_name, &target.package_name)?;

        let prompts = self.engine.build_and_persist(&context, self.prompt_store);
        let required_ids = context.required_ids();
        let retry_prompt = self.engine.build_retry(&required_ids);

        let mut synthesizer =
            InputSynthesizer::new(self.backend, &self.settings.model_type, self.settings.max_attempts);
        if let Some(trace) = self.trace {
            synthesizer = synthesizer.with_trace(trace);
        }
        let values = synthesizer
            .synthesize(&prompts.full, &retry_prompt, &required_ids)
            .into_values();

        let passed = if values.is_empty() {
            warn!("nothing to inject, trial counts as failed");
            false
        } else {
            let mut executor = ActionExecutor::new(self.device);
            executor.fill_text_inputs(&values);
            info!("test text filled");
            executor.execute_steps(&target.verify_action);
            verify_oracle(self.device, &target.oracles, self.settings.poll).passed
        };

        self.save_result(target, seq, passed, &values);
        self.stop_apps(&target.package_name);

        Ok(TrialOutcome {
            seq,
            passed,
            values,
            prompt_digest: Some(prompts.digest()),
            error: None,
        })
    }

    fn launch(&mut self, target: &TargetConfig) -> Result<(), RunError> {
        let package = target.package_name.as_str();
        self.stop_apps(package);
        self.device.app_start(package, target.main_activity.as_deref())?;

        let started = Instant::now();
        loop {
            let current = self.device.current_app()?;
            if current.package == package {
                info!(package, elapsed_ms = started.elapsed().as_millis() as u64, "app in foreground");
                return Ok(());
            }
            if started.elapsed() >= self.settings.launch_timeout {
                warn!(expected = package, actual = %current.package, "launch timed out");
                return Err(RunError::LaunchTimeout(package.to_string()));
            }
            thread::sleep(self.settings.poll);
        }
    }

    fn stop_apps(&mut self, package: &str) {
        for pkg in [package, SYSTEM_PACKAGE] {
            if let Err(e) = self.device.app_stop(pkg) {
                warn!(package = pkg, error = %e, "could not stop app");
            }
        }
    }

    fn save_result(
        &self,
        target: &TargetConfig,
        seq: u32,
        passed: bool,
        values: &FieldValues,
    ) {
        let record = ResultRecord::new(
            &target.package_name,
            &self.settings.model_type,
            seq,
            passed,
            values,
            now_ms(),
        );
        match record.and_then(|r| self.result_store.save_result(&r)) {
            Ok(()) => info!(seq, passed, "result stored"),
            Err(e) => warn!(seq, error = %e, "result could not be stored"),
        }
    }
}
