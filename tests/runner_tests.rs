use std::path::Path;
use std::time::Duration;

use input_synthesis::error::{ConfigError, ContextError, RunError};
use input_synthesis::runner::runner::{RunSettings, TrialRunner};
use input_synthesis::runner::target_model::{TargetConfig, load_target, parse_target};
use input_synthesis::storage::jsonl::JsonlStore;
use input_synthesis::storage::store::ResultRecord;
use input_synthesis::synthesis::chat::ScriptedChatBackend;
use input_synthesis::synthesis::chat_model::ChatResponse;

use crate::common::fixtures::{PKG, edit_text, fenced, frame, hierarchy, login_screen, text_view};
use crate::common::mock_device::{Action, MockDevice};

mod common;

const TARGET_YAML: &str = r#"
app_name: Shop
package_name: com.example.shop
verify_action:
  - action: click
    type: text
    target: "Sign in"
    delay: 0.0
    retry: 1
verify_appear:
  targets: ["Welcome back"]
  timeout: 5
"#;

fn target() -> TargetConfig {
    parse_target(TARGET_YAML, Path::new("shop.yaml")).unwrap()
}

fn settings(trials: u32) -> RunSettings {
    RunSettings {
        trials,
        model_type: "gpt-4o".to_string(),
        max_attempts: 3,
        settle: Duration::ZERO,
        launch_timeout: Duration::from_secs(1),
        delay_detect_timeout: Duration::ZERO,
        poll: Duration::from_millis(1),
    }
}

fn welcome_screen() -> String {
    hierarchy(&frame(PKG, &text_view("Welcome back", "[0,100][1080,200]")))
}

fn login_reply() -> String {
    fenced(r#"{"com.example.shop:id/email": "ada@example.com", "com.example.shop:id/password": "S3cret!"}"#)
}

// ============================================================================
// Target files
// ============================================================================

#[test]
fn target_defaults() {
    let target = target();
    assert_eq!(target.package_name, PKG);
    assert!(target.main_activity.is_none());
    assert!(target.navigation_steps.is_empty());
    assert_eq!(target.verify_action.len(), 1);
    assert_eq!(target.cooldown_secs, 0.0);
    assert!(target.oracles.verify_disappear.is_none());
    assert_eq!(target.oracles.verify_appear.as_ref().unwrap().timeout_secs, 5.0);
}

#[test]
fn target_without_oracle_is_rejected() {
    let yaml = "app_name: Shop\npackage_name: com.example.shop\n";
    let err = parse_target(yaml, Path::new("shop.yaml")).unwrap_err();
    assert!(matches!(err, ConfigError::NoOracle(ref pkg) if pkg == PKG));
}

#[test]
fn target_with_empty_oracle_targets_is_rejected() {
    let yaml = "app_name: Shop\npackage_name: com.example.shop\nverify_disappear:\n  targets: []\n";
    assert!(matches!(
        parse_target(yaml, Path::new("shop.yaml")),
        Err(ConfigError::NoOracle(_))
    ));
}

#[test]
fn target_with_bad_yaml_names_file() {
    let err = parse_target("app_name: [", Path::new("broken.yaml")).unwrap_err();
    assert!(err.to_string().contains("broken.yaml"));
}

#[test]
fn target_loads_from_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("shop.yaml");
    std::fs::write(&path, TARGET_YAML).unwrap();
    assert_eq!(load_target(&path).unwrap(), target());
}

#[test]
fn missing_target_file_is_read_error() {
    let dir = tempfile::tempdir().unwrap();
    assert!(matches!(
        load_target(&dir.path().join("absent.yaml")),
        Err(ConfigError::Read { .. })
    ));
}

// ============================================================================
// Trials
// ============================================================================

#[test]
fn passing_trial_fills_submits_and_verifies() {
    let dir = tempfile::tempdir().unwrap();
    let store = JsonlStore::new(dir.path());

    let mut device = MockDevice::new(vec![
        login_screen(),
        login_screen(),
        login_screen(),
        login_screen(),
        welcome_screen(),
    ]);
    let backend = ScriptedChatBackend::new([Some(ChatResponse::ok("s1", &login_reply()))]);

    let report = TrialRunner::new(&mut device, &backend, settings(1))
        .with_stores(&store, &store)
        .run_trials(&target())
        .unwrap();

    assert_eq!(report.total, 1);
    assert_eq!(report.passed, 1);
    assert!(report.all_passed());
    assert_eq!(report.model_type, "gpt-4o");

    let trial = &report.trials[0];
    assert_eq!(trial.values["com.example.shop:id/email"], "ada@example.com");
    assert!(trial.prompt_digest.is_some());
    assert!(trial.error.is_none());

    assert_eq!(device.typed(), vec!["ada@example.com", "S3cret!"]);
    assert_eq!(device.taps().last(), Some(&(540, 950)));
    assert_eq!(device.actions.first(), Some(&Action::Stop(PKG.to_string())));
    assert_eq!(device.actions.last(), Some(&Action::Stop("android".to_string())));

    let line = std::fs::read_to_string(store.results_path()).unwrap();
    let record: ResultRecord = serde_json::from_str(line.trim()).unwrap();
    assert_eq!(record.app_id, PKG);
    assert_eq!(record.seq, 1);
    assert_eq!(record.val, 1);
    assert!(record.texts.contains("S3cret!"));

    assert!(store.prompts_path().exists());
}

#[test]
fn prompt_is_sent_to_backend() {
    let mut device = MockDevice::new(vec![
        login_screen(),
        login_screen(),
        login_screen(),
        login_screen(),
        welcome_screen(),
    ]);
    let backend = ScriptedChatBackend::new([Some(ChatResponse::ok("s1", &login_reply()))]);

    TrialRunner::new(&mut device, &backend, settings(1))
        .run_trials(&target())
        .unwrap();

    let requests = backend.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].model_type, "gpt-4o");
    assert!(requests[0].message.contains("com.example.shop:id/password"));
}

#[test]
fn exhausted_synthesis_fails_every_trial() {
    let mut device = MockDevice::with_screen(login_screen());
    let backend = ScriptedChatBackend::default();

    let report = TrialRunner::new(&mut device, &backend, settings(2))
        .run_trials(&target())
        .unwrap();

    assert_eq!(report.total, 2);
    assert_eq!(report.failed, 2);
    assert!(report.trials.iter().all(|t| t.values.is_empty()));
    assert_eq!(backend.call_count(), 6);
    assert!(device.typed().is_empty());
}

#[test]
fn exhausted_trial_records_failure() {
    let dir = tempfile::tempdir().unwrap();
    let store = JsonlStore::new(dir.path());
    let mut device = MockDevice::with_screen(login_screen());
    let backend = ScriptedChatBackend::default();

    TrialRunner::new(&mut device, &backend, settings(1))
        .with_stores(&store, &store)
        .run_trials(&target())
        .unwrap();

    let line = std::fs::read_to_string(store.results_path()).unwrap();
    let record: ResultRecord = serde_json::from_str(line.trim()).unwrap();
    assert_eq!(record.val, 0);
    assert_eq!(record.texts, "{}");
}

#[test]
fn missing_resource_id_aborts_run() {
    let screen = hierarchy(&frame(PKG, &edit_text(0, "", "[0,100][1080,200]", "", "Name")));
    let mut device = MockDevice::with_screen(screen);
    let backend = ScriptedChatBackend::default();

    let result = TrialRunner::new(&mut device, &backend, settings(3)).run_trials(&target());

    assert!(matches!(
        result,
        Err(RunError::Context(ContextError::MissingResourceId { .. }))
    ));
    assert_eq!(backend.call_count(), 0);
    assert_eq!(device.actions.last(), Some(&Action::Stop("android".to_string())));
}

#[test]
fn unusable_cooldown_means_no_pause() {
    for value in [".inf", "-.inf", ".nan", "1e300", "-3"] {
        let yaml = format!("{}cooldown_secs: {}\n", TARGET_YAML, value);
        let target = parse_target(&yaml, Path::new("shop.yaml")).unwrap();
        assert_eq!(target.cooldown(), Duration::ZERO, "cooldown_secs: {}", value);
    }

    let yaml = format!("{}cooldown_secs: 1.5\n", TARGET_YAML);
    let target = parse_target(&yaml, Path::new("shop.yaml")).unwrap();
    assert_eq!(target.cooldown(), Duration::from_millis(1500));
}

#[test]
fn infinite_cooldown_does_not_stall_the_run() {
    let mut device = MockDevice::with_screen(login_screen());
    device.launches = false;
    let backend = ScriptedChatBackend::default();

    let mut settings = settings(2);
    settings.launch_timeout = Duration::ZERO;

    let target = parse_target(&format!("{}cooldown_secs: .inf\n", TARGET_YAML), Path::new("shop.yaml")).unwrap();
    let report = TrialRunner::new(&mut device, &backend, settings)
        .run_trials(&target)
        .unwrap();

    assert_eq!(report.total, 2);
}

#[test]
fn launch_timeout_fails_trial_and_run_continues() {
    let mut device = MockDevice::with_screen(login_screen());
    device.launches = false;
    let backend = ScriptedChatBackend::default();

    let mut settings = settings(2);
    settings.launch_timeout = Duration::ZERO;

    let report = TrialRunner::new(&mut device, &backend, settings)
        .run_trials(&target())
        .unwrap();

    assert_eq!(report.failed, 2);
    assert!(
        report.trials[0]
            .error
            .as_deref()
            .unwrap()
            .contains("did not reach the foreground")
    );
    assert_eq!(backend.call_count(), 0);
    assert_eq!(device.dumps, 0);
}

#[test]
fn extraction_dumps_are_saved() {
    let dir = tempfile::tempdir().unwrap();
    let mut device = MockDevice::with_screen(login_screen());
    let backend = ScriptedChatBackend::default();

    TrialRunner::new(&mut device, &backend, settings(1))
        .with_dump_dir(dir.path())
        .run_trials(&target())
        .unwrap();

    assert!(dir.path().join(format!("hierarchy_{}.xml", PKG)).exists());
}
