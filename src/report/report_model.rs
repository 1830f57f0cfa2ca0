use serde::{Deserialize, Serialize};

use crate::synthesis::extractor::FieldValues;

/// Outcome of one launch-extract-synthesize-verify cycle.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TrialOutcome {
    /// 1-based trial number
    pub seq: u32,

    pub passed: bool,

    /// Values injected into the form; empty when synthesis was exhausted
    pub values: FieldValues,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub prompt_digest: Option<String>,

    /// Non-fatal error that ended the trial early
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl TrialOutcome {
    pub fn failed(seq: u32, error: impl ToString) -> Self {
        Self {
            seq,
            passed: false,
            values: FieldValues::new(),
            prompt_digest: None,
            error: Some(error.to_string()),
        }
    }
}

/// Aggregated report for all trials of one target.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub app_name: String,
    pub package_name: String,
    pub model_type: String,

    pub total: usize,
    pub passed: usize,
    pub failed: usize,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u128>,

    pub trials: Vec<TrialOutcome>,
}

impl RunReport {
    pub fn from_trials(
        app_name: &str,
        package_name: &str,
        model_type: &str,
        trials: Vec<TrialOutcome>,
    ) -> Self {
        let total = trials.len();
        let passed = trials.iter().filter(|t| t.passed).count();
        Self {
            app_name: app_name.to_string(),
            package_name: package_name.to_string(),
            model_type: model_type.to_string(),
            total,
            passed,
            failed: total - passed,
            duration_ms: None,
            trials,
        }
    }

    pub fn with_duration(mut self, duration_ms: u128) -> Self {
        self.duration_ms = Some(duration_ms);
        self
    }

    pub fn all_passed(&self) -> bool {
        self.failed == 0
    }
}
