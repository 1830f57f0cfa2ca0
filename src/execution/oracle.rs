use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::device::driver::Device;
use crate::device::finder::{By, exists};

/// Default poll interval between hierarchy checks.
pub const DEFAULT_POLL: Duration = Duration::from_millis(500);

fn default_timeout() -> f64 {
    20.0
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum MatchMode {
    #[default]
    All,
    Any,
}

/// A set of elements expected to appear or disappear.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OracleSpec {
    #[serde(default)]
    pub targets: Vec<String>,
    #[serde(default)]
    pub by: By,
    #[serde(default)]
    pub mode: MatchMode,
    #[serde(default = "default_timeout", alias = "timeout")]
    pub timeout_secs: f64,
}

impl OracleSpec {
    pub fn new(targets: Vec<String>, by: By, mode: MatchMode, timeout_secs: f64) -> Self {
        Self {
            targets,
            by,
            mode,
            timeout_secs,
        }
    }

    fn timeout(&self) -> Duration {
        Duration::try_from_secs_f64(self.timeout_secs.max(0.0)).unwrap_or(Duration::ZERO)
    }
}

/// The oracles a target declares. At least one must be present.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Oracles {
    #[serde(default)]
    pub verify_appear: Option<OracleSpec>,
    #[serde(default)]
    pub verify_disappear: Option<OracleSpec>,
}

impl Oracles {
    pub fn is_empty(&self) -> bool {
        self.verify_appear.is_none() && self.verify_disappear.is_none()
    }
}

/// Observed state of one target during polling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Presence {
    Unchecked,
    Present,
    Absent,
    CheckFailed,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TargetStatus {
    pub target: String,
    pub passed: bool,
    /// Status changes only; consecutive duplicates are collapsed.
    pub history: Vec<Presence>,
    pub error: Option<String>,
}

impl TargetStatus {
    fn new(target: &str) -> Self {
        Self {
            target: target.to_string(),
            passed: false,
            history: vec![Presence::Unchecked],
            error: None,
        }
    }

    fn observe(&mut self, presence: Presence) {
        if self.history.last() != Some(&presence) {
            self.history.push(presence);
        }
    }

    pub fn last(&self) -> Presence {
        self.history.last().copied().unwrap_or(Presence::Unchecked)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CheckReport {
    pub expect_appear: bool,
    pub passed: bool,
    pub elapsed_ms: u128,
    pub targets: Vec<TargetStatus>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OracleReport {
    pub passed: bool,
    pub checks: Vec<CheckReport>,
}

/// Poll the screen until the targets reach the expected presence or the
/// oracle's timeout elapses. The screen is always checked at least once.
pub fn check_targets(
    device: &mut dyn Device,
    spec: &OracleSpec,
    expect_appear: bool,
    poll: Duration,
) -> CheckReport {
    let started = Instant::now();
    let timeout = spec.timeout();
    let mut statuses: Vec<TargetStatus> = spec.targets.iter().map(|t| TargetStatus::new(t)).collect();

    info!(
        targets = spec.targets.len(),
        expect_appear,
        mode = ?spec.mode,
        timeout_secs = spec.timeout_secs,
        "checking targets"
    );

    let passed = loop {
        let satisfied = poll_once(device, spec, expect_appear, &mut statuses);
        let elapsed = started.elapsed();

        if satisfied {
            info!(elapsed_ms = elapsed.as_millis() as u64, "targets satisfied");
            break true;
        }
        if elapsed >= timeout {
            warn!(timeout_secs = spec.timeout_secs, "targets not satisfied before timeout");
            break false;
        }
        std::thread::sleep(poll);
    };

    for status in &statuses {
        debug!(target_name = %status.target, last = ?status.last(), "final status");
    }

    CheckReport {
        expect_appear,
        passed,
        elapsed_ms: started.elapsed().as_millis(),
        targets: statuses,
    }
}

fn poll_once(
    device: &mut dyn Device,
    spec: &OracleSpec,
    expect_appear: bool,
    statuses: &mut [TargetStatus],
) -> bool {
    let mut all = true;
    let mut any = false;

    for status in statuses.iter_mut() {
        let passed = match exists(device, spec.by, &status.target) {
            Ok(present) => {
                status.observe(if present { Presence::Present } else { Presence::Absent });
                status.error = None;
                present == expect_appear
            }
            Err(e) => {
                warn!(target_name = %status.target, error = %e, "target check failed");
                status.observe(Presence::CheckFailed);
                status.error = Some(e.to_string());
                false
            }
        };
        status.passed = passed;
        all &= passed;
        any |= passed;

        if spec.mode == MatchMode::Any && any {
            break;
        }
    }

    match spec.mode {
        MatchMode::All => all,
        MatchMode::Any => any,
    }
}

/// Evaluate disappear, then appear. Passes only if every present oracle passes.
pub fn verify_oracle(device: &mut dyn Device, oracles: &Oracles, poll: Duration) -> OracleReport {
    if oracles.is_empty() {
        warn!("no oracle configured, verification fails");
        return OracleReport {
            passed: false,
            checks: vec![],
        };
    }

    let mut checks = Vec::new();
    if let Some(spec) = &oracles.verify_disappear {
        checks.push(check_targets(device, spec, false, poll));
    }
    if let Some(spec) = &oracles.verify_appear {
        checks.push(check_targets(device, spec, true, poll));
    }

    let passed = checks.iter().all(|c| c.passed);
    info!(passed, "oracle verdict");
    OracleReport { passed, checks }
}

/// Block until any of `targets` shows up (by text) or `timeout` elapses.
pub fn wait_for_any(
    device: &mut dyn Device,
    targets: &[String],
    timeout: Duration,
    poll: Duration,
) -> bool {
    if targets.is_empty() {
        return true;
    }
    let spec = OracleSpec::new(targets.to_vec(), By::Text, MatchMode::Any, timeout.as_secs_f64());
    check_targets(device, &spec, true, poll).passed
}
