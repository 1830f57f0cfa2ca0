use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::execution::actions::{NavigationStep, secs_to_duration};
use crate::execution::oracle::{OracleSpec, Oracles};

/// One app under test: how to reach the form screen and how to judge the
/// outcome after the generated text is submitted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TargetConfig {
    pub app_name: String,

    pub package_name: String,

    /// Launch activity; the launcher default is used when absent.
    #[serde(default)]
    pub main_activity: Option<String>,

    /// Texts whose appearance signals the app finished loading.
    #[serde(default)]
    pub delay_detect: Vec<String>,

    /// Steps from the launch screen to the form under test
    #[serde(default)]
    pub navigation_steps: Vec<NavigationStep>,

    /// Steps that submit the filled form
    #[serde(default)]
    pub verify_action: Vec<NavigationStep>,

    #[serde(flatten)]
    pub oracles: Oracles,

    /// Seconds to wait after each trial before the next launch.
    #[serde(default)]
    pub cooldown_secs: f64,
}

impl TargetConfig {
    /// Pause between trials. Unusable values mean no pause.
    pub fn cooldown(&self) -> Duration {
        secs_to_duration(self.cooldown_secs)
    }
}

/// Parse a target from YAML text. `origin` only labels errors.
pub fn parse_target(yaml: &str, origin: &Path) -> Result<TargetConfig, ConfigError> {
    let target: TargetConfig = serde_yaml::from_str(yaml).map_err(|e| ConfigError::Parse {
        path: origin.to_path_buf(),
        source: e,
    })?;

    let oracles = &target.oracles;
    if !has_targets(oracles.verify_appear.as_ref()) && !has_targets(oracles.verify_disappear.as_ref()) {
        return Err(ConfigError::NoOracle(target.package_name));
    }

    Ok(target)
}

fn has_targets(spec: Option<&OracleSpec>) -> bool {
    spec.is_some_and(|s| !s.targets.is_empty())
}

pub fn load_target(path: &Path) -> Result<TargetConfig, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
        path: path.to_path_buf(),
        source: e,
    })?;
    parse_target(&content, path)
}
