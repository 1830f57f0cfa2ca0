use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::StoreError;
use crate::prompt::prompt_model::SubPromptSet;

/// Persists prompt fragments keyed by package name.
pub trait PromptStore {
    fn save_prompts(&self, package_name: &str, prompts: &SubPromptSet) -> Result<(), StoreError>;
}

/// Persists trial outcomes keyed by `(app_id, model_type, seq)`.
pub trait ResultStore {
    fn save_result(&self, record: &ResultRecord) -> Result<(), StoreError>;
}

/// Stored form of a [`SubPromptSet`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromptRecord {
    pub app_id: String,
    pub global: String,
    pub component: Vec<String>,
    pub adjacent: Vec<String>,
    pub restrictive: String,
    pub guiding: String,
    pub digest: String,
    pub timestamp_ms: u128,
}

impl PromptRecord {
    pub fn new(package_name: &str, prompts: &SubPromptSet, timestamp_ms: u128) -> Self {
        Self {
            app_id: package_name.to_string(),
            global: prompts.global.clone(),
            component: prompts.components.clone(),
            adjacent: prompts.adjacents.clone(),
            restrictive: prompts.restrictive.clone(),
            guiding: prompts.guiding.clone(),
            digest: prompts.digest(),
            timestamp_ms,
        }
    }
}

/// Outcome of one trial.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultRecord {
    pub app_id: String,
    pub model_type: String,
    pub seq: u32,
    /// `1` when every oracle passed, `0` otherwise.
    pub val: u8,
    pub prompt_structure: u32,
    /// Injected values serialized as JSON.
    pub texts: String,
    pub timestamp_ms: u128,
}

impl ResultRecord {
    pub fn new(
        app_id: &str,
        model_type: &str,
        seq: u32,
        passed: bool,
        values: &BTreeMap<String, String>,
        timestamp_ms: u128,
    ) -> Result<Self, StoreError> {
        Ok(Self {
            app_id: app_id.to_string(),
            model_type: model_type.to_string(),
            seq,
            val: u8::from(passed),
            prompt_structure: 0,
            texts: serde_json::to_string(values)?,
            timestamp_ms,
        })
    }
}

/// Discards everything. Used when persistence is switched off.
pub struct NullStore;

impl PromptStore for NullStore {
    fn save_prompts(&self, _package_name: &str, _prompts: &SubPromptSet) -> Result<(), StoreError> {
        Ok(())
    }
}

impl ResultStore for NullStore {
    fn save_result(&self, _record: &ResultRecord) -> Result<(), StoreError> {
        Ok(())
    }
}
