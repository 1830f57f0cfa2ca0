use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::Serialize;

use crate::error::StoreError;
use crate::prompt::prompt_model::SubPromptSet;
use crate::storage::store::{PromptRecord, PromptStore, ResultRecord, ResultStore};

/// Appends prompt and result records as JSON lines under one directory.
///
/// Files are opened per write and closed again.
pub struct JsonlStore {
    dir: PathBuf,
}

impl JsonlStore {
    pub const PROMPTS_FILE: &'static str = "prompts.jsonl";
    pub const RESULTS_FILE: &'static str = "results.jsonl";

    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn prompts_path(&self) -> PathBuf {
        self.dir.join(Self::PROMPTS_FILE)
    }

    pub fn results_path(&self) -> PathBuf {
        self.dir.join(Self::RESULTS_FILE)
    }

    fn append<T: Serialize>(&self, path: &Path, record: &T) -> Result<(), StoreError> {
        let line = serde_json::to_string(record)?;
        std::fs::create_dir_all(&self.dir).map_err(|e| StoreError::Io {
            path: self.dir.clone(),
            source: e,
        })?;

        let io_err = |e| StoreError::Io {
            path: path.to_path_buf(),
            source: e,
        };
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(io_err)?;
        writeln!(file, "{}", line).map_err(io_err)
    }
}

impl PromptStore for JsonlStore {
    fn save_prompts(&self, package_name: &str, prompts: &SubPromptSet) -> Result<(), StoreError> {
        let record = PromptRecord::new(package_name, prompts, now_ms());
        self.append(&self.prompts_path(), &record)
    }
}

impl ResultStore for JsonlStore {
    fn save_result(&self, record: &ResultRecord) -> Result<(), StoreError> {
        self.append(&self.results_path(), record)
    }
}

pub fn now_ms() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or(0)
}
