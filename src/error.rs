use std::path::PathBuf;

use thiserror::Error;

/// Failures while turning a hierarchy dump into a [`crate::hierarchy::ui_node::UiNode`] tree.
#[derive(Debug, Error)]
pub enum HierarchyError {
    #[error("hierarchy dump is empty")]
    Empty,

    #[error("malformed hierarchy XML: {0}")]
    Xml(String),

    #[error("unbalanced hierarchy XML: {0}")]
    Unbalanced(String),

    #[error("hierarchy dump has more than one root element")]
    MultipleRoots,
}

/// Failures while extracting a [`crate::context::context_model::ScreenContext`].
#[derive(Debug, Error)]
pub enum ContextError {
    /// An input field without a resource id cannot be addressed again later,
    /// so the screen is unusable for automated testing.
    #[error(
        "input field of class '{class_name}' at {bounds} has no resource id; choose another screen or app"
    )]
    MissingResourceId { class_name: String, bounds: String },

    #[error(transparent)]
    Hierarchy(#[from] HierarchyError),

    #[error(transparent)]
    Device(#[from] DeviceError),
}

impl ContextError {
    /// Fatal errors end the whole run; nothing downstream can recover them.
    pub fn is_fatal(&self) -> bool {
        matches!(self, ContextError::MissingResourceId { .. })
    }
}

/// Failures talking to the device driver.
#[derive(Debug, Error)]
pub enum DeviceError {
    #[error("failed to spawn {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("`{command}` exited with {status}: {stderr}")]
    CommandFailed {
        command: String,
        status: String,
        stderr: String,
    },

    #[error("unexpected output from `{command}`: {output}")]
    UnexpectedOutput { command: String, output: String },

    #[error("element not found: {0}")]
    ElementNotFound(String),

    #[error("element index {index} out of range, {count} matches for '{target}'")]
    IndexOutOfRange {
        target: String,
        index: usize,
        count: usize,
    },

    #[error("invalid touch coordinate '{0}'")]
    InvalidCoordinate(String),

    #[error(transparent)]
    Hierarchy(#[from] HierarchyError),
}

/// Failures loading configuration files.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("{0} needs at least one non-empty verify_appear or verify_disappear oracle")]
    NoOracle(String),
}

/// Failures writing prompt/result records.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("storage I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to serialize record: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Failures that end a test run.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("app {0} did not reach the foreground")]
    LaunchTimeout(String),

    #[error("navigation to the target screen failed for {0}")]
    Navigation(String),

    #[error(transparent)]
    Context(#[from] ContextError),

    #[error(transparent)]
    Device(#[from] DeviceError),
}

/// Why a model reply could not be turned into field values.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ReplyError {
    #[error("reply has no ```json block")]
    NoFencedBlock,

    #[error("```json block is not valid JSON: {0}")]
    InvalidJson(String),

    #[error("```json block is not a JSON object")]
    NotAnObject,

    #[error("reply is missing values for: {}", .0.join(", "))]
    MissingIds(Vec<String>),
}
