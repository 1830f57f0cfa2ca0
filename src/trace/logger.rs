use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::Path;
use std::sync::Mutex;

use tracing::warn;

use crate::trace::trace::TraceEvent;

/// Appends [`TraceEvent`]s to a JSON-lines file.
///
/// A file that cannot be opened disables tracing instead of failing the run.
pub struct TraceLogger {
    file: Option<Mutex<File>>,
}

impl TraceLogger {
    pub fn new(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        let file = OpenOptions::new().create(true).append(true).open(path);

        match file {
            Ok(f) => Self {
                file: Some(Mutex::new(f)),
            },
            Err(e) => {
                warn!(path = %path.display(), error = %e, "could not open trace file, tracing disabled");
                Self { file: None }
            }
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.file.is_some()
    }

    pub fn log(&self, event: &TraceEvent) {
        let Some(file) = &self.file else {
            return;
        };
        if let Err(e) = append_line(file, event) {
            warn!(attempt = event.attempt, error = %e, "trace event dropped");
        }
    }
}

fn append_line(file: &Mutex<File>, event: &TraceEvent) -> io::Result<()> {
    let json = serde_json::to_string(event)?;
    let mut file = file
        .lock()
        .map_err(|_| io::Error::other("trace file lock poisoned"))?;
    writeln!(file, "{}", json)
}
