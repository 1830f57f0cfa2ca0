use std::process::Command;

use tracing::{debug, warn};

use crate::device::driver::{Device, ForegroundApp, Key};
use crate::error::DeviceError;

/// Device driver backed by the `adb` command-line tool.
///
/// Every call spawns one `adb` process; nothing is kept open between calls.
pub struct AdbDevice {
    adb_path: String,
    serial: Option<String>,
}

impl AdbDevice {
    pub fn new(adb_path: &str, serial: Option<&str>) -> Self {
        Self {
            adb_path: adb_path.to_string(),
            serial: serial.map(|s| s.to_string()),
        }
    }

    /// Run `adb [-s serial] <args>` and return stdout.
    fn run(&self, args: &[&str]) -> Result<String, DeviceError> {
        let stdout = self.run_bytes(args)?;
        Ok(String::from_utf8_lossy(&stdout).into_owned())
    }

    fn run_bytes(&self, args: &[&str]) -> Result<Vec<u8>, DeviceError> {
        let mut command = Command::new(&self.adb_path);
        if let Some(serial) = &self.serial {
            command.arg("-s").arg(serial);
        }
        command.args(args);

        debug!(args = ?args, "adb");
        let output = command.output().map_err(|e| DeviceError::Spawn {
            program: self.adb_path.clone(),
            source: e,
        })?;

        if !output.status.success() {
            return Err(DeviceError::CommandFailed {
                command: format!("adb {}", args.join(" ")),
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(output.stdout)
    }

    fn shell(&self, args: &[&str]) -> Result<String, DeviceError> {
        let mut full = vec!["shell"];
        full.extend_from_slice(args);
        self.run(&full)
    }
}

impl Default for AdbDevice {
    fn default() -> Self {
        Self::new("adb", None)
    }
}

impl Device for AdbDevice {
    fn dump_hierarchy(&mut self) -> Result<String, DeviceError> {
        let raw = self.run(&["exec-out", "uiautomator", "dump", "/dev/tty"])?;
        extract_dump_xml(&raw).ok_or_else(|| DeviceError::UnexpectedOutput {
            command: "uiautomator dump".into(),
            output: raw.chars().take(200).collect(),
        })
    }

    fn current_app(&mut self) -> Result<ForegroundApp, DeviceError> {
        let raw = self.shell(&["dumpsys", "window"])?;
        parse_focused_window(&raw).ok_or_else(|| DeviceError::UnexpectedOutput {
            command: "dumpsys window".into(),
            output: "no focused window".into(),
        })
    }

    fn display_size(&mut self) -> Result<(i32, i32), DeviceError> {
        let raw = self.shell(&["wm", "size"])?;
        parse_wm_size(&raw).ok_or_else(|| DeviceError::UnexpectedOutput {
            command: "wm size".into(),
            output: raw.trim().to_string(),
        })
    }

    fn tap(&mut self, x: i32, y: i32) -> Result<(), DeviceError> {
        self.shell(&["input", "tap", &x.to_string(), &y.to_string()])?;
        Ok(())
    }

    fn swipe(
        &mut self,
        from_x: i32,
        from_y: i32,
        to_x: i32,
        to_y: i32,
        duration_ms: u64,
    ) -> Result<(), DeviceError> {
        self.shell(&[
            "input",
            "swipe",
            &from_x.to_string(),
            &from_y.to_string(),
            &to_x.to_string(),
            &to_y.to_string(),
            &duration_ms.to_string(),
        ])?;
        Ok(())
    }

    fn press_key(&mut self, key: Key) -> Result<(), DeviceError> {
        self.shell(&["input", "keyevent", key.keycode()])?;
        Ok(())
    }

    fn screenshot(&mut self) -> Result<Vec<u8>, DeviceError> {
        let png = self.run_bytes(&["exec-out", "screencap", "-p"])?;
        if !png.starts_with(PNG_MAGIC) {
            return Err(DeviceError::UnexpectedOutput {
                command: "screencap -p".into(),
                output: String::from_utf8_lossy(&png).chars().take(200).collect(),
            });
        }
        Ok(png)
    }

    fn input_text(&mut self, text: &str) -> Result<(), DeviceError> {
        if !text.is_ascii() {
            warn!(text, "`input text` may drop or mangle non-ASCII characters");
        }
        if text.chars().any(|c| c.is_control() && !matches!(c, '\n' | '\r' | '\t')) {
            warn!(text, "control characters dropped from input text");
        }

        for chunk in text_input_chunks(text) {
            match chunk {
                TextChunk::Text(escaped) => {
                    self.shell(&["input", "text", &escaped])?;
                }
                TextChunk::Enter => {
                    self.shell(&["input", "keyevent", Key::Enter.keycode()])?;
                }
            }
        }
        Ok(())
    }

    fn app_start(&mut self, package: &str, activity: Option<&str>) -> Result<(), DeviceError> {
        match activity {
            Some(activity) => {
                let component = format!("{}/{}", package, activity);
                self.shell(&["am", "start", "-n", &component])?;
            }
            None => {
                self.shell(&[
                    "monkey",
                    "-p",
                    package,
                    "-c",
                    "android.intent.category.LAUNCHER",
                    "1",
                ])?;
            }
        }
        Ok(())
    }

    fn app_stop(&mut self, package: &str) -> Result<(), DeviceError> {
        self.shell(&["am", "force-stop", package])?;
        Ok(())
    }
}

/// Cut the XML document out of `uiautomator dump /dev/tty` output, which
/// appends a status line after the closing tag.
pub fn extract_dump_xml(raw: &str) -> Option<String> {
    let start = raw.find('<')?;
    let end = raw.rfind("</hierarchy>")? + "</hierarchy>".len();
    (start < end).then(|| raw[start..end].to_string())
}

/// Read the focused window out of `dumpsys window`.
///
/// Handles lines like `mCurrentFocus=Window{1a2b u0 com.app/com.app.MainActivity}`
/// and expands shorthand activities (`com.app/.Main`).
pub fn parse_focused_window(dumpsys: &str) -> Option<ForegroundApp> {
    dumpsys
        .lines()
        .filter(|line| line.contains("mCurrentFocus=") || line.contains("mFocusedApp="))
        .find_map(|line| {
            let component = line
                .split_whitespace()
                .find(|token| token.contains('/'))?
                .trim_end_matches('}');
            let (package, activity) = component.split_once('/')?;
            if package.is_empty() || activity.is_empty() {
                return None;
            }
            let activity = match activity.strip_prefix('.') {
                Some(rest) => format!("{}.{}", package, rest),
                None => activity.to_string(),
            };
            Some(ForegroundApp {
                package: package.to_string(),
                activity,
            })
        })
}

/// Parse `wm size`, preferring an override size over the physical one.
pub fn parse_wm_size(output: &str) -> Option<(i32, i32)> {
    let parse_line = |prefix: &str| {
        output.lines().find_map(|line| {
            let dims = line.trim().strip_prefix(prefix)?.trim();
            let (w, h) = dims.split_once('x')?;
            Some((w.trim().parse().ok()?, h.trim().parse().ok()?))
        })
    };
    parse_line("Override size:").or_else(|| parse_line("Physical size:"))
}

const PNG_MAGIC: &[u8] = b"\x89PNG";

/// One `adb shell` call needed to type a value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TextChunk {
    /// Already escaped for `input text`.
    Text(String),
    Enter,
}

/// Split a value into `input text` calls. Line breaks become Enter key
/// presses so no newline ever reaches the device shell.
pub fn text_input_chunks(text: &str) -> Vec<TextChunk> {
    let mut chunks = Vec::new();
    for (i, line) in text.split('\n').enumerate() {
        if i > 0 {
            chunks.push(TextChunk::Enter);
        }
        let escaped = escape_input_text(line);
        if !escaped.is_empty() {
            chunks.push(TextChunk::Text(escaped));
        }
    }
    chunks
}

/// Escape text for `input text`: spaces and tabs become `%s`, shell
/// metacharacters are backslash-escaped, other control characters are dropped.
pub fn escape_input_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len() * 2);
    for c in text.chars() {
        match c {
            ' ' | '\t' => out.push_str("%s"),
            c if c.is_control() => {}
            '\'' | '"' | '\\' | '&' | '|' | ';' | '<' | '>' | '(' | ')' | '$' | '`' | '*'
            | '?' | '#' | '~' | '!' | '%' | '[' | ']' | '{' | '}' => {
                out.push('\\');
                out.push(c);
            }
            _ => out.push(c),
        }
    }
    out
}
