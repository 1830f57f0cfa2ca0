use std::thread;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::device::driver::{Device, Key};
use crate::device::finder::{By, find_element, try_fill};
use crate::error::DeviceError;
use crate::synthesis::extractor::FieldValues;

/// Largest raw value a touchscreen reports on either axis.
pub const TOUCH_MAX: i64 = 0x7FFF;

const SWIPE_DURATION_MS: u64 = 500;

fn default_delay() -> f64 {
    2.0
}

fn default_retry() -> u32 {
    3
}

/// One scripted interaction, as written in a target's YAML file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum NavigationStep {
    Click(ClickStep),
    DoubleClick(ClickStep),
    LongClick(ClickStep),
    Swipe(SwipeStep),
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum StepKind {
    #[default]
    Text,
    #[serde(alias = "resource-id")]
    ResourceId,
    Coordinate,
    Enter,
    Back,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClickAction {
    Click,
    DoubleClick,
    LongClick,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ClickStep {
    #[serde(rename = "type", default)]
    pub kind: StepKind,

    #[serde(default)]
    pub target: String,

    /// Overrides the lookup implied by `type`.
    #[serde(default)]
    pub by: Option<By>,

    /// Seconds to wait before acting.
    #[serde(default = "default_delay")]
    pub delay: f64,

    #[serde(default = "default_retry")]
    pub retry: u32,

    #[serde(default)]
    pub raw_x_hex: Option<String>,
    #[serde(default)]
    pub raw_y_hex: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SwipeStep {
    pub raw_fx_hex: String,
    pub raw_fy_hex: String,
    pub raw_tx_hex: String,
    pub raw_ty_hex: String,

    #[serde(default = "default_delay")]
    pub delay: f64,
}

fn parse_hex(raw: &str) -> Result<i64, DeviceError> {
    let trimmed = raw.trim();
    let digits = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);
    i64::from_str_radix(digits, 16).map_err(|_| DeviceError::InvalidCoordinate(raw.to_string()))
}

fn scale_axis(raw: i64, extent: i32) -> i32 {
    let pixel = (raw as f64 / TOUCH_MAX as f64 * extent as f64) as i64;
    pixel.clamp(0, (extent as i64 - 1).max(0)) as i32
}

/// Map raw touchscreen values (hex, `0..=0x7FFF`) to pixel coordinates,
/// clamped to the screen.
pub fn convert_touch_coordinates(
    raw_x_hex: &str,
    raw_y_hex: &str,
    width: i32,
    height: i32,
) -> Result<(i32, i32), DeviceError> {
    let x = parse_hex(raw_x_hex)?;
    let y = parse_hex(raw_y_hex)?;
    Ok((scale_axis(x, width), scale_axis(y, height)))
}

/// Seconds from a config file as a `Duration`. Anything that cannot form one
/// gives zero.
pub fn secs_to_duration(secs: f64) -> Duration {
    if secs > 0.0 {
        Duration::try_from_secs_f64(secs).unwrap_or(Duration::ZERO)
    } else {
        Duration::ZERO
    }
}

fn sleep_secs(secs: f64) {
    let pause = secs_to_duration(secs);
    if !pause.is_zero() {
        thread::sleep(pause);
    }
}

/// Replays navigation steps and fills fields on a device.
pub struct ActionExecutor<'d> {
    device: &'d mut dyn Device,
    fill_pause: Duration,
    retry_pause: Duration,
}

impl<'d> ActionExecutor<'d> {
    pub fn new(device: &'d mut dyn Device) -> Self {
        Self {
            device,
            fill_pause: Duration::from_millis(200),
            retry_pause: Duration::from_secs(1),
        }
    }

    pub fn with_pauses(mut self, fill_pause: Duration, retry_pause: Duration) -> Self {
        self.fill_pause = fill_pause;
        self.retry_pause = retry_pause;
        self
    }

    /// Fill every field. Stops at the first field that cannot be filled.
    pub fn fill_text_inputs(&mut self, values: &FieldValues) -> bool {
        for (combined_id, text) in values {
            if !try_fill(self.device, combined_id, text) {
                return false;
            }
            thread::sleep(self.fill_pause);
        }
        true
    }

    /// Run steps in order. Stops at the first failing step.
    pub fn execute_steps(&mut self, steps: &[NavigationStep]) -> bool {
        steps.iter().all(|step| self.execute_step(step))
    }

    pub fn execute_step(&mut self, step: &NavigationStep) -> bool {
        let result = match step {
            NavigationStep::Click(s) => self.perform_click(s, ClickAction::Click),
            NavigationStep::DoubleClick(s) => self.perform_click(s, ClickAction::DoubleClick),
            NavigationStep::LongClick(s) => self.perform_click(s, ClickAction::LongClick),
            NavigationStep::Swipe(s) => self.perform_swipe(s),
        };

        match result {
            Ok(done) => done,
            Err(e) => {
                error!(step = ?step, error = %e, "step failed");
                false
            }
        }
    }

    fn perform_click(&mut self, step: &ClickStep, action: ClickAction) -> Result<bool, DeviceError> {
        sleep_secs(step.delay);

        match step.kind {
            StepKind::Enter => self.press_and_wait(Key::Enter, step.delay),
            StepKind::Back => self.press_and_wait(Key::Back, step.delay),
            StepKind::Coordinate => {
                let (Some(raw_x), Some(raw_y)) = (&step.raw_x_hex, &step.raw_y_hex) else {
                    return Err(DeviceError::InvalidCoordinate(
                        "coordinate step without raw_x_hex/raw_y_hex".to_string(),
                    ));
                };
                let (w, h) = self.device.display_size()?;
                let (x, y) = convert_touch_coordinates(raw_x, raw_y, w, h)?;
                self.click_at(x, y, action)?;
                Ok(true)
            }
            StepKind::Text | StepKind::ResourceId => {
                let by = step.by.unwrap_or(match step.kind {
                    StepKind::ResourceId => By::ResourceId,
                    _ => By::Text,
                });
                self.click_element(step, by, action)
            }
        }
    }

    fn press_and_wait(&mut self, key: Key, delay: f64) -> Result<bool, DeviceError> {
        self.device.press_key(key)?;
        sleep_secs(delay);
        Ok(true)
    }

    fn click_element(
        &mut self,
        step: &ClickStep,
        by: By,
        action: ClickAction,
    ) -> Result<bool, DeviceError> {
        let attempts = step.retry.max(1);
        for attempt in 1..=attempts {
            if let Some(element) = find_element(self.device, by, &step.target, None)? {
                let (x, y) = element.tap_point();
                self.click_at(x, y, action)?;
                info!(element = %step.target, by = ?by, attempt, "element clicked");
                return Ok(true);
            }
            debug!(element = %step.target, attempt, attempts, "element not found yet");
            thread::sleep(self.retry_pause);
        }

        warn!(element = %step.target, by = ?by, "element not found, giving up");
        Ok(false)
    }

    fn click_at(&mut self, x: i32, y: i32, action: ClickAction) -> Result<(), DeviceError> {
        match action {
            ClickAction::Click => self.device.tap(x, y),
            ClickAction::DoubleClick => self.device.double_tap(x, y),
            ClickAction::LongClick => self.device.long_tap(x, y),
        }
    }

    fn perform_swipe(&mut self, step: &SwipeStep) -> Result<bool, DeviceError> {
        sleep_secs(step.delay);
        let (w, h) = self.device.display_size()?;
        let (fx, fy) = convert_touch_coordinates(&step.raw_fx_hex, &step.raw_fy_hex, w, h)?;
        let (tx, ty) = convert_touch_coordinates(&step.raw_tx_hex, &step.raw_ty_hex, w, h)?;
        self.device.swipe(fx, fy, tx, ty, SWIPE_DURATION_MS)?;
        Ok(true)
    }
}
