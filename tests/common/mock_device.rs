use std::collections::VecDeque;

use input_synthesis::device::driver::{Device, ForegroundApp, Key};
use input_synthesis::error::DeviceError;

#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    Tap(i32, i32),
    Swipe(i32, i32, i32, i32),
    Key(Key),
    Text(String),
    Start(String),
    Stop(String),
}

/// In-memory device. Each dump pops the next queued screen; the last one
/// repeats forever.
pub struct MockDevice {
    screens: VecDeque<String>,
    pub foreground: ForegroundApp,
    pub size: (i32, i32),
    pub actions: Vec<Action>,
    /// When false, `app_start` leaves the foreground unchanged.
    pub launches: bool,
    pub dumps: usize,
    /// Screenshot calls that fail before one succeeds.
    pub screenshot_failures: usize,
    pub screenshots: usize,
}

pub const MOCK_PNG: &[u8] = b"\x89PNG\r\n\x1a\nmock";

impl MockDevice {
    pub fn new(screens: Vec<String>) -> Self {
        Self {
            screens: screens.into(),
            foreground: ForegroundApp::default(),
            size: (1080, 2400),
            actions: Vec::new(),
            launches: true,
            dumps: 0,
            screenshot_failures: 0,
            screenshots: 0,
        }
    }

    pub fn with_screen(screen: String) -> Self {
        Self::new(vec![screen])
    }

    pub fn taps(&self) -> Vec<(i32, i32)> {
        self.actions
            .iter()
            .filter_map(|a| match a {
                Action::Tap(x, y) => Some((*x, *y)),
                _ => None,
            })
            .collect()
    }

    pub fn typed(&self) -> Vec<String> {
        self.actions
            .iter()
            .filter_map(|a| match a {
                Action::Text(t) => Some(t.clone()),
                _ => None,
            })
            .collect()
    }
}

impl Device for MockDevice {
    fn dump_hierarchy(&mut self) -> Result<String, DeviceError> {
        self.dumps += 1;
        let screen = if self.screens.len() > 1 {
            self.screens.pop_front()
        } else {
            self.screens.front().cloned()
        };
        screen.ok_or_else(|| DeviceError::UnexpectedOutput {
            command: "dump".to_string(),
            output: String::new(),
        })
    }

    fn current_app(&mut self) -> Result<ForegroundApp, DeviceError> {
        Ok(self.foreground.clone())
    }

    fn display_size(&mut self) -> Result<(i32, i32), DeviceError> {
        Ok(self.size)
    }

    fn tap(&mut self, x: i32, y: i32) -> Result<(), DeviceError> {
        self.actions.push(Action::Tap(x, y));
        Ok(())
    }

    fn swipe(
        &mut self,
        from_x: i32,
        from_y: i32,
        to_x: i32,
        to_y: i32,
        _duration_ms: u64,
    ) -> Result<(), DeviceError> {
        self.actions.push(Action::Swipe(from_x, from_y, to_x, to_y));
        Ok(())
    }

    fn press_key(&mut self, key: Key) -> Result<(), DeviceError> {
        self.actions.push(Action::Key(key));
        Ok(())
    }

    fn screenshot(&mut self) -> Result<Vec<u8>, DeviceError> {
        self.screenshots += 1;
        if self.screenshot_failures > 0 {
            self.screenshot_failures -= 1;
            return Err(DeviceError::CommandFailed {
                command: "screencap".to_string(),
                status: "exit status: 1".to_string(),
                stderr: "device offline".to_string(),
            });
        }
        Ok(MOCK_PNG.to_vec())
    }

    fn input_text(&mut self, text: &str) -> Result<(), DeviceError> {
        self.actions.push(Action::Text(text.to_string()));
        Ok(())
    }

    fn app_start(&mut self, package: &str, _activity: Option<&str>) -> Result<(), DeviceError> {
        self.actions.push(Action::Start(package.to_string()));
        if self.launches {
            self.foreground = ForegroundApp {
                package: package.to_string(),
                activity: format!("{}.MainActivity", package),
            };
        }
        Ok(())
    }

    fn app_stop(&mut self, package: &str) -> Result<(), DeviceError> {
        self.actions.push(Action::Stop(package.to_string()));
        Ok(())
    }
}
