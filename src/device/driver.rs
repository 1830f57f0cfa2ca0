use crate::error::DeviceError;

/// Package and activity currently in the foreground.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ForegroundApp {
    pub package: String,
    pub activity: String,
}

/// Hardware keys the executor needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Enter,
    Back,
    MoveEnd,
    Delete,
}

impl Key {
    pub fn keycode(&self) -> &'static str {
        match self {
            Key::Enter => "KEYCODE_ENTER",
            Key::Back => "KEYCODE_BACK",
            Key::MoveEnd => "KEYCODE_MOVE_END",
            Key::Delete => "KEYCODE_DEL",
        }
    }
}

/// Everything the pipeline needs from an attached device.
///
/// Implemented over `adb` by [`crate::device::adb::AdbDevice`]; tests use an
/// in-memory fake.
pub trait Device {
    /// Full accessibility hierarchy as uiautomator XML.
    fn dump_hierarchy(&mut self) -> Result<String, DeviceError>;

    fn current_app(&mut self) -> Result<ForegroundApp, DeviceError>;

    /// `(width, height)` in pixels.
    fn display_size(&mut self) -> Result<(i32, i32), DeviceError>;

    fn tap(&mut self, x: i32, y: i32) -> Result<(), DeviceError>;

    fn double_tap(&mut self, x: i32, y: i32) -> Result<(), DeviceError> {
        self.tap(x, y)?;
        self.tap(x, y)
    }

    fn long_tap(&mut self, x: i32, y: i32) -> Result<(), DeviceError> {
        self.swipe(x, y, x, y, 800)
    }

    fn swipe(
        &mut self,
        from_x: i32,
        from_y: i32,
        to_x: i32,
        to_y: i32,
        duration_ms: u64,
    ) -> Result<(), DeviceError>;

    fn press_key(&mut self, key: Key) -> Result<(), DeviceError>;

    /// Current screen as PNG bytes.
    fn screenshot(&mut self) -> Result<Vec<u8>, DeviceError>;

    /// Type into the focused field.
    fn input_text(&mut self, text: &str) -> Result<(), DeviceError>;

    fn app_start(&mut self, package: &str, activity: Option<&str>) -> Result<(), DeviceError>;

    fn app_stop(&mut self, package: &str) -> Result<(), DeviceError>;
}
