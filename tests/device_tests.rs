use input_synthesis::device::adb::{
    TextChunk, escape_input_text, extract_dump_xml, parse_focused_window, parse_wm_size,
    text_input_chunks,
};
use input_synthesis::device::driver::{ForegroundApp, Key};
use input_synthesis::device::finder::{By, click_element, find_all, find_element};
use input_synthesis::error::DeviceError;

use crate::common::fixtures::{PKG, edit_text, frame, hierarchy, login_screen};
use crate::common::mock_device::MockDevice;

mod common;

// ============================================================================
// adb output parsing
// ============================================================================

#[test]
fn dump_xml_drops_status_line() {
    let raw = "<?xml version='1.0' ?><hierarchy rotation=\"0\"></hierarchy>UI hierchary dumped to: /dev/tty\n";
    assert_eq!(
        extract_dump_xml(raw).as_deref(),
        Some("<?xml version='1.0' ?><hierarchy rotation=\"0\"></hierarchy>")
    );
}

#[test]
fn dump_xml_missing_root_is_none() {
    assert!(extract_dump_xml("ERROR: could not get idle state.").is_none());
}

#[test]
fn focused_window_full_activity() {
    let dumpsys = "  mCurrentFocus=Window{1a2b3c u0 com.example.shop/com.example.shop.ui.LoginActivity}\n";
    assert_eq!(
        parse_focused_window(dumpsys),
        Some(ForegroundApp {
            package: PKG.to_string(),
            activity: "com.example.shop.ui.LoginActivity".to_string(),
        })
    );
}

#[test]
fn focused_window_expands_shorthand() {
    let dumpsys = "  mFocusedApp=ActivityRecord{77 u0 com.example.shop/.MainActivity t12}\n";
    let app = parse_focused_window(dumpsys).unwrap();
    assert_eq!(app.activity, "com.example.shop.MainActivity");
}

#[test]
fn focused_window_absent() {
    assert!(parse_focused_window("  mCurrentFocus=null\n").is_none());
}

#[test]
fn wm_size_prefers_override() {
    let output = "Physical size: 1440x3120\nOverride size: 1080x2340\n";
    assert_eq!(parse_wm_size(output), Some((1080, 2340)));
    assert_eq!(parse_wm_size("Physical size: 1080x2400\n"), Some((1080, 2400)));
    assert_eq!(parse_wm_size("garbage"), None);
}

#[test]
fn input_text_escaping() {
    assert_eq!(escape_input_text("John Smith"), "John%sSmith");
    assert_eq!(escape_input_text("a&b;c"), "a\\&b\\;c");
    assert_eq!(escape_input_text("it's $5"), "it\\'s%s\\$5");
    assert_eq!(escape_input_text("plain"), "plain");
}

#[test]
fn input_text_escaping_removes_control_characters() {
    let escaped = escape_input_text("12 Main St\nApt 4");
    assert!(!escaped.contains('\n'));
    assert_eq!(escaped, "12%sMain%sStApt%s4");
    assert_eq!(escape_input_text("a\tb"), "a%sb");
    assert_eq!(escape_input_text("x\r\u{7}y"), "xy");
}

#[test]
fn multiline_text_becomes_enter_presses() {
    assert_eq!(
        text_input_chunks("12 Main St\r\nApt 4"),
        vec![
            TextChunk::Text("12%sMain%sSt".to_string()),
            TextChunk::Enter,
            TextChunk::Text("Apt%s4".to_string()),
        ]
    );
    assert_eq!(
        text_input_chunks("a\n\nb"),
        vec![
            TextChunk::Text("a".to_string()),
            TextChunk::Enter,
            TextChunk::Enter,
            TextChunk::Text("b".to_string()),
        ]
    );
}

#[test]
fn text_chunks_never_carry_line_breaks() {
    let chunks = text_input_chunks("line one\nline two; rm -rf /\n");
    for chunk in &chunks {
        if let TextChunk::Text(text) = chunk {
            assert!(!text.contains('\n') && !text.contains('\r'));
        }
    }
    assert_eq!(chunks.iter().filter(|c| **c == TextChunk::Enter).count(), 2);
    assert!(text_input_chunks("").is_empty());
}

#[test]
fn keycodes() {
    assert_eq!(Key::Enter.keycode(), "KEYCODE_ENTER");
    assert_eq!(Key::Delete.keycode(), "KEYCODE_DEL");
}

// ============================================================================
// Element lookup
// ============================================================================

#[test]
fn find_all_by_text_in_document_order() {
    let mut device = MockDevice::with_screen(login_screen());
    let matches = find_all(&mut device, By::Text, "Password").unwrap();
    assert_eq!(matches.len(), 1);
    assert_eq!(matches[0].tap_point(), (250, 530));
}

#[test]
fn find_element_with_index() {
    let screen = hierarchy(&frame(
        PKG,
        &format!(
            "{}{}",
            edit_text(0, "com.example.shop:id/line", "[0,100][1080,200]", "", ""),
            edit_text(1, "com.example.shop:id/line", "[0,300][1080,400]", "", ""),
        ),
    ));
    let mut device = MockDevice::with_screen(screen);

    let second = find_element(&mut device, By::ResourceId, "com.example.shop:id/line", Some(1))
        .unwrap()
        .unwrap();
    assert_eq!(second.tap_point(), (540, 350));

    let err = find_element(&mut device, By::ResourceId, "com.example.shop:id/line", Some(2)).unwrap_err();
    assert!(matches!(err, DeviceError::IndexOutOfRange { index: 2, count: 2, .. }));
}

#[test]
fn click_element_reports_miss() {
    let mut device = MockDevice::with_screen(login_screen());
    assert!(!click_element(&mut device, By::Text, "Register").unwrap());
    assert!(click_element(&mut device, By::Text, "Sign in").unwrap());
    assert_eq!(device.taps(), vec![(540, 950)]);
}

#[test]
fn by_accepts_hyphenated_form() {
    let by: By = serde_yaml::from_str("resource-id").unwrap();
    assert_eq!(by, By::ResourceId);
}
