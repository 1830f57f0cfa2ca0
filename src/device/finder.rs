use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::context::context_model::split_combined_id;
use crate::device::driver::{Device, Key};
use crate::error::DeviceError;
use crate::geometry::bounds::Bounds;
use crate::hierarchy::parser::parse_hierarchy;

/// How a step or oracle addresses an element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum By {
    #[default]
    Text,
    #[serde(alias = "resource-id", alias = "resourceId")]
    ResourceId,
}

/// An on-screen element matched by [`find_all`].
#[derive(Debug, Clone, PartialEq)]
pub struct MatchedElement {
    pub bounds: Bounds,
    pub text: String,
}

impl MatchedElement {
    pub fn tap_point(&self) -> (i32, i32) {
        let (x, y) = self.bounds.center();
        (x.round() as i32, y.round() as i32)
    }
}

/// All elements on the current screen matching `value`, in document order.
pub fn find_all(
    device: &mut dyn Device,
    by: By,
    value: &str,
) -> Result<Vec<MatchedElement>, DeviceError> {
    let root = parse_hierarchy(&device.dump_hierarchy()?)?;
    let matches = std::iter::once(&root)
        .chain(root.descendants())
        .filter(|node| match by {
            By::Text => node.text() == value,
            By::ResourceId => node.resource_id() == value,
        })
        .map(|node| MatchedElement {
            bounds: node.bounds,
            text: node.text().to_string(),
        })
        .collect();
    Ok(matches)
}

/// The first match, or the `index`-th match when given.
pub fn find_element(
    device: &mut dyn Device,
    by: By,
    value: &str,
    index: Option<usize>,
) -> Result<Option<MatchedElement>, DeviceError> {
    let mut matches = find_all(device, by, value)?;
    match index {
        None => Ok(matches.into_iter().next()),
        Some(i) if i < matches.len() => Ok(Some(matches.swap_remove(i))),
        Some(i) => Err(DeviceError::IndexOutOfRange {
            target: value.to_string(),
            index: i,
            count: matches.len(),
        }),
    }
}

pub fn exists(device: &mut dyn Device, by: By, value: &str) -> Result<bool, DeviceError> {
    Ok(!find_all(device, by, value)?.is_empty())
}

/// Tap the first match. Returns `false` when nothing matched.
pub fn click_element(device: &mut dyn Device, by: By, value: &str) -> Result<bool, DeviceError> {
    match find_element(device, by, value, None)? {
        Some(element) => {
            let (x, y) = element.tap_point();
            device.tap(x, y)?;
            Ok(true)
        }
        None => Ok(false),
    }
}

/// Replace the text of the field addressed by a combined id.
///
/// A combined id carrying an index selects that match among fields sharing
/// the raw resource id.
pub fn set_text_by_combined_id(
    device: &mut dyn Device,
    combined_id: &str,
    text: &str,
) -> Result<(), DeviceError> {
    let (resource_id, index) = split_combined_id(combined_id);
    let index = index
        .map(|i| {
            i.parse::<usize>()
                .map_err(|_| DeviceError::ElementNotFound(combined_id.to_string()))
        })
        .transpose()?;

    let element = find_element(device, By::ResourceId, resource_id, index)?
        .ok_or_else(|| DeviceError::ElementNotFound(combined_id.to_string()))?;

    let (x, y) = element.tap_point();
    device.tap(x, y)?;
    device.press_key(Key::MoveEnd)?;
    for _ in 0..element.text.chars().count() {
        device.press_key(Key::Delete)?;
    }
    device.input_text(text)
}

/// Fill one field, logging instead of failing.
pub fn try_fill(device: &mut dyn Device, combined_id: &str, text: &str) -> bool {
    match set_text_by_combined_id(device, combined_id, text) {
        Ok(()) => {
            info!(field = combined_id, value = text, "filled");
            true
        }
        Err(e) => {
            warn!(field = combined_id, value = text, error = %e, "fill failed");
            false
        }
    }
}
