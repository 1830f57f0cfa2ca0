use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::geometry::bounds::{Bounds, Direction};

/// Joins a duplicated resource id with the field's sibling index.
pub const SEPARATOR: &str = "::#::";

/// Split a combined id back into `(resource_id, index)`.
///
/// Only the first separator counts; ids without one have no index.
pub fn split_combined_id(combined: &str) -> (&str, Option<&str>) {
    match combined.split_once(SEPARATOR) {
        Some((id, index)) => (id, Some(index)),
        None => (combined, None),
    }
}

/// One editable field found on the current screen.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputComponent {
    /// Sibling index as reported by the dump.
    pub index: String,
    #[serde(rename = "type")]
    pub class_name: String,
    pub hint: String,
    pub text: String,
    pub resource_id: String,
    /// Unique handle for this field within one extraction pass.
    pub resource_id_combined: String,
    pub bounds: Bounds,
}

impl InputComponent {
    /// `EditText` for `android.widget.EditText`.
    pub fn short_type(&self) -> &str {
        short_name(&self.class_name)
    }
}

/// Last dotted segment of a class or activity name.
pub fn short_name(qualified: &str) -> &str {
    qualified.rsplit('.').next().unwrap_or(qualified)
}

/// Nearest label found in one direction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdjacencyEntry {
    pub text: String,
    pub distance: f64,
}

/// Nearest label per direction for one component; `None` when nothing qualifies.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AdjacentLabels {
    pub top: Option<AdjacencyEntry>,
    pub bottom: Option<AdjacencyEntry>,
    pub left: Option<AdjacencyEntry>,
    pub right: Option<AdjacencyEntry>,
}

impl AdjacentLabels {
    pub fn get(&self, direction: Direction) -> Option<&AdjacencyEntry> {
        match direction {
            Direction::Top => self.top.as_ref(),
            Direction::Bottom => self.bottom.as_ref(),
            Direction::Left => self.left.as_ref(),
            Direction::Right => self.right.as_ref(),
        }
    }

    pub fn slot_mut(&mut self, direction: Direction) -> &mut Option<AdjacencyEntry> {
        match direction {
            Direction::Top => &mut self.top,
            Direction::Bottom => &mut self.bottom,
            Direction::Left => &mut self.left,
            Direction::Right => &mut self.right,
        }
    }

    /// Filled slots in [`Direction::ALL`] order.
    pub fn iter(&self) -> impl Iterator<Item = (Direction, &AdjacencyEntry)> {
        Direction::ALL
            .into_iter()
            .filter_map(|d| self.get(d).map(|entry| (d, entry)))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GlobalContext {
    pub app_name: String,
    pub package_name: String,
    pub activity: String,
    pub input_count: usize,
}

/// Everything the prompt needs to know about one screen visit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScreenContext {
    pub global: GlobalContext,
    pub components: Vec<InputComponent>,
    /// Keyed by `resource_id_combined`.
    pub adjacency: BTreeMap<String, AdjacentLabels>,
}

impl ScreenContext {
    /// Combined ids the model must answer for, in component order.
    pub fn required_ids(&self) -> Vec<String> {
        self.components
            .iter()
            .map(|c| c.resource_id_combined.clone())
            .collect()
    }

    pub fn adjacent(&self, combined_id: &str) -> Option<&AdjacentLabels> {
        self.adjacency.get(combined_id)
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }
}

/// Exception lists and class allow-lists that steer extraction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractionRules {
    /// Widget classes treated as text inputs, searched in this order.
    #[serde(default = "default_input_classes")]
    pub input_classes: Vec<String>,

    /// Widget classes whose text can label an input.
    #[serde(default = "default_label_classes")]
    pub label_classes: Vec<String>,

    /// Pickers that report themselves as text fields.
    #[serde(default = "default_denied_resource_ids")]
    pub denied_resource_ids: Vec<String>,

    /// Packages whose fields are reachable although reported off-screen.
    #[serde(default = "default_always_visible_packages")]
    pub always_visible_packages: Vec<String>,
}

impl Default for ExtractionRules {
    fn default() -> Self {
        Self {
            input_classes: default_input_classes(),
            label_classes: default_label_classes(),
            denied_resource_ids: default_denied_resource_ids(),
            always_visible_packages: default_always_visible_packages(),
        }
    }
}

fn default_input_classes() -> Vec<String> {
    vec![
        "android.widget.EditText".into(),
        "android.widget.AutoCompleteTextView".into(),
        "android.widget.MultiAutoCompleteTextView".into(),
    ]
}

fn default_label_classes() -> Vec<String> {
    vec!["android.widget.TextView".into()]
}

fn default_denied_resource_ids() -> Vec<String> {
    vec![
        "com.kajda.fuelio:id/initialDate".into(),
        "com.omronhealthcare.omronconnect:id/actv_date".into(),
    ]
}

fn default_always_visible_packages() -> Vec<String> {
    vec!["com.applabstudios.ai.mail.homescreen.inbox".into()]
}
