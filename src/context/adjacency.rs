use std::collections::BTreeMap;

use crate::context::context_model::{AdjacencyEntry, AdjacentLabels, InputComponent};
use crate::geometry::bounds::{Bounds, axis_distance, relative_direction};
use crate::hierarchy::ui_node::UiNode;

/// A static-text node that may label an input.
#[derive(Debug, Clone, PartialEq)]
pub struct LabelCandidate {
    pub text: String,
    pub bounds: Bounds,
}

/// Collect label candidates in document order, text trimmed.
pub fn collect_labels(root: &UiNode, label_classes: &[String]) -> Vec<LabelCandidate> {
    root.descendants()
        .filter(|n| label_classes.iter().any(|c| c == n.class_name()))
        .map(|n| LabelCandidate {
            text: n.text().trim().to_string(),
            bounds: n.bounds,
        })
        .collect()
}

/// Nearest label in each direction for one field.
///
/// Ties keep the label that appears first in `labels`.
pub fn nearest_labels(element: &Bounds, labels: &[LabelCandidate]) -> AdjacentLabels {
    let mut adjacent = AdjacentLabels::default();

    for label in labels {
        let Some(direction) = relative_direction(element, &label.bounds) else {
            continue;
        };
        let distance = axis_distance(element, &label.bounds, direction);

        let slot = adjacent.slot_mut(direction);
        let closer = slot.as_ref().is_none_or(|best| distance < best.distance);
        if closer {
            *slot = Some(AdjacencyEntry {
                text: label.text.clone(),
                distance,
            });
        }
    }

    adjacent
}

/// Resolve adjacency for every component, keyed by combined id.
pub fn resolve_adjacency(
    components: &[InputComponent],
    labels: &[LabelCandidate],
) -> BTreeMap<String, AdjacentLabels> {
    components
        .iter()
        .map(|c| {
            (
                c.resource_id_combined.clone(),
                nearest_labels(&c.bounds, labels),
            )
        })
        .collect()
}
