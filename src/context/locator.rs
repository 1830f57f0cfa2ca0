use std::collections::{HashMap, HashSet};

use tracing::{debug, warn};

use crate::context::context_model::{ExtractionRules, InputComponent, SEPARATOR};
use crate::error::ContextError;
use crate::hierarchy::ui_node::UiNode;

/// Find the text inputs on a pruned tree that automation can actually reach.
///
/// Candidates are matched by class in `rules.input_classes` order. A
/// candidate without a resource id aborts the pass; denylisted pickers are
/// skipped; fields of always-visible packages bypass the geometry check;
/// everything else must be fully on screen and clickable.
pub fn locate_inputs(
    root: &UiNode,
    screen_w: i32,
    screen_h: i32,
    rules: &ExtractionRules,
) -> Result<Vec<InputComponent>, ContextError> {
    let mut accepted = Vec::new();

    for node in input_candidates(root, &rules.input_classes) {
        let resource_id = node.resource_id();
        if resource_id.is_empty() {
            return Err(ContextError::MissingResourceId {
                class_name: node.class_name().to_string(),
                bounds: node.bounds.to_wire(),
            });
        }

        if rules.denied_resource_ids.iter().any(|id| id == resource_id) {
            warn!(resource_id, "skipping picker reported as a text field");
            continue;
        }

        let always_visible = node
            .package()
            .is_some_and(|pkg| rules.always_visible_packages.iter().any(|p| p == pkg));
        if always_visible {
            accepted.push(node);
            continue;
        }

        if node.bounds.is_visible(screen_w, screen_h) && node.is_clickable() {
            accepted.push(node);
        } else {
            debug!(resource_id, bounds = %node.bounds.to_wire(), "input not visible or not clickable");
        }
    }

    Ok(to_components(&accepted))
}

/// Nodes whose class is in `classes`, grouped by class order, each node once.
fn input_candidates<'a>(root: &'a UiNode, classes: &[String]) -> Vec<&'a UiNode> {
    let mut seen: HashSet<*const UiNode> = HashSet::new();
    let mut found = Vec::new();

    for class in classes {
        for node in root.descendants().filter(|n| n.class_name() == class) {
            if seen.insert(node as *const UiNode) {
                found.push(node);
            }
        }
    }

    found
}

fn to_components(nodes: &[&UiNode]) -> Vec<InputComponent> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for node in nodes {
        *counts.entry(node.resource_id()).or_insert(0) += 1;
    }

    let mut used: HashSet<String> = HashSet::new();

    nodes
        .iter()
        .map(|node| {
            let resource_id = node.resource_id();
            let resource_id_combined = if counts[resource_id] > 1 {
                disambiguate(resource_id, node.index(), &mut used)
            } else {
                used.insert(resource_id.to_string());
                resource_id.to_string()
            };

            InputComponent {
                index: node.index().to_string(),
                class_name: node.class_name().to_string(),
                hint: node.hint().to_string(),
                text: node.text().to_string(),
                resource_id: resource_id.to_string(),
                resource_id_combined,
                bounds: node.bounds,
            }
        })
        .collect()
}

/// `id + SEPARATOR + index`; fields sharing both id and sibling index (same
/// id under different parents) fall back to the first free ordinal.
fn disambiguate(resource_id: &str, index: &str, used: &mut HashSet<String>) -> String {
    let preferred = format!("{}{}{}", resource_id, SEPARATOR, index);
    if used.insert(preferred.clone()) {
        return preferred;
    }

    let mut ordinal = 0usize;
    loop {
        let candidate = format!("{}{}{}", resource_id, SEPARATOR, ordinal);
        if used.insert(candidate.clone()) {
            return candidate;
        }
        ordinal += 1;
    }
}
