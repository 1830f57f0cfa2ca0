use tracing::{info, warn};

use crate::context::context_model::{ScreenContext, short_name};
use crate::prompt::prompt_model::SubPromptSet;
use crate::prompt::templates::{PromptTemplates, render};
use crate::storage::store::PromptStore;

/// Placeholder value used in the example output shown to the model.
pub const EXAMPLE_VALUE: &str = "generated_value";

/// English ordinal suffix: 1st, 2nd, 3rd, 4th, 11th, 12th, 13th, 21st.
pub fn ordinal_suffix(n: u64) -> &'static str {
    if (11..=13).contains(&(n % 100)) {
        return "th";
    }
    match n % 10 {
        1 => "st",
        2 => "nd",
        3 => "rd",
        _ => "th",
    }
}

pub fn format_ordinal(n: u64) -> String {
    format!("{}{}", n, ordinal_suffix(n))
}

/// Pretty JSON object mapping each id to [`EXAMPLE_VALUE`], in the given order.
pub fn example_json(ids: &[String]) -> String {
    let map: serde_json::Map<String, serde_json::Value> = ids
        .iter()
        .map(|id| (id.clone(), serde_json::Value::from(EXAMPLE_VALUE)))
        .collect();
    serde_json::to_string_pretty(&map).unwrap_or_else(|_| "{}".to_string())
}

/// Renders a [`ScreenContext`] into the prompt sent to the model.
pub struct PromptEngine {
    templates: PromptTemplates,
}

impl PromptEngine {
    pub fn new(templates: PromptTemplates) -> Self {
        Self { templates }
    }

    /// Build all fragments for one screen. Pure: same context, same prompt.
    pub fn build(&self, context: &ScreenContext) -> SubPromptSet {
        let global = self.build_global(context);
        let components = self.build_components(context);
        let adjacents = self.build_adjacent(context);
        let restrictive = self.build_restrictive(context);
        let guiding = self.templates.guiding.clone();

        let full = std::iter::once(global.as_str())
            .chain(components.iter().map(String::as_str))
            .chain(adjacents.iter().map(String::as_str))
            .chain([restrictive.as_str(), guiding.as_str()])
            .collect::<Vec<_>>()
            .join(" ");

        SubPromptSet {
            global,
            components,
            adjacents,
            restrictive,
            guiding,
            full,
        }
    }

    /// Build the prompt and hand the fragments to `store`. Storage failures
    /// are logged and do not affect the returned prompt.
    pub fn build_and_persist(
        &self,
        context: &ScreenContext,
        store: &dyn PromptStore,
    ) -> SubPromptSet {
        let prompts = self.build(context);
        match store.save_prompts(&context.global.package_name, &prompts) {
            Ok(()) => info!(digest = %prompts.digest(), "prompt built and stored"),
            Err(e) => warn!(error = %e, "prompt built but could not be stored"),
        }
        prompts
    }

    /// Prompt used after a malformed or incomplete reply.
    pub fn build_retry(&self, required_ids: &[String]) -> String {
        render(
            &self.templates.retry,
            &[
                ("example_json", example_json(required_ids).as_str()),
                ("component_count", required_ids.len().to_string().as_str()),
            ],
        )
    }

    fn build_global(&self, context: &ScreenContext) -> String {
        let mut types: Vec<&str> = Vec::new();
        for component in &context.components {
            let short = component.short_type();
            if !types.contains(&short) {
                types.push(short);
            }
        }

        render(
            &self.templates.global,
            &[
                ("app_name", context.global.app_name.as_str()),
                ("input_count", context.global.input_count.to_string().as_str()),
                ("activity", short_name(&context.global.activity)),
                ("component_types", types.join(", ").as_str()),
            ],
        )
    }

    fn build_components(&self, context: &ScreenContext) -> Vec<String> {
        context
            .components
            .iter()
            .enumerate()
            .map(|(i, component)| {
                render(
                    &self.templates.component,
                    &[
                        ("component_order", format_ordinal(i as u64 + 1).as_str()),
                        ("component_type", component.short_type()),
                        ("resource_id", component.resource_id.as_str()),
                        ("hint_text", component.hint.as_str()),
                        ("current_text", component.text.as_str()),
                    ],
                )
            })
            .collect()
    }

    fn build_adjacent(&self, context: &ScreenContext) -> Vec<String> {
        let mut fragments = Vec::new();
        for component in &context.components {
            let id = &component.resource_id_combined;
            let Some(labels) = context.adjacent(id) else {
                continue;
            };
            for (direction, entry) in labels.iter() {
                if entry.text.is_empty() {
                    continue;
                }
                fragments.push(render(
                    &self.templates.adjacent,
                    &[
                        ("direction", direction.as_str()),
                        ("component_id", id.as_str()),
                        ("text", entry.text.as_str()),
                        ("distance", format!("{:.2}", entry.distance).as_str()),
                    ],
                ));
            }
        }
        fragments
    }

    fn build_restrictive(&self, context: &ScreenContext) -> String {
        let ids = context.required_ids();
        render(
            &self.templates.restrictive,
            &[
                ("component_list", ids.join(", ").as_str()),
                ("example_json", example_json(&ids).as_str()),
            ],
        )
    }
}

impl Default for PromptEngine {
    fn default() -> Self {
        Self::new(PromptTemplates::default())
    }
}
