use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Text templates for every prompt fragment.
///
/// Placeholders are written `{name}`; `{{` and `}}` produce literal braces.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromptTemplates {
    /// Placeholders: app_name, activity, input_count, component_types.
    #[serde(rename = "GloP", default = "default_global")]
    pub global: String,

    /// Placeholders: component_order, component_type, resource_id, hint_text, current_text.
    #[serde(rename = "ComP", default = "default_component")]
    pub component: String,

    /// Placeholders: direction, component_id, text, distance.
    #[serde(rename = "AdjP", default = "default_adjacent")]
    pub adjacent: String,

    /// Placeholders: component_list, example_json.
    #[serde(rename = "ResP", default = "default_restrictive")]
    pub restrictive: String,

    #[serde(rename = "GuiP", default = "default_guiding")]
    pub guiding: String,

    /// Placeholders: component_count, example_json.
    #[serde(rename = "Retry", default = "default_retry")]
    pub retry: String,
}

impl Default for PromptTemplates {
    fn default() -> Self {
        Self {
            global: default_global(),
            component: default_component(),
            adjacent: default_adjacent(),
            restrictive: default_restrictive(),
            guiding: default_guiding(),
            retry: default_retry(),
        }
    }
}

#[derive(Deserialize)]
struct TemplateFile {
    prompt_templates: PromptTemplates,
}

/// Load templates from a YAML file with a top-level `prompt_templates` key.
/// Fragments missing from the file keep their built-in text.
pub fn load_templates(path: Option<&Path>) -> Result<PromptTemplates, ConfigError> {
    let Some(path) = path else {
        return Ok(PromptTemplates::default());
    };

    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
        path: path.to_path_buf(),
        source: e,
    })?;
    let file: TemplateFile = serde_yaml::from_str(&content).map_err(|e| ConfigError::Parse {
        path: path.to_path_buf(),
        source: e,
    })?;
    Ok(file.prompt_templates)
}

/// Substitute `{name}` placeholders. Unknown names are left untouched.
pub fn render(template: &str, vars: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(pos) = rest.find(['{', '}']) {
        out.push_str(&rest[..pos]);
        let tail = &rest[pos..];

        if tail.starts_with("{{") {
            out.push('{');
            rest = &tail[2..];
        } else if tail.starts_with("}}") {
            out.push('}');
            rest = &tail[2..];
        } else if tail.starts_with('{') {
            let name_end = tail.find('}');
            let value = name_end.and_then(|end| {
                let name = &tail[1..end];
                vars.iter().find(|(k, _)| *k == name).map(|(_, v)| (*v, end))
            });
            match value {
                Some((value, end)) => {
                    out.push_str(value);
                    rest = &tail[end + 1..];
                }
                None => {
                    out.push('{');
                    rest = &tail[1..];
                }
            }
        } else {
            out.push('}');
            rest = &tail[1..];
        }
    }

    out.push_str(rest);
    out
}

fn default_global() -> String {
    "We are testing the \"{app_name}\" app. Its current page ({activity}) contains {input_count} \
     text input component(s) of type {component_types}."
        .into()
}

fn default_component() -> String {
    "The {component_order} component is a {component_type} with resource id \"{resource_id}\", \
     hint text \"{hint_text}\" and current text \"{current_text}\"."
        .into()
}

fn default_adjacent() -> String {
    "The label \"{text}\" lies {direction} of component {component_id}, {distance} pixels away."
        .into()
}

fn default_restrictive() -> String {
    "Generate one realistic value for each of these components: {component_list}. \
     Reply with a single ```json code block that maps every component id to its value, \
     for example:\n```json\n{example_json}\n```"
        .into()
}

fn default_guiding() -> String {
    "Think about what a real user would type given each hint and the nearby labels, \
     and keep the values consistent with each other so the form can be submitted."
        .into()
}

fn default_retry() -> String {
    "Your previous reply could not be used. Return values for all {component_count} components \
     in a single ```json code block with exactly these keys:\n```json\n{example_json}\n```"
        .into()
}
