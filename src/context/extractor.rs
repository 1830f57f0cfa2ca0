use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

use tracing::{info, warn};

use crate::context::adjacency::{collect_labels, resolve_adjacency};
use crate::context::context_model::{ExtractionRules, GlobalContext, ScreenContext};
use crate::context::locator::locate_inputs;
use crate::device::driver::Device;
use crate::error::{ContextError, DeviceError};
use crate::hierarchy::parser::parse_hierarchy;
use crate::hierarchy::pruner::prune_tree;
use crate::hierarchy::ui_node::UiNode;

/// Which app the screen belongs to.
#[derive(Debug, Clone)]
pub struct AppIdentity {
    pub app_name: String,
    pub package_name: String,
    pub activity: String,
}

/// Build a [`ScreenContext`] from an already pruned tree.
pub fn build_screen_context(
    root: &UiNode,
    app: &AppIdentity,
    screen: (i32, i32),
    rules: &ExtractionRules,
) -> Result<ScreenContext, ContextError> {
    let components = locate_inputs(root, screen.0, screen.1, rules)?;
    let labels = collect_labels(root, &rules.label_classes);
    let adjacency = resolve_adjacency(&components, &labels);

    Ok(ScreenContext {
        global: GlobalContext {
            app_name: app.app_name.clone(),
            package_name: app.package_name.clone(),
            activity: app.activity.clone(),
            input_count: components.len(),
        },
        components,
        adjacency,
    })
}

/// Parse, prune and analyse a raw hierarchy dump in one go.
pub fn context_from_dump(
    xml: &str,
    app: &AppIdentity,
    screen: (i32, i32),
    rules: &ExtractionRules,
) -> Result<(UiNode, ScreenContext), ContextError> {
    let mut root = parse_hierarchy(xml)?;
    prune_tree(&mut root, &app.package_name);
    let context = build_screen_context(&root, app, screen, rules)?;
    Ok((root, context))
}

const SCREENSHOT_ATTEMPTS: u32 = 5;

/// Drives one screen visit against a live device.
pub struct ContextExtractor<'a> {
    rules: &'a ExtractionRules,
    dump_dir: Option<PathBuf>,
    screenshot_backoff: Duration,
}

impl<'a> ContextExtractor<'a> {
    pub fn new(rules: &'a ExtractionRules) -> Self {
        Self {
            rules,
            dump_dir: None,
            screenshot_backoff: Duration::from_secs(1),
        }
    }

    /// Save each pruned hierarchy under `dir` as `hierarchy_<package>.xml`,
    /// next to a `screenshot_<package>.png` of the same visit.
    pub fn with_dump_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.dump_dir = Some(dir.into());
        self
    }

    /// Base pause between screenshot attempts; attempt `n` waits `n` times this.
    pub fn with_screenshot_backoff(mut self, backoff: Duration) -> Self {
        self.screenshot_backoff = backoff;
        self
    }

    pub fn extract(
        &self,
        device: &mut dyn Device,
        app_name: &str,
        package_name: &str,
    ) -> Result<ScreenContext, ContextError> {
        if let Some(dir) = &self.dump_dir {
            match self.save_screenshot(device, dir, package_name) {
                Ok(path) => info!(path = %path.display(), "screenshot saved"),
                Err(e) => warn!(error = %e, "could not save screenshot"),
            }
        }

        let raw = device.dump_hierarchy()?;
        let foreground = device.current_app()?;
        let screen = device.display_size()?;

        let app = AppIdentity {
            app_name: app_name.to_string(),
            package_name: package_name.to_string(),
            activity: foreground.activity,
        };

        let (pruned, context) = context_from_dump(&raw, &app, screen, self.rules)?;
        info!(
            package = package_name,
            nodes = pruned.node_count(),
            "hierarchy pruned"
        );

        if let Some(dir) = &self.dump_dir {
            match save_dump(dir, package_name, &pruned) {
                Ok(path) => info!(path = %path.display(), "hierarchy saved"),
                Err(e) => warn!(error = %e, "could not save hierarchy dump"),
            }
        }

        info!(inputs = context.components.len(), "input components located");
        for component in &context.components {
            if let Some(labels) = context.adjacent(&component.resource_id_combined) {
                info!(field = %component.resource_id_combined, labels = ?labels, "adjacent labels");
            }
        }

        Ok(context)
    }

    /// Capture the screen with linear backoff between failed attempts.
    fn save_screenshot(
        &self,
        device: &mut dyn Device,
        dir: &Path,
        package_name: &str,
    ) -> Result<PathBuf, ScreenshotError> {
        let mut attempt = 1;
        let png = loop {
            match device.screenshot() {
                Ok(png) => break png,
                Err(e) if attempt < SCREENSHOT_ATTEMPTS => {
                    warn!(attempt, error = %e, "screenshot failed, retrying");
                    thread::sleep(self.screenshot_backoff * attempt);
                    attempt += 1;
                }
                Err(e) => return Err(ScreenshotError::Device(e)),
            }
        };

        std::fs::create_dir_all(dir)?;
        let path = dir.join(format!("screenshot_{}.png", package_name));
        std::fs::write(&path, png)?;
        Ok(path)
    }
}

#[derive(Debug, thiserror::Error)]
enum ScreenshotError {
    #[error("screenshot retries exhausted: {0}")]
    Device(DeviceError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

fn save_dump(dir: &Path, package_name: &str, root: &UiNode) -> std::io::Result<PathBuf> {
    std::fs::create_dir_all(dir)?;
    let path = dir.join(format!("hierarchy_{}.xml", package_name));
    std::fs::write(&path, root.to_xml())?;
    Ok(path)
}
