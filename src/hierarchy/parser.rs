use std::collections::BTreeMap;

use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};

use crate::error::HierarchyError;
use crate::hierarchy::ui_node::UiNode;

/// Parse a uiautomator hierarchy dump into a node tree.
///
/// Every XML element becomes a [`UiNode`]; text content and processing
/// instructions are ignored.
pub fn parse_hierarchy(xml: &str) -> Result<UiNode, HierarchyError> {
    if xml.trim().is_empty() {
        return Err(HierarchyError::Empty);
    }

    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut stack: Vec<UiNode> = Vec::new();
    let mut root: Option<UiNode> = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(start)) => stack.push(node_from_start(&start)?),
            Ok(Event::Empty(start)) => {
                let node = node_from_start(&start)?;
                attach(&mut stack, &mut root, node)?;
            }
            Ok(Event::End(end)) => {
                let node = stack.pop().ok_or_else(|| {
                    HierarchyError::Unbalanced(format!(
                        "closing tag </{}> without an opening tag",
                        String::from_utf8_lossy(end.name().as_ref())
                    ))
                })?;
                attach(&mut stack, &mut root, node)?;
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => return Err(HierarchyError::Xml(e.to_string())),
        }
    }

    if let Some(open) = stack.last() {
        return Err(HierarchyError::Unbalanced(format!(
            "<{}> is never closed",
            open.tag
        )));
    }

    root.ok_or(HierarchyError::Empty)
}

fn node_from_start(start: &BytesStart<'_>) -> Result<UiNode, HierarchyError> {
    let tag = String::from_utf8_lossy(start.name().as_ref()).into_owned();

    let mut attributes = BTreeMap::new();
    for attr in start.attributes() {
        let attr = attr.map_err(|e| HierarchyError::Xml(e.to_string()))?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr
            .unescape_value()
            .map_err(|e| HierarchyError::Xml(e.to_string()))?
            .into_owned();
        attributes.insert(key, value);
    }

    Ok(UiNode::new(tag, attributes))
}

fn attach(
    stack: &mut [UiNode],
    root: &mut Option<UiNode>,
    node: UiNode,
) -> Result<(), HierarchyError> {
    match stack.last_mut() {
        Some(parent) => {
            parent.children.push(node);
            Ok(())
        }
        None if root.is_none() => {
            *root = Some(node);
            Ok(())
        }
        None => Err(HierarchyError::MultipleRoots),
    }
}
