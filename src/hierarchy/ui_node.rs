use std::collections::BTreeMap;

use quick_xml::escape::escape;

use crate::geometry::bounds::{Bounds, parse_bounds};

/// One element of an accessibility hierarchy dump.
#[derive(Debug, Clone, PartialEq)]
pub struct UiNode {
    /// XML element name, `node` for everything except the `hierarchy` root.
    pub tag: String,
    pub attributes: BTreeMap<String, String>,
    /// Parsed from the `bounds` attribute; `ZERO` when absent or malformed.
    pub bounds: Bounds,
    pub children: Vec<UiNode>,
}

impl UiNode {
    pub fn new(tag: impl Into<String>, attributes: BTreeMap<String, String>) -> Self {
        let bounds = attributes
            .get("bounds")
            .map(|b| parse_bounds(b))
            .unwrap_or(Bounds::ZERO);
        Self {
            tag: tag.into(),
            attributes,
            bounds,
            children: Vec::new(),
        }
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    pub fn attr_or<'a>(&'a self, name: &str, default: &'a str) -> &'a str {
        self.attr(name).unwrap_or(default)
    }

    pub fn class_name(&self) -> &str {
        self.attr_or("class", "")
    }

    pub fn package(&self) -> Option<&str> {
        self.attr("package")
    }

    pub fn resource_id(&self) -> &str {
        self.attr_or("resource-id", "")
    }

    pub fn text(&self) -> &str {
        self.attr_or("text", "")
    }

    pub fn hint(&self) -> &str {
        self.attr_or("hint", "")
    }

    pub fn index(&self) -> &str {
        self.attr_or("index", "0")
    }

    pub fn is_clickable(&self) -> bool {
        self.attr("clickable") == Some("true")
    }

    /// All nodes below `self` in document order, `self` excluded.
    pub fn descendants(&self) -> Descendants<'_> {
        Descendants {
            stack: self.children.iter().rev().collect(),
        }
    }

    pub fn node_count(&self) -> usize {
        1 + self.descendants().count()
    }

    /// Serialize back into uiautomator-style XML.
    pub fn to_xml(&self) -> String {
        let mut out = String::from("<?xml version='1.0' encoding='UTF-8' standalone='yes' ?>");
        self.write_xml(&mut out);
        out
    }

    fn write_xml(&self, out: &mut String) {
        out.push('<');
        out.push_str(&self.tag);
        for (key, value) in &self.attributes {
            out.push(' ');
            out.push_str(key);
            out.push_str("=\"");
            out.push_str(&escape(value.as_str()));
            out.push('"');
        }

        if self.children.is_empty() {
            out.push_str(" />");
            return;
        }

        out.push('>');
        for child in &self.children {
            child.write_xml(out);
        }
        out.push_str("</");
        out.push_str(&self.tag);
        out.push('>');
    }
}

/// Pre-order iterator returned by [`UiNode::descendants`].
pub struct Descendants<'a> {
    stack: Vec<&'a UiNode>,
}

impl<'a> Iterator for Descendants<'a> {
    type Item = &'a UiNode;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.stack.pop()?;
        self.stack.extend(node.children.iter().rev());
        Some(node)
    }
}
