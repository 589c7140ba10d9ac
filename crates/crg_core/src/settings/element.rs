//! Mutable settings element tree.
//!
//! A settings file is a small XML document; in memory it is a tree of
//! [`SettingsElement`] nodes behind shared handles so that several tracks
//! can hold onto their own subtree of one capture's settings.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

/// Shared handle to a settings element.
///
/// Children are stored behind handles too, so a handle obtained via
/// [`SettingsElement::ensure_child`] aliases the same node the parent
/// serializes.
pub type ElementHandle = Arc<Mutex<SettingsElement>>;

/// One node of a settings tree: a name, string attributes, and children.
#[derive(Debug, Default)]
pub struct SettingsElement {
    name: String,
    attributes: BTreeMap<String, String>,
    children: Vec<ElementHandle>,
}

impl SettingsElement {
    /// Create an empty element.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: BTreeMap::new(),
            children: Vec::new(),
        }
    }

    /// Wrap an element in a shared handle.
    pub fn into_handle(self) -> ElementHandle {
        Arc::new(Mutex::new(self))
    }

    /// Element name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get an attribute's raw value.
    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(String::as_str)
    }

    /// Set an attribute.
    pub fn set_attribute(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.attributes.insert(key.into(), value.into());
    }

    /// Remove an attribute.
    pub fn remove_attribute(&mut self, key: &str) {
        self.attributes.remove(key);
    }

    /// Get an attribute as a duration (stored as integer nanoseconds).
    pub fn duration_attribute(&self, key: &str) -> Option<Duration> {
        self.attribute(key)
            .and_then(|v| v.trim().parse::<u64>().ok())
            .map(Duration::from_nanos)
    }

    /// Set an attribute from a duration (stored as integer nanoseconds).
    pub fn set_duration_attribute(&mut self, key: impl Into<String>, value: Duration) {
        self.set_attribute(key, (value.as_nanos() as u64).to_string());
    }

    /// Get an attribute as a flag ("1"/"0").
    pub fn bool_attribute(&self, key: &str) -> Option<bool> {
        self.attribute(key).map(|v| v.trim() == "1")
    }

    /// Set an attribute from a flag ("1"/"0").
    pub fn set_bool_attribute(&mut self, key: impl Into<String>, value: bool) {
        self.set_attribute(key, if value { "1" } else { "0" });
    }

    /// All child handles, in document order.
    pub fn children(&self) -> &[ElementHandle] {
        &self.children
    }

    /// Child handles with the given element name.
    pub fn children_named(&self, name: &str) -> Vec<ElementHandle> {
        self.children
            .iter()
            .filter(|c| c.lock().name == name)
            .cloned()
            .collect()
    }

    /// Append a child element and return its handle.
    pub fn add_child(&mut self, child: SettingsElement) -> ElementHandle {
        let handle = child.into_handle();
        self.children.push(handle.clone());
        handle
    }

    /// Get the first child with the given name, creating it if absent.
    pub fn ensure_child(&mut self, name: &str) -> ElementHandle {
        if let Some(existing) = self.children.iter().find(|c| c.lock().name == name) {
            return existing.clone();
        }
        self.add_child(SettingsElement::new(name))
    }

    /// Remove every child with the given name.
    pub fn remove_children(&mut self, name: &str) {
        self.children.retain(|c| c.lock().name != name);
    }

    /// Serialize the tree as an XML document.
    pub fn to_xml(&self) -> String {
        let mut out = String::from("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
        self.write_xml(&mut out, 0);
        out
    }

    fn write_xml(&self, out: &mut String, depth: usize) {
        for _ in 0..depth {
            out.push_str("  ");
        }
        out.push('<');
        out.push_str(&self.name);
        for (key, value) in &self.attributes {
            out.push(' ');
            out.push_str(key);
            out.push_str("=\"");
            out.push_str(&escape_xml(value));
            out.push('"');
        }
        if self.children.is_empty() {
            out.push_str("/>\n");
            return;
        }
        out.push_str(">\n");
        for child in &self.children {
            child.lock().write_xml(out, depth + 1);
        }
        for _ in 0..depth {
            out.push_str("  ");
        }
        out.push_str("</");
        out.push_str(&self.name);
        out.push_str(">\n");
    }

    /// Build an element tree from a parsed XML node.
    pub(crate) fn from_xml_node(node: roxmltree::Node<'_, '_>) -> SettingsElement {
        let mut element = SettingsElement::new(node.tag_name().name());
        for attr in node.attributes() {
            element.set_attribute(attr.name(), attr.value());
        }
        for child in node.children().filter(|n| n.is_element()) {
            element.add_child(SettingsElement::from_xml_node(child));
        }
        element
    }
}

/// Escape a string for use in an XML attribute value.
fn escape_xml(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(ch),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attributes_roundtrip() {
        let mut el = SettingsElement::new("pausePoints");
        el.set_duration_attribute("time", Duration::from_millis(1500));
        el.set_bool_attribute("enabled", true);

        assert_eq!(el.duration_attribute("time"), Some(Duration::from_millis(1500)));
        assert_eq!(el.bool_attribute("enabled"), Some(true));
        assert_eq!(el.attribute("missing"), None);
    }

    #[test]
    fn ensure_child_is_idempotent() {
        let mut root = SettingsElement::new("captureSettings");
        let first = root.ensure_child("range");
        let second = root.ensure_child("range");
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(root.children().len(), 1);
    }

    #[test]
    fn child_handle_aliases_serialized_tree() {
        let mut root = SettingsElement::new("captureSettings");
        let range = root.ensure_child("range");
        range
            .lock()
            .set_duration_attribute("inPoint", Duration::from_secs(2));

        let xml = root.to_xml();
        assert!(xml.contains("inPoint=\"2000000000\""));
    }

    #[test]
    fn xml_roundtrip_preserves_structure() {
        let mut root = SettingsElement::new("captureSettings");
        root.set_attribute("savedAt", "2024-01-01T00:00:00Z");
        let points = root.ensure_child("pausePoints");
        {
            let mut points = points.lock();
            let mut point = SettingsElement::new("point");
            point.set_duration_attribute("time", Duration::from_secs(3));
            point.set_bool_attribute("enabled", false);
            point.set_attribute("marker", "lap <1>");
            points.add_child(point);
        }

        let xml = root.to_xml();
        let doc = roxmltree::Document::parse(&xml).unwrap();
        let parsed = SettingsElement::from_xml_node(doc.root_element());

        assert_eq!(parsed.name(), "captureSettings");
        let points = parsed.children_named("pausePoints");
        assert_eq!(points.len(), 1);
        let entries = points[0].lock().children_named("point");
        assert_eq!(entries.len(), 1);
        let entry = entries[0].lock();
        assert_eq!(entry.duration_attribute("time"), Some(Duration::from_secs(3)));
        assert_eq!(entry.bool_attribute("enabled"), Some(false));
        assert_eq!(entry.attribute("marker"), Some("lap <1>"));
    }
}
