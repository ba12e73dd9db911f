//! Multistatus reading helpers.
//!
//! Servers disagree on namespace prefixes (`d:`, `D:`, `cal:`, none at all),
//! so every lookup goes by local name only.

use roxmltree::{Document, Node};

use crate::error::{CalDavError, CalDavResult};

pub(crate) fn parse(text: &str) -> CalDavResult<Document<'_>> {
    Document::parse(text).map_err(|e| CalDavError::Parse(format!("invalid multistatus XML: {}", e)))
}

pub(crate) fn is(node: &Node, name: &str) -> bool {
    node.is_element() && node.tag_name().name().eq_ignore_ascii_case(name)
}

/// The per-resource `response` units of a multistatus body.
pub(crate) fn responses<'a, 'input>(
    doc: &'a Document<'input>,
) -> impl Iterator<Item = Node<'a, 'input>> {
    doc.root_element()
        .descendants()
        .filter(|n| is(n, "response"))
}

/// First descendant element with the given local name.
pub(crate) fn find<'a, 'input>(node: Node<'a, 'input>, name: &str) -> Option<Node<'a, 'input>> {
    node.descendants().find(|n| is(n, name))
}

/// All text below a node (text and CDATA sections concatenated).
pub(crate) fn text(node: Node) -> String {
    node.descendants()
        .filter(|n| n.is_text())
        .filter_map(|n| n.text())
        .collect()
}

/// Trimmed text of the first non-empty descendant named `name`.
///
/// Empty elements are skipped: servers echo unknown properties as empty
/// elements inside a 404 propstat.
pub(crate) fn find_text(node: Node, name: &str) -> Option<String> {
    node.descendants()
        .filter(|n| is(n, name))
        .map(|n| text(n).trim().to_string())
        .find(|s| !s.is_empty())
}

/// The `href` inside the first `property` element of the document, e.g.
/// the principal URL inside `current-user-principal`.
pub(crate) fn property_href(doc: &Document, property: &str) -> Option<String> {
    let prop = find(doc.root_element(), property)?;
    find_text(prop, "href")
}
