//! Static-HTML document adapter
//!
//! Implements [`DocumentTree`] over a `scraper` parse so templates can be
//! harvested from plain HTML strings. Element handles are `ego_tree`
//! node ids, which stay valid for the lifetime of the parsed document.

use ego_tree::{NodeId, NodeRef};
use scraper::{Html, Node, Selector};

use crate::dom::DocumentTree;

/// A parsed HTML document
pub struct HtmlDocument {
    html: Html,
}

impl HtmlDocument {
    /// Parse a complete HTML document. Missing `<html>`/`<body>` wrappers
    /// are supplied by the parser, so fragments work too.
    pub fn parse(html: &str) -> Self {
        Self {
            html: Html::parse_document(html),
        }
    }

    /// First element matching a CSS selector
    pub fn select_first(&self, selector: &str) -> Option<NodeId> {
        let selector = Selector::parse(selector).ok()?;
        self.html.select(&selector).next().map(|el| el.id())
    }

    fn node(&self, el: NodeId) -> Option<NodeRef<'_, Node>> {
        self.html.tree.get(el)
    }
}

impl DocumentTree for HtmlDocument {
    type Element = NodeId;

    fn tag_name(&self, el: NodeId) -> String {
        self.node(el)
            .and_then(|node| node.value().as_element().map(|e| e.name().to_string()))
            .unwrap_or_default()
    }

    fn parent(&self, el: NodeId) -> Option<NodeId> {
        self.node(el)?.parent().map(|p| p.id())
    }

    fn first_child(&self, el: NodeId) -> Option<NodeId> {
        self.node(el)?
            .children()
            .find(|child| child.value().is_element())
            .map(|child| child.id())
    }

    fn next_sibling(&self, el: NodeId) -> Option<NodeId> {
        let mut sibling = self.node(el)?.next_sibling();
        while let Some(node) = sibling {
            if node.value().is_element() {
                return Some(node.id());
            }
            sibling = node.next_sibling();
        }
        None
    }

    fn attribute(&self, el: NodeId, name: &str) -> Option<String> {
        self.node(el)?
            .value()
            .as_element()?
            .attr(name)
            .map(str::to_string)
    }

    fn direct_text(&self, el: NodeId) -> String {
        let Some(node) = self.node(el) else {
            return String::new();
        };
        let mut out = String::new();
        for child in node.children() {
            if let Some(text) = child.value().as_text() {
                let piece = text.text.trim();
                if !piece.is_empty() {
                    if !out.is_empty() {
                        out.push(' ');
                    }
                    out.push_str(piece);
                }
            }
        }
        out
    }

    fn query_selector(&self, selector: &str) -> Option<NodeId> {
        self.select_first(selector)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_selector_and_tag() {
        let doc = HtmlDocument::parse("<div id=\"a\"><span>hi</span></div>");
        let div = doc.select_first("#a").unwrap();
        assert_eq!(doc.tag_name(div), "div");
        assert_eq!(doc.attribute(div, "id").as_deref(), Some("a"));
        assert_eq!(doc.attribute(div, "class"), None);
    }

    #[test]
    fn test_bad_selector_is_none() {
        let doc = HtmlDocument::parse("<div></div>");
        assert!(doc.select_first("div[").is_none());
        assert!(doc.select_first("table").is_none());
    }

    #[test]
    fn test_element_only_navigation() {
        // Text nodes between elements are invisible to the engine
        let doc = HtmlDocument::parse("<div>text<span>a</span>more<b>c</b>tail</div>");
        let div = doc.select_first("div").unwrap();
        let span = doc.first_child(div).unwrap();
        assert_eq!(doc.tag_name(span), "span");
        let b = doc.next_sibling(span).unwrap();
        assert_eq!(doc.tag_name(b), "b");
        assert!(doc.next_sibling(b).is_none());
    }

    #[test]
    fn test_parent_chain() {
        let doc = HtmlDocument::parse("<div><span>hi</span></div>");
        let span = doc.select_first("span").unwrap();
        let div = doc.parent(span).unwrap();
        assert_eq!(doc.tag_name(div), "div");
        let body = doc.parent(div).unwrap();
        assert_eq!(doc.tag_name(body), "body");
    }

    #[test]
    fn test_direct_text_skips_descendants() {
        let doc = HtmlDocument::parse("<div>  own <span>nested</span> tail </div>");
        let div = doc.select_first("div").unwrap();
        assert_eq!(doc.direct_text(div), "own tail");
        let span = doc.select_first("span").unwrap();
        assert_eq!(doc.direct_text(span), "nested");
    }

    #[test]
    fn test_direct_text_empty() {
        let doc = HtmlDocument::parse("<div>  \n </div>");
        let div = doc.select_first("div").unwrap();
        assert_eq!(doc.direct_text(div), "");
    }
}
