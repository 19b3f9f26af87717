//! Abstract document tree
//!
//! The matching engine only needs read-only parent/child/sibling navigation
//! plus tag, attribute and direct-text queries, expressed over a cheap
//! copyable element handle. Anything tree-shaped can implement this — a
//! static HTML parse (see the `html` module), a remote browser page, a
//! custom DOM.

use std::fmt::Debug;
use std::hash::Hash;

/// Read-only view of an HTML-like document tree
pub trait DocumentTree {
    /// Element handle. Handles are used as cache keys, so equal handles must
    /// refer to the same element for the lifetime of a harvest call.
    type Element: Copy + Eq + Hash + Debug;

    /// Tag name of the element; the empty string for non-element nodes.
    /// Case does not matter, the engine compares case-insensitively.
    fn tag_name(&self, el: Self::Element) -> String;

    /// Parent node, `None` at the top of the tree
    fn parent(&self, el: Self::Element) -> Option<Self::Element>;

    /// First *element* child, skipping text and other node kinds
    fn first_child(&self, el: Self::Element) -> Option<Self::Element>;

    /// Next *element* sibling, skipping text and other node kinds
    fn next_sibling(&self, el: Self::Element) -> Option<Self::Element>;

    /// Attribute value, `None` when absent
    fn attribute(&self, el: Self::Element, name: &str) -> Option<String>;

    /// Concatenation of the element's immediate text-node children, each
    /// trimmed; the empty string when there are none
    fn direct_text(&self, el: Self::Element) -> String;

    /// Resolve a selector to an element. The default implementation
    /// supports no selectors.
    fn query_selector(&self, selector: &str) -> Option<Self::Element> {
        let _ = selector;
        None
    }
}

/// Where to start harvesting inside a document
#[derive(Debug, Clone, Copy)]
pub enum Anchor<'a, E> {
    /// A concrete element handle
    Element(E),
    /// A selector resolved through [`DocumentTree::query_selector`]
    Selector(&'a str),
}
