//! Harvester: fuzzy template matching for HTML-like document trees
//!
//! Describe the approximate shape of the data you want as a small
//! indentation-based template, point the engine at a document element, and
//! get back the extracted values plus a confidence score:
//!
//! ```
//! use harvester::{Anchor, HtmlDocument, harvest};
//!
//! let doc = HtmlDocument::parse(
//!     r#"<div><h1>Item</h1><span>12.34</span><img src="/i.png"></div>"#,
//! );
//! let tpl = "
//! div
//!   h1{title}
//!   span{price:float}
//!   img[img=src]";
//! let ret = harvest(&doc, tpl, Some(Anchor::Selector("body > div")));
//! assert_eq!(ret.map["title"], "Item");
//! assert_eq!(ret.map["price"], "12.34");
//! assert_eq!(ret.map["img"], "/i.png");
//! assert_eq!(ret.found_score, ret.max_score);
//! ```
//!
//! The match is fuzzy: extra or missing wrapper elements, reordered
//! branches and decoy siblings lower the score instead of breaking the
//! extraction, and `found_score / max_score` tells you how well the page
//! still fits the template.

pub mod diagnostics; // Non-fatal diagnostic taxonomy
pub mod dom; // Abstract document tree capability
pub mod extract; // Match tree -> flat key/value map
pub mod harvester; // Facade: compile, score, match, extract
pub mod matcher; // Combinatorial scored tree search
pub mod options; // Per-call configuration and defaults
pub mod score; // Score ceilings and depth bound
pub mod template; // Indentation DSL compiler

#[cfg(feature = "html")]
pub mod html; // scraper-backed DocumentTree for static HTML

// Re-exports for convenience
pub use diagnostics::{Diagnostic, LineErrorKind};
pub use dom::{Anchor, DocumentTree};
pub use harvester::{Harvest, Harvester, harvest};
pub use matcher::{CallbackRegistry, Capture, MatchNode};
pub use options::Options;
pub use template::{AttrCapture, Tag, TemplateNode, TextCapture, TextType};

#[cfg(feature = "html")]
pub use html::HtmlDocument;
