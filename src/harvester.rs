//! Harvest facade
//!
//! Ties the pipeline together: compile the template, annotate score
//! ceilings, resolve the starting element, run the matching engine and
//! flatten the winning match tree into the output map. Every call returns a
//! well-formed [`Harvest`]; problems surface as diagnostics, never as
//! errors.

use std::collections::HashMap;

use crate::diagnostics::Diagnostic;
use crate::dom::{Anchor, DocumentTree};
use crate::extract::extract;
use crate::matcher::{CallbackRegistry, MatchNode, SearchContext};
use crate::options::Options;
use crate::score::annotate;
use crate::template::{parse_template, sibling_key};

/// Everything one harvest call produced
#[derive(Debug)]
pub struct Harvest<E> {
    /// Flat capture-key to value map
    pub map: HashMap<String, String>,
    /// The template's score ceiling, independent of the document
    pub max_score: i64,
    /// Best score achieved against the document, `0..=max_score` under the
    /// default options
    pub found_score: i64,
    /// The winning match tree; empty when nothing matched
    pub nodes: Vec<MatchNode<E>>,
    /// Recoverable problems hit along the way
    pub diagnostics: Vec<Diagnostic>,
}

/// Reusable harvest configuration: options plus the callback registry for
/// `func` text types
pub struct Harvester<E> {
    options: Options,
    callbacks: CallbackRegistry<E>,
}

impl<E> Default for Harvester<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> Harvester<E> {
    pub fn new() -> Self {
        Self {
            options: Options::default(),
            callbacks: CallbackRegistry::new(),
        }
    }

    pub fn with_options(options: Options) -> Self {
        Self {
            options,
            callbacks: CallbackRegistry::new(),
        }
    }

    /// Register a named predicate for the `func` text type
    pub fn register(&mut self, name: impl Into<String>, callback: impl Fn(&str, E) -> bool + 'static) {
        self.callbacks.register(name, callback);
    }

    /// Harvest `doc` with the template, starting at `anchor`.
    ///
    /// With no anchor the template is still compiled and scored, so the
    /// returned `max_score` can be used to validate a template without a
    /// document.
    pub fn harvest<D>(&self, doc: &D, tpl: &str, anchor: Option<Anchor<'_, E>>) -> Harvest<E>
    where
        D: DocumentTree<Element = E>,
        E: Copy,
    {
        let options = self.options.resolved();
        let mut diagnostics = Vec::new();
        let mut template = parse_template(tpl, options.space_amount, &mut diagnostics);
        let (max_score, depth) = annotate(&mut template, &options);

        let start = match anchor {
            None => None,
            Some(Anchor::Element(el)) => Some(el),
            Some(Anchor::Selector(selector)) => {
                let el = doc.query_selector(selector);
                if el.is_none() {
                    Diagnostic::AnchorNotFound {
                        selector: selector.to_string(),
                    }
                    .emit(&mut diagnostics);
                }
                el
            }
        };
        let Some(start) = start else {
            return Harvest {
                map: HashMap::new(),
                max_score,
                found_score: 0,
                nodes: Vec::new(),
                diagnostics,
            };
        };

        let mut ctx = SearchContext::new(doc, &options, &self.callbacks, start);
        let (found_score, nodes) =
            ctx.match_siblings(&sibling_key(&template), &template, Some(start), 0, depth, None);
        diagnostics.append(&mut ctx.take_diagnostics());
        let nodes = nodes.unwrap_or_default();
        let map = extract(&nodes, &mut diagnostics);
        tracing::debug!(max_score, found_score, captures = map.len(), "harvest finished");
        Harvest {
            map,
            max_score,
            found_score,
            nodes,
            diagnostics,
        }
    }
}

/// Harvest with default options and no callbacks
pub fn harvest<D: DocumentTree>(
    doc: &D,
    tpl: &str,
    anchor: Option<Anchor<'_, D::Element>>,
) -> Harvest<D::Element> {
    Harvester::new().harvest(doc, tpl, anchor)
}
