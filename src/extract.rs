//! Result extraction
//!
//! Flattens a match tree into the output map. Walks pre-order, so when two
//! template nodes captured under the same key the later (deeper or
//! further-right) value wins; the collision is reported, not fatal.

use std::collections::HashMap;

use crate::diagnostics::Diagnostic;
use crate::matcher::MatchNode;

/// Collect every resolved capture of the match tree into a flat map
pub fn extract<E>(
    nodes: &[MatchNode<E>],
    diagnostics: &mut Vec<Diagnostic>,
) -> HashMap<String, String> {
    let mut map = HashMap::new();
    collect(nodes, &mut map, diagnostics);
    map
}

fn collect<E>(
    nodes: &[MatchNode<E>],
    map: &mut HashMap<String, String>,
    diagnostics: &mut Vec<Diagnostic>,
) {
    for node in nodes {
        for capture in [&node.text, &node.attr].into_iter().flatten() {
            if map.contains_key(&capture.key) {
                Diagnostic::DuplicateKey {
                    key: capture.key.clone(),
                }
                .emit(diagnostics);
            }
            map.insert(capture.key.clone(), capture.value.clone());
        }
        collect(&node.children, map, diagnostics);
    }
}
