//! Score model
//!
//! Annotates a compiled template with per-node score ceilings and computes
//! the search depth bound. The ceiling of a node is what a perfect match
//! would earn: its own tag/capture scores, its children's ceilings, and the
//! completion bonus `depth - level` a parent collects when its subtree
//! matches without extra vertical moves. Levels here follow the same
//! geometric counter the matching engine uses, so the ceiling is actually
//! reachable.

use crate::options::Options;
use crate::template::TemplateNode;

/// Fill in `max_score` on every node. Returns the global ceiling (the sum
/// over top-level nodes) and the search depth bound
/// (`min_depth + node count`).
pub fn annotate(nodes: &mut [TemplateNode], options: &Options) -> (i64, i64) {
    let depth = options.min_depth + count(nodes);
    let max_score = score_level(nodes, 0, depth, options);
    (max_score, depth)
}

fn count(nodes: &[TemplateNode]) -> i64 {
    nodes
        .iter()
        .map(|n| 1 + count(&n.children))
        .sum()
}

fn score_level(nodes: &mut [TemplateNode], level: i64, depth: i64, options: &Options) -> i64 {
    let mut total = 0;
    for node in nodes {
        let mut score = options.tag_score;
        if let Some(text) = &node.text {
            score += if text.kind.is_some() {
                options.tag_text_type_score
            } else {
                options.tag_text_score
            };
        }
        if node.attr.is_some() {
            score += options.tag_attr_score;
        }
        if !node.children.is_empty() {
            let child_level = options.next_level(level);
            score += score_level(&mut node.children, child_level, depth, options);
            score += depth - level;
        }
        node.max_score = score;
        total += score;
    }
    total
}
