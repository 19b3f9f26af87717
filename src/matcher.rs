//! Fuzzy tree-matching engine
//!
//! Aligns sets of sibling template nodes against regions of a document
//! tree. The search is combinatorial (every non-empty subset of siblings,
//! every anchor placement, with backtracking), explores one level up and
//! down to absorb missing or extra wrapper elements, memoizes subtree
//! scores per `(element, node-set)` pair, and is bounded by a wall-clock
//! budget checked at the top of every recursive call.
//!
//! All mutable search state lives in a [`SearchContext`] created fresh for
//! each harvest call, so concurrent harvests never share anything.

use std::rc::Rc;
use std::time::Instant;

use lasso::{Rodeo, Spur};
use rustc_hash::FxHashMap;

use crate::diagnostics::Diagnostic;
use crate::dom::DocumentTree;
use crate::options::Options;
use crate::template::{Tag, TemplateNode, TextType, sibling_key};

/// A resolved output value: the template's capture key and the document's
/// text or attribute value
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Capture {
    pub key: String,
    pub value: String,
}

/// A template node bound to a document element with an achieved score
#[derive(Debug, Clone, PartialEq)]
pub struct MatchNode<E> {
    /// Id of the template node this binds
    pub id: u32,
    /// The matched document element
    pub el: E,
    /// Achieved score for this node and its subtree
    pub score: i64,
    /// Resolved text capture, if any
    pub text: Option<Capture>,
    /// Resolved attribute capture, if any
    pub attr: Option<Capture>,
    /// Best-found bound children; template children that found no
    /// counterpart are omitted
    pub children: Vec<MatchNode<E>>,
}

/// Named predicates for the `func` text type, injected per harvester
/// instead of being looked up in any ambient global scope
pub struct CallbackRegistry<E> {
    callbacks: FxHashMap<String, Callback<E>>,
}

type Callback<E> = Box<dyn Fn(&str, E) -> bool>;

impl<E> Default for CallbackRegistry<E> {
    fn default() -> Self {
        Self {
            callbacks: FxHashMap::default(),
        }
    }
}

impl<E> CallbackRegistry<E> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a predicate under `name`. The callback receives the
    /// element's direct text and the element handle.
    pub fn register(&mut self, name: impl Into<String>, callback: impl Fn(&str, E) -> bool + 'static) {
        self.callbacks.insert(name.into(), Box::new(callback));
    }

    pub fn get(&self, name: &str) -> Option<&Callback<E>> {
        self.callbacks.get(name)
    }
}

/// Alignment state for one template node while a subset is walked across
/// the sibling chain. Rebuilt from scratch every time the node is anchored
/// to a new element, so attempts never leak state into each other.
struct Cursor<'t, E> {
    node: &'t TemplateNode,
    el: Option<E>,
    score: i64,
    text: Option<Capture>,
    attr: Option<Capture>,
    children: Vec<MatchNode<E>>,
}

impl<'t, E: Copy> Cursor<'t, E> {
    fn new(node: &'t TemplateNode) -> Self {
        Self {
            node,
            el: None,
            score: 0,
            text: None,
            attr: None,
            children: Vec::new(),
        }
    }

    fn snapshot(&self) -> MatchNode<E> {
        MatchNode {
            id: self.node.id,
            el: self.el.expect("snapshot of an unanchored cursor"),
            score: self.score,
            text: self.text.clone(),
            attr: self.attr.clone(),
            children: self.children.clone(),
        }
    }
}

/// All per-call search state: document handle, resolved options, the
/// callback registry, the root boundary, the clock and the caches
pub(crate) struct SearchContext<'a, D: DocumentTree> {
    doc: &'a D,
    options: &'a Options,
    callbacks: &'a CallbackRegistry<D::Element>,
    /// Parent of the element the harvest started from; vertical search
    /// never climbs past it
    root: Option<D::Element>,
    /// The element the harvest started from; the downward sibling scan
    /// never walks past it
    root_first: D::Element,
    started: Instant,
    tags: Rodeo,
    tag_cache: FxHashMap<D::Element, Spur>,
    text_cache: FxHashMap<D::Element, Rc<str>>,
    parent_cache: FxHashMap<D::Element, Option<D::Element>>,
    first_child_cache: FxHashMap<D::Element, Option<D::Element>>,
    next_cache: FxHashMap<D::Element, Option<D::Element>>,
    /// Memoized subtree scores keyed by element, then by node-set key
    score_cache: FxHashMap<D::Element, FxHashMap<String, i64>>,
    diagnostics: Vec<Diagnostic>,
}

impl<'a, D: DocumentTree> SearchContext<'a, D> {
    pub(crate) fn new(
        doc: &'a D,
        options: &'a Options,
        callbacks: &'a CallbackRegistry<D::Element>,
        start: D::Element,
    ) -> Self {
        let root = doc.parent(start);
        let mut parent_cache = FxHashMap::default();
        parent_cache.insert(start, root);
        Self {
            doc,
            options,
            callbacks,
            root,
            root_first: start,
            started: Instant::now(),
            tags: Rodeo::default(),
            tag_cache: FxHashMap::default(),
            text_cache: FxHashMap::default(),
            parent_cache,
            first_child_cache: FxHashMap::default(),
            next_cache: FxHashMap::default(),
            score_cache: FxHashMap::default(),
            diagnostics: Vec::new(),
        }
    }

    pub(crate) fn take_diagnostics(&mut self) -> Vec<Diagnostic> {
        std::mem::take(&mut self.diagnostics)
    }

    /// Align `siblings` against the chain starting at `first_el`. Returns
    /// the best score and the bound nodes; `(0, None)` means no match.
    ///
    /// `extra_parent` carries the context element when there is no candidate
    /// chain at all (the anchored element had no children), in which case
    /// only the upward exploration can still make progress.
    pub(crate) fn match_siblings(
        &mut self,
        set_key: &str,
        siblings: &[TemplateNode],
        first_el: Option<D::Element>,
        level: i64,
        max_level: i64,
        extra_parent: Option<D::Element>,
    ) -> (i64, Option<Vec<MatchNode<D::Element>>>) {
        // The only cancellation point; a combination pass already underway
        // is allowed to finish, so the budget can be modestly overshot.
        if siblings.is_empty() || self.out_of_time() {
            return (0, None);
        }
        let mut best_score = 0;
        let mut best_nodes = None;

        if level < max_level {
            // The template may be one level shallower than the document:
            // retry the same siblings against the grandparent's children.
            // Skipping a level costs one point, so a detour only wins when
            // it is genuinely better than what the current level offers.
            let up_el = first_el.and_then(|el| self.parent(el)).or(extra_parent);
            if up_el.is_some() && up_el != self.root {
                let grandparent = up_el.and_then(|el| self.parent(el));
                if let Some(grandparent) = grandparent.filter(|&g| Some(g) != self.root) {
                    let cached = self.cached_score(grandparent, set_key);
                    if cached.is_none_or(|score| score > best_score) {
                        let next = self.options.next_level(level);
                        let first_child = self.first_child(grandparent);
                        let (up_score, up_nodes) =
                            self.match_siblings(set_key, siblings, first_child, next, max_level, None);
                        if up_score - 1 > best_score && up_nodes.is_some() {
                            best_score = up_score - 1;
                            if cached.is_none() {
                                self.set_score(grandparent, set_key, best_score);
                            }
                            best_nodes = up_nodes;
                        }
                    }
                }
            }

            // The document may carry extra wrappers: retry the same siblings
            // inside every candidate that has element children, again one
            // point down per skipped level. The scan is clipped at the
            // element the harvest started from.
            let mut el = first_el;
            while let Some(cur) = el {
                if let Some(first_child) = self.first_child(cur) {
                    let cached = self.cached_score(cur, set_key);
                    if cached.is_none_or(|score| score > best_score) {
                        let next = self.options.next_level(level);
                        let (deep_score, deep_nodes) = self.match_siblings(
                            set_key,
                            siblings,
                            Some(first_child),
                            next,
                            max_level,
                            None,
                        );
                        if deep_score - 1 > best_score && deep_nodes.is_some() {
                            best_score = deep_score - 1;
                            if cached.is_none() {
                                self.set_score(cur, set_key, best_score);
                            }
                            best_nodes = deep_nodes;
                        }
                    }
                }
                if cur == self.root_first {
                    break;
                }
                el = self.next_sibling(cur);
            }
        }

        // Nothing to anchor the same-level alignment on
        let Some(first_el) = first_el else {
            return (best_score, best_nodes);
        };

        // Same-level alignment over every non-empty subset of the siblings.
        // Descending bitmask order puts large combinations first, so the
        // pruning bound tightens as early as possible.
        let n = siblings.len();
        for mask in (1..(1u128 << n)).rev() {
            let subset: Vec<&TemplateNode> = siblings
                .iter()
                .enumerate()
                .filter(|(j, _)| mask & (1 << j) != 0)
                .map(|(_, node)| node)
                .collect();
            let ceiling: i64 = subset.iter().map(|node| node.max_score).sum();
            if best_score >= ceiling {
                continue;
            }
            self.align_subset(&subset, first_el, level, max_level, &mut best_score, &mut best_nodes);
        }

        (best_score, best_nodes)
    }

    /// Walk one subset across the sibling chain with backtracking: anchor
    /// subset[0], scan forward for subset[1], and so on; when a later member
    /// runs out of siblings, advance the previous member's anchor instead of
    /// giving up. Every fully anchored placement is scored and the best one
    /// snapshotted.
    fn align_subset(
        &mut self,
        subset: &[&TemplateNode],
        first_el: D::Element,
        level: i64,
        max_level: i64,
        best_score: &mut i64,
        best_nodes: &mut Option<Vec<MatchNode<D::Element>>>,
    ) {
        let mut cursors: Vec<Cursor<'_, D::Element>> =
            subset.iter().map(|node| Cursor::new(node)).collect();
        cursors[0].el = Some(first_el);
        let mut i = 0;
        loop {
            let el = cursors[i].el;
            if let Some(el) = el {
                self.eval(&mut cursors[i], el, level, max_level);
                if i + 1 >= cursors.len() {
                    i = cursors.len() - 1;
                    let total: i64 = cursors.iter().map(|c| c.score).sum();
                    if total > *best_score {
                        *best_score = total;
                        *best_nodes = Some(cursors.iter().map(Cursor::snapshot).collect());
                    }
                } else {
                    i += 1;
                }
            } else {
                if i == 0 {
                    break;
                }
                i -= 1;
            }
            // Advance this cursor, or start it right after the previous
            // member's anchor when it has not been placed yet
            let from = cursors[i].el.or(el);
            cursors[i].el = from.and_then(|e| self.next_sibling(e));
        }
    }

    /// Score one template node anchored at `el` and, when it has template
    /// children, search for them below (or above, via the extra-parent
    /// escape) and fold the result in.
    fn eval(&mut self, cursor: &mut Cursor<'_, D::Element>, el: D::Element, level: i64, max_level: i64) {
        cursor.score = 0;
        cursor.text = None;
        cursor.attr = None;
        cursor.children = Vec::new();
        let node = cursor.node;

        if self.same_tag(node, el) {
            cursor.score += self.options.tag_score;
            if let Some(capture) = &node.text {
                let text = self.text(el);
                match capture.kind {
                    Some(kind) => {
                        // A typed capture is an assertion: failing it costs
                        // as much as passing it earns
                        if self.text_matches(&text, kind, capture.arg.as_deref(), el) {
                            cursor.score += self.options.tag_text_type_score;
                            cursor.text = Some(Capture {
                                key: capture.key.clone(),
                                value: text.to_string(),
                            });
                        } else {
                            cursor.score -= self.options.tag_text_type_score;
                        }
                    }
                    None => {
                        if !text.is_empty() {
                            cursor.score += self.options.tag_text_score;
                            cursor.text = Some(Capture {
                                key: capture.key.clone(),
                                value: text.to_string(),
                            });
                        }
                    }
                }
            }
            if let Some(capture) = &node.attr {
                if let Some(value) = self.doc.attribute(el, &capture.attr) {
                    if !value.is_empty() {
                        cursor.score += self.options.tag_attr_score;
                        cursor.attr = Some(Capture {
                            key: capture.key.clone(),
                            value,
                        });
                    }
                }
            }
        }

        if !node.children.is_empty() {
            let first_child = self.first_child(el);
            let next = self.options.next_level(level);
            let own = cursor.score;
            let key = sibling_key(&node.children);
            let extra_parent = if first_child.is_none() { Some(el) } else { None };
            let (sub_score, sub_nodes) =
                self.match_siblings(&key, &node.children, first_child, next, max_level, extra_parent);
            cursor.score += sub_score;
            if own > 0 || sub_score > 0 {
                // Reward matches that did not need the deep end of the
                // level budget
                cursor.score += max_level - level;
            }
            if let Some(nodes) = sub_nodes {
                cursor.children = nodes;
            }
            // Only contexts with enough remaining depth are worth caching;
            // shallow one-shot lookups would just pollute the map
            if max_level - next > self.options.min_depth {
                let node_key = node.id.to_string();
                if self.cached_score(el, &node_key).is_none() {
                    self.set_score(el, &node_key, cursor.score);
                }
            }
        }
    }

    fn out_of_time(&self) -> bool {
        self.started.elapsed().as_millis() as u64 > self.options.execution_time
    }

    fn same_tag(&mut self, node: &TemplateNode, el: D::Element) -> bool {
        match &node.tag {
            Tag::Wildcard => true,
            Tag::Name(name) => {
                let want = self.tags.get_or_intern(name);
                self.tag_sym(el) == want
            }
        }
    }

    fn text_matches(&mut self, text: &str, kind: TextType, arg: Option<&str>, el: D::Element) -> bool {
        match kind {
            TextType::Int => is_int(text),
            TextType::Float => is_float(text),
            TextType::With => arg.is_some_and(|needle| text.contains(needle)),
            TextType::Func => {
                let Some(name) = arg else { return false };
                match self.callbacks.get(name) {
                    Some(callback) => callback(text, el),
                    None => {
                        Diagnostic::UnknownCallback {
                            name: name.to_string(),
                        }
                        .emit(&mut self.diagnostics);
                        false
                    }
                }
            }
            TextType::Parent => {
                let Some(want) = arg else { return false };
                match self.parent(el) {
                    Some(parent) => {
                        let want = self.tags.get_or_intern(want.to_uppercase());
                        self.tag_sym(parent) == want
                    }
                    None => false,
                }
            }
            TextType::Str => true,
            TextType::Empty => text.trim().is_empty(),
        }
    }

    fn tag_sym(&mut self, el: D::Element) -> Spur {
        if let Some(&sym) = self.tag_cache.get(&el) {
            return sym;
        }
        let sym = self.tags.get_or_intern(self.doc.tag_name(el).to_uppercase());
        self.tag_cache.insert(el, sym);
        sym
    }

    fn text(&mut self, el: D::Element) -> Rc<str> {
        if let Some(text) = self.text_cache.get(&el) {
            return Rc::clone(text);
        }
        let text: Rc<str> = Rc::from(self.doc.direct_text(el));
        self.text_cache.insert(el, Rc::clone(&text));
        text
    }

    fn parent(&mut self, el: D::Element) -> Option<D::Element> {
        if let Some(&parent) = self.parent_cache.get(&el) {
            return parent;
        }
        let parent = self.doc.parent(el);
        self.parent_cache.insert(el, parent);
        parent
    }

    fn first_child(&mut self, el: D::Element) -> Option<D::Element> {
        if let Some(&child) = self.first_child_cache.get(&el) {
            return child;
        }
        let child = self.doc.first_child(el);
        self.first_child_cache.insert(el, child);
        child
    }

    fn next_sibling(&mut self, el: D::Element) -> Option<D::Element> {
        if let Some(&next) = self.next_cache.get(&el) {
            return next;
        }
        let next = self.doc.next_sibling(el);
        self.next_cache.insert(el, next);
        next
    }

    fn cached_score(&self, el: D::Element, key: &str) -> Option<i64> {
        self.score_cache.get(&el).and_then(|m| m.get(key)).copied()
    }

    fn set_score(&mut self, el: D::Element, key: &str, score: i64) {
        self.score_cache
            .entry(el)
            .or_default()
            .insert(key.to_string(), score);
    }
}

/// True when the text casts to a number with no fractional part and spells
/// no decimal point
fn is_int(text: &str) -> bool {
    !text.is_empty()
        && !text.contains('.')
        && text.parse::<f64>().is_ok_and(|n| n.fract() == 0.0)
}

/// True when the text casts to a number with a fractional part
fn is_float(text: &str) -> bool {
    !text.is_empty()
        && text
            .parse::<f64>()
            .is_ok_and(|n| !n.is_nan() && n.fract() != 0.0)
}
