//! Template compiler
//!
//! Compiles the indentation-based template DSL into an ordered forest of
//! [`TemplateNode`]s. One line describes one expected document element:
//!
//! ```text
//! div
//!   h1{title}
//!   span{price:float}
//!   img[img=src]
//! ```
//!
//! Compilation never fails as a whole: invalid lines are reported through
//! the diagnostics sink and skipped, and the parse degrades to whatever
//! valid structure remains.

use pest::Parser;
use pest_derive::Parser;

use crate::diagnostics::{Diagnostic, LineErrorKind};

#[derive(Parser)]
#[grammar = "template.pest"]
struct LineParser;

/// Expected tag of a template node
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Tag {
    /// `*` matches any element
    Wildcard,
    /// Uppercased tag name
    Name(String),
}

/// Named predicate constraining what text counts as a match
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextType {
    Int,
    Float,
    With,
    Func,
    Parent,
    Str,
    Empty,
}

/// `{key[:type[:arg]]}` — extract the element's direct text under `key`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextCapture {
    pub key: String,
    pub kind: Option<TextType>,
    /// Substring for `with`, callback name for `func`, parent tag for
    /// `parent`; unused by the other types
    pub arg: Option<String>,
}

/// `[key=attr]` — extract the `attr` attribute value under `key`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttrCapture {
    pub key: String,
    pub attr: String,
}

/// One compiled template line
#[derive(Debug, Clone, PartialEq)]
pub struct TemplateNode {
    /// Assigned in line-encounter order starting at 0, unique per compile
    pub id: u32,
    pub tag: Tag,
    pub text: Option<TextCapture>,
    pub attr: Option<AttrCapture>,
    pub children: Vec<TemplateNode>,
    /// Score ceiling for this node and its subtree, filled by the scoring
    /// pass after compilation
    pub max_score: i64,
}

/// A single successfully parsed line, before nesting is resolved
struct ParsedLine {
    spaces: usize,
    tag: Tag,
    text: Option<TextCapture>,
    attr: Option<AttrCapture>,
}

/// Compile a template string into a forest of nodes. Diagnostics for
/// skipped lines are appended to `diagnostics`.
pub fn parse_template(
    tpl: &str,
    space_amount: usize,
    diagnostics: &mut Vec<Diagnostic>,
) -> Vec<TemplateNode> {
    let lines: Vec<&str> = tpl.split('\n').collect();
    let mut nodes = Vec::new();
    let mut next_id = 0;
    let mut baseline = None;
    parse_level(
        &lines,
        0,
        &mut nodes,
        0,
        &mut baseline,
        space_amount,
        &mut next_id,
        diagnostics,
    );
    nodes
}

/// Parse lines at one nesting level into `nodes`. Returns the index of the
/// last consumed line and how many ancestor levels a dedent still has to
/// pop.
#[allow(clippy::too_many_arguments)]
fn parse_level(
    lines: &[&str],
    start: usize,
    nodes: &mut Vec<TemplateNode>,
    level: usize,
    baseline: &mut Option<usize>,
    space_amount: usize,
    next_id: &mut u32,
    diagnostics: &mut Vec<Diagnostic>,
) -> (usize, usize) {
    let mut i = start;
    while i < lines.len() {
        let line = lines[i];
        if line.trim().is_empty() {
            i += 1;
            continue;
        }
        let skip = |kind: LineErrorKind, diagnostics: &mut Vec<Diagnostic>| {
            Diagnostic::Template {
                line: line.to_string(),
                index: i,
                kind,
            }
            .emit(diagnostics);
        };
        let Some(parsed) = parse_line(line) else {
            skip(LineErrorKind::Syntax, diagnostics);
            i += 1;
            continue;
        };
        if parsed.spaces % space_amount != 0 {
            skip(LineErrorKind::IndentStep(space_amount), diagnostics);
            i += 1;
            continue;
        }
        let base = *baseline.get_or_insert(parsed.spaces);
        let cur_level = (parsed.spaces as isize - base as isize) / space_amount as isize;
        if cur_level < 0 || cur_level as usize > level + 1 {
            skip(LineErrorKind::IndentLevel, diagnostics);
            i += 1;
            continue;
        }
        let cur_level = cur_level as usize;
        if cur_level == level {
            let id = *next_id;
            *next_id += 1;
            nodes.push(TemplateNode {
                id,
                tag: parsed.tag,
                text: parsed.text,
                attr: parsed.attr,
                children: Vec::new(),
                max_score: 0,
            });
            i += 1;
        } else if cur_level > level {
            // One level deeper: recurse into the last sibling's children
            let Some(parent) = nodes.last_mut() else {
                skip(LineErrorKind::IndentLevel, diagnostics);
                i += 1;
                continue;
            };
            let (last, pop) = parse_level(
                lines,
                i,
                &mut parent.children,
                level + 1,
                baseline,
                space_amount,
                next_id,
                diagnostics,
            );
            i = last;
            if pop > 0 {
                // A dedent below this level: keep unwinding
                return (i, pop - 1);
            }
            i += 1;
        } else {
            // Dedent: hand the line back so an ancestor level re-parses it
            return (i - 1, level - cur_level - 1);
        }
    }
    (lines.len(), 0)
}

/// Parse one line against the grammar. `None` means the line is invalid.
fn parse_line(line: &str) -> Option<ParsedLine> {
    let mut pairs = LineParser::parse(Rule::line, line).ok()?;
    let line_pair = pairs.next()?;

    let mut spaces = 0;
    let mut tag = None;
    let mut text = None;
    let mut attr = None;
    for pair in line_pair.into_inner() {
        match pair.as_rule() {
            Rule::indent => spaces = pair.as_str().len(),
            Rule::tag => {
                tag = Some(match pair.as_str() {
                    "*" => Tag::Wildcard,
                    name => Tag::Name(name.to_uppercase()),
                });
            }
            Rule::text_spec => {
                let mut key = None;
                let mut kind = None;
                let mut arg = None;
                for p in pair.into_inner() {
                    match p.as_rule() {
                        Rule::text_key => key = Some(p.as_str().to_string()),
                        Rule::text_type => kind = Some(text_type(p.as_str())),
                        Rule::text_val => {
                            // An empty value behaves as if it was omitted
                            if !p.as_str().is_empty() {
                                arg = Some(p.as_str().to_string());
                            }
                        }
                        _ => {}
                    }
                }
                text = key.map(|key| TextCapture { key, kind, arg });
            }
            Rule::attr_spec => {
                let mut inner = pair.into_inner();
                if let (Some(key), Some(name)) = (inner.next(), inner.next()) {
                    attr = Some(AttrCapture {
                        key: key.as_str().to_string(),
                        attr: name.as_str().to_string(),
                    });
                }
            }
            _ => {}
        }
    }
    Some(ParsedLine {
        spaces,
        tag: tag?,
        text,
        attr,
    })
}

fn text_type(s: &str) -> TextType {
    match s {
        "int" => TextType::Int,
        "float" => TextType::Float,
        "with" => TextType::With,
        "func" => TextType::Func,
        "parent" => TextType::Parent,
        "str" => TextType::Str,
        "empty" => TextType::Empty,
        _ => unreachable!("text type not covered by the grammar: {s}"),
    }
}

/// Cache key for an array of sibling nodes, combining their ids
pub(crate) fn sibling_key(nodes: &[TemplateNode]) -> String {
    let mut key = String::new();
    for node in nodes {
        if !key.is_empty() {
            key.push('-');
        }
        key.push_str(&node.id.to_string());
    }
    key
}
