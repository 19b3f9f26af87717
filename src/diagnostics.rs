//! Non-fatal diagnostics
//!
//! Nothing in this crate aborts a harvest: bad template lines are skipped,
//! missing callbacks evaluate to false, colliding output keys keep the last
//! value. Every such event is recorded as a [`Diagnostic`] on the result and
//! mirrored to `tracing` as it happens.

use thiserror::Error;

/// Why a template line was rejected
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LineErrorKind {
    /// The line does not match the template grammar
    #[error("wrong line format")]
    Syntax,
    /// Leading spaces are not a multiple of the configured indent width
    #[error("wrong left indentation, must be a multiple of {0}")]
    IndentStep(usize),
    /// Indentation dedents below the baseline or jumps more than one level
    #[error("wrong left indentation level")]
    IndentLevel,
}

/// A recoverable problem encountered while compiling or harvesting
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Diagnostic {
    /// A template line was skipped; carries the original line text and its
    /// 0-based index in the template string
    #[error("error in line {index} {line:?}: {kind}")]
    Template {
        line: String,
        index: usize,
        kind: LineErrorKind,
    },

    /// Two or more captures resolved to the same output key
    #[error("duplicate capture key {key:?}, keeping the last value")]
    DuplicateKey { key: String },

    /// A `func` text type named a callback that is not registered
    #[error("callback {name:?} is not registered, predicate treated as false")]
    UnknownCallback { name: String },

    /// The start selector matched nothing in the document
    #[error("selector {selector:?} matched no element")]
    AnchorNotFound { selector: String },
}

impl Diagnostic {
    /// Record the diagnostic into `sink`, mirroring it to `tracing`
    pub(crate) fn emit(self, sink: &mut Vec<Diagnostic>) {
        match &self {
            Diagnostic::UnknownCallback { .. } => tracing::warn!("{self}"),
            _ => tracing::error!("{self}"),
        }
        sink.push(self);
    }

    /// True for template-compilation diagnostics
    pub fn is_template_error(&self) -> bool {
        matches!(self, Diagnostic::Template { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_includes_line_and_index() {
        let d = Diagnostic::Template {
            line: "   div".to_string(),
            index: 3,
            kind: LineErrorKind::IndentStep(2),
        };
        let msg = d.to_string();
        assert!(msg.contains("line 3"));
        assert!(msg.contains("   div"));
        assert!(msg.contains("multiple of 2"));
    }

    #[test]
    fn test_emit_collects() {
        let mut sink = Vec::new();
        Diagnostic::DuplicateKey {
            key: "price".to_string(),
        }
        .emit(&mut sink);
        assert_eq!(sink.len(), 1);
    }
}
