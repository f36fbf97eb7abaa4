//! Errors raised by the sequencing engine.
//!
//! Authoring problems (a step missing a required binding, an `if` without
//! its `end`) are never raised here at run time: they are reported through
//! [`Step::error`](crate::step::Step::error) and
//! [`Sequence::diagnostics`](crate::sequence::Sequence::diagnostics), and the
//! offending step simply continues. Everything below is what a caller of the
//! engine can actually observe.

use crate::sequence::SequenceId;
use crate::value::ValueKind;
use thiserror::Error;

/// Engine result type alias.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// A variable key did not resolve in the scope it was looked up in.
    #[error("variable not found: {0}")]
    Lookup(String),

    /// A binding or assignment disagrees with the variable's declared kind.
    #[error("type mismatch for `{key}`: expected {expected}, found {found}")]
    TypeMismatch {
        key: String,
        expected: ValueKind,
        found: ValueKind,
    },

    /// An operator was handed an operand of a different kind than its target.
    #[error("operand mismatch: expected {expected}, found {found}")]
    OperandMismatch {
        expected: ValueKind,
        found: ValueKind,
    },

    /// Element access outside a collection's bounds.
    #[error("index {index} out of range for collection of length {len}")]
    Index { index: i64, len: usize },

    /// The value kind does not define this arithmetic or comparison operator.
    #[error("operator `{operator}` is not supported by {kind} values")]
    UnsupportedOperation { operator: String, kind: ValueKind },

    /// Integer overflow or division by zero.
    #[error("arithmetic error: {0}")]
    Arithmetic(String),

    #[error("flowchart not found: {0}")]
    FlowchartNotFound(String),

    #[error("sequence not found: {0}")]
    SequenceNotFound(SequenceId),

    /// `begin` was requested for a sequence that already has an active step.
    #[error("sequence {0} is already executing")]
    SequenceBusy(SequenceId),

    /// `resume` was requested for a sequence with no restored pointer.
    #[error("sequence {0} has no active step to resume")]
    NothingToResume(SequenceId),

    /// A declaration clashes with an existing one.
    #[error("duplicate declaration: {0}")]
    Duplicate(String),

    #[error("snapshot encoding failed: {0}")]
    Snapshot(#[from] serde_json::Error),
}
