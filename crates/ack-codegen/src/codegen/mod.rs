//! Emission of Go reconciliation-support code from a resource's shapes.
//!
//! Every strategy renders into an [`Emitter`], an append-only buffer that
//! indents with tabs. Difference and equality code share the recursive
//! traversal in [`kernel`], which dispatches on the closed set of shape kinds
//! and wraps nullable fields in the guards from [`guard`].

use snafu::Snafu;

use crate::model::{self, ScalarKind};

pub mod dedup;
pub mod delta;
pub mod equal;
pub mod guard;
pub mod identifiers;
pub mod kernel;
pub mod references;
pub mod synced;
pub mod tags;

pub use dedup::HelperCache;
pub use kernel::Operands;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Snafu)]
pub enum Error {
    #[snafu(display(
        "unsupported key type {key} for map field {path:?}, only string keys are supported"
    ))]
    UnsupportedKeyType { path: String, key: ScalarKind },

    #[snafu(display("malformed field path {path:?}: {reason}"))]
    MalformedFieldPath { path: String, reason: &'static str },

    #[snafu(display("failed to parse field path {path:?}"))]
    ParseFieldPath {
        path: String,
        source: field_path::ParseFieldPathError,
    },

    #[snafu(display("synced condition #{index} is missing its field path"))]
    MissingSyncedPath { index: usize },

    #[snafu(display("synced condition {path:?} is missing its accepted values"))]
    MissingSyncedValues { path: String },

    #[snafu(display("field {path:?} of synced condition does not exist"))]
    UnknownSyncedField { path: String },

    #[snafu(display(
        "synced condition {path:?} walks through a {kind} shape, only structures and scalars are supported"
    ))]
    UnsupportedSyncedShape { path: String, kind: &'static str },

    #[snafu(display("synced condition {path:?} cannot render accepted values for {kind} fields"))]
    UnsupportedSyncedValueKind { path: String, kind: ScalarKind },

    #[snafu(display("synced value {value:?} of condition {path:?} is not a valid {kind}"))]
    InvalidSyncedValue {
        path: String,
        value: String,
        kind: ScalarKind,
    },

    #[snafu(display("failed to look up the tag field"))]
    ResolveTagField { source: model::Error },

    #[snafu(display(
        "resource {resource:?} does not have a tag field, set tags.ignore to skip tag handling"
    ))]
    MissingTagField { resource: String },

    #[snafu(display(
        "tag field {path:?} must be a list of structures with {key:?} and {value:?} members or a map of strings, got {shape}"
    ))]
    UnsupportedTagShape {
        path: String,
        shape: String,
        key: String,
        value: String,
    },

    #[snafu(display("reference field {path:?} cannot be nested within a map"))]
    ReferenceWithinMapping { path: String },

    #[snafu(display("field {path:?} does not exist on resource {resource:?}"))]
    UnknownField { path: String, resource: String },
}

/// Append-only buffer of emitted source lines.
#[derive(Debug, Default)]
pub struct Emitter {
    out: String,
}

impl Emitter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `text` as one line indented by `level` tabs.
    pub fn line(&mut self, level: usize, text: impl AsRef<str>) -> &mut Self {
        for _ in 0..level {
            self.out.push('\t');
        }
        self.out.push_str(text.as_ref());
        self.out.push('\n');
        self
    }

    /// Appends an empty line.
    pub fn blank(&mut self) -> &mut Self {
        self.out.push('\n');
        self
    }

    /// Appends already rendered text verbatim.
    pub fn append(&mut self, text: &str) -> &mut Self {
        self.out.push_str(text);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.out.is_empty()
    }

    pub fn finish(self) -> String {
        self.out
    }
}

/// Marks a known gap of a strategy in the generated code.
pub(crate) fn not_implemented(out: &mut Emitter, level: usize, what: &str) {
    out.line(level, format!("// TODO: {what} is not yet implemented"));
}

/// Quotes a string as a Go string literal.
pub(crate) fn go_quote(value: &str) -> String {
    let mut quoted = String::with_capacity(value.len() + 2);
    quoted.push('"');
    for c in value.chars() {
        match c {
            '"' => quoted.push_str("\\\""),
            '\\' => quoted.push_str("\\\\"),
            '\n' => quoted.push_str("\\n"),
            '\t' => quoted.push_str("\\t"),
            c => quoted.push(c),
        }
    }
    quoted.push('"');
    quoted
}
