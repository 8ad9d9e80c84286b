//! Recursive traversal shared by the two-sided strategies.
//!
//! The kernel walks a shape tree for a pair of access expressions and
//! dispatches on the shape kind. Scalars and structures are rendered here,
//! collections are handed to the [`Strategy`], which also decides what runs
//! when the two sides differ.

use field_path::FieldPath;
use indexmap::IndexMap;
use itertools::Itertools;
use snafu::ensure;
use tracing::debug;

use crate::{
    codegen::{Emitter, Result, UnsupportedKeyTypeSnafu, guard, tags},
    model::{NameNormalizer, Resource, SPEC_ROOT, ScalarKind, Shape, ShapeKind},
};

/// Access expressions for the same value in the two compared instances.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Operands {
    pub a: String,
    pub b: String,
}

impl Operands {
    pub fn new(a: impl Into<String>, b: impl Into<String>) -> Self {
        Self {
            a: a.into(),
            b: b.into(),
        }
    }

    /// Accesses the member `name` on both sides.
    pub fn member(&self, name: &str) -> Self {
        Self::new(format!("{}.{name}", self.a), format!("{}.{name}", self.b))
    }

    /// Indexes both sides with the same index or key expression.
    pub fn index(&self, index: &str) -> Self {
        Self::new(format!("{}[{index}]", self.a), format!("{}[{index}]", self.b))
    }
}

/// A value visited by the kernel.
#[derive(Clone, Debug)]
pub struct Node<'a> {
    pub shape: &'a Shape,
    pub operands: Operands,

    /// Location below the spec root. Used for configuration lookups and as
    /// the key of difference reports.
    pub path: FieldPath,
}

impl<'a> Node<'a> {
    /// A node for an element or value nested in this collection node. It
    /// keeps the collection's path.
    pub fn nested(&self, shape: &'a Shape, operands: Operands) -> Self {
        Self {
            shape,
            operands,
            path: self.path.clone(),
        }
    }
}

/// What a two-sided strategy contributes to the traversal.
pub trait Strategy {
    fn normalizer(&self) -> &dyn NameNormalizer;

    /// The statement emitted where the two sides of `node` differ.
    fn on_difference(&self, node: &Node<'_>) -> String;

    /// Ignored members are skipped without leaving a trace in the output.
    fn is_ignored(&self, _path: &FieldPath) -> bool {
        false
    }

    /// The tag member is compared through its canonical projection instead
    /// of structurally.
    fn is_tag_field(&self, _path: &FieldPath) -> bool {
        false
    }

    /// Emits the comparison of two sequences.
    fn sequence(
        &mut self,
        node: &Node<'_>,
        element: &Shape,
        out: &mut Emitter,
        level: usize,
    ) -> Result<()>;

    /// Emits the comparison of two string-keyed mappings.
    fn mapping(
        &mut self,
        node: &Node<'_>,
        value: &Shape,
        out: &mut Emitter,
        level: usize,
    ) -> Result<()>;
}

/// Emits the comparison of the top-level desired-state fields of a
/// resource, in name order. Reference fields are compared as whole values.
pub fn resource_fields<S: Strategy>(
    strategy: &mut S,
    resource: &Resource,
    operands: &Operands,
    out: &mut Emitter,
    level: usize,
) -> Result<()> {
    let spec = operands.member(SPEC_ROOT);

    for field in resource.top_level_spec_fields() {
        let node = Node {
            shape: &field.shape,
            operands: spec.member(&field.names.camel),
            path: field.path.clone(),
        };

        if field.is_reference() && !strategy.is_ignored(&node.path) {
            deep_equal(out, level, &node.operands, &strategy.on_difference(&node));
        } else {
            member(strategy, &node, out, level)?;
        }
    }

    Ok(())
}

/// Emits the comparison of a structure member, honoring ignored and tag
/// fields.
pub fn member<S: Strategy>(
    strategy: &mut S,
    node: &Node<'_>,
    out: &mut Emitter,
    level: usize,
) -> Result<()> {
    if strategy.is_ignored(&node.path) {
        debug!(field = %node.path, "skipping ignored field");
        return Ok(());
    }

    if strategy.is_tag_field(&node.path) {
        tags::compare_tags(out, level, &node.operands, &strategy.on_difference(node));
        return Ok(());
    }

    field(strategy, node, out, level)
}

/// Emits the comparison of a single value, wrapped in a two-sided presence
/// guard if the value is nullable.
pub fn field<S: Strategy>(
    strategy: &mut S,
    node: &Node<'_>,
    out: &mut Emitter,
    level: usize,
) -> Result<()> {
    if !guard::is_nullable(node.shape) {
        return body(strategy, node, out, level);
    }

    guard::open_two_sided(out, level, &node.operands, &strategy.on_difference(node));
    body(strategy, node, out, level + 1)?;
    guard::close(out, level);

    Ok(())
}

/// Emits the comparison of a value which is present on both sides.
pub fn body<S: Strategy>(
    strategy: &mut S,
    node: &Node<'_>,
    out: &mut Emitter,
    level: usize,
) -> Result<()> {
    match node.shape.kind() {
        ShapeKind::Scalar(kind) => {
            scalar(out, level, &node.operands, *kind, &strategy.on_difference(node));
            Ok(())
        }
        ShapeKind::Structure(members) => structure(strategy, node, members, out, level),
        ShapeKind::Sequence(element) => strategy.sequence(node, element, out, level),
        ShapeKind::Mapping { key, value } => {
            ensure!(*key == ScalarKind::String, UnsupportedKeyTypeSnafu {
                path: node.path.to_string(),
                key: *key,
            });

            strategy.mapping(node, value, out, level)
        }
    }
}

fn structure<S: Strategy>(
    strategy: &mut S,
    node: &Node<'_>,
    members: &IndexMap<String, Shape>,
    out: &mut Emitter,
    level: usize,
) -> Result<()> {
    for (name, shape) in members.iter().sorted_by(|(a, _), (b, _)| a.cmp(b)) {
        let camel = strategy.normalizer().names(name).camel;
        let child = Node {
            shape,
            operands: node.operands.member(&camel),
            path: node.path.child(camel),
        };

        member(strategy, &child, out, level)?;
    }

    Ok(())
}

/// Emits the comparison of two present scalars. Timestamps are compared by
/// calendar equality and blobs byte-wise.
pub fn scalar(
    out: &mut Emitter,
    level: usize,
    operands: &Operands,
    kind: ScalarKind,
    on_difference: &str,
) {
    let Operands { a, b } = operands;
    let test = match kind {
        ScalarKind::Timestamp => format!("!{a}.Equal({b})"),
        ScalarKind::Blob => format!("!bytes.Equal({a}, {b})"),
        _ => format!("*{a} != *{b}"),
    };

    out.line(level, format!("if {test} {{"));
    out.line(level + 1, on_difference);
    out.line(level, "}");
}

/// Emits a whole-value comparison.
pub fn deep_equal(out: &mut Emitter, level: usize, operands: &Operands, on_difference: &str) {
    let Operands { a, b } = operands;

    out.line(
        level,
        format!("if !equality.Semantic.Equalities.DeepEqual({a}, {b}) {{"),
    );
    out.line(level + 1, on_difference);
    out.line(level, "}");
}

/// Emits a length comparison and leaves its block open for the caller to
/// close or continue with an else branch.
pub fn open_length_check(out: &mut Emitter, level: usize, operands: &Operands, on_difference: &str) {
    let Operands { a, b } = operands;

    out.line(level, format!("if len({a}) != len({b}) {{"));
    out.line(level + 1, on_difference);
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;
    use crate::{codegen::Error, model::DefaultNormalizer};

    /// Records every dispatch so the traversal can be checked on its own.
    struct Recorder {
        ignored: Vec<&'static str>,
    }

    impl Strategy for Recorder {
        fn normalizer(&self) -> &dyn NameNormalizer {
            &DefaultNormalizer
        }

        fn on_difference(&self, node: &Node<'_>) -> String {
            format!("diff {}", node.path)
        }

        fn is_ignored(&self, path: &FieldPath) -> bool {
            self.ignored.contains(&path.to_string().as_str())
        }

        fn sequence(
            &mut self,
            node: &Node<'_>,
            _element: &Shape,
            out: &mut Emitter,
            level: usize,
        ) -> Result<()> {
            out.line(level, format!("sequence {}", node.path));
            Ok(())
        }

        fn mapping(
            &mut self,
            node: &Node<'_>,
            _value: &Shape,
            out: &mut Emitter,
            level: usize,
        ) -> Result<()> {
            out.line(level, format!("mapping {}", node.path));
            Ok(())
        }
    }

    fn walk(shape: &Shape, ignored: Vec<&'static str>) -> Result<String> {
        let mut recorder = Recorder { ignored };
        let mut out = Emitter::new();
        let node = Node {
            shape,
            operands: Operands::new("a", "b"),
            path: FieldPath::new(),
        };

        body(&mut recorder, &node, &mut out, 0)?;
        Ok(out.finish())
    }

    fn string() -> Shape {
        Shape::scalar(ScalarKind::String)
    }

    #[test]
    fn members_are_sorted_and_ignored_members_skipped() {
        let shape = Shape::structure("Root", [
            ("Zeta", string()),
            ("Blob", Shape::scalar(ScalarKind::Blob)),
            ("Alpha", Shape::sequence(string())),
            ("Secret", string()),
        ]);

        let out = walk(&shape, vec!["Secret"]).expect("traversal succeeds");
        assert_eq!(
            out,
            "sequence Alpha\n\
             if !bytes.Equal(a.Blob, b.Blob) {\n\
             \tdiff Blob\n\
             }\n\
             if ackcompare.HasNilDifference(a.Zeta, b.Zeta) {\n\
             \tdiff Zeta\n\
             } else if a.Zeta != nil && b.Zeta != nil {\n\
             \tif *a.Zeta != *b.Zeta {\n\
             \t\tdiff Zeta\n\
             \t}\n\
             }\n"
        );
    }

    #[test]
    fn mappings_are_guarded_then_dispatched() {
        let shape = Shape::structure("Root", [(
            "Labels",
            Shape::mapping(ScalarKind::String, string()),
        )]);

        let out = walk(&shape, vec![]).expect("traversal succeeds");
        assert_eq!(
            out,
            "if ackcompare.HasNilDifference(a.Labels, b.Labels) {\n\
             \tdiff Labels\n\
             } else if a.Labels != nil && b.Labels != nil {\n\
             \tmapping Labels\n\
             }\n"
        );
    }

    #[rstest]
    #[case(ScalarKind::Integer)]
    #[case(ScalarKind::Boolean)]
    #[case(ScalarKind::Timestamp)]
    fn non_string_keys_are_rejected(#[case] key: ScalarKind) {
        let shape = Shape::structure("Root", [("Counts", Shape::mapping(key, string()))]);

        let err = walk(&shape, vec![]).expect_err("non-string keys are unsupported");
        assert!(
            matches!(&err, Error::UnsupportedKeyType { path, key: k } if path == "Counts" && *k == key)
        );
    }

    #[test]
    fn timestamps_use_calendar_equality() {
        let mut out = Emitter::new();
        scalar(
            &mut out,
            0,
            &Operands::new("a.T", "b.T"),
            ScalarKind::Timestamp,
            "return false",
        );

        assert_eq!(out.finish(), "if !a.T.Equal(b.T) {\n\treturn false\n}\n");
    }
}
