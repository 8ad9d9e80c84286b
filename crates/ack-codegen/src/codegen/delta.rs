//! Difference detection between the desired state of two resource
//! instances.
//!
//! The emitted code records every differing path through `delta.Add` and
//! relies on a `delta` variable being in scope at the call site. See
//! [`crate::runtime::Delta`] for the collector's contract.

use field_path::FieldPath;
use snafu::ResultExt;
use tracing::{debug, instrument};

use crate::{
    codegen::{
        Emitter, ResolveTagFieldSnafu, Result, guard,
        kernel::{self, Node, Operands, Strategy},
        not_implemented,
    },
    model::{NameNormalizer, Resource, SPEC_ROOT, ScalarKind, Shape, ShapeKind},
};

struct DeltaStrategy<'a> {
    resource: &'a Resource,
    normalizer: &'a dyn NameNormalizer,
    tag_path: Option<&'a FieldPath>,
}

impl Strategy for DeltaStrategy<'_> {
    fn normalizer(&self) -> &dyn NameNormalizer {
        self.normalizer
    }

    fn on_difference(&self, node: &Node<'_>) -> String {
        let Operands { a, b } = &node.operands;
        format!(
            "delta.Add(\"{SPEC_ROOT}.{path}\", {a}, {b})",
            path = node.path
        )
    }

    fn is_ignored(&self, path: &FieldPath) -> bool {
        self.resource.is_compare_ignored(path)
    }

    fn is_tag_field(&self, path: &FieldPath) -> bool {
        self.tag_path == Some(path)
    }

    fn sequence(
        &mut self,
        node: &Node<'_>,
        element: &Shape,
        out: &mut Emitter,
        level: usize,
    ) -> Result<()> {
        let action = self.on_difference(node);
        let Operands { a, b } = &node.operands;

        kernel::open_length_check(out, level, &node.operands, &action);
        out.line(level, format!("}} else if len({a}) > 0 {{"));

        match element.kind() {
            ShapeKind::Scalar(ScalarKind::String) => {
                out.line(
                    level + 1,
                    format!("if !ackcompare.SliceStringPEqual({a}, {b}) {{"),
                );
                out.line(level + 2, &action);
                out.line(level + 1, "}");
            }
            // Element-wise differences of structures are not reported yet,
            // the whole sequence is recorded instead.
            ShapeKind::Scalar(_) | ShapeKind::Structure(_) => {
                kernel::deep_equal(out, level + 1, &node.operands, &action);
            }
            ShapeKind::Sequence(_) | ShapeKind::Mapping { .. } => not_implemented(
                out,
                level + 1,
                &format!("delta of {} elements", element.kind_name()),
            ),
        }

        guard::close(out, level);
        Ok(())
    }

    fn mapping(
        &mut self,
        node: &Node<'_>,
        value: &Shape,
        out: &mut Emitter,
        level: usize,
    ) -> Result<()> {
        let action = self.on_difference(node);
        let Operands { a, b } = &node.operands;

        kernel::open_length_check(out, level, &node.operands, &action);
        out.line(level, format!("}} else if len({a}) > 0 {{"));

        match value.kind() {
            ShapeKind::Scalar(ScalarKind::String) => {
                out.line(
                    level + 1,
                    format!("if !ackcompare.MapStringStringPEqual({a}, {b}) {{"),
                );
                out.line(level + 2, &action);
                out.line(level + 1, "}");
            }
            // Differences below a key are not reported yet, the whole mapping
            // is recorded instead.
            ShapeKind::Scalar(_)
            | ShapeKind::Structure(_)
            | ShapeKind::Sequence(_)
            | ShapeKind::Mapping { .. } => {
                kernel::deep_equal(out, level + 1, &node.operands, &action);
            }
        }

        guard::close(out, level);
        Ok(())
    }
}

/// Renders the code recording every difference between the desired state of
/// two resource instances.
///
/// `first` and `second` are the access expressions of the two instances,
/// like `a.ko` and `b.ko`. Top-level fields are visited in name order,
/// ignored fields are skipped and the tag field is compared through its
/// canonical projection.
#[instrument(skip_all, fields(resource = %resource.names().camel))]
pub fn compare_resource(
    resource: &Resource,
    normalizer: &dyn NameNormalizer,
    first: &str,
    second: &str,
    level: usize,
) -> Result<String> {
    let tag_path = resource
        .tag_field()
        .context(ResolveTagFieldSnafu)?
        .map(|field| &field.path);

    if tag_path.is_none() {
        debug!("resource has no tag field, tags are compared structurally");
    }

    let mut strategy = DeltaStrategy {
        resource,
        normalizer,
        tag_path,
    };

    let mut out = Emitter::new();
    out.blank();
    kernel::resource_fields(
        &mut strategy,
        resource,
        &Operands::new(first, second),
        &mut out,
        level,
    )?;

    Ok(out.finish())
}
