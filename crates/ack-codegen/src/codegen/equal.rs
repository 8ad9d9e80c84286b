//! Deep equality between two values, short-circuiting on the first
//! mismatch.
//!
//! Structures reached through sequences or mappings are compared by a
//! standalone helper function per distinct shape. Helpers are requested from
//! the caller's [`HelperCache`], so a shape referenced from several places is
//! emitted once and called from everywhere.

use field_path::FieldPath;
use snafu::ResultExt;
use tracing::{debug, instrument};

use crate::{
    codegen::{
        Emitter, HelperCache, ResolveTagFieldSnafu, Result, guard,
        kernel::{self, Node, Operands, Strategy},
        not_implemented,
    },
    model::{NameNormalizer, Resource, Shape, ShapeKind},
};

const ON_DIFFERENCE: &str = "return false";

/// Generated equality code.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EqualityCode {
    /// Statements returning `false` at the first mismatch. They fall through
    /// if both sides are equal.
    pub body: String,

    /// Helper functions first requested by this call, separated by blank
    /// lines. Helpers already emitted by an earlier call sharing the same
    /// cache are referenced but not repeated.
    pub helpers: String,
}

struct EqualityStrategy<'a> {
    /// Source of field configuration. Helpers are rendered without one, as
    /// they are shared by every place their shape occurs.
    resource: Option<&'a Resource>,
    normalizer: &'a dyn NameNormalizer,
    tag_path: Option<&'a FieldPath>,
    cache: &'a mut HelperCache,
}

impl EqualityStrategy<'_> {
    /// Emits a call of the helper comparing two values of `shape`, guarded
    /// if the values are nullable.
    fn helper_call(&mut self, shape: &Shape, operands: &Operands, out: &mut Emitter, level: usize) {
        let helper = self.cache.request(shape);
        let Operands { a, b } = operands;

        let nullable = guard::is_nullable(shape);
        let level = if nullable {
            guard::open_two_sided(out, level, operands, ON_DIFFERENCE);
            level + 1
        } else {
            level
        };

        out.line(level, format!("if !{helper}({a}, {b}) {{"));
        out.line(level + 1, ON_DIFFERENCE);
        out.line(level, "}");

        if nullable {
            guard::close(out, level - 1);
        }
    }
}

impl Strategy for EqualityStrategy<'_> {
    fn normalizer(&self) -> &dyn NameNormalizer {
        self.normalizer
    }

    fn on_difference(&self, _node: &Node<'_>) -> String {
        ON_DIFFERENCE.to_owned()
    }

    fn is_ignored(&self, path: &FieldPath) -> bool {
        self.resource
            .is_some_and(|resource| resource.is_compare_ignored(path))
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
        let Operands { a, .. } = &node.operands;

        kernel::open_length_check(out, level, &node.operands, ON_DIFFERENCE);
        guard::close(out, level);

        match element.kind() {
            ShapeKind::Scalar(_) => {
                out.line(level, format!("for i := range {a} {{"));
                let element = node.nested(element, node.operands.index("i"));
                kernel::field(self, &element, out, level + 1)?;
                out.line(level, "}");
            }
            ShapeKind::Structure(_) => {
                out.line(level, format!("for i := range {a} {{"));
                self.helper_call(element, &node.operands.index("i"), out, level + 1);
                out.line(level, "}");
            }
            ShapeKind::Sequence(_) | ShapeKind::Mapping { .. } => not_implemented(
                out,
                level,
                &format!("equality of {} elements", element.kind_name()),
            ),
        }

        Ok(())
    }

    fn mapping(
        &mut self,
        node: &Node<'_>,
        value: &Shape,
        out: &mut Emitter,
        level: usize,
    ) -> Result<()> {
        let Operands { a, b } = &node.operands;

        kernel::open_length_check(out, level, &node.operands, ON_DIFFERENCE);
        guard::close(out, level);

        out.line(level, format!("for k := range {a} {{"));
        out.line(level + 1, format!("if _, ok := {b}[k]; !ok {{"));
        out.line(level + 2, ON_DIFFERENCE);
        out.line(level + 1, "}");
        out.line(level, "}");

        let values = Operands::new("av", "bv");
        match value.kind() {
            ShapeKind::Scalar(_) => {
                out.line(level, format!("for k, av := range {a} {{"));
                out.line(level + 1, format!("bv := {b}[k]"));
                kernel::field(self, &node.nested(value, values), out, level + 1)?;
                out.line(level, "}");
            }
            ShapeKind::Structure(_) => {
                out.line(level, format!("for k, av := range {a} {{"));
                out.line(level + 1, format!("bv := {b}[k]"));
                self.helper_call(value, &values, out, level + 1);
                out.line(level, "}");
            }
            ShapeKind::Sequence(_) | ShapeKind::Mapping { .. } => not_implemented(
                out,
                level,
                &format!("equality of {} values", value.kind_name()),
            ),
        }

        Ok(())
    }
}

/// Renders the equality check of the desired state of two resource
/// instances, plus the helpers it needs which `cache` has not seen yet.
#[instrument(skip_all, fields(resource = %resource.names().camel))]
pub fn compare_resource(
    resource: &Resource,
    normalizer: &dyn NameNormalizer,
    first: &str,
    second: &str,
    level: usize,
    cache: &mut HelperCache,
) -> Result<EqualityCode> {
    let tag_path = resource
        .tag_field()
        .context(ResolveTagFieldSnafu)?
        .map(|field| &field.path);

    let mut out = Emitter::new();
    out.blank();

    let mut strategy = EqualityStrategy {
        resource: Some(resource),
        normalizer,
        tag_path,
        cache,
    };
    kernel::resource_fields(
        &mut strategy,
        resource,
        &Operands::new(first, second),
        &mut out,
        level,
    )?;

    Ok(EqualityCode {
        body: out.finish(),
        helpers: emit_helpers(normalizer, strategy.cache)?,
    })
}

/// Renders the equality check of two values of a standalone shape, plus the
/// helpers it needs which `cache` has not seen yet.
///
/// No field configuration applies, every member is compared.
#[instrument(skip_all, fields(shape = shape.name()))]
pub fn compare_structure(
    shape: &Shape,
    normalizer: &dyn NameNormalizer,
    first: &str,
    second: &str,
    level: usize,
    cache: &mut HelperCache,
) -> Result<EqualityCode> {
    let mut out = Emitter::new();
    out.blank();

    let mut strategy = EqualityStrategy {
        resource: None,
        normalizer,
        tag_path: None,
        cache,
    };
    let node = Node {
        shape,
        operands: Operands::new(first, second),
        path: FieldPath::new(),
    };
    kernel::body(&mut strategy, &node, &mut out, level)?;

    Ok(EqualityCode {
        body: out.finish(),
        helpers: emit_helpers(normalizer, strategy.cache)?,
    })
}

/// Renders every pending helper. Helpers may request further helpers, which
/// are rendered in turn until none is left.
fn emit_helpers(normalizer: &dyn NameNormalizer, cache: &mut HelperCache) -> Result<String> {
    let mut out = Emitter::new();

    while let Some(shape) = cache.next_pending() {
        if !out.is_empty() {
            out.blank();
        }

        let helper = super::dedup::helper_name(&shape);
        debug!(helper = %helper, "emitting equality helper");

        out.line(
            0,
            format!("func {helper}(a, b {go_type}) bool {{", go_type = shape.go_type()),
        );

        let mut strategy = EqualityStrategy {
            resource: None,
            normalizer,
            tag_path: None,
            cache: &mut *cache,
        };
        let node = Node {
            shape: &shape,
            operands: Operands::new("a", "b"),
            path: FieldPath::new(),
        };
        kernel::body(&mut strategy, &node, &mut out, 1)?;

        out.line(1, "return true");
        out.line(0, "}");
    }

    Ok(out.finish())
}
