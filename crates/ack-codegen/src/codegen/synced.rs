//! Predicates deciding whether a resource reached its synced state.
//!
//! Each configured condition names a field and the values it must hold. The
//! emitted code returns `false, nil` as soon as a field on the way is absent
//! or the final value is not accepted, and falls through otherwise.

use std::{collections::HashSet, str::FromStr};

use field_path::FieldPath;
use itertools::Itertools;
use snafu::{OptionExt, ResultExt, ensure};
use tracing::{debug, instrument};

use crate::{
    codegen::{
        Emitter, InvalidSyncedValueSnafu, MalformedFieldPathSnafu, MissingSyncedPathSnafu,
        MissingSyncedValuesSnafu, ParseFieldPathSnafu, Result, UnknownSyncedFieldSnafu,
        UnsupportedSyncedShapeSnafu, UnsupportedSyncedValueKindSnafu, go_quote, guard,
    },
    config::SyncedCondition,
    model::{Field, FieldRoot, Resource, ScalarKind, ShapeKind},
};

const NOT_SYNCED: &str = "return false, nil";

/// Renders the checks of every synced condition configured for `resource`.
///
/// `res_var` is the access expression of the resource's Kubernetes object,
/// like `r.ko`. Renders only a leading newline if no condition is
/// configured.
#[instrument(skip_all, fields(resource = %resource.names().camel))]
pub fn resource_is_synced(resource: &Resource, res_var: &str, level: usize) -> Result<String> {
    let conditions = &resource.config().synced.when;
    debug!(conditions = conditions.len(), "rendering synced conditions");

    let mut out = Emitter::new();
    out.blank();

    let mut variables = HashSet::new();
    for (index, condition) in conditions.iter().enumerate() {
        let check = SyncedCheck::resolve(resource, index, condition)?;
        let variable = unique_name(&mut variables, &check.variable_stem());

        check.render(&mut out, level, res_var, &variable)?;
    }

    Ok(out.finish())
}

/// A condition resolved against the resource's fields.
struct SyncedCheck<'a> {
    path: &'a str,
    root: FieldRoot,

    /// Every field on the way, the condition's scalar field last.
    chain: Vec<&'a Field>,
    kind: ScalarKind,
    values: &'a [serde_yaml::Value],
}

impl<'a> SyncedCheck<'a> {
    fn resolve(resource: &'a Resource, index: usize, condition: &'a SyncedCondition) -> Result<Self> {
        let path = condition
            .path
            .as_deref()
            .filter(|path| !path.is_empty())
            .context(MissingSyncedPathSnafu { index })?;

        let values = condition
            .values
            .as_deref()
            .filter(|values| !values.is_empty())
            .context(MissingSyncedValuesSnafu { path })?;

        let field_path = FieldPath::from_str(path).context(ParseFieldPathSnafu { path })?;
        ensure!(field_path.len() >= 2, MalformedFieldPathSnafu {
            path,
            reason: "expected a root and at least one field",
        });

        let root = field_path
            .front()
            .and_then(|root| FieldRoot::from_str(root).ok())
            .context(MalformedFieldPathSnafu {
                path,
                reason: "expected the path to start with Spec or Status",
            })?;

        let segments = field_path.iter().skip(1).collect::<Vec<_>>();
        let mut chain = Vec::with_capacity(segments.len());

        for depth in 1..=segments.len() {
            let key = segments[..depth].iter().join(".");
            let field = resource
                .field(root, &key)
                .context(UnknownSyncedFieldSnafu { path })?;

            let is_last = depth == segments.len();
            let walkable = match field.shape.kind() {
                ShapeKind::Structure(_) => !is_last,
                ShapeKind::Scalar(_) => is_last,
                ShapeKind::Sequence(_) | ShapeKind::Mapping { .. } => false,
            };
            ensure!(walkable, UnsupportedSyncedShapeSnafu {
                path,
                kind: field.shape.kind_name(),
            });

            chain.push(field);
        }

        let kind = chain
            .last()
            .and_then(|field| field.shape.scalar_kind())
            .context(UnknownSyncedFieldSnafu { path })?;

        Ok(Self {
            path,
            root,
            chain,
            kind,
            values,
        })
    }

    /// Candidate variables are named after the top-level field.
    fn variable_stem(&self) -> String {
        let top = self
            .chain
            .first()
            .map(|field| field.names.camel_lower.as_str())
            .unwrap_or_default();

        format!("{top}Candidates")
    }

    fn render(&self, out: &mut Emitter, level: usize, res_var: &str, variable: &str) -> Result<()> {
        for field in &self.chain {
            let access = format!("{res_var}.{root}.{path}", root = self.root, path = field.path);
            guard::absent(out, level, &access, NOT_SYNCED);
        }

        let access = match self.chain.last() {
            Some(field) => format!("{res_var}.{root}.{path}", root = self.root, path = field.path),
            None => return UnknownSyncedFieldSnafu { path: self.path }.fail(),
        };

        let (element, test) = match self.kind {
            ScalarKind::String => ("string", format!("ackutil.InStrings(*{access}, {variable})")),
            ScalarKind::Integer => ("int64", format!("slices.Contains({variable}, *{access})")),
            ScalarKind::Boolean => ("bool", format!("slices.Contains({variable}, *{access})")),
            kind => {
                return UnsupportedSyncedValueKindSnafu {
                    path: self.path,
                    kind,
                }
                .fail();
            }
        };

        let literals = self
            .values
            .iter()
            .map(|value| self.literal(value))
            .collect::<Result<Vec<_>>>()?;

        out.line(
            level,
            format!("{variable} := []{element}{{{}}}", literals.join(", ")),
        );
        out.line(level, format!("if !{test} {{"));
        out.line(level + 1, NOT_SYNCED);
        out.line(level, "}");

        Ok(())
    }

    /// Renders an accepted value as a Go literal of the field's kind.
    fn literal(&self, value: &serde_yaml::Value) -> Result<String> {
        let literal = match (self.kind, value) {
            (ScalarKind::String, serde_yaml::Value::String(value)) => Some(go_quote(value)),
            (ScalarKind::Integer, serde_yaml::Value::Number(number)) => {
                number.as_i64().map(|number| number.to_string())
            }
            (ScalarKind::Boolean, serde_yaml::Value::Bool(value)) => Some(value.to_string()),
            _ => None,
        };

        literal.with_context(|| InvalidSyncedValueSnafu {
            path: self.path,
            value: describe(value),
            kind: self.kind,
        })
    }
}

fn describe(value: &serde_yaml::Value) -> String {
    match value {
        serde_yaml::Value::String(value) => value.clone(),
        serde_yaml::Value::Number(number) => number.to_string(),
        serde_yaml::Value::Bool(value) => value.to_string(),
        other => format!("{other:?}"),
    }
}

/// Returns `stem`, or `stem` with the lowest numeric suffix not taken yet.
fn unique_name(taken: &mut HashSet<String>, stem: &str) -> String {
    let mut name = stem.to_owned();
    let mut suffix = 2;

    while taken.contains(&name) {
        name = format!("{stem}{suffix}");
        suffix += 1;
    }

    taken.insert(name.clone());
    name
}
