//! Conversion between a resource's own tag representation and the canonical
//! key/value mapping.
//!
//! Resources expose tags either as a list of key/value structures or as a
//! native string map. The emitted converters translate both from and into a
//! `map[string]string` plus, for lists, the original key order. See
//! [`crate::runtime::CanonicalTags`] for the contract they implement.

use snafu::{OptionExt, ResultExt};
use tracing::{debug, instrument};

use crate::{
    codegen::{
        Emitter, MissingTagFieldSnafu, ResolveTagFieldSnafu, Result, UnsupportedTagShapeSnafu,
        kernel::Operands,
    },
    model::{Field, Resource, ScalarKind, Shape, ShapeKind},
};

/// How a resource represents its tags.
#[derive(Debug)]
enum TagRepresentation<'a> {
    /// A list of structures, each holding one key and one value member.
    Pairs {
        element: &'a Shape,
        key: &'a str,
        value: &'a str,
    },

    /// A native map of strings.
    Map,
}

impl<'a> TagRepresentation<'a> {
    fn of(field: &'a Field, key_name: &str, value_name: &str) -> Result<Self> {
        let unsupported = || UnsupportedTagShapeSnafu {
            path: field.path.to_string(),
            shape: field.shape.name(),
            key: key_name,
            value: value_name,
        };

        match field.shape.kind() {
            ShapeKind::Sequence(element) => {
                let (key, _) = element.member(key_name).with_context(unsupported)?;
                let (value, _) = element.member(value_name).with_context(unsupported)?;

                Ok(Self::Pairs {
                    element,
                    key,
                    value,
                })
            }
            ShapeKind::Mapping {
                key: ScalarKind::String,
                value,
            } if value.scalar_kind() == Some(ScalarKind::String) => Ok(Self::Map),
            _ => unsupported().fail(),
        }
    }
}

/// Resolves how the tag field of `resource` represents its tags.
///
/// Returns [`None`] if tags are ignored for the resource.
fn tag_representation(resource: &Resource) -> Result<Option<TagRepresentation<'_>>> {
    let tags = &resource.config().tags;
    if tags.ignore {
        debug!("tags are ignored");
        return Ok(None);
    }

    let field = resource
        .tag_field()
        .context(ResolveTagFieldSnafu)?
        .context(MissingTagFieldSnafu {
            resource: &resource.names().original,
        })?;
    TagRepresentation::of(field, tags.key_name(), tags.value_name()).map(Some)
}

/// Emits the comparison of two tag fields through their canonical mappings.
///
/// The generated code expects a `convertToOrderedACKTags` function in scope,
/// as rendered by [`to_canonical`].
pub(crate) fn compare_tags(out: &mut Emitter, level: usize, operands: &Operands, on_difference: &str) {
    let Operands { a, b } = operands;

    out.line(level, format!("desiredACKTags, _ := convertToOrderedACKTags({a})"));
    out.line(level, format!("latestACKTags, _ := convertToOrderedACKTags({b})"));
    out.line(
        level,
        "if !ackcompare.MapStringStringEqual(desiredACKTags, latestACKTags) {",
    );
    out.line(level + 1, on_difference);
    out.line(level, "}");
}

/// Renders the conversion of the resource's tags held in `source` into the
/// canonical mapping `target`, recording the key order of list-backed tags
/// in `order`.
///
/// Pairs without a key are skipped and absent values become empty strings.
/// Returns an empty string if tags are ignored for the resource.
#[instrument(skip_all, fields(resource = %resource.names().camel))]
pub fn to_canonical(
    resource: &Resource,
    source: &str,
    target: &str,
    order: &str,
    level: usize,
) -> Result<String> {
    let Some(representation) = tag_representation(resource)? else {
        return Ok(String::new());
    };

    let mut out = Emitter::new();
    out.blank();
    out.line(level, format!("if len({source}) == 0 {{"));
    out.line(level + 1, format!("return {target}, {order}"));
    out.line(level, "}");

    match representation {
        TagRepresentation::Pairs { key, value, .. } => {
            out.line(level, format!("for _, t := range {source} {{"));
            out.line(level + 1, format!("if t.{key} != nil {{"));
            out.line(level + 2, format!("{order} = append({order}, *t.{key})"));
            out.line(level + 2, format!("if t.{value} != nil {{"));
            out.line(level + 3, format!("{target}[*t.{key}] = *t.{value}"));
            out.line(level + 2, "} else {");
            out.line(level + 3, format!("{target}[*t.{key}] = \"\""));
            out.line(level + 2, "}");
            out.line(level + 1, "}");
            out.line(level, "}");
        }
        TagRepresentation::Map => {
            out.line(level, format!("for k, v := range {source} {{"));
            out.line(level + 1, "if v == nil {");
            out.line(level + 2, format!("{target}[k] = \"\""));
            out.line(level + 1, "} else {");
            out.line(level + 2, format!("{target}[k] = *v"));
            out.line(level + 1, "}");
            out.line(level, "}");
        }
    }

    Ok(out.finish())
}

/// Renders the conversion of the canonical mapping `tags` back into the
/// resource's tag representation held in `target`.
///
/// For list-backed tags the keys in `order` are replayed first and removed
/// from `tags`, the remaining entries follow. Map-backed tags accept `order`
/// but do not use it. Returns an empty string if tags are ignored for the
/// resource.
#[instrument(skip_all, fields(resource = %resource.names().camel))]
pub fn from_canonical(
    resource: &Resource,
    tags: &str,
    order: &str,
    target: &str,
    level: usize,
) -> Result<String> {
    let Some(representation) = tag_representation(resource)? else {
        return Ok(String::new());
    };

    let mut out = Emitter::new();
    out.blank();

    match representation {
        TagRepresentation::Pairs {
            element,
            key,
            value,
        } => {
            let element = element.go_type_elem();

            out.line(level, format!("for _, k := range {order} {{"));
            out.line(level + 1, format!("v, ok := {tags}[k]"));
            out.line(level + 1, "if ok {");
            out.line(
                level + 2,
                format!("tag := svcapitypes.{element}{{{key}: &k, {value}: &v}}"),
            );
            out.line(level + 2, format!("{target} = append({target}, &tag)"));
            out.line(level + 2, format!("delete({tags}, k)"));
            out.line(level + 1, "}");
            out.line(level, "}");

            out.line(level, format!("for k, v := range {tags} {{"));
            out.line(
                level + 1,
                format!("tag := svcapitypes.{element}{{{key}: &k, {value}: &v}}"),
            );
            out.line(level + 1, format!("{target} = append({target}, &tag)"));
            out.line(level, "}");
        }
        TagRepresentation::Map => {
            out.line(level, format!("_ = {order}"));
            out.line(level, format!("for k, v := range {tags} {{"));
            out.line(level + 1, format!("{target}[k] = &v"));
            out.line(level, "}");
        }
    }

    Ok(out.finish())
}
