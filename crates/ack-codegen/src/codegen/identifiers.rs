//! Discovery of the fields identifying a resource in API calls.
//!
//! Fields marked with `is_primary_key` always win. Otherwise identifiers are
//! found by name, trying a fixed list of candidates in order.

use tracing::{debug, instrument};

use crate::model::{Resource, Shape};

/// A member of an operation shape which holds an identifier.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ShapeIdentifier {
    /// The member name in the shape.
    pub member: String,

    /// The member name after the operation's input renames, which is the
    /// name of the corresponding resource field.
    pub name: String,
}

/// A singular resource identifier paired with the plural member of a list
/// operation accepting many of them, like `VpcId` and `VpcIds`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PluralizedIdentifier {
    pub resource: String,
    pub member: String,
}

fn candidates(resource: &Resource) -> [String; 8] {
    let name = &resource.names().camel;
    [
        "Id".to_owned(),
        "Ids".to_owned(),
        "Name".to_owned(),
        "Names".to_owned(),
        format!("{name}Name"),
        format!("{name}Names"),
        format!("{name}Id"),
        format!("{name}Ids"),
    ]
}

/// Returns the names of the top-level fields identifying the resource.
///
/// If any field is configured as primary key, only those are returned.
#[instrument(skip_all, fields(resource = %resource.names().camel))]
pub fn resource_identifiers(resource: &Resource) -> Vec<String> {
    let mut primary_keys = resource
        .spec_fields()
        .values()
        .chain(resource.status_fields().values())
        .filter(|field| field.is_primary_key())
        .map(|field| field.path.to_string())
        .collect::<Vec<_>>();

    if !primary_keys.is_empty() {
        primary_keys.sort();
        debug!(?primary_keys, "using configured primary keys");
        return primary_keys;
    }

    candidates(resource)
        .into_iter()
        .filter(|candidate| {
            resource.spec_fields().contains_key(candidate)
                || resource.status_fields().contains_key(candidate)
        })
        .collect()
}

/// Returns the identifier members of an operation's shape, matching the
/// candidate names against member names renamed by the operation's input
/// renames.
pub fn shape_identifiers(
    resource: &Resource,
    shape: &Shape,
    operation: &str,
) -> Vec<ShapeIdentifier> {
    let members = renamed_members(resource, shape, operation);

    candidates(resource)
        .into_iter()
        .filter_map(|candidate| {
            members
                .iter()
                .find(|identifier| identifier.name == candidate)
                .cloned()
        })
        .collect()
}

/// Pairs the first resource identifier with a member of the operation's
/// shape holding its plural, comparing names case-insensitively.
#[instrument(skip_all, fields(resource = %resource.names().camel, operation = %operation))]
pub fn pluralized_identifiers(
    resource: &Resource,
    shape: &Shape,
    operation: &str,
) -> Option<PluralizedIdentifier> {
    let members = renamed_members(resource, shape, operation);

    let pair = resource_identifiers(resource).into_iter().find_map(|identifier| {
        let plural = format!("{identifier}s");
        members
            .iter()
            .find(|member| member.name.eq_ignore_ascii_case(&plural))
            .map(|member| PluralizedIdentifier {
                resource: identifier,
                member: member.member.clone(),
            })
    });

    if pair.is_none() {
        debug!("no plural identifier member found");
    }
    pair
}

fn renamed_members(resource: &Resource, shape: &Shape, operation: &str) -> Vec<ShapeIdentifier> {
    let renames = resource.config().input_renames(operation);

    shape
        .members()
        .into_iter()
        .flat_map(|members| members.keys())
        .map(|member| {
            let name = renames
                .and_then(|renames| renames.get(member))
                .unwrap_or(member);

            ShapeIdentifier {
                member: member.clone(),
                name: name.clone(),
            }
        })
        .collect()
}
