//! Resolution of fields whose value is read from another resource.
//!
//! Every field configured with `references` has a synthesized `...Ref` (or
//! `...Refs`) field next to it. The emitted code checks that at most one of
//! the two is set, looks up the referenced resource through `apiReader` and
//! copies the configured value of its observed state into the field.
//!
//! Reference fields may live below structures and sequences, but not below
//! mappings. Parents are walked with a presence check per structure and a
//! loop per sequence, using `f<n>iter` and `f<n>idx` as loop variables.

use std::str::FromStr;

use field_path::FieldPath;
use snafu::{OptionExt, ResultExt, ensure};
use tracing::{debug, instrument};

use crate::{
    codegen::{
        Emitter, MalformedFieldPathSnafu, ParseFieldPathSnafu, ReferenceWithinMappingSnafu,
        Result, UnknownFieldSnafu, guard,
    },
    config::ReferencesConfig,
    model::{Field, Resource, SPEC_ROOT, ShapeKind},
};

/// A referencing field together with everything needed to reach it.
struct Reference<'a> {
    field: &'a Field,
    config: &'a ReferencesConfig,

    /// Names of the synthesized reference field.
    reference: &'a str,
    reference_path: FieldPath,

    /// Fields containing the reference field, outermost first.
    parents: Vec<&'a Field>,
}

impl<'a> Reference<'a> {
    fn all(resource: &'a Resource) -> Result<Vec<Self>> {
        resource
            .referencing_fields()
            .into_iter()
            .filter_map(|field| Self::new(resource, field).transpose())
            .collect()
    }

    fn new(resource: &'a Resource, field: &'a Field) -> Result<Option<Self>> {
        let (Some(config), Some(reference), Some(reference_path)) = (
            field.references(),
            field.reference.as_ref(),
            field.reference_path(),
        ) else {
            return Ok(None);
        };

        let mut parents = Vec::with_capacity(reference_path.len().saturating_sub(1));
        for depth in 0..reference_path.len().saturating_sub(1) {
            let path = reference_path
                .copy_at(depth)
                .map(|path| path.to_string())
                .unwrap_or_default();

            let parent = resource
                .spec_field(&path)
                .with_context(|| UnknownFieldSnafu {
                    path: &path,
                    resource: &resource.names().original,
                })?;

            match parent.shape.kind() {
                ShapeKind::Structure(_) | ShapeKind::Sequence(_) => parents.push(parent),
                ShapeKind::Mapping { .. } => {
                    return ReferenceWithinMappingSnafu {
                        path: field.path.to_string(),
                    }
                    .fail();
                }
                ShapeKind::Scalar(_) => {
                    return MalformedFieldPathSnafu {
                        path: field.path.to_string(),
                        reason: "reference fields cannot be nested in scalars",
                    }
                    .fail();
                }
            }
        }

        Ok(Some(Self {
            field,
            config,
            reference: &reference.camel,
            reference_path,
            parents,
        }))
    }

    fn is_list(&self) -> bool {
        self.field.shape.is_sequence()
    }

    fn within_list(&self) -> bool {
        self.parents.iter().any(|parent| parent.shape.is_sequence())
    }

    /// Opens a block per parent and returns the access expression of the
    /// innermost parent together with the number of opened blocks.
    fn open_parents(
        &self,
        source: &str,
        indexes: bool,
        out: &mut Emitter,
        level: usize,
    ) -> (String, usize) {
        let mut prefix = format!("{source}.{SPEC_ROOT}");
        let mut lists = 0;

        for (opened, parent) in self.parents.iter().enumerate() {
            let access = format!("{prefix}.{name}", name = parent.names.camel);

            if parent.shape.is_sequence() {
                let index = if indexes {
                    format!("f{lists}idx")
                } else {
                    "_".to_owned()
                };
                let iterator = format!("f{lists}iter");

                out.line(
                    level + opened,
                    format!("for {index}, {iterator} := range {access} {{"),
                );
                prefix = iterator;
                lists += 1;
            } else {
                guard::open_present(out, level + opened, &access);
                prefix = access;
            }
        }

        (prefix, self.parents.len())
    }

    /// Access expression of the referencing field, indexing every parent
    /// sequence with its loop index.
    fn concrete_access(&self, source: &str) -> String {
        let mut access = format!("{source}.{SPEC_ROOT}");
        let mut lists = 0;

        for parent in &self.parents {
            access.push('.');
            access.push_str(&parent.names.camel);

            if parent.shape.is_sequence() {
                access.push_str(&format!("[f{lists}idx]"));
                lists += 1;
            }
        }

        access.push('.');
        access.push_str(&self.field.names.camel);
        access
    }

    fn list_depth(&self) -> usize {
        self.parents
            .iter()
            .filter(|parent| parent.shape.is_sequence())
            .count()
    }
}

fn close_blocks(out: &mut Emitter, level: usize, opened: usize) {
    for depth in (0..opened).rev() {
        guard::close(out, level + depth);
    }
}

/// Renders the checks that a referencing field and its reference field are
/// not both set, and that one of them is set if the field is required.
#[instrument(skip_all, fields(resource = %resource.names().camel))]
pub fn validate_references(resource: &Resource, source: &str, level: usize) -> Result<String> {
    let mut out = Emitter::new();

    for reference in Reference::all(resource)? {
        let (prefix, opened) = reference.open_parents(source, false, &mut out, level);
        let inner = level + opened;

        let field = &reference.field.names.camel;
        let reference_field = reference.reference;

        out.line(
            inner,
            format!("if {prefix}.{reference_field} != nil && {prefix}.{field} != nil {{"),
        );
        out.line(
            inner + 1,
            format!(
                "return ackerr.ResourceReferenceAndIDNotSupportedFor(\"{path}\", \"{reference_path}\")",
                path = reference.field.path,
                reference_path = reference.reference_path,
            ),
        );
        out.line(inner, "}");

        if reference.field.is_required() {
            out.line(
                inner,
                format!("if {prefix}.{reference_field} == nil && {prefix}.{field} == nil {{"),
            );
            out.line(
                inner + 1,
                format!(
                    "return ackerr.ResourceReferenceOrIDRequiredFor(\"{field}\", \"{reference_field}\")"
                ),
            );
            out.line(inner, "}");
        }

        close_blocks(&mut out, level, opened);
    }

    Ok(out.finish())
}

/// Renders a `return` statement reporting whether any reference field is
/// set.
///
/// Reference fields within sequences are checked by loops preceding the
/// statement, which return `true` early.
#[instrument(skip_all, fields(resource = %resource.names().camel))]
pub fn references_present(resource: &Resource, source: &str, level: usize) -> Result<String> {
    let mut out = Emitter::new();
    let mut statement = "return false".to_owned();

    for reference in Reference::all(resource)? {
        if reference.within_list() {
            let (prefix, opened) = reference.open_parents(source, false, &mut out, level);
            let inner = level + opened;

            out.line(
                inner,
                format!("if {prefix}.{name} != nil {{", name = reference.reference),
            );
            out.line(inner + 1, "return true");
            out.line(inner, "}");

            close_blocks(&mut out, level, opened);
        } else {
            let root = format!("{source}.{SPEC_ROOT}");
            let chain = guard::presence_chain(&root, reference.reference_path.iter());
            statement.push_str(&format!(" || ({chain})"));
        }
    }

    out.line(level, statement);
    Ok(out.finish())
}

/// Renders the resolution of every reference field.
///
/// For each set reference the referenced resource is read, its configured
/// value checked for presence and copied into the referencing field. Lists
/// of references append to the referencing list in their own order. The
/// emitted code expects `ctx`, `apiReader`, `namespace` and a boolean
/// `hasReferences` in scope.
#[instrument(skip_all, fields(resource = %resource.names().camel))]
pub fn resolve_references(resource: &Resource, source: &str, level: usize) -> Result<String> {
    let mut out = Emitter::new();

    for reference in Reference::all(resource)? {
        let (prefix, mut opened) = reference.open_parents(source, true, &mut out, level);
        let mut access = format!("{prefix}.{name}", name = reference.reference);

        if reference.is_list() {
            let iterator = format!("f{}iter", reference.list_depth());
            out.line(
                level + opened,
                format!("for _, {iterator} := range {access} {{"),
            );
            access = iterator;
            opened += 1;
        }

        let inner = level + opened;
        out.line(inner, format!("if {access} != nil && {access}.From != nil {{"));
        resolve_one(&reference, &access, source, &mut out, inner + 1)?;
        out.line(inner, "}");

        close_blocks(&mut out, level, opened);
    }

    Ok(out.finish())
}

fn resolve_one(
    reference: &Reference<'_>,
    access: &str,
    source: &str,
    out: &mut Emitter,
    level: usize,
) -> Result<()> {
    let config = reference.config;
    let kind = &config.resource;
    let reference_path = &reference.reference_path;

    out.line(level, "hasReferences = true");
    out.line(level, format!("arr := {access}.From"));
    out.line(level, "if arr.Name == nil || *arr.Name == \"\" {");
    out.line(
        level + 1,
        format!(
            "return hasReferences, fmt.Errorf(\"provided resource reference is nil or empty: {reference_path}\")"
        ),
    );
    out.line(level, "}");

    out.line(
        level,
        format!(
            "obj := &{package}.{kind}{{}}",
            package = config.api_types_package()
        ),
    );
    out.line(
        level,
        format!(
            "if err := getReferencedResourceState_{kind}(ctx, apiReader, obj, *arr.Name, namespace); err != nil {{"
        ),
    );
    out.line(level + 1, "return hasReferences, err");
    out.line(level, "}");

    // The synced state of the referenced resource is only reported, it does
    // not block the resolution.
    if config.skip_resource_state_validations {
        debug!(reference = %reference_path, "skipping referenced resource state validation");
    } else {
        out.line(level, "if !ackcondition.IsSynced(obj) {");
        out.line(
            level + 1,
            format!(
                "ackrtlog.FromContext(ctx).Debug(\"referenced resource is not synced\", \"reference\", \"{reference_path}\")"
            ),
        );
        out.line(level, "}");
    }

    out.line(
        level,
        format!("if {} {{", nil_reference_check_path(config, "obj")?),
    );
    out.line(
        level + 1,
        format!(
            "return hasReferences, ackerr.ResourceReferenceMissingTargetFieldFor(\"{kind}\", namespace, *arr.Name, \"{path}\")",
            path = config.path
        ),
    );
    out.line(level, "}");

    let concrete = reference.concrete_access(source);
    let value = format!("obj.{path}", path = config.path);

    match reference.field.shape.kind() {
        ShapeKind::Sequence(element) => {
            let element = element.go_type();
            out.line(level, format!("if {concrete} == nil {{"));
            out.line(level + 1, format!("{concrete} = make([]{element}, 0, 1)"));
            out.line(level, "}");
            out.line(
                level,
                format!("{concrete} = append({concrete}, ({element})({value}))"),
            );
        }
        _ => {
            out.line(
                level,
                format!(
                    "{concrete} = ({go_type})({value})",
                    go_type = reference.field.shape.go_type()
                ),
            );
        }
    }

    Ok(())
}

/// Renders the reset of every referencing field whose reference field is
/// set, so that the value resolved into it is not persisted.
#[instrument(skip_all, fields(resource = %resource.names().camel))]
pub fn clear_resolved_references(resource: &Resource, target: &str, level: usize) -> Result<String> {
    let mut out = Emitter::new();

    for reference in Reference::all(resource)? {
        let (prefix, opened) = reference.open_parents(target, true, &mut out, level);
        let inner = level + opened;
        let access = format!("{prefix}.{name}", name = reference.reference);

        if reference.is_list() {
            out.line(inner, format!("if len({access}) > 0 {{"));
        } else {
            guard::open_present(&mut out, inner, &access);
        }
        out.line(
            inner + 1,
            format!("{} = nil", reference.concrete_access(target)),
        );
        guard::close(&mut out, inner);

        close_blocks(&mut out, level, opened);
    }

    Ok(out.finish())
}

/// Renders a condition which holds if any step of the value path of a
/// reference is absent in the referenced resource `var`, like
/// `obj.Status.ACKResourceMetadata == nil || obj.Status.ACKResourceMetadata.ARN == nil`.
pub fn nil_reference_check_path(references: &ReferencesConfig, var: &str) -> Result<String> {
    let path = FieldPath::from_str(&references.path).context(ParseFieldPathSnafu {
        path: &references.path,
    })?;
    ensure!(path.len() >= 2, MalformedFieldPathSnafu {
        path: &references.path,
        reason: "expected a root and at least one field",
    });

    let mut segments = path.iter();
    let root = segments
        .next()
        .map(|root| format!("{var}.{root}"))
        .unwrap_or_default();

    Ok(guard::absence_chain(&root, segments))
}

#[cfg(test)]
mod tests {
    use indoc::indoc;
    use rstest::rstest;

    use super::*;
    use crate::{
        codegen::Error,
        config::GeneratorConfig,
        model::{DefaultNormalizer, ResourceDefinition},
        test_utils,
    };

    #[test]
    fn validate_single_required_reference() {
        let resource = test_utils::resource("apigatewayv2", "Integration");

        assert_eq!(
            validate_references(&resource, "ko", 1).expect("validation generates"),
            "\tif ko.Spec.APIRef != nil && ko.Spec.APIID != nil {\n\
             \t\treturn ackerr.ResourceReferenceAndIDNotSupportedFor(\"APIID\", \"APIRef\")\n\
             \t}\n\
             \tif ko.Spec.APIRef == nil && ko.Spec.APIID == nil {\n\
             \t\treturn ackerr.ResourceReferenceOrIDRequiredFor(\"APIID\", \"APIRef\")\n\
             \t}\n"
        );
    }

    #[test]
    fn validate_lists_of_references() {
        let resource = test_utils::resource("apigatewayv2", "VpcLink");

        assert_eq!(
            validate_references(&resource, "ko", 1).expect("validation generates"),
            "\tif ko.Spec.SecurityGroupRefs != nil && ko.Spec.SecurityGroupIDs != nil {\n\
             \t\treturn ackerr.ResourceReferenceAndIDNotSupportedFor(\"SecurityGroupIDs\", \"SecurityGroupRefs\")\n\
             \t}\n\
             \tif ko.Spec.SubnetRefs != nil && ko.Spec.SubnetIDs != nil {\n\
             \t\treturn ackerr.ResourceReferenceAndIDNotSupportedFor(\"SubnetIDs\", \"SubnetRefs\")\n\
             \t}\n\
             \tif ko.Spec.SubnetRefs == nil && ko.Spec.SubnetIDs == nil {\n\
             \t\treturn ackerr.ResourceReferenceOrIDRequiredFor(\"SubnetIDs\", \"SubnetRefs\")\n\
             \t}\n"
        );
    }

    #[test]
    fn validate_nested_reference() {
        let resource = test_utils::resource("apigatewayv2", "Authorizer");

        assert_eq!(
            validate_references(&resource, "ko", 1).expect("validation generates"),
            "\tif ko.Spec.JWTConfiguration != nil {\n\
             \t\tif ko.Spec.JWTConfiguration.IssuerRef != nil && ko.Spec.JWTConfiguration.Issuer != nil {\n\
             \t\t\treturn ackerr.ResourceReferenceAndIDNotSupportedFor(\"JWTConfiguration.Issuer\", \"JWTConfiguration.IssuerRef\")\n\
             \t\t}\n\
             \t}\n"
        );
    }

    #[test]
    fn validate_references_within_lists() {
        let resource = test_utils::resource("ec2", "RouteTable");
        let code = validate_references(&resource, "ko", 1).expect("validation generates");

        assert!(code.starts_with(
            "\tfor _, f0iter := range ko.Spec.Routes {\n\
             \t\tif f0iter.GatewayRef != nil && f0iter.GatewayID != nil {\n\
             \t\t\treturn ackerr.ResourceReferenceAndIDNotSupportedFor(\"Routes.GatewayID\", \"Routes.GatewayRef\")\n\
             \t\t}\n\
             \t}\n"
        ));
    }

    #[rstest]
    #[case::none("s3", "Bucket", "\treturn false\n")]
    #[case::single(
        "apigatewayv2",
        "Integration",
        "\treturn false || (ko.Spec.APIRef != nil)\n"
    )]
    #[case::lists(
        "apigatewayv2",
        "VpcLink",
        "\treturn false || (ko.Spec.SecurityGroupRefs != nil) || (ko.Spec.SubnetRefs != nil)\n"
    )]
    #[case::nested(
        "apigatewayv2",
        "Authorizer",
        "\treturn false || (ko.Spec.JWTConfiguration != nil && ko.Spec.JWTConfiguration.IssuerRef != nil)\n"
    )]
    #[case::within_lists(
        "ec2",
        "RouteTable",
        "\tfor _, f0iter := range ko.Spec.Routes {\n\
         \t\tif f0iter.GatewayRef != nil {\n\
         \t\t\treturn true\n\
         \t\t}\n\
         \t}\n\
         \tfor _, f0iter := range ko.Spec.Routes {\n\
         \t\tif f0iter.NATGatewayRef != nil {\n\
         \t\t\treturn true\n\
         \t\t}\n\
         \t}\n\
         \treturn false || (ko.Spec.VPCRef != nil)\n"
    )]
    fn presence(#[case] service: &str, #[case] name: &str, #[case] expected: &str) {
        let resource = test_utils::resource(service, name);
        assert_eq!(
            references_present(&resource, "ko", 1).expect("presence check generates"),
            expected
        );
    }

    #[test]
    fn resolve_single_reference() {
        let resource = test_utils::resource("apigatewayv2", "Integration");

        assert_eq!(
            resolve_references(&resource, "ko", 1).expect("resolution generates"),
            "\tif ko.Spec.APIRef != nil && ko.Spec.APIRef.From != nil {\n\
             \t\thasReferences = true\n\
             \t\tarr := ko.Spec.APIRef.From\n\
             \t\tif arr.Name == nil || *arr.Name == \"\" {\n\
             \t\t\treturn hasReferences, fmt.Errorf(\"provided resource reference is nil or empty: APIRef\")\n\
             \t\t}\n\
             \t\tobj := &svcapitypes.API{}\n\
             \t\tif err := getReferencedResourceState_API(ctx, apiReader, obj, *arr.Name, namespace); err != nil {\n\
             \t\t\treturn hasReferences, err\n\
             \t\t}\n\
             \t\tif !ackcondition.IsSynced(obj) {\n\
             \t\t\tackrtlog.FromContext(ctx).Debug(\"referenced resource is not synced\", \"reference\", \"APIRef\")\n\
             \t\t}\n\
             \t\tif obj.Status.APIID == nil {\n\
             \t\t\treturn hasReferences, ackerr.ResourceReferenceMissingTargetFieldFor(\"API\", namespace, *arr.Name, \"Status.APIID\")\n\
             \t\t}\n\
             \t\tko.Spec.APIID = (*string)(obj.Status.APIID)\n\
             \t}\n"
        );
    }

    #[test]
    fn resolve_list_of_references() {
        let resource = test_utils::resource("apigatewayv2", "VpcLink");
        let code = resolve_references(&resource, "ko", 1).expect("resolution generates");

        assert!(code.starts_with(
            "\tfor _, f0iter := range ko.Spec.SecurityGroupRefs {\n\
             \t\tif f0iter != nil && f0iter.From != nil {\n\
             \t\t\thasReferences = true\n\
             \t\t\tarr := f0iter.From\n"
        ));
        assert!(code.contains("\t\t\tobj := &ec2apitypes.SecurityGroup{}\n"));
        assert!(code.contains(
            "\t\t\tif ko.Spec.SecurityGroupIDs == nil {\n\
             \t\t\t\tko.Spec.SecurityGroupIDs = make([]*string, 0, 1)\n\
             \t\t\t}\n\
             \t\t\tko.Spec.SecurityGroupIDs = append(ko.Spec.SecurityGroupIDs, (*string)(obj.Status.ID))\n\
             \t\t}\n\
             \t}\n"
        ));
    }

    #[test]
    fn resolve_references_within_lists() {
        let resource = test_utils::resource("ec2", "RouteTable");
        let code = resolve_references(&resource, "ko", 1).expect("resolution generates");

        assert!(code.starts_with(
            "\tfor f0idx, f0iter := range ko.Spec.Routes {\n\
             \t\tif f0iter.GatewayRef != nil && f0iter.GatewayRef.From != nil {\n"
        ));
        assert!(code.contains(
            "\t\t\tko.Spec.Routes[f0idx].GatewayID = (*string)(obj.Status.InternetGatewayID)\n"
        ));
        assert!(code.contains("\t\tko.Spec.VPCID = (*string)(obj.Status.VPCID)\n"));
    }

    #[test]
    fn skipped_state_validation() {
        let resource = test_utils::resource("apigatewayv2", "Authorizer");
        let code = resolve_references(&resource, "ko", 1).expect("resolution generates");

        assert!(!code.contains("ackcondition.IsSynced"));
        assert!(code.contains("\t\t\tobj := &cognitoidpapitypes.UserPool{}\n"));
        assert!(code.contains(
            "\t\t\tif obj.Status.ACKResourceMetadata == nil || obj.Status.ACKResourceMetadata.ARN == nil {\n"
        ));
        assert!(code.contains(
            "\t\t\tko.Spec.JWTConfiguration.Issuer = (*string)(obj.Status.ACKResourceMetadata.ARN)\n"
        ));
    }

    #[test]
    fn clear_references() {
        let route_table = test_utils::resource("ec2", "RouteTable");
        assert_eq!(
            clear_resolved_references(&route_table, "ko", 1).expect("clearing generates"),
            "\tfor f0idx, f0iter := range ko.Spec.Routes {\n\
             \t\tif f0iter.GatewayRef != nil {\n\
             \t\t\tko.Spec.Routes[f0idx].GatewayID = nil\n\
             \t\t}\n\
             \t}\n\
             \tfor f0idx, f0iter := range ko.Spec.Routes {\n\
             \t\tif f0iter.NATGatewayRef != nil {\n\
             \t\t\tko.Spec.Routes[f0idx].NATGatewayID = nil\n\
             \t\t}\n\
             \t}\n\
             \tif ko.Spec.VPCRef != nil {\n\
             \t\tko.Spec.VPCID = nil\n\
             \t}\n"
        );

        let vpc_link = test_utils::resource("apigatewayv2", "VpcLink");
        assert_eq!(
            clear_resolved_references(&vpc_link, "ko", 1).expect("clearing generates"),
            "\tif len(ko.Spec.SecurityGroupRefs) > 0 {\n\
             \t\tko.Spec.SecurityGroupIDs = nil\n\
             \t}\n\
             \tif len(ko.Spec.SubnetRefs) > 0 {\n\
             \t\tko.Spec.SubnetIDs = nil\n\
             \t}\n"
        );
    }

    #[rstest]
    #[case("Status.APIID", "obj.Status.APIID == nil")]
    #[case(
        "Status.ACKResourceMetadata.ARN",
        "obj.Status.ACKResourceMetadata == nil || obj.Status.ACKResourceMetadata.ARN == nil"
    )]
    fn nil_check_paths(#[case] path: &str, #[case] expected: &str) {
        let references = ReferencesConfig {
            resource: "Key".to_owned(),
            service_name: None,
            path: path.to_owned(),
            skip_resource_state_validations: false,
        };

        assert_eq!(
            nil_reference_check_path(&references, "obj").expect("valid path"),
            expected
        );
    }

    #[test]
    fn references_within_mappings_are_rejected() {
        let definition = ResourceDefinition::from_yaml(indoc! {"
            name: Cluster
            spec:
              type: structure
              name: ClusterSpec
              members:
                NodeGroups:
                  type: map
                  key: { type: string }
                  value:
                    type: structure
                    name: NodeGroup
                    members:
                      SubnetID: { type: string }
        "})
        .expect("valid resource definition");
        let config = GeneratorConfig::from_yaml(indoc! {"
            resources:
              Cluster:
                fields:
                  NodeGroups.SubnetID:
                    references:
                      resource: Subnet
                      service_name: ec2
                      path: Status.SubnetID
        "})
        .expect("valid generator config");
        let resource = Resource::new(definition, &config, &DefaultNormalizer).expect("valid resource");

        let err = validate_references(&resource, "ko", 1).expect_err("mappings cannot hold references");
        assert!(matches!(err, Error::ReferenceWithinMapping { path } if path == "NodeGroups.SubnetID"));
    }
}
