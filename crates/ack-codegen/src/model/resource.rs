use field_path::FieldPath;
use indexmap::IndexMap;
use itertools::Itertools;
use serde::Deserialize;
use snafu::{ResultExt, Snafu, ensure};
use tracing::{debug, instrument};

use crate::{
    config::{FieldConfig, GeneratorConfig, ReferencesConfig, ResourceConfig},
    model::{NameNormalizer, Names, ScalarKind, Shape, ShapeKind},
};

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Root of the desired-state fields in generated access expressions.
pub const SPEC_ROOT: &str = "Spec";

/// Root of the observed-state fields in generated access expressions.
pub const STATUS_ROOT: &str = "Status";

/// Name suffixes which mark a field as holding an identifier. They are
/// stripped before `Ref` is appended to build a reference field name.
const IDENTIFIER_SUFFIXES: &[&str] = &[
    "id", "ids", "Id", "Ids", "ID", "IDs", "IDS", "Name", "Names", "NAME", "NAMEs", "NAMES", "Arn",
    "Arns", "ARN", "ARNs", "ARNS",
];

#[derive(Debug, Snafu)]
pub enum Error {
    #[snafu(display("failed to parse resource definition"))]
    ParseDefinition { source: serde_yaml::Error },

    #[snafu(display("the {root} shape of resource {resource:?} must be a structure, got {kind}"))]
    RootNotStructure {
        resource: String,
        root: &'static str,
        kind: &'static str,
    },

    #[snafu(display(
        "the reference field name for {path:?} cannot be derived from an identifier suffix alone"
    ))]
    EmptyReferenceName { path: String },

    #[snafu(display("tag field {path:?} of resource {resource:?} does not exist"))]
    UnknownTagField { resource: String, path: String },
}

/// Distinguishes desired-state from observed-state fields.
#[derive(Clone, Copy, Debug, PartialEq, Eq, strum::Display, strum::EnumString)]
pub enum FieldRoot {
    Spec,
    Status,
}

/// The serialized form of a resource's shape model.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ResourceDefinition {
    pub name: String,

    /// Structure holding the desired-state fields.
    pub spec: Shape,

    /// Structure holding the observed-state fields.
    #[serde(default)]
    pub status: Option<Shape>,

    /// API operations of the resource, keyed by operation name.
    #[serde(default)]
    pub operations: IndexMap<String, Operation>,
}

impl ResourceDefinition {
    pub fn from_yaml(input: &str) -> Result<Self> {
        serde_yaml::from_str(input).context(ParseDefinitionSnafu)
    }
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct Operation {
    #[serde(default)]
    pub input: Option<Shape>,

    #[serde(default)]
    pub output: Option<Shape>,
}

/// A field of a resource: its names, location, shape and configuration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Field {
    pub names: Names,

    /// Dotted location below the spec or status root, using
    /// [`Names::camel`] segments.
    pub path: FieldPath,

    pub shape: Shape,

    pub config: Option<FieldConfig>,

    /// Names of the synthesized reference field, if this field is resolved
    /// from another resource.
    pub reference: Option<Names>,

    /// For synthesized reference fields, the field the reference resolves
    /// into.
    pub resolves: Option<FieldPath>,
}

impl Field {
    /// Returns true for synthesized `...Ref`/`...Refs` fields.
    pub fn is_reference(&self) -> bool {
        self.resolves.is_some()
    }

    pub fn references(&self) -> Option<&ReferencesConfig> {
        self.config.as_ref()?.references.as_ref()
    }

    pub fn is_required(&self) -> bool {
        self.config.as_ref().is_some_and(|config| config.is_required)
    }

    pub fn is_primary_key(&self) -> bool {
        self.config
            .as_ref()
            .is_some_and(|config| config.is_primary_key)
    }

    /// Location of the synthesized reference field, next to this field.
    pub fn reference_path(&self) -> Option<FieldPath> {
        let reference = self.reference.as_ref()?;
        Some(self.path.parent().child(&reference.camel))
    }
}

/// A resource with its fields resolved against the generator configuration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Resource {
    names: Names,
    spec_fields: IndexMap<String, Field>,
    status_fields: IndexMap<String, Field>,
    operations: IndexMap<String, Operation>,
    config: ResourceConfig,
}

impl Resource {
    /// Joins a resource definition with its configuration.
    ///
    /// Field renames of all operations are applied to top-level member
    /// names. Nested structure members, also those reached through sequences
    /// and mapping values, are registered under their dotted path. A
    /// reference field is synthesized for every field configured with
    /// `references`.
    #[instrument(skip_all, fields(resource = %definition.name))]
    pub fn new(
        definition: ResourceDefinition,
        config: &GeneratorConfig,
        normalizer: &dyn NameNormalizer,
    ) -> Result<Self> {
        let names = normalizer.names(&definition.name);
        let config = config
            .resource(&definition.name)
            .cloned()
            .unwrap_or_default();

        let renames: IndexMap<&str, &str> = config.field_renames().collect();
        let collector = FieldCollector {
            config: &config,
            normalizer,
            renames: &renames,
        };

        let spec = root_members(&definition.spec, &definition.name, SPEC_ROOT)?;
        let mut spec_fields = IndexMap::new();
        collector.collect(spec, &FieldPath::new(), true, &mut spec_fields)?;

        let mut status_fields = IndexMap::new();
        if let Some(status) = &definition.status {
            let status = root_members(status, &definition.name, STATUS_ROOT)?;
            collector.collect(status, &FieldPath::new(), true, &mut status_fields)?;
        }

        let reference_fields = spec_fields
            .values()
            .filter_map(reference_field)
            .collect::<Vec<_>>();

        for field in reference_fields {
            debug!(field = %field.path, "synthesized reference field");
            spec_fields.insert(field.path.to_string(), field);
        }

        Ok(Self {
            names,
            spec_fields,
            status_fields,
            operations: definition.operations,
            config,
        })
    }

    pub fn names(&self) -> &Names {
        &self.names
    }

    pub fn config(&self) -> &ResourceConfig {
        &self.config
    }

    /// All desired-state fields keyed by dotted path, nested ones included.
    pub fn spec_fields(&self) -> &IndexMap<String, Field> {
        &self.spec_fields
    }

    /// All observed-state fields keyed by dotted path, nested ones included.
    pub fn status_fields(&self) -> &IndexMap<String, Field> {
        &self.status_fields
    }

    pub fn operations(&self) -> &IndexMap<String, Operation> {
        &self.operations
    }

    pub fn field(&self, root: FieldRoot, path: &str) -> Option<&Field> {
        let fields = match root {
            FieldRoot::Spec => &self.spec_fields,
            FieldRoot::Status => &self.status_fields,
        };

        fields.get(path).or_else(|| {
            fields
                .iter()
                .find(|(name, _)| name.eq_ignore_ascii_case(path))
                .map(|(_, field)| field)
        })
    }

    pub fn spec_field(&self, path: &str) -> Option<&Field> {
        self.field(FieldRoot::Spec, path)
    }

    /// Looks up a field in the spec first and the status second.
    pub fn any_field(&self, path: &str) -> Option<&Field> {
        self.spec_field(path)
            .or_else(|| self.field(FieldRoot::Status, path))
    }

    /// Top-level desired-state fields sorted by name.
    pub fn top_level_spec_fields(&self) -> Vec<&Field> {
        self.spec_fields
            .values()
            .filter(|field| field.path.len() == 1)
            .sorted_by(|a, b| a.names.camel.cmp(&b.names.camel))
            .collect()
    }

    /// Desired-state fields configured to be resolved from other resources,
    /// sorted by path.
    pub fn referencing_fields(&self) -> Vec<&Field> {
        self.spec_fields
            .iter()
            .filter(|(_, field)| field.references().is_some())
            .sorted_by(|(a, _), (b, _)| a.cmp(b))
            .map(|(_, field)| field)
            .collect()
    }

    pub fn is_compare_ignored(&self, path: &FieldPath) -> bool {
        self.config.is_compare_ignored(path)
    }

    /// Returns the field holding the resource's tags.
    ///
    /// Returns [`None`] if tags are ignored or if the default tag field is
    /// absent. An explicitly configured tag field which does not exist is an
    /// error.
    pub fn tag_field(&self) -> Result<Option<&Field>> {
        let tags = &self.config.tags;
        if tags.ignore {
            return Ok(None);
        }

        let field = self.spec_field(tags.path());
        ensure!(
            field.is_some() || tags.path.is_none(),
            UnknownTagFieldSnafu {
                resource: &self.names.original,
                path: tags.path(),
            }
        );

        Ok(field)
    }
}

struct FieldCollector<'a> {
    config: &'a ResourceConfig,
    normalizer: &'a dyn NameNormalizer,
    renames: &'a IndexMap<&'a str, &'a str>,
}

impl FieldCollector<'_> {
    fn collect(
        &self,
        members: &IndexMap<String, Shape>,
        prefix: &FieldPath,
        top_level: bool,
        into: &mut IndexMap<String, Field>,
    ) -> Result<()> {
        for (original, shape) in members {
            let renamed = match self.renames.get(original.as_str()) {
                Some(renamed) if top_level => *renamed,
                _ => original.as_str(),
            };

            let names = self.normalizer.names(renamed);
            let path = prefix.child(&names.camel);
            let config = self.config.field(&path).cloned();

            let reference = match config.as_ref().and_then(|c| c.references.as_ref()) {
                Some(_) => Some(self.reference_names(&names, shape, &path)?),
                None => None,
            };

            let nested = match shape.kind() {
                ShapeKind::Structure(members) => Some(members),
                ShapeKind::Sequence(element) => element.members(),
                ShapeKind::Mapping { value, .. } => value.members(),
                ShapeKind::Scalar(_) => None,
            };
            if let Some(nested) = nested {
                self.collect(nested, &path, false, into)?;
            }

            into.insert(path.to_string(), Field {
                names,
                path,
                shape: shape.clone(),
                config,
                reference,
                resolves: None,
            });
        }

        Ok(())
    }

    fn reference_names(&self, names: &Names, shape: &Shape, path: &FieldPath) -> Result<Names> {
        let original = names.original.as_str();
        let prefix = IDENTIFIER_SUFFIXES
            .iter()
            .find_map(|suffix| original.strip_suffix(suffix))
            .unwrap_or(original);

        ensure!(!prefix.is_empty(), EmptyReferenceNameSnafu {
            path: path.to_string()
        });

        let name = if shape.is_sequence() {
            format!("{}Refs", singular(prefix))
        } else {
            format!("{prefix}Ref")
        };

        Ok(self.normalizer.names(&name))
    }
}

fn root_members<'a>(
    shape: &'a Shape,
    resource: &str,
    root: &'static str,
) -> Result<&'a IndexMap<String, Shape>> {
    match shape.members() {
        Some(members) => Ok(members),
        None => RootNotStructureSnafu {
            resource,
            root,
            kind: shape.kind_name(),
        }
        .fail(),
    }
}

fn reference_field(field: &Field) -> Option<Field> {
    let names = field.reference.clone()?;
    let path = field.reference_path()?;

    let wrapper = Shape::structure("AWSResourceReferenceWrapper", [(
        "From",
        Shape::structure("AWSResourceReference", [
            ("Name", Shape::scalar(ScalarKind::String)),
            ("Namespace", Shape::scalar(ScalarKind::String)),
        ]),
    )]);
    let shape = if field.shape.is_sequence() {
        Shape::sequence(wrapper)
    } else {
        wrapper
    };

    Some(Field {
        names,
        path,
        shape,
        config: None,
        reference: None,
        resolves: Some(field.path.clone()),
    })
}

fn singular(name: &str) -> String {
    if let Some(stem) = name.strip_suffix("ies") {
        format!("{stem}y")
    } else if name.ends_with("ss") {
        name.to_owned()
    } else {
        name.strip_suffix('s').unwrap_or(name).to_owned()
    }
}
