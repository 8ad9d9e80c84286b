use std::str::FromStr;

use indexmap::IndexMap;
use serde::Deserialize;
use snafu::{OptionExt, ResultExt, Snafu};

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, PartialEq, Eq, Snafu)]
pub enum Error {
    #[snafu(display("unsupported shape kind {kind:?}"))]
    UnsupportedShapeKind {
        kind: String,
        source: strum::ParseError,
    },

    #[snafu(display("unsupported key type {key:?} for map shape {shape:?}, only string keys are supported"))]
    UnsupportedKeyType { shape: String, key: String },

    #[snafu(display("structure shapes must have a name"))]
    MissingStructureName,

    #[snafu(display("{kind} shape {shape:?} is missing its {part:?} shape"))]
    MissingNestedShape {
        shape: String,
        kind: &'static str,
        part: &'static str,
    },
}

/// The kind of a terminal value in the shape tree.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, strum::Display, strum::EnumString)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum ScalarKind {
    #[strum(to_string = "string", serialize = "character")]
    String,

    #[strum(to_string = "integer", serialize = "long", serialize = "short", serialize = "byte")]
    Integer,

    #[strum(to_string = "float", serialize = "double")]
    Float,

    Boolean,
    Timestamp,
    Blob,
}

impl ScalarKind {
    /// The Go type used for a field of this kind in generated API types.
    pub fn go_type(self) -> &'static str {
        match self {
            Self::String => "*string",
            Self::Integer => "*int64",
            Self::Float => "*float64",
            Self::Boolean => "*bool",
            Self::Timestamp => "*metav1.Time",
            Self::Blob => "[]byte",
        }
    }

    /// The Go type without its pointer indirection, like `string` or `int64`.
    pub fn go_type_elem(self) -> &'static str {
        self.go_type().trim_start_matches('*')
    }
}

/// A node in a resource's field schema.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(try_from = "RawShape")]
pub struct Shape {
    name: String,
    kind: ShapeKind,
}

/// The closed set of shape kinds the generator understands.
#[derive(Clone, Debug, PartialEq, Eq, strum::IntoStaticStr)]
#[strum(serialize_all = "lowercase")]
pub enum ShapeKind {
    Scalar(ScalarKind),

    /// Named members in declaration order.
    Structure(IndexMap<String, Shape>),

    Sequence(Box<Shape>),

    Mapping { key: ScalarKind, value: Box<Shape> },
}

impl Shape {
    pub fn scalar(kind: ScalarKind) -> Self {
        Self {
            name: kind_title(kind),
            kind: ShapeKind::Scalar(kind),
        }
    }

    pub fn structure<N, M, S>(name: N, members: M) -> Self
    where
        N: Into<String>,
        M: IntoIterator<Item = (S, Shape)>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            kind: ShapeKind::Structure(
                members
                    .into_iter()
                    .map(|(name, shape)| (name.into(), shape))
                    .collect(),
            ),
        }
    }

    pub fn sequence(element: Shape) -> Self {
        Self {
            name: format!("{name}List", name = element.name),
            kind: ShapeKind::Sequence(Box::new(element)),
        }
    }

    /// Creates a mapping shape. The key kind is not validated here, code
    /// generation rejects mappings with non-string keys.
    pub fn mapping(key: ScalarKind, value: Shape) -> Self {
        Self {
            name: format!("{name}Map", name = value.name),
            kind: ShapeKind::Mapping {
                key,
                value: Box::new(value),
            },
        }
    }

    /// Replaces the name of the shape.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// The shape name. Structures carry their model name, other shapes a
    /// name derived from their kind and nested shapes.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> &ShapeKind {
        &self.kind
    }

    /// A short name of the shape kind, like `structure` or `mapping`.
    pub fn kind_name(&self) -> &'static str {
        (&self.kind).into()
    }

    pub fn scalar_kind(&self) -> Option<ScalarKind> {
        match self.kind {
            ShapeKind::Scalar(kind) => Some(kind),
            _ => None,
        }
    }

    pub fn is_sequence(&self) -> bool {
        matches!(self.kind, ShapeKind::Sequence(_))
    }

    pub fn members(&self) -> Option<&IndexMap<String, Shape>> {
        match &self.kind {
            ShapeKind::Structure(members) => Some(members),
            _ => None,
        }
    }

    /// Looks up a structure member, first by exact name, then ignoring ASCII
    /// case. Returns the member's declared name alongside its shape.
    pub fn member(&self, name: &str) -> Option<(&str, &Shape)> {
        let members = self.members()?;
        members
            .get_key_value(name)
            .or_else(|| {
                members
                    .iter()
                    .find(|(member, _)| member.eq_ignore_ascii_case(name))
            })
            .map(|(name, shape)| (name.as_str(), shape))
    }

    /// Renders the Go type of a field holding a value of this shape.
    pub fn go_type(&self) -> String {
        match &self.kind {
            ShapeKind::Scalar(kind) => kind.go_type().to_owned(),
            ShapeKind::Structure(_) => format!("*svcapitypes.{name}", name = self.name),
            ShapeKind::Sequence(element) => format!("[]{}", element.go_type()),
            ShapeKind::Mapping { key, value } => {
                format!("map[{}]{}", key.go_type_elem(), value.go_type())
            }
        }
    }

    /// Renders the Go type without its outermost pointer indirection.
    pub fn go_type_elem(&self) -> String {
        match &self.kind {
            ShapeKind::Structure(_) => self.name.clone(),
            _ => self.go_type().trim_start_matches('*').to_owned(),
        }
    }
}

fn kind_title(kind: ScalarKind) -> String {
    let mut name = kind.to_string();
    if let Some(first) = name.get_mut(0..1) {
        first.make_ascii_uppercase();
    }
    name
}

/// The serialized form of a [`Shape`].
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawShape {
    #[serde(rename = "type")]
    kind: String,

    #[serde(default)]
    name: Option<String>,

    #[serde(default)]
    members: IndexMap<String, RawShape>,

    #[serde(default)]
    member: Option<Box<RawShape>>,

    #[serde(default)]
    key: Option<Box<RawShape>>,

    #[serde(default)]
    value: Option<Box<RawShape>>,
}

impl TryFrom<RawShape> for Shape {
    type Error = Error;

    fn try_from(raw: RawShape) -> Result<Self> {
        let shape = match raw.kind.as_str() {
            "structure" => {
                let name = raw.name.context(MissingStructureNameSnafu)?;
                let members = raw
                    .members
                    .into_iter()
                    .map(|(name, member)| Ok((name, Self::try_from(member)?)))
                    .collect::<Result<Vec<_>>>()?;

                return Ok(Self::structure(name, members));
            }
            "list" => {
                let element = raw.member.with_context(|| MissingNestedShapeSnafu {
                    shape: raw.name.clone().unwrap_or_default(),
                    kind: "list",
                    part: "member",
                })?;

                Self::sequence(Self::try_from(*element)?)
            }
            "map" => {
                let shape = raw.name.clone().unwrap_or_default();
                let key = raw.key.with_context(|| MissingNestedShapeSnafu {
                    shape: shape.clone(),
                    kind: "map",
                    part: "key",
                })?;
                let value = raw.value.with_context(|| MissingNestedShapeSnafu {
                    shape: shape.clone(),
                    kind: "map",
                    part: "value",
                })?;

                let key = Self::try_from(*key)?;
                let key_kind = key.scalar_kind().with_context(|| UnsupportedKeyTypeSnafu {
                    shape,
                    key: key.kind_name(),
                })?;

                Self::mapping(key_kind, Self::try_from(*value)?)
            }
            other => {
                let kind = ScalarKind::from_str(other)
                    .context(UnsupportedShapeKindSnafu { kind: other })?;

                Self::scalar(kind)
            }
        };

        Ok(match raw.name {
            Some(name) => shape.with_name(name),
            None => shape,
        })
    }
}

#[cfg(test)]
mod tests {
    use indoc::indoc;
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case("string", ScalarKind::String)]
    #[case("character", ScalarKind::String)]
    #[case("long", ScalarKind::Integer)]
    #[case("Integer", ScalarKind::Integer)]
    #[case("double", ScalarKind::Float)]
    #[case("boolean", ScalarKind::Boolean)]
    #[case("timestamp", ScalarKind::Timestamp)]
    #[case("blob", ScalarKind::Blob)]
    fn scalar_kind_from_wire_name(#[case] input: &str, #[case] expected: ScalarKind) {
        assert_eq!(ScalarKind::from_str(input), Ok(expected));
    }

    #[test]
    fn deserialize_nested_shape() {
        let shape: Shape = serde_yaml::from_str(indoc! {"
            type: structure
            name: CreateBucketRequest
            members:
              Name:
                type: string
              Tags:
                type: list
                member:
                  type: structure
                  name: Tag
                  members:
                    Key: { type: string }
                    Value: { type: string }
              Variables:
                type: map
                key: { type: string }
                value: { type: string }
        "})
        .expect("valid shape");

        assert_eq!(shape.name(), "CreateBucketRequest");
        assert_eq!(shape.kind_name(), "structure");

        let (_, tags) = shape.member("tags").expect("tags member exists");
        assert_eq!(tags.name(), "TagList");
        assert_eq!(tags.go_type(), "[]*svcapitypes.Tag");

        let (name, variables) = shape.member("Variables").expect("variables member exists");
        assert_eq!(name, "Variables");
        assert_eq!(variables.go_type(), "map[string]*string");
    }

    #[rstest]
    #[case(
        "{ type: structure, members: {} }",
        "structure shapes must have a name"
    )]
    #[case("{ type: union }", "unsupported shape kind \"union\"")]
    #[case(
        "{ type: map, name: Bad, key: { type: structure, name: K }, value: { type: string } }",
        "unsupported key type \"structure\" for map shape \"Bad\", only string keys are supported"
    )]
    #[case(
        "{ type: list, name: Things }",
        "list shape \"Things\" is missing its \"member\" shape"
    )]
    fn invalid_shapes(#[case] input: &str, #[case] message: &str) {
        let err = serde_yaml::from_str::<Shape>(input).expect_err("invalid shape");
        assert!(
            err.to_string().starts_with(message),
            "{err} does not start with {message}"
        );
    }

    #[test]
    fn go_types() {
        let tag = Shape::structure(
            "Tag",
            [
                ("Key", Shape::scalar(ScalarKind::String)),
                ("Value", Shape::scalar(ScalarKind::String)),
            ],
        );

        assert_eq!(Shape::scalar(ScalarKind::Integer).go_type(), "*int64");
        assert_eq!(Shape::scalar(ScalarKind::Blob).go_type(), "[]byte");
        assert_eq!(tag.go_type_elem(), "Tag");
        assert_eq!(
            Shape::mapping(ScalarKind::String, Shape::sequence(tag)).go_type(),
            "map[string][]*svcapitypes.Tag"
        );
    }
}
