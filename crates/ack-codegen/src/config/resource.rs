use field_path::FieldPath;
use indexmap::IndexMap;
use serde::Deserialize;

use crate::config::FieldConfig;

const DEFAULT_TAG_PATH: &str = "Tags";
const DEFAULT_TAG_KEY_NAME: &str = "Key";
const DEFAULT_TAG_VALUE_NAME: &str = "Value";

/// Generator settings of a single resource.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ResourceConfig {
    /// Field overrides keyed by dotted field path, like
    /// `CreateBucketConfiguration.LocationConstraint`.
    #[serde(default)]
    pub fields: IndexMap<String, FieldConfig>,

    #[serde(default)]
    pub compare: CompareConfig,

    #[serde(default)]
    pub synced: SyncedConfig,

    #[serde(default)]
    pub tags: TagConfig,

    #[serde(default)]
    pub renames: RenamesConfig,
}

impl ResourceConfig {
    pub fn field(&self, path: &FieldPath) -> Option<&FieldConfig> {
        let path = path.to_string();
        self.fields.get(&path).or_else(|| {
            self.fields
                .iter()
                .find(|(name, _)| name.eq_ignore_ascii_case(&path))
                .map(|(_, config)| config)
        })
    }

    /// Returns true if the field is excluded from comparisons, either by its
    /// own field config or by the resource-wide ignore list.
    pub fn is_compare_ignored(&self, path: &FieldPath) -> bool {
        if self.field(path).is_some_and(FieldConfig::is_compare_ignored) {
            return true;
        }

        let path = path.to_string();
        self.compare.ignore.iter().any(|ignored| {
            let ignored = ignored.strip_prefix("Spec.").unwrap_or(ignored);
            ignored == path
        })
    }

    /// All field renames of all operations, input and output alike.
    pub fn field_renames(&self) -> impl Iterator<Item = (&str, &str)> {
        self.renames.operations.values().flat_map(|renames| {
            renames
                .input_fields
                .iter()
                .chain(renames.output_fields.iter())
                .map(|(from, to)| (from.as_str(), to.as_str()))
        })
    }

    /// Input field renames of a single operation.
    pub fn input_renames(&self, operation: &str) -> Option<&IndexMap<String, String>> {
        self.renames
            .operations
            .get(operation)
            .map(|renames| &renames.input_fields)
    }
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct CompareConfig {
    /// Field paths, optionally prefixed with `Spec.`, excluded from
    /// comparisons.
    #[serde(default)]
    pub ignore: Vec<String>,
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct SyncedConfig {
    /// Conditions which must all hold for the resource to be synced.
    #[serde(default)]
    pub when: Vec<SyncedCondition>,
}

/// A field path and the values it must hold for the resource to be synced.
///
/// Both parts are optional here so that an incomplete condition is reported
/// at generation time with the condition's position.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct SyncedCondition {
    #[serde(default)]
    pub path: Option<String>,

    #[serde(default, rename = "in")]
    pub values: Option<Vec<serde_yaml::Value>>,
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct TagConfig {
    /// The resource has no tags, or they are handled elsewhere.
    #[serde(default)]
    pub ignore: bool,

    #[serde(default)]
    pub path: Option<String>,

    #[serde(default)]
    pub key_name: Option<String>,

    #[serde(default)]
    pub value_name: Option<String>,
}

impl TagConfig {
    pub fn path(&self) -> &str {
        self.path.as_deref().unwrap_or(DEFAULT_TAG_PATH)
    }

    pub fn key_name(&self) -> &str {
        self.key_name.as_deref().unwrap_or(DEFAULT_TAG_KEY_NAME)
    }

    pub fn value_name(&self) -> &str {
        self.value_name.as_deref().unwrap_or(DEFAULT_TAG_VALUE_NAME)
    }
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct RenamesConfig {
    #[serde(default)]
    pub operations: IndexMap<String, OperationRenames>,
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct OperationRenames {
    #[serde(default)]
    pub input_fields: IndexMap<String, String>,

    #[serde(default)]
    pub output_fields: IndexMap<String, String>,
}
