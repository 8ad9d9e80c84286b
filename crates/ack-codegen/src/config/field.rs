use serde::Deserialize;

/// Per-field overrides, keyed by the field's dotted path in
/// [`ResourceConfig::fields`](super::ResourceConfig::fields).
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct FieldConfig {
    /// Marks the field as the primary identifier of the resource. Takes
    /// precedence over the identifier candidates derived from field names.
    #[serde(default)]
    pub is_primary_key: bool,

    /// Requires either the field or its reference field to be set.
    #[serde(default)]
    pub is_required: bool,

    #[serde(default)]
    pub compare: Option<CompareFieldConfig>,

    /// Resolves the field's value from another resource.
    #[serde(default)]
    pub references: Option<ReferencesConfig>,
}

impl FieldConfig {
    pub fn is_compare_ignored(&self) -> bool {
        self.compare.as_ref().is_some_and(|compare| compare.is_ignored)
    }
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct CompareFieldConfig {
    /// Excludes the field from generated difference and equality code.
    #[serde(default)]
    pub is_ignored: bool,
}

/// Links a field to another resource whose observed state provides the
/// field's value.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ReferencesConfig {
    /// Kind of the referenced resource, like `API` or `SecurityGroup`.
    pub resource: String,

    /// Service of the referenced resource, if it belongs to another
    /// controller.
    #[serde(default)]
    pub service_name: Option<String>,

    /// Path inside the referenced resource holding the resolved value, like
    /// `Status.APIID` or `Status.ACKResourceMetadata.ARN`.
    pub path: String,

    /// Skips the check that the referenced resource is synced.
    #[serde(default)]
    pub skip_resource_state_validations: bool,
}

impl ReferencesConfig {
    /// The Go package alias holding the referenced resource's API types.
    pub fn api_types_package(&self) -> String {
        match &self.service_name {
            Some(service) => format!("{}apitypes", service.to_ascii_lowercase().replace('-', "")),
            None => "svcapitypes".to_owned(),
        }
    }
}
