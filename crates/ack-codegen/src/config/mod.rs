//! Generator configuration, loaded from the `generator.yaml` of a service.
//!
//! ```yaml
//! resources:
//!   Bucket:
//!     fields:
//!       ACL:
//!         compare:
//!           is_ignored: true
//!     synced:
//!       when:
//!         - path: Status.State
//!           in: [AVAILABLE, ACTIVE]
//! ```

use std::{
    collections::BTreeSet,
    path::{Path, PathBuf},
};

use indexmap::IndexMap;
use itertools::Itertools;
use serde::Deserialize;
use snafu::{ResultExt, Snafu};
use tracing::{debug, instrument};

mod field;
mod resource;

pub use field::*;
pub use resource::*;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Maximum number of known operations listed in a validation error.
const MAX_LISTED_OPERATIONS: usize = 10;

#[derive(Debug, Snafu)]
pub enum Error {
    #[snafu(display("failed to read generator config from {path:?}"))]
    ReadFile {
        source: std::io::Error,
        path: PathBuf,
    },

    #[snafu(display("failed to parse generator config"))]
    ParseYaml { source: serde_yaml::Error },

    #[snafu(display(
        "resources.{resource}.renames.operations.{operation}: operation not found in model, available: {available}"
    ))]
    UnknownRenameOperation {
        resource: String,
        operation: String,
        available: String,
    },
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct GeneratorConfig {
    /// Settings per resource, keyed by the resource's original name.
    #[serde(default)]
    pub resources: IndexMap<String, ResourceConfig>,
}

impl GeneratorConfig {
    pub fn from_yaml(input: &str) -> Result<Self> {
        serde_yaml::from_str(input).context(ParseYamlSnafu)
    }

    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let input = std::fs::read_to_string(path).context(ReadFileSnafu { path })?;

        let config = Self::from_yaml(&input)?;
        debug!(resources = config.resources.len(), "loaded generator config");

        Ok(config)
    }

    pub fn resource(&self, name: &str) -> Option<&ResourceConfig> {
        self.resources.get(name)
    }

    /// Checks that every operation named in a rename is known to the model.
    /// All offending renames are reported, not just the first one.
    pub fn validate_operations<'a>(
        &self,
        known_operations: impl IntoIterator<Item = &'a str>,
    ) -> Vec<Error> {
        let known: BTreeSet<_> = known_operations.into_iter().collect();

        let available = if known.len() <= MAX_LISTED_OPERATIONS {
            known.iter().join(", ")
        } else {
            format!(
                "{}, ... ({} total)",
                known.iter().take(MAX_LISTED_OPERATIONS).join(", "),
                known.len()
            )
        };

        let known = &known;
        let available = &available;

        self.resources
            .iter()
            .sorted_by(|(a, _), (b, _)| a.cmp(b))
            .flat_map(|(resource, config)| {
                config
                    .renames
                    .operations
                    .keys()
                    .filter(move |operation| !known.contains(operation.as_str()))
                    .map(move |operation| Error::UnknownRenameOperation {
                        resource: resource.clone(),
                        operation: operation.clone(),
                        available: available.clone(),
                    })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use indoc::indoc;

    use super::*;

    const CONFIG: &str = indoc! {"
        resources:
          Bucket:
            fields:
              ACL:
                compare:
                  is_ignored: true
            compare:
              ignore:
                - Spec.GrantRead
            tags:
              key_name: TagKey
          SecurityGroup:
            renames:
              operations:
                CreateSecurityGroup:
                  input_fields:
                    GroupName: Name
                DescribeSecurityGroupz:
                  input_fields:
                    GroupIds: Ids
    "};

    #[test]
    fn parse_config() {
        let config = GeneratorConfig::from_yaml(CONFIG).expect("valid generator config");
        let bucket = config.resource("Bucket").expect("bucket config exists");

        let acl = "ACL".parse().expect("valid field path");
        let grant_read = "GrantRead".parse().expect("valid field path");
        let name = "Name".parse().expect("valid field path");

        assert!(bucket.is_compare_ignored(&acl));
        assert!(bucket.is_compare_ignored(&grant_read));
        assert!(!bucket.is_compare_ignored(&name));

        assert_eq!(bucket.tags.path(), "Tags");
        assert_eq!(bucket.tags.key_name(), "TagKey");
        assert_eq!(bucket.tags.value_name(), "Value");
    }

    #[test]
    fn reject_unknown_keys() {
        let err = GeneratorConfig::from_yaml("resources: { Bucket: { fieldz: {} } }")
            .expect_err("unknown key is rejected");
        assert!(matches!(err, Error::ParseYaml { .. }));
    }

    #[test]
    fn validate_rename_operations() {
        let config = GeneratorConfig::from_yaml(CONFIG).expect("valid generator config");
        let errors =
            config.validate_operations(["CreateSecurityGroup", "DescribeSecurityGroups"]);

        assert_eq!(errors.len(), 1);
        assert_eq!(
            errors[0].to_string(),
            "resources.SecurityGroup.renames.operations.DescribeSecurityGroupz: operation not found in model, available: CreateSecurityGroup, DescribeSecurityGroups"
        );
    }

    #[test]
    fn load_from_file() {
        let mut file = tempfile::NamedTempFile::new().expect("temporary file can be created");
        file.write_all(CONFIG.as_bytes())
            .expect("temporary file can be written");

        let config = GeneratorConfig::from_file(file.path()).expect("valid generator config");
        assert_eq!(config.resources.len(), 2);

        let err = GeneratorConfig::from_file("/this/path/does/not/exist.yaml")
            .expect_err("missing file is reported");
        assert!(matches!(err, Error::ReadFile { .. }));
    }
}
