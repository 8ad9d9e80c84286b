use std::path::PathBuf;

use crate::{
    config::GeneratorConfig,
    model::{DefaultNormalizer, Resource, ResourceDefinition},
};

fn fixture(kind: &str, service: &str) -> String {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("fixtures")
        .join(kind)
        .join(format!("{service}.yaml"));

    std::fs::read_to_string(&path)
        .unwrap_or_else(|err| panic!("failed to read fixture {path}: {err}", path = path.display()))
}

/// Loads the generator config of a service from `fixtures/config`.
pub(crate) fn config(service: &str) -> GeneratorConfig {
    GeneratorConfig::from_yaml(&fixture("config", service)).expect("fixture config must be valid")
}

/// Loads a resource definition of a service from `fixtures/models`.
pub(crate) fn definition(service: &str, name: &str) -> ResourceDefinition {
    let definitions: Vec<ResourceDefinition> =
        serde_yaml::from_str(&fixture("models", service)).expect("fixture model must be valid");

    definitions
        .into_iter()
        .find(|definition| definition.name == name)
        .unwrap_or_else(|| panic!("fixture model {service} has no resource {name}"))
}

/// Builds a resource from the fixture model and config of a service.
pub(crate) fn resource(service: &str, name: &str) -> Resource {
    Resource::new(definition(service, name), &config(service), &DefaultNormalizer)
        .expect("fixture resource must be valid")
}
