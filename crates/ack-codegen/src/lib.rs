//! Schema-directed synthesis of reconciliation-support code for Kubernetes
//! controllers that manage cloud resources.
//!
//! The crate takes a resource's field schema (the [`model`]) together with
//! its generator [`config`] and emits Go source snippets for:
//!
//! - structural difference detection ([`codegen::delta`]),
//! - deep equality with deduplicated helpers ([`codegen::equal`]),
//! - tag representation normalization ([`codegen::tags`]),
//! - synchronization-state predicates ([`codegen::synced`]),
//! - cross-resource reference resolution ([`codegen::references`]),
//! - and identifier discovery ([`codegen::identifiers`]).
//!
//! The [`runtime`] module holds executable counterparts of the contracts the
//! generated code relies on, namely the difference collector and the
//! canonical tag mapping.
//!
//! ## Usage
//!
//! ```
//! use ack_codegen::{
//!     codegen::delta,
//!     config::GeneratorConfig,
//!     model::{DefaultNormalizer, Resource, ResourceDefinition},
//! };
//!
//! let definition = ResourceDefinition::from_yaml(
//!     "
//! name: Bucket
//! spec:
//!   type: structure
//!   name: BucketSpec
//!   members:
//!     Name:
//!       type: string
//! ",
//! )
//! .expect("valid resource definition");
//!
//! let config = GeneratorConfig::default();
//! let resource = Resource::new(definition, &config, &DefaultNormalizer)
//!     .expect("valid resource");
//!
//! let code = delta::compare_resource(&resource, &DefaultNormalizer, "a.ko", "b.ko", 1)
//!     .expect("delta code generates");
//! assert!(code.contains(r#"delta.Add("Spec.Name", a.ko.Spec.Name, b.ko.Spec.Name)"#));
//! ```

// NOTE: rstest_reuse templates are resolved through the crate root.
#[cfg(test)]
use rstest_reuse::{self};

pub mod codegen;
pub mod config;
pub mod model;
pub mod runtime;

#[cfg(test)]
mod test_utils;
