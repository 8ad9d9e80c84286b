use std::sync::LazyLock;

use regex::Regex;

static LEADING_UPPER_RUN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<run>[A-Z]+)(?P<rest>.*)$").expect("failed to compile leading upper-case run regex")
});

/// The different spellings of a single member name.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct Names {
    /// The name as it appears in the wire-format schema.
    pub original: String,

    /// The exported identifier, like `CreateBucketConfiguration`.
    pub camel: String,

    /// The unexported identifier, like `createBucketConfiguration`. Used for
    /// local variable names in generated code.
    pub camel_lower: String,
}

/// Maps wire-format member names to identifiers used in emitted code.
pub trait NameNormalizer {
    fn names(&self, original: &str) -> Names;
}

/// Normalizes names by upper-casing their first character and leaves
/// everything else untouched.
#[derive(Clone, Copy, Debug, Default)]
pub struct DefaultNormalizer;

impl NameNormalizer for DefaultNormalizer {
    fn names(&self, original: &str) -> Names {
        let mut camel = original.to_owned();
        if let Some(first) = camel.get_mut(0..1) {
            first.make_ascii_uppercase();
        }

        Names {
            original: original.to_owned(),
            camel_lower: lower_leading_run(&camel),
            camel,
        }
    }
}

/// Lower-cases the leading run of upper-case letters. If the run is followed
/// by a lower-case letter, the last letter of the run starts the next word and
/// stays upper-case: `VPCConfig` becomes `vpcConfig`.
fn lower_leading_run(camel: &str) -> String {
    let Some(captures) = LEADING_UPPER_RUN.captures(camel) else {
        return camel.to_owned();
    };

    let run = &captures["run"];
    let rest = &captures["rest"];

    let starts_word = rest.starts_with(|c: char| c.is_ascii_lowercase());
    if starts_word && run.len() > 1 {
        let (head, last) = run.split_at(run.len() - 1);
        format!("{}{last}{rest}", head.to_ascii_lowercase())
    } else {
        format!("{}{rest}", run.to_ascii_lowercase())
    }
}
