use field_path::FieldPath;

/// A single difference between two resource instances.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Difference<T> {
    pub path: FieldPath,
    pub a: T,
    pub b: T,
}

/// Ordered, append-only collection of [`Difference`]s.
///
/// Records are neither deduplicated nor reordered, so iteration follows the
/// order in which generated code visited the fields.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Delta<T> {
    differences: Vec<Difference<T>>,
}

impl<T> Default for Delta<T> {
    fn default() -> Self {
        Self {
            differences: Vec::new(),
        }
    }
}

impl<T> Delta<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, path: FieldPath, a: T, b: T) {
        self.differences.push(Difference { path, a, b });
    }

    pub fn differences(&self) -> &[Difference<T>] {
        &self.differences
    }

    pub fn is_empty(&self) -> bool {
        self.differences.is_empty()
    }

    pub fn len(&self) -> usize {
        self.differences.len()
    }

    /// Returns true if any difference was recorded at or below the dotted
    /// `subject` path.
    pub fn different_at(&self, subject: &str) -> bool {
        self.differences
            .iter()
            .any(|difference| difference.path.has_prefix(subject))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn path(input: &str) -> FieldPath {
        input.parse().expect("valid field path")
    }

    #[test]
    fn keeps_emission_order_and_duplicates() {
        let mut delta = Delta::new();
        delta.add(path("Spec.Name"), "a", "b");
        delta.add(path("Spec.CreateBucketConfiguration"), "x", "y");
        delta.add(path("Spec.Name"), "a", "c");

        let paths: Vec<_> = delta
            .differences()
            .iter()
            .map(|difference| difference.path.to_string())
            .collect();

        assert_eq!(paths, [
            "Spec.Name",
            "Spec.CreateBucketConfiguration",
            "Spec.Name"
        ]);
        assert_eq!(delta.len(), 3);
    }

    #[test]
    fn different_at_matches_prefixes() {
        let mut delta = Delta::new();
        assert!(delta.is_empty());
        assert!(!delta.different_at("Spec"));

        delta.add(path("Spec.CreateBucketConfiguration.LocationConstraint"), 1, 2);

        assert!(delta.different_at("Spec.CreateBucketConfiguration"));
        assert!(delta.different_at("Spec.CreateBucketConfiguration.LocationConstraint"));
        assert!(!delta.different_at("Spec.Name"));
    }
}
