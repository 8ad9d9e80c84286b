use indexmap::IndexMap;

/// A tag in a list-of-pairs representation. Either part may be absent.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TagPair {
    pub key: Option<String>,
    pub value: Option<String>,
}

impl TagPair {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: Some(key.into()),
            value: Some(value.into()),
        }
    }
}

/// Key/value projection of a resource's tags, used to compare tag fields
/// regardless of how a resource represents them.
///
/// Equality ignores insertion order. Converting from a list of pairs also
/// returns the original key order, which can be replayed when converting
/// back so that unchanged tags keep their position.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CanonicalTags {
    tags: IndexMap<String, String>,
}

impl CanonicalTags {
    pub fn new() -> Self {
        Self::default()
    }

    /// Projects a list of pairs. Pairs without a key are skipped, absent
    /// values become empty strings. Returns the keys in their original
    /// order alongside the mapping.
    pub fn from_pairs<'a>(pairs: impl IntoIterator<Item = &'a TagPair>) -> (Self, Vec<String>) {
        let mut tags = Self::new();
        let mut order = Vec::new();

        for pair in pairs {
            let Some(key) = &pair.key else {
                continue;
            };

            order.push(key.clone());
            tags.insert(key.clone(), pair.value.clone().unwrap_or_default());
        }

        (tags, order)
    }

    /// Projects a native mapping. Absent values become empty strings.
    pub fn from_map<'a>(map: impl IntoIterator<Item = (&'a String, &'a Option<String>)>) -> Self {
        let mut tags = Self::new();
        for (key, value) in map {
            tags.insert(key.clone(), value.clone().unwrap_or_default());
        }

        tags
    }

    /// Converts back into a list of pairs.
    ///
    /// Keys listed in `order` come first, in that order, if they are still
    /// present. All remaining keys follow in insertion order.
    pub fn into_pairs(mut self, order: &[String]) -> Vec<TagPair> {
        let mut pairs = Vec::with_capacity(self.tags.len());

        for key in order {
            if let Some(value) = self.tags.shift_remove(key) {
                pairs.push(TagPair::new(key.clone(), value));
            }
        }

        pairs.extend(
            self.tags
                .into_iter()
                .map(|(key, value)| TagPair::new(key, value)),
        );

        pairs
    }

    /// Converts back into a native mapping. Order is irrelevant for
    /// mappings, so none is taken.
    pub fn into_map(self) -> IndexMap<String, Option<String>> {
        self.tags
            .into_iter()
            .map(|(key, value)| (key, Some(value)))
            .collect()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) -> Option<String> {
        self.tags.insert(key.into(), value.into())
    }

    pub fn remove(&mut self, key: &str) -> Option<String> {
        self.tags.shift_remove(key)
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.tags.get(key).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.tags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }

    /// Returns true if both hold the same keys with the same values,
    /// regardless of the order they were inserted in.
    pub fn equals_ignoring_order(&self, other: &Self) -> bool {
        self.tags.len() == other.tags.len()
            && self
                .tags
                .iter()
                .all(|(key, value)| other.get(key) == Some(value.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pairs() -> Vec<TagPair> {
        vec![TagPair::new("K1", "V1"), TagPair::new("K2", "V2")]
    }

    #[test]
    fn round_trip_keeps_order() {
        let (tags, order) = CanonicalTags::from_pairs(&pairs());
        assert_eq!(order, ["K1", "K2"]);
        assert_eq!(tags.into_pairs(&order), pairs());
    }

    #[test]
    fn added_keys_follow_original_keys() {
        let (mut tags, order) = CanonicalTags::from_pairs(&pairs());
        tags.insert("K3", "V3");

        assert_eq!(tags.into_pairs(&order), [
            TagPair::new("K1", "V1"),
            TagPair::new("K2", "V2"),
            TagPair::new("K3", "V3"),
        ]);
    }

    #[test]
    fn removed_keys_are_not_replayed() {
        let (mut tags, order) = CanonicalTags::from_pairs(&pairs());
        tags.remove("K1");

        assert_eq!(tags.into_pairs(&order), [TagPair::new("K2", "V2")]);
    }

    #[test]
    fn pairs_without_key_are_skipped() {
        let input = [
            TagPair {
                key: None,
                value: Some("orphan".to_owned()),
            },
            TagPair {
                key: Some("K1".to_owned()),
                value: None,
            },
        ];

        let (tags, order) = CanonicalTags::from_pairs(&input);
        assert_eq!(order, ["K1"]);
        assert_eq!(tags.get("K1"), Some(""));
        assert_eq!(tags.len(), 1);
    }

    #[test]
    fn map_and_pairs_compare_ignoring_order() {
        let map: IndexMap<String, Option<String>> = [
            ("K2".to_owned(), Some("V2".to_owned())),
            ("K1".to_owned(), Some("V1".to_owned())),
        ]
        .into_iter()
        .collect();

        let (from_pairs, _) = CanonicalTags::from_pairs(&pairs());
        let from_map = CanonicalTags::from_map(&map);

        assert!(from_pairs.equals_ignoring_order(&from_map));
        assert_eq!(from_pairs, from_map);
        assert_eq!(from_map.into_map(), map);
    }

    #[test]
    fn differing_values_are_not_equal() {
        let (tags, _) = CanonicalTags::from_pairs(&pairs());
        let mut changed = tags.clone();
        changed.insert("K2", "other");

        assert!(!tags.equals_ignoring_order(&changed));

        changed.remove("K2");
        assert!(!tags.equals_ignoring_order(&changed));
        assert!(!changed.equals_ignoring_order(&tags));
    }
}
