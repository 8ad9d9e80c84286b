use std::{collections::VecDeque, fmt::Display, str::FromStr};

use snafu::{Snafu, ensure};

const SEPARATOR: char = '.';

/// Error variants which can be encountered when parsing a [`FieldPath`] from
/// its dotted string form.
#[derive(Debug, PartialEq, Eq, Snafu)]
pub enum ParseFieldPathError {
    #[snafu(display("field path input cannot be empty"))]
    EmptyInput,

    #[snafu(display("field path segment at index {index} cannot be empty"))]
    EmptySegment { index: usize },
}

/// An ordered sequence of field names, like `Spec.JWTConfiguration.Issuer`.
///
/// The path supports pushing and popping at both ends. This makes it usable
/// as a traversal cursor (consume segments from the front while walking down
/// a shape tree) and as a report key (append segments while recursing).
#[derive(Clone, Debug, Default, Hash, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(try_from = "String", into = "String")
)]
pub struct FieldPath {
    parts: VecDeque<String>,
}

impl FromStr for FieldPath {
    type Err = ParseFieldPathError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        ensure!(!input.is_empty(), EmptyInputSnafu);

        let mut parts = VecDeque::new();
        for (index, part) in input.split(SEPARATOR).enumerate() {
            ensure!(!part.is_empty(), EmptySegmentSnafu { index });
            parts.push_back(part.to_owned());
        }

        Ok(Self { parts })
    }
}

impl TryFrom<String> for FieldPath {
    type Error = ParseFieldPathError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::from_str(&value)
    }
}

impl From<FieldPath> for String {
    fn from(value: FieldPath) -> Self {
        value.to_string()
    }
}

impl Display for FieldPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (index, part) in self.parts.iter().enumerate() {
            if index > 0 {
                write!(f, "{SEPARATOR}")?;
            }
            f.write_str(part)?;
        }

        Ok(())
    }
}

impl<S> FromIterator<S> for FieldPath
where
    S: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self {
            parts: iter.into_iter().map(Into::into).collect(),
        }
    }
}

impl FieldPath {
    /// Creates an empty path.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of segments. This is the authority for how many
    /// levels remain while the path is used as a traversal cursor.
    pub fn len(&self) -> usize {
        self.parts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    pub fn front(&self) -> Option<&str> {
        self.parts.front().map(String::as_str)
    }

    pub fn back(&self) -> Option<&str> {
        self.parts.back().map(String::as_str)
    }

    pub fn at(&self, index: usize) -> Option<&str> {
        self.parts.get(index).map(String::as_str)
    }

    pub fn push_front(&mut self, part: impl Into<String>) {
        self.parts.push_front(part.into());
    }

    pub fn push_back(&mut self, part: impl Into<String>) {
        self.parts.push_back(part.into());
    }

    pub fn pop_front(&mut self) -> Option<String> {
        self.parts.pop_front()
    }

    pub fn pop_back(&mut self) -> Option<String> {
        self.parts.pop_back()
    }

    /// Returns a new path containing the segments up to and including
    /// `index`, or [`None`] if the index is out of bounds.
    pub fn copy_at(&self, index: usize) -> Option<Self> {
        if index >= self.parts.len() {
            return None;
        }

        Some(self.parts.iter().take(index + 1).cloned().collect())
    }

    /// Returns a copy of this path with `part` appended.
    pub fn child(&self, part: impl Into<String>) -> Self {
        let mut child = self.clone();
        child.push_back(part);
        child
    }

    /// Returns a copy of this path without its last segment. The parent of
    /// an empty or single-segment path is the empty path.
    pub fn parent(&self) -> Self {
        let mut parent = self.clone();
        parent.pop_back();
        parent
    }

    /// Returns true if the dotted `subject` matches the leading segments of
    /// this path.
    pub fn has_prefix(&self, subject: &str) -> bool {
        self.has_prefix_by(subject, |a, b| a == b)
    }

    /// Same as [`FieldPath::has_prefix`], but segments are compared
    /// case-insensitively.
    pub fn has_prefix_fold(&self, subject: &str) -> bool {
        self.has_prefix_by(subject, str::eq_ignore_ascii_case)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.parts.iter().map(String::as_str)
    }

    fn has_prefix_by(&self, subject: &str, eq: impl Fn(&str, &str) -> bool) -> bool {
        let subject: Vec<_> = subject.split(SEPARATOR).collect();
        if subject.len() > self.parts.len() {
            return false;
        }

        subject
            .iter()
            .zip(self.parts.iter())
            .all(|(s, p)| eq(p, s))
    }
}
