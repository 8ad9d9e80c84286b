//! Executable counterparts of the contracts generated code relies on.
//!
//! Generated difference code records into a [`Delta`], generated tag code
//! converts between a resource's tag field and [`CanonicalTags`]. Both are
//! implemented here so their documented behavior can be exercised directly.

mod delta;
mod tags;

pub use delta::*;
pub use tags::*;
