//! This library provides [`FieldPath`], an ordered list of field names which
//! locates a value inside a resource's field tree, independent of the syntax
//! used to access it.
//!
//! ## Usage
//!
//! Paths can be parsed from their dotted form using Rust's standard
//! [`FromStr`](std::str::FromStr) trait.
//!
//! ```
//! use field_path::FieldPath;
//!
//! let mut path: FieldPath = "Spec.JWTConfiguration.Issuer"
//!     .parse()
//!     .expect("valid field path");
//!
//! assert_eq!(path.pop_front().as_deref(), Some("Spec"));
//! assert_eq!(path.to_string(), "JWTConfiguration.Issuer");
//! ```
//!
//! Alternatively, they can be built up segment by segment.
//!
//! ```
//! use field_path::FieldPath;
//!
//! let path = FieldPath::new().child("CreateBucketConfiguration").child("LocationConstraint");
//! assert_eq!(path.len(), 2);
//! assert!(path.has_prefix("CreateBucketConfiguration"));
//! ```

mod path;

pub use path::*;
