//! The shape model of a resource: an immutable tree of field shapes joined
//! with the resource's generator configuration.

mod names;
mod resource;
mod shape;

pub use names::*;
pub use resource::*;
pub use shape::{Error as ShapeError, ScalarKind, Shape, ShapeKind};
