use std::collections::VecDeque;

use indexmap::IndexSet;
use tracing::debug;

use crate::model::Shape;

/// Tracks the comparison helpers requested during one generation call.
///
/// Shapes are identified by name. The first request for a shape queues its
/// helper for emission, later requests only return the helper name. Create a
/// fresh cache for every top-level call: a cache carried over from another
/// resource would suppress helpers this resource still needs.
#[derive(Debug, Default)]
pub struct HelperCache {
    requested: IndexSet<String>,
    pending: VecDeque<Shape>,
}

impl HelperCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the name of the helper comparing values of `shape`, queueing
    /// the helper if it was not requested before.
    pub fn request(&mut self, shape: &Shape) -> String {
        if self.requested.insert(shape.name().to_owned()) {
            self.pending.push_back(shape.clone());
        } else {
            debug!(shape = shape.name(), "reusing equality helper");
        }

        helper_name(shape)
    }

    /// Takes the next helper whose body still has to be emitted.
    pub fn next_pending(&mut self) -> Option<Shape> {
        self.pending.pop_front()
    }

    /// Number of distinct helpers requested so far.
    pub fn len(&self) -> usize {
        self.requested.len()
    }

    pub fn is_empty(&self) -> bool {
        self.requested.is_empty()
    }

    pub fn contains(&self, shape_name: &str) -> bool {
        self.requested.contains(shape_name)
    }
}

/// Name of the helper function comparing two values of `shape`.
pub fn helper_name(shape: &Shape) -> String {
    format!("equal{}", shape.name())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ScalarKind;

    #[test]
    fn request_queues_each_shape_once() {
        let route = Shape::structure("Route", [("Target", Shape::scalar(ScalarKind::String))]);
        let routes = Shape::sequence(route.clone());

        let mut cache = HelperCache::new();
        assert_eq!(cache.request(&route), "equalRoute");
        assert_eq!(cache.request(&routes), "equalRouteList");
        assert_eq!(cache.request(&route), "equalRoute");

        assert_eq!(cache.len(), 2);
        assert!(cache.contains("Route"));

        assert_eq!(cache.next_pending(), Some(route));
        assert_eq!(cache.next_pending(), Some(routes));
        assert_eq!(cache.next_pending(), None);
    }
}
