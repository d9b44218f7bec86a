//! Test data builders for wiring stages

use super::collect;
use dataflow_rs::pipeline::{conduit, RoutedOutput};
use dataflow_rs::{Transform, Value};
use std::thread::JoinHandle;

/// Builds partition routes, each drained by its own collector thread.
pub struct RoutesBuilder {
    routes: Vec<RoutedOutput>,
    collectors: Vec<JoinHandle<Vec<Value>>>,
}

impl RoutesBuilder {
    pub fn new() -> Self {
        Self {
            routes: Vec::new(),
            collectors: Vec::new(),
        }
    }

    pub fn route(mut self, name: &str, predicate: Transform) -> Self {
        let (tx, rx) = conduit(name);
        self.routes.push(RoutedOutput::new(predicate, tx));
        self.collectors.push(collect(rx));
        self
    }

    /// The routes to hand to a split stage, and the handles that yield what
    /// each route received.
    pub fn build(self) -> (Vec<RoutedOutput>, Vec<JoinHandle<Vec<Value>>>) {
        (self.routes, self.collectors)
    }
}

impl Default for RoutesBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dataflow_rs::pipeline::filters;

    #[test]
    fn test_routes_builder() {
        let (routes, collectors) = RoutesBuilder::new()
            .route("a", filters::always())
            .route("b", filters::if_positive())
            .build();

        assert_eq!(routes.len(), 2);
        assert_eq!(routes[1].destination.name(), "b");
        drop(routes);
        for c in collectors {
            assert!(c.join().unwrap().is_empty());
        }
    }
}
