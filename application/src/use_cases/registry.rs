//! Worker registry
//!
//! A fixed table from routing key to worker, built once at startup and shared
//! read-only. Adding a worker means registering another descriptor; the
//! supervisor does not change.

use crate::ports::routing::RouteChoice;
use crate::ports::worker::Worker;
use std::sync::Arc;
use tripsync_domain::RouteKey;

/// A registered worker and what it does
#[derive(Clone)]
pub struct WorkerDescriptor {
    pub key: RouteKey,
    pub worker: Arc<dyn Worker>,
    /// One line, shown in routing rationale
    pub description: String,
}

impl std::fmt::Debug for WorkerDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerDescriptor")
            .field("key", &self.key)
            .field("description", &self.description)
            .finish()
    }
}

#[derive(Debug, Clone, Default)]
pub struct WorkerRegistry {
    entries: Vec<WorkerDescriptor>,
}

impl WorkerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a worker. A later registration under the same key replaces
    /// the earlier one.
    pub fn register(
        mut self,
        key: RouteKey,
        worker: Arc<dyn Worker>,
        description: impl Into<String>,
    ) -> Self {
        let descriptor = WorkerDescriptor {
            key,
            worker,
            description: description.into(),
        };
        match self.entries.iter_mut().find(|d| d.key == descriptor.key) {
            Some(existing) => *existing = descriptor,
            None => self.entries.push(descriptor),
        }
        self
    }

    pub fn get(&self, key: &RouteKey) -> Option<&WorkerDescriptor> {
        self.entries.iter().find(|d| &d.key == key)
    }

    /// Look up a raw key as proposed by an assistive router
    pub fn resolve(&self, raw: &str) -> Option<&WorkerDescriptor> {
        let raw = raw.trim();
        self.entries.iter().find(|d| d.key.as_str() == raw)
    }

    pub fn contains(&self, key: &RouteKey) -> bool {
        self.get(key).is_some()
    }

    pub fn keys(&self) -> impl Iterator<Item = &RouteKey> {
        self.entries.iter().map(|d| &d.key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Registry block offered to an assistive router
    pub fn choices(&self) -> Vec<RouteChoice> {
        self.entries
            .iter()
            .map(|d| RouteChoice {
                key: d.key.to_string(),
                description: d.description.clone(),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::worker::WorkerError;
    use async_trait::async_trait;
    use tripsync_domain::{StateUpdate, WorkflowState};

    struct Named(&'static str);

    #[async_trait]
    impl Worker for Named {
        fn name(&self) -> &str {
            self.0
        }

        async fn invoke(&self, _state: &WorkflowState) -> Result<StateUpdate, WorkerError> {
            Ok(StateUpdate::new())
        }
    }

    #[test]
    fn test_register_and_lookup() {
        let registry = WorkerRegistry::new()
            .register(RouteKey::PREFERENCE_PROCESSOR, Arc::new(Named("p")), "aggregates")
            .register(RouteKey::ITINERARY_PLANNER, Arc::new(Named("i")), "plans days");

        assert_eq!(registry.len(), 2);
        assert!(registry.contains(&RouteKey::ITINERARY_PLANNER));
        assert!(registry.resolve(" preference_processor ").is_some());
        assert!(registry.resolve("weather_oracle").is_none());
        assert_eq!(registry.choices()[1].description, "plans days");
    }

    #[test]
    fn test_reregistration_replaces() {
        let registry = WorkerRegistry::new()
            .register(RouteKey::ITINERARY_PLANNER, Arc::new(Named("old")), "old")
            .register(RouteKey::ITINERARY_PLANNER, Arc::new(Named("new")), "new");
        assert_eq!(registry.len(), 1);
        let d = registry.get(&RouteKey::ITINERARY_PLANNER).unwrap();
        assert_eq!(d.worker.name(), "new");
    }
}
