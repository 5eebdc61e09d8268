//! Application-level configuration.
//!
//! Plain structs with [`Duration`](std::time::Duration)s. The infrastructure
//! layer converts file configuration into these; use cases never see TOML.

mod engine_params;

pub use engine_params::{EngineConfig, ResearchParams};
