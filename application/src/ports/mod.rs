//! Port definitions (interfaces for external adapters)
//!
//! Ports define the contracts that infrastructure adapters must implement.

pub mod generation;
pub mod notification;
pub mod repository;
pub mod routing;
pub mod sleeper;
pub mod tie_breaker;
pub mod worker;
