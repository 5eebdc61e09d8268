//! Use cases
//!
//! Application-level operations that orchestrate domain logic.

pub mod consensus;
pub mod lanes;
pub mod registry;
pub mod run_supervisor;
pub mod supervisor;
pub mod workers;

#[cfg(test)]
pub(crate) mod testing;
