//! Offline content generators
//!
//! Deterministic stand-ins for the external research and itinerary
//! services. Same input, same output.

mod heuristic;

pub use heuristic::{HeuristicActivityGenerator, HeuristicItineraryGenerator};
