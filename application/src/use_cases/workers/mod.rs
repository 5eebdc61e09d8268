//! Concrete workers
//!
//! Each one implements [`crate::ports::worker::Worker`] and is registered
//! under one of the well-known [`tripsync_domain::RouteKey`]s.

pub mod consensus_resolver;
pub mod destination_researcher;
pub mod itinerary_planner;
pub mod preference_aggregator;

pub use consensus_resolver::ConsensusResolver;
pub use destination_researcher::DestinationResearcher;
pub use itinerary_planner::ItineraryPlanner;
pub use preference_aggregator::PreferenceAggregator;
