//! Application layer for tripsync
//!
//! This crate contains the ports, the retry combinator, and the use cases
//! that drive a trip from preferences to an approved itinerary: the
//! supervisor, the consensus engine, the run supervisor and the workers.
//! It depends only on the domain layer.

pub mod config;
pub mod ports;
pub mod retry;
pub mod use_cases;

// Re-export commonly used types
pub use config::{EngineConfig, ResearchParams};
pub use ports::{
    generation::{
        ActivityGenerator, GenerationError, ItineraryGenerator, ItineraryRequest, ResearchRequest,
    },
    notification::{
        CompositeNotifier, NoNotifications, NotificationSink, NotifyError, publish_best_effort,
    },
    repository::{CheckpointStore, NoCheckpoints, RepositoryError, TripRepository},
    routing::{EndRouting, RouteChoice, RoutingError, RoutingProposal, RoutingStrategy},
    sleeper::{Sleeper, TokioSleeper},
    tie_breaker::{RandomTieBreaker, TieBreaker},
    worker::{Worker, WorkerError},
};
pub use retry::{Backoff, RetryOutcome, RetryPolicy, with_retry};
pub use use_cases::consensus::{ConsensusEngine, ConsensusError, EngineOutcome};
pub use use_cases::lanes::TripLanes;
pub use use_cases::registry::{WorkerDescriptor, WorkerRegistry};
pub use use_cases::run_supervisor::{ActionOutcome, RunError, RunRegistry, RunSupervisor, RunTicket};
pub use use_cases::supervisor::{DecisionSource, RoutingDecision, Supervisor};
pub use use_cases::workers::{
    ConsensusResolver, DestinationResearcher, ItineraryPlanner, PreferenceAggregator,
};
