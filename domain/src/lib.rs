//! Domain layer for tripsync
//!
//! This crate contains the core planning rules, entities, and value objects.
//! It has no dependencies on infrastructure or presentation concerns.
//!
//! # Core Concepts
//!
//! ## Trip
//!
//! A group planning session. Members submit preferences and availability;
//! the trip moves through four consensus phases.
//!
//! ## Consensus
//!
//! - **Voting phases** (destination, dates): a unique leader wins outright,
//!   ties go to a member vote
//! - **Readiness phases** (activities, itinerary): advance once every member
//!   has marked ready
//!
//! ## Workflow
//!
//! The [`WorkflowState`] threaded through one orchestration run, and the
//! [`StateUpdate`] each worker returns.

pub mod config;
pub mod consensus;
pub mod core;
pub mod event;
pub mod run;
pub mod trip;
pub mod workflow;

// Re-export commonly used types
pub use config::OutputFormat;
pub use consensus::{
    Activation, ActivityBallot, BlockReason, FairnessLedger, FairnessRecord, Phase, PhaseData,
    PhaseStatus, PhaseTracking, SelectedActivity, SelectionCaps, Stance, VoteOption,
    leading_options, select_activities,
};
pub use core::error::DomainError;
pub use event::{AgentActivity, AnnouncementLevel, OptionTally, TripEvent};
pub use run::RunStatus;
pub use trip::{
    DateRange, DestinationCount, Preference, PreferencesSummary, Trip, TripId, TripStatus,
    VibeWeight, common_windows, destination_for_vibe, has_any_availability,
};
pub use workflow::{
    Activity, ActivityCatalog, AgentData, AgentDataPatch, AuditEntry, DayPlan, Itinerary,
    ItineraryItem, NextTask, Patch, RouteKey, StateUpdate, TimeSlot, WorkflowState,
};
