//! Workflow domain
//!
//! The [`WorkflowState`] is threaded through one planning run. Workers read
//! it and return a [`StateUpdate`], which is merged field by field.

pub mod payloads;
pub mod route;
pub mod state;
pub mod update;

pub use payloads::{Activity, ActivityCatalog, DayPlan, Itinerary, ItineraryItem, TimeSlot};
pub use route::{NextTask, RouteKey};
pub use state::{AgentData, AuditEntry, WorkflowState};
pub use update::{AgentDataPatch, Patch, StateUpdate};
