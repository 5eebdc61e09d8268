//! Consensus domain
//!
//! Four ordered phases resolve group disagreements:
//!
//! 1. **Destination decision**: the most requested destination, or a vote
//!    among the tied leaders
//! 2. **Date selection**: the range that overlaps every member's
//!    availability, or a vote when several do
//! 3. **Activity voting**: gated on readiness, then scored selection
//! 4. **Itinerary approval**: gated on readiness
//!
//! Phases move forward only and are never revisited once completed.

pub mod activity;
pub mod phase;
pub mod tracking;
pub mod vote;

pub use activity::{ActivityBallot, SelectedActivity, SelectionCaps, Stance, select_activities};
pub use phase::{BlockReason, Phase, PhaseData, PhaseStatus};
pub use tracking::{Activation, FairnessLedger, FairnessRecord, PhaseTracking};
pub use vote::{VoteOption, leading_options};
