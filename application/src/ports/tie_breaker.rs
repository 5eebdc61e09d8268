//! Tie-break port

use rand::seq::SliceRandom;

/// Picks one value among tied leaders.
pub trait TieBreaker: Send + Sync {
    /// `tied` is never empty. Must return one of its elements.
    fn pick(&self, tied: &[String]) -> Option<String>;
}

/// Uniformly random pick
pub struct RandomTieBreaker;

impl TieBreaker for RandomTieBreaker {
    fn pick(&self, tied: &[String]) -> Option<String> {
        tied.choose(&mut rand::thread_rng()).cloned()
    }
}
