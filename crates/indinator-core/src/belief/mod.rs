//! Posterior tracking over candidate entities.
//!
//! This module is composed of:
//! - `state`: the belief vector plus asked / skipped bookkeeping (`BeliefState`).
//! - `evidence`: reduction of any answer to per-entity likelihood multipliers.
//! - `entropy`: Shannon entropy in bits.
//! - `feedback`: boost / penalize reinforcement after guess feedback.

pub mod entropy;
pub mod evidence;
pub mod feedback;
mod state;

pub use entropy::{entropy, max_entropy};
pub use evidence::Evidence;
pub use feedback::{boost, penalize};
pub use state::{BeliefState, DegenerateUpdate, NORMALIZATION_TOLERANCE};
