//! Inference of the hidden hands from auction and play evidence.
//!
//! This module is composed of:
//! - `csp`: weighted constraint problems with tagged unary and binary factors.
//! - `solver`: AC-3 pruning and maximum-weight backtracking search.
//! - `hand_model`: the unseen-hands problem built from bids and shown-out suits.
//! - `random`: exact-count uniform dealing, used as fallback and for residual cards.
//! - `evidence`: the bidding frequency tables.

pub mod csp;
mod evidence;
mod hand_model;
mod random;
pub mod solver;
pub mod stats;

pub use csp::{BinaryFactor, CspError, UnaryFactor, WeightedCsp};
pub use evidence::BiddingEvidence;
pub use hand_model::{AssignmentSource, HandInferenceModel, HiddenSeat, InferredHands};
pub use random::UniformRandomAssigner;
pub use solver::{Assignment, ConstraintSolver, SearchStats, Solution, SolverOptions};
