//! # Go-With-the-Winners Search
//!
//! Population-based local search over discrete solution spaces, built on trackers that keep
//! an exact aggregate score and a per-element marginal-gain cache under single-element
//! mutation.
//!
//! This crate provides:
//! - Ground structures: adjacency-list [`graph::Graph`]s and bipartite [`code::ParityCode`]s,
//!   with random generators (Erdős–Rényi, planted independent set, Gallager, Tanner).
//! - Three **incremental** trackers behind one [`tracker::IncrementalTracker`] trait:
//!   vertex subsets ([`subset`]), graph colourings ([`coloring`]) and parity-check messages
//!   ([`parity`]). Every `mutate` runs in time proportional to the touched neighbourhood.
//! - The GWW driver ([`search`]): mix every particle, move the threshold, cull, replenish.
//!
//! ## Quick Start
//!
//! ```
//! use gww::prelude::*;
//! use rand::SeedableRng;
//! use rand::rngs::SmallRng;
//! use std::sync::Arc;
//!
//! let mut rng = SmallRng::seed_from_u64(7);
//! let (graph, _planted) = Graph::with_planted_independent_set(40, 0.15, 8, &mut rng).unwrap();
//! let graph = Arc::new(graph);
//!
//! let config = GwwConfig {
//!     population_size: 32,
//!     walk_length: 16,
//!     seed: Some(12345),
//!     max_rounds: Some(50),
//!     ..Default::default()
//! };
//! let outcome = GwwSearch::new(
//!     config,
//!     SwapWalk,
//!     MedianSchedule::new(Direction::Minimize, 0.0),
//!     |rng| SubsetTracker::random(Arc::clone(&graph), 8, rng),
//! )
//! .unwrap()
//! .run()
//! .unwrap();
//!
//! assert_eq!(outcome.best.size(), 8);
//! assert!(outcome.best.density() >= 0.0);
//! ```
//!
//! ## Working with Trackers Directly
//!
//! ```
//! use gww::prelude::*;
//! use std::sync::Arc;
//!
//! let code = ParityCode::from_checks(4, vec![vec![0, 1, 2], vec![1, 2, 3]]).unwrap();
//! let mut message = ParityTracker::zeros(Arc::new(code));
//! assert_eq!(message.score(), 2);
//! assert_eq!(message.marginal(1).unwrap(), -2);
//!
//! message.mutate(1).unwrap();
//! assert_eq!(message.score(), 0);
//! assert!(audit(&message).is_ok());
//! ```
//!
//! ## Modules
//!
//! - [`graph`], [`code`]: ground structures and generators.
//! - [`tracker`], [`subset`], [`coloring`], [`parity`]: incremental trackers.
//! - [`moves`]: move policies and the random-walk mixer.
//! - [`population`], [`schedule`], [`search`]: the GWW loop.
//! - [`observer`]: per-mutation and per-round instrumentation hooks.
//! - [`greedy`], [`audit`]: steepest-descent polish and cache verification.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::similar_names)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_possible_wrap)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::inline_always)] // Hot-path accessors
#![allow(clippy::many_single_char_names)] // Mathematical variable names
#![allow(clippy::needless_range_loop)] // Often clearer for index-parallel arrays
#![allow(clippy::doc_markdown)]
#![allow(clippy::float_cmp)] // Thresholds are compared exactly

pub mod audit;
pub mod code;
pub mod coloring;
pub mod error;
pub mod graph;
pub mod greedy;
pub mod ground;
pub mod moves;
pub mod observer;
pub mod parity;
pub mod population;
pub mod schedule;
pub mod search;
pub mod subset;
pub mod tracker;

/// Re-export commonly used types for convenience.
pub mod prelude {
    pub use crate::audit::{audit, AuditError};
    pub use crate::code::ParityCode;
    pub use crate::coloring::{ColoringTracker, Recolor};
    pub use crate::error::GwwError;
    pub use crate::graph::{parse_adjacency_matrix, Graph, GraphParseError};
    pub use crate::greedy::{descend, descend_coloring};
    pub use crate::ground::GroundStructure;
    pub use crate::moves::{mix, BoundedSizeWalk, MovePolicy, RandomRecolor, SwapWalk, UniformFlip};
    pub use crate::observer::{
        ChannelCollector, NoopObserver, ParticleSnapshot, RoundSnapshot, SearchObserver, TracingObserver,
    };
    pub use crate::parity::ParityTracker;
    pub use crate::population::{Culled, Population};
    pub use crate::schedule::{
        median, Direction, FixedStepSchedule, FractionSchedule, MedianSchedule, ThresholdSchedule,
    };
    pub use crate::search::{GwwConfig, GwwSearch, SearchOutcome, SearchState};
    pub use crate::subset::SubsetTracker;
    pub use crate::tracker::IncrementalTracker;
}
