//! The incremental tracker capability shared by every search variant.
//!
//! A tracker owns one assignment over a shared [`GroundStructure`] together with two
//! caches that must always equal a from-scratch recomputation:
//!
//! - the aggregate score ([`IncrementalTracker::score`]),
//! - the per-element marginal ([`IncrementalTracker::marginal`]): the signed change of the
//!   score that the element's canonical move would cause *right now*.
//!
//! [`IncrementalTracker::mutate`] is the only way either cache may change, and it runs in
//! `O(sum of degrees of the touched constraints)`, never `O(n)`.
//!
//! Trackers have value semantics: `Clone` is a deep copy of the assignment and both caches.
//! Only the ground structure (immutable, behind an `Arc`) is shared between clones.

use crate::error::GwwError;
use crate::ground::GroundStructure;
use std::fmt::Debug;
use std::sync::Arc;

/// Mutable per-run state over a ground structure with exact incremental caches.
pub trait IncrementalTracker: Clone + Send + Sync {
    /// The ground structure this tracker is defined over.
    type Ground: GroundStructure;
    /// Domain value of one element (membership, colour, bit).
    type Value: Copy + Debug + PartialEq + Send + Sync;
    /// A single-element mutation.
    type Move: Copy + Debug + PartialEq + Send + Sync;

    /// Shared ground structure.
    fn ground(&self) -> &Arc<Self::Ground>;

    /// Number of elements (convenience for `ground().element_count()`).
    #[inline]
    fn len(&self) -> usize {
        self.ground().element_count()
    }

    /// Returns `true` when the ground structure has no elements.
    #[inline]
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Current aggregate score. `O(1)`.
    fn score(&self) -> i64;

    /// The quantity a population search ranks particles by.
    ///
    /// Defaults to the aggregate score; trackers whose natural objective is a normalised
    /// quantity (subset density) override it.
    #[inline]
    fn fitness(&self) -> f64 {
        self.score() as f64
    }

    /// Cached marginal of `element`.
    ///
    /// # Errors
    /// Returns [`GwwError::IndexOutOfRange`] if `element` is out of range.
    fn marginal(&self, element: usize) -> Result<i64, GwwError>;

    /// Applies `mv`, updating the score and every affected marginal, and returns the move
    /// that undoes it.
    ///
    /// # Errors
    /// Returns [`GwwError::IndexOutOfRange`] if the move references an out-of-range element
    /// or value. The tracker is left unchanged in that case.
    fn mutate(&mut self, mv: Self::Move) -> Result<Self::Move, GwwError>;

    /// Independent copy of the current assignment.
    fn assignment(&self) -> Vec<Self::Value>;

    /// Recomputes the aggregate score from the assignment alone, ignoring every cache.
    fn score_from_scratch(&self) -> i64;

    /// A fresh tracker over the same ground structure and assignment whose caches are built
    /// from scratch. Used to audit the incremental caches.
    fn rebuild(&self) -> Self;
}
