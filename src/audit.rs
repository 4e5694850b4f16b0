//! Consistency check of a tracker's incremental caches against a from-scratch rebuild.

use crate::error::GwwError;
use crate::tracker::IncrementalTracker;
use thiserror::Error;

/// First cache mismatch found by [`audit`].
#[derive(Error, Clone, Debug, PartialEq, Eq)]
pub enum AuditError {
    /// The aggregate score drifted.
    #[error("cached score {cached} differs from recomputed score {recomputed}")]
    Score {
        /// Score held by the tracker.
        cached: i64,
        /// Score of the rebuilt tracker.
        recomputed: i64,
    },

    /// The first element whose marginal drifted.
    #[error("cached marginal of element {element} is {cached}, recomputed {recomputed}")]
    Marginal {
        /// Element index.
        element: usize,
        /// Marginal held by the tracker.
        cached: i64,
        /// Marginal of the rebuilt tracker.
        recomputed: i64,
    },

    /// A marginal could not be read at all.
    #[error(transparent)]
    Access(#[from] GwwError),
}

/// Compares the cached score and every cached marginal of `tracker` with those of a tracker
/// rebuilt from its assignment. `O(n + sum of constraint sizes)`.
///
/// # Errors
/// Returns the first mismatch.
pub fn audit<T: IncrementalTracker>(tracker: &T) -> Result<(), AuditError> {
    let recomputed = tracker.score_from_scratch();
    if tracker.score() != recomputed {
        return Err(AuditError::Score {
            cached: tracker.score(),
            recomputed,
        });
    }
    let fresh = tracker.rebuild();
    for element in 0..tracker.len() {
        let cached = tracker.marginal(element)?;
        let recomputed = fresh.marginal(element)?;
        if cached != recomputed {
            return Err(AuditError::Marginal {
                element,
                cached,
                recomputed,
            });
        }
    }
    Ok(())
}
