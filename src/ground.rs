//! The read-only combinatorial object every tracker is defined over.

use crate::error::{check_index, GwwError};

/// A fixed object over integer-indexed elements `0..element_count()`.
///
/// Implementations are immutable for the lifetime of a run and shared (via `Arc`) by every
/// tracker and particle derived from them, hence the `Send + Sync` bound.
pub trait GroundStructure: Send + Sync {
    /// Number of elements (vertices or bits).
    fn element_count(&self) -> usize;

    /// Returns [`GwwError::IndexOutOfRange`] if `element` is not a valid element.
    #[inline]
    fn check_element(&self, element: usize) -> Result<(), GwwError> {
        check_index(element, self.element_count())
    }
}
