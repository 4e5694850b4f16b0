//! Error taxonomy shared by every module of the crate.
//!
//! Stalling and extinction of a search are *not* errors: they are ordinary terminal
//! states reported through [`crate::search::SearchState`].

use thiserror::Error;

/// Errors raised by ground structures, trackers, populations and search construction.
#[derive(Error, Clone, Debug, PartialEq, Eq)]
pub enum GwwError {
    /// Malformed construction parameters. Raised at construction time, never mid-run.
    #[error("invalid configuration: {0}")]
    Validation(String),

    /// Out-of-range element, constraint or colour access.
    #[error("index {index} out of range (valid range is 0..{len})")]
    IndexOutOfRange {
        /// The offending index.
        index: usize,
        /// Number of valid indices.
        len: usize,
    },

    /// `replenish` was called on a population without survivors.
    #[error("cannot replenish an empty population")]
    EmptyPopulation,
}

impl GwwError {
    /// Shorthand for building a [`GwwError::Validation`].
    pub(crate) fn validation(msg: impl Into<String>) -> Self {
        GwwError::Validation(msg.into())
    }
}

/// Returns `Ok(())` when `index < len`, otherwise [`GwwError::IndexOutOfRange`].
#[inline]
pub(crate) fn check_index(index: usize, len: usize) -> Result<(), GwwError> {
    if index < len {
        Ok(())
    } else {
        Err(GwwError::IndexOutOfRange { index, len })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn check_index_accepts_in_range() {
        assert!(check_index(0, 1).is_ok());
        assert!(check_index(4, 5).is_ok());
    }

    #[test]
    fn check_index_rejects_out_of_range() {
        assert_eq!(
            check_index(5, 5),
            Err(GwwError::IndexOutOfRange { index: 5, len: 5 })
        );
        assert!(check_index(0, 0).is_err());
    }

    #[test]
    fn display_messages_are_readable() {
        let e = GwwError::IndexOutOfRange { index: 7, len: 3 };
        assert_eq!(e.to_string(), "index 7 out of range (valid range is 0..3)");
        let e = GwwError::validation("population size must be positive");
        assert!(e.to_string().contains("population size"));
    }
}
