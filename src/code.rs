//! Parity-check codes: the bipartite ground structure of the bit-flip search.
//!
//! A code over `n` bits has `m` parity checks. Check `c` is *satisfied* by a message `x`
//! when the XOR of the bits it touches is `0` (i.e. row `c` of the parity-check matrix
//! annihilates `x` mod 2). Every check carries a positive integer weight; the aggregate
//! score of a message is the total weight of its satisfied checks.

use crate::error::{check_index, GwwError};
use crate::ground::GroundStructure;
use rand::seq::SliceRandom;
use rand::Rng;

/// An immutable parity-check code with bipartite bit/check adjacency.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParityCode {
    /// `checks[c]` lists the bits touched by check `c`, sorted and deduplicated.
    checks: Vec<Vec<usize>>,
    /// `bit_checks[i]` lists the checks touching bit `i`, sorted.
    bit_checks: Vec<Vec<usize>>,
    /// Positive weight of each check.
    weights: Vec<i64>,
}

impl ParityCode {
    /// Builds a unit-weight code over `n_bits` bits from its checks.
    ///
    /// A bit listed twice in the same check is collapsed to a single incidence.
    ///
    /// # Errors
    /// Returns [`GwwError::IndexOutOfRange`] if a check references a bit `>= n_bits`.
    pub fn from_checks(n_bits: usize, checks: Vec<Vec<usize>>) -> Result<Self, GwwError> {
        let mut normalized = Vec::with_capacity(checks.len());
        let mut bit_checks = vec![Vec::new(); n_bits];
        for (c, mut bits) in checks.into_iter().enumerate() {
            for &b in &bits {
                check_index(b, n_bits)?;
            }
            bits.sort_unstable();
            bits.dedup();
            for &b in &bits {
                bit_checks[b].push(c);
            }
            normalized.push(bits);
        }
        let weights = vec![1; normalized.len()];
        Ok(Self {
            checks: normalized,
            bit_checks,
            weights,
        })
    }

    /// Replaces the check weights.
    ///
    /// # Errors
    /// Returns [`GwwError::Validation`] if the length differs from the number of checks or a
    /// weight is not positive.
    pub fn with_weights(mut self, weights: Vec<i64>) -> Result<Self, GwwError> {
        if weights.len() != self.checks.len() {
            return Err(GwwError::validation(format!(
                "expected {} check weights, got {}",
                self.checks.len(),
                weights.len()
            )));
        }
        if let Some(w) = weights.iter().find(|&&w| w <= 0) {
            return Err(GwwError::validation(format!(
                "check weights must be positive, got {w}"
            )));
        }
        self.weights = weights;
        Ok(self)
    }

    /// Gallager's regular construction: `j` stacked blocks of `n / k` checks, each check
    /// covering `k` bits. The first block covers consecutive runs of `k` bits; every further
    /// block is a uniformly random column permutation of the first.
    ///
    /// The resulting code has `j * n / k` checks; every bit lies in exactly `j` of them.
    ///
    /// # Errors
    /// Returns [`GwwError::Validation`] unless `n > 0`, `j >= 1`, `k >= 1` and `k` divides `n`.
    pub fn gallager<R: Rng>(n: usize, j: usize, k: usize, rng: &mut R) -> Result<Self, GwwError> {
        if n == 0 || j == 0 || k == 0 {
            return Err(GwwError::validation(format!(
                "Gallager construction requires positive n, j, k (got n={n}, j={j}, k={k})"
            )));
        }
        if n % k != 0 {
            return Err(GwwError::validation(format!(
                "Gallager construction requires k to divide n (n={n}, k={k})"
            )));
        }
        let rows_per_block = n / k;
        let mut checks = Vec::with_capacity(j * rows_per_block);
        let mut permutation: Vec<usize> = (0..n).collect();
        for block in 0..j {
            if block > 0 {
                permutation.shuffle(rng);
            }
            for row in 0..rows_per_block {
                let bits = (row * k..(row + 1) * k).map(|col| permutation[col]).collect();
                checks.push(bits);
            }
        }
        Self::from_checks(n, checks)
    }

    /// Tanner-graph construction: every bit independently picks `degree` checks out of
    /// `m` uniformly *with replacement*; repeated picks collapse to one incidence.
    ///
    /// # Errors
    /// Returns [`GwwError::Validation`] if `m == 0` while `degree > 0`.
    pub fn tanner<R: Rng>(n: usize, m: usize, degree: usize, rng: &mut R) -> Result<Self, GwwError> {
        if m == 0 && degree > 0 {
            return Err(GwwError::validation(
                "Tanner construction needs at least one check when degree > 0",
            ));
        }
        let mut checks = vec![Vec::new(); m];
        for bit in 0..n {
            for _ in 0..degree {
                checks[rng.random_range(0..m)].push(bit);
            }
        }
        Self::from_checks(n, checks)
    }

    /// Number of message bits.
    #[inline]
    pub fn bit_count(&self) -> usize {
        self.bit_checks.len()
    }

    /// Number of parity checks.
    #[inline]
    pub fn check_count(&self) -> usize {
        self.checks.len()
    }

    /// Checks touching `bit`.
    ///
    /// # Errors
    /// Returns [`GwwError::IndexOutOfRange`] if `bit` is not a bit index.
    #[inline]
    pub fn constraints_of(&self, bit: usize) -> Result<&[usize], GwwError> {
        check_index(bit, self.bit_checks.len())?;
        Ok(&self.bit_checks[bit])
    }

    /// Bits touched by `check`.
    ///
    /// # Errors
    /// Returns [`GwwError::IndexOutOfRange`] if `check` is not a check index.
    #[inline]
    pub fn elements_of(&self, check: usize) -> Result<&[usize], GwwError> {
        check_index(check, self.checks.len())?;
        Ok(&self.checks[check])
    }

    /// Weight of `check`.
    ///
    /// # Errors
    /// Returns [`GwwError::IndexOutOfRange`] if `check` is not a check index.
    #[inline]
    pub fn weight(&self, check: usize) -> Result<i64, GwwError> {
        check_index(check, self.checks.len())?;
        Ok(self.weights[check])
    }

    /// Sum of all check weights (the best achievable score).
    pub fn total_weight(&self) -> i64 {
        self.weights.iter().sum()
    }

    #[inline(always)]
    pub(crate) fn constraints_of_unchecked(&self, bit: usize) -> &[usize] {
        &self.bit_checks[bit]
    }

    #[inline(always)]
    pub(crate) fn elements_of_unchecked(&self, check: usize) -> &[usize] {
        &self.checks[check]
    }

    #[inline(always)]
    pub(crate) fn weight_unchecked(&self, check: usize) -> i64 {
        self.weights[check]
    }

    /// Whether `check` has even parity under `message` (from scratch).
    ///
    /// `message` must have [`Self::bit_count`] entries.
    pub fn is_satisfied_by(&self, check: usize, message: &[bool]) -> bool {
        self.checks[check]
            .iter()
            .filter(|&&b| message[b])
            .count()
            % 2
            == 0
    }

    /// Total weight of the checks satisfied by `message`, computed from scratch.
    pub fn satisfied_weight(&self, message: &[bool]) -> i64 {
        (0..self.checks.len())
            .filter(|&c| self.is_satisfied_by(c, message))
            .map(|c| self.weights[c])
            .sum()
    }
}

impl GroundStructure for ParityCode {
    #[inline]
    fn element_count(&self) -> usize {
        self.bit_checks.len()
    }
}
