//! Message tracker over a [`ParityCode`]: bit-flip search for codewords.
//!
//! The score is the total weight of satisfied checks, so higher is better and a codeword
//! reaches [`ParityCode::total_weight`]. Each check contributes `-w` to the marginal of every
//! bit it touches while satisfied (flipping any of them breaks it) and `+w` while
//! unsatisfied. A flip toggles the status of every check touching the flipped bit, which
//! moves each touched bit's marginal by `2w`.

use crate::code::ParityCode;
use crate::error::{check_index, GwwError};
use crate::tracker::IncrementalTracker;
use rand::Rng;
use std::sync::Arc;

/// A message over the bits of a [`ParityCode`], scored by the total weight of the checks it
/// satisfies.
#[derive(Clone, Debug)]
pub struct ParityTracker {
    ground: Arc<ParityCode>,
    message: Vec<bool>,
    satisfied: Vec<bool>,
    marginals: Vec<i64>,
    score: i64,
}

impl ParityTracker {
    /// Tracks `message` against `ground`.
    ///
    /// # Errors
    /// Returns [`GwwError::Validation`] if the message length differs from the bit count.
    pub fn new(ground: Arc<ParityCode>, message: Vec<bool>) -> Result<Self, GwwError> {
        if message.len() != ground.bit_count() {
            return Err(GwwError::validation(format!(
                "message has {} bits but the code has {}",
                message.len(),
                ground.bit_count()
            )));
        }
        Ok(Self::from_message(ground, message))
    }

    /// The all-zero message (always a codeword).
    pub fn zeros(ground: Arc<ParityCode>) -> Self {
        let n = ground.bit_count();
        Self::from_message(ground, vec![false; n])
    }

    /// Uniformly random message.
    pub fn random<R: Rng>(ground: Arc<ParityCode>, rng: &mut R) -> Self {
        let message = (0..ground.bit_count()).map(|_| rng.random_bool(0.5)).collect();
        Self::from_message(ground, message)
    }

    /// `codeword` sent through a binary symmetric channel: each bit is flipped independently
    /// with probability `flip_probability`.
    ///
    /// # Errors
    /// Returns [`GwwError::Validation`] if `codeword` has the wrong length or the probability
    /// lies outside `[0, 1]`.
    pub fn perturbed<R: Rng>(
        ground: Arc<ParityCode>,
        codeword: &[bool],
        flip_probability: f64,
        rng: &mut R,
    ) -> Result<Self, GwwError> {
        if !(0.0..=1.0).contains(&flip_probability) {
            return Err(GwwError::validation(format!(
                "flip probability must lie in [0, 1], got {flip_probability}"
            )));
        }
        let mut tracker = Self::new(ground, codeword.to_vec())?;
        for bit in 0..tracker.message.len() {
            if rng.random_bool(flip_probability) {
                tracker.mutate(bit)?;
            }
        }
        Ok(tracker)
    }

    fn from_message(ground: Arc<ParityCode>, message: Vec<bool>) -> Self {
        let m = ground.check_count();
        let mut satisfied = vec![false; m];
        let mut marginals = vec![0i64; message.len()];
        let mut score = 0;
        for c in 0..m {
            let w = ground.weight_unchecked(c);
            let ok = ground.is_satisfied_by(c, &message);
            satisfied[c] = ok;
            if ok {
                score += w;
            }
            let contribution = if ok { -w } else { w };
            for &b in ground.elements_of_unchecked(c) {
                marginals[b] += contribution;
            }
        }
        Self {
            ground,
            message,
            satisfied,
            marginals,
            score,
        }
    }

    /// Current value of `bit`.
    ///
    /// # Errors
    /// Returns [`GwwError::IndexOutOfRange`] if `bit` is out of range.
    #[inline]
    pub fn bit(&self, bit: usize) -> Result<bool, GwwError> {
        check_index(bit, self.message.len())?;
        Ok(self.message[bit])
    }

    /// Cached satisfaction status of `check`.
    ///
    /// # Errors
    /// Returns [`GwwError::IndexOutOfRange`] if `check` is out of range.
    #[inline]
    pub fn is_satisfied(&self, check: usize) -> Result<bool, GwwError> {
        check_index(check, self.satisfied.len())?;
        Ok(self.satisfied[check])
    }

    /// Number of parity checks.
    #[inline]
    pub fn num_constraints(&self) -> usize {
        self.satisfied.len()
    }

    /// Score of a codeword: the weight of every check.
    #[inline]
    pub fn total_weight(&self) -> i64 {
        self.ground.total_weight()
    }

    /// Number of unsatisfied checks (ignoring weights).
    pub fn unsatisfied_count(&self) -> usize {
        self.satisfied.iter().filter(|&&s| !s).count()
    }

    /// Whether every check is satisfied.
    #[inline]
    pub fn is_codeword(&self) -> bool {
        self.score == self.ground.total_weight()
    }

    /// Number of positions where the message differs from `other`.
    ///
    /// # Errors
    /// Returns [`GwwError::Validation`] on a length mismatch.
    pub fn hamming_distance(&self, other: &[bool]) -> Result<usize, GwwError> {
        if other.len() != self.message.len() {
            return Err(GwwError::validation(format!(
                "cannot compare a {}-bit message with a {}-bit one",
                self.message.len(),
                other.len()
            )));
        }
        Ok(self.message.iter().zip(other).filter(|(a, b)| a != b).count())
    }

    /// Bit with the largest positive marginal (lowest index on ties), if any flip improves.
    pub fn best_flip(&self) -> Option<(usize, i64)> {
        self.marginals
            .iter()
            .copied()
            .enumerate()
            .filter(|&(_, d)| d > 0)
            .fold(None, |best: Option<(usize, i64)>, (i, d)| match best {
                Some((_, bd)) if bd >= d => best,
                _ => Some((i, d)),
            })
    }
}

impl IncrementalTracker for ParityTracker {
    type Ground = ParityCode;
    type Value = bool;
    type Move = usize;

    #[inline]
    fn ground(&self) -> &Arc<ParityCode> {
        &self.ground
    }

    #[inline]
    fn score(&self) -> i64 {
        self.score
    }

    #[inline]
    fn marginal(&self, element: usize) -> Result<i64, GwwError> {
        check_index(element, self.marginals.len())?;
        Ok(self.marginals[element])
    }

    fn mutate(&mut self, mv: usize) -> Result<usize, GwwError> {
        check_index(mv, self.message.len())?;
        self.message[mv] = !self.message[mv];
        let ground = Arc::clone(&self.ground);
        for &c in ground.constraints_of_unchecked(mv) {
            let w = ground.weight_unchecked(c);
            let now_satisfied = !self.satisfied[c];
            self.satisfied[c] = now_satisfied;
            let shift = if now_satisfied {
                self.score += w;
                -2 * w
            } else {
                self.score -= w;
                2 * w
            };
            for &b in ground.elements_of_unchecked(c) {
                self.marginals[b] += shift;
            }
        }
        debug_assert_eq!(self.satisfied.len(), ground.check_count());
        Ok(mv)
    }

    fn assignment(&self) -> Vec<bool> {
        self.message.clone()
    }

    fn score_from_scratch(&self) -> i64 {
        self.ground.satisfied_weight(&self.message)
    }

    fn rebuild(&self) -> Self {
        Self::from_message(Arc::clone(&self.ground), self.message.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_xorshift::XorShiftRng;

    fn two_check_code() -> Arc<ParityCode> {
        Arc::new(ParityCode::from_checks(4, vec![vec![0, 1, 2], vec![1, 2, 3]]).unwrap())
    }

    fn assert_matches_scratch(t: &ParityTracker) {
        assert_eq!(t.score(), t.score_from_scratch());
        let fresh = t.rebuild();
        assert_eq!(t.satisfied, fresh.satisfied);
        assert_eq!(t.marginals, fresh.marginals);
        for b in 0..t.len() {
            let mut trial = t.clone();
            trial.mutate(b).unwrap();
            assert_eq!(t.marginal(b).unwrap(), trial.score_from_scratch() - t.score());
        }
    }

    #[test]
    fn two_check_scenario() {
        let mut t = ParityTracker::zeros(two_check_code());
        assert_eq!(t.score(), 2);
        assert_eq!(t.marginal(1).unwrap(), -2);
        assert_eq!(t.marginal(0).unwrap(), -1);

        let undo = t.mutate(1).unwrap();
        assert_eq!(undo, 1);
        assert_eq!(t.score(), 0);
        assert_eq!(t.assignment(), vec![false, true, false, false]);
        assert_eq!(t.marginal(1).unwrap(), 2);
        assert!(!t.is_satisfied(0).unwrap());
        assert_eq!(t.unsatisfied_count(), 2);
        assert_matches_scratch(&t);
    }

    #[test]
    fn flipped_bit_marginal_negates() {
        let mut rng = XorShiftRng::seed_from_u64(42);
        let code = Arc::new(ParityCode::gallager(40, 3, 4, &mut rng).unwrap());
        let mut t = ParityTracker::random(code, &mut rng);
        for _ in 0..200 {
            let b = rng.random_range(0..40);
            let before = t.marginal(b).unwrap();
            t.mutate(b).unwrap();
            assert_eq!(t.marginal(b).unwrap(), -before);
        }
    }

    #[test]
    fn random_flips_match_recompute() {
        let mut rng = XorShiftRng::seed_from_u64(0xFEED);
        let code = Arc::new(
            ParityCode::tanner(80, 40, 3, &mut rng)
                .unwrap()
                .with_weights((1..=40).collect())
                .unwrap(),
        );
        let mut t = ParityTracker::random(code, &mut rng);
        for step in 0..1_200 {
            t.mutate(rng.random_range(0..80)).unwrap();
            assert_eq!(t.score(), t.score_from_scratch(), "score drift at step {step}");
            if step % 150 == 0 {
                assert_matches_scratch(&t);
            }
        }
        assert_matches_scratch(&t);
    }

    #[test]
    fn double_flip_is_identity() {
        let mut rng = XorShiftRng::seed_from_u64(1);
        let code = Arc::new(ParityCode::gallager(20, 2, 4, &mut rng).unwrap());
        let orig = ParityTracker::random(code, &mut rng);
        for b in 0..20 {
            let mut t = orig.clone();
            let undo = t.mutate(b).unwrap();
            t.mutate(undo).unwrap();
            assert_eq!(t.message, orig.message);
            assert_eq!(t.satisfied, orig.satisfied);
            assert_eq!(t.marginals, orig.marginals);
            assert_eq!(t.score, orig.score);
        }
    }

    #[test]
    fn perturbed_codeword_respects_channel() {
        let mut rng = XorShiftRng::seed_from_u64(8);
        let code = Arc::new(ParityCode::gallager(24, 3, 6, &mut rng).unwrap());
        let zero = vec![false; 24];

        let clean = ParityTracker::perturbed(Arc::clone(&code), &zero, 0.0, &mut rng).unwrap();
        assert_eq!(clean.hamming_distance(&zero).unwrap(), 0);
        assert!(clean.is_codeword());

        let inverted = ParityTracker::perturbed(Arc::clone(&code), &zero, 1.0, &mut rng).unwrap();
        assert_eq!(inverted.hamming_distance(&zero).unwrap(), 24);

        let noisy = ParityTracker::perturbed(Arc::clone(&code), &zero, 0.2, &mut rng).unwrap();
        assert_matches_scratch(&noisy);

        assert!(ParityTracker::perturbed(Arc::clone(&code), &zero, 1.5, &mut rng).is_err());
        assert!(ParityTracker::perturbed(code, &zero[..3], 0.1, &mut rng).is_err());
    }

    #[test]
    fn best_flip_picks_largest_gain() {
        let mut t = ParityTracker::zeros(two_check_code());
        assert_eq!(t.best_flip(), None);
        t.mutate(1).unwrap();
        assert_eq!(t.best_flip(), Some((1, 2)));
        t.mutate(1).unwrap();
        assert!(t.is_codeword());
    }

    #[test]
    fn wrong_length_and_range_are_rejected() {
        let code = two_check_code();
        assert!(ParityTracker::new(Arc::clone(&code), vec![false; 3]).is_err());
        let mut t = ParityTracker::zeros(code);
        assert!(t.mutate(4).is_err());
        assert!(t.marginal(4).is_err());
        assert!(t.is_satisfied(2).is_err());
        assert!(t.hamming_distance(&[false]).is_err());
        assert_eq!(t.score(), 2);
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn incremental_equals_scratch(
                seed in any::<u64>(),
                flips in proptest::collection::vec(0usize..24, 1..150),
            ) {
                let mut rng = XorShiftRng::seed_from_u64(seed);
                let code = Arc::new(ParityCode::tanner(24, 12, 3, &mut rng).unwrap());
                let mut t = ParityTracker::zeros(code);
                for b in flips {
                    t.mutate(b).unwrap();
                }
                let fresh = t.rebuild();
                prop_assert_eq!(t.score(), fresh.score());
                prop_assert_eq!(&t.marginals, &fresh.marginals);
                prop_assert_eq!(&t.satisfied, &fresh.satisfied);
            }
        }
    }
}
