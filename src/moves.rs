//! Move policies and the random-walk mixer.
//!
//! A [`MovePolicy`] picks the next single-element move for a tracker; [`mix`] applies a
//! bounded number of them through [`IncrementalTracker::mutate`] and nothing else.

use crate::coloring::{ColoringTracker, Recolor};
use crate::error::GwwError;
use crate::observer::SearchObserver;
use crate::subset::SubsetTracker;
use crate::tracker::IncrementalTracker;
use rand::Rng;

// ============================================================================
// Move policies
// ============================================================================

/// Chooses the next move of a random walk.
pub trait MovePolicy<T: IncrementalTracker>: Send + Sync {
    /// Proposes a move for `tracker`, or `None` when no legal move exists (the step is
    /// skipped).
    fn propose<R: Rng>(&self, tracker: &T, rng: &mut R) -> Option<T::Move>;

    /// Applies one walk step to `tracker`, reporting every mutation to `observer`, and
    /// returns the number of mutations made. The default applies the single proposed move.
    ///
    /// # Errors
    /// Propagates the first error of [`IncrementalTracker::mutate`].
    fn step<R, O>(&self, tracker: &mut T, rng: &mut R, observer: &O, particle: usize) -> Result<usize, GwwError>
    where
        R: Rng,
        O: SearchObserver<T> + ?Sized,
    {
        let Some(mv) = self.propose(tracker, rng) else {
            return Ok(0);
        };
        tracker.mutate(mv)?;
        observer.on_mutation(particle, mv, tracker);
        Ok(1)
    }
}

/// Flips a uniformly random element. Used for unconstrained subset walks and bit flips.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct UniformFlip;

impl<T> MovePolicy<T> for UniformFlip
where
    T: IncrementalTracker<Move = usize>,
{
    #[inline]
    fn propose<R: Rng>(&self, tracker: &T, rng: &mut R) -> Option<usize> {
        let n = tracker.len();
        if n == 0 {
            None
        } else {
            Some(rng.random_range(0..n))
        }
    }
}

/// Subset walk whose size stays within `[min, max]`.
///
/// At `min` (or below) the walk must add a random non-member, at `max` (or above) it must
/// remove a random member; strictly in between it adds or removes with equal probability.
/// Use [`SwapWalk`] when the size must not move at all.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BoundedSizeWalk {
    min: usize,
    max: usize,
}

impl BoundedSizeWalk {
    /// # Errors
    /// Returns [`GwwError::Validation`] if `min > max`.
    pub fn new(min: usize, max: usize) -> Result<Self, GwwError> {
        if min > max {
            return Err(GwwError::validation(format!(
                "subset size bounds are inverted (min {min} > max {max})"
            )));
        }
        Ok(Self { min, max })
    }

    /// Smallest size the walk keeps.
    #[inline]
    pub fn min(&self) -> usize {
        self.min
    }

    /// Largest size the walk keeps.
    #[inline]
    pub fn max(&self) -> usize {
        self.max
    }
}

impl MovePolicy<SubsetTracker> for BoundedSizeWalk {
    fn propose<R: Rng>(&self, tracker: &SubsetTracker, rng: &mut R) -> Option<usize> {
        let size = tracker.size();
        let add = if size <= self.min {
            true
        } else if size >= self.max {
            false
        } else {
            rng.random_bool(0.5)
        };
        if add {
            tracker.random_non_member(rng)
        } else {
            tracker.random_member(rng)
        }
    }
}

/// Fixed-size subset walk: every step removes a random member and adds a random
/// non-member, so the size after each step equals the size before it.
///
/// Both halves go through [`IncrementalTracker::mutate`] and are reported to the observer
/// separately. A step is skipped when the subset is empty or already holds every vertex.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SwapWalk;

impl MovePolicy<SubsetTracker> for SwapWalk {
    /// The member that the next swap would remove.
    fn propose<R: Rng>(&self, tracker: &SubsetTracker, rng: &mut R) -> Option<usize> {
        tracker.random_member(rng)
    }

    fn step<R, O>(
        &self,
        tracker: &mut SubsetTracker,
        rng: &mut R,
        observer: &O,
        particle: usize,
    ) -> Result<usize, GwwError>
    where
        R: Rng,
        O: SearchObserver<SubsetTracker> + ?Sized,
    {
        let (Some(add), Some(remove)) = (tracker.random_non_member(rng), tracker.random_member(rng)) else {
            return Ok(0);
        };
        tracker.mutate(remove)?;
        observer.on_mutation(particle, remove, tracker);
        tracker.mutate(add)?;
        observer.on_mutation(particle, add, tracker);
        Ok(2)
    }
}

/// Recolours a uniformly random vertex with a uniformly random *different* colour.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RandomRecolor;

impl MovePolicy<ColoringTracker> for RandomRecolor {
    fn propose<R: Rng>(&self, tracker: &ColoringTracker, rng: &mut R) -> Option<Recolor> {
        let n = tracker.len();
        let k = tracker.num_colors();
        if n == 0 || k < 2 {
            return None;
        }
        let node = rng.random_range(0..n);
        let current = tracker.color_of(node).ok()?;
        let mut color = rng.random_range(0..k - 1);
        if color >= current {
            color += 1;
        }
        Some(Recolor { node, color })
    }
}

// ============================================================================
// Mixer
// ============================================================================

/// Runs up to `steps` walk steps of `policy` on `tracker`, reporting each mutation to
/// `observer` as coming from `particle`. Returns the number of steps that changed the
/// tracker; skipped steps are not counted.
///
/// # Errors
/// Propagates the first error of [`IncrementalTracker::mutate`].
pub fn mix<T, P, O, R>(
    tracker: &mut T,
    steps: usize,
    policy: &P,
    rng: &mut R,
    observer: &O,
    particle: usize,
) -> Result<usize, GwwError>
where
    T: IncrementalTracker,
    P: MovePolicy<T> + ?Sized,
    O: SearchObserver<T> + ?Sized,
    R: Rng,
{
    let mut applied = 0;
    for _ in 0..steps {
        if policy.step(tracker, rng, observer, particle)? > 0 {
            applied += 1;
        }
    }
    Ok(applied)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::code::ParityCode;
    use crate::graph::Graph;
    use crate::observer::NoopObserver;
    use crate::parity::ParityTracker;
    use rand::SeedableRng;
    use rand_xorshift::XorShiftRng;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingObserver(AtomicUsize);

    impl<T: IncrementalTracker> SearchObserver<T> for CountingObserver {
        fn on_mutation(&self, _particle: usize, _mv: T::Move, _tracker: &T) {
            self.0.fetch_add(1, Ordering::Relaxed);
        }
    }

    #[test]
    fn mix_applies_every_step_and_keeps_caches_exact() {
        let mut rng = XorShiftRng::seed_from_u64(3);
        let code = Arc::new(ParityCode::gallager(30, 3, 5, &mut rng).unwrap());
        let mut t = ParityTracker::zeros(code);
        let obs = CountingObserver(AtomicUsize::new(0));
        let applied = mix(&mut t, 250, &UniformFlip, &mut rng, &obs, 0).unwrap();
        assert_eq!(applied, 250);
        assert_eq!(obs.0.load(Ordering::Relaxed), 250);
        assert_eq!(t.score(), t.score_from_scratch());
    }

    #[test]
    fn swap_walk_keeps_size_after_every_step() {
        let mut rng = XorShiftRng::seed_from_u64(17);
        let g = Arc::new(Graph::erdos_renyi(30, 0.2, &mut rng).unwrap());
        let mut t = SubsetTracker::random(g, 8, &mut rng).unwrap();
        let start = t.members();
        let obs = CountingObserver(AtomicUsize::new(0));
        for _ in 0..101 {
            assert_eq!(mix(&mut t, 1, &SwapWalk, &mut rng, &obs, 0).unwrap(), 1);
            assert_eq!(t.size(), 8);
        }
        assert_eq!(mix(&mut t, 5, &SwapWalk, &mut rng, &obs, 0).unwrap(), 5);
        assert_eq!(t.size(), 8);
        assert_eq!(obs.0.load(Ordering::Relaxed), 2 * 106);
        assert_eq!(t.score(), t.score_from_scratch());
        assert_ne!(t.members(), start);
    }

    #[test]
    fn swap_walk_skips_empty_and_full_subsets() {
        let mut rng = XorShiftRng::seed_from_u64(4);
        let g = Arc::new(Graph::path(3));
        let mut empty = SubsetTracker::empty(Arc::clone(&g));
        let mut full = SubsetTracker::new(g, &[0, 1, 2]).unwrap();
        assert_eq!(mix(&mut empty, 3, &SwapWalk, &mut rng, &NoopObserver, 0).unwrap(), 0);
        assert_eq!(mix(&mut full, 3, &SwapWalk, &mut rng, &NoopObserver, 0).unwrap(), 0);
        assert_eq!(full.size(), 3);
    }

    #[test]
    fn bounded_walk_stays_in_range() {
        let mut rng = XorShiftRng::seed_from_u64(23);
        let g = Arc::new(Graph::path(20));
        let mut t = SubsetTracker::empty(g);
        let walk = BoundedSizeWalk::new(3, 7).unwrap();
        mix(&mut t, 3, &walk, &mut rng, &NoopObserver, 0).unwrap();
        for _ in 0..500 {
            mix(&mut t, 1, &walk, &mut rng, &NoopObserver, 0).unwrap();
            assert!((3..=7).contains(&t.size()), "size {} escaped", t.size());
        }
        assert!(BoundedSizeWalk::new(4, 2).is_err());
    }

    #[test]
    fn full_subset_cannot_grow() {
        let mut rng = XorShiftRng::seed_from_u64(1);
        let g = Arc::new(Graph::path(3));
        let t = SubsetTracker::new(g, &[0, 1, 2]).unwrap();
        let walk = BoundedSizeWalk::new(5, 6).unwrap();
        assert_eq!(walk.propose(&t, &mut rng), None);
    }

    #[test]
    fn recolor_always_changes_colour() {
        let mut rng = XorShiftRng::seed_from_u64(31);
        let g = Arc::new(Graph::complete(5));
        let t = ColoringTracker::random(g, 3, &mut rng).unwrap();
        for _ in 0..200 {
            let mv = RandomRecolor.propose(&t, &mut rng).unwrap();
            assert!(mv.color < 3);
            assert_ne!(t.color_of(mv.node).unwrap(), mv.color);
        }
        let mono = ColoringTracker::uniform(Arc::new(Graph::path(3)), 1).unwrap();
        assert_eq!(RandomRecolor.propose(&mono, &mut rng), None);
    }

    #[test]
    fn skipped_steps_are_not_counted() {
        let mut rng = XorShiftRng::seed_from_u64(2);
        let mut t = ColoringTracker::uniform(Arc::new(Graph::path(4)), 1).unwrap();
        let applied = mix(&mut t, 10, &RandomRecolor, &mut rng, &NoopObserver, 0).unwrap();
        assert_eq!(applied, 0);
    }
}
