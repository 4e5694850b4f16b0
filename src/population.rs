//! A fixed-size population of independent trackers ("particles").

use crate::error::GwwError;
use crate::moves::{mix, MovePolicy};
use crate::observer::{ParticleSnapshot, RoundSnapshot, SearchObserver};
use crate::schedule::Direction;
use crate::search::splitmix64;
use crate::tracker::IncrementalTracker;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;

/// Outcome of [`Population::cull`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Culled {
    /// `k` particles survived and the population now holds exactly them.
    Survived(usize),
    /// No particle passed; the population was left untouched.
    Extinct,
}

/// An ordered collection of particles. Each slot owns its tracker outright; replication is
/// always a deep `Clone`.
#[derive(Clone, Debug)]
pub struct Population<T: IncrementalTracker> {
    particles: Vec<T>,
}

impl<T: IncrementalTracker> Population<T> {
    /// Builds `n` particles by calling `factory` once per slot.
    ///
    /// # Errors
    /// [`GwwError::Validation`] if `n == 0`; otherwise the first factory error.
    pub fn initialize<F>(n: usize, mut factory: F) -> Result<Self, GwwError>
    where
        F: FnMut() -> Result<T, GwwError>,
    {
        if n == 0 {
            return Err(GwwError::validation("population size must be positive"));
        }
        let particles = (0..n).map(|_| factory()).collect::<Result<Vec<_>, _>>()?;
        Ok(Self { particles })
    }

    /// Wraps an existing, non-empty set of particles.
    ///
    /// # Errors
    /// [`GwwError::Validation`] if `particles` is empty.
    pub fn from_particles(particles: Vec<T>) -> Result<Self, GwwError> {
        if particles.is_empty() {
            return Err(GwwError::validation("population size must be positive"));
        }
        Ok(Self { particles })
    }

    /// Number of particles.
    #[inline]
    pub fn len(&self) -> usize {
        self.particles.len()
    }

    /// Whether no particle is left. Never true between rounds of a search.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.particles.is_empty()
    }

    /// The particles in slot order.
    #[inline]
    pub fn particles(&self) -> &[T] {
        &self.particles
    }

    /// Unwraps the particles.
    pub fn into_particles(self) -> Vec<T> {
        self.particles
    }

    /// Fitness of every particle, in slot order.
    pub fn fitness(&self) -> Vec<f64> {
        self.particles.iter().map(IncrementalTracker::fitness).collect()
    }

    /// The best particle in `direction` (earliest slot on ties).
    pub fn best(&self, direction: Direction) -> Option<&T> {
        let mut best: Option<&T> = None;
        for p in &self.particles {
            if best.is_none_or(|b| direction.improves(p.fitness(), b.fitness())) {
                best = Some(p);
            }
        }
        best
    }

    /// Runs [`mix`] with `steps` moves on every particle.
    ///
    /// One seed per particle is drawn from `rng` up front and fed through SplitMix64 into
    /// the particle's own `SmallRng`, so the result does not depend on `parallel`.
    ///
    /// # Errors
    /// Propagates the first mutation error.
    pub fn mix_all<P, O, R>(
        &mut self,
        steps: usize,
        policy: &P,
        rng: &mut R,
        observer: &O,
        parallel: bool,
    ) -> Result<(), GwwError>
    where
        P: MovePolicy<T>,
        O: SearchObserver<T>,
        R: Rng,
    {
        let seeds: Vec<u64> = (0..self.particles.len()).map(|_| rng.random()).collect();
        let walk = |(i, (particle, seed)): (usize, (&mut T, u64))| -> Result<(), GwwError> {
            let mut local = SmallRng::seed_from_u64(splitmix64(seed));
            mix(particle, steps, policy, &mut local, observer, i)?;
            Ok(())
        };
        if parallel {
            self.particles
                .par_iter_mut()
                .zip(seeds.into_par_iter())
                .enumerate()
                .try_for_each(walk)
        } else {
            self.particles
                .iter_mut()
                .zip(seeds)
                .enumerate()
                .try_for_each(walk)
        }
    }

    /// Keeps only the particles whose fitness satisfies `keep`.
    ///
    /// If none would survive, the population is left as it was and [`Culled::Extinct`] is
    /// returned.
    pub fn cull<F>(&mut self, keep: F) -> Culled
    where
        F: Fn(f64) -> bool,
    {
        let survivors = self.particles.iter().filter(|p| keep(p.fitness())).count();
        if survivors == 0 {
            return Culled::Extinct;
        }
        self.particles.retain(|p| keep(p.fitness()));
        Culled::Survived(survivors)
    }

    /// Appends deep copies of uniformly chosen survivors until the population holds exactly
    /// `target` particles. Only the particles present on entry are sampled from. Returns the
    /// number of copies made.
    ///
    /// # Errors
    /// [`GwwError::EmptyPopulation`] if there are no particles to copy, and
    /// [`GwwError::Validation`] if the population already holds more than `target`.
    pub fn replenish<R: Rng>(&mut self, target: usize, rng: &mut R) -> Result<usize, GwwError> {
        let survivors = self.particles.len();
        if survivors == 0 {
            return Err(GwwError::EmptyPopulation);
        }
        if survivors > target {
            return Err(GwwError::validation(format!(
                "cannot replenish {survivors} particles down to {target}"
            )));
        }
        let missing = target - survivors;
        self.particles.reserve(missing);
        for _ in 0..missing {
            let donor = rng.random_range(0..survivors);
            let copy = self.particles[donor].clone();
            self.particles.push(copy);
        }
        debug_assert_eq!(self.particles.len(), target);
        Ok(missing)
    }

    /// Snapshot of every particle for observers.
    pub fn snapshot(&self, round: usize, threshold: f64) -> RoundSnapshot<T::Value> {
        RoundSnapshot {
            round,
            threshold,
            particles: self
                .particles
                .iter()
                .map(|p| ParticleSnapshot {
                    assignment: p.assignment(),
                    score: p.score(),
                    fitness: p.fitness(),
                })
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::code::ParityCode;
    use crate::graph::Graph;
    use crate::moves::UniformFlip;
    use crate::observer::NoopObserver;
    use crate::parity::ParityTracker;
    use crate::subset::SubsetTracker;
    use rand_xorshift::XorShiftRng;
    use std::sync::Arc;

    fn parity_population(n: usize, rng: &mut XorShiftRng) -> Population<ParityTracker> {
        let code = Arc::new(ParityCode::gallager(24, 3, 4, rng).unwrap());
        Population::initialize(n, || Ok(ParityTracker::zeros(Arc::clone(&code)))).unwrap()
    }

    #[test]
    fn initialize_rejects_zero() {
        let g = Arc::new(Graph::path(3));
        let r = Population::initialize(0, || Ok(SubsetTracker::empty(Arc::clone(&g))));
        assert!(matches!(r, Err(GwwError::Validation(_))));
        assert!(Population::<SubsetTracker>::from_particles(vec![]).is_err());
    }

    #[test]
    fn initialize_propagates_factory_errors() {
        let g = Arc::new(Graph::path(3));
        let mut rng = XorShiftRng::seed_from_u64(0);
        let r = Population::initialize(4, || SubsetTracker::random(Arc::clone(&g), 9, &mut rng));
        assert!(r.is_err());
    }

    #[test]
    fn replenish_restores_size_for_every_survivor_count() {
        let mut rng = XorShiftRng::seed_from_u64(5);
        for n in 1..=12 {
            for k in 1..=n {
                let mut pop = parity_population(n, &mut rng);
                pop.particles.truncate(k);
                let added = pop.replenish(n, &mut rng).unwrap();
                assert_eq!(added, n - k);
                assert_eq!(pop.len(), n);
            }
        }
    }

    #[test]
    fn replenish_never_shrinks_an_oversized_population() {
        let mut rng = XorShiftRng::seed_from_u64(5);
        let mut pop = parity_population(5, &mut rng);
        let r = pop.replenish(3, &mut rng);
        assert!(matches!(r, Err(GwwError::Validation(_))));
        assert_eq!(pop.len(), 5);
        assert_eq!(pop.replenish(5, &mut rng), Ok(0));
        assert_eq!(pop.len(), 5);
    }

    #[test]
    fn replenish_on_empty_is_an_error() {
        let mut rng = XorShiftRng::seed_from_u64(5);
        let mut pop = parity_population(3, &mut rng);
        pop.particles.clear();
        assert_eq!(pop.replenish(3, &mut rng), Err(GwwError::EmptyPopulation));
    }

    #[test]
    fn replicas_do_not_alias() {
        let mut rng = XorShiftRng::seed_from_u64(9);
        let mut pop = parity_population(1, &mut rng);
        pop.replenish(4, &mut rng).unwrap();
        pop.particles[1].mutate(0).unwrap();
        pop.particles[2].mutate(5).unwrap();
        assert_eq!(pop.particles[0].assignment(), vec![false; 24]);
        assert_eq!(pop.particles[3].assignment(), vec![false; 24]);
        assert!(pop.particles[1].bit(0).unwrap());
        assert!(!pop.particles[2].bit(0).unwrap());
        assert_eq!(pop.particles[0].score(), pop.particles[0].score_from_scratch());
    }

    #[test]
    fn cull_keeps_passing_particles_or_reports_extinction() {
        let g = Arc::new(Graph::complete(5));
        let sizes = [0usize, 1, 2, 3, 4];
        let mut pop = Population::from_particles(
            sizes
                .iter()
                .map(|&k| SubsetTracker::new(Arc::clone(&g), &(0..k).collect::<Vec<_>>()).unwrap())
                .collect(),
        )
        .unwrap();
        assert_eq!(pop.cull(|f| f > 2.0), Culled::Extinct);
        assert_eq!(pop.len(), 5);
        assert_eq!(pop.cull(|f| f < 0.5), Culled::Survived(2));
        assert_eq!(pop.len(), 2);
        assert!(pop.particles().iter().all(|p| p.size() <= 1));
    }

    #[test]
    fn best_respects_direction() {
        let g = Arc::new(Graph::path(4));
        let pop = Population::from_particles(vec![
            SubsetTracker::new(Arc::clone(&g), &[0, 1]).unwrap(),
            SubsetTracker::new(Arc::clone(&g), &[0, 2]).unwrap(),
            SubsetTracker::new(Arc::clone(&g), &[1, 2, 3]).unwrap(),
        ])
        .unwrap();
        assert_eq!(pop.best(Direction::Minimize).unwrap().members(), vec![0, 2]);
        assert_eq!(pop.best(Direction::Maximize).unwrap().members(), vec![0, 1]);
    }

    #[test]
    fn serial_and_parallel_mixing_agree() {
        let mut rng = XorShiftRng::seed_from_u64(1);
        let base = parity_population(16, &mut rng);
        let mut serial = base.clone();
        let mut parallel = base;
        let mut r1 = XorShiftRng::seed_from_u64(77);
        let mut r2 = XorShiftRng::seed_from_u64(77);
        serial.mix_all(40, &UniformFlip, &mut r1, &NoopObserver, false).unwrap();
        parallel.mix_all(40, &UniformFlip, &mut r2, &NoopObserver, true).unwrap();
        for (a, b) in serial.particles().iter().zip(parallel.particles()) {
            assert_eq!(a.assignment(), b.assignment());
            assert_eq!(a.score(), b.score());
        }
        assert!(serial.particles().iter().any(|p| p.score() != p.total_weight()));
    }

    #[test]
    fn snapshot_records_every_particle() {
        let mut rng = XorShiftRng::seed_from_u64(2);
        let pop = parity_population(3, &mut rng);
        let snap = pop.snapshot(4, 1.5);
        assert_eq!(snap.round, 4);
        assert_eq!(snap.threshold, 1.5);
        assert_eq!(snap.particles.len(), 3);
        assert_eq!(snap.particles[0].score, pop.particles()[0].score());
    }
}
