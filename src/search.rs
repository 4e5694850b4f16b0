//! Go-With-the-Winners search driver.
//!
//! Each round mixes every particle, proposes a new threshold from the population's fitness,
//! culls the particles that fail it and refills the population from the survivors:
//!
//! ```text
//! RUNNING --(proposal does not improve)--> STALLED
//! RUNNING --(cull leaves nobody)---------> EXHAUSTED
//! RUNNING --(threshold reaches goal)-----> SUCCEEDED
//! ```

use crate::error::GwwError;
use crate::moves::MovePolicy;
use crate::observer::{NoopObserver, SearchObserver};
use crate::population::{Culled, Population};
use crate::schedule::ThresholdSchedule;
use crate::tracker::IncrementalTracker;
use rand::rngs::SmallRng;
use rand::SeedableRng;
use std::fmt;
use tracing::{debug, info, warn};

// ============================================================================
// Configuration
// ============================================================================

/// Search configuration parameters.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GwwConfig {
    /// Number of particles kept after every replenish.
    pub population_size: usize,
    /// Random-walk steps applied to every particle per round.
    pub walk_length: usize,
    /// Optional deterministic base seed.
    pub seed: Option<u64>,
    /// Mix particles on the rayon thread pool.
    pub parallel: bool,
    /// Stop after this many rounds even if still running.
    pub max_rounds: Option<usize>,
}

impl Default for GwwConfig {
    fn default() -> Self {
        Self {
            population_size: 64,
            walk_length: 64,
            seed: None,
            parallel: true,
            max_rounds: None,
        }
    }
}

impl GwwConfig {
    /// # Errors
    /// [`GwwError::Validation`] for an empty population or a zero round limit.
    pub fn validate(&self) -> Result<(), GwwError> {
        if self.population_size == 0 {
            return Err(GwwError::validation("population size must be positive"));
        }
        if self.max_rounds == Some(0) {
            return Err(GwwError::validation("round limit must be positive"));
        }
        Ok(())
    }
}

// ============================================================================
// State and outcome
// ============================================================================

/// Where a search stands. Every state but `Running` is terminal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SearchState {
    /// More rounds may run.
    Running,
    /// The threshold reached the goal with survivors.
    Succeeded,
    /// The schedule proposed a threshold that does not strictly improve.
    Stalled,
    /// A cull left no particle; the population is the one that failed it.
    Exhausted,
}

impl SearchState {
    /// Whether stepping further is a no-op.
    #[inline]
    pub fn is_terminal(self) -> bool {
        self != SearchState::Running
    }
}

impl fmt::Display for SearchState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SearchState::Running => "RUNNING",
            SearchState::Succeeded => "SUCCEEDED",
            SearchState::Stalled => "STALLED",
            SearchState::Exhausted => "EXHAUSTED",
        };
        f.write_str(s)
    }
}

/// Result of [`GwwSearch::run`].
#[derive(Clone, Debug)]
pub struct SearchOutcome<T> {
    /// State when the run stopped.
    pub state: SearchState,
    /// Best particle present when the run stopped. For `EXHAUSTED` this is the best
    /// particle of the population that failed the last cull.
    pub best: T,
    /// Best particle observed after any mixing phase.
    pub best_seen: T,
    /// Rounds executed.
    pub rounds: usize,
    /// Final threshold.
    pub threshold: f64,
    /// Every threshold adopted, in order.
    pub history: Vec<f64>,
}

impl<T> SearchOutcome<T> {
    /// Whether the run ended in [`SearchState::Succeeded`].
    #[inline]
    pub fn succeeded(&self) -> bool {
        self.state == SearchState::Succeeded
    }
}

// ============================================================================
// Driver
// ============================================================================

/// A GWW run over trackers of type `T`, walking with `P`, thresholded by `S` and observed
/// by `O`.
pub struct GwwSearch<T, P, S, O = NoopObserver>
where
    T: IncrementalTracker,
{
    config: GwwConfig,
    policy: P,
    schedule: S,
    observer: O,
    population: Population<T>,
    best_seen: T,
    rng: SmallRng,
    threshold: f64,
    state: SearchState,
    round: usize,
    history: Vec<f64>,
}

impl<T, P, S> GwwSearch<T, P, S, NoopObserver>
where
    T: IncrementalTracker,
    P: MovePolicy<T>,
    S: ThresholdSchedule,
{
    /// Validates the configuration and schedule and builds the initial population by
    /// calling `seed_factory` once per particle with the run's master RNG.
    ///
    /// # Errors
    /// [`GwwError::Validation`] for an invalid configuration or schedule; otherwise the
    /// first error of `seed_factory`.
    pub fn new<F>(config: GwwConfig, policy: P, schedule: S, mut seed_factory: F) -> Result<Self, GwwError>
    where
        F: FnMut(&mut SmallRng) -> Result<T, GwwError>,
    {
        config.validate()?;
        schedule.validate()?;
        let base_seed = config.seed.unwrap_or_else(random_u64);
        let mut rng = SmallRng::seed_from_u64(splitmix64(base_seed));
        let population = Population::initialize(config.population_size, || seed_factory(&mut rng))?;
        let best_seen = population
            .best(schedule.direction())
            .cloned()
            .ok_or(GwwError::EmptyPopulation)?;
        let threshold = schedule.initial();
        debug!(
            population = config.population_size,
            walk_length = config.walk_length,
            seed = base_seed,
            threshold,
            "gww search initialised"
        );
        Ok(Self {
            config,
            policy,
            schedule,
            observer: NoopObserver,
            population,
            best_seen,
            rng,
            threshold,
            state: SearchState::Running,
            round: 0,
            history: Vec::new(),
        })
    }
}

impl<T, P, S, O> GwwSearch<T, P, S, O>
where
    T: IncrementalTracker,
    P: MovePolicy<T>,
    S: ThresholdSchedule,
    O: SearchObserver<T>,
{
    /// Replaces the observer.
    pub fn with_observer<O2: SearchObserver<T>>(self, observer: O2) -> GwwSearch<T, P, S, O2> {
        GwwSearch {
            config: self.config,
            policy: self.policy,
            schedule: self.schedule,
            observer,
            population: self.population,
            best_seen: self.best_seen,
            rng: self.rng,
            threshold: self.threshold,
            state: self.state,
            round: self.round,
            history: self.history,
        }
    }

    /// Current state.
    #[inline]
    pub fn state(&self) -> SearchState {
        self.state
    }

    /// Rounds executed so far.
    #[inline]
    pub fn round(&self) -> usize {
        self.round
    }

    /// Threshold in force.
    #[inline]
    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Particles as of the last completed round.
    #[inline]
    pub fn population(&self) -> &Population<T> {
        &self.population
    }

    /// Thresholds adopted so far, oldest first.
    #[inline]
    pub fn history(&self) -> &[f64] {
        &self.history
    }

    /// Best particle observed after any mixing phase.
    #[inline]
    pub fn best_seen(&self) -> &T {
        &self.best_seen
    }

    /// The attached observer.
    #[inline]
    pub fn observer(&self) -> &O {
        &self.observer
    }

    /// Advances exactly one round and returns the resulting state. A terminal search is
    /// left as it is.
    ///
    /// # Errors
    /// Propagates tracker errors raised while mixing.
    pub fn step(&mut self) -> Result<SearchState, GwwError> {
        if self.state.is_terminal() {
            return Ok(self.state);
        }
        self.round += 1;
        let direction = self.schedule.direction();

        self.population.mix_all(
            self.config.walk_length,
            &self.policy,
            &mut self.rng,
            &self.observer,
            self.config.parallel,
        )?;
        if let Some(best) = self.population.best(direction)
            && direction.improves(best.fitness(), self.best_seen.fitness())
        {
            self.best_seen = best.clone();
        }

        let proposed = self.schedule.propose(self.threshold, &self.population.fitness());
        if direction.improves(proposed, self.threshold) {
            self.threshold = proposed;
            self.history.push(proposed);
            let threshold = proposed;
            match self.population.cull(|f| direction.passes(f, threshold)) {
                Culled::Extinct => self.state = SearchState::Exhausted,
                Culled::Survived(survivors) => {
                    self.population.replenish(self.config.population_size, &mut self.rng)?;
                    debug!(round = self.round, threshold, survivors, "gww round");
                    if direction.reached(threshold, self.schedule.goal()) {
                        self.state = SearchState::Succeeded;
                    }
                }
            }
        } else {
            self.state = SearchState::Stalled;
        }

        if self.observer.wants_snapshots() {
            let snapshot = self.population.snapshot(self.round, self.threshold);
            self.observer.on_round(&snapshot);
        }
        match self.state {
            SearchState::Stalled => warn!(
                round = self.round,
                threshold = self.threshold,
                proposed,
                "gww stalled: threshold proposal does not improve"
            ),
            SearchState::Exhausted => warn!(
                round = self.round,
                threshold = self.threshold,
                "gww exhausted: no particle survived the cull"
            ),
            _ => {}
        }
        Ok(self.state)
    }

    /// Steps until a terminal state or the configured round limit.
    ///
    /// # Errors
    /// Propagates the first error of [`Self::step`].
    pub fn run(mut self) -> Result<SearchOutcome<T>, GwwError> {
        while !self.state.is_terminal() {
            if self.config.max_rounds.is_some_and(|limit| self.round >= limit) {
                break;
            }
            self.step()?;
        }
        self.into_outcome()
    }

    /// Packages the current state as an outcome without stepping further.
    ///
    /// # Errors
    /// [`GwwError::EmptyPopulation`] if the population is empty, which cannot happen for a
    /// search built through [`GwwSearch::new`].
    pub fn into_outcome(self) -> Result<SearchOutcome<T>, GwwError> {
        let direction = self.schedule.direction();
        let best = self
            .population
            .best(direction)
            .cloned()
            .ok_or(GwwError::EmptyPopulation)?;
        info!(
            state = %self.state,
            rounds = self.round,
            threshold = self.threshold,
            best_fitness = best.fitness(),
            best_seen_fitness = self.best_seen.fitness(),
            "gww search finished"
        );
        Ok(SearchOutcome {
            state: self.state,
            best,
            best_seen: self.best_seen,
            rounds: self.round,
            threshold: self.threshold,
            history: self.history,
        })
    }
}

fn random_u64() -> u64 {
    rand::random::<u64>()
}

/// SplitMix64 mixer for deriving independent RNG seeds from a single draw.
#[inline]
pub(crate) fn splitmix64(mut x: u64) -> u64 {
    x = x.wrapping_add(0x9E37_79B9_7F4A_7C15);
    let mut z = x;
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

// ============================================================================
// Tests
// ============================================================================
