//! Read-only instrumentation hooks for a GWW run.
//!
//! Observers are invoked synchronously: once per applied mutation (possibly from several
//! worker threads at once while particles mix in parallel) and once at the end of every
//! round. They receive shared references only and cannot influence the search.

use crate::tracker::IncrementalTracker;
use crossbeam::channel::{unbounded, Receiver, Sender};
use tracing::{debug, trace};

/// One particle as recorded in a [`RoundSnapshot`].
#[derive(Clone, Debug, PartialEq)]
pub struct ParticleSnapshot<V> {
    /// Copy of the particle's assignment.
    pub assignment: Vec<V>,
    /// Aggregate score.
    pub score: i64,
    /// Fitness the search ranks by.
    pub fitness: f64,
}

/// The population at the end of a round.
#[derive(Clone, Debug, PartialEq)]
pub struct RoundSnapshot<V> {
    /// 1-based round index.
    pub round: usize,
    /// Threshold in force after the round.
    pub threshold: f64,
    /// Every particle, in slot order.
    pub particles: Vec<ParticleSnapshot<V>>,
}

impl<V> RoundSnapshot<V> {
    /// Lowest fitness in the snapshot, if any particle was recorded.
    pub fn min_fitness(&self) -> Option<f64> {
        self.particles.iter().map(|p| p.fitness).min_by(f64::total_cmp)
    }

    /// Highest fitness in the snapshot, if any particle was recorded.
    pub fn max_fitness(&self) -> Option<f64> {
        self.particles.iter().map(|p| p.fitness).max_by(f64::total_cmp)
    }
}

/// Hooks called by the search. Every method has a no-op default.
pub trait SearchObserver<T: IncrementalTracker>: Sync {
    /// Called after `mv` was applied to particle `particle`.
    #[inline]
    fn on_mutation(&self, _particle: usize, _mv: T::Move, _tracker: &T) {}

    /// Called at the end of every round, including the terminating one.
    #[inline]
    fn on_round(&self, _snapshot: &RoundSnapshot<T::Value>) {}

    /// Whether [`Self::on_round`] should receive the full population. Building a snapshot
    /// copies every assignment, so it is skipped unless requested.
    #[inline]
    fn wants_snapshots(&self) -> bool {
        false
    }
}

/// Observes nothing.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopObserver;

impl<T: IncrementalTracker> SearchObserver<T> for NoopObserver {}

/// Logs round summaries at `debug` and every mutation at `trace`.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingObserver;

impl<T: IncrementalTracker> SearchObserver<T> for TracingObserver {
    fn on_mutation(&self, particle: usize, mv: T::Move, tracker: &T) {
        trace!(particle, ?mv, score = tracker.score(), "mutation");
    }

    fn on_round(&self, snapshot: &RoundSnapshot<T::Value>) {
        debug!(
            round = snapshot.round,
            threshold = snapshot.threshold,
            particles = snapshot.particles.len(),
            min_fitness = ?snapshot.min_fitness(),
            max_fitness = ?snapshot.max_fitness(),
            "round snapshot"
        );
    }

    fn wants_snapshots(&self) -> bool {
        true
    }
}

/// Forwards every round snapshot into a channel for an external recorder.
#[derive(Clone, Debug)]
pub struct ChannelCollector<V> {
    tx: Sender<RoundSnapshot<V>>,
}

impl<V> ChannelCollector<V> {
    /// Creates the collector and the receiving end of its unbounded channel.
    pub fn new() -> (Self, Receiver<RoundSnapshot<V>>) {
        let (tx, rx) = unbounded();
        (Self { tx }, rx)
    }
}

impl<T> SearchObserver<T> for ChannelCollector<T::Value>
where
    T: IncrementalTracker,
{
    fn on_round(&self, snapshot: &RoundSnapshot<T::Value>) {
        // A dropped receiver only means nobody is recording any more.
        let _ = self.tx.send(snapshot.clone());
    }

    fn wants_snapshots(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::Graph;
    use crate::subset::SubsetTracker;

    fn snapshot() -> RoundSnapshot<bool> {
        RoundSnapshot {
            round: 3,
            threshold: 0.5,
            particles: vec![
                ParticleSnapshot { assignment: vec![true, false], score: 1, fitness: 0.75 },
                ParticleSnapshot { assignment: vec![false, false], score: 0, fitness: 0.25 },
            ],
        }
    }

    #[test]
    fn fitness_extremes() {
        let s = snapshot();
        assert_eq!(s.min_fitness(), Some(0.25));
        assert_eq!(s.max_fitness(), Some(0.75));
        let empty: RoundSnapshot<bool> = RoundSnapshot { round: 0, threshold: 0.0, particles: vec![] };
        assert_eq!(empty.min_fitness(), None);
    }

    #[test]
    fn channel_collector_forwards_snapshots() {
        let (collector, rx) = ChannelCollector::<bool>::new();
        assert!(<ChannelCollector<bool> as SearchObserver<SubsetTracker>>::wants_snapshots(&collector));
        SearchObserver::<SubsetTracker>::on_round(&collector, &snapshot());
        assert_eq!(rx.try_recv().unwrap(), snapshot());
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn channel_collector_survives_dropped_receiver() {
        let (collector, rx) = ChannelCollector::<bool>::new();
        drop(rx);
        SearchObserver::<SubsetTracker>::on_round(&collector, &snapshot());
    }

    #[test]
    fn noop_observer_declines_snapshots() {
        let t = SubsetTracker::empty(std::sync::Arc::new(Graph::path(2)));
        assert!(!<NoopObserver as SearchObserver<SubsetTracker>>::wants_snapshots(&NoopObserver));
        SearchObserver::<SubsetTracker>::on_mutation(&NoopObserver, 0, 1, &t);
    }
}
