//! Steepest-descent polish driven by the marginal cache.
//!
//! On a [`crate::subset::SubsetTracker`] minimising the internal edge count, [`descend`]
//! drops the vertex with the most internal neighbours until the subset is independent. On a
//! [`crate::parity::ParityTracker`] maximising satisfied weight it is the classical
//! bit-flipping decoder.

use crate::coloring::{ColoringTracker, Recolor};
use crate::error::GwwError;
use crate::schedule::Direction;
use crate::tracker::IncrementalTracker;

/// Repeatedly flips the element whose marginal improves the score the most (strictly),
/// lowest index on ties, until no improving flip remains or `max_steps` flips were made.
/// Returns the number of flips.
///
/// # Errors
/// Propagates tracker errors.
pub fn descend<T>(tracker: &mut T, direction: Direction, max_steps: Option<usize>) -> Result<usize, GwwError>
where
    T: IncrementalTracker<Move = usize>,
{
    let mut steps = 0;
    while max_steps.is_none_or(|limit| steps < limit) {
        let mut best: Option<(usize, i64)> = None;
        for e in 0..tracker.len() {
            let d = tracker.marginal(e)?;
            if !direction.improves(d as f64, 0.0) {
                continue;
            }
            if best.is_none_or(|(_, b)| direction.improves(d as f64, b as f64)) {
                best = Some((e, d));
            }
        }
        let Some((e, _)) = best else {
            break;
        };
        tracker.mutate(e)?;
        steps += 1;
    }
    Ok(steps)
}

/// Colouring counterpart of [`descend`]: applies the best conflict-reducing recolouring
/// until none exists or `max_steps` were made.
///
/// # Errors
/// Propagates tracker errors.
pub fn descend_coloring(tracker: &mut ColoringTracker, max_steps: Option<usize>) -> Result<usize, GwwError> {
    let mut steps = 0;
    while max_steps.is_none_or(|limit| steps < limit) {
        let mut best: Option<(Recolor, i64)> = None;
        for node in 0..tracker.len() {
            if let Some((color, d)) = tracker.best_recoloring(node)?
                && d < 0
                && best.is_none_or(|(_, b)| d < b)
            {
                best = Some((Recolor { node, color }, d));
            }
        }
        let Some((mv, _)) = best else {
            break;
        };
        tracker.mutate(mv)?;
        steps += 1;
    }
    Ok(steps)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::code::ParityCode;
    use crate::graph::Graph;
    use crate::parity::ParityTracker;
    use crate::subset::SubsetTracker;
    use rand::SeedableRng;
    use rand_xorshift::XorShiftRng;
    use std::sync::Arc;

    #[test]
    fn descend_recovers_an_independent_set() {
        let mut rng = XorShiftRng::seed_from_u64(12);
        let g = Arc::new(Graph::erdos_renyi(40, 0.2, &mut rng).unwrap());
        let mut t = SubsetTracker::random(Arc::clone(&g), 20, &mut rng).unwrap();
        descend(&mut t, Direction::Minimize, None).unwrap();
        assert_eq!(t.score(), 0);
        assert!(g.is_independent(&t.members()));
        assert!(t.size() > 0);
    }

    #[test]
    fn descend_decodes_a_single_error() {
        let code = Arc::new(
            ParityCode::from_checks(4, vec![vec![0, 1, 2], vec![1, 2, 3], vec![0, 1, 3]]).unwrap(),
        );
        let mut t = ParityTracker::zeros(code);
        t.mutate(1).unwrap();
        let steps = descend(&mut t, Direction::Maximize, None).unwrap();
        assert_eq!(steps, 1);
        assert!(t.is_codeword());
        assert_eq!(t.assignment(), vec![false; 4]);
    }

    #[test]
    fn descend_honours_step_budget() {
        let g = Arc::new(Graph::complete(6));
        let mut t = SubsetTracker::new(g, &[0, 1, 2, 3, 4, 5]).unwrap();
        assert_eq!(descend(&mut t, Direction::Minimize, Some(2)).unwrap(), 2);
        assert_eq!(t.size(), 4);
        assert_eq!(descend(&mut t, Direction::Minimize, Some(0)).unwrap(), 0);
    }

    #[test]
    fn descend_coloring_never_increases_conflicts() {
        let mut rng = XorShiftRng::seed_from_u64(21);
        let g = Arc::new(Graph::erdos_renyi(30, 0.2, &mut rng).unwrap());
        let mut t = ColoringTracker::random(g, 4, &mut rng).unwrap();
        let before = t.score();
        let steps = descend_coloring(&mut t, None).unwrap();
        assert!(t.score() + steps as i64 <= before);
        for v in 0..t.len() {
            assert!(t.marginal(v).unwrap() >= 0);
        }
        assert_eq!(t.score(), t.score_from_scratch());
    }

    #[test]
    fn descend_coloring_solves_a_path() {
        let g = Arc::new(Graph::path(6));
        let mut t = ColoringTracker::uniform(g, 2).unwrap();
        descend_coloring(&mut t, None).unwrap();
        assert!(t.is_proper());
    }
}
