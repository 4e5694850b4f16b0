//! Vertex-subset tracker: membership, internal edge count and density.
//!
//! The aggregate score is the number of edges with both endpoints in the subset; a lower
//! density subset is closer to an independent set. Toggling vertex `v` changes the score by
//! `+internal_degree(v)` when adding and `-internal_degree(v)` when removing, where
//! `internal_degree(v)` is the number of neighbours of `v` currently in the subset. That
//! count is cached for every vertex and patched along `v`'s neighbourhood on each toggle.

use crate::error::{check_index, GwwError};
use crate::graph::Graph;
use crate::tracker::IncrementalTracker;
use rand::Rng;
use std::sync::Arc;

/// Tracks a vertex subset of a shared [`Graph`].
///
/// Members and non-members are additionally kept in two index lists (`inside`, `outside`)
/// with a back-pointer `slot[v]` into whichever list holds `v`, so a uniformly random member
/// or non-member is an `O(1)` pick.
#[derive(Clone, Debug)]
pub struct SubsetTracker {
    ground: Arc<Graph>,
    member: Vec<bool>,
    internal_degree: Vec<u32>,
    edges_inside: i64,
    inside: Vec<usize>,
    outside: Vec<usize>,
    slot: Vec<usize>,
}

impl SubsetTracker {
    /// Creates a tracker holding the empty subset.
    pub fn empty(ground: Arc<Graph>) -> Self {
        let n = ground.vertex_count();
        Self::from_membership(ground, vec![false; n])
    }

    /// Creates a tracker holding `initial`. Repeated vertices are collapsed.
    ///
    /// # Errors
    /// Returns [`GwwError::IndexOutOfRange`] if a vertex is out of range.
    pub fn new(ground: Arc<Graph>, initial: &[usize]) -> Result<Self, GwwError> {
        let n = ground.vertex_count();
        let mut member = vec![false; n];
        for &v in initial {
            check_index(v, n)?;
            member[v] = true;
        }
        Ok(Self::from_membership(ground, member))
    }

    /// Creates a tracker holding a uniformly random subset of exactly `size` vertices.
    ///
    /// # Errors
    /// Returns [`GwwError::Validation`] if `size` exceeds the number of vertices.
    pub fn random<R: Rng>(ground: Arc<Graph>, size: usize, rng: &mut R) -> Result<Self, GwwError> {
        let n = ground.vertex_count();
        if size > n {
            return Err(GwwError::validation(format!(
                "requested subset size {size} exceeds the {n} vertices of the graph"
            )));
        }
        let chosen = rand::seq::index::sample(rng, n, size).into_vec();
        Self::new(ground, &chosen)
    }

    /// Builds every cache from scratch.
    fn from_membership(ground: Arc<Graph>, member: Vec<bool>) -> Self {
        let n = ground.vertex_count();
        let mut internal_degree = vec![0u32; n];
        let mut inside = Vec::new();
        let mut outside = Vec::new();
        let mut slot = vec![0usize; n];
        for v in 0..n {
            internal_degree[v] = ground
                .neighbors_unchecked(v)
                .iter()
                .filter(|&&u| member[u])
                .count() as u32;
            if member[v] {
                slot[v] = inside.len();
                inside.push(v);
            } else {
                slot[v] = outside.len();
                outside.push(v);
            }
        }
        let edges_inside = ground.edges_within(&member) as i64;
        Self {
            ground,
            member,
            internal_degree,
            edges_inside,
            inside,
            outside,
            slot,
        }
    }

    /// Whether `v` is in the subset.
    ///
    /// # Errors
    /// Returns [`GwwError::IndexOutOfRange`] if `v` is out of range.
    #[inline]
    pub fn contains(&self, v: usize) -> Result<bool, GwwError> {
        check_index(v, self.member.len())?;
        Ok(self.member[v])
    }

    /// Number of vertices in the subset.
    #[inline]
    pub fn size(&self) -> usize {
        self.inside.len()
    }

    /// Number of edges with both endpoints in the subset.
    #[inline]
    pub fn edges_inside(&self) -> i64 {
        self.edges_inside
    }

    /// Number of neighbours of `v` that are in the subset.
    ///
    /// # Errors
    /// Returns [`GwwError::IndexOutOfRange`] if `v` is out of range.
    #[inline]
    pub fn internal_degree(&self, v: usize) -> Result<u32, GwwError> {
        check_index(v, self.member.len())?;
        Ok(self.internal_degree[v])
    }

    /// Edge density of the induced subgraph: `edges / C(size, 2)`, or `0` for `size <= 1`.
    pub fn density(&self) -> f64 {
        let k = self.size();
        if k <= 1 {
            return 0.0;
        }
        let pairs = (k * (k - 1) / 2) as f64;
        self.edges_inside as f64 / pairs
    }

    /// Members in ascending order.
    pub fn members(&self) -> Vec<usize> {
        let mut out = self.inside.clone();
        out.sort_unstable();
        out
    }

    /// Uniformly random member, or `None` for the empty subset.
    #[inline]
    pub fn random_member<R: Rng>(&self, rng: &mut R) -> Option<usize> {
        if self.inside.is_empty() {
            None
        } else {
            Some(self.inside[rng.random_range(0..self.inside.len())])
        }
    }

    /// Uniformly random non-member, or `None` when every vertex is a member.
    #[inline]
    pub fn random_non_member<R: Rng>(&self, rng: &mut R) -> Option<usize> {
        if self.outside.is_empty() {
            None
        } else {
            Some(self.outside[rng.random_range(0..self.outside.len())])
        }
    }

    /// Adds `add` and removes `remove` in one step, keeping the subset size constant.
    ///
    /// # Errors
    /// Returns [`GwwError::IndexOutOfRange`] for out-of-range vertices and
    /// [`GwwError::Validation`] if `add` is already a member or `remove` is not one.
    pub fn swap(&mut self, add: usize, remove: usize) -> Result<(), GwwError> {
        if self.contains(add)? {
            return Err(GwwError::validation(format!("vertex {add} is already a member")));
        }
        if !self.contains(remove)? {
            return Err(GwwError::validation(format!("vertex {remove} is not a member")));
        }
        self.toggle(add);
        self.toggle(remove);
        Ok(())
    }

    /// Moves `v` between the `inside` and `outside` lists.
    #[inline]
    fn relocate(&mut self, v: usize, now_member: bool) {
        let (from, to) = if now_member {
            (&mut self.outside, &mut self.inside)
        } else {
            (&mut self.inside, &mut self.outside)
        };
        let at = self.slot[v];
        from.swap_remove(at);
        if let Some(&moved) = from.get(at) {
            self.slot[moved] = at;
        }
        self.slot[v] = to.len();
        to.push(v);
    }

    /// Flips membership of an already validated vertex.
    #[inline]
    fn toggle(&mut self, v: usize) {
        let ground = Arc::clone(&self.ground);
        let neighbors = ground.neighbors_unchecked(v);
        if self.member[v] {
            self.member[v] = false;
            self.edges_inside -= i64::from(self.internal_degree[v]);
            for &u in neighbors {
                debug_assert!(self.internal_degree[u] > 0);
                self.internal_degree[u] -= 1;
            }
            self.relocate(v, false);
        } else {
            for &u in neighbors {
                self.internal_degree[u] += 1;
            }
            self.edges_inside += i64::from(self.internal_degree[v]);
            self.member[v] = true;
            self.relocate(v, true);
        }
    }
}

impl IncrementalTracker for SubsetTracker {
    type Ground = Graph;
    type Value = bool;
    type Move = usize;

    #[inline]
    fn ground(&self) -> &Arc<Graph> {
        &self.ground
    }

    #[inline]
    fn score(&self) -> i64 {
        self.edges_inside
    }

    #[inline]
    fn fitness(&self) -> f64 {
        self.density()
    }

    #[inline]
    fn marginal(&self, element: usize) -> Result<i64, GwwError> {
        check_index(element, self.member.len())?;
        let d = i64::from(self.internal_degree[element]);
        Ok(if self.member[element] { -d } else { d })
    }

    fn mutate(&mut self, mv: usize) -> Result<usize, GwwError> {
        check_index(mv, self.member.len())?;
        self.toggle(mv);
        Ok(mv)
    }

    fn assignment(&self) -> Vec<bool> {
        self.member.clone()
    }

    fn score_from_scratch(&self) -> i64 {
        self.ground.edges_within(&self.member) as i64
    }

    fn rebuild(&self) -> Self {
        Self::from_membership(Arc::clone(&self.ground), self.member.clone())
    }
}
