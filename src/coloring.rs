//! k-colouring tracker: conflicting-edge count with per-vertex neighbour palettes.
//!
//! `palette[v * k + c]` counts the neighbours of `v` that currently carry colour `c`, so the
//! score change of recolouring `v` from `a` to `b` is `palette[v][b] - palette[v][a]` and is
//! available in `O(1)`. Recolouring patches the palettes of `v`'s neighbours only.
//!
//! The marginal of a vertex is the best (most negative) change any single recolouring of it
//! can achieve; it is `0` when only one colour exists. Marginals are cached per vertex and
//! refreshed for the recoloured vertex and its neighbours, so a recolouring costs
//! `O((deg + 1) * k)` and reading a marginal costs `O(1)`.

use crate::error::{check_index, GwwError};
use crate::graph::Graph;
use crate::tracker::IncrementalTracker;
use rand::Rng;
use std::sync::Arc;

/// Assign colour `color` to vertex `node`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Recolor {
    /// Vertex to recolour.
    pub node: usize,
    /// Its new colour, `< k`.
    pub color: usize,
}

/// A `k`-colouring of a [`Graph`] scored by its number of conflicting edges.
#[derive(Clone, Debug)]
pub struct ColoringTracker {
    ground: Arc<Graph>,
    k: usize,
    colors: Vec<usize>,
    palette: Vec<u32>,
    marginals: Vec<i64>,
    conflicts: i64,
}

impl ColoringTracker {
    /// Tracks `colors` (one entry per vertex, each `< k`).
    ///
    /// # Errors
    /// [`GwwError::Validation`] if `k == 0` or the length is wrong;
    /// [`GwwError::IndexOutOfRange`] if a colour is `>= k`.
    pub fn new(ground: Arc<Graph>, k: usize, colors: Vec<usize>) -> Result<Self, GwwError> {
        if k == 0 {
            return Err(GwwError::validation("a colouring needs at least one colour"));
        }
        if colors.len() != ground.vertex_count() {
            return Err(GwwError::validation(format!(
                "colouring has {} entries but the graph has {} vertices",
                colors.len(),
                ground.vertex_count()
            )));
        }
        for &c in &colors {
            check_index(c, k)?;
        }
        Ok(Self::from_colors(ground, k, colors))
    }

    /// Every vertex coloured `0`.
    ///
    /// # Errors
    /// [`GwwError::Validation`] if `k == 0`.
    pub fn uniform(ground: Arc<Graph>, k: usize) -> Result<Self, GwwError> {
        let n = ground.vertex_count();
        Self::new(ground, k, vec![0; n])
    }

    /// Independent uniform colour per vertex.
    ///
    /// # Errors
    /// [`GwwError::Validation`] if `k == 0`.
    pub fn random<R: Rng>(ground: Arc<Graph>, k: usize, rng: &mut R) -> Result<Self, GwwError> {
        if k == 0 {
            return Err(GwwError::validation("a colouring needs at least one colour"));
        }
        let colors = (0..ground.vertex_count()).map(|_| rng.random_range(0..k)).collect();
        Ok(Self::from_colors(ground, k, colors))
    }

    fn from_colors(ground: Arc<Graph>, k: usize, colors: Vec<usize>) -> Self {
        let n = ground.vertex_count();
        let mut palette = vec![0u32; n * k];
        let mut twice_conflicts = 0i64;
        for v in 0..n {
            for &u in ground.neighbors_unchecked(v) {
                palette[v * k + colors[u]] += 1;
                if colors[u] == colors[v] {
                    twice_conflicts += 1;
                }
            }
        }
        let mut tracker = Self {
            ground,
            k,
            colors,
            palette,
            marginals: vec![0; n],
            conflicts: twice_conflicts / 2,
        };
        for v in 0..n {
            tracker.marginals[v] = tracker.best_delta(v);
        }
        tracker
    }

    #[inline(always)]
    fn count(&self, v: usize, c: usize) -> i64 {
        i64::from(self.palette[v * self.k + c])
    }

    /// Lowest delta over the other colours of `v`, read from the palette.
    fn best_delta(&self, v: usize) -> i64 {
        let cur = self.colors[v];
        let here = self.count(v, cur);
        (0..self.k)
            .filter(|&c| c != cur)
            .map(|c| self.count(v, c) - here)
            .min()
            .unwrap_or(0)
    }

    /// Colour of `v`.
    ///
    /// # Errors
    /// [`GwwError::IndexOutOfRange`] if `v` is out of range.
    #[inline]
    pub fn color_of(&self, v: usize) -> Result<usize, GwwError> {
        check_index(v, self.colors.len())?;
        Ok(self.colors[v])
    }

    /// Palette size `k`.
    #[inline]
    pub fn num_colors(&self) -> usize {
        self.k
    }

    /// Number of conflicting edges; `0` means the colouring is proper.
    #[inline]
    pub fn conflicts(&self) -> i64 {
        self.conflicts
    }

    /// Whether no edge joins two vertices of the same colour.
    #[inline]
    pub fn is_proper(&self) -> bool {
        self.conflicts == 0
    }

    /// Number of neighbours of `v` sharing its colour.
    ///
    /// # Errors
    /// [`GwwError::IndexOutOfRange`] if `v` is out of range.
    #[inline]
    pub fn conflicts_at(&self, v: usize) -> Result<u32, GwwError> {
        check_index(v, self.colors.len())?;
        Ok(self.palette[v * self.k + self.colors[v]])
    }

    /// Score change of recolouring `v` to `color`.
    ///
    /// # Errors
    /// [`GwwError::IndexOutOfRange`] for an out-of-range vertex or colour.
    pub fn recolor_delta(&self, v: usize, color: usize) -> Result<i64, GwwError> {
        check_index(v, self.colors.len())?;
        check_index(color, self.k)?;
        Ok(self.count(v, color) - self.count(v, self.colors[v]))
    }

    /// The colour other than the current one with the lowest delta (lowest colour on ties),
    /// or `None` when `k == 1`.
    ///
    /// # Errors
    /// [`GwwError::IndexOutOfRange`] if `v` is out of range.
    pub fn best_recoloring(&self, v: usize) -> Result<Option<(usize, i64)>, GwwError> {
        check_index(v, self.colors.len())?;
        let cur = self.colors[v];
        let here = self.count(v, cur);
        let mut best: Option<(usize, i64)> = None;
        for c in (0..self.k).filter(|&c| c != cur) {
            let delta = self.count(v, c) - here;
            if best.is_none_or(|(_, d)| delta < d) {
                best = Some((c, delta));
            }
        }
        Ok(best)
    }

    /// Number of distinct colours among the neighbours of `v` (DSatur saturation).
    ///
    /// # Errors
    /// [`GwwError::IndexOutOfRange`] if `v` is out of range.
    pub fn saturation(&self, v: usize) -> Result<usize, GwwError> {
        check_index(v, self.colors.len())?;
        Ok(self.palette[v * self.k..(v + 1) * self.k]
            .iter()
            .filter(|&&n| n > 0)
            .count())
    }

    /// Vertex with the most same-coloured neighbours (lowest index on ties), if any conflict
    /// exists.
    pub fn most_conflicted_node(&self) -> Option<(usize, u32)> {
        let mut best: Option<(usize, u32)> = None;
        for v in 0..self.colors.len() {
            let here = self.palette[v * self.k + self.colors[v]];
            if here > 0 && best.is_none_or(|(_, b)| here > b) {
                best = Some((v, here));
            }
        }
        best
    }
}

impl IncrementalTracker for ColoringTracker {
    type Ground = Graph;
    type Value = usize;
    type Move = Recolor;

    #[inline]
    fn ground(&self) -> &Arc<Graph> {
        &self.ground
    }

    #[inline]
    fn score(&self) -> i64 {
        self.conflicts
    }

    #[inline]
    fn marginal(&self, element: usize) -> Result<i64, GwwError> {
        check_index(element, self.marginals.len())?;
        Ok(self.marginals[element])
    }

    fn mutate(&mut self, mv: Recolor) -> Result<Recolor, GwwError> {
        let Recolor { node, color } = mv;
        check_index(node, self.colors.len())?;
        check_index(color, self.k)?;
        let old = self.colors[node];
        let undo = Recolor { node, color: old };
        if old == color {
            return Ok(undo);
        }
        self.conflicts += self.count(node, color) - self.count(node, old);
        self.colors[node] = color;
        let k = self.k;
        let ground = Arc::clone(&self.ground);
        let neighbors = ground.neighbors_unchecked(node);
        for &u in neighbors {
            debug_assert!(self.palette[u * k + old] > 0);
            self.palette[u * k + old] -= 1;
            self.palette[u * k + color] += 1;
        }
        self.marginals[node] = self.best_delta(node);
        for &u in neighbors {
            self.marginals[u] = self.best_delta(u);
        }
        Ok(undo)
    }

    fn assignment(&self) -> Vec<usize> {
        self.colors.clone()
    }

    fn score_from_scratch(&self) -> i64 {
        self.ground
            .edges()
            .filter(|&(u, v)| self.colors[u] == self.colors[v])
            .count() as i64
    }

    fn rebuild(&self) -> Self {
        Self::from_colors(Arc::clone(&self.ground), self.k, self.colors.clone())
    }
}
