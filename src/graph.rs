//! Undirected simple graphs used as the ground structure of subset and colouring searches.

use crate::error::{check_index, GwwError};
use crate::ground::GroundStructure;
use rand::Rng;
use std::fs;
use std::path::Path;
use thiserror::Error;

// ============================================================================
// Graph
// ============================================================================

/// An immutable undirected simple graph over vertices `0..n`.
///
/// Representation:
/// - `adj[v]` is the sorted neighbour list of vertex `v`.
/// - `edge_count` is the number of undirected edges.
///
/// Neighbour lists are sorted and deduplicated at construction, so `has_edge` is a binary
/// search and iteration order is deterministic.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Graph {
    adj: Vec<Vec<usize>>,
    edge_count: usize,
}

impl Graph {
    /// Creates a graph with `n` vertices and no edges.
    pub fn empty(n: usize) -> Self {
        Self {
            adj: vec![Vec::new(); n],
            edge_count: 0,
        }
    }

    /// Builds a graph from an edge list.
    ///
    /// Duplicate edges (in either orientation) are collapsed.
    ///
    /// # Errors
    /// Returns [`GwwError::IndexOutOfRange`] for an endpoint `>= n` and
    /// [`GwwError::Validation`] for a self-loop.
    pub fn from_edges(n: usize, edges: &[(usize, usize)]) -> Result<Self, GwwError> {
        let mut adj = vec![Vec::new(); n];
        for &(u, v) in edges {
            check_index(u, n)?;
            check_index(v, n)?;
            if u == v {
                return Err(GwwError::validation(format!("self-loop at vertex {u}")));
            }
            adj[u].push(v);
            adj[v].push(u);
        }
        Ok(Self::from_adjacency_lists(adj))
    }

    /// The path `0 - 1 - ... - (n-1)`.
    pub fn path(n: usize) -> Self {
        let edges: Vec<(usize, usize)> = (1..n).map(|v| (v - 1, v)).collect();
        let mut adj = vec![Vec::new(); n];
        for (u, v) in edges {
            adj[u].push(v);
            adj[v].push(u);
        }
        Self::from_adjacency_lists(adj)
    }

    /// The complete graph on `n` vertices.
    pub fn complete(n: usize) -> Self {
        let adj = (0..n)
            .map(|v| (0..n).filter(|&u| u != v).collect())
            .collect();
        Self::from_adjacency_lists(adj)
    }

    /// Samples an Erdős–Rényi graph `G(n, p)`.
    ///
    /// # Errors
    /// Returns [`GwwError::Validation`] if `p` is not in `[0, 1]`.
    pub fn erdos_renyi<R: Rng>(n: usize, p: f64, rng: &mut R) -> Result<Self, GwwError> {
        check_probability(p)?;
        let mut adj = vec![Vec::new(); n];
        for u in 0..n {
            for v in (u + 1)..n {
                if rng.random_bool(p) {
                    adj[u].push(v);
                    adj[v].push(u);
                }
            }
        }
        Ok(Self::from_adjacency_lists(adj))
    }

    /// Samples `G(n, p)` and then deletes every edge inside a uniformly chosen vertex set of
    /// `planted_size` vertices, planting an independent set.
    ///
    /// Returns the graph together with the sorted planted set.
    ///
    /// # Errors
    /// Returns [`GwwError::Validation`] if `p` is not in `[0, 1]` or `planted_size > n`.
    pub fn with_planted_independent_set<R: Rng>(
        n: usize,
        p: f64,
        planted_size: usize,
        rng: &mut R,
    ) -> Result<(Self, Vec<usize>), GwwError> {
        check_probability(p)?;
        if planted_size > n {
            return Err(GwwError::validation(format!(
                "planted set of size {planted_size} does not fit in a graph of {n} vertices"
            )));
        }
        let mut planted = rand::seq::index::sample(rng, n, planted_size).into_vec();
        planted.sort_unstable();
        let mut in_planted = vec![false; n];
        for &v in &planted {
            in_planted[v] = true;
        }

        let mut adj = vec![Vec::new(); n];
        for u in 0..n {
            for v in (u + 1)..n {
                if in_planted[u] && in_planted[v] {
                    continue;
                }
                if rng.random_bool(p) {
                    adj[u].push(v);
                    adj[v].push(u);
                }
            }
        }
        Ok((Self::from_adjacency_lists(adj), planted))
    }

    /// Normalises raw adjacency lists (sort + dedup) and counts edges.
    fn from_adjacency_lists(mut adj: Vec<Vec<usize>>) -> Self {
        let mut degree_sum = 0usize;
        for list in &mut adj {
            list.sort_unstable();
            list.dedup();
            degree_sum += list.len();
        }
        debug_assert!(degree_sum % 2 == 0, "adjacency lists are not symmetric");
        Self {
            adj,
            edge_count: degree_sum / 2,
        }
    }

    /// Number of vertices.
    #[inline]
    pub fn vertex_count(&self) -> usize {
        self.adj.len()
    }

    /// Number of undirected edges.
    #[inline]
    pub fn edge_count(&self) -> usize {
        self.edge_count
    }

    /// Neighbours of `v`, sorted ascending.
    ///
    /// # Errors
    /// Returns [`GwwError::IndexOutOfRange`] if `v` is not a vertex.
    #[inline]
    pub fn neighbors(&self, v: usize) -> Result<&[usize], GwwError> {
        self.adj
            .get(v)
            .map(Vec::as_slice)
            .ok_or(GwwError::IndexOutOfRange {
                index: v,
                len: self.adj.len(),
            })
    }

    /// Degree of `v`.
    ///
    /// # Errors
    /// Returns [`GwwError::IndexOutOfRange`] if `v` is not a vertex.
    #[inline]
    pub fn degree(&self, v: usize) -> Result<usize, GwwError> {
        self.neighbors(v).map(<[usize]>::len)
    }

    /// Unchecked neighbour access for hot paths whose index was already validated.
    #[inline(always)]
    pub(crate) fn neighbors_unchecked(&self, v: usize) -> &[usize] {
        &self.adj[v]
    }

    /// Returns whether the edge `(u, v)` exists. Out-of-range vertices have no edges.
    #[inline]
    pub fn has_edge(&self, u: usize, v: usize) -> bool {
        self.adj
            .get(u)
            .is_some_and(|list| list.binary_search(&v).is_ok())
    }

    /// Largest vertex degree (`0` for the empty graph).
    pub fn max_degree(&self) -> usize {
        self.adj.iter().map(Vec::len).max().unwrap_or(0)
    }

    /// Iterates over every edge once as `(u, v)` with `u < v`.
    pub fn edges(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.adj.iter().enumerate().flat_map(|(u, list)| {
            list.iter()
                .copied()
                .filter(move |&v| u < v)
                .map(move |v| (u, v))
        })
    }

    /// Counts the edges with both endpoints flagged in `members` (from scratch, `O(|E|)`).
    pub fn edges_within(&self, members: &[bool]) -> usize {
        self.edges()
            .filter(|&(u, v)| members[u] && members[v])
            .count()
    }

    /// Returns whether `vertices` is an independent set.
    pub fn is_independent(&self, vertices: &[usize]) -> bool {
        vertices
            .iter()
            .enumerate()
            .all(|(i, &u)| vertices[i + 1..].iter().all(|&v| !self.has_edge(u, v)))
    }

    /// Reads a `0/1` adjacency matrix from `path` (see [`parse_adjacency_matrix`]).
    ///
    /// # Errors
    /// [`GraphParseError::Io`] if the file cannot be read; otherwise the parse error.
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self, GraphParseError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|e| GraphParseError::Io {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        parse_adjacency_matrix(&text)
    }
}

impl GroundStructure for Graph {
    #[inline]
    fn element_count(&self) -> usize {
        self.adj.len()
    }
}

#[inline]
fn check_probability(p: f64) -> Result<(), GwwError> {
    if (0.0..=1.0).contains(&p) {
        Ok(())
    } else {
        Err(GwwError::validation(format!(
            "edge probability {p} is not in [0, 1]"
        )))
    }
}

// ============================================================================
// Parsing
// ============================================================================

/// Why an adjacency matrix was rejected.
#[derive(Error, Clone, Debug, PartialEq, Eq)]
pub enum GraphParseError {
    /// The input holds no rows.
    #[error("adjacency matrix is empty")]
    Empty,
    /// A row whose entry count differs from the number of rows.
    #[error("row {row} has {got} entries, expected {expected}")]
    NonSquare {
        /// Zero-based row index.
        row: usize,
        /// Number of rows in the matrix.
        expected: usize,
        /// Entries found on the row.
        got: usize,
    },
    /// An entry other than `0` or `1`.
    #[error("entry ({row}, {col}) is {ch:?}, expected '0' or '1'")]
    InvalidChar {
        /// Zero-based row index.
        row: usize,
        /// Zero-based entry index within the row.
        col: usize,
        /// The offending character.
        ch: char,
    },
    /// A `1` on the diagonal.
    #[error("vertex {vertex} is adjacent to itself")]
    SelfLoop {
        /// The looping vertex.
        vertex: usize,
    },
    /// Entry `(i, j)` disagrees with entry `(j, i)`.
    #[error("entries ({i}, {j}) and ({j}, {i}) disagree")]
    NotSymmetric {
        /// Row of the first entry.
        i: usize,
        /// Column of the first entry.
        j: usize,
    },
    /// The matrix file could not be read.
    #[error("cannot read graph file {path}: {reason}")]
    Io {
        /// The path as given.
        path: String,
        /// The underlying I/O error.
        reason: String,
    },
}

impl From<GraphParseError> for GwwError {
    fn from(e: GraphParseError) -> Self {
        GwwError::Validation(e.to_string())
    }
}

/// Parses a symmetric `0/1` adjacency matrix with a zero diagonal into a [`Graph`].
///
/// One row per line. Entries may be packed (`0110`) or separated by whitespace
/// (`0 1 1 0`); blank lines are skipped.
///
/// # Errors
/// The first [`GraphParseError`] found, scanning rows top to bottom.
pub fn parse_adjacency_matrix(text: &str) -> Result<Graph, GraphParseError> {
    let rows: Vec<Vec<char>> = text
        .lines()
        .map(|line| line.chars().filter(|c| !c.is_whitespace()).collect::<Vec<_>>())
        .filter(|row| !row.is_empty())
        .collect();
    let n = rows.len();
    if n == 0 {
        return Err(GraphParseError::Empty);
    }

    let mut matrix = vec![false; n * n];
    for (row, entries) in rows.iter().enumerate() {
        if entries.len() != n {
            return Err(GraphParseError::NonSquare { row, expected: n, got: entries.len() });
        }
        for (col, &ch) in entries.iter().enumerate() {
            matrix[row * n + col] = match ch {
                '0' => false,
                '1' => true,
                _ => return Err(GraphParseError::InvalidChar { row, col, ch }),
            };
        }
    }

    let mut adj = vec![Vec::new(); n];
    for i in 0..n {
        if matrix[i * n + i] {
            return Err(GraphParseError::SelfLoop { vertex: i });
        }
        for j in i + 1..n {
            if matrix[i * n + j] != matrix[j * n + i] {
                return Err(GraphParseError::NotSymmetric { i, j });
            }
            if matrix[i * n + j] {
                adj[i].push(j);
                adj[j].push(i);
            }
        }
    }
    Ok(Graph::from_adjacency_lists(adj))
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_xorshift::XorShiftRng;

    #[test]
    fn path_graph_structure() {
        let g = Graph::path(5);
        assert_eq!(g.vertex_count(), 5);
        assert_eq!(g.edge_count(), 4);
        assert_eq!(g.neighbors(0).unwrap(), &[1]);
        assert_eq!(g.neighbors(2).unwrap(), &[1, 3]);
        assert_eq!(g.degree(4).unwrap(), 1);
        assert!(g.has_edge(3, 4));
        assert!(!g.has_edge(0, 2));
    }

    #[test]
    fn out_of_range_access_is_an_index_error() {
        let g = Graph::path(3);
        assert_eq!(
            g.neighbors(3),
            Err(GwwError::IndexOutOfRange { index: 3, len: 3 })
        );
        assert!(g.degree(10).is_err());
        assert!(g.check_element(2).is_ok());
        assert!(g.check_element(3).is_err());
        assert!(!g.has_edge(7, 0));
    }

    #[test]
    fn from_edges_collapses_duplicates() {
        let g = Graph::from_edges(4, &[(0, 1), (1, 0), (2, 3), (0, 1)]).unwrap();
        assert_eq!(g.edge_count(), 2);
        assert_eq!(g.degree(0).unwrap(), 1);
    }

    #[test]
    fn from_edges_rejects_bad_input() {
        assert!(matches!(
            Graph::from_edges(3, &[(0, 3)]),
            Err(GwwError::IndexOutOfRange { .. })
        ));
        assert!(matches!(
            Graph::from_edges(3, &[(1, 1)]),
            Err(GwwError::Validation(_))
        ));
    }

    #[test]
    fn complete_graph_properties() {
        let g = Graph::complete(6);
        assert_eq!(g.edge_count(), 15);
        assert_eq!(g.max_degree(), 5);
        assert_eq!(g.edges().count(), 15);
    }

    #[test]
    fn handshaking_lemma_holds() {
        let mut rng = XorShiftRng::seed_from_u64(42);
        for _ in 0..10 {
            let g = Graph::erdos_renyi(40, 0.25, &mut rng).unwrap();
            let sum: usize = (0..40).map(|v| g.degree(v).unwrap()).sum();
            assert_eq!(sum, 2 * g.edge_count());
            assert_eq!(g.edges().count(), g.edge_count());
        }
    }

    #[test]
    fn erdos_renyi_rejects_bad_probability() {
        let mut rng = XorShiftRng::seed_from_u64(1);
        assert!(Graph::erdos_renyi(5, 1.5, &mut rng).is_err());
        assert!(Graph::erdos_renyi(5, -0.1, &mut rng).is_err());
    }

    #[test]
    fn planted_set_is_independent() {
        let mut rng = XorShiftRng::seed_from_u64(0xFACE);
        for _ in 0..20 {
            let (g, planted) = Graph::with_planted_independent_set(30, 0.6, 8, &mut rng).unwrap();
            assert_eq!(planted.len(), 8);
            assert!(planted.windows(2).all(|w| w[0] < w[1]));
            assert!(g.is_independent(&planted));
        }
        assert!(Graph::with_planted_independent_set(5, 0.5, 6, &mut rng).is_err());
    }

    #[test]
    fn edges_within_counts_induced_edges() {
        let g = Graph::path(5);
        let members = [true, true, true, false, false];
        assert_eq!(g.edges_within(&members), 2);
        assert_eq!(g.edges_within(&[false; 5]), 0);
    }

    #[test]
    fn adjacency_matrix_packed_or_spaced() {
        let packed = parse_adjacency_matrix("0100\n1010\n0101\n0010\n").unwrap();
        let spaced = parse_adjacency_matrix("0 1 0 0\n1 0 1 0\n\n0 1 0 1\n0 0 1 0").unwrap();
        assert_eq!(packed, Graph::path(4));
        assert_eq!(spaced, packed);
    }

    #[test]
    fn malformed_matrices_are_rejected() {
        assert_eq!(
            parse_adjacency_matrix("010\n10\n").unwrap_err(),
            GraphParseError::NonSquare { row: 0, expected: 2, got: 3 }
        );
        assert_eq!(
            parse_adjacency_matrix("0a\n00\n").unwrap_err(),
            GraphParseError::InvalidChar { row: 0, col: 1, ch: 'a' }
        );
        assert_eq!(
            parse_adjacency_matrix("10\n01\n").unwrap_err(),
            GraphParseError::SelfLoop { vertex: 0 }
        );
        assert_eq!(
            parse_adjacency_matrix("01\n00\n").unwrap_err(),
            GraphParseError::NotSymmetric { i: 0, j: 1 }
        );
        assert_eq!(parse_adjacency_matrix("   \n\n  \n").unwrap_err(), GraphParseError::Empty);
    }

    #[test]
    fn load_from_file_reads_matrix() {
        let path = std::env::temp_dir().join(format!("gww-graph-{}.txt", std::process::id()));
        std::fs::write(&path, "011\n101\n110\n").unwrap();
        let loaded = Graph::load_from_file(&path);
        std::fs::remove_file(&path).unwrap();
        assert_eq!(loaded.unwrap(), Graph::complete(3));
    }

    #[test]
    fn load_from_missing_file_is_an_io_error() {
        let err = Graph::load_from_file("/nonexistent/gww/graph.txt").unwrap_err();
        assert!(matches!(err, GraphParseError::Io { .. }));
        assert!(err.to_string().contains("/nonexistent/gww/graph.txt"));
    }

    #[test]
    fn parse_error_converts_to_validation() {
        let e: GwwError = GraphParseError::Empty.into();
        assert!(matches!(e, GwwError::Validation(_)));
    }
}
