//! External-propagator port.
//!
//! The solver knows nothing about graph canonicalization; it only hands a
//! snapshot of the edge-variable assignment to an [`Oracle`] and consumes
//! the verdict. The symmetry checker answers with a forbidden subgraph
//! (signed edges), the 010-coloring checker with raw clauses; both are
//! folded into the solver through the dynamic clause-ingestion path.

use crate::bools::*;
use smallvec::SmallVec;

/// Value of an edge in the snapshot handed to the oracle.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum TruthValue {
    True,
    False,
    Unknown,
}

/// Symmetric `n x n` matrix over [`TruthValue`]; the diagonal is `Unknown`.
pub type AdjacencyMatrix = Vec<Vec<TruthValue>>;

/// A signed edge of a forbidden subgraph: the value the edge currently has,
/// together with its endpoints.
pub type ForbiddenGraph = Vec<(TruthValue, (usize, usize))>;

/// Oracle verdict on a (partial or total) graph assignment.
///
/// The original checker signalled a lemma by throwing it; here it is a
/// plain result discriminant. `Clauses` literals are in external
/// `+-(var+1)` form and refer to the solver's own numbering.
#[derive(Debug, Clone)]
pub enum Verdict {
    Ok,
    ForbiddenGraph(ForbiddenGraph),
    Clauses(Vec<Vec<i32>>),
}

/// A theory check consulted at stabilized nodes of the search: propagation
/// has reached fixpoint and no conflict is pending. The oracle must not
/// retain the snapshot across calls.
pub trait Oracle {
    fn check(&mut self, graph: &AdjacencyMatrix, is_full_assignment: bool) -> Verdict;
}

/// Oracle that accepts everything: plain CDCL solving.
pub struct NullOracle;

impl Oracle for NullOracle {
    fn check(&mut self, _: &AdjacencyMatrix, _: bool) -> Verdict {
        Verdict::Ok
    }
}

/// Mapping between graph edges and solver variables for `n` vertices.
///
/// Edge `{i,j}` with `j < i` is variable `i*(i-1)/2 + j`, so the first
/// `n*(n-1)/2` solver variables are exactly the edge variables.
pub struct EdgeEncoding {
    vertices: usize,
}

impl EdgeEncoding {
    pub fn new(vertices: usize) -> Self {
        EdgeEncoding { vertices }
    }

    pub fn vertices(&self) -> usize {
        self.vertices
    }

    /// Number of edge variables.
    pub fn num_edges(&self) -> usize {
        self.vertices * (self.vertices - 1) / 2
    }

    pub fn edge_var(&self, u: usize, v: usize) -> Var {
        debug_assert!(u != v && u < self.vertices && v < self.vertices);
        let (lo, hi) = if u < v { (u, v) } else { (v, u) };
        Var((hi * (hi - 1) / 2 + lo) as i32)
    }

    pub fn is_edge_var(&self, var: Var) -> bool {
        (var.0 as usize) < self.num_edges()
    }

    /// Blocking clause for a forbidden subgraph: for every signed edge the
    /// negation of its current value.
    pub fn forbidden_graph_clause(&self, fg: &ForbiddenGraph) -> SmallVec<[Lit; 8]> {
        fg.iter()
            .map(|(value, (u, v))| Lit::new(self.edge_var(*u, *v), *value == TruthValue::True))
            .collect()
    }
}
