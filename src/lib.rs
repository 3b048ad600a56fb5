//! `hybrid-walk`: hybrid personalized-PageRank / SALSA random walks over bipartite
//! entity–item graphs.
//!
//! A walk alternates between *entities* (listeners, creators) and *items* (songs).
//! Two engines are provided:
//! - [`HybridWalk`]: entity→item steps follow edge weights (SALSA-like); item→entity
//!   steps follow the neighbours' personalized-PageRank scores, excluding the entity
//!   just left.
//! - [`ExplorationWalk`]: edge weights on both sides, backtracks terminate the walk,
//!   and the instance can be restarted after termination.
//!
//! Public invariants (must not drift):
//! - **Alternation**: produced vertices strictly alternate kind, starting at an entity.
//! - **Hop bound**: the hop count never exceeds `max_hops`.
//! - **Determinism**: a fixed seed and an unmutated graph give identical sequences.
//! - **Explicit invalidation**: weight caches never observe graph mutations; the owner
//!   calls `on_edges_changed` / `on_scores_changed`.

pub mod cache;
pub mod exploration;
pub mod graph;
pub mod hybrid;
pub mod random_walk;

pub use cache::{WeightCache, WeightScheme};
pub use exploration::ExplorationWalk;
pub use graph::{BipartiteAdjacency, BipartiteGraph, EdgeId, Vertex};
pub use hybrid::HybridWalk;
pub use random_walk::{ExplorationConfig, WalkConfig, WalkCursor};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Error {
    #[error("random walk must start at an entity of the graph, got {0}")]
    InvalidStart(Vertex),
    #[error("random walk has no more vertices")]
    EndOfSequence,
    #[error("edge {edge} joins {from} to {to}, which are on the same side of a bipartite graph")]
    BipartiteInvariantViolation { edge: String, from: Vertex, to: Vertex },
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
}

pub type Result<T> = std::result::Result<T, Error>;
