//! Walk configuration, cursor state, and the sampling pieces shared by both engines.

use rand::Rng;

use crate::graph::{BipartiteGraph, Vertex};
use crate::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct WalkConfig {
    /// Upper bound on the number of hops of one walk.
    pub max_hops: u64,
    /// Probability of stopping before each hop.
    pub reset_probability: f64,
    /// Seed used by the `seeded` constructors.
    pub seed: u64,
}

impl Default for WalkConfig {
    fn default() -> Self {
        Self { max_hops: 1000, reset_probability: 0.01, seed: 42 }
    }
}

impl WalkConfig {
    pub fn validate(&self) -> Result<()> {
        check_probability("reset_probability", self.reset_probability)
    }
}

/// Configuration of [`ExplorationWalk`](crate::ExplorationWalk).
///
/// `exploration_probability` and `explore_nodes` are validated and kept on the
/// walk, but no sampling step reads them: restarting from a non-root node is left
/// to the owner, which can `restart` the walk anywhere.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ExplorationConfig {
    pub walk: WalkConfig,
    /// Probability of starting a walk from a non-root entity.
    pub exploration_probability: f64,
    /// Entities a walk may explore from.
    pub explore_nodes: Vec<Vertex>,
}

impl Default for ExplorationConfig {
    fn default() -> Self {
        Self { walk: WalkConfig::default(), exploration_probability: 0.05, explore_nodes: Vec::new() }
    }
}

impl ExplorationConfig {
    pub fn validate(&self) -> Result<()> {
        self.walk.validate()?;
        check_probability("exploration_probability", self.exploration_probability)?;
        if let Some(v) = self.explore_nodes.iter().find(|v| v.is_item()) {
            return Err(Error::InvalidParameter(format!("explore_nodes must only hold entities, got {v}")));
        }
        Ok(())
    }
}

fn check_probability(name: &str, p: f64) -> Result<()> {
    if (0.0..=1.0).contains(&p) {
        Ok(())
    } else {
        Err(Error::InvalidParameter(format!("{name} must be in [0, 1], got {p}")))
    }
}

/// Resumable state of a walk.
///
/// `current` is the vertex the next call to `next_vertex` returns; `None` means the
/// walk has terminated. `arrival_edge` is the edge that led to `current`.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct WalkCursor<E> {
    pub current: Option<Vertex>,
    pub hops: u64,
    pub last_entity: Option<usize>,
    pub last_item: Option<usize>,
    pub arrival_edge: Option<E>,
}

impl<E> WalkCursor<E> {
    pub fn at(start: Vertex) -> Self {
        Self { current: Some(start), hops: 0, last_entity: None, last_item: None, arrival_edge: None }
    }

    pub fn is_terminated(&self) -> bool {
        self.current.is_none()
    }
}

impl<E> Default for WalkCursor<E> {
    fn default() -> Self {
        Self { current: None, hops: 0, last_entity: None, last_item: None, arrival_edge: None }
    }
}

/// A walk must start at an entity that is part of the graph.
pub(crate) fn check_start<G: BipartiteGraph>(graph: &G, start: Vertex) -> Result<()> {
    if start.is_entity() && graph.contains_vertex(start) {
        Ok(())
    } else {
        Err(Error::InvalidStart(start))
    }
}

/// Outcome of computing the vertex after the current one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Step<E> {
    Move { to: Vertex, via: E },
    Stop(Stop),
}

/// Why a walk stopped. Only used for logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Stop {
    HopLimit,
    Reset,
    NoEdges,
    ZeroWeight,
    Backtrack,
    NoSelection,
}

/// Hop-limit and reset check run before every hop.
///
/// The reset draw is skipped once the hop limit is reached, so the number of draws
/// consumed per hop is part of the reproducible sequence.
pub(crate) fn hop_gate<R: Rng>(hops: u64, config: &WalkConfig, rng: &mut R) -> Option<Stop> {
    if hops >= config.max_hops {
        return Some(Stop::HopLimit);
    }
    if rng.random::<f64>() < config.reset_probability {
        return Some(Stop::Reset);
    }
    None
}

/// Scans `edges` in order, accumulating `weight_of(edge)`, and returns the first edge
/// whose running sum reaches `threshold`.
///
/// `weight_of` returning `None` skips the edge: it neither adds to the sum nor can be
/// selected. `Ok(None)` means no edge reached the threshold.
pub(crate) fn sample_cumulative<E, F>(edges: &[E], threshold: f64, mut weight_of: F) -> Result<Option<E>>
where
    E: Copy,
    F: FnMut(E) -> Result<Option<f64>>,
{
    let mut cumulative = 0.0;
    for &edge in edges {
        let Some(w) = weight_of(edge)? else {
            continue;
        };
        cumulative += w;
        if threshold <= cumulative {
            return Ok(Some(edge));
        }
    }
    Ok(None)
}
