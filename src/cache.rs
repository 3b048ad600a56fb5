//! Memoized per-vertex weight totals.

use std::collections::HashMap;

use tracing::debug;

use crate::graph::{BipartiteGraph, Vertex};
use crate::{Error, Result};

/// How the outgoing edges of a vertex are weighted when summing them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum WeightScheme {
    /// Each edge counts with its own weight.
    RawEdgeWeight,
    /// Each edge counts with the personalized-PageRank score of its opposite
    /// endpoint, which must be an entity.
    NeighborScore,
}

/// Lazily computed total outgoing weight per `(vertex, scheme)`.
///
/// The cache does not observe the graph. After edge weights or scores change, the
/// owner must [`invalidate`](Self::invalidate), [`refresh`](Self::refresh) or
/// [`invalidate_all`](Self::invalidate_all); until then stale totals are served.
#[derive(Debug, Clone, Default)]
pub struct WeightCache {
    raw_edge_weight: HashMap<Vertex, f64>,
    neighbor_score: HashMap<Vertex, f64>,
}

impl WeightCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn map(&self, scheme: WeightScheme) -> &HashMap<Vertex, f64> {
        match scheme {
            WeightScheme::RawEdgeWeight => &self.raw_edge_weight,
            WeightScheme::NeighborScore => &self.neighbor_score,
        }
    }

    fn map_mut(&mut self, scheme: WeightScheme) -> &mut HashMap<Vertex, f64> {
        match scheme {
            WeightScheme::RawEdgeWeight => &mut self.raw_edge_weight,
            WeightScheme::NeighborScore => &mut self.neighbor_score,
        }
    }

    /// Total outgoing weight of `vertex` under `scheme`, computed on first use.
    pub fn total_weight<G>(&mut self, graph: &G, vertex: Vertex, scheme: WeightScheme) -> Result<f64>
    where
        G: BipartiteGraph + ?Sized,
    {
        if let Some(&total) = self.map(scheme).get(&vertex) {
            return Ok(total);
        }
        let total = compute_total(graph, vertex, scheme)?;
        self.map_mut(scheme).insert(vertex, total);
        Ok(total)
    }

    /// The memoized total, if any. Never computes.
    pub fn cached(&self, vertex: Vertex, scheme: WeightScheme) -> Option<f64> {
        self.map(scheme).get(&vertex).copied()
    }

    pub fn len(&self, scheme: WeightScheme) -> usize {
        self.map(scheme).len()
    }

    pub fn is_empty(&self) -> bool {
        self.raw_edge_weight.is_empty() && self.neighbor_score.is_empty()
    }

    /// Drops the entries of `vertices`; they are recomputed on next access.
    pub fn invalidate<I>(&mut self, vertices: I, scheme: WeightScheme)
    where
        I: IntoIterator<Item = Vertex>,
    {
        let map = self.map_mut(scheme);
        let mut dropped = 0usize;
        for v in vertices {
            if map.remove(&v).is_some() {
                dropped += 1;
            }
        }
        debug!(?scheme, dropped, "invalidated weight cache entries");
    }

    /// Drops every entry for `scheme`.
    pub fn invalidate_all(&mut self, scheme: WeightScheme) {
        let map = self.map_mut(scheme);
        let dropped = map.len();
        map.clear();
        debug!(?scheme, dropped, "invalidated whole weight cache");
    }

    /// Recomputes the entries of `vertices` right away.
    pub fn refresh<G, I>(&mut self, graph: &G, vertices: I, scheme: WeightScheme) -> Result<()>
    where
        G: BipartiteGraph + ?Sized,
        I: IntoIterator<Item = Vertex>,
    {
        let mut refreshed = 0usize;
        for v in vertices {
            let total = compute_total(graph, v, scheme)?;
            self.map_mut(scheme).insert(v, total);
            refreshed += 1;
        }
        debug!(?scheme, refreshed, "refreshed weight cache entries");
        Ok(())
    }
}

fn compute_total<G>(graph: &G, vertex: Vertex, scheme: WeightScheme) -> Result<f64>
where
    G: BipartiteGraph + ?Sized,
{
    let edges = graph.edges(vertex);
    match scheme {
        WeightScheme::RawEdgeWeight => Ok(edges.iter().map(|&e| graph.edge_weight(e)).sum()),
        WeightScheme::NeighborScore => {
            let mut total = 0.0;
            for &e in edges {
                total += neighbor_score(graph, e, vertex)?;
            }
            Ok(total)
        }
    }
}

/// Score of the entity across `edge` from `vertex`.
pub(crate) fn neighbor_score<G>(graph: &G, edge: G::Edge, vertex: Vertex) -> Result<f64>
where
    G: BipartiteGraph + ?Sized,
{
    match graph.opposite(edge, vertex) {
        Vertex::Entity(id) => Ok(graph.page_rank_score(id)),
        other @ Vertex::Item(_) => Err(bipartite_violation(edge, vertex, other)),
    }
}

pub(crate) fn bipartite_violation<E: std::fmt::Debug>(edge: E, from: Vertex, to: Vertex) -> Error {
    tracing::warn!(?edge, %from, %to, "non-bipartite edge in entity-item graph");
    Error::BipartiteInvariantViolation { edge: format!("{edge:?}"), from, to }
}
