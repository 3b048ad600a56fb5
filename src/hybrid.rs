//! Hybrid personalized-PageRank / SALSA random walk.
//!
//! Entity→item hops are sampled proportionally to edge weight. Item→entity hops are
//! sampled proportionally to the neighbours' personalized-PageRank scores, with the
//! entity the walk just came from excluded, so the walk does not oscillate between
//! two adjacent vertices.
//!
//! The walk is a look-ahead sequence: [`HybridWalk::next_vertex`] returns the current
//! cursor and computes the next one. Once terminated it stays terminated unless the
//! owner rewrites the cursor.

use std::fmt;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::trace;

use crate::cache::{bipartite_violation, neighbor_score, WeightCache, WeightScheme};
use crate::graph::{BipartiteGraph, Vertex};
use crate::random_walk::{
    check_start, hop_gate, sample_cumulative, Step, Stop, WalkConfig, WalkCursor,
};
use crate::{Error, Result};

pub struct HybridWalk<E, R = ChaCha8Rng> {
    config: WalkConfig,
    rng: R,
    cache: WeightCache,
    cursor: WalkCursor<E>,
}

impl<E: Copy + Eq + fmt::Debug> HybridWalk<E, ChaCha8Rng> {
    /// Walk driven by a `ChaCha8Rng` seeded from `config.seed`.
    pub fn seeded<G: BipartiteGraph<Edge = E>>(graph: &G, start: Vertex, config: WalkConfig) -> Result<Self> {
        Self::new(graph, start, config, ChaCha8Rng::seed_from_u64(config.seed))
    }
}

impl<E: Copy + Eq + fmt::Debug, R: Rng> HybridWalk<E, R> {
    /// Starts a walk at `start`, which must be an entity of `graph`.
    pub fn new<G: BipartiteGraph<Edge = E>>(graph: &G, start: Vertex, config: WalkConfig, rng: R) -> Result<Self> {
        config.validate()?;
        check_start(graph, start)?;
        Ok(Self { config, rng, cache: WeightCache::new(), cursor: WalkCursor::at(start) })
    }

    pub fn config(&self) -> &WalkConfig {
        &self.config
    }

    pub fn has_next(&self) -> bool {
        self.cursor.current.is_some()
    }

    /// Returns the current vertex and advances the cursor.
    ///
    /// Fails with [`Error::EndOfSequence`] after termination. A non-bipartite edge
    /// terminates the walk and is returned as [`Error::BipartiteInvariantViolation`].
    pub fn next_vertex<G: BipartiteGraph<Edge = E>>(&mut self, graph: &G) -> Result<Vertex> {
        let value = self.cursor.current.ok_or(Error::EndOfSequence)?;
        let step = match value {
            Vertex::Entity(id) => {
                self.cursor.last_entity = Some(id);
                self.step_to_item(graph, value)
            }
            Vertex::Item(_) => self.step_to_entity(graph, value),
        };
        match step {
            Ok(Step::Move { to, via }) => {
                self.cursor.current = Some(to);
                self.cursor.arrival_edge = Some(via);
            }
            Ok(Step::Stop(reason)) => {
                trace!(?reason, hops = self.cursor.hops, at = %value, "hybrid walk terminated");
                self.cursor.current = None;
            }
            Err(e) => {
                self.cursor.current = None;
                return Err(e);
            }
        }
        Ok(value)
    }

    /// Drains the walk as an iterator. It ends at termination; a bipartite violation
    /// is yielded once as an `Err` and ends it too.
    pub fn iter<'a, G: BipartiteGraph<Edge = E>>(
        &'a mut self,
        graph: &'a G,
    ) -> impl Iterator<Item = Result<Vertex>> + 'a {
        std::iter::from_fn(move || self.has_next().then(|| self.next_vertex(graph)))
    }

    fn step_to_item<G: BipartiteGraph<Edge = E>>(&mut self, graph: &G, from: Vertex) -> Result<Step<E>> {
        if let Some(stop) = hop_gate(self.cursor.hops, &self.config, &mut self.rng) {
            return Ok(Step::Stop(stop));
        }
        let edges = graph.edges(from);
        if edges.is_empty() {
            return Ok(Step::Stop(Stop::NoEdges));
        }
        self.cursor.hops += 1;

        let total = self.cache.total_weight(graph, from, WeightScheme::RawEdgeWeight)?;
        let threshold = total * self.rng.random::<f64>();
        let Some(edge) = sample_cumulative(edges, threshold, |e| Ok(Some(graph.edge_weight(e))))? else {
            return Ok(Step::Stop(Stop::NoSelection));
        };
        let to = graph.opposite(edge, from);
        if to.same_kind(from) {
            return Err(bipartite_violation(edge, from, to));
        }
        Ok(Step::Move { to, via: edge })
    }

    fn step_to_entity<G: BipartiteGraph<Edge = E>>(&mut self, graph: &G, from: Vertex) -> Result<Step<E>> {
        if let Some(stop) = hop_gate(self.cursor.hops, &self.config, &mut self.rng) {
            return Ok(Step::Stop(stop));
        }
        let edges = graph.edges(from);
        if edges.is_empty() {
            return Ok(Step::Stop(Stop::NoEdges));
        }
        self.cursor.hops += 1;

        let last = self.cursor.last_entity.map(Vertex::Entity);
        let last_score = self.cursor.last_entity.map_or(0.0, |id| graph.page_rank_score(id));
        // The cached total includes the entity we came from once; take it back out.
        let total = self.cache.total_weight(graph, from, WeightScheme::NeighborScore)? - last_score;
        if edges.len() == 1 && Some(graph.opposite(edges[0], from)) == last {
            return Ok(Step::Stop(Stop::Backtrack));
        }

        let threshold = total * self.rng.random::<f64>();
        let selected = sample_cumulative(edges, threshold, |e| {
            if Some(graph.opposite(e, from)) == last {
                return Ok(None);
            }
            neighbor_score(graph, e, from).map(Some)
        })?;
        let Some(edge) = selected else {
            return Ok(Step::Stop(Stop::NoSelection));
        };
        Ok(Step::Move { to: graph.opposite(edge, from), via: edge })
    }

    /// The vertex the next call to [`next_vertex`](Self::next_vertex) returns.
    pub fn current_vertex(&self) -> Option<Vertex> {
        self.cursor.current
    }

    /// Overrides the current vertex. `None` terminates the walk.
    ///
    /// The arrival edge is cleared since it no longer leads to `vertex`.
    pub fn set_current_vertex(&mut self, vertex: Option<Vertex>) {
        self.cursor.current = vertex;
        self.cursor.arrival_edge = None;
    }

    pub fn hops(&self) -> u64 {
        self.cursor.hops
    }

    pub fn set_hops(&mut self, hops: u64) {
        self.cursor.hops = hops;
    }

    /// Sets the entity excluded from the next item→entity hop.
    pub fn set_last_entity(&mut self, entity: Option<usize>) {
        self.cursor.last_entity = entity;
    }

    pub fn cursor(&self) -> &WalkCursor<E> {
        &self.cursor
    }

    /// Replaces the whole cursor, e.g. to resume a walk paused with [`cursor`](Self::cursor).
    pub fn set_cursor(&mut self, cursor: WalkCursor<E>) {
        self.cursor = cursor;
    }

    pub fn cache(&self) -> &WeightCache {
        &self.cache
    }

    /// Cached total weight of `vertex` under `scheme`, computed if absent.
    pub fn total_weight<G: BipartiteGraph<Edge = E>>(&mut self, graph: &G, vertex: Vertex, scheme: WeightScheme) -> Result<f64> {
        self.cache.total_weight(graph, vertex, scheme)
    }

    /// Must be called after edges incident to `vertices` were added, removed or
    /// reweighted.
    pub fn on_edges_changed(&mut self, vertices: &[Vertex]) {
        self.cache.invalidate(vertices.iter().copied(), WeightScheme::RawEdgeWeight);
        self.cache.invalidate(vertices.iter().copied(), WeightScheme::NeighborScore);
    }

    /// Must be called after any entity score changed.
    pub fn on_scores_changed(&mut self) {
        self.cache.invalidate_all(WeightScheme::NeighborScore);
    }
}
