//! Random walk with edge weights on both sides and restartable state.
//!
//! Differences from [`HybridWalk`](crate::HybridWalk):
//! - both hops sample proportionally to raw edge weight over *all* incident edges;
//! - a backtrack is detected after sampling and terminates the walk instead of being
//!   resampled: going back over the edge that led here from the last item, or
//!   returning to the last entity;
//! - every termination resets the hop count, so the same instance can be restarted
//!   with [`ExplorationWalk::restart`] and drawn from again.

use std::fmt;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::trace;

use crate::cache::{bipartite_violation, WeightCache, WeightScheme};
use crate::graph::{BipartiteGraph, Vertex};
use crate::random_walk::{
    check_start, hop_gate, sample_cumulative, ExplorationConfig, Step, Stop, WalkCursor,
};
use crate::{Error, Result};

pub struct ExplorationWalk<E, R = ChaCha8Rng> {
    config: ExplorationConfig,
    rng: R,
    cache: WeightCache,
    cursor: WalkCursor<E>,
}

impl<E: Copy + Eq + fmt::Debug> ExplorationWalk<E, ChaCha8Rng> {
    /// Walk driven by a `ChaCha8Rng` seeded from `config.walk.seed`.
    pub fn seeded<G: BipartiteGraph<Edge = E>>(graph: &G, start: Vertex, config: ExplorationConfig) -> Result<Self> {
        let rng = ChaCha8Rng::seed_from_u64(config.walk.seed);
        Self::new(graph, start, config, rng)
    }
}

impl<E: Copy + Eq + fmt::Debug, R: Rng> ExplorationWalk<E, R> {
    /// Starts a walk at `start`, which must be an entity of `graph`.
    pub fn new<G: BipartiteGraph<Edge = E>>(graph: &G, start: Vertex, config: ExplorationConfig, rng: R) -> Result<Self> {
        config.validate()?;
        check_start(graph, start)?;
        Ok(Self { config, rng, cache: WeightCache::new(), cursor: WalkCursor::at(start) })
    }

    pub fn config(&self) -> &ExplorationConfig {
        &self.config
    }

    pub fn exploration_probability(&self) -> f64 {
        self.config.exploration_probability
    }

    pub fn explore_nodes(&self) -> &[Vertex] {
        &self.config.explore_nodes
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
            Vertex::Item(id) => {
                self.cursor.last_item = Some(id);
                self.step_to_entity(graph, value)
            }
        };
        match step {
            Ok(Step::Move { to, via }) => {
                self.cursor.current = Some(to);
                self.cursor.arrival_edge = Some(via);
            }
            Ok(Step::Stop(reason)) => {
                trace!(?reason, hops = self.cursor.hops, at = %value, "exploration walk terminated");
                self.terminate();
            }
            Err(e) => {
                self.terminate();
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

    fn terminate(&mut self) {
        self.cursor.current = None;
        self.cursor.hops = 0;
        self.cursor.last_item = None;
        self.cursor.arrival_edge = None;
    }

    fn step_to_item<G: BipartiteGraph<Edge = E>>(&mut self, graph: &G, from: Vertex) -> Result<Step<E>> {
        // Edge from the last item back to here; sampling it again is a backtrack.
        let back = self.cursor.last_item.and(self.cursor.arrival_edge);
        let edge = match self.sample_raw(graph, from)? {
            Ok(edge) => edge,
            Err(stop) => return Ok(Step::Stop(stop)),
        };
        if Some(edge) == back {
            return Ok(Step::Stop(Stop::Backtrack));
        }
        let to = graph.opposite(edge, from);
        if to.same_kind(from) {
            return Err(bipartite_violation(edge, from, to));
        }
        Ok(Step::Move { to, via: edge })
    }

    fn step_to_entity<G: BipartiteGraph<Edge = E>>(&mut self, graph: &G, from: Vertex) -> Result<Step<E>> {
        let edge = match self.sample_raw(graph, from)? {
            Ok(edge) => edge,
            Err(stop) => return Ok(Step::Stop(stop)),
        };
        let to = graph.opposite(edge, from);
        if to.same_kind(from) {
            return Err(bipartite_violation(edge, from, to));
        }
        if Some(to) == self.cursor.last_entity.map(Vertex::Entity) {
            return Ok(Step::Stop(Stop::Backtrack));
        }
        Ok(Step::Move { to, via: edge })
    }

    /// Gate checks plus one raw-edge-weight draw over every incident edge of `from`.
    fn sample_raw<G: BipartiteGraph<Edge = E>>(
        &mut self,
        graph: &G,
        from: Vertex,
    ) -> Result<std::result::Result<E, Stop>> {
        if let Some(stop) = hop_gate(self.cursor.hops, &self.config.walk, &mut self.rng) {
            return Ok(Err(stop));
        }
        self.cursor.hops += 1;

        let edges = graph.edges(from);
        if edges.is_empty() {
            return Ok(Err(Stop::NoEdges));
        }
        let total = self.cache.total_weight(graph, from, WeightScheme::RawEdgeWeight)?;
        if total == 0.0 {
            return Ok(Err(Stop::ZeroWeight));
        }
        let threshold = total * self.rng.random::<f64>();
        let selected = sample_cumulative(edges, threshold, |e| Ok(Some(graph.edge_weight(e))))?;
        Ok(selected.ok_or(Stop::NoSelection))
    }

    /// Begins a fresh walk at `start` on this instance, keeping the weight cache.
    pub fn restart<G: BipartiteGraph<Edge = E>>(&mut self, graph: &G, start: Vertex) -> Result<()> {
        check_start(graph, start)?;
        self.cursor = WalkCursor::at(start);
        Ok(())
    }

    /// Runs `repetitions` walks from `root` and collects each one.
    pub fn walks_from<G: BipartiteGraph<Edge = E>>(
        &mut self,
        graph: &G,
        root: Vertex,
        repetitions: usize,
    ) -> Result<Vec<Vec<Vertex>>> {
        let mut walks = Vec::with_capacity(repetitions);
        self.for_each_walk_from(graph, root, repetitions, |walk| walks.push(walk.to_vec()))?;
        Ok(walks)
    }

    /// Runs `repetitions` walks from `root`, handing each to `f` without storing it.
    ///
    /// One buffer is reused for every walk.
    pub fn for_each_walk_from<G, F>(&mut self, graph: &G, root: Vertex, repetitions: usize, mut f: F) -> Result<()>
    where
        G: BipartiteGraph<Edge = E>,
        F: FnMut(&[Vertex]),
    {
        let mut buf = Vec::new();
        for _ in 0..repetitions {
            self.restart(graph, root)?;
            buf.clear();
            while self.has_next() {
                buf.push(self.next_vertex(graph)?);
            }
            f(&buf);
        }
        Ok(())
    }

    pub fn current_vertex(&self) -> Option<Vertex> {
        self.cursor.current
    }

    /// Overrides the current vertex without resetting the hop count. `None`
    /// terminates the walk.
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

    pub fn set_last_entity(&mut self, entity: Option<usize>) {
        self.cursor.last_entity = entity;
    }

    pub fn cursor(&self) -> &WalkCursor<E> {
        &self.cursor
    }

    pub fn set_cursor(&mut self, cursor: WalkCursor<E>) {
        self.cursor = cursor;
    }

    pub fn cache(&self) -> &WeightCache {
        &self.cache
    }

    pub fn total_weight<G: BipartiteGraph<Edge = E>>(&mut self, graph: &G, vertex: Vertex, scheme: WeightScheme) -> Result<f64> {
        self.cache.total_weight(graph, vertex, scheme)
    }

    /// Recomputes the edge-weight totals of `vertices` after their edges changed.
    pub fn on_edges_changed<G: BipartiteGraph<Edge = E>>(&mut self, graph: &G, vertices: &[Vertex]) -> Result<()> {
        self.cache.refresh(graph, vertices.iter().copied(), WeightScheme::RawEdgeWeight)
    }

    /// Drops every cached total: which vertices a score change affects is unknown here.
    pub fn on_scores_changed(&mut self) {
        self.cache.invalidate_all(WeightScheme::RawEdgeWeight);
    }
}
