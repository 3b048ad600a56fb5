//! Bipartite graph adapter trait.
//!
//! The walk engines never own or mutate the graph; they only read it through
//! [`BipartiteGraph`]. Vertex kind is carried by [`Vertex`] itself, so the only
//! kind check left at runtime is the one that catches a malformed input graph.

use std::fmt;

/// A vertex of the bipartite graph.
///
/// Ids are opaque identities assigned by the graph adapter. Two vertices are equal
/// iff they have the same kind and id; entity scores play no part in identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Vertex {
    /// A listener / creator. Carries a personalized-PageRank score in the graph.
    Entity(usize),
    /// A song (or any recommendable item).
    Item(usize),
}

impl Vertex {
    pub fn is_entity(self) -> bool {
        matches!(self, Vertex::Entity(_))
    }

    pub fn is_item(self) -> bool {
        matches!(self, Vertex::Item(_))
    }

    /// Returns `true` if `self` and `other` are on the same side of the bipartition.
    pub fn same_kind(self, other: Vertex) -> bool {
        self.is_entity() == other.is_entity()
    }
}

impl fmt::Display for Vertex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Vertex::Entity(id) => write!(f, "entity#{id}"),
            Vertex::Item(id) => write!(f, "item#{id}"),
        }
    }
}

/// Read-only view of an undirected bipartite multigraph.
///
/// Requirements:
/// - `edges(v)` enumerates in the same order on every call while the graph is not
///   mutated. Sampling picks the *first* qualifying edge, so order is observable.
/// - `opposite(e, v)` is only called with an `e` taken from `edges(v)`. Adapters
///   may panic on any other edge.
/// - Edge weights and entity scores should be non-negative.
pub trait BipartiteGraph {
    type Edge: Copy + Eq + fmt::Debug;

    fn contains_vertex(&self, vertex: Vertex) -> bool;

    /// Outgoing (incident) edges of `vertex`. Unknown vertices have no edges.
    fn edges(&self, vertex: Vertex) -> &[Self::Edge];

    fn edge_weight(&self, edge: Self::Edge) -> f64;

    /// The endpoint of `edge` that is not `vertex`.
    ///
    /// May panic if `edge` is not one of `edges(vertex)`.
    fn opposite(&self, edge: Self::Edge, vertex: Vertex) -> Vertex;

    /// Personalized-PageRank score of an entity. Owned and updated by the caller.
    fn page_rank_score(&self, entity: usize) -> f64;

    fn out_degree(&self, vertex: Vertex) -> usize {
        self.edges(vertex).len()
    }
}

/// Edge handle of [`BipartiteAdjacency`]: an index into its edge list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EdgeId(pub usize);

#[derive(Debug, Clone, Copy)]
struct EdgeData {
    entity: usize,
    item: usize,
    weight: f64,
}

/// In-memory bipartite multigraph with adjacency lists of edge ids.
///
/// Edges are always added as `(entity, item)`, so an edge joining two vertices of
/// the same kind cannot be built through this adapter. Adjacency lists keep
/// insertion order, which is the enumeration order seen by the walks.
#[derive(Debug, Clone, Default)]
pub struct BipartiteAdjacency {
    scores: Vec<f64>,
    entity_edges: Vec<Vec<EdgeId>>,
    item_edges: Vec<Vec<EdgeId>>,
    edges: Vec<EdgeData>,
}

impl BipartiteAdjacency {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an entity with the given score and returns its vertex.
    pub fn add_entity(&mut self, page_rank_score: f64) -> Vertex {
        self.scores.push(page_rank_score);
        self.entity_edges.push(Vec::new());
        Vertex::Entity(self.scores.len() - 1)
    }

    pub fn add_item(&mut self) -> Vertex {
        self.item_edges.push(Vec::new());
        Vertex::Item(self.item_edges.len() - 1)
    }

    /// Adds an undirected edge between an entity and an item. Parallel edges are
    /// allowed.
    ///
    /// Returns `None` if `entity` is not an entity of this graph or `item` is not an
    /// item of this graph; same-kind edges are rejected here.
    pub fn add_edge(&mut self, entity: Vertex, item: Vertex, weight: f64) -> Option<EdgeId> {
        let (Vertex::Entity(entity), Vertex::Item(item)) = (entity, item) else {
            return None;
        };
        if entity >= self.entity_edges.len() || item >= self.item_edges.len() {
            return None;
        }
        let id = EdgeId(self.edges.len());
        self.edges.push(EdgeData { entity, item, weight });
        self.entity_edges[entity].push(id);
        self.item_edges[item].push(id);
        Some(id)
    }

    /// Returns `false` if `edge` does not exist.
    pub fn set_edge_weight(&mut self, edge: EdgeId, weight: f64) -> bool {
        match self.edges.get_mut(edge.0) {
            Some(data) => {
                data.weight = weight;
                true
            }
            None => false,
        }
    }

    /// Returns `false` if `entity` does not exist.
    pub fn set_page_rank_score(&mut self, entity: usize, score: f64) -> bool {
        match self.scores.get_mut(entity) {
            Some(s) => {
                *s = score;
                true
            }
            None => false,
        }
    }

    /// Both endpoints of `edge`, entity first.
    pub fn endpoints(&self, edge: EdgeId) -> Option<(Vertex, Vertex)> {
        self.edges
            .get(edge.0)
            .map(|e| (Vertex::Entity(e.entity), Vertex::Item(e.item)))
    }

    pub fn entity_count(&self) -> usize {
        self.entity_edges.len()
    }

    pub fn item_count(&self) -> usize {
        self.item_edges.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn entities(&self) -> impl Iterator<Item = Vertex> + '_ {
        (0..self.entity_edges.len()).map(Vertex::Entity)
    }

    pub fn items(&self) -> impl Iterator<Item = Vertex> + '_ {
        (0..self.item_edges.len()).map(Vertex::Item)
    }
}

impl BipartiteGraph for BipartiteAdjacency {
    type Edge = EdgeId;

    fn contains_vertex(&self, vertex: Vertex) -> bool {
        match vertex {
            Vertex::Entity(id) => id < self.entity_edges.len(),
            Vertex::Item(id) => id < self.item_edges.len(),
        }
    }

    fn edges(&self, vertex: Vertex) -> &[EdgeId] {
        let list = match vertex {
            Vertex::Entity(id) => self.entity_edges.get(id),
            Vertex::Item(id) => self.item_edges.get(id),
        };
        list.map(Vec::as_slice).unwrap_or(&[])
    }

    fn edge_weight(&self, edge: EdgeId) -> f64 {
        self.edges.get(edge.0).map_or(0.0, |e| e.weight)
    }

    /// # Panics
    ///
    /// If `edge` was not issued by this graph.
    fn opposite(&self, edge: EdgeId, vertex: Vertex) -> Vertex {
        let e = self.edges[edge.0];
        match vertex {
            Vertex::Entity(_) => Vertex::Item(e.item),
            Vertex::Item(_) => Vertex::Entity(e.entity),
        }
    }

    fn page_rank_score(&self, entity: usize) -> f64 {
        self.scores.get(entity).copied().unwrap_or(0.0)
    }
}
