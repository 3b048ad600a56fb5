//! End-to-end sketch: listeners and songs → hybrid walks → song visit counts.
//!
//! Walks are the raw material of an incremental recommender: songs that walks from
//! a listener visit often are good candidates for that listener. This example only
//! counts visits; turning counts into a ranked list is left to the caller.
//!
//! To run on your own data:
//!
//! HYBRID_WALK_EDGELIST=/path/to/edges.txt cargo run --example hybrid_walk
//!
//! Format: `entity item weight` per line, whitespace-separated; `#` starts a comment.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use hybrid_walk::{
    BipartiteAdjacency, EdgeId, ExplorationConfig, ExplorationWalk, HybridWalk, Vertex,
    WalkConfig,
};

/// Three listeners sharing two songs, plus a fourth who only shares one.
fn toy() -> BipartiteAdjacency {
    let mut g = BipartiteAdjacency::new();
    let alice = g.add_entity(0.4);
    let bob = g.add_entity(0.3);
    let carol = g.add_entity(0.2);
    let dave = g.add_entity(0.1);
    let songs: Vec<Vertex> = (0..5).map(|_| g.add_item()).collect();

    for (listener, song, weight) in [
        (alice, 0, 5.0),
        (alice, 1, 2.0),
        (bob, 0, 1.0),
        (bob, 1, 1.0),
        (bob, 2, 4.0),
        (carol, 1, 3.0),
        (carol, 3, 3.0),
        (dave, 3, 1.0),
        (dave, 4, 6.0),
    ] {
        g.add_edge(listener, songs[song], weight).expect("toy edges are bipartite");
    }
    g
}

/// Loads `entity item weight` lines. Entities get uniform scores.
fn from_edgelist(path: &Path) -> Result<BipartiteAdjacency, String> {
    let txt = std::fs::read_to_string(path)
        .map_err(|e| format!("failed to read {}: {e}", path.display()))?;

    let mut g = BipartiteAdjacency::new();
    let mut entities: HashMap<String, Vertex> = HashMap::new();
    let mut items: HashMap<String, Vertex> = HashMap::new();

    for (line_no, line) in txt.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let fields: Vec<&str> = line.split_whitespace().collect();
        let [e, i, w] = fields[..] else {
            return Err(format!("line {}: expected 3 fields, got {}", line_no + 1, fields.len()));
        };
        let weight: f64 = w
            .parse()
            .map_err(|err| format!("line {}: bad weight '{w}': {err}", line_no + 1))?;
        let entity = *entities.entry(e.to_string()).or_insert_with(|| g.add_entity(1.0));
        let item = *items.entry(i.to_string()).or_insert_with(|| g.add_item());
        g.add_edge(entity, item, weight)
            .ok_or_else(|| format!("line {}: rejected edge", line_no + 1))?;
    }
    if g.entity_count() == 0 {
        return Err("edge list produced an empty graph".to_string());
    }

    let uniform = 1.0 / g.entity_count() as f64;
    for id in 0..g.entity_count() {
        g.set_page_rank_score(id, uniform);
    }
    Ok(g)
}

fn item_visits(
    walk: &mut ExplorationWalk<EdgeId>,
    g: &BipartiteAdjacency,
    root: Vertex,
    repetitions: usize,
) -> BTreeMap<Vertex, usize> {
    let mut counts = BTreeMap::new();
    walk.for_each_walk_from(g, root, repetitions, |w| {
        for &v in w.iter().filter(|v| v.is_item()) {
            *counts.entry(v).or_default() += 1;
        }
    })
    .expect("graph is bipartite");
    counts
}

fn show(walk: &[Vertex]) -> String {
    walk.iter().map(ToString::to_string).collect::<Vec<_>>().join(" → ")
}

fn main() {
    let mut g = match std::env::var("HYBRID_WALK_EDGELIST") {
        Ok(path) => from_edgelist(Path::new(&path)).expect("failed to load HYBRID_WALK_EDGELIST"),
        Err(_) => toy(),
    };
    let root = Vertex::Entity(0);
    println!(
        "graph: {} entities, {} items, {} edges; root={root}",
        g.entity_count(),
        g.item_count(),
        g.edge_count()
    );

    let config = WalkConfig { max_hops: 20, reset_probability: 0.1, seed: 7 };

    println!();
    println!("hybrid walks (score-weighted return hops):");
    for seed in 0..3 {
        let mut walk = HybridWalk::seeded(&g, root, WalkConfig { seed, ..config })
            .expect("root is an entity");
        let vertices: Vec<Vertex> = walk
            .iter(&g)
            .collect::<Result<_, _>>()
            .expect("graph is bipartite");
        println!("  {}", show(&vertices));
    }

    let exploration = ExplorationConfig { walk: config, ..ExplorationConfig::default() };
    let mut walk = ExplorationWalk::seeded(&g, root, exploration).expect("root is an entity");

    println!();
    println!("item visits over 2000 exploration walks:");
    for (item, n) in item_visits(&mut walk, &g, root, 2_000) {
        println!("  {:>8}  {n}", item.to_string());
    }

    // The root starts listening to the last item a lot; tell the walk and rerun.
    let last_item = Vertex::Item(g.item_count() - 1);
    if g.add_edge(root, last_item, 10.0).is_some() {
        walk.on_edges_changed(&g, &[root, last_item]).expect("graph is bipartite");
        println!();
        println!("after adding {root} → {last_item} (weight 10):");
        for (item, n) in item_visits(&mut walk, &g, root, 2_000) {
            println!("  {:>8}  {n}", item.to_string());
        }
    }
}
