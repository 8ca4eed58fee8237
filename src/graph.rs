//! Interaction-graph builder and connectivity summary.
//!
//! User networks become directed graphs weighted by the interaction tally; hashtag
//! co-occurrence becomes an undirected, unweighted graph. Both are built once per
//! analysis pass and dropped after their summary is taken.

use ahash::AHashMap;
use petgraph::algo::connected_components;
use petgraph::graph::{DiGraph, NodeIndex, UnGraph};
use petgraph::visit::EdgeRef;
use petgraph::EdgeType;
use serde::Serialize;

use crate::counting::CountMap;

#[derive(Debug, Clone)]
pub enum InteractionGraph {
    Directed(DiGraph<String, u64>),
    Undirected(UnGraph<String, ()>),
}

fn node_for<E, Ty: EdgeType>(
    g: &mut petgraph::Graph<String, E, Ty>,
    index: &mut AHashMap<String, NodeIndex>,
    name: &str,
) -> NodeIndex {
    if let Some(&ix) = index.get(name) {
        return ix;
    }
    let ix = g.add_node(name.to_string());
    index.insert(name.to_string(), ix);
    ix
}

impl InteractionGraph {
    /// One directed edge per (actor, co-actor) carrying the tally. Actors only appear
    /// through their edges.
    pub fn from_counts(counts: &CountMap) -> Self {
        let mut g = DiGraph::<String, u64>::new();
        let mut index = AHashMap::new();
        for (actor, co_actors) in counts {
            for (co, &weight) in co_actors {
                let a = node_for(&mut g, &mut index, actor);
                let b = node_for(&mut g, &mut index, co);
                g.update_edge(a, b, weight);
            }
        }
        InteractionGraph::Directed(g)
    }

    /// Every hashtag is a node; every pair within one set is an undirected edge.
    pub fn from_hashtag_sets<S: AsRef<[String]>>(sets: &[S]) -> Self {
        let mut g = UnGraph::<String, ()>::new_undirected();
        let mut index = AHashMap::new();
        for set in sets {
            let set = set.as_ref();
            let ixs: Vec<NodeIndex> = set.iter().map(|h| node_for(&mut g, &mut index, h)).collect();
            for (i, &a) in ixs.iter().enumerate() {
                for &b in &ixs[i + 1..] {
                    if a != b {
                        g.update_edge(a, b, ());
                    }
                }
            }
        }
        InteractionGraph::Undirected(g)
    }

    pub fn is_directed(&self) -> bool {
        matches!(self, InteractionGraph::Directed(_))
    }

    pub fn node_count(&self) -> usize {
        match self {
            InteractionGraph::Directed(g) => g.node_count(),
            InteractionGraph::Undirected(g) => g.node_count(),
        }
    }

    pub fn edge_count(&self) -> usize {
        match self {
            InteractionGraph::Directed(g) => g.edge_count(),
            InteractionGraph::Undirected(g) => g.edge_count(),
        }
    }

    /// Components of the undirected projection (weak components for directed graphs).
    pub fn component_count(&self) -> usize {
        match self {
            InteractionGraph::Directed(g) => connected_components(g),
            InteractionGraph::Undirected(g) => connected_components(g),
        }
    }

    /// Sorted `(source, target, weight)` triples. Undirected endpoints are ordered and
    /// carry no weight.
    pub fn edges(&self) -> Vec<(String, String, Option<u64>)> {
        let mut out: Vec<(String, String, Option<u64>)> = match self {
            InteractionGraph::Directed(g) => g
                .edge_references()
                .map(|e| (g[e.source()].clone(), g[e.target()].clone(), Some(*e.weight())))
                .collect(),
            InteractionGraph::Undirected(g) => g
                .edge_references()
                .map(|e| {
                    let (a, b) = (&g[e.source()], &g[e.target()]);
                    if a <= b { (a.clone(), b.clone(), None) } else { (b.clone(), a.clone(), None) }
                })
                .collect(),
        };
        out.sort();
        out
    }

    /// Sorted node names.
    pub fn nodes(&self) -> Vec<String> {
        let mut out: Vec<String> = match self {
            InteractionGraph::Directed(g) => g.node_indices().map(|i| g[i].clone()).collect(),
            InteractionGraph::Undirected(g) => g.node_indices().map(|i| g[i].clone()).collect(),
        };
        out.sort();
        out
    }
}

/// Node/edge/component counts of one graph.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct NetworkSummary {
    pub nodes: usize,
    pub edges: usize,
    pub components: usize,
    /// Integer-floor nodes per component; 0 when there are no components.
    pub average_component_size: usize,
}

impl NetworkSummary {
    pub fn of(g: &InteractionGraph) -> Self {
        let nodes = g.node_count();
        let components = g.component_count();
        let average_component_size = if components == 0 { 0 } else { nodes / components };
        Self { nodes, edges: g.edge_count(), components, average_component_size }
    }
}
