use std::ops::Index;

use petgraph::{
    dot::{Config, Dot},
    graph::{NodeIndex, UnGraph},
};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::architecture::FatTreeArgs;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeType {
    PhysicalMachine,
    EdgeSwitch,
    AggregationSwitch,
    CoreSwitch,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Node {
    pub node_type: NodeType,
    /// position among the nodes of the same type
    pub local: usize,
}

impl Node {
    #[inline]
    pub fn new(node_type: NodeType, local: usize) -> Self {
        Node { node_type, local }
    }

    #[inline]
    pub fn is_pm(&self) -> bool {
        self.node_type == NodeType::PhysicalMachine
    }
}

impl std::fmt::Display for Node {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let prefix = match self.node_type {
            NodeType::PhysicalMachine => "pm",
            NodeType::EdgeSwitch => "es",
            NodeType::AggregationSwitch => "as",
            NodeType::CoreSwitch => "cs",
        };
        write!(f, "{}_{}", prefix, self.local)
    }
}

/// Every link is one hop.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link;

impl std::fmt::Display for Link {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "1")
    }
}

/// Dense symmetric hop-count matrix over all nodes of a topology.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DistanceMatrix {
    dim: usize,
    data: Vec<u32>,
}

impl DistanceMatrix {
    #[inline]
    pub fn dim(&self) -> usize {
        self.dim
    }
}

impl Index<(usize, usize)> for DistanceMatrix {
    type Output = u32;
    #[inline]
    fn index(&self, (u, v): (usize, usize)) -> &Self::Output {
        &self.data[u * self.dim + v]
    }
}

/// Run a single-source shortest path computation from every node. Rows are
/// computed in parallel and assembled in node order.
pub fn all_pairs_shortest_paths(graph: &UnGraph<Node, Link>) -> DistanceMatrix {
    let dim = graph.node_count();
    let rows: Vec<Vec<u32>> = (0..dim)
        .into_par_iter()
        .map(|src| {
            let dist = petgraph::algo::dijkstra(graph, NodeIndex::new(src), None, |_| 1u32);
            (0..dim)
                .map(|dst| {
                    *dist.get(&NodeIndex::new(dst)).unwrap_or_else(|| {
                        panic!("node {} is unreachable from node {}", dst, src)
                    })
                })
                .collect()
        })
        .collect();

    DistanceMatrix {
        dim,
        data: rows.into_iter().flatten().collect(),
    }
}

/// A k-pod fat tree. Node indices are assigned once at construction, in the
/// order physical machines, edge switches, aggregation switches, core
/// switches, and double as coordinates into the distance matrix.
#[derive(Debug, Clone)]
pub struct FatTree {
    args: FatTreeArgs,
    graph: UnGraph<Node, Link>,
    dist: DistanceMatrix,
}

impl FatTree {
    pub(crate) fn from_graph(args: FatTreeArgs, graph: UnGraph<Node, Link>) -> Self {
        let dist = all_pairs_shortest_paths(&graph);
        log::debug!(
            "shortest path matrix computed for {} nodes",
            dist.dim()
        );
        FatTree { args, graph, dist }
    }

    #[inline]
    pub fn args(&self) -> &FatTreeArgs {
        &self.args
    }

    #[inline]
    pub fn num_pods(&self) -> usize {
        self.args.pods
    }

    #[inline]
    pub fn migration_coef(&self) -> u64 {
        self.args.migration_coef
    }

    #[inline]
    pub fn num_pms(&self) -> usize {
        self.args.num_pms()
    }

    #[inline]
    pub fn num_edge_switches(&self) -> usize {
        self.args.num_edge_switches()
    }

    #[inline]
    pub fn num_agg_switches(&self) -> usize {
        self.args.num_agg_switches()
    }

    #[inline]
    pub fn num_core_switches(&self) -> usize {
        self.args.num_core_switches()
    }

    #[inline]
    pub fn num_nodes(&self) -> usize {
        self.graph.node_count()
    }

    #[inline]
    pub fn num_links(&self) -> usize {
        self.graph.edge_count()
    }

    #[inline]
    pub fn pm(&self, i: usize) -> usize {
        debug_assert!(i < self.num_pms());
        i
    }

    #[inline]
    pub fn edge_switch(&self, i: usize) -> usize {
        debug_assert!(i < self.num_edge_switches());
        self.num_pms() + i
    }

    #[inline]
    pub fn agg_switch(&self, i: usize) -> usize {
        debug_assert!(i < self.num_agg_switches());
        self.num_pms() + self.num_edge_switches() + i
    }

    #[inline]
    pub fn core_switch(&self, i: usize) -> usize {
        debug_assert!(i < self.num_core_switches());
        self.num_pms() + self.num_edge_switches() + self.num_agg_switches() + i
    }

    #[inline]
    pub fn node(&self, ix: usize) -> &Node {
        &self.graph[NodeIndex::new(ix)]
    }

    /// Hop distance between two nodes given by their indices.
    #[inline]
    pub fn distance(&self, u: usize, v: usize) -> u64 {
        self.dist[(u, v)] as u64
    }

    #[inline]
    pub fn distances(&self) -> &DistanceMatrix {
        &self.dist
    }

    /// For each edge switch, the physical machines directly attached to it,
    /// in ascending order.
    pub fn edge_switch_to_pms(&self) -> Vec<Vec<usize>> {
        (0..self.num_edge_switches())
            .map(|e| {
                let mut pms: Vec<usize> = self
                    .graph
                    .neighbors(NodeIndex::new(self.edge_switch(e)))
                    .filter(|&n| self.graph[n].is_pm())
                    .map(|n| n.index())
                    .collect();
                pms.sort_unstable();
                pms
            })
            .collect()
    }

    pub fn graph(&self) -> &UnGraph<Node, Link> {
        &self.graph
    }

    pub fn to_dot(&self) -> Dot<'_, &UnGraph<Node, Link>> {
        Dot::with_config(&self.graph, &[Config::EdgeNoLabel])
    }
}
