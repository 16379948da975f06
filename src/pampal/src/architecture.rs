use petgraph::graph::{NodeIndex, UnGraph};
use serde::{Deserialize, Serialize};
use structopt::StructOpt;

use crate::cluster::{FatTree, Link, Node, NodeType};
use crate::{Error, Result};

/// FatTree, parameters include the number of pods and the migration coefficient
#[derive(Debug, Clone, Copy, PartialEq, Eq, StructOpt, Serialize, Deserialize)]
pub struct FatTreeArgs {
    /// Number of pods (k), must be even
    #[structopt(short = "k", long = "pods", default_value = "8")]
    pub pods: usize,
    /// Cost of moving a VM by one hop
    #[structopt(short = "m", long = "migration_coef", default_value = "20")]
    pub migration_coef: u64,
}

impl FatTreeArgs {
    pub fn new(pods: usize, migration_coef: u64) -> Self {
        FatTreeArgs {
            pods,
            migration_coef,
        }
    }

    #[inline]
    pub fn num_pms(&self) -> usize {
        self.pods * self.pods * self.pods / 4
    }

    #[inline]
    pub fn num_edge_switches(&self) -> usize {
        self.pods * self.pods / 2
    }

    #[inline]
    pub fn num_agg_switches(&self) -> usize {
        self.pods * self.pods / 2
    }

    #[inline]
    pub fn num_core_switches(&self) -> usize {
        self.pods * self.pods / 4
    }

    #[inline]
    pub fn num_nodes(&self) -> usize {
        self.num_pms() + self.num_edge_switches() + self.num_agg_switches() + self.num_core_switches()
    }

    pub fn validate(&self) -> Result<()> {
        if self.pods % 2 != 0 {
            return Err(Error::InvalidTopology(self.pods));
        }
        if self.pods == 0 {
            return Err(Error::InvalidParameter(
                "the number of pods must be positive".to_owned(),
            ));
        }
        Ok(())
    }
}

impl std::fmt::Display for FatTreeArgs {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "fattree_{}_m{}", self.pods, self.migration_coef)
    }
}

/// Build a k-pod fat tree and its hop-distance matrix.
///
/// - every edge switch serves k/2 physical machines
/// - edge and aggregation switches of a pod form a complete bipartite graph
/// - the k/2 uplinks of each aggregation switch go to core switches in
///   round-robin order, continuing across aggregation switches
pub fn build_fat_tree(args: FatTreeArgs) -> Result<FatTree> {
    args.validate()?;

    let k = args.pods;
    let half = k / 2;
    let num_pms = args.num_pms();
    let num_edges = args.num_edge_switches();
    let num_aggs = args.num_agg_switches();
    let num_cores = args.num_core_switches();

    let num_links = num_pms + k * half * half + num_aggs * half;
    let mut graph = UnGraph::with_capacity(args.num_nodes(), num_links);

    let layers = [
        (NodeType::PhysicalMachine, num_pms),
        (NodeType::EdgeSwitch, num_edges),
        (NodeType::AggregationSwitch, num_aggs),
        (NodeType::CoreSwitch, num_cores),
    ];
    for &(node_type, count) in layers.iter() {
        for i in 0..count {
            graph.add_node(Node::new(node_type, i));
        }
    }

    let es = |i: usize| NodeIndex::new(num_pms + i);
    let agg = |i: usize| NodeIndex::new(num_pms + num_edges + i);
    let cs = |i: usize| NodeIndex::new(num_pms + num_edges + num_aggs + i);

    for e in 0..num_edges {
        for pm in e * half..(e + 1) * half {
            graph.add_edge(NodeIndex::new(pm), es(e), Link);
        }
    }

    for pod in 0..k {
        for e in pod * half..(pod + 1) * half {
            for a in pod * half..(pod + 1) * half {
                graph.add_edge(es(e), agg(a), Link);
            }
        }
    }

    let mut core = 0;
    for a in 0..num_aggs {
        for _ in 0..half {
            graph.add_edge(agg(a), cs(core), Link);
            core = (core + 1) % num_cores;
        }
    }

    log::info!(
        "fat tree {}: {} pms, {} edge switches, {} aggregation switches, {} core switches",
        args,
        num_pms,
        num_edges,
        num_aggs,
        num_cores
    );

    Ok(FatTree::from_graph(args, graph))
}
