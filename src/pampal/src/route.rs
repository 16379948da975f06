use petgraph::{
    algo::{dijkstra, min_spanning_tree},
    data::Element,
    graph::{NodeIndex, UnGraph},
};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::cluster::FatTree;
use crate::Cost;

/// Estimated cost, for every ordered pair of physical machines, of a walk that
/// starts at the first PM, visits every middlebox in any order and ends at
/// the second PM.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteMatrix {
    dim: usize,
    data: Vec<Cost>,
}

impl RouteMatrix {
    /// `chain` holds the node index of the switch hosting each middlebox.
    pub fn build(fat_tree: &FatTree, chain: &[usize]) -> Self {
        let dim = fat_tree.num_pms();
        let template = chain_graph(fat_tree, chain);

        let rows: Vec<Vec<Cost>> = (0..dim)
            .into_par_iter()
            .map(|src| {
                (0..dim)
                    .map(|dst| route_estimate(fat_tree, &template, src, dst))
                    .collect()
            })
            .collect();

        log::info!("route matrix computed for {} pms and {} middleboxes", dim, chain.len());

        RouteMatrix {
            dim,
            data: rows.into_iter().flatten().collect(),
        }
    }

    #[inline]
    pub fn dim(&self) -> usize {
        self.dim
    }

    #[inline]
    pub fn get(&self, src: usize, dst: usize) -> Cost {
        self.data[src * self.dim + dst]
    }

    pub fn is_symmetric(&self) -> bool {
        (0..self.dim).all(|i| (0..i).all(|j| self.get(i, j) == self.get(j, i)))
    }
}

/// Complete graph over the middleboxes. Node `m` carries the index of the
/// switch hosting middlebox `m`.
pub fn chain_graph(fat_tree: &FatTree, chain: &[usize]) -> UnGraph<usize, Cost> {
    let mut g = UnGraph::with_capacity(chain.len() + 2, (chain.len() + 2) * (chain.len() + 1) / 2);
    for &switch in chain {
        g.add_node(switch);
    }
    for i in 0..chain.len() {
        for j in i + 1..chain.len() {
            g.add_edge(
                NodeIndex::new(i),
                NodeIndex::new(j),
                fat_tree.distance(chain[i], chain[j]),
            );
        }
    }
    g
}

/// Doubling bound for one PM pair: add the source and destination PMs to the
/// middlebox graph, linking each PM to every middlebox but not to each other.
/// With `T` a minimum spanning tree and `p` the shortest source to destination
/// path in that graph, the estimate is `2 * w(T) - w(p)`.
///
/// The estimate is not an exact optimum. It is symmetric in `src` and `dst`
/// and never below `w(p)`, since the path inside `T` is one of the candidates
/// for `p`. Without middleboxes it is the hop distance.
pub fn route_estimate(fat_tree: &FatTree, template: &UnGraph<usize, Cost>, src: usize, dst: usize) -> Cost {
    let num_mbs = template.node_count();
    if num_mbs == 0 {
        return fat_tree.distance(src, dst);
    }

    let mut g = template.clone();
    let mut endpoints = vec![src];
    if src != dst {
        endpoints.push(dst);
    }

    let mut added = Vec::with_capacity(endpoints.len());
    for &pm in &endpoints {
        let ix = g.add_node(pm);
        for m in 0..num_mbs {
            let mb = NodeIndex::new(m);
            let w = fat_tree.distance(pm, g[mb]);
            g.add_edge(ix, mb, w);
        }
        added.push(ix);
    }

    let tree_weight: Cost = min_spanning_tree(&g)
        .filter_map(|e| match e {
            Element::Edge { weight, .. } => Some(weight),
            Element::Node { .. } => None,
        })
        .sum();

    let (s, t) = (added[0], added[added.len() - 1]);
    let through = *dijkstra(&g, s, Some(t), |e| *e.weight())
        .get(&t)
        .unwrap_or_else(|| panic!("pm {} cannot reach pm {} through the chain", src, dst));

    debug_assert!(tree_weight >= through);
    2 * tree_weight - through
}
