use smallvec::SmallVec;

use crate::datacenter::DataCenter;
use crate::{Cost, CostModel};

/// Middleboxes in visiting order. Chains are short.
pub type Tour = SmallVec<[usize; 8]>;

/// Hops between every two middleboxes, indexed by chain position.
#[derive(Debug, Clone)]
pub struct MiddleboxMatrix {
    n: usize,
    data: Vec<Cost>,
}

impl MiddleboxMatrix {
    pub fn new(dc: &DataCenter) -> Self {
        let chain = dc.chain();
        let n = chain.len();
        let data = chain
            .iter()
            .flat_map(|&a| chain.iter().map(move |&b| dc.distance(a, b)))
            .collect();
        MiddleboxMatrix { n, data }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.n
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.n == 0
    }

    #[inline]
    pub fn get(&self, a: usize, b: usize) -> Cost {
        self.data[a * self.n + b]
    }

    /// Nearest-neighbour walk over all middleboxes starting at `ingress`,
    /// ending at `egress` if the walk did not reach it.
    pub fn tour(&self, ingress: usize, egress: usize) -> Tour {
        let mut tour = Tour::new();
        let mut visited = vec![false; self.n];
        tour.push(ingress);
        visited[ingress] = true;

        let mut current = ingress;
        for _ in 1..self.n {
            let mut next = None;
            for m in (0..self.n).filter(|&m| !visited[m]) {
                match next {
                    Some(best) if self.get(current, best) <= self.get(current, m) => {}
                    _ => next = Some(m),
                }
            }
            let next = next.unwrap_or_else(|| panic!("tour from {} ran out of middleboxes", ingress));
            visited[next] = true;
            tour.push(next);
            current = next;
        }

        if !visited[egress] {
            tour.push(egress);
        }
        tour
    }

    pub fn tour_length(&self, tour: &[usize]) -> Cost {
        tour.windows(2).map(|w| self.get(w[0], w[1])).sum()
    }
}

/// Chain position of the middlebox closest to `node`, the lowest position on
/// ties. `None` for an empty chain.
pub fn nearest_middlebox(dc: &DataCenter, node: usize) -> Option<usize> {
    let mut best: Option<(Cost, usize)> = None;
    for (m, &switch) in dc.chain().iter().enumerate() {
        let d = dc.distance(node, switch);
        if best.map_or(true, |(min, _)| d < min) {
            best = Some((d, m));
        }
    }
    best.map(|(_, m)| m)
}

/// Unordered policy without migration: every pair enters the chain at the
/// middlebox nearest to its VM, leaves at the one nearest to its VMP and
/// visits the rest greedily in between.
#[derive(Debug, Default)]
pub struct Plan {}

impl Plan {
    pub fn new() -> Self {
        Default::default()
    }

    /// Unweighted route length of every pair.
    pub fn route_lengths(&self, dc: &DataCenter) -> Vec<Cost> {
        let mbs = MiddleboxMatrix::new(dc);
        let chain = dc.chain();

        dc.placement()
            .iter()
            .map(|p| {
                let (ingress, egress) = match (nearest_middlebox(dc, p.vm), nearest_middlebox(dc, p.vmp)) {
                    (Some(i), Some(e)) => (i, e),
                    _ => return 0,
                };
                let tour = mbs.tour(ingress, egress);
                log::trace!("pair {:?}: tour {:?}", p, tour);
                dc.distance(p.vm, chain[ingress]) + mbs.tour_length(&tour) + dc.distance(chain[egress], p.vmp)
            })
            .collect()
    }
}

impl CostModel for Plan {
    fn name(&self) -> &'static str {
        "plan"
    }

    fn cost(&self, dc: &DataCenter) -> Cost {
        let cost = self
            .route_lengths(dc)
            .iter()
            .zip(dc.frequencies())
            .map(|(len, f)| len * f)
            .sum();
        log::debug!("{}: {}", self.name(), cost);
        cost
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::architecture::FatTreeArgs;
    use crate::datacenter::{DataCenterSetting, PairPlacement};

    fn datacenter(mbs: &[usize], pairs: &[(usize, usize, u64)]) -> DataCenter {
        let setting = DataCenterSetting::new(FatTreeArgs::new(4, 1), 4, mbs.len(), pairs.len(), 1000);
        let placement = pairs.iter().map(|&(vm, vmp, _)| PairPlacement::new(vm, vmp)).collect();
        let freqs = pairs.iter().map(|&(_, _, f)| f).collect();
        DataCenter::from_parts(setting, mbs, placement, freqs).unwrap()
    }

    #[test]
    fn nearest_middlebox_prefers_lowest_position() {
        // agg 0 and agg 1 are both 2 hops from pm 0
        let dc = datacenter(&[4, 1, 0], &[]);
        assert_eq!(nearest_middlebox(&dc, 0), Some(1));
        // pm 8 sits in pod 2 next to agg 4
        assert_eq!(nearest_middlebox(&dc, 8), Some(0));
        let dc = datacenter(&[], &[]);
        assert_eq!(nearest_middlebox(&dc, 0), None);
    }

    #[test]
    fn tour_visits_every_middlebox_once() {
        let dc = datacenter(&[0, 4, 1, 6, 2], &[]);
        let mbs = MiddleboxMatrix::new(&dc);
        for ingress in 0..5 {
            for egress in 0..5 {
                let tour = mbs.tour(ingress, egress);
                assert_eq!(tour.len(), 5);
                assert_eq!(tour[0], ingress);
                let mut sorted = tour.to_vec();
                sorted.sort_unstable();
                assert_eq!(sorted, vec![0, 1, 2, 3, 4]);
            }
        }
    }

    #[test]
    fn tour_follows_nearest_neighbour() {
        // agg 0 -> agg 1 (same pod, 2 hops) -> agg 3 (core 2 or 3, 2 hops)
        let dc = datacenter(&[0, 3, 1], &[]);
        let mbs = MiddleboxMatrix::new(&dc);
        assert_eq!(mbs.get(0, 2), 2);
        let tour = mbs.tour(0, 1);
        assert_eq!(tour.as_slice(), &[0, 2, 1]);
        assert_eq!(mbs.tour_length(&tour), 4);
    }

    #[test]
    fn plan_cost_per_pair() {
        // pair 0 in pod 0: enters at agg 0, leaves at agg 0 after agg 1 and agg 3
        let dc = datacenter(&[0, 3, 1], &[(0, 1, 10)]);
        assert_eq!(Plan::new().route_lengths(&dc), vec![2 + 4 + 2]);
        assert_eq!(Plan::new().cost(&dc), 80);
    }

    #[test]
    fn empty_chain_costs_nothing() {
        let dc = datacenter(&[], &[(0, 15, 10)]);
        assert_eq!(Plan::new().cost(&dc), 0);
    }
}
