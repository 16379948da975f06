use crate::datacenter::{DataCenter, PairPlacement};
use crate::{Cost, CostModel};

/// Every ordered PM combination `(i, j)`, by ascending route cost. Ties keep
/// the `i`-then-`j` scan order.
pub fn ranked_combinations(dc: &DataCenter) -> Vec<(usize, usize)> {
    let n = dc.num_pms();
    utils::algo::rank_by_key(n * n, |&c| dc.route(c / n, c % n))
        .into_iter()
        .map(|c| (c / n, c % n))
        .collect()
}

/// Walk the candidate list once. Each pair, in index order, takes the first
/// combination that still fits: a self combination needs two spare slots on
/// its PM, a cross combination one on each PM. A combination that does not
/// fit never fits again, so the cursor only moves forward.
pub fn assign_in_order(dc: &DataCenter, combinations: &[(usize, usize)]) -> Vec<PairPlacement> {
    let mut spare = vec![dc.resources(); dc.num_pms()];
    let mut cursor = 0;

    let fits = |spare: &[usize], (i, j): (usize, usize)| {
        if i == j {
            spare[i] >= 2
        } else {
            spare[i] >= 1 && spare[j] >= 1
        }
    };

    (0..dc.num_vm_pairs())
        .map(|pair| {
            while cursor < combinations.len() && !fits(&spare, combinations[cursor]) {
                cursor += 1;
            }
            let &(i, j) = combinations
                .get(cursor)
                .unwrap_or_else(|| panic!("no combination left for pair {}", pair));
            spare[i] -= 1;
            spare[j] -= 1;
            PairPlacement::new(i, j)
        })
        .collect()
}

fn communication_cost(dc: &DataCenter, placement: &[PairPlacement]) -> Cost {
    placement
        .iter()
        .enumerate()
        .map(|(pair, p)| dc.frequency(pair) * dc.route(p.vm, p.vmp))
        .sum()
}

/// Unordered policy: the chain may be visited in any order, pairs take the
/// cheapest route-matrix combinations first.
#[derive(Debug, Default)]
pub struct UnorderedPal {}

impl UnorderedPal {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn place(&self, dc: &DataCenter) -> Vec<PairPlacement> {
        assign_in_order(dc, &ranked_combinations(dc))
    }
}

impl CostModel for UnorderedPal {
    fn name(&self) -> &'static str {
        "unordered_pal"
    }

    fn cost(&self, dc: &DataCenter) -> Cost {
        let cost = communication_cost(dc, &self.place(dc));
        log::debug!("{}: {}", self.name(), cost);
        cost
    }
}

/// Unordered policy, traffic aware: both legs on one PM are tried first, in
/// PM order, before any other combination.
#[derive(Debug, Default)]
pub struct UnorderedTrafficAware {}

impl UnorderedTrafficAware {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn place(&self, dc: &DataCenter) -> Vec<PairPlacement> {
        let mut combinations: Vec<(usize, usize)> = (0..dc.num_pms()).map(|i| (i, i)).collect();
        combinations.extend(ranked_combinations(dc).into_iter().filter(|&(i, j)| i != j));
        assign_in_order(dc, &combinations)
    }
}

impl CostModel for UnorderedTrafficAware {
    fn name(&self) -> &'static str {
        "unordered_traffic_aware"
    }

    fn cost(&self, dc: &DataCenter) -> Cost {
        let cost = communication_cost(dc, &self.place(dc));
        log::debug!("{}: {}", self.name(), cost);
        cost
    }
}
