use rayon::prelude::*;

use crate::datacenter::{DataCenter, PairPlacement};
use crate::{Cost, CostModel};

/// Result of a greedy migration run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Migration {
    /// target PMs of every pair, indexed by pair
    pub placement: Vec<PairPlacement>,
    /// migration coefficient times hops moved, summed over all legs
    pub migration_cost: Cost,
    /// frequency times route cost at the target PMs
    pub communication_cost: Cost,
}

impl Migration {
    #[inline]
    pub fn total_cost(&self) -> Cost {
        self.migration_cost + self.communication_cost
    }

    /// Number of legs that left their current PM.
    pub fn num_moved(&self, dc: &DataCenter) -> usize {
        self.placement
            .iter()
            .zip(dc.placement())
            .map(|(to, from)| (to.vm != from.vm) as usize + (to.vmp != from.vmp) as usize)
            .sum()
    }
}

/// Migration-aware unordered policy. Pairs in descending frequency move to
/// the PM combination that minimizes moving cost plus weighted route cost.
/// Every PM starts with its full capacity, so each leg is placed again.
#[derive(Debug, Default)]
pub struct GreedyMigration {}

impl GreedyMigration {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn migrate(&self, dc: &DataCenter) -> Migration {
        let num_pms = dc.num_pms();
        let coef = dc.migration_coef();
        let mut spare = vec![dc.resources(); num_pms];
        let mut placement = dc.placement().to_vec();
        let mut migration_cost = 0;
        let mut communication_cost = 0;

        let order = utils::algo::rank_by_key_desc(dc.num_vm_pairs(), |&p| dc.frequency(p));
        for pair in order {
            let current = dc.placement()[pair];
            let freq = dc.frequency(pair);

            // (total, moving, i, j), ties go to the smallest (i, j)
            let best = (0..num_pms)
                .into_par_iter()
                .filter(|&i| spare[i] > 0)
                .filter_map(|i| {
                    let move_vm = coef * dc.distance(current.vm, i);
                    (0..num_pms)
                        .filter(|&j| spare[j] > 0 && (i != j || spare[j] >= 2))
                        .map(|j| {
                            let moving = move_vm + coef * dc.distance(current.vmp, j);
                            (moving + freq * dc.route(i, j), moving, i, j)
                        })
                        .min_by_key(|&(total, _, _, j)| (total, j))
                })
                .min_by_key(|&(total, _, i, j)| (total, i, j));

            let (total, moving, i, j) =
                best.unwrap_or_else(|| panic!("no PM combination with spare capacity for pair {}", pair));
            spare[i] -= 1;
            spare[j] -= 1;
            placement[pair] = PairPlacement::new(i, j);
            migration_cost += moving;
            communication_cost += total - moving;
        }

        Migration {
            placement,
            migration_cost,
            communication_cost,
        }
    }
}

impl CostModel for GreedyMigration {
    fn name(&self) -> &'static str {
        "greedy_migration"
    }

    fn cost(&self, dc: &DataCenter) -> Cost {
        let m = self.migrate(dc);
        log::debug!(
            "{}: {} (migration {}, communication {}, {} legs moved)",
            self.name(),
            m.total_cost(),
            m.migration_cost,
            m.communication_cost,
            m.num_moved(dc)
        );
        m.total_cost()
    }
}
