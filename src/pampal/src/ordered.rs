use fnv::FnvHashSet as HashSet;

use crate::datacenter::{DataCenter, Slot};
use crate::{Cost, CostModel};

/// Ordered policy: pairs are served in descending frequency, each taking the
/// best remaining slot near the first middlebox for its VM and the best
/// remaining slot near the last middlebox for its VMP.
#[derive(Debug, Default)]
pub struct OrderedPal {}

impl OrderedPal {
    pub fn new() -> Self {
        Default::default()
    }
}

/// A ranked slot list consumed front to back. Slots taken through the other
/// list are skipped as well.
struct SlotCursor<'a> {
    slots: &'a [Slot],
    head: usize,
}

impl<'a> SlotCursor<'a> {
    fn new(slots: &'a [Slot]) -> Self {
        SlotCursor { slots, head: 0 }
    }

    /// Position of the first unused slot at or after `from` that is not rejected.
    fn find<F>(&self, from: usize, used: &HashSet<Slot>, reject: F) -> Option<usize>
    where
        F: Fn(&Slot) -> bool,
    {
        (from..self.slots.len()).find(|&p| !used.contains(&self.slots[p]) && !reject(&self.slots[p]))
    }

    fn skip_used(&mut self, used: &HashSet<Slot>) {
        while self.head < self.slots.len() && used.contains(&self.slots[self.head]) {
            self.head += 1;
        }
    }
}

/// Slots of the VM and the VMP of one pair.
pub type Legs = (Slot, Slot);

/// Ways out of a collision: keep the ingress slot and move the VMP, or keep
/// the egress slot and move the VM. The cheaper one wins, keeping the ingress
/// slot on a tie.
fn resolve_collision<F>(keep_ingress: Option<Legs>, keep_egress: Option<Legs>, leg_cost: F) -> Option<Legs>
where
    F: Fn(Legs) -> Cost,
{
    match (keep_ingress, keep_egress) {
        (Some(x), Some(y)) => Some(if leg_cost(x) <= leg_cost(y) { x } else { y }),
        (x, y) => x.or(y),
    }
}

fn leg_cost(dc: &DataCenter, (vm, vmp): Legs) -> Cost {
    dc.dist_to_first(vm.pm) + dc.dist_to_last(vmp.pm)
}

impl OrderedPal {
    /// Slots taken by every pair, indexed by pair.
    pub fn place(&self, dc: &DataCenter) -> Vec<Legs> {
        let ingress_slots = dc.ingress_slots();
        let egress_slots = dc.egress_slots();
        let mut ingress = SlotCursor::new(&ingress_slots);
        let mut egress = SlotCursor::new(&egress_slots);
        let mut used: HashSet<Slot> = HashSet::default();
        let mut placement = vec![None; dc.num_vm_pairs()];

        let order = utils::algo::rank_by_key_desc(dc.num_vm_pairs(), |&p| dc.frequency(p));
        for pair in order {
            let a = ingress
                .find(ingress.head, &used, |_| false)
                .unwrap_or_else(|| panic!("ingress slots exhausted at pair {}", pair));
            let sa = ingress_slots[a];
            let b = egress
                .find(egress.head, &used, |s| *s == sa)
                .unwrap_or_else(|| panic!("egress slots exhausted at pair {}", pair));
            let sb = egress_slots[b];

            let chosen = if sa.pm != sb.pm {
                (sa, sb)
            } else {
                // both legs would land on one PM, try moving either of them
                let keep_ingress = egress
                    .find(b + 1, &used, |s| s.pm == sa.pm)
                    .map(|b2| (sa, egress_slots[b2]));
                let keep_egress = ingress
                    .find(a + 1, &used, |s| s.pm == sb.pm)
                    .map(|a2| (ingress_slots[a2], sb));
                resolve_collision(keep_ingress, keep_egress, |legs| leg_cost(dc, legs)).unwrap_or((sa, sb))
            };

            used.insert(chosen.0);
            used.insert(chosen.1);
            ingress.skip_used(&used);
            egress.skip_used(&used);
            placement[pair] = Some(chosen);
        }

        placement
            .into_iter()
            .enumerate()
            .map(|(pair, legs)| legs.unwrap_or_else(|| panic!("pair {} was never placed", pair)))
            .collect()
    }
}

impl CostModel for OrderedPal {
    fn name(&self) -> &'static str {
        "ordered_pal"
    }

    fn cost(&self, dc: &DataCenter) -> Cost {
        let cost: Cost = self
            .place(dc)
            .into_iter()
            .enumerate()
            .map(|(pair, legs)| dc.frequency(pair) * leg_cost(dc, legs))
            .sum();
        let cost = cost + dc.total_backbone_traffic();
        log::debug!("{}: {}", self.name(), cost);
        cost
    }
}

/// Ordered policy, traffic aware: pairs in ascending frequency fill the slots
/// closest to the first middlebox, VM and VMP in consecutive slots. With an
/// odd number of slots per PM a pair may straddle two neighbouring PMs.
#[derive(Debug, Default)]
pub struct OrderedTrafficAware {}

impl OrderedTrafficAware {
    pub fn new() -> Self {
        Default::default()
    }

    /// Slots taken by every pair, indexed by pair.
    pub fn place(&self, dc: &DataCenter) -> Vec<Legs> {
        let slots = dc.ingress_slots();
        let order = utils::algo::rank_by_key(dc.num_vm_pairs(), |&p| dc.frequency(p));
        let mut rank = vec![0; order.len()];
        for (r, pair) in order.into_iter().enumerate() {
            rank[pair] = r;
        }
        rank.into_iter().map(|r| (slots[2 * r], slots[2 * r + 1])).collect()
    }
}

impl CostModel for OrderedTrafficAware {
    fn name(&self) -> &'static str {
        "ordered_traffic_aware"
    }

    fn cost(&self, dc: &DataCenter) -> Cost {
        let backbone = dc.backbone_cost();
        let cost = self
            .place(dc)
            .into_iter()
            .enumerate()
            .map(|(pair, legs)| dc.frequency(pair) * (leg_cost(dc, legs) + backbone))
            .sum();

        log::debug!("{}: {}", self.name(), cost);
        cost
    }
}
