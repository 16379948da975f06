use std::ops::RangeInclusive;

use rand::{rngs::StdRng, seq::SliceRandom, Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::architecture::{build_fat_tree, FatTreeArgs};
use crate::cluster::FatTree;
use crate::route::RouteMatrix;
use crate::{Cost, Error, Result};

/// Communication frequency ranges of the low, mid and high tiers.
pub const FREQUENCY_TIERS: [RangeInclusive<u64>; 3] = [0..=300, 301..=700, 701..=1000];

/// How the initial VM pairs are spread over the physical machines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VmPlacement {
    /// Every leg goes to a uniformly random PM with spare capacity.
    Random,
    /// 80% of the pairs have both legs under one edge switch.
    Locality,
}

impl Default for VmPlacement {
    fn default() -> Self {
        VmPlacement::Locality
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataCenterSetting {
    /// Random seed for middlebox placement, VM placement and frequencies
    pub seed: u64,
    /// Slots of each physical machine
    pub resources: usize,
    /// Length of the middlebox chain
    pub num_middleboxes: usize,
    /// Number of (VM, VMP) pairs
    pub num_vm_pairs: usize,
    /// Upper bound of the communication frequency, informational only
    pub max_communication_frequency: u64,
    #[serde(default)]
    pub vm_placement: VmPlacement,
    /// The parameters of the fat tree
    pub topology: FatTreeArgs,
}

impl DataCenterSetting {
    pub fn new(
        topology: FatTreeArgs,
        resources: usize,
        num_middleboxes: usize,
        num_vm_pairs: usize,
        max_communication_frequency: u64,
    ) -> Self {
        DataCenterSetting {
            seed: 0,
            resources,
            num_middleboxes,
            num_vm_pairs,
            max_communication_frequency,
            vm_placement: VmPlacement::default(),
            topology,
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_vm_placement(mut self, vm_placement: VmPlacement) -> Self {
        self.vm_placement = vm_placement;
        self
    }

    /// Check every parameter before any graph or random work happens.
    pub fn validate(&self) -> Result<()> {
        self.topology.validate()?;
        if self.resources == 0 {
            return Err(Error::InvalidParameter(
                "the resources of a physical machine must be positive".to_owned(),
            ));
        }
        if self.num_middleboxes > self.topology.num_agg_switches() {
            return Err(Error::InvalidParameter(format!(
                "{} middleboxes do not fit on {} aggregation switches",
                self.num_middleboxes,
                self.topology.num_agg_switches()
            )));
        }
        self.validate_capacity()
    }

    pub fn validate_capacity(&self) -> Result<()> {
        let required = 2 * self.num_vm_pairs;
        let available = self.topology.num_pms() * self.resources;
        if required > available {
            return Err(Error::InsufficientCapacity {
                required,
                available,
            });
        }
        Ok(())
    }
}

/// Physical machines hosting the two legs of a VM pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PairPlacement {
    pub vm: usize,
    pub vmp: usize,
}

impl PairPlacement {
    #[inline]
    pub fn new(vm: usize, vmp: usize) -> Self {
        PairPlacement { vm, vmp }
    }
}

/// One of the `resources` slots of a physical machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Slot {
    pub pm: usize,
    pub local: usize,
}

/// The workload on top of a fat tree. Built once, read-only afterwards.
#[derive(Debug, Clone)]
pub struct DataCenter {
    setting: DataCenterSetting,
    fat_tree: FatTree,
    /// switch node index of each middlebox, in chain order
    chain: Vec<usize>,
    placement: Vec<PairPlacement>,
    /// number of legs hosted by each physical machine
    occupancy: Vec<usize>,
    frequencies: Vec<u64>,
    route: RouteMatrix,
}

impl DataCenter {
    pub fn build(setting: DataCenterSetting) -> Result<Self> {
        let mut rng = StdRng::seed_from_u64(setting.seed);
        Self::build_with_rng(setting, &mut rng)
    }

    pub fn build_with_rng<R: Rng + ?Sized>(setting: DataCenterSetting, rng: &mut R) -> Result<Self> {
        setting.validate()?;
        let fat_tree = build_fat_tree(setting.topology)?;

        let chain = place_middleboxes(&fat_tree, setting.num_middleboxes, rng);
        log::debug!("middleboxes placed on switches {:?}", chain);

        let mut slots = SlotPool::new(&fat_tree, setting.resources);
        let placement = match setting.vm_placement {
            VmPlacement::Random => slots.place_random(setting.num_vm_pairs, rng),
            VmPlacement::Locality => slots.place_locality(setting.num_vm_pairs, rng),
        };
        log::debug!("{} vm pairs placed ({:?})", placement.len(), setting.vm_placement);

        let frequencies = generate_frequencies(setting.num_vm_pairs, rng);
        let route = RouteMatrix::build(&fat_tree, &chain);

        Ok(DataCenter {
            occupancy: slots.occupancy,
            setting,
            fat_tree,
            chain,
            placement,
            frequencies,
            route,
        })
    }

    /// Assemble a data center from explicit parts instead of random draws.
    /// `middleboxes` are aggregation switch positions (not node indices).
    pub fn from_parts(
        setting: DataCenterSetting,
        middleboxes: &[usize],
        placement: Vec<PairPlacement>,
        frequencies: Vec<u64>,
    ) -> Result<Self> {
        setting.validate()?;
        if middleboxes.len() != setting.num_middleboxes {
            return Err(Error::InvalidParameter(format!(
                "expected {} middleboxes, got {}",
                setting.num_middleboxes,
                middleboxes.len()
            )));
        }
        if placement.len() != setting.num_vm_pairs || frequencies.len() != setting.num_vm_pairs {
            return Err(Error::InvalidParameter(format!(
                "expected {} vm pairs, got {} placements and {} frequencies",
                setting.num_vm_pairs,
                placement.len(),
                frequencies.len()
            )));
        }

        let fat_tree = build_fat_tree(setting.topology)?;
        let mut chain = Vec::with_capacity(middleboxes.len());
        for &a in middleboxes {
            if a >= fat_tree.num_agg_switches() || chain.contains(&fat_tree.agg_switch(a)) {
                return Err(Error::InvalidParameter(format!(
                    "invalid middlebox location: aggregation switch {}",
                    a
                )));
            }
            chain.push(fat_tree.agg_switch(a));
        }

        let mut occupancy = vec![0; fat_tree.num_pms()];
        for p in &placement {
            for &pm in &[p.vm, p.vmp] {
                if pm >= fat_tree.num_pms() {
                    return Err(Error::InvalidParameter(format!("invalid pm: {}", pm)));
                }
                occupancy[pm] += 1;
                if occupancy[pm] > setting.resources {
                    return Err(Error::InvalidParameter(format!("pm {} is over capacity", pm)));
                }
            }
        }

        let route = RouteMatrix::build(&fat_tree, &chain);
        Ok(DataCenter {
            setting,
            fat_tree,
            chain,
            placement,
            occupancy,
            frequencies,
            route,
        })
    }

    #[inline]
    pub fn setting(&self) -> &DataCenterSetting {
        &self.setting
    }

    #[inline]
    pub fn fat_tree(&self) -> &FatTree {
        &self.fat_tree
    }

    #[inline]
    pub fn num_pms(&self) -> usize {
        self.fat_tree.num_pms()
    }

    #[inline]
    pub fn resources(&self) -> usize {
        self.setting.resources
    }

    #[inline]
    pub fn num_vm_pairs(&self) -> usize {
        self.setting.num_vm_pairs
    }

    #[inline]
    pub fn num_middleboxes(&self) -> usize {
        self.chain.len()
    }

    #[inline]
    pub fn migration_coef(&self) -> u64 {
        self.fat_tree.migration_coef()
    }

    #[inline]
    pub fn distance(&self, u: usize, v: usize) -> u64 {
        self.fat_tree.distance(u, v)
    }

    /// Switch node index of each middlebox, in chain order.
    #[inline]
    pub fn chain(&self) -> &[usize] {
        &self.chain
    }

    #[inline]
    pub fn first_middlebox(&self) -> Option<usize> {
        self.chain.first().copied()
    }

    #[inline]
    pub fn last_middlebox(&self) -> Option<usize> {
        self.chain.last().copied()
    }

    /// Hops from a node to the first middlebox, 0 for an empty chain.
    #[inline]
    pub fn dist_to_first(&self, node: usize) -> u64 {
        self.first_middlebox().map_or(0, |mb| self.distance(node, mb))
    }

    /// Hops from a node to the last middlebox, 0 for an empty chain.
    #[inline]
    pub fn dist_to_last(&self, node: usize) -> u64 {
        self.last_middlebox().map_or(0, |mb| self.distance(node, mb))
    }

    #[inline]
    pub fn placement(&self) -> &[PairPlacement] {
        &self.placement
    }

    #[inline]
    pub fn occupancy(&self) -> &[usize] {
        &self.occupancy
    }

    #[inline]
    pub fn frequencies(&self) -> &[u64] {
        &self.frequencies
    }

    #[inline]
    pub fn frequency(&self, pair: usize) -> u64 {
        self.frequencies[pair]
    }

    #[inline]
    pub fn route_matrix(&self) -> &RouteMatrix {
        &self.route
    }

    #[inline]
    pub fn route(&self, src: usize, dst: usize) -> Cost {
        self.route.get(src, dst)
    }

    /// Hops along the chain in index order.
    pub fn backbone_cost(&self) -> Cost {
        self.chain
            .windows(2)
            .map(|w| self.distance(w[0], w[1]))
            .sum()
    }

    pub fn total_frequency(&self) -> u64 {
        self.frequencies.iter().sum()
    }

    /// Traffic every pair sends through the chain under the ordered policy.
    pub fn total_backbone_traffic(&self) -> Cost {
        self.backbone_cost() * self.total_frequency()
    }

    /// Communication cost of the current placement under the ordered policy.
    pub fn initial_cost(&self) -> Cost {
        let edges: Cost = self
            .placement
            .iter()
            .zip(&self.frequencies)
            .map(|(p, &f)| f * (self.dist_to_first(p.vm) + self.dist_to_last(p.vmp)))
            .sum();
        edges + self.total_backbone_traffic()
    }

    /// Physical machines by ascending distance to `switch`, ties by PM index.
    /// Without a switch every PM is equally close.
    pub fn ranked_pms(&self, switch: Option<usize>) -> Vec<usize> {
        utils::algo::rank_by_key(self.num_pms(), |&pm| {
            switch.map_or(0, |s| self.distance(s, pm))
        })
    }

    fn slots_near(&self, switch: Option<usize>) -> Vec<Slot> {
        let wanted = 2 * self.num_vm_pairs();
        self.ranked_pms(switch)
            .into_iter()
            .flat_map(|pm| (0..self.resources()).map(move |local| Slot { pm, local }))
            .take(wanted)
            .collect()
    }

    /// `2 * num_vm_pairs` slots, closest to the first middlebox first.
    pub fn ingress_slots(&self) -> Vec<Slot> {
        self.slots_near(self.first_middlebox())
    }

    /// `2 * num_vm_pairs` slots, closest to the last middlebox first.
    pub fn egress_slots(&self) -> Vec<Slot> {
        self.slots_near(self.last_middlebox())
    }
}

impl std::fmt::Display for DataCenter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = &self.setting;
        let ft = &self.fat_tree;
        writeln!(f, "Information of Data Center")?;
        writeln!(
            f,
            "Number of Pods: {}\t\tMigration Coefficient: {}",
            ft.num_pods(),
            ft.migration_coef()
        )?;
        writeln!(
            f,
            "Resources of each PM: {}\t\tNumber of Middle boxes: {}",
            s.resources, s.num_middleboxes
        )?;
        writeln!(
            f,
            "Number of VM Pairs: {}\t\tMaximum Communication Frequency: {}",
            s.num_vm_pairs, s.max_communication_frequency
        )?;
        writeln!(
            f,
            "Number of physical machines: {}\t\tNumber of Edge Switches: {}",
            ft.num_pms(),
            ft.num_edge_switches()
        )?;
        write!(
            f,
            "Number of Aggregation Switches: {}\tNumber of Core Switches: {}",
            ft.num_agg_switches(),
            ft.num_core_switches()
        )
    }
}

/// Pick `num_mbs` distinct aggregation switches uniformly at random.
pub fn place_middleboxes<R: Rng + ?Sized>(fat_tree: &FatTree, num_mbs: usize, rng: &mut R) -> Vec<usize> {
    rand::seq::index::sample(rng, fat_tree.num_agg_switches(), num_mbs)
        .into_iter()
        .map(|a| fat_tree.agg_switch(a))
        .collect()
}

/// Stratified frequencies: a random `n / 4` of the pairs draw from the low
/// tier, another `3n / 4` from the mid tier and the rest from the high tier.
pub fn generate_frequencies<R: Rng + ?Sized>(num_vm_pairs: usize, rng: &mut R) -> Vec<u64> {
    let low = num_vm_pairs / 4;
    let mid = 3 * num_vm_pairs / 4;

    let mut order: Vec<usize> = (0..num_vm_pairs).collect();
    order.shuffle(rng);

    let mut frequencies = vec![0; num_vm_pairs];
    for (rank, &pair) in order.iter().enumerate() {
        let tier = if rank < low {
            &FREQUENCY_TIERS[0]
        } else if rank < low + mid {
            &FREQUENCY_TIERS[1]
        } else {
            &FREQUENCY_TIERS[2]
        };
        frequencies[pair] = rng.gen_range(tier.clone());
    }
    frequencies
}

/// Free slots during the initial placement. Saturated PMs leave their rack,
/// and racks without a free PM leave the pool.
struct SlotPool {
    resources: usize,
    occupancy: Vec<usize>,
    /// PMs with spare capacity under each edge switch
    racks: Vec<Vec<usize>>,
    /// spare slots under each edge switch
    spare: Vec<usize>,
    /// edge switches with spare capacity
    open: Vec<usize>,
}

impl SlotPool {
    fn new(fat_tree: &FatTree, resources: usize) -> Self {
        let racks = fat_tree.edge_switch_to_pms();
        let spare = racks.iter().map(|r| r.len() * resources).collect();
        SlotPool {
            resources,
            occupancy: vec![0; fat_tree.num_pms()],
            open: (0..racks.len()).collect(),
            racks,
            spare,
        }
    }

    fn take<R: Rng + ?Sized>(&mut self, rack: usize, rng: &mut R) -> usize {
        let pms = &mut self.racks[rack];
        assert!(!pms.is_empty(), "rack {} has no free pm", rack);
        let i = rng.gen_range(0..pms.len());
        let pm = pms[i];
        self.occupancy[pm] += 1;
        self.spare[rack] -= 1;
        if self.occupancy[pm] == self.resources {
            pms.remove(i);
            if pms.is_empty() {
                self.open.retain(|&r| r != rack);
            }
        }
        pm
    }

    fn take_anywhere<R: Rng + ?Sized>(&mut self, rng: &mut R) -> usize {
        assert!(!self.open.is_empty(), "no physical machine with spare capacity");
        let rack = self.open[rng.gen_range(0..self.open.len())];
        self.take(rack, rng)
    }

    fn take_uniform<R: Rng + ?Sized>(&mut self, rng: &mut R) -> usize {
        let free: Vec<(usize, usize)> = self
            .open
            .iter()
            .flat_map(|&r| self.racks[r].iter().map(move |&pm| (r, pm)))
            .collect();
        assert!(!free.is_empty(), "no physical machine with spare capacity");
        let (rack, pm) = free[rng.gen_range(0..free.len())];
        let i = self.racks[rack]
            .iter()
            .position(|&x| x == pm)
            .unwrap_or_else(|| panic!("pm {} missing from rack {}", pm, rack));
        self.racks[rack].swap(0, i);
        self.occupancy[pm] += 1;
        self.spare[rack] -= 1;
        if self.occupancy[pm] == self.resources {
            self.racks[rack].swap_remove(0);
            if self.racks[rack].is_empty() {
                self.open.retain(|&r| r != rack);
            }
        }
        pm
    }

    fn place_random<R: Rng + ?Sized>(&mut self, num_vm_pairs: usize, rng: &mut R) -> Vec<PairPlacement> {
        (0..num_vm_pairs)
            .map(|_| {
                let vm = self.take_uniform(rng);
                let vmp = self.take_uniform(rng);
                PairPlacement::new(vm, vmp)
            })
            .collect()
    }

    fn place_locality<R: Rng + ?Sized>(&mut self, num_vm_pairs: usize, rng: &mut R) -> Vec<PairPlacement> {
        let colocated = num_vm_pairs * 4 / 5;
        let mut placement = Vec::with_capacity(num_vm_pairs);

        for _ in 0..colocated {
            let candidates: Vec<usize> = self
                .open
                .iter()
                .copied()
                .filter(|&r| self.spare[r] >= 2)
                .collect();
            let pair = if candidates.is_empty() {
                // no rack can take both legs any more
                PairPlacement::new(self.take_anywhere(rng), self.take_anywhere(rng))
            } else {
                let rack = candidates[rng.gen_range(0..candidates.len())];
                PairPlacement::new(self.take(rack, rng), self.take(rack, rng))
            };
            placement.push(pair);
        }

        for _ in colocated..num_vm_pairs {
            let vm = self.take_anywhere(rng);
            let vmp = self.take_anywhere(rng);
            placement.push(PairPlacement::new(vm, vmp));
        }

        placement
    }
}
