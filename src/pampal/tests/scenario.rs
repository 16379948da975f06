use pampal::architecture::FatTreeArgs;
use pampal::datacenter::{DataCenterSetting, VmPlacement, FREQUENCY_TIERS};
use pampal::migration::GreedyMigration;
use pampal::unordered::{UnorderedPal, UnorderedTrafficAware};
use pampal::{CostModel, DataCenter, Error, Policy};

const RAND_SEED: u64 = 0;

fn small_setting() -> DataCenterSetting {
    DataCenterSetting::new(FatTreeArgs::new(4, 20), 4, 2, 4, 1000).with_seed(RAND_SEED)
}

fn evaluate(dc: &DataCenter) -> Vec<u64> {
    Policy::all().into_iter().map(|p| p.build().cost(dc)).collect()
}

#[test]
fn four_pods_scenario() {
    logging::try_init_log();

    let dc = DataCenter::build(small_setting()).unwrap();
    let ft = dc.fat_tree();
    assert_eq!(ft.num_pms(), 16);
    assert_eq!(ft.num_edge_switches(), 8);
    assert_eq!(ft.num_agg_switches(), 8);
    assert_eq!(ft.num_core_switches(), 4);
    assert_eq!(dc.num_middleboxes(), 2);
    assert_eq!(dc.placement().len(), 4);
    log::info!("{}", dc);

    let again = DataCenter::build(small_setting()).unwrap();
    assert_eq!(dc.chain(), again.chain());
    assert_eq!(dc.placement(), again.placement());
    assert_eq!(dc.frequencies(), again.frequencies());
    assert_eq!(evaluate(&dc), evaluate(&again));
}

#[test]
fn seeds_change_the_workload() {
    logging::try_init_log();

    let setting = DataCenterSetting::new(FatTreeArgs::new(4, 20), 4, 3, 24, 1000);
    let a = DataCenter::build(setting.clone().with_seed(1)).unwrap();
    let b = DataCenter::build(setting.with_seed(2)).unwrap();
    assert!(a.chain() != b.chain() || a.placement() != b.placement() || a.frequencies() != b.frequencies());
}

#[test]
fn capacity_holds_for_every_mode() {
    logging::try_init_log();

    for &mode in &[VmPlacement::Random, VmPlacement::Locality] {
        for seed in 0..5 {
            let setting = DataCenterSetting::new(FatTreeArgs::new(4, 20), 3, 2, 24, 1000)
                .with_seed(seed)
                .with_vm_placement(mode);
            let dc = DataCenter::build(setting).unwrap();
            assert!(dc.occupancy().iter().all(|&c| c <= 3));
            assert_eq!(dc.occupancy().iter().sum::<usize>(), 48);

            for placement in &[
                UnorderedPal::new().place(&dc),
                UnorderedTrafficAware::new().place(&dc),
                GreedyMigration::new().migrate(&dc).placement,
            ] {
                let mut used = vec![0; dc.num_pms()];
                for p in placement {
                    used[p.vm] += 1;
                    used[p.vmp] += 1;
                }
                assert!(used.iter().all(|&c| c <= 3));
            }
        }
    }
}

#[test]
fn frequencies_fall_into_tiers() {
    let setting = DataCenterSetting::new(FatTreeArgs::new(4, 20), 4, 2, 30, 1000).with_seed(RAND_SEED);
    let dc = DataCenter::build(setting).unwrap();
    let counts: Vec<usize> = FREQUENCY_TIERS
        .iter()
        .map(|t| dc.frequencies().iter().filter(|&&f| t.contains(&f)).count())
        .collect();
    assert_eq!(counts, vec![7, 22, 1]);
}

#[test]
fn route_matrix_is_symmetric() {
    let setting = DataCenterSetting::new(FatTreeArgs::new(6, 20), 4, 4, 10, 1000).with_seed(RAND_SEED);
    let dc = DataCenter::build(setting).unwrap();
    let rm = dc.route_matrix();
    assert_eq!(rm.dim(), 54);
    assert!(rm.is_symmetric());
    for i in 0..rm.dim() {
        for j in 0..rm.dim() {
            // the walk covers the direct path at least
            assert!(rm.get(i, j) >= dc.distance(i, j));
        }
    }
}

#[test]
fn no_pairs_cost_nothing() {
    logging::try_init_log();

    let setting = DataCenterSetting::new(FatTreeArgs::new(4, 20), 4, 3, 0, 1000).with_seed(RAND_SEED);
    let dc = DataCenter::build(setting).unwrap();
    assert_eq!(dc.initial_cost(), 0);
    assert!(evaluate(&dc).iter().all(|&c| c == 0));
}

#[test]
fn invalid_settings_are_rejected() {
    let odd = DataCenterSetting::new(FatTreeArgs::new(3, 20), 4, 2, 4, 1000);
    assert!(matches!(DataCenter::build(odd), Err(Error::InvalidTopology(3))));

    let full = DataCenterSetting::new(FatTreeArgs::new(4, 20), 2, 2, 17, 1000);
    match DataCenter::build(full) {
        Err(Error::InsufficientCapacity { required, available }) => {
            assert_eq!(required, 34);
            assert_eq!(available, 32);
        }
        other => panic!("unexpected: {:?}", other.map(|_| ())),
    }

    let no_slots = DataCenterSetting::new(FatTreeArgs::new(4, 20), 0, 2, 4, 1000);
    assert!(matches!(DataCenter::build(no_slots), Err(Error::InvalidParameter(_))));
}

#[test]
fn migration_never_costs_more_than_staying_put() {
    logging::try_init_log();

    // with a single pair, staying put is one of the candidates
    let setting = DataCenterSetting::new(FatTreeArgs::new(4, 5), 4, 3, 1, 1000).with_seed(11);
    let dc = DataCenter::build(setting).unwrap();
    let p = dc.placement()[0];
    let stay = dc.frequency(0) * dc.route(p.vm, p.vmp);
    assert!(GreedyMigration::new().cost(&dc) <= stay);
}
