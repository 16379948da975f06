use pampal::architecture::FatTreeArgs;
use pampal::datacenter::DataCenterSetting;
use pampal::mcf::{self, FlowProblem};
use pampal::{DataCenter, Error};

fn datacenter(pairs: usize) -> DataCenter {
    let setting = DataCenterSetting::new(FatTreeArgs::new(4, 20), 4, 3, pairs, 1000).with_seed(5);
    DataCenter::build(setting).unwrap()
}

#[test]
fn problem_round_trip() {
    logging::try_init_log();

    let dc = datacenter(6);
    let problem = FlowProblem::from_datacenter(&dc);
    assert_eq!(problem.num_nodes, 2 * 6 + 16 + 2);
    assert_eq!(problem.num_arcs(), 2 * 6 + 2 * 6 * 16 + 16);

    let parsed: FlowProblem = problem.to_string().parse().unwrap();
    assert_eq!(parsed.num_nodes, problem.num_nodes);
    assert_eq!(parsed.num_arcs(), problem.num_arcs());
    for (a, b) in parsed.arcs.iter().zip(&problem.arcs) {
        assert_eq!((a.tail, a.head, a.cost), (b.tail, b.head, b.cost));
    }
    assert_eq!(parsed, problem);
}

#[test]
fn save_and_read_back() {
    logging::try_init_log();

    let dc = datacenter(3);
    let problem = FlowProblem::from_datacenter(&dc);
    let dir = std::env::temp_dir().join(format!("pampal-mcf-{}", std::process::id()));
    let path = utils::fs::fresh_file_in(&dir, "problem.inp").unwrap();
    problem.save(&path).unwrap();

    let text = std::fs::read_to_string(&path).unwrap();
    assert!(text.starts_with("c **** INFORMATION ABOUT DATA CENTER ****\n"));
    let header = format!("p min {} {}", problem.num_nodes, problem.num_arcs());
    assert!(text.lines().any(|l| l == header));
    assert_eq!(text.parse::<FlowProblem>().unwrap(), problem);

    std::fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn every_leg_reaches_every_pm() {
    let dc = datacenter(4);
    let problem = FlowProblem::from_datacenter(&dc);
    let legs = 8;
    let sink = problem.num_nodes - 1;
    for leg in 1..=legs {
        let heads: Vec<usize> = problem
            .arcs
            .iter()
            .filter(|a| a.tail == leg)
            .map(|a| a.head)
            .collect();
        assert_eq!(heads, (legs + 1..legs + 1 + 16).collect::<Vec<_>>());
    }
    let to_sink = problem.arcs.iter().filter(|a| a.head == sink).count();
    assert_eq!(to_sink, 16);
    // a leg staying where it is pays no migration
    let p = dc.placement()[0];
    let stay = problem
        .arcs
        .iter()
        .find(|a| a.tail == 1 && a.head == legs + 1 + p.vm)
        .unwrap();
    assert_eq!(stay.cost, dc.frequency(0) * dc.dist_to_first(p.vm));
}

#[test]
fn solver_summary() {
    let dc = datacenter(4);
    let output = "c cs2 output\nc nodes 26\ns 4321\nc\ns 1\n";
    assert_eq!(mcf::parse_summary(output.as_bytes()).unwrap(), 4321);
    assert_eq!(
        mcf::total_cost_from_summary(&dc, output.as_bytes()).unwrap(),
        4321 + dc.total_backbone_traffic()
    );
    assert!(matches!(
        mcf::total_cost_from_summary(&dc, "c no summary\n".as_bytes()),
        Err(Error::SolverResultParse)
    ));
}
