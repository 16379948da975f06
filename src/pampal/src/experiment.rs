use std::path::PathBuf;
use std::time::Instant;

use structopt::StructOpt;

use pampal::architecture::FatTreeArgs;
use pampal::config::{read_config, ExperimentConfig};
use pampal::datacenter::{DataCenterSetting, VmPlacement};
use pampal::mcf::{self, FlowProblem};
use pampal::{DataCenter, Report};
use utils::collector::TimingCollector;

#[derive(Debug, Clone, StructOpt)]
#[structopt(name = "PAL/PAM Experiment", about = "Placement and migration cost of VM pairs behind a middlebox chain")]
pub struct Opt {
    /// The configure file, other data center options are ignored when it is given
    #[structopt(short = "c", long = "config")]
    pub config: Option<PathBuf>,

    #[structopt(flatten)]
    pub topology: FatTreeArgs,

    /// Slots of each physical machine
    #[structopt(short = "r", long = "resources", default_value = "20")]
    pub resources: usize,

    /// Number of middleboxes in the chain
    #[structopt(short = "b", long = "middleboxes", default_value = "3")]
    pub num_middleboxes: usize,

    /// Number of VM pairs
    #[structopt(short = "n", long = "pairs", default_value = "1000")]
    pub num_vm_pairs: usize,

    /// Maximum communication frequency
    #[structopt(short = "f", long = "max-frequency", default_value = "1000")]
    pub max_frequency: u64,

    /// Random seed
    #[structopt(short = "s", long = "seed", default_value = "0")]
    pub seed: u64,

    /// Place VM legs uniformly at random instead of next to each other
    #[structopt(long = "random")]
    pub random: bool,

    /// Number of trials
    #[structopt(long = "repeat", default_value = "1")]
    pub repeat: usize,

    /// Output directory
    #[structopt(short = "d", long = "directory")]
    pub directory: Option<PathBuf>,

    /// Solver output holding the min-cost flow summary line
    #[structopt(long = "solver-result")]
    pub solver_result: Option<PathBuf>,

    /// The maximal number of threads
    #[structopt(short = "P", long = "parallel")]
    pub parallel: Option<usize>,
}

impl Opt {
    fn to_config(&self) -> ExperimentConfig {
        let vm_placement = if self.random {
            VmPlacement::Random
        } else {
            VmPlacement::Locality
        };
        let setting = DataCenterSetting::new(
            self.topology,
            self.resources,
            self.num_middleboxes,
            self.num_vm_pairs,
            self.max_frequency,
        )
        .with_seed(self.seed)
        .with_vm_placement(vm_placement);

        let mut config = ExperimentConfig::new(setting);
        config.repeat = self.repeat;
        config.directory = self.directory.clone();
        config.solver_result = self.solver_result.clone();
        config
    }
}

fn main() -> anyhow::Result<()> {
    logging::init_log();

    let opt = Opt::from_args();
    log::info!("Opts: {:#?}", opt);

    let config = if let Some(path) = &opt.config {
        log::info!("parsing experiment configuration from file: {:?}", path);
        read_config(path)?
    } else {
        opt.to_config()
    };
    log::info!("config: {:#?}", config);

    if let Some(n) = opt.parallel {
        log::info!("using {} threads", n);
        rayon::ThreadPoolBuilder::new().num_threads(n).build_global()?;
    }

    // start from an empty result file holding the configuration
    let result_file = match &config.directory {
        Some(dir) => {
            let file = utils::fs::fresh_file_in(dir, "result.txt")?;
            utils::fs::append_to_file(&file, &toml::to_string(&config)?)?;
            Some(file)
        }
        None => None,
    };

    let mut timing = TimingCollector::new();
    for trial in 0..config.repeat {
        let report = run_trial(&config, trial, &mut timing)?;
        println!("{}", report);
        if let Some(file) = &result_file {
            utils::fs::append_to_file(file, &format!("# trial {}\n{}", trial, report.to_toml()?))?;
        }
    }

    for (name, duration, scale) in timing.samples() {
        log::debug!("{} with {} pairs: {:?}", name, scale, duration);
    }
    log::info!("evaluators took {:?} in total", timing.total());
    Ok(())
}

fn run_trial(config: &ExperimentConfig, trial: usize, timing: &mut TimingCollector) -> anyhow::Result<Report> {
    let seed = config.datacenter.seed + trial as u64;
    let setting = config.datacenter.clone().with_seed(seed);

    let start = Instant::now();
    let dc = DataCenter::build(setting)?;
    log::info!("trial {}: data center built in {:?}\n{}", trial, start.elapsed(), dc);
    log::trace!("cluster:\n{}", dc.fat_tree().to_dot());

    let mut report = Report::new(trial, &dc);
    for &policy in &config.policies {
        let model = policy.build();
        let start = Instant::now();
        let cost = model.cost(&dc);
        timing.collect(model.name(), start.elapsed(), dc.num_vm_pairs());
        log::info!("trial {}: {} cost {}", trial, policy, cost);
        report.record(policy, cost);
    }

    if let Some(dir) = &config.directory {
        let path = dir.join(format!("mcf_{}.inp", trial));
        FlowProblem::from_datacenter(&dc).save(&path)?;

        if let Some(argv) = &config.solver_command {
            let mut cmd = utils::cmd_helper::build_command(argv)?;
            cmd.arg(&path);
            let output = utils::cmd_helper::get_command_output(cmd)?;
            report.min_cost_flow = Some(mcf::total_cost_from_summary(&dc, output.as_bytes())?);
        }
    }

    if report.min_cost_flow.is_none() {
        if let Some(path) = &config.solver_result {
            let file = std::fs::File::open(path)?;
            let cost = mcf::total_cost_from_summary(&dc, std::io::BufReader::new(file))?;
            report.min_cost_flow = Some(cost);
        }
    }

    Ok(report)
}
