use serde::{Deserialize, Serialize};

use crate::datacenter::DataCenterSetting;
use crate::Policy;

fn default_policies() -> Vec<Policy> {
    Policy::all()
}

fn default_repeat() -> usize {
    1
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExperimentConfig {
    /// Evaluators to run, all of them by default
    #[serde(default = "default_policies")]
    pub policies: Vec<Policy>,

    /// Number of trials, trial t uses seed + t
    #[serde(default = "default_repeat")]
    pub repeat: usize,

    /// Output directory for result.txt and the min-cost flow problems
    #[serde(default)]
    pub directory: Option<std::path::PathBuf>,

    /// External min-cost flow solver, run with the problem file appended
    /// to its arguments; its stdout carries the summary line
    #[serde(default)]
    pub solver_command: Option<Vec<String>>,

    /// Solver output to read the min-cost flow cost from
    #[serde(default)]
    pub solver_result: Option<std::path::PathBuf>,

    /// Data center settings
    pub datacenter: DataCenterSetting,
}

impl ExperimentConfig {
    pub fn new(datacenter: DataCenterSetting) -> Self {
        ExperimentConfig {
            policies: default_policies(),
            repeat: default_repeat(),
            directory: None,
            solver_command: None,
            solver_result: None,
            datacenter,
        }
    }
}

pub fn read_config<P: AsRef<std::path::Path>>(path: P) -> anyhow::Result<ExperimentConfig> {
    use anyhow::Context;
    let path = path.as_ref();
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("fail to open file: {}", path.display()))?;
    let config = toml::from_str(&content).with_context(|| format!("parse failed: {}", path.display()))?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datacenter::VmPlacement;

    #[test]
    fn parse_minimal() {
        let text = r#"
[datacenter]
seed = 1
resources = 4
num_middleboxes = 2
num_vm_pairs = 4
max_communication_frequency = 1000

[datacenter.topology]
pods = 4
migration_coef = 20
"#;
        let config: ExperimentConfig = toml::from_str(text).unwrap();
        assert_eq!(config.repeat, 1);
        assert_eq!(config.policies, Policy::all());
        assert_eq!(config.datacenter.vm_placement, VmPlacement::Locality);
        assert_eq!(config.datacenter.topology.pods, 4);
        assert!(config.directory.is_none());
    }

    #[test]
    fn parse_full() {
        let text = r#"
policies = ["OrderedPal", "Plan"]
repeat = 3
directory = "/tmp/pampal"
solver_command = ["cs2", "-v"]
solver_result = "/tmp/pampal/mcf.out"

[datacenter]
seed = 1
resources = 20
num_middleboxes = 3
num_vm_pairs = 1000
max_communication_frequency = 1000
vm_placement = "Random"

[datacenter.topology]
pods = 8
migration_coef = 20
"#;
        let config: ExperimentConfig = toml::from_str(text).unwrap();
        assert_eq!(config.policies, vec![Policy::OrderedPal, Policy::Plan]);
        assert_eq!(config.repeat, 3);
        assert_eq!(config.solver_command, Some(vec!["cs2".to_owned(), "-v".to_owned()]));
        assert_eq!(config.datacenter.vm_placement, VmPlacement::Random);
        assert_eq!(
            config.solver_result.as_deref(),
            Some(std::path::Path::new("/tmp/pampal/mcf.out"))
        );
    }

    #[test]
    fn shipped_config() {
        let path = concat!(env!("CARGO_MANIFEST_DIR"), "/config/default.toml");
        let config = read_config(path).unwrap();
        assert_eq!(config.datacenter.topology.pods, 8);
        assert_eq!(config.datacenter.num_vm_pairs, 1000);
        assert!(config.datacenter.validate().is_ok());
        assert!(read_config("/nonexistent/pampal.toml").is_err());
    }

    #[test]
    fn unknown_fields_rejected() {
        let text = r#"
repeats = 3

[datacenter]
seed = 1
resources = 4
num_middleboxes = 2
num_vm_pairs = 4
max_communication_frequency = 1000

[datacenter.topology]
pods = 4
migration_coef = 20
"#;
        assert!(toml::from_str::<ExperimentConfig>(text).is_err());
    }
}
