use serde::{Deserialize, Serialize};

use crate::datacenter::{DataCenter, DataCenterSetting};
use crate::{Cost, Policy};

/// Costs of one trial. A policy that was not run stays `None`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    pub trial: usize,
    pub initial_cost: Cost,
    pub ordered_pal: Option<Cost>,
    pub ordered_traffic_aware: Option<Cost>,
    pub unordered_pal: Option<Cost>,
    pub unordered_traffic_aware: Option<Cost>,
    /// solver flow cost plus the chain traffic
    pub min_cost_flow: Option<Cost>,
    pub greedy_migration: Option<Cost>,
    pub plan: Option<Cost>,
    pub setting: DataCenterSetting,
}

impl Report {
    pub fn new(trial: usize, dc: &DataCenter) -> Self {
        Report {
            trial,
            initial_cost: dc.initial_cost(),
            ordered_pal: None,
            ordered_traffic_aware: None,
            unordered_pal: None,
            unordered_traffic_aware: None,
            min_cost_flow: None,
            greedy_migration: None,
            plan: None,
            setting: dc.setting().clone(),
        }
    }

    pub fn record(&mut self, policy: Policy, cost: Cost) {
        let slot = match policy {
            Policy::OrderedPal => &mut self.ordered_pal,
            Policy::OrderedTrafficAware => &mut self.ordered_traffic_aware,
            Policy::UnorderedPal => &mut self.unordered_pal,
            Policy::UnorderedTrafficAware => &mut self.unordered_traffic_aware,
            Policy::GreedyMigration => &mut self.greedy_migration,
            Policy::Plan => &mut self.plan,
        };
        *slot = Some(cost);
    }

    pub fn get(&self, policy: Policy) -> Option<Cost> {
        match policy {
            Policy::OrderedPal => self.ordered_pal,
            Policy::OrderedTrafficAware => self.ordered_traffic_aware,
            Policy::UnorderedPal => self.unordered_pal,
            Policy::UnorderedTrafficAware => self.unordered_traffic_aware,
            Policy::GreedyMigration => self.greedy_migration,
            Policy::Plan => self.plan,
        }
    }

    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string(self)
    }
}

impl std::fmt::Display for Report {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let show = |c: Option<Cost>| c.map_or_else(|| "-".to_owned(), |c| c.to_string());
        writeln!(f, "trial {}, initial cost {}", self.trial, self.initial_cost)?;
        writeln!(f, "************ PAL *************")?;
        writeln!(f, "ordered pal: {}", show(self.ordered_pal))?;
        writeln!(f, "ordered traffic aware: {}", show(self.ordered_traffic_aware))?;
        writeln!(f, "unordered pal: {}", show(self.unordered_pal))?;
        writeln!(f, "unordered traffic aware: {}", show(self.unordered_traffic_aware))?;
        writeln!(f, "************ PAM *************")?;
        writeln!(f, "min-cost flow: {}", show(self.min_cost_flow))?;
        writeln!(f, "greedy migration: {}", show(self.greedy_migration))?;
        write!(f, "plan: {}", show(self.plan))
    }
}
