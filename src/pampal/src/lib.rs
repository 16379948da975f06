//! Placement and migration cost evaluation for VM pairs whose traffic must
//! traverse a chain of middleboxes in a fat-tree data center.
//!
//! The [`datacenter::DataCenter`] is built once from a
//! [`datacenter::DataCenterSetting`] and is read-only afterwards. Every
//! [`CostModel`] is a pure function of it.

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod architecture;
pub mod cluster;
pub mod config;
pub mod datacenter;
pub mod mcf;
pub mod migration;
pub mod ordered;
pub mod plan;
pub mod report;
pub mod route;
pub mod unordered;

pub use datacenter::{DataCenter, DataCenterSetting};
pub use report::Report;

/// Hop counts weighted by communication frequencies or migration coefficients.
pub type Cost = u64;

#[derive(Error, Debug)]
pub enum Error {
    #[error("cannot build a fat tree with an odd number of pods: {0}")]
    InvalidTopology(usize),
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
    #[error("not enough capacity for the VM pairs, required: {required}, available: {available}")]
    InsufficientCapacity { required: usize, available: usize },
    #[error("no summary line found in the solver result")]
    SolverResultParse,
    #[error("malformed min-cost flow problem at line {line}: {reason}")]
    MalformedProblem { line: usize, reason: String },
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

/// A placement heuristic that scores a data center.
pub trait CostModel {
    fn name(&self) -> &'static str;
    fn cost(&self, dc: &DataCenter) -> Cost;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Policy {
    /// Ordered chain, frequency-ranked ingress/egress slots.
    OrderedPal,
    /// Ordered chain, pairs packed next to the first middlebox.
    OrderedTrafficAware,
    /// Unordered chain, cheapest route-matrix combinations first.
    UnorderedPal,
    /// Unordered chain, co-located pairs preferred.
    UnorderedTrafficAware,
    /// Greedy migration towards cheaper PM combinations.
    GreedyMigration,
    /// Per-pair nearest-neighbour chain ordering without migration.
    Plan,
}

impl Policy {
    pub fn all() -> Vec<Policy> {
        vec![
            Policy::OrderedPal,
            Policy::OrderedTrafficAware,
            Policy::UnorderedPal,
            Policy::UnorderedTrafficAware,
            Policy::GreedyMigration,
            Policy::Plan,
        ]
    }

    pub fn build(self) -> Box<dyn CostModel> {
        match self {
            Policy::OrderedPal => Box::new(ordered::OrderedPal::new()),
            Policy::OrderedTrafficAware => Box::new(ordered::OrderedTrafficAware::new()),
            Policy::UnorderedPal => Box::new(unordered::UnorderedPal::new()),
            Policy::UnorderedTrafficAware => Box::new(unordered::UnorderedTrafficAware::new()),
            Policy::GreedyMigration => Box::new(migration::GreedyMigration::new()),
            Policy::Plan => Box::new(plan::Plan::new()),
        }
    }
}

impl std::fmt::Display for Policy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}
