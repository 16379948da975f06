use std::time::Duration;

use crate::fs::append_to_file;

/// Records how long each evaluator took at a given problem scale. When
/// `PAMPAL_COLLECT_TIMING` names a file, every sample is also appended to it.
#[derive(Debug, Clone, Default)]
pub struct TimingCollector {
    // evaluator name, running time, number of VM pairs
    data: Vec<(String, Duration, usize)>,
}

impl TimingCollector {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn collect(&mut self, name: &str, duration: Duration, scale: usize) {
        self.data.push((name.to_owned(), duration, scale));

        if let Ok(path) = std::env::var("PAMPAL_COLLECT_TIMING") {
            if let Err(e) = append_to_file(&path, &format!("{} {} {}", name, scale, duration.as_nanos())) {
                log::warn!("fail to append timing sample to {}: {}", path, e);
            }
        }
    }

    pub fn samples(&self) -> &[(String, Duration, usize)] {
        &self.data
    }

    pub fn total(&self) -> Duration {
        self.data.iter().map(|x| x.1).sum()
    }
}
