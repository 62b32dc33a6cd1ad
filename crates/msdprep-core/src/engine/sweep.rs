use super::config::WeightScanConfig;
use crate::core::io::lists::{self, ListError};
use std::collections::HashMap;
use tracing::debug;

pub const DEFAULT_DG_WEIGHTS: [f64; 6] = [5.0, 10.0, 15.0, 20.0, 25.0, 30.0];
pub const DEFAULT_ENTITY_WEIGHTS: [f64; 1] = [1.0];

/// One point of the weight sweep. The weights travel with the name so they never
/// have to be recovered from it.
#[derive(Debug, Clone, PartialEq)]
pub struct SubJob {
    pub name: String,
    pub dg_weight: f64,
    pub entity_weight: f64,
}

impl SubJob {
    pub fn new(job_name: &str, dg_weight: f64, entity_weight: f64) -> Self {
        Self {
            name: format!("{job_name}_{dg_weight:.1}w_dGdiff_{entity_weight:.1}Ent"),
            dg_weight,
            entity_weight,
        }
    }
}

/// The dG-bonus and entity-function weight lists of a sweep.
#[derive(Debug, Clone, PartialEq)]
pub struct WeightScan {
    pub dg_weights: Vec<f64>,
    pub entity_weights: Vec<f64>,
}

impl Default for WeightScan {
    fn default() -> Self {
        Self {
            dg_weights: DEFAULT_DG_WEIGHTS.to_vec(),
            entity_weights: DEFAULT_ENTITY_WEIGHTS.to_vec(),
        }
    }
}

impl WeightScan {
    /// Reads each list from its file, falling back to the defaults.
    pub fn load(config: &WeightScanConfig) -> Result<Self, ListError> {
        let defaults = Self::default();
        let dg_weights = match &config.dg_weights_file {
            Some(path) => lists::read_weights(path)?,
            None => defaults.dg_weights,
        };
        let entity_weights = match &config.entity_weights_file {
            Some(path) => lists::read_weights(path)?,
            None => defaults.entity_weights,
        };
        Ok(Self {
            dg_weights,
            entity_weights,
        })
    }

    /// Full cross product, dG weight major. Names that collide after
    /// formatting get a two-digit counter suffix.
    pub fn expand(&self, job_name: &str) -> Vec<SubJob> {
        let mut seen: HashMap<String, usize> = HashMap::new();
        let mut sub_jobs = Vec::with_capacity(self.dg_weights.len() * self.entity_weights.len());
        for &dg in &self.dg_weights {
            for &ent in &self.entity_weights {
                let mut sub_job = SubJob::new(job_name, dg, ent);
                let count = seen.entry(sub_job.name.clone()).or_insert(0);
                if *count > 0 {
                    let renamed = format!("{}_{:02}", sub_job.name, *count);
                    debug!("Sub-job name '{}' collides; using '{}'.", sub_job.name, renamed);
                    sub_job.name = renamed;
                }
                *count += 1;
                sub_jobs.push(sub_job);
            }
        }
        sub_jobs
    }
}
