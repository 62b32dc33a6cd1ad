//! # Scheduler Module
//!
//! Renders batch-submission scripts for the two scheduler dialects the supported
//! clusters speak, and returns the shell command that submits each script.
//!
//! ## Overview
//!
//! A [`SubmissionOptions`] value describes one job (task count, queue, log file,
//! time limit, script name, MPI flag). [`render`] consumes it, writes the script
//! into a working directory and hands back a [`SubmitCommand`]. Nothing is
//! submitted here; the commands are collected into launch scripts by the job
//! manager.
//!
//! ## Architecture
//!
//! - **Rendering** ([`submission`]) - LSF (`#BSUB`) and SLURM (`#SBATCH`) script text
//! - **Partition Selection** ([`partition`]) - Node-count tiers and per-cluster queue aliases
//!
//! ## Key Capabilities
//!
//! - **Automatic partition choice** for `auto` and debug queue requests
//! - **MPI launcher wrapping** appropriate to each dialect
//! - **Shell-safe submit commands** via [`SubmitCommand::quoted`]

pub mod partition;
pub mod submission;

pub use submission::render;

use crate::core::cluster::ClusterId;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SchedulerKind {
    /// `bsub`-driven, `#BSUB` directives.
    Lsf,
    /// `sbatch`-driven, `#SBATCH` directives.
    Slurm,
}

impl fmt::Display for SchedulerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchedulerKind::Lsf => write!(f, "LSF"),
            SchedulerKind::Slurm => write!(f, "SLURM"),
        }
    }
}

/// Wall-clock limit rendered as `DD-HH:MM`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeLimit {
    pub days: u32,
    pub hours: u32,
    pub minutes: u32,
}

impl Default for TimeLimit {
    fn default() -> Self {
        Self {
            days: 1,
            hours: 0,
            minutes: 0,
        }
    }
}

impl fmt::Display for TimeLimit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}-{:02}:{:02}", self.days, self.hours, self.minutes)
    }
}

/// Everything needed to render one submission script. Built fresh for every job.
#[derive(Debug, Clone, PartialEq)]
pub struct SubmissionOptions {
    pub cluster: ClusterId,
    pub scheduler: SchedulerKind,
    pub num_nodes: u32,
    pub queue: String,
    pub job_name: String,
    pub log_file: String,
    pub time_limit: TimeLimit,
    pub script_name: String,
    pub mpi: bool,
}

impl SubmissionOptions {
    pub fn new(
        cluster: ClusterId,
        scheduler: SchedulerKind,
        job_name: impl Into<String>,
        script_name: impl Into<String>,
    ) -> Self {
        let job_name = job_name.into();
        Self {
            cluster,
            scheduler,
            num_nodes: 1,
            queue: "auto".to_string(),
            log_file: format!("{job_name}.log"),
            job_name,
            time_limit: TimeLimit::default(),
            script_name: script_name.into(),
            mpi: false,
        }
    }

    pub fn nodes(mut self, num_nodes: u32) -> Self {
        self.num_nodes = num_nodes;
        self
    }

    pub fn queue(mut self, queue: impl Into<String>) -> Self {
        self.queue = queue.into();
        self
    }

    pub fn log_file(mut self, log_file: impl Into<String>) -> Self {
        self.log_file = log_file.into();
        self
    }

    pub fn mpi(mut self, mpi: bool) -> Self {
        self.mpi = mpi;
        self
    }
}

/// The shell command that submits a rendered script, e.g. `bsub < submit.sh`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmitCommand(pub String);

impl SubmitCommand {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Single shell word suitable for passing to another command.
    pub fn quoted(&self) -> String {
        shell_words::quote(&self.0).into_owned()
    }
}

impl fmt::Display for SubmitCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn time_limit_is_zero_padded() {
        assert_eq!(TimeLimit::default().to_string(), "01-00:00");
        let t = TimeLimit {
            days: 0,
            hours: 4,
            minutes: 5,
        };
        assert_eq!(t.to_string(), "00-04:05");
    }

    #[test]
    fn new_options_default_log_file_to_job_name() {
        let opts = SubmissionOptions::new(ClusterId::Dogwood, SchedulerKind::Slurm, "j", "s.sh")
            .nodes(3)
            .queue("debug")
            .mpi(true);
        assert_eq!(opts.log_file, "j.log");
        assert_eq!(opts.num_nodes, 3);
        assert_eq!(opts.queue, "debug");
        assert!(opts.mpi);
    }
}
