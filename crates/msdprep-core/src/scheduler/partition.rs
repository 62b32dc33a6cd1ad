use super::{SubmissionOptions, TimeLimit};
use crate::core::cluster::ClusterId;
use tracing::debug;

/// Node counts strictly below this go to the smallest Dogwood partition.
pub const SMALL_PARTITION_NODE_LIMIT: u32 = 45;
/// Node counts strictly below this (and not small) go to the mid partition.
pub const MID_PARTITION_NODE_LIMIT: u32 = 529;
/// Longleaf MPI jobs never request more tasks than this.
pub const LONGLEAF_MPI_NODE_CAP: u32 = 24;

pub const SHORT_TIME_LIMIT: TimeLimit = TimeLimit {
    days: 0,
    hours: 4,
    minutes: 0,
};

const DOGWOOD_SMALL: &str = "cleanup_queue";
const DOGWOOD_MID: &str = "528_queue";
const DOGWOOD_LARGE: &str = "2112_queue";
const LONGLEAF_MPI: &str = "SNP";
const LONGLEAF_GENERAL: &str = "general";

const AUTO: &str = "auto";
const DEBUG_ALIASES: [&str; 2] = ["debug", "debug_queue"];

/// Replaces the `auto` and debug queue aliases with a concrete SLURM partition
/// for the target cluster, adjusting the time limit or node count where the
/// partition demands it.
pub fn resolve_slurm_partition(options: &mut SubmissionOptions) {
    match options.cluster {
        ClusterId::Dogwood => resolve_dogwood(options),
        ClusterId::Longleaf => resolve_longleaf(options),
        other => {
            debug_assert!(false, "no SLURM partition table for cluster '{other}'");
        }
    }
    debug!(
        "Resolved partition '{}' for job '{}' ({} tasks).",
        options.queue, options.job_name, options.num_nodes
    );
}

fn resolve_dogwood(options: &mut SubmissionOptions) {
    if options.queue == AUTO {
        let partition = if options.num_nodes < SMALL_PARTITION_NODE_LIMIT {
            options.time_limit = SHORT_TIME_LIMIT;
            DOGWOOD_SMALL
        } else if options.num_nodes < MID_PARTITION_NODE_LIMIT {
            DOGWOOD_MID
        } else {
            DOGWOOD_LARGE
        };
        options.queue = partition.to_string();
    } else if DEBUG_ALIASES.contains(&options.queue.as_str()) {
        options.queue = DOGWOOD_SMALL.to_string();
        options.time_limit = SHORT_TIME_LIMIT;
    }
}

fn resolve_longleaf(options: &mut SubmissionOptions) {
    if options.mpi {
        options.queue = LONGLEAF_MPI.to_string();
        options.num_nodes = options.num_nodes.min(LONGLEAF_MPI_NODE_CAP);
    } else if options.queue == AUTO {
        options.queue = LONGLEAF_GENERAL.to_string();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheduler::SchedulerKind;

    fn options(cluster: ClusterId, nodes: u32, queue: &str, mpi: bool) -> SubmissionOptions {
        let mut opts = SubmissionOptions::new(cluster, SchedulerKind::Slurm, "job", "submit.sh");
        opts.num_nodes = nodes;
        opts.queue = queue.to_string();
        opts.mpi = mpi;
        opts
    }

    fn resolved(cluster: ClusterId, nodes: u32, queue: &str, mpi: bool) -> SubmissionOptions {
        let mut opts = options(cluster, nodes, queue, mpi);
        resolve_slurm_partition(&mut opts);
        opts
    }

    #[test]
    fn auto_queue_is_tiered_by_node_count() {
        let small = resolved(ClusterId::Dogwood, 10, "auto", true);
        let mid = resolved(ClusterId::Dogwood, 100, "auto", true);
        let large = resolved(ClusterId::Dogwood, 1000, "auto", true);
        assert_eq!(small.queue, "cleanup_queue");
        assert_eq!(small.time_limit, SHORT_TIME_LIMIT);
        assert_eq!(mid.queue, "528_queue");
        assert_eq!(mid.time_limit, TimeLimit::default());
        assert_eq!(large.queue, "2112_queue");
    }

    #[test]
    fn tier_boundaries_select_the_higher_tier() {
        assert_eq!(resolved(ClusterId::Dogwood, 44, "auto", true).queue, "cleanup_queue");
        assert_eq!(resolved(ClusterId::Dogwood, 45, "auto", true).queue, "528_queue");
        assert_eq!(resolved(ClusterId::Dogwood, 528, "auto", true).queue, "528_queue");
        assert_eq!(resolved(ClusterId::Dogwood, 529, "auto", true).queue, "2112_queue");
    }

    #[test]
    fn debug_aliases_force_the_short_cleanup_partition() {
        for alias in ["debug", "debug_queue"] {
            let opts = resolved(ClusterId::Dogwood, 1, alias, false);
            assert_eq!(opts.queue, "cleanup_queue");
            assert_eq!(opts.time_limit, SHORT_TIME_LIMIT);
        }
    }

    #[test]
    fn explicit_queues_pass_through() {
        let opts = resolved(ClusterId::Dogwood, 10, "528_queue", true);
        assert_eq!(opts.queue, "528_queue");
        assert_eq!(opts.time_limit, TimeLimit::default());
    }

    #[test]
    fn longleaf_mpi_jobs_are_capped() {
        let opts = resolved(ClusterId::Longleaf, 100, "auto", true);
        assert_eq!(opts.queue, "SNP");
        assert_eq!(opts.num_nodes, LONGLEAF_MPI_NODE_CAP);

        let opts = resolved(ClusterId::Longleaf, 12, "auto", true);
        assert_eq!(opts.num_nodes, 12);

        let opts = resolved(ClusterId::Longleaf, 1, "auto", false);
        assert_eq!(opts.queue, "general");

        let opts = resolved(ClusterId::Longleaf, 1, "debug_queue", false);
        assert_eq!(opts.queue, "debug_queue");
    }
}
