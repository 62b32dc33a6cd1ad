use super::partition::resolve_slurm_partition;
use super::{SchedulerKind, SubmissionOptions, SubmitCommand};
use std::io;
use std::path::Path;
use tracing::debug;

/// Queue substituted for `auto` under LSF.
pub const LSF_AUTO_QUEUE: &str = "week";
const SLURM_MPI_LAUNCHER: &str = "$MPI_HOME/bin/mpirun";
const LSF_MPI_LAUNCHER: &str = "mpirun";

/// Writes the submission script for `options` into `working_dir` and returns the
/// command that submits it.
///
/// The returned command may contain a shell redirection; callers embedding it in
/// another command must quote it (see [`SubmitCommand::quoted`]).
///
/// # Errors
///
/// Propagates the raw I/O error if the script cannot be written.
pub fn render(
    mut options: SubmissionOptions,
    command_line: &str,
    working_dir: &Path,
) -> io::Result<SubmitCommand> {
    let (script, command) = match options.scheduler {
        SchedulerKind::Lsf => render_lsf(&options, command_line),
        SchedulerKind::Slurm => {
            resolve_slurm_partition(&mut options);
            render_slurm(&options, command_line)
        }
    };
    let path = working_dir.join(&options.script_name);
    std::fs::write(&path, script)?;
    debug!("Wrote submission script '{}'.", path.display());
    Ok(command)
}

fn render_lsf(options: &SubmissionOptions, command_line: &str) -> (String, SubmitCommand) {
    let queue = if options.queue == "auto" {
        LSF_AUTO_QUEUE
    } else {
        options.queue.as_str()
    };

    let mut lines = vec![
        "#!/bin/bash".to_string(),
        format!("#BSUB -n {}", options.num_nodes),
        format!("#BSUB -q {queue}"),
        format!("#BSUB -o {}", options.log_file),
    ];
    if options.mpi {
        lines.push("#BSUB -a mvapich".to_string());
        lines.push(format!("{LSF_MPI_LAUNCHER} {}", command_line.trim_end()));
    } else {
        lines.push(command_line.trim_end().to_string());
    }

    let command = SubmitCommand(format!("bsub < {}", options.script_name));
    (finish(lines), command)
}

fn render_slurm(options: &SubmissionOptions, command_line: &str) -> (String, SubmitCommand) {
    let mut lines = vec![
        "#!/bin/bash".to_string(),
        format!("#SBATCH --job-name={}", options.job_name),
        "#SBATCH --distribution=cyclic:cyclic".to_string(),
        format!("#SBATCH --ntasks={}", options.num_nodes),
        format!("#SBATCH --output={}", options.log_file),
        format!("#SBATCH --partition={}", options.queue),
        format!("#SBATCH --time={}", options.time_limit),
        String::new(),
    ];
    if options.mpi {
        lines.push(format!("{SLURM_MPI_LAUNCHER} {}", command_line.trim_end()));
    } else {
        lines.push(command_line.trim_end().to_string());
    }

    let command = SubmitCommand(format!("sbatch {}", options.script_name));
    (finish(lines), command)
}

fn finish(lines: Vec<String>) -> String {
    let mut script = lines.join("\n");
    script.push('\n');
    script
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::cluster::ClusterId;
    use std::fs;
    use tempfile::tempdir;

    fn mpi_options(cluster: ClusterId, scheduler: SchedulerKind, nodes: u32) -> SubmissionOptions {
        let mut opts = SubmissionOptions::new(cluster, scheduler, "job_5.0w", "submit.sh");
        opts.num_nodes = nodes;
        opts.log_file = "job_5.0w.log".to_string();
        opts.mpi = true;
        opts
    }

    #[test]
    fn lsf_script_has_resource_queue_log_and_mpi_lines() {
        let dir = tempdir().unwrap();
        let opts = mpi_options(ClusterId::Killdevil, SchedulerKind::Lsf, 14);
        let cmd = render(opts, "msd -fitness_file fitness.daf", dir.path()).unwrap();

        assert_eq!(cmd.as_str(), "bsub < submit.sh");
        assert_eq!(
            fs::read_to_string(dir.path().join("submit.sh")).unwrap(),
            "#!/bin/bash\n#BSUB -n 14\n#BSUB -q week\n#BSUB -o job_5.0w.log\n\
             #BSUB -a mvapich\nmpirun msd -fitness_file fitness.daf\n"
        );
    }

    #[test]
    fn lsf_without_mpi_runs_the_command_directly() {
        let dir = tempdir().unwrap();
        let mut opts = SubmissionOptions::new(
            ClusterId::Killdevil,
            SchedulerKind::Lsf,
            "view",
            "djv_submit.sh",
        );
        opts.num_nodes = 1;
        opts.queue = "debug".to_string();
        opts.log_file = "view.log".to_string();
        render(opts, "python3 view.py\n", dir.path()).unwrap();

        let script = fs::read_to_string(dir.path().join("djv_submit.sh")).unwrap();
        assert!(script.contains("#BSUB -q debug\n"));
        assert!(!script.contains("mvapich"));
        assert!(script.ends_with("#BSUB -o view.log\npython3 view.py\n"));
    }

    #[test]
    fn slurm_script_resolves_partition_and_time() {
        let dir = tempdir().unwrap();
        let opts = mpi_options(ClusterId::Dogwood, SchedulerKind::Slurm, 10);
        let cmd = render(opts, "msd", dir.path()).unwrap();

        assert_eq!(cmd.as_str(), "sbatch submit.sh");
        assert_eq!(
            fs::read_to_string(dir.path().join("submit.sh")).unwrap(),
            "#!/bin/bash\n\
             #SBATCH --job-name=job_5.0w\n\
             #SBATCH --distribution=cyclic:cyclic\n\
             #SBATCH --ntasks=10\n\
             #SBATCH --output=job_5.0w.log\n\
             #SBATCH --partition=cleanup_queue\n\
             #SBATCH --time=00-04:00\n\
             \n\
             $MPI_HOME/bin/mpirun msd\n"
        );
    }

    #[test]
    fn slurm_scripts_use_distinct_partitions_per_tier() {
        let dir = tempdir().unwrap();
        let mut partitions = Vec::new();
        for nodes in [10, 100, 1000] {
            let opts = mpi_options(ClusterId::Dogwood, SchedulerKind::Slurm, nodes);
            render(opts, "msd", dir.path()).unwrap();
            let script = fs::read_to_string(dir.path().join("submit.sh")).unwrap();
            let partition = script
                .lines()
                .find_map(|l| l.strip_prefix("#SBATCH --partition="))
                .unwrap()
                .to_string();
            partitions.push(partition);
        }
        assert_eq!(partitions, vec!["cleanup_queue", "528_queue", "2112_queue"]);
    }

    #[test]
    fn missing_output_directory_is_an_io_error() {
        let dir = tempdir().unwrap();
        let opts = mpi_options(ClusterId::Dogwood, SchedulerKind::Slurm, 10);
        let result = render(opts, "msd", &dir.path().join("absent"));
        assert!(result.is_err());
    }

    #[test]
    fn quoted_command_survives_shell_interpolation() {
        let cmd = SubmitCommand("bsub < submit.sh".to_string());
        assert_eq!(cmd.quoted(), "'bsub < submit.sh'");
    }
}
