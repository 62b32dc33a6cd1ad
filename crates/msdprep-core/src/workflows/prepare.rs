use crate::core::cluster::ClusterId;
use crate::core::io::separation;
use crate::core::species::{BackboneStrategy, SpeciesCatalog};
use crate::engine::config::JobOptions;
use crate::engine::error::EngineError;
use crate::engine::job::InterfaceJob;
use crate::engine::job::isolate::IsolateInterfaceJob;
use crate::engine::job::merge::MergeInterfaceJob;
use crate::engine::progress::{Progress, ProgressReporter};
use crate::engine::state_version::StateListUpdate;
use crate::engine::sweep::SubJob;
use crate::scheduler::{self, SchedulerKind, SubmissionOptions};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::{debug, info, instrument};

pub const FITNESS_FILE: &str = "fitness.daf";
pub const SUBMIT_SCRIPT: &str = "submit.sh";
pub const SUBMIT_ALL_SCRIPT: &str = "submit_all_jobs.sh";
pub const GATHER_SCRIPT: &str = "gather_output.sh";
pub const LAUNCH_DOCKING_SCRIPT: &str = "launch_docking.sh";
pub const DOCK_VIEW_SCRIPT: &str = "djv_submit.sh";
pub const PREPARE_FOR_DOCKING_SCRIPT: &str = "prepare_for_docking.sh";
pub const CREATION_COMMAND_FILE: &str = "creation_command.txt";
pub const SUBMISSION_LOG: &str = "msd_submission.log";

const COMPLEX_SETS_LIST: &str = "complex_sets.list";
const DOCK_SUBMISSION_LOG: &str = "dock/dock_submission.log";
const LAUNCH_DOCKING_QUEUE: &str = "debug";
const DOCK_VIEW_QUEUE: &str = "debug_queue";

/// What a completed preparation left on disk.
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedJob {
    pub job_dir: PathBuf,
    pub sub_jobs: Vec<String>,
    pub state_list_updates: Vec<StateListUpdate>,
    pub launched: bool,
}

/// Builds the interface job the species catalog calls for and prepares it.
#[instrument(skip_all, name = "prepare_workflow", fields(job = %options.job_name))]
pub fn run(
    options: &JobOptions,
    catalog: &SpeciesCatalog,
    cluster: ClusterId,
    reporter: &ProgressReporter,
) -> Result<PreparedJob, EngineError> {
    // === Phase 0: Load the design job ===
    reporter.report(Progress::PhaseStart {
        name: "Loading Inputs",
    });
    let separator = separation::separator_for(catalog.separation());
    let prepared = match catalog.strategy() {
        BackboneStrategy::IsolateBackbone => {
            let job = IsolateInterfaceJob::new(options, catalog, &*separator)?;
            reporter.report(Progress::PhaseFinish);
            let updates = job.state_list_updates().to_vec();
            MsdJobManager::new(&job, options, cluster)?
                .prepare_job(reporter)
                .map(|p| p.with_updates(updates))?
        }
        BackboneStrategy::MergeBackbone => {
            let job = MergeInterfaceJob::new(options, catalog)?;
            reporter.report(Progress::PhaseFinish);
            let updates = job.state_list_updates().to_vec();
            MsdJobManager::new(&job, options, cluster)?
                .prepare_job(reporter)
                .map(|p| p.with_updates(updates))?
        }
    };
    Ok(prepared)
}

impl PreparedJob {
    fn with_updates(mut self, updates: Vec<StateListUpdate>) -> Self {
        self.state_list_updates = updates;
        self
    }
}

/// Lays out one job directory: a sub-directory per sweep point, the scripts
/// that submit and gather them, and the docking chain behind them.
pub struct MsdJobManager<'a> {
    job: &'a dyn InterfaceJob,
    options: &'a JobOptions,
    cluster: ClusterId,
    scheduler: SchedulerKind,
}

impl<'a> MsdJobManager<'a> {
    /// Fails with [`EngineError::UnsupportedCluster`] for identities without a
    /// batch scheduler.
    pub fn new(
        job: &'a dyn InterfaceJob,
        options: &'a JobOptions,
        cluster: ClusterId,
    ) -> Result<Self, EngineError> {
        let scheduler = cluster
            .scheduler()
            .ok_or(EngineError::UnsupportedCluster(cluster))?;
        Ok(Self {
            job,
            options,
            cluster,
            scheduler,
        })
    }

    /// Creates the job directory and everything in it, then launches the job
    /// if requested.
    ///
    /// An existing job directory is a hard error; nothing is merged into it. A
    /// failure part-way through leaves the partial tree on disk.
    #[instrument(skip_all, name = "prepare_job", fields(job = %self.job.job_name()))]
    pub fn prepare_job(&self, reporter: &ProgressReporter) -> Result<PreparedJob, EngineError> {
        // === Phase 1: Create the job directory ===
        let job_dir = self.options.job_dir();
        fs::create_dir_all(&self.options.output_dir)
            .map_err(|e| EngineError::io(&self.options.output_dir, e))?;
        create_fresh_dir(&job_dir, EngineError::JobDirectoryExists)?;
        reporter.report(Progress::Created(job_dir.display().to_string()));
        info!("Created job directory '{}'.", job_dir.display());

        // === Phase 2: Sub-jobs ===
        reporter.report(Progress::PhaseStart { name: "Sub-jobs" });
        let sub_jobs = self.job.sub_jobs();
        reporter.report(Progress::TaskStart {
            total_steps: sub_jobs.len() as u64,
        });
        let mut launch_script = String::new();
        let mut gather_script = String::from("mkdir results\n\n");
        for sub_job in sub_jobs {
            let sub_dir = job_dir.join(&sub_job.name);
            create_fresh_dir(&sub_dir, EngineError::SubJobDirectoryExists)?;
            self.create_symlinks(sub_job, &sub_dir)?;
            self.write_fitness_file(sub_job, &sub_dir)?;
            launch_script.push_str(&self.render_submission(sub_job, &sub_dir)?);
            gather_script.push_str(&self.gather_commands(sub_job));
            reporter.report(Progress::Created(sub_dir.display().to_string()));
            reporter.report(Progress::TaskIncrement);
        }
        reporter.report(Progress::TaskFinish);
        reporter.report(Progress::PhaseFinish);

        // === Phase 3: Docking chain ===
        reporter.report(Progress::PhaseStart {
            name: "Post-processing",
        });
        self.prepare_postprocessing(&job_dir)?;
        reporter.report(Progress::PhaseFinish);

        // === Phase 4: Top-level scripts ===
        write_file(&job_dir.join(SUBMIT_ALL_SCRIPT), &launch_script)?;
        write_file(&job_dir.join(GATHER_SCRIPT), &gather_script)?;
        let mut creation = shell_words::join(&self.options.creation_command);
        creation.push('\n');
        write_file(&job_dir.join(CREATION_COMMAND_FILE), &creation)?;
        for script in [SUBMIT_ALL_SCRIPT, GATHER_SCRIPT, PREPARE_FOR_DOCKING_SCRIPT] {
            reporter.report(Progress::Created(job_dir.join(script).display().to_string()));
        }

        // === Phase 5: Launch (optional) ===
        let launched = self.options.execution.launch;
        if launched {
            reporter.report(Progress::PhaseStart { name: "Launching" });
            launch(&job_dir)?;
            reporter.report(Progress::PhaseFinish);
        }

        info!(
            "Prepared job '{}' with {} sub-jobs{}.",
            self.job.job_name(),
            sub_jobs.len(),
            if launched { " and launched it" } else { "" }
        );
        Ok(PreparedJob {
            job_dir,
            sub_jobs: sub_jobs.iter().map(|s| s.name.clone()).collect(),
            state_list_updates: Vec::new(),
            launched,
        })
    }

    fn create_symlinks(&self, sub_job: &SubJob, sub_dir: &Path) -> Result<(), EngineError> {
        for link in self.job.files_to_symlink(sub_job) {
            if !link.source.is_file() {
                return Err(EngineError::MissingSymlinkSource {
                    source_path: link.source,
                    sub_job: sub_job.name.clone(),
                    job: self.job.job_name().to_string(),
                });
            }
            let dest = sub_dir.join(&link.link_name);
            std::os::unix::fs::symlink(&link.source, &dest)
                .map_err(|e| EngineError::io(&dest, e))?;
        }
        debug!("Linked inputs into '{}'.", sub_dir.display());
        Ok(())
    }

    fn write_fitness_file(&self, sub_job: &SubJob, sub_dir: &Path) -> Result<(), EngineError> {
        let lines = self.job.fitness_lines(sub_job);
        write_file(&sub_dir.join(FITNESS_FILE), &lines.concat())
    }

    /// The design program's command line for one sub-job.
    pub fn msd_command_line(&self, sub_job: &SubJob) -> String {
        let toolchain = &self.options.toolchain;
        let mut command = format!(
            "{} -database {} -entity_resfile entity.resfile -fitness_file {FITNESS_FILE} \
             -ms::pop_size {} -ms::generations {} -ms::numresults {}",
            quote_path(&toolchain.msd_executable_path()),
            shell_words::quote(&toolchain.database_dir()),
            self.job.population_size(),
            self.job.generation_count(),
            self.job.results_to_postprocess_count(),
        );
        for flags in self.job.flags_files(sub_job) {
            command.push_str(&format!(" @{}", quote_path(flags)));
        }
        if self.job.is_seeded(sub_job) && !self.job.seeds().is_empty() {
            command.push_str(" -seed_sequences ");
            command.push_str(&self.job.seeds().join(" "));
        }
        if self.job.fill_gen1_from_seeds() {
            command.push_str(" -fill_gen1_from_seed_sequences");
        }
        command
    }

    /// Writes the sub-job's `submit.sh` and returns its entry for the master
    /// launch script.
    fn render_submission(&self, sub_job: &SubJob, sub_dir: &Path) -> Result<String, EngineError> {
        let queue = self
            .options
            .execution
            .queue
            .clone()
            .unwrap_or_else(|| self.cluster.default_queue().to_string());
        let nodes = self
            .options
            .execution
            .process_count(self.job.total_state_count());
        let submission = SubmissionOptions::new(self.cluster, self.scheduler, &sub_job.name, SUBMIT_SCRIPT)
            .nodes(nodes)
            .queue(queue)
            .mpi(true);
        let command = scheduler::render(submission, &self.msd_command_line(sub_job), sub_dir)
            .map_err(|e| EngineError::io(sub_dir.join(SUBMIT_SCRIPT), e))?;

        let name = shell_words::quote(&sub_job.name);
        Ok(format!("cd {name}\n{command} >> ../{SUBMISSION_LOG}\ncd ..\n\n"))
    }

    /// Copies the top-ranked designs of every saved species into `results/`
    /// and records, per rank, the complexes to dock.
    ///
    /// Ranks are zero-padded to `floor(log10(n))` digits, so ten results are
    /// named `_1_` to `_10_` and a hundred `_01_` to `_100_`.
    fn gather_commands(&self, sub_job: &SubJob) -> String {
        let n_results = self.job.results_to_postprocess_count();
        let width = n_results.max(1).ilog10() as usize;
        let sub = &sub_job.name;

        let mut script = format!("cd {}\n", shell_words::quote(sub));
        for spec in self.job.states_to_save() {
            for rank in 1..=n_results {
                script.push_str(&format!(
                    "for i in `ls msd_output_{rank}_{spec}*`; do if [ ! -h $i ]; \
                     then cp $i ../results/{sub}_{rank:0width$}_{spec}.pdb; fi; done\n"
                ));
            }
        }
        script.push_str("cd ..\n");

        let complexes = self.job.complexes_to_postprocess();
        for rank in 1..=n_results {
            let prefix = format!("{sub}_{rank:0width$}_");
            let files: Vec<String> = complexes
                .iter()
                .map(|c| format!("{prefix}{c}.pdb"))
                .collect();
            script.push_str(&format!(
                "echo {} >> results/{COMPLEX_SETS_LIST}\n",
                files.join(" ")
            ));
        }
        script.push('\n');
        script
    }

    /// Writes the three dependent stages that follow the design runs: the
    /// docking launcher, the docking result viewer and the script that chains
    /// the launcher behind the design jobs.
    fn prepare_postprocessing(&self, job_dir: &Path) -> Result<(), EngineError> {
        let toolchain = &self.options.toolchain;
        let job_name = self.job.job_name();
        let python = &toolchain.python;
        let pp_args = self.job.postprocessing().to_command_line();

        let view_command = format!(
            "{python} {} -l {COMPLEX_SETS_LIST} -o after_docking_dGbind.txt {pp_args}",
            quote_path(&toolchain.pyscript("dock_jobs_view.py"))
        );
        let view = SubmissionOptions::new(
            self.cluster,
            self.scheduler,
            format!("{job_name}_dock_jobs_view"),
            DOCK_VIEW_SCRIPT,
        )
        .queue(DOCK_VIEW_QUEUE)
        .log_file(format!("{job_name}_djv.log"));
        scheduler::render(view, &view_command, job_dir)
            .map_err(|e| EngineError::io(job_dir.join(DOCK_VIEW_SCRIPT), e))?;

        let dependent = quote_path(&toolchain.pyscript("submit_dependent_script.py"));
        let launch_docking = [
            format!("bash {GATHER_SCRIPT}"),
            "cd results".to_string(),
            format!(
                "{python} {} --pdb-complexes {COMPLEX_SETS_LIST} {pp_args}",
                quote_path(&toolchain.pyscript("dock_jobs_run.py"))
            ),
            // The viewer is submitted from results/, next to the docking log.
            format!("ln -s ../{DOCK_VIEW_SCRIPT}"),
            format!("{python} {dependent} {DOCK_SUBMISSION_LOG} {DOCK_VIEW_SCRIPT}"),
        ]
        .join("\n");
        let launcher = SubmissionOptions::new(
            self.cluster,
            self.scheduler,
            format!("{job_name}_launch_docking"),
            LAUNCH_DOCKING_SCRIPT,
        )
        .queue(LAUNCH_DOCKING_QUEUE);
        scheduler::render(launcher, &launch_docking, job_dir)
            .map_err(|e| EngineError::io(job_dir.join(LAUNCH_DOCKING_SCRIPT), e))?;

        write_file(
            &job_dir.join(PREPARE_FOR_DOCKING_SCRIPT),
            &format!("{python} {dependent} {SUBMISSION_LOG} {LAUNCH_DOCKING_SCRIPT}\n"),
        )
    }
}

fn create_fresh_dir(dir: &Path, exists: fn(PathBuf) -> EngineError) -> Result<(), EngineError> {
    match fs::create_dir(dir) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => Err(exists(dir.to_path_buf())),
        Err(e) => Err(EngineError::io(dir, e)),
    }
}

fn write_file(path: &Path, content: &str) -> Result<(), EngineError> {
    fs::write(path, content).map_err(|e| EngineError::io(path, e))?;
    debug!("Wrote '{}'.", path.display());
    Ok(())
}

fn quote_path(path: &Path) -> String {
    shell_words::quote(&path.to_string_lossy()).into_owned()
}

fn launch(job_dir: &Path) -> Result<(), EngineError> {
    for script in [SUBMIT_ALL_SCRIPT, PREPARE_FOR_DOCKING_SCRIPT] {
        info!("Running '{}' in '{}'.", script, job_dir.display());
        let status = Command::new("bash")
            .arg(script)
            .current_dir(job_dir)
            .status()
            .map_err(|e| EngineError::io(job_dir.join(script), e))?;
        if !status.success() {
            return Err(EngineError::Launch {
                script: script.to_string(),
                status: status.to_string(),
            });
        }
    }
    Ok(())
}
