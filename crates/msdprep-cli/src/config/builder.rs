use super::defaults::{
    DefaultsConfig, PYSCRIPTS_DIR_ENV, PYSCRIPTS_SUBDIR, PYTHON_ENV, ROSETTA_DIR_ENV, SPECIES_FILE,
};
use super::file::FileConfig;
use super::models::AppConfig;
use crate::cli::{PrepareArgs, ProjectArgs};
use crate::error::{CliError, Result};
use msdprep::engine::config as core_config;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::debug;

/// Resolves the options for `prepare`, reading the configuration file named on
/// the command line or, failing that, the per-user one if it exists.
pub fn build_config<F>(args: &PrepareArgs, env: F, invocation: Vec<String>) -> Result<AppConfig>
where
    F: Fn(&str) -> Option<String>,
{
    let file_config = match &args.config {
        Some(path) => FileConfig::from_file(path)?,
        None => match super::default_config_path().filter(|p| p.is_file()) {
            Some(path) => FileConfig::from_file(&path)?,
            None => FileConfig::default(),
        },
    };
    merge_config(args, file_config, env, invocation)
}

/// Layers, highest priority first: command line, `--set`, file, environment, defaults.
pub fn merge_config<F>(
    args: &PrepareArgs,
    file_config: FileConfig,
    env: F,
    invocation: Vec<String>,
) -> Result<AppConfig>
where
    F: Fn(&str) -> Option<String>,
{
    let defaults = DefaultsConfig::default();
    let mut file_config = apply_set_values(file_config, &args.set_values)?;
    let (base_dir, species_path) = resolve_project(&args.project)?;

    let tc_file = file_config.toolchain.take().unwrap_or_default();
    let rosetta_dir = args
        .rosetta_dir
        .clone()
        .or(tc_file.rosetta_dir)
        .or_else(|| env(ROSETTA_DIR_ENV).map(PathBuf::from))
        .ok_or_else(|| {
            CliError::Config(format!(
                "A Rosetta directory is required: pass --rosetta_dir, set `toolchain.rosetta-dir` in the config file, or export {}.",
                ROSETTA_DIR_ENV
            ))
        })?;
    let pyscripts_dir = args
        .pyscripts_dir
        .clone()
        .or(tc_file.pyscripts_dir)
        .or_else(|| env(PYSCRIPTS_DIR_ENV).map(PathBuf::from))
        .unwrap_or_else(|| base_dir.join(PYSCRIPTS_SUBDIR));
    let python = args
        .python
        .clone()
        .or(tc_file.python)
        .or_else(|| env(PYTHON_ENV))
        .unwrap_or(defaults.python);
    let toolchain = core_config::Toolchain {
        rosetta_dir,
        pyscripts_dir,
        python,
        msd_executable: tc_file.msd_executable.unwrap_or(defaults.msd_executable),
    };
    debug!("Resolved toolchain: {:?}", toolchain);

    let exec_file = file_config.execution.take().unwrap_or_default();
    let execution = core_config::ExecutionOptions {
        num_cpu: args.num_cpu,
        num_states_per_cpu: args
            .num_states_per_cpu
            .or(exec_file.num_states_per_cpu)
            .unwrap_or(defaults.num_states_per_cpu),
        queue: args.queue.clone().or(exec_file.queue),
        launch: args.launch,
    };

    let pp_file = file_config.postprocessing.take().unwrap_or_default();
    let postprocessing = core_config::PostProcessingOptions {
        docking_flags_files: if args.docking_flags_files.is_empty() {
            pp_file.docking_flags_files.unwrap_or_default()
        } else {
            args.docking_flags_files.clone()
        },
        relax: args.relax || pp_file.relax.unwrap_or(false),
        docking_n_cpu: args
            .docking_n_cpu
            .or(pp_file.docking_n_cpu)
            .unwrap_or(defaults.docking_n_cpu),
    };

    let mut builder = core_config::JobOptionsBuilder::new()
        .base_dir(base_dir)
        .design_definition(&args.des_def)
        .state_version(&args.state_version)
        .job_name(&args.job_name)
        .daf(args.daf.clone())
        .preserve_daf(args.preserve_daf)
        .dg_weights_file(args.dg_weights_file.clone())
        .entity_weights_file(args.entfunc_weights_file.clone())
        .flags_files(args.flags_files.clone())
        .single_round(args.single_round)
        .seed_sequences(args.seed_sequences.clone())
        .pdb_seed_pairs(args.pdb_seed_pairs.clone())
        .fill_gen1_from_seeds(args.fill_gen1_from_seeds)
        .execution(execution)
        .postprocessing(postprocessing)
        .toolchain(toolchain)
        .creation_command(invocation);
    if let Some(dir) = &args.output_dir {
        builder = builder.output_dir(dir.clone());
    }
    if let Some(size) = args.pop_size {
        builder = builder.pop_size(size);
    }
    if let Some(scale) = args.ngen_scale {
        builder = builder.ngen_scale(scale);
    }
    if let Some(n) = args.ntop_msd_results_to_dock {
        builder = builder.ntop_msd_results_to_dock(n);
    }

    let job_options = builder
        .build()
        .map_err(|e| CliError::Config(e.to_string()))?;

    Ok(AppConfig {
        species_path,
        job_options,
    })
}

/// Project root (default: the working directory) and species catalog path.
pub fn resolve_project(args: &ProjectArgs) -> Result<(PathBuf, PathBuf)> {
    let base_dir = match &args.base_dir {
        Some(dir) => dir.clone(),
        None => std::env::current_dir()?,
    };
    let species_path = args
        .species
        .clone()
        .unwrap_or_else(|| base_dir.join(SPECIES_FILE));
    Ok((base_dir, species_path))
}

fn parse_value<T: FromStr>(key: &str, value: &str, kind: &str) -> Result<T> {
    value
        .parse()
        .map_err(|_| CliError::Config(format!("Invalid {} value for {}: {}", kind, key, value)))
}

fn apply_set_values(mut file_config: FileConfig, set_values: &[String]) -> Result<FileConfig> {
    for kv_pair in set_values {
        let Some((key, value_str)) = kv_pair.split_once('=') else {
            return Err(CliError::Config(format!(
                "Invalid --set format: '{}'. Expected KEY=VALUE.",
                kv_pair
            )));
        };

        match key {
            "toolchain.rosetta-dir" => {
                file_config
                    .toolchain
                    .get_or_insert_with(Default::default)
                    .rosetta_dir = Some(Path::new(value_str).to_path_buf());
            }
            "toolchain.pyscripts-dir" => {
                file_config
                    .toolchain
                    .get_or_insert_with(Default::default)
                    .pyscripts_dir = Some(Path::new(value_str).to_path_buf());
            }
            "toolchain.python" => {
                file_config
                    .toolchain
                    .get_or_insert_with(Default::default)
                    .python = Some(value_str.to_string());
            }
            "toolchain.msd-executable" => {
                file_config
                    .toolchain
                    .get_or_insert_with(Default::default)
                    .msd_executable = Some(value_str.to_string());
            }
            "execution.queue" => {
                file_config
                    .execution
                    .get_or_insert_with(Default::default)
                    .queue = Some(value_str.to_string());
            }
            "execution.num-states-per-cpu" => {
                file_config
                    .execution
                    .get_or_insert_with(Default::default)
                    .num_states_per_cpu = Some(parse_value(key, value_str, "integer")?);
            }
            "postprocessing.docking-n-cpu" => {
                file_config
                    .postprocessing
                    .get_or_insert_with(Default::default)
                    .docking_n_cpu = Some(parse_value(key, value_str, "integer")?);
            }
            "postprocessing.relax" => {
                file_config
                    .postprocessing
                    .get_or_insert_with(Default::default)
                    .relax = Some(parse_value(key, value_str, "boolean")?);
            }
            "postprocessing.docking-flags-files" => {
                file_config
                    .postprocessing
                    .get_or_insert_with(Default::default)
                    .docking_flags_files = Some(
                    value_str
                        .split(',')
                        .filter(|s| !s.is_empty())
                        .map(PathBuf::from)
                        .collect(),
                );
            }
            _ => {
                return Err(CliError::Config(format!(
                    "Unsupported configuration key for --set: '{}'",
                    key
                )));
            }
        }
    }
    Ok(file_config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::{Cli, Commands};
    use clap::Parser;
    use once_cell::sync::Lazy;
    use std::fs;
    use tempfile::{TempDir, tempdir};

    static TEST_DIR: Lazy<TempDir> = Lazy::new(|| tempdir().expect("Failed to create temp dir"));

    fn write_config_file(name: &str, content: &str) -> PathBuf {
        let file_path = TEST_DIR.path().join(name);
        fs::write(&file_path, content).unwrap();
        file_path
    }

    fn prepare_args(extra: &[&str]) -> PrepareArgs {
        let base = TEST_DIR.path().to_str().unwrap().to_string();
        let mut argv: Vec<String> = [
            "msdprep",
            "prepare",
            "--des_def",
            "dd1",
            "--state_version",
            "sv1",
            "--job_name",
            "run1",
            "--daf",
            "fitness.daf",
            "--base_dir",
            base.as_str(),
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();
        argv.extend(extra.iter().map(|s| s.to_string()));
        match Cli::parse_from(argv).command {
            Commands::Prepare(args) => args,
            _ => panic!("Expected 'prepare' subcommand"),
        }
    }

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn file_values_fill_in_for_missing_flags() {
        let path = write_config_file(
            "file_values.toml",
            r#"
            [toolchain]
            rosetta-dir = "/opt/rosetta/main"
            python = "/usr/bin/python2.7"

            [execution]
            queue = "bigmem"
            num-states-per-cpu = 4

            [postprocessing]
            docking-n-cpu = 30
            relax = true
            "#,
        );
        let file = FileConfig::from_file(&path).unwrap();
        let config = merge_config(&prepare_args(&[]), file, no_env, vec![]).unwrap();
        let opts = config.job_options;

        assert_eq!(opts.toolchain.rosetta_dir, PathBuf::from("/opt/rosetta/main"));
        assert_eq!(opts.toolchain.python, "/usr/bin/python2.7");
        assert_eq!(opts.toolchain.pyscripts_dir, TEST_DIR.path().join("pyscripts"));
        assert_eq!(opts.execution.queue.as_deref(), Some("bigmem"));
        assert_eq!(opts.execution.num_states_per_cpu, 4);
        assert_eq!(opts.postprocessing.docking_n_cpu, 30);
        assert!(opts.postprocessing.relax);
        assert_eq!(config.species_path, TEST_DIR.path().join("species.toml"));
    }

    #[test]
    fn command_line_beats_set_beats_file() {
        let path = write_config_file(
            "override.toml",
            r#"
            [toolchain]
            rosetta-dir = "/opt/rosetta/main"

            [execution]
            queue = "bigmem"
            num-states-per-cpu = 4
            "#,
        );
        let args = prepare_args(&[
            "--queue",
            "debug",
            "-S",
            "execution.queue=week",
            "-S",
            "execution.num-states-per-cpu=2",
        ]);
        let file = FileConfig::from_file(&path).unwrap();
        let opts = merge_config(&args, file, no_env, vec![]).unwrap().job_options;

        assert_eq!(opts.execution.queue.as_deref(), Some("debug"));
        assert_eq!(opts.execution.num_states_per_cpu, 2);
    }

    #[test]
    fn environment_is_consulted_after_the_file() {
        let env = |key: &str| match key {
            ROSETTA_DIR_ENV => Some("/env/rosetta".to_string()),
            PYTHON_ENV => Some("python-env".to_string()),
            PYSCRIPTS_DIR_ENV => Some("/env/py".to_string()),
            _ => None,
        };
        let opts = merge_config(&prepare_args(&[]), FileConfig::default(), env, vec![])
            .unwrap()
            .job_options;
        assert_eq!(opts.toolchain.rosetta_dir, PathBuf::from("/env/rosetta"));
        assert_eq!(opts.toolchain.python, "python-env");
        assert_eq!(opts.toolchain.pyscripts_dir, PathBuf::from("/env/py"));

        let args = prepare_args(&["--rosetta_dir", "/cli/rosetta"]);
        let opts = merge_config(&args, FileConfig::default(), env, vec![])
            .unwrap()
            .job_options;
        assert_eq!(opts.toolchain.rosetta_dir, PathBuf::from("/cli/rosetta"));
    }

    #[test]
    fn missing_rosetta_dir_is_a_config_error() {
        let result = merge_config(&prepare_args(&[]), FileConfig::default(), no_env, vec![]);
        assert!(matches!(result, Err(CliError::Config(msg)) if msg.contains("--rosetta_dir")));
    }

    #[test]
    fn invocation_and_job_settings_reach_the_options() {
        let args = prepare_args(&[
            "--rosetta_dir",
            "/opt/rosetta",
            "--pop_size",
            "250",
            "--ntop_msd_results_to_dock",
            "3",
            "--docking_flags_files",
            "dock.flags",
        ]);
        let invocation = vec!["msdprep".to_string(), "prepare".to_string()];
        let opts = merge_config(&args, FileConfig::default(), no_env, invocation.clone())
            .unwrap()
            .job_options;
        assert_eq!(opts.sampling.pop_size, 250);
        assert_eq!(opts.ntop_msd_results_to_dock, 3);
        assert_eq!(opts.postprocessing.docking_flags_files, vec![PathBuf::from("dock.flags")]);
        assert_eq!(opts.creation_command, invocation);
        assert_eq!(opts.base_dir, TEST_DIR.path());
        assert!(opts.daf.is_absolute());
    }

    #[test]
    fn invalid_set_values_are_rejected() {
        let args = prepare_args(&["--rosetta_dir", "/r", "-S", "execution.queue"]);
        let result = merge_config(&args, FileConfig::default(), no_env, vec![]);
        assert!(matches!(result, Err(CliError::Config(msg)) if msg.contains("KEY=VALUE")));

        let args = prepare_args(&["--rosetta_dir", "/r", "-S", "sampling.pop-size=3"]);
        let result = merge_config(&args, FileConfig::default(), no_env, vec![]);
        assert!(matches!(result, Err(CliError::Config(msg)) if msg.contains("Unsupported")));

        let args = prepare_args(&["--rosetta_dir", "/r", "-S", "postprocessing.relax=maybe"]);
        let result = merge_config(&args, FileConfig::default(), no_env, vec![]);
        assert!(matches!(result, Err(CliError::Config(msg)) if msg.contains("boolean")));
    }

    #[test]
    fn unknown_file_keys_are_parse_errors() {
        let path = write_config_file("unknown.toml", "[toolchain]\nrosetta = \"/r\"\n");
        assert!(matches!(
            FileConfig::from_file(&path),
            Err(CliError::FileParsing { .. })
        ));
    }

    #[test]
    fn explicit_config_path_must_exist() {
        let args = prepare_args(&["--config", "/nonexistent/msdprep.toml"]);
        assert!(matches!(
            build_config(&args, no_env, vec![]),
            Err(CliError::Io(_))
        ));
    }
}
