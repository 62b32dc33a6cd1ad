//! # msdprep Core Library
//!
//! Preparation of multistate protein design jobs for HPC batch schedulers: a
//! sweep of design runs is laid out on disk, each with its fitness file, linked
//! inputs and submission script, together with the scripts that gather the
//! results and chain the docking stages behind them.
//!
//! ## Architectural Philosophy
//!
//! - **[`core`]: The Foundation.** Stateless values and file helpers: cluster
//!   identity, the species catalog, list-file parsing and state-list writing.
//!
//! - **[`scheduler`]: Submission.** Renders LSF and SLURM scripts for one job
//!   and returns the command that submits them.
//!
//! - **[`engine`]: The Logic Core.** Loads and validates the design definition
//!   and state version, expands the weight sweep and answers per-sub-job
//!   questions through the [`engine::job::InterfaceJob`] trait.
//!
//! - **[`workflows`]: The Public API.** Ties the layers together into the
//!   complete preparation of one job directory.

pub mod core;
pub mod engine;
pub mod scheduler;
pub mod workflows;
