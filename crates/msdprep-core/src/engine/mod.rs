//! # Engine Module
//!
//! This module holds the stateful half of job preparation: validated options,
//! loaded design definitions and state versions, the weight sweep, and the
//! interface jobs that combine them.
//!
//! ## Overview
//!
//! Everything here is built once from [`config::JobOptions`] and a species
//! catalog, and is then queried by the workflow layer. Loading is where all
//! input validation happens, so the later stages only ever see consistent
//! inputs.
//!
//! ## Architecture
//!
//! - **Configuration** ([`config`]) - Typed job options and their builder
//! - **Design Definitions** ([`definition`]) - Per-species correspondence and resfile inputs
//! - **State Versions** ([`state_version`]) - Structure assignment under both backbone strategies
//! - **Weight Sweep** ([`sweep`]) - Cross product of dG-bonus and entity-function weights
//! - **Fitness Files** ([`fitness`]) - Preamble generation and weight substitution
//! - **Interface Jobs** ([`job`]) - The per-strategy answers the job manager needs
//! - **Progress Monitoring** ([`progress`]) - Callback-based progress reporting
//! - **Error Handling** ([`error`]) - The top-level [`error::EngineError`]
//!
//! ## Key Capabilities
//!
//! - **Two backbone strategies** selected from the species catalog at construction time
//! - **Explicit sweep weights** carried with every sub-job
//! - **Idempotent state-list regeneration** for the isolate-backbone strategy

pub mod config;
pub mod definition;
pub mod error;
pub mod fitness;
pub mod job;
pub mod progress;
pub mod state_version;
pub mod sweep;
