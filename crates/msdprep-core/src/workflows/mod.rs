//! # Workflows Module
//!
//! High-level entry points that run a complete job preparation.
//!
//! ## Overview
//!
//! A workflow takes validated [`crate::engine::config::JobOptions`], a species
//! catalog and the target cluster, builds the matching interface job and lays
//! the job tree out on disk. Progress is reported through a
//! [`crate::engine::progress::ProgressReporter`].
//!
//! ## Architecture
//!
//! - **Job Preparation** ([`prepare`]) - Sub-job directories, submission and
//!   gather scripts, and the dependent docking chain.

pub mod prepare;
