//! # Core Module
//!
//! This module provides the stateless building blocks that every design job is
//! composed from: who we are running on, which species exist, and how the
//! declarative input files are read and written.
//!
//! ## Overview
//!
//! Nothing in this layer holds job state. Each type is either a plain value
//! (a [`cluster::ClusterId`], a [`species::SpeciesCatalog`]) or a free function
//! over files on disk, so the higher layers can compose them freely and tests
//! can exercise them in isolation.
//!
//! ## Architecture
//!
//! - **Compute Environment** ([`cluster`]) - Hostname classification into a closed set of clusters
//! - **Species** ([`species`]) - The declared species set and its classification predicates
//! - **File I/O** ([`io`]) - List-file parsing, state-list writing and structure separation
//!
//! ## Key Capabilities
//!
//! - **Deterministic cluster identity** with a masquerade override for tests and cross-rendering
//! - **Strategy-specific species traits** for the isolate- and merge-backbone flavours
//! - **Line-accurate diagnostics** naming the file, line number and verbatim text of bad input
//! - **Content-based idempotence** for generated state-list files

pub mod cluster;
pub mod io;
pub mod species;
