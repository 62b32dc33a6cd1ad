//! Reading and writing the plain-text files a design job is built from.
//!
//! This module holds the stateless file helpers shared by the state-version
//! strategies and the job manager: line-oriented parsing of declarative list
//! files, content-aware writing of state-list files, and synthesis of separated
//! structures from bound complexes.

pub mod lists;
pub mod separation;
pub mod state_list;
