// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! CLI module for the batch stages.
//!
//! This module contains argument parsing and the `extract` and `transform`
//! command implementations.

// Modules
/// CLI arguments.
pub mod args;

/// Landmark extraction command.
pub mod extract;

/// Animation building command.
pub mod transform;
