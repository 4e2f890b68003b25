//! # tinymake
//!
//! A minimal declarative build orchestrator. A makefile is parsed into a [`models::RuleSet`],
//! and a [`core::builder::Builder`] walks the rule graph from a requested target, rebuilding
//! whatever is stale relative to its prerequisites.

use std::sync::Arc;
use std::sync::atomic::AtomicBool;

/// Shared flag that asks running commands to stop.
pub type CancellationToken = Arc<AtomicBool>;

/// Command-line definition of the `tinymake` binary.
pub mod cli;
/// Names and codes shared across the crate.
pub mod constants;
/// Parsing, expansion and the build engine.
pub mod core;
/// Rules and the parsed makefile model.
pub mod models;
/// Process execution.
pub mod system;
