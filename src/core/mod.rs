// src/core/mod.rs

//! The build engine: makefile parsing, variable expansion and target resolution.

pub mod builder;
pub mod parser;
pub mod paths;
pub mod recipe;
pub mod variables;
