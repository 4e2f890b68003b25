// src/constants.rs

/// Makefile names probed, in order, when no `-f` option is given.
pub const MAKEFILE_CANDIDATES: &[&str] = &["GNUmakefile", "makefile", "Makefile"];

/// The special target whose prerequisites are declared phony.
pub const PHONY_TARGET: &str = ".PHONY";

/// The makefile variable that overrides the shell used to run commands.
pub const SHELL_VARIABLE: &str = "SHELL";

/// The shell used when the makefile does not bind `SHELL`.
#[cfg(not(target_os = "windows"))]
pub const DEFAULT_SHELL: &str = "/bin/sh";

/// The shell used when the makefile does not bind `SHELL`.
#[cfg(target_os = "windows")]
pub const DEFAULT_SHELL: &str = "cmd";

/// Exit code used when a build or a makefile parse fails, as `make` does.
pub const EXIT_BUILD_FAILURE: i32 = 2;

/// Exit code used when a running command was interrupted.
pub const EXIT_INTERRUPTED: i32 = 130;
