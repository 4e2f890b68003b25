//! # Builder
//!
//! Walks the rule graph depth-first from a requested target, building every prerequisite
//! before its dependent and running a rule's commands only when its target is stale.
//!
//! Session state is two sets owned by one `Builder`: `built` (settled this session) and
//! `in_progress` (on the active resolution stack). Re-entering a name that is still in
//! `in_progress` is how cycles are detected, so that set is cleared on every exit from a
//! node, successful or not.

use crate::{
    core::{paths, recipe::RecipeLine},
    models::{AutomaticVariables, Rule, RuleSet},
    system::executor::{CommandRunner, ExecutionError},
};
use colored::Colorize;
use std::{collections::HashSet, path::PathBuf, time::SystemTime};
use thiserror::Error;

/// Why a build stopped.
#[derive(Error, Debug)]
pub enum BuildError {
    /// `target` was reached again while still being resolved.
    #[error("Circular dependency detected involving target '{target}'.")]
    CycleDetected {
        /// The target that closed the cycle.
        target: String,
    },
    /// `target` has no rule and no file on disk.
    #[error("No rule to make target '{target}'.")]
    NoRuleForTarget {
        /// The name that could not be resolved.
        target: String,
    },
    /// A command of `target` could not be launched or exited unsuccessfully.
    #[error("Command for target '{target}' failed: {command}")]
    CommandFailed {
        /// The rule whose command failed.
        target: String,
        /// The expanded command, without its modifiers.
        command: String,
        /// What went wrong running it.
        #[source]
        source: ExecutionError,
    },
    /// No target was requested and the makefile has no rules.
    #[error("No targets found in the makefile.")]
    NoDefaultTarget,
}

/// Knobs for a build session.
#[derive(Debug, Clone)]
pub struct BuildOptions {
    /// Every target and prerequisite name is resolved relative to this directory.
    pub directory: PathBuf,
    /// Print commands instead of running them (`+` lines still run).
    pub dry_run: bool,
    /// Never echo commands.
    pub silent: bool,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("."),
            dry_run: false,
            silent: false,
        }
    }
}

/// Resolves and builds targets of one `RuleSet`.
///
/// ```no_run
/// use tinymake::{core::builder::Builder, core::parser, system::executor::ShellRunner};
///
/// let rules = parser::parse_file("Makefile".as_ref())?;
/// let mut builder = Builder::new(&rules, ShellRunner::new("."));
/// builder.build("all")?;
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Debug)]
pub struct Builder<'a, R: CommandRunner> {
    rules: &'a RuleSet,
    runner: R,
    options: BuildOptions,
    built: HashSet<String>,
    in_progress: HashSet<String>,
    rebuilt: Vec<String>,
}

impl<'a, R: CommandRunner> Builder<'a, R> {
    /// A builder with default options, rooted at the current directory.
    pub fn new(rules: &'a RuleSet, runner: R) -> Self {
        Self::with_options(rules, runner, BuildOptions::default())
    }

    /// A builder with explicit options.
    pub fn with_options(rules: &'a RuleSet, runner: R, options: BuildOptions) -> Self {
        Self {
            rules,
            runner,
            options,
            built: HashSet::new(),
            in_progress: HashSet::new(),
            rebuilt: Vec::new(),
        }
    }

    /// Builds `target` and, first, everything it depends on.
    ///
    /// Fails with `CycleDetected` when `target` is reached again while still being resolved,
    /// `NoRuleForTarget` when it has neither a rule nor a file, and `CommandFailed` on the
    /// first command that does not succeed.
    pub fn build(&mut self, target: &str) -> Result<(), BuildError> {
        if self.built.contains(target) {
            log::trace!("'{}' already built this session", target);
            return Ok(());
        }

        if self.in_progress.contains(target) {
            return Err(BuildError::CycleDetected {
                target: target.to_string(),
            });
        }

        let rules = self.rules;
        let Some(rule) = rules.get_rule(target) else {
            if paths::exists(&self.options.directory, target) {
                log::debug!("'{}' has no rule but exists on disk", target);
                return Ok(());
            }
            return Err(BuildError::NoRuleForTarget {
                target: target.to_string(),
            });
        };

        self.in_progress.insert(target.to_string());
        let result = self.resolve_rule(rule);
        self.in_progress.remove(target);
        result?;

        self.built.insert(target.to_string());
        Ok(())
    }

    /// Builds the first rule of the makefile.
    pub fn build_default(&mut self) -> Result<(), BuildError> {
        let rules = self.rules;
        let target = rules.default_target().ok_or(BuildError::NoDefaultTarget)?;
        self.build(target)
    }

    /// Builds each target in order, stopping at the first failure.
    pub fn build_all<S: AsRef<str>>(&mut self, targets: &[S]) -> Result<(), BuildError> {
        for target in targets {
            self.build(target.as_ref())?;
        }
        Ok(())
    }

    /// Whether `target` was settled during this session.
    pub fn is_built(&self, target: &str) -> bool {
        self.built.contains(target)
    }

    /// Targets whose commands ran (or were printed, in a dry run) this session, in order.
    pub fn rebuilt_targets(&self) -> &[String] {
        &self.rebuilt
    }

    /// Forgets the session so targets are re-evaluated from scratch on the next build.
    pub fn reset(&mut self) {
        self.built.clear();
        self.in_progress.clear();
        self.rebuilt.clear();
    }

    /// The runner commands are handed to.
    pub fn runner(&self) -> &R {
        &self.runner
    }

    /// Ends the session, returning the runner.
    pub fn into_runner(self) -> R {
        self.runner
    }

    fn resolve_rule(&mut self, rule: &'a Rule) -> Result<(), BuildError> {
        for dependency in &rule.dependencies {
            self.build(dependency)?;
        }

        let target_time = self.target_time(&rule.target);
        if !self.needs_rebuild(rule, target_time) {
            log::debug!("'{}' is up to date", rule.target);
            return Ok(());
        }

        log::info!("Building target: {}", rule.target);
        let auto_vars = self.automatic_variables(rule, target_time);

        let mut ran_any = false;
        for command in &rule.commands {
            ran_any |= self.run_command(rule, command, &auto_vars)?;
        }
        if ran_any {
            self.rebuilt.push(rule.target.clone());
        }
        Ok(())
    }

    /// Modification time of the target's output. Phony targets never have one.
    fn target_time(&self, target: &str) -> Option<SystemTime> {
        if self.rules.is_phony(target) {
            return None;
        }
        paths::modified_time(&self.options.directory, target)
    }

    /// Modification time of a prerequisite, or `None` when it takes no part in timestamp
    /// comparisons (no file, or declared phony).
    fn prerequisite_time(&self, prerequisite: &str) -> Option<SystemTime> {
        if self.rules.is_phony(prerequisite) {
            return None;
        }
        paths::modified_time(&self.options.directory, prerequisite)
    }

    fn needs_rebuild(&self, rule: &Rule, target_time: Option<SystemTime>) -> bool {
        let Some(target_time) = target_time else {
            log::debug!("'{}' does not exist, needs rebuild", rule.target);
            return true;
        };

        rule.dependencies.iter().any(|dep| {
            let newer = self
                .prerequisite_time(dep)
                .is_some_and(|dep_time| dep_time > target_time);
            log::trace!("'{}' newer than '{}': {}", dep, rule.target, newer);
            newer
        })
    }

    fn automatic_variables(&self, rule: &Rule, target_time: Option<SystemTime>) -> AutomaticVariables {
        let newer_prereqs = match target_time {
            None => rule.dependencies.clone(),
            Some(target_time) => rule
                .dependencies
                .iter()
                .filter(|dep| {
                    self.prerequisite_time(dep)
                        .is_some_and(|dep_time| dep_time > target_time)
                })
                .cloned()
                .collect(),
        };

        AutomaticVariables {
            target: rule.target.clone(),
            first_prereq: rule.dependencies.first().cloned().unwrap_or_default(),
            all_prereqs: rule.dependencies.clone(),
            newer_prereqs,
        }
    }

    /// Expands and runs one command. Returns whether anything was run or printed.
    fn run_command(
        &mut self,
        rule: &Rule,
        command: &str,
        auto_vars: &AutomaticVariables,
    ) -> Result<bool, BuildError> {
        let expanded = self.rules.expand_with_context(command, Some(auto_vars));
        let line = RecipeLine::parse(&expanded);
        if line.is_empty() {
            return Ok(false);
        }

        let echo = self.options.dry_run || !(line.silent || self.options.silent);
        if echo {
            println!("{} {}", "→".blue(), line.command.green());
        }

        if self.options.dry_run && !line.force {
            return Ok(true);
        }

        match self.runner.run(line.command) {
            Ok(()) => Ok(true),
            Err(e @ (ExecutionError::NonZeroExitStatus { .. } | ExecutionError::Spawn { .. }))
                if line.ignore_errors =>
            {
                log::warn!("{} (ignored)", e);
                Ok(true)
            }
            Err(e) => Err(BuildError::CommandFailed {
                target: rule.target.clone(),
                command: line.command.to_string(),
                source: e,
            }),
        }
    }
}
