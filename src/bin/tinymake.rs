// src/bin/tinymake.rs

use anyhow::{Context, Result};
use clap::Parser as _;
use colored::*;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use tinymake::{
    CancellationToken,
    cli::Cli,
    constants::{DEFAULT_SHELL, EXIT_BUILD_FAILURE, EXIT_INTERRUPTED, SHELL_VARIABLE},
    core::{
        builder::{BuildError, BuildOptions, Builder},
        parser::Parser,
        paths,
    },
    models::RuleSet,
    system::executor::{ExecutionError, ShellRunner},
};

/// The main entry point of `tinymake`.
/// It sets up logging, parses arguments, runs the build, and performs centralized error handling.
fn main() {
    // Embedders can flip this flag to stop a running build; the CLI relies on the terminal
    // delivering Ctrl+C to child processes directly.
    let cancellation_token = Arc::new(AtomicBool::new(false));
    env_logger::init();

    if let Err(e) = run_cli(Cli::parse(), cancellation_token) {
        if is_cancellation(&e) {
            std::process::exit(EXIT_INTERRUPTED);
        }

        eprintln!("{}: {:#}", "Error".red().bold(), e);
        std::process::exit(EXIT_BUILD_FAILURE);
    }
}

fn is_cancellation(error: &anyhow::Error) -> bool {
    error.chain().any(|cause| {
        matches!(
            cause.downcast_ref::<ExecutionError>(),
            Some(ExecutionError::Cancelled)
        )
    })
}

fn run_cli(cli: Cli, cancellation_token: CancellationToken) -> Result<()> {
    log::debug!("CLI args parsed: {:?}", cli);

    let directory =
        paths::canonical_directory(cli.directory.as_deref().unwrap_or(Path::new(".")))?;
    let makefile = match &cli.file {
        Some(file) => directory.join(file),
        None => paths::find_makefile(&directory)?,
    };

    let (overrides, targets) = cli.split_args();
    let parser = overrides
        .into_iter()
        .fold(Parser::new(), |parser, (name, value)| parser.with_override(name, value));
    let rules = parser
        .parse_file(&makefile)
        .with_context(|| format!("Failed to parse '{}'", makefile.display()))?;

    if cli.print_rules {
        println!("{}", serde_json::to_string_pretty(&rules)?);
        return Ok(());
    }
    if cli.list {
        for target in rules.targets() {
            println!("{}", target);
        }
        return Ok(());
    }

    let runner = ShellRunner::new(&directory)
        .with_shell(shell_for(&rules))
        .with_cancellation(cancellation_token);
    let options = BuildOptions {
        directory,
        dry_run: cli.dry_run,
        silent: cli.silent,
    };
    let mut builder = Builder::with_options(&rules, runner, options);

    let requested = if targets.is_empty() {
        vec![
            rules
                .default_target()
                .ok_or(BuildError::NoDefaultTarget)?
                .to_string(),
        ]
    } else {
        targets
    };

    for target in &requested {
        let rebuilt_before = builder.rebuilt_targets().len();
        builder
            .build(target)
            .with_context(|| format!("Failed to build target '{}'", target))?;

        if builder.rebuilt_targets().len() == rebuilt_before {
            report_nothing_done(&rules, target);
        }
    }

    Ok(())
}

/// The makefile's `SHELL` when bound there, never the environment's.
fn shell_for(rules: &RuleSet) -> String {
    if rules.has_variable(SHELL_VARIABLE) {
        rules.get_variable(SHELL_VARIABLE).to_string()
    } else {
        DEFAULT_SHELL.to_string()
    }
}

fn report_nothing_done(rules: &RuleSet, target: &str) {
    let has_commands = rules
        .get_rule(target)
        .is_some_and(|rule| !rule.commands.is_empty());
    let message = if has_commands {
        format!("tinymake: '{}' is up to date.", target)
    } else {
        format!("tinymake: Nothing to be done for '{}'.", target)
    };
    println!("{}", message.dimmed());
}
