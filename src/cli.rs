// src/cli.rs

use clap::Parser;
use std::path::PathBuf;

/// tinymake: build targets from a makefile, rebuilding only what is out of date.
///
/// Positional arguments are either target names or `NAME=VALUE` variable overrides.
/// Overrides take precedence over any assignment in the makefile. With no targets, the
/// first rule in the makefile is built.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Read FILE as the makefile instead of searching for GNUmakefile, makefile, Makefile.
    #[arg(short, long, value_name = "FILE")]
    pub file: Option<PathBuf>,

    /// Change to DIR before doing anything.
    #[arg(short = 'C', long, value_name = "DIR")]
    pub directory: Option<PathBuf>,

    /// Print the commands that would run, without running them.
    #[arg(short = 'n', long = "dry-run", visible_alias = "just-print")]
    pub dry_run: bool,

    /// Do not echo commands.
    #[arg(short, long, visible_alias = "quiet")]
    pub silent: bool,

    /// List all targets and exit.
    #[arg(short, long)]
    pub list: bool,

    /// Print the parsed rules and variables as JSON and exit.
    #[arg(short, long = "print-rules")]
    pub print_rules: bool,

    /// Targets to build and `NAME=VALUE` overrides.
    #[arg(value_name = "TARGET|NAME=VALUE")]
    pub args: Vec<String>,
}

impl Cli {
    /// Splits positional arguments into (overrides, targets), keeping their order.
    pub fn split_args(&self) -> (Vec<(String, String)>, Vec<String>) {
        let mut overrides = Vec::new();
        let mut targets = Vec::new();
        for arg in &self.args {
            match parse_override(arg) {
                Some((name, value)) => overrides.push((name.to_string(), value.to_string())),
                None => targets.push(arg.clone()),
            }
        }
        (overrides, targets)
    }
}

/// `NAME=VALUE` with a non-empty name free of whitespace and `:`.
fn parse_override(arg: &str) -> Option<(&str, &str)> {
    let (name, value) = arg.split_once('=')?;
    if name.is_empty() || name.contains(|c: char| c.is_whitespace() || c == ':') {
        return None;
    }
    Some((name, value))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_and_positionals() {
        let cli = Cli::parse_from([
            "tinymake", "-f", "build.mk", "-C", "sub", "-n", "-s", "CC=clang", "all", "install",
        ]);
        assert_eq!(cli.file, Some(PathBuf::from("build.mk")));
        assert_eq!(cli.directory, Some(PathBuf::from("sub")));
        assert!(cli.dry_run);
        assert!(cli.silent);
        assert!(!cli.list);

        let (overrides, targets) = cli.split_args();
        assert_eq!(overrides, vec![("CC".to_string(), "clang".to_string())]);
        assert_eq!(targets, vec!["all", "install"]);
    }

    #[test]
    fn test_override_detection() {
        assert_eq!(parse_override("CFLAGS=-O2 -g"), Some(("CFLAGS", "-O2 -g")));
        assert_eq!(parse_override("EMPTY="), Some(("EMPTY", "")));
        assert_eq!(parse_override("=oops"), None);
        assert_eq!(parse_override("clean"), None);
    }

    #[test]
    fn test_cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
