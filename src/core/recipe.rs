// src/core/recipe.rs

//! Recipe line modifiers.

/// An expanded command line with its leading modifiers split off.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecipeLine<'a> {
    /// The command text handed to the shell.
    pub command: &'a str,
    /// `@`: do not echo the command.
    pub silent: bool,
    /// `-`: a non-zero exit status is not an error.
    pub ignore_errors: bool,
    /// `+`: run even during a dry run.
    pub force: bool,
}

impl<'a> RecipeLine<'a> {
    /// Strips any leading combination of `@`, `-` and `+` (with optional whitespace between).
    pub fn parse(expanded: &'a str) -> Self {
        let mut line = RecipeLine {
            command: expanded.trim(),
            silent: false,
            ignore_errors: false,
            force: false,
        };

        loop {
            let rest = if let Some(rest) = line.command.strip_prefix('@') {
                line.silent = true;
                rest
            } else if let Some(rest) = line.command.strip_prefix('-') {
                line.ignore_errors = true;
                rest
            } else if let Some(rest) = line.command.strip_prefix('+') {
                line.force = true;
                rest
            } else {
                break;
            };
            line.command = rest.trim_start();
        }

        line
    }

    /// Whether nothing is left to run.
    pub fn is_empty(&self) -> bool {
        self.command.is_empty()
    }
}
