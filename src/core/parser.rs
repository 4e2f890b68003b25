//! # Parser
//!
//! Turns makefile text into a [`RuleSet`]. Supported syntax:
//!
//! - `# comment` lines, blank lines, and trailing `# comments` outside recipes
//! - `\` at end of line joins it with the next one
//! - `NAME = value` (also `:=`, `::=`, `?=`, `+=`); values are expanded on assignment
//! - `target [target...]: prerequisites [; command]`
//! - tab-indented recipe lines, stored unexpanded and expanded per build step
//! - `.PHONY: names...`
//!
//! Pattern rules, conditionals and `include` are not recognized.

use crate::{
    constants::PHONY_TARGET,
    core::variables::parse_assignment,
    models::{Rule, RuleSet},
};
use std::{collections::HashMap, fs, path::Path};
use thiserror::Error;

/// Why a makefile could not be parsed.
#[derive(Error, Debug)]
pub enum ParseError {
    /// The file could not be read.
    #[error("Could not read makefile '{path}': {source}")]
    Io {
        /// The makefile path.
        path: String,
        /// The read error.
        #[source]
        source: std::io::Error,
    },
    /// A tab-indented line appeared before any rule.
    #[error("line {line}: recipe commences before first target.")]
    RecipeBeforeTarget {
        /// 1-based line number.
        line: usize,
    },
    /// A line is neither an assignment nor a rule header.
    #[error("line {line}: missing separator in '{text}'.")]
    MissingSeparator {
        /// 1-based line number.
        line: usize,
        /// The offending text.
        text: String,
    },
}

/// What recipe lines attach to.
#[derive(Debug)]
enum RecipeOwner {
    Nothing,
    Targets(Vec<String>),
    /// Special targets like `.PHONY`, whose recipes are dropped.
    Special,
}

/// Makefile parser, optionally seeded with command-line variable overrides.
#[derive(Debug, Clone, Default)]
pub struct Parser {
    overrides: HashMap<String, String>,
}

impl Parser {
    /// A parser with no overrides.
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds `name` before parsing. Makefile assignments to it are then ignored.
    pub fn with_override(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.overrides.insert(name.into(), value.into());
        self
    }

    /// Reads and parses the makefile at `path`.
    pub fn parse_file(&self, path: &Path) -> Result<RuleSet, ParseError> {
        let content = fs::read_to_string(path).map_err(|e| ParseError::Io {
            path: path.display().to_string(),
            source: e,
        })?;
        self.parse_str(&content)
    }

    /// Parses makefile text.
    pub fn parse_str(&self, content: &str) -> Result<RuleSet, ParseError> {
        let mut rules = RuleSet::new();
        for (name, value) in &self.overrides {
            rules.set_variable(name.clone(), value.clone());
        }

        let mut owner = RecipeOwner::Nothing;

        for (line_no, line) in logical_lines(content) {
            // Skip empty lines and full-line comments, indented or not.
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }

            if let Some(command) = line.strip_prefix('\t') {
                match &owner {
                    RecipeOwner::Targets(targets) => {
                        for target in targets {
                            if let Some(rule) = rules.get_rule_mut(target) {
                                rule.commands.push(command.to_string());
                            }
                        }
                    }
                    RecipeOwner::Special => {
                        log::debug!("line {}: ignoring recipe of special target", line_no);
                    }
                    RecipeOwner::Nothing => {
                        return Err(ParseError::RecipeBeforeTarget { line: line_no });
                    }
                }
                continue;
            }

            let text = strip_comment(&line).trim();
            if text.is_empty() {
                continue;
            }

            if let Some((name, op, value)) = parse_assignment(text) {
                if self.overrides.contains_key(name) {
                    log::debug!("line {}: '{}' is overridden on the command line", line_no, name);
                } else {
                    rules.variables.assign(name, op, value);
                }
                continue;
            }

            let Some((lhs, rhs)) = text.split_once(':') else {
                return Err(ParseError::MissingSeparator {
                    line: line_no,
                    text: text.to_string(),
                });
            };

            owner = self.parse_rule_header(&mut rules, line_no, lhs, rhs)?;
        }

        log::debug!(
            "Parsed {} rules and {} variables",
            rules.rules.len(),
            rules.variables.len()
        );
        Ok(rules)
    }

    fn parse_rule_header(
        &self,
        rules: &mut RuleSet,
        line_no: usize,
        lhs: &str,
        rhs: &str,
    ) -> Result<RecipeOwner, ParseError> {
        let targets: Vec<String> = rules
            .expand(lhs)
            .split_whitespace()
            .map(str::to_string)
            .collect();
        if targets.is_empty() {
            return Err(ParseError::MissingSeparator {
                line: line_no,
                text: format!("{}:{}", lhs, rhs),
            });
        }

        // `a:: b` is read as `a: b`; `a: b ; cmd` carries an inline recipe line.
        let rhs = rhs.strip_prefix(':').unwrap_or(rhs);
        let (prereqs, inline_command) = match rhs.split_once(';') {
            Some((prereqs, command)) => (prereqs, Some(command.trim())),
            None => (rhs, None),
        };
        let dependencies: Vec<String> = rules
            .expand(prereqs)
            .split_whitespace()
            .map(str::to_string)
            .collect();

        if targets.iter().any(|t| t == PHONY_TARGET) {
            for name in dependencies {
                rules.mark_phony(name);
            }
            return Ok(RecipeOwner::Special);
        }

        for target in &targets {
            let mut rule = Rule::new(target.clone(), dependencies.clone());
            if let Some(command) = inline_command.filter(|c| !c.is_empty()) {
                rule.commands.push(command.to_string());
            }
            if rules.add_rule(rule).is_some() {
                log::warn!("line {}: overriding rule for target '{}'", line_no, target);
            }
        }
        Ok(RecipeOwner::Targets(targets))
    }
}

/// Parses makefile text with no overrides.
pub fn parse_str(content: &str) -> Result<RuleSet, ParseError> {
    Parser::new().parse_str(content)
}

/// Reads and parses a makefile with no overrides.
pub fn parse_file(path: &Path) -> Result<RuleSet, ParseError> {
    Parser::new().parse_file(path)
}

/// Joins backslash-continued physical lines, keeping the number of the first one.
fn logical_lines(content: &str) -> Vec<(usize, String)> {
    let mut lines = Vec::new();
    let mut pending: Option<(usize, String)> = None;

    for (idx, raw) in content.lines().enumerate() {
        let (line_no, text) = match pending.take() {
            Some((line_no, mut acc)) => {
                acc.push(' ');
                acc.push_str(raw.trim_start());
                (line_no, acc)
            }
            None => (idx + 1, raw.to_string()),
        };

        match text.strip_suffix('\\') {
            Some(continued) => pending = Some((line_no, continued.trim_end().to_string())),
            None => lines.push((line_no, text)),
        }
    }

    if let Some(last) = pending {
        lines.push(last);
    }
    lines
}

fn strip_comment(line: &str) -> &str {
    line.split_once('#').map_or(line, |(before, _)| before)
}
