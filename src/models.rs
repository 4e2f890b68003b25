// src/models.rs

use crate::{constants::PHONY_TARGET, core::variables::VariableStore};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

/// A single rule: the target, the prerequisites it depends on, and the commands that build it.
///
/// ```text
/// hello: hello.c
/// 	gcc -o hello hello.c
/// ```
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
pub struct Rule {
    /// Name of the file (or phony action) this rule produces.
    pub target: String,
    /// Prerequisites, built before the target in declaration order.
    pub dependencies: Vec<String>,
    /// Recipe lines as written, expanded only when run.
    pub commands: Vec<String>,
}

impl Rule {
    /// Creates a rule with no commands yet.
    pub fn new(target: impl Into<String>, dependencies: Vec<String>) -> Self {
        Self {
            target: target.into(),
            dependencies,
            commands: Vec::new(),
        }
    }

    /// Builder-style helper used mostly by tests and embedders.
    pub fn with_commands(mut self, commands: &[&str]) -> Self {
        self.commands = commands.iter().map(|c| c.to_string()).collect();
        self
    }
}

/// The in-memory model of a parsed makefile.
///
/// Every key in `rules` equals the `target` of the rule it maps to. Once handed to a
/// `Builder` it is only read.
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct RuleSet {
    /// Rules keyed by target name.
    pub rules: HashMap<String, Rule>,
    /// Name of the first ordinary rule encountered, used when no target is requested.
    pub default_target: Option<String>,
    /// Variables bound while parsing.
    pub variables: VariableStore,
    /// Names declared through `.PHONY`.
    pub phony: BTreeSet<String>,
}

impl RuleSet {
    /// An empty rule set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts `rule`, replacing any earlier rule for the same target.
    ///
    /// The first rule whose target does not start with `.` becomes the default target.
    /// Returns the rule that was replaced, if any.
    pub fn add_rule(&mut self, rule: Rule) -> Option<Rule> {
        if self.default_target.is_none() && !rule.target.starts_with('.') {
            self.default_target = Some(rule.target.clone());
        }
        self.rules.insert(rule.target.clone(), rule)
    }

    /// Whether a rule exists for `target`.
    pub fn has_target(&self, target: &str) -> bool {
        self.rules.contains_key(target)
    }

    /// The rule for `target`, if any.
    pub fn get_rule(&self, target: &str) -> Option<&Rule> {
        self.rules.get(target)
    }

    pub(crate) fn get_rule_mut(&mut self, target: &str) -> Option<&mut Rule> {
        self.rules.get_mut(target)
    }

    /// All target names, sorted.
    pub fn targets(&self) -> Vec<&str> {
        let mut targets: Vec<&str> = self.rules.keys().map(String::as_str).collect();
        targets.sort_unstable();
        targets
    }

    /// The target built when none is requested.
    pub fn default_target(&self) -> Option<&str> {
        self.default_target.as_deref()
    }

    /// Declares `name` phony. `.PHONY` itself is never recorded.
    pub fn mark_phony(&mut self, name: impl Into<String>) {
        let name = name.into();
        if name != PHONY_TARGET {
            self.phony.insert(name);
        }
    }

    /// Whether `target` was declared through `.PHONY`.
    pub fn is_phony(&self, target: &str) -> bool {
        self.phony.contains(target)
    }

    // --- Variable store delegation ---

    /// Binds `name` to `value`, replacing any earlier value.
    pub fn set_variable(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.variables.set(name, value);
    }

    /// The locally bound value of `name`, or `""`.
    pub fn get_variable(&self, name: &str) -> &str {
        self.variables.get(name)
    }

    /// Whether `name` is bound locally. The environment is not consulted.
    pub fn has_variable(&self, name: &str) -> bool {
        self.variables.contains(name)
    }

    /// Expands `$(NAME)` and `${NAME}` references. See [`VariableStore::expand`].
    pub fn expand(&self, text: &str) -> String {
        self.variables.expand(text)
    }

    /// Expands automatic variables from `auto_vars`, then named references.
    pub fn expand_with_context(&self, text: &str, auto_vars: Option<&AutomaticVariables>) -> String {
        self.variables.expand_with_context(text, auto_vars)
    }
}

/// The per-step values behind `$@`, `$<`, `$^` and `$?`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AutomaticVariables {
    /// `$@`
    pub target: String,
    /// `$<`, empty when the rule has no prerequisites.
    pub first_prereq: String,
    /// `$^`
    pub all_prereqs: Vec<String>,
    /// `$?`: prerequisites newer than the target, or all of them if the target is missing.
    pub newer_prereqs: Vec<String>,
}

impl AutomaticVariables {
    /// `$^` as substituted into a command.
    pub fn all_prereqs_string(&self) -> String {
        self.all_prereqs.join(" ")
    }

    /// `$?` as substituted into a command.
    pub fn newer_prereqs_string(&self) -> String {
        self.newer_prereqs.join(" ")
    }
}
