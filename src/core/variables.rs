//! # Variables
//!
//! The name→value store collected while parsing, and the text expander built on it.
//!
//! Expansion runs in two passes. Automatic variables (`$@`, `$<`, `$^`, `$?`) are replaced
//! first, and only when a build-step context is supplied. Named references (`$(NAME)` and
//! `${NAME}`) are replaced second, in a single left-to-right scan. Substituted values are
//! inserted verbatim and never re-expanded.

use crate::models::AutomaticVariables;
use lazy_static::lazy_static;
use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use std::{collections::HashMap, env};

lazy_static! {
    static ref AUTO_VAR_RE: Regex = Regex::new(r"\$[@<^?]").expect("valid automatic variable regex");

    // Both delimiter styles in one pass, so a value substituted for `$(A)` that happens to
    // contain `${B}` is left alone.
    static ref NAMED_VAR_RE: Regex =
        Regex::new(r"\$(?:\(([^)]+)\)|\{([^}]+)\})").expect("valid named variable regex");
}

/// The operator of a variable assignment line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignOp {
    /// `=`
    Recursive,
    /// `:=` or `::=`
    Simple,
    /// `?=`
    Conditional,
    /// `+=`
    Append,
}

/// Splits `NAME op value` into its parts.
///
/// Returns `None` when the line is not an assignment: no `=`, an empty name, or a name
/// containing whitespace or `:` (which makes it a rule header such as `a: b=c`).
pub fn parse_assignment(line: &str) -> Option<(&str, AssignOp, &str)> {
    let (lhs, value) = line.split_once('=')?;

    let (lhs, op) = if let Some(rest) = lhs.strip_suffix("::") {
        (rest, AssignOp::Simple)
    } else if let Some(rest) = lhs.strip_suffix(':') {
        (rest, AssignOp::Simple)
    } else if let Some(rest) = lhs.strip_suffix('?') {
        (rest, AssignOp::Conditional)
    } else if let Some(rest) = lhs.strip_suffix('+') {
        (rest, AssignOp::Append)
    } else {
        (lhs, AssignOp::Recursive)
    };

    let name = lhs.trim();
    if name.is_empty() || name.contains(|c: char| c.is_whitespace() || c == ':') {
        return None;
    }
    Some((name, op, value.trim()))
}

/// Name→value bindings. Last write wins.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(transparent)]
pub struct VariableStore {
    values: HashMap<String, String>,
}

impl VariableStore {
    /// An empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds `name` to `value`, replacing any earlier value.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.values.insert(name.into(), value.into());
    }

    /// The bound value, or `""` when unbound. Use [`Self::contains`] to tell the two apart.
    pub fn get(&self, name: &str) -> &str {
        self.values.get(name).map(String::as_str).unwrap_or("")
    }

    /// Whether `name` is bound locally.
    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    /// Number of local bindings.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether nothing is bound.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Applies an assignment read from a makefile. `raw_value` is expanded against the
    /// current bindings first, so `=` and `:=` behave the same here.
    pub fn assign(&mut self, name: &str, op: AssignOp, raw_value: &str) {
        match op {
            AssignOp::Conditional => {
                if self.contains(name) || env::var_os(name).is_some() {
                    log::trace!("'{}' already defined, skipping ?= assignment", name);
                    return;
                }
                let value = self.expand(raw_value);
                self.set(name, value);
            }
            AssignOp::Append => {
                let value = self.expand(raw_value);
                match self.values.get_mut(name) {
                    Some(existing) => {
                        if !existing.is_empty() && !value.is_empty() {
                            existing.push(' ');
                        }
                        existing.push_str(&value);
                    }
                    None => self.set(name, value),
                }
            }
            AssignOp::Recursive | AssignOp::Simple => {
                let value = self.expand(raw_value);
                self.set(name, value);
            }
        }
    }

    /// Three-tier lookup: local binding, then process environment, then `""`.
    pub fn lookup(&self, name: &str) -> String {
        if let Some(value) = self.values.get(name) {
            return value.clone();
        }
        env::var_os(name)
            .map(|v| v.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    /// Rewrites every `$(NAME)` and `${NAME}` in `text`. Unterminated references are kept as-is.
    pub fn expand(&self, text: &str) -> String {
        NAMED_VAR_RE
            .replace_all(text, |caps: &Captures<'_>| {
                let name = caps.get(1).or_else(|| caps.get(2)).map_or("", |m| m.as_str());
                self.lookup(name)
            })
            .into_owned()
    }

    /// Like [`Self::expand`], but first rewrites the automatic variables from `auto_vars`.
    /// Without a context they stay literal.
    pub fn expand_with_context(&self, text: &str, auto_vars: Option<&AutomaticVariables>) -> String {
        let Some(auto) = auto_vars else {
            return self.expand(text);
        };

        let with_auto = AUTO_VAR_RE.replace_all(text, |caps: &Captures<'_>| {
            match caps.get(0).map_or("", |m| m.as_str()) {
                "$@" => auto.target.clone(),
                "$<" => auto.first_prereq.clone(),
                "$^" => auto.all_prereqs_string(),
                "$?" => auto.newer_prereqs_string(),
                other => other.to_string(),
            }
        });
        self.expand(&with_auto)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store(pairs: &[(&str, &str)]) -> VariableStore {
        let mut vars = VariableStore::new();
        for (name, value) in pairs {
            vars.set(*name, *value);
        }
        vars
    }

    fn out_context() -> AutomaticVariables {
        AutomaticVariables {
            target: "out".to_string(),
            first_prereq: "a.c".to_string(),
            all_prereqs: vec!["a.c".to_string(), "b.c".to_string()],
            newer_prereqs: vec!["a.c".to_string(), "b.c".to_string()],
        }
    }

    #[test]
    fn test_expand_both_delimiter_styles() {
        let vars = store(&[("CC", "gcc"), ("CFLAGS", "-Wall -O2"), ("TARGET", "hello")]);
        assert_eq!(vars.expand("$(CC) $(CFLAGS) -o $(TARGET)"), "gcc -Wall -O2 -o hello");
        assert_eq!(vars.expand("${CC} ${CFLAGS} -o ${TARGET}"), "gcc -Wall -O2 -o hello");
        assert_eq!(vars.expand("$(TARGET).o depends on ${TARGET}.c"), "hello.o depends on hello.c");
        assert_eq!(vars.expand("no variables here"), "no variables here");
    }

    #[test]
    fn test_unknown_variable_becomes_empty() {
        let vars = store(&[("CC", "gcc"), ("TARGET", "hello")]);
        assert_eq!(
            vars.expand("$(CC) $(TINYMAKE_SURELY_UNSET_VAR) $(TARGET)"),
            "gcc  hello"
        );
    }

    #[test]
    fn test_unterminated_reference_is_left_untouched() {
        let vars = store(&[("CC", "gcc")]);
        assert_eq!(vars.expand("$(CC) $(CC"), "gcc $(CC");
        assert_eq!(vars.expand("${CC"), "${CC");
    }

    #[test]
    fn test_substituted_values_are_not_re_expanded() {
        let vars = store(&[("A", "${B} $(B)"), ("B", "nope")]);
        assert_eq!(vars.expand("$(A)"), "${B} $(B)");
        assert_eq!(vars.expand("${A}"), "${B} $(B)");
    }

    #[test]
    fn test_local_binding_shadows_environment() {
        let env_path = env::var("PATH").unwrap_or_default();

        let unbound = VariableStore::new();
        assert_eq!(unbound.expand("$(PATH)"), env_path);

        let bound = store(&[("PATH", "local-value")]);
        assert_eq!(bound.expand("$(PATH)"), "local-value");
        assert_eq!(bound.lookup("PATH"), "local-value");
    }

    #[test]
    fn test_get_and_contains_distinguish_empty_from_unbound() {
        let vars = store(&[("EMPTY", ""), ("TEST_VAR", "test_value")]);
        assert_eq!(vars.get("TEST_VAR"), "test_value");
        assert!(vars.contains("EMPTY"));
        assert_eq!(vars.get("EMPTY"), "");
        assert!(!vars.contains("NONEXISTENT"));
        assert_eq!(vars.get("NONEXISTENT"), "");
    }

    #[test]
    fn test_automatic_variables_with_context() {
        let vars = VariableStore::new();
        let auto = out_context();
        assert_eq!(
            vars.expand_with_context("cc -o $@ $< | $^ | $?", Some(&auto)),
            "cc -o out a.c | a.c b.c | a.c b.c"
        );
    }

    #[test]
    fn test_automatic_variables_stay_literal_without_context() {
        let vars = store(&[("CC", "gcc")]);
        assert_eq!(vars.expand_with_context("$(CC) -o $@ $^", None), "gcc -o $@ $^");
    }

    #[test]
    fn test_named_values_may_contain_auto_var_characters() {
        let vars = store(&[("RULE_TEXT", "$@")]);
        let auto = out_context();
        assert_eq!(vars.expand_with_context("echo $(RULE_TEXT) $@", Some(&auto)), "echo $@ out");
    }

    #[test]
    fn test_parse_assignment_operators() {
        assert_eq!(parse_assignment("CC = gcc"), Some(("CC", AssignOp::Recursive, "gcc")));
        assert_eq!(
            parse_assignment("CFLAGS=-Wall -O2"),
            Some(("CFLAGS", AssignOp::Recursive, "-Wall -O2"))
        );
        assert_eq!(parse_assignment("   VAR   =   value   "), Some(("VAR", AssignOp::Recursive, "value")));
        assert_eq!(parse_assignment("EMPTY ="), Some(("EMPTY", AssignOp::Recursive, "")));
        assert_eq!(parse_assignment("X := y"), Some(("X", AssignOp::Simple, "y")));
        assert_eq!(parse_assignment("X ::= y"), Some(("X", AssignOp::Simple, "y")));
        assert_eq!(parse_assignment("X ?= y"), Some(("X", AssignOp::Conditional, "y")));
        assert_eq!(parse_assignment("X += y"), Some(("X", AssignOp::Append, "y")));
        assert_eq!(parse_assignment("A = b=c"), Some(("A", AssignOp::Recursive, "b=c")));
    }

    #[test]
    fn test_parse_assignment_rejects_non_assignments() {
        assert_eq!(parse_assignment("target: dependency"), None);
        assert_eq!(parse_assignment("just some text"), None);
        assert_eq!(parse_assignment("a: b=c"), None);
        assert_eq!(parse_assignment("= value"), None);
    }

    #[test]
    fn test_assign_operators() {
        let mut vars = VariableStore::new();
        vars.assign("CC", AssignOp::Recursive, "gcc");
        vars.assign("CFLAGS", AssignOp::Simple, "-O2");
        vars.assign("CFLAGS", AssignOp::Append, "-Wall");
        vars.assign("CC", AssignOp::Conditional, "clang");
        vars.assign("NEW", AssignOp::Append, "first");
        vars.assign("CMD", AssignOp::Recursive, "$(CC) $(CFLAGS)");

        assert_eq!(vars.get("CC"), "gcc");
        assert_eq!(vars.get("CFLAGS"), "-O2 -Wall");
        assert_eq!(vars.get("NEW"), "first");
        assert_eq!(vars.get("CMD"), "gcc -O2 -Wall");
    }

    #[test]
    fn test_conditional_assign_respects_environment() {
        let mut vars = VariableStore::new();
        vars.assign("PATH", AssignOp::Conditional, "/nowhere");
        assert!(!vars.contains("PATH"));
        vars.assign("TINYMAKE_SURELY_UNSET_VAR", AssignOp::Conditional, "fallback");
        assert_eq!(vars.get("TINYMAKE_SURELY_UNSET_VAR"), "fallback");
    }
}
