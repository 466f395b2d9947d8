use std::collections::HashMap;
use std::env as stdenv;

/// Snapshot of the process environment consulted when a session is configured.
///
/// Variables are copied once at start-up so a session never observes later changes to the
/// real process environment. Tests build an empty one with [`Environment::empty`] and set
/// only the variables they care about.
#[derive(Debug, Clone, Default)]
pub struct Environment {
    /// Key-value store of environment variables (e.g. `DOSSHELL_PROMPT`).
    pub vars: HashMap<String, String>,
}

impl Environment {
    /// Capture the current process variables into a new `Environment`.
    pub fn new() -> Self {
        Self {
            vars: stdenv::vars().collect(),
        }
    }

    /// An environment with no variables at all.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Get the value of a variable, treating an empty value as unset.
    pub fn get_var(&self, key: &str) -> Option<&str> {
        self.vars
            .get(key)
            .map(String::as_str)
            .filter(|v| !v.is_empty())
    }

    /// Set or override a variable.
    pub fn set_var(&mut self, key: impl Into<String>, val: impl Into<String>) {
        self.vars.insert(key.into(), val.into());
    }
}
