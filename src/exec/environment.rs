// src/exec/environment.rs

//! Environment overlay merged on top of the inherited process environment.

use std::collections::BTreeMap;
use std::ffi::OsString;

use crate::errors::{CartmeshError, Result};

/// Effective environment of a subprocess, passed on as-is.
pub type Environment = BTreeMap<OsString, OsString>;

/// Source of the base environment a subprocess inherits.
///
/// Production code uses [`SystemEnvironment`]; tests can hand in a fixed map.
pub trait HostEnvironment: Send + Sync {
    fn vars(&self) -> Vec<(OsString, OsString)>;
}

/// Reads the environment of the current process, including variables that
/// are not valid UTF-8.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemEnvironment;

impl HostEnvironment for SystemEnvironment {
    fn vars(&self) -> Vec<(OsString, OsString)> {
        std::env::vars_os().collect()
    }
}

impl HostEnvironment for BTreeMap<String, String> {
    fn vars(&self) -> Vec<(OsString, OsString)> {
        self.iter()
            .map(|(k, v)| (OsString::from(k), OsString::from(v)))
            .collect()
    }
}

impl HostEnvironment for Environment {
    fn vars(&self) -> Vec<(OsString, OsString)> {
        self.iter().map(|(k, v)| (k.clone(), v.clone())).collect()
    }
}

/// Ordered list of variable overrides. Later entries win over earlier ones
/// and over the inherited environment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvironmentOverlay {
    entries: Vec<(String, String)>,
}

impl EnvironmentOverlay {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.entries.push((key.into(), value.into()));
    }

    /// Parse `KEY=VALUE` entries, e.g. from repeated `--env` flags.
    ///
    /// Only the first `=` separates key and value, so values may contain `=`.
    pub fn parse_entries<I, S>(entries: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut overlay = Self::new();
        for entry in entries {
            let entry = entry.as_ref();
            let (key, value) = entry.split_once('=').ok_or_else(|| {
                CartmeshError::EnvironmentBuild(format!(
                    "entry '{entry}' is not of the form KEY=VALUE"
                ))
            })?;
            overlay.insert(key, value);
        }
        Ok(overlay)
    }

    pub fn extend(&mut self, other: &EnvironmentOverlay) {
        self.entries.extend(other.entries.iter().cloned());
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[(String, String)] {
        &self.entries
    }

    /// Build the effective environment: inherited variables, then every
    /// overlay entry in order.
    ///
    /// Fails on the first malformed entry so nothing is spawned with a
    /// partial environment.
    pub fn build(&self, host: &dyn HostEnvironment) -> Result<Environment> {
        for (key, value) in &self.entries {
            validate_entry(key, value)?;
        }

        let mut env: Environment = host.vars().into_iter().collect();
        for (key, value) in &self.entries {
            env.insert(OsString::from(key), OsString::from(value));
        }
        Ok(env)
    }
}

fn validate_entry(key: &str, value: &str) -> Result<()> {
    if key.is_empty() {
        return Err(CartmeshError::EnvironmentBuild(
            "variable name must not be empty".to_string(),
        ));
    }
    if key.contains('=') {
        return Err(CartmeshError::EnvironmentBuild(format!(
            "variable name '{key}' must not contain '='"
        )));
    }
    if key.contains('\0') {
        return Err(CartmeshError::EnvironmentBuild(format!(
            "variable name '{}' contains a NUL byte",
            key.escape_debug()
        )));
    }
    if value.contains('\0') {
        return Err(CartmeshError::EnvironmentBuild(format!(
            "value of '{key}' contains a NUL byte"
        )));
    }
    Ok(())
}
