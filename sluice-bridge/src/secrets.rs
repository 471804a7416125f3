//! Secrets resolution
//!
//! Secrets are resolved once, before the engine is invoked, into an
//! immutable `ResolvedSecrets` that lives for the duration of the run.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;

use crate::error::SecretsError;

/// Supplies credentials to a run
pub trait SecretsResolver: Send + Sync {
    /// Resolves every name in `names`
    ///
    /// # Errors
    /// `SecretsError::Missing` for the first name that has no value.
    fn resolve(&self, names: &BTreeSet<String>) -> Result<ResolvedSecrets, SecretsError>;
}

/// Secret values for one run
///
/// Read-only once built. `Debug` never prints values.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct ResolvedSecrets {
    values: BTreeMap<String, String>,
}

impl ResolvedSecrets {
    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl FromIterator<(String, String)> for ResolvedSecrets {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().collect(),
        }
    }
}

impl fmt::Debug for ResolvedSecrets {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.values.keys().map(|k| (k, "<redacted>")))
            .finish()
    }
}

/// Reads secrets from the process environment
///
/// Secret `NAME` is read from `<prefix>NAME`.
#[derive(Debug, Clone, Default)]
pub struct EnvSecretsResolver {
    prefix: String,
}

impl EnvSecretsResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }
}

impl SecretsResolver for EnvSecretsResolver {
    fn resolve(&self, names: &BTreeSet<String>) -> Result<ResolvedSecrets, SecretsError> {
        names
            .iter()
            .map(|name| {
                if name.is_empty() || name.contains('=') || name.contains('\0') {
                    return Err(SecretsError::InvalidName(name.clone()));
                }
                let var = format!("{}{}", self.prefix, name);
                std::env::var(&var)
                    .map(|value| (name.clone(), value))
                    .map_err(|_| SecretsError::Missing(name.clone()))
            })
            .collect()
    }
}

/// Serves secrets from a fixed map
#[derive(Debug, Clone, Default)]
pub struct StaticSecretsResolver {
    values: HashMap<String, String>,
}

impl StaticSecretsResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_secret(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.insert(name.into(), value.into());
        self
    }
}

impl SecretsResolver for StaticSecretsResolver {
    fn resolve(&self, names: &BTreeSet<String>) -> Result<ResolvedSecrets, SecretsError> {
        names
            .iter()
            .map(|name| {
                self.values
                    .get(name)
                    .map(|value| (name.clone(), value.clone()))
                    .ok_or_else(|| SecretsError::Missing(name.clone()))
            })
            .collect()
    }
}
