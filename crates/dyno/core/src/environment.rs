// Dotlanth
// Copyright (C) 2025 Synerthink

// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.

// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.

// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <http://www.gnu.org/licenses/>.

//! Per-occurrence environments
//!
//! An environment maps environment keys to values for a single event
//! occurrence. Externally supplied values are bound by the code generating
//! the event; computed values are produced on demand by a [`Provider`]
//! registered for the key. Looking up a key that is neither bound nor
//! computable is an error, never a silent default.

use std::any::{Any, type_name};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::error::{DynoError, DynoResult};

/// Identity of an environment variable
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EnvKey(pub &'static str);

impl EnvKey {
    pub const fn new(name: &'static str) -> Self {
        EnvKey(name)
    }

    pub fn name(&self) -> &'static str {
        self.0
    }
}

impl fmt::Display for EnvKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

/// Predefined, optional environment keys
pub mod keys {
    use super::EnvKey;

    /// The object that triggered the current event
    pub const THIS: EnvKey = EnvKey::new("this");

    /// The arguments of the call that triggered the current event
    pub const ARGS: EnvKey = EnvKey::new("args");
}

/// A type-erased environment value
pub type EnvValue = Arc<dyn Any + Send + Sync>;

/// Computes the value of an environment key from the rest of the environment.
///
/// Providers must not rely on the environment being mutated; they may read
/// and write state that outlives the environment (e.g. thread-local stores).
pub trait Provider: Send + Sync {
    /// The key this provider computes
    fn key(&self) -> EnvKey;

    /// Keys that must be resolvable for this provider to produce a value
    fn requires(&self) -> &[EnvKey] {
        &[]
    }

    fn compute(&self, env: &Environment) -> DynoResult<EnvValue>;
}

type ComputeFn = dyn Fn(&Environment) -> DynoResult<EnvValue> + Send + Sync;

/// A provider backed by a closure
pub struct FnProvider {
    key: EnvKey,
    requires: Vec<EnvKey>,
    compute: Box<ComputeFn>,
}

impl FnProvider {
    pub fn new<F>(key: EnvKey, requires: impl IntoIterator<Item = EnvKey>, compute: F) -> Self
    where
        F: Fn(&Environment) -> DynoResult<EnvValue> + Send + Sync + 'static,
    {
        Self {
            key,
            requires: requires.into_iter().collect(),
            compute: Box::new(compute),
        }
    }
}

impl Provider for FnProvider {
    fn key(&self) -> EnvKey {
        self.key
    }

    fn requires(&self) -> &[EnvKey] {
        &self.requires
    }

    fn compute(&self, env: &Environment) -> DynoResult<EnvValue> {
        (self.compute)(env)
    }
}

/// The set of computed keys available to environments
#[derive(Clone, Default)]
pub struct ProviderRegistry {
    providers: HashMap<EnvKey, Arc<dyn Provider>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a provider, replacing any previous provider for the same key
    pub fn register<P: Provider + 'static>(&mut self, provider: P) -> &mut Self {
        self.providers.insert(provider.key(), Arc::new(provider));
        self
    }

    /// Register a closure computing `key`
    pub fn computed<F>(&mut self, key: EnvKey, requires: impl IntoIterator<Item = EnvKey>, compute: F) -> &mut Self
    where
        F: Fn(&Environment) -> DynoResult<EnvValue> + Send + Sync + 'static,
    {
        self.register(FnProvider::new(key, requires, compute))
    }

    pub fn get(&self, key: EnvKey) -> Option<&Arc<dyn Provider>> {
        self.providers.get(&key)
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}

impl fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut keys: Vec<_> = self.providers.keys().collect();
        keys.sort();
        f.debug_struct("ProviderRegistry").field("keys", &keys).finish()
    }
}

/// An immutable key to value context scoped to one event occurrence
#[derive(Clone)]
pub struct Environment {
    externals: HashMap<EnvKey, EnvValue>,
    providers: Arc<ProviderRegistry>,
}

impl Environment {
    /// Create an environment with no bindings that can compute the keys of `providers`
    pub fn new(providers: Arc<ProviderRegistry>) -> Self {
        Self {
            externals: HashMap::new(),
            providers,
        }
    }

    /// An environment with no bindings and no computed keys
    pub fn empty() -> Self {
        Self::new(Arc::new(ProviderRegistry::new()))
    }

    /// Bind an externally supplied value, consuming the environment
    pub fn bind<T: Any + Send + Sync>(mut self, key: EnvKey, value: T) -> Self {
        self.externals.insert(key, Arc::new(value));
        self
    }

    /// Return a copy of this environment extended with one more binding
    pub fn with_external<T: Any + Send + Sync>(&self, key: EnvKey, value: T) -> Self {
        self.clone().bind(key, value)
    }

    /// Whether `key` could be resolved, without computing anything
    pub fn has(&self, key: EnvKey) -> bool {
        self.resolvable(key, &mut Vec::new())
    }

    fn resolvable(&self, key: EnvKey, visiting: &mut Vec<EnvKey>) -> bool {
        if self.externals.contains_key(&key) {
            return true;
        }
        if visiting.contains(&key) {
            return false;
        }
        match self.providers.get(key) {
            Some(provider) => {
                visiting.push(key);
                let ok = provider.requires().iter().all(|dep| self.resolvable(*dep, visiting));
                visiting.pop();
                ok
            }
            None => false,
        }
    }

    /// Whether every key in `keys` could be resolved
    pub fn has_all(&self, keys: &[EnvKey]) -> bool {
        keys.iter().all(|key| self.has(*key))
    }

    /// Look up the type-erased value of `key`, computing it if needed
    pub fn get_value(&self, key: EnvKey) -> DynoResult<EnvValue> {
        if let Some(value) = self.externals.get(&key) {
            return Ok(Arc::clone(value));
        }
        match self.providers.get(key) {
            Some(provider) => provider.compute(self),
            None => Err(DynoError::MissingExternalBinding { key: key.name() }),
        }
    }

    /// Look up the value of `key` as a `T`
    pub fn get<T: Any + Clone>(&self, key: EnvKey) -> DynoResult<T> {
        let value = self.get_value(key)?;
        value.downcast_ref::<T>().cloned().ok_or(DynoError::TypeMismatch {
            key: key.name(),
            expected: type_name::<T>(),
        })
    }

    /// Externally bound keys, sorted
    pub fn external_keys(&self) -> Vec<EnvKey> {
        let mut keys: Vec<_> = self.externals.keys().copied().collect();
        keys.sort();
        keys
    }

    pub fn providers(&self) -> &Arc<ProviderRegistry> {
        &self.providers
    }
}

impl Default for Environment {
    fn default() -> Self {
        Self::empty()
    }
}

impl fmt::Debug for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Environment")
            .field("externals", &self.external_keys())
            .field("providers", &self.providers)
            .finish()
    }
}
