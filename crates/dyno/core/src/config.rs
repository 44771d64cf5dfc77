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

//! Dispatch configuration

/// Runtime knobs of the dispatcher
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatchConfig {
    /// Panic when a handler reports a descriptor it cannot destructure
    pub panic_on_malformed: bool,
    /// Emit a trace event for every generated event and handler call
    pub trace_events: bool,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            panic_on_malformed: cfg!(debug_assertions),
            trace_events: false,
        }
    }
}

impl DispatchConfig {
    pub const PANIC_ON_MALFORMED_VAR: &'static str = "DYNO_PANIC_ON_MALFORMED";
    pub const TRACE_EVENTS_VAR: &'static str = "DYNO_TRACE_EVENTS";

    /// Read overrides from the process environment
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Read overrides through `lookup`, keeping defaults for unset or invalid values
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(value) = lookup(Self::PANIC_ON_MALFORMED_VAR) {
            match parse_flag(&value) {
                Some(flag) => config.panic_on_malformed = flag,
                None => tracing::warn!("Invalid {} '{}', using default", Self::PANIC_ON_MALFORMED_VAR, value),
            }
        }

        if let Some(value) = lookup(Self::TRACE_EVENTS_VAR) {
            match parse_flag(&value) {
                Some(flag) => config.trace_events = flag,
                None => tracing::warn!("Invalid {} '{}', using default", Self::TRACE_EVENTS_VAR, value),
            }
        }

        config
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn test_defaults_without_overrides() {
        assert_eq!(DispatchConfig::from_lookup(lookup(&[])), DispatchConfig::default());
    }

    #[test]
    fn test_overrides() {
        let config = DispatchConfig::from_lookup(lookup(&[("DYNO_PANIC_ON_MALFORMED", "false"), ("DYNO_TRACE_EVENTS", "1")]));
        assert!(!config.panic_on_malformed);
        assert!(config.trace_events);
    }

    #[test]
    fn test_invalid_values_keep_defaults() {
        let config = DispatchConfig::from_lookup(lookup(&[("DYNO_TRACE_EVENTS", "sometimes")]));
        assert_eq!(config, DispatchConfig::default());
    }
}
