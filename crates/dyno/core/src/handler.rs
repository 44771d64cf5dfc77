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

//! Handlers reacting to generated events

use std::fmt;
use std::sync::Arc;

use crate::descriptor::Descriptor;
use crate::environment::{EnvKey, Environment};
use crate::error::DynoResult;
use crate::pattern::Pattern;

/// Index of an overload within a handler's overload table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OverloadId(pub usize);

/// One entry point of a handler: the events it accepts and the environment
/// keys it needs to run
#[derive(Debug, Clone)]
pub struct Overload {
    pub pattern: Pattern,
    pub requires: Vec<EnvKey>,
}

impl Overload {
    pub fn new(pattern: Pattern, requires: impl IntoIterator<Item = EnvKey>) -> Self {
        Self {
            pattern,
            requires: requires.into_iter().collect(),
        }
    }

    /// Whether this overload accepts `event` given what `env` can resolve
    pub fn accepts(&self, event: &Descriptor, env: &Environment) -> bool {
        self.pattern.matches(event) && env.has_all(&self.requires)
    }
}

/// A stateful listener exposing an ordered table of overloads.
///
/// For each dispatched event, the first overload accepting it is called
/// and the remaining overloads of the same handler are skipped.
pub trait Handler: Send + Sync {
    /// Name used in diagnostics
    fn name(&self) -> &'static str;

    /// Overloads in resolution order
    fn overloads(&self) -> &[Overload];

    /// Run the overload selected by the dispatcher
    fn call(&self, overload: OverloadId, event: &Descriptor, env: &Environment) -> DynoResult<()>;

    /// The first overload accepting `event`, if any
    fn resolve(&self, event: &Descriptor, env: &Environment) -> Option<OverloadId> {
        self.overloads().iter().position(|overload| overload.accepts(event, env)).map(OverloadId)
    }
}

/// Shared reference to a handler singleton
pub type HandlerRef = Arc<dyn Handler>;

impl fmt::Debug for dyn Handler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handler").field("name", &self.name()).field("overloads", &self.overloads().len()).finish()
    }
}
