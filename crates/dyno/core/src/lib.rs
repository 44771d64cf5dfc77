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

//! Domain-scoped event generation and dispatch
//!
//! Instrumented code describes what happened with a [`Descriptor`] and the
//! context of the occurrence with an [`Environment`], then calls
//! [`Dispatcher::generate`]. The dispatcher finds the event's domain in the
//! [`DomainRegistry`] and invokes, in registration order, every [`Handler`]
//! with an overload whose [`Pattern`] matches the event and whose required
//! environment keys are resolvable.

pub mod config;
pub mod descriptor;
pub mod dispatcher;
pub mod domain;
pub mod environment;
pub mod error;
pub mod handler;
pub mod pattern;

pub use config::DispatchConfig;
pub use descriptor::{Descriptor, Tag};
pub use dispatcher::Dispatcher;
pub use domain::{DomainId, DomainRegistry, DomainRegistryBuilder, ROOT_DOMAIN};
pub use environment::{EnvKey, EnvValue, Environment, FnProvider, Provider, ProviderRegistry, keys};
pub use error::{DynoError, DynoResult};
pub use handler::{Handler, HandlerRef, Overload, OverloadId};
pub use pattern::{Pattern, matches};
