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

//! Error types for event generation and dispatch

/// Errors raised while composing domains or dispatching events
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DynoError {
    #[error("Missing external binding for environment key `{key}`")]
    MissingExternalBinding { key: &'static str },

    #[error("Environment key `{key}` is not bound to a value of type {expected}")]
    TypeMismatch { key: &'static str, expected: &'static str },

    #[error("Unregistered domain: {0}")]
    UnregisteredDomain(String),

    #[error("Domain `{0}` is registered twice")]
    DuplicateDomain(&'static str),

    #[error("Handler `{handler}` cannot destructure event {descriptor}")]
    MalformedDescriptor { handler: &'static str, descriptor: String },
}

/// Result type for dispatch operations
pub type DynoResult<T> = std::result::Result<T, DynoError>;
