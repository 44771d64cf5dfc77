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

//! Environment keys used by the goodlock analysis
//!
//! Identity keys are bound by the instrumentation that generates an event.
//! Per-thread keys are computed from the thread state store.

use dyno_core::EnvKey;

/// The [`LockId`](crate::LockId) of the synchronization object (external)
pub const LOCK: EnvKey = EnvKey::new("lock");

/// Segment running before the fork or join point (external)
pub const PARENT_SEGMENT: EnvKey = EnvKey::new("parent_segment");

/// Segment of the started, joined or detached thread (external)
pub const CHILD_SEGMENT: EnvKey = EnvKey::new("child_segment");

/// Segment continuing the parent after the fork or join point (external)
pub const NEW_PARENT_SEGMENT: EnvKey = EnvKey::new("new_parent_segment");

/// Locks currently held by the calling thread, as a sorted `Vec<LockId>` (computed)
pub const GATELOCKS: EnvKey = EnvKey::new("gatelocks");

/// Reentrancy depth of [`LOCK`] on the calling thread, as a `usize` (computed)
pub const RECURSIVE_LOCK_COUNT: EnvKey = EnvKey::new("recursive_lock_count");

/// Current segment of the calling thread, as an `Option<SegmentId>` (computed)
pub const CURRENT_SEGMENT: EnvKey = EnvKey::new("current_segment");
