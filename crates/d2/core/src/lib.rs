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

//! Goodlock analysis over instrumented synchronization events
//!
//! Builds a lock graph (which locks were held when another was acquired)
//! and a segmentation graph (fork/join precedence between code segments)
//! from events generated through a [`dyno_core::Dispatcher`]. The graphs are
//! handed to an offline pass that looks for potential deadlocks.

pub mod analysis;
pub mod events;
pub mod ids;
pub mod keys;
pub mod lock_graph;
pub mod segmentation;
pub mod thread_state;

pub use analysis::{CODE_SEGMENT_DOMAIN, GoodlockAnalysis, MUTEX_DOMAIN, SYNCHRONIZATION_DOMAIN};
pub use events::{MutexTransition, Ownership, ParallelismLevel, Recursiveness};
pub use ids::{LockId, SegmentId};
pub use lock_graph::{LockGraph, LockGraphBuilder, LockGraphSnapshot};
pub use segmentation::{SegmentationGraph, SegmentationGraphBuilder, SegmentationGraphSnapshot};
pub use thread_state::{ThreadState, ThreadStateStore};
