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

//! Descriptor vocabulary for mutex operations and code segment events
//!
//! Mutex operations are described by the ownership held before and after
//! the operation and by the characteristics of the synchronization object:
//!
//! ```text
//! mutex_operation(
//!     previous_ownership(none),
//!     new_ownership(exclusive),
//!     synchronization_object(mutex(recursiveness(non_recursive))),
//! )
//! ```
//!
//! Code segment events are `start`, `join` and `detach`, each tagged with
//! a parallelism level: `start(parallelism_level(thread))`.

use dyno_core::{Descriptor, Pattern};

pub const MUTEX_OPERATION: &str = "mutex_operation";
pub const PREVIOUS_OWNERSHIP: &str = "previous_ownership";
pub const NEW_OWNERSHIP: &str = "new_ownership";
pub const SYNCHRONIZATION_OBJECT: &str = "synchronization_object";
pub const MUTEX: &str = "mutex";
pub const RECURSIVENESS: &str = "recursiveness";

pub const START: &str = "start";
pub const JOIN: &str = "join";
pub const DETACH: &str = "detach";
pub const PARALLELISM_LEVEL: &str = "parallelism_level";

/// How many threads can own a mutex at a time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Ownership {
    None,
    Shared,
    Exclusive,
    /// Like shared, but held by at most one thread and never alongside exclusive ownership
    Upgradable,
}

impl Ownership {
    pub fn tag(self) -> &'static str {
        match self {
            Ownership::None => "none",
            Ownership::Shared => "shared",
            Ownership::Exclusive => "exclusive",
            Ownership::Upgradable => "upgradable",
        }
    }
}

/// Whether a mutex can be re-acquired by the thread owning it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Recursiveness {
    NonRecursive,
    Recursive,
}

impl Recursiveness {
    pub fn tag(self) -> &'static str {
        match self {
            Recursiveness::NonRecursive => "non_recursive",
            Recursiveness::Recursive => "recursive",
        }
    }
}

/// Named ownership transitions of the standard lockable concepts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MutexTransition {
    Lock,
    Unlock,
    LockShared,
    UnlockShared,
    LockUpgrade,
    UnlockUpgrade,
    UnlockSharedAndLock,
    UnlockAndLockShared,
    UnlockSharedAndLockUpgrade,
    UnlockAndLockUpgrade,
    UnlockUpgradeAndLock,
    UnlockUpgradeAndLockShared,
}

impl MutexTransition {
    /// Ownership before and after the transition
    pub fn ownership(self) -> (Ownership, Ownership) {
        use Ownership::*;
        match self {
            MutexTransition::Lock => (None, Exclusive),
            MutexTransition::Unlock => (Exclusive, None),
            MutexTransition::LockShared => (None, Shared),
            MutexTransition::UnlockShared => (Shared, None),
            MutexTransition::LockUpgrade => (None, Upgradable),
            MutexTransition::UnlockUpgrade => (Upgradable, None),
            MutexTransition::UnlockSharedAndLock => (Shared, Exclusive),
            MutexTransition::UnlockAndLockShared => (Exclusive, Shared),
            MutexTransition::UnlockSharedAndLockUpgrade => (Shared, Upgradable),
            MutexTransition::UnlockAndLockUpgrade => (Exclusive, Upgradable),
            MutexTransition::UnlockUpgradeAndLock => (Upgradable, Exclusive),
            MutexTransition::UnlockUpgradeAndLockShared => (Upgradable, Shared),
        }
    }

    pub fn descriptor(self, recursiveness: Recursiveness) -> Descriptor {
        let (previous, new) = self.ownership();
        mutex_operation(previous, new, recursiveness)
    }
}

/// Granularity of a code segment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParallelismLevel {
    Task,
    Thread,
    Process,
}

impl ParallelismLevel {
    pub fn tag(self) -> &'static str {
        match self {
            ParallelismLevel::Task => "task",
            ParallelismLevel::Thread => "thread",
            ParallelismLevel::Process => "process",
        }
    }
}

/// `mutex(recursiveness(..))`
pub fn mutex(recursiveness: Recursiveness) -> Descriptor {
    Descriptor::node(MUTEX, [Descriptor::node(RECURSIVENESS, [Descriptor::leaf(recursiveness.tag())])])
}

pub fn mutex_operation(previous: Ownership, new: Ownership, recursiveness: Recursiveness) -> Descriptor {
    Descriptor::node(
        MUTEX_OPERATION,
        [
            Descriptor::node(PREVIOUS_OWNERSHIP, [Descriptor::leaf(previous.tag())]),
            Descriptor::node(NEW_OWNERSHIP, [Descriptor::leaf(new.tag())]),
            Descriptor::node(SYNCHRONIZATION_OBJECT, [mutex(recursiveness)]),
        ],
    )
}

/// Exclusive acquisition of a mutex
pub fn acquire(recursiveness: Recursiveness) -> Descriptor {
    MutexTransition::Lock.descriptor(recursiveness)
}

/// Release of an exclusively held mutex
pub fn release(recursiveness: Recursiveness) -> Descriptor {
    MutexTransition::Unlock.descriptor(recursiveness)
}

fn segment_event(kind: &'static str, level: ParallelismLevel) -> Descriptor {
    Descriptor::node(kind, [Descriptor::node(PARALLELISM_LEVEL, [Descriptor::leaf(level.tag())])])
}

/// Fork: the current segment completes before both new segments begin
pub fn start(level: ParallelismLevel) -> Descriptor {
    segment_event(START, level)
}

/// The current segment waits for another segment to complete
pub fn join(level: ParallelismLevel) -> Descriptor {
    segment_event(JOIN, level)
}

/// A segment keeps running but nothing waits for its completion
pub fn detach(level: ParallelismLevel) -> Descriptor {
    segment_event(DETACH, level)
}

/// Patterns selecting the events above
pub mod patterns {
    use super::*;

    fn mutex_operation(previous: Pattern, new: Pattern, synchronization_object: Pattern) -> Pattern {
        Pattern::node(
            MUTEX_OPERATION,
            [
                Pattern::node(PREVIOUS_OWNERSHIP, [previous]),
                Pattern::node(NEW_OWNERSHIP, [new]),
                Pattern::node(SYNCHRONIZATION_OBJECT, [synchronization_object]),
            ],
        )
    }

    fn exclusive() -> Pattern {
        Pattern::leaf(Ownership::Exclusive.tag())
    }

    fn recursive_mutex() -> Pattern {
        Pattern::node(MUTEX, [Pattern::node(RECURSIVENESS, [Pattern::leaf(Recursiveness::Recursive.tag())])])
    }

    /// Any transition into exclusive ownership, from none, shared or upgradable
    pub fn exclusive_acquire() -> Pattern {
        mutex_operation(Pattern::not(exclusive()), exclusive(), Pattern::any())
    }

    /// Any transition out of exclusive ownership, including downgrades
    pub fn exclusive_release() -> Pattern {
        mutex_operation(exclusive(), Pattern::not(exclusive()), Pattern::any())
    }

    pub fn recursive_exclusive_acquire() -> Pattern {
        mutex_operation(Pattern::not(exclusive()), exclusive(), recursive_mutex())
    }

    pub fn recursive_exclusive_release() -> Pattern {
        mutex_operation(exclusive(), Pattern::not(exclusive()), recursive_mutex())
    }

    /// Any mutex operation
    pub fn any_mutex_operation() -> Pattern {
        Pattern::node(MUTEX_OPERATION, [Pattern::any(), Pattern::any(), Pattern::any()])
    }

    fn thread_level(kind: &'static str) -> Pattern {
        Pattern::node(kind, [Pattern::node(PARALLELISM_LEVEL, [Pattern::leaf(ParallelismLevel::Thread.tag())])])
    }

    pub fn thread_start() -> Pattern {
        thread_level(START)
    }

    pub fn thread_join() -> Pattern {
        thread_level(JOIN)
    }

    pub fn thread_detach() -> Pattern {
        thread_level(DETACH)
    }
}
