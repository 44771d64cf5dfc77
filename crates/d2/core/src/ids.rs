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

//! Lock and code segment identities

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

/// Identity of a synchronization object
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct LockId(pub u64);

static NEXT_LOCK_ID: AtomicU64 = AtomicU64::new(1);

impl LockId {
    /// Assign a fresh, process-unique lock id
    pub fn next() -> Self {
        LockId(NEXT_LOCK_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Derive a lock id from the address of a synchronization object.
    ///
    /// Only stable while the object is neither moved nor dropped.
    pub fn of<T: ?Sized>(object: &T) -> Self {
        LockId(object as *const T as *const () as usize as u64)
    }
}

impl fmt::Display for LockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "lock#{}", self.0)
    }
}

/// Identity of a code segment, a unit of sequential execution within a thread
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SegmentId(pub u64);

static NEXT_SEGMENT_ID: AtomicU64 = AtomicU64::new(1);

impl SegmentId {
    /// Assign a fresh, process-unique segment id
    pub fn next() -> Self {
        SegmentId(NEXT_SEGMENT_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for SegmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "segment#{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_next_ids_are_unique() {
        let a = LockId::next();
        let b = LockId::next();
        assert_ne!(a, b);
        assert_ne!(SegmentId::next(), SegmentId::next());
    }

    #[test]
    fn test_address_derived_ids() {
        let first = std::sync::Mutex::new(0u32);
        let second = std::sync::Mutex::new(0u32);
        assert_eq!(LockId::of(&first), LockId::of(&first));
        assert_ne!(LockId::of(&first), LockId::of(&second));
    }

    #[test]
    fn test_display() {
        assert_eq!(LockId(3).to_string(), "lock#3");
        assert_eq!(SegmentId(7).to_string(), "segment#7");
    }
}
