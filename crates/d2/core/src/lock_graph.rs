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

//! Lock graph construction
//!
//! The lock graph records which locks were held when another lock was
//! acquired: an edge `a -> b` means some thread acquired `b` while holding
//! `a`. The graph is simple (no parallel edges, no self-loops) and is the
//! input of the offline deadlock cycle analysis.

use std::sync::Arc;

use dyno_core::{Descriptor, DynoError, DynoResult, Environment, Handler, Overload, OverloadId};
use parking_lot::Mutex;
use petgraph::graphmap::DiGraphMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::events::patterns;
use crate::ids::LockId;
use crate::keys;
use crate::thread_state::ThreadStateStore;

/// Directed "held-before" graph over lock ids
#[derive(Debug, Clone, Default)]
pub struct LockGraph {
    graph: DiGraphMap<LockId, ()>,
}

impl LockGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a vertex, returning false if it was already present
    pub fn add_vertex(&mut self, lock: LockId) -> bool {
        if self.graph.contains_node(lock) {
            return false;
        }
        self.graph.add_node(lock);
        true
    }

    /// Add the edge `from -> to`, returning false for duplicates and self-loops
    pub fn add_edge(&mut self, from: LockId, to: LockId) -> bool {
        if from == to || self.graph.contains_edge(from, to) {
            return false;
        }
        self.graph.add_edge(from, to, ());
        true
    }

    pub fn contains_vertex(&self, lock: LockId) -> bool {
        self.graph.contains_node(lock)
    }

    pub fn contains_edge(&self, from: LockId, to: LockId) -> bool {
        self.graph.contains_edge(from, to)
    }

    pub fn vertex_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Vertices in ascending order
    pub fn vertices(&self) -> Vec<LockId> {
        let mut vertices: Vec<_> = self.graph.nodes().collect();
        vertices.sort();
        vertices
    }

    /// Edges in ascending order
    pub fn edges(&self) -> Vec<(LockId, LockId)> {
        let mut edges: Vec<_> = self.graph.all_edges().map(|(from, to, _)| (from, to)).collect();
        edges.sort();
        edges
    }

    /// Locks acquired while `lock` was held
    pub fn successors(&self, lock: LockId) -> Vec<LockId> {
        let mut successors: Vec<_> = self.graph.neighbors(lock).collect();
        successors.sort();
        successors
    }

    pub fn snapshot(&self) -> LockGraphSnapshot {
        LockGraphSnapshot {
            vertices: self.vertices(),
            edges: self.edges(),
        }
    }
}

/// Read-only copy of a lock graph for downstream consumers
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockGraphSnapshot {
    pub vertices: Vec<LockId>,
    pub edges: Vec<(LockId, LockId)>,
}

const RECURSIVE_ACQUIRE: OverloadId = OverloadId(0);
const RECURSIVE_RELEASE: OverloadId = OverloadId(1);
const ACQUIRE: OverloadId = OverloadId(2);
const RELEASE: OverloadId = OverloadId(3);

/// Handler building the lock graph from exclusive acquire and release events.
///
/// Recursive mutexes are matched first so that only the outermost acquire
/// and the final release of a reentrant lock reach the graph. The lock id
/// is read from the event environment; the gatelock set and the recursive
/// lock count are computed from the thread state store.
pub struct LockGraphBuilder {
    graph: Mutex<LockGraph>,
    store: Arc<ThreadStateStore>,
    overloads: Vec<Overload>,
}

impl LockGraphBuilder {
    pub fn new(store: Arc<ThreadStateStore>) -> Self {
        Self {
            graph: Mutex::new(LockGraph::new()),
            store,
            overloads: vec![
                Overload::new(patterns::recursive_exclusive_acquire(), [keys::GATELOCKS]),
                Overload::new(patterns::recursive_exclusive_release(), []),
                Overload::new(patterns::exclusive_acquire(), [keys::GATELOCKS]),
                Overload::new(patterns::exclusive_release(), []),
            ],
        }
    }

    pub fn snapshot(&self) -> LockGraphSnapshot {
        self.graph.lock().snapshot()
    }

    /// Run `f` against the graph while holding its lock
    pub fn with_graph<R>(&self, f: impl FnOnce(&LockGraph) -> R) -> R {
        f(&self.graph.lock())
    }

    fn acquire(&self, env: &Environment) -> DynoResult<()> {
        let lock: LockId = env.get(keys::LOCK)?;
        let gatelocks: Vec<LockId> = env.get(keys::GATELOCKS)?;
        self.commit_acquire(lock, &gatelocks);
        Ok(())
    }

    fn recursive_acquire(&self, env: &Environment) -> DynoResult<()> {
        let lock: LockId = env.get(keys::LOCK)?;
        let depth: usize = env.get(keys::RECURSIVE_LOCK_COUNT)?;
        let gatelocks: Vec<LockId> = env.get(keys::GATELOCKS)?;

        if depth == 0 {
            self.commit_acquire(lock, &gatelocks);
        }
        self.store.increment_recursive(lock);
        Ok(())
    }

    fn release(&self, env: &Environment) -> DynoResult<()> {
        let lock: LockId = env.get(keys::LOCK)?;
        if self.store.remove_gatelock(lock) {
            debug!(lock = %lock, "gatelock removed");
        } else {
            warn!(lock = %lock, thread = ?std::thread::current().id(), "release of a lock that is not held");
        }
        Ok(())
    }

    fn recursive_release(&self, env: &Environment) -> DynoResult<()> {
        let lock: LockId = env.get(keys::LOCK)?;
        let depth: usize = env.get(keys::RECURSIVE_LOCK_COUNT)?;
        if depth == 0 {
            // counter underflow is tolerated and logged by the store
            self.store.decrement_recursive(lock);
            return Ok(());
        }

        if self.store.decrement_recursive(lock) == Some(0) && self.store.remove_gatelock(lock) {
            debug!(lock = %lock, "gatelock removed");
        }
        Ok(())
    }

    fn commit_acquire(&self, lock: LockId, gatelocks: &[LockId]) {
        {
            let mut graph = self.graph.lock();
            if graph.add_vertex(lock) {
                debug!(lock = %lock, "lock graph vertex added");
            }
            for &held in gatelocks {
                if graph.add_edge(held, lock) {
                    debug!(from = %held, to = %lock, "lock graph edge added");
                }
            }
        }
        if self.store.insert_gatelock(lock) {
            debug!(lock = %lock, "gatelock inserted");
        }
    }
}

impl Handler for LockGraphBuilder {
    fn name(&self) -> &'static str {
        "lock_graph_builder"
    }

    fn overloads(&self) -> &[Overload] {
        &self.overloads
    }

    fn call(&self, overload: OverloadId, event: &Descriptor, env: &Environment) -> DynoResult<()> {
        match overload {
            RECURSIVE_ACQUIRE => self.recursive_acquire(env),
            RECURSIVE_RELEASE => self.recursive_release(env),
            ACQUIRE => self.acquire(env),
            RELEASE => self.release(env),
            _ => Err(DynoError::MalformedDescriptor {
                handler: self.name(),
                descriptor: event.to_string(),
            }),
        }
    }
}
