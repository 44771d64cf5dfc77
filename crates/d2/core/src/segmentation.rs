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

//! Segmentation graph construction
//!
//! A code segment is a stretch of sequential execution within a thread.
//! Starting a thread ends the current segment of the parent and begins two
//! new ones (the child and the parent continuation); joining ends both the
//! parent continuation and the child and begins a new parent segment.
//! Edges point from a segment to the segments that may only run after it.

use std::collections::BTreeSet;
use std::sync::Arc;

use dyno_core::{Descriptor, DynoError, DynoResult, Environment, Handler, Overload, OverloadId};
use parking_lot::Mutex;
use petgraph::graphmap::DiGraphMap;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::events::patterns;
use crate::ids::SegmentId;
use crate::keys;
use crate::thread_state::ThreadStateStore;

/// Happens-before graph over code segments
#[derive(Debug, Clone, Default)]
pub struct SegmentationGraph {
    graph: DiGraphMap<SegmentId, ()>,
    detached: BTreeSet<SegmentId>,
}

impl SegmentationGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_vertex(&mut self, segment: SegmentId) -> bool {
        if self.graph.contains_node(segment) {
            return false;
        }
        self.graph.add_node(segment);
        true
    }

    /// Add the edge `before -> after`, returning false for duplicates and self-loops
    pub fn add_edge(&mut self, before: SegmentId, after: SegmentId) -> bool {
        if before == after || self.graph.contains_edge(before, after) {
            return false;
        }
        self.graph.add_edge(before, after, ());
        true
    }

    /// Record that nothing will ever join `segment`
    pub fn mark_detached(&mut self, segment: SegmentId) -> bool {
        self.add_vertex(segment);
        self.detached.insert(segment)
    }

    pub fn is_detached(&self, segment: SegmentId) -> bool {
        self.detached.contains(&segment)
    }

    pub fn contains_vertex(&self, segment: SegmentId) -> bool {
        self.graph.contains_node(segment)
    }

    pub fn contains_edge(&self, before: SegmentId, after: SegmentId) -> bool {
        self.graph.contains_edge(before, after)
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn vertices(&self) -> Vec<SegmentId> {
        let mut vertices: Vec<_> = self.graph.nodes().collect();
        vertices.sort();
        vertices
    }

    pub fn edges(&self) -> Vec<(SegmentId, SegmentId)> {
        let mut edges: Vec<_> = self.graph.all_edges().map(|(before, after, _)| (before, after)).collect();
        edges.sort();
        edges
    }

    pub fn snapshot(&self) -> SegmentationGraphSnapshot {
        SegmentationGraphSnapshot {
            vertices: self.vertices(),
            edges: self.edges(),
            detached: self.detached.iter().copied().collect(),
        }
    }
}

/// Read-only copy of a segmentation graph for downstream consumers
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SegmentationGraphSnapshot {
    pub vertices: Vec<SegmentId>,
    pub edges: Vec<(SegmentId, SegmentId)>,
    pub detached: Vec<SegmentId>,
}

const START: OverloadId = OverloadId(0);
const JOIN: OverloadId = OverloadId(1);
const DETACH: OverloadId = OverloadId(2);

/// Handler building the segmentation graph from thread start, join and detach events
pub struct SegmentationGraphBuilder {
    graph: Mutex<SegmentationGraph>,
    store: Arc<ThreadStateStore>,
    overloads: Vec<Overload>,
}

impl SegmentationGraphBuilder {
    pub fn new(store: Arc<ThreadStateStore>) -> Self {
        Self {
            graph: Mutex::new(SegmentationGraph::new()),
            store,
            overloads: vec![
                Overload::new(patterns::thread_start(), []),
                Overload::new(patterns::thread_join(), []),
                Overload::new(patterns::thread_detach(), []),
            ],
        }
    }

    pub fn snapshot(&self) -> SegmentationGraphSnapshot {
        self.graph.lock().snapshot()
    }

    pub fn with_graph<R>(&self, f: impl FnOnce(&SegmentationGraph) -> R) -> R {
        f(&self.graph.lock())
    }

    fn start(&self, env: &Environment) -> DynoResult<()> {
        let parent: SegmentId = env.get(keys::PARENT_SEGMENT)?;
        let child: SegmentId = env.get(keys::CHILD_SEGMENT)?;
        let new_parent: SegmentId = env.get(keys::NEW_PARENT_SEGMENT)?;

        {
            let mut graph = self.graph.lock();
            graph.add_vertex(parent);
            graph.add_vertex(new_parent);
            graph.add_vertex(child);
            graph.add_edge(parent, new_parent);
            graph.add_edge(parent, child);
        }
        debug!(parent = %parent, child = %child, new_parent = %new_parent, "segment fork recorded");

        self.store.set_current_segment(new_parent);
        Ok(())
    }

    fn join(&self, env: &Environment) -> DynoResult<()> {
        let parent: SegmentId = env.get(keys::PARENT_SEGMENT)?;
        let child: SegmentId = env.get(keys::CHILD_SEGMENT)?;
        let new_parent: SegmentId = env.get(keys::NEW_PARENT_SEGMENT)?;

        {
            let mut graph = self.graph.lock();
            graph.add_vertex(new_parent);
            graph.add_edge(parent, new_parent);
            graph.add_edge(child, new_parent);
        }
        debug!(parent = %parent, child = %child, new_parent = %new_parent, "segment join recorded");
        Ok(())
    }

    fn detach(&self, env: &Environment) -> DynoResult<()> {
        let child: SegmentId = env.get(keys::CHILD_SEGMENT)?;
        if self.graph.lock().mark_detached(child) {
            debug!(child = %child, "segment detached");
        }
        Ok(())
    }
}

impl Handler for SegmentationGraphBuilder {
    fn name(&self) -> &'static str {
        "segmentation_graph_builder"
    }

    fn overloads(&self) -> &[Overload] {
        &self.overloads
    }

    fn call(&self, overload: OverloadId, event: &Descriptor, env: &Environment) -> DynoResult<()> {
        match overload {
            START => self.start(env),
            JOIN => self.join(env),
            DETACH => self.detach(env),
            _ => Err(DynoError::MalformedDescriptor {
                handler: self.name(),
                descriptor: event.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{self, ParallelismLevel};

    fn call(builder: &SegmentationGraphBuilder, event: &Descriptor, env: &Environment) -> DynoResult<()> {
        let overload = builder.resolve(event, env).unwrap();
        builder.call(overload, event, env)
    }

    fn env(parent: u64, child: u64, new_parent: u64) -> Environment {
        Environment::empty()
            .bind(keys::PARENT_SEGMENT, SegmentId(parent))
            .bind(keys::CHILD_SEGMENT, SegmentId(child))
            .bind(keys::NEW_PARENT_SEGMENT, SegmentId(new_parent))
    }

    #[test]
    fn test_start_forks_and_advances_current_segment() {
        let store = Arc::new(ThreadStateStore::new());
        let builder = SegmentationGraphBuilder::new(Arc::clone(&store));

        call(&builder, &events::start(ParallelismLevel::Thread), &env(0, 1, 2)).unwrap();

        let snapshot = builder.snapshot();
        assert_eq!(snapshot.vertices, vec![SegmentId(0), SegmentId(1), SegmentId(2)]);
        assert_eq!(snapshot.edges, vec![(SegmentId(0), SegmentId(1)), (SegmentId(0), SegmentId(2))]);
        assert_eq!(store.current_segment(), Some(SegmentId(2)));
    }

    #[test]
    fn test_join_and_detach() {
        let builder = SegmentationGraphBuilder::new(Arc::new(ThreadStateStore::new()));

        call(&builder, &events::join(ParallelismLevel::Thread), &env(2, 1, 3)).unwrap();
        call(&builder, &events::detach(ParallelismLevel::Thread), &env(3, 4, 5)).unwrap();

        builder.with_graph(|graph| {
            assert!(graph.contains_edge(SegmentId(2), SegmentId(3)));
            assert!(graph.contains_edge(SegmentId(1), SegmentId(3)));
            assert!(graph.is_detached(SegmentId(4)));
            assert!(!graph.contains_vertex(SegmentId(5)));
            assert_eq!(graph.edge_count(), 2);
        });
    }

    #[test]
    fn test_non_thread_levels_are_ignored() {
        let builder = SegmentationGraphBuilder::new(Arc::new(ThreadStateStore::new()));
        assert_eq!(builder.resolve(&events::start(ParallelismLevel::Task), &env(0, 1, 2)), None);
    }

    #[test]
    fn test_missing_segment_binding() {
        let builder = SegmentationGraphBuilder::new(Arc::new(ThreadStateStore::new()));
        let env = Environment::empty().bind(keys::PARENT_SEGMENT, SegmentId(0));
        assert_eq!(
            call(&builder, &events::start(ParallelismLevel::Thread), &env),
            Err(DynoError::MissingExternalBinding { key: "child_segment" })
        );
        assert_eq!(builder.snapshot(), SegmentationGraphSnapshot::default());
    }
}
