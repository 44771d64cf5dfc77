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

//! The composed goodlock analysis
//!
//! Wires the thread state store, both graph builders and the dispatcher
//! into one object. Instrumentation adapters either call [`GoodlockAnalysis::generate`]
//! with their own descriptors or use the helpers building the standard events.

use std::fmt;
use std::sync::Arc;

use dyno_core::{
    Descriptor, DispatchConfig, Dispatcher, DomainId, DomainRegistry, DynoResult, Environment, HandlerRef, ProviderRegistry, ROOT_DOMAIN,
};
use tracing::info;

use crate::events::{self, MutexTransition, ParallelismLevel, Recursiveness};
use crate::ids::{LockId, SegmentId};
use crate::keys;
use crate::lock_graph::{LockGraphBuilder, LockGraphSnapshot};
use crate::segmentation::{SegmentationGraphBuilder, SegmentationGraphSnapshot};
use crate::thread_state::{ThreadState, ThreadStateStore};

/// Every synchronization event
pub const SYNCHRONIZATION_DOMAIN: DomainId = DomainId("synchronization");
/// Ownership transitions of mutexes
pub const MUTEX_DOMAIN: DomainId = DomainId("mutex_operation");
/// Thread start, join and detach
pub const CODE_SEGMENT_DOMAIN: DomainId = DomainId("code_segment");

/// Lock graph and segmentation graph construction over one dispatcher
pub struct GoodlockAnalysis {
    dispatcher: Dispatcher,
    providers: Arc<ProviderRegistry>,
    store: Arc<ThreadStateStore>,
    lock_graph: Arc<LockGraphBuilder>,
    segmentation: Arc<SegmentationGraphBuilder>,
}

impl GoodlockAnalysis {
    /// Compose an analysis configured from the process environment
    pub fn new() -> DynoResult<Self> {
        Self::with_config(DispatchConfig::from_env())
    }

    pub fn with_config(config: DispatchConfig) -> DynoResult<Self> {
        let store = Arc::new(ThreadStateStore::new());
        let mut providers = ProviderRegistry::new();
        store.register_providers(&mut providers);

        let lock_graph = Arc::new(LockGraphBuilder::new(Arc::clone(&store)));
        let segmentation = Arc::new(SegmentationGraphBuilder::new(Arc::clone(&store)));
        let handlers: [HandlerRef; 2] = [lock_graph.clone(), segmentation.clone()];

        let registry = DomainRegistry::builder()
            .domain(SYNCHRONIZATION_DOMAIN, ROOT_DOMAIN, handlers)
            .domain(MUTEX_DOMAIN, SYNCHRONIZATION_DOMAIN, [])
            .domain(CODE_SEGMENT_DOMAIN, SYNCHRONIZATION_DOMAIN, [])
            .bind(events::MUTEX_OPERATION, MUTEX_DOMAIN)
            .bind(events::START, CODE_SEGMENT_DOMAIN)
            .bind(events::JOIN, CODE_SEGMENT_DOMAIN)
            .bind(events::DETACH, CODE_SEGMENT_DOMAIN)
            .build()?;

        info!(?config, "goodlock analysis composed");
        Ok(Self {
            dispatcher: Dispatcher::with_config(Arc::new(registry), config),
            providers: Arc::new(providers),
            store,
            lock_graph,
            segmentation,
        })
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// A fresh environment able to compute the per-thread keys
    pub fn environment(&self) -> Environment {
        Environment::new(Arc::clone(&self.providers))
    }

    pub fn generate(&self, event: &Descriptor, env: &Environment) -> DynoResult<()> {
        self.dispatcher.generate(event, env)
    }

    /// Report an ownership transition of `lock` on the calling thread
    pub fn transition(&self, lock: LockId, transition: MutexTransition, recursiveness: Recursiveness) -> DynoResult<()> {
        let env = self.environment().bind(keys::LOCK, lock);
        self.generate(&transition.descriptor(recursiveness), &env)
    }

    pub fn acquire(&self, lock: LockId, recursiveness: Recursiveness) -> DynoResult<()> {
        self.transition(lock, MutexTransition::Lock, recursiveness)
    }

    pub fn release(&self, lock: LockId, recursiveness: Recursiveness) -> DynoResult<()> {
        self.transition(lock, MutexTransition::Unlock, recursiveness)
    }

    fn segment_event(&self, event: Descriptor, parent: SegmentId, child: SegmentId, new_parent: Option<SegmentId>) -> DynoResult<()> {
        let mut env = self
            .environment()
            .bind(keys::PARENT_SEGMENT, parent)
            .bind(keys::CHILD_SEGMENT, child);
        if let Some(new_parent) = new_parent {
            env = env.bind(keys::NEW_PARENT_SEGMENT, new_parent);
        }
        self.generate(&event, &env)
    }

    /// Report that the calling thread, running `parent`, started a thread running `child`
    /// and continues in `new_parent`
    pub fn start(&self, parent: SegmentId, child: SegmentId, new_parent: SegmentId) -> DynoResult<()> {
        self.segment_event(events::start(ParallelismLevel::Thread), parent, child, Some(new_parent))
    }

    /// Report that the calling thread, running `parent`, joined the thread whose last
    /// segment is `child` and continues in `new_parent`
    pub fn join(&self, parent: SegmentId, child: SegmentId, new_parent: SegmentId) -> DynoResult<()> {
        self.segment_event(events::join(ParallelismLevel::Thread), parent, child, Some(new_parent))
    }

    pub fn detach(&self, parent: SegmentId, child: SegmentId) -> DynoResult<()> {
        self.segment_event(events::detach(ParallelismLevel::Thread), parent, child, None)
    }

    /// The calling thread's current segment, as last advanced by [`start`](Self::start)
    pub fn current_segment(&self) -> Option<SegmentId> {
        self.store.current_segment()
    }

    /// The calling thread's analysis state
    pub fn thread_state(&self) -> ThreadState {
        self.store.snapshot()
    }

    pub fn lock_graph(&self) -> LockGraphSnapshot {
        self.lock_graph.snapshot()
    }

    pub fn segmentation_graph(&self) -> SegmentationGraphSnapshot {
        self.segmentation.snapshot()
    }
}

impl fmt::Debug for GoodlockAnalysis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GoodlockAnalysis")
            .field("dispatcher", &self.dispatcher)
            .field("providers", &self.providers)
            .field("store", &self.store)
            .finish_non_exhaustive()
    }
}
