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

//! Synchronous event generation
//!
//! `generate` resolves the domain of an event, walks the domain's effective
//! handlers in order and calls, for each handler, the first overload whose
//! pattern matches the event and whose required keys the environment can
//! resolve. Dispatch runs inline on the calling thread.

use std::sync::Arc;

use tracing::{error, trace};

use crate::config::DispatchConfig;
use crate::descriptor::Descriptor;
use crate::domain::{DomainId, DomainRegistry};
use crate::environment::Environment;
use crate::error::{DynoError, DynoResult};

/// Dispatches generated events to the handlers of their domain
#[derive(Debug, Clone)]
pub struct Dispatcher {
    registry: Arc<DomainRegistry>,
    config: DispatchConfig,
}

impl Dispatcher {
    pub fn new(registry: Arc<DomainRegistry>) -> Self {
        Self::with_config(registry, DispatchConfig::default())
    }

    pub fn with_config(registry: Arc<DomainRegistry>, config: DispatchConfig) -> Self {
        Self { registry, config }
    }

    pub fn registry(&self) -> &DomainRegistry {
        &self.registry
    }

    pub fn config(&self) -> DispatchConfig {
        self.config
    }

    /// Generate `event` in the domain bound to its root constructor.
    ///
    /// An event no handler accepts is a silent no-op. The first handler
    /// error aborts this dispatch and is returned to the caller.
    pub fn generate(&self, event: &Descriptor, env: &Environment) -> DynoResult<()> {
        let domain = match self.registry.domain_of(event) {
            Ok(domain) => domain,
            Err(err) => {
                self.report("<domain_of>", event, &err);
                return Err(err);
            }
        };
        self.generate_in(domain, event, env)
    }

    /// Generate `event` in an explicitly chosen domain
    pub fn generate_in(&self, domain: DomainId, event: &Descriptor, env: &Environment) -> DynoResult<()> {
        let handlers = match self.registry.effective_handlers(domain) {
            Ok(handlers) => handlers,
            Err(err) => {
                self.report("<effective_handlers>", event, &err);
                return Err(err);
            }
        };
        if self.config.trace_events {
            trace!(domain = domain.0, event = %event, handlers = handlers.len(), "generate");
        }

        for handler in handlers {
            let Some(overload) = handler.resolve(event, env) else {
                continue;
            };
            if self.config.trace_events {
                trace!(handler = handler.name(), overload = overload.0, "invoke handler");
            }
            if let Err(err) = handler.call(overload, event, env) {
                self.report(handler.name(), event, &err);
                return Err(err);
            }
        }

        Ok(())
    }

    fn report(&self, handler: &str, event: &Descriptor, err: &DynoError) {
        error!(
            handler = handler,
            event = %event,
            thread = ?std::thread::current().id(),
            error = %err,
            "event dispatch failed"
        );
        if self.config.panic_on_malformed && matches!(err, DynoError::MalformedDescriptor { .. }) {
            panic!("{err} (thread {:?})", std::thread::current().id());
        }
    }
}
