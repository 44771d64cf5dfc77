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

//! Domain registry
//!
//! Domains group event kinds and own an ordered list of handlers. Every
//! domain has exactly one super-domain and inherits its handlers; the root
//! domain is its own super-domain and has no handlers. The effective handler
//! list of a domain is its own handlers followed by the effective handlers
//! of its super-domain.

use std::collections::HashMap;
use std::fmt;

use crate::descriptor::{Descriptor, Tag};
use crate::error::{DynoError, DynoResult};
use crate::handler::HandlerRef;

/// Identity of a domain
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DomainId(pub &'static str);

impl fmt::Display for DomainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

/// The most general domain
pub const ROOT_DOMAIN: DomainId = DomainId("root");

struct DomainEntry {
    super_domain: DomainId,
    own: Vec<HandlerRef>,
    effective: Vec<HandlerRef>,
}

/// A fixed forest of domains and the constructor bindings used to find the
/// domain of a descriptor
pub struct DomainRegistry {
    domains: HashMap<DomainId, DomainEntry>,
    constructors: HashMap<Tag, DomainId>,
}

impl DomainRegistry {
    pub fn builder() -> DomainRegistryBuilder {
        DomainRegistryBuilder::new()
    }

    pub fn contains(&self, domain: DomainId) -> bool {
        self.domains.contains_key(&domain)
    }

    fn entry(&self, domain: DomainId) -> DynoResult<&DomainEntry> {
        self.domains.get(&domain).ok_or_else(|| DynoError::UnregisteredDomain(domain.to_string()))
    }

    pub fn super_domain(&self, domain: DomainId) -> DynoResult<DomainId> {
        Ok(self.entry(domain)?.super_domain)
    }

    /// Handlers registered directly on `domain`
    pub fn own_handlers(&self, domain: DomainId) -> DynoResult<&[HandlerRef]> {
        Ok(&self.entry(domain)?.own)
    }

    /// Own handlers followed by every inherited handler, in dispatch order
    pub fn effective_handlers(&self, domain: DomainId) -> DynoResult<&[HandlerRef]> {
        Ok(&self.entry(domain)?.effective)
    }

    /// Whether `domain` is `ancestor` or one of its sub-domains
    pub fn is_subdomain_of(&self, domain: DomainId, ancestor: DomainId) -> bool {
        let mut current = domain;
        loop {
            if current == ancestor {
                return true;
            }
            match self.domains.get(&current) {
                Some(entry) if entry.super_domain != current => current = entry.super_domain,
                _ => return false,
            }
        }
    }

    /// The domain bound to the root constructor of `descriptor`
    pub fn domain_of(&self, descriptor: &Descriptor) -> DynoResult<DomainId> {
        let constructor = descriptor.constructor();
        self.constructors
            .get(&constructor)
            .copied()
            .ok_or_else(|| DynoError::UnregisteredDomain(format!("no domain bound to constructor `{constructor}`")))
    }
}

impl fmt::Debug for DomainRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut domains: Vec<_> = self
            .domains
            .iter()
            .map(|(id, entry)| (id.0, entry.super_domain.0, entry.effective.iter().map(|h| h.name()).collect::<Vec<_>>()))
            .collect();
        domains.sort();
        f.debug_struct("DomainRegistry").field("domains", &domains).finish()
    }
}

/// Composes a [`DomainRegistry`]. Super-domains must be declared before
/// their sub-domains.
#[derive(Default)]
pub struct DomainRegistryBuilder {
    domains: Vec<(DomainId, DomainId, Vec<HandlerRef>)>,
    constructors: Vec<(Tag, DomainId)>,
}

impl DomainRegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare `domain` under `super_domain` with its own handlers in order
    pub fn domain(mut self, domain: DomainId, super_domain: DomainId, handlers: impl IntoIterator<Item = HandlerRef>) -> Self {
        self.domains.push((domain, super_domain, handlers.into_iter().collect()));
        self
    }

    /// Route descriptors whose root constructor is `constructor` to `domain`
    pub fn bind(mut self, constructor: &'static str, domain: DomainId) -> Self {
        self.constructors.push((Tag(constructor), domain));
        self
    }

    pub fn build(self) -> DynoResult<DomainRegistry> {
        let mut domains = HashMap::new();
        domains.insert(
            ROOT_DOMAIN,
            DomainEntry {
                super_domain: ROOT_DOMAIN,
                own: Vec::new(),
                effective: Vec::new(),
            },
        );

        for (domain, super_domain, own) in self.domains {
            if domains.contains_key(&domain) {
                return Err(DynoError::DuplicateDomain(domain.0));
            }
            let inherited = match domains.get(&super_domain) {
                Some(entry) => entry.effective.clone(),
                None => return Err(DynoError::UnregisteredDomain(format!("super-domain `{super_domain}` of `{domain}`"))),
            };
            let mut effective = own.clone();
            effective.extend(inherited);
            tracing::debug!(domain = domain.0, super_domain = super_domain.0, handlers = effective.len(), "registered domain");
            domains.insert(
                domain,
                DomainEntry {
                    super_domain,
                    own,
                    effective,
                },
            );
        }

        let mut constructors = HashMap::new();
        for (constructor, domain) in self.constructors {
            if !domains.contains_key(&domain) {
                return Err(DynoError::UnregisteredDomain(format!("`{domain}` bound to constructor `{constructor}`")));
            }
            constructors.insert(constructor, domain);
        }

        Ok(DomainRegistry { domains, constructors })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::environment::Environment;
    use crate::handler::{Handler, Overload, OverloadId};
    use std::sync::Arc;

    struct Named(&'static str);

    impl Handler for Named {
        fn name(&self) -> &'static str {
            self.0
        }

        fn overloads(&self) -> &[Overload] {
            &[]
        }

        fn call(&self, _overload: OverloadId, _event: &Descriptor, _env: &Environment) -> DynoResult<()> {
            Ok(())
        }
    }

    const SYNC: DomainId = DomainId("sync");
    const MUTEX: DomainId = DomainId("mutex");
    const THREAD: DomainId = DomainId("thread");

    fn names(handlers: &[HandlerRef]) -> Vec<&'static str> {
        handlers.iter().map(|h| h.name()).collect()
    }

    fn registry() -> DomainRegistry {
        let shared: HandlerRef = Arc::new(Named("shared"));
        DomainRegistry::builder()
            .domain(SYNC, ROOT_DOMAIN, [shared.clone()])
            .domain(MUTEX, SYNC, [Arc::new(Named("lock_graph")) as HandlerRef, Arc::new(Named("stats")) as HandlerRef])
            .domain(THREAD, SYNC, [])
            .bind("mutex_operation", MUTEX)
            .build()
            .unwrap()
    }

    #[test]
    fn test_root_has_no_handlers() {
        let registry = registry();
        assert!(registry.effective_handlers(ROOT_DOMAIN).unwrap().is_empty());
        assert_eq!(registry.super_domain(ROOT_DOMAIN).unwrap(), ROOT_DOMAIN);
    }

    #[test]
    fn test_effective_handlers_own_first() {
        let registry = registry();
        assert_eq!(names(registry.effective_handlers(MUTEX).unwrap()), vec!["lock_graph", "stats", "shared"]);
        assert_eq!(names(registry.own_handlers(MUTEX).unwrap()), vec!["lock_graph", "stats"]);
        assert_eq!(names(registry.effective_handlers(THREAD).unwrap()), vec!["shared"]);
        assert!(Arc::ptr_eq(&registry.effective_handlers(MUTEX).unwrap()[2], &registry.effective_handlers(THREAD).unwrap()[0]));
    }

    #[test]
    fn test_subdomain_relation() {
        let registry = registry();
        assert!(registry.is_subdomain_of(MUTEX, SYNC));
        assert!(registry.is_subdomain_of(MUTEX, ROOT_DOMAIN));
        assert!(!registry.is_subdomain_of(MUTEX, THREAD));
        assert!(!registry.is_subdomain_of(DomainId("unknown"), ROOT_DOMAIN));
    }

    #[test]
    fn test_domain_of() {
        let registry = registry();
        let event = Descriptor::node("mutex_operation", []);
        assert_eq!(registry.domain_of(&event).unwrap(), MUTEX);
        assert!(matches!(registry.domain_of(&Descriptor::leaf("start")), Err(DynoError::UnregisteredDomain(_))));
    }

    #[test]
    fn test_composition_errors() {
        let unknown_super = DomainRegistry::builder().domain(MUTEX, SYNC, []).build();
        assert!(matches!(unknown_super, Err(DynoError::UnregisteredDomain(_))));

        let duplicate = DomainRegistry::builder().domain(SYNC, ROOT_DOMAIN, []).domain(SYNC, ROOT_DOMAIN, []).build();
        assert_eq!(duplicate.err(), Some(DynoError::DuplicateDomain("sync")));

        let root_again = DomainRegistry::builder().domain(ROOT_DOMAIN, ROOT_DOMAIN, []).build();
        assert_eq!(root_again.err(), Some(DynoError::DuplicateDomain("root")));

        let unbound = DomainRegistry::builder().bind("start", THREAD).build();
        assert!(matches!(unbound, Err(DynoError::UnregisteredDomain(_))));

        assert!(matches!(registry().effective_handlers(DomainId("unknown")), Err(DynoError::UnregisteredDomain(_))));
    }
}
