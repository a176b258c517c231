//! Role registry
//!
//! Owns the set of registered roles and answers filtering queries: lookup by
//! id, by tag, and "which roles can handle this request" ordered by priority.
//!
//! # Ordering
//!
//! Query results are sorted descending by priority; ties are broken by
//! registration order. Multiple roles commonly share the default priority,
//! so the tie-break is part of the contract, not an implementation detail.
//!
//! # Concurrency
//!
//! Internal maps sit behind a `std::sync::RwLock` with short critical
//! sections. The lock is never held across a role's `initialize`/`dispose`
//! await points; queries snapshot `Arc`s out of the map and sort outside
//! the lock.

use sdk::errors::EngineError;
use sdk::role::RoleConfig;
use sdk::{BotRole, RoleContext};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use tracing::{debug, info, warn};

/// A registered role plus its registration sequence number
#[derive(Clone)]
struct RegisteredRole {
    role: Arc<dyn BotRole>,
    seq: u64,
}

#[derive(Default)]
struct Inner {
    roles: HashMap<String, RegisteredRole>,
    tag_index: HashMap<String, Vec<String>>,
    next_seq: u64,
}

/// Registry of roles available to the orchestrator
#[derive(Default)]
pub struct RoleRegistry {
    inner: RwLock<Inner>,
}

impl RoleRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a role, optionally initializing it first
    ///
    /// If `config` is supplied, `initialize` runs before the role is stored;
    /// an initialization failure is logged and returned, and the role is not
    /// stored — an uninitialized role must never be selected as capable.
    ///
    /// Registering an id that already exists disposes and replaces the
    /// existing role.
    pub async fn register(
        &self,
        role: Arc<dyn BotRole>,
        config: Option<&RoleConfig>,
    ) -> Result<(), EngineError> {
        if let Some(config) = config {
            if let Err(e) = role.initialize(config).await {
                warn!("Role '{}' failed to initialize: {}", role.id(), e);
                return Err(EngineError::Role(format!(
                    "Role '{}' failed to initialize: {}",
                    role.id(),
                    e
                )));
            }
        }

        let id = role.id().to_string();
        let tags: Vec<String> = role.tags().to_vec();

        let replaced = {
            let mut inner = self.inner.write().expect("RoleRegistry lock poisoned");

            let replaced = inner.roles.remove(&id).map(|old| {
                Self::remove_from_tag_index(&mut inner.tag_index, &id);
                old.role
            });

            let seq = inner.next_seq;
            inner.next_seq += 1;
            inner.roles.insert(id.clone(), RegisteredRole { role, seq });

            for tag in &tags {
                inner.tag_index.entry(tag.clone()).or_default().push(id.clone());
            }

            replaced
        };

        if let Some(old) = replaced {
            warn!("Role '{}' was already registered, replacing", id);
            if let Err(e) = old.dispose().await {
                warn!("Failed to dispose replaced role '{}': {}", id, e);
            }
        }

        info!("Registered role '{}' with tags {:?}", id, tags);
        Ok(())
    }

    /// Unregister a role by id and dispose it; no-op if the id is absent
    pub async fn unregister(&self, id: &str) {
        let removed = {
            let mut inner = self.inner.write().expect("RoleRegistry lock poisoned");
            inner.roles.remove(id).map(|entry| {
                Self::remove_from_tag_index(&mut inner.tag_index, id);
                entry.role
            })
        };

        match removed {
            Some(role) => {
                info!("Unregistered role '{}'", id);
                if let Err(e) = role.dispose().await {
                    warn!("Failed to dispose role '{}': {}", id, e);
                }
            }
            None => debug!("Unregister of unknown role '{}' ignored", id),
        }
    }

    /// Get a role by id
    pub fn get(&self, id: &str) -> Option<Arc<dyn BotRole>> {
        let inner = self.inner.read().expect("RoleRegistry lock poisoned");
        inner.roles.get(id).map(|entry| Arc::clone(&entry.role))
    }

    /// Get every role owning the given tag, in priority order
    ///
    /// Returns an empty vec for unknown tags, never an error.
    pub fn get_by_tag(&self, tag: &str) -> Vec<Arc<dyn BotRole>> {
        let snapshot = {
            let inner = self.inner.read().expect("RoleRegistry lock poisoned");
            let Some(ids) = inner.tag_index.get(tag) else {
                return Vec::new();
            };
            ids.iter()
                .filter_map(|id| inner.roles.get(id).cloned())
                .collect::<Vec<_>>()
        };

        Self::sorted(snapshot)
    }

    /// Get the union of roles owning at least one of the given tags
    ///
    /// Each role appears at most once regardless of how many tags match;
    /// results are in priority order.
    pub fn get_by_tags(&self, tags: &[String]) -> Vec<Arc<dyn BotRole>> {
        let snapshot = {
            let inner = self.inner.read().expect("RoleRegistry lock poisoned");
            let mut seen = std::collections::HashSet::new();
            let mut out = Vec::new();
            for tag in tags {
                if let Some(ids) = inner.tag_index.get(tag) {
                    for id in ids {
                        if seen.insert(id.clone()) {
                            if let Some(entry) = inner.roles.get(id) {
                                out.push(entry.clone());
                            }
                        }
                    }
                }
            }
            out
        };

        Self::sorted(snapshot)
    }

    /// Get every role whose `can_handle` accepts the context, in priority order
    pub fn get_capable(&self, context: &RoleContext) -> Vec<Arc<dyn BotRole>> {
        let snapshot = {
            let inner = self.inner.read().expect("RoleRegistry lock poisoned");
            inner.roles.values().cloned().collect::<Vec<_>>()
        };

        let capable = snapshot
            .into_iter()
            .filter(|entry| entry.role.can_handle(context))
            .collect();

        Self::sorted(capable)
    }

    /// All registered roles in registration order
    pub fn all(&self) -> Vec<Arc<dyn BotRole>> {
        let mut snapshot = {
            let inner = self.inner.read().expect("RoleRegistry lock poisoned");
            inner.roles.values().cloned().collect::<Vec<_>>()
        };
        snapshot.sort_by_key(|entry| entry.seq);
        snapshot.into_iter().map(|entry| entry.role).collect()
    }

    /// Number of registered roles
    pub fn len(&self) -> usize {
        self.inner.read().expect("RoleRegistry lock poisoned").roles.len()
    }

    /// Whether the registry is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Dispose every role and clear all indices
    ///
    /// Subsequent queries return empty results, not errors.
    pub async fn dispose_all(&self) {
        let drained: Vec<(String, Arc<dyn BotRole>)> = {
            let mut inner = self.inner.write().expect("RoleRegistry lock poisoned");
            inner.tag_index.clear();
            inner.roles.drain().map(|(id, entry)| (id, entry.role)).collect()
        };

        info!("Disposing {} registered roles", drained.len());
        for (id, role) in drained {
            if let Err(e) = role.dispose().await {
                warn!("Failed to dispose role '{}': {}", id, e);
            }
        }
    }

    /// Sort descending by priority, ties broken by registration order
    fn sorted(mut entries: Vec<RegisteredRole>) -> Vec<Arc<dyn BotRole>> {
        entries.sort_by(|a, b| {
            b.role
                .priority()
                .cmp(&a.role.priority())
                .then(a.seq.cmp(&b.seq))
        });
        entries.into_iter().map(|entry| entry.role).collect()
    }

    fn remove_from_tag_index(tag_index: &mut HashMap<String, Vec<String>>, id: &str) {
        tag_index.retain(|_, ids| {
            ids.retain(|existing| existing != id);
            !ids.is_empty()
        });
    }
}
