//! The live proxy table.
//!
//! # Responsibilities
//! - Own the path index of proxy records behind a single read/write lock
//! - Bootstrap from static configuration, skipping bad entries
//! - Apply register/refresh/deregister requests atomically
//!
//! # Design Decisions
//! - One `RwLock` around the whole trie; writes are short and do no I/O
//! - Reads hand out snapshots (clones) so no lock is held across an await
//! - Re-registering the same target refreshes in place and keeps the record id

use parking_lot::RwLock;

use crate::config::StaticProxyConfig;
use crate::observability::metrics;
use crate::registry::record::ProxyRecord;
use crate::registry::RegistryError;
use crate::routing::PathIndex;

/// How a registration request treats an existing record at the same path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistrationMode {
    /// Refresh an existing record or insert a new one (GET, POST).
    Refresh,
    /// Remove any existing record, then insert the new one (PUT, PATCH).
    Replace,
    /// Remove any existing record (DELETE).
    Remove,
}

/// What a registration did to the table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// A new record was stored.
    Added,
    /// An existing record had its freshness bumped.
    Refreshed,
    /// The record was removed (or was not there).
    Removed,
}

impl Outcome {
    /// The `add` / `remove` label reported to clients.
    pub fn kind(&self) -> &'static str {
        match self {
            Outcome::Added | Outcome::Refreshed => "add",
            Outcome::Removed => "remove",
        }
    }
}

/// Result of [`ProxyRegistry::register`].
#[derive(Debug, Clone)]
pub struct Registration {
    /// The stored record, or for removals the record as requested.
    pub record: ProxyRecord,
    pub outcome: Outcome,
}

/// Thread-safe registry of proxy records.
#[derive(Debug, Default)]
pub struct ProxyRegistry {
    index: RwLock<PathIndex<ProxyRecord>>,
}

impl ProxyRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry populated from static configuration entries.
    pub fn from_config(entries: &[StaticProxyConfig]) -> Self {
        let registry = Self::new();
        let loaded = registry.load_static(entries);
        tracing::info!(
            loaded,
            configured = entries.len(),
            "Proxy registry bootstrapped"
        );
        registry
    }

    /// Load static entries into the table. Invalid entries are logged and
    /// skipped. An entry matching an existing record's target refreshes it.
    /// Returns the number of entries loaded.
    pub fn load_static(&self, entries: &[StaticProxyConfig]) -> usize {
        let mut loaded = 0;
        for entry in entries {
            let record = match ProxyRecord::try_from(entry) {
                Ok(record) => record,
                Err(e) => {
                    tracing::warn!(
                        path = %entry.path,
                        reverse_uri = %entry.reverse_uri,
                        error = %e,
                        "Skipping invalid static proxy entry"
                    );
                    continue;
                }
            };

            let mut index = self.index.write();
            let refreshed = match index.get_mut(record.path()) {
                Some(existing) if existing.same_target(record.reverse_target()) => {
                    existing.refresh();
                    true
                }
                _ => false,
            };
            if !refreshed {
                let path = record.path().to_string();
                index.add(&path, record);
            }
            loaded += 1;
        }
        metrics::record_registry_size(self.len());
        loaded
    }

    /// Insert a record, overwriting any record stored under the same path.
    pub fn add(&self, record: ProxyRecord) {
        let mut index = self.index.write();
        tracing::info!(
            path = %record.path(),
            reverse_uri = %record.reverse_target(),
            "Proxy added"
        );
        index.add(&record.path().to_string(), record);
        metrics::record_registry_size(index.len());
    }

    /// Remove the record registered at exactly `path`.
    pub fn remove(&self, path: &str) -> Option<ProxyRecord> {
        let mut index = self.index.write();
        let removed = index.remove(path);
        if let Some(record) = &removed {
            tracing::info!(path = %record.path(), "Proxy removed");
            metrics::record_registry_size(index.len());
        }
        removed
    }

    /// Apply a register-or-refresh / deregister request as one atomic step.
    ///
    /// A record already stored at the path with a different target is a
    /// conflict and leaves the table untouched.
    pub fn register(
        &self,
        record: ProxyRecord,
        mode: RegistrationMode,
    ) -> Result<Registration, RegistryError> {
        let mut index = self.index.write();

        if let Some(existing) = index.get(record.path()) {
            if !existing.same_target(record.reverse_target()) {
                return Err(RegistryError::Conflict {
                    path: existing.path().to_string(),
                    existing: existing.reverse_target().to_string(),
                    requested: record.reverse_target().to_string(),
                });
            }
        }

        let registration = match mode {
            RegistrationMode::Remove => {
                let removed = index.remove(record.path());
                tracing::info!(
                    path = %record.path(),
                    existed = removed.is_some(),
                    "Proxy deregistered"
                );
                Registration {
                    record: removed.unwrap_or(record),
                    outcome: Outcome::Removed,
                }
            }
            RegistrationMode::Replace => {
                index.remove(record.path());
                index.add(&record.path().to_string(), record.clone());
                tracing::info!(
                    path = %record.path(),
                    reverse_uri = %record.reverse_target(),
                    id = %record.id(),
                    "Proxy re-registered"
                );
                Registration {
                    record,
                    outcome: Outcome::Added,
                }
            }
            RegistrationMode::Refresh => match index.get_mut(record.path()) {
                Some(existing) => {
                    existing.refresh();
                    tracing::debug!(path = %existing.path(), "Proxy refreshed");
                    Registration {
                        record: existing.clone(),
                        outcome: Outcome::Refreshed,
                    }
                }
                None => {
                    index.add(&record.path().to_string(), record.clone());
                    tracing::info!(
                        path = %record.path(),
                        reverse_uri = %record.reverse_target(),
                        "Proxy registered"
                    );
                    Registration {
                        record,
                        outcome: Outcome::Added,
                    }
                }
            },
        };

        metrics::record_registry_size(index.len());
        Ok(registration)
    }

    /// Enable or disable the record at `path`. Returns false if there is none.
    pub fn set_enabled(&self, path: &str, enabled: bool) -> bool {
        let mut index = self.index.write();
        match index.get_mut(path) {
            Some(record) => {
                record.set_enabled(enabled);
                tracing::info!(path = %record.path(), enabled, "Proxy enabled flag changed");
                true
            }
            None => false,
        }
    }

    /// Exact lookup (template segments match any literal).
    pub fn find_exact(&self, path: &str) -> Option<ProxyRecord> {
        self.index.read().find_exact(path).cloned()
    }

    /// Deepest registered record whose path is a prefix of `path`.
    pub fn find_by_prefix(&self, path: &str) -> Option<ProxyRecord> {
        self.index.read().find_by_prefix(path).cloned()
    }

    /// All registered paths, in no particular order.
    pub fn paths(&self) -> Vec<String> {
        self.index.read().paths()
    }

    /// Snapshot of every record, sorted by path.
    pub fn records(&self) -> Vec<ProxyRecord> {
        let mut records: Vec<_> = self
            .index
            .read()
            .entries()
            .map(|(_, record)| record.clone())
            .collect();
        records.sort_by(|a, b| a.path().cmp(b.path()));
        records
    }

    pub fn len(&self) -> usize {
        self.index.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.read().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn record(path: &str, target: &str) -> ProxyRecord {
        ProxyRecord::parse(path, target).unwrap()
    }

    #[test]
    fn from_config_skips_invalid_entries() {
        let registry = ProxyRegistry::from_config(&[
            StaticProxyConfig {
                path: "/Shop".into(),
                reverse_uri: "http://upstream.local/".into(),
            },
            StaticProxyConfig {
                path: "/Broken".into(),
                reverse_uri: "mailto:nobody".into(),
            },
            StaticProxyConfig {
                path: "".into(),
                reverse_uri: "http://upstream.local/".into(),
            },
        ]);

        assert_eq!(registry.paths(), vec!["/Shop".to_string()]);
        assert!(registry.find_exact("/Broken").is_none());
    }

    #[test]
    fn reloading_static_entries_keeps_identity() {
        let entries = [StaticProxyConfig {
            path: "/Shop".into(),
            reverse_uri: "http://upstream.local/".into(),
        }];
        let registry = ProxyRegistry::from_config(&entries);
        let id = registry.find_exact("/Shop").unwrap().id();

        assert_eq!(registry.load_static(&entries), 1);
        assert_eq!(registry.find_exact("/Shop").unwrap().id(), id);
    }

    #[test]
    fn add_remove_and_lookup() {
        let registry = ProxyRegistry::new();
        registry.add(record("/Api/Foo", "http://foo.local/"));
        registry.add(record("/Api/Foo/Bar", "http://bar.local/"));

        let hit = registry.find_by_prefix("/Api/Foo/Baz/1").unwrap();
        assert_eq!(hit.path(), "/Api/Foo");
        let deeper = registry.find_by_prefix("/api/foo/bar/x").unwrap();
        assert_eq!(deeper.path(), "/Api/Foo/Bar");

        assert!(registry.remove("/Api/Foo").is_some());
        assert!(registry.find_exact("/Api/Foo").is_none());
        assert!(registry.find_exact("/Api/Foo/Bar").is_some());
        assert!(registry.find_by_prefix("/Api/Foo/Baz").is_none());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn repeated_refresh_is_idempotent_and_bumps_last_seen() {
        let registry = ProxyRegistry::new();
        let first = registry
            .register(record("/Shop", "http://upstream.local/"), RegistrationMode::Refresh)
            .unwrap();
        assert_eq!(first.outcome, Outcome::Added);

        let second = registry
            .register(record("/Shop", "http://upstream.local"), RegistrationMode::Refresh)
            .unwrap();
        assert_eq!(second.outcome, Outcome::Refreshed);
        assert_eq!(second.record.id(), first.record.id());
        assert!(second.record.last_seen() >= first.record.last_seen());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn refresh_reenables_disabled_record() {
        let registry = ProxyRegistry::new();
        registry.add(record("/Shop", "http://upstream.local/"));
        assert!(registry.set_enabled("/Shop", false));
        assert!(!registry.find_exact("/Shop").unwrap().is_available());

        registry
            .register(record("/Shop", "http://upstream.local/"), RegistrationMode::Refresh)
            .unwrap();
        assert!(registry.find_exact("/Shop").unwrap().is_available());
        assert!(!registry.set_enabled("/Missing", false));
    }

    #[test]
    fn conflicting_target_is_rejected_for_every_mode() {
        let registry = ProxyRegistry::new();
        registry.add(record("/Shop", "http://upstream.local/"));

        for mode in [
            RegistrationMode::Refresh,
            RegistrationMode::Replace,
            RegistrationMode::Remove,
        ] {
            let err = registry
                .register(record("/shop", "http://elsewhere.local/"), mode)
                .unwrap_err();
            assert!(matches!(err, RegistryError::Conflict { .. }));
        }
        let kept = registry.find_exact("/Shop").unwrap();
        assert_eq!(kept.reverse_target().as_str(), "http://upstream.local/");
    }

    #[test]
    fn replace_issues_new_identity() {
        let registry = ProxyRegistry::new();
        registry.add(record("/Shop", "http://upstream.local/"));
        let old_id = registry.find_exact("/Shop").unwrap().id();

        let replaced = registry
            .register(record("/Shop", "http://upstream.local/"), RegistrationMode::Replace)
            .unwrap();
        assert_eq!(replaced.outcome, Outcome::Added);
        assert_ne!(registry.find_exact("/Shop").unwrap().id(), old_id);
    }

    #[test]
    fn remove_mode_deregisters() {
        let registry = ProxyRegistry::new();
        registry.add(record("/Shop", "http://upstream.local/"));

        let removed = registry
            .register(record("/Shop", "http://upstream.local/"), RegistrationMode::Remove)
            .unwrap();
        assert_eq!(removed.outcome.kind(), "remove");
        assert!(registry.find_by_prefix("/Shop/Cart").is_none());

        let again = registry
            .register(record("/Shop", "http://upstream.local/"), RegistrationMode::Remove)
            .unwrap();
        assert_eq!(again.outcome, Outcome::Removed);
    }

    #[test]
    fn template_record_does_not_block_literal_registration() {
        let registry = ProxyRegistry::new();
        registry.add(record("/Items/{id}", "http://items.local/"));

        let literal = registry
            .register(record("/Items/42", "http://other.local/"), RegistrationMode::Refresh)
            .unwrap();
        assert_eq!(literal.outcome, Outcome::Added);
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn concurrent_readers_and_writers() {
        let registry = Arc::new(ProxyRegistry::new());
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let registry = registry.clone();
                std::thread::spawn(move || {
                    for j in 0..50 {
                        let path = format!("/Svc{i}/N{j}");
                        registry.add(record(&path, "http://upstream.local/"));
                        assert!(registry.find_by_prefix(&format!("{path}/x")).is_some());
                        let _ = registry.paths();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(registry.len(), 400);
    }
}
