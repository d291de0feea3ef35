//! Shared rule store.
//!
//! # Responsibilities
//! - Hold the current rule list and serving settings
//! - Hand out consistent snapshots to concurrent readers
//! - Apply add/update/delete/import atomically
//!
//! # Design Decisions
//! - Copy-on-write behind `ArcSwap`: readers never block and never see a
//!   partially applied mutation
//! - Writers go through `rcu`, so concurrent mutations are all preserved
//! - No uniqueness checks; normalization belongs to the administrative layer

use std::sync::Arc;

use arc_swap::ArcSwap;

use crate::routing::rule::{ProxyRule, Settings};

/// Thread-safe store of proxy rules.
#[derive(Debug)]
pub struct RuleStore {
    current: ArcSwap<Settings>,
}

impl RuleStore {
    /// Create a store seeded with the given settings.
    pub fn new(settings: Settings) -> Self {
        Self {
            current: ArcSwap::from_pointee(settings),
        }
    }

    /// Point-in-time snapshot of all settings.
    pub fn snapshot(&self) -> Arc<Settings> {
        self.current.load_full()
    }

    /// Copy of the rule list in insertion order.
    pub fn list(&self) -> Vec<ProxyRule> {
        self.current.load().proxy_rules.clone()
    }

    /// Append a rule.
    pub fn add(&self, rule: ProxyRule) {
        self.current.rcu(|current| {
            let mut next = Settings::clone(current);
            next.proxy_rules.push(rule.clone());
            next
        });
    }

    /// Replace the rule with the given id, keeping the id. Returns false if unknown.
    pub fn update(&self, id: &str, rule: ProxyRule) -> bool {
        let mut found = false;
        self.current.rcu(|current| {
            let mut next = Settings::clone(current);
            found = false;
            if let Some(slot) = next.proxy_rules.iter_mut().find(|r| r.id == id) {
                *slot = ProxyRule {
                    id: id.to_string(),
                    ..rule.clone()
                };
                found = true;
            }
            next
        });
        found
    }

    /// Remove the rule with the given id. Returns false if unknown.
    pub fn delete(&self, id: &str) -> bool {
        let mut found = false;
        self.current.rcu(|current| {
            let mut next = Settings::clone(current);
            let before = next.proxy_rules.len();
            next.proxy_rules.retain(|r| r.id != id);
            found = next.proxy_rules.len() != before;
            next
        });
        found
    }

    /// Replace the rule list with an imported one.
    ///
    /// The serving port and directory keep describing the running process.
    pub fn import(&self, imported: Settings) {
        self.current.rcu(|current| Settings {
            proxy_rules: imported.proxy_rules.clone(),
            file_server_port: current.file_server_port,
            file_server_dir: current.file_server_dir.clone(),
        });
    }

    /// Record the port the shared endpoint is actually bound to.
    pub fn set_file_server_port(&self, port: u16) {
        self.current.rcu(|current| Settings {
            file_server_port: port,
            ..Settings::clone(current)
        });
    }

    /// Record the directory being served.
    pub fn set_file_server_dir(&self, dir: impl Into<String>) {
        let dir = dir.into();
        self.current.rcu(|current| Settings {
            file_server_dir: dir.clone(),
            ..Settings::clone(current)
        });
    }
}

impl Default for RuleStore {
    fn default() -> Self {
        Self::new(Settings::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::thread;

    fn rule(id: &str, prefix: &str) -> ProxyRule {
        ProxyRule::with_prefix(prefix, "http://localhost:3000").id(id)
    }

    #[test]
    fn add_update_delete() {
        let store = RuleStore::default();
        store.add(rule("a", "/a"));
        store.add(rule("b", "/b"));
        assert_eq!(store.list().len(), 2);

        let replacement = ProxyRule::with_prefix("/bee", "http://other").id("ignored");
        assert!(store.update("b", replacement));
        let rules = store.list();
        assert_eq!(rules[1].id, "b");
        assert_eq!(rules[1].path_prefix.as_deref(), Some("/bee"));
        assert_eq!(rules[1].target_url, "http://other");

        assert!(!store.update("missing", rule("x", "/x")));
        assert!(store.delete("a"));
        assert!(!store.delete("a"));
        assert_eq!(store.list().len(), 1);
    }

    #[test]
    fn list_is_a_detached_copy() {
        let store = RuleStore::default();
        store.add(rule("a", "/a"));
        let before = store.list();
        store.add(rule("b", "/b"));
        assert_eq!(before.len(), 1);
        assert_eq!(store.list().len(), 2);
    }

    #[test]
    fn insertion_order_is_preserved() {
        let store = RuleStore::default();
        for id in ["c", "a", "b"] {
            store.add(rule(id, "/"));
        }
        let ids: Vec<_> = store.list().into_iter().map(|r| r.id).collect();
        assert_eq!(ids, vec!["c", "a", "b"]);
    }

    #[test]
    fn import_keeps_runtime_port_and_dir() {
        let store = RuleStore::default();
        store.set_file_server_port(4321);
        store.set_file_server_dir("/srv");
        store.add(rule("old", "/old"));

        store.import(Settings {
            proxy_rules: vec![rule("new", "/new")],
            file_server_port: 1,
            file_server_dir: "/elsewhere".into(),
        });

        let snap = store.snapshot();
        assert_eq!(snap.proxy_rules.len(), 1);
        assert_eq!(snap.proxy_rules[0].id, "new");
        assert_eq!(snap.file_server_port, 4321);
        assert_eq!(snap.file_server_dir, "/srv");
    }

    #[test]
    fn concurrent_add_and_list_never_tear() {
        let store = Arc::new(RuleStore::default());
        let writers = 8;
        let per_writer = 50;

        let mut handles = Vec::new();
        for w in 0..writers {
            let store = store.clone();
            handles.push(thread::spawn(move || {
                for i in 0..per_writer {
                    store.add(rule(&format!("{w}-{i}"), "/p"));
                }
            }));
        }

        let reader = {
            let store = store.clone();
            thread::spawn(move || {
                let mut last_len = 0;
                for _ in 0..500 {
                    let rules = store.list();
                    let ids: HashSet<_> = rules.iter().map(|r| r.id.clone()).collect();
                    assert_eq!(ids.len(), rules.len(), "duplicate entry observed");
                    assert!(rules.len() >= last_len, "entry went missing");
                    last_len = rules.len();
                }
            })
        };

        for h in handles {
            h.join().unwrap();
        }
        reader.join().unwrap();

        let rules = store.list();
        assert_eq!(rules.len(), writers * per_writer);
        let ids: HashSet<_> = rules.into_iter().map(|r| r.id).collect();
        assert_eq!(ids.len(), writers * per_writer);
    }
}
