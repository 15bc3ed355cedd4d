//! Membership ledgers for node labels and pipeline ownership
//!
//! Two independent ledgers back the engine's uniqueness rules:
//!
//! - `LabelRegistry`: labels held by live nodes (global name uniqueness)
//! - `OwnershipRegistry`: nodes currently claimed by a live pipeline
//!
//! Both are owned by the caller and injected into a `NodeGraph` as a
//! `Registries` bundle. Graphs that share a bundle share the rules; tests
//! can create an isolated bundle per case.
//!
//! # Usage
//!
//! ```ignore
//! use std::sync::Arc;
//! use dataflow_engine::{NodeGraph, Registries};
//!
//! let registries = Arc::new(Registries::new());
//! let mut first = NodeGraph::with_registries(registries.clone());
//! let mut second = NodeGraph::with_registries(registries);
//! // A label taken in `first` is now unavailable in `second`.
//! ```

use std::collections::HashSet;
use std::hash::Hash;

use parking_lot::Mutex;

use crate::types::NodeId;

/// A thread-safe membership set
///
/// `register` and `delist` report whether they changed the set, so callers
/// can turn a rejected registration into an error of their own.
#[derive(Debug)]
pub struct Registrar<K> {
    records: Mutex<HashSet<K>>,
}

impl<K: Eq + Hash + Clone> Registrar<K> {
    /// Create an empty registrar
    pub fn new() -> Self {
        Self {
            records: Mutex::new(HashSet::new()),
        }
    }

    /// Add a record. Returns false if it was already present.
    pub fn register(&self, record: K) -> bool {
        self.records.lock().insert(record)
    }

    /// Remove a record. Returns false if it was absent.
    pub fn delist(&self, record: &K) -> bool {
        self.records.lock().remove(record)
    }

    /// Check whether a record is present
    pub fn contains(&self, record: &K) -> bool {
        self.records.lock().contains(record)
    }

    /// Number of records held
    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    /// Check whether the registrar holds no records
    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }

    /// Register every record or none of them
    ///
    /// Returns the first record that was already present, after rolling back
    /// any records added by this call.
    pub fn register_all<'a, I>(&self, records: I) -> std::result::Result<(), K>
    where
        I: IntoIterator<Item = &'a K>,
        K: 'a,
    {
        let mut guard = self.records.lock();
        let mut added: Vec<K> = Vec::new();
        for record in records {
            if guard.insert(record.clone()) {
                added.push(record.clone());
            } else {
                for undo in &added {
                    guard.remove(undo);
                }
                return Err(record.clone());
            }
        }
        Ok(())
    }
}

impl<K: Eq + Hash + Clone> Default for Registrar<K> {
    fn default() -> Self {
        Self::new()
    }
}

/// Ledger of labels held by live nodes
pub type LabelRegistry = Registrar<String>;

/// Ledger of nodes claimed by a live pipeline
pub type OwnershipRegistry = Registrar<NodeId>;

/// The pair of ledgers a `NodeGraph` enforces its rules against
#[derive(Debug, Default)]
pub struct Registries {
    labels: LabelRegistry,
    owners: OwnershipRegistry,
}

impl Registries {
    /// Create a bundle with two empty ledgers
    pub fn new() -> Self {
        Self::default()
    }

    /// Label ledger
    pub fn labels(&self) -> &LabelRegistry {
        &self.labels
    }

    /// Pipeline ownership ledger
    pub fn owners(&self) -> &OwnershipRegistry {
        &self.owners
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_and_delist() {
        let registrar: Registrar<String> = Registrar::new();
        assert!(registrar.register("a".to_string()));
        assert!(!registrar.register("a".to_string()));
        assert!(registrar.contains(&"a".to_string()));
        assert_eq!(registrar.len(), 1);

        assert!(registrar.delist(&"a".to_string()));
        assert!(!registrar.delist(&"a".to_string()));
        assert!(registrar.is_empty());
    }

    #[test]
    fn test_register_all_rolls_back_on_conflict() {
        let registrar: Registrar<u32> = Registrar::new();
        assert!(registrar.register(3));

        let result = registrar.register_all(&[1, 2, 3, 4]);
        assert_eq!(result, Err(3));
        assert_eq!(registrar.len(), 1);
        assert!(!registrar.contains(&1));
        assert!(!registrar.contains(&2));

        assert!(registrar.register_all(&[1, 2]).is_ok());
        assert_eq!(registrar.len(), 3);
    }

    #[test]
    fn test_ledgers_are_independent() {
        let registries = Registries::new();
        assert!(registries.labels().register("node_0".to_string()));
        assert!(registries.owners().is_empty());
        assert!(registries
            .owners()
            .register(NodeId { graph: 0, index: 0 }));
        assert_eq!(registries.labels().len(), 1);
        assert_eq!(registries.owners().len(), 1);
    }

    #[test]
    fn test_shared_across_threads() {
        use std::sync::Arc;

        let registrar: Arc<Registrar<usize>> = Arc::new(Registrar::new());
        let handles: Vec<_> = (0..4)
            .map(|t| {
                let registrar = registrar.clone();
                std::thread::spawn(move || {
                    for i in 0..100 {
                        registrar.register(t * 100 + i);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(registrar.len(), 400);
    }
}
