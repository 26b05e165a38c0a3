//! Dependency tracking between commands
//!
//! Two commands are related when their affected-entity sets overlap: the
//! strictly older one becomes a dependency of the newer one. Edges are
//! discovered through a per-entity index rather than a scan of the whole
//! log, so recording a command costs O(|affects| * per-entity depth).

use std::collections::{BTreeSet, HashMap, HashSet};

use uuid::Uuid;

#[derive(Debug, Clone, Copy)]
struct EntityEntry {
    id: Uuid,
    timestamp: i64,
}

/// Directed acyclic graph of command dependencies.
///
/// Edges always point from an older command to a newer one, so cycles are
/// impossible by construction. Removal (see [`DependencyGraph::remove`])
/// drops the records keyed by the removed ids but leaves those ids inside
/// other commands' edge sets; consumers must resolve ids against the global
/// log and skip the ones that no longer exist.
#[derive(Debug, Default)]
pub struct DependencyGraph {
    depends_on: HashMap<Uuid, BTreeSet<Uuid>>,
    dependents: HashMap<Uuid, BTreeSet<Uuid>>,
    by_entity: HashMap<String, Vec<EntityEntry>>,
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a newly submitted command and materialize its edges.
    ///
    /// Every already-recorded command that is strictly older and overlaps
    /// `affects` on at least one entity becomes a predecessor of `id`.
    pub fn record(&mut self, id: Uuid, timestamp: i64, affects: &BTreeSet<String>) {
        let mut predecessors: BTreeSet<Uuid> = BTreeSet::new();
        for entity in affects {
            if let Some(entries) = self.by_entity.get(entity) {
                for entry in entries {
                    if entry.id != id && entry.timestamp < timestamp {
                        predecessors.insert(entry.id);
                    }
                }
            }
        }

        for predecessor in &predecessors {
            self.dependents.entry(*predecessor).or_default().insert(id);
        }
        if !predecessors.is_empty() {
            self.depends_on.entry(id).or_default().extend(predecessors);
        }

        for entity in affects {
            self.by_entity
                .entry(entity.clone())
                .or_default()
                .push(EntityEntry { id, timestamp });
        }
    }

    /// Commands that `id` depends on (strictly older, overlapping entities).
    pub fn dependencies_of(&self, id: Uuid) -> Vec<Uuid> {
        self.depends_on
            .get(&id)
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Commands that depend on `id` (strictly newer, overlapping entities).
    pub fn dependents_of(&self, id: Uuid) -> Vec<Uuid> {
        self.dependents
            .get(&id)
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Drop the records keyed by `ids` and their entity-index entries.
    ///
    /// Ids referenced from the edge sets of surviving commands are left in
    /// place; lookups through the global log filter them out.
    pub fn remove(&mut self, ids: &HashSet<Uuid>) {
        self.depends_on.retain(|id, _| !ids.contains(id));
        self.dependents.retain(|id, _| !ids.contains(id));
        for entries in self.by_entity.values_mut() {
            entries.retain(|entry| !ids.contains(&entry.id));
        }
        self.by_entity.retain(|_, entries| !entries.is_empty());
    }

    pub fn clear(&mut self) {
        self.depends_on.clear();
        self.dependents.clear();
        self.by_entity.clear();
    }

    /// Total number of materialized edges, counted once per direction pair.
    pub fn edge_count(&self) -> usize {
        self.depends_on.values().map(BTreeSet::len).sum()
    }
}
