//! Lock-protected state of a knowledge context.
//!
//! Entities live in an arena indexed by id. Facts are grouped per subject in
//! insertion order; a subject with facts but no entity record is tolerated.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use tracing::trace;
use uuid::Uuid;

use crate::fact::Fact;

/// Index of an entity record in the arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct EntityHandle(usize);

/// What the context remembers about an entity: identity, type and ancestors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct EntityRecord {
    pub id: String,
    pub type_name: String,
    pub inherits_from: BTreeSet<String>,
}

#[derive(Debug, Clone)]
pub(crate) struct ContextState {
    pub context_id: Uuid,
    records: Vec<EntityRecord>,
    index: HashMap<String, EntityHandle>,
    facts: HashMap<String, Vec<Fact>>,
    inheritance: BTreeMap<String, BTreeSet<String>>,
}

impl ContextState {
    pub fn new(context_id: Uuid) -> Self {
        Self {
            context_id,
            records: Vec::new(),
            index: HashMap::new(),
            facts: HashMap::new(),
            inheritance: BTreeMap::new(),
        }
    }

    /// Inserts or replaces an entity record.
    ///
    /// The record's ancestor set is copied into the inheritance table only if
    /// it is non-empty and the type has no entry yet.
    pub fn register(&mut self, record: EntityRecord) {
        if !record.inherits_from.is_empty() && !self.inheritance.contains_key(&record.type_name) {
            self.inheritance
                .insert(record.type_name.clone(), record.inherits_from.clone());
        }

        match self.index.get(&record.id) {
            Some(handle) => self.records[handle.0] = record,
            None => {
                let handle = EntityHandle(self.records.len());
                self.index.insert(record.id.clone(), handle);
                self.records.push(record);
            }
        }
    }

    pub fn record(&self, id: &str) -> Option<&EntityRecord> {
        self.index.get(id).map(|handle| &self.records[handle.0])
    }

    pub fn contains_entity(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    pub fn records(&self) -> &[EntityRecord] {
        &self.records
    }

    /// Returns the table ancestors of a type, if it has any.
    pub fn ancestors(&self, type_name: &str) -> Option<&BTreeSet<String>> {
        self.inheritance.get(type_name)
    }

    pub fn inheritance(&self) -> &BTreeMap<String, BTreeSet<String>> {
        &self.inheritance
    }

    pub fn set_inheritance(&mut self, type_name: String, ancestors: BTreeSet<String>) {
        self.inheritance.insert(type_name, ancestors);
    }

    /// Returns true if `child_type` is `parent_type` or lists it as an ancestor.
    pub fn type_inherits(&self, child_type: &str, parent_type: &str) -> bool {
        child_type == parent_type
            || self
                .inheritance
                .get(child_type)
                .is_some_and(|ancestors| ancestors.contains(parent_type))
    }

    pub fn associate(&mut self, fact: Fact) {
        trace!(subject = %fact.subject, relation = %fact.relation, kind = %fact.value.kind(), "associate");
        self.facts.entry(fact.subject.clone()).or_default().push(fact);
    }

    /// Removes every fact for `(subject, relation)` and returns how many were removed.
    pub fn disassociate(&mut self, subject: &str, relation: &str) -> usize {
        let Some(list) = self.facts.get_mut(subject) else {
            return 0;
        };

        let before = list.len();
        list.retain(|fact| !fact.matches(subject, relation));
        let removed = before - list.len();
        if list.is_empty() {
            self.facts.remove(subject);
        }

        if removed > 0 {
            trace!(subject, relation, removed, "disassociate");
        }
        removed
    }

    pub fn overwrite(&mut self, fact: Fact) {
        self.disassociate(&fact.subject, &fact.relation);
        self.associate(fact);
    }

    /// Replaces every fact for `subject` with `facts`.
    pub fn replace_facts(&mut self, subject: &str, facts: Vec<Fact>) {
        if facts.is_empty() {
            self.facts.remove(subject);
        } else {
            self.facts.insert(subject.to_string(), facts);
        }
    }

    pub fn facts_of(&self, subject: &str, relation: Option<&str>) -> Vec<Fact> {
        self.facts
            .get(subject)
            .map(|list| {
                list.iter()
                    .filter(|fact| relation.map_or(true, |r| fact.matches(subject, r)))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Returns subjects in sorted order so that encoded snapshots are stable.
    pub fn fact_groups(&self) -> Vec<(&str, &[Fact])> {
        let mut groups: Vec<_> = self
            .facts
            .iter()
            .map(|(subject, list)| (subject.as_str(), list.as_slice()))
            .collect();
        groups.sort_unstable_by(|a, b| a.0.cmp(b.0));
        groups
    }

    pub fn entity_count(&self) -> usize {
        self.records.len()
    }

    pub fn fact_count(&self) -> usize {
        self.facts.values().map(Vec::len).sum()
    }
}
