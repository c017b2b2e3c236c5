use std::collections::{HashMap, HashSet};
use tracing::warn;

use crate::models::{Fields, Patch, Record, RecordId};

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum LoadStatus {
    #[default]
    Loading,
    Ready,
    Error(String),
}

/// In-memory copy of the remote application list plus the UI state that
/// hangs off it (selection, search term, load status).
///
/// Every operation keeps `selected` either empty or pointing at a record
/// that is present. No I/O happens here.
#[derive(Debug, Clone, Default)]
pub struct CollectionStore {
    records: Vec<Record>,
    status: LoadStatus,
    selected: Option<RecordId>,
    search_term: String,
    // last fields the server acknowledged, per record
    confirmed: HashMap<RecordId, Fields>,
}

impl CollectionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn status(&self) -> &LoadStatus {
        &self.status
    }

    pub fn search_term(&self) -> &str {
        &self.search_term
    }

    pub fn selected_id(&self) -> Option<&RecordId> {
        self.selected.as_ref()
    }

    pub fn selected(&self) -> Option<&Record> {
        self.selected.as_ref().and_then(|id| self.get(id))
    }

    pub fn get(&self, id: &RecordId) -> Option<&Record> {
        self.records.iter().find(|r| &r.id == id)
    }

    pub fn contains(&self, id: &RecordId) -> bool {
        self.get(id).is_some()
    }

    /// Find an id typed by a user: exact match first, then a unique prefix
    /// (handy for UUIDs).
    pub fn resolve(&self, needle: &str) -> Option<RecordId> {
        if let Some(record) = self.records.iter().find(|r| r.id.to_string() == needle) {
            return Some(record.id.clone());
        }
        if needle.is_empty() {
            return None;
        }
        let mut matches = self
            .records
            .iter()
            .filter(|r| r.id.to_string().starts_with(needle));
        match (matches.next(), matches.next()) {
            (Some(record), None) => Some(record.id.clone()),
            _ => None,
        }
    }

    /// Swap in a fresh list from the server.
    pub fn replace_all(&mut self, records: Vec<Record>) {
        let mut seen = HashSet::new();
        let mut unique = Vec::with_capacity(records.len());
        for record in records {
            if seen.insert(record.id.clone()) {
                unique.push(record);
            } else {
                warn!(id = %record.id, "dropping duplicate application from server");
            }
        }
        self.confirmed = unique
            .iter()
            .map(|r| (r.id.clone(), r.fields.clone()))
            .collect();
        self.records = unique;
        self.status = LoadStatus::Ready;
        if !self.selected.as_ref().is_some_and(|id| self.contains(id)) {
            self.selected = self.first_id();
        }
    }

    /// Add a record the server has just created at the front and select it.
    /// An existing entry with the same id is replaced.
    pub fn insert(&mut self, record: Record) {
        self.records.retain(|r| r.id != record.id);
        self.selected = Some(record.id.clone());
        self.confirmed.insert(record.id.clone(), record.fields.clone());
        self.records.insert(0, record);
    }

    /// Change one field locally. Returns `false` if the record is gone (for
    /// example deleted while the edit was in flight).
    pub fn patch(&mut self, id: &RecordId, patch: Patch) -> bool {
        let Some(record) = self.records.iter_mut().find(|r| &r.id == id) else {
            return false;
        };
        record.fields.apply(patch);
        true
    }

    /// Record what the server acknowledged for `record.id`. Local edits are
    /// left alone.
    pub fn confirm(&mut self, record: &Record) {
        if self.contains(&record.id) {
            self.confirmed
                .insert(record.id.clone(), record.fields.clone());
        }
    }

    /// Undo an edit that the server refused by putting back the field's last
    /// acknowledged value, unless the field has since been changed again.
    pub fn restore(&mut self, id: &RecordId, applied: &Patch) -> bool {
        let Some(confirmed) = self.confirmed.get(id) else {
            return false;
        };
        let Some(record) = self.records.iter_mut().find(|r| &r.id == id) else {
            return false;
        };
        if !record.fields.holds(applied) {
            return false;
        }
        record.fields.apply(confirmed.current(applied));
        true
    }

    pub fn remove(&mut self, id: &RecordId) -> Option<Record> {
        let idx = self.records.iter().position(|r| &r.id == id)?;
        let removed = self.records.remove(idx);
        self.confirmed.remove(id);
        if self.selected.as_ref() == Some(id) {
            self.selected = self.first_id();
        }
        Some(removed)
    }

    /// Returns whether the selection changed.
    pub fn select(&mut self, id: &RecordId) -> bool {
        if !self.contains(id) {
            return false;
        }
        self.selected = Some(id.clone());
        true
    }

    pub fn set_search_term(&mut self, term: impl Into<String>) {
        self.search_term = term.into();
    }

    pub fn set_loading(&mut self) {
        self.status = LoadStatus::Loading;
    }

    pub fn set_error(&mut self, message: impl Into<String>) {
        self.status = LoadStatus::Error(message.into());
    }

    pub fn clear_error(&mut self) {
        if matches!(self.status, LoadStatus::Error(_)) {
            self.status = LoadStatus::Ready;
        }
    }

    fn first_id(&self) -> Option<RecordId> {
        self.records.first().map(|r| r.id.clone())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::models::{Fields, Stage, Status, TextField};
    use chrono::NaiveDate;

    pub(crate) fn record(id: i64, role: &str, company: &str, date: &str) -> Record {
        let mut fields = Fields::draft(NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap());
        fields.role = Some(role.to_string());
        fields.company = Some(company.to_string());
        Record {
            id: RecordId::from(id),
            fields,
        }
    }

    fn loaded(records: Vec<Record>) -> CollectionStore {
        let mut store = CollectionStore::new();
        store.replace_all(records);
        store
    }

    fn ids(store: &CollectionStore) -> Vec<RecordId> {
        store.records().iter().map(|r| r.id.clone()).collect()
    }

    #[test]
    fn test_replace_all_selects_first() {
        let store = loaded(vec![
            record(1, "Engineer", "Acme", "2024-01-10"),
            record(2, "Designer", "Globex", "2024-02-01"),
        ]);
        assert_eq!(store.status(), &LoadStatus::Ready);
        assert_eq!(store.selected_id(), Some(&RecordId::from(1_i64)));
    }

    #[test]
    fn test_replace_all_keeps_surviving_selection() {
        let mut store = loaded(vec![
            record(1, "Engineer", "Acme", "2024-01-10"),
            record(2, "Designer", "Globex", "2024-02-01"),
        ]);
        store.select(&RecordId::from(2_i64));
        store.replace_all(vec![
            record(3, "Analyst", "Initech", "2024-03-01"),
            record(2, "Designer", "Globex", "2024-02-01"),
        ]);
        assert_eq!(store.selected_id(), Some(&RecordId::from(2_i64)));

        store.replace_all(vec![record(3, "Analyst", "Initech", "2024-03-01")]);
        assert_eq!(store.selected_id(), Some(&RecordId::from(3_i64)));

        store.replace_all(Vec::new());
        assert_eq!(store.selected_id(), None);
    }

    #[test]
    fn test_replace_all_drops_duplicate_ids() {
        let store = loaded(vec![
            record(1, "Engineer", "Acme", "2024-01-10"),
            record(1, "Impostor", "Acme", "2024-01-10"),
        ]);
        assert_eq!(store.len(), 1);
        assert_eq!(store.records()[0].role(), "Engineer");
    }

    #[test]
    fn test_insert_goes_to_front_and_selects() {
        let mut store = loaded(vec![record(1, "Engineer", "Acme", "2024-01-10")]);
        store.insert(record(2, "New Opportunity", "Target Company", "2025-06-01"));
        assert_eq!(ids(&store), vec![RecordId::from(2_i64), RecordId::from(1_i64)]);
        assert_eq!(store.selected_id(), Some(&RecordId::from(2_i64)));
    }

    #[test]
    fn test_insert_then_remove_restores_prior_set() {
        let mut store = loaded(vec![
            record(1, "Engineer", "Acme", "2024-01-10"),
            record(2, "Designer", "Globex", "2024-02-01"),
        ]);
        let before = store.records().to_vec();

        store.insert(record(9, "Analyst", "Initech", "2024-03-01"));
        store.remove(&RecordId::from(9_i64));
        assert_eq!(store.records(), before.as_slice());
    }

    #[test]
    fn test_patch_changes_only_named_field() {
        let mut store = loaded(vec![
            record(1, "Engineer", "Acme", "2024-01-10"),
            record(2, "Designer", "Globex", "2024-02-01"),
        ]);
        let before = store.records().to_vec();

        let patches = [
            Patch::Status(Status::AwaitingResults),
            Patch::Stage(Stage::FinalRound),
            Patch::Text(TextField::Notes, Some("ping recruiter".to_string())),
        ];
        for patch in patches {
            let mut expected = store.records()[0].clone();
            expected.fields.apply(patch.clone());

            store.patch(&RecordId::from(1_i64), patch);
            assert_eq!(store.len(), 2);
            assert_eq!(store.records()[0], expected);
            assert_eq!(store.records()[1], before[1]);
        }
        let after = &store.records()[0];
        assert_eq!(after.fields.role, before[0].fields.role);
        assert_eq!(after.fields.company, before[0].fields.company);
        assert_eq!(after.fields.date_applied, before[0].fields.date_applied);
    }

    #[test]
    fn test_patch_missing_id_is_noop() {
        let mut store = loaded(vec![record(1, "Engineer", "Acme", "2024-01-10")]);
        let before = store.records().to_vec();
        assert!(!store.patch(&RecordId::from(99_i64), Patch::Status(Status::Applied)));
        assert_eq!(store.records(), before.as_slice());
    }

    #[test]
    fn test_restore_skips_when_field_changed_again() {
        let mut store = loaded(vec![record(1, "Engineer", "Acme", "2024-01-10")]);
        let id = RecordId::from(1_i64);
        let first = Patch::Text(TextField::Role, Some("Staff Engineer".to_string()));
        assert!(store.patch(&id, first.clone()));

        store.patch(&id, Patch::Text(TextField::Role, Some("Principal".to_string())));
        assert!(!store.restore(&id, &first));
        assert_eq!(store.get(&id).unwrap().role(), "Principal");

        store.patch(&id, first.clone());
        assert!(store.restore(&id, &first));
        assert_eq!(store.get(&id).unwrap().role(), "Engineer");
    }

    #[test]
    fn test_restore_uses_last_acknowledged_value() {
        let mut store = loaded(vec![record(1, "Engineer", "Acme", "2024-01-10")]);
        let id = RecordId::from(1_i64);
        let lead = Patch::Text(TextField::Role, Some("Lead".to_string()));
        let principal = Patch::Text(TextField::Role, Some("Principal".to_string()));

        // Two unacknowledged edits: undoing the second must not land on the first.
        store.patch(&id, lead);
        store.patch(&id, principal.clone());
        assert!(store.restore(&id, &principal));
        assert_eq!(store.get(&id).unwrap().role(), "Engineer");

        // Once the server has accepted an edit, that is what a rollback returns to.
        store.patch(&id, Patch::Text(TextField::Role, Some("Staff".to_string())));
        let acked = store.get(&id).unwrap().clone();
        store.confirm(&acked);
        store.patch(&id, principal.clone());
        assert!(store.restore(&id, &principal));
        assert_eq!(store.get(&id).unwrap().role(), "Staff");
    }

    #[test]
    fn test_insert_existing_id_replaces() {
        let mut store = loaded(vec![
            record(1, "Engineer", "Acme", "2024-01-10"),
            record(2, "Designer", "Globex", "2024-02-01"),
        ]);
        store.insert(record(2, "Lead Designer", "Globex", "2024-02-01"));
        assert_eq!(ids(&store), vec![RecordId::from(2_i64), RecordId::from(1_i64)]);
        assert_eq!(store.get(&RecordId::from(2_i64)).unwrap().role(), "Lead Designer");
        assert_eq!(store.selected_id(), Some(&RecordId::from(2_i64)));
    }

    #[test]
    fn test_select_absent_is_noop() {
        let mut store = loaded(vec![record(1, "Engineer", "Acme", "2024-01-10")]);
        assert!(!store.select(&RecordId::from(5_i64)));
        assert_eq!(store.selected_id(), Some(&RecordId::from(1_i64)));
    }

    #[test]
    fn test_remove_selected_reselects_first() {
        let mut store = loaded(vec![
            record(1, "Engineer", "Acme", "2024-01-10"),
            record(2, "Designer", "Globex", "2024-02-01"),
            record(3, "Analyst", "Initech", "2024-03-01"),
        ]);
        store.select(&RecordId::from(2_i64));
        store.remove(&RecordId::from(2_i64));
        assert_eq!(store.selected_id(), Some(&RecordId::from(1_i64)));

        store.remove(&RecordId::from(1_i64));
        assert_eq!(store.selected_id(), Some(&RecordId::from(3_i64)));

        store.remove(&RecordId::from(3_i64));
        assert_eq!(store.selected_id(), None);
        assert!(store.is_empty());
    }

    #[test]
    fn test_remove_unselected_keeps_selection() {
        let mut store = loaded(vec![
            record(1, "Engineer", "Acme", "2024-01-10"),
            record(2, "Designer", "Globex", "2024-02-01"),
        ]);
        store.remove(&RecordId::from(2_i64));
        assert_eq!(store.selected_id(), Some(&RecordId::from(1_i64)));
    }

    #[test]
    fn test_error_lifecycle() {
        let mut store = CollectionStore::new();
        assert_eq!(store.status(), &LoadStatus::Loading);
        store.set_error("Backend not reachable");
        assert_eq!(
            store.status(),
            &LoadStatus::Error("Backend not reachable".to_string())
        );
        store.clear_error();
        assert_eq!(store.status(), &LoadStatus::Ready);
    }

    #[test]
    fn test_resolve_exact_and_prefix() {
        let mut a = record(1, "Engineer", "Acme", "2024-01-10");
        a.id = RecordId::from("4f1c2a9e-aaaa");
        let mut b = record(2, "Designer", "Globex", "2024-02-01");
        b.id = RecordId::from("4f1c77d0-bbbb");
        let store = loaded(vec![a, b]);

        assert_eq!(store.resolve("4f1c2"), Some(RecordId::from("4f1c2a9e-aaaa")));
        assert_eq!(store.resolve("4f1c"), None);
        assert_eq!(store.resolve("nope"), None);
        assert_eq!(store.resolve(""), None);
    }
}
