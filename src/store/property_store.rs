//! PropertyStore - per-model property values with DashMap
//!
//! Absent entries read as the schema default. Writes are diffed against the
//! current effective value; list-kind properties are refilled in place.

use std::sync::Arc;

use dashmap::DashMap;
use serde_json::{Map, Value};

use crate::error::{check_name, Result};
use crate::schema::{PropertyKind, Schema};
use crate::value::{ObservableList, PropertyValue};

/// A validated write that has not been committed yet
#[derive(Debug)]
pub(crate) struct PendingSet {
    pub(crate) name: Arc<str>,
    change: Option<Commit>,
}

#[derive(Debug)]
enum Commit {
    Replace(Value),
    Refill(ObservableList, Vec<Value>),
}

impl PendingSet {
    pub(crate) fn is_change(&self) -> bool {
        self.change.is_some()
    }
}

/// Storage for the property values of one model
///
/// Keys are `Arc<str>` shared with the schema and with emitted events.
#[derive(Debug)]
pub struct PropertyStore {
    schema: Arc<Schema>,
    /// Property values: name → PropertyValue
    values: DashMap<Arc<str>, PropertyValue>,
}

impl PropertyStore {
    pub fn new(schema: impl Into<Arc<Schema>>) -> Self {
        Self {
            schema: schema.into(),
            values: DashMap::new(),
        }
    }

    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    /// Kind used for `name`; undeclared names behave as `Any`
    pub fn kind_of(&self, name: &str) -> PropertyKind {
        self.schema.kind_of(name).unwrap_or(PropertyKind::Any)
    }

    /// Current value, or the kind default when never set
    ///
    /// A list-kind property is materialized on first read so that every
    /// reader receives the same instance.
    pub fn get(&self, name: &str) -> PropertyValue {
        if let Some(value) = self.values.get(name) {
            return value.value().clone();
        }

        match self.schema.kind_of(name) {
            Some(PropertyKind::List) => self.list_handle(name).into(),
            Some(kind) => PropertyValue::Scalar(kind.default_scalar()),
            None => PropertyValue::null(),
        }
    }

    /// Store `value`; returns whether it differs from the previous value
    ///
    /// No notification is raised here.
    pub fn set(&self, name: &str, value: impl Into<PropertyValue>) -> Result<bool> {
        let pending = self.prepare(name, value.into())?;
        let changed = pending.is_change();
        self.commit(pending);
        Ok(changed)
    }

    /// Whether `set(name, value)` would report a change
    pub fn would_change(&self, name: &str, value: impl Into<PropertyValue>) -> Result<bool> {
        Ok(self.prepare(name, value.into())?.is_change())
    }

    /// Whether a value has been stored (or a list materialized) for `name`
    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    /// Number of stored entries
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Stored entries only (never-set properties are absent), sorted by name
    pub fn entries(&self) -> Vec<(Arc<str>, PropertyValue)> {
        let mut entries: Vec<(Arc<str>, PropertyValue)> = self
            .values
            .iter()
            .map(|entry| (Arc::clone(entry.key()), entry.value().clone()))
            .collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        entries
    }

    /// Declared properties (in declaration order, defaults filled in)
    /// followed by undeclared stored properties (sorted by name)
    pub fn snapshot(&self) -> Map<String, Value> {
        let mut extra: Vec<Arc<str>> = self
            .values
            .iter()
            .map(|entry| Arc::clone(entry.key()))
            .filter(|name| !self.schema.contains(name))
            .collect();
        extra.sort();

        self.schema
            .names()
            .cloned()
            .chain(extra)
            .map(|name| {
                let value = self.get(&name).to_json();
                (name.to_string(), value)
            })
            .collect()
    }

    /// Validate and diff a write against the current value
    pub(crate) fn prepare(&self, name: &str, value: PropertyValue) -> Result<PendingSet> {
        check_name(name)?;
        let kind = self.kind_of(name);
        let value = kind.coerce(name, value)?;
        let name = self.schema.intern(name);

        let change = if kind == PropertyKind::List {
            let target = self.list_handle(&name);
            let items = match value {
                PropertyValue::List(source) if source.ptr_eq(&target) => target.to_vec(),
                PropertyValue::List(source) => source.to_vec(),
                PropertyValue::Scalar(Value::Array(items)) => items,
                _ => Vec::new(),
            };
            (!target.contents_eq(&items)).then_some(Commit::Refill(target, items))
        } else {
            let incoming = value.to_json();
            let current = self.get(&name).to_json();
            (current != incoming).then_some(Commit::Replace(incoming))
        };

        Ok(PendingSet { name, change })
    }

    /// Re-diff a prepared write against the value stored now
    pub(crate) fn recheck(&self, pending: PendingSet) -> PendingSet {
        let change = match pending.change {
            Some(Commit::Replace(value)) => {
                (self.get(&pending.name).to_json() != value).then_some(Commit::Replace(value))
            }
            Some(Commit::Refill(list, items)) => {
                (!list.contents_eq(&items)).then_some(Commit::Refill(list, items))
            }
            None => None,
        };
        PendingSet {
            name: pending.name,
            change,
        }
    }

    /// Apply a prepared write
    pub(crate) fn commit(&self, pending: PendingSet) {
        match pending.change {
            Some(Commit::Replace(value)) => {
                self.values.insert(pending.name, PropertyValue::Scalar(value));
            }
            Some(Commit::Refill(list, items)) => list.replace_all(items),
            None => {}
        }
    }

    /// The one list instance stored under `name`
    fn list_handle(&self, name: &str) -> ObservableList {
        let entry = self
            .values
            .entry(self.schema.intern(name))
            .or_insert_with(|| PropertyValue::List(ObservableList::new()));

        match entry.value() {
            PropertyValue::List(list) => list.clone(),
            _ => ObservableList::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn store() -> PropertyStore {
        let schema = Schema::builder()
            .float("Price")
            .integer("Qty")
            .text("Name")
            .bool("Active")
            .list("Items")
            .build()
            .unwrap();
        PropertyStore::new(schema)
    }

    #[test]
    fn unset_properties_read_as_defaults() {
        let store = store();
        assert_eq!(store.get("Price"), PropertyValue::from(0.0));
        assert_eq!(store.get("Qty"), PropertyValue::from(0));
        assert_eq!(store.get("Active"), PropertyValue::from(false));
        assert!(store.get("Name").is_null());
        assert!(store.get("Undeclared").is_null());
        assert!(store.get("Items").as_list().unwrap().is_empty());
    }

    #[test]
    fn set_reports_change_only_when_value_differs() {
        let store = store();
        assert!(store.set("Qty", 3).unwrap());
        assert!(!store.set("Qty", 3).unwrap());
        assert!(store.set("Qty", 4).unwrap());
        assert_eq!(store.get("Qty"), PropertyValue::from(4));
    }

    #[test]
    fn setting_the_default_is_not_a_change() {
        let store = store();
        assert!(!store.set("Qty", 0).unwrap());
        assert!(!store.set("Name", PropertyValue::null()).unwrap());
    }

    #[test]
    fn null_and_non_null_differ() {
        let store = store();
        assert!(store.set("Name", "widget").unwrap());
        assert!(store.set("Name", PropertyValue::null()).unwrap());
        assert!(store.get("Name").is_null());
        assert!(store.set("Name", "").unwrap());
    }

    #[test]
    fn float_compares_numerically() {
        let store = store();
        assert!(store.set("Price", 10).unwrap());
        assert!(!store.set("Price", 10.0).unwrap());
    }

    #[test]
    fn type_mismatch_leaves_value_untouched() {
        let store = store();
        store.set("Qty", 2).unwrap();
        let err = store.set("Qty", "two").unwrap_err();
        assert_eq!(err.code(), "BND-002");
        assert_eq!(store.get("Qty"), PropertyValue::from(2));
    }

    #[test]
    fn recheck_drops_write_already_applied() {
        let store = store();
        let pending = store.prepare("Qty", 7.into()).unwrap();
        assert!(pending.is_change());

        store.set("Qty", 7).unwrap();
        let pending = store.recheck(pending);
        assert!(!pending.is_change());

        let items = store.prepare("Items", vec![json!(1)].into()).unwrap();
        store.set("Items", vec![json!(1)]).unwrap();
        assert!(!store.recheck(items).is_change());
    }

    #[test]
    fn recheck_keeps_write_still_pending() {
        let store = store();
        let pending = store.prepare("Qty", 7.into()).unwrap();
        store.set("Qty", 3).unwrap();

        let pending = store.recheck(pending);
        assert!(pending.is_change());
        store.commit(pending);
        assert_eq!(store.get("Qty"), PropertyValue::from(7));
    }

    #[test]
    fn non_finite_float_is_rejected() {
        let store = store();
        store.set("Price", 5.0).unwrap();

        for value in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
            let err = store.set("Price", value).unwrap_err();
            assert_eq!(err.code(), "BND-002");
            assert!(err.to_string().contains("non-finite float"));
            assert_eq!(store.get("Price"), PropertyValue::from(5.0));
        }
    }

    #[test]
    fn blank_name_is_rejected() {
        let store = store();
        assert_eq!(store.set("", 1).unwrap_err().code(), "BND-001");
    }

    #[test]
    fn would_change_does_not_commit() {
        let store = store();
        assert!(store.would_change("Qty", 9).unwrap());
        assert_eq!(store.get("Qty"), PropertyValue::from(0));
        assert!(!store.contains("Qty"));
    }

    #[test]
    fn list_identity_survives_updates() {
        let store = store();
        store.set("Items", vec![json!(1), json!(2), json!(3)]).unwrap();
        let first = store.get("Items").as_list().unwrap().clone();

        assert!(store.set("Items", vec![json!(4), json!(5)]).unwrap());

        let second = store.get("Items").as_list().unwrap().clone();
        assert!(first.ptr_eq(&second));
        assert_eq!(first.to_vec(), vec![json!(4), json!(5)]);
    }

    #[test]
    fn list_with_same_contents_is_unchanged() {
        let store = store();
        store.set("Items", vec![json!("a")]).unwrap();
        assert!(!store.set("Items", vec![json!("a")]).unwrap());

        let other = ObservableList::from_values(vec![json!("a")]);
        assert!(!store.set("Items", &other).unwrap());
    }

    #[test]
    fn list_set_from_foreign_handle_copies_contents() {
        let store = store();
        let stored = store.get("Items").as_list().unwrap().clone();
        let foreign = ObservableList::from_values(vec![json!(7)]);

        assert!(store.set("Items", &foreign).unwrap());
        assert!(stored.ptr_eq(store.get("Items").as_list().unwrap()));
        assert!(!stored.ptr_eq(&foreign));
        assert_eq!(stored.to_vec(), vec![json!(7)]);
    }

    #[test]
    fn list_null_clears_in_place() {
        let store = store();
        store.set("Items", vec![json!(1)]).unwrap();
        assert!(store.set("Items", PropertyValue::null()).unwrap());
        assert!(store.get("Items").as_list().unwrap().is_empty());
    }

    #[test]
    fn undeclared_properties_store_any_value() {
        let store = store();
        assert!(store.set("Extra", json!({"nested": true})).unwrap());
        assert_eq!(store.get("Extra").to_json(), json!({"nested": true}));
        assert_eq!(store.kind_of("Extra"), PropertyKind::Any);
    }

    #[test]
    fn entries_hold_only_stored_values() {
        let store = store();
        store.set("Qty", 2).unwrap();
        store.set("Extra", "x").unwrap();

        let names: Vec<String> = store.entries().into_iter().map(|(n, _)| n.to_string()).collect();
        assert_eq!(names, vec!["Extra", "Qty"]);
    }

    #[test]
    fn snapshot_lists_declared_then_extra() {
        let store = store();
        store.set("Qty", 2).unwrap();
        store.set("zeta", 1).unwrap();
        store.set("alpha", 1).unwrap();

        let snapshot = store.snapshot();
        let keys: Vec<&str> = snapshot.keys().map(String::as_str).collect();
        assert_eq!(
            keys,
            vec!["Price", "Qty", "Name", "Active", "Items", "alpha", "zeta"]
        );
        assert_eq!(snapshot["Qty"], json!(2));
        assert_eq!(snapshot["Items"], json!([]));
    }
}
