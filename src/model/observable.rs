//! ObservableModel - property store + dependency graph + notification channels
//!
//! A successful `set_property` runs, in order and on the caller's thread:
//! 1. "changing" for the property (only when the value actually differs)
//! 2. commit to the store
//! 3. "changed" for the property
//! 4. "changed" for each dependent (cascade)
//!
//! Cascaded dependents never receive "changing". A "changing" observer may
//! write back into the model; the pending value is diffed again after step 1
//! and steps 2-4 are skipped when it no longer differs.

use std::sync::Arc;

use parking_lot::RwLock;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use tracing::{debug, trace};

use crate::config::{BinderyConfig, CascadeDepth, ModelOptions};
use crate::error::{check_name, BinderyError, Result};
use crate::event::{ChangeCause, ModelId, PropertyEvent, Subscribers, Subscription};
use crate::graph::DependencyGraph;
use crate::schema::Schema;
use crate::store::PropertyStore;
use crate::value::PropertyValue;

/// Observable property model
///
/// `ObservableModel` is `Send + Sync`, but it is **not safe for concurrent
/// writers without external synchronization**: two `set_property` calls racing
/// on the same instance get no ordering guarantee between their diff, commit
/// and notification steps.
#[derive(Debug)]
pub struct ObservableModel {
    id: ModelId,
    store: PropertyStore,
    graph: RwLock<DependencyGraph>,
    options: ModelOptions,
    changing: Subscribers<PropertyEvent>,
    changed: Subscribers<PropertyEvent>,
}

impl ObservableModel {
    /// Model with default options (direct cycle check, one-level cascade)
    pub fn new(schema: impl Into<Arc<Schema>>) -> Self {
        Self::with_options(schema, ModelOptions::default())
    }

    pub fn with_options(schema: impl Into<Arc<Schema>>, options: ModelOptions) -> Self {
        Self {
            id: ModelId::next(),
            store: PropertyStore::new(schema),
            graph: RwLock::new(DependencyGraph::with_cycle_check(options.cycle_check)),
            options,
            changing: Subscribers::new(),
            changed: Subscribers::new(),
        }
    }

    /// Model using the `[model]` section of a loaded config
    pub fn from_config(schema: impl Into<Arc<Schema>>, config: &BinderyConfig) -> Self {
        Self::with_options(schema, config.model)
    }

    /// Identity carried as `sender` by every event of this model
    pub fn id(&self) -> ModelId {
        self.id
    }

    pub fn options(&self) -> ModelOptions {
        self.options
    }

    pub fn schema(&self) -> &Arc<Schema> {
        self.store.schema()
    }

    // ═══════════════════════════════════════════════════════════════
    // READ
    // ═══════════════════════════════════════════════════════════════

    /// Current value of `name`, or its kind default when never set
    pub fn get_property(&self, name: &str) -> Result<PropertyValue> {
        check_name(name)?;
        Ok(self.store.get(name))
    }

    /// Typed read through serde
    ///
    /// ```
    /// use bindery::{ObservableModel, Schema};
    ///
    /// let model = ObservableModel::new(Schema::builder().integer("Qty").build().unwrap());
    /// model.set_property("Qty", 3).unwrap();
    /// assert_eq!(model.get_as::<u32>("Qty").unwrap(), 3);
    /// ```
    pub fn get_as<T: DeserializeOwned>(&self, name: &str) -> Result<T> {
        let value = self.get_property(name)?.to_json();
        serde_json::from_value(value).map_err(|source| BinderyError::Deserialize {
            property: name.to_string(),
            source,
        })
    }

    /// Every declared property plus every stored one, defaults filled in
    pub fn snapshot(&self) -> Map<String, Value> {
        self.store.snapshot()
    }

    // ═══════════════════════════════════════════════════════════════
    // WRITE
    // ═══════════════════════════════════════════════════════════════

    /// Set `name` to `value`; returns whether anything changed
    ///
    /// An unchanged value is a silent no-op: no event fires at all.
    pub fn set_property(&self, name: &str, value: impl Into<PropertyValue>) -> Result<bool> {
        let pending = self.store.prepare(name, value.into())?;
        if !pending.is_change() {
            trace!(property = %pending.name, "Value unchanged, no notification");
            return Ok(false);
        }

        let property = Arc::clone(&pending.name);
        self.changing.notify(&self.event(&property, ChangeCause::Set));

        // A "changing" observer may already have written this value
        let pending = self.store.recheck(pending);
        if !pending.is_change() {
            trace!(property = %property, "Value written during changing, no commit");
            return Ok(false);
        }
        self.store.commit(pending);
        self.raise_changed(&property, ChangeCause::Set);
        Ok(true)
    }

    /// Raise "changed" (plus cascade) for a property whose value lives elsewhere
    pub fn notify_changed(&self, name: &str) -> Result<()> {
        check_name(name)?;
        let property = self.store.schema().intern(name);
        self.raise_changed(&property, ChangeCause::Notify);
        Ok(())
    }

    // ═══════════════════════════════════════════════════════════════
    // DEPENDENCIES
    // ═══════════════════════════════════════════════════════════════

    /// Declare that `dependent` changes whenever one of `triggers` changes
    ///
    /// Chainable; meant for model construction, where a cycle is a bug:
    ///
    /// ```
    /// use bindery::{ObservableModel, Schema};
    ///
    /// let schema = Schema::builder().any("MyPropertyOne").any("MyPropertyTwo").build().unwrap();
    /// let model = ObservableModel::new(schema);
    /// let result = model
    ///     .add_dependency("MyPropertyOne", ["MyPropertyTwo"])
    ///     .and_then(|m| m.add_dependency("MyPropertyTwo", ["MyPropertyOne"]));
    /// assert!(result.is_err());
    /// ```
    pub fn add_dependency<I>(&self, dependent: &str, triggers: I) -> Result<&Self>
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        self.graph.write().add_dependency(dependent, triggers)?;
        Ok(self)
    }

    /// Direct dependents of `trigger`, in registration order
    pub fn dependents_of(&self, trigger: &str) -> Vec<Arc<str>> {
        self.graph.read().dependents_of(trigger).to_vec()
    }

    /// A copy of the dependency graph
    pub fn dependency_graph(&self) -> DependencyGraph {
        self.graph.read().clone()
    }

    // ═══════════════════════════════════════════════════════════════
    // SUBSCRIPTIONS
    // ═══════════════════════════════════════════════════════════════

    /// Observe "changing" (raised before the new value is stored)
    pub fn subscribe_changing(
        &self,
        callback: impl Fn(&PropertyEvent) + Send + Sync + 'static,
    ) -> Subscription {
        self.changing.subscribe(callback)
    }

    /// Observe "changed" (raised after commit, and for every cascaded dependent)
    pub fn subscribe_changed(
        &self,
        callback: impl Fn(&PropertyEvent) + Send + Sync + 'static,
    ) -> Subscription {
        self.changed.subscribe(callback)
    }

    fn event(&self, property: &Arc<str>, cause: ChangeCause) -> PropertyEvent {
        PropertyEvent {
            sender: self.id,
            property: Arc::clone(property),
            cause,
        }
    }

    fn raise_changed(&self, property: &Arc<str>, cause: ChangeCause) {
        trace!(property = %property, cause = ?cause, "Property changed");
        self.changed.notify(&self.event(property, cause));

        // Graph lock released before any observer runs
        let dependents = {
            let graph = self.graph.read();
            match self.options.cascade {
                CascadeDepth::Direct => graph.dependents_of(property).to_vec(),
                CascadeDepth::Transitive => graph.transitive_dependents(property),
            }
        };

        if dependents.is_empty() {
            return;
        }

        debug!(
            trigger = %property,
            count = dependents.len(),
            "Cascading change to dependents"
        );
        for dependent in dependents {
            let cause = ChangeCause::Cascade {
                trigger: Arc::clone(property),
            };
            trace!(property = %dependent, trigger = %property, "Dependent changed");
            self.changed.notify(&self.event(&dependent, cause));
        }
    }
}
