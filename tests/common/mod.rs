//! Shared helpers for integration tests

#![allow(dead_code)]

use std::sync::Arc;

use bindery::{ObservableModel, PropertyEvent, Schema, Subscription};
use parking_lot::Mutex;

/// Install a test-writer subscriber once (`RUST_LOG=bindery=trace` to see output)
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Price/Qty/Total/Items model with `Total ← [Price, Qty]`
pub fn invoice_model() -> ObservableModel {
    let schema = Schema::builder()
        .float("Price")
        .integer("Qty")
        .float("Total")
        .list("Items")
        .build()
        .unwrap();
    let model = ObservableModel::new(schema);
    model.add_dependency("Total", ["Price", "Qty"]).unwrap();
    model
}

/// Records every event as `"<channel>:<property>"`
pub struct EventLog {
    entries: Arc<Mutex<Vec<String>>>,
    _changing: Subscription,
    _changed: Subscription,
}

impl EventLog {
    pub fn attach(model: &ObservableModel) -> Self {
        let entries = Arc::new(Mutex::new(Vec::new()));
        let e1 = Arc::clone(&entries);
        let changing = model.subscribe_changing(move |e: &PropertyEvent| {
            e1.lock().push(format!("changing:{}", e.property));
        });
        let e2 = Arc::clone(&entries);
        let changed = model.subscribe_changed(move |e: &PropertyEvent| {
            e2.lock().push(format!("changed:{}", e.property));
        });
        Self {
            entries,
            _changing: changing,
            _changed: changed,
        }
    }

    pub fn take(&self) -> Vec<String> {
        std::mem::take(&mut *self.entries.lock())
    }

    /// Only the "changed" entries, without the channel prefix
    pub fn take_changed(&self) -> Vec<String> {
        self.take()
            .into_iter()
            .filter_map(|e| e.strip_prefix("changed:").map(str::to_string))
            .collect()
    }
}
