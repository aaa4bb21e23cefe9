//! Bindery - observable property models and non-overlapping async timers (v0.1)
//!
//! ## Module Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                         MODEL LAYER                          │
//! │  model/     ObservableModel, Bindable (set → notify → cascade)│
//! │  graph/     DependencyGraph (trigger → dependents, cycles)   │
//! └──────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌──────────────────────────────────────────────────────────────┐
//! │                         DATA LAYER                           │
//! │  store/     PropertyStore (DashMap, defaults, diffing)       │
//! │  schema     Schema, PropertyKind (declared kinds + defaults) │
//! │  value/     PropertyValue, ObservableList                    │
//! │  event/     PropertyEvent, Subscribers, Subscription         │
//! └──────────────────────────────────────────────────────────────┘
//!
//! ┌──────────────────────────────────────────────────────────────┐
//! │                         SCHEDULING                           │
//! │  timer/     RescheduledTimer, ExclusiveTicker                │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Responsibilities
//!
//! | Module | Responsibility |
//! |--------|----------------|
//! | [`model`] | Property get/set with "changing"/"changed" notifications |
//! | [`graph`] | Dependency registration with cycle rejection |
//! | [`store`] | Per-model values, schema defaults, change detection |
//! | [`schema`] | Property kinds and default values |
//! | [`value`] | Dynamic values and identity-preserving lists |
//! | [`event`] | Observer lists with RAII unsubscription |
//! | [`timer`] | Self-rescheduling and skip-if-busy timers |
//! | [`config`] | TOML + environment configuration |
//! | [`error`] | Error types with `[BND-NNN]` codes |
//!
//! ## Quick Start
//!
//! ```
//! use bindery::{ObservableModel, Schema};
//!
//! let schema = Schema::builder()
//!     .float("Price")
//!     .integer("Qty")
//!     .float("Total")
//!     .build()
//!     .unwrap();
//! let model = ObservableModel::new(schema);
//! model.add_dependency("Total", ["Price", "Qty"]).unwrap();
//!
//! let _guard = model.subscribe_changed(|event| println!("{} changed", event.property));
//! model.set_property("Price", 10).unwrap(); // "Price changed", "Total changed"
//! ```

// ═══════════════════════════════════════════════════════════════
// MODEL LAYER - Observable models and their dependencies
// ═══════════════════════════════════════════════════════════════
pub mod graph;
pub mod model;

// ═══════════════════════════════════════════════════════════════
// DATA LAYER - Values, storage, notifications
// ═══════════════════════════════════════════════════════════════
pub mod event;
pub mod schema;
pub mod store;
pub mod value;

// ═══════════════════════════════════════════════════════════════
// SCHEDULING - Async timers
// ═══════════════════════════════════════════════════════════════
pub mod timer;

// ═══════════════════════════════════════════════════════════════
// CROSS-CUTTING - Error handling, configuration
// ═══════════════════════════════════════════════════════════════
pub mod config;
pub mod error;

// ═══════════════════════════════════════════════════════════════
// PUBLIC API RE-EXPORTS
// ═══════════════════════════════════════════════════════════════

// Error types
pub use error::{BinderyError, Result};

// Config types
pub use config::{BinderyConfig, CascadeDepth, CycleCheck, ModelOptions, TimerConfig};

// Model types
pub use graph::DependencyGraph;
pub use model::{Bindable, ObservableModel};

// Data types
pub use event::{ChangeCause, ModelId, PropertyEvent, Subscribers, Subscription};
pub use schema::{PropertyKind, Schema, SchemaBuilder};
pub use store::PropertyStore;
pub use value::{ListChange, ObservableList, PropertyValue};

// Timer types
pub use timer::{invoke_exclusive, ExclusiveTicker, RescheduledTimer, TimerCallback, TimerState};

// Token type passed to timer callbacks
pub use tokio_util::sync::CancellationToken;
