//! Graph Module - property dependency structure
//!
//! - `DependencyGraph`: trigger → dependents edges with cycle rejection

mod dependency;

pub use dependency::{DependencyGraph, DependentVec};
