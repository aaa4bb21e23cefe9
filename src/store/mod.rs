//! Store Module - property value storage
//!
//! - `PropertyStore`: DashMap-backed values with schema defaults

mod property_store;

pub use property_store::PropertyStore;
