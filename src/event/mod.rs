//! Event Module - synchronous observer channels
//!
//! Key types:
//! - `Subscribers<E>`: ordered observer list, snapshot-then-deliver
//! - `Subscription`: RAII guard, unsubscribes on drop
//! - `PropertyEvent`: payload of the "changing"/"changed" channels
//! - `ChangeCause`: direct set, explicit notify, or cascade from a trigger

mod property;
mod subscribers;

pub use property::{ChangeCause, ModelId, PropertyEvent};
pub use subscribers::{Subscribers, Subscription};
