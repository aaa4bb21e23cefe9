//! Model Module - observable property models
//!
//! - `ObservableModel`: store + dependency graph + "changing"/"changed" channels
//! - `Bindable`: trait giving derived models the property API

mod bindable;
mod observable;

pub use bindable::Bindable;
pub use observable::ObservableModel;
