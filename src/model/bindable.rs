//! Bindable - the trait derived models implement to expose their inner model

use serde::de::DeserializeOwned;

use crate::error::Result;
use crate::event::{PropertyEvent, Subscription};
use crate::model::ObservableModel;
use crate::value::PropertyValue;

/// A type built around an [`ObservableModel`]
///
/// Implementors supply [`Bindable::model`] and get the property API as
/// provided methods. Typed accessors are usually written on top of it:
///
/// ```
/// use bindery::{Bindable, ObservableModel, Result, Schema};
///
/// struct Invoice {
///     model: ObservableModel,
/// }
///
/// impl Bindable for Invoice {
///     fn model(&self) -> &ObservableModel {
///         &self.model
///     }
/// }
///
/// impl Invoice {
///     fn new() -> Result<Self> {
///         let schema = Schema::builder().float("Price").integer("Qty").float("Total").build()?;
///         let invoice = Self { model: ObservableModel::new(schema) };
///         invoice.add_dependency("Total", ["Price", "Qty"])?;
///         Ok(invoice)
///     }
///
///     fn total(&self) -> f64 {
///         self.get_as::<f64>("Price").unwrap_or_default() * self.get_as::<f64>("Qty").unwrap_or_default()
///     }
/// }
///
/// let invoice = Invoice::new().unwrap();
/// invoice.set_property("Price", 4.0).unwrap();
/// invoice.set_property("Qty", 2).unwrap();
/// assert_eq!(invoice.total(), 8.0);
/// ```
pub trait Bindable {
    fn model(&self) -> &ObservableModel;

    fn get_property(&self, name: &str) -> Result<PropertyValue> {
        self.model().get_property(name)
    }

    fn get_as<T: DeserializeOwned>(&self, name: &str) -> Result<T> {
        self.model().get_as(name)
    }

    fn set_property(&self, name: &str, value: impl Into<PropertyValue>) -> Result<bool> {
        self.model().set_property(name, value)
    }

    fn notify_changed(&self, name: &str) -> Result<()> {
        self.model().notify_changed(name)
    }

    /// Register a dependency; returns `self` so calls chain with `and_then`
    fn add_dependency<I>(&self, dependent: &str, triggers: I) -> Result<&Self>
    where
        Self: Sized,
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        self.model().add_dependency(dependent, triggers)?;
        Ok(self)
    }

    fn subscribe_changing(
        &self,
        callback: impl Fn(&PropertyEvent) + Send + Sync + 'static,
    ) -> Subscription {
        self.model().subscribe_changing(callback)
    }

    fn subscribe_changed(
        &self,
        callback: impl Fn(&PropertyEvent) + Send + Sync + 'static,
    ) -> Subscription {
        self.model().subscribe_changed(callback)
    }
}

impl Bindable for ObservableModel {
    fn model(&self) -> &ObservableModel {
        self
    }
}
