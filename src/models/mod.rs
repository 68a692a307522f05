//! Models module for the SDK
//!
//! Defines the data structures shared by every layer of the query engine:
//! node identity, the repository's item records, raw property values and
//! their coerced forms.

pub mod identity;
pub mod item;
pub mod property;
pub mod value;

pub use identity::{ContentKind, NodeId};
pub use item::{ItemRecord, RECORD_DATE_FORMAT};
pub use property::PropertyValue;
pub use value::{CoercedValue, ValueKind, XmlElement, XmlValue};
