//! Streaming XML input shared by normalization and statistics

pub mod events;

pub use events::{Attribute, Namespace, XmlEvent, XmlEventReader};
