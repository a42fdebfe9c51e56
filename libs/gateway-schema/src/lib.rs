//! Schema registry and model marshaller.
//!
//! A [`SchemaRegistry`] holds the resource contract (field tables, enum domains)
//! and is built in two passes: every name is registered first, then all nested
//! references are resolved. Once built it is immutable and shared read-only.
//!
//! The [`Marshaller`] walks that table to turn wire JSON into [`Resource`] trees
//! and back, so there is one engine for every resource kind instead of one
//! hand-written model per kind.

pub mod document;
pub mod marshal;
pub mod registry;
pub mod schema;
pub mod value;

pub use document::{ContractDocument, DocumentError};
pub use marshal::Marshaller;
pub use registry::{RegistryError, SchemaRegistry, SchemaRegistryBuilder};
pub use schema::{EnumDomain, FieldSchema, FieldType, Primitive, ResourceSchema};
pub use value::{Resource, Value};
