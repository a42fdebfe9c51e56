pub mod client;
pub mod error;
pub mod model;

pub use client::OrchestrationClient;
pub use error::{BackendError, BackendResult};
pub use model::{HostAction, ListFilter, ResourceKind, ResourceRef};
