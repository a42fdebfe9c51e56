//! Failure taxonomy for the gateway.
//!
//! Every component below the HTTP surface (marshaller, dispatcher, handlers)
//! reports problems as a [`Failure`]. The catalog in [`FailureKind::def`] is the
//! single place where a kind becomes an HTTP status; it is an exhaustive `match`,
//! so a kind without a mapping is a compile error rather than a runtime fallback.

mod catalog;
mod failure;
mod response;

pub use catalog::{ErrDef, FailureKind};
pub use failure::{Failure, FailureResult};
pub use response::{ErrorBody, FailureResponse, INTERNAL_MESSAGE};
