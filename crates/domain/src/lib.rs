//! keyword-relay domain crate
//!
//! This crate contains the core pipeline logic following hexagonal architecture:
//! - `model`: Domain entities and the durable history record
//! - `ports`: Trait definitions for external collaborators (adapters)
//! - `policy`: Filtering, ordering, and publish-delay policy
//! - `transform`: Pure text rewriting for relays
//! - `usecases`: Search aggregation and the relay run

pub mod model;
pub mod policy;
pub mod ports;
pub mod transform;
pub mod usecases;

pub use model::*;
pub use ports::*;
