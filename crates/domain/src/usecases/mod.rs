//! Application use cases / business logic

pub mod aggregate;
pub mod relay_run;

pub use aggregate::{AggregateOutcome, SearchAggregator};
pub use relay_run::{RelayRun, RelayRunConfig, RelayRunError};
