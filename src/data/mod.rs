//! Data module - incident and boundary loading, cleaning and aggregation

pub(crate) mod boundary;
mod loader;
pub(crate) mod processor;

pub use boundary::{BoundaryLoader, BoundaryTable, RegionBoundary};
pub use loader::{IncidentLoader, INCIDENT_ENCODING};
pub use processor::{AggregateRecord, AggregateTable, DataProcessor};
