//! Common types and utilities shared across the GeotoolKit OGC crates.

pub mod bbox;
pub mod crs;
pub mod envelope;
pub mod error;
pub mod kvp;
pub mod time;
pub mod xml;

pub use bbox::BoundingBox;
pub use crs::{AxisOrder, CrsCode};
pub use envelope::Envelope;
pub use error::{OgcError, OgcResult};
pub use kvp::QueryParams;
pub use time::{TimeDimensionValues, TimeRange, TimeSpec};
