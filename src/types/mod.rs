//! Core data types for the travel graph.
//!
//! Defines fundamental types used throughout the system:
//! - `PersonRecord`, `HotelStayRecord`, `FlightRecord`, `BusTripRecord`: normalized source rows
//! - `PropertyValue` / `Params`: typed values bound into graph statements
//! - `Row`: one result row returned by the graph store
//! - `GraphRagError`: error types for all operations
//! - `Result`: convenient result type alias

pub mod error;
pub mod record;
pub mod value;

pub use error::{ErrorKind, GraphRagError, RecordSet, Result};
pub use record::{BusTripRecord, FlightRecord, HotelStayRecord, PersonRecord};
pub use value::{Params, PropertyValue, Row};
