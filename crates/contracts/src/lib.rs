//! # Contracts
//!
//! Frozen interface contracts (ICD), defining inter-module data structures and traits.
//! All business crates can only depend on this crate, reverse dependencies are prohibited.
//!
//! ## Alignment Model
//! - Three line-oriented streams (accelerometer, GPS, parking) are aligned by row index,
//!   not by wall-clock time
//! - A `SensorReading` is timestamped when the aggregate row is assembled
//! - `PersistedRecord::id` exists only for rows whose batch committed

mod blueprint;
mod error;
mod forwarder;
mod reading;
mod record;
mod store;
mod stream;

pub use blueprint::*;
pub use error::*;
pub use forwarder::{BatchForwarder, LocalBatchForwarder};
pub use reading::*;
pub use record::*;
pub use store::{LocalRecordStore, RecordStore};
pub use stream::*;
