//! Ingress and persisted record shapes
//!
//! `ProcessedReading` is what a forwarder puts on the wire; `PersistedRecord` is what the
//! store hands back (and what subscribers receive) once the batch has committed.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Accelerometer, ClassifiedReading, GpsPoint, SurfaceState};

/// Ingress record (one element of a forwarded batch)
///
/// Parking data is not part of the persisted layout and is not transmitted.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessedReading {
    /// Classified surface state
    pub road_state: SurfaceState,

    /// Accelerometer sample
    pub accelerometer: Accelerometer,

    /// Vehicle position
    pub gps: GpsPoint,

    /// Capture time (ISO-8601 on the wire)
    pub timestamp: DateTime<Utc>,
}

impl From<&ClassifiedReading> for ProcessedReading {
    fn from(classified: &ClassifiedReading) -> Self {
        Self {
            road_state: classified.surface_state,
            accelerometer: classified.reading.accelerometer,
            gps: classified.reading.gps,
            timestamp: classified.reading.timestamp,
        }
    }
}

/// Persisted record
///
/// Created exactly once, at commit. `id` is assigned by storage and increases
/// monotonically.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedRecord {
    pub id: i64,
    pub road_state: SurfaceState,
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub latitude: f64,
    pub longitude: f64,
    pub timestamp: DateTime<Utc>,
}

impl PersistedRecord {
    /// Attach a storage id to an ingress record
    pub fn from_reading(id: i64, reading: &ProcessedReading) -> Self {
        Self {
            id,
            road_state: reading.road_state,
            x: reading.accelerometer.x,
            y: reading.accelerometer.y,
            z: reading.accelerometer.z,
            latitude: reading.gps.lat,
            longitude: reading.gps.lon,
            timestamp: reading.timestamp,
        }
    }
}
