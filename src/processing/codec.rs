//! JSON wire records for ranging measurements
//!
//! One datagram carries one tag's ranges for one tick:
//!
//! ```json
//! {
//!   "tag_id": "T1",
//!   "anchors": [ { "id": "A1", "distance": 4.27, "tof": 1.42e-8 } ],
//!   "true_position": { "x": 4.0, "y": 3.0, "z": 1.5 },
//!   "timestamp_ms": 1723111200000
//! }
//! ```
//!
//! `true_position` and `timestamp_ms` are optional. Older senders used the
//! key `tag` instead of `tag_id`; both are accepted, and a record with
//! neither belongs to tag `"1"`. Firmware that numbers its anchors
//! (`"id": 1`) is read as anchor `"A1"`.

use crate::core::{time_of_flight, Measurement, Point3};
use serde::{Deserialize, Deserializer, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;

/// Wire precision of encoded distances (centimeters)
pub const DEFAULT_DISTANCE_DECIMALS: u32 = 2;

/// Finest precision an f64 distance can carry through rounding
pub const MAX_DISTANCE_DECIMALS: u32 = 15;

/// Tag id of records that carry none
pub const DEFAULT_TAG_ID: &str = "1";

/// Errors produced while encoding or decoding wire records
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("malformed record: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("record has an empty tag id")]
    EmptyTagId,
    #[error("non-finite distance for anchor {anchor}")]
    NonFiniteDistance { anchor: String },
}

/// Range entry for one anchor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireRange {
    #[serde(deserialize_with = "anchor_id")]
    pub id: String,
    /// Meters
    pub distance: f64,
    /// Seconds, informational only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tof: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WirePosition {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

/// Logical schema of one datagram
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireRecord {
    #[serde(alias = "tag", default = "default_tag_id")]
    pub tag_id: String,
    pub anchors: Vec<WireRange>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub true_position: Option<WirePosition>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp_ms: Option<u64>,
}

fn default_tag_id() -> String {
    DEFAULT_TAG_ID.to_string()
}

#[derive(Deserialize)]
#[serde(untagged)]
enum AnchorIdRepr {
    Name(String),
    Number(u64),
}

/// Anchor ids arrive as names or as bare anchor numbers
fn anchor_id<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(match AnchorIdRepr::deserialize(deserializer)? {
        AnchorIdRepr::Name(name) => name,
        AnchorIdRepr::Number(n) => format!("A{}", n),
    })
}

/// Converts measurements to and from JSON datagrams
#[derive(Debug, Clone)]
pub struct MeasurementCodec {
    distance_decimals: Option<u32>,
}

impl Default for MeasurementCodec {
    fn default() -> Self {
        Self {
            distance_decimals: Some(DEFAULT_DISTANCE_DECIMALS),
        }
    }
}

impl MeasurementCodec {
    pub fn new() -> Self {
        Self::default()
    }

    /// Round encoded distances to `decimals` places, `None` keeps full precision
    pub fn with_distance_decimals(mut self, decimals: Option<u32>) -> Self {
        self.distance_decimals = decimals;
        self
    }

    pub fn encode(&self, measurement: &Measurement) -> Result<Vec<u8>, CodecError> {
        let record = self.to_record(measurement)?;
        Ok(serde_json::to_vec(&record)?)
    }

    /// Decode, stamping records without a timestamp with the current time
    pub fn decode(&self, bytes: &[u8]) -> Result<Measurement, CodecError> {
        let now_ms = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0);
        self.decode_at(bytes, now_ms)
    }

    /// Decode with an explicit receive time for records without a timestamp
    pub fn decode_at(&self, bytes: &[u8], received_ms: u64) -> Result<Measurement, CodecError> {
        let record: WireRecord = serde_json::from_slice(bytes)?;
        Self::from_record(record, received_ms)
    }

    pub fn to_record(&self, measurement: &Measurement) -> Result<WireRecord, CodecError> {
        if measurement.tag_id.is_empty() {
            return Err(CodecError::EmptyTagId);
        }

        let mut anchors = Vec::with_capacity(measurement.ranges.len());
        for (id, distance) in &measurement.ranges {
            let distance = self.round_distance(*distance);
            // serde_json writes NaN and infinities as null
            if !distance.is_finite() {
                return Err(CodecError::NonFiniteDistance { anchor: id.clone() });
            }
            anchors.push(WireRange {
                id: id.clone(),
                distance,
                tof: Some(time_of_flight(distance)),
            });
        }

        Ok(WireRecord {
            tag_id: measurement.tag_id.clone(),
            anchors,
            true_position: measurement
                .true_position
                .map(|p| WirePosition { x: p.x, y: p.y, z: p.z }),
            timestamp_ms: Some(measurement.timestamp_ms),
        })
    }

    /// Duplicate anchor ids resolve to the last entry
    pub fn from_record(record: WireRecord, received_ms: u64) -> Result<Measurement, CodecError> {
        if record.tag_id.is_empty() {
            return Err(CodecError::EmptyTagId);
        }

        let mut measurement = Measurement::new(record.tag_id, record.timestamp_ms.unwrap_or(received_ms));
        for range in record.anchors {
            measurement.ranges.insert(range.id, range.distance);
        }
        measurement.true_position = record
            .true_position
            .map(|p| Point3::new(p.x, p.y, p.z));

        Ok(measurement)
    }

    fn round_distance(&self, distance: f64) -> f64 {
        match self.distance_decimals {
            Some(decimals) => {
                let scale = 10f64.powi(decimals as i32);
                (distance * scale).round() / scale
            }
            None => distance,
        }
    }
}
