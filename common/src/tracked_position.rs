// SPDX-FileCopyrightText: 2025 All contributors
//
// SPDX-License-Identifier: GPL-2.0-or-later

use crate::{
    position::{GeoPoint, LocationSample},
    serde::timestamp,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The remote document kept for every tracked device.
///
/// There is exactly one document per device identity. Each upsert replaces
/// the whole document, so all fields are always sent together.
///
/// Wire shape:
///
/// ```json
/// { "name": "Alice", "location": { "lat": 10.0, "lon": 20.0 }, "lastupdate": "2025-01-01T00:00:00.000Z" }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackedPosition {
    #[serde(rename = "name")]
    pub display_name: String,
    #[serde(rename = "location")]
    pub position: GeoPoint,
    #[serde(rename = "lastupdate", with = "timestamp")]
    pub last_update: DateTime<Utc>,
}

impl TrackedPosition {
    pub fn new(display_name: &str, sample: LocationSample, last_update: DateTime<Utc>) -> Self {
        TrackedPosition {
            display_name: display_name.to_owned(),
            position: sample.into(),
            last_update,
        }
    }

    /// Shapes a document stamped with the current time.
    pub fn now(display_name: &str, sample: LocationSample) -> Self {
        TrackedPosition::new(display_name, sample, Utc::now())
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}
