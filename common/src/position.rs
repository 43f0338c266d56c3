// SPDX-FileCopyrightText: 2025 All contributors
//
// SPDX-License-Identifier: GPL-2.0-or-later

use serde::{Deserialize, Serialize};

/// A single position reported by a location source.
///
/// Latitude values range from -90.0 to 90.0, and longitude values range
/// from -180.0 to 180.0, both in decimal degrees. No altitude, accuracy or
/// heading is carried.
///
/// # Example
///
/// ```rust
/// use common::position::LocationSample;
///
/// let sample = LocationSample::new(52.5200, 13.4050);
/// assert_eq!(sample.latitude, 52.5200);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LocationSample {
    pub latitude: f64,
    pub longitude: f64,
}

impl LocationSample {
    /// Creates a new [`LocationSample`] with the given latitude and longitude.
    pub fn new(latitude: f64, longitude: f64) -> Self {
        LocationSample {
            latitude,
            longitude,
        }
    }

    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}

/// The geographic point stored in the remote document.
///
/// Serialized in the compact `{ "lat": .., "lon": .. }` form the document
/// store expects.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    #[serde(rename = "lat")]
    pub latitude: f64,
    #[serde(rename = "lon")]
    pub longitude: f64,
}

impl From<LocationSample> for GeoPoint {
    fn from(sample: LocationSample) -> Self {
        GeoPoint {
            latitude: sample.latitude,
            longitude: sample.longitude,
        }
    }
}
