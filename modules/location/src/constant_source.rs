// SPDX-FileCopyrightText: 2025 All contributors
//
// SPDX-License-Identifier: GPL-2.0-or-later

use crate::{LastKnown, LocationSource, LocationUpdate, SourceError, SourceKind, Subscription};
use async_trait::async_trait;
use common::position::LocationSample;
use std::time::Duration;
use tokio::sync::mpsc::Sender;
use tracing::{debug, warn};
use utm::{lat_lon_to_zone_number, lat_to_zone_letter, to_utm_wgs84, wsg84_utm_to_lat_lon};

#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct UtmPoint {
    northing: f64,
    easting: f64,
}

/// Moves along the configured route at a constant velocity.
///
/// All route points are projected into the UTM zone of the first point.
#[derive(Debug, Clone)]
struct Route {
    points: Vec<UtmPoint>,
    zone: u8,
    zone_letter: char,
    next_point: usize,
    current: UtmPoint,
}

impl Route {
    fn new(positions: &[LocationSample]) -> Result<Self, SourceError> {
        let Some(first) = positions.first() else {
            return Err(SourceError::InvalidConfiguration(
                "positions parameter is empty".to_owned(),
            ));
        };
        let zone = lat_lon_to_zone_number(first.latitude, first.longitude);
        let Some(zone_letter) = lat_to_zone_letter(first.latitude) else {
            return Err(SourceError::InvalidConfiguration(format!(
                "Position lat: {}, long: {} can't converted to UTM zone",
                first.latitude, first.longitude
            )));
        };
        let points: Vec<UtmPoint> = positions
            .iter()
            .map(|pos| {
                let (northing, easting, _) = to_utm_wgs84(pos.latitude, pos.longitude, zone);
                UtmPoint { northing, easting }
            })
            .collect();
        Ok(Route {
            current: points[0],
            next_point: 1 % points.len(),
            points,
            zone,
            zone_letter,
        })
    }

    /// Advances by `distance` meters and returns the new position.
    fn advance(&mut self, mut distance: f64) -> Option<LocationSample> {
        for _ in 0..self.points.len() {
            let target = self.points[self.next_point];
            let dn = target.northing - self.current.northing;
            let de = target.easting - self.current.easting;
            let remaining = (dn * dn + de * de).sqrt();
            if remaining > distance {
                self.current.northing += dn / remaining * distance;
                self.current.easting += de / remaining * distance;
                break;
            }
            self.current = target;
            distance -= remaining;
            self.next_point = (self.next_point + 1) % self.points.len();
        }
        self.position()
    }

    fn position(&self) -> Option<LocationSample> {
        match wsg84_utm_to_lat_lon(
            self.current.easting,
            self.current.northing,
            self.zone,
            self.zone_letter,
        ) {
            Ok((lat, lon)) => Some(LocationSample::new(lat, lon)),
            Err(_) => {
                warn!("Failed to convert UTM point {:?} to latitude/longitude", self.current);
                None
            }
        }
    }
}

/// A simulated location source that reports positions in a constant frequency.
///
/// The reported position travels along the configured route at `velocity`
/// meters per second and starts over at the first point when the route ends.
pub struct ConstantLocationSource {
    name: String,
    kind: SourceKind,
    route: Route,
    velocity: f64,
    interval: Duration,
    last_known: LastKnown,
}

impl ConstantLocationSource {
    pub fn new(
        name: &str,
        kind: SourceKind,
        positions: &[LocationSample],
        velocity: f64,
        interval: Duration,
    ) -> Result<Self, SourceError> {
        if interval.is_zero() {
            return Err(SourceError::InvalidConfiguration(
                "interval must not be zero".to_owned(),
            ));
        }
        Ok(ConstantLocationSource {
            name: name.to_owned(),
            kind,
            route: Route::new(positions)?,
            velocity,
            interval,
            last_known: LastKnown::default(),
        })
    }
}

#[async_trait]
impl LocationSource for ConstantLocationSource {
    fn kind(&self) -> SourceKind {
        self.kind
    }

    fn name(&self) -> &str {
        &self.name
    }

    async fn subscribe(
        &self,
        consumer: Sender<LocationUpdate>,
    ) -> Result<Subscription, SourceError> {
        let mut route = self.route.clone();
        let kind = self.kind;
        let interval = self.interval;
        let distance = self.velocity * interval.as_secs_f64();
        let last_known = self.last_known.clone();
        let handle = tokio::spawn(async move {
            let mut timer = tokio::time::interval(interval);
            let mut sample = route.position();
            loop {
                timer.tick().await;
                if let Some(sample) = sample {
                    last_known.set(sample);
                    let update = LocationUpdate {
                        source: kind,
                        sample,
                    };
                    if consumer.send(update).await.is_err() {
                        debug!("Constant source consumer closed");
                        return;
                    }
                }
                sample = route.advance(distance);
            }
        });
        Ok(Subscription::new(&self.name, handle))
    }

    async fn last_known(&self) -> Option<LocationSample> {
        self.last_known.get()
    }
}
