// SPDX-FileCopyrightText: 2025 All contributors
//
// SPDX-License-Identifier: GPL-2.0-or-later

use crate::{LastKnown, LocationSource, LocationUpdate, SourceError, SourceKind, Subscription};
use async_trait::async_trait;
use common::position::LocationSample;
use futures::StreamExt;
use gpsd_proto::{self, Tpv};
use std::{io::ErrorKind, net::SocketAddr};
use tokio::{io::AsyncWriteExt, net::TcpStream, sync::mpsc::Sender};
use tokio_util::codec::{Framed, LinesCodec};
use tracing::{debug, error, info, warn};

/// GPSD daemon based high accuracy location source.
///
/// Every subscription opens its own connection to the daemon and enables
/// the JSON watcher mode. Only TPV reports that carry latitude and longitude
/// are delivered.
pub struct GpsdLocationSource {
    address: SocketAddr,
    last_known: LastKnown,
}

impl GpsdLocationSource {
    pub fn new(address: &str) -> Result<Self, SourceError> {
        let address: SocketAddr = address.parse().map_err(|e| {
            SourceError::Io(std::io::Error::new(
                ErrorKind::InvalidInput,
                format!("Invalid gpsd address {address}: {e}"),
            ))
        })?;
        Ok(GpsdLocationSource {
            address,
            last_known: LastKnown::default(),
        })
    }
}

#[async_trait]
impl LocationSource for GpsdLocationSource {
    fn kind(&self) -> SourceKind {
        SourceKind::HighAccuracy
    }

    fn name(&self) -> &str {
        "gpsd"
    }

    async fn subscribe(
        &self,
        consumer: Sender<LocationUpdate>,
    ) -> Result<Subscription, SourceError> {
        let mut stream =
            TcpStream::connect(self.address)
                .await
                .map_err(|e| SourceError::Subscribe {
                    source_name: self.name().to_owned(),
                    reason: e.to_string(),
                })?;
        stream
            .write_all(gpsd_proto::ENABLE_WATCH_CMD.as_bytes())
            .await?;
        info!("Connected to gpsd at {}", self.address);
        let last_known = self.last_known.clone();
        let handle = tokio::spawn(async move { gpsd_reader(stream, last_known, consumer).await });
        Ok(Subscription::new(self.name(), handle))
    }

    async fn last_known(&self) -> Option<LocationSample> {
        self.last_known.get()
    }
}

fn sample_from_tpv(tpv: &Tpv) -> Option<LocationSample> {
    let lat = tpv.lat?;
    let lon = tpv.lon?;
    Some(LocationSample::new(lat, lon))
}

async fn gpsd_reader(stream: TcpStream, last_known: LastKnown, consumer: Sender<LocationUpdate>) {
    let mut framed = Framed::new(stream, LinesCodec::new());
    while let Some(result) = framed.next().await {
        match result {
            Ok(ref line) => {
                let Ok(tpv) = serde_json::from_str::<Tpv>(line) else {
                    continue;
                };
                let Some(sample) = sample_from_tpv(&tpv) else {
                    debug!("Ignoring TPV report without fix");
                    continue;
                };
                last_known.set(sample);
                let update = LocationUpdate {
                    source: SourceKind::HighAccuracy,
                    sample,
                };
                if consumer.send(update).await.is_err() {
                    debug!("gpsd consumer closed, stop reading");
                    return;
                }
            }
            Err(e) => {
                error!("GPSD receive error {e:?}");
            }
        }
    }
    warn!("gpsd connection closed");
}
