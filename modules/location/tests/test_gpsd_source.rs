// SPDX-FileCopyrightText: 2025 All contributors
//
// SPDX-License-Identifier: GPL-2.0-or-later

use common::position::LocationSample;
use location::{
    LocationSource, LocationUpdate, SourceError, SourceKind, gpsd_source::GpsdLocationSource,
};
use std::time::Duration;
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::{TcpListener, TcpStream},
    sync::mpsc,
    time::timeout,
};

const TIMEOUT_MS: u64 = 100;

const TPV_MSG: &str = "{\"class\":\"TPV\",\"time\":\"2005-06-08T10:34:48.283Z\",\"lat\":1.0,\"lon\":2.0,\"speed\":22.0,\"mode\":3}\n";

const TPV_NO_FIX_MSG: &str = "{\"class\":\"TPV\",\"time\":\"2005-06-08T10:34:47.283Z\",\"mode\":1}\n";

async fn test_setup() -> (
    GpsdLocationSource,
    location::Subscription,
    TcpStream,
    mpsc::Receiver<LocationUpdate>,
) {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind gpsd test server");
    let addr = listener.local_addr().unwrap().to_string();
    let source = GpsdLocationSource::new(&addr).expect("Failed to create gpsd source");
    let (sender, receiver) = mpsc::channel(8);
    let subscription = source
        .subscribe(sender)
        .await
        .expect("Failed to subscribe to gpsd source");
    let (client, _) = timeout(Duration::from_millis(TIMEOUT_MS), listener.accept())
        .await
        .unwrap_or_else(|_| panic!("No client connected within {TIMEOUT_MS}ms"))
        .expect("Client connection failed");
    (source, subscription, client, receiver)
}

#[tokio::test]
#[test_log::test]
async fn enable_gpsd_watch_on_subscribe() {
    let (_source, _subscription, mut client, _) = test_setup().await;
    let mut buf = vec![0; gpsd_proto::ENABLE_WATCH_CMD.len()];
    timeout(Duration::from_millis(TIMEOUT_MS), client.read_exact(&mut buf))
        .await
        .unwrap_or_else(|_| panic!("Enable command not received in {TIMEOUT_MS} ms"))
        .expect("Failed to read enable command");
    assert_eq!(
        std::str::from_utf8(&buf).expect("Enable command is not a valid string"),
        gpsd_proto::ENABLE_WATCH_CMD
    );
}

#[tokio::test]
#[test_log::test]
async fn deliver_position_and_cache_last_known() {
    let (source, _subscription, mut client, mut receiver) = test_setup().await;
    assert_eq!(source.last_known().await, None);
    client
        .write_all(TPV_MSG.as_bytes())
        .await
        .expect("Failed to send TPV msg");

    let update = timeout(Duration::from_millis(TIMEOUT_MS), receiver.recv())
        .await
        .expect("Failed to receive position in required time")
        .unwrap();
    assert_eq!(update.source, SourceKind::HighAccuracy);
    assert_eq!(update.sample, LocationSample::new(1.0, 2.0));
    assert_eq!(source.last_known().await, Some(LocationSample::new(1.0, 2.0)));
}

#[tokio::test]
#[test_log::test]
async fn skip_reports_without_fix() {
    let (_source, _subscription, mut client, mut receiver) = test_setup().await;
    client
        .write_all(format!("{TPV_NO_FIX_MSG}{TPV_MSG}").as_bytes())
        .await
        .expect("Failed to send TPV msgs");

    let update = timeout(Duration::from_millis(TIMEOUT_MS), receiver.recv())
        .await
        .expect("Failed to receive position in required time")
        .unwrap();
    assert_eq!(update.sample, LocationSample::new(1.0, 2.0));
}

#[tokio::test]
#[test_log::test]
async fn report_subscribe_error_without_daemon() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap().to_string();
    drop(listener);
    let source = GpsdLocationSource::new(&addr).unwrap();
    let (sender, _receiver) = mpsc::channel(1);
    let result = source.subscribe(sender).await;
    assert!(matches!(result, Err(SourceError::Subscribe { .. })));
}

#[test]
fn reject_invalid_address() {
    assert!(GpsdLocationSource::new("not an address").is_err());
}
