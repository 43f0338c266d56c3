// SPDX-FileCopyrightText: 2025 All contributors
//
// SPDX-License-Identifier: GPL-2.0-or-later

use chrono::{SubsecRound, Utc};
use common::{position::LocationSample, tracked_position::TrackedPosition};
use document_store::{RemoteDocumentStore, StoreError, http_store::HttpDocumentStore};
use std::time::Duration;
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::TcpListener,
    task::JoinHandle,
    time::timeout,
};

const TIMEOUT_MS: u64 = 2000;

/// A request as seen by the [`serve_once`] responder.
struct ReceivedRequest {
    request_line: String,
    body: String,
}

/// Accepts one connection, answers it with `status` and returns the request.
async fn serve_once(status: &'static str) -> (String, JoinHandle<ReceivedRequest>) {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind http test server");
    let base_url = format!("http://{}", listener.local_addr().unwrap());
    let handle = tokio::spawn(async move {
        let (mut client, _) = listener.accept().await.expect("Client connection failed");
        let mut raw = Vec::new();
        let mut buf = [0u8; 1024];
        let header_end = loop {
            let read = client.read(&mut buf).await.expect("Failed to read request");
            assert!(read > 0, "Connection closed before request was complete");
            raw.extend_from_slice(&buf[..read]);
            if let Some(pos) = raw.windows(4).position(|w| w == b"\r\n\r\n") {
                break pos + 4;
            }
        };
        let head = String::from_utf8_lossy(&raw[..header_end]).to_string();
        let content_length = head
            .lines()
            .filter_map(|line| line.split_once(':'))
            .find(|(name, _)| name.trim().eq_ignore_ascii_case("content-length"))
            .map(|(_, value)| value.trim().parse::<usize>().unwrap())
            .unwrap_or(0);
        while raw.len() < header_end + content_length {
            let read = client.read(&mut buf).await.expect("Failed to read body");
            assert!(read > 0, "Connection closed before body was complete");
            raw.extend_from_slice(&buf[..read]);
        }
        let response =
            format!("HTTP/1.1 {status}\r\ncontent-length: 0\r\nconnection: close\r\n\r\n");
        client
            .write_all(response.as_bytes())
            .await
            .expect("Failed to write response");
        ReceivedRequest {
            request_line: head.lines().next().unwrap_or_default().to_owned(),
            body: String::from_utf8_lossy(&raw[header_end..header_end + content_length])
                .to_string(),
        }
    });
    (base_url, handle)
}

async fn received(handle: JoinHandle<ReceivedRequest>) -> ReceivedRequest {
    timeout(Duration::from_millis(TIMEOUT_MS), handle)
        .await
        .expect("Request not received in time")
        .expect("Responder task failed")
}

#[test]
fn build_document_url_with_encoded_key() {
    let store = HttpDocumentStore::new("http://localhost:8080/v1/", "ambulances").unwrap();
    let url = store.document_url("Pixel 7_ABC").unwrap();
    assert_eq!(
        url.as_str(),
        "http://localhost:8080/v1/ambulances/Pixel%207_ABC"
    );
}

#[test]
fn reject_invalid_base_url() {
    assert!(matches!(
        HttpDocumentStore::new("not a url", "ambulances"),
        Err(StoreError::InvalidUrl(_))
    ));
}

#[tokio::test]
#[test_log::test]
async fn upsert_puts_json_document() {
    let (base_url, handle) = serve_once("200 OK").await;
    let store = HttpDocumentStore::new(&base_url, "ambulances").unwrap();
    let document = TrackedPosition::new(
        "Alice",
        LocationSample::new(10.0, 20.0),
        Utc::now().trunc_subsecs(3),
    );

    store.upsert("device_1", &document).await.unwrap();

    let request = received(handle).await;
    assert_eq!(request.request_line, "PUT /ambulances/device_1 HTTP/1.1");
    assert_eq!(TrackedPosition::from_json(&request.body).unwrap(), document);
}

#[tokio::test]
#[test_log::test]
async fn delete_treats_missing_document_as_success() {
    let (base_url, handle) = serve_once("404 Not Found").await;
    let store = HttpDocumentStore::new(&base_url, "ambulances").unwrap();

    store.delete("device_1").await.unwrap();

    let request = received(handle).await;
    assert_eq!(request.request_line, "DELETE /ambulances/device_1 HTTP/1.1");
}

#[tokio::test]
#[test_log::test]
async fn report_rejected_upsert() {
    let (base_url, handle) = serve_once("503 Service Unavailable").await;
    let store = HttpDocumentStore::new(&base_url, "ambulances").unwrap();
    let document = TrackedPosition::new(
        "Alice",
        LocationSample::new(1.0, 2.0),
        Utc::now().trunc_subsecs(3),
    );

    let result = store.upsert("device_1", &document).await;

    assert!(matches!(result, Err(StoreError::Rejected { status: 503 })));
    received(handle).await;
}
