//! Integration tests for downloads, preview fetches, and multipart uploads.

mod support;

use std::fs;
use std::time::Duration;

use freesound_core::{ClientError, License, PreviewQuality, SoundDescription};
use serde_json::json;
use support::authorized_client;
use support::socket_guard::start_mock_server_or_skip;
use tempfile::TempDir;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use url::Url;
use wiremock::matchers::{body_string_contains, header, header_regex, method, path};
use wiremock::{Mock, ResponseTemplate};

#[tokio::test]
async fn test_download_sound_creates_parents_and_overwrites() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    Mock::given(method("GET"))
        .and(path("/apiv2/sounds/7/download/"))
        .and(header("authorization", "Bearer A"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"RIFF-new-bytes".to_vec()))
        .mount(&server)
        .await;

    let tempdir = TempDir::new().unwrap();
    let destination = tempdir.path().join("nested").join("dir").join("kick.wav");
    fs::create_dir_all(destination.parent().unwrap()).unwrap();
    fs::write(&destination, b"old contents that are longer").unwrap();

    let client = authorized_client(&server);
    let written = client.download_sound(7, &destination).await.unwrap();

    assert_eq!(written, destination);
    assert_eq!(fs::read(&destination).unwrap(), b"RIFF-new-bytes");
    assert!(!destination.with_file_name("kick.wav.part").exists());
}

#[tokio::test]
async fn test_download_pack_into_missing_directories() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    Mock::given(path("/apiv2/packs/4/download/"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"PK\x03\x04zip".to_vec()))
        .mount(&server)
        .await;

    let tempdir = TempDir::new().unwrap();
    let destination = tempdir.path().join("a").join("b").join("pack.zip");

    let client = authorized_client(&server);
    client.download_pack(4, &destination).await.unwrap();
    assert_eq!(fs::read(&destination).unwrap(), b"PK\x03\x04zip");
}

#[tokio::test]
async fn test_failed_download_leaves_existing_file_alone() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    Mock::given(path("/apiv2/sounds/404/download/"))
        .respond_with(ResponseTemplate::new(404).set_body_string(r#"{"detail":"Not found."}"#))
        .mount(&server)
        .await;

    let tempdir = TempDir::new().unwrap();
    let destination = tempdir.path().join("keep.wav");
    fs::write(&destination, b"keep me").unwrap();

    let client = authorized_client(&server);
    let result = client.download_sound(404, &destination).await;

    assert!(matches!(result, Err(ClientError::Api { status: 404, .. })));
    assert_eq!(fs::read(&destination).unwrap(), b"keep me");
    assert_eq!(fs::read_dir(tempdir.path()).unwrap().count(), 1);
}

#[tokio::test]
async fn test_download_preview_omits_bearer_header() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    let preview_path = "/cdn/previews/10_hq.mp3";
    Mock::given(path("/apiv2/sounds/10/"))
        .and(header("authorization", "Bearer A"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": 10,
            "previews": {
                "preview-lq-mp3": format!("{}/cdn/previews/10_lq.mp3", server.uri()),
                "preview-hq-mp3": format!("{}{preview_path}", server.uri())
            }
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(preview_path))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"ID3mp3".to_vec()))
        .expect(1)
        .mount(&server)
        .await;

    let tempdir = TempDir::new().unwrap();
    let destination = tempdir.path().join("preview.mp3");
    let client = authorized_client(&server);
    client
        .download_preview(10, PreviewQuality::High, &destination)
        .await
        .unwrap();

    assert_eq!(fs::read(&destination).unwrap(), b"ID3mp3");
    let requests = server.received_requests().await.unwrap();
    let preview_request = requests
        .iter()
        .find(|request| request.url.path() == preview_path)
        .unwrap();
    assert!(preview_request.headers.get("authorization").is_none());
}

#[tokio::test]
async fn test_upload_sound_streams_multipart_file_and_fields() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    Mock::given(method("POST"))
        .and(path("/apiv2/sounds/upload/"))
        .and(header("authorization", "Bearer A"))
        .and(header_regex("content-type", "^multipart/form-data; boundary="))
        .and(body_string_contains(
            r#"name="audiofile"; filename="kick.wav""#,
        ))
        .and(body_string_contains("RIFF-upload-payload"))
        .and(body_string_contains("kick-drum 808"))
        .and(body_string_contains("Creative Commons 0"))
        .respond_with(
            ResponseTemplate::new(201).set_body_json(json!({"id": 555, "detail": "Audio file successfully uploaded"})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let tempdir = TempDir::new().unwrap();
    let source = tempdir.path().join("kick.wav");
    fs::write(&source, b"RIFF-upload-payload").unwrap();

    let client = authorized_client(&server);
    let description = SoundDescription::new("A kick", License::CreativeCommons0)
        .tags(&["kick drum", "808"]);
    let reply = client.upload_sound(&source, Some(&description)).await.unwrap();

    assert_eq!(reply["id"], 555);
    server.verify().await;
}

#[tokio::test]
async fn test_upload_missing_file_fails_before_any_request() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    let tempdir = TempDir::new().unwrap();
    let client = authorized_client(&server);

    let result = client
        .upload_sound(&tempdir.path().join("missing.wav"), None)
        .await;

    assert!(matches!(result, Err(ClientError::Transfer { .. })));
    assert!(server.received_requests().await.unwrap().is_empty());
}

/// Serves one response that promises `declared` bytes, sends a few, then stalls.
async fn stalling_body_server(declared: usize) -> Url {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut request = [0_u8; 1024];
        let _ = socket.read(&mut request).await;
        let head = format!("HTTP/1.1 200 OK\r\nContent-Length: {declared}\r\n\r\n");
        socket.write_all(head.as_bytes()).await.unwrap();
        socket.write_all(b"ID3-partial").await.unwrap();
        socket.flush().await.unwrap();
        tokio::time::sleep(Duration::from_secs(30)).await;
    });
    Url::parse(&format!("http://{address}/previews/1_lq.mp3")).unwrap()
}

#[tokio::test]
async fn test_cancelled_download_removes_partial_file() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    let url = stalling_body_server(4096).await;
    let tempdir = TempDir::new().unwrap();
    let destination = tempdir.path().join("1_lq.mp3");

    let client = authorized_client(&server);
    let outcome = tokio::time::timeout(
        Duration::from_millis(300),
        client.dispatcher().download_url(&url, &destination, false),
    )
    .await;

    assert!(outcome.is_err(), "Expected the download to be cut off");
    let entries: Vec<_> = fs::read_dir(tempdir.path()).unwrap().collect();
    assert!(entries.is_empty(), "Expected no files, found: {entries:?}");
}
