use std::sync::Arc;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::mpsc;

use nmsync_api::{RemoteGroup, Reply};
use nmsync_client::{ClientConfig, ClientError, HttpClient};
use nmsync_core::*;

/// Serve the same canned reply to every connection
///
/// Returns the API endpoint and a stream of received request lines.
async fn serve(
    status_line: &'static str,
    body: &'static str,
) -> (String, mpsc::UnboundedReceiver<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (tx, rx) = mpsc::unbounded_channel();

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            let mut request = Vec::new();
            let mut buf = [0u8; 1024];
            while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                match socket.read(&mut buf).await {
                    Ok(0) | Err(_) => break,
                    Ok(n) => request.extend_from_slice(&buf[..n]),
                }
            }
            let request = String::from_utf8_lossy(&request);
            if let Some(line) = request.lines().next() {
                let _ = tx.send(line.to_string());
            }
            let response = format!(
                "HTTP/1.1 {status_line}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            let _ = socket.write_all(response.as_bytes()).await;
            let _ = socket.shutdown().await;
        }
    });

    (format!("http://{addr}/api/v0"), rx)
}

fn client(endpoint: &str) -> Arc<HttpClient> {
    let http = reqwest::Client::builder().no_proxy().build().unwrap();
    Arc::new(HttpClient::with_client(ClientConfig::new(endpoint, "secret"), http).unwrap())
}

#[tokio::test]
async fn test_empty_group_sentinel_resolves_to_no_devices() {
    let (endpoint, _) = serve(
        "200 OK",
        r#"{"status":"error","message":"No devices found in group core-empty"}"#,
    )
    .await;
    let resolver = DeviceResolver::new(client(&endpoint));

    let members = resolver
        .devices_of(&RemoteGroup::new("core-empty"))
        .await
        .unwrap();
    assert!(members.is_empty());
}

#[tokio::test]
async fn test_empty_group_sentinel_on_not_found() {
    let (endpoint, _) = serve(
        "404 Not Found",
        r#"{"status":"error","message":"No devices found in group core-empty"}"#,
    )
    .await;
    let resolver = DeviceResolver::new(client(&endpoint));

    let members = resolver
        .devices_of(&RemoteGroup::new("core-empty"))
        .await
        .unwrap();
    assert!(members.is_empty());
}

#[tokio::test]
async fn test_members_are_listed() {
    let (endpoint, _) = serve(
        "200 OK",
        r#"{"status":"ok","devices":[{"device_id":7},{"device_id":"9"}]}"#,
    )
    .await;
    let resolver = DeviceResolver::new(client(&endpoint));

    let members = resolver
        .devices_of(&RemoteGroup::new("core-1"))
        .await
        .unwrap();
    let ids: Vec<u64> = members.iter().map(|m| m.device_id).collect();
    assert_eq!(ids, [7, 9]);
}

#[tokio::test]
async fn test_fetch_encodes_each_segment() {
    let (endpoint, mut requests) = serve("200 OK", r#"{"status":"ok","devices":[]}"#).await;
    let client = client(&endpoint);

    let reply = client
        .fetch(&["devicegroups", "core routers/east"])
        .await
        .unwrap();
    assert_eq!(
        reply,
        Reply::Data(serde_json::json!({"status": "ok", "devices": []}))
    );
    assert_eq!(
        requests.recv().await.unwrap(),
        "GET /api/v0/devicegroups/core%20routers%2Feast HTTP/1.1"
    );
}

#[tokio::test]
async fn test_unauthorized_message_reaches_caller() {
    let (endpoint, _) = serve("401 Unauthorized", r#"{"message":"Unauthenticated."}"#).await;
    let config = SyncConfig {
        api_endpoint: Some(endpoint),
        api_token: Some("wrong".to_string()),
        ..SyncConfig::default()
    };
    let settings = config.validate().unwrap();
    let api = client(&settings.client.endpoint);
    let sync = Synchronizer::new(api, settings);

    let err = sync.build_snapshot().await.unwrap_err();
    assert!(matches!(
        err,
        SyncError::Client(ClientError::Api { status: 401, .. })
    ));
    assert!(err.to_string().contains("Unauthenticated."));
}
