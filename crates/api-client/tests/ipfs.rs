use httpmock::prelude::*;
use std::time::Duration;
use zerobyte_api_client::middleware::{CircuitState, RetryConfig};
use zerobyte_api_client::{ApiError, ClientConfig, Service, ZeroByteClient};
use zerobyte_core::cid::Cid;

const CID: &str = "QmYwAPJzv5CZsnA625s3Xf2nemtYgPpHdWEz79ojWnPbdG";

fn client_for(server: &MockServer) -> ZeroByteClient {
    let config = ClientConfig::default()
        .with_ipfs_api_url(server.url("/api/v0"))
        .with_timeout(Duration::from_secs(5))
        .with_retry(RetryConfig::default().with_initial_delay(Duration::from_millis(1)));
    ZeroByteClient::with_config(config).unwrap()
}

#[tokio::test]
async fn reports_online_node_with_version() {
    let server = MockServer::start_async().await;
    let refs = server
        .mock_async(|when, then| {
            when.method(POST).path("/api/v0/refs/local");
            then.status(200).body("{\"Ref\":\"QmA\",\"Err\":\"\"}\n");
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/api/v0/version");
            then.status(200)
                .json_body(serde_json::json!({"Version": "0.29.0", "Commit": "", "Repo": "15"}));
        })
        .await;

    let status = client_for(&server).ipfs().check_online().await;

    refs.assert_async().await;
    assert!(status.online);
    assert_eq!(status.message, "Online");
    assert_eq!(status.version.as_deref(), Some("0.29.0"));
}

#[tokio::test]
async fn reports_unreachable_node_as_offline() {
    let config = ClientConfig::default()
        .with_ipfs_api_url("http://127.0.0.1:9/api/v0")
        .with_timeout(Duration::from_secs(2));
    let client = ZeroByteClient::with_config(config).unwrap();

    let status = client.ipfs().check_online().await;

    assert!(!status.online);
    assert!(!status.message.is_empty());
    assert!(status.version.is_none());
}

#[tokio::test]
async fn adds_file_with_pin_and_returns_cid() {
    let server = MockServer::start_async().await;
    let add = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/api/v0/add")
                .query_param("pin", "true")
                .body_contains("hello ipfs");
            then.status(200)
                .body(format!("{{\"Name\":\"hello.txt\",\"Hash\":\"{CID}\",\"Size\":\"18\"}}\n"));
        })
        .await;

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("hello.txt");
    std::fs::write(&path, "hello ipfs").unwrap();

    let added = client_for(&server).ipfs().add_file(&path).await.unwrap();

    add.assert_async().await;
    assert_eq!(added.name, "hello.txt");
    assert_eq!(added.cid.as_str(), CID);
    assert_eq!(added.size, 18);
}

#[tokio::test]
async fn streams_cat_into_file() {
    let server = MockServer::start_async().await;
    let payload = vec![7u8; 64 * 1024];
    let body = payload.clone();
    server
        .mock_async(move |when, then| {
            when.method(POST).path("/api/v0/cat").query_param("arg", CID);
            then.status(200).body(body.clone());
        })
        .await;

    let dir = tempfile::tempdir().unwrap();
    let dest = dir.path().join("out.bin");
    let cid = Cid::parse(CID).unwrap();
    let mut last_progress = 0;

    let written = client_for(&server)
        .ipfs()
        .cat_to_file(&cid, &dest, |n| last_progress = n)
        .await
        .unwrap();

    assert_eq!(written, payload.len() as u64);
    assert_eq!(last_progress, written);
    assert_eq!(std::fs::read(&dest).unwrap(), payload);
}

#[tokio::test]
async fn missing_content_is_an_api_error() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/api/v0/cat");
            then.status(400)
                .json_body(serde_json::json!({"Message": "invalid path", "Code": 0, "Type": "error"}));
        })
        .await;

    let dir = tempfile::tempdir().unwrap();
    let cid = Cid::parse(CID).unwrap();
    let err = client_for(&server)
        .ipfs()
        .cat_to_file(&cid, &dir.path().join("x"), |_| {})
        .await
        .unwrap_err();

    match err {
        ApiError::ApiResponse { status, message } => {
            assert_eq!(status, 400);
            assert_eq!(message, "invalid path");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn pin_ls_distinguishes_pinned_and_unpinned() {
    let server = MockServer::start_async().await;
    let cid = Cid::parse(CID).unwrap();
    let mut pinned = server
        .mock_async(|when, then| {
            when.method(POST).path("/api/v0/pin/ls").query_param("arg", CID);
            then.status(200)
                .body(format!(r#"{{"Keys":{{"{CID}":{{"Type":"recursive"}}}}}}"#));
        })
        .await;

    let client = client_for(&server);
    assert!(client.ipfs().pin_ls(&cid).await.unwrap());

    pinned.delete_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/api/v0/pin/ls");
            then.status(500).json_body(serde_json::json!({
                "Message": format!("path '{CID}' is not pinned"),
                "Code": 0,
                "Type": "error"
            }));
        })
        .await;

    assert!(!client.ipfs().pin_ls(&cid).await.unwrap());
}

#[tokio::test]
async fn retries_server_errors_then_gives_up() {
    let server = MockServer::start_async().await;
    let version = server
        .mock_async(|when, then| {
            when.method(POST).path("/api/v0/version");
            then.status(503).body("overloaded");
        })
        .await;

    let err = client_for(&server).ipfs().version().await.unwrap_err();

    assert!(err.is_server_error());
    assert_eq!(version.hits_async().await, 3);
}

#[tokio::test]
async fn circuit_opens_after_repeated_failures() {
    let server = MockServer::start_async().await;
    let version = server
        .mock_async(|when, then| {
            when.method(POST).path("/api/v0/version");
            then.status(500);
        })
        .await;

    let config = ClientConfig::default()
        .with_ipfs_api_url(server.url("/api/v0"))
        .with_retry(RetryConfig::no_retry());
    let client = ZeroByteClient::with_config(config).unwrap();

    for _ in 0..5 {
        assert!(client.ipfs().version().await.is_err());
    }
    assert_eq!(client.circuit_state(Service::Ipfs), CircuitState::Open);

    let err = client.ipfs().version().await.unwrap_err();
    assert!(matches!(err, ApiError::CircuitOpen("ipfs")));
    assert_eq!(version.hits_async().await, 5);

    client.reset_circuit(Service::Ipfs);
    assert_eq!(client.circuit_state(Service::Ipfs), CircuitState::Closed);
}

/// Serve one chunked `cat` response, writing `chunks` KiB-sized chunks `gap` apart
/// and then holding the connection open for `stall` before finishing.
async fn slow_cat_server(chunks: usize, gap: Duration, stall: Duration) -> String {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut request = vec![0u8; 8192];
        let _ = socket.read(&mut request).await.unwrap();

        socket
            .write_all(b"HTTP/1.1 200 OK\r\nContent-Type: application/octet-stream\r\nTransfer-Encoding: chunked\r\n\r\n")
            .await
            .unwrap();
        for _ in 0..chunks {
            tokio::time::sleep(gap).await;
            let mut chunk = b"400\r\n".to_vec();
            chunk.extend_from_slice(&[b'x'; 1024]);
            chunk.extend_from_slice(b"\r\n");
            if socket.write_all(&chunk).await.is_err() {
                return;
            }
        }
        tokio::time::sleep(stall).await;
        let _ = socket.write_all(b"0\r\n\r\n").await;
    });

    format!("http://{addr}/api/v0")
}

fn client_with_timeout(api_url: String, timeout: Duration) -> ZeroByteClient {
    let config = ClientConfig::default()
        .with_ipfs_api_url(api_url)
        .with_timeout(timeout)
        .with_retry(RetryConfig::no_retry());
    ZeroByteClient::with_config(config).unwrap()
}

#[tokio::test]
async fn cat_keeps_going_past_timeout_while_data_flows() {
    let api = slow_cat_server(6, Duration::from_millis(150), Duration::ZERO).await;
    let client = client_with_timeout(api, Duration::from_millis(500));
    let dir = tempfile::tempdir().unwrap();
    let dest = dir.path().join("slow.bin");

    let written = client
        .ipfs()
        .cat_to_file(&Cid::parse(CID).unwrap(), &dest, |_| {})
        .await
        .unwrap();

    assert_eq!(written, 6 * 1024);
    assert_eq!(std::fs::metadata(&dest).unwrap().len(), 6 * 1024);
}

#[tokio::test]
async fn cat_fails_when_stream_stalls() {
    let api = slow_cat_server(1, Duration::ZERO, Duration::from_secs(3)).await;
    let client = client_with_timeout(api, Duration::from_millis(300));
    let dir = tempfile::tempdir().unwrap();

    let mut progress = 0;
    let err = client
        .ipfs()
        .cat_to_file(&Cid::parse(CID).unwrap(), &dir.path().join("stalled.bin"), |n| progress = n)
        .await
        .unwrap_err();

    assert!(matches!(err, ApiError::Timeout(_)), "unexpected error: {err}");
    assert_eq!(progress, 1024);
}

#[tokio::test]
async fn json_calls_are_bounded_by_timeout() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/api/v0/version");
            then.status(200)
                .delay(Duration::from_secs(2))
                .json_body(serde_json::json!({"Version": "0.29.0"}));
        })
        .await;

    let client = client_with_timeout(server.url("/api/v0"), Duration::from_millis(200));
    assert!(client.ipfs().version().await.is_err());
}
