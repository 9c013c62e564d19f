//! Request/response coordination against a scripted server.

mod common;

use common::*;
use rejoin_client::{ClientBuilder, SessionState};
use rejoin_core::Error;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;

#[tokio::test]
async fn happy_path_request_response() {
    let mut server = MockSessionServer::with_handler(|_, text| {
        let frame = parse_frame(text);
        match method_of(&frame) {
            Some("foo") => ServerReply::Text(ok_response(
                id_of(&frame),
                json!({"value": 2}),
                Some("S"),
            )),
            _ => ServerReply::Ignore,
        }
    })
    .await;

    let listener = Arc::new(RecordingListener::default());
    let client = ClientBuilder::new(server.url())
        .listener(listener.clone())
        .connect()
        .await
        .unwrap();

    assert_eq!(client.state(), SessionState::Connected);
    assert!(client.session_id().is_none());

    let result: serde_json::Value = client.request("foo", json!({"x": 1})).await.unwrap();
    assert_eq!(result["value"], 2);
    assert_eq!(client.session_id().as_deref(), Some("S"));

    let sent = server.next_message().await.unwrap();
    let frame = parse_frame(&sent);
    assert_eq!(method_of(&frame), Some("foo"));
    assert_eq!(frame["params"]["x"], 1);
    assert_eq!(frame["jsonrpc"], "2.0");

    assert!(wait_until(|| listener.count("connected") == 1, Duration::from_secs(1)).await);
    assert_eq!(listener.count("reconnecting"), 0);

    client.close().await;
}

#[tokio::test]
async fn request_timeout_leaves_client_usable() {
    let server = MockSessionServer::with_handler(|_, text| {
        let frame = parse_frame(text);
        match method_of(&frame) {
            Some("fast") => ServerReply::Text(ok_response(id_of(&frame), json!("ok"), None)),
            _ => ServerReply::Ignore, // "slow" never gets an answer
        }
    })
    .await;

    let client = ClientBuilder::new(server.url())
        .request_timeout(Duration::from_millis(200))
        .connect()
        .await
        .unwrap();

    let err = client
        .request::<serde_json::Value>("slow", ())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::RequestTimeout { .. }));

    // a reply showing up after the waiter gave up is dropped on the floor
    server.push(ok_response(1, json!("too late"), None)).await;
    tokio::time::sleep(Duration::from_millis(50)).await;

    let value: String = client.request("fast", ()).await.unwrap();
    assert_eq!(value, "ok");

    client.close().await;
}

#[tokio::test]
async fn server_error_surfaces_as_json_rpc_error() {
    let server = MockSessionServer::with_handler(|_, text| {
        let frame = parse_frame(text);
        ServerReply::Text(error_response(id_of(&frame), -32601, "Method not found"))
    })
    .await;

    let client = ClientBuilder::new(server.url()).connect().await.unwrap();

    let err = client
        .request::<serde_json::Value>("missing", ())
        .await
        .unwrap_err();
    match err {
        Error::JsonRpc(data) => assert_eq!(data.code, -32601),
        other => panic!("expected JsonRpc error, got {other}"),
    }

    client.close().await;
    server.shutdown().await;
}

#[tokio::test]
async fn unmatched_and_unparseable_frames_are_dropped() {
    let server = MockSessionServer::with_handler(|_, text| {
        let frame = parse_frame(text);
        match method_of(&frame) {
            Some("foo") => ServerReply::Text(ok_response(id_of(&frame), json!(1), None)),
            _ => ServerReply::Ignore,
        }
    })
    .await;

    let client = ClientBuilder::new(server.url()).connect().await.unwrap();

    // a response nobody asked for, then plain garbage
    server.push(ok_response(999, json!("stray"), None)).await;
    server.push("{this is not json").await;
    tokio::time::sleep(Duration::from_millis(50)).await;

    // the connection stayed up and requests still work
    assert!(client.is_connected());
    let value: i64 = client.request("foo", ()).await.unwrap();
    assert_eq!(value, 1);

    client.close().await;
}

#[tokio::test]
async fn notifications_carry_no_id() {
    let mut server = MockSessionServer::with_handler(|_, _| ServerReply::Ignore).await;

    let client = ClientBuilder::new(server.url()).connect().await.unwrap();
    client.notify("log", json!({"line": "hello"})).await.unwrap();

    let sent = server.next_message().await.unwrap();
    let frame = parse_frame(&sent);
    assert_eq!(method_of(&frame), Some("log"));
    assert!(frame.get("id").is_none());

    client.close().await;
}

#[tokio::test]
async fn callback_flavor_delivers_the_result() {
    let server = MockSessionServer::with_handler(|_, text| {
        let frame = parse_frame(text);
        ServerReply::Text(ok_response(id_of(&frame), json!(7), None))
    })
    .await;

    let client = ClientBuilder::new(server.url()).connect().await.unwrap();

    let (tx, rx) = oneshot::channel();
    client.request_with_callback::<i64, _>("foo", (), move |result| {
        let _ = tx.send(result);
    });

    let result = tokio::time::timeout(Duration::from_secs(2), rx)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(result.unwrap(), 7);

    client.close().await;
    server.shutdown().await;
}
