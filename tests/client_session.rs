//! End-to-end client behaviour against a scripted WebSocket endpoint.

mod common;

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use anyhow::Result;
use parking_lot::Mutex;
use serde::Deserialize;
use serde_json::{Value, json};

use devtools_wire::{Client, ConnectionState, Error};

use common::{MockBrowser, init_tracing};

// ============================================================================
// Helpers
// ============================================================================

async fn wait_until<F: Fn() -> bool>(condition: F) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("condition should hold in time");
}

// ============================================================================
// Request / Response
// ============================================================================

#[tokio::test]
async fn result_resolves_the_call_with_that_id() -> Result<()> {
    init_tracing();
    let browser = MockBrowser::start(|request| match request["method"].as_str() {
        Some("Foo.bar") => vec![json!({"id": request["id"], "result": {"ok": true}})],
        _ => vec![json!({"id": request["id"], "result": {}})],
    })
    .await;
    let client = Client::connect_ws(browser.ws_url()).await?;

    client.send("Warm.up", json!({})).await?;
    let result = client.send("Foo.bar", json!({})).await?;

    assert_eq!(result, json!({"ok": true}));
    let received = browser.received();
    assert_eq!(received[1]["id"], json!(2));
    assert_eq!(received[1]["method"], json!("Foo.bar"));

    client.close().await;
    Ok(())
}

#[tokio::test]
async fn error_reply_rejects_with_protocol_error() -> Result<()> {
    init_tracing();
    let browser = MockBrowser::start(|request| {
        vec![json!({"id": request["id"], "error": {"message": "boom"}})]
    })
    .await;
    let client = Client::connect_ws(browser.ws_url()).await?;

    let err = client.send("Foo.bar", json!({})).await.unwrap_err();
    match err {
        Error::Protocol { message, .. } => assert_eq!(message, "boom"),
        other => panic!("expected protocol error, got {other:?}"),
    }

    client.close().await;
    Ok(())
}

#[tokio::test]
async fn out_of_order_replies_bind_to_their_own_calls() -> Result<()> {
    init_tracing();
    // Hold every reply until the third request, then answer in reverse.
    let held: Arc<Mutex<Vec<Value>>> = Arc::new(Mutex::new(Vec::new()));
    let browser = MockBrowser::start(move |request| {
        let mut held = held.lock();
        held.push(request.clone());
        if held.len() < 3 {
            return Vec::new();
        }
        held.drain(..)
            .rev()
            .map(|r| json!({"id": r["id"], "result": {"echo": r["params"]["n"]}}))
            .collect()
    })
    .await;
    let client = Client::connect_ws(browser.ws_url()).await?;

    let (a, b, c) = tokio::join!(
        client.send("N.n", json!({"n": 1})),
        client.send("N.n", json!({"n": 2})),
        client.send("N.n", json!({"n": 3})),
    );

    assert_eq!(a?, json!({"echo": 1}));
    assert_eq!(b?, json!({"echo": 2}));
    assert_eq!(c?, json!({"echo": 3}));
    assert_eq!(client.pending_count(), 0);

    client.close().await;
    Ok(())
}

#[tokio::test]
async fn request_ids_are_unique_and_increasing() -> Result<()> {
    init_tracing();
    let browser = MockBrowser::echo().await;
    let client = Client::connect_ws(browser.ws_url()).await?;

    for _ in 0..5 {
        client.send("Tick.tock", Value::Null).await?;
    }

    let ids: Vec<u64> = browser
        .received()
        .iter()
        .filter_map(|r| r["id"].as_u64())
        .collect();
    assert_eq!(ids, vec![1, 2, 3, 4, 5]);
    // Null params go out as an empty object.
    assert!(browser.received().iter().all(|r| r["params"] == json!({})));

    client.close().await;
    Ok(())
}

#[tokio::test]
async fn typed_call_round_trips_through_serde() -> Result<()> {
    #[derive(Debug, Deserialize, PartialEq)]
    struct Echo {
        method: String,
        params: Value,
    }

    init_tracing();
    let browser = MockBrowser::echo().await;
    let client = Client::connect_ws(browser.ws_url()).await?;

    let echo: Echo = client
        .call("Runtime.evaluate", &json!({"expression": "1 + 1"}))
        .await?;
    assert_eq!(echo.method, "Runtime.evaluate");
    assert_eq!(echo.params, json!({"expression": "1 + 1"}));

    client.close().await;
    Ok(())
}

#[tokio::test]
async fn late_reply_after_timeout_is_dropped() -> Result<()> {
    init_tracing();
    let browser = MockBrowser::start(|request| match request["method"].as_str() {
        Some("Slow.call") => Vec::new(),
        _ => vec![json!({"id": request["id"], "result": {"fast": true}})],
    })
    .await;
    let client = Client::connect_ws(browser.ws_url()).await?;

    let err = client
        .send_with_timeout("Slow.call", json!({}), Duration::from_millis(50))
        .await
        .unwrap_err();
    assert!(err.is_timeout());
    assert_eq!(client.pending_count(), 0);

    browser.push(json!({"id": 1, "result": {"late": true}}));
    assert_eq!(client.send("Fast.call", json!({})).await?, json!({"fast": true}));
    assert!(client.connected());

    client.close().await;
    Ok(())
}

#[tokio::test]
async fn malformed_frames_do_not_break_the_connection() -> Result<()> {
    init_tracing();
    let browser = MockBrowser::echo().await;
    let client = Client::connect_ws(browser.ws_url()).await?;

    browser.push_raw("{not json");
    browser.push_raw("[1,2,3]");
    browser.push(json!({"neither": "id nor method"}));

    let result = client.send("Still.alive", json!({})).await?;
    assert_eq!(result["method"], json!("Still.alive"));

    client.close().await;
    Ok(())
}

// ============================================================================
// Notifications
// ============================================================================

#[tokio::test]
async fn once_subscriber_fires_a_single_time() -> Result<()> {
    init_tracing();
    let browser = MockBrowser::echo().await;
    let client = Client::connect_ws(browser.ws_url()).await?;

    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    client.once("Foo.changed", move |params| sink.lock().push(params.clone()));

    browser.push(json!({"method": "Foo.changed", "params": {"x": 1}}));
    browser.push(json!({"method": "Foo.changed", "params": {"x": 1}}));
    // The echo reply is ordered after both notifications on the socket.
    client.send("Sync.point", json!({})).await?;

    assert_eq!(*seen.lock(), vec![json!({"x": 1})]);

    client.close().await;
    Ok(())
}

#[tokio::test]
async fn subscribers_run_in_registration_order_with_unmodified_params() -> Result<()> {
    init_tracing();
    let browser = MockBrowser::echo().await;
    let client = Client::connect_ws(browser.ws_url()).await?;

    let log = Arc::new(Mutex::new(Vec::new()));
    for tag in 0..3 {
        let log = Arc::clone(&log);
        client.on("Page.frameNavigated", move |params| {
            log.lock().push((tag, params.clone()));
        });
    }
    let other = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&other);
    client.on("Page.loadEventFired", move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
    });

    let payload = json!({"frame": {"id": "F1", "url": "https://example.com"}});
    browser.push(json!({"method": "Page.frameNavigated", "params": payload}));
    client.send("Sync.point", json!({})).await?;

    let log = log.lock().clone();
    assert_eq!(
        log,
        vec![(0, payload.clone()), (1, payload.clone()), (2, payload)]
    );
    assert_eq!(other.load(Ordering::SeqCst), 0);

    client.close().await;
    Ok(())
}

#[tokio::test]
async fn off_stops_delivery() -> Result<()> {
    init_tracing();
    let browser = MockBrowser::echo().await;
    let client = Client::connect_ws(browser.ws_url()).await?;

    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let subscription = client.on("Foo.changed", move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
    });

    browser.push(json!({"method": "Foo.changed", "params": {}}));
    client.send("Sync.point", json!({})).await?;
    assert!(client.off(&subscription));

    browser.push(json!({"method": "Foo.changed", "params": {}}));
    client.send("Sync.point", json!({})).await?;

    assert_eq!(calls.load(Ordering::SeqCst), 1);

    client.close().await;
    Ok(())
}

#[tokio::test]
async fn typed_subscriber_decodes_payload() -> Result<()> {
    #[derive(Debug, Deserialize)]
    struct Changed {
        x: i64,
    }

    init_tracing();
    let browser = MockBrowser::echo().await;
    let client = Client::connect_ws(browser.ws_url()).await?;

    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    client.on_typed("Foo.changed", move |event: Changed| sink.lock().push(event.x));

    browser.push(json!({"method": "Foo.changed", "params": {"x": "not a number"}}));
    browser.push(json!({"method": "Foo.changed", "params": {"x": 7}}));
    client.send("Sync.point", json!({})).await?;

    assert_eq!(*seen.lock(), vec![7]);

    client.close().await;
    Ok(())
}

// ============================================================================
// Lifecycle
// ============================================================================

#[tokio::test]
async fn sends_before_handshake_are_flushed_in_order() -> Result<()> {
    init_tracing();
    let browser = MockBrowser::echo().await;
    let client = Client::open_ws(browser.ws_url());

    let (first, second) = tokio::join!(
        client.send("First.call", json!({})),
        client.send("Second.call", json!({})),
    );
    assert_eq!(first?["method"], json!("First.call"));
    assert_eq!(second?["method"], json!("Second.call"));
    assert_eq!(browser.received_methods(), vec!["First.call", "Second.call"]);

    client.close().await;
    Ok(())
}

#[tokio::test]
async fn close_is_idempotent_and_rejects_pending_once() -> Result<()> {
    init_tracing();
    let browser = MockBrowser::silent().await;
    let client = Client::connect_ws(browser.ws_url()).await?;

    let subscriber_calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&subscriber_calls);
    client.on("Foo.changed", move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
    });

    let calls: Vec<_> = (0..3)
        .map(|n| {
            let client = client.clone();
            tokio::spawn(async move { client.send("Never.answered", json!({"n": n})).await })
        })
        .collect();
    wait_until(|| client.pending_count() == 3).await;

    client.close().await;
    client.close().await;

    for call in calls {
        assert!(matches!(call.await?, Err(Error::ConnectionClosed)));
    }
    assert_eq!(client.state(), ConnectionState::Closed);
    assert!(!client.connected());
    assert_eq!(client.pending_count(), 0);
    assert!(matches!(
        client.send("After.close", json!({})).await,
        Err(Error::ConnectionClosed)
    ));
    Ok(())
}

#[tokio::test]
async fn remote_close_fails_pending_and_clears_subscribers() -> Result<()> {
    init_tracing();
    let browser = MockBrowser::silent().await;
    let client = Client::connect_ws(browser.ws_url()).await?;
    let mut states = client.watch_state();

    let pending = {
        let client = client.clone();
        tokio::spawn(async move { client.send("Never.answered", json!({})).await })
    };
    wait_until(|| client.pending_count() == 1).await;

    browser.close_socket();
    client.closed().await;

    assert!(matches!(pending.await?, Err(Error::ConnectionClosed)));
    assert_eq!(*states.borrow_and_update(), ConnectionState::Closed);
    Ok(())
}

#[tokio::test]
async fn connect_to_dead_port_is_connection_error() {
    init_tracing();
    let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind");
    let port = listener.local_addr().expect("addr").port();
    drop(listener);

    let err = Client::connect_ws(format!("ws://127.0.0.1:{port}/devtools/page/X"))
        .await
        .unwrap_err();
    assert!(err.is_connection_error());
}
