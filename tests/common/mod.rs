//! Shared helpers for integration tests.
//!
//! Each integration test file compiles common/ as its own module, so not
//! every helper is used in every file.
#![allow(dead_code)]

use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use parking_lot::Mutex;
use serde_json::{Value, json};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::accept_async;
use tokio_tungstenite::tungstenite::Message;

// ============================================================================
// Tracing
// ============================================================================

/// Routes crate logs to the test harness; filter with `RUST_LOG`.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

// ============================================================================
// MockBrowser
// ============================================================================

/// Computes the frames sent back for one inbound request.
pub type Responder = Arc<dyn Fn(&Value) -> Vec<Value> + Send + Sync>;

enum Control {
    Frame(String),
    Close,
}

/// A WebSocket debugging endpoint with scripted replies.
///
/// Serves one client connection at a time. Every request is recorded, then
/// answered with whatever the responder returns, in order.
pub struct MockBrowser {
    ws_url: String,
    received: Arc<Mutex<Vec<Value>>>,
    control: mpsc::UnboundedSender<Control>,
    task: JoinHandle<()>,
}

impl MockBrowser {
    /// Starts a mock endpoint driven by `responder`.
    pub async fn start<F>(responder: F) -> Self
    where
        F: Fn(&Value) -> Vec<Value> + Send + Sync + 'static,
    {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("should bind mock browser");
        let port = listener.local_addr().expect("local addr").port();
        let received = Arc::new(Mutex::new(Vec::new()));
        let (control, control_rx) = mpsc::unbounded_channel();

        let task = tokio::spawn(serve(
            listener,
            Arc::new(responder),
            Arc::clone(&received),
            control_rx,
        ));

        Self {
            ws_url: format!("ws://127.0.0.1:{port}/devtools/page/MOCK"),
            received,
            control,
            task,
        }
    }

    /// Echoes each request back as `{"method", "params"}` in its result.
    pub async fn echo() -> Self {
        Self::start(|request| {
            vec![json!({
                "id": request["id"],
                "result": {"method": request["method"], "params": request["params"]},
            })]
        })
        .await
    }

    /// Records requests and never answers.
    pub async fn silent() -> Self {
        Self::start(|_| Vec::new()).await
    }

    pub fn ws_url(&self) -> &str {
        &self.ws_url
    }

    /// Sends an unsolicited frame to the connected client.
    pub fn push(&self, frame: Value) {
        let _ = self.control.send(Control::Frame(frame.to_string()));
    }

    /// Sends a raw text frame, which need not be valid JSON.
    pub fn push_raw(&self, text: &str) {
        let _ = self.control.send(Control::Frame(text.to_string()));
    }

    /// Closes the current client connection from the remote side.
    pub fn close_socket(&self) {
        let _ = self.control.send(Control::Close);
    }

    /// Returns every request received so far.
    pub fn received(&self) -> Vec<Value> {
        self.received.lock().clone()
    }

    /// Returns the method names of every request received so far.
    pub fn received_methods(&self) -> Vec<String> {
        self.received
            .lock()
            .iter()
            .filter_map(|request| request["method"].as_str().map(str::to_string))
            .collect()
    }

    /// Waits until at least `count` requests have arrived.
    pub async fn wait_for_requests(&self, count: usize) {
        tokio::time::timeout(std::time::Duration::from_secs(5), async {
            while self.received.lock().len() < count {
                tokio::time::sleep(std::time::Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("mock browser should receive requests");
    }
}

impl Drop for MockBrowser {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn serve(
    listener: TcpListener,
    responder: Responder,
    received: Arc<Mutex<Vec<Value>>>,
    mut control_rx: mpsc::UnboundedReceiver<Control>,
) {
    while let Ok((stream, _)) = listener.accept().await {
        let Ok(ws) = accept_async(stream).await else {
            continue;
        };
        let (mut write, mut read) = ws.split();

        loop {
            tokio::select! {
                biased;

                control = control_rx.recv() => match control {
                    Some(Control::Frame(text)) => {
                        let _ = write.send(Message::Text(text.into())).await;
                    }
                    Some(Control::Close) | None => {
                        let _ = write.close().await;
                        break;
                    }
                },
                message = read.next() => match message {
                    Some(Ok(Message::Text(text))) => {
                        let Ok(request) = serde_json::from_str::<Value>(text.as_str()) else {
                            continue;
                        };
                        received.lock().push(request.clone());
                        for frame in responder(&request) {
                            if write.send(Message::Text(frame.to_string().into())).await.is_err() {
                                break;
                            }
                        }
                    }
                    Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                    Some(Ok(_)) => {}
                },
            }
        }
    }
}

// ============================================================================
// MockDirectory
// ============================================================================

/// A minimal HTTP server answering directory paths with canned JSON.
pub struct MockDirectory {
    port: u16,
    requested: Arc<Mutex<Vec<String>>>,
    task: JoinHandle<()>,
}

impl MockDirectory {
    /// Starts a directory serving `routes` as `(path, body)` pairs.
    ///
    /// Unknown paths get a 404.
    pub async fn start(routes: Vec<(String, String)>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("should bind mock directory");
        let port = listener.local_addr().expect("local addr").port();
        let requested = Arc::new(Mutex::new(Vec::new()));
        let routes = Arc::new(routes);

        let log = Arc::clone(&requested);
        let task = tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                let routes = Arc::clone(&routes);
                let log = Arc::clone(&log);
                tokio::spawn(async move {
                    let _ = answer(stream, &routes, &log).await;
                });
            }
        });

        Self {
            port,
            requested,
            task,
        }
    }

    /// Serves `targets` on `/json/list` and `/json`.
    pub async fn with_targets(targets: Value) -> Self {
        let body = targets.to_string();
        Self::start(vec![
            ("/json/list".to_string(), body.clone()),
            ("/json".to_string(), body),
        ])
        .await
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Returns `127.0.0.1:{port}`.
    pub fn endpoint(&self) -> String {
        format!("127.0.0.1:{}", self.port)
    }

    /// Returns every request path seen so far.
    pub fn requested(&self) -> Vec<String> {
        self.requested.lock().clone()
    }
}

impl Drop for MockDirectory {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn answer(
    mut stream: TcpStream,
    routes: &[(String, String)],
    log: &Mutex<Vec<String>>,
) -> std::io::Result<()> {
    let mut buf = Vec::with_capacity(1024);
    let mut chunk = [0u8; 1024];
    while !buf.windows(4).any(|w| w == b"\r\n\r\n") {
        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            return Ok(());
        }
        buf.extend_from_slice(&chunk[..n]);
    }

    let head = String::from_utf8_lossy(&buf);
    let path = head
        .lines()
        .next()
        .and_then(|line| line.split_whitespace().nth(1))
        .unwrap_or("/")
        .to_string();
    log.lock().push(path.clone());

    let route_path = path.split('?').next().unwrap_or("");
    let response = match routes.iter().find(|(p, _)| p == route_path) {
        Some((_, body)) => format!(
            "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
            body.len()
        ),
        None => "HTTP/1.1 404 Not Found\r\nContent-Length: 0\r\nConnection: close\r\n\r\n".to_string(),
    };

    stream.write_all(response.as_bytes()).await?;
    stream.shutdown().await
}

// ============================================================================
// Fixtures
// ============================================================================

/// A `/json/list` entry for a page target.
pub fn page_target(id: &str, ws_url: &str) -> Value {
    json!({
        "id": id,
        "type": "page",
        "title": "about:blank",
        "url": "about:blank",
        "description": "",
        "webSocketDebuggerUrl": ws_url,
        "devtoolsFrontendUrl": format!("/devtools/inspector.html?ws={}", ws_url.trim_start_matches("ws://")),
    })
}

/// A `/json/list` entry for a non-page target.
pub fn worker_target(id: &str) -> Value {
    json!({
        "id": id,
        "type": "service_worker",
        "title": "sw.js",
        "url": "https://example.com/sw.js",
        "webSocketDebuggerUrl": format!("ws://127.0.0.1:1/devtools/page/{id}"),
    })
}
