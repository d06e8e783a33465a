//! Launch, discovery polling and teardown with a stand-in browser executable.
#![cfg(unix)]

mod common;

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use anyhow::Result;
use serde_json::json;
use tempfile::TempDir;

use devtools_wire::{ConnectionState, Error, LaunchOptions, Launcher, launch};

use common::{MockBrowser, MockDirectory, init_tracing, page_target};

// ============================================================================
// Helpers
// ============================================================================

/// Writes an executable shell script standing in for the browser.
fn fake_browser(dir: &Path, body: &str) -> PathBuf {
    let path = dir.join("fake-browser");
    fs::write(&path, format!("#!/bin/sh\n{body}\n")).expect("write script");
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).expect("chmod script");
    path
}

/// Returns a local port with nothing listening on it.
fn unused_port() -> u16 {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind");
    listener.local_addr().expect("addr").port()
}

fn quick_options(executable: &Path, port: u16) -> LaunchOptions {
    LaunchOptions::headless()
        .with_executable(executable)
        .with_port(port)
        .with_signal_handling(false)
        .with_polling(Duration::from_millis(20), 10)
}

/// Waits for the script to finish recording its arguments.
async fn read_args(path: &Path) -> String {
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            if let Ok(text) = fs::read_to_string(path)
                && text.ends_with("about:blank\n")
            {
                return text;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("script should record its arguments")
}

/// A mock endpoint that acknowledges every call, including `Browser.close`.
async fn acknowledging_browser() -> MockBrowser {
    MockBrowser::start(|request| vec![json!({"id": request["id"], "result": {}})]).await
}

// ============================================================================
// Failure Paths
// ============================================================================

#[tokio::test]
async fn launch_times_out_when_endpoint_never_opens() -> Result<()> {
    init_tracing();
    let scratch = TempDir::new()?;
    let executable = fake_browser(scratch.path(), "exec /bin/sleep 30");
    let port = unused_port();

    let started = Instant::now();
    let err = launch(quick_options(&executable, port)).await.unwrap_err();

    assert!(
        matches!(err, Error::LaunchTimeout { attempts: 10, port: p } if p == port),
        "unexpected error: {err:?}"
    );
    assert!(started.elapsed() < Duration::from_secs(10));
    Ok(())
}

#[tokio::test]
async fn launch_reports_early_exit() -> Result<()> {
    init_tracing();
    let scratch = TempDir::new()?;
    let executable = fake_browser(scratch.path(), "exit 3");

    let options =
        quick_options(&executable, unused_port()).with_polling(Duration::from_millis(50), 40);
    let err = launch(options).await.unwrap_err();

    assert!(
        matches!(err, Error::ProcessExited { .. }),
        "unexpected error: {err:?}"
    );
    Ok(())
}

#[tokio::test]
async fn launch_without_page_target_fails() -> Result<()> {
    init_tracing();
    let scratch = TempDir::new()?;
    let executable = fake_browser(scratch.path(), "exec /bin/sleep 30");
    let directory = MockDirectory::with_targets(json!([])).await;

    let err = launch(quick_options(&executable, directory.port()))
        .await
        .unwrap_err();

    assert!(matches!(err, Error::NoPageTarget));
    Ok(())
}

// ============================================================================
// Success Path
// ============================================================================

#[tokio::test]
async fn launch_connects_and_kill_tears_down_once() -> Result<()> {
    init_tracing();
    let scratch = TempDir::new()?;
    let args_file = scratch.path().join("args.txt");
    let executable = fake_browser(
        scratch.path(),
        &format!(
            "printf '%s\\n' \"$@\" > '{}'\nexec /bin/sleep 30",
            args_file.display()
        ),
    );

    let browser = acknowledging_browser().await;
    let directory =
        MockDirectory::with_targets(json!([page_target("MOCK", browser.ws_url())])).await;

    let launcher = Launcher::builder()
        .executable(&executable)
        .port(directory.port())
        .headless()
        .handle_signals(false)
        .polling(Duration::from_millis(20), 50)
        .build()?;
    let (client, process) = launcher.launch().await?;

    assert!(client.connected());
    assert!(process.pid().is_some());
    assert_eq!(process.port(), directory.port());
    assert!(process.owns_user_data_dir());
    let profile = process.user_data_dir().to_path_buf();
    assert!(profile.is_dir());

    let args = read_args(&args_file).await;
    let args: Vec<&str> = args.lines().collect();
    assert!(args.contains(&format!("--remote-debugging-port={}", directory.port()).as_str()));
    assert!(args.contains(&format!("--user-data-dir={}", profile.display()).as_str()));
    assert!(args.contains(&"--headless"));
    assert_eq!(args.last(), Some(&"about:blank"));

    let result = client.send("Page.enable", json!({})).await?;
    assert_eq!(result, json!({}));

    process.kill().await?;

    assert!(process.is_dead());
    assert!(!profile.exists());
    assert_eq!(client.state(), ConnectionState::Closed);
    assert!(browser.received_methods().contains(&"Browser.close".to_string()));

    // Second kill does nothing.
    let close_calls = browser
        .received_methods()
        .iter()
        .filter(|m| m.as_str() == "Browser.close")
        .count();
    process.kill().await?;
    process.shutdown().await?;
    assert_eq!(
        browser
            .received_methods()
            .iter()
            .filter(|m| m.as_str() == "Browser.close")
            .count(),
        close_calls
    );
    Ok(())
}

#[tokio::test]
async fn kill_keeps_caller_owned_profile() -> Result<()> {
    init_tracing();
    let scratch = TempDir::new()?;
    let profile = scratch.path().join("profile");
    // Exits on its own well inside the grace period.
    let executable = fake_browser(scratch.path(), "exec /bin/sleep 2");

    let browser = acknowledging_browser().await;
    let directory =
        MockDirectory::with_targets(json!([page_target("MOCK", browser.ws_url())])).await;

    let options = quick_options(&executable, directory.port()).with_user_data_dir(&profile);
    let (_client, process) = launch(options).await?;

    assert!(!process.owns_user_data_dir());
    assert_eq!(process.user_data_dir(), profile.as_path());

    process.kill().await?;
    process.terminated().await;

    assert!(profile.is_dir());
    Ok(())
}
