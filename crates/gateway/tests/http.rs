//! End-to-end tests over a real listener: pass issuance via the mock
//! device, gated metadata, one-shot download, shutdown coordination.
#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::{sync::Arc, time::Duration};

use {
    buchi_device::MockDevice,
    buchi_gateway::{AppState, ShutdownHandle, SharedFile, build_app},
    buchi_passes::PassStore,
    reqwest::{StatusCode, redirect},
    tokio::task::JoinHandle,
};

const FILE_BODY: &[u8] = b"one-shot payload for the gateway tests\n";

struct TestService {
    base_url: String,
    shutdown: ShutdownHandle,
    server: JoinHandle<std::io::Result<()>>,
    device: Arc<MockDevice>,
    passes: PassStore,
    file_name: String,
    // Held so the fixture file outlives the server.
    _dir: tempfile::TempDir,
}

async fn start_service() -> TestService {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("payload.bin");
    tokio::fs::write(&path, FILE_BODY).await.expect("fixture");

    let device = Arc::new(MockDevice::new());
    let shutdown = ShutdownHandle::new();
    let passes = PassStore::new(Duration::from_secs(300));
    let state = AppState {
        device: Arc::clone(&device) as Arc<dyn buchi_device::DeviceLink>,
        passes: passes.clone(),
        file: SharedFile::new(path.clone()),
        shutdown: shutdown.clone(),
    };
    let app = build_app(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind");
    let addr = listener.local_addr().expect("local addr");

    let drain = shutdown.clone();
    let server = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async move { drain.cancelled().await })
            .await
    });

    TestService {
        base_url: format!("http://{addr}"),
        shutdown,
        server,
        device,
        passes,
        file_name: "payload.bin".into(),
        _dir: dir,
    }
}

fn client() -> reqwest::Client {
    // Redirects are followed manually so Set-Cookie can be observed.
    reqwest::Client::builder()
        .redirect(redirect::Policy::none())
        .build()
        .expect("client")
}

/// Walk the token flow and return the issued pass cookie (`name=value`).
async fn obtain_pass(client: &reqwest::Client, base_url: &str) -> String {
    let resp = client
        .get(format!("{base_url}/?token=a-valid-token"))
        .send()
        .await
        .expect("request");
    assert!(resp.status().is_redirection());

    let set_cookie = resp
        .headers()
        .get(reqwest::header::SET_COOKIE)
        .expect("pass cookie set")
        .to_str()
        .expect("ascii cookie");
    assert!(set_cookie.starts_with("buchi_pass_id="));
    set_cookie
        .split(';')
        .next()
        .expect("cookie pair")
        .to_string()
}

#[tokio::test]
async fn root_without_token_is_forbidden() {
    let svc = start_service().await;
    let resp = client()
        .get(format!("{}/", svc.base_url))
        .send()
        .await
        .expect("request");
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn token_flow_issues_pass_and_serves_page() {
    let svc = start_service().await;
    let client = client();
    let pass = obtain_pass(&client, &svc.base_url).await;

    let resp = client
        .get(format!("{}/", svc.base_url))
        .header(reqwest::header::COOKIE, &pass)
        .send()
        .await
        .expect("request");
    assert_eq!(resp.status(), StatusCode::OK);
    let body = resp.text().await.expect("body");
    assert!(body.contains("<html"));
}

#[tokio::test]
async fn fileinfo_requires_a_pass() {
    let svc = start_service().await;
    let resp = client()
        .get(format!("{}/api/fileinfo", svc.base_url))
        .send()
        .await
        .expect("request");
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn fileinfo_matches_the_fixture() {
    let svc = start_service().await;
    let client = client();
    let pass = obtain_pass(&client, &svc.base_url).await;

    let info: serde_json::Value = client
        .get(format!("{}/api/fileinfo", svc.base_url))
        .header(reqwest::header::COOKIE, &pass)
        .send()
        .await
        .expect("request")
        .json()
        .await
        .expect("json payload");

    assert_eq!(info["name"], svc.file_name.as_str());
    assert_eq!(info["size"], FILE_BODY.len() as u64);
    assert!(info["type"].is_string());
}

#[tokio::test]
async fn download_streams_once_then_shuts_down() {
    let svc = start_service().await;
    let client = client();
    let pass = obtain_pass(&client, &svc.base_url).await;

    let resp = client
        .get(format!("{}/download", svc.base_url))
        .header(reqwest::header::COOKIE, &pass)
        .send()
        .await
        .expect("request");
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(
        resp.headers()[reqwest::header::CONTENT_TYPE],
        "application/octet-stream"
    );
    assert!(
        resp.headers()[reqwest::header::CONTENT_DISPOSITION]
            .to_str()
            .expect("ascii header")
            .contains("payload.bin")
    );
    assert_eq!(
        resp.headers()[reqwest::header::CONTENT_LENGTH],
        FILE_BODY.len().to_string().as_str()
    );
    let body = resp.bytes().await.expect("body");
    assert_eq!(&body[..], FILE_BODY);

    // The completed transfer is the shutdown trigger.
    tokio::time::timeout(Duration::from_secs(5), svc.shutdown.cancelled())
        .await
        .expect("shutdown signalled");
    tokio::time::timeout(Duration::from_secs(5), svc.server)
        .await
        .expect("server drained within the bound")
        .expect("join")
        .expect("clean exit");
}

#[tokio::test]
async fn concurrent_downloads_on_one_pass_succeed_exactly_once() {
    let svc = start_service().await;
    let client = client();
    let pass = obtain_pass(&client, &svc.base_url).await;

    // Both requests are in flight before either finishes, so both reach
    // the consume step; only one may win.
    let request = |c: reqwest::Client, url: String, pass: String| async move {
        let resp = c
            .get(format!("{url}/download"))
            .header(reqwest::header::COOKIE, pass)
            .send()
            .await
            .expect("request");
        let status = resp.status();
        resp.bytes().await.ok();
        status
    };
    let (a, b) = tokio::join!(
        request(client.clone(), svc.base_url.clone(), pass.clone()),
        request(client.clone(), svc.base_url.clone(), pass.clone()),
    );

    let oks = [a, b].iter().filter(|s| **s == StatusCode::OK).count();
    let denied = [a, b]
        .iter()
        .filter(|s| **s == StatusCode::FORBIDDEN)
        .count();
    assert_eq!(oks, 1);
    assert_eq!(denied, 1);
}

#[tokio::test]
async fn consumed_pass_no_longer_grants_fileinfo() {
    let svc = start_service().await;
    let client = client();
    let pass = obtain_pass(&client, &svc.base_url).await;

    // Consume through the store directly so the server stays up for the
    // follow-up request.
    let pass_id = pass.split('=').nth(1).expect("cookie value");
    assert!(svc.passes.consume(pass_id));

    let resp = client
        .get(format!("{}/api/fileinfo", svc.base_url))
        .header(reqwest::header::COOKIE, &pass)
        .send()
        .await
        .expect("request");
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn forged_pass_is_rejected() {
    let svc = start_service().await;
    let resp = client()
        .get(format!("{}/download", svc.base_url))
        .header(
            reqwest::header::COOKIE,
            format!("buchi_pass_id={}", "ab".repeat(32)),
        )
        .send()
        .await
        .expect("request");
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn interrupt_with_no_transfers_stops_the_server() {
    let svc = start_service().await;

    // Equivalent of SIGINT/SIGTERM: both converge on the same handle.
    svc.shutdown.trigger();
    // A second trigger (e.g. a download finishing at the same moment)
    // must be harmless.
    svc.shutdown.trigger();

    tokio::time::timeout(Duration::from_secs(5), svc.server)
        .await
        .expect("server stopped within the bound")
        .expect("join")
        .expect("clean exit");
    // No URL was ever written and no passes issued, just a clean stop.
    assert!(svc.device.written_urls().is_empty());
}
