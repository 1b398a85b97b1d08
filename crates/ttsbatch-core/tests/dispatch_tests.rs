use std::collections::HashSet;
use std::net::SocketAddr;
use std::time::{Duration, Instant};

use axum::{http::StatusCode, routing::post, Router};
use ttsbatch_core::{Batch, BatchRequester, PayloadTemplate, TtsPayload};
use ttsbatch_echo::{app_with, EchoState};

async fn spawn_server(app: Router) -> (SocketAddr, tokio::task::JoinHandle<()>) {
    let listener = tokio::net::TcpListener::bind(("127.0.0.1", 0)).await.unwrap();
    let addr = listener.local_addr().unwrap();
    let srv = tokio::spawn(async move { axum::serve(listener, app).await.unwrap(); });
    (addr, srv)
}

#[tokio::test]
async fn three_requests_all_ok_with_distinct_indexes() {
    let (addr, srv) = spawn_server(app_with(EchoState::new())).await;
    let requester = BatchRequester::new(&format!("http://{addr}/tts")).unwrap();
    let batch = Batch::generate(&PayloadTemplate::default(), 3).unwrap();

    let mut lines = Vec::new();
    let reports = requester.dispatch(&batch, |r| lines.push(r.to_string())).await;

    assert_eq!(reports.len(), 3);
    assert_eq!(lines.len(), 3);
    let indexes: HashSet<usize> = reports.iter().map(|r| r.index).collect();
    assert_eq!(indexes, HashSet::from([0, 1, 2]));
    for r in &reports {
        assert_eq!(*r.outcome.as_ref().unwrap(), StatusCode::OK);
        assert!(lines.contains(&format!("Request sent with status: 200 - {}", r.index)));
    }

    srv.abort();
}

#[tokio::test]
async fn every_payload_reaches_the_server_exactly_once() {
    let state = EchoState::recording();
    let (addr, srv) = spawn_server(app_with(state.clone())).await;
    let requester = BatchRequester::new(&format!("http://{addr}/tts")).unwrap();
    let batch = Batch::generate(&PayloadTemplate::default(), 30).unwrap();

    let reports = requester.dispatch(&batch, |_| {}).await;
    assert_eq!(reports.len(), 30);
    assert!(reports.iter().all(|r| r.is_success()));

    let received = state.received().await;
    assert_eq!(received.len(), 30);
    assert_eq!(state.requests_total(), 30);
    let files: HashSet<String> = received
        .iter()
        .map(|body| serde_json::from_str::<TtsPayload>(body).unwrap().output_file)
        .collect();
    let expected: HashSet<String> = (0..30).map(|i| format!("output_file_{i}")).collect();
    assert_eq!(files, expected);

    srv.abort();
}

#[tokio::test]
async fn unreachable_server_reports_every_request_as_failed() {
    let addr = {
        let listener = tokio::net::TcpListener::bind(("127.0.0.1", 0)).await.unwrap();
        listener.local_addr().unwrap()
    };
    let requester = BatchRequester::new(&format!("http://{addr}/tts")).unwrap();
    let batch = Batch::generate(&PayloadTemplate::default(), 5).unwrap();

    let reports = tokio::time::timeout(Duration::from_secs(10), requester.dispatch(&batch, |_| {}))
        .await
        .expect("dispatch should not hang");

    assert_eq!(reports.len(), 5);
    assert!(reports.iter().all(|r| !r.is_success()));
    for r in &reports {
        let line = r.to_string();
        assert!(line.starts_with("An error occurred: "));
        assert!(line.ends_with(&format!(" - {}", r.index)));
        // the cause below reqwest's own message must survive
        let cause = line.to_lowercase();
        assert!(cause.contains("connect"), "no cause in {line:?}");
    }
}

#[tokio::test]
async fn reports_carry_the_servers_actual_status() {
    let app = Router::new().route("/tts", post(|| async { StatusCode::SERVICE_UNAVAILABLE }));
    let (addr, srv) = spawn_server(app).await;
    let requester = BatchRequester::new(&format!("http://{addr}/tts")).unwrap();
    let batch = Batch::generate(&PayloadTemplate::default(), 4).unwrap();

    let reports = requester.dispatch(&batch, |_| {}).await;
    assert_eq!(reports.len(), 4);
    for r in &reports {
        assert_eq!(*r.outcome.as_ref().unwrap(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(r.to_string(), format!("Request sent with status: 503 - {}", r.index));
    }

    srv.abort();
}

#[tokio::test]
async fn requests_are_not_serialized() {
    let delay = Duration::from_millis(400);
    let (addr, srv) = spawn_server(app_with(EchoState::with_delay(Some(delay)))).await;
    let requester = BatchRequester::new(&format!("http://{addr}/tts")).unwrap();
    let batch = Batch::generate(&PayloadTemplate::default(), 10).unwrap();

    let start = Instant::now();
    let reports = requester.dispatch(&batch, |_| {}).await;
    let elapsed = start.elapsed();

    assert_eq!(reports.len(), 10);
    assert!(reports.iter().all(|r| r.is_success()));
    assert!(elapsed < delay * 5, "batch took {elapsed:?}");

    srv.abort();
}

#[test]
fn invalid_url_is_rejected() {
    assert!(BatchRequester::new("not a url").is_err());
}
