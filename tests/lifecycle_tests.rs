//! Integration Tests for the Process Lifecycle
//!
//! Serves on a real bound listener and drives it with reqwest.

use std::sync::Arc;
use std::time::Duration;

use axum::{routing::get, Router};
use scrape_gateway::{
    cache::{CachePolicy, MemoryStore},
    create_router,
    lifecycle::{
        self, serve_on, KeepAlivePinger, LifecycleController, LifecycleState, ServeOutcome,
        ShutdownOutcome, ShutdownTrigger,
    },
    AppState, Config, DeploymentEnv, RemoteProvider,
};
use tokio::net::TcpListener;

async fn bind() -> (TcpListener, String) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base = format!("http://{}", listener.local_addr().unwrap());
    (listener, base)
}

#[tokio::test]
async fn test_drain_lets_in_flight_request_finish() {
    let app = Router::new().route(
        "/slow",
        get(|| async {
            tokio::time::sleep(Duration::from_millis(800)).await;
            "done"
        }),
    );
    let (listener, base) = bind().await;
    let controller = Arc::new(LifecycleController::new(Duration::from_secs(5)));
    let server = tokio::spawn(serve_on(listener, app, controller.clone()));

    let slow = {
        let url = format!("{}/slow", base);
        tokio::spawn(async move { reqwest::get(url).await.unwrap().text().await.unwrap() })
    };
    tokio::time::sleep(Duration::from_millis(100)).await;

    assert_eq!(
        controller.shutdown(ShutdownTrigger::Terminate),
        ShutdownOutcome::Draining
    );
    assert_eq!(
        controller.shutdown(ShutdownTrigger::Interrupt),
        ShutdownOutcome::AlreadyDraining
    );
    assert_eq!(controller.state(), LifecycleState::Draining);

    // New connections are refused while the open request drains
    tokio::time::sleep(Duration::from_millis(50)).await;
    let client = reqwest::Client::builder()
        .timeout(Duration::from_millis(300))
        .build()
        .unwrap();
    assert!(client.get(format!("{}/health", base)).send().await.is_err());
    assert!(!slow.is_finished());

    assert_eq!(slow.await.unwrap(), "done");

    let outcome = tokio::time::timeout(Duration::from_secs(5), server)
        .await
        .expect("server should finish draining")
        .unwrap()
        .unwrap();
    assert_eq!(outcome, ServeOutcome::Drained);
    assert_eq!(controller.state(), LifecycleState::Terminated);

    // Listener is closed once drained
    assert!(reqwest::get(format!("{}/slow", base)).await.is_err());
}

#[tokio::test]
async fn test_gateway_router_serves_over_tcp() {
    let config = Config::default();
    let state = AppState::new(
        Arc::new(MemoryStore::new(10)),
        CachePolicy::from_config(&config),
        Arc::new(RemoteProvider::new("http://127.0.0.1:9").unwrap()),
    );
    let (listener, base) = bind().await;
    let controller = Arc::new(LifecycleController::new(Duration::from_secs(1)));
    let server = tokio::spawn(serve_on(
        listener,
        create_router(state, &config),
        controller.clone(),
    ));

    let health: serde_json::Value = reqwest::get(format!("{}/health", base))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(health["status"], "healthy");

    // Unreachable upstream surfaces as an error envelope, not a dropped connection
    let response = reqwest::get(format!("{}/api/v2/manga/mangahere/hot", base))
        .await
        .unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::INTERNAL_SERVER_ERROR);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["status"], 500);

    controller.shutdown(ShutdownTrigger::Interrupt);
    let outcome = tokio::time::timeout(Duration::from_secs(5), server)
        .await
        .unwrap()
        .unwrap()
        .unwrap();
    assert_eq!(outcome, ServeOutcome::Drained);
}

#[tokio::test]
async fn test_serverless_env_skips_listener_and_keepalive() {
    let (occupied, _) = bind().await;
    let config = Config {
        server_port: occupied.local_addr().unwrap().port(),
        deployment_env: DeploymentEnv::Vercel,
        hostname: Some("gateway.vercel.app".into()),
        ..Config::default()
    };
    let controller = Arc::new(LifecycleController::new(Duration::from_secs(1)));

    let outcome = lifecycle::run(&config, Router::new(), controller.clone())
        .await
        .expect("serverless run must not try to bind");

    assert_eq!(outcome, ServeOutcome::Hosted(DeploymentEnv::Vercel));
    assert_eq!(controller.state(), LifecycleState::Hosted);
    assert!(KeepAlivePinger::from_config(&config).unwrap().is_none());
    assert_eq!(
        controller.shutdown(ShutdownTrigger::Terminate),
        ShutdownOutcome::Ignored
    );
}
