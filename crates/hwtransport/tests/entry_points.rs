//! Entry point tests with real backends pointed at loopback fakes

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use axum::extract::{RawQuery, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use hwtransport::bridge::{BridgeConfig, BridgeInfo};
use hwtransport::pipe::{ExtensionConfig, PluginConfig};
use hwtransport::{
    configure_transport, init_transport_with, load_transport_with, BackendKind, BridgeSettings,
    ConfigFetchError, ConfigureError, DeviceDescriptor, ExtensionSettings, LoadError,
    PluginSettings, TransportConfig,
};
use tokio::net::TcpListener;

// ----------------------------------------------------------------------------
// Test Utilities
// ----------------------------------------------------------------------------

const CONFIG_BLOB: &[u8] = b"\x0bsigned\x00config";

#[derive(Clone, Default)]
struct Host {
    applied: Arc<Mutex<Option<String>>>,
    queries: Arc<Mutex<Vec<Option<String>>>>,
}

async fn bridge_info(State(host): State<Host>) -> Json<BridgeInfo> {
    Json(BridgeInfo {
        version: "2.1.0".to_string(),
        configured: host.applied.lock().unwrap().is_some(),
    })
}

async fn bridge_configure(State(host): State<Host>, body: String) -> StatusCode {
    *host.applied.lock().unwrap() = Some(body);
    StatusCode::OK
}

async fn bridge_enumerate() -> Json<Vec<DeviceDescriptor>> {
    Json(vec![DeviceDescriptor::new("usb-3", 0x1209, 0x53c1)])
}

async fn config_blob(State(host): State<Host>, RawQuery(query): RawQuery) -> Vec<u8> {
    host.queries.lock().unwrap().push(query);
    CONFIG_BLOB.to_vec()
}

/// One loopback server playing both the bridge daemon and the config host
async fn start_host() -> (SocketAddr, Host) {
    let host = Host::default();
    let app = Router::new()
        .route("/", get(bridge_info))
        .route("/configure", post(bridge_configure))
        .route("/enumerate", get(bridge_enumerate))
        .route("/config", get(config_blob))
        .route("/missing", get(|| async { StatusCode::NOT_FOUND }))
        .with_state(host.clone());

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (addr, host)
}

async fn closed_port() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap()
}

/// Extension relay absent, bridge at `bridge`, plugin host disabled
fn bridge_only(relay: SocketAddr, bridge: SocketAddr) -> TransportConfig {
    TransportConfig {
        config_url: Some(format!("http://{}/config", bridge)),
        extension: ExtensionSettings {
            enabled: true,
            relay: ExtensionConfig::with_address(relay.to_string()),
        },
        bridge: BridgeSettings {
            enabled: true,
            daemon: BridgeConfig::with_url(format!("http://{}", bridge)),
        },
        plugin: PluginSettings {
            enabled: false,
            ..PluginSettings::default()
        },
        ..TransportConfig::default()
    }
}

// ----------------------------------------------------------------------------
// Scenarios
// ----------------------------------------------------------------------------

#[tokio::test]
async fn test_nothing_installed() {
    let relay = closed_port().await;
    let bridge = closed_port().await;
    let config = TransportConfig {
        extension: ExtensionSettings {
            enabled: true,
            relay: ExtensionConfig::with_address(relay.to_string()),
        },
        bridge: BridgeSettings {
            enabled: true,
            daemon: BridgeConfig::with_url(format!("http://{}", bridge)),
        },
        plugin: PluginSettings {
            enabled: true,
            host: PluginConfig::with_program("hwtransport-plugin-host-not-installed"),
        },
        ..TransportConfig::default()
    };

    let err = load_transport_with(&config).await.unwrap_err();

    let LoadError::NoTransportAvailable { failures } = &err;
    let kinds: Vec<BackendKind> = failures.iter().map(|f| f.kind).collect();
    assert_eq!(
        kinds,
        vec![BackendKind::Extension, BackendKind::Bridge, BackendKind::Plugin]
    );
    assert!(err.to_string().starts_with("No transport available"));
}

#[tokio::test]
async fn test_bridge_selected_after_missing_extension() {
    let relay = closed_port().await;
    let (addr, host) = start_host().await;

    let transport = init_transport_with(&bridge_only(relay, addr)).await.unwrap();

    assert_eq!(transport.kind(), BackendKind::Bridge);
    assert_eq!(transport.name(), "bridge 2.1.0");
    assert_eq!(
        host.applied.lock().unwrap().clone(),
        Some(hex::encode(CONFIG_BLOB))
    );
    let queries = host.queries.lock().unwrap().clone();
    assert_eq!(queries.len(), 1);
    assert!(queries[0].as_deref().unwrap().parse::<u64>().is_ok());

    let devices = transport.enumerate(false).await.unwrap();
    assert_eq!(devices[0].path, "usb-3");
}

#[tokio::test]
async fn test_configure_failure_surfaces_fetch_error() {
    let relay = closed_port().await;
    let (addr, host) = start_host().await;

    let loaded = load_transport_with(&bridge_only(relay, addr)).await.unwrap();
    let err = configure_transport(loaded, &format!("http://{}/missing", addr))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        ConfigureError::Fetch(ConfigFetchError::Status { status: 404, .. })
    ));
    assert_eq!(*host.applied.lock().unwrap(), None);
}

#[tokio::test]
async fn test_configure_transport_returns_same_backend() {
    let relay = closed_port().await;
    let (addr, host) = start_host().await;

    let loaded = load_transport_with(&bridge_only(relay, addr)).await.unwrap();
    let name = loaded.name().to_string();
    let transport = configure_transport(loaded, &format!("http://{}/config", addr))
        .await
        .unwrap();

    assert_eq!(transport.name(), name);
    assert!(host.applied.lock().unwrap().is_some());
}
