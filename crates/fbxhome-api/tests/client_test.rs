#![allow(clippy::unwrap_used)]
// Integration tests for `FreeboxClient` and `RemoteControlClient` using wiremock.

use std::time::Duration;

use async_trait::async_trait;
use secrecy::SecretString;
use serde_json::json;
use url::Url;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use fbxhome_api::{AppIdentity, ChallengeSigner, Error, FreeboxClient, RemoteControlClient};

// ── Helpers ─────────────────────────────────────────────────────────

struct StaticSigner;

#[async_trait]
impl ChallengeSigner for StaticSigner {
    async fn sign(&self, challenge: &str) -> Result<String, Error> {
        Ok(format!("signed-{challenge}"))
    }
}

async fn setup() -> (MockServer, FreeboxClient) {
    let server = MockServer::start().await;
    let base = Url::parse(&format!("{}/", server.uri())).unwrap();
    let client = FreeboxClient::with_client(reqwest::Client::new(), base, Duration::from_secs(5));
    (server, client)
}

async fn mount_login(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/api/v6/login/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "result": { "logged_in": false, "challenge": "abc" }
        })))
        .mount(server)
        .await;

    Mock::given(method("POST"))
        .and(path("/api/v6/login/session/"))
        .and(body_json(json!({
            "app_id": "fr.freebox.fbxhome",
            "app_version": env!("CARGO_PKG_VERSION"),
            "password": "signed-abc"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "result": { "session_token": "tok-1", "permissions": { "settings": true, "home": true } }
        })))
        .mount(server)
        .await;
}

async fn open_client() -> (MockServer, FreeboxClient) {
    let (server, client) = setup().await;
    mount_login(&server).await;
    client
        .open(&AppIdentity::default(), &StaticSigner)
        .await
        .unwrap();
    (server, client)
}

// ── Session ─────────────────────────────────────────────────────────

#[tokio::test]
async fn test_open_stores_session_token() {
    let (server, client) = open_client().await;
    assert!(client.is_open().await);

    Mock::given(method("GET"))
        .and(path("/api/v6/system/"))
        .and(header("X-Fbx-App-Auth", "tok-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "result": {
                "mac": "F4:CA:E5:00:00:01",
                "firmware_version": "4.8.6",
                "serial": "123456",
                "uptime_val": 3600,
                "model_info": { "name": "fbxgw7-r1/full", "pretty_name": "Freebox v7 (r1)" },
                "sensors": [{ "id": "temp_cpum", "name": "Température CPU M", "value": 61 }]
            }
        })))
        .mount(&server)
        .await;

    let config = client.system_config().await.unwrap();
    assert_eq!(config.model_info.pretty_name, "Freebox v7 (r1)");
    assert_eq!(config.sensors[0].value, Some(61.0));
}

#[tokio::test]
async fn test_open_with_rejected_token_is_auth_failure() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/v6/login/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "result": { "logged_in": false, "challenge": "abc" }
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/v6/login/session/"))
        .respond_with(ResponseTemplate::new(403).set_body_json(json!({
            "success": false,
            "error_code": "invalid_token",
            "msg": "Cette application n'est pas connue"
        })))
        .mount(&server)
        .await;

    let err = client
        .open(&AppIdentity::default(), &StaticSigner)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Authentication { .. }));
    assert!(!client.is_open().await);
}

#[tokio::test]
async fn test_expired_session_maps_to_session_expired() {
    let (server, client) = open_client().await;

    Mock::given(method("GET"))
        .and(path("/api/v6/connection/"))
        .respond_with(ResponseTemplate::new(403).set_body_json(json!({
            "success": false,
            "error_code": "auth_required",
            "msg": "Vous devez vous connecter"
        })))
        .mount(&server)
        .await;

    let err = client.connection_status().await.unwrap_err();
    assert!(matches!(err, Error::SessionExpired));
    assert!(err.is_auth_expired());
}

#[tokio::test]
async fn test_close_logs_out_and_drops_token() {
    let (server, client) = open_client().await;

    Mock::given(method("POST"))
        .and(path("/api/v6/login/logout/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "success": true })))
        .expect(1)
        .mount(&server)
        .await;

    client.close().await.unwrap();
    assert!(!client.is_open().await);
    // Second close is a no-op and does not hit the server again.
    client.close().await.unwrap();
}

// ── Endpoints ───────────────────────────────────────────────────────

#[tokio::test]
async fn test_lan_hosts() {
    let (server, client) = open_client().await;

    Mock::given(method("GET"))
        .and(path("/api/v6/lan/browser/pub/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "result": [{
                "id": "ether-aa:bb:cc:dd:ee:ff",
                "primary_name": "nas",
                "host_type": "nas",
                "vendor_name": "Synology",
                "active": true,
                "last_time_reachable": 1700000000,
                "l2ident": { "id": "AA:BB:CC:DD:EE:FF", "type": "mac_address" },
                "l3connectivities": [{ "addr": "192.168.1.20", "af": "ipv4", "active": true, "reachable": true }]
            }]
        })))
        .mount(&server)
        .await;

    let hosts = client.lan_hosts().await.unwrap();
    assert_eq!(hosts.len(), 1);
    assert_eq!(hosts[0].vendor_name, "Synology");
    assert_eq!(hosts[0].last_time_reachable, Some(1_700_000_000));
    assert_eq!(hosts[0].l3connectivities[0].addr, "192.168.1.20");
}

#[tokio::test]
async fn test_lan_hosts_in_bridge_mode() {
    let (server, client) = open_client().await;

    Mock::given(method("GET"))
        .and(path("/api/v6/lan/browser/pub/"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "success": false,
            "error_code": "nodev",
            "msg": "Interface invalide"
        })))
        .mount(&server)
        .await;

    let err = client.lan_hosts().await.unwrap_err();
    assert_eq!(err.api_error_code(), Some("nodev"));
}

#[tokio::test]
async fn test_empty_station_list_has_no_result() {
    let (server, client) = open_client().await;

    Mock::given(method("GET"))
        .and(path("/api/v6/wifi/ap/0/stations/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "success": true })))
        .mount(&server)
        .await;

    let stations = client.wifi_stations(0).await.unwrap();
    assert!(stations.is_empty());
}

#[tokio::test]
async fn test_home_without_permission() {
    let (server, client) = open_client().await;

    Mock::given(method("GET"))
        .and(path("/api/v6/home/nodes"))
        .respond_with(ResponseTemplate::new(403).set_body_json(json!({
            "success": false,
            "error_code": "insufficient_rights",
            "msg": "Cette application n'est pas autorisée à accéder à cette fonction"
        })))
        .mount(&server)
        .await;

    let err = client.home_nodes().await.unwrap_err();
    assert!(err.is_permission_denied());
}

#[tokio::test]
async fn test_home_endpoint_value() {
    let (server, client) = open_client().await;

    Mock::given(method("GET"))
        .and(path("/api/v6/home/endpoints/7/11"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "result": { "value": "alarm1_armed", "value_type": "string", "refresh": 2000 }
        })))
        .mount(&server)
        .await;

    let value = client.home_endpoint_value(7, 11).await.unwrap();
    assert_eq!(value.value, json!("alarm1_armed"));
}

#[tokio::test]
async fn test_storage_disks_and_raids() {
    let (server, client) = open_client().await;

    Mock::given(method("GET"))
        .and(path("/api/v6/storage/disk/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "result": [{
                "id": 2000,
                "model": "ST1000LM035",
                "type": "internal",
                "state": "enabled",
                "temp": 41,
                "partitions": [{ "id": 2001, "label": "Disque dur", "total_bytes": 1000, "free_bytes": 400 }]
            }]
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v6/storage/raid/"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "success": false,
            "error_code": "invalid_request",
            "msg": "Requête invalide"
        })))
        .mount(&server)
        .await;

    let disks = client.storage_disks().await.unwrap();
    assert_eq!(disks[0].partitions[0].label, "Disque dur");
    assert_eq!(disks[0].temp, Some(41));

    let err = client.storage_raids().await.unwrap_err();
    assert_eq!(err.api_error_code(), Some("invalid_request"));
}

#[tokio::test]
async fn test_call_log() {
    let (server, client) = open_client().await;

    Mock::given(method("GET"))
        .and(path("/api/v6/call/log/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "result": [
                { "id": 2, "number": "0601020304", "name": "Alice", "type": "missed", "datetime": 1700000100, "new": true },
                { "id": 1, "number": "0102030405", "type": "outgoing", "datetime": 1700000000, "duration": 42 }
            ]
        })))
        .mount(&server)
        .await;

    let calls = client.call_log().await.unwrap();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[0].kind, "missed");
    assert!(!calls[1].new);
    assert_eq!(calls[1].duration, 42);
}

#[tokio::test]
async fn test_wifi_global_config_toggle() {
    let (server, client) = open_client().await;

    Mock::given(method("GET"))
        .and(path("/api/v6/wifi/config/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "result": { "enabled": true, "mac_filter_state": "disabled" }
        })))
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/api/v6/wifi/config/"))
        .and(header("X-Fbx-App-Auth", "tok-1"))
        .and(body_json(json!({ "enabled": false })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "result": { "enabled": false, "mac_filter_state": "disabled" }
        })))
        .expect(1)
        .mount(&server)
        .await;

    assert!(client.wifi_global_config().await.unwrap().enabled);
    let updated = client.set_wifi_enabled(false).await.unwrap();
    assert!(!updated.enabled);
}

#[tokio::test]
async fn test_reboot() {
    let (server, client) = open_client().await;

    Mock::given(method("POST"))
        .and(path("/api/v6/system/reboot/"))
        .and(header("X-Fbx-App-Auth", "tok-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "success": true })))
        .expect(1)
        .mount(&server)
        .await;

    client.reboot().await.unwrap();
}

#[tokio::test]
async fn test_non_json_error_body() {
    let (server, client) = open_client().await;

    Mock::given(method("GET"))
        .and(path("/api/v6/connection/"))
        .respond_with(ResponseTemplate::new(502).set_body_string("<html>bad gateway</html>"))
        .mount(&server)
        .await;

    let err = client.connection_status().await.unwrap_err();
    assert!(matches!(err, Error::Http { status: 502, .. }));
    assert!(err.is_transient());
}

// ── Remote control ──────────────────────────────────────────────────

#[tokio::test]
async fn test_remote_send_key() {
    let server = MockServer::start().await;
    let remote = RemoteControlClient::with_client(
        reqwest::Client::new(),
        Url::parse(&format!("{}/", server.uri())).unwrap(),
        SecretString::from("87654321"),
    );

    Mock::given(method("GET"))
        .and(path("/pub/remote_control"))
        .and(query_param("code", "87654321"))
        .and(query_param("key", "power"))
        .and(query_param("long", "true"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    remote.send_key("power", true).await.unwrap();
}

#[tokio::test]
async fn test_remote_wrong_code() {
    let server = MockServer::start().await;
    let remote = RemoteControlClient::with_client(
        reqwest::Client::new(),
        Url::parse(&format!("{}/", server.uri())).unwrap(),
        SecretString::from("00000000"),
    );

    Mock::given(method("GET"))
        .and(path("/pub/remote_control"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&server)
        .await;

    let err = remote.send_key("ok", false).await.unwrap_err();
    assert!(matches!(err, Error::Authentication { .. }));
}
