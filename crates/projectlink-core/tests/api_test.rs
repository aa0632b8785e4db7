#![allow(clippy::unwrap_used)]
// Integration tests for the ready-gated API façade and batched watching.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use pretty_assertions::assert_eq;
use secrecy::SecretString;
use serde_json::{Value, json};
use url::Url;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use projectlink_api::HubClient;
use projectlink_core::{Api, BoxLink, CoreError, Handler, Reachability, Settings, Visibility, handler};

// ── Helpers ─────────────────────────────────────────────────────────

struct Fixture {
    server: MockServer,
    api: Api,
    link: BoxLink,
    settings: Arc<Settings>,
    visibility: Arc<Visibility>,
}

async fn setup() -> Fixture {
    let server = MockServer::start().await;
    let origin = Url::parse(&server.uri()).unwrap();
    let hub = HubClient::with_client(reqwest::Client::new());
    let link = BoxLink::new(hub.clone(), origin);
    let settings = Arc::new(Settings::new());
    // Ticks are driven by hand unless a test shortens this.
    settings.set_watch_interval(Duration::from_secs(60));
    let visibility = Arc::new(Visibility::default());
    let api = Api::new(
        hub,
        Arc::new(link.clone()),
        Arc::clone(&settings),
        Arc::clone(&visibility),
    );
    Fixture {
        server,
        api,
        link,
        settings,
        visibility,
    }
}

/// Online and authenticated.
async fn ready() -> Fixture {
    let fx = setup().await;
    fx.link.seen_online();
    fx.settings.set_session(Some(SecretString::from("tok".to_string())));
    fx
}

async fn requests_to(server: &MockServer, route: &str) -> Vec<wiremock::Request> {
    server
        .received_requests()
        .await
        .unwrap()
        .into_iter()
        .filter(|r| r.url.path() == route)
        .collect()
}

type Log = Arc<Mutex<Vec<Value>>>;

fn recorder() -> (Log, Handler<Value>) {
    let log: Log = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&log);
    (log, handler(move |v: &Value| sink.lock().unwrap().push(v.clone())))
}

async fn settle() {
    tokio::time::sleep(Duration::from_millis(50)).await;
}

// ── Readiness gating ────────────────────────────────────────────────

#[tokio::test]
async fn test_request_waits_for_online_and_session() {
    let fx = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/resource"))
        .and(header("authorization", "Bearer x"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
        .mount(&fx.server)
        .await;

    let api = fx.api.clone();
    let call = tokio::spawn(async move { api.get::<Value>("resource").await });

    settle().await;
    assert!(fx.server.received_requests().await.unwrap().is_empty());

    fx.link.seen_online();
    settle().await;
    assert!(fx.server.received_requests().await.unwrap().is_empty());

    fx.settings.set_session(Some(SecretString::from("x".to_string())));
    let body = tokio::time::timeout(Duration::from_secs(2), call)
        .await
        .unwrap()
        .unwrap()
        .unwrap();

    assert_eq!(body, json!({"ok": true}));
    assert_eq!(requests_to(&fx.server, "/api/v1/resource").await.len(), 1);
}

#[tokio::test]
async fn test_request_waits_while_hidden() {
    let fx = ready().await;
    fx.visibility.set_visible(false);

    Mock::given(method("DELETE"))
        .and(path("/api/v1/rules/7"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&fx.server)
        .await;

    let api = fx.api.clone();
    let call = tokio::spawn(async move { api.delete::<(), Value>("rules/7", None).await });

    settle().await;
    assert!(fx.server.received_requests().await.unwrap().is_empty());

    fx.visibility.set_visible(true);
    let body = tokio::time::timeout(Duration::from_secs(2), call)
        .await
        .unwrap()
        .unwrap()
        .unwrap();
    assert_eq!(body, Value::Null);
}

#[tokio::test]
async fn test_empty_path_fails_before_waiting() {
    // Neither online nor authenticated: a wait here would hang the test.
    let fx = setup().await;
    let err = fx.api.get::<Value>("").await.unwrap_err();
    assert!(matches!(err, CoreError::InvalidPath { .. }));
}

#[tokio::test]
async fn test_post_sends_json_body_and_api_version() {
    let fx = ready().await;
    fx.settings.set_api_version(2);

    Mock::given(method("POST"))
        .and(path("/api/v2/recipes"))
        .and(body_json(json!({"name": "Lights off at night"})))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"id": "r1"})))
        .mount(&fx.server)
        .await;

    let created: Value = fx
        .api
        .post("recipes", Some(&json!({"name": "Lights off at night"})))
        .await
        .unwrap();
    assert_eq!(created["id"], "r1");
}

#[tokio::test]
async fn test_unauthorized_maps_to_core_error() {
    let fx = ready().await;

    Mock::given(method("GET"))
        .and(path("/api/v1/services"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&fx.server)
        .await;

    let err = fx.api.fetch_services().await.unwrap_err();
    assert!(matches!(err, CoreError::Unauthorized));
}

#[tokio::test]
async fn test_blob_uses_put_with_body_and_accept_header() {
    let fx = ready().await;

    Mock::given(method("PUT"))
        .and(path("/api/v1/channels/get"))
        .and(header("accept", "image/jpeg"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![0xff, 0xd8, 0xff]))
        .mount(&fx.server)
        .await;

    let bytes = fx
        .api
        .blob("channels/get", Some(&json!([{"id": "getter:image.cam-1"}])), Some("image/jpeg"))
        .await
        .unwrap();
    assert_eq!(bytes.as_ref(), &[0xff, 0xd8, 0xff]);
}

// ── Channels ────────────────────────────────────────────────────────

#[tokio::test]
async fn test_fetch_channel_surfaces_error_payload() {
    let fx = ready().await;

    Mock::given(method("PUT"))
        .and(path("/api/v1/channels/get"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"getter:lock-1": {"Error": {"GetterError": "NotFound"}}})),
        )
        .mount(&fx.server)
        .await;

    let err = fx.api.fetch_channel("getter:lock-1").await.unwrap_err();
    assert!(matches!(err, CoreError::Api { status: None, .. }));
}

#[tokio::test]
async fn test_send_channel_body_shape() {
    let fx = ready().await;

    Mock::given(method("PUT"))
        .and(path("/api/v1/channels/set"))
        .and(body_json(json!([[[{"id": "setter:on.hue-1"}], {"LightOn": "On"}]])))
        .respond_with(ResponseTemplate::new(200))
        .mount(&fx.server)
        .await;

    fx.api
        .send_channel("setter:on.hue-1", "LightOn", json!("On"))
        .await
        .unwrap();
}

// ── Watching ────────────────────────────────────────────────────────

#[tokio::test]
async fn test_watchers_share_one_batched_fetch() {
    let fx = ready().await;

    Mock::given(method("PUT"))
        .and(path("/api/v1/channels/get"))
        .and(body_json(json!([{"id": "g1"}, {"id": "g2"}])))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "g1": {"OnOff": "On"},
            "g2": {"Temperature": 21.5}
        })))
        .mount(&fx.server)
        .await;

    let (log1, h1) = recorder();
    let (log2, h2) = recorder();
    let (log1b, h1b) = recorder();
    fx.api.watch("g1", h1).unwrap();
    fx.api.watch("g2", h2).unwrap();
    fx.api.watch("g1", h1b).unwrap();

    fx.api.poll_watched().await.unwrap();

    assert_eq!(requests_to(&fx.server, "/api/v1/channels/get").await.len(), 1);
    assert_eq!(*log1.lock().unwrap(), vec![json!({"OnOff": "On"})]);
    assert_eq!(*log1b.lock().unwrap(), vec![json!({"OnOff": "On"})]);
    assert_eq!(*log2.lock().unwrap(), vec![json!({"Temperature": 21.5})]);
}

#[tokio::test]
async fn test_watch_notifies_only_on_change() {
    let fx = ready().await;

    Mock::given(method("PUT"))
        .and(path("/api/v1/channels/get"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"door": {"DoorLocked": "Locked"}})))
        .up_to_n_times(2)
        .mount(&fx.server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/api/v1/channels/get"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"door": {"DoorLocked": "Unlocked"}})))
        .mount(&fx.server)
        .await;

    let (log, h) = recorder();
    fx.api.watch("door", h).unwrap();

    for _ in 0..3 {
        fx.api.poll_watched().await.unwrap();
    }

    assert_eq!(
        *log.lock().unwrap(),
        vec![json!({"DoorLocked": "Locked"}), json!({"DoorLocked": "Unlocked"})]
    );
}

#[tokio::test]
async fn test_error_shaped_value_is_not_a_change() {
    let fx = ready().await;

    Mock::given(method("PUT"))
        .and(path("/api/v1/channels/get"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"g": {"OnOff": "On"}})))
        .up_to_n_times(1)
        .mount(&fx.server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/api/v1/channels/get"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"g": {"Error": "Timeout"}})))
        .mount(&fx.server)
        .await;

    let (log, h) = recorder();
    fx.api.watch("g", h).unwrap();
    fx.api.poll_watched().await.unwrap();
    fx.api.poll_watched().await.unwrap();

    assert_eq!(*log.lock().unwrap(), vec![json!({"OnOff": "On"})]);
}

#[tokio::test]
async fn test_unwatch_drops_getter_after_last_handler() {
    let fx = ready().await;

    let (_, h1) = recorder();
    let (_, h2) = recorder();
    fx.api.watch("g", Arc::clone(&h1)).unwrap();
    fx.api.watch("g", Arc::clone(&h2)).unwrap();

    fx.api.unwatch("g", &h1).unwrap();
    assert_eq!(fx.api.watched(), vec!["g".to_string()]);

    fx.api.unwatch("g", &h2).unwrap();
    assert!(fx.api.watched().is_empty());

    // Unknown getter: warning only.
    fx.api.unwatch("g", &h2).unwrap();
}

#[tokio::test]
async fn test_watch_timer_polls_until_last_unwatch() {
    let fx = ready().await;
    fx.settings.set_watch_interval(Duration::from_millis(40));

    Mock::given(method("PUT"))
        .and(path("/api/v1/channels/get"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"g": {"OnOff": "Off"}})))
        .mount(&fx.server)
        .await;

    let (log, h) = recorder();
    fx.api.watch("g", Arc::clone(&h)).unwrap();
    tokio::time::sleep(Duration::from_millis(300)).await;

    assert!(!requests_to(&fx.server, "/api/v1/channels/get").await.is_empty());
    assert_eq!(log.lock().unwrap().len(), 1);

    fx.api.unwatch("g", &h).unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;
    let after_stop = requests_to(&fx.server, "/api/v1/channels/get").await.len();
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(requests_to(&fx.server, "/api/v1/channels/get").await.len(), after_stop);
}
