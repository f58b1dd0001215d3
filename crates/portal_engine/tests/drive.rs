use std::sync::{Arc, Mutex};
use std::time::Duration;

use portal_engine::{
    DriveAuth, DriveConfig, DriveProxyClient, EventSink, GatewayError, GatewayEvent,
};
use pretty_assertions::assert_eq;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[derive(Default)]
struct TestSink {
    events: Arc<Mutex<Vec<GatewayEvent>>>,
}

impl TestSink {
    fn take(&self) -> Vec<GatewayEvent> {
        self.events.lock().unwrap().drain(..).collect()
    }
}

impl EventSink for TestSink {
    fn emit(&self, event: GatewayEvent) {
        self.events.lock().unwrap().push(event);
    }
}

fn client_for(server: &MockServer, auth: DriveAuth) -> DriveProxyClient {
    let config = DriveConfig {
        base_url: server.uri(),
        user_id: "user-1".to_string(),
        connect_timeout: Duration::from_secs(5),
        request_timeout: Duration::from_secs(5),
    };
    DriveProxyClient::new(config, auth).expect("drive client")
}

#[tokio::test]
async fn list_sends_admin_token_and_decodes_entries() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/google/list"))
        .and(query_param("userId", "user-1"))
        .and(query_param("search", "report"))
        .and(header("x-admin-token", "admin-token-1"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(
            r#"{"success":true,"files":[
                {"id":"f1","name":"report.pdf","mimeType":"application/pdf","size":1024},
                {"id":"d1","name":"archive","folder":true}
            ]}"#,
            "application/json",
        ))
        .mount(&server)
        .await;

    let client = client_for(&server, DriveAuth::AdminToken("admin-token-1".to_string()));
    let entries = client.list(None, Some("report")).await.expect("list ok");
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].id, "f1");
    assert_eq!(entries[0].size, Some(1024));
    assert!(entries[1].folder);
}

#[tokio::test]
async fn rejected_envelope_maps_to_provider_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/google/list"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(
            r#"{"success":false,"message":"drive not connected"}"#,
            "application/json",
        ))
        .mount(&server)
        .await;

    let client = client_for(&server, DriveAuth::Anonymous);
    let err = client.list(None, None).await.unwrap_err();
    assert_eq!(
        err,
        GatewayError::Provider("drive not connected".to_string())
    );
}

#[tokio::test]
async fn download_reports_progress_against_content_length() {
    let server = MockServer::start().await;
    let body = vec![7u8; 4096];
    Mock::given(method("GET"))
        .and(path("/api/google/download"))
        .and(query_param("userId", "user-1"))
        .and(query_param("fileId", "f1"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("Content-Length", "4096")
                .set_body_bytes(body.clone()),
        )
        .mount(&server)
        .await;

    let client = client_for(&server, DriveAuth::Bearer("session-1".to_string()));
    let sink = Arc::new(TestSink::default());
    let bytes = client
        .download(5, "f1", sink.clone())
        .await
        .expect("download ok");
    assert_eq!(bytes, body);

    let percents: Vec<u8> = sink
        .take()
        .into_iter()
        .filter_map(|event| match event {
            GatewayEvent::TransferProgress {
                transfer_id: 5,
                percent,
            } => Some(percent),
            _ => None,
        })
        .collect();
    assert!(!percents.is_empty());
    assert_eq!(*percents.last().unwrap(), 100);
    // Progress never runs backwards.
    assert!(percents.windows(2).all(|pair| pair[0] <= pair[1]));
}

#[tokio::test]
async fn upload_emits_byte_progress_and_returns_file_id() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/google/upload"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(
            r#"{"success":true,"fileId":"f-new"}"#,
            "application/json",
        ))
        .mount(&server)
        .await;

    let client = client_for(&server, DriveAuth::AdminToken("admin-token-1".to_string()));
    let sink = Arc::new(TestSink::default());
    let file_id = client
        .upload(9, "report.pdf", "application/pdf", &[1u8; 2048], None, sink.clone())
        .await
        .expect("upload ok");
    assert_eq!(file_id, "f-new");

    let percents: Vec<u8> = sink
        .take()
        .into_iter()
        .filter_map(|event| match event {
            GatewayEvent::TransferProgress {
                transfer_id: 9,
                percent,
            } => Some(percent),
            _ => None,
        })
        .collect();
    assert_eq!(*percents.last().unwrap(), 100);
}

#[tokio::test]
async fn list_settled_retries_exactly_once_when_file_missing() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/google/list"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(
            r#"{"success":true,"files":[{"id":"old","name":"old.txt"}]}"#,
            "application/json",
        ))
        .expect(2)
        .mount(&server)
        .await;

    let client = client_for(&server, DriveAuth::Anonymous);
    // The fresh file never shows up; after one bounded retry the listing
    // is accepted as-is.
    let entries = client.list_settled(None, "f-new").await.expect("list ok");
    assert_eq!(entries.len(), 1);
    server.verify().await;
}

#[tokio::test]
async fn create_folder_and_delete_round_trip() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/google/create-folder"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(
            r#"{"success":true,"folderId":"d-new"}"#,
            "application/json",
        ))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/google/delete"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(
            r#"{"success":true}"#,
            "application/json",
        ))
        .mount(&server)
        .await;

    let client = client_for(&server, DriveAuth::AdminToken("admin-token-1".to_string()));
    let folder_id = client
        .create_folder("reports", None)
        .await
        .expect("folder ok");
    assert_eq!(folder_id, "d-new");
    client.delete("f1").await.expect("delete ok");
}

#[tokio::test]
async fn oauth_start_returns_redirect_url() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/google/oauth/start"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(
            r#"{"success":true,"url":"https://accounts.example.com/oauth"}"#,
            "application/json",
        ))
        .mount(&server)
        .await;

    let client = client_for(&server, DriveAuth::Bearer("session-1".to_string()));
    let url = client.oauth_start().await.expect("oauth ok");
    assert_eq!(url, "https://accounts.example.com/oauth");
}
