use super::*;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use axum::{
    extract::{Multipart, Path as UrlPath, Query, State},
    http::{HeaderMap, StatusCode as AxumStatus},
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use tokio::net::TcpListener;

#[derive(Clone, Default)]
struct AuthServer {
    refresh_calls: Arc<AtomicUsize>,
    me_calls: Arc<AtomicUsize>,
    /// When false the refresh endpoint rejects every token
    refresh_works: bool,
    /// When true even refreshed tokens are rejected by /me
    reject_everything: bool,
    /// Every upload attempt the server saw
    uploads: Arc<std::sync::Mutex<Vec<ReceivedUpload>>>,
}

#[derive(Clone, Debug, PartialEq)]
struct ReceivedUpload {
    part: String,
    file_name: Option<String>,
    len: usize,
    tool_id: Option<String>,
    authorized: bool,
}

fn bearer(headers: &HeaderMap) -> String {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .unwrap_or_default()
        .to_string()
}

async fn me(State(server): State<AuthServer>, headers: HeaderMap) -> (AxumStatus, Json<serde_json::Value>) {
    server.me_calls.fetch_add(1, Ordering::SeqCst);
    if server.reject_everything || bearer(&headers) != "fresh-access" {
        return (AxumStatus::UNAUTHORIZED, Json(json!({"detail": "Could not validate credentials"})));
    }
    (
        AxumStatus::OK,
        Json(json!({"id": 1, "email": "ana@soc.local", "username": "ana", "is_active": true, "is_superuser": true})),
    )
}

async fn refresh(State(server): State<AuthServer>, headers: HeaderMap) -> (AxumStatus, Json<serde_json::Value>) {
    server.refresh_calls.fetch_add(1, Ordering::SeqCst);
    if !server.refresh_works || bearer(&headers) != "old-refresh" {
        return (AxumStatus::UNAUTHORIZED, Json(json!({"detail": "Invalid refresh token"})));
    }
    (
        AxumStatus::OK,
        Json(json!({"access_token": "fresh-access", "refresh_token": "fresh-refresh", "token_type": "bearer"})),
    )
}

async fn login(body: String) -> (AxumStatus, Json<serde_json::Value>) {
    if body.contains("password=hunter2") {
        (
            AxumStatus::OK,
            Json(json!({"access_token": "fresh-access", "refresh_token": "fresh-refresh"})),
        )
    } else if body.contains("unverified") {
        (AxumStatus::FORBIDDEN, Json(json!({"detail": crate::constants::EMAIL_NOT_VERIFIED_DETAIL})))
    } else {
        (AxumStatus::UNAUTHORIZED, Json(json!({"detail": "Incorrect email or password"})))
    }
}

async fn create_kpi() -> (AxumStatus, Json<serde_json::Value>) {
    (
        AxumStatus::UNPROCESSABLE_ENTITY,
        Json(json!({"detail": [{"loc": ["body", "target"], "msg": "field required", "type": "missing"}]})),
    )
}

async fn upload(
    State(server): State<AuthServer>,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
    mut multipart: Multipart,
) -> (AxumStatus, Json<serde_json::Value>) {
    // Read the whole body even when rejecting, like a real server would
    let mut parts = Vec::new();
    while let Some(field) = multipart.next_field().await.expect("multipart field") {
        let part = field.name().unwrap_or_default().to_string();
        let file_name = field.file_name().map(str::to_string);
        let len = field.bytes().await.expect("field bytes").len();
        parts.push((part, file_name, len));
    }
    let authorized = bearer(&headers) == "fresh-access";
    for (part, file_name, len) in &parts {
        server.uploads.lock().unwrap().push(ReceivedUpload {
            part: part.clone(),
            file_name: file_name.clone(),
            len: *len,
            tool_id: query.get("tool_id").cloned(),
            authorized,
        });
    }
    if !authorized {
        return (AxumStatus::UNAUTHORIZED, Json(json!({"detail": "Could not validate credentials"})));
    }
    let (_, file_name, len) = parts.first().cloned().unwrap_or_default();
    (
        AxumStatus::OK,
        Json(json!({"id": 77, "filename": file_name, "size": len, "status": "pending"})),
    )
}

async fn user_role(UrlPath(user_id): UrlPath<i64>) -> Json<serde_json::Value> {
    match user_id {
        1 => Json(json!({"role": {"id": 3, "name": "Strategic"}})),
        _ => Json(json!({"role": null})),
    }
}

async fn spawn_server(server: AuthServer) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    let app = Router::new()
        .route("/api/auth/me", get(me))
        .route("/api/auth/refresh", post(refresh))
        .route("/api/auth/token", post(login))
        .route("/api/dashboard/kpis", post(create_kpi))
        .route("/api/dashboard/files/upload", post(upload))
        .route("/api/users/:id/role", get(user_role))
        .with_state(server);
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    format!("http://{}", addr)
}

fn stale_session() -> TokenStore {
    TokenStore::in_memory(Some(TokenPair {
        access_token: "stale-access".into(),
        refresh_token: "old-refresh".into(),
        token_type: "bearer".into(),
    }))
}

#[tokio::test]
async fn test_expired_access_token_is_refreshed_once_and_replayed() {
    let server = AuthServer {
        refresh_works: true,
        ..Default::default()
    };
    let url = spawn_server(server.clone()).await;
    let client = ApiClient::new(url, Duration::from_secs(5), stale_session());

    let profile = client.profile().await.expect("profile after refresh");
    assert_eq!(profile.username, "ana");
    assert_eq!(server.refresh_calls.load(Ordering::SeqCst), 1);
    assert_eq!(server.me_calls.load(Ordering::SeqCst), 2);
    assert_eq!(
        client.tokens.lock().await.refresh_token(),
        Some("fresh-refresh")
    );
}

#[tokio::test]
async fn test_failed_refresh_clears_tokens() {
    let server = AuthServer::default();
    let url = spawn_server(server.clone()).await;
    let client = ApiClient::new(url, Duration::from_secs(5), stale_session());

    let err = client.profile().await.unwrap_err();
    assert!(err.is_session_expired());
    assert_eq!(server.refresh_calls.load(Ordering::SeqCst), 1);
    assert_eq!(server.me_calls.load(Ordering::SeqCst), 1);
    assert!(!client.has_session().await);
}

#[tokio::test]
async fn test_second_401_does_not_refresh_again() {
    let server = AuthServer {
        refresh_works: true,
        reject_everything: true,
        ..Default::default()
    };
    let url = spawn_server(server.clone()).await;
    let client = ApiClient::new(url, Duration::from_secs(5), stale_session());

    let err = client.profile().await.unwrap_err();
    assert!(err.is_session_expired());
    assert_eq!(server.refresh_calls.load(Ordering::SeqCst), 1);
    assert_eq!(server.me_calls.load(Ordering::SeqCst), 2);
    assert!(!client.has_session().await);
}

#[tokio::test]
async fn test_login_stores_tokens_and_bad_credentials_do_not_refresh() {
    let server = AuthServer::default();
    let url = spawn_server(server.clone()).await;
    let client = ApiClient::new(url, Duration::from_secs(5), TokenStore::in_memory(None));

    let err = client.login("ana@soc.local", "wrong").await.unwrap_err();
    assert_eq!(err.status(), Some(401));
    assert_eq!(err.user_message("Login failed"), "Incorrect email or password");
    assert_eq!(server.refresh_calls.load(Ordering::SeqCst), 0);

    client.login("ana@soc.local", "hunter2").await.expect("login");
    assert!(client.has_session().await);
    assert_eq!(client.profile().await.expect("profile").email, "ana@soc.local");
}

#[tokio::test]
async fn test_unverified_login_surfaces_backend_detail() {
    let url = spawn_server(AuthServer::default()).await;
    let client = ApiClient::new(url, Duration::from_secs(5), TokenStore::in_memory(None));

    let err = client.login("unverified@soc.local", "x").await.unwrap_err();
    assert_eq!(err.status(), Some(403));
    assert_eq!(err.user_message(""), crate::constants::EMAIL_NOT_VERIFIED_DETAIL);
}

#[tokio::test]
async fn test_validation_errors_use_first_message() {
    let url = spawn_server(AuthServer::default()).await;
    let client = ApiClient::new(
        url,
        Duration::from_secs(5),
        TokenStore::in_memory(Some(TokenPair {
            access_token: "fresh-access".into(),
            refresh_token: "fresh-refresh".into(),
            token_type: "bearer".into(),
        })),
    );

    let err = client.create_kpi(&KpiDraft::default()).await.unwrap_err();
    assert_eq!(err.status(), Some(422));
    assert_eq!(err.user_message("Error saving KPI"), "field required");
}

#[tokio::test]
async fn test_unreachable_server_is_a_transport_error() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let client = ApiClient::new(format!("http://{}", addr), Duration::from_secs(2), stale_session());
    let err = client.list_tools().await.unwrap_err();
    assert!(matches!(err, ApiError::Transport(_)), "got {:?}", err);
}

fn fresh_session() -> TokenStore {
    TokenStore::in_memory(Some(TokenPair {
        access_token: "fresh-access".into(),
        refresh_token: "fresh-refresh".into(),
        token_type: "bearer".into(),
    }))
}

#[tokio::test]
async fn test_multipart_upload_is_rebuilt_after_refresh() {
    let server = AuthServer {
        refresh_works: true,
        ..Default::default()
    };
    let url = spawn_server(server.clone()).await;
    let client = ApiClient::new(url, Duration::from_secs(5), stale_session());
    let file = ReportFile {
        file_name: "scan.nessus".into(),
        bytes: Arc::new(vec![7u8; 100_000]),
    };
    let (progress_tx, mut progress_rx) = mpsc::unbounded_channel();

    let record = client.upload_file(5, &file, progress_tx).await.expect("upload");
    assert_eq!(record.id, 77);
    assert_eq!(record.filename, "scan.nessus");
    assert_eq!(record.size, Some(100_000));
    assert_eq!(server.refresh_calls.load(Ordering::SeqCst), 1);

    let uploads = server.uploads.lock().unwrap().clone();
    assert_eq!(uploads.len(), 2, "rejected attempt plus replay: {:?}", uploads);
    assert!(!uploads[0].authorized);
    assert_eq!(
        uploads[1],
        ReceivedUpload {
            part: "file".into(),
            file_name: Some("scan.nessus".into()),
            len: 100_000,
            tool_id: Some("5".into()),
            authorized: true,
        }
    );
    // The replayed body is complete, not the drained stream of the first try
    assert_eq!(uploads[0].len, uploads[1].len);

    let mut native = Vec::new();
    while let Ok(pct) = progress_rx.try_recv() {
        native.push(pct);
    }
    assert!(native.len() >= 7, "one event per chunk: {:?}", native);
    assert!(native.iter().all(|p| *p <= 100));
    assert_eq!(native.last(), Some(&100));
}

#[tokio::test]
async fn test_user_role_lookup() {
    let url = spawn_server(AuthServer::default()).await;
    let client = ApiClient::new(url, Duration::from_secs(5), fresh_session());

    let role = client.user_role(1).await.expect("role");
    assert_eq!(role.map(|r| r.name), Some("Strategic".to_string()));
    assert_eq!(client.user_role(2).await.expect("no role"), None);
}
