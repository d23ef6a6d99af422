//! REST client for the dashboard API
//!
//! Every authenticated call goes through [`ApiClient::send_authed`], which
//! attaches the bearer token and performs the single refresh-and-replay on
//! a 401.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use futures_util::stream;
use reqwest::multipart::{Form, Part};
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::{mpsc, Mutex};

use crate::error::{ApiError, ApiResult};
use crate::models::{
    AdminUser, DashboardStats, FileRecord, Kpi, KpiDraft, Permission, Role, RoleRef, TokenPair,
    Tool, ToolDraft, UserProfile, UserRole,
};
use crate::storage::TokenStore;

/// Upload body chunk size; one native progress event per chunk
const UPLOAD_CHUNK: usize = 16 * 1024;

/// A report file read into memory, ready to be posted
#[derive(Clone, Debug)]
pub struct ReportFile {
    pub file_name: String,
    pub bytes: Arc<Vec<u8>>,
}

impl ReportFile {
    pub async fn read(path: &Path) -> ApiResult<Self> {
        let bytes = tokio::fs::read(path).await?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| String::from("report"));
        Ok(ReportFile {
            file_name,
            bytes: Arc::new(bytes),
        })
    }

    pub fn len(&self) -> u64 {
        self.bytes.len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    tokens: Arc<Mutex<TokenStore>>,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration, tokens: TokenStore) -> Self {
        ApiClient {
            http: create_client(timeout),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            tokens: Arc::new(Mutex::new(tokens)),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub async fn has_session(&self) -> bool {
        self.tokens.lock().await.is_signed_in()
    }

    // ========================
    // Auth
    // ========================

    /// Exchanges credentials for a token pair and stores it
    pub async fn login(&self, email: &str, password: &str) -> ApiResult<()> {
        let resp = self
            .http
            .post(self.url("/api/auth/token"))
            .form(&[("email", email), ("username", email), ("password", password)])
            .send()
            .await?;
        let tokens: TokenPair = read_json(resp).await?;
        self.store_tokens(tokens).await;
        Ok(())
    }

    pub async fn signup(&self, email: &str, username: &str, password: &str) -> ApiResult<UserProfile> {
        let body = serde_json::json!({ "email": email, "username": username, "password": password });
        let resp = self.http.post(self.url("/api/auth/signup")).json(&body).send().await?;
        read_json(resp).await
    }

    pub async fn profile(&self) -> ApiResult<UserProfile> {
        self.get_json("/api/auth/me").await
    }

    pub async fn user_role(&self, user_id: i64) -> ApiResult<Option<RoleRef>> {
        let body: UserRole = self.get_json(&format!("/api/users/{}/role", user_id)).await?;
        Ok(body.role)
    }

    pub async fn logout(&self) {
        if let Err(e) = self.tokens.lock().await.clear() {
            tracing::warn!(error = %e, "Failed to clear token file");
        }
    }

    /// One refresh attempt using the stored refresh token
    async fn refresh(&self) -> ApiResult<()> {
        let refresh_token = self
            .tokens
            .lock()
            .await
            .refresh_token()
            .map(str::to_string)
            .ok_or(ApiError::SessionExpired)?;

        tracing::info!("Access token rejected, refreshing");
        let resp = self
            .http
            .post(self.url("/api/auth/refresh"))
            .bearer_auth(refresh_token)
            .send()
            .await?;
        let tokens: TokenPair = read_json(resp).await?;
        self.store_tokens(tokens).await;
        Ok(())
    }

    async fn store_tokens(&self, tokens: TokenPair) {
        if let Err(e) = self.tokens.lock().await.save(tokens) {
            // Keep the in-memory session even if the file cannot be written
            tracing::warn!(error = %e, "Failed to persist tokens");
        }
    }

    async fn expire_session(&self) -> ApiError {
        self.logout().await;
        ApiError::SessionExpired
    }

    /// Sends an authenticated request built by `build`.
    ///
    /// `build` may run twice: once with the current access token and, after
    /// a 401 and a successful refresh, once more with the new one.
    pub async fn send_authed<F>(&self, build: F) -> ApiResult<Response>
    where
        F: Fn(&reqwest::Client) -> RequestBuilder,
    {
        let resp = self.send_with_token(&build).await?;
        if resp.status() != StatusCode::UNAUTHORIZED {
            return check_status(resp).await;
        }

        if let Err(e) = self.refresh().await {
            tracing::warn!(error = %e, "Token refresh failed");
            return Err(self.expire_session().await);
        }

        let resp = self.send_with_token(&build).await?;
        if resp.status() == StatusCode::UNAUTHORIZED {
            return Err(self.expire_session().await);
        }
        check_status(resp).await
    }

    async fn send_with_token<F>(&self, build: &F) -> ApiResult<Response>
    where
        F: Fn(&reqwest::Client) -> RequestBuilder,
    {
        let token = self.tokens.lock().await.access_token().map(str::to_string);
        let mut builder = build(&self.http);
        if let Some(token) = token {
            builder = builder.bearer_auth(token);
        }
        Ok(builder.send().await?)
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> ApiResult<T> {
        let url = self.url(path);
        let resp = self.send_authed(|http| http.get(&url)).await?;
        Ok(resp.json().await?)
    }

    async fn send_json<B, T>(&self, method: Method, path: &str, body: &B) -> ApiResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = self.url(path);
        let resp = self
            .send_authed(|http| http.request(method.clone(), &url).json(body))
            .await?;
        Ok(resp.json().await?)
    }

    /// For endpoints whose response body we do not need
    async fn send_empty(&self, method: Method, path: &str, body: Option<&serde_json::Value>) -> ApiResult<()> {
        let url = self.url(path);
        self.send_authed(|http| {
            let builder = http.request(method.clone(), &url);
            match body {
                Some(body) => builder.json(body),
                None => builder,
            }
        })
        .await?;
        Ok(())
    }

    // ========================
    // KPIs
    // ========================

    /// All KPIs; the Sources view filters by level locally
    pub async fn list_kpis(&self) -> ApiResult<Vec<Kpi>> {
        self.get_json("/api/dashboard/kpis").await
    }

    pub async fn create_kpi(&self, draft: &KpiDraft) -> ApiResult<Kpi> {
        self.send_json(Method::POST, "/api/dashboard/kpis", draft).await
    }

    pub async fn update_kpi(&self, id: i64, draft: &KpiDraft) -> ApiResult<Kpi> {
        self.send_json(Method::PUT, &format!("/api/dashboard/kpis/{}", id), draft).await
    }

    pub async fn delete_kpi(&self, id: i64) -> ApiResult<()> {
        self.send_empty(Method::DELETE, &format!("/api/dashboard/kpis/{}", id), None).await
    }

    // ========================
    // Tools
    // ========================

    pub async fn list_tools(&self) -> ApiResult<Vec<Tool>> {
        self.get_json("/api/dashboard/tools").await
    }

    pub async fn create_tool(&self, draft: &ToolDraft) -> ApiResult<Tool> {
        self.send_json(Method::POST, "/api/dashboard/tools", draft).await
    }

    pub async fn update_tool(&self, id: i64, draft: &ToolDraft) -> ApiResult<Tool> {
        self.send_json(Method::PUT, &format!("/api/dashboard/tools/{}", id), draft).await
    }

    pub async fn delete_tool(&self, id: i64) -> ApiResult<()> {
        self.send_empty(Method::DELETE, &format!("/api/dashboard/tools/{}", id), None).await
    }

    pub async fn stats(&self) -> ApiResult<DashboardStats> {
        self.get_json("/api/dashboard/stats").await
    }

    // ========================
    // Files
    // ========================

    pub async fn list_files(&self) -> ApiResult<Vec<FileRecord>> {
        self.get_json("/api/dashboard/files").await
    }

    pub async fn file_status(&self, id: i64) -> ApiResult<FileRecord> {
        self.get_json(&format!("/api/dashboard/files/{}", id)).await
    }

    /// Multipart upload of `file` for `tool_id`. Native progress (percent of
    /// bytes handed to the transport) is sent on `progress`.
    pub async fn upload_file(
        &self,
        tool_id: i64,
        file: &ReportFile,
        progress: mpsc::UnboundedSender<u8>,
    ) -> ApiResult<FileRecord> {
        let url = self.url(&format!("/api/dashboard/files/upload?tool_id={}", tool_id));
        let resp = self
            .send_authed(|http| http.post(&url).multipart(upload_form(file, progress.clone())))
            .await?;
        Ok(resp.json().await?)
    }

    // ========================
    // Admin
    // ========================

    pub async fn list_users(&self) -> ApiResult<Vec<AdminUser>> {
        self.get_json("/api/admin/users").await
    }

    pub async fn delete_user(&self, user_id: i64) -> ApiResult<()> {
        self.send_empty(Method::DELETE, &format!("/api/admin/users/{}", user_id), None).await
    }

    pub async fn list_roles(&self) -> ApiResult<Vec<Role>> {
        self.get_json("/api/roles").await
    }

    pub async fn list_permissions(&self) -> ApiResult<Vec<Permission>> {
        self.get_json("/api/permissions").await
    }

    pub async fn assign_role(&self, user_id: i64, role_id: i64) -> ApiResult<()> {
        self.send_empty(Method::POST, &format!("/api/admin/users/{}/role/{}", user_id, role_id), None)
            .await
    }

    pub async fn add_user_permission(&self, user_id: i64, permission_id: i64) -> ApiResult<()> {
        let path = format!("/api/admin/users/{}/permissions/{}", user_id, permission_id);
        self.send_empty(Method::POST, &path, None).await
    }

    pub async fn remove_user_permission(&self, user_id: i64, permission_id: i64) -> ApiResult<()> {
        let path = format!("/api/admin/users/{}/permissions/{}", user_id, permission_id);
        self.send_empty(Method::DELETE, &path, None).await
    }

    pub async fn role_permissions(&self, role_id: i64) -> ApiResult<Vec<Permission>> {
        self.get_json(&format!("/api/role/{}/permissions", role_id)).await
    }

    pub async fn add_role_permissions(&self, role_id: i64, permission_ids: &[i64]) -> ApiResult<()> {
        let body = serde_json::json!({ "permission_ids": permission_ids });
        self.send_empty(Method::POST, &format!("/api/role/{}/permissions", role_id), Some(&body))
            .await
    }

    pub async fn remove_role_permissions(&self, role_id: i64, permission_ids: &[i64]) -> ApiResult<()> {
        let body = serde_json::json!({ "permission_ids": permission_ids });
        self.send_empty(Method::DELETE, &format!("/api/role/{}/permissions", role_id), Some(&body))
            .await
    }
}

/// Builds the multipart body, reporting progress as chunks are consumed
fn upload_form(file: &ReportFile, progress: mpsc::UnboundedSender<u8>) -> Form {
    let total = file.len().max(1);
    let chunks: Vec<Vec<u8>> = file.bytes.chunks(UPLOAD_CHUNK).map(<[u8]>::to_vec).collect();
    let mut sent = 0u64;
    let body = stream::iter(chunks.into_iter().map(move |chunk| {
        sent += chunk.len() as u64;
        let _ = progress.send((sent * 100 / total) as u8);
        Ok::<_, std::io::Error>(chunk)
    }));
    let part = Part::stream_with_length(reqwest::Body::wrap_stream(body), file.len())
        .file_name(file.file_name.clone());
    Form::new().part("file", part)
}

async fn check_status(resp: Response) -> ApiResult<Response> {
    if resp.status().is_success() {
        return Ok(resp);
    }
    let status = resp.status().as_u16();
    let body = resp.text().await.unwrap_or_default();
    Err(ApiError::from_response(status, &body))
}

async fn read_json<T: DeserializeOwned>(resp: Response) -> ApiResult<T> {
    let resp = check_status(resp).await?;
    Ok(resp.json().await?)
}

/// Create an HTTP client with default configuration
pub fn create_client(timeout: Duration) -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .unwrap_or_else(|_| reqwest::Client::new())
}

#[cfg(test)]
#[path = "tests/client_tests.rs"]
mod tests;
