//! # REST gateway
//!
//! [`DocumentGateway`] over the backend's JSON API:
//!
//! | operation            | request                         |
//! |----------------------|---------------------------------|
//! | fetch_config         | `GET  /api/config`              |
//! | fetch_document_list  | `GET  /api/articles`            |
//! | fetch_document       | `GET  /api/article?path=…`      |
//! | save_document        | `POST /api/article`             |
//! | create_document      | `POST /api/create`              |
//! | delete_document      | `POST /api/delete`              |
//! | compute_diff         | `POST /api/diff`                |
//! | run_build/sync/publish | `POST /api/{build,sync,publish}` |
//! | media                | `GET/POST /api/media`, `POST /api/media/delete` |
//!
//! Requests are authenticated by the browser session cookie of the backend.
//! An expired session shows up either as `401` or as a redirect to the login
//! page; both map to [`GatewayError::Unauthorized`].

use crate::{DocumentGateway, GatewayError, GatewayResult};
use async_trait::async_trait;
use hugocms_common::{
    CmsConfig, CreateRequest, CreateResponse, DiffResponse, DocumentSummary, FetchedDocument,
    MediaFile, MediaScope, MediaUpload, SavePayload, TaskReport,
};
use reqwest::header::{HeaderMap, HeaderValue, COOKIE, LOCATION};
use reqwest::{redirect, Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::json;
use tracing::{debug, instrument, warn};

/// Gateway talking to a running CMS backend
#[derive(Debug, Clone)]
pub struct HttpGateway {
    client: Client,
    base_url: String,
}

/// Builder for [`HttpGateway`]
#[derive(Debug, Clone, Default)]
pub struct HttpGatewayBuilder {
    base_url: String,
    session_cookie: Option<String>,
}

impl HttpGatewayBuilder {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            session_cookie: None,
        }
    }

    /// Raw `Cookie` header value carrying the backend session
    pub fn session_cookie(mut self, cookie: impl Into<String>) -> Self {
        self.session_cookie = Some(cookie.into());
        self
    }

    pub fn build(self) -> GatewayResult<HttpGateway> {
        let mut headers = HeaderMap::new();
        if let Some(cookie) = &self.session_cookie {
            let value = HeaderValue::from_str(cookie)
                .map_err(|e| GatewayError::Network(format!("invalid session cookie: {}", e)))?;
            headers.insert(COOKIE, value);
        }

        // The backend answers unauthenticated requests with a login redirect;
        // following it would turn an auth failure into an HTML decode error.
        let client = Client::builder()
            .default_headers(headers)
            .redirect(redirect::Policy::none())
            .build()?;

        Ok(HttpGateway {
            client,
            base_url: self.base_url.trim_end_matches('/').to_string(),
        })
    }
}

impl HttpGateway {
    pub fn new(base_url: impl Into<String>) -> GatewayResult<Self> {
        HttpGatewayBuilder::new(base_url).build()
    }

    pub fn builder(base_url: impl Into<String>) -> HttpGatewayBuilder {
        HttpGatewayBuilder::new(base_url)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}{}", self.base_url, endpoint)
    }

    async fn send(&self, request: RequestBuilder, subject: &str) -> GatewayResult<Response> {
        let response = request.send().await?;
        check_status(response, subject).await
    }

    async fn send_json<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        subject: &str,
    ) -> GatewayResult<T> {
        let response = self.send(request, subject).await?;
        let bytes = response.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// Build, sync and publish report failures as `500` with a `{status, log}`
    /// body; that body is the useful part, so it is returned as a report.
    async fn run_task(&self, endpoint: &str, body: Option<serde_json::Value>) -> GatewayResult<TaskReport> {
        let mut request = self.client.post(self.url(endpoint));
        if let Some(body) = body {
            request = request.json(&body);
        }
        let response = request.send().await?;
        let status = response.status();

        if is_auth_failure(&response) {
            return Err(GatewayError::Unauthorized);
        }

        let bytes = response.bytes().await?;
        match serde_json::from_slice::<TaskReport>(&bytes) {
            Ok(report) if !report.status.is_empty() => Ok(report),
            _ if status.is_success() => Err(GatewayError::Decode(format!(
                "{} returned no task status",
                endpoint
            ))),
            _ => Err(status_error(status, error_message(&bytes, status), endpoint)),
        }
    }
}

#[async_trait]
impl DocumentGateway for HttpGateway {
    #[instrument(skip_all)]
    async fn fetch_config(&self) -> GatewayResult<CmsConfig> {
        self.send_json(self.client.get(self.url("/api/config")), "config")
            .await
    }

    #[instrument(skip_all)]
    async fn fetch_document_list(&self) -> GatewayResult<Vec<DocumentSummary>> {
        self.send_json(self.client.get(self.url("/api/articles")), "articles")
            .await
    }

    #[instrument(skip(self))]
    async fn fetch_document(&self, path: &str) -> GatewayResult<FetchedDocument> {
        let request = self
            .client
            .get(self.url("/api/article"))
            .query(&[("path", path)]);
        self.send_json(request, path).await
    }

    #[instrument(skip_all, fields(path = payload.path()))]
    async fn save_document(&self, payload: &SavePayload) -> GatewayResult<()> {
        let request = self.client.post(self.url("/api/article")).json(payload);
        self.send(request, payload.path()).await?;
        debug!("saved");
        Ok(())
    }

    #[instrument(skip_all)]
    async fn create_document(&self, request: &CreateRequest) -> GatewayResult<CreateResponse> {
        let subject = match request {
            CreateRequest::Collection { collection, .. } => collection.as_str(),
            CreateRequest::Path { path, .. } => path.as_str(),
        };
        let http = self.client.post(self.url("/api/create")).json(request);
        self.send_json(http, subject).await
    }

    #[instrument(skip(self))]
    async fn delete_document(&self, path: &str) -> GatewayResult<()> {
        let request = self
            .client
            .post(self.url("/api/delete"))
            .json(&json!({ "path": path }));
        self.send(request, path).await?;
        Ok(())
    }

    #[instrument(skip_all, fields(path = payload.path()))]
    async fn compute_diff(&self, payload: &SavePayload) -> GatewayResult<DiffResponse> {
        let request = self.client.post(self.url("/api/diff")).json(payload);
        self.send_json(request, payload.path()).await
    }

    #[instrument(skip_all)]
    async fn run_build(&self) -> GatewayResult<TaskReport> {
        self.run_task("/api/build", None).await
    }

    #[instrument(skip_all)]
    async fn run_sync(&self) -> GatewayResult<TaskReport> {
        self.run_task("/api/sync", None).await
    }

    #[instrument(skip(self))]
    async fn run_publish(&self, path: Option<&str>) -> GatewayResult<TaskReport> {
        let body = path.map(|p| json!({ "path": p }));
        self.run_task("/api/publish", body).await
    }

    #[instrument(skip(self))]
    async fn list_media(&self, scope: &MediaScope) -> GatewayResult<Vec<MediaFile>> {
        let mut query = vec![("mode", scope.mode.as_str().to_string())];
        if let Some(path) = &scope.path {
            query.push(("path", path.clone()));
        }
        let request = self.client.get(self.url("/api/media")).query(&query);
        // The backend encodes an empty listing as `null`
        let files: Option<Vec<MediaFile>> = self.send_json(request, "media").await?;
        Ok(files.unwrap_or_default())
    }

    #[instrument(skip(self, upload), fields(filename = %upload.filename))]
    async fn upload_media(
        &self,
        scope: &MediaScope,
        upload: MediaUpload,
    ) -> GatewayResult<MediaFile> {
        let subject = upload.filename.clone();
        let part = reqwest::multipart::Part::bytes(upload.bytes).file_name(upload.filename);
        let mut form = reqwest::multipart::Form::new()
            .text("mode", scope.mode.as_str())
            .part("file", part);
        if let Some(path) = &scope.path {
            form = form.text("path", path.clone());
        }
        let request = self.client.post(self.url("/api/media")).multipart(form);
        self.send_json(request, &subject).await
    }

    #[instrument(skip(self))]
    async fn delete_media(&self, scope: &MediaScope, filename: &str) -> GatewayResult<()> {
        let request = self.client.post(self.url("/api/media/delete")).json(&json!({
            "filename": filename,
            "mode": scope.mode.as_str(),
            "path": scope.path,
        }));
        self.send(request, filename).await?;
        Ok(())
    }
}

fn is_auth_failure(response: &Response) -> bool {
    let status = response.status();
    if status == StatusCode::UNAUTHORIZED {
        return true;
    }
    status.is_redirection()
        && response
            .headers()
            .get(LOCATION)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|location| location.contains("login"))
}

async fn check_status(response: Response, subject: &str) -> GatewayResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    if is_auth_failure(&response) {
        return Err(GatewayError::Unauthorized);
    }

    let bytes = response.bytes().await.unwrap_or_default();
    let message = error_message(&bytes, status);
    warn!(%status, subject, "backend rejected request: {}", message);
    Err(status_error(status, message, subject))
}

fn status_error(status: StatusCode, message: String, subject: &str) -> GatewayError {
    if status == StatusCode::NOT_FOUND {
        GatewayError::NotFound(subject.to_string())
    } else if status.is_client_error() {
        GatewayError::Rejected {
            status: status.as_u16(),
            message,
        }
    } else if status.is_redirection() {
        GatewayError::Decode(format!("unexpected redirect ({})", status))
    } else {
        GatewayError::Server {
            status: status.as_u16(),
            message,
        }
    }
}

/// Server-supplied message: the `error` field of a JSON body, the raw text,
/// or the status reason as a last resort
fn error_message(bytes: &[u8], status: StatusCode) -> String {
    if let Ok(value) = serde_json::from_slice::<serde_json::Value>(bytes) {
        if let Some(message) = value.get("error").and_then(|e| e.as_str()) {
            return message.to_string();
        }
    }
    let text = String::from_utf8_lossy(bytes).trim().to_string();
    if !text.is_empty() {
        return text;
    }
    status
        .canonical_reason()
        .unwrap_or("request failed")
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_trailing_slash() {
        let gateway = HttpGateway::new("http://localhost:8080/").unwrap();
        assert_eq!(gateway.base_url(), "http://localhost:8080");
        assert_eq!(gateway.url("/api/config"), "http://localhost:8080/api/config");
    }

    #[test]
    fn test_error_message_prefers_json_error() {
        let message = error_message(br#"{"error":"File already exists"}"#, StatusCode::CONFLICT);
        assert_eq!(message, "File already exists");

        let message = error_message(b"plain failure", StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(message, "plain failure");

        let message = error_message(b"", StatusCode::BAD_GATEWAY);
        assert_eq!(message, "Bad Gateway");
    }

    #[test]
    fn test_status_error_mapping() {
        assert_eq!(
            status_error(StatusCode::NOT_FOUND, "File not found".into(), "a.md"),
            GatewayError::NotFound("a.md".into())
        );
        assert_eq!(
            status_error(StatusCode::CONFLICT, "exists".into(), "a.md"),
            GatewayError::Rejected { status: 409, message: "exists".into() }
        );
        assert_eq!(
            status_error(StatusCode::INTERNAL_SERVER_ERROR, "Save failed".into(), "a.md"),
            GatewayError::Server { status: 500, message: "Save failed".into() }
        );
    }

    #[test]
    fn test_invalid_cookie_is_rejected() {
        let result = HttpGateway::builder("http://localhost").session_cookie("bad\nvalue").build();
        assert!(result.is_err());
    }
}
