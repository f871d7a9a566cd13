//! API client for communicating with the portfolio REST backend.
//!
//! This module provides the `ApiClient` struct for signing in and making
//! authenticated requests for users, portfolios, files and document search.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::multipart::{Form, Part};
use reqwest::{header, Client, Method, RequestBuilder};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::auth::SessionGrant;
use crate::models::user::RoleRef;
use crate::models::{
    DataEnvelope, DocId, Portfolio, PortfolioFile, PortfolioPayload, ProfilePayload, QueryResponse,
    UploadRequest, User, UserPayload,
};

use super::ApiError;

// ============================================================================
// Constants
// ============================================================================

/// HTTP request timeout in seconds.
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Uploads may carry several documents; allow them longer.
const UPLOAD_TIMEOUT_SECS: u64 = 120;

/// Maximum number of retries for rate-limited (429) requests.
const MAX_RATE_LIMIT_RETRIES: u32 = 3;

/// Initial backoff delay in milliseconds for rate limiting.
const INITIAL_BACKOFF_MS: u64 = 1000;

#[derive(Debug, Deserialize)]
struct SignInResponse {
    token: String,
    user: SignInUser,
}

#[derive(Debug, Deserialize)]
struct SignInUser {
    #[serde(flatten)]
    key: DocId,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    rol: Option<RoleRef>,
    #[serde(default)]
    role: Option<RoleRef>,
}

/// A list either bare or inside the `data` envelope.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Listing<T> {
    Wrapped { data: Vec<T> },
    Bare(Vec<T>),
}

impl<T> Listing<T> {
    fn into_vec(self) -> Vec<T> {
        match self {
            Listing::Wrapped { data } | Listing::Bare(data) => data,
        }
    }
}

/// Upload responses: one file, several, or either inside `data`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum UploadedFiles {
    Many(Vec<PortfolioFile>),
    Wrapped { data: Box<UploadedFiles> },
    One(PortfolioFile),
}

impl UploadedFiles {
    fn into_vec(self) -> Vec<PortfolioFile> {
        match self {
            UploadedFiles::Many(files) => files,
            UploadedFiles::Wrapped { data } => data.into_vec(),
            UploadedFiles::One(file) => vec![file],
        }
    }
}

/// API client for the portfolio backend.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: Arc<str>,
    token: Option<String>,
}

impl ApiClient {
    /// Create a new API client for `base_url` (e.g. `https://host/api`).
    pub fn new(base_url: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            client,
            base_url: Arc::from(base_url.trim_end_matches('/')),
            token: None,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Set the bearer token for authenticated requests
    pub fn set_token(&mut self, token: String) {
        self.token = Some(token);
    }

    pub fn clear_token(&mut self) {
        self.token = None;
    }

    /// Create a new ApiClient with the given token, sharing the connection pool.
    pub fn with_token(&self, token: String) -> Self {
        Self {
            client: self.client.clone(),
            base_url: Arc::clone(&self.base_url),
            token: Some(token),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    fn auth_headers(&self) -> Result<header::HeaderMap> {
        let mut headers = header::HeaderMap::new();
        if let Some(ref token) = self.token {
            headers.insert(
                header::AUTHORIZATION,
                header::HeaderValue::from_str(&format!("Bearer {}", token))?,
            );
        }
        Ok(headers)
    }

    // ===== Authentication =====

    /// Sign in and return what the session needs to persist.
    pub async fn authenticate(&self, email: &str, password: &str) -> Result<SessionGrant> {
        let url = self.url("auth/signin");
        let body = serde_json::json!({ "email": email, "password": password });

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(ApiError::from)
            .context("Failed to send sign-in request")?;

        let status = response.status();
        if matches!(status.as_u16(), 400 | 401) {
            return Err(ApiError::InvalidCredentials.into());
        }
        let response = Self::check_response(response).await?;

        let text = response.text().await.context("Failed to read sign-in response")?;
        let grant = Self::parse_sign_in(&text, email)?;
        info!(user_id = %grant.user_id, role = ?grant.role, "Signed in");
        Ok(grant)
    }

    fn parse_sign_in(text: &str, email: &str) -> Result<SessionGrant> {
        let auth: SignInResponse = serde_json::from_str(text)
            .or_else(|_| {
                serde_json::from_str::<DataEnvelope<SignInResponse>>(text).map(|e| e.data)
            })
            .context("Failed to parse sign-in response")?;

        if auth.token.is_empty() {
            return Err(ApiError::InvalidResponse("empty token".to_string()).into());
        }

        let Some(user_id) = auth.user.key.get().map(String::from) else {
            return Err(ApiError::InvalidResponse("missing user id".to_string()).into());
        };
        let role = auth.user.rol.as_ref().or(auth.user.role.as_ref());

        Ok(SessionGrant {
            token: auth.token,
            user_id,
            role: role.and_then(|r| r.name()).map(String::from),
            email: auth.user.email.or_else(|| Some(email.to_string())),
        })
    }

    // ===== Request plumbing =====

    /// Check if response is successful, returning an error with body if not.
    /// Returns Ok(None) for rate limit (should retry).
    async fn check_response_for_retry(response: reqwest::Response) -> Result<Option<reqwest::Response>> {
        if response.status().is_success() {
            Ok(Some(response))
        } else if response.status().as_u16() == 429 {
            Ok(None)
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Err(ApiError::from_status(status, &body).into())
        }
    }

    async fn check_response(response: reqwest::Response) -> Result<reqwest::Response> {
        if response.status().is_success() {
            Ok(response)
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Err(ApiError::from_status(status, &body).into())
        }
    }

    /// Send a request built by `build`, retrying on 429 with exponential backoff.
    async fn send<F>(&self, method: Method, url: &str, build: F) -> Result<reqwest::Response>
    where
        F: Fn(RequestBuilder) -> RequestBuilder,
    {
        let mut retries = 0;
        let mut backoff_ms = INITIAL_BACKOFF_MS;

        loop {
            let request = self
                .client
                .request(method.clone(), url)
                .headers(self.auth_headers()?);
            let response = build(request)
                .send()
                .await
                .map_err(ApiError::from)
                .with_context(|| format!("Failed to send {} request to {}", method, url))?;

            match Self::check_response_for_retry(response).await? {
                Some(response) => return Ok(response),
                None => {
                    retries += 1;
                    if retries > MAX_RATE_LIMIT_RETRIES {
                        return Err(ApiError::RateLimited.into());
                    }
                    warn!(url = url, retry = retries, backoff_ms = backoff_ms, "Rate limited, backing off");
                    tokio::time::sleep(Duration::from_millis(backoff_ms)).await;
                    backoff_ms *= 2;
                }
            }
        }
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = self.url(path);
        let response = self.send(Method::GET, &url, |r| r).await?;
        response
            .json()
            .await
            .with_context(|| format!("Failed to parse JSON response from {}", url))
    }

    /// Send a JSON body; the response body is not needed.
    async fn send_json<B: Serialize>(&self, method: Method, path: &str, body: &B) -> Result<()> {
        let url = self.url(path);
        self.send(method, &url, |r| r.json(body)).await?;
        Ok(())
    }

    async fn delete(&self, path: &str) -> Result<()> {
        let url = self.url(path);
        self.send(Method::DELETE, &url, |r| r).await?;
        Ok(())
    }

    // ===== Users =====

    pub async fn list_users(&self) -> Result<Vec<User>> {
        let listing: Listing<User> = self.get("user").await?;
        Ok(listing.into_vec())
    }

    pub async fn create_teacher(&self, payload: &UserPayload) -> Result<()> {
        self.send_json(Method::POST, "auth/signup", payload).await?;
        info!(email = %payload.email, "Teacher account created");
        Ok(())
    }

    pub async fn update_user(&self, id: &str, payload: &UserPayload) -> Result<()> {
        self.send_json(Method::PUT, &format!("user/{}", id), payload).await
    }

    pub async fn update_profile(&self, id: &str, payload: &ProfilePayload) -> Result<()> {
        self.send_json(Method::PUT, &format!("user/{}", id), payload).await
    }

    pub async fn delete_user(&self, id: &str) -> Result<()> {
        self.delete(&format!("user/{}", id)).await
    }

    // ===== Portfolios =====

    pub async fn list_portfolios(&self) -> Result<Vec<Portfolio>> {
        let listing: Listing<Portfolio> = self.get("portafolio").await?;
        Ok(listing.into_vec())
    }

    pub async fn fetch_portfolio(&self, id: &str) -> Result<Portfolio> {
        let text = self
            .send(Method::GET, &self.url(&format!("portafolio/{}", id)), |r| r)
            .await?
            .text()
            .await
            .context("Failed to read portfolio response")?;
        serde_json::from_str::<DataEnvelope<Portfolio>>(&text)
            .map(|e| e.data)
            .or_else(|_| serde_json::from_str::<Portfolio>(&text))
            .context("Failed to parse portfolio response")
    }

    pub async fn create_portfolio(&self, payload: &PortfolioPayload) -> Result<()> {
        self.send_json(Method::POST, "portafolio", payload).await
    }

    pub async fn update_portfolio(&self, id: &str, payload: &PortfolioPayload) -> Result<()> {
        self.send_json(Method::PUT, &format!("portafolio/{}", id), payload).await
    }

    /// The backend marks the portfolio inactive rather than removing it.
    pub async fn delete_portfolio(&self, id: &str) -> Result<()> {
        self.delete(&format!("portafolio/{}", id)).await
    }

    // ===== Files =====

    pub async fn list_files(&self, portfolio_id: &str) -> Result<Vec<PortfolioFile>> {
        let listing: Listing<PortfolioFile> =
            self.get(&format!("archivo/{}", portfolio_id)).await?;
        Ok(listing.into_vec())
    }

    /// Upload local files into one week/category of a portfolio.
    pub async fn upload_files(&self, request: &UploadRequest) -> Result<Vec<PortfolioFile>> {
        let mut form = Form::new();
        for path in &request.paths {
            let bytes = tokio::fs::read(path)
                .await
                .with_context(|| format!("Failed to read {}", path.display()))?;
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| "archivo".to_string());
            debug!(file = %name, size = bytes.len(), "Attaching file");
            form = form.part("file", Part::bytes(bytes).file_name(name));
        }
        let form = form
            .text("portafolio", request.portfolio_id.clone())
            .text("semana", request.week.to_string())
            .text("nombre", request.label())
            .text("tipo", request.file_type())
            .text("categoria", request.category.as_str());

        // Multipart bodies are consumed on send, so no rate-limit retry here.
        let url = self.url("archivo");
        let response = self
            .client
            .post(&url)
            .headers(self.auth_headers()?)
            .timeout(Duration::from_secs(UPLOAD_TIMEOUT_SECS))
            .multipart(form)
            .send()
            .await
            .context("Failed to send upload request")?;
        let response = Self::check_response(response).await?;

        let text = response.text().await.context("Failed to read upload response")?;
        let uploaded = serde_json::from_str::<UploadedFiles>(&text)
            .map(UploadedFiles::into_vec)
            .unwrap_or_else(|e| {
                warn!(error = %e, "Upload succeeded but response was not a file list");
                Vec::new()
            });
        info!(
            portfolio = %request.portfolio_id,
            week = request.week,
            count = request.paths.len(),
            "Files uploaded"
        );
        Ok(uploaded)
    }

    pub async fn delete_file(&self, id: &str) -> Result<()> {
        self.delete(&format!("archivo/{}", id)).await
    }

    // ===== Search =====

    /// Ask a question against the documents uploaded by `user_id`.
    pub async fn ask(&self, question: &str, user_id: &str) -> Result<QueryResponse> {
        let url = self.url("archivo/consulta");
        let response = self
            .send(Method::GET, &url, |r| {
                r.query(&[("question", question), ("userid", user_id)])
            })
            .await?;
        response
            .json()
            .await
            .context("Failed to parse query response")
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_joining() {
        let client = ApiClient::new("https://bkportafolio.fly.dev/api/").unwrap();
        assert_eq!(client.base_url(), "https://bkportafolio.fly.dev/api");
        assert_eq!(
            client.url("portafolio/p1"),
            "https://bkportafolio.fly.dev/api/portafolio/p1"
        );
        assert_eq!(
            client.url("/auth/signin"),
            "https://bkportafolio.fly.dev/api/auth/signin"
        );
    }

    #[test]
    fn test_with_token_shares_base_url() {
        let client = ApiClient::new("http://localhost:3000/api").unwrap();
        assert!(client.auth_headers().unwrap().is_empty());
        let authed = client.with_token("abc".to_string());
        assert_eq!(authed.base_url(), client.base_url());
        assert!(authed.auth_headers().unwrap().contains_key(header::AUTHORIZATION));
    }

    #[test]
    fn test_parse_sign_in_with_role_name() {
        let grant = ApiClient::parse_sign_in(
            r#"{"token": "jwt", "user": {"id": "u1", "email": "ana@uni.edu", "role": "DOCENTE"}}"#,
            "typed@uni.edu",
        )
        .unwrap();
        assert_eq!(grant.token, "jwt");
        assert_eq!(grant.user_id, "u1");
        assert_eq!(grant.role.as_deref(), Some("DOCENTE"));
        assert_eq!(grant.email.as_deref(), Some("ana@uni.edu"));
    }

    #[test]
    fn test_parse_sign_in_with_role_object_and_envelope() {
        let grant = ApiClient::parse_sign_in(
            r#"{"data": {"token": "jwt", "user": {"_id": "u2", "rol": {"_id": "r1", "nombre": "ADMINISTRADOR"}}}}"#,
            "admin@uni.edu",
        )
        .unwrap();
        assert_eq!(grant.user_id, "u2");
        assert_eq!(grant.role.as_deref(), Some("ADMINISTRADOR"));
        assert_eq!(grant.email.as_deref(), Some("admin@uni.edu"));
    }

    #[tokio::test]
    async fn test_unreachable_server_is_a_network_error() {
        // Nothing listens on the discard port.
        let client = ApiClient::new("http://127.0.0.1:9/api").unwrap();

        let err = client.authenticate("ana@uni.edu", "secreto").await.unwrap_err();
        assert!(matches!(err.downcast_ref::<ApiError>(), Some(ApiError::NetworkError(_))));
        assert!(format!("{:#}", err).starts_with("Failed to send sign-in request"));

        let err = client.with_token("jwt".to_string()).list_users().await.unwrap_err();
        assert!(matches!(err.downcast_ref::<ApiError>(), Some(ApiError::NetworkError(_))));
        assert!(!ApiError::is_unauthorized(&err));
    }

    #[test]
    fn test_parse_sign_in_with_both_id_keys() {
        let grant = ApiClient::parse_sign_in(
            r#"{"token": "jwt", "user": {"_id": "u4", "id": "u4", "rol": "DOCENTE", "role": "DOCENTE"}}"#,
            "ana@uni.edu",
        )
        .unwrap();
        assert_eq!(grant.user_id, "u4");
        assert_eq!(grant.role.as_deref(), Some("DOCENTE"));
    }

    #[test]
    fn test_parse_sign_in_requires_user_id() {
        let err = ApiClient::parse_sign_in(r#"{"token": "jwt", "user": {"email": "a@b.c"}}"#, "a@b.c")
            .unwrap_err();
        assert!(err.to_string().contains("missing user id"));
    }

    #[test]
    fn test_parse_sign_in_rejects_empty_token() {
        assert!(ApiClient::parse_sign_in(r#"{"token": "", "user": {"id": "u1"}}"#, "a@b").is_err());
        assert!(ApiClient::parse_sign_in("not json", "a@b").is_err());
    }

    #[test]
    fn test_listing_accepts_bare_and_wrapped() {
        let bare: Listing<PortfolioFile> =
            serde_json::from_str(r#"[{"_id": "f1"}, {"_id": "f2"}]"#).unwrap();
        assert_eq!(bare.into_vec().len(), 2);

        let wrapped: Listing<PortfolioFile> =
            serde_json::from_str(r#"{"data": [{"_id": "f1"}]}"#).unwrap();
        assert_eq!(wrapped.into_vec().len(), 1);
    }

    #[test]
    fn test_upload_response_shapes() {
        let one: UploadedFiles = serde_json::from_str(r#"{"_id": "f1"}"#).unwrap();
        assert_eq!(one.into_vec()[0].id(), "f1");

        let many: UploadedFiles = serde_json::from_str(r#"[{"_id": "f1"}, {"_id": "f2"}]"#).unwrap();
        assert_eq!(many.into_vec().len(), 2);

        let wrapped: UploadedFiles =
            serde_json::from_str(r#"{"data": [{"_id": "f3"}]}"#).unwrap();
        assert_eq!(wrapped.into_vec()[0].id(), "f3");
    }
}
