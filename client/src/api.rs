//! HTTP client for the marketplace API.
//!
//! One `ApiClient` value carries the base URL, timeout and bearer token and
//! is passed to whatever needs to talk to the server. Cloning is cheap and
//! shares the underlying connection pool.

use async_trait::async_trait;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::{Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;

use common::{
    extract_error_message, status_message, Coordinate, CreateJobRequest, EmailLoginRequest,
    EmailOtpVerification, Job, LoginResponse, NearbyJobsQuery, PhoneOtpVerification,
    SearchRadius, SignupRequest,
};

use crate::config::ApiConfig;
use crate::error::ApiError;

/// Source of raw nearby-job results for a position and radius.
#[async_trait]
pub trait JobSearch: Send + Sync {
    async fn search_nearby(&self, origin: Coordinate, radius: SearchRadius) -> Result<Vec<Job>, ApiError>;
}

#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl ApiClient {
    pub fn new(config: &ApiConfig) -> Result<Self, ApiError> {
        let base_url = config.base_url.trim_end_matches('/').to_string();
        if reqwest::Url::parse(&base_url).is_err() {
            return Err(ApiError::InvalidUrl(config.base_url.clone()));
        }

        let http = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| ApiError::Transport(e.to_string()))?;

        Ok(Self {
            http,
            base_url,
            token: config.token.clone(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn set_token(&mut self, token: Option<String>) {
        self.token = token;
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    pub async fn signup(&self, data: &SignupRequest) -> Result<serde_json::Value, ApiError> {
        self.send_json(Method::POST, "/api/signup", Some(data)).await
    }

    pub async fn send_email_otp(&self, email: &str) -> Result<serde_json::Value, ApiError> {
        let body = EmailLoginRequest { email: email.to_string() };
        self.send_json(Method::POST, "/api/login/email", Some(&body)).await
    }

    pub async fn verify_email_otp(&self, email: &str, otp: &str) -> Result<LoginResponse, ApiError> {
        let body = EmailOtpVerification {
            email: email.to_string(),
            otp: otp.to_string(),
        };
        self.fetch_json(Method::POST, "/api/login/email/verify", Some(&body)).await
    }

    pub async fn verify_phone_otp(&self, id_token: &str) -> Result<LoginResponse, ApiError> {
        let body = PhoneOtpVerification { id_token: id_token.to_string() };
        self.fetch_json(Method::POST, "/api/login/phone/verify", Some(&body)).await
    }

    pub async fn create_job(&self, job: &CreateJobRequest) -> Result<serde_json::Value, ApiError> {
        self.send_json(Method::POST, "/api/job", Some(job)).await
    }

    pub async fn nearby_jobs(&self, origin: Coordinate, radius: SearchRadius) -> Result<Vec<Job>, ApiError> {
        let query = NearbyJobsQuery::new(origin, radius);
        let request = self.request(Method::GET, "/api/job").query(&query);
        let response = self.execute(request).await?;
        decode_required(response).await
    }

    fn request(&self, method: Method, endpoint: &str) -> RequestBuilder {
        let mut request = self
            .http
            .request(method, format!("{}{}", self.base_url, endpoint))
            .header(ACCEPT, "application/json");
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }
        request
    }

    async fn execute(&self, request: RequestBuilder) -> Result<Response, ApiError> {
        let response = request.send().await.map_err(|e| {
            log::error!("API request failed: {}", e);
            ApiError::from(e)
        })?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        // Body read failures fall through to the status-keyed message
        let body = response.text().await.unwrap_or_default();
        let message = extract_error_message(&body).unwrap_or_else(|| status_message(status.as_u16()));
        log::warn!("API responded {}: {}", status, message);
        Err(ApiError::Status {
            status: status.as_u16(),
            message,
        })
    }

    /// Requests whose response body is informational only.
    async fn send_json<B: Serialize + ?Sized>(
        &self,
        method: Method,
        endpoint: &str,
        body: Option<&B>,
    ) -> Result<serde_json::Value, ApiError> {
        let mut request = self.request(method, endpoint);
        if let Some(body) = body {
            request = request.json(body);
        }
        let response = self.execute(request).await?;
        if !is_json(&response) {
            return Ok(serde_json::Value::Null);
        }
        let bytes = response.bytes().await?;
        if bytes.is_empty() {
            return Ok(serde_json::Value::Null);
        }
        serde_json::from_slice(&bytes).map_err(|e| ApiError::Decode(e.to_string()))
    }

    async fn fetch_json<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        method: Method,
        endpoint: &str,
        body: Option<&B>,
    ) -> Result<T, ApiError> {
        let mut request = self.request(method, endpoint);
        if let Some(body) = body {
            request = request.json(body);
        }
        let response = self.execute(request).await?;
        decode_required(response).await
    }
}

#[async_trait]
impl JobSearch for ApiClient {
    async fn search_nearby(&self, origin: Coordinate, radius: SearchRadius) -> Result<Vec<Job>, ApiError> {
        self.nearby_jobs(origin, radius).await
    }
}

fn is_json(response: &Response) -> bool {
    response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.contains("application/json"))
        .unwrap_or(false)
}

async fn decode_required<T: DeserializeOwned>(response: Response) -> Result<T, ApiError> {
    if !is_json(&response) {
        return Err(ApiError::Decode("response is not JSON".to_string()));
    }
    let bytes = response.bytes().await?;
    serde_json::from_slice(&bytes).map_err(|e| ApiError::Decode(e.to_string()))
}
