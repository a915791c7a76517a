use reqwest::{
    header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_RANGE, CONTENT_TYPE},
    Client, Method, StatusCode,
};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, error};

use shared_config::AppConfig;

pub const UNIQUE_VIOLATION: &str = "23505";
pub const FOREIGN_KEY_VIOLATION: &str = "23503";

#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    /// PostgREST reports both unique and foreign key violations as 409;
    /// `code` carries the Postgres SQLSTATE to tell them apart.
    #[error("Conflict ({code}): {message}")]
    Conflict { code: String, message: String },

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Invalid header value: {0}")]
    Header(String),

    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),
}

#[derive(Debug, Deserialize)]
struct PostgrestError {
    code: Option<String>,
    message: Option<String>,
}

pub struct SupabaseClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl SupabaseClient {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            client: Client::new(),
            base_url: config.supabase_url.trim_end_matches('/').to_string(),
            api_key: config.store_api_key().to_string(),
        }
    }

    fn get_headers(&self, auth_token: Option<&str>) -> Result<HeaderMap, DatabaseError> {
        let mut headers = HeaderMap::new();

        headers.insert("apikey", header_value(&self.api_key)?);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let bearer = auth_token.unwrap_or(&self.api_key);
        headers.insert(AUTHORIZATION, header_value(&format!("Bearer {}", bearer))?);

        Ok(headers)
    }

    pub async fn request<T>(
        &self,
        method: Method,
        path: &str,
        auth_token: Option<&str>,
        body: Option<Value>,
    ) -> Result<T, DatabaseError>
    where
        T: DeserializeOwned,
    {
        self.request_with_headers(method, path, auth_token, body, None).await
    }

    pub async fn request_with_headers<T>(
        &self,
        method: Method,
        path: &str,
        auth_token: Option<&str>,
        body: Option<Value>,
        extra_headers: Option<HeaderMap>,
    ) -> Result<T, DatabaseError>
    where
        T: DeserializeOwned,
    {
        let response = self.send(method, path, auth_token, body, extra_headers).await?;
        Ok(response.json::<T>().await?)
    }

    /// Runs a GET with `Prefer: count=exact` and returns the rows together
    /// with the total row count parsed from `Content-Range`.
    pub async fn request_with_count<T>(
        &self,
        path: &str,
        auth_token: Option<&str>,
    ) -> Result<(Vec<T>, Option<u64>), DatabaseError>
    where
        T: DeserializeOwned,
    {
        let mut headers = HeaderMap::new();
        headers.insert("prefer", HeaderValue::from_static("count=exact"));

        let response = self
            .send(Method::GET, path, auth_token, None, Some(headers))
            .await?;

        let total = response
            .headers()
            .get(CONTENT_RANGE)
            .and_then(|value| value.to_str().ok())
            .and_then(parse_content_range_total);

        let rows = response.json::<Vec<T>>().await?;
        Ok((rows, total))
    }

    async fn send(
        &self,
        method: Method,
        path: &str,
        auth_token: Option<&str>,
        body: Option<Value>,
        extra_headers: Option<HeaderMap>,
    ) -> Result<reqwest::Response, DatabaseError> {
        let url = format!("{}{}", self.base_url, path);
        debug!("Making {} request to {}", method, url);

        let mut headers = self.get_headers(auth_token)?;
        if let Some(extra) = extra_headers {
            headers.extend(extra);
        }

        let mut req = self.client.request(method, &url).headers(headers);

        if let Some(body_data) = body {
            req = req.json(&body_data);
        }

        let response = req.send().await?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let error_text = response.text().await?;
        error!("API error ({}): {}", status, error_text);
        Err(classify_error(status, error_text))
    }

    pub fn get_base_url(&self) -> &str {
        &self.base_url
    }
}

fn header_value(raw: &str) -> Result<HeaderValue, DatabaseError> {
    HeaderValue::from_str(raw).map_err(|e| DatabaseError::Header(e.to_string()))
}

fn classify_error(status: StatusCode, error_text: String) -> DatabaseError {
    let parsed: Option<PostgrestError> = serde_json::from_str(&error_text).ok();
    let message = parsed
        .as_ref()
        .and_then(|e| e.message.clone())
        .unwrap_or_else(|| error_text.clone());

    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => DatabaseError::Auth(message),
        StatusCode::NOT_FOUND => DatabaseError::NotFound(message),
        StatusCode::CONFLICT => DatabaseError::Conflict {
            code: parsed.and_then(|e| e.code).unwrap_or_default(),
            message,
        },
        _ => DatabaseError::Api {
            status: status.as_u16(),
            message,
        },
    }
}

/// `Content-Range: 0-9/42` or `*/0`.
fn parse_content_range_total(range: &str) -> Option<u64> {
    range.rsplit_once('/').and_then(|(_, total)| total.parse().ok())
}
