use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::error::ApiError;

pub const DEFAULT_SERVER_URL: &str = "http://localhost:5000";

/// Options for the two filter controls, as served by `/get_filters`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub countries: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub categories: Option<Vec<String>>,
}

/// Current value of each filter control. Empty string means "no filter".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterSelection {
    pub country: String,
    pub category: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AskRequest {
    pub question: String,
    pub filters: FilterSelection,
}

#[derive(Deserialize)]
struct AskResponse {
    answer: String,
}

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(default)]
    error: Option<serde_json::Value>,
}

/// The `error` field of a failed `/ask` response, as display text. Servers
/// don't always send a string there; falsy values (null, false, 0, "") count
/// as absent.
fn server_message(body: &str) -> Option<String> {
    let error = serde_json::from_str::<ErrorBody>(body).ok()?.error?;
    match error {
        serde_json::Value::Null | serde_json::Value::Bool(false) => None,
        serde_json::Value::String(s) if s.is_empty() => None,
        serde_json::Value::Number(n) if n.as_f64() == Some(0.0) => None,
        serde_json::Value::String(s) => Some(s),
        other => Some(other.to_string()),
    }
}

/// The two calls the chat needs from a Q&A server.
#[async_trait]
pub trait QaBackend: Send + Sync + 'static {
    async fn get_filters(&self) -> Result<FilterOptions, ApiError>;
    async fn ask(&self, request: &AskRequest) -> Result<String, ApiError>;
}

#[derive(Clone)]
pub struct HeritageClient {
    client: Client,
    base_url: String,
}

impl HeritageClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl QaBackend for HeritageClient {
    async fn get_filters(&self) -> Result<FilterOptions, ApiError> {
        let url = format!("{}/get_filters", self.base_url);

        let response = self.client.get(&url).send().await?;

        if !response.status().is_success() {
            return Err(ApiError::status(response.status().as_u16(), None));
        }

        let options: FilterOptions = response.json().await?;
        Ok(options)
    }

    async fn ask(&self, request: &AskRequest) -> Result<String, ApiError> {
        let url = format!("{}/ask", self.base_url);

        let response = self
            .client
            .post(&url)
            .json(request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            // The body is only a hint; a missing or malformed one falls back to the status line
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::status(status.as_u16(), server_message(&body)));
        }

        let ask_response: AskResponse = response.json().await?;
        Ok(ask_response.answer)
    }
}
