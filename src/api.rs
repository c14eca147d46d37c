//! HTTP gateway to the FREY API.
//!
//! Each endpoint is a single POST with a JSON body. Success payloads are
//! reduced to the one text field the panels display; every failure is
//! normalized into a [`GatewayError`].

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

use crate::tone::Tone;

pub const CHAT_PATH: &str = "/api/chat";
pub const ANALYZE_PATH: &str = "/api/analyze";
pub const GENERATE_PATH: &str = "/api/generate";

const GENERIC_FAILURE: &str = "Connection error or unknown processing failure from the API";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatRequest {
    pub user_prompt: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnalyzeRequest {
    pub data_input: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GenerateRequest {
    pub subject: String,
    pub ton: Tone,
}

#[derive(Deserialize)]
struct ChatResponse {
    response: String,
}

#[derive(Deserialize)]
struct AnalyzeResponse {
    #[serde(default)]
    success: bool,
    report: Option<String>,
    #[serde(default)]
    detail: Option<Value>,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    success: bool,
    content: Option<String>,
    #[serde(default)]
    detail: Option<Value>,
}

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(default)]
    detail: Option<Value>,
}

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("could not reach {url}: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("{endpoint} answered with HTTP {status}")]
    Remote {
        endpoint: &'static str,
        status: u16,
        detail: Option<String>,
    },
    #[error("{endpoint} reported an unsuccessful request")]
    Rejected {
        endpoint: &'static str,
        detail: Option<String>,
    },
    #[error("unexpected response from {endpoint}: {reason}")]
    Decode {
        endpoint: &'static str,
        reason: String,
    },
    #[error("request task ended abnormally: {0}")]
    Interrupted(String),
}

impl GatewayError {
    /// Structured detail supplied by the server, if any.
    pub fn detail(&self) -> Option<&str> {
        match self {
            GatewayError::Remote { detail, .. } | GatewayError::Rejected { detail, .. } => {
                detail.as_deref()
            }
            _ => None,
        }
    }

    /// Text shown to the user: the server's detail verbatim, or a generic fallback.
    pub fn user_message(&self) -> String {
        if let Some(detail) = self.detail() {
            return detail.to_string();
        }
        match self {
            GatewayError::Transport { url, .. } => format!(
                "Could not reach the API at {}. Check that the server is running and that it accepts cross-origin requests.",
                url
            ),
            GatewayError::Remote { status, .. } => format!("{} (HTTP {}).", GENERIC_FAILURE, status),
            GatewayError::Decode { reason, .. } => format!("{} ({}).", GENERIC_FAILURE, reason),
            _ => format!("{}.", GENERIC_FAILURE),
        }
    }
}

/// Pull a human-readable detail out of an error body.
///
/// Accepts FastAPI's shapes: a plain string, or a list of validation
/// objects carrying a `msg` field.
pub fn extract_detail(body: &str) -> Option<String> {
    let parsed: ErrorBody = serde_json::from_str(body).ok()?;
    parsed.detail.and_then(detail_text)
}

fn detail_text(detail: Value) -> Option<String> {
    let text = match detail {
        Value::Null => return None,
        Value::String(s) => s,
        Value::Array(items) => items
            .into_iter()
            .filter_map(|item| match item {
                Value::Object(mut obj) => match obj.remove("msg") {
                    Some(Value::String(msg)) => Some(msg),
                    _ => Some(Value::Object(obj).to_string()),
                },
                Value::String(s) => Some(s),
                Value::Null => None,
                other => Some(other.to_string()),
            })
            .collect::<Vec<_>>()
            .join("; "),
        Value::Object(mut obj) => match obj.remove("msg") {
            Some(Value::String(msg)) => msg,
            _ => Value::Object(obj).to_string(),
        },
        other => other.to_string(),
    };
    let text = text.trim().to_string();
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

/// The three calls the panels make. Implemented over HTTP by [`ApiClient`].
#[async_trait]
pub trait Backend: Send + Sync {
    async fn chat(&self, request: ChatRequest) -> Result<String, GatewayError>;
    async fn analyze(&self, request: AnalyzeRequest) -> Result<String, GatewayError>;
    async fn generate(&self, request: GenerateRequest) -> Result<String, GatewayError>;
}

#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn post<B, R>(&self, endpoint: &'static str, body: &B) -> Result<R, GatewayError>
    where
        B: Serialize + Sync,
        R: DeserializeOwned,
    {
        let url = format!("{}{}", self.base_url, endpoint);
        debug!(%url, "sending request");

        let response = self
            .client
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|source| GatewayError::Transport {
                url: self.base_url.clone(),
                source,
            })?;

        let status = response.status();
        let text = response.text().await.map_err(|source| GatewayError::Transport {
            url: self.base_url.clone(),
            source,
        })?;

        if !status.is_success() {
            let detail = extract_detail(&text);
            warn!(endpoint, status = status.as_u16(), ?detail, "request failed");
            return Err(GatewayError::Remote {
                endpoint,
                status: status.as_u16(),
                detail,
            });
        }

        serde_json::from_str(&text).map_err(|e| GatewayError::Decode {
            endpoint,
            reason: e.to_string(),
        })
    }
}

fn flagged_field(
    endpoint: &'static str,
    success: bool,
    field: Option<String>,
    field_name: &str,
    detail: Option<Value>,
) -> Result<String, GatewayError> {
    if !success {
        return Err(GatewayError::Rejected {
            endpoint,
            detail: detail.and_then(detail_text),
        });
    }
    field.ok_or_else(|| GatewayError::Decode {
        endpoint,
        reason: format!("missing field `{}`", field_name),
    })
}

#[async_trait]
impl Backend for ApiClient {
    async fn chat(&self, request: ChatRequest) -> Result<String, GatewayError> {
        let response: ChatResponse = self.post(CHAT_PATH, &request).await?;
        Ok(response.response)
    }

    async fn analyze(&self, request: AnalyzeRequest) -> Result<String, GatewayError> {
        let response: AnalyzeResponse = self.post(ANALYZE_PATH, &request).await?;
        flagged_field(ANALYZE_PATH, response.success, response.report, "report", response.detail)
    }

    async fn generate(&self, request: GenerateRequest) -> Result<String, GatewayError> {
        let response: GenerateResponse = self.post(GENERATE_PATH, &request).await?;
        flagged_field(GENERATE_PATH, response.success, response.content, "content", response.detail)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn request_bodies_match_wire_shape() {
        let body = serde_json::to_value(GenerateRequest {
            subject: "chats".to_string(),
            ton: Tone::Drole,
        })
        .unwrap();
        assert_eq!(body, json!({"subject": "chats", "ton": "Drôle"}));

        let body = serde_json::to_value(ChatRequest { user_prompt: "salut".to_string() }).unwrap();
        assert_eq!(body, json!({"user_prompt": "salut"}));

        let body = serde_json::to_value(AnalyzeRequest { data_input: "a,b\n1,2".to_string() }).unwrap();
        assert_eq!(body, json!({"data_input": "a,b\n1,2"}));
    }

    #[test]
    fn detail_string_is_verbatim() {
        assert_eq!(
            extract_detail(r#"{"detail": "CSV vide"}"#).as_deref(),
            Some("CSV vide")
        );
    }

    #[test]
    fn detail_validation_list_is_joined() {
        let body = r#"{"detail": [
            {"loc": ["body", "subject"], "msg": "field required", "type": "missing"},
            {"loc": ["body", "ton"], "msg": "invalid tone", "type": "enum"}
        ]}"#;
        assert_eq!(
            extract_detail(body).as_deref(),
            Some("field required; invalid tone")
        );
    }

    #[test]
    fn missing_or_unparseable_detail_is_none() {
        assert_eq!(extract_detail(r#"{"error": "boom"}"#), None);
        assert_eq!(extract_detail(r#"{"detail": null}"#), None);
        assert_eq!(extract_detail("<html>502 Bad Gateway</html>"), None);
        assert_eq!(extract_detail(""), None);
    }

    #[test]
    fn user_message_prefers_detail() {
        let err = GatewayError::Remote {
            endpoint: ANALYZE_PATH,
            status: 400,
            detail: Some("Colonne manquante: Age".to_string()),
        };
        assert_eq!(err.user_message(), "Colonne manquante: Age");

        let err = GatewayError::Remote {
            endpoint: ANALYZE_PATH,
            status: 500,
            detail: None,
        };
        assert!(err.user_message().starts_with(GENERIC_FAILURE));
        assert!(err.user_message().contains("500"));
    }

    #[test]
    fn unsuccessful_flag_becomes_rejection() {
        let err = flagged_field(
            GENERATE_PATH,
            false,
            None,
            "content",
            Some(json!("sujet trop court")),
        )
        .unwrap_err();
        assert!(matches!(err, GatewayError::Rejected { .. }));
        assert_eq!(err.user_message(), "sujet trop court");

        let err = flagged_field(GENERATE_PATH, true, None, "content", None).unwrap_err();
        assert!(matches!(err, GatewayError::Decode { .. }));

        let ok = flagged_field(GENERATE_PATH, true, Some("# Hi".to_string()), "content", None);
        assert_eq!(ok.unwrap(), "# Hi");
    }
}
