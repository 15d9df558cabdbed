use serde::{Deserialize, Serialize};

use super::{GenerationOracle, OracleError};

/// Chat-completions client for any OpenAI-compatible provider.
///
/// Transport failures and bad statuses surface as `OracleError` for the
/// caller to degrade on; only a missing credential is fatal, at
/// construction time, because no safe default exists for it.
pub struct HttpOracle {
    base_url: String,
    api_key: String,
    client: reqwest::blocking::Client,
    timeout_secs: u64,
    temperature: f32,
}

impl HttpOracle {
    pub fn new(base_url: &str, api_key: &str, timeout_secs: u64) -> Result<Self, OracleError> {
        if api_key.trim().is_empty() {
            return Err(OracleError::Configuration("oracle API key is empty".into()));
        }

        let client = reqwest::blocking::Client::builder()
            .timeout(std::time::Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| OracleError::Configuration(format!("HTTP client: {e}")))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            client,
            timeout_secs,
            temperature: 0.1,
        })
    }

    /// Read endpoint and credential from the environment.
    ///
    /// `FAIRLENS_ORACLE_URL` defaults to the DeepSeek endpoint;
    /// `FAIRLENS_ORACLE_API_KEY` has no default and its absence is fatal.
    pub fn from_env() -> Result<Self, OracleError> {
        let base_url = std::env::var("FAIRLENS_ORACLE_URL")
            .unwrap_or_else(|_| "https://api.deepseek.com/v1".to_string());
        let api_key = std::env::var("FAIRLENS_ORACLE_API_KEY")
            .map_err(|_| OracleError::Configuration("FAIRLENS_ORACLE_API_KEY is not set".into()))?;
        let timeout_secs = std::env::var("FAIRLENS_ORACLE_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(60);

        Self::new(&base_url, &api_key, timeout_secs)
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat<'a>>,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct ResponseFormat<'a> {
    #[serde(rename = "type")]
    kind: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

impl GenerationOracle for HttpOracle {
    fn generate(
        &self,
        system: &str,
        user: &str,
        json_mode: bool,
        model: &str,
    ) -> Result<Option<String>, OracleError> {
        let url = format!("{}/chat/completions", self.base_url);
        let body = ChatRequest {
            model,
            messages: vec![
                ChatMessage { role: "system", content: system },
                ChatMessage { role: "user", content: user },
            ],
            temperature: self.temperature,
            response_format: json_mode.then_some(ResponseFormat { kind: "json_object" }),
        };

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .map_err(|e| {
                if e.is_connect() {
                    OracleError::Connection(self.base_url.clone())
                } else if e.is_timeout() {
                    OracleError::Timeout(self.timeout_secs)
                } else {
                    OracleError::ResponseParsing(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(OracleError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: ChatResponse = response
            .json()
            .map_err(|e| OracleError::ResponseParsing(e.to_string()))?;

        Ok(parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constructor_trims_trailing_slash() {
        let oracle = HttpOracle::new("https://api.example.com/v1/", "key", 30).unwrap();
        assert_eq!(oracle.base_url, "https://api.example.com/v1");
        assert_eq!(oracle.timeout_secs, 30);
    }

    #[test]
    fn empty_credential_is_fatal() {
        let result = HttpOracle::new("https://api.example.com/v1", "", 30);
        assert!(matches!(result, Err(OracleError::Configuration(_))));
    }

    #[test]
    fn temperature_override() {
        let oracle = HttpOracle::new("https://api.example.com", "key", 30)
            .unwrap()
            .with_temperature(0.7);
        assert!((oracle.temperature - 0.7).abs() < f32::EPSILON);
    }

    #[test]
    fn request_serializes_json_mode() {
        let body = ChatRequest {
            model: "test-model",
            messages: vec![ChatMessage { role: "system", content: "s" }],
            temperature: 0.1,
            response_format: Some(ResponseFormat { kind: "json_object" }),
        };
        let json = serde_json::to_string(&body).unwrap();
        assert!(json.contains("\"type\":\"json_object\""));
    }

    #[test]
    fn request_omits_format_in_text_mode() {
        let body = ChatRequest {
            model: "test-model",
            messages: vec![],
            temperature: 0.1,
            response_format: None,
        };
        let json = serde_json::to_string(&body).unwrap();
        assert!(!json.contains("response_format"));
    }
}
