//! OpenAI-compatible completion client
//!
//! Talks to any server exposing `POST {endpoint}/completions` (llama.cpp
//! server, vLLM, LM Studio, OpenAI). Transient failures are retried with
//! exponential backoff.

use super::{GenerationError, GenerationParams, LanguageModel};
use crate::config::GenerationConfig;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

#[derive(Debug, Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    max_tokens: usize,
    temperature: f32,
    top_p: f32,
    stop: &'a [String],
    echo: bool,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    choices: Vec<CompletionChoice>,
}

#[derive(Debug, Deserialize)]
struct CompletionChoice {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: String,
}

/// Blocking HTTP language model
pub struct CompletionClient {
    client: reqwest::blocking::Client,
    url: String,
    model: String,
    api_key: Option<String>,
    max_retries: u32,
}

impl CompletionClient {
    pub fn new(config: &GenerationConfig) -> Result<Self, GenerationError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| GenerationError::InitializationError(e.to_string()))?;

        let api_key = match &config.api_key_env {
            Some(var) => match std::env::var(var) {
                Ok(key) => Some(key),
                Err(_) => {
                    warn!("API key variable {} is not set; sending unauthenticated requests", var);
                    None
                }
            },
            None => None,
        };

        Ok(Self {
            client,
            url: completions_url(&config.endpoint),
            model: config.model.clone(),
            api_key,
            max_retries: config.max_retries,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    fn execute_with_retry(&self, prompt: &str, params: &GenerationParams) -> Result<String, GenerationError> {
        let mut last_error = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                // Exponential backoff: 1s, 2s, 4s, ...
                let delay = Duration::from_secs(1 << (attempt - 1).min(5));
                debug!("Retrying completion in {:?} (attempt {})", delay, attempt + 1);
                std::thread::sleep(delay);
            }

            match self.execute_request(prompt, params) {
                Ok(text) => return Ok(text),
                Err(e) if e.is_transient() => {
                    warn!("Completion attempt {} failed: {}", attempt + 1, e);
                    last_error = Some(e);
                }
                Err(e) => return Err(e),
            }
        }

        Err(last_error.unwrap_or_else(|| GenerationError::NetworkError("Max retries exceeded".to_string())))
    }

    fn execute_request(&self, prompt: &str, params: &GenerationParams) -> Result<String, GenerationError> {
        let request = CompletionRequest {
            model: &self.model,
            prompt,
            max_tokens: params.max_tokens,
            temperature: params.temperature,
            top_p: params.top_p,
            stop: &params.stop,
            echo: false,
        };

        let mut req = self.client.post(&self.url).json(&request);
        if let Some(key) = &self.api_key {
            req = req.bearer_auth(key);
        }

        let response = req
            .send()
            .map_err(|e| GenerationError::NetworkError(e.to_string()))?;
        let status = response.status();

        if status.is_success() {
            let body: CompletionResponse = response
                .json()
                .map_err(|e| GenerationError::InvalidResponse(e.to_string()))?;
            body.choices
                .into_iter()
                .next()
                .map(|choice| choice.text)
                .ok_or_else(|| GenerationError::InvalidResponse("no choices returned".to_string()))
        } else if status.as_u16() == 429 {
            Err(GenerationError::RateLimited)
        } else {
            let text = response.text().unwrap_or_default();
            let message = serde_json::from_str::<ApiError>(&text)
                .map(|e| e.error.message)
                .unwrap_or(text);
            Err(GenerationError::ServerError {
                status: status.as_u16(),
                message,
            })
        }
    }
}

impl LanguageModel for CompletionClient {
    fn complete(&self, prompt: &str, params: &GenerationParams) -> Result<String, GenerationError> {
        self.execute_with_retry(prompt, params)
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

fn completions_url(endpoint: &str) -> String {
    let base = endpoint.trim_end_matches('/');
    if base.ends_with("/completions") {
        base.to_string()
    } else {
        format!("{}/completions", base)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_completions_url() {
        assert_eq!(
            completions_url("http://127.0.0.1:8080/v1/"),
            "http://127.0.0.1:8080/v1/completions"
        );
        assert_eq!(
            completions_url("http://host/v1/completions"),
            "http://host/v1/completions"
        );
    }

    #[test]
    fn test_request_body_shape() {
        let stop = vec!["User question:".to_string()];
        let body = serde_json::to_value(CompletionRequest {
            model: "m",
            prompt: "p",
            max_tokens: 800,
            temperature: 0.5,
            top_p: 0.9,
            stop: &stop,
            echo: false,
        })
        .unwrap();

        assert_eq!(body["max_tokens"], 800);
        assert_eq!(body["echo"], false);
        assert_eq!(body["stop"][0], "User question:");
    }

    #[test]
    fn test_transient_classification() {
        assert!(GenerationError::RateLimited.is_transient());
        assert!(GenerationError::ServerError { status: 503, message: String::new() }.is_transient());
        assert!(!GenerationError::ServerError { status: 400, message: String::new() }.is_transient());
        assert!(!GenerationError::InvalidResponse(String::new()).is_transient());
    }

    #[test]
    fn test_unreachable_server_is_network_error() {
        let config = GenerationConfig {
            endpoint: "http://127.0.0.1:9/v1".to_string(),
            max_retries: 0,
            timeout_secs: 2,
            ..Default::default()
        };
        let client = CompletionClient::new(&config).unwrap();
        let result = client.complete("hi", &GenerationParams::from(&config));
        assert!(matches!(result, Err(GenerationError::NetworkError(_))));
    }

    #[test]
    #[ignore] // Requires a running completion server at the default endpoint
    fn test_live_completion() {
        let config = GenerationConfig::default();
        let client = CompletionClient::new(&config).unwrap();
        let text = client
            .complete("Say hello.", &GenerationParams::from(&config).with_max_tokens(8))
            .unwrap();
        assert!(!text.is_empty());
    }
}
