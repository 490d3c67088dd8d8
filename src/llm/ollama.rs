//! Ollama-backed classification service.
//!
//! Intent labels and parameter extraction are both served by `/api/generate`.
//! Each call kind gets its own sampling setup: intent answers are capped at a
//! few tokens, and parameter extraction asks the server for JSON output so the
//! extractor rarely has to dig it out of prose.

use super::{INTENT_PROMPT, LlmHttpConfig, LlmProvider, PARAMS_PROMPT, build_http_client};
use crate::config::LlmConfig;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};

/// Upper bound on tokens for an intent label answer.
const LABEL_TOKENS: i32 = 8;

/// What a generate call is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Call {
    Intent,
    Params,
    Free,
}

impl Call {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Intent => "intent",
            Self::Params => "params",
            Self::Free => "free",
        }
    }

    const fn format(self) -> Option<&'static str> {
        match self {
            Self::Params => Some("json"),
            Self::Intent | Self::Free => None,
        }
    }

    const fn options(self) -> SamplingOptions {
        SamplingOptions {
            temperature: 0.0,
            num_predict: match self {
                Self::Intent => Some(LABEL_TOKENS),
                Self::Params | Self::Free => None,
            },
        }
    }
}

/// Classification service running on an Ollama server.
pub struct OllamaClient {
    base_url: String,
    model: String,
    client: reqwest::blocking::Client,
}

impl OllamaClient {
    /// Builds a client from the `[llm]` configuration section.
    #[must_use]
    pub fn from_config(config: &LlmConfig) -> Self {
        Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            client: build_http_client(LlmHttpConfig::from_config(config).with_env_overrides()),
        }
    }

    /// Replaces the HTTP timeouts.
    #[must_use]
    pub fn with_http_config(mut self, config: LlmHttpConfig) -> Self {
        self.client = build_http_client(config);
        self
    }

    /// Returns true when the server is up and has the configured model pulled.
    #[must_use]
    pub fn serves_model(&self) -> bool {
        let Ok(response) = self.client.get(format!("{}/api/tags", self.base_url)).send() else {
            return false;
        };
        if !response.status().is_success() {
            return false;
        }
        response
            .json::<TagsResponse>()
            .map(|tags| tags.lists(&self.model))
            .unwrap_or(false)
    }

    fn generate(&self, call: Call, system: Option<&str>, prompt: &str) -> Result<String> {
        let body = GenerateBody {
            model: &self.model,
            prompt,
            system,
            format: call.format(),
            stream: false,
            options: call.options(),
        };

        let response = self
            .client
            .post(format!("{}/api/generate", self.base_url))
            .json(&body)
            .send()
            .map_err(|e| self.transport_error(call, &e))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().unwrap_or_default();
            tracing::warn!(
                model = %self.model,
                call = call.as_str(),
                status = %status,
                detail = %detail,
                "Classification service rejected request"
            );
            return Err(Error::external("ollama", format!("status {status}: {detail}")));
        }

        let reply: GenerateReply = response.json().map_err(|e| Error::Parse {
            context: format!("ollama {} reply", call.as_str()),
            cause: e.to_string(),
        })?;
        tracing::debug!(
            model = %self.model,
            call = call.as_str(),
            chars = reply.response.len(),
            "Classification service answered"
        );
        Ok(reply.response)
    }

    fn transport_error(&self, call: Call, err: &reqwest::Error) -> Error {
        let kind = if err.is_timeout() {
            "timeout"
        } else if err.is_connect() {
            "connect"
        } else {
            "transport"
        };
        tracing::warn!(
            model = %self.model,
            call = call.as_str(),
            kind,
            error = %err,
            "Classification service unreachable"
        );
        Error::external("ollama", format!("{kind}: {err}"))
    }
}

impl LlmProvider for OllamaClient {
    fn name(&self) -> &'static str {
        "ollama"
    }

    fn complete(&self, prompt: &str) -> Result<String> {
        self.generate(Call::Free, None, prompt)
    }

    fn classify_query(&self, text: &str) -> Result<String> {
        self.generate(Call::Intent, Some(INTENT_PROMPT), text)
    }

    fn extract_query_params(&self, text: &str) -> Result<String> {
        self.generate(Call::Params, Some(PARAMS_PROMPT), text)
    }
}

#[derive(Debug, Serialize)]
struct GenerateBody<'a> {
    model: &'a str,
    prompt: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    format: Option<&'static str>,
    stream: bool,
    options: SamplingOptions,
}

#[derive(Debug, Serialize)]
struct SamplingOptions {
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    num_predict: Option<i32>,
}

#[derive(Debug, Deserialize)]
struct GenerateReply {
    response: String,
}

/// `/api/tags` listing of pulled models.
#[derive(Debug, Deserialize)]
struct TagsResponse {
    #[serde(default)]
    models: Vec<TaggedModel>,
}

#[derive(Debug, Deserialize)]
struct TaggedModel {
    name: String,
}

impl TagsResponse {
    /// Matches `llama3` against `llama3:latest` as Ollama does.
    fn lists(&self, model: &str) -> bool {
        self.models.iter().any(|tagged| {
            tagged.name == model
                || (!model.contains(':') && tagged.name == format!("{model}:latest"))
        })
    }
}
