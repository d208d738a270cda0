use std::time::Duration;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use codepact_core::api::{
    ApiJudgeConfig, Judge, JudgeMode, ProviderInfo, ProviderProfile, ResponseFormat,
};
use serde::{Deserialize, Serialize};

const PROFILE: ProviderProfile = ProviderProfile {
    max_prompt_chars: 30_000,
    default_timeout: Duration::from_secs(60),
};

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormatSpec>,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct ResponseFormatSpec {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

/// OpenAI-compatible chat completions.
pub struct ApiJudge {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    model: String,
}

impl ApiJudge {
    pub fn new(cfg: &ApiJudgeConfig) -> Result<Self> {
        let timeout = if cfg.timeout_ms == 0 {
            PROFILE.default_timeout
        } else {
            Duration::from_millis(cfg.timeout_ms)
        };
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build http client")?;
        Ok(Self {
            client,
            endpoint: format!("{}/chat/completions", cfg.base_url.trim_end_matches('/')),
            api_key: cfg.api_key.clone(),
            model: cfg.model.clone(),
        })
    }
}

#[async_trait]
impl Judge for ApiJudge {
    fn name(&self) -> &str {
        &self.model
    }

    fn info(&self) -> Option<ProviderInfo> {
        Some(ProviderInfo {
            mode: JudgeMode::ParallelApi,
            profile: PROFILE,
        })
    }

    async fn execute(&self, prompt: &str, format: ResponseFormat) -> Result<String> {
        let body = ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
            temperature: 0.0,
            response_format: (format == ResponseFormat::Json)
                .then_some(ResponseFormatSpec { kind: "json_object" }),
        };

        let mut req = self.client.post(&self.endpoint).json(&body);
        if !self.api_key.is_empty() {
            req = req.bearer_auth(&self.api_key);
        }
        let resp = req
            .send()
            .await
            .with_context(|| format!("request to {} failed", self.endpoint))?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            bail!("judge api returned {status}: {text}");
        }

        let parsed: ChatResponse = resp.json().await.context("invalid judge api response")?;
        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .map(|c| c.trim().to_string())
            .unwrap_or_default();
        if content.is_empty() {
            bail!("judge api returned no content");
        }
        Ok(content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;
    use serde_json::json;

    fn judge(base_url: String, api_key: &str) -> ApiJudge {
        ApiJudge::new(&ApiJudgeConfig {
            base_url,
            api_key: api_key.into(),
            model: "test-model".into(),
            timeout_ms: 5_000,
        })
        .unwrap()
    }

    #[tokio::test]
    async fn sends_chat_request_and_reads_content() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/chat/completions")
            .match_header("authorization", "Bearer secret")
            .match_body(Matcher::PartialJson(json!({
                "model": "test-model",
                "messages": [{"role": "user", "content": "check this"}],
                "response_format": {"type": "json_object"},
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"choices": [{"message": {"role": "assistant", "content": " {\"violates\": false} "}}]}"#)
            .create_async()
            .await;

        let out = judge(server.url(), "secret")
            .execute("check this", ResponseFormat::Json)
            .await
            .unwrap();
        assert_eq!(out, r#"{"violates": false}"#);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn http_errors_surface() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/chat/completions")
            .with_status(429)
            .with_body("slow down")
            .create_async()
            .await;

        let err = judge(format!("{}/", server.url()), "")
            .execute("x", ResponseFormat::Text)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("429"));
        assert!(err.to_string().contains("slow down"));
    }

    #[tokio::test]
    async fn empty_choices_are_an_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/chat/completions")
            .with_status(200)
            .with_body(r#"{"choices": []}"#)
            .create_async()
            .await;

        let err = judge(server.url(), "k")
            .execute("x", ResponseFormat::Text)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("no content"));
    }

    #[test]
    fn reports_parallel_mode() {
        let info = judge("http://localhost".into(), "").info().unwrap();
        assert_eq!(info.mode, JudgeMode::ParallelApi);
        assert_eq!(info.profile.max_prompt_chars, 30_000);
    }
}
