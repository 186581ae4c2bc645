//! Chat-completions client for OpenAI-compatible and Azure OpenAI endpoints.

use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use docqa_core::config::{ApiFlavor, GeneratorSettings};
use docqa_core::error::{Error, Result};
use docqa_core::prompt::build_prompt;
use docqa_core::traits::AnswerGenerator;

pub struct ChatCompletionsGenerator {
    client: Client,
    settings: GeneratorSettings,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    model: Option<&'a str>,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

impl ChatCompletionsGenerator {
    pub fn new(settings: GeneratorSettings) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()
            .map_err(|e| Error::Generation(format!("failed to build http client: {e}")))?;
        Ok(Self { client, settings })
    }

    fn url(&self) -> String {
        let base = self.settings.endpoint.trim_end_matches('/');
        match self.settings.flavor {
            ApiFlavor::Azure => format!(
                "{base}/openai/deployments/{}/chat/completions?api-version={}",
                self.settings.model,
                self.settings.api_version.as_deref().unwrap_or_default()
            ),
            ApiFlavor::OpenAi => format!("{base}/chat/completions"),
        }
    }

    fn headers(&self) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let (name, value) = match self.settings.flavor {
            ApiFlavor::Azure => (HeaderName::from_static("api-key"), self.settings.api_key.clone()),
            ApiFlavor::OpenAi => (AUTHORIZATION, format!("Bearer {}", self.settings.api_key)),
        };
        let value = HeaderValue::from_str(&value).map_err(|e| Error::InvalidConfig(e.to_string()))?;
        headers.insert(name, value);
        Ok(headers)
    }

    fn request_body<'a>(&'a self, prompt: String) -> ChatRequest<'a> {
        ChatRequest {
            model: match self.settings.flavor {
                ApiFlavor::Azure => None,
                ApiFlavor::OpenAi => Some(self.settings.model.as_str()),
            },
            messages: vec![ChatMessage { role: "user", content: prompt }],
            temperature: self.settings.temperature,
        }
    }
}

impl AnswerGenerator for ChatCompletionsGenerator {
    fn generate(&self, question: &str, contexts: &[String]) -> Result<String> {
        let body = self.request_body(build_prompt(question, contexts));
        tracing::info!(contexts = contexts.len(), flavor = ?self.settings.flavor, "requesting completion");
        let response = self
            .client
            .post(self.url())
            .headers(self.headers()?)
            .json(&body)
            .send()
            .map_err(|e| Error::Generation(format!("request failed: {e}")))?;
        let status = response.status();
        if !status.is_success() {
            let text = response.text().unwrap_or_default();
            return Err(Error::Generation(format!("endpoint returned {status}: {text}")));
        }
        let parsed: ChatResponse = response
            .json()
            .map_err(|e| Error::Generation(format!("malformed response: {e}")))?;
        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .map(|s| s.trim().to_string())
            .ok_or_else(|| Error::Generation("response contained no message".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(flavor: ApiFlavor) -> GeneratorSettings {
        GeneratorSettings {
            flavor,
            endpoint: "https://example.test/".into(),
            api_key: "secret".into(),
            model: "gpt-4o".into(),
            api_version: Some("2024-06-01".into()),
            temperature: 0.0,
            timeout_secs: 5,
        }
    }

    #[test]
    fn azure_url_targets_deployment() {
        let g = ChatCompletionsGenerator::new(settings(ApiFlavor::Azure)).expect("client");
        assert_eq!(
            g.url(),
            "https://example.test/openai/deployments/gpt-4o/chat/completions?api-version=2024-06-01"
        );
        assert!(g.headers().expect("headers").contains_key("api-key"));
        assert!(g.request_body("p".into()).model.is_none());
    }

    #[test]
    fn openai_url_and_bearer_header() {
        let g = ChatCompletionsGenerator::new(settings(ApiFlavor::OpenAi)).expect("client");
        assert_eq!(g.url(), "https://example.test/chat/completions");
        let headers = g.headers().expect("headers");
        assert_eq!(headers[AUTHORIZATION], "Bearer secret");
        let body = serde_json::to_value(g.request_body("hello".into())).expect("json");
        assert_eq!(body["model"], "gpt-4o");
        assert_eq!(body["messages"][0]["content"], "hello");
    }
}
