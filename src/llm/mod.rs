pub mod azure;
pub mod client;

pub use client::LlmClient;

#[derive(Debug, Clone)]
pub struct GenerateRequest {
    pub model: String,
    pub system: String,
    pub prompt: String,
    /// Opaque user-context tag forwarded to the provider.
    pub user: Option<String>,
    pub stage: String,
}

#[derive(Debug, Clone)]
pub struct GenerateResponse {
    /// `None` when the model sent no message text at all (no choices, or a null content).
    pub content: Option<String>,
    pub model: String,
    pub input_tokens: u32,
    pub output_tokens: u32,
    pub finish_reason: String,
    pub provider: String,
}

#[async_trait::async_trait]
pub trait Provider: Send + Sync {
    async fn generate(&self, req: &GenerateRequest) -> anyhow::Result<GenerateResponse>;
    fn name(&self) -> &str;
}

/// The user-context tag the chat gateway expects: `{"appkey": "<key>"}`.
pub fn app_key_tag(app_key: &str) -> String {
    format!(r#"{{"appkey": "{app_key}"}}"#)
}
