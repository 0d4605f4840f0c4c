use async_openai::{
    Client,
    config::AzureConfig,
    types::chat::{
        ChatCompletionRequestMessage, ChatCompletionRequestSystemMessage,
        ChatCompletionRequestSystemMessageContent, ChatCompletionRequestUserMessage,
        ChatCompletionRequestUserMessageContent, CreateChatCompletionRequest,
    },
};

use super::{GenerateRequest, GenerateResponse, Provider};

/// Chat completions against an Azure OpenAI deployment, authenticated with a bearer token
/// obtained from the OAuth2 gateway.
pub struct AzureOpenAIProvider {
    client: Client<AzureConfig>,
}

impl AzureOpenAIProvider {
    pub fn new(endpoint: &str, api_version: &str, deployment: &str, access_token: &str) -> Self {
        let config = AzureConfig::new()
            .with_api_base(endpoint)
            .with_api_version(api_version)
            .with_deployment_id(deployment)
            .with_api_key(access_token);
        Self {
            client: Client::with_config(config),
        }
    }
}

#[async_trait::async_trait]
impl Provider for AzureOpenAIProvider {
    async fn generate(&self, req: &GenerateRequest) -> anyhow::Result<GenerateResponse> {
        let messages = vec![
            ChatCompletionRequestMessage::System(ChatCompletionRequestSystemMessage {
                content: ChatCompletionRequestSystemMessageContent::Text(req.system.clone()),
                name: None,
            }),
            ChatCompletionRequestMessage::User(ChatCompletionRequestUserMessage {
                content: ChatCompletionRequestUserMessageContent::Text(req.prompt.clone()),
                name: None,
            }),
        ];

        #[allow(deprecated)]
        let request = CreateChatCompletionRequest {
            model: req.model.clone(),
            messages,
            user: req.user.clone(),
            ..Default::default()
        };

        let response = self.client.chat().create(request).await?;

        let content = response
            .choices
            .first()
            .and_then(|c| c.message.content.clone());

        let finish_reason = response
            .choices
            .first()
            .and_then(|c| c.finish_reason)
            .and_then(|r| serde_json::to_value(r).ok())
            .and_then(|v| v.as_str().map(str::to_string))
            .unwrap_or_default();

        let (input_tokens, output_tokens) = match &response.usage {
            Some(usage) => (usage.prompt_tokens, usage.completion_tokens),
            None => (0, 0),
        };

        Ok(GenerateResponse {
            content,
            model: response.model,
            input_tokens,
            output_tokens,
            finish_reason,
            provider: String::new(),
        })
    }

    fn name(&self) -> &str {
        "azure_openai"
    }
}
