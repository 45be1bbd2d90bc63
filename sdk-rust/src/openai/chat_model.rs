use super::chat_api::{
    ChatCompletionRequestMessage, ChatCompletionRole, ChatCompletionStreamPayload,
    CreateChatCompletionRequest, CreateChatCompletionStreamResponse,
};
use crate::{
    client_utils, ChatMessage, ChatProvider, DeltaStream, ProviderError, ProviderResult, Role,
    StreamDelta,
};
use async_stream::try_stream;
use futures::StreamExt;
use reqwest::{
    header::{self, HeaderMap, HeaderName, HeaderValue},
    Client,
};
use std::collections::HashMap;

pub const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
pub const GROQ_BASE_URL: &str = "https://api.groq.com/openai/v1";

const PROVIDER: &str = "openai";

/// Streaming adapter for any vendor speaking the OpenAI Chat Completions
/// protocol.
pub struct OpenAIChatProvider {
    provider: &'static str,
    model_id: String,
    api_key: String,
    base_url: String,
    client: Client,
    headers: HashMap<String, String>,
    temperature: Option<f64>,
}

#[derive(Clone, Default)]
pub struct OpenAIChatProviderOptions {
    /// Name reported in errors and traces. Defaults to `openai`.
    pub provider: Option<&'static str>,
    pub base_url: Option<String>,
    pub api_key: String,
    pub headers: Option<HashMap<String, String>>,
    pub client: Option<Client>,
    pub temperature: Option<f64>,
}

impl OpenAIChatProvider {
    #[must_use]
    pub fn new(model_id: impl Into<String>, options: OpenAIChatProviderOptions) -> Self {
        let OpenAIChatProviderOptions {
            provider,
            base_url,
            api_key,
            headers,
            client,
            temperature,
        } = options;

        let base_url = base_url
            .unwrap_or_else(|| OPENAI_BASE_URL.to_string())
            .trim_end_matches('/')
            .to_string();

        Self {
            provider: provider.unwrap_or(PROVIDER),
            model_id: model_id.into(),
            api_key,
            base_url,
            client: client.unwrap_or_else(Client::new),
            headers: headers.unwrap_or_default(),
            temperature,
        }
    }

    fn request_headers(&self) -> ProviderResult<HeaderMap> {
        let mut headers = HeaderMap::new();

        let auth_header =
            HeaderValue::from_str(&format!("Bearer {}", self.api_key)).map_err(|error| {
                ProviderError::InvalidInput(format!(
                    "Invalid {} API key header value: {error}",
                    self.provider
                ))
            })?;
        headers.insert(header::AUTHORIZATION, auth_header);

        for (key, value) in &self.headers {
            let header_name = HeaderName::from_bytes(key.as_bytes()).map_err(|error| {
                ProviderError::InvalidInput(format!("Invalid header name '{key}': {error}"))
            })?;
            let header_value = HeaderValue::from_str(value).map_err(|error| {
                ProviderError::InvalidInput(format!("Invalid header value for '{key}': {error}"))
            })?;
            headers.insert(header_name, header_value);
        }

        Ok(headers)
    }
}

#[async_trait::async_trait]
impl ChatProvider for OpenAIChatProvider {
    fn provider(&self) -> &'static str {
        self.provider
    }

    fn model_id(&self) -> String {
        self.model_id.clone()
    }

    async fn stream(&self, messages: Vec<ChatMessage>) -> ProviderResult<DeltaStream> {
        crate::opentelemetry::trace_stream(
            self.provider(),
            &self.model_id,
            messages,
            |messages| async move {
                if messages.is_empty() {
                    return Err(ProviderError::InvalidInput(
                        "At least one message is required".to_string(),
                    ));
                }

                let provider = self.provider;
                let request =
                    convert_to_openai_create_params(messages, &self.model_id, self.temperature);
                let headers = self.request_headers()?;

                let mut stream = client_utils::send_sse_stream::<
                    CreateChatCompletionRequest,
                    ChatCompletionStreamPayload,
                >(
                    &self.client,
                    &format!("{}/chat/completions", self.base_url),
                    &request,
                    headers,
                    provider,
                )
                .await?;

                let stream = try_stream! {
                    let mut refusal = String::new();

                    while let Some(payload) = stream.next().await {
                        let chunk = match payload? {
                            ChatCompletionStreamPayload::Chunk(chunk) => chunk,
                            ChatCompletionStreamPayload::Error(error) => {
                                Err(ProviderError::Upstream(provider, error.error.message))?
                            }
                        };

                        if let Some(text) = map_openai_chunk(chunk, &mut refusal) {
                            yield StreamDelta::Text(text);
                        }
                    }

                    if !refusal.is_empty() {
                        Err(ProviderError::Refusal(refusal))?;
                    }

                    yield StreamDelta::End;
                };

                Ok(DeltaStream::from_stream(stream))
            },
        )
        .await
    }
}

fn convert_to_openai_create_params(
    messages: Vec<ChatMessage>,
    model_id: &str,
    temperature: Option<f64>,
) -> CreateChatCompletionRequest {
    CreateChatCompletionRequest {
        model: model_id.to_string(),
        messages: messages
            .into_iter()
            .map(|message| ChatCompletionRequestMessage {
                role: match message.role {
                    Role::User => ChatCompletionRole::User,
                    Role::Assistant => ChatCompletionRole::Assistant,
                },
                content: message.content,
            })
            .collect(),
        stream: true,
        temperature,
    }
}

/// Reduce one vendor chunk to its text delta. Role-only, usage-only and
/// empty-content chunks produce nothing.
fn map_openai_chunk(
    chunk: CreateChatCompletionStreamResponse,
    refusal: &mut String,
) -> Option<String> {
    if let Some(usage) = chunk.usage.or(chunk.x_groq.and_then(|x| x.usage)) {
        tracing::debug!(
            prompt_tokens = usage.prompt_tokens,
            completion_tokens = usage.completion_tokens,
            "stream usage reported"
        );
    }

    let choice = chunk.choices.into_iter().next()?;

    if let Some(reason) = &choice.finish_reason {
        tracing::debug!(finish_reason = %reason, "vendor finished choice");
    }

    let delta = choice.delta;
    if let Some(delta_refusal) = delta.refusal {
        refusal.push_str(&delta_refusal);
    }

    delta.content.filter(|content| !content.is_empty())
}
