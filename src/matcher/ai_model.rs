use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::matcher::error::MatchError;

// ============================================================================
// TextCompletion trait: seam for the external text-completion service
// ============================================================================

/// One request, one reply. Implementations block until the reply arrives or
/// their timeout elapses.
pub trait TextCompletion {
    fn complete(&self, system: &str, prompt: &str) -> Result<String, MatchError>;
}

// ============================================================================
// Model settings
// ============================================================================

pub const DEFAULT_PROVIDER: &str = "deepseek";
pub const DEFAULT_MODEL: &str = "deepseek-chat";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_TEMPERATURE: f32 = 0.1;
pub const DEFAULT_MAX_TOKENS: u32 = 2000;

pub const CUSTOM_PROVIDER: &str = "custom";

/// An OpenAI-compatible provider: name, API base URL and the model used
/// when none is configured.
struct Provider {
    name: &'static str,
    base_url: &'static str,
    default_model: &'static str,
}

static PROVIDERS: [Provider; 7] = [
    Provider {
        name: "volcengine",
        base_url: "https://ark.cn-beijing.volces.com/api/v3",
        default_model: "doubao-seed-1-6-251015",
    },
    Provider {
        name: "deepseek",
        base_url: "https://api.deepseek.com/v1",
        default_model: "deepseek-chat",
    },
    Provider {
        name: "kimi",
        base_url: "https://api.moonshot.cn/v1",
        default_model: "moonshot-v1-8k",
    },
    Provider {
        name: "qwen",
        base_url: "https://dashscope.aliyuncs.com/compatible-mode/v1",
        default_model: "qwen-turbo",
    },
    Provider {
        name: "zhipu",
        base_url: "https://open.bigmodel.cn/api/paas/v4",
        default_model: "glm-4",
    },
    Provider {
        name: "baichuan",
        base_url: "https://api.baichuan-ai.com/v1",
        default_model: "Baichuan2-Turbo",
    },
    Provider {
        name: CUSTOM_PROVIDER,
        base_url: "",
        default_model: "",
    },
];

/// Table row for `provider`; unknown or missing names get the default.
fn provider_row(provider: Option<&str>) -> Option<&'static Provider> {
    PROVIDERS
        .iter()
        .find(|p| Some(p.name) == provider)
        .or_else(|| PROVIDERS.iter().find(|p| p.name == DEFAULT_PROVIDER))
}

/// Model used when the settings name none. The custom provider has no
/// model list of its own and gets `DEFAULT_MODEL`.
pub fn default_model(provider: Option<&str>) -> &'static str {
    provider_row(provider)
        .map(|p| p.default_model)
        .filter(|m| !m.is_empty())
        .unwrap_or(DEFAULT_MODEL)
}

/// Classifier settings, from the config file or a `modelConfig` message.
/// Every field is optional so partial sources can be layered.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelSettings {
    #[serde(default)]
    pub provider: Option<String>,
    #[serde(default, alias = "api_key")]
    pub api_key: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    /// Overrides the provider's base URL.
    #[serde(default, alias = "custom_url", alias = "endpoint")]
    pub custom_url: Option<String>,
    #[serde(default, alias = "timeout_secs")]
    pub timeout_secs: Option<u64>,
    #[serde(default)]
    pub temperature: Option<f32>,
    #[serde(default, alias = "max_tokens")]
    pub max_tokens: Option<u32>,
}

impl ModelSettings {
    /// Layer `self` over `base`: fields set here win.
    pub fn over(&self, base: &ModelSettings) -> ModelSettings {
        ModelSettings {
            provider: self.provider.clone().or_else(|| base.provider.clone()),
            api_key: self.api_key.clone().or_else(|| base.api_key.clone()),
            model: self.model.clone().or_else(|| base.model.clone()),
            custom_url: self.custom_url.clone().or_else(|| base.custom_url.clone()),
            timeout_secs: self.timeout_secs.or(base.timeout_secs),
            temperature: self.temperature.or(base.temperature),
            max_tokens: self.max_tokens.or(base.max_tokens),
        }
    }

    /// Delegation needs a non-empty API key, and the custom provider also
    /// needs a base URL.
    pub fn is_configured(&self) -> bool {
        self.api_key.as_deref().is_some_and(|k| !k.trim().is_empty())
            && (self.provider.as_deref() != Some(CUSTOM_PROVIDER) || self.has_custom_url())
    }

    fn has_custom_url(&self) -> bool {
        self.custom_url.as_deref().is_some_and(|u| !u.trim().is_empty())
    }

    /// Configured model, or the provider's default.
    pub fn model_or_default(&self) -> String {
        self.model
            .clone()
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| default_model(self.provider.as_deref()).to_string())
    }
}

/// Full `.../chat/completions` URL for a provider, honouring a custom base
/// URL. Unknown providers fall back to the default one.
pub fn chat_completions_url(provider: Option<&str>, custom_url: Option<&str>) -> String {
    let provider_base = provider_row(provider).map(|p| p.base_url).unwrap_or("");
    let base = custom_url.filter(|u| !u.trim().is_empty()).unwrap_or(provider_base);

    if base.ends_with("/chat/completions") {
        base.to_string()
    } else {
        format!("{}/chat/completions", base.trim_end_matches('/'))
    }
}

// ============================================================================
// OpenAI-compatible chat-completions backend
// ============================================================================

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

pub struct ChatCompletionBackend {
    http: reqwest::blocking::Client,
    url: String,
    api_key: String,
    model: String,
    temperature: f32,
    max_tokens: u32,
}

impl ChatCompletionBackend {
    pub fn new(settings: &ModelSettings) -> Result<Self, MatchError> {
        let api_key = settings
            .api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| MatchError::NotConfigured("missing API key".into()))?;
        if settings.provider.as_deref() == Some(CUSTOM_PROVIDER) && !settings.has_custom_url() {
            return Err(MatchError::NotConfigured("custom provider needs a base URL".into()));
        }

        let timeout = Duration::from_secs(settings.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS));
        let http = reqwest::blocking::Client::builder()
            .user_agent("resume-autofill")
            .timeout(timeout)
            .build()?;

        Ok(Self {
            http,
            url: chat_completions_url(settings.provider.as_deref(), settings.custom_url.as_deref()),
            api_key,
            model: settings.model_or_default(),
            temperature: settings.temperature.unwrap_or(DEFAULT_TEMPERATURE),
            max_tokens: settings.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl TextCompletion for ChatCompletionBackend {
    fn complete(&self, system: &str, prompt: &str) -> Result<String, MatchError> {
        let request = ChatCompletionRequest {
            model: &self.model,
            messages: vec![
                ChatMessage { role: "system", content: system },
                ChatMessage { role: "user", content: prompt },
            ],
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            stream: false,
        };

        debug!(url = %self.url, model = %self.model, prompt_len = prompt.len(), "calling classifier");
        let response = self
            .http
            .post(&self.url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(MatchError::Upstream { status: status.as_u16(), body });
        }

        let parsed: ChatCompletionResponse = response.json()?;
        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or(MatchError::EmptyCompletion)
    }
}

// ============================================================================
// Canned backend (for testing without a live service)
// ============================================================================

/// Returns a fixed reply, or a fixed failure, for every request.
pub struct CannedCompletion {
    reply: Result<String, String>,
}

impl CannedCompletion {
    pub fn reply(text: &str) -> Self {
        Self { reply: Ok(text.to_string()) }
    }

    pub fn failing(reason: &str) -> Self {
        Self { reply: Err(reason.to_string()) }
    }
}

impl TextCompletion for CannedCompletion {
    fn complete(&self, _system: &str, _prompt: &str) -> Result<String, MatchError> {
        self.reply.clone().map_err(MatchError::Unavailable)
    }
}

// ============================================================================
// Connection check
// ============================================================================

pub const CONNECTION_CHECK_SYSTEM: &str = "You are a resume-filling assistant.";
pub const CONNECTION_CHECK_PROMPT: &str = "Hello, please reply 'connected'.";
pub const CONNECTION_CHECK_MAX_TOKENS: u32 = 50;
pub const CONNECTION_OK_MESSAGE: &str = "Connection succeeded";

/// Outcome of a one-prompt round trip to the configured provider.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConnectionReport {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response: Option<String>,
}

impl ConnectionReport {
    fn failed(message: impl Into<String>) -> Self {
        Self { success: false, message: message.into(), response: None }
    }
}

/// Send the short check prompt through `backend` and report the reply or
/// the error.
pub fn check_connection(backend: &dyn TextCompletion) -> ConnectionReport {
    match backend.complete(CONNECTION_CHECK_SYSTEM, CONNECTION_CHECK_PROMPT) {
        Ok(reply) => ConnectionReport {
            success: true,
            message: CONNECTION_OK_MESSAGE.to_string(),
            response: Some(reply),
        },
        Err(e) => {
            warn!("connection check failed: {}", e);
            ConnectionReport::failed(e.to_string())
        }
    }
}

/// Check the provider described by `settings`, with a short, deterministic
/// completion (temperature 0, at most 50 tokens).
pub fn test_connection(settings: &ModelSettings) -> ConnectionReport {
    if !settings.is_configured() {
        return ConnectionReport::failed(if settings.provider.as_deref() == Some(CUSTOM_PROVIDER) {
            "Configure an API key and a base URL first"
        } else {
            "Configure an API key first"
        });
    }

    let quick = ModelSettings {
        temperature: Some(0.0),
        max_tokens: Some(CONNECTION_CHECK_MAX_TOKENS),
        ..Default::default()
    }
    .over(settings);

    match ChatCompletionBackend::new(&quick) {
        Ok(backend) => {
            debug!(url = backend.url(), "checking classifier connection");
            check_connection(&backend)
        }
        Err(e) => ConnectionReport::failed(e.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn completions_url_per_provider() {
        assert_eq!(
            chat_completions_url(Some("kimi"), None),
            "https://api.moonshot.cn/v1/chat/completions"
        );
        assert_eq!(
            chat_completions_url(Some("nope"), None),
            "https://api.deepseek.com/v1/chat/completions"
        );
        assert_eq!(
            chat_completions_url(Some("custom"), Some("http://localhost:8000/v1/")),
            "http://localhost:8000/v1/chat/completions"
        );
        assert_eq!(
            chat_completions_url(None, Some("http://x/v1/chat/completions")),
            "http://x/v1/chat/completions"
        );
    }

    #[test]
    fn model_defaults_follow_the_provider() {
        assert_eq!(default_model(Some("kimi")), "moonshot-v1-8k");
        assert_eq!(default_model(Some("qwen")), "qwen-turbo");
        assert_eq!(default_model(None), "deepseek-chat");
        assert_eq!(default_model(Some("custom")), DEFAULT_MODEL);

        let settings = ModelSettings {
            provider: Some("zhipu".into()),
            model: Some(" ".into()),
            ..Default::default()
        };
        assert_eq!(settings.model_or_default(), "glm-4");
        let settings = ModelSettings {
            model: Some("glm-4-flash".into()),
            ..settings
        };
        assert_eq!(settings.model_or_default(), "glm-4-flash");
    }

    #[test]
    fn custom_provider_needs_a_base_url() {
        let mut settings = ModelSettings {
            provider: Some("custom".into()),
            api_key: Some("sk".into()),
            ..Default::default()
        };
        assert!(!settings.is_configured());
        assert!(matches!(
            ChatCompletionBackend::new(&settings),
            Err(MatchError::NotConfigured(_))
        ));

        settings.custom_url = Some("http://localhost:8000/v1".into());
        assert!(settings.is_configured());
        let backend = ChatCompletionBackend::new(&settings).unwrap();
        assert_eq!(backend.url(), "http://localhost:8000/v1/chat/completions");
    }

    #[test]
    fn settings_layering_prefers_top() {
        let base = ModelSettings {
            provider: Some("qwen".into()),
            api_key: Some("base-key".into()),
            timeout_secs: Some(10),
            ..Default::default()
        };
        let top = ModelSettings {
            api_key: Some("top-key".into()),
            ..Default::default()
        };
        let merged = top.over(&base);
        assert_eq!(merged.provider.as_deref(), Some("qwen"));
        assert_eq!(merged.api_key.as_deref(), Some("top-key"));
        assert_eq!(merged.timeout_secs, Some(10));
        assert!(merged.is_configured());
        assert!(!ModelSettings::default().is_configured());
    }
}
