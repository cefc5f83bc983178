//! VLM interaction: build the vision request and call the provider.
//!
//! [`VisionAnalyzer`] is the production [`CheckAnalyzer`]. It is deliberately
//! thin: the instructions and schema live in [`crate::prompts`], reply
//! cleanup and parsing in [`super::postprocess`].
//!
//! ## Message Layout
//!
//! 1. **System message**: the forensic-examiner prompt (or an override)
//! 2. **User message**: the schema instruction plus the document as a single
//!    base64 attachment with its mime type
//!
//! Exactly one request is made per analysis. Transport failures are not
//! retried here; the session reports them and the user resubmits.

use crate::analyzer::CheckAnalyzer;
use crate::config::{AnalysisConfig, DEFAULT_MODEL, DEFAULT_PROVIDER, MODEL_ENV, PROVIDER_ENV};
use crate::error::{AnalysisError, SentinelError};
use crate::media::MediaType;
use crate::output::AnalysisResult;
use crate::pipeline::postprocess::parse_analysis;
use crate::prompts::{user_instruction, DEFAULT_SYSTEM_PROMPT};
use async_trait::async_trait;
use edgequake_llm::{ChatMessage, CompletionOptions, ImageData, LLMProvider, ProviderFactory};
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// [`CheckAnalyzer`] backed by an edgequake-llm vision provider.
pub struct VisionAnalyzer {
    provider: Arc<dyn LLMProvider>,
    system_prompt: String,
    options: CompletionOptions,
    timeout_secs: u64,
}

impl fmt::Debug for VisionAnalyzer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VisionAnalyzer")
            .field("system_prompt_len", &self.system_prompt.len())
            .field("temperature", &self.options.temperature)
            .field("max_tokens", &self.options.max_tokens)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl VisionAnalyzer {
    /// Wrap an already-constructed provider.
    pub fn new(provider: Arc<dyn LLMProvider>, config: &AnalysisConfig) -> Self {
        Self {
            provider,
            system_prompt: config
                .system_prompt
                .clone()
                .unwrap_or_else(|| DEFAULT_SYSTEM_PROMPT.to_string()),
            options: build_options(config),
            timeout_secs: config.api_timeout_secs,
        }
    }

    /// Resolve the provider from the config and environment.
    pub fn from_config(config: &AnalysisConfig) -> Result<Self, SentinelError> {
        let provider = resolve_provider(config)?;
        Ok(Self::new(provider, config))
    }

    pub fn system_prompt(&self) -> &str {
        &self.system_prompt
    }
}

#[async_trait]
impl CheckAnalyzer for VisionAnalyzer {
    async fn analyze(
        &self,
        payload: &str,
        media_type: MediaType,
    ) -> Result<AnalysisResult, AnalysisError> {
        if payload.trim().is_empty() {
            return Err(AnalysisError::EmptyPayload);
        }

        let start = Instant::now();
        let messages = build_messages(&self.system_prompt, payload, media_type);

        let call = self.provider.chat(&messages, Some(&self.options));
        let response = match tokio::time::timeout(Duration::from_secs(self.timeout_secs), call).await
        {
            Ok(Ok(response)) => response,
            Ok(Err(e)) => {
                warn!("Analysis request failed: {}", e);
                return Err(AnalysisError::Transport {
                    message: e.to_string(),
                });
            }
            Err(_) => {
                warn!("Analysis request timed out after {}s", self.timeout_secs);
                return Err(AnalysisError::Timeout {
                    secs: self.timeout_secs,
                });
            }
        };

        debug!(
            "Analysis reply: {} input tokens, {} output tokens, {:?}",
            response.prompt_tokens,
            response.completion_tokens,
            start.elapsed()
        );

        parse_analysis(&response.content)
    }
}

/// Build the two-message request for one document.
pub fn build_messages(system_prompt: &str, payload: &str, media_type: MediaType) -> Vec<ChatMessage> {
    let attachment = ImageData::new(payload.to_string(), media_type.as_str()).with_detail("high");
    vec![
        ChatMessage::system(system_prompt),
        ChatMessage::user_with_images(user_instruction(), vec![attachment]),
    ]
}

/// Build `CompletionOptions` from the analysis config.
fn build_options(config: &AnalysisConfig) -> CompletionOptions {
    CompletionOptions {
        temperature: Some(config.temperature),
        max_tokens: Some(config.max_tokens),
        ..Default::default()
    }
}

fn create_vision_provider(
    provider_name: &str,
    model: &str,
) -> Result<Arc<dyn LLMProvider>, SentinelError> {
    info!("Using provider {} with model {}", provider_name, model);
    ProviderFactory::create_llm_provider(provider_name, model).map_err(|e| {
        SentinelError::ProviderNotConfigured {
            provider: provider_name.to_string(),
            hint: format!("{e}"),
        }
    })
}

/// Resolve the LLM provider, from most-specific to least-specific.
///
/// 1. **Pre-built provider** (`config.provider`), used as-is
/// 2. **Named provider + model** (`config.provider_name`), model defaulting
///    to [`DEFAULT_MODEL`]
/// 3. **Environment pair** ([`PROVIDER_ENV`] + [`MODEL_ENV`])
/// 4. **Gemini** when a Gemini key is present, since it reads PDFs inline
/// 5. **Auto-detection** via [`ProviderFactory::from_env`]
pub fn resolve_provider(config: &AnalysisConfig) -> Result<Arc<dyn LLMProvider>, SentinelError> {
    if let Some(ref provider) = config.provider {
        return Ok(Arc::clone(provider));
    }

    if let Some(ref name) = config.provider_name {
        let model = config.model.as_deref().unwrap_or(DEFAULT_MODEL);
        return create_vision_provider(name, model);
    }

    if let (Ok(prov), Ok(model)) = (std::env::var(PROVIDER_ENV), std::env::var(MODEL_ENV)) {
        if !prov.is_empty() && !model.is_empty() {
            return create_vision_provider(&prov, &model);
        }
    }

    let has_gemini_key = ["GEMINI_API_KEY", "GOOGLE_API_KEY"]
        .iter()
        .any(|k| std::env::var(k).map(|v| !v.trim().is_empty()).unwrap_or(false));
    if has_gemini_key {
        let model = config.model.as_deref().unwrap_or(DEFAULT_MODEL);
        return create_vision_provider(DEFAULT_PROVIDER, model);
    }

    let (llm_provider, _embedding) =
        ProviderFactory::from_env().map_err(|e| SentinelError::ProviderNotConfigured {
            provider: "auto".to_string(),
            hint: format!(
                "No LLM provider could be auto-detected from environment.\n\
                Set GEMINI_API_KEY, OPENAI_API_KEY, or ANTHROPIC_API_KEY.\n\
                Error: {}",
                e
            ),
        })?;

    Ok(llm_provider)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_options_defaults() {
        let opts = build_options(&AnalysisConfig::default());
        assert_eq!(opts.temperature, Some(0.1));
        assert_eq!(opts.max_tokens, Some(4096));
    }

    #[test]
    fn system_prompt_override() {
        let config = AnalysisConfig::builder()
            .system_prompt("Only extract.")
            .build()
            .unwrap();
        let provider = ProviderFactory::create_llm_provider("mock", "mock");
        if let Ok(provider) = provider {
            let analyzer = VisionAnalyzer::new(provider, &config);
            assert_eq!(analyzer.system_prompt(), "Only extract.");
        }
    }

    #[test]
    fn request_is_system_then_user() {
        let messages = build_messages("sys", "JVBERi0x", MediaType::Pdf);
        assert_eq!(messages.len(), 2);
    }

    #[tokio::test]
    async fn empty_payload_never_reaches_provider() {
        let Ok(provider) = ProviderFactory::create_llm_provider("mock", "mock") else {
            return;
        };
        let analyzer = VisionAnalyzer::new(provider, &AnalysisConfig::default());
        assert_eq!(
            analyzer.analyze("  ", MediaType::Png).await,
            Err(AnalysisError::EmptyPayload)
        );
    }
}
