//! Configuration for check analysis.
//!
//! All behaviour is controlled through [`AnalysisConfig`], built via its
//! [`AnalysisConfigBuilder`]. Keeping every knob in one struct makes it
//! trivial to share a config between the session and the client and to log
//! it for a run.
//!
//! The only secret is the provider credential. It is read from the process
//! environment by edgequake-llm; [`AnalysisConfig::ensure_credentials`]
//! checks for it up front so a missing key fails at startup instead of on
//! the first upload.

use crate::error::SentinelError;
use crate::report::RiskThresholds;
use edgequake_llm::LLMProvider;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Provider used when nothing else is configured or detected.
pub const DEFAULT_PROVIDER: &str = "gemini";

/// Model used with [`DEFAULT_PROVIDER`]. Reads PDFs natively.
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";

/// Environment pair that pins provider and model for a whole environment.
pub const PROVIDER_ENV: &str = "SENTINEL_LLM_PROVIDER";
pub const MODEL_ENV: &str = "SENTINEL_MODEL";

/// Configuration for one analysis session.
///
/// # Example
/// ```rust
/// use sentinelcheck::{AnalysisConfig, PdfMode};
///
/// let config = AnalysisConfig::builder()
///     .provider_name("gemini")
///     .model("gemini-2.5-flash")
///     .api_timeout_secs(45)
///     .pdf_mode(PdfMode::Inline)
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct AnalysisConfig {
    /// LLM model identifier. If None, [`DEFAULT_MODEL`] is used for named providers.
    pub model: Option<String>,

    /// LLM provider name (e.g. "gemini", "openai", "anthropic", "ollama").
    pub provider_name: Option<String>,

    /// Pre-constructed LLM provider. Takes precedence over `provider_name`.
    pub provider: Option<Arc<dyn LLMProvider>>,

    /// Sampling temperature. Default: 0.1.
    ///
    /// Transcription and risk scoring both want the model to stay faithful to
    /// what is printed on the check.
    pub temperature: f32,

    /// Maximum tokens the model may generate. Default: 4096.
    pub max_tokens: usize,

    /// Upper bound on the analysis call in seconds. Default: 90.
    ///
    /// Expiry is reported as a transport failure.
    pub api_timeout_secs: u64,

    /// Download timeout for URL inputs in seconds. Default: 60.
    pub download_timeout_secs: u64,

    /// Custom system prompt. If None, uses the built-in examiner prompt.
    pub system_prompt: Option<String>,

    /// How PDFs are sent to the model. Default: [`PdfMode::Inline`].
    pub pdf_mode: PdfMode,

    /// Longest edge, in pixels, of a rasterised PDF page. Default: 2000.
    pub max_rendered_pixels: u32,

    /// Score bands used for colouring the report. Default: 75 / 40.
    pub thresholds: RiskThresholds,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            model: None,
            provider_name: None,
            provider: None,
            temperature: 0.1,
            max_tokens: 4096,
            api_timeout_secs: 90,
            download_timeout_secs: 60,
            system_prompt: None,
            pdf_mode: PdfMode::default(),
            max_rendered_pixels: 2000,
            thresholds: RiskThresholds::default(),
        }
    }
}

impl fmt::Debug for AnalysisConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnalysisConfig")
            .field("model", &self.model)
            .field("provider_name", &self.provider_name)
            .field("provider", &self.provider.as_ref().map(|_| "<dyn LLMProvider>"))
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("api_timeout_secs", &self.api_timeout_secs)
            .field("download_timeout_secs", &self.download_timeout_secs)
            .field("pdf_mode", &self.pdf_mode)
            .field("thresholds", &self.thresholds)
            .finish()
    }
}

impl AnalysisConfig {
    /// Create a new builder for `AnalysisConfig`.
    pub fn builder() -> AnalysisConfigBuilder {
        AnalysisConfigBuilder {
            config: Self::default(),
        }
    }

    /// Fail fast when the selected provider has no credential in the environment.
    pub fn ensure_credentials(&self) -> Result<(), SentinelError> {
        self.ensure_credentials_with(|key| std::env::var(key).ok())
    }

    /// [`Self::ensure_credentials`] with an injectable environment lookup.
    pub fn ensure_credentials_with<F>(&self, lookup: F) -> Result<(), SentinelError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if self.provider.is_some() {
            return Ok(());
        }
        let present = |key: &str| lookup(key).is_some_and(|v| !v.trim().is_empty());

        let named = self
            .provider_name
            .clone()
            .or_else(|| lookup(PROVIDER_ENV).filter(|p| !p.trim().is_empty()));

        match named {
            Some(provider) => {
                let vars = credential_env_vars(&provider);
                if vars.is_empty() || vars.iter().any(|v| present(*v)) {
                    Ok(())
                } else {
                    Err(SentinelError::ProviderNotConfigured {
                        hint: format!("Set {} in the environment.", vars.join(" or ")),
                        provider,
                    })
                }
            }
            None => {
                let any = KNOWN_PROVIDERS
                    .iter()
                    .flat_map(|p| credential_env_vars(p))
                    .any(|v| present(*v));
                if any {
                    Ok(())
                } else {
                    Err(SentinelError::ProviderNotConfigured {
                        provider: "auto".to_string(),
                        hint: "No API key found. Set GEMINI_API_KEY (default provider), \
                               OPENAI_API_KEY, or ANTHROPIC_API_KEY, or pick a local \
                               provider with --provider ollama."
                            .to_string(),
                    })
                }
            }
        }
    }
}

/// Providers probed during auto-detection, in preference order.
const KNOWN_PROVIDERS: [&str; 5] = ["gemini", "openai", "anthropic", "mistral", "azure"];

/// Environment variables that hold the credential for `provider`.
///
/// Empty for local providers that need no key.
pub fn credential_env_vars(provider: &str) -> &'static [&'static str] {
    match provider.to_ascii_lowercase().as_str() {
        "gemini" | "google" => &["GEMINI_API_KEY", "GOOGLE_API_KEY"],
        "openai" => &["OPENAI_API_KEY"],
        "anthropic" => &["ANTHROPIC_API_KEY"],
        "mistral" => &["MISTRAL_API_KEY"],
        "azure" => &["AZURE_OPENAI_API_KEY"],
        "openrouter" => &["OPENROUTER_API_KEY"],
        _ => &[],
    }
}

/// Builder for [`AnalysisConfig`].
#[derive(Debug)]
pub struct AnalysisConfigBuilder {
    config: AnalysisConfig,
}

impl AnalysisConfigBuilder {
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = Some(model.into());
        self
    }

    pub fn provider_name(mut self, name: impl Into<String>) -> Self {
        self.config.provider_name = Some(name.into());
        self
    }

    pub fn provider(mut self, provider: Arc<dyn LLMProvider>) -> Self {
        self.config.provider = Some(provider);
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn max_tokens(mut self, n: usize) -> Self {
        self.config.max_tokens = n;
        self
    }

    pub fn api_timeout_secs(mut self, secs: u64) -> Self {
        self.config.api_timeout_secs = secs;
        self
    }

    pub fn download_timeout_secs(mut self, secs: u64) -> Self {
        self.config.download_timeout_secs = secs;
        self
    }

    pub fn system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.system_prompt = Some(prompt.into());
        self
    }

    pub fn pdf_mode(mut self, mode: PdfMode) -> Self {
        self.config.pdf_mode = mode;
        self
    }

    pub fn max_rendered_pixels(mut self, px: u32) -> Self {
        self.config.max_rendered_pixels = px.max(100);
        self
    }

    pub fn thresholds(mut self, thresholds: RiskThresholds) -> Self {
        self.config.thresholds = thresholds;
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<AnalysisConfig, SentinelError> {
        let c = &self.config;
        if c.api_timeout_secs == 0 {
            return Err(SentinelError::InvalidConfig(
                "API timeout must be ≥ 1 second".into(),
            ));
        }
        if c.download_timeout_secs == 0 {
            return Err(SentinelError::InvalidConfig(
                "Download timeout must be ≥ 1 second".into(),
            ));
        }
        if c.max_tokens == 0 {
            return Err(SentinelError::InvalidConfig(
                "max_tokens must be ≥ 1".into(),
            ));
        }
        c.thresholds.validate()?;
        Ok(self.config)
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// How a PDF reaches the model.
///
/// Gemini reads PDFs sent inline. Most other vision endpoints only take
/// images, so for them the first page is rendered to PNG through pdfium.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PdfMode {
    /// Send the PDF bytes as-is with `application/pdf`. (default)
    #[default]
    Inline,
    /// Render page 1 to PNG and send the image instead.
    Rasterise,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn defaults() {
        let c = AnalysisConfig::default();
        assert_eq!(c.temperature, 0.1);
        assert_eq!(c.max_tokens, 4096);
        assert_eq!(c.api_timeout_secs, 90);
        assert_eq!(c.pdf_mode, PdfMode::Inline);
        assert_eq!(c.thresholds, RiskThresholds::default());
    }

    #[test]
    fn builder_clamps_and_validates() {
        let c = AnalysisConfig::builder()
            .temperature(9.0)
            .max_rendered_pixels(10)
            .build()
            .unwrap();
        assert_eq!(c.temperature, 2.0);
        assert_eq!(c.max_rendered_pixels, 100);

        assert!(AnalysisConfig::builder().api_timeout_secs(0).build().is_err());
        assert!(AnalysisConfig::builder()
            .thresholds(RiskThresholds { high: 40, elevated: 75 })
            .build()
            .is_err());
    }

    #[test]
    fn named_provider_without_key_fails_fast() {
        let c = AnalysisConfig::builder().provider_name("gemini").build().unwrap();
        let vars = env(&[("OPENAI_API_KEY", "sk-test")]);
        let err = c
            .ensure_credentials_with(|k| vars.get(k).cloned())
            .unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("gemini"), "got: {msg}");
        assert!(msg.contains("GEMINI_API_KEY"), "got: {msg}");
    }

    #[test]
    fn named_provider_with_alternate_key_passes() {
        let c = AnalysisConfig::builder().provider_name("gemini").build().unwrap();
        let vars = env(&[("GOOGLE_API_KEY", "abc")]);
        assert!(c.ensure_credentials_with(|k| vars.get(k).cloned()).is_ok());
    }

    #[test]
    fn blank_key_counts_as_missing() {
        let c = AnalysisConfig::builder().provider_name("openai").build().unwrap();
        let vars = env(&[("OPENAI_API_KEY", "  ")]);
        assert!(c.ensure_credentials_with(|k| vars.get(k).cloned()).is_err());
    }

    #[test]
    fn local_providers_need_no_key() {
        let c = AnalysisConfig::builder().provider_name("ollama").build().unwrap();
        assert!(c.ensure_credentials_with(|_| None).is_ok());
    }

    #[test]
    fn auto_detection_needs_some_key() {
        let c = AnalysisConfig::default();
        assert!(c.ensure_credentials_with(|_| None).is_err());
        let vars = env(&[("ANTHROPIC_API_KEY", "k")]);
        assert!(c.ensure_credentials_with(|k| vars.get(k).cloned()).is_ok());
    }

    #[test]
    fn env_pair_provider_is_checked() {
        let c = AnalysisConfig::default();
        let vars = env(&[(PROVIDER_ENV, "anthropic"), ("OPENAI_API_KEY", "k")]);
        assert!(c.ensure_credentials_with(|k| vars.get(k).cloned()).is_err());
    }
}
