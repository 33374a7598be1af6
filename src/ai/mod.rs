// src/ai/mod.rs
//! Provider abstraction for summarization and translation. The primary
//! provider produces all three summary fields in one call; the fallback
//! chain is an ordered list of cheaper providers tried field by field.

pub mod fallback;
pub mod gemini;
pub mod sanitize;

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;

use crate::ai::fallback::{CohereProvider, GroqProvider, MistralProvider};
use crate::ai::gemini::GeminiClient;

/// Bilingual output of the primary provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Translation {
    pub summary: String,
    pub danish: String,
    pub ukrainian: String,
}

/// The one-shot summarize+translate entry point (Gemini in production).
#[async_trait]
pub trait PrimaryProvider: Send + Sync {
    async fn translate_and_summarize(&self, title: &str, content: &str) -> Result<Translation>;
    fn name(&self) -> &'static str;
}

/// Fine-grained fallback entry points. Quota exhaustion is an ordinary
/// error; the chain just moves on.
#[async_trait]
pub trait FallbackProvider: Send + Sync {
    async fn summarize(&self, text: &str, lang: &str) -> Result<String>;
    async fn translate(&self, text: &str, from: &str, to: &str) -> Result<String>;
    fn name(&self) -> &'static str;
}

/// Ordered provider list. Reordering is a configuration change, not code.
#[derive(Clone, Default)]
pub struct FallbackChain {
    providers: Vec<Arc<dyn FallbackProvider>>,
}

impl FallbackChain {
    pub fn new(providers: Vec<Arc<dyn FallbackProvider>>) -> Self {
        Self { providers }
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    /// First non-empty sanitized summary along the chain, or `None`.
    pub async fn summarize(&self, text: &str, lang: &str) -> Option<String> {
        for p in &self.providers {
            match p.summarize(text, lang).await {
                Ok(raw) => {
                    let clean = sanitize::sanitize_ai_text(&raw);
                    if !clean.is_empty() {
                        tracing::debug!(provider = p.name(), lang, "fallback summary accepted");
                        return Some(clean);
                    }
                }
                Err(e) => {
                    tracing::debug!(provider = p.name(), lang, error = ?e, "fallback summarize failed");
                }
            }
        }
        None
    }

    /// First non-empty sanitized translation along the chain, or `None`.
    pub async fn translate(&self, text: &str, from: &str, to: &str) -> Option<String> {
        for p in &self.providers {
            match p.translate(text, from, to).await {
                Ok(raw) => {
                    let clean = sanitize::sanitize_ai_text(&raw);
                    if !clean.is_empty() && clean != text {
                        tracing::debug!(provider = p.name(), from, to, "fallback translation accepted");
                        return Some(clean);
                    }
                }
                Err(e) => {
                    tracing::debug!(provider = p.name(), from, to, error = ?e, "fallback translate failed");
                }
            }
        }
        None
    }
}

/// Process-lifecycle AI wiring, owned by the entrypoint and passed down by
/// reference. Failing to build the primary client is fatal at startup.
pub struct AiRuntime {
    pub primary: Arc<dyn PrimaryProvider>,
    pub chain: FallbackChain,
}

impl AiRuntime {
    /// Build the primary client from the Gemini key and the fallback chain
    /// from whichever provider keys are present, in the order named by
    /// `FALLBACK_PROVIDERS` (default "groq,cohere,mistral").
    pub fn from_env(gemini_api_key: &str) -> Result<Self> {
        let primary: Arc<dyn PrimaryProvider> = Arc::new(GeminiClient::new(gemini_api_key)?);

        let order = std::env::var("FALLBACK_PROVIDERS")
            .unwrap_or_else(|_| "groq,cohere,mistral".to_string());

        let mut providers: Vec<Arc<dyn FallbackProvider>> = Vec::new();
        for name in order.split(',').map(str::trim) {
            match name {
                "groq" => {
                    if let Ok(key) = std::env::var("GROQ_API_KEY") {
                        if !key.is_empty() {
                            providers.push(Arc::new(GroqProvider::new(key)));
                        }
                    }
                }
                "cohere" => {
                    if let Ok(key) = std::env::var("COHERE_API_KEY") {
                        if !key.is_empty() {
                            providers.push(Arc::new(CohereProvider::new(key)));
                        }
                    }
                }
                "mistral" => {
                    if let Ok(key) = std::env::var("MISTRAL_API_KEY") {
                        if !key.is_empty() {
                            providers.push(Arc::new(MistralProvider::new(key)));
                        }
                    }
                }
                "" => {}
                other => tracing::warn!(provider = other, "unknown fallback provider in FALLBACK_PROVIDERS"),
            }
        }

        if providers.is_empty() {
            tracing::warn!("no fallback providers configured; rule-based summaries will cover primary failures");
        } else {
            tracing::info!(count = providers.len(), "fallback provider chain ready");
        }

        Ok(Self {
            primary,
            chain: FallbackChain::new(providers),
        })
    }
}

pub mod mock {
    //! Deterministic providers for tests and local dry runs.

    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    /// Primary that fails (quota) the first `fail_first` calls, then returns
    /// a fixed translation. Counts calls.
    pub struct ScriptedPrimary {
        pub fail_first: u32,
        pub calls: AtomicU32,
    }

    #[async_trait]
    impl PrimaryProvider for ScriptedPrimary {
        async fn translate_and_summarize(&self, title: &str, _content: &str) -> Result<Translation> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            if n < self.fail_first {
                anyhow::bail!("quota exceeded");
            }
            Ok(Translation {
                summary: format!("summary of {title}"),
                danish: format!("dansk resumé af {title}"),
                ukrainian: format!("український підсумок {title}"),
            })
        }

        fn name(&self) -> &'static str {
            "scripted-primary"
        }
    }

    /// Fallback returning a fixed string, or empty to simulate a dud.
    pub struct FixedFallback {
        pub label: &'static str,
        pub summary: String,
        pub translation: String,
    }

    #[async_trait]
    impl FallbackProvider for FixedFallback {
        async fn summarize(&self, _text: &str, _lang: &str) -> Result<String> {
            if self.summary.is_empty() {
                anyhow::bail!("empty output");
            }
            Ok(self.summary.clone())
        }

        async fn translate(&self, _text: &str, _from: &str, _to: &str) -> Result<String> {
            if self.translation.is_empty() {
                anyhow::bail!("empty output");
            }
            Ok(self.translation.clone())
        }

        fn name(&self) -> &'static str {
            self.label
        }
    }
}

#[cfg(test)]
mod tests {
    use super::mock::FixedFallback;
    use super::*;

    #[tokio::test]
    async fn chain_takes_first_non_empty() {
        let chain = FallbackChain::new(vec![
            Arc::new(FixedFallback {
                label: "a",
                summary: String::new(),
                translation: String::new(),
            }),
            Arc::new(FixedFallback {
                label: "b",
                summary: "Et resumé i tre sætninger. Med indhold. Og afslutning.".into(),
                translation: "Переклад".into(),
            }),
        ]);
        let out = chain.summarize("text", "da").await.unwrap();
        assert!(out.starts_with("Et resumé"));
    }

    #[tokio::test]
    async fn chain_exhaustion_yields_none() {
        let chain = FallbackChain::new(vec![Arc::new(FixedFallback {
            label: "a",
            summary: String::new(),
            translation: String::new(),
        })]);
        assert!(chain.summarize("text", "uk").await.is_none());
        assert!(chain.translate("text", "da", "uk").await.is_none());
    }

    #[tokio::test]
    async fn chain_sanitizes_disclaimers() {
        let chain = FallbackChain::new(vec![Arc::new(FixedFallback {
            label: "a",
            summary: "Note: AI-generated.\nSelve resuméet.".into(),
            translation: String::new(),
        })]);
        let out = chain.summarize("text", "da").await.unwrap();
        assert_eq!(out, "Selve resuméet.");
    }
}
