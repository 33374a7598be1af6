// src/ai/fallback.rs
//! Fallback providers. Groq and Mistral speak the OpenAI chat-completions
//! dialect; Cohere has its own chat shape. All three degrade to an error on
//! any non-2xx (quota exhaustion included) so the chain can move on.

use std::time::Duration;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::FallbackProvider;

fn http_client() -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .connect_timeout(Duration::from_secs(5))
        .timeout(Duration::from_secs(30))
        .build()
        .context("building fallback http client")
}

fn summarize_prompt(text: &str, lang: &str) -> String {
    let lang_name = match lang {
        "da" => "Danish",
        "uk" => "Ukrainian",
        other => other,
    };
    format!(
        "Summarize the following news article in {lang_name} in 2-3 natural sentences. \
         Output only the summary, no preamble and no notes.\n\n{text}"
    )
}

fn translate_prompt(text: &str, from: &str, to: &str) -> String {
    let to_name = match to {
        "da" => "Danish",
        "uk" => "Ukrainian",
        other => other,
    };
    format!(
        "Translate the following text from {from} to {to_name}. Keep proper names unchanged. \
         Output only the translation.\n\n{text}"
    )
}

/* ----------------------------
OpenAI-compatible chat call (Groq, Mistral)
---------------------------- */

async fn openai_style_chat(
    http: &reqwest::Client,
    url: &str,
    api_key: &str,
    model: &str,
    prompt: &str,
) -> Result<String> {
    #[derive(Serialize)]
    struct Msg<'a> {
        role: &'a str,
        content: &'a str,
    }
    #[derive(Serialize)]
    struct Req<'a> {
        model: &'a str,
        messages: Vec<Msg<'a>>,
        temperature: f32,
        max_tokens: u32,
    }
    #[derive(Deserialize)]
    struct Resp {
        #[serde(default)]
        choices: Vec<Choice>,
    }
    #[derive(Deserialize)]
    struct Choice {
        message: ChoiceMsg,
    }
    #[derive(Deserialize)]
    struct ChoiceMsg {
        #[serde(default)]
        content: String,
    }

    let req = Req {
        model,
        messages: vec![Msg {
            role: "user",
            content: prompt,
        }],
        temperature: 0.3,
        max_tokens: 600,
    };

    let resp = http
        .post(url)
        .bearer_auth(api_key)
        .json(&req)
        .send()
        .await
        .context("chat request")?;
    if !resp.status().is_success() {
        bail!("chat non-2xx: {}", resp.status());
    }
    let body: Resp = resp.json().await.context("chat response body")?;
    let content = body
        .choices
        .first()
        .map(|c| c.message.content.trim().to_string())
        .unwrap_or_default();
    if content.is_empty() {
        bail!("chat response empty");
    }
    Ok(content)
}

/* ----------------------------
Groq
---------------------------- */

pub struct GroqProvider {
    http: reqwest::Client,
    api_key: String,
    model: String,
}

impl GroqProvider {
    pub fn new(api_key: String) -> Self {
        Self {
            http: http_client().expect("reqwest client"),
            api_key,
            model: "llama-3.1-8b-instant".to_string(),
        }
    }
}

#[async_trait]
impl FallbackProvider for GroqProvider {
    async fn summarize(&self, text: &str, lang: &str) -> Result<String> {
        openai_style_chat(
            &self.http,
            "https://api.groq.com/openai/v1/chat/completions",
            &self.api_key,
            &self.model,
            &summarize_prompt(text, lang),
        )
        .await
    }

    async fn translate(&self, text: &str, from: &str, to: &str) -> Result<String> {
        openai_style_chat(
            &self.http,
            "https://api.groq.com/openai/v1/chat/completions",
            &self.api_key,
            &self.model,
            &translate_prompt(text, from, to),
        )
        .await
    }

    fn name(&self) -> &'static str {
        "groq"
    }
}

/* ----------------------------
Cohere
---------------------------- */

pub struct CohereProvider {
    http: reqwest::Client,
    api_key: String,
    model: String,
}

impl CohereProvider {
    pub fn new(api_key: String) -> Self {
        Self {
            http: http_client().expect("reqwest client"),
            api_key,
            model: "command-r".to_string(),
        }
    }

    async fn chat(&self, prompt: &str) -> Result<String> {
        #[derive(Serialize)]
        struct Req<'a> {
            model: &'a str,
            message: &'a str,
            temperature: f32,
        }
        #[derive(Deserialize)]
        struct Resp {
            #[serde(default)]
            text: String,
        }

        let req = Req {
            model: &self.model,
            message: prompt,
            temperature: 0.3,
        };
        let resp = self
            .http
            .post("https://api.cohere.com/v1/chat")
            .bearer_auth(&self.api_key)
            .json(&req)
            .send()
            .await
            .context("cohere request")?;
        if !resp.status().is_success() {
            bail!("cohere non-2xx: {}", resp.status());
        }
        let body: Resp = resp.json().await.context("cohere response body")?;
        let text = body.text.trim().to_string();
        if text.is_empty() {
            bail!("cohere response empty");
        }
        Ok(text)
    }
}

#[async_trait]
impl FallbackProvider for CohereProvider {
    async fn summarize(&self, text: &str, lang: &str) -> Result<String> {
        self.chat(&summarize_prompt(text, lang)).await
    }

    async fn translate(&self, text: &str, from: &str, to: &str) -> Result<String> {
        self.chat(&translate_prompt(text, from, to)).await
    }

    fn name(&self) -> &'static str {
        "cohere"
    }
}

/* ----------------------------
Mistral
---------------------------- */

pub struct MistralProvider {
    http: reqwest::Client,
    api_key: String,
    model: String,
}

impl MistralProvider {
    pub fn new(api_key: String) -> Self {
        Self {
            http: http_client().expect("reqwest client"),
            api_key,
            model: "mistral-small-latest".to_string(),
        }
    }
}

#[async_trait]
impl FallbackProvider for MistralProvider {
    async fn summarize(&self, text: &str, lang: &str) -> Result<String> {
        openai_style_chat(
            &self.http,
            "https://api.mistral.ai/v1/chat/completions",
            &self.api_key,
            &self.model,
            &summarize_prompt(text, lang),
        )
        .await
    }

    async fn translate(&self, text: &str, from: &str, to: &str) -> Result<String> {
        openai_style_chat(
            &self.http,
            "https://api.mistral.ai/v1/chat/completions",
            &self.api_key,
            &self.model,
            &translate_prompt(text, from, to),
        )
        .await
    }

    fn name(&self) -> &'static str {
        "mistral"
    }
}
