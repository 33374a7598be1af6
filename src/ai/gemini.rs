// src/ai/gemini.rs
//! Primary provider: Google Gemini. One prompt produces the original-language
//! gist plus Danish and Ukrainian renderings; the response is a labeled text
//! block we parse defensively, because the model occasionally drops or flips
//! labels.

use std::time::Duration;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use super::{PrimaryProvider, Translation};

const GEMINI_MODEL: &str = "gemini-1.5-flash";
const MAX_CONTENT_RUNES: usize = 6000;

static RE_SUMMARY_LABEL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^(СУТЬ|Суть)\s*:\s?").unwrap());
static RE_DANISH_LABEL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^(DANSK|ДАНСЬКА|ДАТСКИЙ)\s*:\s?").unwrap());
static RE_UKRAINIAN_LABEL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^(UKRAINIAN|УКРАЇНСЬКА|УКРАИНСКИЙ)\s*:\s?").unwrap());

pub struct GeminiClient {
    http: reqwest::Client,
    api_key: String,
}

impl GeminiClient {
    pub fn new(api_key: &str) -> Result<Self> {
        if api_key.trim().is_empty() {
            bail!("gemini api key is empty");
        }
        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .timeout(Duration::from_secs(30))
            .build()
            .context("building gemini http client")?;
        Ok(Self {
            http,
            api_key: api_key.to_string(),
        })
    }
}

#[async_trait]
impl PrimaryProvider for GeminiClient {
    async fn translate_and_summarize(&self, title: &str, content: &str) -> Result<Translation> {
        let prompt = build_prompt(title, content);

        #[derive(Serialize)]
        struct Part<'a> {
            text: &'a str,
        }
        #[derive(Serialize)]
        struct Content<'a> {
            parts: Vec<Part<'a>>,
        }
        #[derive(Serialize)]
        struct Req<'a> {
            contents: Vec<Content<'a>>,
        }
        #[derive(Deserialize)]
        struct Resp {
            #[serde(default)]
            candidates: Vec<Candidate>,
        }
        #[derive(Deserialize)]
        struct Candidate {
            content: RespContent,
        }
        #[derive(Deserialize)]
        struct RespContent {
            #[serde(default)]
            parts: Vec<RespPart>,
        }
        #[derive(Deserialize)]
        struct RespPart {
            #[serde(default)]
            text: String,
        }

        let url = format!(
            "https://generativelanguage.googleapis.com/v1beta/models/{GEMINI_MODEL}:generateContent?key={}",
            self.api_key
        );
        let req = Req {
            contents: vec![Content {
                parts: vec![Part { text: &prompt }],
            }],
        };

        let resp = self
            .http
            .post(&url)
            .json(&req)
            .send()
            .await
            .context("gemini request")?
            .error_for_status()
            .context("gemini non-2xx")?;

        let body: Resp = resp.json().await.context("gemini response body")?;
        let text = body
            .candidates
            .first()
            .and_then(|c| c.content.parts.first())
            .map(|p| p.text.as_str())
            .unwrap_or("");
        if text.is_empty() {
            bail!("empty gemini response");
        }

        parse_response(text)
    }

    fn name(&self) -> &'static str {
        "gemini"
    }
}

fn build_prompt(title: &str, content: &str) -> String {
    let content = truncate_content(content);
    format!(
        "Аналізуй цю новину та виконай завдання.\n\n\
         НОВИНА:\n\
         Заголовок: {title}\n\
         Текст: {content}\n\n\
         ЗАВДАННЯ:\n\
         1. Створи стислу суть новини (до 1500 символів) мовою оригіналу.\n\
         2. Переклади новину на данську (природно, без дослівності).\n\
         3. Переклади новину на українську (природно).\n\n\
         ВИМОГИ:\n\
         - Не перекладати власні назви брендів та організацій.\n\
         - Без вводних слів типу «Новина про те, що…».\n\
         - Без приміток про машинний переклад.\n\
         - Формат відповіді суворо за шаблоном:\n\n\
         СУТЬ: <коротка суть>\n\n\
         UKRAINIAN: <переклад на українську>\n\n\
         DANSK: <oversættelse til dansk>\n"
    )
}

/// Cap prompt content at a rune budget, preferring to cut at a sentence end.
fn truncate_content(content: &str) -> String {
    let mut s = content.replace('\r', "");
    s = s.split_whitespace().collect::<Vec<_>>().join(" ");
    if s.chars().count() <= MAX_CONTENT_RUNES {
        return s;
    }
    let cut: String = s.chars().take(MAX_CONTENT_RUNES).collect();
    let trimmed = match cut.rfind(". ") {
        // Keep some meaningful size; a period in the first few hundred
        // chars is not a useful boundary.
        Some(idx) if idx > 1200 => cut[..=idx].to_string(),
        _ => cut,
    };
    format!("{trimmed} [TRUNCATED]")
}

/// Parse the labeled response into its three sections. Continuation lines
/// accumulate into the current section; legacy labels and a naive chunked
/// split cover older/degenerate model output; an alphabet heuristic repairs
/// swapped Danish/Ukrainian blocks.
pub(crate) fn parse_response(response: &str) -> Result<Translation> {
    #[derive(Clone, Copy, PartialEq)]
    enum Section {
        None,
        Summary,
        Danish,
        Ukrainian,
    }

    let mut summary = String::new();
    let mut danish = String::new();
    let mut ukrainian = String::new();
    let mut current = Section::None;

    let mut append = |section: Section, text: &str| {
        if text.is_empty() {
            return;
        }
        let buf = match section {
            Section::Summary => &mut summary,
            Section::Danish => &mut danish,
            Section::Ukrainian => &mut ukrainian,
            Section::None => return,
        };
        if !buf.is_empty() {
            buf.push(' ');
        }
        buf.push_str(text);
    };

    for raw in response.lines() {
        let line = raw.trim();
        if line.is_empty() {
            continue;
        }
        if let Some(m) = RE_SUMMARY_LABEL.find(line) {
            current = Section::Summary;
            append(current, line[m.end()..].trim());
        } else if let Some(m) = RE_DANISH_LABEL.find(line) {
            current = Section::Danish;
            append(current, line[m.end()..].trim());
        } else if let Some(m) = RE_UKRAINIAN_LABEL.find(line) {
            current = Section::Ukrainian;
            append(current, line[m.end()..].trim());
        } else {
            append(current, line);
        }
    }

    // Degenerate output: no labels at all. Split into large chunks and
    // assign in template order.
    if summary.is_empty() && danish.is_empty() && ukrainian.is_empty() {
        tracing::warn!("gemini response had no labels; using chunked fallback parse");
        let mut chunks = Vec::new();
        let mut acc = String::new();
        for raw in response.lines() {
            let line = raw.trim();
            if line.is_empty() {
                continue;
            }
            if !acc.is_empty() {
                acc.push(' ');
            }
            acc.push_str(line);
            if acc.chars().count() > 1200 {
                chunks.push(std::mem::take(&mut acc));
            }
        }
        if !acc.is_empty() {
            chunks.push(acc);
        }
        let mut it = chunks.into_iter();
        summary = it.next().unwrap_or_default();
        ukrainian = it.next().unwrap_or_default();
        danish = it.next().unwrap_or_default();
    }

    // The model sometimes flips the two translation labels.
    if looks_ukrainian(&danish) && looks_danish(&ukrainian) {
        tracing::debug!("swapping Danish/Ukrainian blocks (label inversion detected)");
        std::mem::swap(&mut danish, &mut ukrainian);
    }

    if summary.is_empty() || danish.is_empty() || ukrainian.is_empty() {
        bail!(
            "could not parse gemini response: missing fields (summary={} danish={} ukrainian={})",
            !summary.is_empty(),
            !danish.is_empty(),
            !ukrainian.is_empty()
        );
    }

    Ok(Translation {
        summary,
        danish,
        ukrainian,
    })
}

fn looks_ukrainian(s: &str) -> bool {
    const UK_CHARS: &str = "іїєґІЇЄҐжШщЩюЮяЯ";
    s.chars().filter(|c| UK_CHARS.contains(*c)).count() > 3
}

fn looks_danish(s: &str) -> bool {
    const DA_CHARS: &str = "æøåÆØÅ";
    s.chars().filter(|c| DA_CHARS.contains(*c)).count() > 2
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_labeled_response() {
        let resp = "СУТЬ: Ny lov om opholdstilladelse.\n\nUKRAINIAN: Новий закон про посвідку на проживання ухвалено в Данії цього тижня.\n\nDANSK: En ny lov om opholdstilladelse blev vedtaget i Danmark i denne uge, siger regeringen.";
        let t = parse_response(resp).unwrap();
        assert_eq!(t.summary, "Ny lov om opholdstilladelse.");
        assert!(t.ukrainian.starts_with("Новий закон"));
        assert!(t.danish.starts_with("En ny lov"));
    }

    #[test]
    fn continuation_lines_accumulate() {
        let resp = "СУТЬ: Første del.\nAnden del.\n\nUKRAINIAN: Один.\nДва.\n\nDANSK: En.\nTo.";
        let t = parse_response(resp).unwrap();
        assert_eq!(t.summary, "Første del. Anden del.");
        assert_eq!(t.ukrainian, "Один. Два.");
        assert_eq!(t.danish, "En. To.");
    }

    #[test]
    fn legacy_labels_parse() {
        let resp = "СУТЬ: Суть тут.\nУКРАИНСКИЙ: Український текст із багатьма літерами їжа.\nДАТСКИЙ: Dansk tekst med bogstaver på æø og å.";
        let t = parse_response(resp).unwrap();
        assert!(t.ukrainian.contains("Український"));
        assert!(t.danish.contains("Dansk"));
    }

    #[test]
    fn swapped_blocks_are_repaired() {
        // Ukrainian text under DANSK, Danish text under UKRAINIAN.
        let resp = "СУТЬ: Суть.\nUKRAINIAN: Læger søges til børneafdelingen i Ålborg, så flere kan behandles dér.\nDANSK: Лікарі шукаються до дитячого відділення, щоб приймати більше пацієнтів і родин.";
        let t = parse_response(resp).unwrap();
        assert!(looks_danish(&t.danish), "danish block: {}", t.danish);
        assert!(looks_ukrainian(&t.ukrainian), "ukrainian block: {}", t.ukrainian);
    }

    #[test]
    fn missing_section_is_an_error() {
        let resp = "СУТЬ: Kun en sektion.";
        assert!(parse_response(resp).is_err());
    }

    #[test]
    fn truncation_respects_rune_budget() {
        let long = "Ukrainske familier i Danmark. ".repeat(400);
        let out = truncate_content(&long);
        assert!(out.chars().count() <= MAX_CONTENT_RUNES + 20);
        assert!(out.ends_with("[TRUNCATED]"));
        // Short content passes through collapsed but uncut.
        assert_eq!(truncate_content("kort  tekst"), "kort tekst");
    }
}
