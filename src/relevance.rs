// src/relevance.rs
//! Relevance gate: keyword lexicons, matcher compilation, and the
//! category/score classifier that decides which feed items matter to
//! Ukrainians living in Denmark.

use std::path::Path;

use anyhow::{Context, Result};
use regex::Regex;
use serde::Deserialize;

pub const DEFAULT_LEXICONS: &str = include_str!("../config/lexicons.toml");

/// Final category of a scored item. Persisted as a string in the sent-store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    Ukraine,
    Denmark,
    Tech,
    Health,
    Family,
    Youth,
    Culture,
    Sports,
    Europe,
    Economy,
    Environment,
    Education,
    Conflict,
    General,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Ukraine => "ukraine",
            Category::Denmark => "denmark",
            Category::Tech => "tech",
            Category::Health => "health",
            Category::Family => "family",
            Category::Youth => "youth",
            Category::Culture => "culture",
            Category::Sports => "sports",
            Category::Europe => "europe",
            Category::Economy => "economy",
            Category::Environment => "environment",
            Category::Education => "education",
            Category::Conflict => "conflict",
            Category::General => "general",
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/* ----------------------------
Lexicon config (from TOML)
---------------------------- */

#[derive(Debug, Clone, Deserialize)]
pub struct LexiconsRoot {
    pub exclude: Vec<String>,
    pub ukraine_geo: Vec<String>,
    pub refugee_boost: Vec<String>,
    pub visa_boost: Vec<String>,
    pub denmark: Vec<String>,
    pub europe: Vec<String>,
    pub conflict: Vec<String>,
    pub tech: Vec<String>,
    pub ai: Vec<String>,
    pub medical: Vec<String>,
    pub youth: Vec<String>,
    pub parent: Vec<String>,
    pub cultural: Vec<String>,
    pub sports: Vec<String>,
    pub politics_bonus: Vec<String>,
    pub economy: Vec<String>,
    pub environment: Vec<String>,
    pub education: Vec<String>,
    pub general: Vec<String>,
}

/* ----------------------------
Compiled matchers
---------------------------- */

/// One keyword compiled into its matching strategy. Phrases match as
/// substrings, short tokens (≤3 chars) only on word boundaries, longer
/// tokens as plain substrings.
#[derive(Debug)]
enum Matcher {
    Phrase(String),
    Word(Regex),
    Substring(String),
}

impl Matcher {
    fn compile(keyword: &str) -> Option<Matcher> {
        let k = keyword.trim().to_lowercase();
        if k.is_empty() {
            return None;
        }
        if k.contains(' ') {
            return Some(Matcher::Phrase(k));
        }
        if k.chars().count() <= 3 {
            // (?u) so \b respects Danish letters next to the token.
            let re = Regex::new(&format!(r"(?u)\b{}\b", regex::escape(&k))).ok()?;
            return Some(Matcher::Word(re));
        }
        Some(Matcher::Substring(k))
    }

    fn hits(&self, text: &str) -> bool {
        match self {
            Matcher::Phrase(p) | Matcher::Substring(p) => text.contains(p.as_str()),
            Matcher::Word(re) => re.is_match(text),
        }
    }
}

#[derive(Debug)]
struct Lexicon(Vec<Matcher>);

impl Lexicon {
    fn compile(keywords: &[String]) -> Lexicon {
        Lexicon(keywords.iter().filter_map(|k| Matcher::compile(k)).collect())
    }

    fn matches(&self, text: &str) -> bool {
        self.0.iter().any(|m| m.hits(text))
    }
}

/// The compiled classifier. Built once at startup, read-only afterwards.
#[derive(Debug)]
pub struct Scorer {
    exclude: Lexicon,
    ukraine_geo: Lexicon,
    refugee_boost: Lexicon,
    visa_boost: Lexicon,
    denmark: Lexicon,
    europe: Lexicon,
    conflict: Lexicon,
    tech: Lexicon,
    ai: Lexicon,
    medical: Lexicon,
    youth: Lexicon,
    parent: Lexicon,
    cultural: Lexicon,
    sports: Lexicon,
    politics_bonus: Lexicon,
    economy: Lexicon,
    environment: Lexicon,
    education: Lexicon,
    general: Lexicon,
}

impl Scorer {
    /// Load from `path` when given, else the embedded default lexicons.
    pub fn load(path: Option<&str>) -> Result<Self> {
        let content = match path {
            Some(p) if Path::new(p).exists() => std::fs::read_to_string(p)
                .with_context(|| format!("reading lexicons from {p}"))?,
            Some(p) => anyhow::bail!("LEXICONS_PATH points to non-existent path: {p}"),
            None => DEFAULT_LEXICONS.to_string(),
        };
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(toml_str: &str) -> Result<Self> {
        let cfg: LexiconsRoot = toml::from_str(toml_str).context("parsing lexicons TOML")?;
        Ok(Self {
            exclude: Lexicon::compile(&cfg.exclude),
            ukraine_geo: Lexicon::compile(&cfg.ukraine_geo),
            refugee_boost: Lexicon::compile(&cfg.refugee_boost),
            visa_boost: Lexicon::compile(&cfg.visa_boost),
            denmark: Lexicon::compile(&cfg.denmark),
            europe: Lexicon::compile(&cfg.europe),
            conflict: Lexicon::compile(&cfg.conflict),
            tech: Lexicon::compile(&cfg.tech),
            ai: Lexicon::compile(&cfg.ai),
            medical: Lexicon::compile(&cfg.medical),
            youth: Lexicon::compile(&cfg.youth),
            parent: Lexicon::compile(&cfg.parent),
            cultural: Lexicon::compile(&cfg.cultural),
            sports: Lexicon::compile(&cfg.sports),
            politics_bonus: Lexicon::compile(&cfg.politics_bonus),
            economy: Lexicon::compile(&cfg.economy),
            environment: Lexicon::compile(&cfg.environment),
            education: Lexicon::compile(&cfg.education),
            general: Lexicon::compile(&cfg.general),
        })
    }

    /// Classify a feed item by title + description. `None` means drop.
    ///
    /// First match wins along the rule ladder; bonuses apply within the
    /// winning rule only. The score never goes below zero.
    pub fn score(&self, title: &str, description: &str) -> Option<(Category, u32)> {
        let text = normalize(&format!("{title} {description}"));

        if self.exclude.matches(&text) {
            return None;
        }

        let has_denmark = self.denmark.matches(&text);
        let has_ukraine_geo = self.ukraine_geo.matches(&text);
        let has_europe = self.europe.matches(&text);
        let has_tech = self.tech.matches(&text);
        let has_medical = self.medical.matches(&text);
        let has_conflict = self.conflict.matches(&text);
        let has_refugee = self.refugee_boost.matches(&text);
        let has_visa = self.visa_boost.matches(&text);
        let ctx_local = has_denmark || has_ukraine_geo || has_europe;

        // Generic war coverage with no local angle is noise for this audience.
        if has_conflict && !ctx_local {
            return None;
        }

        // 1) Ukrainians / refugees / visas
        if has_ukraine_geo || has_refugee || has_visa {
            let mut score: i32 = 70;
            if has_denmark {
                score += 15;
            }
            if has_europe {
                score += 5;
            }
            if has_conflict && !(has_refugee || has_visa || has_denmark) {
                score -= 15;
            }
            if has_tech {
                score += 10;
            }
            if has_medical {
                score += 10;
            }
            return Some((Category::Ukraine, score.max(0) as u32));
        }

        // 2) Tech / medicine, only with local context
        if has_tech || has_medical {
            if !ctx_local {
                return None;
            }
            let category = if has_medical {
                Category::Health
            } else {
                Category::Tech
            };
            let mut score = 80;
            if self.ai.matches(&text) {
                score += 10;
            }
            if has_denmark {
                score += 10;
            }
            if has_europe {
                score += 5;
            }
            return Some((category, score));
        }

        // 3) Family / parents
        if self.parent.matches(&text) && ctx_local {
            let score = if has_denmark { 65 } else { 55 };
            return Some((Category::Family, score));
        }

        // 4) Youth
        if self.youth.matches(&text) && ctx_local {
            let score = if has_denmark { 58 } else { 50 };
            return Some((Category::Youth, score));
        }

        // 5) Culture
        if self.cultural.matches(&text) && ctx_local {
            let score = if has_denmark { 45 } else { 35 };
            return Some((Category::Culture, score));
        }

        // 6) Sports
        if self.sports.matches(&text) && ctx_local {
            let score = if has_denmark { 38 } else { 30 };
            return Some((Category::Sports, score));
        }

        // 7) General Danish news
        if has_denmark {
            let score = if self.politics_bonus.matches(&text) {
                55
            } else {
                40
            };
            return Some((Category::Denmark, score));
        }

        // 8) European news without Danish context
        if has_europe {
            return Some((Category::Europe, 25));
        }

        // 9) Pure conflict coverage (minimal priority)
        if has_conflict {
            return Some((Category::Conflict, 15));
        }

        // 10) Supplemental bags
        if self.economy.matches(&text) {
            return Some((Category::Economy, 20));
        }
        if self.environment.matches(&text) {
            return Some((Category::Environment, 25));
        }
        if self.education.matches(&text) {
            return Some((Category::Education, 22));
        }
        if self.general.matches(&text) {
            return Some((Category::General, 10));
        }

        None
    }
}

/// Lowercase and collapse whitespace; matching reads this form only.
fn normalize(s: &str) -> String {
    s.to_lowercase().split_whitespace().collect::<Vec<_>>().join(" ")
}
