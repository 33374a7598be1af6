// src/compose.rs
//! Message composition. Telegram counts caption length in characters, so
//! every budget here is rune-based, never bytes.

use crate::news::EnrichedItem;

const CAPTION_HEADER: &str = "🇩🇰 Nyhedsbro 🇺🇦\n\n";
const MESSAGE_FOOTER: &str = "📱 Nyhedsbro";

pub fn rune_len(s: &str) -> usize {
    s.chars().count()
}

/// Trim to at most `max` runes, preferring the last word boundary, with an
/// ellipsis when something was cut.
pub fn trim_to_word_boundary(s: &str, max: usize) -> String {
    let s = s.trim();
    if max == 0 || rune_len(s) <= max {
        return s.to_string();
    }
    let cut: String = s.chars().take(max).collect();
    let trimmed = match cut.rfind(' ') {
        // Only back up to a space when it is reasonably close to the cut.
        Some(idx) if rune_len(&cut) - rune_len(&cut[..idx]) <= 50 => cut[..idx].trim_end().to_string(),
        _ => cut.trim_end().to_string(),
    };
    if trimmed.is_empty() {
        return cut;
    }
    format!("{trimmed}...")
}

/// Keep at most `max_sentences` sentences of at least 15 runes each.
pub fn condense_summary(s: &str, max_sentences: usize) -> String {
    let s = s.trim();
    if s.is_empty() || max_sentences == 0 {
        return s.to_string();
    }

    let mut sentences: Vec<String> = Vec::new();
    let mut cur = String::new();
    for c in s.chars() {
        cur.push(c);
        if matches!(c, '.' | '!' | '?') {
            let fragment = cur.trim().to_string();
            if rune_len(&fragment) >= 15 {
                sentences.push(fragment);
            }
            cur.clear();
        }
        if sentences.len() >= max_sentences {
            break;
        }
    }

    if sentences.is_empty() {
        for part in s.split('.') {
            let part = part.trim();
            if part.is_empty() {
                continue;
            }
            sentences.push(format!("{part}."));
            if sentences.len() >= max_sentences {
                break;
            }
        }
    }

    sentences.join(" ").trim().to_string()
}

/// Hard cap used by the plain-text message blocks.
pub fn limit_text(s: &str, max: usize) -> String {
    if rune_len(s) <= max {
        return s.to_string();
    }
    trim_to_word_boundary(s, max)
}

/// Partial publication gate: at least one language block must carry
/// `min_total_runes / 2` of content.
pub fn has_publishable_summaries(item: &EnrichedItem, min_total_runes: usize) -> bool {
    let floor = min_total_runes / 2;
    rune_len(item.summary_danish.trim()) >= floor
        || rune_len(item.summary_ukrainian.trim()) >= floor
}

/// Full bilingual text message: link (for the preview), Danish block,
/// Ukrainian block, footer. Composed with `sentences_max` per language;
/// when that overshoots Telegram's text limit, recomposed with
/// `sentences_min`.
pub fn format_text_message(item: &EnrichedItem, sentences_min: usize, sentences_max: usize) -> String {
    let msg = compose_text(item, sentences_max);
    if rune_len(&msg) > 3500 && sentences_min < sentences_max {
        return compose_text(item, sentences_min);
    }
    msg
}

fn compose_text(item: &EnrichedItem, sentences: usize) -> String {
    let mut b = String::new();
    b.push_str(CAPTION_HEADER);

    if !item.link().trim().is_empty() {
        b.push_str(item.link());
        b.push_str("\n\n");
    }

    b.push_str("🇩🇰 ");
    b.push_str(item.title());
    b.push('\n');
    b.push_str(&limit_text(&condense_summary(&item.summary_danish, sentences), 1000));
    b.push_str("\n\n");

    b.push_str("🇺🇦 ");
    b.push_str(item.title_ukrainian.as_deref().unwrap_or_else(|| item.title()));
    b.push('\n');
    b.push_str(&limit_text(&condense_summary(&item.summary_ukrainian, sentences), 1000));
    b.push_str("\n\n");

    b.push_str("━━━━━━━━━━━━━━━\n");
    b.push_str(MESSAGE_FOOTER);
    b
}

/// Budget knobs for photo captions, sourced from the runtime config.
#[derive(Debug, Clone, Copy)]
pub struct CaptionBudget {
    pub max_runes: usize,
    pub min_per_lang_runes: usize,
    pub sentences_per_lang: usize,
}

impl Default for CaptionBudget {
    fn default() -> Self {
        Self {
            max_runes: 1024,
            min_per_lang_runes: 100,
            sentences_per_lang: 2,
        }
    }
}

/// Compact bilingual caption fitting Telegram's 1024-rune photo-caption
/// limit. Each language gets a floor; the remainder is split proportionally
/// to the summaries' lengths; everything trims on word boundaries.
pub fn format_photo_caption(item: &EnrichedItem, budget: CaptionBudget) -> String {
    let max_len = if budget.max_runes == 0 || budget.max_runes > 1024 {
        1024
    } else {
        budget.max_runes
    };

    let mut da_title = item.title().trim().to_string();
    let mut uk_title = item
        .title_ukrainian
        .as_deref()
        .unwrap_or_else(|| item.title())
        .trim()
        .to_string();
    if uk_title.is_empty() {
        uk_title = da_title.clone();
    }

    let da_sum = condense_summary(item.summary_danish.trim(), budget.sentences_per_lang);
    let uk_sum = condense_summary(item.summary_ukrainian.trim(), budget.sentences_per_lang);

    let base_len = |da_t: &str, uk_t: &str| {
        rune_len(CAPTION_HEADER) + rune_len("🇩🇰 ") + rune_len(da_t) + 1 // \n
            + 2 // \n\n after the Danish summary
            + rune_len("🇺🇦 ") + rune_len(uk_t) + 1
            + 2
    };

    // When the titles alone crowd the limit, shorten them first so the
    // summaries keep a minimal budget.
    if base_len(&da_title, &uk_title) >= max_len.saturating_sub(40) {
        let room_for_titles = max_len
            .saturating_sub(rune_len(CAPTION_HEADER))
            .saturating_sub(48)
            .max(20);
        let each = room_for_titles / 2;
        da_title = trim_to_word_boundary(&da_title, each);
        uk_title = trim_to_word_boundary(&uk_title, each);
    }

    let available = max_len.saturating_sub(base_len(&da_title, &uk_title)).max(40);
    let min_floor = (available / 5).max(budget.min_per_lang_runes.max(1));
    let rem = available.saturating_sub(2 * min_floor);

    let da_len = rune_len(&da_sum);
    let uk_len = rune_len(&uk_sum);
    let total = da_len + uk_len;
    let (da_budget, uk_budget) = if total > 0 && rem > 0 {
        (
            min_floor + rem * da_len / total,
            min_floor + rem * uk_len / total,
        )
    } else {
        (available / 2, available - available / 2)
    };

    let da_sum = trim_to_word_boundary(&da_sum, da_budget);
    let uk_sum = trim_to_word_boundary(&uk_sum, uk_budget);

    let mut caption = String::new();
    caption.push_str(CAPTION_HEADER);
    caption.push_str("🇩🇰 ");
    caption.push_str(&da_title);
    caption.push('\n');
    caption.push_str(&da_sum);
    caption.push_str("\n\n");
    caption.push_str("🇺🇦 ");
    caption.push_str(&uk_title);
    caption.push('\n');
    caption.push_str(&uk_sum);
    caption.push_str("\n\n");

    if rune_len(&caption) > max_len {
        let cut: String = caption.chars().take(max_len - 1).collect();
        caption = format!("{cut}…");
    }
    caption
}
