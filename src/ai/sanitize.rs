// src/ai/sanitize.rs
//! Strips AI disclaimer boilerplate from provider output. Pure text→text;
//! the caller decides what to do when everything was boilerplate.

use once_cell::sync::Lazy;
use regex::Regex;

// Full lines that are disclaimers: "Note: ...", "Disclaimer: ...".
static RE_NOTE_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?im)^\s*(note|disclaimer)\s*:.*$").unwrap());

// Bracketed or parenthesized segments whose body reads as a disclaimer.
static RE_BRACKETED: Lazy<Regex> = Lazy::new(|| Regex::new(r"\[[^\]]*\]|\([^)]*\)").unwrap());

static RE_DISCLAIMER_BODY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)(note\s*:|disclaimer|machine[ -]?translat|ai[ -]generated|automatic\s+translat|translated\s+by|may\s+contain\s+errors|as\s+an\s+ai)",
    )
    .unwrap()
});

static RE_WS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[ \t]+").unwrap());
static RE_BLANK_LINES: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{2,}").unwrap());

/// Remove disclaimer lines and bracketed/parenthesized disclaimer fragments,
/// then collapse the leftover whitespace. Legitimate text is preserved
/// verbatim; an input that was nothing but disclaimers comes back empty.
pub fn sanitize_ai_text(input: &str) -> String {
    if input.is_empty() {
        return String::new();
    }

    let mut out = RE_NOTE_LINE.replace_all(input, "").into_owned();

    out = RE_BRACKETED
        .replace_all(&out, |caps: &regex::Captures<'_>| {
            let seg = caps.get(0).map(|m| m.as_str()).unwrap_or("");
            if RE_DISCLAIMER_BODY.is_match(seg) {
                String::new()
            } else {
                seg.to_string()
            }
        })
        .into_owned();

    out = RE_WS.replace_all(&out, " ").into_owned();
    let trimmed_lines: Vec<&str> = out.lines().map(str::trim).collect();
    out = trimmed_lines.join("\n");
    out = RE_BLANK_LINES.replace_all(&out, "\n").into_owned();

    out.trim().to_string()
}
