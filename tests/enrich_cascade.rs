// tests/enrich_cascade.rs
// Provider cascade: primary quota failure, dud first fallback, working
// second fallback, rule-based excerpt for what remains.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use nyhedsbro::ai::mock::{FixedFallback, ScriptedPrimary};
use nyhedsbro::ai::{AiRuntime, FallbackChain, PrimaryProvider};
use nyhedsbro::enrich::{EnrichOptions, Enricher};
use nyhedsbro::news::Candidate;
use nyhedsbro::relevance::Category;
use nyhedsbro::scrape::Scraper;

fn candidate() -> Candidate {
    Candidate {
        title: "Nye regler for midlertidig beskyttelse".into(),
        description: "Regeringen har fremlagt nye regler for midlertidig beskyttelse af ukrainske flygtninge. Reglerne træder i kraft til januar. Flere kommuner er allerede i gang med forberedelserne. <img src=\"https://dr.dk/img/rules.jpg\">".into(),
        feed_content: String::new(),
        link: "https://dr.dk/nyheder/regler".into(),
        published: Utc::now(),
        category: Category::Ukraine,
        score: 85,
        source_name: "DR".into(),
        source_lang: "da".into(),
        enclosures: vec![],
    }
}

#[tokio::test]
async fn quota_failure_cascades_down_the_chain() {
    let primary = Arc::new(ScriptedPrimary {
        fail_first: u32::MAX, // quota-exceeded on every call
        calls: AtomicU32::new(0),
    });
    let chain = FallbackChain::new(vec![
        // Provider A: always empty output.
        Arc::new(FixedFallback {
            label: "provider-a",
            summary: String::new(),
            translation: String::new(),
        }),
        // Provider B: a three-sentence paragraph.
        Arc::new(FixedFallback {
            label: "provider-b",
            summary: "Уряд Данії представив нові правила тимчасового захисту. Вони набудуть чинності в січні. Муніципалітети вже готуються до змін.".into(),
            translation: "Нові правила тимчасового захисту".into(),
        }),
    ]);

    let primary_dyn: Arc<dyn PrimaryProvider> = primary.clone();
    let ai = AiRuntime {
        primary: primary_dyn,
        chain,
    };
    let enricher = Enricher::new(
        &ai,
        Arc::new(Scraper::new().unwrap()),
        EnrichOptions {
            max_primary_calls: 3,
            inter_item_pause: Duration::ZERO,
        },
    );

    let out = enricher
        .enrich_all(vec![candidate()], &HashMap::new())
        .await;
    assert_eq!(out.len(), 1);
    let item = &out[0];

    // Ukrainian summary came from provider B, not the excerpt.
    assert!(item.summary_ukrainian.contains("тимчасового захисту"));
    assert_eq!(item.summary_ukrainian.matches('.').count(), 3);

    // The original-language gist fell back to the rule-based excerpt of the
    // content (first two long sentences).
    assert!(item.summary_original.contains("Regeringen har fremlagt"));

    // Both summaries are guaranteed non-empty even under total failure.
    assert!(!item.summary_danish.is_empty());
    assert!(!item.summary_ukrainian.is_empty());

    // Ukrainian title resolved through the chain's translate entry point.
    assert_eq!(
        item.title_ukrainian.as_deref(),
        Some("Нові правила тимчасового захисту")
    );

    // The quota-failed attempt still consumed a budget slot.
    assert_eq!(primary.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn budget_exhaustion_skips_primary_entirely() {
    let primary = Arc::new(ScriptedPrimary {
        fail_first: 0, // would succeed if called
        calls: AtomicU32::new(0),
    });
    let primary_dyn: Arc<dyn PrimaryProvider> = primary.clone();

    let ai = AiRuntime {
        primary: primary_dyn,
        chain: FallbackChain::default(),
    };
    let enricher = Enricher::new(
        &ai,
        Arc::new(Scraper::new().unwrap()),
        EnrichOptions {
            max_primary_calls: 0, // budget already exhausted
            inter_item_pause: Duration::ZERO,
        },
    );

    let out = enricher
        .enrich_all(vec![candidate()], &HashMap::new())
        .await;
    assert_eq!(out.len(), 1);
    // No call ever reached the primary; the item still carries summaries.
    assert_eq!(primary.calls.load(Ordering::SeqCst), 0);
    assert!(!out[0].summary_danish.is_empty());
    assert!(!out[0].summary_ukrainian.is_empty());
}
