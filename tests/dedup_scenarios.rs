// tests/dedup_scenarios.rs
// End-to-end dedup behavior over realistic repost/syndication shapes.

use chrono::{DateTime, Duration, TimeZone, Utc};
use nyhedsbro::dedup::{jaccard_similarity, normalize_url, Deduper, DropReason};
use nyhedsbro::rss::{FeedItem, FeedSource};

// Fixed reference time well inside a 6-hour similarity bucket, so the
// repost scenario never straddles a window boundary.
fn reference_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 9, 1, 13, 0, 0).unwrap()
}

fn source(name: &str, host: &str) -> FeedSource {
    FeedSource {
        url: format!("https://{host}/rss"),
        name: name.into(),
        lang: "da".into(),
        priority: 1,
        active: true,
        categories: vec![],
    }
}

fn item(title: &str, link: &str, src: &FeedSource, minutes_ago: i64) -> FeedItem {
    FeedItem {
        title: title.into(),
        description: format!("Beskrivelse: {title}"),
        content: String::new(),
        link: link.into(),
        published: Some(reference_time() - Duration::minutes(minutes_ago)),
        enclosures: vec![],
        source: src.clone(),
    }
}

#[test]
fn exact_repost_rejected_by_similarity_key() {
    // Same host, same normalized title, 10 minutes apart: survives the URL
    // and content stages (different link, different description timestamp
    // not part of the key), dies on the similarity key.
    let dr = source("DR", "dr.dk");
    let now = Utc::now();
    let first = item(
        "Kommunen åbner nyt sprogcenter for ukrainske familier",
        "https://dr.dk/nyheder/a1",
        &dr,
        10,
    );
    let mut second = item(
        "Kommunen åbner nyt sprogcenter for ukrainske familier",
        "https://dr.dk/nyheder/a2-genudgivet",
        &dr,
        0,
    );
    // Cosmetic description edit so the content hash differs.
    second.description = "Beskrivelse, let omformuleret.".into();

    let mut d = Deduper::new();
    assert!(d.admit(&first, now).is_ok());
    d.accept_title(&first.title);
    assert_eq!(d.admit(&second, now), Err(DropReason::SimilarKey));
}

#[test]
fn cross_source_syndication_rejected_by_title_jaccard() {
    // Identical title text on different hosts: passes stages 1-3 (different
    // host changes both URL and similarity key), caught by the accepted-title
    // scan with Jaccard ~1.0.
    let dr = source("DR", "dr.dk");
    let tv2 = source("TV 2", "tv2.dk");
    let now = Utc::now();
    let original = item(
        "Regeringen fremlægger nye visumregler for ukrainere",
        "https://dr.dk/nyheder/b1",
        &dr,
        30,
    );
    let mut syndicated = item(
        "Regeringen fremlægger nye visumregler for ukrainere",
        "https://tv2.dk/politik/b1-kopi",
        &tv2,
        5,
    );
    syndicated.description = "Ritzau-telegram i let redigeret form.".into();

    assert!(
        jaccard_similarity(&original.title, &syndicated.title, 2) > 0.99,
        "identical titles must have Jaccard ~1.0"
    );

    let mut d = Deduper::new();
    assert!(d.admit(&original, now).is_ok());
    d.accept_title(&original.title);
    assert_eq!(d.admit(&syndicated, now), Err(DropReason::SimilarTitle));
}

#[test]
fn distinct_stories_pass_all_stages() {
    let dr = source("DR", "dr.dk");
    let tv2 = source("TV 2", "tv2.dk");
    let now = Utc::now();
    let a = item(
        "Nye visumregler for ukrainere i Danmark",
        "https://dr.dk/nyheder/c1",
        &dr,
        10,
    );
    let b = item(
        "Håndboldlandsholdet vinder EM-guld i Hamborg",
        "https://tv2.dk/sport/c2",
        &tv2,
        20,
    );

    let mut d = Deduper::new();
    assert!(d.admit(&a, now).is_ok());
    d.accept_title(&a.title);
    assert!(d.admit(&b, now).is_ok());
}

#[test]
fn url_normalization_is_idempotent_and_fragment_free() {
    let raw = "https://www.dr.dk/nyheder//a/?utm_campaign=x&id=1#afsnit";
    let once = normalize_url(raw);
    let twice = normalize_url(&once);
    assert_eq!(once, twice);
    assert!(!once.contains('#'));
    assert!(!once.contains("utm_"));
    assert!(once.contains("id=1"));
}
