// tests/relevance_scenarios.rs
// Classifier behavior on handpicked headlines, including the priority
// ordering that puts diaspora stories above generic Danish news.

use nyhedsbro::relevance::{Category, Scorer, DEFAULT_LEXICONS};

fn scorer() -> Scorer {
    Scorer::from_toml_str(DEFAULT_LEXICONS).expect("default lexicons load")
}

#[test]
fn diaspora_story_outranks_generic_danish_story() {
    let s = scorer();
    let (cat, diaspora) = s
        .score("Flygtninge fra Ukraine får nye visumregler i København", "")
        .unwrap();
    assert_eq!(cat, Category::Ukraine);
    assert_eq!(diaspora, 85);

    let (cat2, generic) = s
        .score("Kommune får kritik for sagsbehandling af borgere", "")
        .unwrap();
    assert_eq!(cat2, Category::Denmark);
    assert_eq!(generic, 40);

    assert!(diaspora > generic);
}

#[test]
fn conflict_without_local_angle_is_dropped() {
    let s = scorer();
    // Conflict keywords only; no Denmark/Ukraine-geo/Europe hit.
    assert_eq!(s.score("Russiske styrker rykker frem ved fronten", ""), None);
    assert_eq!(s.score("Putin holder tale om invasionen", ""), None);
}

#[test]
fn conflict_with_danish_angle_survives() {
    let s = scorer();
    let (cat, _) = s
        .score("Danmark sender våbenstøtte efter russisk missilangreb", "")
        .unwrap();
    // Ukraine-geo keywords are absent, Denmark context keeps it alive.
    assert_eq!(cat, Category::Denmark);
}

#[test]
fn exclude_keywords_always_drop() {
    let s = scorer();
    for title in [
        "Vejret i weekenden bliver vådt",
        "Ny film får premiere i København",
        "Horoskop: Sådan bliver din uge",
        "Kendis skilles efter ti år",
    ] {
        assert_eq!(s.score(title, ""), None, "should drop: {title}");
    }
}

#[test]
fn description_contributes_to_matching() {
    let s = scorer();
    // Title alone is neutral; the description supplies the signal.
    let hit = s.score(
        "Stor interesse for nyt tilbud",
        "Ukrainske flygtninge i Aarhus kan nu få gratis sprogundervisning",
    );
    let (cat, score) = hit.unwrap();
    assert_eq!(cat, Category::Ukraine);
    assert!(score >= 85); // ukraine base + denmark bonus
}

#[test]
fn health_and_tech_need_local_context() {
    let s = scorer();
    assert_eq!(
        s.score("Breakthrough treatment announced at conference", ""),
        None
    );
    let (cat, score) = s
        .score("Biotek-selskab i København klar med ny behandling", "")
        .unwrap();
    assert_eq!(cat, Category::Health);
    assert_eq!(score, 90); // 80 base + 10 Denmark
}
