use icu::collator::Collator;
use icu::collator::options::CollatorOptions;
use icu::locale::Locale;
use lugat_rs::{
    EntryRecord, FragmentUpdate, MonospaceMetrics, Rect, SearchController, SearchState, Size,
    Viewport, Vocabulary, VocabularyDataset, WidgetConfig, normalize,
};
use proptest::prelude::*;
use std::collections::BTreeSet;

const VOCABULARY: &str = r#"{
    "entryWords": {
        "kitap": {"a": "bir nesne"},
        "kitaplık": {"a": "kitap konulan mobilya\nbkz raf"},
        "Işık": {"a": "aydınlık"},
        "defter": {"a": "yazı için <script>alert(1)</script>kâğıt"}
    },
    "clickableWords": {
        "nesne": [["fiziksel şey"], ["anlam 2"]],
        "kitap": [["2 “basılı” eser"]],
        "raf": [["bkz tahta"]]
    },
    "specialWords": {"bkz": "bakınız"},
    "typeWords": {"2": "isim"}
}"#;

fn write_dataset() -> (tempfile::TempDir, std::path::PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("vocabulary.json");
    std::fs::write(&path, VOCABULARY).unwrap();
    (dir, path)
}

fn loaded_controller() -> SearchController {
    let (_dir, path) = write_dataset();
    let mut controller = SearchController::new(WidgetConfig::default(), MonospaceMetrics::default());
    assert!(controller.load_source(path.to_str().unwrap()));
    controller
}

#[test]
fn failed_load_leaves_widget_inert() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("broken.json");
    std::fs::write(&path, "{ nope").unwrap();

    let mut controller = SearchController::new(WidgetConfig::default(), MonospaceMetrics::default());
    assert!(!controller.load_source(path.to_str().unwrap()));
    assert!(!controller.is_loaded());
    assert!(controller.on_input("kita").is_none());
    assert!(controller.on_load("#kita").is_none());
}

#[test]
fn typing_a_prefix_shows_the_collation_first_headword() {
    let mut controller = loaded_controller();
    let outcome = controller.on_input("kita").unwrap();
    assert_eq!(
        outcome.view.state,
        SearchState::Matched {
            headword: "kitap".into()
        }
    );
    assert_eq!(outcome.view.ghost.text, "p");
    assert_eq!(outcome.fragment, FragmentUpdate::Set("kita".into()));
}

#[test]
fn longer_cross_reference_and_special_terms_render_together() {
    let mut controller = loaded_controller();
    let view = controller.on_input("kitapl").unwrap().view;
    assert_eq!(
        view.html.as_deref(),
        Some(concat!(
            r#"<span class="clickable-word" data-word="kitap">kitap</span> konulan mobilya<br>"#,
            r#"<b>bakınız</b> <span class="p"><span class="clickable-word" data-word="raf">raf</span></span>"#,
        ))
    );
}

#[test]
fn dotless_capital_headwords_are_reachable() {
    let mut controller = loaded_controller();
    let view = controller.on_input("IŞ").unwrap().view;
    assert_eq!(
        view.state,
        SearchState::Matched {
            headword: "Işık".into()
        }
    );
    assert_eq!(view.ghost.text, "ık");
}

#[test]
fn unsafe_definition_markup_is_removed() {
    let mut controller = loaded_controller();
    let html = controller.on_input("def").unwrap().view.html.unwrap();
    assert_eq!(html, "yazı için kâğıt");
}

#[test]
fn blank_and_empty_queries_differ() {
    let mut controller = loaded_controller();
    let blank = controller.on_input(" kita").unwrap();
    assert_eq!(blank.view.state, SearchState::Blank);
    assert!(blank.view.state.is_error());
    assert_eq!(blank.view.ghost.text, "");

    let empty = controller.on_input("").unwrap();
    assert_eq!(empty.view.state, SearchState::Idle);
    assert!(!empty.view.state.is_error());
    assert_eq!(empty.fragment, FragmentUpdate::Replace);
}

#[test]
fn fragment_round_trip_restores_the_query() {
    let mut controller = loaded_controller();
    let FragmentUpdate::Set(fragment) = controller.on_input("ışı").unwrap().fragment else {
        panic!("non-empty query must set the fragment");
    };

    let mut reopened = loaded_controller();
    let view = reopened.on_load(&format!("#{fragment}")).unwrap();
    assert_eq!(reopened.input(), "ışı");
    assert_eq!(
        view.state,
        SearchState::Matched {
            headword: "Işık".into()
        }
    );
}

#[test]
fn tooltip_rotates_and_positions_above_word() {
    let mut controller = loaded_controller();
    controller.on_input("kitap");
    let anchor = Rect {
        left: 100.0,
        top: 300.0,
        width: 50.0,
        height: 18.0,
    };
    let viewport = Viewport {
        width: 400.0,
        scroll_x: 0.0,
        scroll_y: 120.0,
    };
    let size = |_: &lugat_rs::Tooltip| Size {
        width: 80.0,
        height: 40.0,
    };

    let first = controller.click_word("nesne", anchor, viewport, size).unwrap();
    assert_eq!(first.tooltip.html, "fiziksel şey<br>");
    assert_eq!(first.position.left, 85.0);
    assert_eq!(first.position.top, 375.0);

    let second = controller.click_word("nesne", anchor, viewport, size).unwrap();
    assert_eq!(second.tooltip.html, "anlam 2<br>");
    let third = controller.click_word("nesne", anchor, viewport, size).unwrap();
    assert_eq!(third.tooltip.html, "fiziksel şey<br>");

    assert!(controller.leave_word("nesne").is_some());
    assert!(controller.visible_tooltip().is_none());
}

#[test]
fn meaning_lines_are_rewritten_once_at_load() {
    let (_dir, path) = write_dataset();
    let dataset = VocabularyDataset::from_path(&path).unwrap();
    let vocabulary = Vocabulary::new(dataset, "tr").unwrap();
    assert_eq!(
        vocabulary.meanings("kitap").unwrap()[0][0],
        r#"<span class="y">isim</span> <span class="g">“basılı”</span> eser"#
    );
    assert_eq!(vocabulary.meanings("raf").unwrap()[0][0], " tahta");
    assert_eq!(vocabulary.type_label("2"), Some("isim"));
}

#[test]
fn best_match_satisfies_prefix_and_is_collation_minimal() {
    let (_dir, path) = write_dataset();
    let vocabulary = Vocabulary::new(VocabularyDataset::from_path(&path).unwrap(), "tr").unwrap();
    for query in ["k", "kit", "kitapl", "ı", "d"] {
        let hit = vocabulary.best_prefix_match(query).unwrap();
        assert!(hit.normalized.starts_with(&normalize(query)));
        let all = vocabulary.prefix(query, usize::MAX);
        assert_eq!(all.first(), Some(&hit));
    }
}

const LETTERS: &[char] = &[
    'a', 'c', 'ç', 'g', 'ğ', 'ı', 'i', 'I', 'İ', 'k', 'o', 'ö', 's', 'ş', 'u', 'ü',
];

/// Sorts every headword with the collator and returns the first one whose
/// normalized form starts with the normalized query.
fn first_in_collation_order(words: &BTreeSet<String>, query: &str) -> Option<String> {
    let locale: Locale = "tr".parse().unwrap();
    let collator = Collator::try_new(locale.into(), CollatorOptions::default()).unwrap();
    let mut pairs: Vec<(String, &String)> = words.iter().map(|word| (normalize(word), word)).collect();
    pairs.sort_by(|a, b| collator.compare(&a.0, &b.0).then_with(|| a.1.cmp(b.1)));
    let query = normalize(query);
    pairs
        .into_iter()
        .find(|(normalized, _)| normalized.starts_with(&query))
        .map(|(_, word)| word.clone())
}

fn letters(range: std::ops::Range<usize>) -> impl Strategy<Value = String> {
    prop::collection::vec(prop::sample::select(LETTERS), range)
        .prop_map(|chars| chars.into_iter().collect())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn best_match_agrees_with_a_full_collation_sort(
        words in prop::collection::btree_set(letters(1..6), 1..20),
        query in letters(0..3),
    ) {
        let mut dataset = VocabularyDataset::default();
        for word in &words {
            dataset.entry_words.insert(word.clone(), EntryRecord::new(format!("{word} tanımı")));
        }
        let vocabulary = Vocabulary::new(dataset, "tr").unwrap();
        let found = vocabulary.best_prefix_match(&query).map(|hit| hit.headword);
        prop_assert_eq!(found, first_in_collation_order(&words, &query));
    }
}
