pub mod annotate;
pub mod config;
mod data;
pub mod fragment;
pub mod normalize;
pub mod ranges;
pub mod search;
pub mod tooltip;

pub use annotate::{Annotator, Sanitizer, annotate_meaning};
pub use config::{ConfigError, GhostConfig, TooltipConfig, WidgetConfig};
pub use data::{EntryRecord, LoadError, MeaningGroups, VocabularyDataset};
pub use fragment::{FragmentUpdate, decode_fragment, encode_fragment};
pub use normalize::normalize;
pub use ranges::{WordRange, find_non_overlapping_ranges, wrap_ranges};
pub use search::{
    GhostText, InputOutcome, MonospaceMetrics, SearchController, SearchState, SearchView,
    TextMetrics,
};
pub use tooltip::{PlacedTooltip, Point, Rect, Size, Tooltip, TooltipPresenter, Viewport};

use fst::Automaton;
use fst::automaton::Str;
use fst::{IntoStreamer, Map, Streamer};
use icu::collator::options::CollatorOptions;
use icu::collator::{Collator, CollatorBorrowed};
use icu::locale::Locale;
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::info;

/// A headword found by prefix search.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PrefixMatch {
    /// The headword as stored in the dataset.
    pub headword: String,
    /// The headword after [`normalize`].
    pub normalized: String,
}

struct SortedHeadword {
    normalized: String,
    original: String,
}

/// Immutable in-memory vocabulary built once from a [`VocabularyDataset`].
///
/// Headwords are collation-sorted by their normalized form at construction
/// and indexed in an fst keyed by that form, with the collation rank as the
/// value. A prefix lookup streams the matching keys and keeps the lowest rank,
/// so the winner is always the collation-first headword that starts with the
/// normalized query.
pub struct Vocabulary {
    dataset: VocabularyDataset,
    sorted: Vec<SortedHeadword>,
    index: Map<Vec<u8>>,
    clickable_longest_first: Vec<String>,
}

impl Vocabulary {
    pub fn new(mut dataset: VocabularyDataset, locale: &str) -> Result<Self, ConfigError> {
        let collator = build_collator(locale)?;
        rewrite_meanings(&mut dataset);

        let mut sorted: Vec<SortedHeadword> = dataset
            .entry_words
            .keys()
            .map(|word| SortedHeadword {
                normalized: normalize(word),
                original: word.clone(),
            })
            .collect();
        sorted.sort_by(|a, b| {
            collator
                .compare(&a.normalized, &b.normalized)
                .then_with(|| a.original.cmp(&b.original))
        });

        let mut ranks: BTreeMap<&str, u64> = BTreeMap::new();
        for (rank, entry) in sorted.iter().enumerate() {
            ranks.entry(entry.normalized.as_str()).or_insert(rank as u64);
        }
        let index = Map::from_iter(ranks)?;

        let mut clickable_longest_first: Vec<String> =
            dataset.clickable_words.keys().cloned().collect();
        clickable_longest_first.sort_by_key(|word| std::cmp::Reverse(word.chars().count()));

        info!(
            headwords = sorted.len(),
            indexed = index.len(),
            locale,
            "Vocabulary ready"
        );
        Ok(Self {
            dataset,
            sorted,
            index,
            clickable_longest_first,
        })
    }

    pub fn len(&self) -> usize {
        self.sorted.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sorted.is_empty()
    }

    /// Returns the collation-first headword whose normalized form starts with
    /// the normalized `query`.
    pub fn best_prefix_match(&self, query: &str) -> Option<PrefixMatch> {
        let normalized = normalize(query);
        let automaton = Str::new(&normalized).starts_with();
        let mut stream = self.index.search(automaton).into_stream();
        let mut best: Option<u64> = None;
        while let Some((_, rank)) = stream.next() {
            best = Some(best.map_or(rank, |current| current.min(rank)));
        }
        best.and_then(|rank| self.match_at(rank as usize))
    }

    /// Returns up to `limit` matching headwords in collation order.
    pub fn prefix(&self, query: &str, limit: usize) -> Vec<PrefixMatch> {
        let normalized = normalize(query);
        let automaton = Str::new(&normalized).starts_with();
        let mut stream = self.index.search(automaton).into_stream();
        let mut ranks = Vec::new();
        while let Some((_, rank)) = stream.next() {
            ranks.push(rank as usize);
        }
        ranks.sort_unstable();
        ranks
            .into_iter()
            .filter_map(|rank| self.match_at(rank))
            .take(limit)
            .collect()
    }

    /// Raw definition text for a headword, exactly as stored.
    pub fn definition(&self, headword: &str) -> Option<&str> {
        self.dataset
            .entry_words
            .get(headword)
            .map(|entry| entry.definition.as_str())
    }

    /// Rewritten meaning groups for a cross-reference word, if it has any.
    pub fn meanings(&self, word: &str) -> Option<&[Vec<String>]> {
        self.dataset
            .clickable_words
            .get(word)
            .map(Vec::as_slice)
            .filter(|groups| !groups.is_empty())
    }

    pub fn type_label(&self, code: &str) -> Option<&str> {
        self.dataset.type_words.get(code).map(String::as_str)
    }

    /// Cross-reference words, longest first; equal lengths keep dataset order.
    pub fn clickable_words_longest_first(&self) -> &[String] {
        &self.clickable_longest_first
    }

    fn match_at(&self, rank: usize) -> Option<PrefixMatch> {
        self.sorted.get(rank).map(|entry| PrefixMatch {
            headword: entry.original.clone(),
            normalized: entry.normalized.clone(),
        })
    }
}

fn build_collator(locale: &str) -> Result<CollatorBorrowed<'static>, ConfigError> {
    let parsed: Locale = locale
        .parse()
        .map_err(|err| ConfigError::Locale(format!("{locale:?}: {err:?}")))?;
    Collator::try_new(parsed.into(), CollatorOptions::default())
        .map_err(|err| ConfigError::Collator(format!("{locale}: {err:?}")))
}

fn rewrite_meanings(dataset: &mut VocabularyDataset) {
    let sanitizer = Sanitizer::new();
    let special_words = &dataset.special_words;
    let type_words = &dataset.type_words;
    for groups in dataset.clickable_words.values_mut() {
        for line in groups.iter_mut().flatten() {
            *line = sanitizer.clean(&annotate_meaning(line, special_words, type_words));
        }
    }
}
