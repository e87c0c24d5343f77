//! Locates cross-reference words inside already rendered HTML.
//!
//! Matching runs over the markup string as-is. A word split by a tag is not
//! found, and a word that appears inside a tag name or attribute value can be
//! matched there.

use regex::RegexBuilder;
use serde::Serialize;
use std::cmp::Reverse;
use tracing::warn;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WordRange {
    /// The literal text found in the HTML.
    pub word: String,
    /// The candidate it matched.
    pub key: String,
    /// Byte offset of the first matched byte.
    pub start: usize,
    /// Byte offset one past the match.
    pub end: usize,
}

impl WordRange {
    pub fn overlaps(&self, other: &WordRange) -> bool {
        self.start < other.end && other.start < self.end
    }

    fn char_len(&self) -> usize {
        self.word.chars().count()
    }
}

/// Finds case-insensitive occurrences of `candidates` in `html`, keeping the
/// longest spans first and dropping any span that overlaps one already kept.
///
/// Spans of equal length keep their enumeration order (candidate order, then
/// position). The result is sorted by `start`.
pub fn find_non_overlapping_ranges<S: AsRef<str>>(html: &str, candidates: &[S]) -> Vec<WordRange> {
    let mut spans = Vec::new();
    for candidate in candidates {
        let key = candidate.as_ref();
        if key.is_empty() {
            continue;
        }
        let pattern = match RegexBuilder::new(&regex::escape(key))
            .case_insensitive(true)
            .build()
        {
            Ok(pattern) => pattern,
            Err(err) => {
                warn!(%key, error = %err, "Skipping cross-reference word");
                continue;
            }
        };
        spans.extend(pattern.find_iter(html).map(|found| WordRange {
            word: found.as_str().to_string(),
            key: key.to_string(),
            start: found.start(),
            end: found.end(),
        }));
    }

    spans.sort_by_key(|span| Reverse(span.char_len()));

    let mut kept: Vec<WordRange> = Vec::new();
    for span in spans {
        if !kept.iter().any(|existing| existing.overlaps(&span)) {
            kept.push(span);
        }
    }
    kept.sort_by_key(|span| span.start);
    kept
}

/// Rebuilds `html` with each range wrapped in a clickable span.
///
/// `ranges` must be sorted and non-overlapping, as returned by
/// [`find_non_overlapping_ranges`].
pub fn wrap_ranges(html: &str, ranges: &[WordRange]) -> String {
    let mut out = String::with_capacity(html.len() + ranges.len() * 64);
    let mut last = 0;
    for range in ranges {
        if range.start < last {
            continue;
        }
        out.push_str(&html[last..range.start]);
        out.push_str(r#"<span class="clickable-word" data-word=""#);
        out.push_str(&escape_attribute(&range.key));
        out.push_str(r#"">"#);
        out.push_str(&range.word);
        out.push_str("</span>");
        last = range.end;
    }
    out.push_str(&html[last..]);
    out
}

fn escape_attribute(input: &str) -> String {
    input
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn spans(ranges: &[WordRange]) -> Vec<(&str, usize, usize)> {
        ranges
            .iter()
            .map(|r| (r.word.as_str(), r.start, r.end))
            .collect()
    }

    #[test]
    fn longer_word_wins_over_contained_word() {
        let ranges = find_non_overlapping_ranges("bir kitapçı gördüm", &["kitap", "kitapçı"]);
        assert_eq!(spans(&ranges), vec![("kitapçı", 4, 13)]);
        assert_eq!(ranges[0].key, "kitapçı");
    }

    #[test]
    fn matches_ignore_case_and_keep_literal_text() {
        let ranges = find_non_overlapping_ranges("Nesne ve NESNE", &["nesne"]);
        assert_eq!(spans(&ranges), vec![("Nesne", 0, 5), ("NESNE", 9, 14)]);
        assert!(ranges.iter().all(|r| r.key == "nesne"));
    }

    #[test]
    fn regex_metacharacters_are_literal() {
        let ranges = find_non_overlapping_ranges("a.b axb (c)", &["a.b", "(c)"]);
        assert_eq!(spans(&ranges), vec![("a.b", 0, 3), ("(c)", 8, 11)]);
    }

    #[test]
    fn equal_length_ties_keep_first_enumerated() {
        let ranges = find_non_overlapping_ranges("abcd", &["abc", "bcd"]);
        assert_eq!(spans(&ranges), vec![("abc", 0, 3)]);
        let ranges = find_non_overlapping_ranges("abcd", &["bcd", "abc"]);
        assert_eq!(spans(&ranges), vec![("bcd", 1, 4)]);
    }

    #[test]
    fn results_are_sorted_by_position() {
        let ranges = find_non_overlapping_ranges("ev ve araba", &["ev", "araba"]);
        assert_eq!(spans(&ranges), vec![("ev", 0, 2), ("araba", 6, 11)]);
    }

    #[test]
    fn empty_candidates_are_ignored() {
        assert!(find_non_overlapping_ranges("metin", &[""]).is_empty());
    }

    #[test]
    fn matches_inside_markup_are_not_guarded() {
        let ranges = find_non_overlapping_ranges(r#"<span class="p">kitap</span>"#, &["span"]);
        assert_eq!(ranges.len(), 2);
    }

    #[test]
    fn wrapping_rebuilds_the_html() {
        let html = "bir nesne ve ev";
        let ranges = find_non_overlapping_ranges(html, &["nesne", "ev"]);
        assert_eq!(
            wrap_ranges(html, &ranges),
            r#"bir <span class="clickable-word" data-word="nesne">nesne</span> ve <span class="clickable-word" data-word="ev">ev</span>"#
        );
    }

    #[test]
    fn wrapping_without_ranges_is_identity() {
        assert_eq!(wrap_ranges("<b>x</b>", &[]), "<b>x</b>");
    }

    proptest! {
        #[test]
        fn kept_ranges_never_overlap(
            text in "[abc ]{0,40}",
            words in proptest::collection::vec("[abc]{1,4}", 0..6),
        ) {
            let ranges = find_non_overlapping_ranges(&text, &words);
            for (i, a) in ranges.iter().enumerate() {
                for b in ranges.iter().skip(i + 1) {
                    prop_assert!(a.end <= b.start || b.end <= a.start);
                }
            }
        }

        #[test]
        fn contained_word_loses_to_container(prefix in "[xy ]{0,5}", suffix in "[xy ]{0,5}") {
            let text = format!("{prefix}abcd{suffix}");
            let ranges = find_non_overlapping_ranges(&text, &["bc", "abcd"]);
            prop_assert!(ranges.iter().any(|r| r.word == "abcd"));
            prop_assert!(ranges.iter().all(|r| r.word != "bc"));
        }
    }
}
