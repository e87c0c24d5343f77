//! Rewrites raw definition text into the HTML shown in the results panel.
//!
//! Dataset text is untrusted, so newlines become `<br>` and the result goes
//! through the allowlist sanitizer first. Special terms are then located on a
//! token stream instead of through chained regex replacements: the sanitized
//! HTML is split into text runs and tags, term occurrences in text runs become
//! markers, a second pass binds each marker's label to the word that follows
//! it, and markers that found no following word are dropped. A label never
//! binds across a tag, so `<br>` ends the search for a following word.

use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use std::collections::{HashMap, HashSet};
use tracing::warn;

const ALLOWED_TAGS: [&str; 2] = ["span", "br"];

static QUOTED_SPAN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"“([^”]+)”").expect("valid quoted span pattern"));
static NUMERIC_TOKEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b([0-9]+)\b").expect("valid numeric token pattern"));

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    /// Dataset text that may still contain special terms.
    Text(String),
    /// A special term occurrence, by index into the term list.
    Marker(usize),
    /// A tag from the sanitized input, or markup produced by promotion.
    /// Never matched again.
    Markup(String),
}

/// Allowlist HTML sanitizer: `span` (with `class`) and `br` survive,
/// `script` and `style` are dropped together with their content, every other
/// tag is unwrapped to its text.
pub struct Sanitizer {
    builder: ammonia::Builder<'static>,
}

impl Sanitizer {
    pub fn new() -> Self {
        let mut builder = ammonia::Builder::default();
        builder
            .tags(HashSet::from(ALLOWED_TAGS))
            .generic_attributes(HashSet::new())
            .tag_attributes(HashMap::from([("span", HashSet::from(["class"]))]))
            .link_rel(None);
        Self { builder }
    }

    pub fn clean(&self, html: &str) -> String {
        self.builder.clean(html).to_string()
    }
}

impl Default for Sanitizer {
    fn default() -> Self {
        Self::new()
    }
}

pub struct Annotator {
    /// Special terms with their labels already escaped for HTML.
    terms: Vec<(String, String)>,
    sanitizer: Sanitizer,
}

impl Annotator {
    pub fn new(special_words: &IndexMap<String, String>) -> Self {
        let terms = special_terms(special_words)
            .into_iter()
            .map(|(term, label)| (term, ammonia::clean_text(&label)))
            .collect();
        Self {
            terms,
            sanitizer: Sanitizer::new(),
        }
    }

    /// Produces safe HTML for a raw definition.
    pub fn annotate(&self, raw: &str) -> String {
        let sanitized = self.sanitizer.clean(&raw.replace('\n', "<br>"));
        let mut tokens = tokenize_html(&sanitized);
        for (index, (term, _)) in self.terms.iter().enumerate() {
            tokens = tag_term(tokens, term, index);
        }
        for (index, (_, label)) in self.terms.iter().enumerate() {
            tokens = promote_label(tokens, index, label);
        }
        render(&tokens)
    }
}

/// Rewrites one meaning line shown inside a tooltip.
///
/// Special terms are removed outright, `“quoted”` runs get the `g` style, and
/// bare numbers with a `typeWords` label are replaced by that label in the
/// `y` style. Numbers without a label are left as they are.
pub fn annotate_meaning(
    line: &str,
    special_words: &IndexMap<String, String>,
    type_words: &IndexMap<String, String>,
) -> String {
    let mut tokens = vec![Token::Text(line.to_string())];
    for (index, (term, _)) in special_terms(special_words).iter().enumerate() {
        tokens = tag_term(tokens, term, index);
    }
    let stripped = render(&tokens);
    let quoted = QUOTED_SPAN.replace_all(&stripped, r#"<span class="g">“$1”</span>"#);
    NUMERIC_TOKEN
        .replace_all(&quoted, |caps: &Captures<'_>| match type_words.get(&caps[1]) {
            Some(label) => format!(r#"<span class="y">{label}</span>"#),
            None => caps[0].to_string(),
        })
        .into_owned()
}

fn special_terms(special_words: &IndexMap<String, String>) -> Vec<(String, String)> {
    special_words
        .iter()
        .filter(|(term, _)| {
            if term.is_empty() {
                warn!("Skipping empty special term");
                return false;
            }
            true
        })
        .map(|(term, label)| (term.clone(), label.clone()))
        .collect()
}

/// Splits sanitized HTML into text runs and tags.
fn tokenize_html(html: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut rest = html;
    while let Some(open) = rest.find('<') {
        if open > 0 {
            tokens.push(Token::Text(rest[..open].to_string()));
        }
        let close = tag_end(&rest[open..]).map_or(rest.len(), |end| open + end);
        tokens.push(Token::Markup(rest[open..close].to_string()));
        rest = &rest[close..];
    }
    if !rest.is_empty() {
        tokens.push(Token::Text(rest.to_string()));
    }
    tokens
}

/// Byte offset just past the `>` closing the tag that starts `html`.
/// Quoted attribute values may contain `>`.
fn tag_end(html: &str) -> Option<usize> {
    let mut quote = None;
    for (offset, c) in html.char_indices() {
        match quote {
            Some(open) if c == open => quote = None,
            Some(_) => {}
            None if c == '"' || c == '\'' => quote = Some(c),
            None if c == '>' => return Some(offset + 1),
            None => {}
        }
    }
    None
}

fn render(tokens: &[Token]) -> String {
    let mut out = String::new();
    for token in tokens {
        match token {
            Token::Text(text) | Token::Markup(text) => out.push_str(text),
            Token::Marker(_) => {}
        }
    }
    out
}

fn tag_term(tokens: Vec<Token>, term: &str, index: usize) -> Vec<Token> {
    let mut out = Vec::with_capacity(tokens.len());
    for token in tokens {
        match token {
            Token::Text(text) => split_on_term(&text, term, index, &mut out),
            other => out.push(other),
        }
    }
    out
}

/// Splits `text` at every whole-word, case-insensitive occurrence of `term`.
fn split_on_term(text: &str, term: &str, index: usize, out: &mut Vec<Token>) {
    let mut last = 0;
    let mut cursor = 0;
    while cursor < text.len() {
        if is_boundary(text, cursor) {
            if let Some(len) = match_ignore_case(&text[cursor..], term) {
                let end = cursor + len;
                if is_boundary(text, end) {
                    if last < cursor {
                        out.push(Token::Text(text[last..cursor].to_string()));
                    }
                    out.push(Token::Marker(index));
                    last = end;
                    cursor = end;
                    continue;
                }
            }
        }
        cursor += text[cursor..].chars().next().map_or(1, char::len_utf8);
    }
    if last < text.len() {
        out.push(Token::Text(text[last..].to_string()));
    }
}

fn promote_label(tokens: Vec<Token>, index: usize, label: &str) -> Vec<Token> {
    let mut out = Vec::with_capacity(tokens.len() + 2);
    let mut iter = tokens.into_iter().peekable();
    while let Some(token) = iter.next() {
        if token != Token::Marker(index) {
            out.push(token);
            continue;
        }
        let following = match iter.peek() {
            Some(Token::Text(next)) => split_following_word(next)
                .map(|(space, word, rest)| (space.to_string(), word.to_string(), rest.to_string())),
            _ => None,
        };
        match following {
            Some((space, word, rest)) => {
                iter.next();
                out.push(Token::Markup(format!("<b>{label}</b>")));
                out.push(Token::Markup(space));
                out.push(Token::Markup(format!(r#"<span class="p">{word}</span>"#)));
                if !rest.is_empty() {
                    out.push(Token::Text(rest));
                }
            }
            None => out.push(token),
        }
    }
    out
}

/// Splits `text` into leading whitespace, the following word, and the rest.
/// Needs at least one whitespace character before the word.
fn split_following_word(text: &str) -> Option<(&str, &str, &str)> {
    let word_start = text.find(|c: char| !c.is_whitespace())?;
    if word_start == 0 {
        return None;
    }
    let word_end = text[word_start..]
        .find(char::is_whitespace)
        .map_or(text.len(), |offset| word_start + offset);
    Some((
        &text[..word_start],
        &text[word_start..word_end],
        &text[word_end..],
    ))
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

fn is_boundary(text: &str, pos: usize) -> bool {
    let before = text[..pos].chars().next_back().is_some_and(is_word_char);
    let after = text[pos..].chars().next().is_some_and(is_word_char);
    before != after
}

/// Length in bytes of the prefix of `haystack` matching `needle` ignoring case.
fn match_ignore_case(haystack: &str, needle: &str) -> Option<usize> {
    let mut hay = haystack.char_indices();
    let mut consumed = 0;
    for expected in needle.chars() {
        let (offset, found) = hay.next()?;
        if !chars_eq_ignore_case(found, expected) {
            return None;
        }
        consumed = offset + found.len_utf8();
    }
    Some(consumed)
}

fn chars_eq_ignore_case(a: char, b: char) -> bool {
    a == b || a.to_lowercase().eq(b.to_lowercase()) || a.to_uppercase().eq(b.to_uppercase())
}
