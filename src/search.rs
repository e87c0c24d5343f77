use crate::annotate::Annotator;
use crate::config::{ConfigError, GhostConfig, WidgetConfig};
use crate::data::VocabularyDataset;
use crate::fragment::{FragmentUpdate, decode_fragment, encode_fragment};
use crate::normalize::normalize;
use crate::ranges::{WordRange, find_non_overlapping_ranges, wrap_ranges};
use crate::tooltip::{PlacedTooltip, Rect, Size, Tooltip, TooltipPresenter, Viewport};
use crate::Vocabulary;
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, error, info};

/// Text measurement supplied by the host (a canvas in the browser).
pub trait TextMetrics {
    fn text_width(&self, text: &str, font_size: f64) -> f64;
}

/// Fixed advance per character, as a fraction of the font size.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MonospaceMetrics {
    pub advance: f64,
}

impl Default for MonospaceMetrics {
    fn default() -> Self {
        Self { advance: 0.6 }
    }
}

impl TextMetrics for MonospaceMetrics {
    fn text_width(&self, text: &str, font_size: f64) -> f64 {
        text.chars().count() as f64 * font_size * self.advance
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SearchState {
    /// Empty query; nothing shown, no error.
    Idle,
    /// Non-empty query that starts with or is only whitespace.
    Blank,
    NoMatch,
    Matched { headword: String },
}

impl SearchState {
    /// Whether the search box should carry the error style.
    pub fn is_error(&self) -> bool {
        matches!(self, SearchState::Blank | SearchState::NoMatch)
    }
}

/// Inline autocomplete suggestion drawn after the typed query.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct GhostText {
    pub text: String,
    /// Horizontal offset inside the input box, in pixels.
    pub offset: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchView {
    pub query: String,
    pub state: SearchState,
    /// Rendered definition with clickable cross-references.
    pub html: Option<String>,
    pub ranges: Vec<WordRange>,
    pub ghost: GhostText,
}

impl SearchView {
    fn idle() -> Self {
        Self::empty(String::new(), SearchState::Idle)
    }

    fn empty(query: String, state: SearchState) -> Self {
        Self {
            query,
            state,
            html: None,
            ranges: Vec::new(),
            ghost: GhostText::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InputOutcome {
    pub view: SearchView,
    pub fragment: FragmentUpdate,
}

struct Loaded {
    vocabulary: Vocabulary,
    annotator: Annotator,
    tooltips: TooltipPresenter,
}

/// All widget state: the loaded vocabulary, the last processed query, and
/// tooltip rotation.
///
/// Until [`load`](Self::load) succeeds every handler returns `None`.
pub struct SearchController {
    config: WidgetConfig,
    metrics: Box<dyn TextMetrics>,
    loaded: Option<Loaded>,
    last_query: String,
    input: String,
    view: SearchView,
}

impl SearchController {
    pub fn new(config: WidgetConfig, metrics: impl TextMetrics + 'static) -> Self {
        Self {
            config,
            metrics: Box::new(metrics),
            loaded: None,
            last_query: String::new(),
            input: String::new(),
            view: SearchView::idle(),
        }
    }

    pub fn load(&mut self, dataset: VocabularyDataset) -> Result<(), ConfigError> {
        let annotator = Annotator::new(&dataset.special_words);
        let vocabulary = Vocabulary::new(dataset, &self.config.locale)?;
        self.loaded = Some(Loaded {
            vocabulary,
            annotator,
            tooltips: TooltipPresenter::new(self.config.tooltip),
        });
        info!("Widget enabled");
        Ok(())
    }

    /// Loads from a path or URL. Failures are logged and leave the widget
    /// inert; there is no retry.
    pub fn load_source(&mut self, source: &str) -> bool {
        let dataset = match VocabularyDataset::load(source) {
            Ok(dataset) => dataset,
            Err(err) => {
                error!(%source, error = %err, "Vocabulary load failed");
                return false;
            }
        };
        match self.load(dataset) {
            Ok(()) => true,
            Err(err) => {
                error!(%source, error = %err, "Vocabulary setup failed");
                false
            }
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded.is_some()
    }

    pub fn vocabulary(&self) -> Option<&Vocabulary> {
        self.loaded.as_ref().map(|loaded| &loaded.vocabulary)
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn view(&self) -> &SearchView {
        &self.view
    }

    pub fn visible_tooltip(&self) -> Option<&Tooltip> {
        self.loaded.as_ref()?.tooltips.visible()
    }

    /// Annotates arbitrary text with the loaded special terms.
    pub fn annotate(&self, raw: &str) -> Option<String> {
        Some(self.loaded.as_ref()?.annotator.annotate(raw))
    }

    /// Runs a query. A query that normalizes to the last processed one
    /// returns the previous view without searching again.
    pub fn search(&mut self, query: &str) -> Option<SearchView> {
        let loaded = self.loaded.as_ref()?;
        self.input = query.to_string();
        let normalized = normalize(query);
        if normalized == self.last_query {
            debug!(query, "Query unchanged; keeping results");
            self.view.query = query.to_string();
            return Some(self.view.clone());
        }
        self.last_query = normalized;
        self.view = render_query(loaded, query, &self.config.ghost, self.metrics.as_ref());
        debug!(query, state = ?self.view.state, "Query processed");
        Some(self.view.clone())
    }

    /// Input event: search, then mirror the query into the fragment.
    pub fn on_input(&mut self, query: &str) -> Option<InputOutcome> {
        let view = self.search(query)?;
        let fragment = if query.is_empty() {
            FragmentUpdate::Replace
        } else {
            FragmentUpdate::Set(encode_fragment(query))
        };
        Some(InputOutcome { view, fragment })
    }

    /// Replays the fragment present when the dataset finished loading.
    pub fn on_load(&mut self, fragment: &str) -> Option<SearchView> {
        self.loaded.as_ref()?;
        let query = decode_fragment(fragment);
        if query.is_empty() {
            return Some(self.view.clone());
        }
        self.search(&query)
    }

    /// Fragment changed (navigation, bookmark, back button). An empty
    /// fragment resets the widget to idle. Any tooltip is removed.
    pub fn on_fragment_change(&mut self, fragment: &str) -> Option<SearchView> {
        self.loaded.as_mut()?.tooltips.clear();
        let query = decode_fragment(fragment);
        if query.is_empty() {
            self.input.clear();
            self.last_query.clear();
            self.view = SearchView::idle();
            return Some(self.view.clone());
        }
        self.search(&query)
    }

    /// A `searchable` element in the results was clicked: its text becomes
    /// the new input.
    pub fn follow_reference(&mut self, text: &str) -> Option<InputOutcome> {
        self.on_input(text)
    }

    /// Click on a wrapped cross-reference word. `measure` reports the size of
    /// the rendered tooltip so it can be positioned.
    pub fn click_word<F>(
        &mut self,
        word: &str,
        anchor: Rect,
        viewport: Viewport,
        measure: F,
    ) -> Option<PlacedTooltip>
    where
        F: FnOnce(&Tooltip) -> Size,
    {
        let loaded = self.loaded.as_mut()?;
        let groups = loaded.vocabulary.meanings(word).unwrap_or(&[]);
        let tooltip = loaded.tooltips.present(word, groups)?;
        let position = loaded.tooltips.place(anchor, measure(&tooltip), viewport);
        let fade_in_ms =
            u64::try_from(loaded.tooltips.fade_in().as_millis()).unwrap_or(u64::MAX);
        Some(PlacedTooltip {
            tooltip,
            position,
            fade_in_ms,
        })
    }

    /// Pointer left a cross-reference word.
    pub fn leave_word(&mut self, word: &str) -> Option<Duration> {
        self.loaded.as_mut()?.tooltips.dismiss(word)
    }
}

fn render_query(
    loaded: &Loaded,
    query: &str,
    ghost: &GhostConfig,
    metrics: &dyn TextMetrics,
) -> SearchView {
    if query.is_empty() {
        return SearchView::idle();
    }
    if query.starts_with(char::is_whitespace) || query.trim().is_empty() {
        return SearchView::empty(query.to_string(), SearchState::Blank);
    }
    let Some(hit) = loaded.vocabulary.best_prefix_match(query) else {
        return SearchView::empty(query.to_string(), SearchState::NoMatch);
    };

    let definition = loaded.vocabulary.definition(&hit.headword).unwrap_or_default();
    let annotated = loaded.annotator.annotate(definition);
    let ranges = find_non_overlapping_ranges(
        &annotated,
        loaded.vocabulary.clickable_words_longest_first(),
    );
    let html = wrap_ranges(&annotated, &ranges);
    let text: String = hit.normalized.chars().skip(query.chars().count()).collect();
    let offset = ghost.padding_left + metrics.text_width(query, ghost.font_size);

    SearchView {
        query: query.to_string(),
        state: SearchState::Matched {
            headword: hit.headword,
        },
        html: Some(html),
        ranges,
        ghost: GhostText { text, offset },
    }
}
