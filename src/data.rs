use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use tracing::{debug, info};

/// Meaning groups for one cross-reference word; each group is a list of lines.
pub type MeaningGroups = Vec<Vec<String>>;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryRecord {
    #[serde(rename = "a", default)]
    pub definition: String,
}

impl EntryRecord {
    pub fn new(definition: impl Into<String>) -> Self {
        Self {
            definition: definition.into(),
        }
    }
}

/// The vocabulary payload as published next to the widget.
///
/// Every mapping is optional in the JSON document; a missing key loads as an
/// empty mapping. Key order is preserved because special terms are applied in
/// dataset order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct VocabularyDataset {
    pub entry_words: IndexMap<String, EntryRecord>,
    pub clickable_words: IndexMap<String, MeaningGroups>,
    pub special_words: IndexMap<String, String>,
    pub type_words: IndexMap<String, String>,
}

impl VocabularyDataset {
    pub fn from_slice(bytes: &[u8]) -> Result<Self, LoadError> {
        let dataset: Self = serde_json::from_slice(bytes)?;
        dataset.log_summary();
        Ok(dataset)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self, LoadError> {
        let dataset: Self = serde_json::from_reader(reader)?;
        dataset.log_summary();
        Ok(dataset)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, LoadError> {
        let path = path.as_ref();
        debug!(path = %path.display(), "Reading vocabulary file");
        let file = File::open(path)?;
        Self::from_reader(BufReader::new(file))
    }

    /// Single GET for the dataset document. No retry and no timeout beyond
    /// the client defaults.
    #[cfg(feature = "fetch")]
    pub fn fetch(url: &str) -> Result<Self, LoadError> {
        debug!(%url, "Fetching vocabulary");
        let response = reqwest::blocking::get(url)?.error_for_status()?;
        let bytes = response.bytes()?;
        Self::from_slice(&bytes)
    }

    /// Loads from an `http(s)://` URL or a filesystem path.
    pub fn load(source: &str) -> Result<Self, LoadError> {
        if is_remote(source) {
            #[cfg(feature = "fetch")]
            return Self::fetch(source);
            #[cfg(not(feature = "fetch"))]
            return Err(LoadError::RemoteDisabled(source.to_string()));
        }
        Self::from_path(source)
    }

    fn log_summary(&self) {
        info!(
            entries = self.entry_words.len(),
            clickable = self.clickable_words.len(),
            special = self.special_words.len(),
            types = self.type_words.len(),
            "Vocabulary dataset parsed"
        );
    }
}

fn is_remote(source: &str) -> bool {
    source.starts_with("http://") || source.starts_with("https://")
}

#[derive(Debug)]
pub enum LoadError {
    Io(std::io::Error),
    Json(serde_json::Error),
    #[cfg(feature = "fetch")]
    Http(reqwest::Error),
    RemoteDisabled(String),
}

impl fmt::Display for LoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoadError::Io(err) => write!(f, "io error: {err}"),
            LoadError::Json(err) => write!(f, "malformed vocabulary json: {err}"),
            #[cfg(feature = "fetch")]
            LoadError::Http(err) => write!(f, "http error: {err}"),
            LoadError::RemoteDisabled(url) => {
                write!(f, "cannot fetch {url}: rebuild with `--features fetch`")
            }
        }
    }
}

impl std::error::Error for LoadError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            LoadError::Io(err) => Some(err),
            LoadError::Json(err) => Some(err),
            #[cfg(feature = "fetch")]
            LoadError::Http(err) => Some(err),
            LoadError::RemoteDisabled(_) => None,
        }
    }
}

impl From<std::io::Error> for LoadError {
    fn from(value: std::io::Error) -> Self {
        LoadError::Io(value)
    }
}

impl From<serde_json::Error> for LoadError {
    fn from(value: serde_json::Error) -> Self {
        LoadError::Json(value)
    }
}

#[cfg(feature = "fetch")]
impl From<reqwest::Error> for LoadError {
    fn from(value: reqwest::Error) -> Self {
        LoadError::Http(value)
    }
}
