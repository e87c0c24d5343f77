use std::fmt;
use std::time::Duration;

pub const DEFAULT_LOCALE: &str = "tr";

#[derive(Debug, Clone, PartialEq)]
pub struct WidgetConfig {
    /// BCP-47 locale used to collate headwords.
    pub locale: String,
    pub tooltip: TooltipConfig,
    pub ghost: GhostConfig,
}

impl Default for WidgetConfig {
    fn default() -> Self {
        Self {
            locale: DEFAULT_LOCALE.to_string(),
            tooltip: TooltipConfig::default(),
            ghost: GhostConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TooltipConfig {
    /// Vertical distance between the tooltip and the clicked word.
    pub gap: f64,
    /// Distance kept from the viewport edge when the tooltip is clamped.
    pub edge_margin: f64,
    pub fade_in: Duration,
    pub fade_out: Duration,
}

impl Default for TooltipConfig {
    fn default() -> Self {
        Self {
            gap: 5.0,
            edge_margin: 5.0,
            fade_in: Duration::from_millis(50),
            fade_out: Duration::from_millis(300),
        }
    }
}

/// Input box metrics used to position the ghost text after the typed query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GhostConfig {
    pub padding_left: f64,
    pub font_size: f64,
}

impl Default for GhostConfig {
    fn default() -> Self {
        Self {
            padding_left: 12.0,
            font_size: 18.0,
        }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    Locale(String),
    Collator(String),
    Index(fst::Error),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Locale(message) => write!(f, "invalid locale: {message}"),
            ConfigError::Collator(message) => write!(f, "collator unavailable: {message}"),
            ConfigError::Index(err) => write!(f, "prefix index build failed: {err}"),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<fst::Error> for ConfigError {
    fn from(value: fst::Error) -> Self {
        ConfigError::Index(value)
    }
}
