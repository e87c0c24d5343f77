use crate::config::TooltipConfig;
use serde::Serialize;
use std::collections::HashMap;
use std::time::Duration;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct Rect {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct Viewport {
    pub width: f64,
    pub scroll_x: f64,
    pub scroll_y: f64,
}

/// Page coordinates of the tooltip's top-left corner.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct Point {
    pub left: f64,
    pub top: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Tooltip {
    pub word: String,
    /// Meaning lines, each followed by `<br>`.
    pub html: String,
    /// Index of the meaning group shown.
    pub group: usize,
    pub group_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlacedTooltip {
    pub tooltip: Tooltip,
    pub position: Point,
    /// Fade-in the host applies when showing the tooltip.
    pub fade_in_ms: u64,
}

/// Shows one meaning group per click and rotates through the groups of each
/// word. At most one tooltip is visible.
#[derive(Debug, Default)]
pub struct TooltipPresenter {
    config: TooltipConfig,
    rotation: HashMap<String, usize>,
    visible: Option<Tooltip>,
}

impl TooltipPresenter {
    pub fn new(config: TooltipConfig) -> Self {
        Self {
            config,
            rotation: HashMap::new(),
            visible: None,
        }
    }

    /// Replaces any visible tooltip with the next meaning group of `word`.
    ///
    /// With no groups the old tooltip is still removed and nothing is shown.
    pub fn present(&mut self, word: &str, groups: &[Vec<String>]) -> Option<Tooltip> {
        self.visible = None;
        if groups.is_empty() {
            return None;
        }
        let index = self.rotation.get(word).copied().unwrap_or(0) % groups.len();
        let html = groups[index]
            .iter()
            .map(|line| format!("{line}<br>"))
            .collect::<String>();
        let tooltip = Tooltip {
            word: word.to_string(),
            html,
            group: index,
            group_count: groups.len(),
        };
        self.visible = Some(tooltip.clone());
        let next = (index + 1) % groups.len();
        self.rotation.insert(word.to_string(), next);
        debug!(word, shown = index, next, "Tooltip rotated");
        Some(tooltip)
    }

    /// Centers the tooltip above `anchor`, clamped to the viewport.
    pub fn place(&self, anchor: Rect, size: Size, viewport: Viewport) -> Point {
        let top = anchor.top + viewport.scroll_y - size.height - self.config.gap;
        let mut left =
            anchor.left + viewport.scroll_x + anchor.width / 2.0 - size.width / 2.0;
        if left + size.width > viewport.width {
            left = viewport.width - size.width - self.config.edge_margin;
        }
        if left < 0.0 {
            left = self.config.edge_margin;
        }
        Point { left, top }
    }

    /// Pointer left `word`: hides its tooltip and returns the fade-out delay
    /// the host should wait before removing it.
    pub fn dismiss(&mut self, word: &str) -> Option<Duration> {
        match &self.visible {
            Some(tooltip) if tooltip.word == word => {
                self.visible = None;
                Some(self.config.fade_out)
            }
            _ => None,
        }
    }

    pub fn clear(&mut self) {
        self.visible = None;
    }

    pub fn visible(&self) -> Option<&Tooltip> {
        self.visible.as_ref()
    }

    /// Group index the next click on `word` will show.
    pub fn rotation_index(&self, word: &str) -> usize {
        self.rotation.get(word).copied().unwrap_or(0)
    }

    pub fn fade_in(&self) -> Duration {
        self.config.fade_in
    }
}
