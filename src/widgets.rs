//! Mini-app widgets
//!
//! Plain data, drawn by the display and hit-tested there. A button does not
//! call into the app directly: a hit submits its `emits` line to the input
//! queue like a typed command.

/// Cell rectangle, relative to the widget region origin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Rect {
    pub x: u16,
    pub y: u16,
    pub width: u16,
    pub height: u16,
}

impl Rect {
    pub const fn new(x: u16, y: u16, width: u16, height: u16) -> Self {
        Self { x, y, width, height }
    }

    /// Covers exactly the `width` x `height` cells the display draws.
    pub fn contains(&self, x: u16, y: u16) -> bool {
        let right = self.x.saturating_add(self.width);
        let bottom = self.y.saturating_add(self.height);
        x >= self.x && x < right && y >= self.y && y < bottom
    }

    /// Bottom edge as a row count.
    pub fn bottom(&self) -> u16 {
        self.y.saturating_add(self.height)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WidgetKind {
    Label { text: String },
    Button { label: String, emits: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Widget {
    pub rect: Rect,
    pub kind: WidgetKind,
    pub visible: bool,
}

impl Widget {
    pub fn label(rect: Rect, text: impl Into<String>) -> Self {
        Self {
            rect,
            kind: WidgetKind::Label { text: text.into() },
            visible: true,
        }
    }

    pub fn button(rect: Rect, label: impl Into<String>, emits: impl Into<String>) -> Self {
        Self {
            rect,
            kind: WidgetKind::Button {
                label: label.into(),
                emits: emits.into(),
            },
            visible: true,
        }
    }

    pub fn text(&self) -> &str {
        match &self.kind {
            WidgetKind::Label { text } => text,
            WidgetKind::Button { label, .. } => label,
        }
    }
}

/// Line emitted by the topmost visible button under `(x, y)`.
pub fn hit_test(widgets: &[Widget], x: u16, y: u16) -> Option<String> {
    widgets
        .iter()
        .rev()
        .filter(|w| w.visible && w.rect.contains(x, y))
        .find_map(|w| match &w.kind {
            WidgetKind::Button { emits, .. } => Some(emits.clone()),
            WidgetKind::Label { .. } => None,
        })
}

/// Rows needed to show every visible widget, plus one blank separator row.
pub fn region_height(widgets: &[Widget]) -> u16 {
    widgets
        .iter()
        .filter(|w| w.visible)
        .map(|w| w.rect.bottom().saturating_add(1))
        .max()
        .unwrap_or(0)
}
