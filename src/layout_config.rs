//! Layout config – the intermediate representation between the drawing
//! engine and PDF rendering. This is the "frozen" structure that encodes
//! exactly what goes on each page.
//!
//! All coordinates are millimetres from the top-left corner of the page.

use serde::{Deserialize, Serialize};

use crate::fonts::TextStyle;

/// A complete document layout ready for rendering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentLayout {
    /// Document title embedded in the PDF metadata.
    #[serde(default = "DocumentLayout::default_title")]
    pub title: String,
    pub page_width_mm: f32,
    pub page_height_mm: f32,
    /// Ordered list of pages.
    pub pages: Vec<PageLayout>,
}

/// What a page is for; the cover is not numbered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PageKind {
    Cover,
    Content,
}

/// One page of content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageLayout {
    pub page_index: usize,
    pub kind: PageKind,
    pub items: Vec<DrawItem>,
}

/// A single drawing primitive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DrawItem {
    /// Text whose `x` is already aligned; `y` is the top of the line box.
    Text {
        x: f32,
        y: f32,
        text: String,
        style: TextStyle,
    },
    Line {
        x1: f32,
        y1: f32,
        x2: f32,
        y2: f32,
        /// Stroke width in points.
        width: f32,
    },
    Rect {
        x: f32,
        y: f32,
        width: f32,
        height: f32,
        /// RGB fill in 0..1, if filled.
        fill: Option<[f32; 3]>,
        border: bool,
    },
}

impl DocumentLayout {
    /// Create an A4 document layout.
    pub fn a4() -> Self {
        Self {
            title: Self::default_title(),
            page_width_mm: 210.0,
            page_height_mm: 297.0,
            pages: Vec::new(),
        }
    }

    fn default_title() -> String {
        "Cost schedule".to_string()
    }

    /// Pages that carry a page number.
    pub fn numbered_pages(&self) -> usize {
        self.pages.iter().filter(|p| p.kind == PageKind::Content).count()
    }

    /// Serialise to JSON.
    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_default()
    }

    /// Deserialise from JSON.
    pub fn from_json(json: &str) -> Result<Self, String> {
        serde_json::from_str(json).map_err(|e| e.to_string())
    }
}

impl PageLayout {
    /// All text on the page, in drawing order.
    pub fn texts(&self) -> impl DoubleEndedIterator<Item = &str> {
        self.items.iter().filter_map(|item| match item {
            DrawItem::Text { text, .. } => Some(text.as_str()),
            _ => None,
        })
    }
}
