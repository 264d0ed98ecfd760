//! Canvas – the narrow drawing contract the table engine depends on, and
//! [`LayoutCanvas`], which records drawing into a [`DocumentLayout`].

use crate::columns::Align;
use crate::fonts::{measure_text_width, TextStyle, PT_PER_MM};
use crate::layout_config::{DocumentLayout, DrawItem, PageKind, PageLayout};
use crate::pagination::{PageCursor, PageGeometry};

/// Stroke width of table rules, in points.
pub const RULE_WIDTH_PT: f32 = 0.2;

/// Drawing primitives. Coordinates are millimetres from the page's top-left.
///
/// Every call takes its style explicitly; implementations keep no "current
/// font" state.
pub trait Canvas {
    fn page_width(&self) -> f32;

    fn page_height(&self) -> f32;

    /// Start a new page and move the cursor to the top of its content area.
    fn new_page(&mut self);

    /// 1-based number of the current page (0 before the first page).
    fn page_number(&self) -> usize;

    fn cursor_y(&self) -> f32;

    fn set_cursor_y(&mut self, y: f32);

    fn text_width(&self, text: &str, style: TextStyle) -> f32 {
        measure_text_width(text, style)
    }

    /// Draw one line of text inside the box `[x, x + width]`, with `y` the
    /// top of the line.
    fn draw_text(&mut self, x: f32, y: f32, width: f32, text: &str, align: Align, style: TextStyle);

    /// Straight line; `width` is the stroke in points.
    fn draw_line(&mut self, x1: f32, y1: f32, x2: f32, y2: f32, width: f32);

    /// Rectangle with optional RGB fill and optional border.
    fn draw_cell(&mut self, x: f32, y: f32, width: f32, height: f32, fill: Option<[f32; 3]>, border: bool);
}

/// Text printed in the band above the content area of every content page.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunningHeader {
    pub left: String,
    pub right: String,
}

/// A [`Canvas`] that records every primitive into a [`DocumentLayout`].
pub struct LayoutCanvas {
    geometry: PageGeometry,
    layout: DocumentLayout,
    cursor: PageCursor,
    running_header: Option<RunningHeader>,
}

impl LayoutCanvas {
    pub fn new(geometry: PageGeometry, title: &str) -> Self {
        let layout = DocumentLayout {
            title: title.to_string(),
            page_width_mm: geometry.page_width,
            page_height_mm: geometry.page_height,
            pages: Vec::new(),
        };
        Self {
            cursor: PageCursor::new(geometry.content_top),
            geometry,
            layout,
            running_header: None,
        }
    }

    pub fn geometry(&self) -> &PageGeometry {
        &self.geometry
    }

    pub fn set_running_header(&mut self, header: Option<RunningHeader>) {
        self.running_header = header;
    }

    pub fn layout(&self) -> &DocumentLayout {
        &self.layout
    }

    /// Start an unnumbered cover page with no running header.
    pub fn start_cover_page(&mut self) {
        self.push_page(PageKind::Cover);
        self.cursor.start_page(self.geometry.top_margin);
    }

    /// Print `left` and `page n/N` at the foot of every content page.
    ///
    /// Runs after all pages exist, so `N` is the true number of numbered
    /// pages; the cover page is neither numbered nor counted.
    pub fn stamp_footers(&mut self, left: &str) {
        let total = self.layout.numbered_pages();
        let style = TextStyle::regular(8.0);
        let x = self.geometry.left_margin;
        let width = self.geometry.usable_width();
        let y = self.geometry.page_height - self.geometry.bottom_margin + 3.0;

        let mut number = 0;
        for page in self.layout.pages.iter_mut().filter(|p| p.kind == PageKind::Content) {
            number += 1;
            let right = format!("page {number}/{total}");
            page.items.push(text_item(x, y, width, left, Align::Left, style));
            page.items.push(text_item(x, y, width, &right, Align::Right, style));
        }
    }

    pub fn finish(self) -> DocumentLayout {
        self.layout
    }

    fn push_page(&mut self, kind: PageKind) {
        let page_index = self.layout.pages.len();
        self.layout.pages.push(PageLayout {
            page_index,
            kind,
            items: Vec::new(),
        });
    }

    fn push(&mut self, item: DrawItem) {
        if self.layout.pages.is_empty() {
            self.new_page();
        }
        if let Some(page) = self.layout.pages.last_mut() {
            page.items.push(item);
        }
    }
}

impl Canvas for LayoutCanvas {
    fn page_width(&self) -> f32 {
        self.geometry.page_width
    }

    fn page_height(&self) -> f32 {
        self.geometry.page_height
    }

    fn new_page(&mut self) {
        self.push_page(PageKind::Content);
        self.cursor.start_page(self.geometry.content_top);
        log::debug!("page {} started", self.layout.pages.len());

        if let Some(header) = self.running_header.clone() {
            let style = TextStyle::regular(10.0);
            let x = self.geometry.left_margin;
            let width = self.geometry.usable_width();
            let y = self.geometry.top_margin + 3.0;
            self.draw_text(x, y, width, &header.left, Align::Left, style);
            self.draw_text(x, y, width, &header.right, Align::Right, style);
        }
    }

    fn page_number(&self) -> usize {
        self.cursor.page
    }

    fn cursor_y(&self) -> f32 {
        self.cursor.y
    }

    fn set_cursor_y(&mut self, y: f32) {
        self.cursor.y = y;
    }

    fn draw_text(&mut self, x: f32, y: f32, width: f32, text: &str, align: Align, style: TextStyle) {
        if text.is_empty() {
            return;
        }
        self.push(text_item(x, y, width, text, align, style));
    }

    fn draw_line(&mut self, x1: f32, y1: f32, x2: f32, y2: f32, width: f32) {
        self.push(DrawItem::Line { x1, y1, x2, y2, width });
    }

    fn draw_cell(&mut self, x: f32, y: f32, width: f32, height: f32, fill: Option<[f32; 3]>, border: bool) {
        self.push(DrawItem::Rect {
            x,
            y,
            width,
            height,
            fill,
            border,
        });
    }
}

/// Place `text` inside `[x, x + width]` according to `align`.
fn text_item(x: f32, y: f32, width: f32, text: &str, align: Align, style: TextStyle) -> DrawItem {
    let text_width = measure_text_width(text, style);
    let x = match align {
        Align::Left => x,
        Align::Center => x + (width - text_width) / 2.0,
        Align::Right => x + width - text_width,
    };
    DrawItem::Text {
        x,
        y,
        text: text.to_string(),
        style,
    }
}

/// Top offset that vertically centres a line of `style` in a box `height` tall.
pub fn centred_text_top(height: f32, style: TextStyle) -> f32 {
    ((height - style.size / PT_PER_MM) / 2.0).max(0.0)
}
