//! Pagination – draws wrapped table rows onto fixed-size pages.
//!
//! Handles:
//! - Partial rows that continue on the next page
//! - Column header redraw after every page break
//! - Vertical cell separators per drawn chunk
//! - Horizontal rules requested by the caller (subtotals, table close)

use serde::{Deserialize, Serialize};

use crate::canvas::{centred_text_top, Canvas, RULE_WIDTH_PT};
use crate::columns::{Align, ColumnLayout};
use crate::error::{ExportError, Result};
use crate::fonts::TextStyle;
use crate::schedule::DocumentType;
use crate::wrap::WrappedRow;

/// Slack for float rounding when counting whole lines that fit.
const FIT_EPSILON: f32 = 1e-3;

/// Column header fill (light grey).
const HEADER_FILL: [f32; 3] = [220.0 / 255.0, 220.0 / 255.0, 220.0 / 255.0];

/// Horizontal padding inside a cell, in millimetres.
const CELL_PADDING: f32 = 1.0;

/// Page size and vertical rhythm, in millimetres. Defaults to A4.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PageGeometry {
    pub page_width: f32,
    pub page_height: f32,
    pub left_margin: f32,
    pub right_margin: f32,
    /// Top of the running-header band.
    pub top_margin: f32,
    /// Where table content starts on a fresh page.
    pub content_top: f32,
    pub bottom_margin: f32,
    /// Height of one wrapped text line.
    pub row_height: f32,
    /// Height of the column header row.
    pub header_height: f32,
}

impl Default for PageGeometry {
    fn default() -> Self {
        Self {
            page_width: 210.0,
            page_height: 297.0,
            left_margin: 10.0,
            right_margin: 10.0,
            top_margin: 10.0,
            content_top: 25.0,
            bottom_margin: 15.0,
            row_height: 4.0,
            header_height: 8.0,
        }
    }
}

impl PageGeometry {
    pub fn usable_width(&self) -> f32 {
        self.page_width - self.left_margin - self.right_margin
    }

    /// Vertical space between the content top and the bottom margin.
    pub fn usable_height(&self) -> f32 {
        self.page_height - self.content_top - self.bottom_margin
    }

    /// Whole body lines that fit on a fresh page below the column header.
    pub fn lines_per_page(&self) -> usize {
        lines_that_fit(self.usable_height() - self.header_height, self.row_height)
    }

    /// Reject geometry under which a fresh page could not hold the header
    /// plus one body line; pagination would never make progress.
    pub fn validate(&self) -> Result<()> {
        if !(self.row_height > 0.0) || !(self.header_height > 0.0) {
            return Err(ExportError::LayoutInvariant(format!(
                "row height {} and header height {} must be positive",
                self.row_height, self.header_height
            )));
        }
        if self.header_height + self.row_height > self.usable_height() {
            return Err(ExportError::LayoutInvariant(format!(
                "header ({} mm) plus one row ({} mm) exceeds the usable page height ({} mm)",
                self.header_height,
                self.row_height,
                self.usable_height()
            )));
        }
        Ok(())
    }
}

/// Vertical position on the current page.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageCursor {
    pub y: f32,
    /// 1-based page number; 0 before the first page.
    pub page: usize,
}

impl PageCursor {
    pub fn new(y: f32) -> Self {
        Self { y, page: 0 }
    }

    pub fn start_page(&mut self, top: f32) {
        self.page += 1;
        self.y = top;
    }

    pub fn remaining(&self, page_height: f32, bottom_margin: f32) -> f32 {
        page_height - self.y - bottom_margin
    }
}

fn lines_that_fit(space: f32, row_height: f32) -> usize {
    if space <= 0.0 {
        return 0;
    }
    ((space + FIT_EPSILON) / row_height).floor() as usize
}

/// Columns plus page geometry, validated together.
#[derive(Debug, Clone, PartialEq)]
pub struct TableLayout {
    columns: ColumnLayout,
    geometry: PageGeometry,
}

impl TableLayout {
    pub fn new(columns: ColumnLayout, geometry: PageGeometry) -> Result<Self> {
        geometry.validate()?;
        let usable = geometry.usable_width();
        if columns.total_width() > usable + FIT_EPSILON {
            return Err(ExportError::LayoutInvariant(format!(
                "columns are {} mm wide but the page only has {} mm",
                columns.total_width(),
                usable
            )));
        }
        Ok(Self { columns, geometry })
    }

    pub fn for_document(doc_type: DocumentType, geometry: PageGeometry) -> Result<Self> {
        Self::new(ColumnLayout::for_document(doc_type), geometry)
    }

    pub fn columns(&self) -> &ColumnLayout {
        &self.columns
    }

    pub fn geometry(&self) -> &PageGeometry {
        &self.geometry
    }

    fn column_x(&self, index: usize) -> f32 {
        self.geometry.left_margin + self.columns.offset(index)
    }

    fn right_edge(&self) -> f32 {
        self.geometry.left_margin + self.columns.total_width()
    }
}

/// Draws rows of one table, breaking pages as needed.
///
/// `emit` is atomic from the caller's point of view: however many pages a
/// row spans, every line is drawn before it returns.
pub struct RowEmitter<'a> {
    table: &'a TableLayout,
    page_breaks: usize,
}

impl<'a> RowEmitter<'a> {
    pub fn new(table: &'a TableLayout) -> Self {
        Self { table, page_breaks: 0 }
    }

    /// Page breaks forced by rows that did not fit.
    pub fn page_breaks(&self) -> usize {
        self.page_breaks
    }

    /// Draw the grey column header at the cursor.
    pub fn draw_header<C: Canvas>(&self, canvas: &mut C) {
        let style = TextStyle::bold(8.0);
        let height = self.table.geometry.header_height;
        let y = canvas.cursor_y();
        let text_y = y + centred_text_top(height, style);

        for (i, column) in self.table.columns.columns().iter().enumerate() {
            let x = self.table.column_x(i);
            canvas.draw_cell(x, y, column.width, height, Some(HEADER_FILL), true);
            canvas.draw_text(x, text_y, column.width, &column.label, Align::Center, style);
        }
        canvas.set_cursor_y(y + height);
    }

    /// Draw every line of `row`, continuing on new pages as required.
    pub fn emit<C: Canvas>(&mut self, canvas: &mut C, row: &WrappedRow) {
        let total_lines = row.height();
        let mut lines_drawn = 0;
        let mut fresh_page = false;

        while lines_drawn < total_lines {
            let mut available = self.available_lines(canvas);
            if available == 0 {
                if !fresh_page {
                    self.break_page(canvas);
                    fresh_page = true;
                    continue;
                }
                // The canvas is smaller than the validated geometry; draw
                // one line anyway so the loop always advances.
                log::warn!("no room for a line on a fresh page; overflowing the bottom margin");
                available = 1;
            }

            let count = available.min(total_lines - lines_drawn);
            self.draw_chunk(canvas, row, lines_drawn, count);
            lines_drawn += count;
            fresh_page = false;
        }
    }

    /// Horizontal rule at the cursor from the left edge of `from_column` to
    /// the right edge of the table.
    pub fn draw_rule<C: Canvas>(&self, canvas: &mut C, from_column: usize) {
        let y = canvas.cursor_y();
        let x1 = self.table.column_x(from_column.min(self.table.columns.len()));
        canvas.draw_line(x1, y, self.table.right_edge(), y, RULE_WIDTH_PT);
    }

    fn available_lines<C: Canvas>(&self, canvas: &C) -> usize {
        let geometry = &self.table.geometry;
        let remaining = canvas.page_height() - canvas.cursor_y() - geometry.bottom_margin;
        lines_that_fit(remaining, geometry.row_height)
    }

    fn break_page<C: Canvas>(&mut self, canvas: &mut C) {
        canvas.new_page();
        self.draw_header(canvas);
        self.page_breaks += 1;
        log::debug!("table continued on page {}", canvas.page_number());
    }

    fn draw_chunk<C: Canvas>(&self, canvas: &mut C, row: &WrappedRow, start: usize, count: usize) {
        let row_height = self.table.geometry.row_height;
        let style = row.style.text_style();
        let top = canvas.cursor_y();
        let height = count as f32 * row_height;
        let text_offset = centred_text_top(row_height, style);

        for (i, column) in self.table.columns.columns().iter().enumerate() {
            let x = self.table.column_x(i) + CELL_PADDING;
            let width = column.width - 2.0 * CELL_PADDING;
            let align = row.style.align(column.align);
            for line in 0..count {
                let text = row.line(i, start + line);
                let y = top + line as f32 * row_height + text_offset;
                canvas.draw_text(x, y, width, text, align, style);
            }
        }

        for i in 0..=self.table.columns.len() {
            let x = self.table.column_x(i);
            canvas.draw_line(x, top, x, top + height, RULE_WIDTH_PT);
        }

        canvas.set_cursor_y(top + height);
    }
}
