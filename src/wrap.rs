//! Cell wrapping – turns a logical row into per-column lines of text.

use serde::{Deserialize, Serialize};

use crate::columns::{Align, ColumnLayout};
use crate::fonts::TextStyle;

/// Semantic tag of a row; decides font and alignment when drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum RowStyle {
    #[default]
    Plain,
    /// Root category heading.
    Category,
    /// Cost item heading (index path + name).
    Item,
    /// Italic note, e.g. the rate identification code.
    Note,
    /// Subtotal row; every cell right-aligned.
    Sum,
    /// Summary page row.
    Summary,
    /// Grand total on the summary page.
    GrandTotal,
}

impl RowStyle {
    pub fn text_style(self) -> TextStyle {
        match self {
            RowStyle::Plain | RowStyle::Sum => TextStyle::regular(8.0),
            RowStyle::Category => TextStyle::bold(10.0),
            RowStyle::Item => TextStyle::bold(8.0),
            RowStyle::Note => TextStyle::italic(8.0),
            RowStyle::Summary => TextStyle::regular(10.0),
            RowStyle::GrandTotal => TextStyle::bold(10.0),
        }
    }

    /// Alignment for a cell whose column defaults to `column_align`.
    pub fn align(self, column_align: Align) -> Align {
        match self {
            RowStyle::Sum => Align::Right,
            _ => column_align,
        }
    }

    /// Category and item headings carry the index path in column 0.
    pub fn is_heading(self) -> bool {
        matches!(self, RowStyle::Category | RowStyle::Item)
    }
}

/// One semantic table row before wrapping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogicalRow {
    pub cells: Vec<String>,
    pub style: RowStyle,
}

impl LogicalRow {
    pub fn new(cells: Vec<String>, style: RowStyle) -> Self {
        Self { cells, style }
    }

    pub fn cell(&self, index: usize) -> &str {
        self.cells.get(index).map(String::as_str).unwrap_or("")
    }
}

/// A logical row after wrapping; every column has at least one line.
#[derive(Debug, Clone, PartialEq)]
pub struct WrappedRow {
    pub columns: Vec<Vec<String>>,
    pub style: RowStyle,
}

impl WrappedRow {
    /// Height in lines: the longest column.
    pub fn height(&self) -> usize {
        self.columns.iter().map(Vec::len).max().unwrap_or(1)
    }

    /// Line `line` of column `column`, or empty padding past its end.
    pub fn line(&self, column: usize, line: usize) -> &str {
        self.columns
            .get(column)
            .and_then(|c| c.get(line))
            .map(String::as_str)
            .unwrap_or("")
    }
}

/// Wrap every cell of `row` to its column's character budget.
///
/// Missing trailing cells are treated as empty and surplus cells are
/// dropped, so the result always has one entry per column.
pub fn wrap(row: &LogicalRow, layout: &ColumnLayout) -> WrappedRow {
    let columns = (0..layout.len())
        .map(|i| wrap_cell(row.cell(i), layout.char_budget(i)))
        .collect();
    WrappedRow {
        columns,
        style: row.style,
    }
}

/// Greedy word wrap to `budget` characters per line.
///
/// Whitespace runs (newlines included) collapse to single spaces; words
/// longer than the budget are split. Never returns an empty vec.
pub fn wrap_cell(text: &str, budget: usize) -> Vec<String> {
    let budget = budget.max(1);
    let mut lines: Vec<String> = Vec::new();
    let mut current = String::new();
    let mut current_len = 0usize;

    for word in text.split_whitespace() {
        let mut word: Vec<char> = word.chars().collect();

        if current_len > 0 && current_len + 1 + word.len() <= budget {
            current.push(' ');
            current.extend(word.iter());
            current_len += 1 + word.len();
            continue;
        }
        if current_len > 0 {
            lines.push(std::mem::take(&mut current));
        }
        while word.len() > budget {
            let rest = word.split_off(budget);
            lines.push(word.into_iter().collect());
            word = rest;
        }
        current_len = word.len();
        current = word.into_iter().collect();
    }

    if current_len > 0 {
        lines.push(current);
    }
    if lines.is_empty() {
        lines.push(String::new());
    }
    lines
}
