//! Column layouts – the fixed table shapes, one per document type.

use serde::{Deserialize, Serialize};

use crate::error::{ExportError, Result};
use crate::schedule::DocumentType;

/// Index of the free-text description column in every layout.
pub const DESCRIPTION_COLUMN: usize = 1;

/// Horizontal alignment of a cell's text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Align {
    #[default]
    Left,
    Center,
    Right,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    pub label: String,
    /// Width in millimetres.
    pub width: f32,
    /// Default alignment for body cells.
    pub align: Align,
}

/// Ordered columns of the table. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnLayout {
    columns: Vec<Column>,
}

impl ColumnLayout {
    /// Select the layout for a document type.
    ///
    /// Bills of quantities (priced or not) share the 9-column layout; the
    /// schedule of rates uses 3 columns.
    pub fn for_document(doc_type: DocumentType) -> Self {
        const C: Align = Align::Center;
        const L: Align = Align::Left;
        let defs: &[(&str, f32, Align)] = match doc_type {
            DocumentType::PricedBoQ | DocumentType::UnpricedBoQ => &[
                ("N°", 15.0, C),
                ("Description", 55.0, L),
                ("n°", 15.0, L),
                ("a", 15.0, C),
                ("b", 15.0, C),
                ("c/w", 15.0, C),
                ("Quantity", 20.0, C),
                ("Price", 20.0, C),
                ("Total", 20.0, C),
            ],
            DocumentType::RateSchedule => &[("N°", 15.0, C), ("Description", 155.0, L), ("Price", 20.0, C)],
        };
        Self {
            columns: defs
                .iter()
                .map(|&(label, width, align)| Column {
                    label: label.to_string(),
                    width,
                    align,
                })
                .collect(),
        }
    }

    /// Build an arbitrary layout; used by tests that need odd widths.
    pub fn from_columns(columns: Vec<Column>) -> Result<Self> {
        if columns.is_empty() {
            return Err(ExportError::LayoutInvariant("a table needs at least one column".into()));
        }
        if let Some(c) = columns.iter().find(|c| !(c.width > 0.0)) {
            return Err(ExportError::LayoutInvariant(format!(
                "column {:?} has non-positive width {}",
                c.label, c.width
            )));
        }
        Ok(Self { columns })
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn total_width(&self) -> f32 {
        self.columns.iter().map(|c| c.width).sum()
    }

    /// Left edge of column `index`, relative to the table origin.
    pub fn offset(&self, index: usize) -> f32 {
        self.columns[..index.min(self.columns.len())]
            .iter()
            .map(|c| c.width)
            .sum()
    }

    /// Characters per wrapped line for column `index`.
    ///
    /// The description column gets a looser budget so prose does not wrap
    /// too eagerly.
    pub fn char_budget(&self, index: usize) -> usize {
        let factor = if index == DESCRIPTION_COLUMN { 0.7 } else { 0.4 };
        ((self.columns[index].width * factor).floor() as usize).max(1)
    }

    /// A row of empty cells of the right width.
    pub fn blank_cells(&self) -> Vec<String> {
        vec![String::new(); self.columns.len()]
    }
}
