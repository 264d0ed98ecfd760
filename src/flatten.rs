//! Tree flattening – walks the cost hierarchy depth-first and yields the
//! table entries that describe it, plus the summary-page aggregation.
//!
//! The walk is a lazy iterator with an explicit stack; it never touches a
//! canvas, so the same sequence feeds both document drivers.

use std::collections::VecDeque;

use crate::columns::{ColumnLayout, DESCRIPTION_COLUMN};
use crate::pipeline::ExportOptions;
use crate::schedule::{CostNode, CostSource, DocumentType, Resolved};
use crate::wrap::{LogicalRow, RowStyle};

/// Cell text printed where a rate or amount is not shown.
pub const PLACEHOLDER: &str = "-";

/// One step of the table body.
#[derive(Debug, Clone, PartialEq)]
pub enum TableEntry {
    Row(LogicalRow),
    /// Thin horizontal rule from `from_column` to the table's right edge.
    Rule { from_column: usize },
}

impl TableEntry {
    pub fn as_row(&self) -> Option<&LogicalRow> {
        match self {
            TableEntry::Row(row) => Some(row),
            TableEntry::Rule { .. } => None,
        }
    }
}

/// Two-decimal money/quantity formatting.
pub fn format_amount(value: f64) -> String {
    format!("{value:.2}")
}

struct Frame<'a> {
    nodes: &'a [CostNode],
    next: usize,
    /// Index path of the parent; `None` for roots.
    prefix: Option<String>,
}

/// Lazy depth-first walk over a schedule. See [`flatten`].
pub struct Flatten<'a, S: CostSource> {
    source: &'a S,
    doc_type: DocumentType,
    options: &'a ExportOptions,
    width: usize,
    stack: Vec<Frame<'a>>,
    pending: VecDeque<TableEntry>,
    degraded: usize,
    /// Set when a value for the next row fell back to a placeholder.
    row_degraded: bool,
}

/// Flatten `source` into table entries for a `doc_type` document.
///
/// Holds no state outside the returned iterator, so calling it again on the
/// same schedule yields the same sequence.
pub fn flatten<'a, S: CostSource>(
    source: &'a S,
    doc_type: DocumentType,
    options: &'a ExportOptions,
) -> Flatten<'a, S> {
    Flatten {
        source,
        doc_type,
        options,
        width: ColumnLayout::for_document(doc_type).len(),
        stack: vec![Frame {
            nodes: source.root_nodes(),
            next: 0,
            prefix: None,
        }],
        pending: VecDeque::new(),
        degraded: 0,
        row_degraded: false,
    }
}

impl<'a, S: CostSource> Flatten<'a, S> {
    /// Rows so far that printed a placeholder because of bad source data.
    ///
    /// A row counts once however many of its values fell back.
    pub fn degraded_rows(&self) -> usize {
        self.degraded
    }

    /// Queue a row; it takes any pending degraded mark.
    fn push_row(&mut self, cells: &[(usize, String)], style: RowStyle) {
        let mut row = vec![String::new(); self.width];
        for (i, text) in cells {
            if let Some(cell) = row.get_mut(*i) {
                cell.clone_from(text);
            }
        }
        if std::mem::take(&mut self.row_degraded) {
            self.degraded += 1;
        }
        self.pending.push_back(TableEntry::Row(LogicalRow::new(row, style)));
    }

    /// Unwrap a value destined for the next queued row.
    fn note_degraded<T>(&mut self, resolved: Resolved<T>) -> T {
        if let Some(reason) = resolved.reason() {
            log::warn!("printing placeholder: {reason}");
            self.row_degraded = true;
        }
        resolved.into_inner()
    }

    /// Unit rate to print, if this document shows rates at all.
    fn printable_rate(&mut self, node: &CostNode) -> Option<f64> {
        if !self.options.print_rates || self.doc_type == DocumentType::UnpricedBoQ {
            return None;
        }
        let rate = node.unit_rate();
        self.note_degraded(rate)
    }

    fn expand(&mut self, node: &'a CostNode, index: &str, is_root: bool) {
        let last = self.width - 1;

        let mut heading = vec![(0, index.to_string()), (DESCRIPTION_COLUMN, node.name.clone())];
        if self.doc_type == DocumentType::RateSchedule && !is_root {
            let rate = self.printable_rate(node);
            heading.push((last, rate.map(format_amount).unwrap_or_default()));
        }
        let style = if is_root { RowStyle::Category } else { RowStyle::Item };
        self.push_row(&heading, style);

        if let Some(id) = node.identification.as_deref().filter(|s| !s.is_empty()) {
            self.push_row(&[(DESCRIPTION_COLUMN, id.to_string())], RowStyle::Note);
        }

        if self.options.print_description {
            if let Some(text) = node.description.as_deref().filter(|s| !s.trim().is_empty()) {
                self.push_row(&[(DESCRIPTION_COLUMN, text.to_string())], RowStyle::Plain);
            }
        }

        if self.doc_type.is_bill_of_quantities() {
            self.expand_quantities(node);
        }

        self.push_row(&[], RowStyle::Plain);
    }

    fn expand_quantities(&mut self, node: &'a CostNode) {
        let mut unit = String::new();
        let mut unresolved_unit = None;
        for quantity in &node.quantities {
            let resolved = self.source.quantity_unit(quantity);
            let resolved = if self.options.print_each_quantity {
                self.note_degraded(resolved)
            } else {
                // Only matters if no other quantity supplies the Sum label.
                if resolved.is_degraded() && unresolved_unit.is_none() {
                    unresolved_unit = Some(resolved.clone());
                }
                resolved.into_inner()
            };
            if unit.is_empty() {
                unit = resolved;
            }

            if self.options.print_each_quantity {
                let factors = quantity.factors();
                let factors = self.note_degraded(factors);
                let mut cells = vec![
                    (DESCRIPTION_COLUMN, format!("- {}", quantity.name)),
                    (6, format_amount(quantity.value)),
                ];
                if let Some([n, a, b, c]) = factors {
                    cells.extend([(2, n), (3, a), (4, b), (5, c)]);
                }
                self.push_row(&cells, RowStyle::Plain);
            }
        }
        if let Some(missing) = unresolved_unit.filter(|_| unit.is_empty()) {
            self.note_degraded(missing);
        }

        let total_quantity = self.source.total_quantity(node);
        let (rate, amount) = match self.printable_rate(node) {
            Some(rate) => (format_amount(rate), format_amount(rate * total_quantity)),
            None => (PLACEHOLDER.to_string(), PLACEHOLDER.to_string()),
        };
        let label = format!("Sum {unit}").trim_end().to_string();

        self.pending.push_back(TableEntry::Rule {
            from_column: self.width.saturating_sub(3),
        });
        self.push_row(
            &[
                (DESCRIPTION_COLUMN, label),
                (6, format_amount(total_quantity)),
                (7, rate),
                (8, amount),
            ],
            RowStyle::Sum,
        );
    }
}

impl<'a, S: CostSource> Iterator for Flatten<'a, S> {
    type Item = TableEntry;

    fn next(&mut self) -> Option<TableEntry> {
        loop {
            if let Some(entry) = self.pending.pop_front() {
                return Some(entry);
            }

            let frame = self.stack.last_mut()?;
            let nodes = frame.nodes;
            let Some(node) = nodes.get(frame.next) else {
                self.stack.pop();
                continue;
            };
            frame.next += 1;
            let ordinal = frame.next;
            let is_root = frame.prefix.is_none();
            let index = match &frame.prefix {
                Some(prefix) => format!("{prefix}.{ordinal}"),
                None => ordinal.to_string(),
            };

            self.expand(node, &index, is_root);
            self.stack.push(Frame {
                nodes: self.source.children(node),
                next: 0,
                prefix: Some(index),
            });
        }
    }
}

// ---------------------------------------------------------------------------
// Summary
// ---------------------------------------------------------------------------

/// Cost of a node's whole subtree: its own `rate × quantity` plus children.
///
/// Nodes without a usable rate contribute nothing themselves.
pub fn subtree_cost<S: CostSource>(source: &S, node: &CostNode) -> f64 {
    let own = match node.unit_rate().into_inner() {
        Some(rate) => rate * source.total_quantity(node),
        None => 0.0,
    };
    own + source
        .children(node)
        .iter()
        .map(|child| subtree_cost(source, child))
        .sum::<f64>()
}

/// Per-root totals for one summary pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunningTotal {
    roots: Vec<f64>,
}

impl RunningTotal {
    pub fn push_root(&mut self, total: f64) {
        self.roots.push(total);
    }

    pub fn root_totals(&self) -> &[f64] {
        &self.roots
    }

    pub fn grand_total(&self) -> f64 {
        self.roots.iter().sum()
    }
}

/// Rows of the summary page: one per root category, then the grand total.
///
/// Rate schedules have no amounts to total, so they get no summary.
pub fn summary_rows<S: CostSource>(
    source: &S,
    doc_type: DocumentType,
    options: &ExportOptions,
) -> Vec<LogicalRow> {
    if !doc_type.is_bill_of_quantities() {
        return Vec::new();
    }
    let width = ColumnLayout::for_document(doc_type).len();
    let last = width - 1;
    let priced = options.print_rates && doc_type == DocumentType::PricedBoQ;
    let amount = |value: f64| {
        if priced {
            format_amount(value)
        } else {
            PLACEHOLDER.to_string()
        }
    };
    let make = |index: String, name: String, total: String, style: RowStyle| {
        let mut cells = vec![String::new(); width];
        cells[0] = index;
        cells[DESCRIPTION_COLUMN] = name;
        cells[last] = total;
        LogicalRow::new(cells, style)
    };

    let mut totals = RunningTotal::default();
    let mut rows = Vec::new();
    for (i, root) in source.root_nodes().iter().enumerate() {
        let total = subtree_cost(source, root);
        totals.push_root(total);
        rows.push(make((i + 1).to_string(), root.name.clone(), amount(total), RowStyle::Summary));
    }
    rows.push(make(
        String::new(),
        "Total".to_string(),
        amount(totals.grand_total()),
        RowStyle::GrandTotal,
    ));
    rows
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schedule::{CostSchedule, CostValue, Quantity, QuantityKind};

    fn quantity(name: &str, value: f64) -> Quantity {
        Quantity {
            name: name.into(),
            value,
            unit: None,
            kind: Some(QuantityKind::Area),
            formula: None,
        }
    }

    fn priced(name: &str, quantities: Vec<Quantity>, rate: f64) -> CostNode {
        CostNode {
            quantities,
            cost_values: vec![CostValue {
                name: None,
                applied_value: Some(rate),
            }],
            ..CostNode::new(name)
        }
    }

    fn schedule(roots: Vec<CostNode>) -> CostSchedule {
        CostSchedule {
            roots,
            ..CostSchedule::default()
        }
    }

    fn rows(schedule: &CostSchedule, doc_type: DocumentType, options: &ExportOptions) -> Vec<LogicalRow> {
        flatten(schedule, doc_type, options)
            .filter_map(|e| e.as_row().cloned())
            .collect()
    }

    fn sum_row(rows: &[LogicalRow]) -> &LogicalRow {
        rows.iter().find(|r| r.style == RowStyle::Sum).expect("sum row")
    }

    #[test]
    fn index_paths_are_depth_first() {
        let root = |name: &str| CostNode {
            children: vec![CostNode::new(format!("{name}a")), CostNode::new(format!("{name}b"))],
            ..CostNode::new(name)
        };
        let s = schedule(vec![root("A"), root("B")]);
        let paths: Vec<String> = rows(&s, DocumentType::PricedBoQ, &ExportOptions::default())
            .into_iter()
            .filter(|r| r.style.is_heading())
            .map(|r| r.cells[0].clone())
            .collect();
        assert_eq!(paths, ["1", "1.1", "1.2", "2", "2.1", "2.2"]);
    }

    #[test]
    fn subtotal_with_rates() {
        let item = priced("Plaster", vec![quantity("wall", 5.0), quantity("ceiling", 3.0)], 10.0);
        let s = schedule(vec![CostNode {
            children: vec![item],
            ..CostNode::new("Finishes")
        }]);
        let rows = rows(&s, DocumentType::PricedBoQ, &ExportOptions::default());
        let children_sum = rows.iter().filter(|r| r.style == RowStyle::Sum).nth(1).unwrap();
        assert_eq!(children_sum.cells[1], "Sum m2");
        assert_eq!(children_sum.cells[6], "8.00");
        assert_eq!(children_sum.cells[7], "10.00");
        assert_eq!(children_sum.cells[8], "80.00");
    }

    #[test]
    fn subtotal_without_rates_prints_dashes() {
        let item = priced("Plaster", vec![quantity("wall", 5.0), quantity("ceiling", 3.0)], 10.0);
        let s = schedule(vec![item]);
        let no_rates = ExportOptions {
            print_rates: false,
            ..ExportOptions::default()
        };
        for (doc_type, options) in [
            (DocumentType::PricedBoQ, &no_rates),
            (DocumentType::UnpricedBoQ, &ExportOptions::default()),
        ] {
            let rows = rows(&s, doc_type, options);
            let sum = sum_row(&rows);
            assert_eq!(&sum.cells[6..], ["8.00", PLACEHOLDER, PLACEHOLDER]);
        }
    }

    #[test]
    fn node_entry_order() {
        let mut item = priced("Screed", vec![quantity("floor", 12.5)], 20.0);
        item.identification = Some("B.12.004".into());
        item.description = Some("Cement screed, 5 cm".into());
        item.quantities[0].formula = Some("1 * 5 * 2.5 * 1".into());
        let s = schedule(vec![CostNode {
            children: vec![item],
            ..CostNode::new("Floors")
        }]);
        let entries: Vec<TableEntry> = flatten(&s, DocumentType::PricedBoQ, &ExportOptions::default()).collect();
        // Root: heading, rule, sum, spacer. Child: heading, note, description,
        // quantity, rule, sum, spacer.
        assert_eq!(entries.len(), 11);
        let child: Vec<&TableEntry> = entries[4..].iter().collect();
        let row = |i: usize| child[i].as_row().unwrap();
        assert_eq!(row(0).style, RowStyle::Item);
        assert_eq!(row(0).cells[..2], ["1.1", "Screed"]);
        assert_eq!(row(1).style, RowStyle::Note);
        assert_eq!(row(1).cells[1], "B.12.004");
        assert_eq!(row(2).cells[1], "Cement screed, 5 cm");
        assert_eq!(row(3).cells[1..7], ["- floor", "1", "5", "2.5", "1", "12.50"]);
        assert_eq!(*child[4], TableEntry::Rule { from_column: 6 });
        assert_eq!(row(5).cells[8], "250.00");
        assert!(row(6).cells.iter().all(String::is_empty));
    }

    #[test]
    fn options_hide_descriptions_and_quantities() {
        let mut item = priced("Screed", vec![quantity("floor", 12.5)], 20.0);
        item.description = Some("Cement screed".into());
        let s = schedule(vec![item]);
        let options = ExportOptions {
            print_description: false,
            print_each_quantity: false,
            ..ExportOptions::default()
        };
        let rows = rows(&s, DocumentType::PricedBoQ, &options);
        assert!(rows.iter().all(|r| r.cells[1] != "Cement screed" && r.cells[1] != "- floor"));
        assert_eq!(sum_row(&rows).cells[6], "12.50");
    }

    #[test]
    fn malformed_formula_degrades_to_blank_factors() {
        let mut item = priced("Screed", vec![quantity("floor", 12.5)], 20.0);
        item.quantities[0].formula = Some("5 * 2.5".into());
        item.quantities[0].kind = None;
        let s = schedule(vec![item]);
        let options = ExportOptions::default();
        let mut walk = flatten(&s, DocumentType::PricedBoQ, &options);
        let rows: Vec<LogicalRow> = walk.by_ref().filter_map(|e| e.as_row().cloned()).collect();
        let q = rows.iter().find(|r| r.cells[1] == "- floor").unwrap();
        assert!(q.cells[2..6].iter().all(String::is_empty));
        assert_eq!(q.cells[6], "12.50");
        assert_eq!(sum_row(&rows).cells[1], "Sum");
        // Missing unit and bad formula land on the same quantity row.
        assert_eq!(walk.degraded_rows(), 1);
    }

    #[test]
    fn hidden_quantities_count_only_an_unlabelled_sum() {
        let mut no_unit = quantity("a", 1.0);
        no_unit.kind = None;
        let options = ExportOptions {
            print_each_quantity: false,
            ..ExportOptions::default()
        };

        // Another quantity supplies the unit: nothing printed is degraded.
        let labelled = schedule(vec![priced("Kerb", vec![no_unit.clone(), quantity("b", 2.0)], 1.0)]);
        let mut walk = flatten(&labelled, DocumentType::PricedBoQ, &options);
        let rows: Vec<LogicalRow> = walk.by_ref().filter_map(|e| e.as_row().cloned()).collect();
        assert_eq!(sum_row(&rows).cells[1], "Sum m2");
        assert_eq!(walk.degraded_rows(), 0);

        // No unit at all: the Sum row prints a bare label.
        let bare = schedule(vec![priced("Kerb", vec![no_unit], 1.0)]);
        let mut walk = flatten(&bare, DocumentType::PricedBoQ, &options);
        let rows: Vec<LogicalRow> = walk.by_ref().filter_map(|e| e.as_row().cloned()).collect();
        assert_eq!(sum_row(&rows).cells[1], "Sum");
        assert_eq!(walk.degraded_rows(), 1);
    }

    #[test]
    fn first_non_empty_unit_labels_the_sum() {
        let mut no_unit = quantity("a", 1.0);
        no_unit.kind = None;
        let mut metres = quantity("b", 2.0);
        metres.kind = Some(QuantityKind::Length);
        let s = schedule(vec![priced("Kerb", vec![no_unit, metres, quantity("c", 3.0)], 1.0)]);
        let rows = rows(&s, DocumentType::PricedBoQ, &ExportOptions::default());
        assert_eq!(sum_row(&rows).cells[1], "Sum m");
    }

    #[test]
    fn rate_schedule_rows_carry_the_rate() {
        let s = schedule(vec![CostNode {
            children: vec![priced("Excavation", vec![], 14.5)],
            ..CostNode::new("Earthworks")
        }]);
        let rows = rows(&s, DocumentType::RateSchedule, &ExportOptions::default());
        assert!(rows.iter().all(|r| r.cells.len() == 3));
        assert!(rows.iter().all(|r| r.style != RowStyle::Sum));
        let item = rows.iter().find(|r| r.style == RowStyle::Item).unwrap();
        assert_eq!(item.cells, ["1.1", "Excavation", "14.50"]);
    }

    #[test]
    fn flattening_is_repeatable() {
        let s = schedule(vec![
            CostNode {
                children: vec![priced("x", vec![quantity("q", 2.0)], 3.0)],
                ..CostNode::new("A")
            },
            CostNode::new("B"),
        ]);
        let options = ExportOptions::default();
        let first: Vec<_> = flatten(&s, DocumentType::PricedBoQ, &options).collect();
        let second: Vec<_> = flatten(&s, DocumentType::PricedBoQ, &options).collect();
        assert_eq!(first, second);
        assert!(!first.is_empty());
    }

    #[test]
    fn grand_total_sums_root_totals() {
        let s = schedule(vec![
            CostNode {
                children: vec![priced("a", vec![quantity("q", 10.0)], 10.0)],
                ..CostNode::new("Structure")
            },
            CostNode {
                children: vec![CostNode {
                    children: vec![priced("b", vec![quantity("q", 1.0)], 250.5)],
                    ..CostNode::new("Doors")
                }],
                ..CostNode::new("Finishes")
            },
        ]);
        let rows = summary_rows(&s, DocumentType::PricedBoQ, &ExportOptions::default());
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].cells[8], "100.00");
        assert_eq!(rows[1].cells[..2], ["2", "Finishes"]);
        assert_eq!(rows[1].cells[8], "250.50");
        assert_eq!(rows[2].style, RowStyle::GrandTotal);
        assert_eq!(rows[2].cells[8], "350.50");
    }

    #[test]
    fn running_total() {
        let mut totals = RunningTotal::default();
        totals.push_root(100.0);
        totals.push_root(250.5);
        assert_eq!(totals.root_totals(), [100.0, 250.5]);
        assert_eq!(format_amount(totals.grand_total()), "350.50");
    }

    #[test]
    fn no_summary_for_rate_schedules() {
        let s = schedule(vec![CostNode::new("A")]);
        assert!(summary_rows(&s, DocumentType::RateSchedule, &ExportOptions::default()).is_empty());
    }
}
