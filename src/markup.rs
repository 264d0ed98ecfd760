//! Typst markup driver – the same table as [`crate::pipeline::PdfDriver`],
//! written as Typst source so the Typst compiler does the pagination.
//!
//! Header repetition, page numbers and footers are expressed with Typst's
//! own `table.header` and `counter(page)`; this driver only serialises the
//! flattened entries.

use std::fmt::Write as _;

use crate::columns::{Align, ColumnLayout};
use crate::error::Result;
use crate::flatten::{flatten, summary_rows, TableEntry};
use crate::pipeline::{DocumentDriver, ExportOptions, RenderedDocument};
use crate::schedule::{CostSource, DocumentType, ScheduleMetadata};
use crate::wrap::{LogicalRow, RowStyle};

/// Emits a `.typ` document.
#[derive(Debug, Clone, Copy, Default)]
pub struct TypstDriver;

impl DocumentDriver for TypstDriver {
    fn extension(&self) -> &'static str {
        "typ"
    }

    fn render<S: CostSource>(&self, source: &S, options: &ExportOptions) -> Result<RenderedDocument> {
        let doc_type = options.resolve_document_type(source)?;
        // Same structural checks as the PDF driver, before any output.
        let table = crate::pagination::TableLayout::for_document(doc_type, options.geometry.clone())?;
        let columns = table.columns();
        let meta = source.metadata();
        let date = options.date_label();

        let mut out = String::new();
        write_page_setup(&mut out, meta, options, &date);

        if options.print_cover {
            write_cover(&mut out, meta, doc_type, &date);
        }

        out.push_str("#table(\n");
        write_table_head(&mut out, columns);
        let mut entries = flatten(source, doc_type, options);
        for entry in entries.by_ref() {
            match entry {
                TableEntry::Row(row) => write_row(&mut out, &row, columns),
                TableEntry::Rule { from_column } => {
                    let _ = writeln!(out, "  table.hline(start: {from_column}, stroke: 0.2pt),");
                }
            }
        }
        out.push_str("  table.hline(stroke: 0.2pt),\n)\n");

        if options.print_summary {
            let summary = summary_rows(source, doc_type, options);
            if !summary.is_empty() {
                out.push_str("\n#pagebreak()\n#table(\n");
                write_table_head(&mut out, columns);
                write_row(
                    &mut out,
                    &LogicalRow::new(columns.blank_cells(), RowStyle::Plain),
                    columns,
                );
                for row in &summary {
                    write_row(&mut out, row, columns);
                }
                out.push_str("  table.hline(stroke: 0.2pt),\n)\n");
            }
        }

        log::info!("wrote {} bytes of Typst markup ({doc_type})", out.len());
        Ok(RenderedDocument {
            bytes: out.into_bytes(),
            pages: None,
            degraded_rows: entries.degraded_rows(),
        })
    }
}

/// Escape text for Typst markup mode.
///
/// Whitespace runs collapse to single spaces, so the text is one line and
/// only its start can be read as a list marker.
pub fn escape(text: &str) -> String {
    let text = text.split_whitespace().collect::<Vec<_>>().join(" ");
    let mut escaped = String::with_capacity(text.len());
    let digits = text.bytes().take_while(u8::is_ascii_digit).count();
    // `2. Second coat` would open a numbered list.
    let enum_marker = digits > 0 && matches!(text[digits..].chars().next(), Some('.')) && {
        let after = &text[digits + 1..];
        after.is_empty() || after.starts_with(' ')
    };
    for (i, c) in text.chars().enumerate() {
        if enum_marker && i == digits {
            escaped.push('\\');
        }
        if matches!(
            c,
            '\\' | '#' | '[' | ']' | '*' | '_' | '`' | '$' | '@' | '<' | '>' | '~' | '/' | '=' | '-' | '+' | '"' | '\''
        ) {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

fn write_page_setup(out: &mut String, meta: &ScheduleMetadata, options: &ExportOptions, date: &str) {
    let g = &options.geometry;
    let footer_left = if options.print_cover {
        escape(&meta.project_name)
    } else {
        escape(date)
    };
    let _ = writeln!(
        out,
        "#set page(\n  width: {}mm,\n  height: {}mm,\n  margin: (left: {}mm, right: {}mm, top: {}mm, bottom: {}mm),",
        g.page_width, g.page_height, g.left_margin, g.right_margin, g.content_top, g.bottom_margin
    );
    let _ = writeln!(
        out,
        "  header: [#set text(size: 10pt); {} #h(1fr) {}],",
        escape(&meta.project_name),
        escape(&meta.schedule_name)
    );
    let _ = writeln!(
        out,
        "  footer: context [#set text(size: 8pt); {footer_left} #h(1fr) page #counter(page).display() / #counter(page).final().first()],\n)"
    );
    out.push_str("#set text(size: 8pt)\n");
    let _ = writeln!(
        out,
        "#set table(stroke: (x: 0.2pt, y: none), inset: (x: 1mm, y: 1mm))\n"
    );
}

fn write_cover(out: &mut String, meta: &ScheduleMetadata, doc_type: DocumentType, date: &str) {
    let field = |value: Option<&str>| {
        value
            .filter(|v| !v.is_empty())
            .map(escape)
            .unwrap_or_else(|| "#box(width: 5cm, repeat[\\_])".to_string())
    };
    out.push_str("#page(header: none, footer: none)[\n");
    out.push_str("  #rect(width: 100%, height: 100%, inset: 10mm)[\n");
    let _ = writeln!(out, "    #align(center)[#text(size: 20pt, weight: \"bold\")[{}]]", escape(&meta.project_name));
    let _ = writeln!(out, "    #align(center)[#text(size: 14pt, weight: \"bold\")[{}]]", escape(&meta.schedule_name));
    let _ = writeln!(out, "    #align(center)[#text(size: 11pt)[{}]]", escape(&doc_type.to_string()));
    if let Some(description) = meta.description.as_deref() {
        let _ = writeln!(out, "    #v(1cm)\n    #text(size: 10pt)[{}]", escape(description));
    }
    out.push_str("    #v(1fr)\n    #text(size: 10pt)[\n");
    for (label, value) in [
        ("Client", field(meta.client.as_deref())),
        ("Location", field(meta.location.as_deref())),
        ("Date", field(Some(date))),
        ("Author", field(meta.author.as_deref())),
    ] {
        let _ = writeln!(out, "      *{label}:* {value} \\");
    }
    out.push_str("    ]\n  ]\n]\n#counter(page).update(1)\n\n");
}

fn write_table_head(out: &mut String, columns: &ColumnLayout) {
    let widths: Vec<String> = columns.columns().iter().map(|c| format!("{}mm", c.width)).collect();
    let aligns: Vec<&str> = columns.columns().iter().map(|c| typst_align(c.align)).collect();
    let _ = writeln!(out, "  columns: ({},),", widths.join(", "));
    let _ = writeln!(out, "  align: ({},),", aligns.join(", "));
    out.push_str("  table.header(\n");
    for column in columns.columns() {
        let _ = writeln!(
            out,
            "    table.cell(fill: luma(220), stroke: 0.2pt, align: center)[*{}*],",
            escape(&column.label)
        );
    }
    out.push_str("  ),\n");
}

fn write_row(out: &mut String, row: &LogicalRow, columns: &ColumnLayout) {
    out.push_str(" ");
    for (i, column) in columns.columns().iter().enumerate() {
        let text = escape(row.cell(i));
        let content = if text.is_empty() {
            String::new()
        } else {
            match row.style {
                RowStyle::Category | RowStyle::GrandTotal => {
                    format!("#text(size: 10pt, weight: \"bold\")[{text}]")
                }
                RowStyle::Item => format!("#strong[{text}]"),
                RowStyle::Note => format!("#emph[{text}]"),
                RowStyle::Summary => format!("#text(size: 10pt)[{text}]"),
                RowStyle::Plain | RowStyle::Sum => text,
            }
        };
        let align = row.style.align(column.align);
        if align == column.align {
            let _ = write!(out, " [{content}],");
        } else {
            let _ = write!(out, " table.cell(align: {})[{content}],", typst_align(align));
        }
    }
    out.push('\n');
}

fn typst_align(align: Align) -> &'static str {
    match align {
        Align::Left => "left",
        Align::Center => "center",
        Align::Right => "right",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ExportError;
    use crate::schedule::{CostNode, CostSchedule, CostValue, Quantity};

    fn schedule() -> CostSchedule {
        let item = CostNode {
            identification: Some("A#1".into()),
            quantities: vec![Quantity {
                name: "floor".into(),
                value: 8.0,
                unit: Some("m2".into()),
                kind: None,
                formula: None,
            }],
            cost_values: vec![CostValue {
                name: None,
                applied_value: Some(10.0),
            }],
            ..CostNode::new("Tiles [ceramic]")
        };
        CostSchedule {
            metadata: ScheduleMetadata {
                project_name: "Depot".into(),
                schedule_name: "Estimate".into(),
                predefined_type: "PRICEDBILLOFQUANTITIES".into(),
                ..ScheduleMetadata::default()
            },
            roots: vec![CostNode {
                children: vec![item],
                ..CostNode::new("Floors")
            }],
        }
    }

    fn render(options: &ExportOptions) -> String {
        let rendered = TypstDriver.render(&schedule(), options).unwrap();
        assert_eq!(rendered.pages, None);
        String::from_utf8(rendered.bytes).unwrap()
    }

    #[test]
    fn escapes_markup_characters() {
        assert_eq!(escape("a*b_c"), "a\\*b\\_c");
        assert_eq!(escape("- floor"), "\\- floor");
        assert_eq!(escape("#1 [x]"), "\\#1 \\[x\\]");
        assert_eq!(escape("1.2.3"), "1.2.3");
        assert_eq!(escape("2. Second coat"), "2\\. Second coat");
        assert_eq!(escape("12."), "12\\.");
        assert_eq!(escape("2.5 m high"), "2.5 m high");
        assert_eq!(escape("first\n3. third"), "first 3. third");
        assert_eq!(escape("a//b"), "a\\/\\/b");
    }

    #[test]
    fn table_mirrors_flattened_rows() {
        let source = render(&ExportOptions {
            date: Some("19/10/2026".into()),
            ..ExportOptions::default()
        });
        assert!(source.contains("columns: (15mm, 55mm, 15mm, 15mm, 15mm, 15mm, 20mm, 20mm, 20mm,),"));
        assert!(source.contains("#strong[1.1]"));
        assert!(source.contains("#strong[Tiles \\[ceramic\\]]"));
        assert!(source.contains("#emph[A\\#1]"));
        assert!(source.contains("table.hline(start: 6, stroke: 0.2pt),"));
        assert!(source.contains("table.cell(align: right)[80.00]"));
        assert!(source.contains("19\\/10\\/2026 #h(1fr) page"));
        // Summary table follows a page break.
        assert!(source.contains("#pagebreak()"));
        assert!(source.contains("#text(size: 10pt, weight: \"bold\")[80.00]"));
        assert!(!source.contains("#page(header: none"));
    }

    #[test]
    fn cover_resets_page_counter() {
        let source = render(&ExportOptions {
            print_cover: true,
            print_summary: false,
            ..ExportOptions::default()
        });
        assert!(source.contains("#page(header: none, footer: none)"));
        assert!(source.contains("#counter(page).update(1)"));
        assert!(source.contains("Depot #h(1fr) page"));
        assert!(!source.contains("#pagebreak()"));
    }

    #[test]
    fn unsupported_type_is_reported() {
        let mut s = schedule();
        s.metadata.predefined_type = "BUDGET".into();
        let err = TypstDriver.render(&s, &ExportOptions::default()).unwrap_err();
        assert!(matches!(err, ExportError::UnsupportedDocumentType(_)));
    }
}
