//! Pipeline – ties together flattening, wrapping, pagination and rendering
//! into a single call per document.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::canvas::{Canvas, LayoutCanvas, RunningHeader};
use crate::columns::Align;
use crate::error::Result;
use crate::flatten::{flatten, summary_rows, TableEntry};
use crate::fonts::TextStyle;
use crate::layout_config::DocumentLayout;
use crate::pagination::{PageGeometry, RowEmitter, TableLayout};
use crate::render::render_pdf;
use crate::schedule::{CostDocument, CostSchedule, CostSource, DocumentType, ScheduleChoice, ScheduleMetadata};
use crate::wrap::{wrap, wrap_cell, LogicalRow, RowStyle};

/// What to print. Every field has a default, so a partial JSON object is a
/// valid options file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportOptions {
    pub print_cover: bool,
    pub print_description: bool,
    pub print_each_quantity: bool,
    pub print_rates: bool,
    pub print_summary: bool,
    /// Overrides the schedule's own predefined type.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub document_type: Option<DocumentType>,
    /// Date printed on the cover and footers (default: today, `dd/mm/yyyy`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    /// Schedule to export from a multi-schedule document (default: first).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schedule: Option<ScheduleChoice>,
    pub geometry: PageGeometry,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            print_cover: false,
            print_description: true,
            print_each_quantity: true,
            print_rates: true,
            print_summary: true,
            document_type: None,
            date: None,
            schedule: None,
            geometry: PageGeometry::default(),
        }
    }
}

impl ExportOptions {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// The override if set, otherwise the schedule's predefined type.
    pub fn resolve_document_type<S: CostSource>(&self, source: &S) -> Result<DocumentType> {
        match self.document_type {
            Some(doc_type) => Ok(doc_type),
            None => DocumentType::from_predefined_type(&source.metadata().predefined_type),
        }
    }

    /// The schedule of `document` these options export.
    pub fn select_schedule<'d>(&self, document: &'d CostDocument) -> Result<&'d CostSchedule> {
        document.select(self.schedule.as_ref())
    }

    pub fn date_label(&self) -> String {
        self.date
            .clone()
            .unwrap_or_else(|| chrono::Local::now().format("%d/%m/%Y").to_string())
    }
}

/// Output of one render pass.
#[derive(Debug, Clone)]
pub struct RenderedDocument {
    pub bytes: Vec<u8>,
    /// Physical pages, cover included; `None` when pagination is left to a
    /// downstream compiler.
    pub pages: Option<usize>,
    /// Rows printed with placeholders because of bad source data.
    pub degraded_rows: usize,
}

/// One way of turning a cost schedule into a document.
pub trait DocumentDriver {
    /// Extension of the produced file, without the dot.
    fn extension(&self) -> &'static str;

    fn render<S: CostSource>(&self, source: &S, options: &ExportOptions) -> Result<RenderedDocument>;
}

/// Draws the table directly onto fixed-size pages and emits PDF.
#[derive(Debug, Clone, Copy, Default)]
pub struct PdfDriver;

/// A drawn document before PDF serialisation.
#[derive(Debug, Clone)]
pub struct DrawnDocument {
    pub layout: DocumentLayout,
    pub degraded_rows: usize,
    /// Breaks forced inside the table body (excludes the summary page).
    pub page_breaks: usize,
}

impl PdfDriver {
    /// Draw the whole document into a [`DocumentLayout`].
    ///
    /// Fails before anything is drawn if the document type is unsupported
    /// or the page geometry cannot paginate.
    pub fn draw<S: CostSource>(&self, source: &S, options: &ExportOptions) -> Result<DrawnDocument> {
        let doc_type = options.resolve_document_type(source)?;
        let table = TableLayout::for_document(doc_type, options.geometry.clone())?;
        let meta = source.metadata();
        let date = options.date_label();

        let title = if meta.schedule_name.is_empty() {
            "Cost schedule"
        } else {
            meta.schedule_name.as_str()
        };
        let mut canvas = LayoutCanvas::new(options.geometry.clone(), title);

        if options.print_cover {
            draw_cover(&mut canvas, meta, doc_type, &date);
        }

        canvas.set_running_header(Some(RunningHeader {
            left: meta.project_name.clone(),
            right: meta.schedule_name.clone(),
        }));
        canvas.new_page();

        let mut emitter = RowEmitter::new(&table);
        emitter.draw_header(&mut canvas);

        let mut entries = flatten(source, doc_type, options);
        for entry in entries.by_ref() {
            match entry {
                TableEntry::Row(row) => emitter.emit(&mut canvas, &wrap(&row, table.columns())),
                TableEntry::Rule { from_column } => emitter.draw_rule(&mut canvas, from_column),
            }
        }
        let degraded_rows = entries.degraded_rows();
        emitter.draw_rule(&mut canvas, 0);
        let page_breaks = emitter.page_breaks();

        if options.print_summary {
            let summary = summary_rows(source, doc_type, options);
            if summary.is_empty() {
                log::info!("{doc_type} has no summary page");
            } else {
                canvas.new_page();
                emitter.draw_header(&mut canvas);
                let spacer = LogicalRow::new(table.columns().blank_cells(), RowStyle::Plain);
                emitter.emit(&mut canvas, &wrap(&spacer, table.columns()));
                for row in &summary {
                    emitter.emit(&mut canvas, &wrap(row, table.columns()));
                }
                emitter.draw_rule(&mut canvas, 0);
            }
        }

        let footer_left = if options.print_cover {
            meta.project_name.clone()
        } else {
            date
        };
        canvas.stamp_footers(&footer_left);

        let layout = canvas.finish();
        if degraded_rows > 0 {
            log::warn!("{degraded_rows} row(s) printed with placeholders");
        }
        log::info!(
            "drew {} page(s) for {:?} ({doc_type})",
            layout.pages.len(),
            meta.schedule_name
        );
        Ok(DrawnDocument {
            layout,
            degraded_rows,
            page_breaks,
        })
    }
}

impl DocumentDriver for PdfDriver {
    fn extension(&self) -> &'static str {
        "pdf"
    }

    fn render<S: CostSource>(&self, source: &S, options: &ExportOptions) -> Result<RenderedDocument> {
        let drawn = self.draw(source, options)?;
        let bytes = render_pdf(&drawn.layout)?;
        Ok(RenderedDocument {
            bytes,
            pages: Some(drawn.layout.pages.len()),
            degraded_rows: drawn.degraded_rows,
        })
    }
}

/// Title page: project and schedule names, descriptive fields and a framed
/// content box. Not numbered.
fn draw_cover(canvas: &mut LayoutCanvas, meta: &ScheduleMetadata, doc_type: DocumentType, date: &str) {
    canvas.start_cover_page();
    let geometry = canvas.geometry().clone();
    let x = geometry.left_margin;
    let width = geometry.usable_width();
    let box_top = geometry.top_margin + 30.0;
    let box_height = geometry.page_height - box_top - geometry.bottom_margin - 25.0;

    canvas.draw_cell(x, box_top, width, box_height, None, true);

    let mut y = box_top + 15.0;
    canvas.draw_text(x, y, width, &meta.project_name, Align::Center, TextStyle::bold(20.0));
    y += 14.0;
    canvas.draw_text(x, y, width, &meta.schedule_name, Align::Center, TextStyle::bold(14.0));
    y += 9.0;
    canvas.draw_text(x, y, width, &doc_type.to_string(), Align::Center, TextStyle::regular(11.0));
    y += 16.0;

    if let Some(description) = meta.description.as_deref() {
        for line in wrap_cell(description, 90) {
            canvas.draw_text(x + 10.0, y, width - 20.0, &line, Align::Left, TextStyle::regular(10.0));
            y += 5.0;
        }
    }

    const BLANK: &str = "______________________";
    let fields = [
        ("Client", meta.client.as_deref()),
        ("Location", meta.location.as_deref()),
        ("Date", Some(date)),
        ("Author", meta.author.as_deref()),
    ];
    let mut y = box_top + box_height - 10.0 - 8.0 * fields.len() as f32;
    for (label, value) in fields {
        let value = value.filter(|v| !v.is_empty()).unwrap_or(BLANK);
        canvas.draw_text(x + 10.0, y, 30.0, &format!("{label}:"), Align::Left, TextStyle::bold(10.0));
        canvas.draw_text(x + 40.0, y, width - 50.0, value, Align::Left, TextStyle::regular(10.0));
        y += 8.0;
    }
}

/// Render with `driver` and write the result to `path`.
///
/// Nothing is written unless rendering succeeds; missing parent
/// directories are created.
pub fn export_to_path<D: DocumentDriver, S: CostSource>(
    driver: &D,
    source: &S,
    options: &ExportOptions,
    path: &Path,
) -> Result<RenderedDocument> {
    let rendered = driver.render(source, options)?;
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    fs::write(path, &rendered.bytes)?;
    Ok(rendered)
}

/// Convenience: PDF bytes with the given options.
pub fn generate_pdf<S: CostSource>(source: &S, options: &ExportOptions) -> Result<Vec<u8>> {
    Ok(PdfDriver.render(source, options)?.bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ExportError;
    use crate::layout_config::PageKind;
    use crate::schedule::{CostNode, CostSchedule};

    fn tiny_schedule(predefined_type: &str) -> CostSchedule {
        CostSchedule {
            metadata: ScheduleMetadata {
                project_name: "Depot".into(),
                schedule_name: "Estimate".into(),
                predefined_type: predefined_type.into(),
                ..ScheduleMetadata::default()
            },
            roots: vec![CostNode::new("Site")],
        }
    }

    fn dated() -> ExportOptions {
        ExportOptions {
            date: Some("19/10/2026".into()),
            ..ExportOptions::default()
        }
    }

    #[test]
    fn pipeline_basic() {
        let bytes = generate_pdf(&tiny_schedule("PRICEDBILLOFQUANTITIES"), &dated()).unwrap();
        assert!(!bytes.is_empty());
        assert_eq!(&bytes[0..5], b"%PDF-");
    }

    #[test]
    fn unsupported_type_fails_before_drawing() {
        let err = PdfDriver.draw(&tiny_schedule("TENDER"), &dated()).unwrap_err();
        assert!(matches!(err, ExportError::UnsupportedDocumentType(_)));

        let options = ExportOptions {
            document_type: Some(DocumentType::UnpricedBoQ),
            ..dated()
        };
        assert!(PdfDriver.draw(&tiny_schedule("TENDER"), &options).is_ok());
    }

    #[test]
    fn cover_page_is_unnumbered() {
        let options = ExportOptions {
            print_cover: true,
            ..dated()
        };
        let drawn = PdfDriver.draw(&tiny_schedule("PRICEDBILLOFQUANTITIES"), &options).unwrap();
        let pages = &drawn.layout.pages;
        assert_eq!(pages[0].kind, PageKind::Cover);
        assert!(pages[0].texts().any(|t| t == "19/10/2026"));
        // Content page + summary page.
        assert_eq!(drawn.layout.numbered_pages(), 2);
        let footer: Vec<_> = pages[2].texts().rev().take(2).collect();
        assert_eq!(footer, vec!["page 2/2", "Depot"]);
    }

    #[test]
    fn footer_shows_date_without_cover() {
        let options = ExportOptions {
            print_summary: false,
            ..dated()
        };
        let drawn = PdfDriver.draw(&tiny_schedule("PRICEDBILLOFQUANTITIES"), &options).unwrap();
        assert_eq!(drawn.layout.pages.len(), 1);
        let texts: Vec<_> = drawn.layout.pages[0].texts().collect();
        assert_eq!(&texts[texts.len() - 2..], ["19/10/2026", "page 1/1"]);
        assert_eq!(&texts[..2], ["Depot", "Estimate"]);
    }

    #[test]
    fn options_json_defaults() {
        let options = ExportOptions::from_json(r#"{ "print_cover": true, "document_type": "RateSchedule" }"#).unwrap();
        assert!(options.print_cover);
        assert!(options.print_rates);
        assert_eq!(options.document_type, Some(DocumentType::RateSchedule));
        assert_eq!(options.geometry, PageGeometry::default());
        assert_eq!(options.schedule, None);

        let options = ExportOptions::from_json(r#"{ "schedule": 2 }"#).unwrap();
        assert_eq!(options.schedule, Some(ScheduleChoice::Index(2)));
    }

    #[test]
    fn selected_schedule_drives_the_document_type() {
        let document = CostDocument {
            schedules: vec![tiny_schedule("PRICEDBILLOFQUANTITIES"), tiny_schedule("SCHEDULEOFRATES")],
        };
        let options = ExportOptions {
            schedule: Some(ScheduleChoice::Index(2)),
            ..dated()
        };
        let schedule = options.select_schedule(&document).unwrap();
        assert_eq!(options.resolve_document_type(schedule).unwrap(), DocumentType::RateSchedule);

        let options = ExportOptions {
            schedule: Some(ScheduleChoice::Index(3)),
            ..dated()
        };
        assert!(matches!(
            options.select_schedule(&document),
            Err(ExportError::ScheduleNotFound(_))
        ));
    }
}
