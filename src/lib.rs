//! # boq-forge – paginated cost schedule tables → PDF
//!
//! Turns a hierarchical cost schedule (bill of quantities or schedule of
//! rates) into a paginated table document. The pipeline stages are:
//!
//! 1. **Flatten** – cost tree → ordered logical rows and rules ([`flatten`])
//! 2. **Wrap** – split each cell into lines for its column ([`wrap`])
//! 3. **Paginate** – draw rows onto pages, breaking and repeating the
//!    column header ([`pagination`], [`canvas`])
//! 4. **Render** – emit PDF bytes via printpdf ([`render`])
//!
//! [`markup::TypstDriver`] feeds the same flattened rows to a Typst source
//! document instead.

pub mod canvas;
pub mod columns;
pub mod error;
pub mod flatten;
pub mod fonts;
pub mod layout_config;
pub mod markup;
pub mod pagination;
pub mod pipeline;
pub mod render;
pub mod samples;
pub mod schedule;
pub mod wrap;

// Re-exports for convenience
pub use error::{ExportError, Result};
pub use markup::TypstDriver;
pub use pagination::PageGeometry;
pub use pipeline::{export_to_path, generate_pdf, DocumentDriver, ExportOptions, PdfDriver, RenderedDocument};
pub use schedule::{CostDocument, CostNode, CostSchedule, CostSource, DocumentType, ScheduleChoice};
