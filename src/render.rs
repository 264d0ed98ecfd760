//! PDF renderer – takes a [`DocumentLayout`] and produces PDF bytes using
//! `printpdf` (v0.8 ops-based API).

use printpdf::*;

use crate::error::{ExportError, Result};
use crate::fonts::{FontFace, PT_PER_MM};
use crate::layout_config::{DocumentLayout, DrawItem};

/// Render a DocumentLayout into PDF bytes.
pub fn render_pdf(layout: &DocumentLayout) -> Result<Vec<u8>> {
    if !(layout.page_width_mm > 0.0 && layout.page_height_mm > 0.0) {
        return Err(ExportError::Render(format!(
            "invalid page size {} × {} mm",
            layout.page_width_mm, layout.page_height_mm
        )));
    }
    let page_w = Mm(layout.page_width_mm);
    let page_h = Mm(layout.page_height_mm);
    let page_height_pt = layout.page_height_mm * PT_PER_MM;

    let mut doc = PdfDocument::new(&layout.title);
    let mut pages = Vec::new();

    for page_layout in &layout.pages {
        let mut ops = Vec::new();
        for item in &page_layout.items {
            render_item(&mut ops, item, page_height_pt);
        }
        pages.push(PdfPage::new(page_w, page_h, ops));
    }

    // Ensure at least one page.
    if pages.is_empty() {
        pages.push(PdfPage::new(page_w, page_h, Vec::new()));
    }

    doc.with_pages(pages);
    let mut warnings = Vec::new();
    let bytes = doc.save(&PdfSaveOptions::default(), &mut warnings);
    if !warnings.is_empty() {
        log::debug!("printpdf reported {} warning(s)", warnings.len());
    }

    Ok(bytes)
}

/// Convert a UTF-8 string to raw Windows-1252 bytes then wrap in a String so
/// printpdf writes the bytes unchanged into the PDF stream (builtin fonts use
/// WinAnsiEncoding, so each glyph is one byte 0x00–0xFF).
fn to_winlatin(s: &str) -> String {
    let bytes: Vec<u8> = s
        .chars()
        .map(|c| match c {
            '\u{20AC}' => 0x80, // euro
            '\u{2026}' => 0x85, // ellipsis
            '\u{2018}' => 0x91, // left single quote
            '\u{2019}' => 0x92, // right single quote
            '\u{201C}' => 0x93, // left double quote
            '\u{201D}' => 0x94, // right double quote
            '\u{2022}' => 0x95, // bullet
            '\u{2013}' => 0x96, // en-dash
            '\u{2014}' => 0x97, // em-dash
            '\u{00A0}' => 0x20, // non-breaking space -> space
            c if (c as u32) < 256 => c as u8,
            _ => b'?',
        })
        .collect();
    // SAFETY: intentionally non-UTF-8 for 0x80-0x9F range; printpdf passes
    // these bytes straight to the PDF stream, decoded by WinAnsiEncoding.
    #[allow(unsafe_code)]
    unsafe {
        String::from_utf8_unchecked(bytes)
    }
}

fn builtin_font(face: FontFace) -> BuiltinFont {
    match face {
        FontFace::Regular => BuiltinFont::Helvetica,
        FontFace::Bold => BuiltinFont::HelveticaBold,
        FontFace::Italic => BuiltinFont::HelveticaOblique,
        FontFace::BoldItalic => BuiltinFont::HelveticaBoldOblique,
    }
}

/// Layout millimetres (origin top-left) → PDF point (origin bottom-left).
fn pdf_point(x_mm: f32, y_mm: f32, page_height_pt: f32) -> Point {
    Point {
        x: Pt(x_mm * PT_PER_MM),
        y: Pt(page_height_pt - y_mm * PT_PER_MM),
    }
}

fn line_point(p: Point) -> LinePoint {
    LinePoint { p, bezier: false }
}

fn black() -> Color {
    Color::Rgb(Rgb {
        r: 0.0,
        g: 0.0,
        b: 0.0,
        icc_profile: None,
    })
}

fn render_item(ops: &mut Vec<Op>, item: &DrawItem, page_height_pt: f32) {
    match item {
        DrawItem::Text { x, y, text, style } => {
            let font = builtin_font(style.face);
            // Baseline ≈ top of line + ascender (approx 0.75 × font_size)
            let mut pos = pdf_point(*x, *y, page_height_pt);
            pos.y = Pt(pos.y.0 - style.size * 0.75);

            ops.push(Op::StartTextSection);
            ops.push(Op::SetTextCursor { pos });
            ops.push(Op::SetFontSizeBuiltinFont {
                size: Pt(style.size),
                font,
            });
            ops.push(Op::SetFillColor { col: black() });
            ops.push(Op::WriteTextBuiltinFont {
                items: vec![TextItem::Text(to_winlatin(text))],
                font,
            });
            ops.push(Op::EndTextSection);
        }
        DrawItem::Line { x1, y1, x2, y2, width } => {
            ops.push(Op::SetOutlineColor { col: black() });
            ops.push(Op::SetOutlineThickness { pt: Pt(*width) });
            ops.push(Op::DrawLine {
                line: Line {
                    points: vec![
                        line_point(pdf_point(*x1, *y1, page_height_pt)),
                        line_point(pdf_point(*x2, *y2, page_height_pt)),
                    ],
                    is_closed: false,
                },
            });
        }
        DrawItem::Rect {
            x,
            y,
            width,
            height,
            fill,
            border,
        } => {
            let corners = [
                pdf_point(*x, *y, page_height_pt),
                pdf_point(*x + *width, *y, page_height_pt),
                pdf_point(*x + *width, *y + *height, page_height_pt),
                pdf_point(*x, *y + *height, page_height_pt),
            ];

            if let Some([r, g, b]) = fill {
                ops.push(Op::SetFillColor {
                    col: Color::Rgb(Rgb {
                        r: *r,
                        g: *g,
                        b: *b,
                        icc_profile: None,
                    }),
                });
                ops.push(Op::DrawPolygon {
                    polygon: Polygon {
                        rings: vec![PolygonRing {
                            points: corners.iter().cloned().map(line_point).collect(),
                        }],
                        mode: PaintMode::Fill,
                        winding_order: WindingOrder::NonZero,
                    },
                });
            }

            if *border {
                ops.push(Op::SetOutlineColor { col: black() });
                ops.push(Op::SetOutlineThickness { pt: Pt(0.2) });
                ops.push(Op::DrawLine {
                    line: Line {
                        points: corners.iter().cloned().map(line_point).collect(),
                        is_closed: true,
                    },
                });
            }
        }
    }
}
