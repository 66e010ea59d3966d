//! Invoice PDF rendering with printpdf's built-in fonts.

use chrono::NaiveDate;
use printpdf::{BuiltinFont, IndirectFontRef, Mm, PdfDocument, PdfDocumentReference, PdfLayerReference};

use crate::domain::services::LineItem;
use crate::shared::error::AppError;

/// Seller or buyer block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvoiceParty {
    pub name: String,
    pub lines: Vec<String>,
}

/// Everything printed on an invoice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvoiceDocument {
    pub invoice_number: String,
    pub issue_date: NaiveDate,
    pub due_date: NaiveDate,
    pub seller: InvoiceParty,
    pub buyer: InvoiceParty,
    pub stay_start: NaiveDate,
    pub stay_end: NaiveDate,
    pub lines: Vec<LineItem>,
    pub subtotal: i64,
    pub tax_rate: i64,
    pub tax_amount: i64,
    pub total_amount: i64,
}

#[cfg_attr(test, mockall::automock)]
pub trait InvoiceRenderer: Send + Sync {
    fn render(&self, document: &InvoiceDocument) -> Result<Vec<u8>, AppError>;
}

/// A4 portrait renderer.
#[derive(Debug, Clone, Copy, Default)]
pub struct PdfInvoiceRenderer;

const PAGE_WIDTH: f32 = 210.0;
const PAGE_HEIGHT: f32 = 297.0;
const MARGIN: f32 = 18.0;
const AMOUNT_COLUMN: f32 = 160.0;

/// Minor units as `1234.56`.
pub fn format_amount(minor: i64) -> String {
    let sign = if minor < 0 { "-" } else { "" };
    let abs = minor.unsigned_abs();
    format!("{}{}.{:02}", sign, abs / 100, abs % 100)
}

/// Writes text top-down and starts a new page when the current one is full.
struct PageWriter<'a> {
    doc: &'a PdfDocumentReference,
    layer: PdfLayerReference,
    regular: IndirectFontRef,
    bold: IndirectFontRef,
    y: f32,
    pages: usize,
}

impl PageWriter<'_> {
    fn ensure_room(&mut self, height: f32) {
        if self.y - height >= MARGIN {
            return;
        }
        self.pages += 1;
        let (page, layer) = self.doc.add_page(
            Mm(PAGE_WIDTH),
            Mm(PAGE_HEIGHT),
            format!("Layer {}", self.pages),
        );
        self.layer = self.doc.get_page(page).get_layer(layer);
        self.y = PAGE_HEIGHT - MARGIN;
    }

    fn text(&mut self, text: &str, size: f32, x: f32, bold: bool) {
        let font = if bold { &self.bold } else { &self.regular };
        self.layer.use_text(text, size, Mm(x), Mm(self.y), font);
    }

    fn line(&mut self, text: &str, size: f32, bold: bool) {
        self.ensure_room(size * 0.5);
        self.text(text, size, MARGIN, bold);
        self.y -= size * 0.5;
    }

    fn amount_row(&mut self, label: &str, amount: i64, bold: bool) {
        self.ensure_room(6.0);
        self.text(label, 10.0, MARGIN, bold);
        self.text(&format_amount(amount), 10.0, AMOUNT_COLUMN, bold);
        self.y -= 6.0;
    }

    fn gap(&mut self, height: f32) {
        self.y -= height;
    }

    fn party(&mut self, title: &str, party: &InvoiceParty) {
        self.line(title, 11.0, true);
        self.line(&party.name, 10.0, false);
        for line in &party.lines {
            self.line(line, 10.0, false);
        }
    }
}

fn pdf_error(e: impl std::fmt::Display) -> AppError {
    AppError::Internal(format!("PDF rendering failed: {}", e))
}

impl InvoiceRenderer for PdfInvoiceRenderer {
    fn render(&self, document: &InvoiceDocument) -> Result<Vec<u8>, AppError> {
        let title = format!("Invoice {}", document.invoice_number);
        let (doc, page, layer) =
            PdfDocument::new(&title, Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), "Layer 1");
        let regular = doc.add_builtin_font(BuiltinFont::Helvetica).map_err(pdf_error)?;
        let bold = doc
            .add_builtin_font(BuiltinFont::HelveticaBold)
            .map_err(pdf_error)?;

        {
            let mut w = PageWriter {
                doc: &doc,
                layer: doc.get_page(page).get_layer(layer),
                regular,
                bold,
                y: PAGE_HEIGHT - MARGIN,
                pages: 1,
            };

            w.line("INVOICE", 18.0, true);
            w.line(&format!("No. {}", document.invoice_number), 11.0, false);
            w.line(&format!("Issue date: {}", document.issue_date), 10.0, false);
            w.line(&format!("Due date: {}", document.due_date), 10.0, false);
            w.gap(4.0);

            w.party("Seller", &document.seller);
            w.gap(4.0);
            w.party("Buyer", &document.buyer);
            w.gap(4.0);

            w.line(
                &format!("Stay: {} - {}", document.stay_start, document.stay_end),
                10.0,
                false,
            );
            w.gap(4.0);

            w.line("Items", 11.0, true);
            for item in &document.lines {
                w.amount_row(&item.description, item.amount, false);
            }
            w.gap(4.0);

            w.amount_row("Subtotal", document.subtotal, false);
            w.amount_row(&format!("VAT ({}%)", document.tax_rate), document.tax_amount, false);
            w.amount_row("Total", document.total_amount, true);
        }

        doc.save_to_bytes().map_err(pdf_error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use test_case::test_case;

    fn document(lines: usize) -> InvoiceDocument {
        let date = NaiveDate::from_ymd_opt(2026, 3, 1).unwrap();
        InvoiceDocument {
            invoice_number: "SZ000001/2026".into(),
            issue_date: date,
            due_date: NaiveDate::from_ymd_opt(2026, 3, 9).unwrap(),
            seller: InvoiceParty {
                name: "Grand Hotel".into(),
                lines: vec!["Budapest".into(), "Tax number: 12345678-1-42".into()],
            },
            buyer: InvoiceParty {
                name: "Alex Doe".into(),
                lines: vec!["alex@example.com".into()],
            },
            stay_start: date,
            stay_end: NaiveDate::from_ymd_opt(2026, 3, 4).unwrap(),
            lines: (0..lines)
                .map(|i| LineItem {
                    description: format!("Room {} (3 nights)", i),
                    amount: 10_000,
                })
                .collect(),
            subtotal: 10_000 * lines as i64,
            tax_rate: 27,
            tax_amount: 2_700 * lines as i64,
            total_amount: 12_700 * lines as i64,
        }
    }

    #[test_case(0, "0.00")]
    #[test_case(5, "0.05")]
    #[test_case(123456, "1234.56")]
    #[test_case(-250, "-2.50")]
    fn test_format_amount(minor: i64, expected: &str) {
        assert_eq!(format_amount(minor), expected);
    }

    #[test]
    fn test_render_produces_pdf() {
        let bytes = PdfInvoiceRenderer.render(&document(2)).unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }

    #[test]
    fn test_render_spills_onto_new_pages() {
        let short = PdfInvoiceRenderer.render(&document(1)).unwrap();
        let long = PdfInvoiceRenderer.render(&document(80)).unwrap();
        assert!(long.starts_with(b"%PDF"));
        assert!(long.len() > short.len());
    }
}
