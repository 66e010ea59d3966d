//! Invoice rendering and file storage.

mod pdf;
mod storage;

pub use pdf::{format_amount, InvoiceDocument, InvoiceParty, InvoiceRenderer, PdfInvoiceRenderer};
pub use storage::{file_name_for, FileInvoiceStorage, InvoiceStorage};

#[cfg(test)]
pub use pdf::MockInvoiceRenderer;
#[cfg(test)]
pub use storage::MockInvoiceStorage;
