//! Invoice entity and repository trait.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::shared::error::AppError;

/// Invoice lifecycle: draft -> approved -> sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum InvoiceStatus {
    #[default]
    Draft,
    Approved,
    Sent,
}

impl InvoiceStatus {
    pub fn from_str(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "approved" => Self::Approved,
            "sent" => Self::Sent,
            _ => Self::Draft,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Approved => "approved",
            Self::Sent => "sent",
        }
    }
}

impl std::fmt::Display for InvoiceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One invoice per booking.
///
/// Maps to the `invoices` table; amounts are minor units, `tax_rate` a percentage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Invoice {
    pub id: i64,
    pub booking_id: i64,
    pub invoice_number: String,
    pub status: InvoiceStatus,
    pub subtotal: i64,
    pub tax_amount: i64,
    pub total_amount: i64,
    pub tax_rate: i64,
    pub issue_date: NaiveDate,
    pub due_date: NaiveDate,
    pub pdf_path: Option<String>,
    pub approved_at: Option<DateTime<Utc>>,
    pub sent_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Draft to insert; the number is allocated by the repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewInvoice {
    pub id: i64,
    pub booking_id: i64,
    pub number_prefix: String,
    pub subtotal: i64,
    pub tax_amount: i64,
    pub total_amount: i64,
    pub tax_rate: i64,
    pub issue_date: NaiveDate,
    pub due_date: NaiveDate,
}

/// `<prefix><seq:06>/<year>`, e.g. `SZ000042/2026`.
pub fn format_invoice_number(prefix: &str, sequence: i64, year: i32) -> String {
    format!("{}{:06}/{}", prefix, sequence, year)
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait InvoiceRepository: Send + Sync {
    async fn find_by_id(&self, id: i64) -> Result<Option<Invoice>, AppError>;

    async fn find_by_booking(&self, booking_id: i64) -> Result<Option<Invoice>, AppError>;

    /// Allocate the next number of the issue year and insert the draft.
    async fn create_draft(&self, invoice: &NewInvoice) -> Result<Invoice, AppError>;

    /// draft -> approved; conflict if the invoice is no longer a draft.
    async fn mark_approved(&self, id: i64, pdf_path: &str) -> Result<Invoice, AppError>;

    /// approved -> sent; conflict if the invoice is not approved.
    async fn mark_sent(&self, id: i64) -> Result<Invoice, AppError>;

    async fn set_pdf_path(&self, id: i64, pdf_path: &str) -> Result<(), AppError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invoice_number_format() {
        assert_eq!(format_invoice_number("SZ", 42, 2026), "SZ000042/2026");
        assert_eq!(format_invoice_number("INV-", 1234567, 2027), "INV-1234567/2027");
    }

    #[test]
    fn test_status_parsing_defaults_to_draft() {
        assert_eq!(InvoiceStatus::from_str("sent"), InvoiceStatus::Sent);
        assert_eq!(InvoiceStatus::from_str("bogus"), InvoiceStatus::Draft);
    }
}
