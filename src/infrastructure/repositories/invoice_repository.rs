//! Invoice Repository Implementation
//!
//! Invoice numbers come from a per-year counter row, incremented inside the
//! same transaction as the invoice insert so numbers have no gaps.

use async_trait::async_trait;
use chrono::{DateTime, Datelike, NaiveDate, Utc};
use sqlx::PgPool;

use crate::domain::{format_invoice_number, Invoice, InvoiceRepository, InvoiceStatus, NewInvoice};
use crate::infrastructure::database::with_transaction;
use crate::shared::error::{map_constraint_violation, AppError};

const INVOICE_COLUMNS: &str = "id, booking_id, invoice_number, status, subtotal, tax_amount, \
     total_amount, tax_rate, issue_date, due_date, pdf_path, approved_at, sent_at, created_at";

#[derive(Debug, sqlx::FromRow)]
struct InvoiceRow {
    id: i64,
    booking_id: i64,
    invoice_number: String,
    status: String,
    subtotal: i64,
    tax_amount: i64,
    total_amount: i64,
    tax_rate: i64,
    issue_date: NaiveDate,
    due_date: NaiveDate,
    pdf_path: Option<String>,
    approved_at: Option<DateTime<Utc>>,
    sent_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

impl InvoiceRow {
    fn into_invoice(self) -> Invoice {
        Invoice {
            id: self.id,
            booking_id: self.booking_id,
            invoice_number: self.invoice_number,
            status: InvoiceStatus::from_str(&self.status),
            subtotal: self.subtotal,
            tax_amount: self.tax_amount,
            total_amount: self.total_amount,
            tax_rate: self.tax_rate,
            issue_date: self.issue_date,
            due_date: self.due_date,
            pdf_path: self.pdf_path,
            approved_at: self.approved_at,
            sent_at: self.sent_at,
            created_at: self.created_at,
        }
    }
}

#[derive(Clone)]
pub struct PgInvoiceRepository {
    pool: PgPool,
}

impl PgInvoiceRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Explain why a guarded status update touched no row.
    async fn status_miss(&self, id: i64, expected: InvoiceStatus) -> AppError {
        match self.find_by_id(id).await {
            Ok(Some(invoice)) => AppError::Conflict(format!(
                "Invoice is {}, expected {}",
                invoice.status.as_str(),
                expected.as_str()
            )),
            Ok(None) => AppError::NotFound(format!("Invoice with id {} not found", id)),
            Err(e) => e,
        }
    }
}

#[async_trait]
impl InvoiceRepository for PgInvoiceRepository {
    async fn find_by_id(&self, id: i64) -> Result<Option<Invoice>, AppError> {
        let row = sqlx::query_as::<_, InvoiceRow>(&format!(
            "SELECT {INVOICE_COLUMNS} FROM invoices WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| r.into_invoice()))
    }

    async fn find_by_booking(&self, booking_id: i64) -> Result<Option<Invoice>, AppError> {
        let row = sqlx::query_as::<_, InvoiceRow>(&format!(
            "SELECT {INVOICE_COLUMNS} FROM invoices WHERE booking_id = $1"
        ))
        .bind(booking_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| r.into_invoice()))
    }

    async fn create_draft(&self, invoice: &NewInvoice) -> Result<Invoice, AppError> {
        let year = invoice.issue_date.year();

        with_transaction(&self.pool, |mut ctx| async move {
            let sequence = sqlx::query_scalar::<_, i64>(
                r#"
                INSERT INTO invoice_counters (year, last_value) VALUES ($1, 1)
                ON CONFLICT (year) DO UPDATE SET last_value = invoice_counters.last_value + 1
                RETURNING last_value
                "#,
            )
            .bind(year)
            .fetch_one(ctx.conn())
            .await?;

            let number = format_invoice_number(&invoice.number_prefix, sequence, year);

            let row = sqlx::query_as::<_, InvoiceRow>(&format!(
                r#"
                INSERT INTO invoices (id, booking_id, invoice_number, status, subtotal, tax_amount,
                                      total_amount, tax_rate, issue_date, due_date)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
                RETURNING {INVOICE_COLUMNS}
                "#
            ))
            .bind(invoice.id)
            .bind(invoice.booking_id)
            .bind(&number)
            .bind(InvoiceStatus::Draft.as_str())
            .bind(invoice.subtotal)
            .bind(invoice.tax_amount)
            .bind(invoice.total_amount)
            .bind(invoice.tax_rate)
            .bind(invoice.issue_date)
            .bind(invoice.due_date)
            .fetch_one(ctx.conn())
            .await
            .map_err(|e| map_constraint_violation(e, "Invoice already exists for this booking"))?;

            Ok((row.into_invoice(), ctx))
        })
        .await
    }

    async fn mark_approved(&self, id: i64, pdf_path: &str) -> Result<Invoice, AppError> {
        let row = sqlx::query_as::<_, InvoiceRow>(&format!(
            r#"
            UPDATE invoices
            SET status = 'approved', approved_at = NOW(), pdf_path = $2
            WHERE id = $1 AND status = 'draft'
            RETURNING {INVOICE_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(pdf_path)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Ok(row.into_invoice()),
            None => Err(self.status_miss(id, InvoiceStatus::Draft).await),
        }
    }

    async fn mark_sent(&self, id: i64) -> Result<Invoice, AppError> {
        let row = sqlx::query_as::<_, InvoiceRow>(&format!(
            r#"
            UPDATE invoices
            SET status = 'sent', sent_at = NOW()
            WHERE id = $1 AND status = 'approved'
            RETURNING {INVOICE_COLUMNS}
            "#
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Ok(row.into_invoice()),
            None => Err(self.status_miss(id, InvoiceStatus::Approved).await),
        }
    }

    async fn set_pdf_path(&self, id: i64, pdf_path: &str) -> Result<(), AppError> {
        let result = sqlx::query("UPDATE invoices SET pdf_path = $2 WHERE id = $1")
            .bind(id)
            .bind(pdf_path)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Invoice with id {} not found", id)));
        }

        Ok(())
    }
}
