//! Invoice Handlers

use std::sync::Arc;

use axum::{
    extract::{Extension, Path, State},
    http::{header, HeaderValue},
    response::{IntoResponse, Response},
    Json,
};

use crate::application::dto::response::InvoiceResponse;
use crate::application::services::{InvoiceService, InvoiceServiceImpl, RenderedInvoice};
use crate::infrastructure::repositories::{
    PgBookingRepository, PgHotelRepository, PgInvoiceRepository, PgUserRepository,
};
use crate::presentation::middleware::AuthUser;
use crate::shared::error::AppError;
use crate::shared::validation::parse_id;
use crate::startup::AppState;

type Service =
    InvoiceServiceImpl<PgInvoiceRepository, PgBookingRepository, PgHotelRepository, PgUserRepository>;

fn invoice_service(state: &AppState) -> Service {
    InvoiceServiceImpl::new(
        Arc::new(PgInvoiceRepository::new(state.db.clone())),
        Arc::new(PgBookingRepository::new(state.db.clone())),
        Arc::new(PgHotelRepository::new(state.db.clone())),
        Arc::new(PgUserRepository::new(state.db.clone())),
        state.invoice_renderer.clone(),
        state.invoice_storage.clone(),
        state.notifier.clone(),
        state.settings.invoice.clone(),
        state.snowflake.clone(),
    )
}

#[derive(Debug, Clone, Copy)]
enum Disposition {
    Inline,
    Attachment,
}

fn pdf_response(rendered: RenderedInvoice, disposition: Disposition) -> Response {
    let kind = match disposition {
        Disposition::Inline => "inline",
        Disposition::Attachment => "attachment",
    };
    let content_disposition = format!("{}; filename=\"{}\"", kind, rendered.file_name());

    let mut response = rendered.pdf.into_response();
    let headers = response.headers_mut();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("application/pdf"));
    if let Ok(value) = HeaderValue::from_str(&content_disposition) {
        headers.insert(header::CONTENT_DISPOSITION, value);
    }
    response
}

/// Invoice of a booking, for the booker or the hotel owner
pub async fn for_booking(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(booking_id): Path<String>,
) -> Result<Json<InvoiceResponse>, AppError> {
    let booking_id = parse_id(&booking_id, "booking ID")?;
    let invoice = invoice_service(&state)
        .for_booking(auth.actor(), booking_id)
        .await?;
    Ok(Json(invoice.into()))
}

/// Render the booking's invoice inline, creating the draft on first call
pub async fn preview(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(booking_id): Path<String>,
) -> Result<Response, AppError> {
    let booking_id = parse_id(&booking_id, "booking ID")?;
    let rendered = invoice_service(&state)
        .preview(auth.actor(), booking_id)
        .await?;
    Ok(pdf_response(rendered, Disposition::Inline))
}

pub async fn approve(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(invoice_id): Path<String>,
) -> Result<Json<InvoiceResponse>, AppError> {
    let invoice_id = parse_id(&invoice_id, "invoice ID")?;
    let invoice = invoice_service(&state)
        .approve(auth.actor(), invoice_id)
        .await?;
    Ok(Json(invoice.into()))
}

pub async fn send(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(invoice_id): Path<String>,
) -> Result<Json<InvoiceResponse>, AppError> {
    let invoice_id = parse_id(&invoice_id, "invoice ID")?;
    let invoice = invoice_service(&state).send(auth.actor(), invoice_id).await?;
    Ok(Json(invoice.into()))
}

pub async fn download(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    Path(invoice_id): Path<String>,
) -> Result<Response, AppError> {
    let invoice_id = parse_id(&invoice_id, "invoice ID")?;
    let rendered = invoice_service(&state)
        .download(auth.actor(), invoice_id)
        .await?;
    Ok(pdf_response(rendered, Disposition::Attachment))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, Utc};

    use crate::domain::{Invoice, InvoiceStatus};

    fn rendered() -> RenderedInvoice {
        let day = NaiveDate::from_ymd_opt(2026, 3, 1).unwrap();
        RenderedInvoice {
            invoice: Invoice {
                id: 1,
                booking_id: 2,
                invoice_number: "SZ000001/2026".into(),
                status: InvoiceStatus::Approved,
                subtotal: 100,
                tax_amount: 27,
                total_amount: 127,
                tax_rate: 27,
                issue_date: day,
                due_date: day,
                pdf_path: None,
                approved_at: None,
                sent_at: None,
                created_at: Utc::now(),
            },
            pdf: b"%PDF-1.7".to_vec(),
        }
    }

    #[test]
    fn test_pdf_response_headers() {
        let response = pdf_response(rendered(), Disposition::Attachment);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "application/pdf");
        let disposition = response.headers()[header::CONTENT_DISPOSITION]
            .to_str()
            .unwrap();
        assert!(disposition.starts_with("attachment; filename=\""));
        assert!(disposition.ends_with(".pdf\""));
    }

    #[test]
    fn test_preview_is_inline() {
        let response = pdf_response(rendered(), Disposition::Inline);
        let disposition = response.headers()[header::CONTENT_DISPOSITION]
            .to_str()
            .unwrap();
        assert!(disposition.starts_with("inline;"));
    }
}
