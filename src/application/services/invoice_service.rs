//! Invoice Service
//!
//! One invoice per booking, moving draft -> approved -> sent. The draft is
//! created the first time the hotel previews it; approving renders the PDF
//! and stores it, sending asks the hotel to deliver it to the guest.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use tracing::{info, warn};

use super::can_manage;
use crate::config::InvoiceSettings;
use crate::domain::services::PricingService;
use crate::domain::{
    Actor, Booking, BookingRepository, BookingStatus, CustomerType, Hotel, HotelRepository,
    Invoice, InvoiceDetail, InvoiceRepository, InvoiceStatus, NewInvoice, Notification, Notifier,
    User, UserRepository,
};
use crate::infrastructure::invoices::{InvoiceDocument, InvoiceParty, InvoiceRenderer, InvoiceStorage};
use crate::shared::error::AppError;
use crate::shared::snowflake::SnowflakeGenerator;

/// Invoice service trait
#[async_trait]
pub trait InvoiceService: Send + Sync {
    async fn for_booking(&self, actor: Actor, booking_id: i64) -> Result<Invoice, InvoiceError>;

    /// Render the booking's invoice, creating the draft on first call
    async fn preview(&self, actor: Actor, booking_id: i64) -> Result<RenderedInvoice, InvoiceError>;

    async fn approve(&self, actor: Actor, invoice_id: i64) -> Result<Invoice, InvoiceError>;

    async fn send(&self, actor: Actor, invoice_id: i64) -> Result<Invoice, InvoiceError>;

    async fn download(&self, actor: Actor, invoice_id: i64) -> Result<RenderedInvoice, InvoiceError>;
}

#[derive(Debug, Clone)]
pub struct RenderedInvoice {
    pub invoice: Invoice,
    pub pdf: Vec<u8>,
}

impl RenderedInvoice {
    pub fn file_name(&self) -> String {
        crate::infrastructure::invoices::file_name_for(&self.invoice.invoice_number)
    }
}

/// Invoice service errors
#[derive(Debug, thiserror::Error)]
pub enum InvoiceError {
    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("Permission denied")]
    Forbidden,

    #[error("Invoices are issued for confirmed, active or finished bookings; booking is {0}")]
    NotBillable(BookingStatus),

    #[error("Invoice has not been approved yet")]
    NotIssued,

    #[error(transparent)]
    Repository(#[from] AppError),
}

impl From<InvoiceError> for AppError {
    fn from(e: InvoiceError) -> Self {
        match e {
            InvoiceError::NotFound(what) => AppError::NotFound(format!("{} not found", what)),
            InvoiceError::Forbidden => AppError::Forbidden("Permission denied".into()),
            InvoiceError::NotBillable(_) | InvoiceError::NotIssued => AppError::BadRequest(e.to_string()),
            InvoiceError::Repository(e) => e,
        }
    }
}

fn is_billable(status: BookingStatus) -> bool {
    matches!(
        status,
        BookingStatus::Confirmed | BookingStatus::Active | BookingStatus::Finished
    )
}

fn seller_party(hotel: &Hotel, owner: Option<&User>) -> InvoiceParty {
    let mut lines = vec![hotel.location.clone()];
    if let Some(owner) = owner {
        if let Some(tax) = &owner.tax_number {
            lines.push(format!("Tax number: {}", tax));
        }
        if let Some(eu) = &owner.eu_tax_number {
            lines.push(format!("EU tax number: {}", eu));
        }
        if let Some(account) = &owner.bank_account {
            lines.push(format!("Bank account: {}", account));
        }
    }
    InvoiceParty {
        name: hotel.name.clone(),
        lines,
    }
}

fn buyer_party(detail: Option<&InvoiceDetail>, booker: Option<&User>) -> InvoiceParty {
    match (detail, booker) {
        (Some(d), _) => {
            let name = match (&d.customer_type, &d.company_name) {
                (CustomerType::Business, Some(company)) => company.clone(),
                _ => d.full_name.clone(),
            };
            let place = [d.postal_code.as_deref(), d.city.as_deref()]
                .into_iter()
                .flatten()
                .collect::<Vec<_>>()
                .join(" ");
            let lines = [
                d.address_line.clone(),
                (!place.is_empty()).then_some(place),
                d.country.clone(),
                d.tax_number.as_ref().map(|t| format!("Tax number: {}", t)),
                Some(d.email.clone()),
            ]
            .into_iter()
            .flatten()
            .collect();
            InvoiceParty { name, lines }
        }
        (None, Some(user)) => InvoiceParty {
            name: user.name.clone(),
            lines: vec![user.email.clone()],
        },
        (None, None) => InvoiceParty {
            name: "Guest".into(),
            lines: vec![],
        },
    }
}

/// InvoiceService implementation
pub struct InvoiceServiceImpl<I, B, H, U>
where
    I: InvoiceRepository,
    B: BookingRepository,
    H: HotelRepository,
    U: UserRepository,
{
    invoice_repo: Arc<I>,
    booking_repo: Arc<B>,
    hotel_repo: Arc<H>,
    user_repo: Arc<U>,
    renderer: Arc<dyn InvoiceRenderer>,
    storage: Arc<dyn InvoiceStorage>,
    notifier: Arc<dyn Notifier>,
    settings: InvoiceSettings,
    id_generator: Arc<SnowflakeGenerator>,
}

/// A booking with its hotel and whether the caller manages that hotel.
struct BookingContext {
    booking: Booking,
    hotel: Hotel,
    manager: bool,
}

impl<I, B, H, U> InvoiceServiceImpl<I, B, H, U>
where
    I: InvoiceRepository,
    B: BookingRepository,
    H: HotelRepository,
    U: UserRepository,
{
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        invoice_repo: Arc<I>,
        booking_repo: Arc<B>,
        hotel_repo: Arc<H>,
        user_repo: Arc<U>,
        renderer: Arc<dyn InvoiceRenderer>,
        storage: Arc<dyn InvoiceStorage>,
        notifier: Arc<dyn Notifier>,
        settings: InvoiceSettings,
        id_generator: Arc<SnowflakeGenerator>,
    ) -> Self {
        Self {
            invoice_repo,
            booking_repo,
            hotel_repo,
            user_repo,
            renderer,
            storage,
            notifier,
            settings,
            id_generator,
        }
    }

    async fn context(&self, actor: Actor, booking_id: i64) -> Result<BookingContext, InvoiceError> {
        let booking = self
            .booking_repo
            .find_by_id(booking_id)
            .await?
            .ok_or(InvoiceError::NotFound("Booking"))?;
        let hotel = self
            .hotel_repo
            .find_by_id(booking.hotel_id)
            .await?
            .ok_or(InvoiceError::NotFound("Hotel"))?;
        let manager = can_manage(&actor, &hotel);
        if !manager && booking.user_id != actor.user_id {
            return Err(InvoiceError::Forbidden);
        }
        Ok(BookingContext {
            booking,
            hotel,
            manager,
        })
    }

    async fn managed_invoice(&self, actor: Actor, invoice_id: i64) -> Result<(Invoice, BookingContext), InvoiceError> {
        let invoice = self.find_invoice(invoice_id).await?;
        let ctx = self.context(actor, invoice.booking_id).await?;
        if !ctx.manager {
            return Err(InvoiceError::Forbidden);
        }
        Ok((invoice, ctx))
    }

    async fn find_invoice(&self, invoice_id: i64) -> Result<Invoice, InvoiceError> {
        self.invoice_repo
            .find_by_id(invoice_id)
            .await?
            .ok_or(InvoiceError::NotFound("Invoice"))
    }

    async fn document(&self, invoice: &Invoice, ctx: &BookingContext) -> Result<InvoiceDocument, InvoiceError> {
        let booking = &ctx.booking;
        let rooms = self.booking_repo.rooms_of(booking.id).await?;
        let services = self.booking_repo.services_of(booking.id).await?;
        let detail = self.booking_repo.invoice_detail(booking.id).await?;
        let owner = self.user_repo.find_by_id(ctx.hotel.owner_id).await?;
        let booker = match detail {
            Some(_) => None,
            None => self.user_repo.find_by_id(booking.user_id).await?,
        };

        Ok(InvoiceDocument {
            invoice_number: invoice.invoice_number.clone(),
            issue_date: invoice.issue_date,
            due_date: invoice.due_date,
            seller: seller_party(&ctx.hotel, owner.as_ref()),
            buyer: buyer_party(detail.as_ref(), booker.as_ref()),
            stay_start: booking.start_date,
            stay_end: booking.end_date,
            lines: PricingService::line_items(&rooms, &services, booking.nights(), invoice.subtotal)
                .map_err(AppError::from)?,
            subtotal: invoice.subtotal,
            tax_rate: invoice.tax_rate,
            tax_amount: invoice.tax_amount,
            total_amount: invoice.total_amount,
        })
    }

    /// PDF rendering is CPU-bound, so it runs off the async workers.
    async fn render(&self, document: InvoiceDocument) -> Result<Vec<u8>, InvoiceError> {
        let renderer = Arc::clone(&self.renderer);
        let bytes = tokio::task::spawn_blocking(move || renderer.render(&document))
            .await
            .map_err(|e| AppError::Internal(format!("Invoice rendering task failed: {}", e)))??;
        Ok(bytes)
    }

    async fn draft_for(&self, booking: &Booking) -> Result<Invoice, InvoiceError> {
        if let Some(existing) = self.invoice_repo.find_by_booking(booking.id).await? {
            return Ok(existing);
        }

        let totals = PricingService::invoice_totals(booking.total_price, self.settings.tax_rate_percent)
            .map_err(AppError::from)?;
        let issue_date = Utc::now().date_naive();
        let draft = NewInvoice {
            id: self.id_generator.generate(),
            booking_id: booking.id,
            number_prefix: self.settings.number_prefix.clone(),
            subtotal: totals.subtotal,
            tax_amount: totals.tax_amount,
            total_amount: totals.total_amount,
            tax_rate: totals.tax_rate,
            issue_date,
            due_date: issue_date + Duration::days(self.settings.payment_due_days),
        };

        let invoice = self.invoice_repo.create_draft(&draft).await?;
        info!(
            invoice_id = invoice.id,
            booking_id = booking.id,
            invoice_number = %invoice.invoice_number,
            "Invoice draft created"
        );
        Ok(invoice)
    }

    async fn recipient(&self, booking: &Booking) -> Result<Option<String>, InvoiceError> {
        if let Some(detail) = self.booking_repo.invoice_detail(booking.id).await? {
            return Ok(Some(detail.email));
        }
        Ok(self
            .user_repo
            .find_by_id(booking.user_id)
            .await?
            .map(|u| u.email))
    }
}

#[async_trait]
impl<I, B, H, U> InvoiceService for InvoiceServiceImpl<I, B, H, U>
where
    I: InvoiceRepository + 'static,
    B: BookingRepository + 'static,
    H: HotelRepository + 'static,
    U: UserRepository + 'static,
{
    async fn for_booking(&self, actor: Actor, booking_id: i64) -> Result<Invoice, InvoiceError> {
        self.context(actor, booking_id).await?;
        self.invoice_repo
            .find_by_booking(booking_id)
            .await?
            .ok_or(InvoiceError::NotFound("Invoice"))
    }

    async fn preview(&self, actor: Actor, booking_id: i64) -> Result<RenderedInvoice, InvoiceError> {
        let ctx = self.context(actor, booking_id).await?;
        if !ctx.manager {
            return Err(InvoiceError::Forbidden);
        }
        if !is_billable(ctx.booking.status) {
            return Err(InvoiceError::NotBillable(ctx.booking.status));
        }

        let invoice = self.draft_for(&ctx.booking).await?;
        let document = self.document(&invoice, &ctx).await?;
        let pdf = self.render(document).await?;
        Ok(RenderedInvoice { invoice, pdf })
    }

    async fn approve(&self, actor: Actor, invoice_id: i64) -> Result<Invoice, InvoiceError> {
        let (invoice, ctx) = self.managed_invoice(actor, invoice_id).await?;
        if invoice.status != InvoiceStatus::Draft {
            return Err(AppError::Conflict(format!("Invoice is already {}", invoice.status)).into());
        }

        let document = self.document(&invoice, &ctx).await?;
        let pdf = self.render(document).await?;
        let path = self.storage.save(&invoice.invoice_number, pdf).await?;
        let invoice = self.invoice_repo.mark_approved(invoice.id, &path).await?;

        info!(
            invoice_id = invoice.id,
            booking_id = invoice.booking_id,
            invoice_number = %invoice.invoice_number,
            "Invoice approved"
        );
        Ok(invoice)
    }

    async fn send(&self, actor: Actor, invoice_id: i64) -> Result<Invoice, InvoiceError> {
        let (invoice, ctx) = self.managed_invoice(actor, invoice_id).await?;
        let invoice = self.invoice_repo.mark_sent(invoice.id).await?;

        match self.recipient(&ctx.booking).await? {
            Some(email) => self.notifier.notify(Notification::invoice_sent(
                ctx.hotel.id,
                ctx.booking.id,
                &invoice.invoice_number,
                &email,
            )),
            None => warn!(invoice_id = invoice.id, "Invoice has no recipient address"),
        }

        info!(
            invoice_id = invoice.id,
            booking_id = invoice.booking_id,
            invoice_number = %invoice.invoice_number,
            "Invoice sent"
        );
        Ok(invoice)
    }

    async fn download(&self, actor: Actor, invoice_id: i64) -> Result<RenderedInvoice, InvoiceError> {
        let invoice = self.find_invoice(invoice_id).await?;
        let ctx = self.context(actor, invoice.booking_id).await?;
        if invoice.status == InvoiceStatus::Draft {
            return Err(InvoiceError::NotIssued);
        }

        if let Some(path) = &invoice.pdf_path {
            if let Some(pdf) = self.storage.load(path).await? {
                return Ok(RenderedInvoice { invoice, pdf });
            }
            warn!(invoice_id = invoice.id, path = %path, "Stored invoice missing, re-rendering");
        }

        let document = self.document(&invoice, &ctx).await?;
        let pdf = self.render(document).await?;
        let path = self.storage.save(&invoice.invoice_number, pdf.clone()).await?;
        self.invoice_repo.set_pdf_path(invoice.id, &path).await?;

        Ok(RenderedInvoice {
            invoice: Invoice {
                pdf_path: Some(path),
                ..invoice
            },
            pdf,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{
        MockBookingRepository, MockHotelRepository, MockInvoiceRepository, MockNotifier,
        MockUserRepository, UserRole,
    };
    use crate::infrastructure::invoices::{MockInvoiceRenderer, MockInvoiceStorage};
    use chrono::NaiveDate;

    type Service = InvoiceServiceImpl<
        MockInvoiceRepository,
        MockBookingRepository,
        MockHotelRepository,
        MockUserRepository,
    >;

    struct Mocks {
        invoices: MockInvoiceRepository,
        bookings: MockBookingRepository,
        hotels: MockHotelRepository,
        users: MockUserRepository,
        renderer: MockInvoiceRenderer,
        storage: MockInvoiceStorage,
        notifier: MockNotifier,
    }

    impl Mocks {
        fn new(status: BookingStatus) -> Self {
            let mut bookings = MockBookingRepository::new();
            bookings
                .expect_find_by_id()
                .returning(move |_| Ok(Some(booking(status))));
            bookings.expect_rooms_of().returning(|_| Ok(vec![]));
            bookings.expect_services_of().returning(|_| Ok(vec![]));
            bookings.expect_invoice_detail().returning(|_| Ok(None));

            let mut hotels = MockHotelRepository::new();
            hotels.expect_find_by_id().returning(|id| {
                Ok(Some(Hotel {
                    id,
                    owner_id: 10,
                    name: "Tisza Hotel".into(),
                    ..Hotel::default()
                }))
            });

            let mut users = MockUserRepository::new();
            users.expect_find_by_id().returning(|id| {
                Ok(Some(User {
                    id,
                    email: format!("user{}@example.com", id),
                    ..User::default()
                }))
            });

            Self {
                invoices: MockInvoiceRepository::new(),
                bookings,
                hotels,
                users,
                renderer: MockInvoiceRenderer::new(),
                storage: MockInvoiceStorage::new(),
                notifier: MockNotifier::new(),
            }
        }

        fn build(self) -> Service {
            InvoiceServiceImpl::new(
                Arc::new(self.invoices),
                Arc::new(self.bookings),
                Arc::new(self.hotels),
                Arc::new(self.users),
                Arc::new(self.renderer),
                Arc::new(self.storage),
                Arc::new(self.notifier),
                InvoiceSettings {
                    tax_rate_percent: 27,
                    payment_due_days: 8,
                    number_prefix: "SZ".into(),
                    storage_dir: "unused".into(),
                },
                Arc::new(SnowflakeGenerator::new(1)),
            )
        }
    }

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, day).unwrap()
    }

    fn booking(status: BookingStatus) -> Booking {
        Booking {
            id: 100,
            user_id: 5,
            hotel_id: 1,
            start_date: d(1),
            end_date: d(4),
            total_price: 10_000,
            status,
            check_in_token: None,
            check_in_status: None,
            check_in_time: None,
            check_out_time: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn invoice(status: InvoiceStatus, pdf_path: Option<&str>) -> Invoice {
        Invoice {
            id: 7,
            booking_id: 100,
            invoice_number: "SZ000001/2026".into(),
            status,
            subtotal: 10_000,
            tax_amount: 2_700,
            total_amount: 12_700,
            tax_rate: 27,
            issue_date: d(5),
            due_date: d(13),
            pdf_path: pdf_path.map(String::from),
            approved_at: None,
            sent_at: None,
            created_at: Utc::now(),
        }
    }

    fn owner() -> Actor {
        Actor::new(10, UserRole::Hotel)
    }

    fn booker() -> Actor {
        Actor::new(5, UserRole::Guest)
    }

    #[tokio::test]
    async fn test_preview_creates_draft_with_tax() {
        let mut m = Mocks::new(BookingStatus::Finished);
        m.invoices.expect_find_by_booking().returning(|_| Ok(None));
        m.invoices
            .expect_create_draft()
            .withf(|n| n.subtotal == 10_000 && n.tax_amount == 2_700 && n.total_amount == 12_700)
            .times(1)
            .returning(|_| Ok(invoice(InvoiceStatus::Draft, None)));
        m.renderer
            .expect_render()
            .withf(|doc| doc.seller.name == "Tisza Hotel" && doc.buyer.lines == vec!["user5@example.com"])
            .returning(|_| Ok(b"%PDF".to_vec()));

        let rendered = m.build().preview(owner(), 100).await.unwrap();
        assert_eq!(rendered.pdf, b"%PDF");
        assert_eq!(rendered.file_name(), "SZ000001_2026.pdf");
    }

    #[tokio::test]
    async fn test_pending_booking_is_not_billable() {
        let mut m = Mocks::new(BookingStatus::Pending);
        m.invoices.expect_create_draft().never();

        let result = m.build().preview(owner(), 100).await;
        assert!(matches!(result, Err(InvoiceError::NotBillable(BookingStatus::Pending))));
    }

    #[tokio::test]
    async fn test_booker_cannot_preview() {
        let m = Mocks::new(BookingStatus::Confirmed);
        let result = m.build().preview(booker(), 100).await;
        assert!(matches!(result, Err(InvoiceError::Forbidden)));
    }

    #[tokio::test]
    async fn test_approve_stores_pdf() {
        let mut m = Mocks::new(BookingStatus::Confirmed);
        m.invoices
            .expect_find_by_id()
            .returning(|_| Ok(Some(invoice(InvoiceStatus::Draft, None))));
        m.renderer.expect_render().returning(|_| Ok(b"%PDF".to_vec()));
        m.storage
            .expect_save()
            .returning(|number, _| Ok(crate::infrastructure::invoices::file_name_for(number)));
        m.invoices
            .expect_mark_approved()
            .withf(|id, path| *id == 7 && path == "SZ000001_2026.pdf")
            .returning(|_, path| Ok(invoice(InvoiceStatus::Approved, Some(path))));

        let approved = m.build().approve(owner(), 7).await.unwrap();
        assert_eq!(approved.status, InvoiceStatus::Approved);
    }

    #[tokio::test]
    async fn test_send_notifies_guest_address() {
        let mut m = Mocks::new(BookingStatus::Finished);
        m.invoices
            .expect_find_by_id()
            .returning(|_| Ok(Some(invoice(InvoiceStatus::Approved, Some("x.pdf")))));
        m.invoices
            .expect_mark_sent()
            .returning(|_| Ok(invoice(InvoiceStatus::Sent, Some("x.pdf"))));
        m.notifier
            .expect_notify()
            .withf(|n| n.payload["email"] == "user5@example.com")
            .times(1)
            .return_const(());

        let sent = m.build().send(owner(), 7).await.unwrap();
        assert_eq!(sent.status, InvoiceStatus::Sent);
    }

    #[tokio::test]
    async fn test_draft_cannot_be_downloaded() {
        let mut m = Mocks::new(BookingStatus::Confirmed);
        m.invoices
            .expect_find_by_id()
            .returning(|_| Ok(Some(invoice(InvoiceStatus::Draft, None))));

        let result = m.build().download(booker(), 7).await;
        assert!(matches!(result, Err(InvoiceError::NotIssued)));
    }

    #[tokio::test]
    async fn test_missing_file_is_rerendered() {
        let mut m = Mocks::new(BookingStatus::Finished);
        m.invoices
            .expect_find_by_id()
            .returning(|_| Ok(Some(invoice(InvoiceStatus::Sent, Some("gone.pdf")))));
        m.storage.expect_load().returning(|_| Ok(None));
        m.renderer.expect_render().times(1).returning(|_| Ok(b"%PDF-new".to_vec()));
        m.storage
            .expect_save()
            .returning(|_, _| Ok("SZ000001_2026.pdf".into()));
        m.invoices.expect_set_pdf_path().times(1).returning(|_, _| Ok(()));

        let rendered = m.build().download(booker(), 7).await.unwrap();
        assert_eq!(rendered.pdf, b"%PDF-new");
        assert_eq!(rendered.invoice.pdf_path.as_deref(), Some("SZ000001_2026.pdf"));
    }

    #[test]
    fn test_business_buyer_uses_company_name() {
        let detail = InvoiceDetail {
            customer_type: CustomerType::Business,
            full_name: "Kim Lee".into(),
            email: "billing@acme.test".into(),
            company_name: Some("Acme Kft.".into()),
            postal_code: Some("6720".into()),
            city: Some("Szeged".into()),
            ..InvoiceDetail::default()
        };
        let party = buyer_party(Some(&detail), None);
        assert_eq!(party.name, "Acme Kft.");
        assert_eq!(party.lines, vec!["6720 Szeged", "billing@acme.test"]);
    }
}
