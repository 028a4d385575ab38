//! Invoice lifecycle: CRUD with derived totals, status workflow, share links.

use chrono::{Datelike, Duration, NaiveDate};
use db::{
    is_unique_violation,
    models::{
        activity_log::{ActivityAction, ActivityLog, EntityType},
        contact::Contact,
        invoice::{
            Invoice, InvoicePayload, InvoiceQuery, InvoiceRecord, InvoiceStatus,
            InvoiceStatusChange, InvoiceWithItems, PublicInvoice,
        },
        line_item::{DocumentKind, LineItem},
        numbering::next_number,
    },
};
use sqlx::SqlitePool;
use tracing::{debug, info};
use utils::{
    share_token::{self, ShareLink},
    totals::document_totals,
    validation::{Normalize, Validate},
};
use uuid::Uuid;

use super::{
    documents::{DEFAULT_CURRENCY, check_date_order, check_references, sequence_exhausted, today},
    error::ServiceError,
    status_workflow,
};

pub struct InvoiceService;

impl InvoiceService {
    pub async fn list(pool: &SqlitePool, query: &InvoiceQuery) -> Result<Vec<Invoice>, ServiceError> {
        Ok(Invoice::find_all(pool, query).await?)
    }

    pub async fn get(pool: &SqlitePool, id: Uuid) -> Result<InvoiceWithItems, ServiceError> {
        let invoice = Self::find(pool, id).await?;
        Ok(invoice.with_items(pool).await?)
    }

    /// Creates an invoice. A missing number is generated, a missing issue
    /// date is today and a missing due date is `payment_terms_days` later.
    pub async fn create(
        pool: &SqlitePool,
        payload: InvoicePayload,
        payment_terms_days: i64,
    ) -> Result<InvoiceWithItems, ServiceError> {
        let payload = payload.normalized();
        payload.validate()?;
        check_references(pool, payload.contact_id, &payload.items).await?;
        if let Some(number) = &payload.number {
            Self::ensure_number_free(pool, number, None).await?;
        }

        let issue_date = payload.issue_date.unwrap_or_else(today);
        let due_date = payload
            .due_date
            .or_else(|| Some(issue_date + Duration::days(payment_terms_days)));
        check_date_order("due_date", issue_date, due_date)?;
        let totals = document_totals(&payload.items);

        let mut tx = pool.begin().await?;
        let number = match &payload.number {
            Some(number) => number.clone(),
            None => next_number(&mut *tx, DocumentKind::Invoice, issue_date.year())
                .await?
                .ok_or_else(sequence_exhausted)?,
        };
        let record = InvoiceRecord {
            number: &number,
            contact_id: payload.contact_id,
            estimate_id: None,
            issue_date,
            due_date,
            currency: payload.currency.as_deref().unwrap_or(DEFAULT_CURRENCY),
            notes: payload.notes.as_deref(),
            totals,
        };
        let invoice = Invoice::create(&mut *tx, Uuid::new_v4(), &record)
            .await
            .map_err(map_unique)?;
        let items = LineItem::replace_all(&mut tx, DocumentKind::Invoice, invoice.id, &payload.items).await?;
        ActivityLog::create(
            &mut *tx,
            EntityType::Invoice,
            invoice.id,
            ActivityAction::Created,
            Some(format!("Invoice {} created ({:.2} {})", invoice.number, invoice.total, invoice.currency)),
        )
        .await?;
        tx.commit().await?;

        info!(invoice_id = %invoice.id, number = %invoice.number, total = invoice.total, "Invoice created");
        Ok(InvoiceWithItems { invoice, items })
    }

    /// Replaces the editable fields and all line items.
    pub async fn update(
        pool: &SqlitePool,
        id: Uuid,
        payload: InvoicePayload,
    ) -> Result<InvoiceWithItems, ServiceError> {
        let existing = Self::find(pool, id).await?;
        if !existing.status.is_editable() {
            return Err(ServiceError::conflict(
                "status",
                format!("{} invoices cannot be edited", existing.status),
            ));
        }

        let payload = payload.normalized();
        payload.validate()?;
        check_references(pool, payload.contact_id, &payload.items).await?;
        let number = payload.number.clone().unwrap_or_else(|| existing.number.clone());
        if number != existing.number {
            Self::ensure_number_free(pool, &number, Some(id)).await?;
        }

        let issue_date = payload.issue_date.unwrap_or(existing.issue_date);
        check_date_order("due_date", issue_date, payload.due_date)?;

        let record = InvoiceRecord {
            number: &number,
            contact_id: payload.contact_id,
            estimate_id: existing.estimate_id,
            issue_date,
            due_date: payload.due_date,
            currency: payload.currency.as_deref().unwrap_or(&existing.currency),
            notes: payload.notes.as_deref(),
            totals: document_totals(&payload.items),
        };

        let mut tx = pool.begin().await?;
        let invoice = Invoice::update(&mut *tx, id, &record).await.map_err(map_unique)?;
        let items = LineItem::replace_all(&mut tx, DocumentKind::Invoice, id, &payload.items).await?;
        ActivityLog::create(
            &mut *tx,
            EntityType::Invoice,
            id,
            ActivityAction::Updated,
            Some(format!("Invoice {} updated", invoice.number)),
        )
        .await?;
        tx.commit().await?;

        Ok(InvoiceWithItems { invoice, items })
    }

    pub async fn delete(pool: &SqlitePool, id: Uuid) -> Result<(), ServiceError> {
        let invoice = Self::find(pool, id).await?;
        if !invoice.status.is_deletable() {
            return Err(ServiceError::conflict(
                "status",
                "only draft or cancelled invoices can be deleted",
            ));
        }

        let mut tx = pool.begin().await?;
        Invoice::delete(&mut *tx, id).await?;
        ActivityLog::create(
            &mut *tx,
            EntityType::Invoice,
            id,
            ActivityAction::Deleted,
            Some(format!("Invoice {} deleted", invoice.number)),
        )
        .await?;
        tx.commit().await?;

        info!(invoice_id = %id, "Invoice deleted");
        Ok(())
    }

    pub async fn change_status(
        pool: &SqlitePool,
        id: Uuid,
        change: InvoiceStatusChange,
    ) -> Result<Invoice, ServiceError> {
        let invoice = Self::find(pool, id).await?;
        status_workflow::check(invoice.status, change.status, change.confirmed)?;

        let mut tx = pool.begin().await?;
        let updated = Invoice::update_status(&mut *tx, id, change.status).await?;
        ActivityLog::create(
            &mut *tx,
            EntityType::Invoice,
            id,
            ActivityAction::StatusChanged,
            Some(format!(
                "Invoice {} moved from {} to {}",
                invoice.number, invoice.status, updated.status
            )),
        )
        .await?;
        tx.commit().await?;

        info!(invoice_id = %id, from = %invoice.status, to = %updated.status, "Invoice status changed");
        Ok(updated)
    }

    /// Returns the existing link when the invoice is already shared.
    pub async fn share(pool: &SqlitePool, id: Uuid, public_base_url: &str) -> Result<ShareLink, ServiceError> {
        let invoice = Self::find(pool, id).await?;
        if let Some(token) = invoice.share_token {
            return Ok(ShareLink::new(public_base_url, "invoices", token));
        }

        let token = share_token::generate();
        Invoice::set_share_token(pool, id, Some(&token)).await?;
        ActivityLog::create(
            pool,
            EntityType::Invoice,
            id,
            ActivityAction::Shared,
            Some(format!("Share link created for invoice {}", invoice.number)),
        )
        .await?;
        Ok(ShareLink::new(public_base_url, "invoices", token))
    }

    pub async fn unshare(pool: &SqlitePool, id: Uuid) -> Result<Invoice, ServiceError> {
        let invoice = Self::find(pool, id).await?;
        if invoice.share_token.is_none() {
            return Ok(invoice);
        }
        let updated = Invoice::set_share_token(pool, id, None).await?;
        ActivityLog::create(
            pool,
            EntityType::Invoice,
            id,
            ActivityAction::Unshared,
            Some(format!("Share link revoked for invoice {}", invoice.number)),
        )
        .await?;
        Ok(updated)
    }

    /// Customer view behind a share link. Drafts are never exposed.
    pub async fn public_view(pool: &SqlitePool, token: &str) -> Result<PublicInvoice, ServiceError> {
        if !share_token::looks_valid(token) {
            return Err(ServiceError::NotFound("invoice"));
        }
        let invoice = Invoice::find_by_share_token(pool, token)
            .await?
            .filter(|invoice| invoice.status != InvoiceStatus::Draft)
            .ok_or(ServiceError::NotFound("invoice"))?;
        let contact = Contact::find_by_id(pool, invoice.contact_id)
            .await?
            .ok_or(ServiceError::NotFound("contact"))?;
        let items = LineItem::find_by_document(pool, DocumentKind::Invoice, invoice.id).await?;

        Ok(PublicInvoice {
            number: invoice.number,
            status: invoice.status,
            issue_date: invoice.issue_date,
            due_date: invoice.due_date,
            currency: invoice.currency,
            notes: invoice.notes,
            customer_name: contact.name,
            customer_company: contact.company,
            subtotal: invoice.subtotal,
            discount_total: invoice.discount_total,
            vat_total: invoice.vat_total,
            total: invoice.total,
            items,
        })
    }

    /// Moves sent invoices whose due date has passed to overdue.
    pub async fn mark_overdue(pool: &SqlitePool, today: NaiveDate) -> Result<Vec<Invoice>, ServiceError> {
        let candidates = Invoice::find_past_due(pool, today).await?;
        let mut marked = Vec::with_capacity(candidates.len());

        for invoice in candidates {
            debug!(invoice_id = %invoice.id, due_date = ?invoice.due_date, "Marking invoice overdue");
            let mut tx = pool.begin().await?;
            let updated = Invoice::update_status(&mut *tx, invoice.id, InvoiceStatus::Overdue).await?;
            ActivityLog::create(
                &mut *tx,
                EntityType::Invoice,
                invoice.id,
                ActivityAction::MarkedOverdue,
                Some(format!("Invoice {} is past its due date", invoice.number)),
            )
            .await?;
            tx.commit().await?;
            marked.push(updated);
        }

        Ok(marked)
    }

    async fn find(pool: &SqlitePool, id: Uuid) -> Result<Invoice, ServiceError> {
        Invoice::find_by_id(pool, id)
            .await?
            .ok_or(ServiceError::NotFound("invoice"))
    }

    async fn ensure_number_free(pool: &SqlitePool, number: &str, own_id: Option<Uuid>) -> Result<(), ServiceError> {
        match Invoice::find_by_number(pool, number).await? {
            Some(existing) if Some(existing.id) != own_id => Err(ServiceError::conflict(
                "number",
                "an invoice with this number already exists",
            )),
            _ => Ok(()),
        }
    }
}

fn map_unique(err: sqlx::Error) -> ServiceError {
    if is_unique_violation(&err) {
        ServiceError::conflict("number", "an invoice with this number already exists")
    } else {
        ServiceError::Database(err)
    }
}

#[cfg(test)]
mod tests {
    use db::{
        DBService,
        models::{contact::ContactPayload, line_item::LineItemInput},
    };

    use super::*;

    async fn setup() -> (DBService, Contact) {
        let db = DBService::new_in_memory().await.unwrap();
        let contact = Contact::create(
            &db.pool,
            &ContactPayload {
                name: "Umbrella Corp".to_string(),
                company: Some("Umbrella".to_string()),
                ..Default::default()
            },
            Uuid::new_v4(),
        )
        .await
        .unwrap();
        (db, contact)
    }

    fn payload(contact_id: Uuid) -> InvoicePayload {
        InvoicePayload {
            number: None,
            contact_id,
            issue_date: NaiveDate::from_ymd_opt(2025, 2, 1),
            due_date: None,
            currency: None,
            notes: Some("Thanks!".to_string()),
            items: vec![
                LineItemInput {
                    product_id: None,
                    description: "Hosting".to_string(),
                    quantity: 12.0,
                    unit_price: 15.0,
                    discount_percent: 0.0,
                    vat_rate: 21.0,
                },
                LineItemInput {
                    product_id: None,
                    description: "Setup".to_string(),
                    quantity: 1.0,
                    unit_price: 100.0,
                    discount_percent: 50.0,
                    vat_rate: 21.0,
                },
            ],
        }
    }

    #[tokio::test]
    async fn create_fills_defaults_and_totals() {
        let (db, contact) = setup().await;
        let invoice = InvoiceService::create(&db.pool, payload(contact.id), 14).await.unwrap();

        assert_eq!(invoice.number, "INV-2025-0001");
        assert_eq!(invoice.currency, "EUR");
        assert_eq!(invoice.status, InvoiceStatus::Draft);
        assert_eq!(invoice.due_date, NaiveDate::from_ymd_opt(2025, 2, 15));
        assert_eq!(invoice.subtotal, 280.0);
        assert_eq!(invoice.discount_total, 50.0);
        assert_eq!(invoice.vat_total, 48.3);
        assert_eq!(invoice.total, 278.3);
        assert_eq!(invoice.items.len(), 2);
        assert_eq!(invoice.items[1].position, 1);
    }

    #[tokio::test]
    async fn unknown_contact_is_a_field_error() {
        let (db, _) = setup().await;
        let err = InvoiceService::create(&db.pool, payload(Uuid::new_v4()), 30)
            .await
            .unwrap_err();
        let ServiceError::Validation(errors) = err else {
            panic!("expected validation error");
        };
        assert_eq!(errors.get("contact_id"), Some("does not exist"));
    }

    #[tokio::test]
    async fn duplicate_number_conflicts() {
        let (db, contact) = setup().await;
        let mut first = payload(contact.id);
        first.number = Some("2025/001".to_string());
        InvoiceService::create(&db.pool, first.clone(), 30).await.unwrap();
        let err = InvoiceService::create(&db.pool, first, 30).await.unwrap_err();
        assert!(matches!(err, ServiceError::Conflict { ref field, .. } if field == "number"));
    }

    #[tokio::test]
    async fn due_date_is_checked_against_the_resolved_issue_date() {
        let (db, contact) = setup().await;
        let mut dated_today = payload(contact.id);
        dated_today.issue_date = None;
        dated_today.due_date = NaiveDate::from_ymd_opt(2000, 1, 1);
        let err = InvoiceService::create(&db.pool, dated_today, 30).await.unwrap_err();
        let ServiceError::Validation(errors) = err else {
            panic!("expected validation error");
        };
        assert_eq!(errors.get("due_date"), Some("must not be before the issue date"));

        // Stored issue date is 2025-02-01
        let invoice = InvoiceService::create(&db.pool, payload(contact.id), 30).await.unwrap();
        let mut keeps_issue_date = payload(contact.id);
        keeps_issue_date.issue_date = None;
        keeps_issue_date.due_date = NaiveDate::from_ymd_opt(2025, 1, 15);
        let err = InvoiceService::update(&db.pool, invoice.id, keeps_issue_date.clone())
            .await
            .unwrap_err();
        let ServiceError::Validation(errors) = err else {
            panic!("expected validation error");
        };
        assert!(errors.get("due_date").is_some());

        keeps_issue_date.due_date = NaiveDate::from_ymd_opt(2025, 2, 1);
        let updated = InvoiceService::update(&db.pool, invoice.id, keeps_issue_date).await.unwrap();
        assert_eq!(updated.issue_date, NaiveDate::from_ymd_opt(2025, 2, 1).unwrap());
    }

    #[tokio::test]
    async fn numbering_survives_large_sequence_numbers() {
        let (db, contact) = setup().await;
        let mut oversized = payload(contact.id);
        oversized.number = Some("INV-2025-4294967295".to_string());
        let err = InvoiceService::create(&db.pool, oversized, 30).await.unwrap_err();
        assert!(matches!(err, ServiceError::Validation(ref errors) if errors.get("number").is_some()));

        let mut largest = payload(contact.id);
        largest.number = Some("INV-2025-999999999".to_string());
        InvoiceService::create(&db.pool, largest, 30).await.unwrap();
        let next = InvoiceService::create(&db.pool, payload(contact.id), 30).await.unwrap();
        assert_eq!(next.number, "INV-2025-1000000000");
    }

    #[tokio::test]
    async fn exhausted_sequence_is_a_number_conflict() {
        let (db, contact) = setup().await;
        let record = InvoiceRecord {
            number: "INV-2025-18446744073709551615",
            contact_id: contact.id,
            estimate_id: None,
            issue_date: NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
            due_date: None,
            currency: "EUR",
            notes: None,
            totals: Default::default(),
        };
        Invoice::create(&db.pool, Uuid::new_v4(), &record).await.unwrap();

        let err = InvoiceService::create(&db.pool, payload(contact.id), 30).await.unwrap_err();
        assert!(matches!(err, ServiceError::Conflict { ref field, .. } if field == "number"));
    }

    #[tokio::test]
    async fn paid_invoices_are_frozen() {
        let (db, contact) = setup().await;
        let invoice = InvoiceService::create(&db.pool, payload(contact.id), 30).await.unwrap();
        for status in [InvoiceStatus::Sent, InvoiceStatus::Paid] {
            InvoiceService::change_status(
                &db.pool,
                invoice.id,
                InvoiceStatusChange { status, confirmed: false },
            )
            .await
            .unwrap();
        }

        let err = InvoiceService::update(&db.pool, invoice.id, payload(contact.id))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Conflict { ref field, .. } if field == "status"));
        let err = InvoiceService::delete(&db.pool, invoice.id).await.unwrap_err();
        assert!(matches!(err, ServiceError::Conflict { .. }));
    }

    #[tokio::test]
    async fn cancelling_requires_confirmation() {
        let (db, contact) = setup().await;
        let invoice = InvoiceService::create(&db.pool, payload(contact.id), 30).await.unwrap();
        let change = |confirmed| InvoiceStatusChange {
            status: InvoiceStatus::Cancelled,
            confirmed,
        };

        let err = InvoiceService::change_status(&db.pool, invoice.id, change(false))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::ConfirmationRequired { .. }));

        let cancelled = InvoiceService::change_status(&db.pool, invoice.id, change(true))
            .await
            .unwrap();
        assert_eq!(cancelled.status, InvoiceStatus::Cancelled);
        InvoiceService::delete(&db.pool, invoice.id).await.unwrap();
    }

    #[tokio::test]
    async fn share_links_hide_drafts_and_can_be_revoked() {
        let (db, contact) = setup().await;
        let invoice = InvoiceService::create(&db.pool, payload(contact.id), 30).await.unwrap();

        let link = InvoiceService::share(&db.pool, invoice.id, "https://office.test").await.unwrap();
        let again = InvoiceService::share(&db.pool, invoice.id, "https://office.test").await.unwrap();
        assert_eq!(link, again);
        assert!(link.url.ends_with(&link.token));

        assert!(matches!(
            InvoiceService::public_view(&db.pool, &link.token).await,
            Err(ServiceError::NotFound(_))
        ));

        InvoiceService::change_status(
            &db.pool,
            invoice.id,
            InvoiceStatusChange { status: InvoiceStatus::Sent, confirmed: false },
        )
        .await
        .unwrap();
        let public = InvoiceService::public_view(&db.pool, &link.token).await.unwrap();
        assert_eq!(public.customer_name, "Umbrella Corp");
        assert_eq!(public.total, 278.3);
        assert_eq!(public.items.len(), 2);

        InvoiceService::unshare(&db.pool, invoice.id).await.unwrap();
        assert!(InvoiceService::public_view(&db.pool, &link.token).await.is_err());
    }

    #[tokio::test]
    async fn overdue_marking_only_touches_sent_invoices_past_due() {
        let (db, contact) = setup().await;
        let sent = InvoiceService::create(&db.pool, payload(contact.id), 10).await.unwrap();
        InvoiceService::create(&db.pool, payload(contact.id), 10).await.unwrap();
        InvoiceService::change_status(
            &db.pool,
            sent.id,
            InvoiceStatusChange { status: InvoiceStatus::Sent, confirmed: false },
        )
        .await
        .unwrap();

        let marked = InvoiceService::mark_overdue(&db.pool, NaiveDate::from_ymd_opt(2025, 3, 1).unwrap())
            .await
            .unwrap();
        assert_eq!(marked.len(), 1);
        assert_eq!(marked[0].id, sent.id);
        assert_eq!(marked[0].status, InvoiceStatus::Overdue);
    }
}
