//! Estimate lifecycle: CRUD, status workflow, conversion into an invoice and
//! customer responses through share links.

use chrono::{Datelike, Duration, NaiveDate};
use db::{
    is_unique_violation,
    models::{
        activity_log::{ActivityAction, ActivityLog, EntityType},
        contact::Contact,
        estimate::{
            Estimate, EstimateConversion, EstimatePayload, EstimateQuery, EstimateRecord,
            EstimateStatus, EstimateStatusChange, EstimateWithItems, PublicEstimate,
        },
        invoice::{Invoice, InvoiceRecord, InvoiceWithItems},
        line_item::{DocumentKind, LineItem, LineItemInput},
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

/// Customer decision submitted through a share link
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublicResponse {
    Accept,
    Reject,
}

impl PublicResponse {
    fn status(self) -> EstimateStatus {
        match self {
            PublicResponse::Accept => EstimateStatus::Accepted,
            PublicResponse::Reject => EstimateStatus::Rejected,
        }
    }

    fn action(self) -> ActivityAction {
        match self {
            PublicResponse::Accept => ActivityAction::Accepted,
            PublicResponse::Reject => ActivityAction::Rejected,
        }
    }
}

pub struct EstimateService;

impl EstimateService {
    pub async fn list(pool: &SqlitePool, query: &EstimateQuery) -> Result<Vec<Estimate>, ServiceError> {
        Ok(Estimate::find_all(pool, query).await?)
    }

    pub async fn get(pool: &SqlitePool, id: Uuid) -> Result<EstimateWithItems, ServiceError> {
        let estimate = Self::find(pool, id).await?;
        Ok(estimate.with_items(pool).await?)
    }

    /// Creates an estimate; `valid_until` defaults to `validity_days` after the issue date.
    pub async fn create(
        pool: &SqlitePool,
        payload: EstimatePayload,
        validity_days: i64,
    ) -> Result<EstimateWithItems, ServiceError> {
        let payload = payload.normalized();
        payload.validate()?;
        check_references(pool, payload.contact_id, &payload.items).await?;
        if let Some(number) = &payload.number {
            Self::ensure_number_free(pool, number, None).await?;
        }

        let issue_date = payload.issue_date.unwrap_or_else(today);
        let valid_until = payload
            .valid_until
            .or_else(|| Some(issue_date + Duration::days(validity_days)));
        check_date_order("valid_until", issue_date, valid_until)?;

        let mut tx = pool.begin().await?;
        let number = match &payload.number {
            Some(number) => number.clone(),
            None => next_number(&mut *tx, DocumentKind::Estimate, issue_date.year())
                .await?
                .ok_or_else(sequence_exhausted)?,
        };
        let record = EstimateRecord {
            number: &number,
            contact_id: payload.contact_id,
            issue_date,
            valid_until,
            currency: payload.currency.as_deref().unwrap_or(DEFAULT_CURRENCY),
            notes: payload.notes.as_deref(),
            totals: document_totals(&payload.items),
        };
        let estimate = Estimate::create(&mut *tx, Uuid::new_v4(), &record)
            .await
            .map_err(map_unique)?;
        let items = LineItem::replace_all(&mut tx, DocumentKind::Estimate, estimate.id, &payload.items).await?;
        ActivityLog::create(
            &mut *tx,
            EntityType::Estimate,
            estimate.id,
            ActivityAction::Created,
            Some(format!("Estimate {} created ({:.2} {})", estimate.number, estimate.total, estimate.currency)),
        )
        .await?;
        tx.commit().await?;

        info!(estimate_id = %estimate.id, number = %estimate.number, total = estimate.total, "Estimate created");
        Ok(EstimateWithItems { estimate, items })
    }

    pub async fn update(
        pool: &SqlitePool,
        id: Uuid,
        payload: EstimatePayload,
    ) -> Result<EstimateWithItems, ServiceError> {
        let existing = Self::find(pool, id).await?;
        if !existing.status.is_editable() {
            return Err(ServiceError::conflict(
                "status",
                format!("{} estimates cannot be edited", existing.status),
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
        check_date_order("valid_until", issue_date, payload.valid_until)?;

        let record = EstimateRecord {
            number: &number,
            contact_id: payload.contact_id,
            issue_date,
            valid_until: payload.valid_until,
            currency: payload.currency.as_deref().unwrap_or(&existing.currency),
            notes: payload.notes.as_deref(),
            totals: document_totals(&payload.items),
        };

        let mut tx = pool.begin().await?;
        let estimate = Estimate::update(&mut *tx, id, &record).await.map_err(map_unique)?;
        let items = LineItem::replace_all(&mut tx, DocumentKind::Estimate, id, &payload.items).await?;
        ActivityLog::create(
            &mut *tx,
            EntityType::Estimate,
            id,
            ActivityAction::Updated,
            Some(format!("Estimate {} updated", estimate.number)),
        )
        .await?;
        tx.commit().await?;

        Ok(EstimateWithItems { estimate, items })
    }

    /// Converted estimates stay as the record behind their invoice.
    pub async fn delete(pool: &SqlitePool, id: Uuid) -> Result<(), ServiceError> {
        let estimate = Self::find(pool, id).await?;
        if estimate.status == EstimateStatus::Converted {
            return Err(ServiceError::conflict(
                "status",
                "converted estimates cannot be deleted",
            ));
        }

        let mut tx = pool.begin().await?;
        Estimate::delete(&mut *tx, id).await?;
        ActivityLog::create(
            &mut *tx,
            EntityType::Estimate,
            id,
            ActivityAction::Deleted,
            Some(format!("Estimate {} deleted", estimate.number)),
        )
        .await?;
        tx.commit().await?;

        info!(estimate_id = %id, "Estimate deleted");
        Ok(())
    }

    pub async fn change_status(
        pool: &SqlitePool,
        id: Uuid,
        change: EstimateStatusChange,
    ) -> Result<Estimate, ServiceError> {
        let estimate = Self::find(pool, id).await?;
        status_workflow::check(estimate.status, change.status, change.confirmed)?;

        let mut tx = pool.begin().await?;
        let updated = Estimate::update_status(&mut *tx, id, change.status).await?;
        ActivityLog::create(
            &mut *tx,
            EntityType::Estimate,
            id,
            ActivityAction::StatusChanged,
            Some(format!(
                "Estimate {} moved from {} to {}",
                estimate.number, estimate.status, updated.status
            )),
        )
        .await?;
        tx.commit().await?;

        info!(estimate_id = %id, from = %estimate.status, to = %updated.status, "Estimate status changed");
        Ok(updated)
    }

    /// Turns the estimate into a new draft invoice with the same contact,
    /// currency, notes and lines. Both writes share one transaction.
    pub async fn convert_to_invoice(
        pool: &SqlitePool,
        id: Uuid,
        payment_terms_days: i64,
    ) -> Result<EstimateConversion, ServiceError> {
        let EstimateWithItems { estimate, items } = Self::get(pool, id).await?;
        if !estimate.status.is_convertible() {
            return Err(ServiceError::conflict(
                "status",
                format!("{} estimates cannot be converted", estimate.status),
            ));
        }

        let inputs: Vec<LineItemInput> = items.iter().map(LineItemInput::from).collect();
        let issue_date = today();

        let mut tx = pool.begin().await?;
        let number = next_number(&mut *tx, DocumentKind::Invoice, issue_date.year())
            .await?
            .ok_or_else(sequence_exhausted)?;
        let record = InvoiceRecord {
            number: &number,
            contact_id: estimate.contact_id,
            estimate_id: Some(estimate.id),
            issue_date,
            due_date: Some(issue_date + Duration::days(payment_terms_days)),
            currency: &estimate.currency,
            notes: estimate.notes.as_deref(),
            totals: document_totals(&inputs),
        };
        let invoice = Invoice::create(&mut *tx, Uuid::new_v4(), &record).await?;
        let invoice_items = LineItem::replace_all(&mut tx, DocumentKind::Invoice, invoice.id, &inputs).await?;
        let converted = Estimate::mark_converted(&mut *tx, estimate.id, invoice.id).await?;

        ActivityLog::create(
            &mut *tx,
            EntityType::Estimate,
            estimate.id,
            ActivityAction::Converted,
            Some(format!("Estimate {} converted into invoice {}", estimate.number, invoice.number)),
        )
        .await?;
        ActivityLog::create(
            &mut *tx,
            EntityType::Invoice,
            invoice.id,
            ActivityAction::Created,
            Some(format!("Invoice {} created from estimate {}", invoice.number, estimate.number)),
        )
        .await?;
        tx.commit().await?;

        info!(estimate_id = %estimate.id, invoice_id = %invoice.id, "Estimate converted to invoice");
        Ok(EstimateConversion {
            estimate: converted,
            invoice: InvoiceWithItems {
                invoice,
                items: invoice_items,
            },
        })
    }

    /// Returns the existing link when the estimate is already shared.
    pub async fn share(pool: &SqlitePool, id: Uuid, public_base_url: &str) -> Result<ShareLink, ServiceError> {
        let estimate = Self::find(pool, id).await?;
        if let Some(token) = estimate.share_token {
            return Ok(ShareLink::new(public_base_url, "estimates", token));
        }

        let token = share_token::generate();
        Estimate::set_share_token(pool, id, Some(&token)).await?;
        ActivityLog::create(
            pool,
            EntityType::Estimate,
            id,
            ActivityAction::Shared,
            Some(format!("Share link created for estimate {}", estimate.number)),
        )
        .await?;
        Ok(ShareLink::new(public_base_url, "estimates", token))
    }

    pub async fn unshare(pool: &SqlitePool, id: Uuid) -> Result<Estimate, ServiceError> {
        let estimate = Self::find(pool, id).await?;
        if estimate.share_token.is_none() {
            return Ok(estimate);
        }
        let updated = Estimate::set_share_token(pool, id, None).await?;
        ActivityLog::create(
            pool,
            EntityType::Estimate,
            id,
            ActivityAction::Unshared,
            Some(format!("Share link revoked for estimate {}", estimate.number)),
        )
        .await?;
        Ok(updated)
    }

    pub async fn public_view(pool: &SqlitePool, token: &str, today: NaiveDate) -> Result<PublicEstimate, ServiceError> {
        let estimate = Self::find_shared(pool, token).await?;
        Self::public_from(pool, estimate, today).await
    }

    /// Accept or reject on behalf of the customer. Only sent estimates that
    /// have not lapsed accept a response.
    pub async fn respond_public(
        pool: &SqlitePool,
        token: &str,
        response: PublicResponse,
        today: NaiveDate,
    ) -> Result<PublicEstimate, ServiceError> {
        let estimate = Self::find_shared(pool, token).await?;
        if !can_respond(&estimate, today) {
            return Err(ServiceError::conflict(
                "status",
                "this estimate can no longer be accepted or rejected",
            ));
        }

        let mut tx = pool.begin().await?;
        let updated = Estimate::update_status(&mut *tx, estimate.id, response.status()).await?;
        ActivityLog::create(
            &mut *tx,
            EntityType::Estimate,
            estimate.id,
            response.action(),
            Some(format!("Estimate {} {} by the customer", estimate.number, updated.status)),
        )
        .await?;
        tx.commit().await?;

        info!(estimate_id = %estimate.id, status = %updated.status, "Customer responded to estimate");
        Self::public_from(pool, updated, today).await
    }

    /// Moves sent estimates past their `valid_until` to expired.
    pub async fn expire_lapsed(pool: &SqlitePool, today: NaiveDate) -> Result<Vec<Estimate>, ServiceError> {
        let candidates = Estimate::find_lapsed(pool, today).await?;
        let mut expired = Vec::with_capacity(candidates.len());

        for estimate in candidates {
            debug!(estimate_id = %estimate.id, valid_until = ?estimate.valid_until, "Expiring estimate");
            let mut tx = pool.begin().await?;
            let updated = Estimate::update_status(&mut *tx, estimate.id, EstimateStatus::Expired).await?;
            ActivityLog::create(
                &mut *tx,
                EntityType::Estimate,
                estimate.id,
                ActivityAction::Expired,
                Some(format!("Estimate {} passed its validity date", estimate.number)),
            )
            .await?;
            tx.commit().await?;
            expired.push(updated);
        }

        Ok(expired)
    }

    async fn find(pool: &SqlitePool, id: Uuid) -> Result<Estimate, ServiceError> {
        Estimate::find_by_id(pool, id)
            .await?
            .ok_or(ServiceError::NotFound("estimate"))
    }

    async fn find_shared(pool: &SqlitePool, token: &str) -> Result<Estimate, ServiceError> {
        if !share_token::looks_valid(token) {
            return Err(ServiceError::NotFound("estimate"));
        }
        Estimate::find_by_share_token(pool, token)
            .await?
            .filter(|estimate| estimate.status != EstimateStatus::Draft)
            .ok_or(ServiceError::NotFound("estimate"))
    }

    async fn public_from(pool: &SqlitePool, estimate: Estimate, today: NaiveDate) -> Result<PublicEstimate, ServiceError> {
        let contact = Contact::find_by_id(pool, estimate.contact_id)
            .await?
            .ok_or(ServiceError::NotFound("contact"))?;
        let items = LineItem::find_by_document(pool, DocumentKind::Estimate, estimate.id).await?;
        let can_respond = can_respond(&estimate, today);

        Ok(PublicEstimate {
            number: estimate.number,
            status: estimate.status,
            issue_date: estimate.issue_date,
            valid_until: estimate.valid_until,
            currency: estimate.currency,
            notes: estimate.notes,
            customer_name: contact.name,
            customer_company: contact.company,
            subtotal: estimate.subtotal,
            discount_total: estimate.discount_total,
            vat_total: estimate.vat_total,
            total: estimate.total,
            items,
            can_respond,
        })
    }

    async fn ensure_number_free(pool: &SqlitePool, number: &str, own_id: Option<Uuid>) -> Result<(), ServiceError> {
        match Estimate::find_by_number(pool, number).await? {
            Some(existing) if Some(existing.id) != own_id => Err(ServiceError::conflict(
                "number",
                "an estimate with this number already exists",
            )),
            _ => Ok(()),
        }
    }
}

fn can_respond(estimate: &Estimate, today: NaiveDate) -> bool {
    estimate.status == EstimateStatus::Sent && estimate.valid_until.is_none_or(|until| until >= today)
}

fn map_unique(err: sqlx::Error) -> ServiceError {
    if is_unique_violation(&err) {
        ServiceError::conflict("number", "an estimate with this number already exists")
    } else {
        ServiceError::Database(err)
    }
}
