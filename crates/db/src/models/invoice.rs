use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Executor, FromRow, Sqlite, SqlitePool, Type};
use strum_macros::{Display, EnumString};
use ts_rs::TS;
use utils::{
    totals::DocumentTotals,
    validation::{FieldErrors, Normalize, Validate, non_blank},
};
use uuid::Uuid;

use super::{
    line_item::{DocumentKind, LineItem, LineItemInput, validate_items},
    numbering::is_oversized_sequence,
};

#[derive(
    Debug, Clone, Copy, Type, Serialize, Deserialize, PartialEq, Eq, TS, EnumString, Display, Default,
)]
#[sqlx(type_name = "invoice_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum InvoiceStatus {
    #[default]
    Draft,
    Sent,
    Paid,
    Overdue,
    Cancelled,
}

impl InvoiceStatus {
    /// Paid and cancelled invoices are frozen
    pub fn is_editable(self) -> bool {
        !matches!(self, InvoiceStatus::Paid | InvoiceStatus::Cancelled)
    }

    pub fn is_deletable(self) -> bool {
        matches!(self, InvoiceStatus::Draft | InvoiceStatus::Cancelled)
    }
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, PartialEq, TS)]
pub struct Invoice {
    pub id: Uuid,
    pub number: String,
    pub contact_id: Uuid,
    pub estimate_id: Option<Uuid>, // Set when converted from an estimate
    pub status: InvoiceStatus,
    pub issue_date: NaiveDate,
    pub due_date: Option<NaiveDate>,
    pub currency: String,
    pub notes: Option<String>,
    pub subtotal: f64,
    pub discount_total: f64,
    pub vat_total: f64,
    pub total: f64,
    pub share_token: Option<String>,
    pub sent_at: Option<DateTime<Utc>>,
    pub paid_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct InvoiceWithItems {
    #[serde(flatten)]
    #[ts(flatten)]
    pub invoice: Invoice,
    pub items: Vec<LineItem>,
}

impl std::ops::Deref for InvoiceWithItems {
    type Target = Invoice;
    fn deref(&self) -> &Self::Target {
        &self.invoice
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, TS)]
pub struct InvoicePayload {
    /// Generated as `INV-<year>-<seq>` when absent
    pub number: Option<String>,
    pub contact_id: Uuid,
    pub issue_date: Option<NaiveDate>,
    pub due_date: Option<NaiveDate>,
    pub currency: Option<String>,
    pub notes: Option<String>,
    #[serde(default)]
    pub items: Vec<LineItemInput>,
}

impl Normalize for InvoicePayload {
    fn normalized(self) -> Self {
        Self {
            number: non_blank(self.number),
            currency: non_blank(self.currency).map(|c| c.to_uppercase()),
            notes: non_blank(self.notes),
            items: self.items.into_iter().map(LineItemInput::normalized).collect(),
            ..self
        }
    }
}

impl Validate for InvoicePayload {
    fn validate(&self) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();
        if let Some(number) = &self.number {
            errors.max_len("number", number, 32);
            if is_oversized_sequence(DocumentKind::Invoice, number) {
                errors.add("number", "sequence part must have at most 9 digits");
            }
        }
        if let Some(currency) = &self.currency {
            errors.currency("currency", currency);
        }
        if let (Some(issue), Some(due)) = (self.issue_date, self.due_date) {
            if due < issue {
                errors.add("due_date", "must not be before the issue date");
            }
        }
        validate_items(&self.items, &mut errors);
        errors.into_result()
    }
}

/// Body of `POST /invoices/{id}/status`
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct InvoiceStatusChange {
    pub status: InvoiceStatus,
    /// Set after the user confirmed a destructive transition
    #[serde(default)]
    pub confirmed: bool,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, TS)]
pub struct InvoiceQuery {
    pub status: Option<InvoiceStatus>,
    pub contact_id: Option<Uuid>,
}

/// Fields of a write, after defaults and totals are resolved
pub struct InvoiceRecord<'a> {
    pub number: &'a str,
    pub contact_id: Uuid,
    pub estimate_id: Option<Uuid>,
    pub issue_date: NaiveDate,
    pub due_date: Option<NaiveDate>,
    pub currency: &'a str,
    pub notes: Option<&'a str>,
    pub totals: DocumentTotals,
}

impl Invoice {
    pub async fn find_all(pool: &SqlitePool, query: &InvoiceQuery) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Invoice>(
            r#"SELECT * FROM invoices
               WHERE ($1 IS NULL OR status = $1)
                 AND ($2 IS NULL OR contact_id = $2)
               ORDER BY issue_date DESC, number DESC"#,
        )
        .bind(query.status)
        .bind(query.contact_id)
        .fetch_all(pool)
        .await
    }

    pub async fn find_by_id<'e, E>(executor: E, id: Uuid) -> Result<Option<Self>, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_as::<_, Invoice>("SELECT * FROM invoices WHERE id = $1")
            .bind(id)
            .fetch_optional(executor)
            .await
    }

    pub async fn find_by_number(pool: &SqlitePool, number: &str) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Invoice>("SELECT * FROM invoices WHERE number = $1")
            .bind(number)
            .fetch_optional(pool)
            .await
    }

    pub async fn find_by_share_token(pool: &SqlitePool, token: &str) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Invoice>("SELECT * FROM invoices WHERE share_token = $1")
            .bind(token)
            .fetch_optional(pool)
            .await
    }

    /// Sent invoices whose due date lies before `today`
    pub async fn find_past_due(pool: &SqlitePool, today: NaiveDate) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Invoice>(
            r#"SELECT * FROM invoices
               WHERE status = 'sent'
                 AND due_date IS NOT NULL
                 AND due_date < $1
               ORDER BY due_date ASC"#,
        )
        .bind(today)
        .fetch_all(pool)
        .await
    }

    pub async fn with_items(self, pool: &SqlitePool) -> Result<InvoiceWithItems, sqlx::Error> {
        let items =
            LineItem::find_by_document(pool, super::line_item::DocumentKind::Invoice, self.id).await?;
        Ok(InvoiceWithItems { invoice: self, items })
    }

    pub async fn create<'e, E>(executor: E, id: Uuid, record: &InvoiceRecord<'_>) -> Result<Self, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_as::<_, Invoice>(
            r#"INSERT INTO invoices (id, number, contact_id, estimate_id, issue_date, due_date, currency, notes,
                                     subtotal, discount_total, vat_total, total)
               VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
               RETURNING *"#,
        )
        .bind(id)
        .bind(record.number)
        .bind(record.contact_id)
        .bind(record.estimate_id)
        .bind(record.issue_date)
        .bind(record.due_date)
        .bind(record.currency)
        .bind(record.notes)
        .bind(record.totals.subtotal)
        .bind(record.totals.discount_total)
        .bind(record.totals.vat_total)
        .bind(record.totals.total)
        .fetch_one(executor)
        .await
    }

    pub async fn update<'e, E>(executor: E, id: Uuid, record: &InvoiceRecord<'_>) -> Result<Self, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_as::<_, Invoice>(
            r#"UPDATE invoices
               SET number = $2, contact_id = $3, issue_date = $4, due_date = $5, currency = $6, notes = $7,
                   subtotal = $8, discount_total = $9, vat_total = $10, total = $11,
                   updated_at = datetime('now', 'subsec')
               WHERE id = $1
               RETURNING *"#,
        )
        .bind(id)
        .bind(record.number)
        .bind(record.contact_id)
        .bind(record.issue_date)
        .bind(record.due_date)
        .bind(record.currency)
        .bind(record.notes)
        .bind(record.totals.subtotal)
        .bind(record.totals.discount_total)
        .bind(record.totals.vat_total)
        .bind(record.totals.total)
        .fetch_one(executor)
        .await
    }

    /// Moves to `status`, stamping `sent_at` on first send and keeping
    /// `paid_at` only while paid.
    pub async fn update_status<'e, E>(executor: E, id: Uuid, status: InvoiceStatus) -> Result<Self, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_as::<_, Invoice>(
            r#"UPDATE invoices
               SET status = $2,
                   sent_at = CASE WHEN $2 = 'sent' AND sent_at IS NULL THEN datetime('now', 'subsec') ELSE sent_at END,
                   paid_at = CASE WHEN $2 = 'paid' THEN coalesce(paid_at, datetime('now', 'subsec')) ELSE NULL END,
                   updated_at = datetime('now', 'subsec')
               WHERE id = $1
               RETURNING *"#,
        )
        .bind(id)
        .bind(status)
        .fetch_one(executor)
        .await
    }

    pub async fn set_share_token(
        pool: &SqlitePool,
        id: Uuid,
        token: Option<&str>,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Invoice>(
            r#"UPDATE invoices
               SET share_token = $2, updated_at = datetime('now', 'subsec')
               WHERE id = $1
               RETURNING *"#,
        )
        .bind(id)
        .bind(token)
        .fetch_one(pool)
        .await
    }

    pub async fn delete<'e, E>(executor: E, id: Uuid) -> Result<u64, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let result = sqlx::query("DELETE FROM invoices WHERE id = $1")
            .bind(id)
            .execute(executor)
            .await?;
        Ok(result.rows_affected())
    }
}

/// What a customer sees through a share link
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct PublicInvoice {
    pub number: String,
    pub status: InvoiceStatus,
    pub issue_date: NaiveDate,
    pub due_date: Option<NaiveDate>,
    pub currency: String,
    pub notes: Option<String>,
    pub customer_name: String,
    pub customer_company: Option<String>,
    pub subtotal: f64,
    pub discount_total: f64,
    pub vat_total: f64,
    pub total: f64,
    pub items: Vec<LineItem>,
}
