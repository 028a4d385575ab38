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
#[sqlx(type_name = "estimate_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum EstimateStatus {
    #[default]
    Draft,
    Sent,
    Accepted,
    Rejected,
    Expired,
    Converted,
}

impl EstimateStatus {
    pub fn is_editable(self) -> bool {
        matches!(self, EstimateStatus::Draft | EstimateStatus::Sent)
    }

    pub fn is_convertible(self) -> bool {
        matches!(
            self,
            EstimateStatus::Draft | EstimateStatus::Sent | EstimateStatus::Accepted
        )
    }
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, PartialEq, TS)]
pub struct Estimate {
    pub id: Uuid,
    pub number: String,
    pub contact_id: Uuid,
    pub status: EstimateStatus,
    pub issue_date: NaiveDate,
    pub valid_until: Option<NaiveDate>,
    pub currency: String,
    pub notes: Option<String>,
    pub subtotal: f64,
    pub discount_total: f64,
    pub vat_total: f64,
    pub total: f64,
    pub share_token: Option<String>,
    pub converted_invoice_id: Option<Uuid>,
    pub sent_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct EstimateWithItems {
    #[serde(flatten)]
    #[ts(flatten)]
    pub estimate: Estimate,
    pub items: Vec<LineItem>,
}

impl std::ops::Deref for EstimateWithItems {
    type Target = Estimate;
    fn deref(&self) -> &Self::Target {
        &self.estimate
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, TS)]
pub struct EstimatePayload {
    /// Generated as `EST-<year>-<seq>` when absent
    pub number: Option<String>,
    pub contact_id: Uuid,
    pub issue_date: Option<NaiveDate>,
    pub valid_until: Option<NaiveDate>,
    pub currency: Option<String>,
    pub notes: Option<String>,
    #[serde(default)]
    pub items: Vec<LineItemInput>,
}

impl Normalize for EstimatePayload {
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

impl Validate for EstimatePayload {
    fn validate(&self) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();
        if let Some(number) = &self.number {
            errors.max_len("number", number, 32);
            if is_oversized_sequence(DocumentKind::Estimate, number) {
                errors.add("number", "sequence part must have at most 9 digits");
            }
        }
        if let Some(currency) = &self.currency {
            errors.currency("currency", currency);
        }
        if let (Some(issue), Some(valid_until)) = (self.issue_date, self.valid_until) {
            if valid_until < issue {
                errors.add("valid_until", "must not be before the issue date");
            }
        }
        validate_items(&self.items, &mut errors);
        errors.into_result()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct EstimateStatusChange {
    pub status: EstimateStatus,
    #[serde(default)]
    pub confirmed: bool,
}

/// Result of turning an estimate into an invoice
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct EstimateConversion {
    pub estimate: Estimate,
    pub invoice: super::invoice::InvoiceWithItems,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, TS)]
pub struct EstimateQuery {
    pub status: Option<EstimateStatus>,
    pub contact_id: Option<Uuid>,
}

pub struct EstimateRecord<'a> {
    pub number: &'a str,
    pub contact_id: Uuid,
    pub issue_date: NaiveDate,
    pub valid_until: Option<NaiveDate>,
    pub currency: &'a str,
    pub notes: Option<&'a str>,
    pub totals: DocumentTotals,
}

impl Estimate {
    pub async fn find_all(pool: &SqlitePool, query: &EstimateQuery) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Estimate>(
            r#"SELECT * FROM estimates
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
        sqlx::query_as::<_, Estimate>("SELECT * FROM estimates WHERE id = $1")
            .bind(id)
            .fetch_optional(executor)
            .await
    }

    pub async fn find_by_number(pool: &SqlitePool, number: &str) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Estimate>("SELECT * FROM estimates WHERE number = $1")
            .bind(number)
            .fetch_optional(pool)
            .await
    }

    pub async fn find_by_share_token(pool: &SqlitePool, token: &str) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Estimate>("SELECT * FROM estimates WHERE share_token = $1")
            .bind(token)
            .fetch_optional(pool)
            .await
    }

    /// Sent estimates whose validity ended before `today`
    pub async fn find_lapsed(pool: &SqlitePool, today: NaiveDate) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Estimate>(
            r#"SELECT * FROM estimates
               WHERE status = 'sent'
                 AND valid_until IS NOT NULL
                 AND valid_until < $1
               ORDER BY valid_until ASC"#,
        )
        .bind(today)
        .fetch_all(pool)
        .await
    }

    pub async fn with_items(self, pool: &SqlitePool) -> Result<EstimateWithItems, sqlx::Error> {
        let items = LineItem::find_by_document(pool, DocumentKind::Estimate, self.id).await?;
        Ok(EstimateWithItems { estimate: self, items })
    }

    pub async fn create<'e, E>(executor: E, id: Uuid, record: &EstimateRecord<'_>) -> Result<Self, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_as::<_, Estimate>(
            r#"INSERT INTO estimates (id, number, contact_id, issue_date, valid_until, currency, notes,
                                      subtotal, discount_total, vat_total, total)
               VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
               RETURNING *"#,
        )
        .bind(id)
        .bind(record.number)
        .bind(record.contact_id)
        .bind(record.issue_date)
        .bind(record.valid_until)
        .bind(record.currency)
        .bind(record.notes)
        .bind(record.totals.subtotal)
        .bind(record.totals.discount_total)
        .bind(record.totals.vat_total)
        .bind(record.totals.total)
        .fetch_one(executor)
        .await
    }

    pub async fn update<'e, E>(executor: E, id: Uuid, record: &EstimateRecord<'_>) -> Result<Self, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_as::<_, Estimate>(
            r#"UPDATE estimates
               SET number = $2, contact_id = $3, issue_date = $4, valid_until = $5, currency = $6, notes = $7,
                   subtotal = $8, discount_total = $9, vat_total = $10, total = $11,
                   updated_at = datetime('now', 'subsec')
               WHERE id = $1
               RETURNING *"#,
        )
        .bind(id)
        .bind(record.number)
        .bind(record.contact_id)
        .bind(record.issue_date)
        .bind(record.valid_until)
        .bind(record.currency)
        .bind(record.notes)
        .bind(record.totals.subtotal)
        .bind(record.totals.discount_total)
        .bind(record.totals.vat_total)
        .bind(record.totals.total)
        .fetch_one(executor)
        .await
    }

    pub async fn update_status<'e, E>(executor: E, id: Uuid, status: EstimateStatus) -> Result<Self, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_as::<_, Estimate>(
            r#"UPDATE estimates
               SET status = $2,
                   sent_at = CASE WHEN $2 = 'sent' AND sent_at IS NULL THEN datetime('now', 'subsec') ELSE sent_at END,
                   updated_at = datetime('now', 'subsec')
               WHERE id = $1
               RETURNING *"#,
        )
        .bind(id)
        .bind(status)
        .fetch_one(executor)
        .await
    }

    pub async fn mark_converted<'e, E>(executor: E, id: Uuid, invoice_id: Uuid) -> Result<Self, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_as::<_, Estimate>(
            r#"UPDATE estimates
               SET status = 'converted', converted_invoice_id = $2, updated_at = datetime('now', 'subsec')
               WHERE id = $1
               RETURNING *"#,
        )
        .bind(id)
        .bind(invoice_id)
        .fetch_one(executor)
        .await
    }

    pub async fn set_share_token(
        pool: &SqlitePool,
        id: Uuid,
        token: Option<&str>,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Estimate>(
            r#"UPDATE estimates
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
        let result = sqlx::query("DELETE FROM estimates WHERE id = $1")
            .bind(id)
            .execute(executor)
            .await?;
        Ok(result.rows_affected())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
pub struct PublicEstimate {
    pub number: String,
    pub status: EstimateStatus,
    pub issue_date: NaiveDate,
    pub valid_until: Option<NaiveDate>,
    pub currency: String,
    pub notes: Option<String>,
    pub customer_name: String,
    pub customer_company: Option<String>,
    pub subtotal: f64,
    pub discount_total: f64,
    pub vat_total: f64,
    pub total: f64,
    pub items: Vec<LineItem>,
    /// Whether the customer may still accept or reject
    pub can_respond: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        DBService,
        models::contact::{Contact, ContactPayload},
    };

    #[test]
    fn convertible_states() {
        assert!(EstimateStatus::Accepted.is_convertible());
        assert!(!EstimateStatus::Rejected.is_convertible());
        assert!(!EstimateStatus::Converted.is_convertible());
        assert!(!EstimateStatus::Accepted.is_editable());
    }

    #[tokio::test]
    async fn lapsed_estimates_and_conversion_marker() {
        let db = DBService::new_in_memory().await.unwrap();
        let contact = Contact::create(
            &db.pool,
            &ContactPayload {
                name: "Globex".to_string(),
                ..Default::default()
            },
            Uuid::new_v4(),
        )
        .await
        .unwrap();

        let record = EstimateRecord {
            number: "EST-2025-0001",
            contact_id: contact.id,
            issue_date: NaiveDate::from_ymd_opt(2025, 4, 1).unwrap(),
            valid_until: NaiveDate::from_ymd_opt(2025, 4, 30),
            currency: "EUR",
            notes: Some("Spring campaign"),
            totals: DocumentTotals::default(),
        };
        let estimate = Estimate::create(&db.pool, Uuid::new_v4(), &record).await.unwrap();
        Estimate::update_status(&db.pool, estimate.id, EstimateStatus::Sent).await.unwrap();

        let before = NaiveDate::from_ymd_opt(2025, 4, 30).unwrap();
        assert!(Estimate::find_lapsed(&db.pool, before).await.unwrap().is_empty());
        let after = NaiveDate::from_ymd_opt(2025, 5, 1).unwrap();
        assert_eq!(Estimate::find_lapsed(&db.pool, after).await.unwrap().len(), 1);

        let token = utils::share_token::generate();
        Estimate::set_share_token(&db.pool, estimate.id, Some(&token)).await.unwrap();
        let shared = Estimate::find_by_share_token(&db.pool, &token).await.unwrap().unwrap();
        assert_eq!(shared.id, estimate.id);
        assert_eq!(shared.notes.as_deref(), Some("Spring campaign"));
    }
}
