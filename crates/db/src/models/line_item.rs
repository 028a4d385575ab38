//! Line items shared by invoices (`invoice_items`) and estimates (`estimate_items`).

use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqliteConnection, SqlitePool};
use ts_rs::TS;
use utils::{
    totals::{LineItemValues, round_money},
    validation::{FieldErrors, Validate},
};
use uuid::Uuid;

/// Which document table a line item belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    Invoice,
    Estimate,
}

impl DocumentKind {
    fn items_table(self) -> &'static str {
        match self {
            DocumentKind::Invoice => "invoice_items",
            DocumentKind::Estimate => "estimate_items",
        }
    }

    pub fn documents_table(self) -> &'static str {
        match self {
            DocumentKind::Invoice => "invoices",
            DocumentKind::Estimate => "estimates",
        }
    }
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, PartialEq, TS)]
pub struct LineItem {
    pub id: Uuid,
    pub document_id: Uuid,
    pub product_id: Option<Uuid>,
    pub position: i64,
    pub description: String,
    pub quantity: f64,
    pub unit_price: f64,
    pub discount_percent: f64,
    pub vat_rate: f64,
    pub line_subtotal: f64,
    pub line_discount: f64,
    pub line_vat: f64,
    pub line_total: f64,
}

impl LineItemValues for LineItem {
    fn quantity(&self) -> f64 {
        self.quantity
    }
    fn unit_price(&self) -> f64 {
        self.unit_price
    }
    fn discount_percent(&self) -> f64 {
        self.discount_percent
    }
    fn vat_rate(&self) -> f64 {
        self.vat_rate
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, TS)]
pub struct LineItemInput {
    pub product_id: Option<Uuid>,
    pub description: String,
    pub quantity: f64,
    pub unit_price: f64,
    #[serde(default)]
    pub discount_percent: f64,
    #[serde(default)]
    pub vat_rate: f64,
}

impl LineItemInput {
    pub fn normalized(self) -> Self {
        Self {
            description: self.description.trim().to_string(),
            unit_price: round_money(self.unit_price),
            ..self
        }
    }
}

impl From<&LineItem> for LineItemInput {
    fn from(item: &LineItem) -> Self {
        Self {
            product_id: item.product_id,
            description: item.description.clone(),
            quantity: item.quantity,
            unit_price: item.unit_price,
            discount_percent: item.discount_percent,
            vat_rate: item.vat_rate,
        }
    }
}

impl LineItemValues for LineItemInput {
    fn quantity(&self) -> f64 {
        self.quantity
    }
    fn unit_price(&self) -> f64 {
        self.unit_price
    }
    fn discount_percent(&self) -> f64 {
        self.discount_percent
    }
    fn vat_rate(&self) -> f64 {
        self.vat_rate
    }
}

impl Validate for LineItemInput {
    fn validate(&self) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();
        errors.required("description", &self.description);
        errors.positive("quantity", self.quantity);
        errors.non_negative("unit_price", self.unit_price);
        errors.percent("discount_percent", self.discount_percent);
        errors.percent("vat_rate", self.vat_rate);
        errors.into_result()
    }
}

/// Validates every line, reporting errors as `items.<index>.<field>`.
pub fn validate_items(items: &[LineItemInput], errors: &mut FieldErrors) {
    for (index, item) in items.iter().enumerate() {
        if let Err(item_errors) = item.validate() {
            errors.merge_nested("items", index, item_errors);
        }
    }
}

impl LineItem {
    pub async fn find_by_document(
        pool: &SqlitePool,
        kind: DocumentKind,
        document_id: Uuid,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let sql = format!(
            "SELECT * FROM {} WHERE document_id = $1 ORDER BY position ASC",
            kind.items_table()
        );
        sqlx::query_as::<_, LineItem>(&sql)
            .bind(document_id)
            .fetch_all(pool)
            .await
    }

    /// Replaces all items of a document. Call inside the transaction that
    /// writes the document itself.
    pub async fn replace_all(
        conn: &mut SqliteConnection,
        kind: DocumentKind,
        document_id: Uuid,
        items: &[LineItemInput],
    ) -> Result<Vec<Self>, sqlx::Error> {
        let delete_sql = format!("DELETE FROM {} WHERE document_id = $1", kind.items_table());
        sqlx::query(&delete_sql)
            .bind(document_id)
            .execute(&mut *conn)
            .await?;

        let insert_sql = format!(
            r#"INSERT INTO {} (id, document_id, product_id, position, description, quantity, unit_price,
                              discount_percent, vat_rate, line_subtotal, line_discount, line_vat, line_total)
               VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
               RETURNING *"#,
            kind.items_table()
        );

        let mut stored = Vec::with_capacity(items.len());
        for (position, item) in items.iter().enumerate() {
            let amounts = item.amounts();
            let row = sqlx::query_as::<_, LineItem>(&insert_sql)
                .bind(Uuid::new_v4())
                .bind(document_id)
                .bind(item.product_id)
                .bind(position as i64)
                .bind(&item.description)
                .bind(item.quantity)
                .bind(item.unit_price)
                .bind(item.discount_percent)
                .bind(item.vat_rate)
                .bind(amounts.subtotal)
                .bind(amounts.discount)
                .bind(amounts.vat)
                .bind(amounts.total)
                .fetch_one(&mut *conn)
                .await?;
            stored.push(row);
        }
        Ok(stored)
    }

    /// Removes items whose parent document no longer exists.
    pub async fn delete_orphans(pool: &SqlitePool, kind: DocumentKind) -> Result<u64, sqlx::Error> {
        let sql = format!(
            "DELETE FROM {items} WHERE document_id NOT IN (SELECT id FROM {docs})",
            items = kind.items_table(),
            docs = kind.documents_table()
        );
        let result = sqlx::query(&sql).execute(pool).await?;
        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(description: &str, quantity: f64) -> LineItemInput {
        LineItemInput {
            product_id: None,
            description: description.to_string(),
            quantity,
            unit_price: 10.0,
            discount_percent: 0.0,
            vat_rate: 21.0,
        }
    }

    #[test]
    fn nested_validation_errors_use_item_index() {
        let items = vec![input("Consulting", 2.0), input("", 0.0)];
        let mut errors = FieldErrors::new();
        validate_items(&items, &mut errors);
        assert_eq!(errors.get("items.1.description"), Some("is required"));
        assert_eq!(errors.get("items.1.quantity"), Some("must be greater than zero"));
        assert!(errors.get("items.0.description").is_none());
    }

    #[test]
    fn amounts_follow_inputs() {
        let amounts = input("Hours", 3.0).amounts();
        assert_eq!(amounts.subtotal, 30.0);
        assert_eq!(amounts.vat, 6.3);
        assert_eq!(amounts.total, 36.3);
    }
}
