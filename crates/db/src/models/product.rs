use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Executor, FromRow, Sqlite, SqlitePool};
use ts_rs::TS;
use utils::validation::{FieldErrors, Normalize, Validate, non_blank};
use uuid::Uuid;

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, PartialEq, TS)]
pub struct Product {
    pub id: Uuid,
    pub name: String,
    pub sku: Option<String>,
    pub description: Option<String>,
    pub price: f64,
    pub vat_rate: f64,
    pub unit: Option<String>,
    pub stock_quantity: Option<i64>,
    pub active: bool,
    pub woocommerce_id: Option<i64>,
    pub woocommerce_synced_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, TS)]
pub struct ProductPayload {
    pub name: String,
    pub sku: Option<String>,
    pub description: Option<String>,
    pub price: f64,
    #[serde(default = "default_vat_rate")]
    pub vat_rate: f64,
    pub unit: Option<String>,
    pub stock_quantity: Option<i64>,
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_vat_rate() -> f64 {
    21.0
}

fn default_active() -> bool {
    true
}

impl Default for ProductPayload {
    fn default() -> Self {
        Self {
            name: String::new(),
            sku: None,
            description: None,
            price: 0.0,
            vat_rate: default_vat_rate(),
            unit: None,
            stock_quantity: None,
            active: true,
        }
    }
}

impl Normalize for ProductPayload {
    fn normalized(self) -> Self {
        Self {
            name: self.name.trim().to_string(),
            sku: non_blank(self.sku),
            description: non_blank(self.description),
            unit: non_blank(self.unit),
            price: utils::totals::round_money(self.price),
            ..self
        }
    }
}

impl Validate for ProductPayload {
    fn validate(&self) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();
        errors.required("name", &self.name);
        errors.max_len("name", &self.name, 200);
        if let Some(sku) = &self.sku {
            errors.max_len("sku", sku, 64);
        }
        errors.non_negative("price", self.price);
        errors.percent("vat_rate", self.vat_rate);
        if let Some(stock) = self.stock_quantity {
            errors.non_negative("stock_quantity", stock as f64);
        }
        errors.into_result()
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, TS)]
pub struct ProductQuery {
    pub active: Option<bool>,
}

impl Product {
    pub async fn find_all(pool: &SqlitePool, query: &ProductQuery) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Product>(
            r#"SELECT * FROM products
               WHERE ($1 IS NULL OR active = $1)
               ORDER BY name COLLATE NOCASE ASC"#,
        )
        .bind(query.active)
        .fetch_all(pool)
        .await
    }

    pub async fn find_by_id(pool: &SqlitePool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Product>("SELECT * FROM products WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn find_by_ids(pool: &SqlitePool, ids: &[Uuid]) -> Result<Vec<Self>, sqlx::Error> {
        let mut products = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(product) = Self::find_by_id(pool, *id).await? {
                products.push(product);
            }
        }
        Ok(products)
    }

    pub async fn find_by_sku(pool: &SqlitePool, sku: &str) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Product>("SELECT * FROM products WHERE sku = $1")
            .bind(sku)
            .fetch_optional(pool)
            .await
    }

    pub async fn create<'e, E>(executor: E, data: &ProductPayload, id: Uuid) -> Result<Self, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_as::<_, Product>(
            r#"INSERT INTO products (id, name, sku, description, price, vat_rate, unit, stock_quantity, active)
               VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
               RETURNING *"#,
        )
        .bind(id)
        .bind(&data.name)
        .bind(&data.sku)
        .bind(&data.description)
        .bind(data.price)
        .bind(data.vat_rate)
        .bind(&data.unit)
        .bind(data.stock_quantity)
        .bind(data.active)
        .fetch_one(executor)
        .await
    }

    pub async fn update<'e, E>(executor: E, id: Uuid, data: &ProductPayload) -> Result<Option<Self>, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_as::<_, Product>(
            r#"UPDATE products
               SET name = $2, sku = $3, description = $4, price = $5, vat_rate = $6, unit = $7,
                   stock_quantity = $8, active = $9, updated_at = datetime('now', 'subsec')
               WHERE id = $1
               RETURNING *"#,
        )
        .bind(id)
        .bind(&data.name)
        .bind(&data.sku)
        .bind(&data.description)
        .bind(data.price)
        .bind(data.vat_rate)
        .bind(&data.unit)
        .bind(data.stock_quantity)
        .bind(data.active)
        .fetch_optional(executor)
        .await
    }

    /// Records the remote id after a successful WooCommerce export
    pub async fn mark_synced(pool: &SqlitePool, id: Uuid, woocommerce_id: i64) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"UPDATE products
               SET woocommerce_id = $2, woocommerce_synced_at = datetime('now', 'subsec')
               WHERE id = $1"#,
        )
        .bind(id)
        .bind(woocommerce_id)
        .execute(pool)
        .await?;
        Ok(())
    }

    pub async fn delete<'e, E>(executor: E, id: Uuid) -> Result<u64, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let result = sqlx::query("DELETE FROM products WHERE id = $1")
            .bind(id)
            .execute(executor)
            .await?;
        Ok(result.rows_affected())
    }
}
