use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Executor, FromRow, Sqlite, SqlitePool};
use ts_rs::TS;
use utils::validation::{FieldErrors, Normalize, Validate, non_blank};
use uuid::Uuid;

#[derive(Debug, Clone, FromRow, Serialize, Deserialize, PartialEq, TS)]
pub struct Contact {
    pub id: Uuid,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub company: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub postal_code: Option<String>,
    pub country: Option<String>,
    pub vat_number: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Body for both create and update; update replaces every field.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, TS)]
pub struct ContactPayload {
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub company: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub postal_code: Option<String>,
    pub country: Option<String>,
    pub vat_number: Option<String>,
    pub notes: Option<String>,
}

/// Trims strings and turns blanks into `None`.
impl Normalize for ContactPayload {
    fn normalized(self) -> Self {
        Self {
            name: self.name.trim().to_string(),
            email: non_blank(self.email).map(|e| e.to_lowercase()),
            phone: non_blank(self.phone),
            company: non_blank(self.company),
            address: non_blank(self.address),
            city: non_blank(self.city),
            postal_code: non_blank(self.postal_code),
            country: non_blank(self.country),
            vat_number: non_blank(self.vat_number),
            notes: non_blank(self.notes),
        }
    }
}

impl Validate for ContactPayload {
    fn validate(&self) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();
        errors.required("name", &self.name);
        errors.max_len("name", &self.name, 200);
        errors.email("email", self.email.as_deref());
        if let Some(vat_number) = &self.vat_number {
            errors.max_len("vat_number", vat_number, 32);
        }
        errors.into_result()
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, TS)]
pub struct ContactQuery {
    /// Case-insensitive match on name, email or company
    pub q: Option<String>,
}

impl Contact {
    pub async fn find_all(pool: &SqlitePool, query: &ContactQuery) -> Result<Vec<Self>, sqlx::Error> {
        match query.q.as_deref().map(str::trim).filter(|q| !q.is_empty()) {
            Some(q) => {
                let pattern = format!("%{}%", escape_like(&q.to_lowercase()));
                sqlx::query_as::<_, Contact>(
                    r#"SELECT * FROM contacts
                       WHERE lower(name) LIKE $1 ESCAPE '\'
                          OR lower(coalesce(email, '')) LIKE $1 ESCAPE '\'
                          OR lower(coalesce(company, '')) LIKE $1 ESCAPE '\'
                       ORDER BY name COLLATE NOCASE ASC"#,
                )
                .bind(pattern)
                .fetch_all(pool)
                .await
            }
            None => {
                sqlx::query_as::<_, Contact>("SELECT * FROM contacts ORDER BY name COLLATE NOCASE ASC")
                    .fetch_all(pool)
                    .await
            }
        }
    }

    pub async fn find_by_id(pool: &SqlitePool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Contact>("SELECT * FROM contacts WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn find_by_email(pool: &SqlitePool, email: &str) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as::<_, Contact>("SELECT * FROM contacts WHERE email = $1 COLLATE NOCASE")
            .bind(email)
            .fetch_optional(pool)
            .await
    }

    pub async fn create<'e, E>(executor: E, data: &ContactPayload, id: Uuid) -> Result<Self, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_as::<_, Contact>(
            r#"INSERT INTO contacts (id, name, email, phone, company, address, city, postal_code, country, vat_number, notes)
               VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
               RETURNING *"#,
        )
        .bind(id)
        .bind(&data.name)
        .bind(&data.email)
        .bind(&data.phone)
        .bind(&data.company)
        .bind(&data.address)
        .bind(&data.city)
        .bind(&data.postal_code)
        .bind(&data.country)
        .bind(&data.vat_number)
        .bind(&data.notes)
        .fetch_one(executor)
        .await
    }

    pub async fn update<'e, E>(executor: E, id: Uuid, data: &ContactPayload) -> Result<Option<Self>, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query_as::<_, Contact>(
            r#"UPDATE contacts
               SET name = $2, email = $3, phone = $4, company = $5, address = $6, city = $7,
                   postal_code = $8, country = $9, vat_number = $10, notes = $11,
                   updated_at = datetime('now', 'subsec')
               WHERE id = $1
               RETURNING *"#,
        )
        .bind(id)
        .bind(&data.name)
        .bind(&data.email)
        .bind(&data.phone)
        .bind(&data.company)
        .bind(&data.address)
        .bind(&data.city)
        .bind(&data.postal_code)
        .bind(&data.country)
        .bind(&data.vat_number)
        .bind(&data.notes)
        .fetch_optional(executor)
        .await
    }

    /// Number of invoices and estimates that still reference the contact
    pub async fn count_documents(pool: &SqlitePool, id: Uuid) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>(
            r#"SELECT (SELECT COUNT(*) FROM invoices WHERE contact_id = $1)
                    + (SELECT COUNT(*) FROM estimates WHERE contact_id = $1)"#,
        )
        .bind(id)
        .fetch_one(pool)
        .await
    }

    pub async fn delete<'e, E>(executor: E, id: Uuid) -> Result<u64, sqlx::Error>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let result = sqlx::query("DELETE FROM contacts WHERE id = $1")
            .bind(id)
            .execute(executor)
            .await?;
        Ok(result.rows_affected())
    }
}

/// Makes `%` and `_` in user input match literally under `ESCAPE '\'`.
fn escape_like(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}
