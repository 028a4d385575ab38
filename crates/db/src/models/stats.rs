//! Aggregate figures for the dashboard.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};
use ts_rs::TS;

#[derive(Debug, Clone, Default, FromRow, Serialize, Deserialize, PartialEq, TS)]
pub struct DashboardStats {
    pub contact_count: i64,
    pub product_count: i64,
    pub active_product_count: i64,
    pub invoice_count: i64,
    pub draft_invoice_count: i64,
    pub overdue_invoice_count: i64,
    pub estimate_count: i64,
    pub open_estimate_count: i64,
    /// Sum of paid invoice totals
    pub revenue_paid: f64,
    /// Sum of sent and overdue invoice totals
    pub outstanding: f64,
    /// Paid invoice totals within the current calendar month
    pub revenue_this_month: f64,
    pub file_count: i64,
    pub file_bytes: i64,
}

impl DashboardStats {
    pub async fn load(pool: &SqlitePool, today: NaiveDate) -> Result<Self, sqlx::Error> {
        let month_start = today.format("%Y-%m-01").to_string();
        sqlx::query_as::<_, DashboardStats>(
            r#"SELECT
                (SELECT COUNT(*) FROM contacts)                                          AS contact_count,
                (SELECT COUNT(*) FROM products)                                          AS product_count,
                (SELECT COUNT(*) FROM products WHERE active = 1)                         AS active_product_count,
                (SELECT COUNT(*) FROM invoices)                                          AS invoice_count,
                (SELECT COUNT(*) FROM invoices WHERE status = 'draft')                   AS draft_invoice_count,
                (SELECT COUNT(*) FROM invoices WHERE status = 'overdue')                 AS overdue_invoice_count,
                (SELECT COUNT(*) FROM estimates)                                         AS estimate_count,
                (SELECT COUNT(*) FROM estimates WHERE status IN ('draft', 'sent'))       AS open_estimate_count,
                (SELECT CAST(coalesce(SUM(total), 0) AS REAL) FROM invoices WHERE status = 'paid') AS revenue_paid,
                (SELECT CAST(coalesce(SUM(total), 0) AS REAL) FROM invoices
                  WHERE status IN ('sent', 'overdue'))                                   AS outstanding,
                (SELECT CAST(coalesce(SUM(total), 0) AS REAL) FROM invoices
                  WHERE status = 'paid' AND date(paid_at) >= $1)                         AS revenue_this_month,
                (SELECT COUNT(*) FROM files)                                             AS file_count,
                (SELECT coalesce(SUM(size_bytes), 0) FROM files)                         AS file_bytes"#,
        )
        .bind(month_start)
        .fetch_one(pool)
        .await
    }
}
