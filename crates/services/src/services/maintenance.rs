//! Background loop that keeps document statuses in step with the calendar.

use std::time::Duration;

use chrono::NaiveDate;
use db::DBService;
use serde::{Deserialize, Serialize};
use tokio::time::interval;
use tracing::{debug, error, info};
use ts_rs::TS;

use super::{
    database_maintenance::{DatabaseMaintenance, MaintenanceError},
    documents::today,
    error::ServiceError,
    estimates::EstimateService,
    file_storage::FileStorage,
    invoices::InvoiceService,
};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
pub struct MaintenanceRun {
    pub invoices_overdue: usize,
    pub estimates_expired: usize,
}

pub struct MaintenanceService {
    db: DBService,
    storage: FileStorage,
    poll_interval: Duration,
    activity_retention_days: i64,
}

impl MaintenanceService {
    pub fn spawn(
        db: DBService,
        storage: FileStorage,
        poll_interval: Duration,
        activity_retention_days: i64,
    ) -> tokio::task::JoinHandle<()> {
        let service = Self {
            db,
            storage,
            poll_interval,
            activity_retention_days,
        };
        tokio::spawn(async move {
            service.start().await;
        })
    }

    async fn start(&self) {
        info!(
            "Starting maintenance service with interval {:?}, activity retention: {} days",
            self.poll_interval, self.activity_retention_days
        );

        let mut interval = interval(self.poll_interval);

        loop {
            interval.tick().await;
            if let Err(e) = self.tick().await {
                error!("Error running maintenance: {}", e);
            }
        }
    }

    async fn tick(&self) -> Result<(), MaintenanceError> {
        match Self::update_statuses(&self.db, today()).await {
            Ok(run) if run == MaintenanceRun::default() => debug!("Maintenance: no status changes"),
            Ok(run) => info!(
                invoices_overdue = run.invoices_overdue,
                estimates_expired = run.estimates_expired,
                "Maintenance: statuses updated"
            ),
            Err(e) => error!(error = %e, "Maintenance: status update failed"),
        }

        DatabaseMaintenance::new(self.db.pool.clone())
            .cleanup(&self.storage, self.activity_retention_days)
            .await?;
        Ok(())
    }

    /// Marks past-due invoices overdue and lapsed estimates expired.
    pub async fn update_statuses(db: &DBService, today: NaiveDate) -> Result<MaintenanceRun, ServiceError> {
        let overdue = InvoiceService::mark_overdue(&db.pool, today).await?;
        let expired = EstimateService::expire_lapsed(&db.pool, today).await?;
        Ok(MaintenanceRun {
            invoices_overdue: overdue.len(),
            estimates_expired: expired.len(),
        })
    }
}

#[cfg(test)]
mod tests {
    use db::models::{
        contact::{Contact, ContactPayload},
        estimate::{EstimatePayload, EstimateStatus, EstimateStatusChange},
        invoice::{InvoicePayload, InvoiceStatus, InvoiceStatusChange},
    };
    use uuid::Uuid;

    use super::*;

    #[tokio::test]
    async fn update_statuses_moves_sent_documents() {
        let db = DBService::new_in_memory().await.unwrap();
        let contact = Contact::create(
            &db.pool,
            &ContactPayload {
                name: "Pied Piper".to_string(),
                ..Default::default()
            },
            Uuid::new_v4(),
        )
        .await
        .unwrap();
        let issued = NaiveDate::from_ymd_opt(2025, 1, 1);

        let invoice = InvoiceService::create(
            &db.pool,
            InvoicePayload {
                number: None,
                contact_id: contact.id,
                issue_date: issued,
                due_date: None,
                currency: None,
                notes: None,
                items: vec![],
            },
            30,
        )
        .await
        .unwrap();
        InvoiceService::change_status(
            &db.pool,
            invoice.id,
            InvoiceStatusChange { status: InvoiceStatus::Sent, confirmed: false },
        )
        .await
        .unwrap();

        let estimate = EstimateService::create(
            &db.pool,
            EstimatePayload {
                number: None,
                contact_id: contact.id,
                issue_date: issued,
                valid_until: None,
                currency: None,
                notes: None,
                items: vec![],
            },
            14,
        )
        .await
        .unwrap();
        EstimateService::change_status(
            &db.pool,
            estimate.id,
            EstimateStatusChange { status: EstimateStatus::Sent, confirmed: false },
        )
        .await
        .unwrap();

        let early = MaintenanceService::update_statuses(&db, NaiveDate::from_ymd_opt(2025, 1, 10).unwrap())
            .await
            .unwrap();
        assert_eq!(early, MaintenanceRun::default());

        let late = MaintenanceService::update_statuses(&db, NaiveDate::from_ymd_opt(2025, 3, 1).unwrap())
            .await
            .unwrap();
        assert_eq!(late.invoices_overdue, 1);
        assert_eq!(late.estimates_expired, 1);
    }
}
