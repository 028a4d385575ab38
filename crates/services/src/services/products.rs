//! Product catalogue CRUD.

use db::{
    is_unique_violation,
    models::{
        activity_log::{ActivityAction, ActivityLog, EntityType},
        product::{Product, ProductPayload, ProductQuery},
    },
};
use sqlx::SqlitePool;
use tracing::info;
use utils::validation::{Normalize, Validate};
use uuid::Uuid;

use super::error::ServiceError;

pub struct ProductService;

impl ProductService {
    pub async fn list(pool: &SqlitePool, query: &ProductQuery) -> Result<Vec<Product>, ServiceError> {
        Ok(Product::find_all(pool, query).await?)
    }

    pub async fn get(pool: &SqlitePool, id: Uuid) -> Result<Product, ServiceError> {
        Product::find_by_id(pool, id)
            .await?
            .ok_or(ServiceError::NotFound("product"))
    }

    pub async fn create(pool: &SqlitePool, payload: ProductPayload) -> Result<Product, ServiceError> {
        let payload = payload.normalized();
        payload.validate()?;
        Self::ensure_sku_free(pool, payload.sku.as_deref(), None).await?;

        let mut tx = pool.begin().await?;
        let product = Product::create(&mut *tx, &payload, Uuid::new_v4())
            .await
            .map_err(map_unique)?;
        ActivityLog::create(
            &mut *tx,
            EntityType::Product,
            product.id,
            ActivityAction::Created,
            Some(format!("Product {} created", product.name)),
        )
        .await?;
        tx.commit().await?;

        info!(product_id = %product.id, "Product created");
        Ok(product)
    }

    pub async fn update(pool: &SqlitePool, id: Uuid, payload: ProductPayload) -> Result<Product, ServiceError> {
        let payload = payload.normalized();
        payload.validate()?;
        Self::ensure_sku_free(pool, payload.sku.as_deref(), Some(id)).await?;

        let mut tx = pool.begin().await?;
        let product = Product::update(&mut *tx, id, &payload)
            .await
            .map_err(map_unique)?
            .ok_or(ServiceError::NotFound("product"))?;
        ActivityLog::create(
            &mut *tx,
            EntityType::Product,
            product.id,
            ActivityAction::Updated,
            Some(format!("Product {} updated", product.name)),
        )
        .await?;
        tx.commit().await?;

        Ok(product)
    }

    /// Line items keep their copied description and prices; only the link is dropped.
    pub async fn delete(pool: &SqlitePool, id: Uuid) -> Result<(), ServiceError> {
        let product = Self::get(pool, id).await?;

        let mut tx = pool.begin().await?;
        Product::delete(&mut *tx, id).await?;
        ActivityLog::create(
            &mut *tx,
            EntityType::Product,
            id,
            ActivityAction::Deleted,
            Some(format!("Product {} deleted", product.name)),
        )
        .await?;
        tx.commit().await?;

        info!(product_id = %id, "Product deleted");
        Ok(())
    }

    async fn ensure_sku_free(
        pool: &SqlitePool,
        sku: Option<&str>,
        own_id: Option<Uuid>,
    ) -> Result<(), ServiceError> {
        let Some(sku) = sku else {
            return Ok(());
        };
        match Product::find_by_sku(pool, sku).await? {
            Some(existing) if Some(existing.id) != own_id => Err(ServiceError::conflict(
                "sku",
                "a product with this SKU already exists",
            )),
            _ => Ok(()),
        }
    }
}

fn map_unique(err: sqlx::Error) -> ServiceError {
    if is_unique_violation(&err) {
        ServiceError::conflict("sku", "a product with this SKU already exists")
    } else {
        ServiceError::Database(err)
    }
}

#[cfg(test)]
mod tests {
    use db::DBService;

    use super::*;

    fn payload(name: &str, sku: Option<&str>) -> ProductPayload {
        ProductPayload {
            name: name.to_string(),
            sku: sku.map(str::to_string),
            price: 9.999,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn prices_are_rounded_and_sku_is_unique() {
        let db = DBService::new_in_memory().await.unwrap();
        let product = ProductService::create(&db.pool, payload("Mug", Some("MUG-1"))).await.unwrap();
        assert_eq!(product.price, 10.0);

        let err = ProductService::create(&db.pool, payload("Other mug", Some("MUG-1")))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Conflict { ref field, .. } if field == "sku"));

        // Products without SKU never collide
        ProductService::create(&db.pool, payload("Loose 1", None)).await.unwrap();
        ProductService::create(&db.pool, payload("Loose 2", Some("  "))).await.unwrap();
    }

    #[tokio::test]
    async fn delete_removes_product() {
        let db = DBService::new_in_memory().await.unwrap();
        let product = ProductService::create(&db.pool, payload("Pen", None)).await.unwrap();
        ProductService::delete(&db.pool, product.id).await.unwrap();
        assert!(matches!(
            ProductService::get(&db.pool, product.id).await,
            Err(ServiceError::NotFound("product"))
        ));
    }
}
