use axum::Router;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::deployment::Deployment;

pub mod activity;
pub mod contacts;
pub mod estimates;
pub mod files;
pub mod health;
pub mod invoices;
pub mod maintenance;
pub mod products;
pub mod public;
pub mod woocommerce;

/// Every route lives under `/api`.
pub fn router(deployment: Deployment) -> Router {
    let api = Router::new()
        .merge(health::router())
        .merge(contacts::router(&deployment))
        .merge(products::router(&deployment))
        .merge(invoices::router(&deployment))
        .merge(estimates::router(&deployment))
        .merge(public::router(&deployment))
        .merge(files::router(&deployment))
        .merge(woocommerce::router(&deployment))
        .merge(activity::router(&deployment))
        .merge(maintenance::router(&deployment));

    Router::new()
        .nest("/api", api)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(deployment)
}
