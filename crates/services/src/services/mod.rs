pub mod activity;
pub mod contacts;
pub mod database_maintenance;
pub mod documents;
pub mod error;
pub mod estimates;
pub mod file_storage;
pub mod invoices;
pub mod maintenance;
pub mod products;
pub mod status_workflow;
pub mod woocommerce;
pub mod woocommerce_client;
