//! Typed client for the back-office API: one HTTP client per resource, plus
//! the stores and form drafts a UI keeps its state in.

pub mod api;
pub mod error;
pub mod forms;
pub mod store;

pub use api::ApiClient;
pub use error::ClientError;
pub use store::{PanelState, Resource, Store};
