pub mod activity_log;
pub mod contact;
pub mod estimate;
pub mod file_item;
pub mod invoice;
pub mod line_item;
pub mod numbering;
pub mod product;
pub mod stats;
pub mod woocommerce;
