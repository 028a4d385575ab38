//! Writes the TypeScript declarations of every API type to `shared/types.ts`.

use std::{env, fs, path::PathBuf};

use ts_rs::TS;

fn generate_types_content() -> String {
    let header = "// This file was generated by `cargo run --bin generate_types`. Do not edit it by hand.\n\n";
    let decls = [
        utils::response::ApiResponse::<(), ()>::decl(),
        utils::response::ConflictDetails::decl(),
        utils::share_token::ShareLink::decl(),
        utils::totals::DocumentTotals::decl(),
        db::models::contact::Contact::decl(),
        db::models::contact::ContactPayload::decl(),
        db::models::contact::ContactQuery::decl(),
        db::models::product::Product::decl(),
        db::models::product::ProductPayload::decl(),
        db::models::product::ProductQuery::decl(),
        db::models::line_item::LineItem::decl(),
        db::models::line_item::LineItemInput::decl(),
        db::models::invoice::InvoiceStatus::decl(),
        db::models::invoice::Invoice::decl(),
        db::models::invoice::InvoiceWithItems::decl(),
        db::models::invoice::InvoicePayload::decl(),
        db::models::invoice::InvoiceStatusChange::decl(),
        db::models::invoice::InvoiceQuery::decl(),
        db::models::invoice::PublicInvoice::decl(),
        db::models::estimate::EstimateStatus::decl(),
        db::models::estimate::Estimate::decl(),
        db::models::estimate::EstimateWithItems::decl(),
        db::models::estimate::EstimatePayload::decl(),
        db::models::estimate::EstimateStatusChange::decl(),
        db::models::estimate::EstimateConversion::decl(),
        db::models::estimate::EstimateQuery::decl(),
        db::models::estimate::PublicEstimate::decl(),
        db::models::file_item::FileItem::decl(),
        db::models::file_item::FileQuery::decl(),
        db::models::activity_log::EntityType::decl(),
        db::models::activity_log::ActivityAction::decl(),
        db::models::activity_log::ActivityLog::decl(),
        db::models::woocommerce::WooCommerceSettingsView::decl(),
        db::models::woocommerce::UpdateWooCommerceSettings::decl(),
        db::models::woocommerce::WooCommerceExportLog::decl(),
        db::models::stats::DashboardStats::decl(),
        services::services::woocommerce::ExportRequest::decl(),
        services::services::database_maintenance::HealthReport::decl(),
        services::services::database_maintenance::OptimizeReport::decl(),
        services::services::database_maintenance::CleanupReport::decl(),
        services::services::maintenance::MaintenanceRun::decl(),
        server::routes::activity::ActivityQuery::decl(),
    ];

    let body = decls
        .into_iter()
        .map(|decl| format!("export {}", decl.trim_end_matches(';').trim()))
        .collect::<Vec<_>>()
        .join(";\n\n");
    format!("{header}{body};\n")
}

fn main() {
    let check_mode = env::args().any(|arg| arg == "--check");
    let shared_path = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../shared");
    let types_path = shared_path.join("types.ts");
    let generated = generate_types_content();

    if check_mode {
        let current = fs::read_to_string(&types_path).unwrap_or_default();
        if current == generated {
            println!("shared/types.ts is up to date.");
            std::process::exit(0);
        }
        eprintln!("shared/types.ts is stale. Run `cargo run --bin generate_types`.");
        std::process::exit(1);
    }

    if let Err(e) = fs::create_dir_all(&shared_path).and_then(|_| fs::write(&types_path, generated)) {
        eprintln!("Failed to write {}: {}", types_path.display(), e);
        std::process::exit(1);
    }
    println!("Wrote {}", types_path.display());
}
