use client::{
    ApiClient, ClientError, PanelState, Store,
    api::{
        contacts::ContactsApi,
        files::{FilesApi, Upload},
        invoices::InvoicesApi,
        woocommerce::WooCommerceApi,
    },
};
use db::models::{
    activity_log::EntityType,
    contact::{ContactPayload, ContactQuery},
    invoice::{InvoicePayload, InvoiceStatus},
};
use httpmock::prelude::*;
use serde_json::{Value, json};
use uuid::Uuid;

fn ok(data: Value) -> Value {
    json!({ "success": true, "data": data, "error_data": null, "message": null })
}

fn failure(message: &str, error_data: Value) -> Value {
    json!({ "success": false, "data": null, "error_data": error_data, "message": message })
}

fn contact_json(id: Uuid, name: &str, email: Option<&str>) -> Value {
    json!({
        "id": id,
        "name": name,
        "email": email,
        "phone": null,
        "company": null,
        "address": null,
        "city": null,
        "postal_code": null,
        "country": null,
        "vat_number": null,
        "notes": null,
        "created_at": "2025-03-01T10:00:00Z",
        "updated_at": "2025-03-01T10:00:00Z"
    })
}

fn invoice_json(id: Uuid, status: &str) -> Value {
    json!({
        "id": id,
        "number": "INV-2025-0001",
        "contact_id": Uuid::new_v4(),
        "estimate_id": null,
        "status": status,
        "issue_date": "2025-03-01",
        "due_date": "2025-03-31",
        "currency": "EUR",
        "notes": null,
        "subtotal": 100.0,
        "discount_total": 0.0,
        "vat_total": 21.0,
        "total": 121.0,
        "share_token": null,
        "sent_at": null,
        "paid_at": null,
        "created_at": "2025-03-01T10:00:00Z",
        "updated_at": "2025-03-01T10:00:00Z"
    })
}

#[tokio::test]
async fn lists_contacts_with_search_query() {
    let server = MockServer::start_async().await;
    let id = Uuid::new_v4();
    let mock = server
        .mock_async(|when, then| {
            when.method(GET).path("/api/contacts").query_param("q", "acme");
            then.status(200).json_body(ok(json!([contact_json(id, "Acme", Some("info@acme.test"))])));
        })
        .await;

    let api = ContactsApi::new(ApiClient::new(&server.base_url()).unwrap());
    let contacts = api
        .list(&ContactQuery {
            q: Some("acme".to_string()),
        })
        .await
        .unwrap();

    mock.assert_async().await;
    assert_eq!(contacts.len(), 1);
    assert_eq!(contacts[0].id, id);
    assert_eq!(contacts[0].email.as_deref(), Some("info@acme.test"));
}

#[tokio::test]
async fn maps_error_envelopes() {
    let server = MockServer::start_async().await;
    let missing = Uuid::new_v4();
    server
        .mock_async(|when, then| {
            when.method(GET).path(format!("/api/contacts/{missing}"));
            then.status(404).json_body(failure("Contact not found", Value::Null));
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/api/contacts");
            then.status(400)
                .json_body(failure("Validation failed", json!({ "email": "must be a valid email address" })));
        })
        .await;

    let api = ContactsApi::new(ApiClient::new(&server.base_url()).unwrap());

    let err = api.get(missing).await.unwrap_err();
    assert!(matches!(err, ClientError::NotFound(ref m) if m == "Contact not found"));

    let err = api
        .create(&ContactPayload {
            name: "Acme".to_string(),
            ..Default::default()
        })
        .await
        .unwrap_err();
    let errors = err.field_errors().unwrap();
    assert_eq!(errors.get("email"), Some("must be a valid email address"));
}

#[tokio::test]
async fn status_change_is_retried_after_confirmation() {
    let server = MockServer::start_async().await;
    let id = Uuid::new_v4();
    let path = format!("/api/invoices/{id}/status");

    let unconfirmed = server
        .mock_async(|when, then| {
            when.method(POST)
                .path(path.as_str())
                .json_body_partial(r#"{ "status": "cancelled", "confirmed": false }"#);
            then.status(409).json_body(failure(
                "Changing draft to cancelled needs confirmation",
                json!({
                    "field": "status",
                    "message": "Changing draft to cancelled needs confirmation",
                    "confirmation_required": true
                }),
            ));
        })
        .await;
    let confirmed = server
        .mock_async(|when, then| {
            when.method(POST)
                .path(path.as_str())
                .json_body_partial(r#"{ "status": "cancelled", "confirmed": true }"#);
            then.status(200).json_body(ok(invoice_json(id, "cancelled")));
        })
        .await;

    let api = InvoicesApi::new(ApiClient::new(&server.base_url()).unwrap());

    let err = api.change_status(id, InvoiceStatus::Cancelled, false).await.unwrap_err();
    assert!(matches!(err, ClientError::ConfirmationRequired { ref field, .. } if field == "status"));

    let invoice = api.change_status(id, InvoiceStatus::Cancelled, true).await.unwrap();
    assert_eq!(invoice.status, InvoiceStatus::Cancelled);
    assert_eq!(invoice.issue_date.to_string(), "2025-03-01");

    unconfirmed.assert_async().await;
    confirmed.assert_async().await;
}

#[tokio::test]
async fn store_merges_server_conflicts_and_skips_invalid_saves() {
    let server = MockServer::start_async().await;
    let create = server
        .mock_async(|when, then| {
            when.method(POST).path("/api/contacts");
            then.status(409).json_body(failure(
                "Email already in use",
                json!({ "field": "email", "message": "already in use", "confirmation_required": false }),
            ));
        })
        .await;

    let mut store = Store::new(ContactsApi::new(ApiClient::new(&server.base_url()).unwrap()));
    store.open_create();

    let blank = ContactPayload::default();
    assert!(matches!(store.save(&blank).await, Err(ClientError::Validation(_))));
    assert_eq!(store.errors().get("name"), Some("is required"));
    create.assert_hits_async(0).await;

    let payload = ContactPayload {
        name: "Acme".to_string(),
        email: Some("info@acme.test".to_string()),
        ..Default::default()
    };
    store.save(&payload).await.unwrap_err();
    create.assert_hits_async(1).await;
    assert_eq!(store.errors().get("email"), Some("already in use"));
    assert!(store.errors().get("name").is_none());
    assert_eq!(store.panel(), PanelState::Create);
}

#[tokio::test]
async fn store_refresh_and_save_keep_the_list_current() {
    let server = MockServer::start_async().await;
    let existing = Uuid::new_v4();
    let created = Uuid::new_v4();
    server
        .mock_async(|when, then| {
            when.method(GET).path("/api/contacts");
            then.status(200).json_body(ok(json!([contact_json(existing, "Initech", None)])));
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/api/contacts").json_body_partial(r#"{ "name": "Acme" }"#);
            then.status(200).json_body(ok(contact_json(created, "Acme", None)));
        })
        .await;

    let mut store = Store::new(ContactsApi::new(ApiClient::new(&server.base_url()).unwrap()));
    store.refresh().await.unwrap();
    assert_eq!(store.items().len(), 1);

    store.open_create();
    let contact = store
        .save(&ContactPayload {
            name: "Acme".to_string(),
            ..Default::default()
        })
        .await
        .unwrap();

    assert_eq!(contact.id, created);
    assert_eq!(store.items().len(), 2);
    assert_eq!(store.panel(), PanelState::View(created));
    assert_eq!(store.selected().map(|c| c.name.as_str()), Some("Acme"));
}

#[tokio::test]
async fn store_normalizes_before_validating_and_sending() {
    let server = MockServer::start_async().await;
    let id = Uuid::new_v4();
    let mut created = invoice_json(id, "draft");
    created["items"] = json!([]);
    let create = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/api/invoices")
                .json_body_partial(r#"{ "currency": "EUR", "notes": null }"#);
            then.status(200).json_body(ok(created));
        })
        .await;

    let mut store = Store::new(InvoicesApi::new(ApiClient::new(&server.base_url()).unwrap()));
    store.open_create();
    let invoice = store
        .save(&InvoicePayload {
            number: None,
            contact_id: Uuid::new_v4(),
            issue_date: None,
            due_date: None,
            currency: Some(" eur ".to_string()),
            notes: Some("   ".to_string()),
            items: Vec::new(),
        })
        .await
        .unwrap();

    create.assert_async().await;
    assert!(store.errors().is_empty());
    assert_eq!(invoice.currency, "EUR");
}

#[tokio::test]
async fn uploads_and_downloads_files() {
    let server = MockServer::start_async().await;
    let file_id = Uuid::new_v4();
    let contact_id = Uuid::new_v4();
    let upload = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/api/files")
                .body_contains("hello world")
                .body_contains("entity_type")
                .body_contains(contact_id.to_string());
            then.status(200).json_body(ok(json!({
                "id": file_id,
                "original_name": "notes.txt",
                "mime_type": "text/plain",
                "size_bytes": 11,
                "entity_type": "contact",
                "entity_id": contact_id,
                "created_at": "2025-03-01T10:00:00Z"
            })));
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(GET).path(format!("/api/files/{file_id}/download"));
            then.status(200).header("content-type", "text/plain").body("hello world");
        })
        .await;

    let api = FilesApi::new(ApiClient::new(&server.base_url()).unwrap());
    let file = api
        .upload(Upload {
            file_name: "notes.txt".to_string(),
            mime_type: Some("text/plain".to_string()),
            bytes: b"hello world".to_vec(),
            attach_to: Some((EntityType::Contact, contact_id)),
        })
        .await
        .unwrap();
    upload.assert_async().await;
    assert_eq!(file.entity_type, Some(EntityType::Contact));
    assert_eq!(file.size_bytes, 11);

    let download = api.download(file_id).await.unwrap();
    assert_eq!(download.content_type.as_deref(), Some("text/plain"));
    assert_eq!(download.bytes, b"hello world");
}

#[tokio::test]
async fn too_large_upload_reports_413() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/api/files");
            then.status(413)
                .json_body(failure("file is 4096 bytes, the limit is 1024", Value::Null));
        })
        .await;

    let api = FilesApi::new(ApiClient::new(&server.base_url()).unwrap());
    let err = api
        .upload(Upload {
            file_name: "big.bin".to_string(),
            mime_type: None,
            bytes: vec![0; 4096],
            attach_to: None,
        })
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::Http { status: 413, .. }));
}

#[tokio::test]
async fn unconfigured_woocommerce_settings_are_none() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/api/woocommerce-products/settings");
            then.status(200).json_body(ok(Value::Null));
        })
        .await;
    let export = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/api/woocommerce-products/export")
                .json_body(json!({ "product_ids": [] }));
            then.status(409).json_body(failure(
                "WooCommerce is not configured",
                json!({ "field": "settings", "message": "WooCommerce is not configured", "confirmation_required": false }),
            ));
        })
        .await;

    let api = WooCommerceApi::new(ApiClient::new(&server.base_url()).unwrap());
    assert!(api.settings().await.unwrap().is_none());

    let err = api.export(&[]).await.unwrap_err();
    export.assert_async().await;
    assert!(matches!(err, ClientError::Conflict { ref field, .. } if field == "settings"));
}
