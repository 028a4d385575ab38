use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Method, Request, StatusCode, header},
};
use db::DBService;
use serde_json::{Value, json};
use server::{build_router, config::Config, deployment::Deployment};
use tempfile::TempDir;
use tower::ServiceExt;

struct TestApp {
    router: Router,
    _uploads: TempDir,
}

impl TestApp {
    async fn new() -> Self {
        let uploads = TempDir::new().unwrap();
        let dir = uploads.path().to_string_lossy().to_string();
        let mut config = Config::from_lookup(|name| match name {
            "UPLOAD_DIR" => Some(dir.clone()),
            "MAX_UPLOAD_BYTES" => Some("1024".to_string()),
            "PUBLIC_BASE_URL" => Some("https://office.test".to_string()),
            _ => None,
        })
        .unwrap();
        config.default_payment_terms_days = 14;

        let db = DBService::new_in_memory().await.unwrap();
        let deployment = Deployment::with_db(db, config);
        Self {
            router: build_router(deployment),
            _uploads: uploads,
        }
    }

    async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let body = to_bytes(response.into_body(), 1024 * 1024).await.unwrap();
        let value = if body.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&body).unwrap_or(Value::Null)
        };
        (status, value)
    }

    async fn json(&self, method: Method, uri: &str, body: Value) -> (StatusCode, Value) {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        self.send(request).await
    }

    async fn get(&self, uri: &str) -> (StatusCode, Value) {
        let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
        self.send(request).await
    }

    async fn create_contact(&self, name: &str, email: &str) -> String {
        let (status, body) = self
            .json(Method::POST, "/api/contacts", json!({ "name": name, "email": email }))
            .await;
        assert_eq!(status, StatusCode::OK, "{body}");
        body["data"]["id"].as_str().unwrap().to_string()
    }

    async fn create_invoice(&self, contact_id: &str) -> Value {
        let (status, body) = self
            .json(
                Method::POST,
                "/api/invoices",
                json!({
                    "contact_id": contact_id,
                    "issue_date": "2025-03-01",
                    "items": [
                        { "description": "Design", "quantity": 3, "unit_price": 19.99, "discount_percent": 10, "vat_rate": 21 }
                    ]
                }),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "{body}");
        body["data"].clone()
    }
}

#[tokio::test]
async fn health_reports_ok() {
    let app = TestApp::new().await;
    let (status, body) = app.get("/api/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["data"], "OK");
}

#[tokio::test]
async fn contact_round_trip_and_validation() {
    let app = TestApp::new().await;
    let id = app.create_contact("Acme", "billing@acme.test").await;

    let (status, body) = app.get(&format!("/api/contacts/{id}")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["name"], "Acme");
    assert_eq!(body["data"]["email"], "billing@acme.test");

    let (status, body) = app
        .json(Method::POST, "/api/contacts", json!({ "name": "", "email": "nope" }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert_eq!(body["error_data"]["name"], "is required");
    assert_eq!(body["error_data"]["email"], "must be a valid email address");

    let (status, body) = app
        .json(Method::POST, "/api/contacts", json!({ "name": "Acme again", "email": "BILLING@acme.test" }))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error_data"]["field"], "email");

    let (status, _) = app.get("/api/contacts/00000000-0000-0000-0000-000000000000").await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = app.get("/api/contacts?q=acm").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn invoice_totals_and_status_confirmation() {
    let app = TestApp::new().await;
    let contact_id = app.create_contact("Globex", "ap@globex.test").await;
    let invoice = app.create_invoice(&contact_id).await;
    let id = invoice["id"].as_str().unwrap();

    assert_eq!(invoice["number"], "INV-2025-0001");
    assert_eq!(invoice["due_date"], "2025-03-15");
    assert_eq!(invoice["subtotal"], 59.97);
    assert_eq!(invoice["discount_total"], 6.0);
    assert_eq!(invoice["vat_total"], 11.33);
    assert_eq!(invoice["total"], 65.3);
    assert_eq!(invoice["items"].as_array().unwrap().len(), 1);

    let uri = format!("/api/invoices/{id}/status");
    let (status, body) = app.json(Method::POST, &uri, json!({ "status": "paid" })).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error_data"]["confirmation_required"], false);

    let (status, body) = app.json(Method::POST, &uri, json!({ "status": "cancelled" })).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error_data"]["confirmation_required"], true);

    let (status, body) = app
        .json(Method::POST, &uri, json!({ "status": "cancelled", "confirmed": true }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "cancelled");

    // Contacts with documents cannot be removed
    let request = Request::builder()
        .method(Method::DELETE)
        .uri(format!("/api/contacts/{contact_id}"))
        .body(Body::empty())
        .unwrap();
    let (status, body) = app.send(request).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error_data"]["field"], "contact");
}

#[tokio::test]
async fn shared_invoice_is_public_once_sent() {
    let app = TestApp::new().await;
    let contact_id = app.create_contact("Soylent", "ar@soylent.test").await;
    let invoice = app.create_invoice(&contact_id).await;
    let id = invoice["id"].as_str().unwrap();

    let (status, body) = app.json(Method::POST, &format!("/api/invoices/{id}/share"), json!({})).await;
    assert_eq!(status, StatusCode::OK);
    let token = body["data"]["token"].as_str().unwrap().to_string();
    assert_eq!(
        body["data"]["url"],
        format!("https://office.test/api/public/invoices/{token}")
    );

    let public_uri = format!("/api/public/invoices/{token}");
    let (status, _) = app.get(&public_uri).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    app.json(Method::POST, &format!("/api/invoices/{id}/status"), json!({ "status": "sent" }))
        .await;
    let (status, body) = app.get(&public_uri).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["customer_name"], "Soylent");
    assert_eq!(body["data"]["total"], 65.3);
    assert!(body["data"].get("share_token").is_none());
}

#[tokio::test]
async fn estimate_converts_into_invoice() {
    let app = TestApp::new().await;
    let contact_id = app.create_contact("Tyrell", "ops@tyrell.test").await;
    let (status, body) = app
        .json(
            Method::POST,
            "/api/estimates",
            json!({
                "contact_id": contact_id,
                "items": [{ "description": "Replicant audit", "quantity": 1, "unit_price": 1000, "vat_rate": 0 }]
            }),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let id = body["data"]["id"].as_str().unwrap().to_string();

    let (status, body) = app.json(Method::POST, &format!("/api/estimates/{id}/convert"), json!({})).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["estimate"]["status"], "converted");
    assert_eq!(body["data"]["invoice"]["total"], 1000.0);
    assert_eq!(body["data"]["invoice"]["estimate_id"], id.as_str());

    let (status, body) = app.get("/api/activity?limit=10").await;
    assert_eq!(status, StatusCode::OK);
    let actions: Vec<&str> = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|entry| entry["action"].as_str())
        .collect();
    assert!(actions.contains(&"converted"));
}

fn multipart_body(boundary: &str, file_name: &str, content: &str) -> String {
    format!(
        "--{boundary}\r\n\
         Content-Disposition: form-data; name=\"file\"; filename=\"{file_name}\"\r\n\
         Content-Type: text/plain\r\n\r\n\
         {content}\r\n\
         --{boundary}--\r\n"
    )
}

async fn upload(app: &TestApp, file_name: &str, content: &str) -> (StatusCode, Value) {
    let boundary = "X-BOUNDARY-1234";
    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/files")
        .header(header::CONTENT_TYPE, format!("multipart/form-data; boundary={boundary}"))
        .body(Body::from(multipart_body(boundary, file_name, content)))
        .unwrap();
    app.send(request).await
}

#[tokio::test]
async fn upload_download_and_size_limit() {
    let app = TestApp::new().await;

    let (status, body) = upload(&app, "notes.txt", "hello back office").await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["original_name"], "notes.txt");
    assert_eq!(body["data"]["size_bytes"], 17);
    assert!(body["data"].get("stored_name").is_none());
    let id = body["data"]["id"].as_str().unwrap().to_string();

    let request = Request::builder()
        .uri(format!("/api/files/{id}/download"))
        .body(Body::empty())
        .unwrap();
    let response = app.router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "text/plain");
    let bytes = to_bytes(response.into_body(), 1024).await.unwrap();
    assert_eq!(&bytes[..], b"hello back office");

    let (status, _) = upload(&app, "big.txt", &"x".repeat(2048)).await;
    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
}
