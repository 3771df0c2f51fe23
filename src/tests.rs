//! Integration tests for the DigiGov backend.

use std::sync::Arc;

use axum::{routing::get, Json, Router};
use reqwest::{multipart, Client};
use serde_json::{json, Value};
use tempfile::TempDir;

use crate::config::{Config, DEFAULT_MAX_UPLOAD_BYTES};
use crate::db::{init_database, Repository};
use crate::location::GeoLocator;
use crate::storage::UploadStore;
use crate::{create_router, AppState};

/// Test fixture for integration tests.
struct TestFixture {
    client: Client,
    base_url: String,
    temp_dir: TempDir,
}

impl TestFixture {
    async fn new() -> Self {
        // Nothing listens on the discard port, so lookups fail fast
        Self::with_geolocation("http://127.0.0.1:9/json".to_string()).await
    }

    async fn with_geolocation(geolocation_url: String) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let db_path = temp_dir.path().join("test.sqlite");
        let upload_dir = temp_dir.path().join("uploads");

        // Initialize database
        let pool = init_database(&db_path).await.expect("Failed to init DB");
        let repo = Arc::new(Repository::new(pool));

        let uploads = Arc::new(
            UploadStore::new(upload_dir.clone())
                .await
                .expect("Failed to init uploads"),
        );
        let locator = Arc::new(GeoLocator::new(geolocation_url.clone()).unwrap());

        // Create config
        let config = Config {
            db_path,
            upload_dir,
            legacy_dir: None,
            bind_addr: "127.0.0.1:0".parse().unwrap(),
            log_level: "warn".to_string(),
            geolocation_url,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        };

        let state = AppState {
            repo,
            uploads,
            locator,
            config: Arc::new(config),
        };

        let app = create_router(state);
        let base_url = spawn(app).await;

        TestFixture {
            client: Client::new(),
            base_url,
            temp_dir,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn post_json(&self, path: &str, body: Value) -> (u16, Value) {
        let resp = self
            .client
            .post(self.url(path))
            .json(&body)
            .send()
            .await
            .unwrap();
        let status = resp.status().as_u16();
        (status, resp.json().await.unwrap())
    }

    async fn get_json(&self, path: &str) -> (u16, Value) {
        let resp = self.client.get(self.url(path)).send().await.unwrap();
        let status = resp.status().as_u16();
        (status, resp.json().await.unwrap())
    }

    async fn register_citizen(&self, phone: &str) -> Value {
        let (status, body) = self
            .post_json(
                "/api/register",
                json!({
                    "name": "Asha Rao",
                    "phone": phone,
                    "password": "s3cret",
                    "aadhaar": "1234-5678-9012"
                }),
            )
            .await;
        assert_eq!(status, 200, "register failed: {}", body);
        body["user"].clone()
    }

    async fn file_complaint(&self, user_id: &str, sector: &str) -> Value {
        let (status, body) = self
            .post_json(
                "/api/complaints",
                json!({
                    "userId": user_id,
                    "sector": sector,
                    "subject": "Streetlight broken",
                    "description": "The light near the bus stop has been out for a week",
                    "location": "MG Road",
                    "priority": "High"
                }),
            )
            .await;
        assert_eq!(status, 200, "complaint failed: {}", body);
        body["complaint"].clone()
    }

    async fn upload(&self, user_id: &str, filename: &str, bytes: &[u8]) -> Value {
        let form = multipart::Form::new()
            .text("user_id", user_id.to_string())
            .text("type", "Identity")
            .part(
                "file",
                multipart::Part::bytes(bytes.to_vec()).file_name(filename.to_string()),
            );
        let resp = self
            .client
            .post(self.url("/api/documents"))
            .multipart(form)
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 200);
        let body: Value = resp.json().await.unwrap();
        body["document"].clone()
    }
}

/// Serve `app` on a random local port and return its base URL.
async fn spawn(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind");
    let addr = listener.local_addr().expect("Failed to get addr");

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    // Wait for server to start
    tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;

    format!("http://{}", addr)
}

#[tokio::test]
async fn test_health_check() {
    let fixture = TestFixture::new().await;

    let (status, body) = fixture.get_json("/api/health").await;
    assert_eq!(status, 200);
    assert_eq!(body["success"], true);
    assert_eq!(body["message"], "Server is running");
    assert_eq!(body["status"], "ok");
}

// ==== ACCOUNT TESTS ====

#[tokio::test]
async fn test_register_and_login_citizen() {
    let fixture = TestFixture::new().await;

    let user = fixture.register_citizen("9876543210").await;
    assert_eq!(user["role"], "citizen");
    assert_eq!(user["phone"], "9876543210");
    assert!(user.get("password").is_none());
    assert!(user.get("passwordHash").is_none());

    let (status, body) = fixture
        .post_json(
            "/api/login",
            json!({"phone": "9876543210", "password": "s3cret"}),
        )
        .await;
    assert_eq!(status, 200);
    assert_eq!(body["message"], "Login successful");
    assert_eq!(body["user"]["id"], user["id"]);
    assert!(body["user"].get("password").is_none());
    assert!(body.get("data").is_none());
}

#[tokio::test]
async fn test_login_failures() {
    let fixture = TestFixture::new().await;
    fixture.register_citizen("9876543210").await;

    let (status, body) = fixture
        .post_json(
            "/api/login",
            json!({"phone": "9876543210", "password": "wrong"}),
        )
        .await;
    assert_eq!(status, 401);
    assert_eq!(body["success"], false);
    assert_eq!(body["code"], "UNAUTHORIZED");

    let (status, body) = fixture
        .post_json("/api/login", json!({"phone": "0000000000", "password": "s3cret"}))
        .await;
    assert_eq!(status, 404);
    assert_eq!(body["message"], "User not found");

    let (status, body) = fixture
        .post_json("/api/login", json!({"phone": "9876543210"}))
        .await;
    assert_eq!(status, 400);
    assert_eq!(body["message"], "Phone and password are required");
}

#[tokio::test]
async fn test_duplicate_phone_rejected() {
    let fixture = TestFixture::new().await;
    fixture.register_citizen("9876543210").await;

    let (status, body) = fixture
        .post_json(
            "/api/register",
            json!({
                "name": "Someone Else",
                "phone": "9876543210",
                "password": "other",
                "aadhaar": "9999-0000-1111"
            }),
        )
        .await;
    assert_eq!(status, 409);
    assert_eq!(body["success"], false);
    assert_eq!(body["code"], "CONFLICT");
}

#[tokio::test]
async fn test_register_missing_fields() {
    let fixture = TestFixture::new().await;

    let (status, body) = fixture
        .post_json("/api/register", json!({"name": "Asha", "phone": " "}))
        .await;
    assert_eq!(status, 400);
    assert_eq!(
        body["message"],
        "Missing required fields: phone, password, aadhaar"
    );

    // Malformed JSON body
    let resp = fixture
        .client
        .post(fixture.url("/api/register"))
        .header("content-type", "application/json")
        .body("{not json")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn test_official_register_and_login() {
    let fixture = TestFixture::new().await;

    let (status, body) = fixture
        .post_json(
            "/api/official/register",
            json!({
                "empId": "EMP-001",
                "name": "R. Iyer",
                "department": "Electricity",
                "category": "Field Officer",
                "password": "pa55"
            }),
        )
        .await;
    assert_eq!(status, 200);
    assert_eq!(body["official"]["role"], "official");
    assert_eq!(body["official"]["empId"], "EMP-001");

    let (status, _) = fixture
        .post_json(
            "/api/official/register",
            json!({
                "empId": "EMP-001",
                "name": "Copy",
                "department": "Water",
                "category": "Clerk",
                "password": "x"
            }),
        )
        .await;
    assert_eq!(status, 409);

    let (status, body) = fixture
        .post_json(
            "/api/official/login",
            json!({"empId": "EMP-001", "password": "pa55"}),
        )
        .await;
    assert_eq!(status, 200);
    assert_eq!(body["official"]["department"], "Electricity");

    let (status, _) = fixture
        .post_json(
            "/api/official/login",
            json!({"empId": "EMP-404", "password": "pa55"}),
        )
        .await;
    assert_eq!(status, 404);
}

// ==== COMPLAINT TESTS ====

#[tokio::test]
async fn test_complaint_lifecycle() {
    let fixture = TestFixture::new().await;
    let user = fixture.register_citizen("9876543210").await;
    let user_id = user["id"].as_str().unwrap();

    let first = fixture.file_complaint(user_id, "Electricity").await;
    let second = fixture.file_complaint(user_id, "Water").await;
    assert_eq!(first["status"], "Pending");
    assert!(second["id"].as_i64().unwrap() > first["id"].as_i64().unwrap());

    let (status, body) = fixture
        .get_json(&format!("/api/complaints/{}", first["id"]))
        .await;
    assert_eq!(status, 200);
    assert_eq!(body["complaint"]["sector"], "Electricity");

    let resp = fixture
        .client
        .put(fixture.url(&format!("/api/complaints/{}/status", first["id"])))
        .json(&json!({"status": "Resolved"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["complaint"]["status"], "Resolved");

    let (status, body) = fixture.get_json("/api/complaints/9999").await;
    assert_eq!(status, 404);
    assert_eq!(body["message"], "Complaint not found");
}

#[tokio::test]
async fn test_complaint_status_is_free_text() {
    let fixture = TestFixture::new().await;
    let complaint = fixture.file_complaint("1", "Roads").await;

    let resp = fixture
        .client
        .put(fixture.url(&format!("/api/complaints/{}/status", complaint["id"])))
        .json(&json!({"status": "Escalated to minister"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["complaint"]["status"], "Escalated to minister");

    let resp = fixture
        .client
        .put(fixture.url("/api/complaints/9999/status"))
        .json(&json!({"status": "Resolved"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);
}

#[tokio::test]
async fn test_complaint_filters() {
    let fixture = TestFixture::new().await;
    fixture.file_complaint("1", "Electricity").await;
    fixture.file_complaint("1", "Water").await;
    fixture.file_complaint("2", "Electricity").await;

    let (_, body) = fixture.get_json("/api/complaints").await;
    assert_eq!(body["complaints"].as_array().unwrap().len(), 3);

    let (_, body) = fixture.get_json("/api/complaints?userId=1").await;
    assert_eq!(body["complaints"].as_array().unwrap().len(), 2);

    let (_, body) = fixture.get_json("/api/complaints?sector=electricity").await;
    assert_eq!(body["complaints"].as_array().unwrap().len(), 2);

    let (_, body) = fixture
        .get_json("/api/complaints?userId=1&sector=Water")
        .await;
    let data = body["complaints"].as_array().unwrap();
    assert_eq!(data.len(), 1);
    assert_eq!(data[0]["sector"], "Water");
}

#[tokio::test]
async fn test_complaint_missing_fields() {
    let fixture = TestFixture::new().await;

    let (status, body) = fixture
        .post_json(
            "/api/complaints",
            json!({"userId": "1", "sector": "Water", "subject": "Leak"}),
        )
        .await;
    assert_eq!(status, 400);
    assert_eq!(body["code"], "VALIDATION_ERROR");
    assert_eq!(
        body["message"],
        "Missing required fields: description, location, priority"
    );

    let (_, body) = fixture.get_json("/api/complaints").await;
    assert!(body["complaints"].as_array().unwrap().is_empty());
}

// ==== DOCUMENT TESTS ====

#[tokio::test]
async fn test_upload_and_download_document() {
    let fixture = TestFixture::new().await;

    let document = fixture.upload("7", "aadhaar card.pdf", b"%PDF-1.4 test").await;
    assert_eq!(document["name"], "aadhaar_card.pdf");
    assert_eq!(document["type"], "Identity");
    assert_eq!(document["userId"], "7");

    let stored = fixture.temp_dir.path().join("uploads/7/aadhaar_card.pdf");
    assert!(stored.exists());

    let resp = fixture
        .client
        .get(fixture.url(&format!("/api/documents/{}/download", document["id"])))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    assert_eq!(
        resp.headers()["content-disposition"],
        "attachment; filename=\"aadhaar_card.pdf\""
    );
    assert_eq!(resp.headers()["content-length"], "13");
    assert_eq!(resp.bytes().await.unwrap().as_ref(), b"%PDF-1.4 test");

    let resp = fixture
        .client
        .get(fixture.url(&format!("/api/documents/{}/view", document["id"])))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    assert_eq!(resp.headers()["content-type"], "application/pdf");
    assert!(resp.headers()["content-disposition"]
        .to_str()
        .unwrap()
        .starts_with("inline"));
}

#[tokio::test]
async fn test_upload_name_collision_gets_suffix() {
    let fixture = TestFixture::new().await;

    let first = fixture.upload("7", "bill.png", b"one").await;
    let second = fixture.upload("7", "bill.png", b"two").await;
    assert_eq!(first["name"], "bill.png");
    assert_eq!(second["name"], "bill_1.png");
    assert_ne!(first["id"], second["id"]);

    let resp = fixture
        .client
        .get(fixture.url(&format!("/api/documents/{}/download", first["id"])))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.bytes().await.unwrap().as_ref(), b"one");

    let (_, body) = fixture.get_json("/api/documents?user_id=7").await;
    assert_eq!(body["documents"].as_array().unwrap().len(), 2);
    let (_, body) = fixture.get_json("/api/documents?user_id=8").await;
    assert!(body["documents"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_upload_without_file() {
    let fixture = TestFixture::new().await;

    let form = multipart::Form::new().text("user_id", "7");
    let resp = fixture
        .client
        .post(fixture.url("/api/documents"))
        .multipart(form)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["message"], "No file uploaded");
}

#[tokio::test]
async fn test_upload_owner_matches_folder() {
    let fixture = TestFixture::new().await;

    let form = multipart::Form::new().text("user_id", "../1").part(
        "file",
        multipart::Part::bytes(b"x".to_vec()).file_name("id.png"),
    );
    let resp = fixture
        .client
        .post(fixture.url("/api/documents"))
        .multipart(form)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["message"], "Invalid user id");
    assert!(!fixture.temp_dir.path().join("uploads/1/id.png").exists());

    // No user id: the record and the folder both say anonymous
    let document = fixture.upload("", "id.png", b"x").await;
    assert_eq!(document["userId"], "anonymous");
    assert!(fixture
        .temp_dir
        .path()
        .join("uploads/anonymous/id.png")
        .exists());
    let (_, body) = fixture.get_json("/api/documents?user_id=anonymous").await;
    assert_eq!(body["documents"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_delete_document() {
    let fixture = TestFixture::new().await;
    let document = fixture.upload("7", "notes.txt", b"hello").await;
    let stored = fixture.temp_dir.path().join("uploads/7/notes.txt");
    assert!(stored.exists());

    let resp = fixture
        .client
        .delete(fixture.url(&format!("/api/documents/{}", document["id"])))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(
        body,
        json!({"success": true, "message": "Document deleted"})
    );
    assert!(!stored.exists());

    let resp = fixture
        .client
        .get(fixture.url(&format!("/api/documents/{}/download", document["id"])))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);

    let resp = fixture
        .client
        .delete(fixture.url(&format!("/api/documents/{}", document["id"])))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);

    // A later upload never takes over the deleted id
    let next = fixture.upload("7", "notes.txt", b"again").await;
    assert!(next["id"].as_i64().unwrap() > document["id"].as_i64().unwrap());
}

#[tokio::test]
async fn test_missing_file_on_disk() {
    let fixture = TestFixture::new().await;
    let document = fixture.upload("7", "scan.jpg", b"jpeg").await;

    std::fs::remove_file(fixture.temp_dir.path().join("uploads/7/scan.jpg")).unwrap();

    let resp = fixture
        .client
        .get(fixture.url(&format!("/api/documents/{}/view", document["id"])))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["message"], "File missing");
}

// ==== MISC TESTS ====

#[tokio::test]
async fn test_notifications() {
    let fixture = TestFixture::new().await;

    let (status, body) = fixture.get_json("/api/notifications?userId=42").await;
    assert_eq!(status, 200);
    let data = body["notifications"].as_array().unwrap();
    assert_eq!(data.len(), 2);
    assert_eq!(data[0]["title"], "Welcome");
    assert_eq!(data[1]["userId"], "42");

    let (_, body) = fixture.get_json("/api/notifications").await;
    assert_eq!(body["notifications"][0]["userId"], "anonymous");
}

#[tokio::test]
async fn test_voice() {
    let fixture = TestFixture::new().await;

    let form = multipart::Form::new().part(
        "audio",
        multipart::Part::bytes(vec![0u8; 64]).file_name("clip.webm"),
    );
    let resp = fixture
        .client
        .post(fixture.url("/api/voice"))
        .multipart(form)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(
        body["transcript"],
        crate::api::PLACEHOLDER_TRANSCRIPT
    );

    let resp = fixture
        .client
        .post(fixture.url("/api/voice"))
        .multipart(multipart::Form::new().text("lang", "en"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["message"], "No audio provided");
}

#[tokio::test]
async fn test_location() {
    let geo = Router::new().route(
        "/json",
        get(|| async { Json(json!({"ip": "203.0.113.5", "loc": "12.9716,77.5946"})) }),
    );
    let geo_url = format!("{}/json", spawn(geo).await);
    let fixture = TestFixture::with_geolocation(geo_url).await;

    let (status, body) = fixture.get_json("/api/location").await;
    assert_eq!(status, 200);
    assert_eq!(body["lat"], 12.9716);
    assert_eq!(body["lng"], 77.5946);
}

#[tokio::test]
async fn test_location_unavailable() {
    let fixture = TestFixture::new().await;

    let (status, body) = fixture.get_json("/api/location").await;
    assert_eq!(status, 503);
    assert_eq!(body["success"], false);
    assert_eq!(body["message"], "Location unavailable");
}
