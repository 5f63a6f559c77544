use entity_api_rust::api::routes::create_router;
use entity_api_rust::seed::demo_state;
use reqwest::{Client, StatusCode};
use serde_json::{json, Value};

// Test client wrapper for making API calls
struct TestClient {
    client: Client,
    base_url: String,
}

impl TestClient {
    fn new(base_url: String) -> Self {
        Self {
            client: Client::new(),
            base_url,
        }
    }

    async fn get(&self, path: &str) -> reqwest::Result<reqwest::Response> {
        self.client
            .get(format!("{}{}", self.base_url, path))
            .send()
            .await
    }

    async fn post(&self, path: &str, json: Value) -> reqwest::Result<reqwest::Response> {
        self.client
            .post(format!("{}{}", self.base_url, path))
            .header("x-access-scopes", "write")
            .json(&json)
            .send()
            .await
    }

    async fn patch(&self, path: &str, json: Value) -> reqwest::Result<reqwest::Response> {
        self.client
            .patch(format!("{}{}", self.base_url, path))
            .header("x-access-scopes", "write")
            .json(&json)
            .send()
            .await
    }

    async fn delete(&self, path: &str) -> reqwest::Result<reqwest::Response> {
        self.client
            .delete(format!("{}{}", self.base_url, path))
            .header("x-access-scopes", "write")
            .send()
            .await
    }
}

// Spawn the API with its own seeded in-memory state on an ephemeral port.
async fn spawn_server() -> TestClient {
    let app = create_router().with_state(demo_state());
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind test listener");
    let addr = listener.local_addr().expect("Failed to read local address");

    tokio::spawn(async move {
        axum::serve(listener, app)
            .await
            .expect("Test server crashed");
    });

    TestClient::new(format!("http://{}", addr))
}

#[tokio::test]
async fn test_health_and_root_listing() {
    let client = spawn_server().await;

    let response = client.get("/health").await.expect("Health request failed");
    assert_eq!(response.status(), StatusCode::OK);

    let response = client
        .get("/api/product")
        .await
        .expect("Listing request failed");
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.expect("Invalid listing body");
    assert_eq!(body["total"], json!(2));
    assert_eq!(body["items"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_detail_and_nested_listings() {
    let client = spawn_server().await;

    let response = client
        .get("/api/product/P1")
        .await
        .expect("Detail request failed");
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.expect("Invalid detail body");
    assert_eq!(body["name"], json!("Hammer"));

    // Many-to-many hop lands on the category side of the junction.
    let response = client
        .get("/api/product/P1/categories")
        .await
        .expect("Category listing failed");
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.expect("Invalid category listing");
    assert_eq!(body["total"], json!(1));
    assert_eq!(body["items"][0]["id"], json!("C1"));

    // Many-to-one is listed through the reverse edge on the parent.
    let response = client
        .get("/api/product/P1/manufacturer")
        .await
        .expect("Manufacturer listing failed");
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.expect("Invalid manufacturer listing");
    assert_eq!(body["total"], json!(1));
    assert_eq!(body["items"][0]["id"], json!("M1"));

    let response = client
        .get("/api/product/P1/unit-prices")
        .await
        .expect("Price listing failed");
    let body: Value = response.json().await.expect("Invalid price listing");
    assert_eq!(body["total"], json!(1));
    assert_eq!(body["items"][0]["productId"], json!("P1"));
}

#[tokio::test]
async fn test_write_workflow() {
    let client = spawn_server().await;

    // Default create answers contentless with a Location header.
    let response = client
        .post("/api/product", json!({"name": "Wrench", "price": 4}))
        .await
        .expect("Create request failed");
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    let location = response
        .headers()
        .get("location")
        .and_then(|v| v.to_str().ok())
        .expect("Missing Location header")
        .to_string();
    assert!(location.starts_with("/api/product/"));

    // The `_response` flag asks for the written row instead.
    let response = client
        .post(
            "/api/product?_response=true",
            json!({"name": "Pliers", "price": 6}),
        )
        .await
        .expect("Create with _response failed");
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.expect("Invalid create body");
    assert_eq!(body["name"], json!("Pliers"));
    assert!(body["id"].is_string());

    // Update through PATCH with the identifier on the path.
    let response = client
        .patch("/api/product/P1", json!({"name": "Sledgehammer"}))
        .await
        .expect("Update request failed");
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    let response = client.get("/api/product/P1").await.expect("Re-read failed");
    let body: Value = response.json().await.expect("Invalid re-read body");
    assert_eq!(body["name"], json!("Sledgehammer"));

    // Nested create injects the parent foreign key.
    let response = client
        .post(
            "/api/product/P1/unit-prices?_response=true",
            json!({"price": 3}),
        )
        .await
        .expect("Nested create failed");
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.expect("Invalid nested create body");
    assert_eq!(body["productId"], json!("P1"));
}

#[tokio::test]
async fn test_write_rejections() {
    let client = spawn_server().await;

    // POST onto an existing identifier is not a create.
    let response = client
        .post("/api/product/P1", json!({"name": "x"}))
        .await
        .expect("Request failed");
    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    let allow = response
        .headers()
        .get("allow")
        .and_then(|v| v.to_str().ok())
        .expect("Missing Allow header");
    assert!(allow.contains("PATCH"));

    // Writes without the write scope are refused.
    let response = client
        .client
        .post(format!("{}/api/product", client.base_url))
        .json(&json!({"name": "x"}))
        .send()
        .await
        .expect("Request failed");
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    // Unknown content types are refused before any decoding.
    let response = client
        .client
        .post(format!("{}/api/product", client.base_url))
        .header("x-access-scopes", "write")
        .header("content-type", "text/xml")
        .body("<product/>")
        .send()
        .await
        .expect("Request failed");
    assert_eq!(response.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);

    // Indexed bulk payloads are not accepted on this route.
    let response = client
        .post(
            "/api/product",
            json!({"0": {"name": "a"}, "1": {"name": "b"}}),
        )
        .await
        .expect("Request failed");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_junction_delete_keeps_both_sides() {
    let client = spawn_server().await;

    let response = client
        .delete("/api/product/P1/categories/C1")
        .await
        .expect("Delete request failed");
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    // The link is gone.
    let response = client
        .get("/api/product/P1/categories")
        .await
        .expect("Listing request failed");
    let body: Value = response.json().await.expect("Invalid listing body");
    assert_eq!(body["total"], json!(0));

    // Both endpoint rows survive.
    let response = client.get("/api/product/P1").await.expect("Request failed");
    assert_eq!(response.status(), StatusCode::OK);
    let response = client
        .get("/api/category/C1")
        .await
        .expect("Request failed");
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_json_api_body_and_clone_action() {
    let client = spawn_server().await;

    // JSON:API envelope: attributes merge into the payload.
    let envelope = json!({
        "data": {
            "type": "product",
            "attributes": {"name": "Chisel", "price": 2}
        }
    });
    let response = client
        .client
        .post(format!("{}/api/product?_response=true", client.base_url))
        .header("x-access-scopes", "write")
        .header("content-type", "application/vnd.api+json")
        .body(envelope.to_string())
        .send()
        .await
        .expect("Request failed");
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.expect("Invalid body");
    assert_eq!(body["name"], json!("Chisel"));

    // Clone duplicates a top-level row under a fresh identifier.
    let response = client
        .post("/api/_action/clone/product/P1", json!({}))
        .await
        .expect("Clone request failed");
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.expect("Invalid clone body");
    let new_id = body["id"].as_str().expect("Clone id missing").to_string();
    assert_ne!(new_id, "P1");

    let response = client
        .get(&format!("/api/product/{}", new_id))
        .await
        .expect("Request failed");
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.expect("Invalid body");
    assert_eq!(body["name"], json!("Hammer"));

    let response = client
        .post("/api/_action/clone/product/missing", json!({}))
        .await
        .expect("Clone request failed");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_unknown_paths_are_not_found() {
    let client = spawn_server().await;

    let response = client
        .get("/api/spaceship")
        .await
        .expect("Request failed");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = client
        .get("/api/product/P1/warehouses")
        .await
        .expect("Request failed");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body: Value = response.json().await.expect("Invalid error body");
    assert!(body["error"]
        .as_str()
        .unwrap()
        .contains("product.warehouses"));
}
