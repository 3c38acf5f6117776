// End-to-end flow over the in-memory store: accounts, form authoring,
// submissions and ownership checks.

use axum::http::StatusCode;
use formwork::testing::TestClient;
use serde_json::{Value, json};

async fn signup(client: &TestClient, email: &str, role: &str) -> (String, Value) {
    let resp = client
        .post("/api/auth/signup")
        .json(&json!({"email": email, "password": "secret123", "role": role}))
        .send()
        .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = resp.json().await;
    let token = body["token"].as_str().expect("token").to_string();
    (token, body["user"].clone())
}

fn contact_form() -> Value {
    json!({
        "title": "Contact",
        "description": "Reach out",
        "fields": [
            {"id": "name", "type": "text", "label": "Name", "required": true,
             "validation": "{\"minLength\": 2}"},
            {"id": "age", "type": "number", "label": "Age",
             "validation": {"min": 18}},
            {"id": "colour", "type": "radio", "label": "Colour"},
            {"id": "agree", "type": "checkbox", "label": "I agree"}
        ]
    })
}

#[tokio::test]
async fn health_reports_ok() {
    let client = TestClient::memory().await;
    let resp = client.get("/health").send().await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = resp.json().await;
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn unknown_route_is_json_404() {
    let client = TestClient::memory().await;
    let resp = client.get("/api/nowhere").send().await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let body: Value = resp.json().await;
    assert!(body["message"].is_string());
}

#[tokio::test]
async fn form_lifecycle() {
    let client = TestClient::memory().await;
    let (admin, _) = signup(&client, "admin@example.com", "ADMIN").await;
    let (user, user_json) = signup(&client, "user@example.com", "USER").await;

    // create
    let resp = client
        .post("/api/forms")
        .bearer(&admin)
        .json(&contact_form())
        .send()
        .await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let form: Value = resp.json().await;
    let form_id = form["id"].as_str().unwrap().to_string();
    let fields = form["fields"].as_array().unwrap();
    assert_eq!(fields.len(), 4);
    assert_eq!(fields[0]["order"], 0);
    assert_eq!(fields[0]["required"], true);
    assert_eq!(fields[0]["validation"]["minLength"], 2);
    assert_eq!(fields[2]["options"].as_array().unwrap().len(), 3);
    assert_eq!(fields[3]["options"][0]["value"], "true");
    assert_eq!(fields[3]["options"][0]["label"], "I agree");

    // list: admins see their own, users see everything
    let resp = client.get("/api/forms").bearer(&admin).send().await;
    assert_eq!(resp.status(), StatusCode::OK);
    let listed: Value = resp.json().await;
    assert_eq!(listed[0]["submissionCount"], 0);
    let listed: Value = client.get("/api/forms").bearer(&user).send().await.json().await;
    assert_eq!(listed.as_array().unwrap().len(), 1);

    // read
    let resp = client.get(&format!("/api/forms/{form_id}")).bearer(&user).send().await;
    assert_eq!(resp.status(), StatusCode::OK);

    // invalid submission reports every bad field
    let resp = client
        .post(&format!("/api/forms/{form_id}/submit"))
        .bearer(&user)
        .json(&json!({"responses": {"name": "", "age": "12"}}))
        .send()
        .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = resp.json().await;
    assert_eq!(body["errors"]["name"], "Name is required");
    assert_eq!(body["errors"]["age"], "Age must be at least 18");

    // valid submission is coerced
    let resp = client
        .post(&format!("/api/forms/{form_id}/submit"))
        .bearer(&user)
        .json(&json!({"responses": {"name": "Ada", "age": "36", "agree": "yes"}}))
        .send()
        .await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let submission: Value = resp.json().await;
    assert_eq!(submission["responses"]["name"], "Ada");
    assert_eq!(submission["responses"]["age"].as_f64(), Some(36.0));
    assert_eq!(submission["responses"]["agree"], true);
    assert_eq!(submission["userId"], user_json["id"]);

    // submissions are only for admins
    let resp = client
        .get(&format!("/api/forms/{form_id}/submissions"))
        .bearer(&user)
        .send()
        .await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    let entries: Value = client
        .get(&format!("/api/forms/{form_id}/submissions"))
        .bearer(&admin)
        .send()
        .await
        .json()
        .await;
    assert_eq!(entries.as_array().unwrap().len(), 1);
    assert_eq!(entries[0]["userEmail"], "user@example.com");

    let listed: Value = client.get("/api/forms").bearer(&admin).send().await.json().await;
    assert_eq!(listed[0]["submissionCount"], 1);

    // delete
    let resp = client.delete(&format!("/api/forms/{form_id}")).bearer(&admin).send().await;
    assert_eq!(resp.status(), StatusCode::OK);
    let resp = client.get(&format!("/api/forms/{form_id}")).bearer(&admin).send().await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn update_keeps_prior_rules_and_options() {
    let client = TestClient::memory().await;
    let (admin, _) = signup(&client, "owner@example.com", "ADMIN").await;

    let form: Value = client
        .post("/api/forms")
        .bearer(&admin)
        .json(&json!({
            "title": "Survey",
            "fields": [
                {"id": "pick", "type": "droplist", "label": "Pick",
                 "options": [{"label": "Red Wine"}, {"label": "Beer", "value": "b"}]},
                {"id": "n", "type": "number", "label": "N", "validation": {"max": 5}}
            ]
        }))
        .send()
        .await
        .json()
        .await;
    let form_id = form["id"].as_str().unwrap().to_string();
    assert_eq!(form["fields"][0]["options"][0]["value"], "red_wine");

    let resp = client
        .put(&format!("/api/forms/{form_id}"))
        .bearer(&admin)
        .json(&json!({
            "title": "Survey v2",
            "fields": [
                {"id": "n", "type": "number", "label": "Number", "validation": {"max": 50, "min": 1}},
                {"id": "pick", "type": "droplist", "label": "Pick one",
                 "options": [{"label": "Water"}]},
                {"type": "textarea", "label": "Notes"}
            ]
        }))
        .send()
        .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let updated: Value = resp.json().await;
    assert_eq!(updated["title"], "Survey v2");
    assert_eq!(updated["description"], Value::Null);

    let fields = updated["fields"].as_array().unwrap();
    assert_eq!(fields.len(), 3);
    assert_eq!(fields[0]["id"], "n");
    assert_eq!(fields[0]["label"], "Number");
    assert_eq!(fields[0]["validation"]["max"], 5);
    assert_eq!(fields[0]["validation"]["min"], 1);
    assert_eq!(fields[1]["order"], 1);
    assert_eq!(fields[1]["options"].as_array().unwrap().len(), 2);
    assert!(!fields[2]["id"].as_str().unwrap().is_empty());
}

#[tokio::test]
async fn admins_cannot_touch_each_others_forms() {
    let client = TestClient::memory().await;
    let (owner, _) = signup(&client, "a@example.com", "ADMIN").await;
    let (other, _) = signup(&client, "b@example.com", "ADMIN").await;

    let form: Value = client
        .post("/api/forms")
        .bearer(&owner)
        .json(&json!({"title": "Private", "fields": []}))
        .send()
        .await
        .json()
        .await;
    let path = format!("/api/forms/{}", form["id"].as_str().unwrap());

    assert_eq!(client.get(&path).bearer(&other).send().await.status(), StatusCode::FORBIDDEN);
    assert_eq!(client.delete(&path).bearer(&other).send().await.status(), StatusCode::FORBIDDEN);
    let resp = client
        .put(&path)
        .bearer(&other)
        .json(&json!({"fields": []}))
        .send()
        .await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    let listed: Value = client.get("/api/forms").bearer(&other).send().await.json().await;
    assert_eq!(listed, json!([]));
}

#[tokio::test]
async fn malformed_requests_are_rejected() {
    let client = TestClient::memory().await;
    let (admin, _) = signup(&client, "admin@example.com", "ADMIN").await;

    let resp = client
        .post("/api/forms")
        .bearer(&admin)
        .json(&json!({"title": "Broken", "fields": [{"label": "No type"}]}))
        .send()
        .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = resp.json().await;
    assert_eq!(body["error"], "field at position 0 has no type");

    let resp = client.get("/api/forms/not-a-uuid").bearer(&admin).send().await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let resp = client
        .post("/api/forms/00000000-0000-0000-0000-000000000000/submit")
        .bearer(&admin)
        .json(&json!({"responses": {}}))
        .send()
        .await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn malformed_update_leaves_form_untouched() {
    let client = TestClient::memory().await;
    let (admin, _) = signup(&client, "admin@example.com", "ADMIN").await;

    let created: Value = client
        .post("/api/forms")
        .bearer(&admin)
        .json(&contact_form())
        .send()
        .await
        .json()
        .await;
    let path = format!("/api/forms/{}", created["id"].as_str().unwrap());

    let resp = client
        .put(&path)
        .bearer(&admin)
        .json(&json!({
            "title": "Renamed",
            "fields": [
                {"id": "name", "type": "text", "label": "Full name"},
                {"id": "age", "label": "Age"}
            ]
        }))
        .send()
        .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = resp.json().await;
    assert_eq!(body["message"], "Invalid field data");
    assert_eq!(body["error"], "field at position 1 has no type");

    let stored: Value = client.get(&path).bearer(&admin).send().await.json().await;
    assert_eq!(stored["title"], "Contact");
    assert_eq!(stored["fields"], created["fields"]);
}

#[tokio::test]
async fn string_constraints_keep_required() {
    let client = TestClient::memory().await;
    let (admin, _) = signup(&client, "admin@example.com", "ADMIN").await;
    let (user, _) = signup(&client, "user@example.com", "USER").await;

    let form: Value = client
        .post("/api/forms")
        .bearer(&admin)
        .json(&json!({
            "title": "Signup",
            "fields": [{"id": "name", "type": "text", "label": "Name",
                        "validation": {"required": true, "minLength": "3"}}]
        }))
        .send()
        .await
        .json()
        .await;
    assert_eq!(form["fields"][0]["required"], true);
    assert_eq!(form["fields"][0]["validation"]["minLength"], 3);

    let submit = format!("/api/forms/{}/submit", form["id"].as_str().unwrap());
    let resp = client
        .post(&submit)
        .bearer(&user)
        .json(&json!({"responses": {}}))
        .send()
        .await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = resp.json().await;
    assert_eq!(body["errors"]["name"], "Name is required");

    let resp = client
        .post(&submit)
        .bearer(&user)
        .json(&json!({"responses": {"name": "Al"}}))
        .send()
        .await;
    let body: Value = resp.json().await;
    assert_eq!(body["errors"]["name"], "Name must be at least 3 characters");
}
