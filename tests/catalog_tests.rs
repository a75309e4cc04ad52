mod common;

use axum::http::StatusCode;
use common::spawn_app;
use serde_json::json;

#[tokio::test]
async fn test_category_lifecycle() {
    let app = spawn_app().await;
    let admin = app.admin().await;

    let id = app
        .create("/api/categories", &admin, json!({ "title": "printers" }))
        .await;

    let response = app.get(&format!("/api/categories/{id}"), &admin).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["title"], "printers");
    assert!(response.body["deleted_at"].is_null());

    let response = app
        .put(
            &format!("/api/categories/{id}"),
            &admin,
            json!({ "title": "laser printers" }),
        )
        .await;
    assert_eq!(response.status, StatusCode::NO_CONTENT);

    let response = app.delete(&format!("/api/categories/{id}"), &admin).await;
    assert_eq!(response.status, StatusCode::NO_CONTENT);

    // Deleted rows stay readable but drop out of default listings
    let response = app.get(&format!("/api/categories/{id}"), &admin).await;
    assert_eq!(response.status, StatusCode::OK);
    assert!(response.body["deleted_at"].is_string());

    let response = app.get("/api/categories", &admin).await;
    assert_eq!(response.body["total"], 0);

    let response = app.get("/api/categories?deleted=true", &admin).await;
    assert_eq!(response.body["total"], 1);

    // Updating or deleting a deleted row finds nothing
    let response = app
        .put(&format!("/api/categories/{id}"), &admin, json!({ "title": "x" }))
        .await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
    let response = app.delete(&format!("/api/categories/{id}"), &admin).await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);

    let response = app
        .put(&format!("/api/categories/{id}/restore"), &admin, json!({}))
        .await;
    assert_eq!(response.status, StatusCode::NO_CONTENT);

    // Restoring a live row finds nothing to restore
    let response = app
        .put(&format!("/api/categories/{id}/restore"), &admin, json!({}))
        .await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);

    let response = app.get("/api/categories/999", &admin).await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);

    let response = app.get("/api/categories/0", &admin).await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_uniqueness_is_among_live_rows() {
    let app = spawn_app().await;
    let admin = app.admin().await;

    let original = app
        .create("/api/categories", &admin, json!({ "title": "x" }))
        .await;

    let response = app
        .post("/api/categories", &admin, json!({ "title": "x" }))
        .await;
    assert_eq!(response.status, StatusCode::CONFLICT);

    app.delete(&format!("/api/categories/{original}"), &admin)
        .await;

    let replacement = app
        .create("/api/categories", &admin, json!({ "title": "x" }))
        .await;
    assert_ne!(original, replacement);

    let response = app
        .put(
            &format!("/api/categories/{original}/restore"),
            &admin,
            json!({}),
        )
        .await;
    assert_eq!(response.status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_list_filters_sorting_and_pagination() {
    let app = spawn_app().await;
    let admin = app.admin().await;

    let mut ids = Vec::new();
    for title in ["Bravo", "alpha", "Charlie", "delta-alpha"] {
        ids.push(
            app.create("/api/departments", &admin, json!({ "title": title }))
                .await,
        );
    }

    let response = app.get("/api/departments?search=ALPHA", &admin).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["total"], 2);

    let response = app
        .get("/api/departments?sort_by=title&order=DESC", &admin)
        .await;
    let titles: Vec<&str> = response.body["items"]
        .as_array()
        .unwrap()
        .iter()
        .map(|item| item["title"].as_str().unwrap())
        .collect();
    assert_eq!(titles, vec!["delta-alpha", "alpha", "Charlie", "Bravo"]);

    let response = app
        .get("/api/departments?limit=2&offset=1", &admin)
        .await;
    assert_eq!(response.body["total"], 4);
    let page: Vec<i64> = response.body["items"]
        .as_array()
        .unwrap()
        .iter()
        .map(|item| item["id"].as_i64().unwrap())
        .collect();
    assert_eq!(page, vec![ids[1], ids[2]]);

    let response = app
        .get(
            &format!("/api/departments?ids={},{}", ids[0], ids[3]),
            &admin,
        )
        .await;
    assert_eq!(response.body["total"], 2);

    let response = app.get("/api/departments?limit=0", &admin).await;
    assert_eq!(response.body["items"].as_array().unwrap().len(), 4);

    let response = app.get("/api/departments?sort_by=color", &admin).await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);

    let response = app.get("/api/departments?order=sideways", &admin).await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);

    let response = app.get("/api/departments?limit=-1", &admin).await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
}

/// Percent-encodes a query value byte by byte.
fn query_value(value: &str) -> String {
    value
        .bytes()
        .map(|b| {
            if b.is_ascii_alphanumeric() {
                char::from(b).to_string()
            } else {
                format!("%{b:02X}")
            }
        })
        .collect()
}

async fn searched_titles(app: &common::TestApp, cookie: &str, search: &str) -> Vec<String> {
    let uri = format!("/api/categories?search={}", query_value(search));
    let response = app.get(&uri, cookie).await;
    assert_eq!(response.status, StatusCode::OK);
    response.body["items"]
        .as_array()
        .unwrap()
        .iter()
        .map(|item| item["title"].as_str().unwrap().to_string())
        .collect()
}

#[tokio::test]
async fn test_search_is_a_literal_case_insensitive_substring() {
    let app = spawn_app().await;
    let admin = app.admin().await;

    for title in ["SNX1", "SN_1", "Принтеры", "100% wool"] {
        app.create("/api/categories", &admin, json!({ "title": title }))
            .await;
    }

    for search in ["Принтеры", "ПРИНТЕРЫ", "принт"] {
        assert_eq!(searched_titles(&app, &admin, search).await, vec!["Принтеры"]);
    }

    // LIKE wildcards in the term match only themselves
    assert_eq!(searched_titles(&app, &admin, "sn_1").await, vec!["SN_1"]);
    assert_eq!(searched_titles(&app, &admin, "%").await, vec!["100% wool"]);
    assert!(searched_titles(&app, &admin, "\\").await.is_empty());

    let id = app
        .create("/api/categories", &admin, json!({ "title": "Сканеры" }))
        .await;
    app.put(
        &format!("/api/categories/{id}"),
        &admin,
        json!({ "title": "Мониторы" }),
    )
    .await;
    assert!(searched_titles(&app, &admin, "сканер").await.is_empty());
    assert_eq!(searched_titles(&app, &admin, "МОНИТОР").await, vec!["Мониторы"]);
}

#[tokio::test]
async fn test_references_must_be_live() {
    let app = spawn_app().await;
    let admin = app.admin().await;

    let category = app
        .create("/api/categories", &admin, json!({ "title": "printers" }))
        .await;
    app.delete(&format!("/api/categories/{category}"), &admin)
        .await;

    let response = app
        .post(
            "/api/profiles",
            &admin,
            json!({ "title": "laser", "category_id": category }),
        )
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);

    let response = app
        .post(
            "/api/profiles",
            &admin,
            json!({ "title": "laser", "category_id": 4242 }),
        )
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_contracts_and_validation() {
    let app = spawn_app().await;
    let admin = app.admin().await;

    let id = app
        .create(
            "/api/contracts",
            &admin,
            json!({ "number": "C-1", "address": "1 Main St" }),
        )
        .await;

    let response = app.get("/api/contracts?search=main", &admin).await;
    assert_eq!(response.body["items"][0]["id"], id);

    let response = app
        .post(
            "/api/contracts",
            &admin,
            json!({ "number": "C-1", "address": "2 Side St" }),
        )
        .await;
    assert_eq!(response.status, StatusCode::CONFLICT);

    let response = app
        .post("/api/contracts", &admin, json!({ "number": "  ", "address": "x" }))
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);

    let response = app
        .post("/api/contracts", &admin, json!({ "number": 5 }))
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_employee_department_assignment() {
    let app = spawn_app().await;
    let admin = app.admin().await;

    let ops = app
        .create("/api/departments", &admin, json!({ "title": "ops" }))
        .await;
    let employee = app
        .create(
            "/api/employees",
            &admin,
            json!({
                "last_name": "Doe",
                "first_name": "Jane",
                "phone": "+100",
            }),
        )
        .await;

    let response = app
        .put(
            &format!("/api/employees/{employee}/set_department"),
            &admin,
            json!({ "department_id": ops }),
        )
        .await;
    assert_eq!(response.status, StatusCode::NO_CONTENT);

    let response = app.get(&format!("/api/employees/{employee}"), &admin).await;
    assert_eq!(response.body["department_id"], ops);

    let response = app
        .put(
            &format!("/api/employees/{employee}/set_department"),
            &admin,
            json!({ "department_id": 0 }),
        )
        .await;
    assert_eq!(response.status, StatusCode::NO_CONTENT);

    let response = app.get(&format!("/api/employees/{employee}"), &admin).await;
    assert!(response.body["department_id"].is_null());

    let response = app
        .put(
            &format!("/api/employees/{employee}/set_department"),
            &admin,
            json!({ "department_id": 77 }),
        )
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);

    let response = app
        .post(
            "/api/employees",
            &admin,
            json!({ "last_name": "Roe", "first_name": "Rick", "phone": "+100" }),
        )
        .await;
    assert_eq!(response.status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_employee_and_equipment_routes_serve_their_own_rows() {
    let app = spawn_app().await;
    let admin = app.admin().await;

    let category = app
        .create("/api/categories", &admin, json!({ "title": "printers" }))
        .await;
    let profile = app
        .create(
            "/api/profiles",
            &admin,
            json!({ "title": "laser", "category_id": category }),
        )
        .await;
    let company = app
        .create("/api/companies", &admin, json!({ "title": "acme" }))
        .await;
    let employee = app
        .create(
            "/api/employees",
            &admin,
            json!({ "last_name": "Doe", "first_name": "Jane", "phone": "+100" }),
        )
        .await;
    let equipment = app
        .create(
            "/api/equipments",
            &admin,
            json!({
                "serial_number": "SN-1",
                "profile_id": profile,
                "occurred_at": "2026-01-01T10:00:00Z",
                "company_id": company,
            }),
        )
        .await;

    let response = app.get("/api/employees", &admin).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["total"], 1);
    assert_eq!(response.body["items"][0]["last_name"], "Doe");

    let response = app.get(&format!("/api/employees/{employee}"), &admin).await;
    assert_eq!(response.body["first_name"], "Jane");

    let response = app.get("/api/equipments", &admin).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["total"], 1);
    assert_eq!(response.body["items"][0]["serial_number"], "SN-1");

    let response = app.get(&format!("/api/equipments/{equipment}"), &admin).await;
    assert_eq!(response.body["profile_id"], profile);
}
