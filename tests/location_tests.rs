mod common;

use axum::http::StatusCode;
use common::{TestApp, spawn_app};
use futures::future::join_all;
use serde_json::{Value, json};

struct Fixture {
    admin: String,
    company: i64,
    profile: i64,
    ops: i64,
}

async fn fixture(app: &TestApp) -> Fixture {
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
    let ops = app
        .create("/api/departments", &admin, json!({ "title": "ops" }))
        .await;

    Fixture {
        admin,
        company,
        profile,
        ops,
    }
}

async fn create_equipment(app: &TestApp, f: &Fixture, serial: &str) -> i64 {
    app.create(
        "/api/equipments",
        &f.admin,
        json!({
            "serial_number": serial,
            "profile_id": f.profile,
            "occurred_at": "2026-01-01T10:00:00Z",
            "company_id": f.company,
        }),
    )
    .await
}

fn request(equipment_id: i64, company_id: i64, this: &str, to: &str, extra: Value) -> Value {
    let mut body = json!({
        "occurred_at": "2026-01-02T10:00:00Z",
        "equipment_id": equipment_id,
        "company_id": company_id,
        "this_location": this,
        "where": to,
    });
    if let (Some(body), Some(extra)) = (body.as_object_mut(), extra.as_object()) {
        body.extend(extra.clone());
    }
    body
}

async fn transfer(app: &TestApp, cookie: &str, requests: Vec<Value>) -> Vec<i64> {
    let response = app
        .post("/api/locations", cookie, json!({ "requests": requests }))
        .await;
    assert_eq!(
        response.status,
        StatusCode::CREATED,
        "transfer failed: {:?}",
        response.body
    );
    response.body["ids"]
        .as_array()
        .unwrap()
        .iter()
        .map(|id| id.as_i64().unwrap())
        .collect()
}

async fn history(app: &TestApp, cookie: &str, equipment_id: i64) -> Vec<Value> {
    let response = app
        .get(&format!("/api/equipments/{equipment_id}/locations"), cookie)
        .await;
    assert_eq!(response.status, StatusCode::OK);
    response.body.as_array().unwrap().clone()
}

/// Every movement must start where the one before it ended. `history` is
/// newest first.
fn assert_chained(history: &[Value]) {
    for pair in history.windows(2) {
        let (newer, older) = (&pair[0], &pair[1]);
        for place in ["department", "employee", "contract"] {
            assert_eq!(
                newer[format!("from_{place}_id")],
                older[format!("to_{place}_id")],
                "movement {} does not start where {} ended",
                newer["id"],
                older["id"]
            );
        }
    }
}

async fn latest(app: &TestApp, cookie: &str, equipment_id: i64) -> Value {
    let response = app
        .get(&format!("/api/equipments/{equipment_id}/location"), cookie)
        .await;
    assert_eq!(response.status, StatusCode::OK);
    response.body
}

#[tokio::test]
async fn test_create_places_equipment_in_storage() {
    let app = spawn_app().await;
    let f = fixture(&app).await;

    let id = create_equipment(&app, &f, " sn-001 ").await;

    let response = app.get(&format!("/api/equipments/{id}"), &f.admin).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["serial_number"], "SN-001");
    assert_eq!(response.body["profile"], "laser");
    assert_eq!(response.body["category"], "printers");
    assert_eq!(response.body["location"]["code"], "ADD_TO_STORAGE");

    let response = app
        .get(&format!("/api/equipments/{id}/locations"), &f.admin)
        .await;
    let history = response.body.as_array().unwrap();
    assert_eq!(history.len(), 1);
    let movement = &history[0];
    assert_eq!(movement["company"], "acme");
    for field in [
        "from_department_id",
        "from_employee_id",
        "from_contract_id",
        "to_department_id",
        "to_employee_id",
        "to_contract_id",
    ] {
        assert!(movement[field].is_null(), "{field} should be null");
    }

    // Serials are compared after uppercasing
    let response = app
        .post(
            "/api/equipments",
            &f.admin,
            json!({ "serial_number": "SN-001", "profile_id": f.profile, "company_id": f.company }),
        )
        .await;
    assert_eq!(response.status, StatusCode::CONFLICT);

    let response = app.get("/api/locations", &f.admin).await;
    assert_eq!(response.body["total"], 1);
    assert_eq!(response.body["items"][0]["equipment_id"], id);
}

#[tokio::test]
async fn test_create_with_direct_placement() {
    let app = spawn_app().await;
    let f = fixture(&app).await;

    let id = app
        .create(
            "/api/equipments",
            &f.admin,
            json!({
                "serial_number": "sn-9",
                "profile_id": f.profile,
                "company_id": f.company,
                "to_department": f.ops,
            }),
        )
        .await;

    let movement = latest(&app, &f.admin, id).await;
    assert_eq!(movement["code"], "ADD_TO_DEPARTMENT");
    assert_eq!(movement["to_department_id"], f.ops);
    assert_eq!(movement["to_department"], "ops");

    let response = app
        .get(&format!("/api/equipments/{id}/locations"), &f.admin)
        .await;
    assert_eq!(response.body.as_array().unwrap().len(), 1);

    // A failed placement leaves no equipment behind
    let response = app
        .post(
            "/api/equipments",
            &f.admin,
            json!({
                "serial_number": "sn-10",
                "profile_id": f.profile,
                "company_id": f.company,
                "to_department": 999,
            }),
        )
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);

    let response = app.get("/api/equipments?search=sn-10", &f.admin).await;
    assert_eq!(response.body["total"], 0);
}

#[tokio::test]
async fn test_transfer_chain_and_current_view() {
    let app = spawn_app().await;
    let f = fixture(&app).await;
    let equipment = create_equipment(&app, &f, "sn-001").await;

    transfer(
        &app,
        &f.admin,
        vec![request(
            equipment,
            f.company,
            "storage",
            "department",
            json!({ "to_department": f.ops }),
        )],
    )
    .await;

    let movement = latest(&app, &f.admin, equipment).await;
    assert_eq!(movement["code"], "STORAGE_TO_DEPARTMENT");
    assert_eq!(movement["to_department_id"], f.ops);
    assert!(movement["from_department_id"].is_null());

    let employee = app
        .create(
            "/api/employees",
            &f.admin,
            json!({ "last_name": "One", "first_name": "E", "phone": "+1", "department_id": f.ops }),
        )
        .await;

    transfer(
        &app,
        &f.admin,
        vec![request(
            equipment,
            f.company,
            "department",
            "employee",
            json!({ "to_department": f.ops, "to_employee": employee, "in_department": true }),
        )],
    )
    .await;

    let movement = latest(&app, &f.admin, equipment).await;
    assert_eq!(movement["code"], "DEPARTMENT_TO_EMPLOYEE_IN_DEPARTMENT");
    assert_eq!(movement["from_department_id"], f.ops);
    assert_eq!(movement["to_department_id"], f.ops);
    assert_eq!(movement["to_employee_id"], employee);
    assert_eq!(movement["to_employee"], "One E");

    // The latest movement still targets the department
    let response = app
        .get(&format!("/api/locations?to_department_id={}", f.ops), &f.admin)
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["total"], 1);
    assert_eq!(response.body["items"][0]["equipment_id"], equipment);

    let response = app.get("/api/locations?to_department_id=0", &f.admin).await;
    assert_eq!(response.body["total"], 0);

    let response = app
        .get(&format!("/api/equipments/{equipment}/locations"), &f.admin)
        .await;
    let codes: Vec<&str> = response
        .body
        .as_array()
        .unwrap()
        .iter()
        .map(|m| m["code"].as_str().unwrap())
        .collect();
    assert_eq!(
        codes,
        vec![
            "DEPARTMENT_TO_EMPLOYEE_IN_DEPARTMENT",
            "STORAGE_TO_DEPARTMENT",
            "ADD_TO_STORAGE"
        ]
    );

    // Soft-deleted equipment leaves the view
    app.delete(&format!("/api/equipments/{equipment}"), &f.admin)
        .await;
    let response = app
        .get(&format!("/api/locations?to_department_id={}", f.ops), &f.admin)
        .await;
    assert_eq!(response.body["total"], 0);
}

#[tokio::test]
async fn test_replace_pair_is_deleted_together() {
    let app = spawn_app().await;
    let f = fixture(&app).await;
    let employee = app
        .create(
            "/api/employees",
            &f.admin,
            json!({ "last_name": "One", "first_name": "E", "phone": "+1", "department_id": f.ops }),
        )
        .await;

    let first = create_equipment(&app, &f, "sn-001").await;
    let second = create_equipment(&app, &f, "sn-002").await;
    transfer(
        &app,
        &f.admin,
        vec![
            request(
                first,
                f.company,
                "storage",
                "department",
                json!({ "to_department": f.ops }),
            ),
            request(
                second,
                f.company,
                "storage",
                "department",
                json!({ "to_department": f.ops }),
            ),
        ],
    )
    .await;

    let ids = transfer(
        &app,
        &f.admin,
        vec![
            request(first, f.company, "department", "storage", json!({ "way": "replace" })),
            request(
                second,
                f.company,
                "department",
                "employee",
                json!({ "way": "replace", "to_employee": employee }),
            ),
        ],
    )
    .await;
    assert_eq!(ids.len(), 2);
    assert_eq!(latest(&app, &f.admin, first).await["code"], "DEPARTMENT_TO_STORAGE");
    assert_eq!(latest(&app, &f.admin, second).await["code"], "DEPARTMENT_TO_EMPLOYEE");

    let response = app
        .delete(&format!("/api/locations/{}", ids[0]), &f.admin)
        .await;
    assert_eq!(response.status, StatusCode::NO_CONTENT);

    assert_eq!(latest(&app, &f.admin, first).await["code"], "STORAGE_TO_DEPARTMENT");
    assert_eq!(latest(&app, &f.admin, second).await["code"], "STORAGE_TO_DEPARTMENT");

    let response = app
        .delete(&format!("/api/locations/{}", ids[1]), &f.admin)
        .await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);

    let response = app.delete("/api/locations/0", &f.admin).await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_invalid_sequences_write_nothing() {
    let app = spawn_app().await;
    let f = fixture(&app).await;
    let equipment = create_equipment(&app, &f, "sn-001").await;

    let cases = vec![
        // Unknown place label
        vec![request(
            equipment,
            f.company,
            "garage",
            "department",
            json!({ "to_department": f.ops }),
        )],
        // Replace sequence with a single request
        vec![request(
            equipment,
            f.company,
            "storage",
            "department",
            json!({ "way": "replace", "to_department": f.ops }),
        )],
        // Contract mixed with a department
        vec![request(
            equipment,
            f.company,
            "storage",
            "contract",
            json!({ "to_contract": 1, "to_department": f.ops, "transfer_type": "lease" }),
        )],
        // Valid first request, missing department in the second
        vec![
            request(
                equipment,
                f.company,
                "storage",
                "department",
                json!({ "to_department": f.ops }),
            ),
            request(
                equipment,
                f.company,
                "department",
                "department",
                json!({ "to_department": 999 }),
            ),
        ],
        // Unknown equipment
        vec![request(
            4242,
            f.company,
            "storage",
            "department",
            json!({ "to_department": f.ops }),
        )],
    ];

    for requests in cases {
        let response = app
            .post("/api/locations", &f.admin, json!({ "requests": requests }))
            .await;
        assert!(
            response.status == StatusCode::BAD_REQUEST || response.status == StatusCode::NOT_FOUND,
            "unexpected status {} for {:?}",
            response.status,
            requests
        );
    }

    let response = app
        .get(&format!("/api/equipments/{equipment}/locations"), &f.admin)
        .await;
    assert_eq!(response.body.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_contract_transfer() {
    let app = spawn_app().await;
    let f = fixture(&app).await;
    let equipment = create_equipment(&app, &f, "sn-001").await;
    let contract = app
        .create(
            "/api/contracts",
            &f.admin,
            json!({ "number": "C-7", "address": "1 Main St" }),
        )
        .await;

    let unpriced = request(
        equipment,
        f.company,
        "storage",
        "contract",
        json!({ "to_contract": contract }),
    );
    let response = app
        .post("/api/locations", &f.admin, json!({ "requests": [unpriced] }))
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);

    transfer(
        &app,
        &f.admin,
        vec![request(
            equipment,
            f.company,
            "storage",
            "contract",
            json!({ "to_contract": contract, "transfer_type": "lease", "price": "100" }),
        )],
    )
    .await;

    let movement = latest(&app, &f.admin, equipment).await;
    assert_eq!(movement["code"], "STORAGE_TO_CONTRACT");
    assert_eq!(movement["to_contract"], "C-7");
    assert_eq!(movement["transfer_type"], "lease");
    assert_eq!(movement["price"], "100");

    let response = app.get("/api/locations", &f.admin).await;
    assert_eq!(response.body["total"], 0);
}

#[tokio::test]
async fn test_one_call_can_move_the_same_equipment_twice() {
    let app = spawn_app().await;
    let f = fixture(&app).await;
    let equipment = create_equipment(&app, &f, "sn-001").await;
    let employee = app
        .create(
            "/api/employees",
            &f.admin,
            json!({ "last_name": "One", "first_name": "E", "phone": "+1" }),
        )
        .await;

    let ids = transfer(
        &app,
        &f.admin,
        vec![
            request(
                equipment,
                f.company,
                "storage",
                "department",
                json!({ "to_department": f.ops }),
            ),
            request(
                equipment,
                f.company,
                "department",
                "employee",
                json!({ "to_employee": employee }),
            ),
        ],
    )
    .await;
    assert_eq!(ids.len(), 2);

    let history = history(&app, &f.admin, equipment).await;
    assert_eq!(history.len(), 3);
    assert_eq!(history[0]["id"], ids[1]);
    assert_eq!(history[0]["code"], "DEPARTMENT_TO_EMPLOYEE");
    assert_eq!(history[0]["from_department_id"], f.ops);
    assert_eq!(history[0]["to_employee_id"], employee);
    assert!(history[0]["to_department_id"].is_null());
    assert_eq!(history[1]["id"], ids[0]);
    assert_chained(&history);
}

#[tokio::test]
async fn test_replace_after_a_plain_first_request_is_not_paired() {
    let app = spawn_app().await;
    let f = fixture(&app).await;
    let first = create_equipment(&app, &f, "sn-001").await;
    let second = create_equipment(&app, &f, "sn-002").await;

    let ids = transfer(
        &app,
        &f.admin,
        vec![
            request(
                first,
                f.company,
                "storage",
                "department",
                json!({ "to_department": f.ops }),
            ),
            request(
                second,
                f.company,
                "storage",
                "department",
                json!({ "way": "replace", "to_department": f.ops }),
            ),
        ],
    )
    .await;
    assert_eq!(ids.len(), 2);

    // Without a pair each movement is deleted on its own
    let response = app
        .delete(&format!("/api/locations/{}", ids[1]), &f.admin)
        .await;
    assert_eq!(response.status, StatusCode::NO_CONTENT);
    assert_eq!(latest(&app, &f.admin, first).await["code"], "STORAGE_TO_DEPARTMENT");
    assert_eq!(latest(&app, &f.admin, second).await["code"], "ADD_TO_STORAGE");

    let response = app
        .delete(&format!("/api/locations/{}", ids[0]), &f.admin)
        .await;
    assert_eq!(response.status, StatusCode::NO_CONTENT);
    assert_eq!(latest(&app, &f.admin, first).await["code"], "ADD_TO_STORAGE");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_transfers_of_one_equipment_all_succeed() {
    let app = spawn_app().await;
    let f = fixture(&app).await;
    let equipment = create_equipment(&app, &f, "sn-001").await;

    let body = json!({
        "requests": [request(
            equipment,
            f.company,
            "storage",
            "department",
            json!({ "to_department": f.ops }),
        )]
    });
    let responses = join_all(
        (0..20).map(|_| app.post("/api/locations", &f.admin, body.clone())),
    )
    .await;

    for response in &responses {
        assert_eq!(
            response.status,
            StatusCode::CREATED,
            "transfer failed: {:?}",
            response.body
        );
    }

    let history = history(&app, &f.admin, equipment).await;
    assert_eq!(history.len(), 21);
    assert_chained(&history);
}
