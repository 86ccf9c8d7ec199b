//! End-to-end API tests for the report generation flow.
//!
//! Runs the HTTP handlers against an in-memory database and the
//! deterministic AI provider, exercising login, child registration,
//! report generation, and the admin review/send lifecycle.

use std::sync::Arc;

use actix_web::http::StatusCode;
use actix_web::{test, web, App};
use serde_json::{json, Value};

use sproutlog_lib::api;
use sproutlog_lib::auth;
use sproutlog_lib::db::{migrations, DbPool};
use sproutlog_lib::models::UserRole;
use sproutlog_lib::services::ai::{AiProvider, DeterministicStub};

const ADMIN_EMAIL: &str = "admin@test.local";
const ADMIN_PASSWORD: &str = "admin-test-password";
const PARENT_EMAIL: &str = "parent@test.local";
const PARENT_PASSWORD: &str = "parent-test-password";

fn test_pool() -> DbPool {
    let pool = DbPool::open_in_memory().unwrap();
    migrations::run_migrations(&pool).unwrap();
    auth::create_profile(&pool, "Test Admin", ADMIN_EMAIL, UserRole::Admin, ADMIN_PASSWORD)
        .unwrap();
    pool
}

macro_rules! test_app {
    ($pool:expr) => {{
        let provider: Arc<dyn AiProvider> = Arc::new(DeterministicStub::new(false));
        test::init_service(
            App::new()
                .app_data(web::Data::new($pool.clone()))
                .app_data(web::Data::new(provider))
                .service(
                    web::scope("/api/v1")
                        .configure(api::configure_auth_routes)
                        .configure(api::configure_child_routes)
                        .configure(api::configure_profile_routes)
                        .configure(api::configure_report_routes),
                ),
        )
        .await
    }};
}

async fn login(
    app: &impl actix_web::dev::Service<
        actix_http::Request,
        Response = actix_web::dev::ServiceResponse,
        Error = actix_web::Error,
    >,
    email: &str,
    password: &str,
) -> String {
    let req = test::TestRequest::post()
        .uri("/api/v1/auth/login")
        .set_json(json!({ "email": email, "password": password }))
        .to_request();
    let resp = test::call_service(app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = test::read_body_json(resp).await;
    body["token"].as_str().unwrap().to_string()
}

async fn create_child(
    app: &impl actix_web::dev::Service<
        actix_http::Request,
        Response = actix_web::dev::ServiceResponse,
        Error = actix_web::Error,
    >,
    token: &str,
    name: &str,
    parent_ids: Vec<String>,
) -> String {
    let req = test::TestRequest::post()
        .uri("/api/v1/children")
        .insert_header(("Authorization", format!("Bearer {}", token)))
        .set_json(json!({
            "name": name,
            "date_of_birth": "2021-04-12",
            "class": "Sunflower",
            "parent_ids": parent_ids,
        }))
        .to_request();
    let resp = test::call_service(app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let body: Value = test::read_body_json(resp).await;
    body["id"].as_str().unwrap().to_string()
}

#[actix_web::test]
async fn test_login_rejects_bad_password() {
    let pool = test_pool();
    let app = test_app!(pool);

    let req = test::TestRequest::post()
        .uri("/api/v1/auth/login")
        .set_json(json!({ "email": ADMIN_EMAIL, "password": "wrong" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn test_create_report_requires_auth() {
    let pool = test_pool();
    let app = test_app!(pool);

    let req = test::TestRequest::post()
        .uri("/api/v1/reports")
        .set_json(json!({ "theme": "Colors" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn test_report_generation_round_trip() {
    let pool = test_pool();
    let app = test_app!(pool);

    let token = login(&app, ADMIN_EMAIL, ADMIN_PASSWORD).await;
    let child_id = create_child(&app, &token, "Leo", vec![]).await;

    let req = test::TestRequest::post()
        .uri("/api/v1/reports")
        .insert_header(("Authorization", format!("Bearer {}", token)))
        .set_json(json!({
            "child_id": child_id,
            "date": "2026-03-15",
            "theme": "Under the Sea",
            "curiosity_seed": "Why do fish not sink?",
            "observer_notes": "Leo led the group discussion about buoyancy.",
            "ocr_text": "counted 12 shells and sorted them by size"
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let report: Value = test::read_body_json(resp).await;

    // Deterministic provider rates 6 of 7 areas above the lowest tier
    assert_eq!(report["total_areas"], 7);
    assert_eq!(report["activated_areas"], 6);
    assert_eq!(
        report["overall_score"].as_str().unwrap(),
        "Balanced Growth \u{2013} 6/7 Areas Active"
    );
    assert_eq!(report["admin_reviewed"], false);
    assert_eq!(report["sent_to_parent"], false);
    assert_eq!(report["growth_areas"].as_array().unwrap().len(), 7);
    let note = report["parent_note"].as_str().unwrap();
    assert!(note.contains("Leo"));
    assert!(note.contains("Under the Sea"));

    // Fetch it back by id
    let report_id = report["id"].as_str().unwrap();
    let req = test::TestRequest::get()
        .uri(&format!("/api/v1/reports/{}", report_id))
        .insert_header(("Authorization", format!("Bearer {}", token)))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let fetched: Value = test::read_body_json(resp).await;
    assert_eq!(fetched["id"], report["id"]);
    assert_eq!(fetched["growth_areas"], report["growth_areas"]);
}

#[actix_web::test]
async fn test_create_report_missing_fields() {
    let pool = test_pool();
    let app = test_app!(pool);

    let token = login(&app, ADMIN_EMAIL, ADMIN_PASSWORD).await;

    let req = test::TestRequest::post()
        .uri("/api/v1/reports")
        .insert_header(("Authorization", format!("Bearer {}", token)))
        .set_json(json!({ "theme": "Colors" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body: Value = test::read_body_json(resp).await;
    let message = body["message"].as_str().unwrap();
    assert!(message.contains("child_id"));
    assert!(message.contains("date"));
}

#[actix_web::test]
async fn test_parent_sees_report_only_after_send() {
    let pool = test_pool();
    let parent = auth::create_profile(
        &pool,
        "Test Parent",
        PARENT_EMAIL,
        UserRole::Parent,
        PARENT_PASSWORD,
    )
    .unwrap();
    let app = test_app!(pool);

    let admin_token = login(&app, ADMIN_EMAIL, ADMIN_PASSWORD).await;
    let child_id = create_child(&app, &admin_token, "Mia", vec![parent.id.to_string()]).await;

    let req = test::TestRequest::post()
        .uri("/api/v1/reports")
        .insert_header(("Authorization", format!("Bearer {}", admin_token)))
        .set_json(json!({
            "child_id": child_id,
            "date": "2026-03-16",
            "theme": "Gardening",
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let report: Value = test::read_body_json(resp).await;
    let report_id = report["id"].as_str().unwrap().to_string();

    // Unsent report is invisible to the parent
    let parent_token = login(&app, PARENT_EMAIL, PARENT_PASSWORD).await;
    let req = test::TestRequest::get()
        .uri(&format!("/api/v1/reports/{}", report_id))
        .insert_header(("Authorization", format!("Bearer {}", parent_token)))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    // Admin reviews and sends it
    for action in ["review", "send"] {
        let req = test::TestRequest::post()
            .uri(&format!("/api/v1/reports/{}/{}", report_id, action))
            .insert_header(("Authorization", format!("Bearer {}", admin_token)))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NO_CONTENT);
    }

    // Now the parent can read it
    let req = test::TestRequest::get()
        .uri(&format!("/api/v1/reports/{}", report_id))
        .insert_header(("Authorization", format!("Bearer {}", parent_token)))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let fetched: Value = test::read_body_json(resp).await;
    assert_eq!(fetched["sent_to_parent"], true);
}

#[actix_web::test]
async fn test_profile_directory_access() {
    let pool = test_pool();
    let parent = auth::create_profile(
        &pool,
        "Test Parent",
        PARENT_EMAIL,
        UserRole::Parent,
        PARENT_PASSWORD,
    )
    .unwrap();
    let app = test_app!(pool);

    // Admins see the whole directory
    let admin_token = login(&app, ADMIN_EMAIL, ADMIN_PASSWORD).await;
    let req = test::TestRequest::get()
        .uri("/api/v1/profiles")
        .insert_header(("Authorization", format!("Bearer {}", admin_token)))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let profiles: Value = test::read_body_json(resp).await;
    let emails: Vec<&str> = profiles
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["email"].as_str().unwrap())
        .collect();
    assert!(emails.contains(&ADMIN_EMAIL));
    assert!(emails.contains(&PARENT_EMAIL));

    // Non-admins cannot list, but can fetch themselves
    let parent_token = login(&app, PARENT_EMAIL, PARENT_PASSWORD).await;
    let req = test::TestRequest::get()
        .uri("/api/v1/profiles")
        .insert_header(("Authorization", format!("Bearer {}", parent_token)))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    let req = test::TestRequest::get()
        .uri(&format!("/api/v1/profiles/{}", parent.id))
        .insert_header(("Authorization", format!("Bearer {}", parent_token)))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let view: Value = test::read_body_json(resp).await;
    assert_eq!(view["email"], PARENT_EMAIL);
    assert!(view.get("password_hash").is_none());

    // Someone else's profile is not probeable
    let admin_me: Value = {
        let req = test::TestRequest::get()
            .uri("/api/v1/auth/me")
            .insert_header(("Authorization", format!("Bearer {}", admin_token)))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        test::read_body_json(resp).await
    };
    let req = test::TestRequest::get()
        .uri(&format!(
            "/api/v1/profiles/{}",
            admin_me["profile_id"].as_str().unwrap()
        ))
        .insert_header(("Authorization", format!("Bearer {}", parent_token)))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn test_report_list_pagination_shape() {
    let pool = test_pool();
    let app = test_app!(pool);

    let token = login(&app, ADMIN_EMAIL, ADMIN_PASSWORD).await;
    let child_id = create_child(&app, &token, "Ana", vec![]).await;

    for day in ["2026-03-10", "2026-03-11", "2026-03-12"] {
        let req = test::TestRequest::post()
            .uri("/api/v1/reports")
            .insert_header(("Authorization", format!("Bearer {}", token)))
            .set_json(json!({
                "child_id": child_id,
                "date": day,
                "theme": "Shapes",
            }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CREATED);
    }

    let req = test::TestRequest::get()
        .uri(&format!("/api/v1/reports?child_id={}&limit=2&page=1", child_id))
        .insert_header(("Authorization", format!("Bearer {}", token)))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["reports"].as_array().unwrap().len(), 2);
    assert_eq!(body["pagination"]["total"], 3);
    assert_eq!(body["pagination"]["limit"], 2);
}
