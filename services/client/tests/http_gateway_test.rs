//! The REST gateway against a stub backend: envelopes, fallbacks and absorbed failures.

mod common;

use axum::{
    extract::{Path, Query},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use elearn_core::domain::{
    CategoryId, ContentKind, CourseId, OrderStatus, QualityTier, SectionId, UserId,
};
use elearn_core::ports::{BackendGateway, CourseVisibility};
use serde_json::{json, Value};
use std::collections::HashMap;

#[tokio::test]
async fn categories_forward_show_inactive_flag() {
    let app = Router::new().route(
        "/v1/categories",
        get(|Query(query): Query<HashMap<String, String>>| async move {
            let show_inactive = query.get("show_inactive").cloned().unwrap_or_default();
            Json(json!({
                "data": [{
                    "category_id": "c1",
                    "category_name": format!("Programming ({show_inactive})"),
                    "is_active": true,
                    "courses": [{"course_id": "k1"}, {"course_id": "k2"}]
                }]
            }))
        }),
    );
    let gateway = common::gateway(&common::spawn_backend(app).await);

    let categories = gateway.list_categories(false).await;

    assert_eq!(categories.len(), 1);
    assert_eq!(categories[0].name, "Programming (false)");
    assert_eq!(categories[0].course_ids.len(), 2);
}

#[tokio::test]
async fn courses_are_listed_unpurchased() {
    let app = Router::new().route(
        "/v1/categories/{id}/courses",
        get(|Path(id): Path<String>| async move {
            Json(json!({
                "data": [{
                    "course_id": "k1",
                    "course_name": "Rust 101",
                    "course_price": 49900,
                    "category_id": id,
                    "can_be_purchased": true,
                    "is_published": true
                }]
            }))
        }),
    );
    let gateway = common::gateway(&common::spawn_backend(app).await);

    let courses = gateway.list_courses(&CategoryId::from("c1")).await;

    assert_eq!(courses.len(), 1);
    assert_eq!(courses[0].category_id.as_str(), "c1");
    assert_eq!(courses[0].price, 49900);
    assert!(!courses[0].purchased);
}

#[tokio::test]
async fn course_detail_sends_visibility_and_sorts_sections() {
    let app = Router::new().route(
        "/v1/course/{id}",
        get(
            |Path(id): Path<String>, Query(query): Query<HashMap<String, String>>| async move {
                assert_eq!(query.get("allow_unpublished").map(String::as_str), Some("true"));
                assert_eq!(query.get("allow_expired").map(String::as_str), Some("true"));
                Json(json!({
                    "data": {
                        "course_id": id,
                        "course_name": "Rust 101",
                        "course_sections": [
                            {"section_id": "s2", "course_id": "k1", "section_name": "Traits", "section_index": 2},
                            {"section_id": "s1", "course_id": "k1", "section_name": "Basics", "section_index": 1}
                        ]
                    }
                }))
            },
        ),
    );
    let gateway = common::gateway(&common::spawn_backend(app).await);

    let detail = gateway
        .course_detail(&CourseId::from("k1"), CourseVisibility::default())
        .await
        .unwrap();

    assert_eq!(detail.course.name, "Rust 101");
    let names: Vec<&str> = detail.sections.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, vec!["Basics", "Traits"]);
}

#[tokio::test]
async fn section_content_maps_types_and_drops_unknown() {
    let app = Router::new().route(
        "/v1/course/{course}/section/{section}",
        get(|Path((_, section)): Path<(String, String)>| async move {
            Json(json!({
                "data": {
                    "section_id": section,
                    "course_id": "k1",
                    "section_name": "Basics",
                    "contents": [
                        {"content_id": "v1", "section_id": "s1", "content_index": 1,
                         "content_type": "video", "full_hd_video_uri": "v1-1080",
                         "hd_video_uri": "v1-720", "sd_video_uri": ""},
                        {"content_id": "q1", "section_id": "s1", "content_index": 2,
                         "content_type": "quiz"},
                        {"content_id": "p1", "section_id": "s1", "content_index": 0,
                         "content_type": "pdf", "pdf_uri": "notes.pdf"},
                        {"content_id": "l1", "section_id": "s1", "content_index": 3,
                         "content_type": "live_video", "live_video_id": "yt42"}
                    ]
                }
            }))
        }),
    );
    let gateway = common::gateway(&common::spawn_backend(app).await);

    let detail = gateway
        .section_content(&CourseId::from("k1"), &SectionId::from("s1"))
        .await
        .unwrap();

    let kinds: Vec<ContentKind> = detail.contents.iter().map(|c| c.kind()).collect();
    assert_eq!(
        kinds,
        vec![ContentKind::Pdf, ContentKind::Video, ContentKind::LiveVideo]
    );
    let sources = detail.contents[1].video_sources().unwrap();
    assert_eq!(sources.playable_uri(QualityTier::Hd), Some("v1-720"));
    assert_eq!(sources.playable_uri(QualityTier::Sd), None);
}

#[tokio::test]
async fn created_order_is_read_from_either_envelope() {
    let app = Router::new()
        .route(
            "/v1/order/course/{id}",
            post(|Path(id): Path<String>, Json(body): Json<Value>| async move {
                assert_eq!(body["user_id"], "u1");
                if id == "k1" {
                    Json(json!({
                        "message": "Order created",
                        "order": {"order_id": "o1", "course_id": "k1", "user_id": "u1", "amount": 49900}
                    }))
                } else {
                    Json(json!({"data": {"order_id": "o2", "amount": 1000, "status": "created"}}))
                }
            }),
        );
    let gateway = common::gateway(&common::spawn_backend(app).await);
    let user = UserId::from("u1");

    let first = gateway.create_order(&CourseId::from("k1"), &user).await.unwrap();
    assert_eq!(first.id.as_str(), "o1");
    assert_eq!(first.amount, 49900);
    assert_eq!(first.status, OrderStatus::Created);

    let second = gateway.create_order(&CourseId::from("k2"), &user).await.unwrap();
    assert_eq!(second.id.as_str(), "o2");
    assert_eq!(second.course_id.as_str(), "k2");
    assert_eq!(second.user_id.as_str(), "u1");
}

#[tokio::test]
async fn order_response_without_order_is_none() {
    let app = Router::new().route(
        "/v1/order/course/{id}",
        post(|| async { Json(json!({"message": "Course not purchasable"})) }),
    );
    let gateway = common::gateway(&common::spawn_backend(app).await);

    let order = gateway
        .create_order(&CourseId::from("k1"), &UserId::from("u1"))
        .await;

    assert!(order.is_none());
}

#[tokio::test]
async fn library_reads_user_data_orders() {
    let app = Router::new().route(
        "/v1/user/{id}/library/courses",
        get(|Path(id): Path<String>| async move {
            Json(json!({
                "userData": {
                    "orders": [
                        {"order_id": "o1", "amount": 49900, "status": "paid",
                         "expiration_time": "2030-01-01T00:00:00Z",
                         "course": {"course_id": "k1", "course_name": "Rust 101"}},
                        {"order_id": "o2", "user_id": id, "course_id": "k2", "status": "refunded"}
                    ]
                }
            }))
        }),
    );
    let gateway = common::gateway(&common::spawn_backend(app).await);

    let orders = gateway.library(&UserId::from("u1")).await;

    assert_eq!(orders.len(), 2);
    assert_eq!(orders[0].course_id.as_str(), "k1");
    assert_eq!(orders[0].user_id.as_str(), "u1");
    assert_eq!(orders[0].status, OrderStatus::Paid);
    assert!(orders[0].expiration_time.is_some());
    assert_eq!(orders[1].status, OrderStatus::Unknown);
}

#[tokio::test]
async fn failures_degrade_to_empty_results() {
    let app = Router::new()
        .route(
            "/v1/categories",
            get(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "boom") }),
        )
        .route("/v1/course/{id}", get(|| async { "not json" }));
    let gateway = common::gateway(&common::spawn_backend(app).await);

    assert!(gateway.list_categories(true).await.is_empty());
    assert!(gateway
        .course_detail(&CourseId::from("k1"), CourseVisibility::default())
        .await
        .is_none());
    assert!(gateway.library(&UserId::from("u1")).await.is_empty());
}

#[tokio::test]
async fn unreachable_backend_degrades_to_empty_results() {
    let gateway = common::gateway(&common::closed_port().await);

    assert!(gateway.list_courses(&CategoryId::from("c1")).await.is_empty());
    assert!(gateway
        .create_order(&CourseId::from("k1"), &UserId::from("u1"))
        .await
        .is_none());
}
