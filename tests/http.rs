//! Router-level tests: the full request path from camelCase JSON bodies
//! through the handlers to status codes and response envelopes.

mod common;

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use crudkit::{common_routes, entity_routes, AppState, MemoryStore};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

fn app() -> Router {
    let state = AppState::new(
        Arc::new(MemoryStore::new()),
        Arc::new(common::registry()),
    );
    Router::new().merge(common_routes()).merge(entity_routes(state))
}

async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let request = match body {
        Some(v) => Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(v.to_string()))
            .unwrap(),
        None => Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::empty())
            .unwrap(),
    };
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

#[tokio::test]
async fn health_reports_ok() {
    let app = app();
    let (status, body) = send(&app, Method::GET, "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], json!("ok"));
}

#[tokio::test]
async fn create_and_read_speak_camel_case() {
    let app = app();

    let (status, body) = send(
        &app,
        Method::POST,
        "/users",
        Some(json!({
            "firstName": "Ada",
            "lastName": "Lovelace",
            "email": "ada@x.com"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["firstName"], json!("Ada"));
    assert_eq!(body["data"]["id"], json!(1));
    assert!(body["data"]["deletedAt"].is_null());

    let (status, body) = send(&app, Method::GET, "/users/1", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["lastName"], json!("Lovelace"));
}

#[tokio::test]
async fn list_wraps_rows_with_a_count() {
    let app = app();

    for name in ["flour", "sugar"] {
        let (status, _) = send(
            &app,
            Method::POST,
            "/ingredients",
            Some(json!({ "name": name })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
    }

    let (status, body) = send(&app, Method::GET, "/ingredients", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["meta"]["count"], json!(2));
    assert_eq!(body["data"][0]["name"], json!("flour"));
}

#[tokio::test]
async fn put_applies_a_merge_patch() {
    let app = app();

    send(
        &app,
        Method::POST,
        "/users",
        Some(json!({"firstName": "Ada", "lastName": "Lovelace", "email": "ada@x.com"})),
    )
    .await;
    send(
        &app,
        Method::POST,
        "/tasks",
        Some(json!({"title": "Write paper", "userId": 1})),
    )
    .await;

    let (status, body) = send(
        &app,
        Method::PUT,
        "/tasks/1",
        Some(json!({"complete": true})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["complete"], json!(true));
    assert_eq!(body["data"]["title"], json!("Write paper"));
    assert_eq!(body["data"]["userId"], json!(1));
}

#[tokio::test]
async fn delete_is_no_content_and_the_row_disappears() {
    let app = app();

    send(
        &app,
        Method::POST,
        "/users",
        Some(json!({"firstName": "Ada", "lastName": "Lovelace", "email": "ada@x.com"})),
    )
    .await;

    let (status, body) = send(&app, Method::DELETE, "/users/1", None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert!(body.is_null());

    let (status, body) = send(&app, Method::GET, "/users/1", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], json!("not_found"));

    let (status, _) = send(&app, Method::DELETE, "/users/1", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn unknown_collection_is_not_found() {
    let app = app();
    let (status, body) = send(&app, Method::GET, "/widgets", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], json!("not_found"));
}

#[tokio::test]
async fn malformed_id_is_a_bad_request() {
    let app = app();
    let (status, body) = send(&app, Method::GET, "/users/abc", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], json!("bad_request"));
}

#[tokio::test]
async fn non_object_body_is_a_bad_request() {
    let app = app();
    let (status, body) = send(&app, Method::POST, "/users", Some(json!("hi"))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], json!("bad_request"));
}

#[tokio::test]
async fn validation_failures_are_bad_requests() {
    let app = app();
    let (status, body) = send(
        &app,
        Method::POST,
        "/users",
        Some(json!({"firstName": "Ada", "lastName": "Lovelace"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], json!("validation_error"));
    assert!(body["error"]["message"].as_str().unwrap().contains("email"));
}

#[tokio::test]
async fn link_route_creates_an_edge_with_attributes() {
    let app = app();

    send(
        &app,
        Method::POST,
        "/recipes",
        Some(json!({"title": "Bread", "description": "plain", "instructions": "bake"})),
    )
    .await;
    send(&app, Method::POST, "/ingredients", Some(json!({"name": "flour"}))).await;

    let (status, body) = send(
        &app,
        Method::POST,
        "/recipes/1/ingredients/1",
        Some(json!({"meassurementAmount": 2, "meassurementType": "cups"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["recipeId"], json!(1));
    assert_eq!(body["data"]["ingredientId"], json!(1));

    let (status, body) = send(&app, Method::GET, "/recipes/1", None).await;
    assert_eq!(status, StatusCode::OK);
    let nested = body["data"]["ingredients"].as_array().unwrap();
    assert_eq!(nested.len(), 1);
    assert_eq!(nested[0]["name"], json!("flour"));
    assert_eq!(nested[0]["meassurementAmount"], json!(2));
    assert_eq!(nested[0]["meassurementType"], json!("cups"));
}

#[tokio::test]
async fn link_without_a_body_works_for_plain_edges() {
    let app = app();

    send(&app, Method::POST, "/teachers", Some(json!({"name": "Knuth"}))).await;
    send(&app, Method::POST, "/students", Some(json!({"name": "Pratt"}))).await;

    let (status, _) = send(&app, Method::POST, "/teachers/1/students/1", None).await;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = send(&app, Method::GET, "/teachers/1", None).await;
    assert_eq!(body["data"]["students"][0]["name"], json!("Pratt"));
}
