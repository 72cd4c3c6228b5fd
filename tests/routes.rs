use admingen::introspect::metadata::{ColumnMeta, TableMeta};
use admingen::{admin_routes, introspect, AppState, HandlerOptions, MemoryStore, SchemaSource};
use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

fn app() -> Router {
    let source = SchemaSource::new()
        .table(
            "users",
            TableMeta::new([
                ColumnMeta::new("id", "int4").primary(),
                ColumnMeta::new("name", "text"),
            ]),
        )
        .table(
            "posts",
            TableMeta::new([
                ColumnMeta::new("id", "int4").primary(),
                ColumnMeta::new("title", "varchar"),
                ColumnMeta::new("author_id", "int4").foreign_key("users"),
            ]),
        );
    let state = AppState::new(introspect(&source), Arc::new(MemoryStore::new()), HandlerOptions::default());
    admin_routes(state)
}

async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let mut req = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(v) => {
            req = req.header("content-type", "application/json");
            Body::from(v.to_string())
        }
        None => Body::empty(),
    };
    let res = app.clone().oneshot(req.body(body).unwrap()).await.unwrap();
    let status = res.status();
    let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

#[tokio::test]
async fn schema_endpoint_describes_inferred_relations() {
    let app = app();
    let (status, body) = send(&app, Method::GET, "/_schema", None).await;
    assert_eq!(status, StatusCode::OK);
    let posts = &body["resources"][1];
    assert_eq!(posts["name"], "posts");
    assert_eq!(posts["fields"][2]["kind"], "relation");
    assert_eq!(posts["fields"][2]["relatedResource"], "users");
    assert_eq!(posts["fields"][2]["foreignKeyColumn"], "author_id");
}

#[tokio::test]
async fn crud_round_trip_over_http() {
    let app = app();
    let (status, created) = send(&app, Method::POST, "/posts", Some(json!({ "title": "Hi", "author_id": "1" }))).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created, json!({ "id": 1, "title": "Hi", "author_id": 1 }));

    let (status, fetched) = send(&app, Method::GET, "/posts/1", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched, created);

    let (status, updated) = send(&app, Method::PATCH, "/posts/1", Some(json!({ "title": "Hello" }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["title"], "Hello");

    let (status, list) = send(&app, Method::GET, "/posts", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list.as_array().map(Vec::len), Some(1));

    let (status, _) = send(&app, Method::DELETE, "/posts/1", None).await;
    assert_eq!(status, StatusCode::OK);
    let (status, body) = send(&app, Method::GET, "/posts/1", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "not_found");
}

#[tokio::test]
async fn errors_map_to_status_codes() {
    let app = app();
    let (status, body) = send(&app, Method::GET, "/comments", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "unknown_resource");

    let (status, body) = send(&app, Method::DELETE, "/posts/999", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "not_found");

    let (status, body) = send(&app, Method::GET, "/posts/abc", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "bad_request");

    let (status, body) = send(&app, Method::POST, "/posts", Some(json!({ "author_id": "x" }))).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"]["code"], "validation_error");

    send(&app, Method::POST, "/users", Some(json!({ "id": 1, "name": "Ada" }))).await;
    let (status, body) = send(&app, Method::POST, "/users", Some(json!({ "id": 1, "name": "Bob" }))).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "insert_failed");
}

#[tokio::test]
async fn error_bodies_carry_only_code_and_message() {
    let app = app();
    let (status, body) = send(&app, Method::GET, "/posts/abc", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let error = body["error"].as_object().unwrap();
    let mut keys: Vec<&str> = error.keys().map(String::as_str).collect();
    keys.sort_unstable();
    assert_eq!(keys, vec!["code", "message"]);
    assert_eq!(body.as_object().map(|o| o.len()), Some(1));
}
