//! API integration tests against the in-memory store

use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{header::CONTENT_TYPE, Method, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;

use library_server::{api, repository::MemoryCatalogStore, AppConfig, AppState};

fn app() -> Router {
    let state = AppState::new(AppConfig::default(), Arc::new(MemoryCatalogStore::new()));
    api::router(state)
}

async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let mut request = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(json) => {
            request = request.header(CONTENT_TYPE, "application/json");
            Body::from(json.to_string())
        }
        None => Body::empty(),
    };

    let response = app
        .clone()
        .oneshot(request.body(body).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

/// Create an author and one book, returning the book id
async fn seed_book(app: &Router, available: i32, total: i32) -> String {
    let (status, author) = send(
        app,
        Method::POST,
        "/api/v1/authors",
        Some(json!({ "first_name": "Frank", "last_name": "Herbert" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, book) = send(
        app,
        Method::POST,
        "/api/v1/books",
        Some(json!({
            "title": "Dune",
            "isbn": "978-0-441-17271-9",
            "publication_year": 1965,
            "available_copies": available,
            "total_copies": total,
            "author_id": author["id"],
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{}", book);
    assert_eq!(book["author_name"], "Frank Herbert");

    book["id"].as_str().unwrap().to_string()
}

fn loan_request(book_id: &str) -> Value {
    json!({
        "book_id": book_id,
        "member_name": "Paul Atreides",
        "member_email": "paul@arrakis.example",
    })
}

#[tokio::test]
async fn test_health_and_readiness() {
    let app = app();

    let (status, body) = send(&app, Method::GET, "/api/v1/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");

    let (status, body) = send(&app, Method::GET, "/api/v1/ready", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ready");
}

#[tokio::test]
async fn test_last_copy_borrow_and_return() {
    let app = app();
    let book_id = seed_book(&app, 1, 3).await;

    let (status, loan) = send(&app, Method::POST, "/api/v1/loans", Some(loan_request(&book_id))).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(loan["status"], "Active");
    assert_eq!(loan["book_title"], "Dune");
    assert_eq!(loan["is_overdue"], false);

    let (_, book) = send(&app, Method::GET, &format!("/api/v1/books/{}", book_id), None).await;
    assert_eq!(book["available_copies"], 0);

    let (status, error) = send(&app, Method::POST, "/api/v1/loans", Some(loan_request(&book_id))).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(error["error"], "NoCopiesAvailable");

    let loan_id = loan["id"].as_str().unwrap();
    let (status, returned) = send(
        &app,
        Method::POST,
        &format!("/api/v1/loans/{}/return", loan_id),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(returned["status"], "returned");
    assert_eq!(returned["loan"]["status"], "Returned");
    assert!(returned["loan"]["return_date"].is_string());

    let (_, book) = send(&app, Method::GET, &format!("/api/v1/books/{}", book_id), None).await;
    assert_eq!(book["available_copies"], 1);
}

#[tokio::test]
async fn test_second_return_is_unprocessable() {
    let app = app();
    let book_id = seed_book(&app, 2, 2).await;

    let (_, loan) = send(&app, Method::POST, "/api/v1/loans", Some(loan_request(&book_id))).await;
    let uri = format!("/api/v1/loans/{}/return", loan["id"].as_str().unwrap());

    let (status, _) = send(&app, Method::POST, &uri, None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, error) = send(&app, Method::POST, &uri, None).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(error["error"], "AlreadyReturned");

    let (_, book) = send(&app, Method::GET, &format!("/api/v1/books/{}", book_id), None).await;
    assert_eq!(book["available_copies"], 2);
}

#[tokio::test]
async fn test_unknown_ids_are_not_found() {
    let app = app();
    let unknown = uuid::Uuid::new_v4();

    let (status, error) = send(&app, Method::GET, &format!("/api/v1/loans/{}", unknown), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(error["error"], "NoSuchData");

    let (status, _) = send(
        &app,
        Method::POST,
        &format!("/api/v1/loans/{}/return", unknown),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(
        &app,
        Method::POST,
        "/api/v1/loans",
        Some(loan_request(&unknown.to_string())),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(&app, Method::GET, &format!("/api/v1/books/{}/loans", unknown), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_overdue_view() {
    let app = app();
    let book_id = seed_book(&app, 2, 2).await;

    let mut late = loan_request(&book_id);
    late["loan_date"] = json!("2020-01-01T00:00:00Z");
    let (status, late) = send(&app, Method::POST, "/api/v1/loans", Some(late)).await;
    assert_eq!(status, StatusCode::CREATED);
    // Defaulted from the configured loan period
    assert_eq!(late["due_date"], "2020-01-15T00:00:00Z");
    assert_eq!(late["is_overdue"], true);

    send(&app, Method::POST, "/api/v1/loans", Some(loan_request(&book_id))).await;

    let (_, active) = send(&app, Method::GET, "/api/v1/loans/active", None).await;
    assert_eq!(active.as_array().unwrap().len(), 2);

    let (_, overdue) = send(&app, Method::GET, "/api/v1/loans/overdue", None).await;
    let overdue = overdue.as_array().unwrap();
    assert_eq!(overdue.len(), 1);
    assert_eq!(overdue[0]["id"], late["id"]);
    assert_eq!(overdue[0]["status"], "Active");

    let (_, history) = send(&app, Method::GET, &format!("/api/v1/books/{}/loans", book_id), None).await;
    assert_eq!(history.as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_invalid_input_is_rejected() {
    let app = app();
    let book_id = seed_book(&app, 1, 1).await;

    let mut request = loan_request(&book_id);
    request["member_email"] = json!("not-an-email");
    let (status, error) = send(&app, Method::POST, "/api/v1/loans", Some(request)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error["error"], "BadValue");

    let (status, _) = send(
        &app,
        Method::PUT,
        &format!("/api/v1/books/{}", book_id),
        Some(json!({ "available_copies": 5 })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (_, books) = send(&app, Method::GET, "/api/v1/books", None).await;
    let author_id = books[0]["author_id"].clone();
    let (status, error) = send(
        &app,
        Method::POST,
        "/api/v1/books",
        Some(json!({
            "title": "Bad checksum",
            "isbn": "9780441172718",
            "publication_year": 1965,
            "available_copies": 1,
            "total_copies": 1,
            "author_id": author_id,
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error["error"], "BadValue");
}

#[tokio::test]
async fn test_delete_guards() {
    let app = app();
    let book_id = seed_book(&app, 1, 1).await;

    let (_, book) = send(&app, Method::GET, &format!("/api/v1/books/{}", book_id), None).await;
    let author_uri = format!("/api/v1/authors/{}", book["author_id"].as_str().unwrap());

    let (status, error) = send(&app, Method::DELETE, &author_uri, None).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(error["error"], "HasDependents");

    send(&app, Method::POST, "/api/v1/loans", Some(loan_request(&book_id))).await;
    let (status, _) = send(&app, Method::DELETE, &format!("/api/v1/books/{}", book_id), None).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (_, authors) = send(&app, Method::GET, "/api/v1/authors", None).await;
    assert_eq!(authors[0]["books_count"], 1);
}

#[tokio::test]
async fn test_title_search() {
    let app = app();
    seed_book(&app, 1, 1).await;

    let (status, found) = send(&app, Method::GET, "/api/v1/books?title=dUnE", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(found.as_array().unwrap().len(), 1);

    let (_, missing) = send(&app, Method::GET, "/api/v1/books?title=hobbit", None).await;
    assert!(missing.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_due_date_overflow_is_a_bad_request() {
    let app = app();
    let book_id = seed_book(&app, 1, 1).await;

    let mut request = loan_request(&book_id);
    request["loan_date"] = json!("+262142-12-31T00:00:00Z");
    let (status, error) = send(&app, Method::POST, "/api/v1/loans", Some(request)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error["error"], "BadValue");

    let (_, book) = send(&app, Method::GET, &format!("/api/v1/books/{}", book_id), None).await;
    assert_eq!(book["available_copies"], 1);
}

#[tokio::test]
async fn test_stats() {
    let app = app();
    let book_id = seed_book(&app, 2, 2).await;

    let mut late = loan_request(&book_id);
    late["loan_date"] = json!("2020-01-01T00:00:00Z");
    send(&app, Method::POST, "/api/v1/loans", Some(late)).await;
    let (_, current) = send(&app, Method::POST, "/api/v1/loans", Some(loan_request(&book_id))).await;
    send(
        &app,
        Method::POST,
        &format!("/api/v1/loans/{}/return", current["id"].as_str().unwrap()),
        None,
    )
    .await;

    let (status, stats) = send(&app, Method::GET, "/api/v1/stats", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        stats,
        json!({
            "total_books": 1,
            "total_authors": 1,
            "active_loans": 1,
            "overdue_loans": 1,
        })
    );
}

#[tokio::test]
async fn test_can_delete_checks() {
    let app = app();
    let book_id = seed_book(&app, 1, 1).await;
    let (_, book) = send(&app, Method::GET, &format!("/api/v1/books/{}", book_id), None).await;
    let author_id = book["author_id"].as_str().unwrap().to_string();

    let check = |kind: &str, id: &str| format!("/api/v1/{}/{}/can-delete", kind, id);

    let (status, body) = send(&app, Method::GET, &check("books", &book_id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["can_delete"], true);

    let (_, body) = send(&app, Method::GET, &check("authors", &author_id), None).await;
    assert_eq!(body["can_delete"], false);

    send(&app, Method::POST, "/api/v1/loans", Some(loan_request(&book_id))).await;
    let (_, body) = send(&app, Method::GET, &check("books", &book_id), None).await;
    assert_eq!(body["can_delete"], false);

    let unknown = uuid::Uuid::new_v4().to_string();
    let (status, body) = send(&app, Method::GET, &check("authors", &unknown), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["can_delete"], false);
}
