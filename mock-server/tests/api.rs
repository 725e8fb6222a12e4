use axum::http::{self, Request, StatusCode};
use http_body_util::BodyExt;
use mock_server::{app, Echo, ErrorBody, User};
use tower::ServiceExt;

async fn body_json<T: serde::de::DeserializeOwned>(response: axum::response::Response) -> T {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

async fn body_bytes(response: axum::response::Response) -> bytes::Bytes {
    response.into_body().collect().await.unwrap().to_bytes()
}

fn json_request(method: &str, uri: &str, body: &str) -> Request<String> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(http::header::CONTENT_TYPE, "application/json")
        .body(body.to_string())
        .unwrap()
}

fn empty_request(method: &str, uri: &str) -> Request<String> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(String::new())
        .unwrap()
}

const MISSING: &str = "/users/00000000-0000-0000-0000-000000000000";

// --- users ---

#[tokio::test]
async fn list_users_empty() {
    let resp = app().oneshot(empty_request("GET", "/users")).await.unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let users: Vec<User> = body_json(resp).await;
    assert!(users.is_empty());
}

#[tokio::test]
async fn create_user_returns_201() {
    let resp = app()
        .oneshot(json_request(
            "POST",
            "/users",
            r#"{"name":"Ada","email":"ada@example.com"}"#,
        ))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::CREATED);
    let user: User = body_json(resp).await;
    assert_eq!(user.name, "Ada");
    assert_eq!(user.email, "ada@example.com");
}

#[tokio::test]
async fn create_user_malformed_json_returns_422() {
    let resp = app()
        .oneshot(json_request("POST", "/users", r#"{"name":"Ada"}"#))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn get_user_not_found_has_error_body() {
    let resp = app().oneshot(empty_request("GET", MISSING)).await.unwrap();

    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let body: ErrorBody = body_json(resp).await;
    assert_eq!(body.code, "USER_NOT_FOUND");
}

#[tokio::test]
async fn get_user_bad_uuid_returns_400() {
    let resp = app()
        .oneshot(empty_request("GET", "/users/not-a-uuid"))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn patch_user_not_found() {
    let resp = app()
        .oneshot(json_request("PATCH", MISSING, r#"{"name":"Nope"}"#))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn delete_user_not_found() {
    let resp = app().oneshot(empty_request("DELETE", MISSING)).await.unwrap();

    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn crud_lifecycle() {
    use tower::Service;

    let mut app = app().into_service();

    // create two users
    let mut ids = Vec::new();
    for body in [
        r#"{"name":"Grace","email":"grace@example.com"}"#,
        r#"{"name":"Ada","email":"ada@example.com"}"#,
    ] {
        let resp = ServiceExt::ready(&mut app)
            .await
            .unwrap()
            .call(json_request("POST", "/users", body))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::CREATED);
        let user: User = body_json(resp).await;
        ids.push(user.id);
    }
    let id = ids[1];

    // list is sorted by name and honours the filter and limit
    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(empty_request("GET", "/users"))
        .await
        .unwrap();
    let users: Vec<User> = body_json(resp).await;
    let names: Vec<&str> = users.iter().map(|u| u.name.as_str()).collect();
    assert_eq!(names, vec!["Ada", "Grace"]);

    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(empty_request("GET", "/users?name=Grace"))
        .await
        .unwrap();
    let users: Vec<User> = body_json(resp).await;
    assert_eq!(users.len(), 1);
    assert_eq!(users[0].id, ids[0]);

    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(empty_request("GET", "/users?limit=1"))
        .await
        .unwrap();
    let users: Vec<User> = body_json(resp).await;
    assert_eq!(users.len(), 1);

    // patch: only the email changes
    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(json_request(
            "PATCH",
            &format!("/users/{id}"),
            r#"{"email":"ada@lovelace.dev"}"#,
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let updated: User = body_json(resp).await;
    assert_eq!(updated.name, "Ada"); // unchanged
    assert_eq!(updated.email, "ada@lovelace.dev");

    // put: full replacement
    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(json_request(
            "PUT",
            &format!("/users/{id}"),
            r#"{"name":"Augusta","email":"augusta@example.com"}"#,
        ))
        .await
        .unwrap();
    let replaced: User = body_json(resp).await;
    assert_eq!(replaced.name, "Augusta");

    // delete
    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(empty_request("DELETE", &format!("/users/{id}")))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);
    assert!(body_bytes(resp).await.is_empty());

    // get after delete — 404
    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(empty_request("GET", &format!("/users/{id}")))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

// --- echo and fixtures ---

#[tokio::test]
async fn echo_reflects_request() {
    let resp = app()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/echo?page=1&limit=20")
                .header("x-custom", "test")
                .body(r#"{"name":"John"}"#.to_string())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let echo: Echo = body_json(resp).await;
    assert_eq!(echo.method, "POST");
    assert_eq!(echo.path, "/echo");
    assert_eq!(echo.query.as_deref(), Some("page=1&limit=20"));
    assert_eq!(echo.headers.get("x-custom").map(String::as_str), Some("test"));
    assert_eq!(echo.body, Some(serde_json::json!({"name": "John"})));
}

#[tokio::test]
async fn status_route_replies_with_requested_code() {
    let resp = app().oneshot(empty_request("GET", "/status/418")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::IM_A_TEAPOT);
    let body: serde_json::Value = body_json(resp).await;
    assert_eq!(body["status"], 418);
}

#[tokio::test]
async fn status_204_has_empty_body() {
    let resp = app().oneshot(empty_request("DELETE", "/status/204")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);
    assert!(body_bytes(resp).await.is_empty());
}

#[tokio::test]
async fn text_error_is_not_json() {
    let resp = app().oneshot(empty_request("GET", "/text-error")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(&body_bytes(resp).await[..], b"internal error");
}

#[tokio::test]
async fn me_requires_bearer_token() {
    let resp = app().oneshot(empty_request("GET", "/me")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let resp = app()
        .oneshot(
            Request::builder()
                .uri("/me")
                .header(http::header::AUTHORIZATION, "Bearer abc")
                .body(String::new())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body: serde_json::Value = body_json(resp).await;
    assert_eq!(body["token"], "abc");
}

#[tokio::test]
async fn large_returns_json_string_of_requested_size() {
    let resp = app().oneshot(empty_request("GET", "/large/1024")).await.unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let body: String = body_json(resp).await;
    assert_eq!(body.len(), 1024);
    assert!(body.bytes().all(|b| b == b'x'));
}

#[tokio::test]
async fn large_rejects_oversized_request() {
    let uri = format!("/large/{}", mock_server::MAX_LARGE_BYTES + 1);
    let resp = app().oneshot(empty_request("GET", &uri)).await.unwrap();

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: ErrorBody = body_json(resp).await;
    assert_eq!(body.code, "TOO_LARGE");
}

#[tokio::test]
async fn cookies_sets_two_cookie_headers() {
    let resp = app().oneshot(empty_request("GET", "/cookies")).await.unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let cookies: Vec<&str> = resp
        .headers()
        .get_all(http::header::SET_COOKIE)
        .iter()
        .map(|v| v.to_str().unwrap())
        .collect();
    assert_eq!(cookies, vec!["a=1", "b=2"]);
}
