use axum::http::{self, Request, StatusCode};
use http_body_util::BodyExt;
use mock_server::{app, Echo, Entity, SECRET_TOKEN};
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

const MISSING: &str = "/api/entity/00000000-0000-0000-0000-000000000000";

// --- entities ---

#[tokio::test]
async fn list_entities_empty() {
    let resp = app().oneshot(empty_request("GET", "/api/entity")).await.unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let entities: Vec<Entity> = body_json(resp).await;
    assert!(entities.is_empty());
}

#[tokio::test]
async fn create_entity_returns_201() {
    let resp = app()
        .oneshot(json_request(
            "POST",
            "/api/entity",
            r#"{"name":"Widget","tags":["red"]}"#,
        ))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::CREATED);
    let entity: Entity = body_json(resp).await;
    assert_eq!(entity.name, "Widget");
    assert_eq!(entity.tags, vec!["red".to_string()]);
}

#[tokio::test]
async fn create_entity_without_name_returns_422() {
    let resp = app()
        .oneshot(json_request("POST", "/api/entity", r#"{"tags":[]}"#))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn get_missing_entity_returns_404_text() {
    let resp = app().oneshot(empty_request("GET", MISSING)).await.unwrap();

    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_bytes(resp).await, "not found");
}

#[tokio::test]
async fn bad_uuid_returns_400() {
    let resp = app()
        .oneshot(empty_request("GET", "/api/entity/not-a-uuid"))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn patch_and_delete_missing_entity_return_404() {
    let resp = app()
        .oneshot(json_request("PATCH", MISSING, r#"{"name":"Nope"}"#))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let resp = app().oneshot(empty_request("DELETE", MISSING)).await.unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn list_filters_by_every_tag() {
    use tower::Service;

    let mut app = app().into_service();
    for body in [
        r#"{"name":"b","tags":["red","blue"]}"#,
        r#"{"name":"a","tags":["red"]}"#,
        r#"{"name":"c","tags":["blue"]}"#,
    ] {
        let resp = ServiceExt::ready(&mut app)
            .await
            .unwrap()
            .call(json_request("POST", "/api/entity", body))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::CREATED);
    }

    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(empty_request("GET", "/api/entity?tag=red"))
        .await
        .unwrap();
    let names: Vec<String> = body_json::<Vec<Entity>>(resp)
        .await
        .into_iter()
        .map(|e| e.name)
        .collect();
    assert_eq!(names, vec!["a", "b"]);

    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(empty_request("GET", "/api/entity?tag=red&tag=blue"))
        .await
        .unwrap();
    let names: Vec<String> = body_json::<Vec<Entity>>(resp)
        .await
        .into_iter()
        .map(|e| e.name)
        .collect();
    assert_eq!(names, vec!["b"]);
}

// --- secure ---

#[tokio::test]
async fn secure_requires_bearer_token() {
    let resp = app().oneshot(empty_request("GET", "/api/secure")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let resp = app()
        .oneshot(
            Request::builder()
                .uri("/api/secure")
                .header(http::header::AUTHORIZATION, format!("bearer {SECRET_TOKEN}"))
                .body(String::new())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body: serde_json::Value = body_json(resp).await;
    assert_eq!(body["access"], "granted");
}

// --- echo & status ---

#[tokio::test]
async fn echo_reflects_request() {
    let resp = app()
        .oneshot(
            Request::builder()
                .method("PUT")
                .uri("/echo/a/b?x=1&x=2")
                .header("x-multi", "one")
                .header("x-multi", "two")
                .body("payload".to_string())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let echo: Echo = body_json(resp).await;
    assert_eq!(echo.method, "PUT");
    assert_eq!(echo.path, "/echo/a/b");
    assert_eq!(echo.query.as_deref(), Some("x=1&x=2"));
    assert_eq!(echo.body, "payload");
    let multi: Vec<&str> = echo
        .headers
        .iter()
        .filter(|(k, _)| k == "x-multi")
        .map(|(_, v)| v.as_str())
        .collect();
    assert_eq!(multi, vec!["one", "two"]);
}

#[tokio::test]
async fn status_route_answers_with_code() {
    let resp = app().oneshot(empty_request("GET", "/status/418")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::IM_A_TEAPOT);
    assert_eq!(body_bytes(resp).await, "I'm a teapot");

    let resp = app().oneshot(empty_request("GET", "/status/42")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

// --- full lifecycle ---

#[tokio::test]
async fn entity_lifecycle() {
    use tower::Service;

    let mut app = app().into_service();

    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(json_request("POST", "/api/entity", r#"{"name":"Gadget"}"#))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);
    let created: Entity = body_json(resp).await;
    let id = created.id;

    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(json_request(
            "PATCH",
            &format!("/api/entity/{id}"),
            r#"{"tags":["new"]}"#,
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let patched: Entity = body_json(resp).await;
    assert_eq!(patched.name, "Gadget");
    assert_eq!(patched.tags, vec!["new".to_string()]);

    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(json_request(
            "PUT",
            &format!("/api/entity/{id}"),
            r#"{"name":"Gizmo"}"#,
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let replaced: Entity = body_json(resp).await;
    assert_eq!(replaced.name, "Gizmo");
    assert!(replaced.tags.is_empty());

    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(empty_request("DELETE", &format!("/api/entity/{id}")))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);
    assert!(body_bytes(resp).await.is_empty());

    let resp = ServiceExt::ready(&mut app)
        .await
        .unwrap()
        .call(empty_request("GET", &format!("/api/entity/{id}")))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}
