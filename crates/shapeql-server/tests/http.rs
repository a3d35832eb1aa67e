use axum::body::Body;
use http::{header, Method, StatusCode};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use shapeql_engine::{record, EnumTable, Executor, FieldError, Func, Schema};
use shapeql_server::Config;
use tower::ServiceExt;

record! {
    pub struct Query {
        pub message: String,
        #[field = "add(a: Int, b: Int = 1)"]
        pub add: Func<fn(i32, i32) -> i32>,
        pub broken: Func<fn() -> Result<String, FieldError>>,
        #[field = "motd,cache=30"]
        pub motd: String,
        #[field = "clock,no_cache"]
        pub clock: i32,
    }
}

fn app() -> axum::Router {
    let schema = Schema::builder(&EnumTable::new()).query::<Query>().finish().unwrap();
    let query = Query {
        message: "hello".into(),
        add: Func::new(|a: i32, b: i32| async move { a + b }),
        broken: Func::new(|| async { Err(FieldError::new("out of order")) }),
        motd: "be kind".into(),
        clock: 12,
    };

    shapeql_server::router(Executor::builder(schema, query).build(), &Config::default())
}

async fn send(request: http::Request<Body>) -> (StatusCode, Option<String>, Value) {
    let response = app().oneshot(request).await.unwrap();
    let status = response.status();
    let cache_control = response
        .headers()
        .get(header::CACHE_CONTROL)
        .map(|value| value.to_str().unwrap().to_string());

    let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, cache_control, serde_json::from_slice(&body).unwrap())
}

async fn post(body: impl Into<Body>) -> (StatusCode, Option<String>, Value) {
    let request = http::Request::builder()
        .method(Method::POST)
        .uri("/graphql")
        .header(header::CONTENT_TYPE, "application/json")
        .body(body.into())
        .unwrap();

    send(request).await
}

async fn get(query_string: &str) -> (StatusCode, Option<String>, Value) {
    let request = http::Request::builder()
        .uri(format!("/graphql?{query_string}"))
        .body(Body::empty())
        .unwrap();

    send(request).await
}

#[tokio::test]
async fn post_executes_the_query() {
    let body = json!({
        "query": "query Sum($a: Int) { message add(a: $a) }",
        "operationName": "Sum",
        "variables": {"a": 41}
    });

    let (status, _, response) = post(body.to_string()).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(response, json!({"data": {"message": "hello", "add": 42}}));
}

#[tokio::test]
async fn get_reads_the_query_string() {
    let (status, _, response) = get("query=%7B%20add(a%3A%202%2C%20b%3A%203)%20%7D").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(response, json!({"data": {"add": 5}}));

    let (_, _, response) = get("query=query(%24a%3A%20Int)%7Badd(a%3A%24a)%7D&variables=%7B%22a%22%3A9%7D").await;
    assert_eq!(response, json!({"data": {"add": 10}}));

    let (status, _, response) = get("query=%7Badd%7D&variables=nope").await;
    assert_eq!(status, StatusCode::OK);
    assert!(
        response["errors"][0]["message"]
            .as_str()
            .unwrap()
            .starts_with("invalid variables: "),
        "{response}"
    );
}

#[tokio::test]
async fn errors_are_reported_in_the_body() {
    let (status, cache_control, response) = post(json!({"query": "{ message broken }"}).to_string()).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(cache_control, None);
    assert_eq!(
        response,
        json!({
            "data": null,
            "errors": [{
                "message": "out of order",
                "locations": [{"line": 1, "column": 11}],
                "path": ["broken"]
            }]
        })
    );

    let (status, _, response) = post("{ not json").await;
    assert_eq!(status, StatusCode::OK);
    assert!(response.get("data").is_none());
    assert_eq!(response["errors"].as_array().unwrap().len(), 1);

    let (status, _, response) = post(json!({"query": "{ message"}).to_string()).await;
    assert_eq!(status, StatusCode::OK);
    assert!(response.get("data").is_none());
    assert_eq!(response["errors"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn cache_hints_become_headers() {
    let (_, cache_control, _) = post(json!({"query": "{ message }"}).to_string()).await;
    assert_eq!(cache_control, None);

    let (_, cache_control, response) = post(json!({"query": "{ message motd }"}).to_string()).await;
    assert_eq!(response, json!({"data": {"message": "hello", "motd": "be kind"}}));
    assert_eq!(cache_control.as_deref(), Some("max-age=30"));

    let (_, cache_control, _) = post(json!({"query": "{ motd clock }"}).to_string()).await;
    assert_eq!(cache_control.as_deref(), Some("no-cache"));
}

#[tokio::test]
async fn unknown_paths_are_not_found() {
    let request = http::Request::builder().uri("/elsewhere").body(Body::empty()).unwrap();
    let response = app().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
