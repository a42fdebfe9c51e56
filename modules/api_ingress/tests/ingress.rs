//! End-to-end behaviour of the ingress router: routing, binding, error mapping
//! and the documentation endpoints.
use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    http::{Method, Request, StatusCode},
    Router,
};
use gateway_errors::{Failure, FailureKind, FailureResult};
use gateway_schema::{Resource, SchemaRegistry};
use serde_json::{json, Value};
use tower::util::ServiceExt;

use api_ingress::{
    ApiIngress, ApiIngressConfig, OperationBuilder, OperationTableBuilder, Outcome, ParamKind,
    ParameterSet,
};

const CONTRACT: &str = r#"
enums:
  DiskSpeed: [HDD, SSD]
resources:
  Volume:
    fields:
      - { name: id, type: string }
      - { name: size, type: integer, required: true }
      - { name: speed, type: DiskSpeed }
  VolumeList:
    fields:
      - { name: volumes, type: 'list<Volume>', required: true }
"#;

async fn create(mut params: ParameterSet) -> FailureResult<Outcome> {
    let body = params.take_body()?;
    if body.i64_field("size") == Some(0) {
        return Err(Failure::conflict("volume of size 0 already exists"));
    }
    Ok(Outcome::Resource(body.with("id", "vol-1")))
}

async fn list(params: ParameterSet) -> FailureResult<Outcome> {
    let mut items = vec![Resource::new("Volume").with("size", 10i64)];
    if params.bool("all").unwrap_or(false) {
        items.push(Resource::new("Volume").with("size", 20i64));
    }
    Ok(Outcome::Collection(items))
}

async fn slow(_params: ParameterSet) -> FailureResult<Outcome> {
    tokio::time::sleep(Duration::from_secs(5)).await;
    Ok(Outcome::Empty)
}

fn app(config: ApiIngressConfig) -> Router {
    let registry = Arc::new(SchemaRegistry::from_yaml(CONTRACT).unwrap());
    let mut table = OperationTableBuilder::new();
    OperationBuilder::post("/v1/volume")
        .operation_id("volume.create")
        .json_request("Volume", "volume to create")
        .fails_with(FailureKind::Conflict)
        .handler(create)
        .json_response(200, "Volume", "created")
        .register(&mut table)
        .unwrap();
    OperationBuilder::get("/v1/volumes")
        .query_param("all", ParamKind::Boolean, false, "include everything")
        .handler(list)
        .collection_response(200, "VolumeList", "volumes")
        .register(&mut table)
        .unwrap();
    OperationBuilder::post("/v1/volume/{id}/detach")
        .path_param("id", "volume id")
        .handler(slow)
        .empty_response(200, "detached")
        .register(&mut table)
        .unwrap();
    let table = table.build(&registry).unwrap();
    ApiIngress::new(config, registry, table)
        .build_router()
        .unwrap()
}

async fn call(app: Router, method: Method, uri: &str, body: &str) -> (StatusCode, Value) {
    let response = app
        .oneshot(
            Request::builder()
                .method(method)
                .uri(uri)
                .header("content-type", "application/json")
                .header("content-length", body.len())
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
}

#[tokio::test]
async fn health_reports_healthy() {
    let (status, body) = call(app(ApiIngressConfig::default()), Method::GET, "/health", "").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
async fn create_round_trips_the_body() {
    let (status, body) = call(
        app(ApiIngressConfig::default()),
        Method::POST,
        "/v1/volume",
        r#"{"size": 5, "speed": "SSD"}"#,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"id": "vol-1", "size": 5, "speed": "SSD"}));
}

#[tokio::test]
async fn client_errors_name_the_offender() {
    let cases = [
        ("", "MissingParameter", "body"),
        ("{not json", "InvalidParameter", "body"),
        (r#"{"speed": "SSD"}"#, "MissingField", "size"),
        (r#"{"size": "big"}"#, "TypeMismatch", "size"),
        (r#"{"size": 1, "speed": "FAST"}"#, "InvalidEnumValue", "FAST"),
    ];
    for (payload, kind, needle) in cases {
        let (status, body) = call(
            app(ApiIngressConfig::default()),
            Method::POST,
            "/v1/volume",
            payload,
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "payload {payload:?}");
        assert_eq!(body["kind"], kind, "payload {payload:?}");
        assert!(
            body["message"].as_str().unwrap().contains(needle),
            "message for {payload:?} should mention {needle}: {body}"
        );
        assert!(body["request_id"].is_string());
    }
}

#[tokio::test]
async fn handler_failures_map_to_their_status() {
    let (status, body) = call(
        app(ApiIngressConfig::default()),
        Method::POST,
        "/v1/volume",
        r#"{"size": 0}"#,
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["kind"], "Conflict");
}

#[tokio::test]
async fn collections_use_the_envelope_and_query_flags() {
    let (status, body) = call(app(ApiIngressConfig::default()), Method::GET, "/v1/volumes", "").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"volumes": [{"size": 10}]}));

    let (_, body) = call(
        app(ApiIngressConfig::default()),
        Method::GET,
        "/v1/volumes?all=true",
        "",
    )
    .await;
    assert_eq!(body["volumes"].as_array().unwrap().len(), 2);

    let (status, body) = call(
        app(ApiIngressConfig::default()),
        Method::GET,
        "/v1/volumes?all=maybe",
        "",
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "InvalidParameter");
}

#[tokio::test]
async fn unknown_routes_are_not_found() {
    let (status, body) = call(app(ApiIngressConfig::default()), Method::GET, "/v1/nothing", "").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["kind"], "NotFound");

    let (status, _) = call(app(ApiIngressConfig::default()), Method::DELETE, "/v1/volumes", "").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn slow_backend_is_unavailable() {
    let config = ApiIngressConfig {
        backend_timeout: Duration::from_millis(50),
        ..ApiIngressConfig::default()
    };
    let (status, body) = call(app(config), Method::POST, "/v1/volume/v1/detach", "").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["kind"], "BackendUnavailable");
}

#[tokio::test]
async fn base_path_prefixes_every_route() {
    let config = ApiIngressConfig {
        base_path: Some("/api/".into()),
        enable_docs: true,
        ..ApiIngressConfig::default()
    };

    let (status, _) = call(app(config.clone()), Method::GET, "/api/v1/volumes", "").await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = call(app(config.clone()), Method::GET, "/v1/volumes", "").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = call(app(config.clone()), Method::GET, "/api/health", "").await;
    assert_eq!(status, StatusCode::OK);

    let (status, doc) = call(app(config), Method::GET, "/api/openapi.json", "").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(doc["servers"][0]["url"], "/api");
    assert!(doc["paths"]["/v1/volume"]["post"].is_object());
}

#[tokio::test]
async fn docs_are_off_by_default() {
    let (status, _) = call(app(ApiIngressConfig::default()), Method::GET, "/openapi.json", "").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn oversized_bodies_are_invalid_parameters() {
    let config = ApiIngressConfig {
        body_limit_bytes: 16,
        ..ApiIngressConfig::default()
    };
    let (status, body) = call(
        app(config),
        Method::POST,
        "/v1/volume",
        r#"{"size": 1, "speed": "SSD", "padding": "xxxxxxxxxxxxxxxx"}"#,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "InvalidParameter");
    assert!(body["message"].as_str().unwrap().contains("body"), "{body}");
}

#[tokio::test]
async fn wrong_method_on_health_uses_the_error_shape() {
    let (status, body) = call(app(ApiIngressConfig::default()), Method::POST, "/health", "").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["kind"], "NotFound");
    assert_eq!(body["message"], "no route for POST /health");
    assert!(body["request_id"].is_string());
}
