use std::sync::Arc;

use axum::extract::State;
use axum::response::{Html, Json};
use serde_json::{json, Value};

use crate::IngressState;

/// Liveness only; the orchestration backend is not probed.
pub(crate) async fn health_check(State(state): State<Arc<IngressState>>) -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
        "operations": state.dispatcher.table().len(),
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

/// Stoplight Elements page reading `openapi.json` next to it, so it works
/// under any base path.
pub(crate) async fn serve_docs() -> Html<&'static str> {
    Html(
        r#"<!DOCTYPE html>
<html>
<head>
  <meta charset="utf-8"/>
  <title>Cloud Gateway API</title>
  <script src="https://unpkg.com/@stoplight/elements@latest/web-components.min.js"></script>
  <link rel="stylesheet" href="https://unpkg.com/@stoplight/elements@latest/styles.min.css">
</head>
<body>
  <elements-api apiDescriptionUrl="openapi.json" router="hash" layout="sidebar"></elements-api>
</body>
</html>"#,
    )
}
