//! HTTP surface of the gateway.
//!
//! Resource modules describe their endpoints with [`OperationBuilder`] and hand
//! the resulting [`OperationTable`] to [`ApiIngress`], which owns the axum
//! router, the middleware stack, the OpenAPI document and the server lifecycle.
//! Every API request goes through the [`Dispatcher`]: match, bind, handle, encode.
use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use axum::body::Body;
use axum::extract::{Request, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use axum::{middleware::from_fn, routing::get, Router};
use gateway_errors::{Failure, FailureResult};
use gateway_schema::SchemaRegistry;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::{
    cors::CorsLayer,
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
};

mod config;
pub mod dispatch;
pub mod error;
pub mod handler;
pub mod openapi;
pub mod operation;
pub mod params;
pub mod path;
pub mod request_id;
pub mod router;
mod web;

pub use config::ApiIngressConfig;
pub use dispatch::Dispatcher;
pub use handler::{OperationHandler, Outcome};
pub use operation::{OperationBuilder, ParamKind, ParamLocation};
pub use params::{ParamValue, ParameterSet};
pub use router::{OperationTable, OperationTableBuilder, RouteTableError};

use request_id::XRequestId;

struct IngressState {
    dispatcher: Arc<Dispatcher>,
    base_path: Option<String>,
    body_limit: usize,
}

impl IngressState {
    /// Request path relative to the configured base path.
    fn api_path<'p>(&self, path: &'p str) -> FailureResult<&'p str> {
        let Some(base) = self.base_path.as_deref() else {
            return Ok(path);
        };
        match path.strip_prefix(base) {
            Some("") => Ok("/"),
            Some(rest) if rest.starts_with('/') => Ok(rest),
            _ => Err(Failure::not_found(format!("no route for {path}"))),
        }
    }
}

pub struct ApiIngress {
    config: ApiIngressConfig,
    dispatcher: Arc<Dispatcher>,
}

impl ApiIngress {
    pub fn new(
        config: ApiIngressConfig,
        registry: Arc<SchemaRegistry>,
        table: OperationTable,
    ) -> Self {
        let dispatcher = Arc::new(Dispatcher::new(
            Arc::new(table),
            registry,
            config.backend_timeout,
        ));
        Self { config, dispatcher }
    }

    pub fn config(&self) -> &ApiIngressConfig {
        &self.config
    }

    pub fn dispatcher(&self) -> &Arc<Dispatcher> {
        &self.dispatcher
    }

    pub fn build_openapi(&self) -> openapi::OpenApi {
        openapi::build_openapi(
            self.dispatcher.table(),
            self.dispatcher.registry(),
            self.config.normalized_base_path().as_deref(),
        )
    }

    /// Build the HTTP router: health, optional docs, and the dispatcher as fallback.
    pub fn build_router(&self) -> Result<Router> {
        let base = self.config.normalized_base_path();
        let prefix = base.clone().unwrap_or_default();

        let state = Arc::new(IngressState {
            dispatcher: self.dispatcher.clone(),
            base_path: base,
            body_limit: self.config.body_limit_bytes,
        });

        let mut router = Router::new().route(&format!("{prefix}/health"), get(web::health_check));

        if self.config.enable_docs {
            let doc = Arc::new(serde_json::to_value(self.build_openapi())?);
            router = router
                .route(
                    &format!("{prefix}/openapi.json"),
                    get(move || {
                        let doc = doc.clone();
                        async move { Json((*doc).clone()) }
                    }),
                )
                .route(&format!("{prefix}/docs"), get(web::serve_docs));
        }

        let mut router = router
            .method_not_allowed_fallback(method_not_allowed)
            .fallback(dispatch_request)
            .with_state(state);

        // Middleware order (outermost to innermost):
        // PropagateRequestId -> SetRequestId -> push_req_id_to_extensions -> Trace -> CORS
        // The body limit is applied in `forward`, the backend deadline by the dispatcher.
        let x_request_id = request_id::header();
        if self.config.cors_enabled {
            router = router.layer(CorsLayer::permissive());
        }
        router = router.layer(request_id::create_trace_layer());
        router = router.layer(from_fn(request_id::push_req_id_to_extensions));
        router = router.layer(SetRequestIdLayer::new(
            x_request_id.clone(),
            request_id::MakeReqId,
        ));
        router = router.layer(PropagateRequestIdLayer::new(x_request_id));

        tracing::debug!(
            operations = self.dispatcher.table().len(),
            docs = self.config.enable_docs,
            "router built"
        );
        Ok(router)
    }

    /// Bind the configured address and serve until `cancel` fires.
    pub async fn serve(self: Arc<Self>, cancel: CancellationToken) -> Result<()> {
        let addr: SocketAddr = self.config.bind_addr.parse().map_err(|e| {
            anyhow::anyhow!("Invalid bind address '{}': {}", self.config.bind_addr, e)
        })?;
        let listener = TcpListener::bind(addr).await?;
        self.serve_on(listener, cancel).await
    }

    /// Serve on an already bound listener (tests bind port 0).
    pub async fn serve_on(&self, listener: TcpListener, cancel: CancellationToken) -> Result<()> {
        let router = self.build_router()?;
        tracing::info!("HTTP server bound on {}", listener.local_addr()?);

        let shutdown = async move {
            cancel.cancelled().await;
            tracing::info!("HTTP server shutting down gracefully (cancellation)");
        };

        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown)
            .await
            .map_err(|e| anyhow::anyhow!(e))
    }
}

async fn dispatch_request(State(state): State<Arc<IngressState>>, req: Request<Body>) -> Response {
    let request_id = req.extensions().get::<XRequestId>().cloned();
    match forward(&state, req).await {
        Ok((status, json)) => (status, Json(json)).into_response(),
        Err(failure) => error::render_failure(failure, request_id.as_ref()),
    }
}

/// Wrong verb on one of the ingress' own routes (health, docs). Contract
/// routes never get here: the dispatcher reports those as not found.
async fn method_not_allowed(req: Request<Body>) -> Response {
    let request_id = req.extensions().get::<XRequestId>().cloned();
    let failure = Failure::not_found(format!(
        "no route for {} {}",
        req.method(),
        req.uri().path()
    ));
    error::render_failure(failure, request_id.as_ref())
}

async fn forward(
    state: &IngressState,
    req: Request<Body>,
) -> FailureResult<(StatusCode, serde_json::Value)> {
    let (parts, body) = req.into_parts();
    let path = state.api_path(parts.uri.path())?;
    let bytes = axum::body::to_bytes(body, state.body_limit)
        .await
        .map_err(|e| {
            Failure::invalid_parameter(
                "body",
                format!("could not read request body (limit {} bytes)", state.body_limit),
            )
            .with_cause(e)
        })?;
    state
        .dispatcher
        .dispatch(&parts.method, path, parts.uri.query(), &bytes)
        .await
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state(base: Option<&str>) -> IngressState {
        let registry = Arc::new(SchemaRegistry::builder().build().unwrap());
        let table = OperationTableBuilder::new().build(&registry).unwrap();
        IngressState {
            dispatcher: Arc::new(Dispatcher::new(
                Arc::new(table),
                registry,
                std::time::Duration::from_secs(1),
            )),
            base_path: base.map(str::to_string),
            body_limit: 1024,
        }
    }

    #[test]
    fn base_path_is_stripped_on_segment_boundaries() {
        let s = state(Some("/api"));
        assert_eq!(s.api_path("/api/v1/hosts").unwrap(), "/v1/hosts");
        assert_eq!(s.api_path("/api").unwrap(), "/");
        assert!(s.api_path("/apiv1/hosts").is_err());
        assert!(s.api_path("/v1/hosts").is_err());

        let s = state(None);
        assert_eq!(s.api_path("/v1/hosts").unwrap(), "/v1/hosts");
    }
}
