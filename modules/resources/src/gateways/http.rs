//! JSON-over-HTTP adapter for a remote orchestration engine.
//!
//! | Call | Request | Success body |
//! |---|---|---|
//! | create | `POST {base}/{kind}` with the wire request | `{"id": ...}` |
//! | list | `GET {base}/{kind}?all=&tenant_id=&host=` | `{"items": [{"id", "name"}]}` |
//! | inspect | `GET {base}/{kind}/{id}` | wire resource |
//! | delete | `DELETE {base}/{kind}/{id}?tenant_id=` | ignored |
//! | act | `POST {base}/{kind}/{id}/{action}` | wire resource |
//! | ssh_config | `GET {base}/host/{id}/ssh` | wire `SshConfig` |
//! | tenants | `GET` / `PUT {base}/tenant/current` | wire `Tenant` |
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use gateway_schema::{Resource, SchemaRegistry};
use reqwest::{Method, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::Value as Json;
use tracing::Instrument;
use url::Url;

use crate::contract::{
    BackendError, BackendResult, HostAction, ListFilter, OrchestrationClient, ResourceKind,
    ResourceRef,
};

#[derive(Deserialize)]
struct CreatedDto {
    id: String,
}

#[derive(Deserialize)]
struct RefDto {
    id: String,
    #[serde(default)]
    name: String,
}

#[derive(Deserialize)]
struct ListDto {
    items: Vec<RefDto>,
}

#[derive(Serialize)]
struct SelectTenantDto<'a> {
    name: &'a str,
}

pub struct HttpOrchestrationClient {
    http: reqwest::Client,
    base: Url,
    registry: Arc<SchemaRegistry>,
}

impl HttpOrchestrationClient {
    pub fn new(
        endpoint: &str,
        request_timeout: Duration,
        registry: Arc<SchemaRegistry>,
    ) -> anyhow::Result<Self> {
        let base = Url::parse(endpoint)
            .map_err(|e| anyhow::anyhow!("invalid backend endpoint '{endpoint}': {e}"))?;
        if base.cannot_be_a_base() {
            anyhow::bail!("backend endpoint '{endpoint}' cannot be used as a base URL");
        }
        let http = reqwest::Client::builder().timeout(request_timeout).build()?;
        Ok(Self {
            http,
            base,
            registry,
        })
    }

    fn url(&self, segments: &[&str]) -> BackendResult<Url> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|_| BackendError::internal("backend endpoint cannot be a base URL"))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// One round trip; `subject` names the resource in `NotFound`/`AlreadyExists`.
    async fn call(
        &self,
        method: Method,
        segments: &[&str],
        query: &[(&str, String)],
        body: Option<&Json>,
        kind: ResourceKind,
        subject: &str,
    ) -> BackendResult<Json> {
        let url = self.url(segments)?;
        let span = tracing::info_span!(
            "outgoing_http",
            http.method = %method,
            http.url = %url,
            http.status_code = tracing::field::Empty,
        );

        async move {
            let mut req = self.http.request(method, url);
            if !query.is_empty() {
                req = req.query(query);
            }
            if let Some(body) = body {
                req = req.json(body);
            }

            let resp = req.send().await.map_err(transport_error)?;
            let status = resp.status();
            tracing::Span::current().record("http.status_code", status.as_u16());
            let text = resp.text().await.map_err(transport_error)?;

            if !status.is_success() {
                let err = status_error(status, kind, subject, text);
                tracing::debug!(error = %err, "backend call failed");
                return Err(err);
            }
            if text.trim().is_empty() {
                return Ok(Json::Null);
            }
            serde_json::from_str(&text)
                .map_err(|e| BackendError::protocol(format!("invalid JSON from backend: {e}")))
        }
        .instrument(span)
        .await
    }

    fn decode(&self, schema: &str, json: &Json) -> BackendResult<Resource> {
        self.registry
            .marshaller()
            .decode(schema, json)
            .map_err(|f| BackendError::protocol(format!("{schema} payload: {}", f.message)))
    }
}

fn transport_error(err: reqwest::Error) -> BackendError {
    if err.is_timeout() {
        BackendError::Timeout(err.to_string())
    } else if err.is_connect() {
        BackendError::NotAvailable(err.to_string())
    } else if err.is_decode() {
        BackendError::protocol(err.to_string())
    } else {
        BackendError::internal(err.to_string())
    }
}

fn status_error(status: StatusCode, kind: ResourceKind, subject: &str, text: String) -> BackendError {
    let detail = if text.trim().is_empty() {
        status.to_string()
    } else {
        text
    };
    match status.as_u16() {
        404 => BackendError::not_found(kind, subject),
        409 => BackendError::already_exists(kind, subject),
        401 | 403 => BackendError::PermissionDenied(detail),
        400 | 422 => BackendError::invalid_request(detail),
        503 => BackendError::NotAvailable(detail),
        504 => BackendError::Timeout(detail),
        _ => BackendError::internal(format!("{status}: {detail}")),
    }
}

#[async_trait]
impl OrchestrationClient for HttpOrchestrationClient {
    async fn create(&self, kind: ResourceKind, spec: Resource) -> BackendResult<String> {
        let body = self
            .registry
            .marshaller()
            .encode(&spec)
            .map_err(|f| BackendError::invalid_request(f.message))?;
        let name = spec.str_field("name").unwrap_or_default();
        let json = self
            .call(Method::POST, &[kind.as_str()], &[], Some(&body), kind, name)
            .await?;
        let created: CreatedDto = serde_json::from_value(json)
            .map_err(|e| BackendError::protocol(format!("create response: {e}")))?;
        Ok(created.id)
    }

    async fn list(&self, kind: ResourceKind, filter: &ListFilter) -> BackendResult<Vec<ResourceRef>> {
        let mut query = Vec::new();
        if filter.all {
            query.push(("all", "true".to_string()));
        }
        if let Some(tenant) = &filter.tenant_id {
            query.push(("tenant_id", tenant.clone()));
        }
        if let Some(host) = &filter.host {
            query.push(("host", host.clone()));
        }
        let subject = filter.host.as_deref().unwrap_or_default();
        let subject_kind = if filter.host.is_some() {
            ResourceKind::Host
        } else {
            kind
        };

        let json = self
            .call(Method::GET, &[kind.as_str()], &query, None, subject_kind, subject)
            .await?;
        let list: ListDto = serde_json::from_value(json)
            .map_err(|e| BackendError::protocol(format!("list response: {e}")))?;
        Ok(list
            .items
            .into_iter()
            .map(|r| ResourceRef::new(r.id, r.name))
            .collect())
    }

    async fn inspect(&self, kind: ResourceKind, id: &str) -> BackendResult<Resource> {
        let json = self
            .call(Method::GET, &[kind.as_str(), id], &[], None, kind, id)
            .await?;
        self.decode(kind.schema(), &json)
    }

    async fn delete(&self, kind: ResourceKind, id: &str, tenant: Option<&str>) -> BackendResult<()> {
        let query: Vec<(&str, String)> = tenant
            .map(|t| ("tenant_id", t.to_string()))
            .into_iter()
            .collect();
        self.call(Method::DELETE, &[kind.as_str(), id], &query, None, kind, id)
            .await
            .map(|_| ())
    }

    async fn act(&self, kind: ResourceKind, id: &str, action: HostAction) -> BackendResult<Resource> {
        let json = self
            .call(
                Method::POST,
                &[kind.as_str(), id, action.as_str()],
                &[],
                None,
                kind,
                id,
            )
            .await?;
        self.decode(kind.schema(), &json)
    }

    async fn ssh_config(&self, host: &str) -> BackendResult<Resource> {
        let kind = ResourceKind::Host;
        let json = self
            .call(Method::GET, &[kind.as_str(), host, "ssh"], &[], None, kind, host)
            .await?;
        self.decode("SshConfig", &json)
    }

    async fn current_tenant(&self) -> BackendResult<Resource> {
        let kind = ResourceKind::Tenant;
        let json = self
            .call(Method::GET, &[kind.as_str(), "current"], &[], None, kind, "current")
            .await?;
        self.decode(kind.schema(), &json)
    }

    async fn set_current_tenant(&self, name: &str) -> BackendResult<Resource> {
        let kind = ResourceKind::Tenant;
        let body = serde_json::to_value(SelectTenantDto { name })
            .map_err(|e| BackendError::internal(e.to_string()))?;
        let json = self
            .call(Method::PUT, &[kind.as_str(), "current"], &[], Some(&body), kind, name)
            .await?;
        self.decode(kind.schema(), &json)
    }
}
