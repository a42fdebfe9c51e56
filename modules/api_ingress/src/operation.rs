//! Type-safe operation builder.
//!
//! The builder tracks, in its type, whether a handler and a success response
//! have been declared; [`OperationBuilder::register`] only exists once both are
//! present, so an operation without either does not compile.
//!
//! ```ignore
//! OperationBuilder::get("/v1/host/{id}")
//!     .operation_id("host.inspect")
//!     .path_param("id", "host id or name")
//!     .fails_with(FailureKind::NotFound)
//!     .handler(inspect_host)
//!     .json_response(200, "Host", "the host")
//!     .register(&mut table)?;
//! ```
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use gateway_errors::FailureKind;
use http::Method;

use crate::handler::OperationHandler;
use crate::router::{OperationTableBuilder, RouteTableError};

/// Type-state markers
pub mod state {
    #[derive(Debug, Clone, Copy)]
    pub struct Missing;

    #[derive(Debug, Clone, Copy)]
    pub struct Present;
}

pub use state::{Missing, Present};

mod sealed {
    pub trait Sealed {}
    impl Sealed for super::Missing {}
    impl Sealed for super::Present {}
}

/// Storage for a builder component: nothing while `Missing`, `T` once `Present`.
pub trait Slot<T>: sealed::Sealed {
    type Value;
}

impl<T> Slot<T> for Missing {
    type Value = ();
}

impl<T> Slot<T> for Present {
    type Value = T;
}

pub type SharedHandler = Arc<dyn OperationHandler>;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ParamLocation {
    Path,
    Query,
}

impl ParamLocation {
    pub const fn as_str(&self) -> &'static str {
        match self {
            ParamLocation::Path => "path",
            ParamLocation::Query => "query",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ParamKind {
    String,
    Integer,
    Boolean,
}

impl ParamKind {
    /// JSON Schema type name.
    pub const fn as_str(&self) -> &'static str {
        match self {
            ParamKind::String => "string",
            ParamKind::Integer => "integer",
            ParamKind::Boolean => "boolean",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParamSpec {
    pub name: String,
    pub location: ParamLocation,
    pub kind: ParamKind,
    pub required: bool,
    pub description: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RequestBodySpec {
    /// Registered schema the body is decoded against.
    pub schema: String,
    pub description: Option<String>,
}

/// Body shape of the success response.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ResponseBody {
    /// A single resource of this schema.
    Resource(String),
    /// An envelope schema whose single list field receives the items.
    Collection(String),
    /// `{}`
    Empty,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResponseSpec {
    pub status: u16,
    pub description: String,
    pub body: ResponseBody,
}

/// Everything about an operation except the handler.
#[derive(Clone, Debug)]
pub struct OperationSpec {
    pub method: Method,
    pub path: String,
    pub operation_id: Option<String>,
    pub summary: Option<String>,
    pub description: Option<String>,
    pub tags: Vec<String>,
    pub params: Vec<ParamSpec>,
    pub request_body: Option<RequestBodySpec>,
    /// Failure kinds the handler may produce on top of the ones binding can.
    pub failures: Vec<FailureKind>,
    /// Stable fallback id derived from method and path.
    pub handler_id: String,
}

impl OperationSpec {
    pub fn id(&self) -> &str {
        self.operation_id.as_deref().unwrap_or(&self.handler_id)
    }
}

/// A complete entry of the operation table.
#[derive(Clone)]
pub struct Operation {
    pub spec: OperationSpec,
    pub response: ResponseSpec,
    pub handler: SharedHandler,
}

impl fmt::Debug for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Operation")
            .field("spec", &self.spec)
            .field("response", &self.response)
            .finish_non_exhaustive()
    }
}

pub struct OperationBuilder<H, R>
where
    H: Slot<SharedHandler>,
    R: Slot<ResponseSpec>,
{
    spec: OperationSpec,
    handler: <H as Slot<SharedHandler>>::Value,
    response: <R as Slot<ResponseSpec>>::Value,
    _state: PhantomData<(H, R)>,
}

impl OperationBuilder<Missing, Missing> {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        let path = path.into();
        let handler_id = format!(
            "{}:{}",
            method.as_str().to_lowercase(),
            path.replace(['/', '{', '}'], "_")
        );
        Self {
            spec: OperationSpec {
                method,
                path,
                operation_id: None,
                summary: None,
                description: None,
                tags: Vec::new(),
                params: Vec::new(),
                request_body: None,
                failures: Vec::new(),
                handler_id,
            },
            handler: (),
            response: (),
            _state: PhantomData,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::PUT, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }
}

// Descriptive methods, available at any stage.
impl<H, R> OperationBuilder<H, R>
where
    H: Slot<SharedHandler>,
    R: Slot<ResponseSpec>,
{
    pub fn spec(&self) -> &OperationSpec {
        &self.spec
    }

    pub fn operation_id(mut self, id: impl Into<String>) -> Self {
        self.spec.operation_id = Some(id.into());
        self
    }

    pub fn summary(mut self, text: impl Into<String>) -> Self {
        self.spec.summary = Some(text.into());
        self
    }

    pub fn description(mut self, text: impl Into<String>) -> Self {
        self.spec.description = Some(text.into());
        self
    }

    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.spec.tags.push(tag.into());
        self
    }

    pub fn param(mut self, param: ParamSpec) -> Self {
        self.spec.params.push(param);
        self
    }

    /// Path parameters are always required strings.
    pub fn path_param(self, name: impl Into<String>, description: impl Into<String>) -> Self {
        self.param(ParamSpec {
            name: name.into(),
            location: ParamLocation::Path,
            kind: ParamKind::String,
            required: true,
            description: Some(description.into()),
        })
    }

    pub fn query_param(
        self,
        name: impl Into<String>,
        kind: ParamKind,
        required: bool,
        description: impl Into<String>,
    ) -> Self {
        self.param(ParamSpec {
            name: name.into(),
            location: ParamLocation::Query,
            kind,
            required,
            description: Some(description.into()),
        })
    }

    /// Required JSON body decoded against registered schema `schema`.
    pub fn json_request(mut self, schema: impl Into<String>, desc: impl Into<String>) -> Self {
        self.spec.request_body = Some(RequestBodySpec {
            schema: schema.into(),
            description: Some(desc.into()),
        });
        self
    }

    pub fn fails_with(mut self, kind: FailureKind) -> Self {
        if !self.spec.failures.contains(&kind) {
            self.spec.failures.push(kind);
        }
        self
    }
}

impl<R> OperationBuilder<Missing, R>
where
    R: Slot<ResponseSpec>,
{
    pub fn handler<F>(self, handler: F) -> OperationBuilder<Present, R>
    where
        F: OperationHandler + 'static,
    {
        self.shared_handler(Arc::new(handler))
    }

    /// Use an already shared handler (one handler value serving several routes).
    pub fn shared_handler(self, handler: SharedHandler) -> OperationBuilder<Present, R> {
        OperationBuilder {
            spec: self.spec,
            handler,
            response: self.response,
            _state: PhantomData,
        }
    }
}

impl<H> OperationBuilder<H, Missing>
where
    H: Slot<SharedHandler>,
{
    pub fn response(self, response: ResponseSpec) -> OperationBuilder<H, Present> {
        OperationBuilder {
            spec: self.spec,
            handler: self.handler,
            response,
            _state: PhantomData,
        }
    }

    pub fn json_response(
        self,
        status: u16,
        schema: impl Into<String>,
        description: impl Into<String>,
    ) -> OperationBuilder<H, Present> {
        self.response(ResponseSpec {
            status,
            description: description.into(),
            body: ResponseBody::Resource(schema.into()),
        })
    }

    pub fn collection_response(
        self,
        status: u16,
        envelope: impl Into<String>,
        description: impl Into<String>,
    ) -> OperationBuilder<H, Present> {
        self.response(ResponseSpec {
            status,
            description: description.into(),
            body: ResponseBody::Collection(envelope.into()),
        })
    }

    pub fn empty_response(
        self,
        status: u16,
        description: impl Into<String>,
    ) -> OperationBuilder<H, Present> {
        self.response(ResponseSpec {
            status,
            description: description.into(),
            body: ResponseBody::Empty,
        })
    }
}

impl OperationBuilder<Present, Present> {
    pub fn into_operation(self) -> Operation {
        Operation {
            spec: self.spec,
            response: self.response,
            handler: self.handler,
        }
    }

    /// Add the finished operation to `table`.
    pub fn register(self, table: &mut OperationTableBuilder) -> Result<(), RouteTableError> {
        table.add(self.into_operation())
    }
}
