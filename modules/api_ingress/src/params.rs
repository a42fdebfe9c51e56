//! Parameter binding: path values, query string and JSON body.
use std::collections::BTreeMap;

use gateway_errors::{Failure, FailureResult};
use gateway_schema::{Marshaller, Resource};
use url::form_urlencoded;

use crate::operation::{OperationSpec, ParamKind, ParamLocation};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamValue {
    String(String),
    Integer(i64),
    Boolean(bool),
}

/// Typed, validated inputs handed to a handler.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParameterSet {
    values: BTreeMap<String, ParamValue>,
    body: Option<Resource>,
}

impl ParameterSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, value: ParamValue) -> Self {
        self.values.insert(name.into(), value);
        self
    }

    pub fn with_body(mut self, body: Resource) -> Self {
        self.body = Some(body);
        self
    }

    pub fn get(&self, name: &str) -> Option<&ParamValue> {
        self.values.get(name)
    }

    pub fn str(&self, name: &str) -> Option<&str> {
        match self.values.get(name) {
            Some(ParamValue::String(s)) => Some(s),
            _ => None,
        }
    }

    pub fn bool(&self, name: &str) -> Option<bool> {
        match self.values.get(name) {
            Some(ParamValue::Boolean(b)) => Some(*b),
            _ => None,
        }
    }

    pub fn i64(&self, name: &str) -> Option<i64> {
        match self.values.get(name) {
            Some(ParamValue::Integer(i)) => Some(*i),
            _ => None,
        }
    }

    /// A parameter the operation declares as required. Absence here means the
    /// handler and its descriptor disagree, which is a server bug.
    pub fn required_str(&self, name: &str) -> FailureResult<&str> {
        self.str(name).ok_or_else(|| {
            Failure::internal(format!("handler asked for undeclared string parameter '{name}'"))
        })
    }

    pub fn body(&self) -> Option<&Resource> {
        self.body.as_ref()
    }

    pub fn take_body(&mut self) -> FailureResult<Resource> {
        self.body
            .take()
            .ok_or_else(|| Failure::internal("handler expected a request body"))
    }
}

fn coerce(name: &str, kind: ParamKind, raw: &str) -> FailureResult<ParamValue> {
    match kind {
        ParamKind::String => Ok(ParamValue::String(raw.to_string())),
        ParamKind::Integer => raw
            .parse::<i64>()
            .map(ParamValue::Integer)
            .map_err(|_| Failure::invalid_parameter(name, format!("expected integer, got '{raw}'"))),
        ParamKind::Boolean => match raw {
            "true" | "1" => Ok(ParamValue::Boolean(true)),
            "false" | "0" => Ok(ParamValue::Boolean(false)),
            _ => Err(Failure::invalid_parameter(
                name,
                format!("expected boolean, got '{raw}'"),
            )),
        },
    }
}

/// Form-decoded query pairs. First occurrence wins.
fn parse_query(raw: Option<&str>) -> BTreeMap<String, String> {
    let mut out = BTreeMap::new();
    for (k, v) in form_urlencoded::parse(raw.unwrap_or_default().as_bytes()) {
        out.entry(k.into_owned()).or_insert_with(|| v.into_owned());
    }
    out
}

/// Validate and coerce every declared parameter, then decode the body.
/// Unknown query parameters are ignored.
pub fn bind_parameters(
    spec: &OperationSpec,
    path_values: Vec<(String, String)>,
    raw_query: Option<&str>,
    body: &[u8],
    marshaller: &Marshaller<'_>,
) -> FailureResult<ParameterSet> {
    let path: BTreeMap<String, String> = path_values.into_iter().collect();
    let query = parse_query(raw_query);

    let mut set = ParameterSet::new();
    for param in &spec.params {
        let raw = match param.location {
            ParamLocation::Path => path.get(&param.name),
            ParamLocation::Query => query.get(&param.name),
        };
        match raw {
            Some(raw) => {
                let value = coerce(&param.name, param.kind, raw)?;
                set.values.insert(param.name.clone(), value);
            }
            None if param.required => return Err(Failure::missing_parameter(&param.name)),
            None => {}
        }
    }

    if let Some(request) = &spec.request_body {
        if body.iter().all(u8::is_ascii_whitespace) {
            return Err(Failure::missing_parameter("body"));
        }
        let json: serde_json::Value = serde_json::from_slice(body)
            .map_err(|e| Failure::invalid_parameter("body", format!("malformed JSON: {e}")))?;
        set.body = Some(marshaller.decode(&request.schema, &json)?);
    }

    Ok(set)
}
