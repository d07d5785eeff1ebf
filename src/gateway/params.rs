//! Request parameter parsing.
//!
//! Arguments are read from the query string and from a JSON object body;
//! body values win when both carry the same name. Each route declares the
//! arguments it accepts as [`Arg`] constants and calls
//! [`RequestArgs::validate`] before touching the engine:
//!
//! 1. every required argument must be present (JSON `null` counts as absent)
//! 2. no argument outside the declared set may appear
//!
//! Values are coerced loosely, so `Replicas=3` in a query string and
//! `"Replicas": 3` in a body are equivalent.

use std::collections::HashMap;

use axum::body::Bytes;
use axum::extract::{FromRequest, Query, Request};
use serde_json::{Map, Value};

use crate::config::helpers::parse_bool;
use crate::error::{GatewayError, GatewayResult};

/// An argument a route accepts.
#[derive(Debug, Clone, Copy)]
pub struct Arg {
    pub name: &'static str,
    pub help: &'static str,
    pub required: bool,
}

impl Arg {
    pub const fn required(name: &'static str, help: &'static str) -> Self {
        Self {
            name,
            help,
            required: true,
        }
    }

    pub const fn optional(name: &'static str, help: &'static str) -> Self {
        Self {
            name,
            help,
            required: false,
        }
    }

    fn missing(&self) -> GatewayError {
        GatewayError::MissingField {
            field: self.name.to_string(),
            help: self.help,
        }
    }
}

fn invalid(field: &str, reason: impl Into<String>) -> GatewayError {
    GatewayError::InvalidField {
        field: field.to_string(),
        reason: reason.into(),
    }
}

/// Merged query and body arguments of one request.
#[derive(Debug, Default)]
pub struct RequestArgs {
    values: Map<String, Value>,
}

impl RequestArgs {
    pub fn from_parts(query: HashMap<String, String>, body: &[u8]) -> GatewayResult<Self> {
        let mut values: Map<String, Value> = query
            .into_iter()
            .map(|(k, v)| (k, Value::String(v)))
            .collect();

        if !body.iter().all(u8::is_ascii_whitespace) {
            let parsed: Value = serde_json::from_slice(body)
                .map_err(|e| invalid("body", format!("not valid JSON: {e}")))?;
            match parsed {
                Value::Object(map) => values.extend(map),
                Value::Null => {}
                _ => return Err(invalid("body", "must be a JSON object")),
            }
        }

        Ok(Self { values })
    }

    /// Check required arguments are present, then reject undeclared ones.
    pub fn validate(&self, accepted: &[Arg]) -> GatewayResult<()> {
        if let Some(arg) = accepted
            .iter()
            .find(|arg| arg.required && self.get(arg.name).is_none())
        {
            return Err(arg.missing());
        }

        let unknown: Vec<String> = self
            .values
            .keys()
            .filter(|key| !accepted.iter().any(|arg| arg.name == key.as_str()))
            .cloned()
            .collect();
        if !unknown.is_empty() {
            return Err(GatewayError::UnknownArguments(unknown));
        }

        Ok(())
    }

    fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name).filter(|v| !v.is_null())
    }

    pub fn string(&self, arg: &Arg) -> GatewayResult<String> {
        self.opt_string(arg)?.ok_or_else(|| arg.missing())
    }

    pub fn opt_string(&self, arg: &Arg) -> GatewayResult<Option<String>> {
        match self.get(arg.name) {
            None => Ok(None),
            Some(Value::String(s)) => Ok(Some(s.clone())),
            Some(v @ (Value::Number(_) | Value::Bool(_))) => Ok(Some(v.to_string())),
            Some(_) => Err(invalid(arg.name, "must be a string")),
        }
    }

    pub fn integer(&self, arg: &Arg) -> GatewayResult<i64> {
        integer_value(arg.name, self.get(arg.name))?.ok_or_else(|| arg.missing())
    }

    /// A non-negative integer.
    pub fn count(&self, arg: &Arg) -> GatewayResult<u64> {
        let value = self.integer(arg)?;
        u64::try_from(value).map_err(|_| invalid(arg.name, "must not be negative"))
    }

    pub fn opt_bool(&self, arg: &Arg) -> GatewayResult<Option<bool>> {
        match self.get(arg.name) {
            None => Ok(None),
            Some(Value::Bool(b)) => Ok(Some(*b)),
            Some(Value::String(s)) => parse_bool(s)
                .map(Some)
                .ok_or_else(|| invalid(arg.name, format!("'{s}' is not a boolean"))),
            Some(Value::Number(n)) => match n.as_i64() {
                Some(0) => Ok(Some(false)),
                Some(1) => Ok(Some(true)),
                _ => Err(invalid(arg.name, format!("{n} is not a boolean"))),
            },
            Some(_) => Err(invalid(arg.name, "must be a boolean")),
        }
    }

    pub fn object(&self, arg: &Arg) -> GatewayResult<Map<String, Value>> {
        self.opt_object(arg)?.ok_or_else(|| arg.missing())
    }

    /// A JSON object. In a query string it arrives as JSON text.
    pub fn opt_object(&self, arg: &Arg) -> GatewayResult<Option<Map<String, Value>>> {
        match self.get(arg.name) {
            None => Ok(None),
            Some(Value::Object(map)) => Ok(Some(map.clone())),
            Some(Value::String(s)) => match serde_json::from_str(s) {
                Ok(Value::Object(map)) => Ok(Some(map)),
                _ => Err(invalid(arg.name, "must be a JSON object")),
            },
            Some(_) => Err(invalid(arg.name, "must be a JSON object")),
        }
    }

    /// A label map. Scalar values are converted to strings.
    pub fn opt_labels(&self, arg: &Arg) -> GatewayResult<Option<HashMap<String, String>>> {
        let Some(map) = self.opt_object(arg)? else {
            return Ok(None);
        };
        map.into_iter()
            .map(|(key, value)| match value {
                Value::String(s) => Ok((key, s)),
                v @ (Value::Number(_) | Value::Bool(_)) => Ok((key, v.to_string())),
                _ => Err(invalid(
                    &format!("{}.{key}", arg.name),
                    "label values must be strings",
                )),
            })
            .collect::<GatewayResult<HashMap<_, _>>>()
            .map(Some)
    }
}

/// Coerce a JSON number or numeric string to an integer.
pub fn integer_value(field: &str, value: Option<&Value>) -> GatewayResult<Option<i64>> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => n
            .as_i64()
            .map(Some)
            .ok_or_else(|| invalid(field, format!("{n} is not an integer"))),
        Some(Value::String(s)) => s
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| invalid(field, format!("'{s}' is not an integer"))),
        Some(_) => Err(invalid(field, "must be an integer")),
    }
}

impl<S> FromRequest<S> for RequestArgs
where
    S: Send + Sync,
{
    type Rejection = GatewayError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Query(query) = Query::<HashMap<String, String>>::try_from_uri(req.uri())
            .map_err(|e| invalid("query", e.body_text()))?;
        let body = Bytes::from_request(req, state)
            .await
            .map_err(|e| invalid("body", e.body_text()))?;
        Self::from_parts(query, &body)
    }
}
