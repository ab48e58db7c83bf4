//! Request parameter extraction
//!
//! Parameters arrive either as a query string or as a JSON body. Both are
//! normalized to a JSON value whose leaves are strings before being handed to
//! the template as the caller's parameter type.

use crate::{Error, Result};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

/// Stringified request parameters
#[derive(Debug, Clone, PartialEq)]
pub struct Params(Value);

impl Params {
    /// Parameters from a raw query string (without the leading `?`)
    pub fn from_query(query: Option<&str>) -> Self {
        Params(query_params(query))
    }

    /// Parameters from a JSON request body
    pub fn from_body(body: &[u8]) -> Result<Self> {
        Ok(Params(stringify_props(body_params(body)?)))
    }

    pub fn as_value(&self) -> &Value {
        &self.0
    }

    /// Look up a top-level parameter as a string
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(Value::as_str)
    }

    /// Deserialize into the template's parameter type
    pub fn into_typed<P: DeserializeOwned>(self) -> Result<P> {
        serde_json::from_value(self.0).map_err(|e| Error::InvalidParams(e.to_string()))
    }
}

/// Decode a query string into a JSON object of strings. A repeated key keeps
/// its last value.
pub fn query_params(query: Option<&str>) -> Value {
    let mut map = Map::new();
    if let Some(query) = query {
        for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
            map.insert(key.into_owned(), Value::String(value.into_owned()));
        }
    }
    Value::Object(map)
}

/// Parse a JSON body. An empty body is an empty object.
pub fn body_params(body: &[u8]) -> Result<Value> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(Value::Object(Map::new()));
    }
    Ok(serde_json::from_slice(body)?)
}

/// Convert every scalar leaf to its string form, keeping objects and arrays.
pub fn stringify_props(value: Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(k, v)| (k, stringify_props(v)))
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.into_iter().map(stringify_props).collect()),
        Value::String(s) => Value::String(s),
        Value::Null => Value::String("null".to_string()),
        Value::Bool(b) => Value::String(b.to_string()),
        Value::Number(n) => Value::String(n.to_string()),
    }
}
