//! Response envelope normalization
//!
//! Endpoints answer with `{ "data": T }`, a named key (`{ "event": T }`,
//! `{ "license": T }`), list keys (`{ "events": [...] }`, `{ "items": [...] }`)
//! or a bare body. Everything is reduced to `T` here and nowhere else.

use serde_json::Value;

use super::ClientError;
use crate::domain::Resource;

/// Wrappers are peeled at most this many times, e.g. `{ "data": { "event": T } }`
const MAX_DEPTH: usize = 2;

pub fn unwrap_record<R: Resource>(body: Value) -> Result<R, ClientError> {
    let mut body = body;
    for _ in 0..MAX_DEPTH {
        let inner = match &mut body {
            // A record always carries its id; anything else is a wrapper.
            Value::Object(map) if !map.contains_key("id") => map
                .remove("data")
                .or_else(|| map.remove(R::ENVELOPE_KEY)),
            _ => None,
        };
        match inner {
            Some(inner) => body = inner,
            None => break,
        }
    }

    if !body.is_object() {
        return Err(ClientError::Envelope(format!(
            "expected a {} record, got {}",
            R::KIND,
            kind_of(&body)
        )));
    }
    Ok(serde_json::from_value(body)?)
}

pub fn unwrap_list<R: Resource>(body: Value) -> Result<Vec<R>, ClientError> {
    let plural = format!("{}s", R::ENVELOPE_KEY);
    let keys = ["data", plural.as_str(), R::KIND, "items"];

    let mut body = body;
    for _ in 0..MAX_DEPTH {
        let inner = match &mut body {
            Value::Object(map) => keys.iter().find_map(|key| map.remove(*key)),
            _ => None,
        };
        match inner {
            Some(inner) => body = inner,
            None => break,
        }
    }

    match body {
        Value::Array(_) => Ok(serde_json::from_value(body)?),
        other => Err(ClientError::Envelope(format!(
            "expected a list of {}, got {}",
            R::KIND,
            kind_of(&other)
        ))),
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
