//! The `requests`-flavored HTTP built-in: a single `.get(url)` verb that
//! parses its response body as JSON when it can, and otherwise falls back
//! to a hash describing the raw response.

use std::cell::RefCell;
use std::rc::Rc;

use crate::error::LoxError;

use super::value::Value;

/// Marker value returned by the `requests` built-in. It carries no state of
/// its own — every call hits the network directly — but exists as a
/// distinct runtime type so `type(requests)` reports something sensible.
#[derive(Debug, Clone, Copy)]
pub struct HttpClient;

impl HttpClient {
    pub fn get(&self, url: &str) -> Result<Value, LoxError> {
        let response = ureq::get(url)
            .call()
            .map_err(|e| LoxError::runtime(format!("HTTP request to '{url}' failed: {e}")))?;
        let status = response.status();
        let headers: Vec<(Value, Value)> = response
            .headers_names()
            .into_iter()
            .filter_map(|name| {
                let value = response.header(&name)?.to_string();
                Some((Value::string(name), Value::string(value)))
            })
            .collect();
        let body = response
            .into_string()
            .map_err(|e| LoxError::runtime(format!("failed to read response body: {e}")))?;

        match serde_json::from_str::<serde_json::Value>(&body) {
            Ok(json) => Ok(from_json(&json)),
            Err(_) => {
                let fields = vec![
                    (Value::string("status"), Value::Integer(status as i64)),
                    (Value::string("headers"), hash_value(headers)),
                    (Value::string("text"), Value::string(body)),
                ];
                Ok(hash_value(fields))
            }
        }
    }
}

fn hash_value(entries: Vec<(Value, Value)>) -> Value {
    Value::Hash(Rc::new(RefCell::new(entries)))
}

fn from_json(json: &serde_json::Value) -> Value {
    match json {
        serde_json::Value::Null => Value::Nil,
        serde_json::Value::Bool(b) => Value::Bool(*b),
        serde_json::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Value::Integer(i)
            } else {
                Value::Float(n.as_f64().unwrap_or(0.0))
            }
        }
        serde_json::Value::String(s) => Value::string(s.clone()),
        serde_json::Value::Array(items) => Value::array(items.iter().map(from_json).collect()),
        serde_json::Value::Object(map) => {
            let entries = map
                .iter()
                .map(|(k, v)| (Value::string(k.clone()), from_json(v)))
                .collect();
            hash_value(entries)
        }
    }
}
