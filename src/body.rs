//! Typed reads out of JSON request bodies.
//!
//! # Responsibilities
//! - Pull optional typed fields out of a JSON object
//! - Report wrong types as `PropertyValueTypeError`
//! - Report keys nobody asked for as `PropertyUnknown`
//!
//! # Design Decisions
//! - Errors are collected, not short-circuited, so a client sees every
//!   problem with the body in one response
//! - `null` is a type error for typed reads; raw reads pass it through

use serde_json::{Map, Value};

use crate::error::GatewayError;

/// Reader over one JSON object.
#[derive(Debug)]
pub struct ObjectReader<'a> {
    map: &'a Map<String, Value>,
    prefix: String,
    requested: Vec<&'static str>,
    errors: Vec<GatewayError>,
}

impl<'a> ObjectReader<'a> {
    /// Reader over a whole request body.
    pub fn body(value: &'a Value) -> Result<Self, GatewayError> {
        match value {
            Value::Object(map) => Ok(Self::over(map, "")),
            Value::Null => Err(GatewayError::MalformedBody("request body is empty".into())),
            _ => Err(GatewayError::MalformedBody("request body is not a JSON object".into())),
        }
    }

    /// Reader over a nested object found at `path`.
    pub fn nested(value: &'a Value, path: &str) -> Result<Self, GatewayError> {
        match value {
            Value::Object(map) => Ok(Self::over(map, path)),
            other => Err(GatewayError::PropertyValueTypeError {
                value: other.to_string(),
                path: path.to_string(),
            }),
        }
    }

    fn over(map: &'a Map<String, Value>, prefix: &str) -> Self {
        Self {
            map,
            prefix: prefix.to_string(),
            requested: Vec::new(),
            errors: Vec::new(),
        }
    }

    /// Full property path of `key`.
    pub fn path(&self, key: &str) -> String {
        if self.prefix.is_empty() {
            key.to_string()
        } else {
            format!("{}/{}", self.prefix, key)
        }
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Raw value at `key`, `null` included.
    pub fn value(&mut self, key: &'static str) -> Option<&'a Value> {
        self.requested.push(key);
        self.map.get(key)
    }

    fn typed<T>(&mut self, key: &'static str, read: impl FnOnce(&'a Value) -> Option<T>) -> Option<T> {
        let value = self.value(key)?;
        match read(value) {
            Some(v) => Some(v),
            None => {
                let path = self.path(key);
                self.errors.push(GatewayError::PropertyValueTypeError {
                    value: value.to_string(),
                    path,
                });
                None
            }
        }
    }

    pub fn string(&mut self, key: &'static str) -> Option<String> {
        self.typed(key, |v| v.as_str().map(str::to_string))
    }

    pub fn bool(&mut self, key: &'static str) -> Option<bool> {
        self.typed(key, Value::as_bool)
    }

    pub fn u64(&mut self, key: &'static str) -> Option<u64> {
        self.typed(key, Value::as_u64)
    }

    pub fn u32(&mut self, key: &'static str) -> Option<u32> {
        self.typed(key, |v| v.as_u64().and_then(|n| u32::try_from(n).ok()))
    }

    /// Any JSON number, integers included.
    pub fn f64(&mut self, key: &'static str) -> Option<f64> {
        self.typed(key, Value::as_f64)
    }

    pub fn strings(&mut self, key: &'static str) -> Option<Vec<String>> {
        self.typed(key, |v| {
            v.as_array()?
                .iter()
                .map(|item| item.as_str().map(str::to_string))
                .collect()
        })
    }

    /// Finish reading; every key not requested is unknown.
    pub fn finish(mut self) -> Result<(), Vec<GatewayError>> {
        for key in self.map.keys() {
            if !self.requested.contains(&key.as_str()) {
                let path = self.path(key);
                self.errors.push(GatewayError::PropertyUnknown(path));
            }
        }
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(self.errors)
        }
    }
}

/// First of a batch of body errors.
pub fn first(errors: Vec<GatewayError>) -> GatewayError {
    errors
        .into_iter()
        .next()
        .unwrap_or_else(|| GatewayError::InternalError("empty error list".into()))
}
