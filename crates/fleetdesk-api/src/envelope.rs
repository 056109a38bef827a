// Envelope normalization
//
// Every backend wraps its responses as `{ code, message?, msg?, data }`.
// The envelope normalizer decides success vs. business failure and, on
// success, runs the backend's payload normalizer over `data`.

use std::fmt;

use serde_json::{Map, Value};
use tracing::trace;

use crate::payload::PayloadNormalizer;

/// Envelope codes that denote success.
pub const SUCCESS_CODES: [i64; 2] = [0, 200];

/// Message used when a failed envelope carries neither `msg` nor `message`.
pub const DEFAULT_FAILURE_MESSAGE: &str = "request failed";

/// The `code` of a failed envelope. Backends mostly send integers, but
/// some send opaque strings such as `"E001"`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BusinessCode {
    Numeric(i64),
    Other(String),
}

impl BusinessCode {
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Numeric(code) => Some(*code),
            Self::Other(_) => None,
        }
    }
}

impl From<i64> for BusinessCode {
    fn from(code: i64) -> Self {
        Self::Numeric(code)
    }
}

impl PartialEq<i64> for BusinessCode {
    fn eq(&self, other: &i64) -> bool {
        self.as_i64() == Some(*other)
    }
}

impl fmt::Display for BusinessCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Numeric(code) => write!(f, "{code}"),
            Self::Other(raw) => f.write_str(raw),
        }
    }
}

/// Result of inspecting one response body.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// Canonical value handed to the caller.
    Success(Value),
    /// Non-success envelope code.
    Failure { code: BusinessCode, message: String },
}

#[derive(Debug, Clone)]
pub struct EnvelopeNormalizer {
    payload: PayloadNormalizer,
    flatten_object_payload: bool,
    success_codes: Vec<i64>,
}

impl Default for EnvelopeNormalizer {
    fn default() -> Self {
        Self::new(PayloadNormalizer::identity(), true)
    }
}

impl EnvelopeNormalizer {
    pub fn new(payload: PayloadNormalizer, flatten_object_payload: bool) -> Self {
        Self {
            payload,
            flatten_object_payload,
            success_codes: SUCCESS_CODES.to_vec(),
        }
    }

    /// Replace the set of envelope codes treated as success.
    pub fn with_success_codes(mut self, codes: impl IntoIterator<Item = i64>) -> Self {
        self.success_codes = codes.into_iter().collect();
        self
    }

    /// Inspect a transport-successful body. First match wins:
    /// no code → pass through, success code → normalized payload,
    /// anything else → business failure.
    pub fn normalize(&self, body: Value) -> Outcome {
        let Some(code) = envelope_code(&body) else {
            trace!("no envelope code, passing body through");
            return Outcome::Success(body);
        };
        let Value::Object(mut outer) = body else {
            return Outcome::Success(body);
        };

        let succeeded = code
            .as_i64()
            .is_some_and(|code| self.success_codes.contains(&code));
        if !succeeded {
            return Outcome::Failure {
                code,
                message: failure_message(&outer),
            };
        }

        let data = outer.remove("data").unwrap_or(Value::Null);
        let payload = self.payload.normalize(data);
        Outcome::Success(self.shape(outer, payload))
    }

    /// With flattening, an object payload is merged over the envelope so
    /// fields are readable both at the top level and under `data`.
    fn shape(&self, mut outer: Map<String, Value>, payload: Value) -> Value {
        match payload {
            Value::Object(fields) if self.flatten_object_payload => {
                outer.insert("data".into(), Value::Object(fields.clone()));
                outer.extend(fields);
                Value::Object(outer)
            }
            other => other,
        }
    }
}

/// The envelope's `code`, or `None` when the body has no `code` field.
/// Integers and integer strings are numeric; any other value is kept as
/// its raw text.
fn envelope_code(body: &Value) -> Option<BusinessCode> {
    let code = match body.as_object()?.get("code")? {
        Value::Number(n) => n
            .as_i64()
            .map_or_else(|| BusinessCode::Other(n.to_string()), BusinessCode::Numeric),
        Value::String(s) => s
            .trim()
            .parse()
            .map_or_else(|_| BusinessCode::Other(s.clone()), BusinessCode::Numeric),
        other => BusinessCode::Other(other.to_string()),
    };
    Some(code)
}

fn failure_message(outer: &Map<String, Value>) -> String {
    ["msg", "message"]
        .iter()
        .find_map(|key| outer.get(*key).and_then(Value::as_str))
        .unwrap_or(DEFAULT_FAILURE_MESSAGE)
        .to_owned()
}
