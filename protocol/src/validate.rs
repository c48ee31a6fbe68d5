//! Decoding and validation of untrusted socket frames.
//!
//! Everything arriving on the socket passes through [`parse_message`] before
//! it can reach dispatch. A frame that fails here is reported and dropped.

use crate::envelope::Envelope;
use crate::envelope::RequestEnvelope;
use crate::envelope::ResponseEnvelope;
use crate::envelope::TypeTag;
use serde_json::Map;
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FrameError {
    #[error("frame is not valid UTF-8: {0}")]
    InvalidUtf8(String),
    #[error("frame is not valid JSON: {0}")]
    InvalidJson(String),
    #[error("message is incorrectly formatted. {}", .0.join(" "))]
    Malformed(Vec<String>),
}

/// Parses raw frame bytes into a classified envelope.
pub fn parse_message(raw: &[u8]) -> Result<Envelope, FrameError> {
    let value = decode_frame(raw)?;
    validate_message(value)
}

pub fn decode_frame(raw: &[u8]) -> Result<Value, FrameError> {
    let text = std::str::from_utf8(raw).map_err(|err| FrameError::InvalidUtf8(err.to_string()))?;
    serde_json::from_str(text).map_err(|err| FrameError::InvalidJson(err.to_string()))
}

/// Classifies a decoded value as a request (it has a `type`) or a response.
///
/// All problems found in one frame are reported together.
pub fn validate_message(value: Value) -> Result<Envelope, FrameError> {
    let mut map = match value {
        Value::Object(map) => map,
        other => {
            return Err(FrameError::Malformed(vec![format!(
                "the data is not an object (it is {}).",
                json_type_name(&other)
            )]));
        }
    };

    let mut problems = Vec::new();
    let id = take_id(&mut map, &mut problems);
    if !problems.is_empty() {
        return Err(FrameError::Malformed(problems));
    }

    let envelope = match map.remove("type") {
        Some(kind) => validate_request(id, kind, &mut map, &mut problems),
        None => validate_response(id, &mut map, &mut problems),
    };

    match envelope {
        Some(envelope) if problems.is_empty() => Ok(envelope),
        _ => Err(FrameError::Malformed(problems)),
    }
}

fn take_id(map: &mut Map<String, Value>, problems: &mut Vec<String>) -> Option<u64> {
    match map.remove("id") {
        None | Some(Value::Null) => None,
        Some(Value::Number(number)) => {
            let id = number.as_u64();
            if id.is_none() {
                problems.push(format!(
                    "\"id\" is not a non-negative integer (it is {number})."
                ));
            }
            id
        }
        Some(other) => {
            problems.push(format!(
                "\"id\" is not of type number (it is {}).",
                json_type_name(&other)
            ));
            None
        }
    }
}

fn validate_request(
    id: Option<u64>,
    kind: Value,
    map: &mut Map<String, Value>,
    problems: &mut Vec<String>,
) -> Option<Envelope> {
    let kind = match kind {
        Value::String(name) => Some(TypeTag::Name(name)),
        Value::Number(number) => match number.as_u64() {
            Some(value) => Some(TypeTag::Number(value)),
            None => {
                problems.push(format!(
                    "\"type\" is not a non-negative integer (it is {number})."
                ));
                None
            }
        },
        other => {
            problems.push(format!(
                "\"type\" is not of type number or string (it is {}).",
                json_type_name(&other)
            ));
            None
        }
    };
    let args = match map.remove("args") {
        Some(Value::Array(args)) => Some(args),
        Some(other) => {
            problems.push(format!(
                "\"args\" is not an array (it is {}).",
                json_type_name(&other)
            ));
            None
        }
        None => {
            problems.push("\"args\" is missing.".to_string());
            None
        }
    };
    Some(Envelope::Request(RequestEnvelope {
        id,
        kind: kind?,
        args: args?,
    }))
}

fn validate_response(
    id: Option<u64>,
    map: &mut Map<String, Value>,
    problems: &mut Vec<String>,
) -> Option<Envelope> {
    let Some(id) = id else {
        problems.push("a response must carry an \"id\".".to_string());
        return None;
    };
    let error = match map.remove("error") {
        None | Some(Value::Null) => None,
        Some(Value::String(error)) => Some(error),
        Some(other) => Some(other.to_string()),
    };
    let result = map.remove("result").filter(|value| !value.is_null());
    Some(Envelope::Response(ResponseEnvelope { id, result, error }))
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
