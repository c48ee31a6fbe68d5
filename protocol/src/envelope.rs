use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;
use serde_with::skip_serializing_none;
use std::fmt;

/// Message type as written on the wire. Peers may use either the numeric
/// discriminant or the snake_case name of a message kind.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TypeTag {
    Number(u64),
    Name(String),
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeTag::Number(value) => write!(f, "#{value}"),
            TypeTag::Name(name) => f.write_str(name),
        }
    }
}

impl From<&str> for TypeTag {
    fn from(value: &str) -> Self {
        TypeTag::Name(value.to_string())
    }
}

/// A call from one peer to the other. Without an `id` it is fire-and-forget.
#[skip_serializing_none]
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RequestEnvelope {
    pub id: Option<u64>,
    #[serde(rename = "type")]
    pub kind: TypeTag,
    pub args: Vec<Value>,
}

impl RequestEnvelope {
    pub fn expects_reply(&self) -> bool {
        self.id.is_some()
    }
}

/// Reply to a [`RequestEnvelope`] that carried an id.
///
/// `error` wins over `result`; when both are absent the call succeeded
/// without a value.
#[skip_serializing_none]
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ResponseEnvelope {
    pub id: u64,
    pub result: Option<Value>,
    pub error: Option<String>,
}

impl ResponseEnvelope {
    pub fn ok(id: u64, result: Value) -> Self {
        let result = if result.is_null() { None } else { Some(result) };
        Self {
            id,
            result,
            error: None,
        }
    }

    pub fn err(id: u64, error: impl Into<String>) -> Self {
        Self {
            id,
            result: None,
            error: Some(error.into()),
        }
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }

    /// Collapses the envelope into the caller-facing outcome. A void success
    /// is reported as `Value::Null`.
    pub fn into_result(self) -> Result<Value, String> {
        match self.error {
            Some(error) => Err(error),
            None => Ok(self.result.unwrap_or(Value::Null)),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Envelope {
    Request(RequestEnvelope),
    Response(ResponseEnvelope),
}

impl Envelope {
    pub fn to_text(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

impl From<RequestEnvelope> for Envelope {
    fn from(value: RequestEnvelope) -> Self {
        Envelope::Request(value)
    }
}

impl From<ResponseEnvelope> for Envelope {
    fn from(value: ResponseEnvelope) -> Self {
        Envelope::Response(value)
    }
}
