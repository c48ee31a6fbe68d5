use crate::envelope::RequestEnvelope;
use crate::envelope::TypeTag;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::fmt;
use std::hash::Hash;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("unknown message type {0}")]
    UnknownType(TypeTag),
    #[error("argument {position} of {kind} is missing")]
    MissingArgument { kind: String, position: usize },
    #[error("argument {position} of {kind} is invalid: {message}")]
    InvalidArgument {
        kind: String,
        position: usize,
        message: String,
    },
}

/// A closed set of messages one peer accepts from the other.
///
/// Implementors are enums with one variant per message kind; decoding and
/// encoding are exhaustive matches so adding a kind is a compile-time change.
pub trait Message: Sized + Send + 'static {
    /// Fieldless mirror of the message enum, used as the routing key.
    type Kind: Copy + Eq + Hash + fmt::Debug + fmt::Display + Send + Sync + 'static;

    fn kind(&self) -> Self::Kind;

    /// Resolves a wire tag (name or numeric discriminant) to a kind.
    fn kind_from_tag(tag: &TypeTag) -> Result<Self::Kind, DecodeError>;

    /// The tag written on the wire for `kind`.
    fn tag(kind: Self::Kind) -> TypeTag;

    fn decode(kind: Self::Kind, args: Vec<Value>) -> Result<Self, DecodeError>;

    fn into_args(self) -> Result<Vec<Value>, serde_json::Error>;

    fn into_request(self, id: Option<u64>) -> Result<RequestEnvelope, serde_json::Error> {
        let kind = Self::tag(self.kind());
        Ok(RequestEnvelope {
            id,
            kind,
            args: self.into_args()?,
        })
    }
}

/// Positional argument reader used by [`Message::decode`] implementations.
pub struct Args {
    kind: String,
    values: std::vec::IntoIter<Value>,
    position: usize,
}

impl Args {
    pub fn new(kind: impl fmt::Display, values: Vec<Value>) -> Self {
        Self {
            kind: kind.to_string(),
            values: values.into_iter(),
            position: 0,
        }
    }

    /// Reads the next argument. Missing arguments decode from `null`, so
    /// `Option<T>` parameters may be omitted by the sender.
    pub fn next<T: DeserializeOwned>(&mut self) -> Result<T, DecodeError> {
        let position = self.position;
        self.position += 1;
        match self.values.next() {
            Some(value) => serde_json::from_value(value).map_err(|err| {
                DecodeError::InvalidArgument {
                    kind: self.kind.clone(),
                    position,
                    message: err.to_string(),
                }
            }),
            None => serde_json::from_value(Value::Null).map_err(|_| {
                DecodeError::MissingArgument {
                    kind: self.kind.clone(),
                    position,
                }
            }),
        }
    }
}

/// Serializes a single message argument.
pub fn arg<T: Serialize>(value: &T) -> Result<Value, serde_json::Error> {
    serde_json::to_value(value)
}
