use thiserror::Error;

/// Why a raw change notification could not be turned into a typed one.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("Payload is not an object with a string \"type\" field")]
    MissingType,

    #[error("Unknown notification type: {0}")]
    UnknownType(String),

    #[error("Missing \"data\" for {0}")]
    MissingData(String),

    #[error("Invalid {kind} payload: {reason}")]
    InvalidPayload { kind: String, reason: String },
}
