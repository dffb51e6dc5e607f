//! JSON payload codec for the `messages.json` column.

use thiserror::Error;

use crate::models::Message;

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("message payload is empty")]
    Empty,
    #[error("malformed message payload: {0}")]
    Json(#[from] serde_json::Error),
}

pub fn encode_message(message: &Message) -> Result<String, CodecError> {
    Ok(serde_json::to_string(message)?)
}

/// Decode a stored payload. Optional fields that are missing stay `None`
/// and a missing `type` decodes as `TEXT`.
pub fn decode_message(payload: &str) -> Result<Message, CodecError> {
    if payload.trim().is_empty() {
        return Err(CodecError::Empty);
    }
    Ok(serde_json::from_str(payload)?)
}
