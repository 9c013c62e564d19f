//! Encoding outbound frames and classifying inbound ones.
//!
//! Inbound classification follows the protocol rule rather than type
//! probing: a frame whose object carries a `method` member is a
//! server-initiated request, anything else is a response. The two-step
//! decode (raw value first, typed second) keeps the classification cheap and
//! the error for malformed frames uniform.

use crate::error::{Error, Result};
use crate::types::{Inbound, Request, Response};
use serde::Serialize;

/// Encode any serializable message to a JSON text frame.
pub fn encode<T: Serialize>(msg: &T) -> Result<String> {
    serde_json::to_string(msg).map_err(|e| Error::Serialization(e.to_string()))
}

/// Classify and decode one inbound text frame.
pub fn decode_inbound(text: &str) -> Result<Inbound> {
    let value: serde_json::Value =
        serde_json::from_str(text).map_err(|e| Error::Parse(e.to_string()))?;

    if !value.is_object() {
        return Err(Error::Parse("expected a JSON object".to_string()));
    }

    if value.get("method").is_some() {
        serde_json::from_value::<Request>(value)
            .map(Inbound::Request)
            .map_err(|e| Error::Parse(e.to_string()))
    } else {
        serde_json::from_value::<Response>(value)
            .map(Inbound::Response)
            .map_err(|e| Error::Parse(e.to_string()))
    }
}

/// Decode a frame known to be a request.
pub fn decode_request(text: &str) -> Result<Request> {
    serde_json::from_str(text).map_err(|e| Error::Parse(e.to_string()))
}

/// Decode a frame known to be a response.
pub fn decode_response(text: &str) -> Result<Response> {
    serde_json::from_str(text).map_err(|e| Error::Parse(e.to_string()))
}
