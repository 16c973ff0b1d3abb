//! Line-delimited JSON framing for the engine protocol.
//!
//! A request is exactly one compact JSON document followed by `\n`. A
//! response is a single JSON document, optionally surrounded by whitespace.

use crate::error::PipelineError;
use serde::Serialize;
use serde_json::Value;

/// Frame a value as one newline-terminated JSON line.
pub fn encode_line<T: Serialize + ?Sized>(value: &T) -> serde_json::Result<Vec<u8>> {
    // Compact serde_json output never contains a raw newline.
    let mut line = serde_json::to_vec(value)?;
    line.push(b'\n');
    Ok(line)
}

/// Decode the engine's output stream into a JSON document.
pub fn decode_document(raw: &[u8]) -> Result<Value, PipelineError> {
    let text = std::str::from_utf8(raw).map_err(|e| {
        PipelineError::MalformedResponse(format!("engine output is not UTF-8: {}", e))
    })?;

    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(PipelineError::MalformedResponse(
            "engine produced no output".to_string(),
        ));
    }

    serde_json::from_str(trimmed).map_err(|e| PipelineError::MalformedResponse(e.to_string()))
}
