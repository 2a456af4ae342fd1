use serde_json::Value;
use std::io::{self, Read};

/// JSON piped on stdin, or `None` when stdin is a terminal or blank.
pub fn read_stdin() -> Result<Option<Value>, Box<dyn std::error::Error>> {
    if atty::is(atty::Stream::Stdin) {
        return Ok(None);
    }

    let mut raw = String::new();
    io::stdin().read_to_string(&mut raw)?;
    let body = raw.trim();
    if body.is_empty() {
        return Ok(None);
    }

    tracing::debug!(bytes = body.len(), "read input from stdin");
    let value = serde_json::from_str(body).map_err(|e| format!("Failed to parse stdin: {}", e))?;
    Ok(Some(value))
}
