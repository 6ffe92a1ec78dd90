//! Newline-delimited JSON framing.
//!
//! A frame is a single JSON document followed by exactly one `\n`. Readers
//! buffer bytes until a full line is available and hand each line to
//! [`decode_line`], or to [`decode_bytes`] when the line may not be UTF-8.

use serde::de::DeserializeOwned;
use serde::Serialize;

pub const DELIMITER: char = '\n';

/// Serializes a message into one wire line, delimiter included.
pub fn encode_line<T: Serialize>(message: &T) -> Result<String, serde_json::Error> {
    let mut line = serde_json::to_string(message)?;
    line.push(DELIMITER);
    Ok(line)
}

/// Parses one wire line. A trailing `\n` or `\r\n` is tolerated.
pub fn decode_line<T: DeserializeOwned>(line: &str) -> Result<T, serde_json::Error> {
    serde_json::from_str(line.trim_end_matches(&['\r', '\n'][..]))
}

/// Parses one raw wire line. Invalid UTF-8 is reported as a JSON error, so
/// a reader can skip the line like any other malformed frame.
pub fn decode_bytes<T: DeserializeOwned>(line: &[u8]) -> Result<T, serde_json::Error> {
    let mut end = line.len();
    while end > 0 && matches!(line[end - 1], b'\r' | b'\n') {
        end -= 1;
    }
    serde_json::from_slice(&line[..end])
}
