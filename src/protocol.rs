//! Parser for the assistant backend's line-framed data stream.
//!
//! Each frame is one line, `<code>:<json>`. The codes we consume:
//!
//! - `0:"<text>"` — text delta
//! - `9:{"toolCallId","toolName","args"}` — tool call
//! - `a:{"toolCallId","result"}` — tool result parameters
//! - `3:"<message>"` — stream error
//! - `d:{"finishReason",...}` — completion marker
//!
//! Frames arrive split across arbitrary byte chunks, so the parser buffers
//! partial lines between feeds. Unknown codes are skipped; a frame whose
//! payload fails to decode is a hard error.

use serde::Deserialize;
use serde_json::Value;

use crate::errors::{ChatError, ChatResult};
use crate::models::params::Params;

/// One discrete unit of a streamed assistant response.
#[derive(Debug, Clone, PartialEq)]
pub enum Chunk {
    TextDelta(String),
    ToolCall {
        id: String,
        name: String,
        args: Value,
    },
    ToolResult {
        id: String,
        params: Params,
    },
    Error(String),
    Done {
        finish_reason: String,
    },
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ToolCallFrame {
    tool_call_id: String,
    tool_name: String,
    #[serde(default)]
    args: Value,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ToolResultFrame {
    tool_call_id: String,
    result: Params,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DoneFrame {
    finish_reason: String,
}

/// Parse a single complete frame line. Returns None for unknown codes.
pub fn parse_frame(line: &str) -> ChatResult<Option<Chunk>> {
    let (code, payload) = line
        .split_once(':')
        .ok_or_else(|| ChatError::Protocol(format!("frame without code: {line:?}")))?;

    let chunk = match code {
        "0" => Some(Chunk::TextDelta(serde_json::from_str::<String>(payload)?)),
        "9" => {
            let frame: ToolCallFrame = serde_json::from_str(payload)?;
            Some(Chunk::ToolCall {
                id: frame.tool_call_id,
                name: frame.tool_name,
                args: frame.args,
            })
        }
        "a" => {
            let frame: ToolResultFrame = serde_json::from_str(payload)?;
            Some(Chunk::ToolResult {
                id: frame.tool_call_id,
                params: frame.result,
            })
        }
        "3" => Some(Chunk::Error(serde_json::from_str::<String>(payload)?)),
        "d" => {
            let frame: DoneFrame = serde_json::from_str(payload)?;
            Some(Chunk::Done {
                finish_reason: frame.finish_reason,
            })
        }
        _ => None,
    };
    Ok(chunk)
}

/// Stateful frame parser fed from a byte stream.
///
/// Buffers at the byte level: a multi-byte character split across feeds
/// only gets decoded once its line is complete.
#[derive(Default)]
pub struct FrameParser {
    line_buf: Vec<u8>,
}

/// Decode one complete line and parse it. Empty lines yield nothing.
fn complete_line(line: &[u8]) -> ChatResult<Option<Chunk>> {
    let line = std::str::from_utf8(line)
        .map_err(|e| ChatError::Protocol(format!("invalid utf-8 in frame: {e}")))?;
    let line = line.strip_suffix('\r').unwrap_or(line);
    if line.is_empty() {
        return Ok(None);
    }
    parse_frame(line)
}

impl FrameParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk of bytes, returning the chunks its complete lines yield.
    pub fn feed(&mut self, bytes: &[u8]) -> ChatResult<Vec<Chunk>> {
        let mut chunks = Vec::new();
        for &byte in bytes {
            if byte == b'\n' {
                let line = std::mem::take(&mut self.line_buf);
                if let Some(chunk) = complete_line(&line)? {
                    chunks.push(chunk);
                }
            } else {
                self.line_buf.push(byte);
            }
        }
        Ok(chunks)
    }

    /// Flush a trailing unterminated line once the stream has closed.
    pub fn finish(&mut self) -> ChatResult<Option<Chunk>> {
        if self.line_buf.is_empty() {
            return Ok(None);
        }
        let line = std::mem::take(&mut self.line_buf);
        complete_line(&line)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_text_delta() {
        let chunk = parse_frame("0:\"Hello\"").unwrap().unwrap();
        assert_eq!(chunk, Chunk::TextDelta("Hello".to_string()));
    }

    #[test]
    fn parses_tool_call() {
        let line = r#"9:{"toolCallId":"call-1","toolName":"transfer","args":{"amount":"100"}}"#;
        let chunk = parse_frame(line).unwrap().unwrap();
        assert_eq!(
            chunk,
            Chunk::ToolCall {
                id: "call-1".to_string(),
                name: "transfer".to_string(),
                args: json!({"amount": "100"}),
            }
        );
    }

    #[test]
    fn parses_tool_result_params() {
        let line = r#"a:{"toolCallId":"call-1","result":{"status":{"type":"string","value":"Pending"}}}"#;
        let chunk = parse_frame(line).unwrap().unwrap();
        match chunk {
            Chunk::ToolResult { id, params } => {
                assert_eq!(id, "call-1");
                assert_eq!(params.get("status").unwrap().as_text(), Some("Pending"));
            }
            other => panic!("unexpected chunk: {other:?}"),
        }
    }

    #[test]
    fn parses_error_and_done() {
        assert_eq!(
            parse_frame("3:\"backend unavailable\"").unwrap().unwrap(),
            Chunk::Error("backend unavailable".to_string())
        );
        assert_eq!(
            parse_frame(r#"d:{"finishReason":"stop"}"#).unwrap().unwrap(),
            Chunk::Done {
                finish_reason: "stop".to_string()
            }
        );
    }

    #[test]
    fn skips_unknown_codes() {
        assert_eq!(parse_frame("e:{\"whatever\":1}").unwrap(), None);
        assert_eq!(parse_frame("2:[1,2,3]").unwrap(), None);
    }

    #[test]
    fn rejects_uncoded_and_malformed_frames() {
        assert!(parse_frame("no code here").is_err());
        assert!(parse_frame("0:not json").is_err());
        assert!(parse_frame("d:{\"wrong\":true}").is_err());
    }

    #[test]
    fn feed_handles_split_frames() {
        let mut parser = FrameParser::new();
        assert!(parser.feed(b"0:\"Hel").unwrap().is_empty());
        let chunks = parser.feed(b"lo\"\n0:\" world\"\n").unwrap();
        assert_eq!(
            chunks,
            vec![
                Chunk::TextDelta("Hello".to_string()),
                Chunk::TextDelta(" world".to_string()),
            ]
        );
    }

    #[test]
    fn feed_handles_codepoint_split_across_chunks() {
        // "é" is 0xC3 0xA9; the boundary falls between its two bytes.
        let mut parser = FrameParser::new();
        assert!(parser.feed(b"0:\"h\xC3").unwrap().is_empty());
        let chunks = parser.feed(b"\xA9llo\"\n").unwrap();
        assert_eq!(chunks, vec![Chunk::TextDelta("h\u{e9}llo".to_string())]);
    }

    #[test]
    fn feed_rejects_invalid_utf8() {
        let mut parser = FrameParser::new();
        let err = parser.feed(b"0:\"\xff\"\n").unwrap_err();
        assert!(matches!(err, ChatError::Protocol(_)));
    }

    #[test]
    fn feed_handles_crlf_and_blank_lines() {
        let mut parser = FrameParser::new();
        let chunks = parser.feed(b"0:\"a\"\r\n\r\n0:\"b\"\n").unwrap();
        assert_eq!(
            chunks,
            vec![
                Chunk::TextDelta("a".to_string()),
                Chunk::TextDelta("b".to_string()),
            ]
        );
    }

    #[test]
    fn finish_flushes_unterminated_line() {
        let mut parser = FrameParser::new();
        assert!(parser.feed(b"d:{\"finishReason\":\"stop\"}").unwrap().is_empty());
        let chunk = parser.finish().unwrap().unwrap();
        assert_eq!(
            chunk,
            Chunk::Done {
                finish_reason: "stop".to_string()
            }
        );
        assert!(parser.finish().unwrap().is_none());
    }
}
