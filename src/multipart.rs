//! The multipart incremental-delivery stream parser.
//!
//! Frames a `multipart/mixed` byte stream into batches of JSON part bodies.
//! Implemented as an `async-stream` generator so the buffer and decoder are
//! owned by the generator's stack frame and dropped the moment the stream is
//! no longer polled — no explicit cancellation token is needed.

use std::sync::LazyLock;

use futures::{Stream, StreamExt};
use regex::Regex;

use crate::transport::BodyStream;

static BOUNDARY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?i)boundary=(?:"([^"]+)"|([^;]+))"#).unwrap());

/// Extract the multipart separator (`--<token>`) from a `content-type`
/// header value, falling back to `"---"` when no boundary parameter is
/// present.
pub fn effective_separator(content_type: &str) -> String {
    match BOUNDARY_RE.captures(content_type) {
        Some(caps) => {
            let token = caps
                .get(1)
                .or_else(|| caps.get(2))
                .map(|m| m.as_str().trim())
                .unwrap_or_default();
            format!("--{token}")
        }
        None => "---".to_string(),
    }
}

/// Strip one MIME part's header block (up to and including the first blank
/// line) and return the trimmed JSON body, or `None` if the segment is
/// entirely whitespace.
fn extract_part_body(segment: &str) -> Option<String> {
    if segment.trim().is_empty() {
        return None;
    }
    let body = match segment.find("\r\n\r\n") {
        Some(idx) => &segment[idx + 4..],
        None => segment,
    };
    let trimmed = body.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Whether `buffer`'s trailing remainder marks the end of the multipart
/// stream. Tolerant of trailing CRLF/whitespace real servers may emit: any
/// remainder whose trimmed form is `"--"` or empty terminates the stream.
fn is_terminating_remainder(remainder: &str) -> bool {
    let trimmed = remainder.trim();
    trimmed == "--" || trimmed.is_empty()
}

/// Frame `body` (already known to be `multipart/mixed`) into batches of JSON
/// part-body strings, one batch per boundary-delimited flush.
///
/// Errors surface as the exact message this module produces:
/// `"Error occured while processing stream payload — <msg>"`.
pub fn part_batches(body: BodyStream, content_type: &str) -> impl Stream<Item = Result<Vec<String>, String>> {
    let separator = effective_separator(content_type);

    async_stream::stream! {
        let mut buffer = String::new();
        let mut body = body;

        loop {
            match body.next().await {
                Some(Ok(chunk)) => {
                    match std::str::from_utf8(&chunk) {
                        Ok(text) => buffer.push_str(text),
                        Err(e) => {
                            yield Err(format!("Error occured while processing stream payload — {e}"));
                            return;
                        }
                    }
                }
                Some(Err(e)) => {
                    yield Err(format!("Error occured while processing stream payload — {e}"));
                    return;
                }
                None => return,
            }

            let Some(last_idx) = buffer.rfind(&separator) else {
                continue;
            };

            let prefix = buffer[..last_idx].to_string();
            let parts: Vec<String> = prefix
                .split(separator.as_str())
                .filter_map(extract_part_body)
                .collect();

            let remainder = buffer[last_idx + separator.len()..].to_string();

            if !parts.is_empty() {
                yield Ok(parts);
            }

            buffer = if is_terminating_remainder(&remainder) {
                String::new()
            } else {
                remainder
            };
        }
    }
}
