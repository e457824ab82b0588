//! Header and body extraction for Gmail message payloads
//!
//! Extraction is a pure function over the deserialized payload so it can be
//! tested without network I/O. Body selection is priority-ordered: the first
//! `text/plain` part anywhere in the MIME tree, then the first `text/html`
//! part with markup stripped, then the top-level body. Messages with no
//! decodable text (e.g. attachment-only) yield `None` and are skipped by the
//! caller, which is a known data-loss point.

use base64::engine::general_purpose::{URL_SAFE, URL_SAFE_NO_PAD};
use base64::Engine;
use serde::Deserialize;

pub const UNKNOWN_SENDER: &str = "Unknown Sender";
pub const NO_SUBJECT: &str = "No Subject";

/// Gmail message as returned by `users/me/messages/{id}?format=full`
#[derive(Debug, Clone, Deserialize)]
pub struct GmailMessage {
    pub id: String,
    pub payload: Option<MessagePart>,
}

/// A node in the MIME tree
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessagePart {
    #[serde(default)]
    pub mime_type: String,
    #[serde(default)]
    pub headers: Vec<Header>,
    #[serde(default)]
    pub body: PartBody,
    #[serde(default)]
    pub parts: Vec<MessagePart>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Header {
    pub name: String,
    pub value: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PartBody {
    /// base64url-encoded content; absent for container and attachment parts
    #[serde(default)]
    pub data: Option<String>,
}

/// Look up a header value by case-insensitive name.
pub fn header_value<'a>(payload: &'a MessagePart, name: &str) -> Option<&'a str> {
    payload
        .headers
        .iter()
        .find(|h| h.name.eq_ignore_ascii_case(name))
        .map(|h| h.value.as_str())
}

pub fn sender(payload: &MessagePart) -> String {
    header_value(payload, "From")
        .unwrap_or(UNKNOWN_SENDER)
        .to_string()
}

pub fn subject(payload: &MessagePart) -> String {
    header_value(payload, "Subject")
        .unwrap_or(NO_SUBJECT)
        .to_string()
}

/// Extract a plain-text body from the MIME tree, or `None` if the message
/// carries no decodable text.
pub fn extract_body(payload: &MessagePart) -> Option<String> {
    if let Some(text) = find_text_part(payload, "text/plain") {
        return Some(text);
    }

    if let Some(html) = find_text_part(payload, "text/html") {
        return Some(strip_html(&html));
    }

    payload
        .body
        .data
        .as_deref()
        .and_then(decode_base64url)
        .map(|text| {
            if payload.mime_type.starts_with("text/html") {
                strip_html(&text)
            } else {
                text
            }
        })
}

/// Depth-first search for the first decodable part of the given MIME type.
fn find_text_part(part: &MessagePart, mime_type: &str) -> Option<String> {
    if part.mime_type.starts_with(mime_type) {
        if let Some(text) = part.body.data.as_deref().and_then(decode_base64url) {
            return Some(text);
        }
    }

    part.parts
        .iter()
        .find_map(|child| find_text_part(child, mime_type))
}

/// Gmail emits base64url both with and without padding.
fn decode_base64url(data: &str) -> Option<String> {
    let bytes = URL_SAFE
        .decode(data)
        .or_else(|_| URL_SAFE_NO_PAD.decode(data))
        .ok()?;
    Some(String::from_utf8_lossy(&bytes).into_owned())
}

/// Strip HTML markup, keeping the visible text.
///
/// Tag-skipping state machine with a handful of common entities; enough to
/// make an HTML-only message searchable, not a full HTML parser.
pub fn strip_html(html: &str) -> String {
    let mut out = String::with_capacity(html.len());
    let mut chars = html.chars().peekable();
    let mut in_tag = false;

    while let Some(c) = chars.next() {
        match c {
            '<' => in_tag = true,
            '>' => {
                in_tag = false;
                out.push(' ');
            }
            '&' if !in_tag => {
                let mut entity = String::new();
                while let Some(&next) = chars.peek() {
                    if next == ';' || !(next.is_ascii_alphanumeric() || next == '#') {
                        break;
                    }
                    if entity.len() >= 8 {
                        break;
                    }
                    entity.push(next);
                    chars.next();
                }
                if chars.peek() == Some(&';') {
                    chars.next();
                    out.push_str(match entity.as_str() {
                        "amp" => "&",
                        "lt" => "<",
                        "gt" => ">",
                        "quot" => "\"",
                        "#39" | "apos" => "'",
                        "nbsp" => " ",
                        _ => "",
                    });
                } else {
                    // Bare ampersand, not an entity
                    out.push('&');
                    out.push_str(&entity);
                }
            }
            _ if !in_tag => out.push(c),
            _ => {}
        }
    }

    // Collapse runs of whitespace left behind by removed tags
    out.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode(text: &str) -> Option<String> {
        Some(URL_SAFE.encode(text))
    }

    fn text_part(mime_type: &str, text: &str) -> MessagePart {
        MessagePart {
            mime_type: mime_type.to_string(),
            body: PartBody {
                data: encode(text),
            },
            ..Default::default()
        }
    }

    fn container(mime_type: &str, parts: Vec<MessagePart>) -> MessagePart {
        MessagePart {
            mime_type: mime_type.to_string(),
            parts,
            ..Default::default()
        }
    }

    #[test]
    fn test_header_defaults() {
        let payload = MessagePart::default();
        assert_eq!(sender(&payload), UNKNOWN_SENDER);
        assert_eq!(subject(&payload), NO_SUBJECT);
    }

    #[test]
    fn test_header_lookup_case_insensitive() {
        let payload = MessagePart {
            headers: vec![
                Header {
                    name: "from".to_string(),
                    value: "alice@example.com".to_string(),
                },
                Header {
                    name: "SUBJECT".to_string(),
                    value: "Hello".to_string(),
                },
            ],
            ..Default::default()
        };
        assert_eq!(sender(&payload), "alice@example.com");
        assert_eq!(subject(&payload), "Hello");
    }

    #[test]
    fn test_plain_text_preferred_over_html() {
        let payload = container(
            "multipart/alternative",
            vec![
                text_part("text/html", "<b>rich</b>"),
                text_part("text/plain", "plain body"),
            ],
        );
        assert_eq!(extract_body(&payload).unwrap(), "plain body");
    }

    #[test]
    fn test_html_fallback_is_stripped() {
        let payload = container(
            "multipart/alternative",
            vec![text_part(
                "text/html",
                "<html><body><p>Your invoice is <b>$100</b></p></body></html>",
            )],
        );
        assert_eq!(extract_body(&payload).unwrap(), "Your invoice is $100");
    }

    #[test]
    fn test_nested_multipart() {
        let payload = container(
            "multipart/mixed",
            vec![
                container("multipart/related", vec![]),
                container(
                    "multipart/alternative",
                    vec![text_part("text/plain", "deep body")],
                ),
            ],
        );
        assert_eq!(extract_body(&payload).unwrap(), "deep body");
    }

    #[test]
    fn test_top_level_body_fallback() {
        let payload = text_part("text/plain", "single-part body");
        assert_eq!(extract_body(&payload).unwrap(), "single-part body");
    }

    #[test]
    fn test_attachment_only_message_has_no_body() {
        let payload = container(
            "multipart/mixed",
            vec![MessagePart {
                mime_type: "application/pdf".to_string(),
                ..Default::default()
            }],
        );
        assert!(extract_body(&payload).is_none());
    }

    #[test]
    fn test_decode_handles_unpadded_input() {
        let padded = URL_SAFE.encode("hello world");
        let unpadded = padded.trim_end_matches('=').to_string();
        assert_eq!(decode_base64url(&padded).unwrap(), "hello world");
        assert_eq!(decode_base64url(&unpadded).unwrap(), "hello world");
    }

    #[test]
    fn test_strip_html_entities() {
        assert_eq!(
            strip_html("Tom &amp; Jerry &lt;3 &quot;cheese&quot;"),
            "Tom & Jerry <3 \"cheese\""
        );
    }

    #[test]
    fn test_strip_html_keeps_bare_ampersand() {
        assert_eq!(strip_html("AT&T rocks"), "AT&T rocks");
    }

    #[test]
    fn test_strip_html_collapses_whitespace() {
        assert_eq!(
            strip_html("<div>\n  line one\n</div>\n<div>line two</div>"),
            "line one line two"
        );
    }
}
