//! Decoding of a frame payload into a [`Delta`].
//!
//! Wire shape, one JSON object per frame:
//!
//! ```text
//! { "result": "<text>", "is_end": false, "referenceInfos": [{"source": "...", "content": "..."}], "sessionId": "..." }
//! ```
//!
//! Every field is optional. Anything that is not a JSON object of this shape
//! is a [`ParseError`], which callers skip.

use chatwire_types::{Delta, ParseError, ReferenceItem, SessionId};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct WireEvent {
    #[serde(default)]
    result: Option<String>,
    #[serde(default)]
    is_end: Option<bool>,
    #[serde(default, rename = "referenceInfos")]
    reference_infos: Option<Vec<ReferenceItem>>,
    #[serde(default, rename = "sessionId")]
    session_id: Option<String>,
}

/// Parse one frame payload.
pub fn parse_event(payload: &str) -> Result<Delta, ParseError> {
    let event: WireEvent =
        serde_json::from_str(payload).map_err(|e| ParseError::new(e.to_string(), payload))?;

    Ok(Delta {
        text_chunk: event.result.unwrap_or_default(),
        is_end: event.is_end.unwrap_or(false),
        references: event.reference_infos.filter(|refs| !refs.is_empty()),
        session_id: event
            .session_id
            .filter(|id| !id.is_empty())
            .map(SessionId::from),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_event() {
        let delta = parse_event(
            r#"{"result":"Hi","is_end":true,"referenceInfos":[{"source":"a.pdf","content":"p1"}],"sessionId":"s-1"}"#,
        )
        .unwrap();
        assert_eq!(delta.text_chunk, "Hi");
        assert!(delta.is_end);
        assert_eq!(delta.references, Some(vec![ReferenceItem::new("a.pdf", "p1")]));
        assert_eq!(delta.session_id, Some(SessionId::new("s-1")));
    }

    #[test]
    fn missing_fields_take_defaults() {
        let delta = parse_event("{}").unwrap();
        assert_eq!(delta, Delta::default());
    }

    #[test]
    fn null_fields_take_defaults() {
        let delta =
            parse_event(r#"{"result":null,"is_end":null,"referenceInfos":null}"#).unwrap();
        assert_eq!(delta, Delta::default());
    }

    #[test]
    fn empty_reference_list_maps_to_none() {
        let delta = parse_event(r#"{"result":"x","referenceInfos":[]}"#).unwrap();
        assert!(delta.references.is_none());
    }

    #[test]
    fn unknown_fields_are_ignored() {
        let delta = parse_event(r#"{"result":"x","model":"m","usage":{"tokens":3}}"#).unwrap();
        assert_eq!(delta.text_chunk, "x");
    }

    #[test]
    fn garbage_is_a_parse_error() {
        let err = parse_event("not json at all").unwrap_err();
        assert_eq!(err.preview, "not json at all");
    }

    #[test]
    fn truncated_json_is_a_parse_error() {
        assert!(parse_event(r#"{"result":"AB"#).is_err());
    }

    #[test]
    fn non_object_json_is_a_parse_error() {
        assert!(parse_event("[DONE]").is_err());
        assert!(parse_event("42").is_err());
    }

    #[test]
    fn wrong_field_type_is_a_parse_error() {
        assert!(parse_event(r#"{"result":7}"#).is_err());
    }
}
