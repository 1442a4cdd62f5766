//! JSON extraction and repair for model output.
//!
//! Models wrap JSON in prose or markdown, double-encode it as a string, or
//! emit keys with stray quotes (`"\"route\""`). None of that is trusted: the
//! reply is reduced to a [`ModelReply`] and each stage validates the fields it
//! needs.

use serde_json::{Map, Value};

pub type JsonObject = Map<String, Value>;

/// Result of parsing one model reply.
#[derive(Debug, Clone, PartialEq)]
pub enum ModelReply {
    Object(JsonObject),
    /// No JSON object could be recovered; carries the raw text.
    Malformed(String),
}

impl ModelReply {
    pub fn parse(text: &str) -> Self {
        match extract_json_object(text) {
            Some(obj) => ModelReply::Object(normalize_object(obj)),
            None => ModelReply::Malformed(text.to_string()),
        }
    }
}

/// Find the first JSON object in `text`.
///
/// 1. the whole trimmed text, if it is an object (or a JSON string whose
///    content is an object);
/// 2. otherwise the first `{` position from which a complete JSON value
///    decodes to an object. Trailing text after that value is ignored.
pub fn extract_json_object(text: &str) -> Option<JsonObject> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }

    match serde_json::from_str::<Value>(trimmed) {
        Ok(Value::Object(obj)) => return Some(obj),
        Ok(Value::String(inner)) => {
            if let Ok(Value::Object(obj)) = serde_json::from_str::<Value>(inner.trim()) {
                return Some(obj);
            }
        }
        _ => {}
    }

    for (idx, ch) in text.char_indices() {
        if ch != '{' {
            continue;
        }
        let mut stream = serde_json::Deserializer::from_str(&text[idx..]).into_iter::<Value>();
        if let Some(Ok(Value::Object(obj))) = stream.next() {
            return Some(obj);
        }
    }
    None
}

/// Repair common shape problems in an extracted object.
///
/// - a single string field holding a JSON object is replaced by that object
/// - keys lose surrounding whitespace and one layer of `"`/`'` quoting, then
///   escaped quotes are unescaped and the quoting is stripped once more
pub fn normalize_object(obj: JsonObject) -> JsonObject {
    let nested = if obj.len() == 1 {
        match obj.values().next() {
            Some(Value::String(inner)) if inner.contains('{') && inner.contains('}') => {
                match serde_json::from_str::<Value>(inner) {
                    Ok(Value::Object(parsed)) => Some(parsed),
                    _ => None,
                }
            }
            _ => None,
        }
    } else {
        None
    };
    let obj = nested.unwrap_or(obj);

    obj.into_iter()
        .map(|(key, value)| (normalize_key(&key), value))
        .collect()
}

fn normalize_key(key: &str) -> String {
    let once = strip_quotes(key.trim()).replace("\\\"", "\"");
    strip_quotes(once.trim()).to_string()
}

fn strip_quotes(s: &str) -> &str {
    for quote in ['"', '\''] {
        if s.len() >= 2 && s.starts_with(quote) && s.ends_with(quote) {
            return &s[1..s.len() - 1];
        }
    }
    s
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn object(reply: ModelReply) -> JsonObject {
        match reply {
            ModelReply::Object(obj) => obj,
            ModelReply::Malformed(raw) => panic!("expected object, got malformed: {raw}"),
        }
    }

    #[test]
    fn parses_clean_json() {
        let obj = object(ModelReply::parse(r#"  {"route": "web"}  "#));
        assert_eq!(obj.get("route"), Some(&json!("web")));
    }

    #[test]
    fn extracts_object_from_prose_and_fences() {
        let text = "Sure! Here you go:\n```json\n{\"verdict\": true}\n```\nHope that helps {not json}";
        let obj = object(ModelReply::parse(text));
        assert_eq!(obj.get("verdict"), Some(&json!(true)));
    }

    #[test]
    fn skips_braces_that_do_not_start_an_object() {
        let text = "set {a, b} then {\"query\": \"capital of France\"}";
        let obj = object(ModelReply::parse(text));
        assert_eq!(obj.get("query"), Some(&json!("capital of France")));
    }

    #[test]
    fn first_complete_object_wins_over_later_ones() {
        let text = r#"{"route": "calc", "calc_expression": "{2+2}"} {"route": "web"}"#;
        let obj = object(ModelReply::parse(text));
        assert_eq!(obj.get("route"), Some(&json!("calc")));
        assert_eq!(obj.get("calc_expression"), Some(&json!("{2+2}")));
    }

    #[test]
    fn unwraps_json_string_holding_an_object() {
        let obj = object(ModelReply::parse(r#""{\"route\": \"web\"}""#));
        assert_eq!(obj.get("route"), Some(&json!("web")));
    }

    #[test]
    fn unwraps_single_nested_string_field() {
        let obj = object(ModelReply::parse(r#"{"output": "{\"verdict\": false}"}"#));
        assert_eq!(obj.get("verdict"), Some(&json!(false)));
        assert!(obj.get("output").is_none());
    }

    #[test]
    fn leaves_multi_field_objects_alone() {
        let obj = object(ModelReply::parse(r#"{"a": "{\"b\": 1}", "c": 2}"#));
        assert_eq!(obj.get("a"), Some(&json!("{\"b\": 1}")));
        assert_eq!(obj.get("c"), Some(&json!(2)));
    }

    #[test]
    fn strips_stray_quotes_from_keys() {
        let obj = object(ModelReply::parse(
            r#"{"\"route\"": "web", " 'query' ": "x", "\\\"verdict\\\"": true}"#,
        ));
        assert_eq!(obj.get("route"), Some(&json!("web")));
        assert_eq!(obj.get("query"), Some(&json!("x")));
        assert_eq!(obj.get("verdict"), Some(&json!(true)));
    }

    #[test]
    fn malformed_when_no_object_present() {
        for text in ["", "   ", "true", "[1, 2]", "no json here", "{broken", "\"just a string\""] {
            assert_eq!(
                ModelReply::parse(text),
                ModelReply::Malformed(text.to_string()),
                "{text:?}"
            );
        }
    }
}
