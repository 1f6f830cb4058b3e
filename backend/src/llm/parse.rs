use serde_json::{Value, json};

#[derive(Debug, thiserror::Error)]
pub enum UpstreamParseError {
    #[error("Empty response from model")]
    Empty,
    #[error("Model response was not valid JSON")]
    NotJson,
}

/// Extracts a JSON object from model output: direct parse first, then the
/// widest `{...}` span (first `{` to last `}`).
pub fn parse_model_json(raw: &str) -> Result<Value, UpstreamParseError> {
    let text = strip_code_fence(raw.trim());
    if text.is_empty() {
        return Err(UpstreamParseError::Empty);
    }

    if let Ok(value) = serde_json::from_str::<Value>(text) {
        return Ok(value);
    }

    if let (Some(start), Some(end)) = (text.find('{'), text.rfind('}')) {
        if start < end {
            if let Ok(value) = serde_json::from_str::<Value>(&text[start..=end]) {
                return Ok(value);
            }
        }
    }

    Err(UpstreamParseError::NotJson)
}

/// Never fails: unparseable output becomes `{"error": ..., "raw": <original text>}`.
pub fn safe_json_parse(raw: &str) -> Value {
    match parse_model_json(raw) {
        Ok(value) => value,
        Err(e) => {
            log::warn!("Falling back to raw model text: {}", e);
            error_payload(&e.to_string(), raw)
        }
    }
}

pub fn error_payload(message: &str, raw: &str) -> Value {
    json!({
        "error": message,
        "raw": raw,
    })
}

fn strip_code_fence(text: &str) -> &str {
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    // Drop an info string such as `json` on the opening fence line.
    let rest = match rest.find('\n') {
        Some(newline) if rest[..newline].chars().all(|c| c.is_ascii_alphanumeric()) => {
            &rest[newline + 1..]
        }
        _ => rest.trim_start_matches(|c: char| c.is_ascii_alphabetic()),
    };
    rest.trim_end().strip_suffix("```").unwrap_or(rest).trim()
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn strips_json_code_fence() {
        assert_eq!(safe_json_parse("```json\n{\"a\":1}\n```"), json!({"a": 1}));
    }

    #[test]
    fn strips_bare_code_fence() {
        assert_eq!(safe_json_parse("```\n{\"a\":[1,2]}\n```  "), json!({"a": [1, 2]}));
    }

    #[test]
    fn extracts_embedded_object() {
        assert_eq!(safe_json_parse("garbage {\"b\":2} trailing"), json!({"b": 2}));
    }

    #[test]
    fn parses_clean_json_directly() {
        assert_eq!(safe_json_parse("  {\"diagnosis\": \"rust\"}\n"), json!({"diagnosis": "rust"}));
    }

    #[test]
    fn empty_text_yields_error_object() {
        let value = safe_json_parse("");
        assert!(value.get("error").is_some());
        assert_matches!(parse_model_json("   "), Err(UpstreamParseError::Empty));
    }

    #[test]
    fn unparseable_text_keeps_raw_verbatim() {
        let raw = "The leaves look {dry and} brittle.";
        let value = safe_json_parse(raw);
        assert!(value.get("error").is_some());
        assert_eq!(value["raw"], raw);
    }

    #[test]
    fn greedy_span_fails_on_two_objects() {
        // The widest span joins both objects and is therefore not valid JSON.
        assert_matches!(parse_model_json("{\"a\":1} and {\"b\":2}"), Err(UpstreamParseError::NotJson));
    }
}
