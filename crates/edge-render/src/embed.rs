//! Escaping helpers for markup and inline scripts.

use serde::Serialize;

/// Serialize `value` as JSON that is safe to embed inside a `<script>` element.
///
/// `</script` and `<!--` sequences are broken up so the embedded data cannot
/// end the script element or open a comment. Serialization failures produce
/// an `{"error": ...}` object instead of panicking.
pub fn safe_json<T: Serialize + ?Sized>(value: &T) -> String {
    match serde_json::to_string(value) {
        Ok(json) => json.replace("</script", "<\\/script").replace("<!--", "<\\!--"),
        Err(e) => serde_json::json!({ "error": e.to_string() }).to_string(),
    }
}

/// Escape text content.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            c => out.push(c),
        }
    }
    out
}

/// Escape an attribute value.
pub fn escape_attr(value: &str) -> String {
    escape_html(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_safe_json_breaks_script_close() {
        let out = safe_json(&json!({"html": "</script><script>alert(1)</script>"}));

        assert!(!out.contains("</script"));
        assert!(out.contains(r"<\/script>"));
    }

    #[test]
    fn test_safe_json_breaks_comment_open() {
        let out = safe_json(&json!({"note": "<!-- hidden -->"}));

        assert!(!out.contains("<!--"));
        assert!(out.contains(r"<\!--"));
    }

    #[test]
    fn test_safe_json_plain_values_unchanged() {
        assert_eq!(safe_json(&json!({"a": 1})), r#"{"a":1}"#);
        assert_eq!(safe_json("text"), r#""text""#);
    }

    #[test]
    fn test_escape_html() {
        assert_eq!(escape_html(r#"<a href="x">'&'</a>"#), "&lt;a href=&quot;x&quot;&gt;&#x27;&amp;&#x27;&lt;/a&gt;");
    }
}
