//! DOM snapshot sanitization
//!
//! Audit snapshots keep page structure and text, nothing executable:
//! script and style bodies are removed, inline event handlers and
//! javascript: URLs are stripped, and the result is truncated to the
//! configured cap on a character boundary.

use regex::Regex;
use std::sync::OnceLock;

fn script_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?is)<script\b[^>]*>.*?</script>").expect("script pattern must compile")
    })
}

fn style_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?is)<style\b[^>]*>.*?</style>").expect("style pattern must compile")
    })
}

fn event_attr_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r#"(?i)\son\w+\s*=\s*("[^"]*"|'[^']*'|[^\s>]+)"#)
            .expect("event attribute pattern must compile")
    })
}

fn js_url_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r#"(?i)(href|src|action)\s*=\s*("javascript:[^"]*"|'javascript:[^']*')"#)
            .expect("javascript url pattern must compile")
    })
}

/// Sanitize a raw DOM snapshot and truncate it to `cap` characters
pub fn sanitize_dom(html: &str, cap: usize) -> String {
    let without_scripts = script_pattern().replace_all(html, "");
    let without_styles = style_pattern().replace_all(&without_scripts, "");
    let without_events = event_attr_pattern().replace_all(&without_styles, "");
    let sanitized = js_url_pattern().replace_all(&without_events, "$1=\"\"");

    if sanitized.chars().count() <= cap {
        sanitized.into_owned()
    } else {
        sanitized.chars().take(cap).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scripts_stripped() {
        let html = "<html><script>alert('x')</script><p>keep</p></html>";
        let clean = sanitize_dom(html, 1000);
        assert!(!clean.contains("alert"));
        assert!(clean.contains("<p>keep</p>"));
    }

    #[test]
    fn test_scripts_with_attrs_and_newlines_stripped() {
        let html = "<script type=\"module\">\nlet a = 1;\nsteal();\n</script><div>ok</div>";
        let clean = sanitize_dom(html, 1000);
        assert!(!clean.contains("steal"));
        assert!(clean.contains("<div>ok</div>"));
    }

    #[test]
    fn test_styles_stripped() {
        let html = "<style>.x { color: red; }</style><span>text</span>";
        let clean = sanitize_dom(html, 1000);
        assert!(!clean.contains("color"));
        assert!(clean.contains("<span>text</span>"));
    }

    #[test]
    fn test_event_attributes_stripped() {
        let html = r#"<button onclick="doEvil()" onmouseover='track()' class="ok">Go</button>"#;
        let clean = sanitize_dom(html, 1000);
        assert!(!clean.contains("doEvil"));
        assert!(!clean.contains("track"));
        assert!(clean.contains(r#"class="ok""#));
        assert!(clean.contains(">Go</button>"));
    }

    #[test]
    fn test_javascript_urls_emptied() {
        let html = r#"<a href="javascript:steal()">x</a><a href="https://example.com">y</a>"#;
        let clean = sanitize_dom(html, 1000);
        assert!(!clean.contains("steal"));
        assert!(clean.contains("https://example.com"));
    }

    #[test]
    fn test_truncated_to_cap() {
        let html = format!("<p>{}</p>", "a".repeat(500));
        let clean = sanitize_dom(&html, 50);
        assert_eq!(clean.chars().count(), 50);
    }

    #[test]
    fn test_multibyte_truncation_is_char_safe() {
        let html = "é".repeat(100);
        let clean = sanitize_dom(&html, 10);
        assert_eq!(clean.chars().count(), 10);
    }
}
