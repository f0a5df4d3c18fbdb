//! Input validation and sanitization for credentials and free-text fields.
//!
//! Everything here is a pure function: pass/fail plus human-readable reasons,
//! no side effects. Suspicious-pattern detection is an advisory signal for
//! audit flagging and rejection of obviously hostile input; parameterized
//! queries remain the real injection defense.

use regex::Regex;
use std::sync::OnceLock;

/// Passwords rejected outright, regardless of character-class rules.
const COMMON_PASSWORDS: [&str; 10] = [
    "password",
    "password123",
    "123456",
    "123456789",
    "qwerty",
    "abc123",
    "password1",
    "admin",
    "letmein",
    "welcome",
];

/// Basic email format check on already-normalized input.
pub fn valid_email(email: &str) -> bool {
    Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").is_ok_and(|regex| regex.is_match(email))
}

/// Normalize an email for lookup/uniqueness checks.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Character-count bounds check; Unicode scalars, not bytes.
pub fn valid_length(value: &str, min: usize, max: usize) -> bool {
    let count = value.chars().count();
    count >= min && count <= max
}

/// Result of the full password rule evaluation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PasswordCheck {
    pub valid: bool,
    pub reasons: Vec<String>,
}

/// Evaluate every password rule and collect all violations.
///
/// The caller needs the complete list to render one combined error message,
/// so rules are never short-circuited.
pub fn check_password(password: &str) -> PasswordCheck {
    let mut reasons = Vec::new();

    if password.chars().count() < 8 {
        reasons.push("Password must be at least 8 characters long".to_string());
    }
    if !password.chars().any(|c| c.is_ascii_uppercase()) {
        reasons.push("Password must contain an uppercase letter".to_string());
    }
    if !password.chars().any(|c| c.is_ascii_lowercase()) {
        reasons.push("Password must contain a lowercase letter".to_string());
    }
    if !password.chars().any(|c| c.is_ascii_digit()) {
        reasons.push("Password must contain a digit".to_string());
    }
    if password.chars().all(char::is_alphanumeric) {
        reasons.push("Password must contain a special character".to_string());
    }

    let lowered = password.to_lowercase();
    if COMMON_PASSWORDS.contains(&lowered.as_str()) {
        reasons.push("Password is too common".to_string());
    }

    PasswordCheck {
        valid: reasons.is_empty(),
        reasons,
    }
}

fn sql_keyword_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)\b(union|select|insert|update|delete|drop|create|alter|exec|execute)\b")
            .expect("static regex")
    })
}

fn boolean_injection_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    // `or 1=1` style tautologies, with optional quotes around the operands
    RE.get_or_init(|| {
        Regex::new(r#"(?i)\b(or|and)\s+['"]?\w+['"]?\s*=\s*['"]?\w+['"]?"#).expect("static regex")
    })
}

/// Advisory detection of SQL-meta-character patterns in free-text input.
pub fn suspicious_pattern(value: &str) -> bool {
    if value.contains('\'') || value.contains('"') || value.contains(';') {
        return true;
    }
    if value.contains("--") || value.contains("/*") || value.contains("*/") {
        return true;
    }
    if sql_keyword_regex().is_match(value) {
        return true;
    }
    boolean_injection_regex().is_match(value)
}

fn tag_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"</?\s*([a-zA-Z0-9]+)[^>]*>").expect("static regex"))
}

/// Strip all markup tags and trim surrounding whitespace.
pub fn sanitize_text(value: &str) -> String {
    tag_regex().replace_all(value, "").trim().to_string()
}

const ALLOWED_TAGS: [&str; 6] = ["b", "i", "strong", "em", "p", "br"];

fn encode_entities(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(c),
        }
    }
    out
}

/// HTML-allowing sanitizer: keep a fixed tag allow-list, entity-encode all
/// remaining text, then strip `javascript:` protocols and `on*=` handler
/// patterns as a defense-in-depth pass after encoding.
///
/// Allowed tags are re-emitted in canonical form, which also drops any
/// attributes they carried.
pub fn sanitize_html(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut last = 0;

    for caps in tag_regex().captures_iter(value) {
        let whole = caps.get(0).map_or("", |m| m.as_str());
        let range = caps.get(0).map_or(0..0, |m| m.range());
        out.push_str(&encode_entities(&value[last..range.start]));
        last = range.end;

        let name = caps.get(1).map_or("", |m| m.as_str()).to_lowercase();
        if ALLOWED_TAGS.contains(&name.as_str()) {
            if whole.starts_with("</") {
                out.push_str(&format!("</{name}>"));
            } else {
                out.push_str(&format!("<{name}>"));
            }
        }
        // Disallowed tags are dropped entirely.
    }
    out.push_str(&encode_entities(&value[last..]));

    let no_js = javascript_protocol_regex().replace_all(&out, "");
    event_handler_regex()
        .replace_all(&no_js, "")
        .trim()
        .to_string()
}

fn javascript_protocol_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)javascript\s*:").expect("static regex"))
}

fn event_handler_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)\bon\w+\s*=").expect("static regex"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_email_accepts_basic_format() {
        assert!(valid_email("a@example.com"));
        assert!(valid_email("name.surname@example.co"));
    }

    #[test]
    fn valid_email_rejects_missing_parts() {
        assert!(!valid_email("not-an-email"));
        assert!(!valid_email("missing-at.example.com"));
        assert!(!valid_email("missing-domain@"));
        assert!(!valid_email("spaces in@example.com"));
    }

    #[test]
    fn normalize_email_trims_and_lowercases() {
        assert_eq!(normalize_email(" Alice@Example.COM "), "alice@example.com");
    }

    #[test]
    fn valid_length_counts_unicode_scalars() {
        // 4 scalars, 8 bytes; byte-length would wrongly pass max=6
        assert!(valid_length("日本語字", 4, 4));
        assert!(!valid_length("日本語字", 5, 10));
        assert!(valid_length("abc", 1, 3));
        assert!(!valid_length("abcd", 1, 3));
    }

    #[test]
    fn check_password_accepts_strong_password() {
        let check = check_password("Test123!");
        assert!(check.valid);
        assert!(check.reasons.is_empty());
    }

    #[test]
    fn check_password_collects_every_violation() {
        // "password": denylisted, no uppercase, no digit, no special character
        let check = check_password("password");
        assert!(!check.valid);
        assert_eq!(check.reasons.len(), 4);
        assert!(check.reasons.iter().any(|r| r.contains("uppercase")));
        assert!(check.reasons.iter().any(|r| r.contains("digit")));
        assert!(check.reasons.iter().any(|r| r.contains("special")));
        assert!(check.reasons.iter().any(|r| r.contains("too common")));
    }

    #[test]
    fn check_password_denylist_is_case_insensitive() {
        let check = check_password("LetMeIn");
        assert!(check.reasons.iter().any(|r| r.contains("too common")));
    }

    #[test]
    fn check_password_short_but_diverse() {
        let check = check_password("Ab1!");
        assert!(!check.valid);
        assert_eq!(check.reasons.len(), 1);
        assert!(check.reasons[0].contains("8 characters"));
    }

    #[test]
    fn suspicious_pattern_flags_sql_keywords() {
        assert!(suspicious_pattern("1 UNION SELECT * FROM users"));
        assert!(suspicious_pattern("drop table trips"));
        // word-bounded: "selection" and "created" are fine
        assert!(!suspicious_pattern("my selection of created trips"));
    }

    #[test]
    fn suspicious_pattern_flags_quotes_and_comments() {
        assert!(suspicious_pattern("it's a trap"));
        assert!(suspicious_pattern("x; --"));
        assert!(suspicious_pattern("/* hidden */"));
    }

    #[test]
    fn suspicious_pattern_flags_boolean_injection() {
        assert!(suspicious_pattern("admin OR 1=1"));
        assert!(suspicious_pattern("x or 'a'='a'"));
    }

    #[test]
    fn suspicious_pattern_allows_plain_text() {
        assert!(!suspicious_pattern("Weekend trip to the Dolomites"));
        assert!(!suspicious_pattern("alice@example.com"));
    }

    #[test]
    fn sanitize_text_strips_tags_and_trims() {
        assert_eq!(
            sanitize_text("  <script>alert(1)</script>Hello <b>world</b>  "),
            "alert(1)Hello world"
        );
    }

    #[test]
    fn sanitize_html_keeps_allowlisted_tags() {
        assert_eq!(
            sanitize_html("<p>Hello <b>world</b></p>"),
            "<p>Hello <b>world</b></p>"
        );
    }

    #[test]
    fn sanitize_html_drops_disallowed_tags_and_encodes() {
        assert_eq!(
            sanitize_html("<script>alert('x')</script> 1 < 2"),
            "alert(&#x27;x&#x27;) 1 &lt; 2"
        );
    }

    #[test]
    fn sanitize_html_strips_attributes_from_allowed_tags() {
        assert_eq!(sanitize_html(r#"<b onclick="evil()">hi</b>"#), "<b>hi</b>");
    }

    #[test]
    fn sanitize_html_strips_javascript_protocol_and_handlers() {
        let out = sanitize_html("click javascript:alert(1) onload= now");
        assert!(!out.to_lowercase().contains("javascript:"));
        assert!(!out.to_lowercase().contains("onload="));
    }
}
