//! Utility functions and helpers

/// Shorten text for log output, counting characters rather than bytes so
/// multi-byte (CJK) input never splits a code point.
pub fn preview(s: &str, max_chars: usize) -> String {
    if s.chars().count() > max_chars {
        format!("{}...", s.chars().take(max_chars).collect::<String>())
    } else {
        s.to_string()
    }
}

/// Mask a secret for display, keeping a short prefix
pub fn mask_secret(secret: &str) -> String {
    if secret.is_empty() {
        return "NOT SET".to_string();
    }
    let prefix: String = secret.chars().take(6).collect();
    format!("{}...", prefix)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preview_ascii() {
        assert_eq!(preview("hello", 10), "hello");
        assert_eq!(preview("hello world", 5), "hello...");
    }

    #[test]
    fn test_preview_multibyte() {
        assert_eq!(preview("我最近有点头痛，持续了三天", 4), "我最近有...");
    }

    #[test]
    fn test_mask_secret() {
        assert_eq!(mask_secret(""), "NOT SET");
        assert_eq!(mask_secret("sk-abcdefghijk"), "sk-abc...");
    }
}
