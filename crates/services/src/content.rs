//! Post body validation and rendering.

use domains::{DomainError, Result, MAX_POST_LENGTH};

/// Rejects blank or oversized bodies. Returns the body with outer whitespace
/// trimmed.
pub fn validate_content(raw: &str) -> Result<&str> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(DomainError::Validation("content must not be empty".into()));
    }
    if trimmed.chars().count() > MAX_POST_LENGTH {
        return Err(DomainError::Validation(format!(
            "content exceeds {MAX_POST_LENGTH} characters"
        )));
    }
    Ok(trimmed)
}

/// Escapes HTML and marks quote lines. Lines starting with `>` become a quote
/// span; lines are joined with `<br />`.
pub fn render_content(raw: &str) -> String {
    let escaped = html_escape::encode_safe(raw).to_string();

    escaped
        .lines()
        .map(|line| {
            if line.starts_with("&gt;") {
                format!("<span class=\"quote\">{}</span>", line)
            } else {
                line.to_string()
            }
        })
        .collect::<Vec<_>>()
        .join("<br />")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_content_is_rejected() {
        assert!(matches!(validate_content("   \n\t"), Err(DomainError::Validation(_))));
    }

    #[test]
    fn oversized_content_is_rejected() {
        let long = "x".repeat(MAX_POST_LENGTH + 1);
        assert!(matches!(validate_content(&long), Err(DomainError::Validation(_))));
        let limit = "x".repeat(MAX_POST_LENGTH);
        assert!(validate_content(&limit).is_ok());
    }

    #[test]
    fn content_is_trimmed() {
        assert_eq!(validate_content("  hello  ").unwrap(), "hello");
    }

    #[test]
    fn markup_is_escaped() {
        let html = render_content("<script>alert(1)</script>");
        assert!(!html.contains("<script>"));
        assert!(html.contains("&lt;script&gt;"));
    }

    #[test]
    fn quotes_and_line_breaks() {
        let html = render_content(">quoted\nreply");
        assert_eq!(html, "<span class=\"quote\">&gt;quoted</span><br />reply");
    }
}
