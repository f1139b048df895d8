//! Bracketed project tags embedded in event titles, e.g. `[MAIN] Focus Work Block`.

use crate::domain::models::ConfigurationError;

const TAG_OPEN: char = '[';
const TAG_CLOSE: char = ']';

/// Prefixes `base` with the bracketed `code`.
pub fn tag_title(code: &str, base: &str) -> String {
    format!("{TAG_OPEN}{code}{TAG_CLOSE} {base}")
}

/// Returns the code of the first well-formed tag in `title`, if any.
pub fn extract_tag(title: &str) -> Option<&str> {
    let mut rest = title;
    while let Some(open) = rest.find(TAG_OPEN) {
        let after_open = &rest[open + TAG_OPEN.len_utf8()..];
        let close = after_open.find(TAG_CLOSE)?;
        let candidate = &after_open[..close];
        if is_valid_code(candidate) {
            return Some(candidate);
        }
        rest = after_open;
    }
    None
}

/// Exact, case-sensitive match of `[code]` anywhere in `title`.
pub fn has_tag(title: &str, code: &str) -> bool {
    if code.is_empty() {
        return false;
    }
    title.contains(&format!("{TAG_OPEN}{code}{TAG_CLOSE}"))
}

pub fn validate_project_code(code: &str) -> Result<(), ConfigurationError> {
    if !is_valid_code(code) {
        return Err(ConfigurationError(format!(
            "projectCode '{code}' must be non-empty without brackets or whitespace"
        )));
    }
    Ok(())
}

fn is_valid_code(code: &str) -> bool {
    !code.is_empty()
        && !code
            .chars()
            .any(|ch| ch == TAG_OPEN || ch == TAG_CLOSE || ch.is_whitespace())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tag_title_prefixes_bracketed_code() {
        assert_eq!(tag_title("MAIN", "Focus Work Block"), "[MAIN] Focus Work Block");
    }

    #[test]
    fn extract_tag_reads_leading_and_embedded_tags() {
        assert_eq!(extract_tag("[SIDE] Review"), Some("SIDE"));
        assert_eq!(extract_tag("Review [PORT] deck"), Some("PORT"));
        assert_eq!(extract_tag("No tag here"), None);
        assert_eq!(extract_tag("[] empty then [FAM]"), Some("FAM"));
        assert_eq!(extract_tag("[unterminated"), None);
        assert_eq!(extract_tag("[two words] x"), None);
    }

    #[test]
    fn extract_tag_inverts_tag_title() {
        let title = tag_title("MAIN", "Focus Work Block");
        assert_eq!(extract_tag(&title), Some("MAIN"));
    }

    #[test]
    fn has_tag_is_exact_and_case_sensitive() {
        assert!(has_tag("[MAIN] Focus Work Block", "MAIN"));
        assert!(!has_tag("[MAIN] Focus Work Block", "main"));
        assert!(!has_tag("[MAINTENANCE] Patch", "MAIN"));
        assert!(!has_tag("MAIN without brackets", "MAIN"));
        assert!(!has_tag("[MAIN] x", ""));
    }

    #[test]
    fn validate_project_code_rejects_brackets_and_spaces() {
        assert!(validate_project_code("MAIN").is_ok());
        assert!(validate_project_code("").is_err());
        assert!(validate_project_code("A B").is_err());
        assert!(validate_project_code("[X]").is_err());
    }
}
