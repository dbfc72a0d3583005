pub fn truncate(s: &str, max: usize) -> String {
    if max == 0 {
        return String::new();
    }

    let char_count = s.chars().count();
    if char_count <= max {
        return s.to_string();
    }

    if max <= 3 {
        return s.chars().take(max).collect();
    }

    let truncated: String = s.chars().take(max - 3).collect();
    format!("{}...", truncated)
}

/// Last non-blank line of `text`, trimmed.
pub fn last_line(text: &str) -> Option<&str> {
    text.lines().rev().map(str::trim).find(|line| !line.is_empty())
}

/// Lines joined with `\n`, with surrounding whitespace removed.
pub fn joined_trimmed(lines: &[String]) -> String {
    lines.join("\n").trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::{joined_trimmed, last_line, truncate};

    #[test]
    fn test_truncate_unicode_safe() {
        let input = "ééééé";
        assert_eq!(truncate(input, 4), "é...");
    }

    #[test]
    fn test_truncate_small_max() {
        let input = "こんにちは";
        assert_eq!(truncate(input, 3), "こんに");
        assert_eq!(truncate(input, 0), "");
    }

    #[test]
    fn test_last_line_skips_trailing_blank_lines() {
        assert_eq!(last_line("a\nNameError: x\n\n  \n"), Some("NameError: x"));
        assert_eq!(last_line("\n \n"), None);
        assert_eq!(last_line(""), None);
    }

    #[test]
    fn test_joined_trimmed() {
        let lines = vec!["".to_string(), "  a".to_string(), "b  ".to_string(), "".to_string()];
        assert_eq!(joined_trimmed(&lines), "a\nb");
    }
}
