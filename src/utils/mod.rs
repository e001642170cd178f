pub mod crypto;
pub mod pagination;
pub mod time;
pub mod token;

/// Escapes LIKE metacharacters and wraps the term for substring matching.
pub fn like_pattern(term: &str) -> String {
    let escaped = term
        .trim()
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{}%", escaped)
}

#[cfg(test)]
mod tests {
    use super::like_pattern;

    #[test]
    fn like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern(" rust "), "%rust%");
        assert_eq!(like_pattern("100%_done"), "%100\\%\\_done%");
    }
}
