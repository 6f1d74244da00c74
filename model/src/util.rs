/// Case-folds and trims a title for substring search (`title_norm` in
/// spec §4.3). Unicode-aware via `to_lowercase`, matching Python's
/// `str.casefold()` closely enough for the Latin/Polish text this index
/// actually sees.
pub fn normalize_title(title: &str) -> String {
    title.trim().to_lowercase()
}

/// Escapes `\`, `%`, `_` for a `LIKE ... ESCAPE '\'` query (spec §4.3,
/// verbatim from the original `_escape_like`).
pub fn escape_like(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '%' => out.push_str("\\%"),
            '_' => out.push_str("\\_"),
            other => out.push(other),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_like_metacharacters() {
        assert_eq!(escape_like("100%_done\\"), "100\\%\\_done\\\\");
    }

    #[test]
    fn normalizes_case_and_whitespace() {
        assert_eq!(normalize_title("  Wiadomości  "), "wiadomości");
    }
}
