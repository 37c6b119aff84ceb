//! Escaping rules of the store's query syntax.

const SPECIAL_CHARS: &[char] = &[
    '\\', '+', '-', '!', '(', ')', ':', '^', '[', ']', '"', '{', '}', '~', '*', '?', '|', '&', ';', '/',
];

pub const MATCH_ALL: &str = "*:*";

/// Escapes every character with a meaning in the query syntax
pub fn escape_query_chars(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 8);
    for c in value.chars() {
        if SPECIAL_CHARS.contains(&c) || c.is_whitespace() {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Like [`escape_query_chars`] but keeps `*` and `?` as wildcards and
/// whitespace as term separator
pub fn escape_wildcard_chars(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 8);
    let mut chars = value.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            // already escaped wildcard chars stay literal
            '\\' if matches!(chars.peek(), Some('*') | Some('?')) => {
                out.push('\\');
                if let Some(next) = chars.next() {
                    out.push(next);
                }
            }
            '*' | '?' => out.push(c),
            c if c.is_whitespace() => out.push(c),
            c if SPECIAL_CHARS.contains(&c) => {
                out.push('\\');
                out.push(c);
            }
            c => out.push(c),
        }
    }
    out
}

/// `field:value` with the value escaped
pub fn term(field: &str, value: &str) -> String {
    format!("{}:{}", field, escape_query_chars(value))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_reserved_characters() {
        assert_eq!(escape_query_chars("http://ex/a b"), "http\\:\\/\\/ex\\/a\\ b");
        assert_eq!(escape_query_chars("plain"), "plain");
    }

    #[test]
    fn wildcard_escaping_keeps_wildcards() {
        assert_eq!(escape_wildcard_chars("pa*is (fr)"), "pa*is \\(fr\\)");
        assert_eq!(escape_wildcard_chars("a\\*b"), "a\\*b");
    }
}
