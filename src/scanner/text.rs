//! Small text helpers shared by both dialect matchers.

use crate::model::ConstraintKind;

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '$'
}

/// Read one (possibly quoted) identifier from the start of `s`.
///
/// Returns the unquoted name and the remaining text.
pub(crate) fn read_name(s: &str) -> Option<(String, &str)> {
    let s = s.trim_start();
    let mut chars = s.char_indices();
    let (_, first) = chars.next()?;

    let close = match first {
        '"' => Some('"'),
        '`' => Some('`'),
        '\'' => Some('\''),
        '[' => Some(']'),
        _ => None,
    };

    if let Some(close) = close {
        for (i, c) in chars {
            if c == close {
                let name = &s[1..i];
                if name.is_empty() {
                    return None;
                }
                return Some((name.to_string(), &s[i + c.len_utf8()..]));
            }
        }
        return None;
    }

    if !is_ident_char(first) {
        return None;
    }
    let end = s
        .char_indices()
        .find(|(_, c)| !is_ident_char(*c))
        .map(|(i, _)| i)
        .unwrap_or(s.len());
    Some((s[..end].to_string(), &s[end..]))
}

/// Read a dotted name such as `schema.table.column`.
pub(crate) fn read_qualified(s: &str) -> Option<(Vec<String>, &str)> {
    let (first, mut rest) = read_name(s)?;
    let mut parts = vec![first];
    while let Some(after_dot) = rest.strip_prefix('.') {
        let (part, next) = read_name(after_dot)?;
        parts.push(part);
        rest = next;
    }
    Some((parts, rest))
}

/// Strip a leading keyword, matched case-insensitively on a word boundary.
pub(crate) fn strip_keyword<'a>(s: &'a str, keyword: &str) -> Option<&'a str> {
    let s = s.trim_start();
    let head = s.get(..keyword.len())?;
    if !head.eq_ignore_ascii_case(keyword) {
        return None;
    }
    let rest = &s[keyword.len()..];
    match rest.chars().next() {
        Some(c) if is_ident_char(c) => None,
        _ => Some(rest),
    }
}

/// Strip a sequence of keywords, e.g. `["FOREIGN", "KEY"]`.
pub(crate) fn strip_keywords<'a>(s: &'a str, keywords: &[&str]) -> Option<&'a str> {
    keywords
        .iter()
        .try_fold(s, |rest, kw| strip_keyword(rest, kw))
}

/// Read a parenthesized, comma-separated list of names: `(a, "b", c)`.
pub(crate) fn read_name_list(s: &str) -> Option<(Vec<String>, &str)> {
    let mut rest = s.trim_start().strip_prefix('(')?;
    let mut names = Vec::new();
    loop {
        let (name, next) = read_name(rest)?;
        names.push(name);
        let next = next.trim_start();
        if let Some(after) = next.strip_prefix(',') {
            rest = after;
        } else if let Some(after) = next.strip_prefix(')') {
            return Some((names, after));
        } else {
            return None;
        }
    }
}

/// Split on `sep` outside quotes, brackets and parentheses.
pub(crate) fn split_top_level(s: &str, sep: char) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut escaped = false;
    let mut start = 0;

    for (i, c) in s.char_indices() {
        match quote {
            Some(_) if escaped => escaped = false,
            Some(_) if c == '\\' => escaped = true,
            Some(q) if c == q => quote = None,
            Some(_) => {}
            None => match c {
                '\'' | '"' | '`' => quote = Some(c),
                '(' | '[' => depth += 1,
                ')' | ']' => depth = depth.saturating_sub(1),
                c if c == sep && depth == 0 => {
                    parts.push(&s[start..i]);
                    start = i + c.len_utf8();
                }
                _ => {}
            },
        }
    }
    parts.push(&s[start..]);
    parts
}

/// Keyword-substring constraint recognition, case-insensitive.
pub(crate) fn constraint_keywords(text: &str) -> Vec<ConstraintKind> {
    let lower = text.to_lowercase();
    let mut kinds = Vec::new();
    if lower.contains("primary key") {
        kinds.push(ConstraintKind::PrimaryKey);
    }
    if lower.contains("not null") {
        kinds.push(ConstraintKind::NotNull);
    }
    if lower.contains("unique") {
        kinds.push(ConstraintKind::Unique);
    }
    if lower.contains("auto_increment") || lower.contains("autoincrement") {
        kinds.push(ConstraintKind::AutoIncrement);
    }
    kinds
}

/// Collapse whitespace runs to one space.
pub(crate) fn squash_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_name() {
        assert_eq!(read_name("  users {"), Some(("users".into(), " {")));
        assert_eq!(read_name("\"user table\" x"), Some(("user table".into(), " x")));
        assert_eq!(read_name("`col`,"), Some(("col".into(), ",")));
        assert_eq!(read_name("[dbo]"), Some(("dbo".into(), "")));
        assert_eq!(read_name("{"), None);
    }

    #[test]
    fn test_read_qualified() {
        let (parts, rest) = read_qualified("public.users.id >").unwrap();
        assert_eq!(parts, vec!["public", "users", "id"]);
        assert_eq!(rest, " >");
    }

    #[test]
    fn test_strip_keyword_boundary() {
        assert_eq!(strip_keyword("Table users", "table"), Some(" users"));
        assert_eq!(strip_keyword("tables x", "table"), None);
        assert_eq!(strip_keywords("FOREIGN  KEY (a)", &["foreign", "key"]), Some(" (a)"));
    }

    #[test]
    fn test_read_name_list() {
        let (names, rest) = read_name_list(" (a, \"b\" , c) REFERENCES").unwrap();
        assert_eq!(names, vec!["a", "b", "c"]);
        assert_eq!(rest, " REFERENCES");
        assert!(read_name_list("(a b)").is_none());
    }

    #[test]
    fn test_split_top_level() {
        let parts = split_top_level("pk, note: 'a, b', default: f(1, 2)", ',');
        assert_eq!(parts, vec!["pk", " note: 'a, b'", " default: f(1, 2)"]);

        let parts = split_top_level(r"note: 'it\'s, ok', unique", ',');
        assert_eq!(parts, vec![r"note: 'it\'s, ok'", " unique"]);
    }

    #[test]
    fn test_constraint_keywords() {
        let kinds = constraint_keywords("NOT NULL Primary Key AUTOINCREMENT UNIQUE");
        assert_eq!(
            kinds,
            vec![
                ConstraintKind::PrimaryKey,
                ConstraintKind::NotNull,
                ConstraintKind::Unique,
                ConstraintKind::AutoIncrement,
            ]
        );
        assert!(constraint_keywords("null").is_empty());
    }
}
