//! Splitting raw text into logical lines.
//!
//! Comments are removed and blank lines are dropped here. A logical line is
//! usually a physical line, except that a table body written on one line
//! (`Table t { a int }`, `CREATE TABLE t (a INT, b INT);`) is broken into its
//! opening, member and closing parts, and an SQL statement header spanning
//! several lines is joined back together.

use std::collections::VecDeque;
use std::iter::Peekable;
use std::str::Chars;

use super::ddl;
use crate::dialect::Dialect;

/// A logical line and the 1-based physical line it starts on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct LogicalLine {
    pub line: usize,
    pub text: String,
}

#[derive(Clone)]
pub(crate) struct LogicalLines<'a> {
    chars: Peekable<Chars<'a>>,
    ddl: bool,
    line: usize,
    start_line: usize,
    current: String,
    pending: VecDeque<LogicalLine>,
    quote: Option<char>,
    /// Inside a `'''` multi-line string (table-definition)
    triple: bool,
    /// Previous char was a backslash inside a quote (table-definition)
    escaped: bool,
    /// `[...]` nesting (table-definition settings)
    bracket: usize,
    /// `(...)` nesting (DDL)
    paren: usize,
    /// Inside a `CREATE TABLE (...)` body
    in_body: bool,
    done: bool,
}

impl<'a> LogicalLines<'a> {
    /// `dialect` must already be resolved; `Auto` is treated as table-definition.
    pub(crate) fn new(input: &'a str, dialect: Dialect) -> Self {
        Self {
            chars: input.chars().peekable(),
            ddl: dialect == Dialect::Ddl,
            line: 1,
            start_line: 1,
            current: String::new(),
            pending: VecDeque::new(),
            quote: None,
            triple: false,
            escaped: false,
            bracket: 0,
            paren: 0,
            in_body: false,
            done: false,
        }
    }

    fn push(&mut self, c: char) {
        if self.quote.is_none() && c.is_whitespace() {
            if !self.current.ends_with(' ') {
                self.current.push(' ');
            }
            return;
        }
        if self.current.trim().is_empty() {
            self.current.clear();
            self.start_line = self.line;
        }
        self.current.push(c);
    }

    fn flush(&mut self) {
        let text = self.current.trim();
        if !text.is_empty() {
            self.pending.push_back(LogicalLine {
                line: self.start_line,
                text: text.to_string(),
            });
        }
        self.current.clear();
    }

    fn skip_line_comment(&mut self) {
        while let Some(&c) = self.chars.peek() {
            if c == '\n' {
                break;
            }
            self.chars.next();
        }
    }

    fn skip_block_comment(&mut self) {
        self.chars.next(); // *
        while let Some(c) = self.chars.next() {
            match c {
                '\n' => self.line += 1,
                '*' if self.chars.peek() == Some(&'/') => {
                    self.chars.next();
                    break;
                }
                _ => {}
            }
        }
    }

    /// Handles comment openers; returns true when `c` started a comment.
    fn try_comment(&mut self, c: char) -> bool {
        let next = self.chars.peek().copied();
        match (c, next) {
            ('/', Some('*')) => self.skip_block_comment(),
            ('/', Some('/')) if !self.ddl => self.skip_line_comment(),
            ('-', Some('-')) if self.ddl => self.skip_line_comment(),
            ('#', _) if self.ddl => self.skip_line_comment(),
            _ => return false,
        }
        true
    }

    /// Consume two more `q` if they come next.
    fn take_pair(&mut self, q: char) -> bool {
        let mut ahead = self.chars.clone();
        if ahead.next() == Some(q) && ahead.next() == Some(q) {
            self.chars.next();
            self.chars.next();
            true
        } else {
            false
        }
    }

    /// Only `'''` strings and quotes inside a DDL table body run past a newline.
    fn quote_spans_lines(&self) -> bool {
        self.triple || (self.ddl && self.in_body)
    }

    fn open_quote(&mut self, c: char) -> bool {
        if !matches!(c, '\'' | '"' | '`') {
            return false;
        }
        self.push(c);
        if c == '\'' && !self.ddl && self.take_pair(c) {
            self.push(c);
            self.push(c);
            self.triple = true;
        }
        self.quote = Some(c);
        true
    }

    fn feed_quoted(&mut self, q: char, c: char) {
        if c == '\n' {
            self.escaped = false;
            self.push(' ');
            return;
        }
        if self.escaped {
            self.escaped = false;
            self.push(c);
            return;
        }
        if c == '\\' && !self.ddl {
            self.escaped = true;
            self.push(c);
            return;
        }
        self.push(c);
        if c != q {
            return;
        }
        if !self.triple {
            self.quote = None;
        } else if self.take_pair(q) {
            self.push(q);
            self.push(q);
            self.quote = None;
            self.triple = false;
        }
    }

    fn feed(&mut self, c: char) {
        if c == '\n' {
            self.line += 1;
        }

        if let Some(q) = self.quote {
            if c != '\n' || self.quote_spans_lines() {
                self.feed_quoted(q, c);
                return;
            }
            // unterminated quote ends with its line
            self.quote = None;
            self.escaped = false;
        } else if self.try_comment(c) || self.open_quote(c) {
            return;
        }

        if self.ddl {
            self.feed_ddl(c);
        } else {
            self.feed_table_definition(c);
        }
    }

    fn feed_table_definition(&mut self, c: char) {
        match c {
            '\n' if self.bracket > 0 => self.push(' '),
            '\n' => self.flush(),
            '[' => {
                self.bracket += 1;
                self.push(c);
            }
            ']' => {
                self.bracket = self.bracket.saturating_sub(1);
                self.push(c);
            }
            '{' if self.bracket == 0 => {
                self.push(c);
                self.flush();
            }
            '}' if self.bracket == 0 => {
                self.flush();
                self.push(c);
                self.flush();
            }
            _ => self.push(c),
        }
    }

    fn statement_continues(&self) -> bool {
        let text = self.current.trim();
        if text.ends_with(';') {
            return false;
        }
        ddl::strip_create_table(text).is_some()
            || crate::scanner::text::strip_keywords(text, &["ALTER", "TABLE"]).is_some()
    }

    fn feed_ddl(&mut self, c: char) {
        match c {
            '\n' if self.in_body && self.paren > 1 => self.push(' '),
            '\n' if self.in_body => self.flush(),
            '\n' if self.statement_continues() => self.push(' '),
            '\n' => {
                self.flush();
                self.paren = 0;
            }
            '(' => {
                self.paren += 1;
                if !self.in_body && self.paren == 1 && ddl::table_header(&self.current).is_some() {
                    self.push(c);
                    self.in_body = true;
                    self.flush();
                } else {
                    self.push(c);
                }
            }
            ')' if self.in_body && self.paren == 1 => {
                self.flush();
                self.paren = 0;
                self.in_body = false;
                self.push(c);
            }
            ')' => {
                self.paren = self.paren.saturating_sub(1);
                self.push(c);
            }
            ',' if self.in_body && self.paren == 1 => self.flush(),
            ';' if !self.in_body => {
                self.push(c);
                self.flush();
                self.paren = 0;
            }
            _ => self.push(c),
        }
    }
}

impl Iterator for LogicalLines<'_> {
    type Item = LogicalLine;

    fn next(&mut self) -> Option<LogicalLine> {
        loop {
            if let Some(line) = self.pending.pop_front() {
                return Some(line);
            }
            if self.done {
                return None;
            }
            match self.chars.next() {
                Some(c) => self.feed(c),
                None => {
                    self.flush();
                    self.done = true;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts(input: &str, dialect: Dialect) -> Vec<String> {
        LogicalLines::new(input, dialect).map(|l| l.text).collect()
    }

    #[test]
    fn test_table_definition_inline_body() {
        let lines = texts("Table users { id integer [primary key] }", Dialect::TableDefinition);
        assert_eq!(lines, vec!["Table users {", "id integer [primary key]", "}"]);
    }

    #[test]
    fn test_table_definition_comments_and_blanks() {
        let input = "// header\n\nTable a { // trailing\n  id int /* x */\n}\n";
        let lines: Vec<LogicalLine> = LogicalLines::new(input, Dialect::TableDefinition).collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0].text, "Table a {");
        assert_eq!(lines[0].line, 3);
        assert_eq!(lines[1].text, "id int");
        assert_eq!(lines[1].line, 4);
    }

    #[test]
    fn test_braces_inside_settings_not_split() {
        let lines = texts("Table a {\n id int [note: '{x}']\n}", Dialect::TableDefinition);
        assert_eq!(lines[1], "id int [note: '{x}']");
    }

    #[test]
    fn test_ddl_single_line_table() {
        let lines = texts("CREATE TABLE t (a INT, b DECIMAL(10, 2));", Dialect::Ddl);
        assert_eq!(lines, vec!["CREATE TABLE t (", "a INT", "b DECIMAL(10, 2)", ");"]);
    }

    #[test]
    fn test_ddl_multi_line_table() {
        let input = "-- users\nCREATE TABLE users (\n  id INT PRIMARY KEY, # pk\n  name TEXT DEFAULT 'a,b'\n) ENGINE=InnoDB;\n";
        let lines = texts(input, Dialect::Ddl);
        assert_eq!(
            lines,
            vec![
                "CREATE TABLE users (",
                "id INT PRIMARY KEY",
                "name TEXT DEFAULT 'a,b'",
                ") ENGINE=InnoDB;",
            ]
        );
    }

    #[test]
    fn test_ddl_alter_spanning_lines() {
        let input = "ALTER TABLE ONLY public.orders\n    ADD CONSTRAINT fk FOREIGN KEY (user_id) REFERENCES public.users(id);\nSELECT 1;";
        let lines = texts(input, Dialect::Ddl);
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("ALTER TABLE ONLY public.orders ADD CONSTRAINT"));
        assert_eq!(lines[1], "SELECT 1;");
    }

    #[test]
    fn test_ddl_values_not_split() {
        let lines = texts("INSERT INTO t VALUES (1, 2);", Dialect::Ddl);
        assert_eq!(lines, vec!["INSERT INTO t VALUES (1, 2);"]);
    }

    #[test]
    fn test_stray_apostrophe_ends_with_its_line() {
        let lines = texts("Bob's notes\nTable users {\n  id int [pk]\n}", Dialect::TableDefinition);
        assert_eq!(lines, vec!["Bob's notes", "Table users {", "id int [pk]", "}"]);
    }

    #[test]
    fn test_escaped_quote_in_settings() {
        let input = "Table users {\n  id int [pk, note: 'user\\'s id']\n}\nTable posts {\n  id int\n}";
        let lines = texts(input, Dialect::TableDefinition);
        assert_eq!(lines[1], "id int [pk, note: 'user\\'s id']");
        assert_eq!(&lines[2..], &["}", "Table posts {", "id int", "}"]);
    }

    #[test]
    fn test_triple_quoted_note_spans_lines() {
        let input = "Table a {\n  id int [note: '''first\nsecond''']\n  name text\n}";
        let lines = texts(input, Dialect::TableDefinition);
        assert_eq!(lines[1], "id int [note: '''first second''']");
        assert_eq!(lines[2], "name text");
    }

    #[test]
    fn test_ddl_stray_paren_does_not_leak() {
        let input = "SELECT f(1;\nCREATE TABLE users (\n  id INT\n);";
        let lines = texts(input, Dialect::Ddl);
        assert_eq!(lines, vec!["SELECT f(1;", "CREATE TABLE users (", "id INT", ");"]);

        let input = "SELECT f(1\nCREATE TABLE users (\n  id INT\n);";
        let lines = texts(input, Dialect::Ddl);
        assert_eq!(lines[1], "CREATE TABLE users (");
    }

    #[test]
    fn test_ddl_unterminated_quote_outside_body() {
        let input = "INSERT INTO t VALUES ('it\nCREATE TABLE users (\n  id INT\n);";
        let lines = texts(input, Dialect::Ddl);
        assert_eq!(&lines[1..], &["CREATE TABLE users (", "id INT", ");"]);
    }

    #[test]
    fn test_restartable() {
        let input = "CREATE TABLE t (a INT);\nCREATE TABLE u (b INT);";
        let first: Vec<_> = LogicalLines::new(input, Dialect::Ddl).collect();
        let second: Vec<_> = LogicalLines::new(input, Dialect::Ddl).collect();
        assert_eq!(first, second);
    }
}
