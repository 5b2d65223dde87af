//! Lightweight SQL text inspection used by transformers and observers.

use std::borrow::Cow;

/// The kind of SQL operation a query performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueryType {
    /// SELECT query
    Select,
    /// INSERT statement
    Insert,
    /// UPDATE statement
    Update,
    /// DELETE statement
    Delete,
    /// Stored procedure call (`CALL`, `EXEC`, or a `{call ...}` escape)
    Call,
    /// Anything else (DDL, session commands, ...)
    Other,
}

impl QueryType {
    /// Detect query type from SQL string.
    ///
    /// Leading whitespace, comments, parentheses and call escapes are skipped.
    /// For CTEs (`WITH ...`), looks past the CTE definitions to find the DML
    /// keyword.
    pub fn from_sql(sql: &str) -> Self {
        let trimmed = strip_sql_prefix(sql);
        if starts_with_keyword(trimmed, "SELECT") {
            QueryType::Select
        } else if starts_with_keyword(trimmed, "INSERT") {
            QueryType::Insert
        } else if starts_with_keyword(trimmed, "UPDATE") {
            QueryType::Update
        } else if starts_with_keyword(trimmed, "DELETE") {
            QueryType::Delete
        } else if starts_with_keyword(trimmed, "WITH") {
            Self::detect_cte_dml(trimmed)
        } else if ["CALL", "EXEC", "EXECUTE"]
            .iter()
            .any(|keyword| starts_with_keyword(trimmed, keyword))
        {
            QueryType::Call
        } else {
            QueryType::Other
        }
    }

    /// Find the statement following the last top-level parenthesised CTE body.
    fn detect_cte_dml(sql: &str) -> Self {
        let mut depth: i32 = 0;
        let mut last_top_level = 0;
        let bytes = sql.as_bytes();
        let mut i = 0;
        while i < bytes.len() {
            match bytes[i] {
                b'(' => depth += 1,
                b')' => {
                    depth -= 1;
                    if depth == 0 {
                        last_top_level = i + 1;
                    }
                }
                b'\'' => {
                    i += 1;
                    while i < bytes.len() {
                        if bytes[i] == b'\'' {
                            if i + 1 < bytes.len() && bytes[i + 1] == b'\'' {
                                i += 1;
                            } else {
                                break;
                            }
                        }
                        i += 1;
                    }
                }
                _ => {}
            }
            i += 1;
        }

        let remainder = sql[last_top_level..].trim_start();
        if starts_with_keyword(remainder, "INSERT") {
            QueryType::Insert
        } else if starts_with_keyword(remainder, "UPDATE") {
            QueryType::Update
        } else if starts_with_keyword(remainder, "DELETE") {
            QueryType::Delete
        } else {
            QueryType::Select
        }
    }
}

/// Skip leading whitespace, `--` and `/* */` comments, opening parentheses,
/// and the `{call ...}` / `{? = call ...}` escape used by callable statements,
/// returning the text from the first keyword on.
pub(crate) fn strip_sql_prefix(sql: &str) -> &str {
    let mut s = sql;
    loop {
        let before = s;
        s = s.trim_start();
        if s.starts_with("--") {
            match s.find('\n') {
                Some(pos) => {
                    s = &s[pos + 1..];
                    continue;
                }
                None => return "",
            }
        }
        if s.starts_with("/*") {
            match s.find("*/") {
                Some(pos) => {
                    s = &s[pos + 2..];
                    continue;
                }
                None => return "",
            }
        }
        if let Some(rest) = s.strip_prefix('{') {
            s = skip_return_slot(rest);
            continue;
        }
        if let Some(rest) = s.strip_prefix('(') {
            s = rest;
            continue;
        }
        if s == before {
            return s;
        }
    }
}

/// Skip the `? =` OUT slot that may open a call escape.
fn skip_return_slot(escape_body: &str) -> &str {
    let body = escape_body.trim_start();
    body.strip_prefix('?')
        .map(str::trim_start)
        .and_then(|rest| rest.strip_prefix('='))
        .unwrap_or(body)
}

/// Case-insensitive keyword match that does not accept a longer identifier
/// (`CALLS` is not `CALL`).
pub(crate) fn starts_with_keyword(s: &str, keyword: &str) -> bool {
    let Some(prefix) = s.get(0..keyword.len()) else {
        return false;
    };
    prefix.eq_ignore_ascii_case(keyword)
        && !s[keyword.len()..]
            .chars()
            .next()
            .is_some_and(|c| c.is_alphanumeric() || c == '_')
}

/// Shorten `sql` to at most `max_bytes` on a char boundary, marking the cut
/// with `...`. Text that already fits is borrowed as is.
pub(crate) fn abbreviate_sql(sql: &str, max_bytes: usize) -> Cow<'_, str> {
    if sql.len() <= max_bytes {
        return Cow::Borrowed(sql);
    }
    let mut end = max_bytes;
    while end > 0 && !sql.is_char_boundary(end) {
        end -= 1;
    }
    Cow::Owned(format!("{}...", &sql[..end]))
}
