// Read-only statement guard
//
// A lexical check run before anything is sent to the database. Queries are
// additionally executed inside READ ONLY transactions.

use toolhost_core::ToolError;

/// Keywords a read-only statement may start with
const READ_ONLY_LEADERS: &[&str] = &["SELECT", "WITH", "SHOW", "EXPLAIN", "VALUES", "TABLE"];

/// Keywords that may modify data or schema anywhere in a statement
const WRITE_KEYWORDS: &[&str] = &[
    "INSERT", "UPDATE", "DELETE", "DROP", "ALTER", "CREATE", "TRUNCATE", "GRANT", "REVOKE",
    "MERGE", "COPY", "CALL", "DO", "VACUUM", "REINDEX", "CLUSTER", "LOCK", "COMMENT", "INTO",
];

const REJECTED: &str = "Only read-only queries are allowed";

/// Reject anything that is not a single read-only statement
pub fn ensure_read_only(sql: &str) -> Result<(), ToolError> {
    let scan = scan(sql)?;

    let Some(first) = scan.words.first() else {
        return Err(ToolError::ReadOnlyViolation(format!("{}: empty statement", REJECTED)));
    };

    if scan.statements > 1 {
        return Err(ToolError::ReadOnlyViolation(format!(
            "{}: multiple statements are not permitted",
            REJECTED
        )));
    }

    if !READ_ONLY_LEADERS.contains(&first.as_str()) {
        return Err(ToolError::ReadOnlyViolation(format!(
            "{}: statement starts with {}",
            REJECTED, first
        )));
    }

    if let Some(keyword) = scan
        .words
        .iter()
        .find(|w| WRITE_KEYWORDS.contains(&w.as_str()))
    {
        return Err(ToolError::ReadOnlyViolation(format!(
            "{}: found {}",
            REJECTED, keyword
        )));
    }

    Ok(())
}

#[derive(Debug, Default)]
struct Scan {
    /// Bare words outside literals and comments, upper-cased
    words: Vec<String>,
    /// Non-empty statements separated by `;`
    statements: usize,
}

fn unterminated(what: &str) -> ToolError {
    ToolError::ReadOnlyViolation(format!("{}: unterminated {}", REJECTED, what))
}

fn scan(sql: &str) -> Result<Scan, ToolError> {
    let chars: Vec<char> = sql.chars().collect();
    let len = chars.len();
    let mut scan = Scan::default();
    let mut in_statement = false;
    let mut i = 0;

    while i < len {
        let c = chars[i];
        let next = chars.get(i + 1).copied();

        match c {
            '-' if next == Some('-') => {
                while i < len && chars[i] != '\n' {
                    i += 1;
                }
            }
            '/' if next == Some('*') => {
                i += 2;
                loop {
                    if i + 1 >= len {
                        return Err(unterminated("comment"));
                    }
                    if chars[i] == '*' && chars[i + 1] == '/' {
                        i += 2;
                        break;
                    }
                    i += 1;
                }
            }
            '\'' | '"' => {
                let backslash_escapes = c == '\'' && is_escape_prefix(&chars, i);
                i += 1;
                loop {
                    if i >= len {
                        return Err(unterminated("quoted text"));
                    }
                    if backslash_escapes && chars[i] == '\\' {
                        i += 2;
                        continue;
                    }
                    if chars[i] == c {
                        // doubled quote is an escaped quote
                        if chars.get(i + 1) == Some(&c) {
                            i += 2;
                            continue;
                        }
                        i += 1;
                        break;
                    }
                    i += 1;
                }
                in_statement = true;
            }
            '$' => {
                in_statement = true;
                match dollar_tag(&chars, i) {
                    Some(tag) => {
                        let body_start = i + tag.len();
                        i = find_tag(&chars, body_start, &tag)
                            .ok_or_else(|| unterminated("dollar-quoted text"))?;
                    }
                    None => i += 1,
                }
            }
            ';' => {
                if in_statement {
                    scan.statements += 1;
                    in_statement = false;
                }
                i += 1;
            }
            c if c.is_alphabetic() || c == '_' => {
                let start = i;
                while i < len && (chars[i].is_alphanumeric() || chars[i] == '_' || chars[i] == '$') {
                    i += 1;
                }
                let word: String = chars[start..i].iter().collect();
                scan.words.push(word.to_uppercase());
                in_statement = true;
            }
            c if c.is_whitespace() => i += 1,
            _ => {
                in_statement = true;
                i += 1;
            }
        }
    }

    if in_statement {
        scan.statements += 1;
    }
    Ok(scan)
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '$'
}

/// Whether the quote at `quote` opens an `E'...'` string, where `\` escapes
fn is_escape_prefix(chars: &[char], quote: usize) -> bool {
    match quote.checked_sub(1).map(|p| chars[p]) {
        Some('e' | 'E') => quote < 2 || !is_ident_char(chars[quote - 2]),
        _ => false,
    }
}

/// `$tag$` opening at `start`, if any (positional parameters like `$1` are not tags)
fn dollar_tag(chars: &[char], start: usize) -> Option<Vec<char>> {
    let mut end = start + 1;
    while end < chars.len() && (chars[end].is_alphanumeric() || chars[end] == '_') {
        end += 1;
    }
    if end >= chars.len() || chars[end] != '$' {
        return None;
    }
    if chars.get(start + 1).is_some_and(|c| c.is_ascii_digit()) {
        return None;
    }
    Some(chars[start..=end].to_vec())
}

/// Index just past the closing `tag`, searching from `from`
fn find_tag(chars: &[char], from: usize, tag: &[char]) -> Option<usize> {
    (from..=chars.len().checked_sub(tag.len())?)
        .find(|&i| chars[i..i + tag.len()] == *tag)
        .map(|i| i + tag.len())
}
