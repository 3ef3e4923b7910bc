use regex::{Captures, Regex};
use std::sync::LazyLock;
use tracing::{debug, warn};

/// Statement keywords a cleaned query may start with.
pub const ALLOWED_KEYWORDS: [&str; 6] = ["SELECT", "WITH", "CREATE", "INSERT", "UPDATE", "DELETE"];

static FENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)```([a-z]*)(\r?\n|$)?").expect("valid fence pattern"));

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CleanedSql {
    pub sql: String,
    /// Whether `sql` starts with one of `ALLOWED_KEYWORDS`.
    pub valid: bool,
}

/// True when the first word of `text` is an allowed statement keyword.
pub fn starts_with_keyword(text: &str) -> bool {
    let first_word: String = text
        .trim_start()
        .chars()
        .take_while(|c| c.is_ascii_alphabetic())
        .collect();
    let first_word = first_word.to_ascii_uppercase();
    ALLOWED_KEYWORDS.contains(&first_word.as_str())
}

pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Drops code fences and their language tag. A statement keyword written straight
/// after the fence is kept.
fn strip_fences(text: &str) -> String {
    FENCE
        .replace_all(text, |caps: &Captures| {
            let tag = &caps[1];
            let line_end = caps.get(2).map(|m| m.as_str());
            let language_tag =
                tag.is_empty() || tag.eq_ignore_ascii_case("sql") || line_end.is_some();
            if language_tag && !starts_with_keyword(tag) {
                line_end.unwrap_or("").to_string()
            } else {
                caps[0][3..].to_string()
            }
        })
        .into_owned()
}

/// Turns raw model output into a single SQL statement.
pub fn clean_model_output(raw: &str) -> CleanedSql {
    let stripped = strip_fences(raw.trim()).replace('`', "");
    let mut sql = collapse_whitespace(&stripped);

    // Some models prefix the answer with the dialect name
    if sql.to_ascii_lowercase().starts_with("bigquery") {
        if let Some(pos) = sql.to_ascii_lowercase().find("select") {
            sql = sql[pos..].to_string();
        }
    }

    if starts_with_keyword(&sql) {
        return CleanedSql { sql, valid: true };
    }

    if let Some(statement) = scan_for_statement(&stripped) {
        debug!("Recovered SQL by line scanning: {}", statement);
        return CleanedSql {
            sql: statement,
            valid: true,
        };
    }

    warn!("Model output does not look like SQL: {}", sql);
    CleanedSql { sql, valid: false }
}

/// Finds the first line opening a statement and collects it up to the terminating `;`.
fn scan_for_statement(text: &str) -> Option<String> {
    let lines: Vec<&str> = text.lines().collect();
    let start = lines.iter().position(|line| starts_with_keyword(line))?;

    let mut statement = Vec::new();
    for line in &lines[start..] {
        let line = line.trim();
        statement.push(line);
        if line.ends_with(';') {
            break;
        }
    }

    Some(collapse_whitespace(&statement.join(" ")))
}
