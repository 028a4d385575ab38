//! Sequential document numbers such as `INV-2025-0007`.

use sqlx::{Executor, Sqlite};

use super::line_item::DocumentKind;

impl DocumentKind {
    pub fn number_prefix(self) -> &'static str {
        match self {
            DocumentKind::Invoice => "INV",
            DocumentKind::Estimate => "EST",
        }
    }
}

/// Longest numeric suffix a hand-entered number in the generated form may carry.
pub const MAX_SEQUENCE_DIGITS: usize = 9;

/// True for numbers like `INV-2025-0000000001` whose numeric suffix is longer
/// than [`MAX_SEQUENCE_DIGITS`]; they would exhaust the yearly sequence.
pub fn is_oversized_sequence(kind: DocumentKind, number: &str) -> bool {
    let Some(rest) = number
        .strip_prefix(kind.number_prefix())
        .and_then(|rest| rest.strip_prefix('-'))
    else {
        return false;
    };
    let Some((year, suffix)) = rest.split_once('-') else {
        return false;
    };
    let all_digits = |s: &str| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit());
    all_digits(year) && all_digits(suffix) && suffix.len() > MAX_SEQUENCE_DIGITS
}

/// Number following `last` within `prefix` (e.g. `INV-2025-`), or `None`
/// once the numeric suffix cannot be incremented.
pub fn next_in_sequence(prefix: &str, last: Option<&str>) -> Option<String> {
    let next = match last.and_then(|number| number.strip_prefix(prefix)) {
        Some(suffix) if !suffix.is_empty() && suffix.bytes().all(|b| b.is_ascii_digit()) => {
            suffix.parse::<u64>().ok()?.checked_add(1)?
        }
        _ => 1,
    };
    Some(format!("{prefix}{next:04}"))
}

/// Next free number for `kind` in `year`; `None` when the sequence is exhausted.
pub async fn next_number<'e, E>(executor: E, kind: DocumentKind, year: i32) -> Result<Option<String>, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    let prefix = format!("{}-{}-", kind.number_prefix(), year);
    // Only purely numeric suffixes count; longer ones sort first so 10000 beats 9999
    let sql = format!(
        r#"SELECT number FROM {}
           WHERE number LIKE $1
             AND substr(number, $2) <> ''
             AND substr(number, $2) NOT GLOB '*[^0-9]*'
           ORDER BY length(number) DESC, number DESC
           LIMIT 1"#,
        kind.documents_table()
    );
    let last: Option<String> = sqlx::query_scalar(&sql)
        .bind(format!("{prefix}%"))
        .bind(prefix.len() as i64 + 1)
        .fetch_optional(executor)
        .await?;
    Ok(next_in_sequence(&prefix, last.as_deref()))
}
