// src/csv.rs

use crate::error::EncodingError;
use crate::model::{AuthorStat, OwnershipResult};
use std::fmt::Write;

pub const DELIMITER: char = ';';

pub const HEADER: [&str; 7] = [
    "AuthorName",
    "AuthorMail",
    "OwnedLinesTotal",
    "OwnedLinesAgeDaysSum",
    "OwnedLinesDuplicate",
    "OwnedLinesDuplicateOriginal",
    "OwnedLinesDuplicateOriginalOthers",
];

/// One row per author, in ranking order. The schema is fixed and unquoted:
/// external tools parse it, so header text and column order must not change.
pub fn format_ownership_csv(result: &OwnershipResult) -> Result<String, EncodingError> {
    let mut out = HEADER.join(";");
    out.push('\n');

    for stat in result.ranked_authors() {
        check_field("AuthorName", &stat.author.author_name, stat)?;
        check_field("AuthorMail", &stat.author.author_mail, stat)?;
        let _ = writeln!(
            out,
            "{};<{}>;{};{:.2};{};{};{}",
            stat.author.author_name,
            stat.author.author_mail,
            stat.owned_lines_total,
            stat.owned_lines_age_days_sum,
            stat.owned_lines_duplicate,
            stat.owned_lines_duplicate_original,
            stat.owned_lines_duplicate_original_others
        );
    }

    Ok(out)
}

fn check_field(field: &'static str, value: &str, stat: &AuthorStat) -> Result<(), EncodingError> {
    if value.contains(&[DELIMITER, '\n', '\r'][..]) {
        return Err(EncodingError::DelimiterInField {
            field,
            author: stat.author.clone(),
        });
    }
    Ok(())
}
