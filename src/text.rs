// src/text.rs

use crate::error::FormatError;
use crate::model::{percent, OwnershipResult};
use std::fmt::Write;

/// Render totals, author clusters and the author ranking.
/// `full` adds line age and duplication figures.
pub fn format_ownership(result: &OwnershipResult, full: bool) -> Result<String, FormatError> {
    let clusters = render_clusters(result)?;
    let mut out = String::new();

    out.push('\n');
    let _ = writeln!(out, "Total authors: {}", result.total_authors);
    let _ = writeln!(out, "Total files: {}", result.total_files);
    if full {
        let _ = writeln!(out, "Avg line age: {} days", result.avg_line_age_days());
        let _ = writeln!(out, "Duplicated lines: {}", result.duplicated_lines);
    }

    out.push_str("Author clusters:\n");
    for line in clusters {
        out.push_str(&line);
        out.push('\n');
    }

    out.push_str("Top authors:\n");
    let owned_total = result.owned_lines_total();
    for stat in result.ranked_authors() {
        let _ = write!(
            out,
            "  {}: {} ({}%)",
            stat.author,
            stat.owned_lines_total,
            percent(stat.owned_lines_total, owned_total)
        );
        if full {
            let _ = write!(
                out,
                " avg-age={}d dup={} ({}%)",
                stat.avg_line_age_days(),
                stat.owned_lines_duplicate,
                percent(stat.owned_lines_duplicate, stat.owned_lines_total)
            );
        }
        out.push('\n');
    }

    Ok(out)
}

/// One line per cluster, members in the order the engine produced them
fn render_clusters(result: &OwnershipResult) -> Result<Vec<String>, FormatError> {
    result
        .author_clusters
        .iter()
        .enumerate()
        .map(|(idx, cluster)| {
            let members = cluster
                .authors
                .iter()
                .map(|identity| match result.find_author(identity) {
                    Some(stat) => Ok(stat.author.to_string()),
                    None => Err(FormatError::UnknownClusterAuthor {
                        cluster: idx + 1,
                        author: identity.clone(),
                    }),
                })
                .collect::<Result<Vec<_>, _>>()?;
            Ok(format!("  [{}] {}", idx + 1, members.join(", ")))
        })
        .collect()
}

/// Render the duplicated line ratio. `full` lists per-author duplicate counters.
pub fn format_duplicates(result: &OwnershipResult, full: bool) -> String {
    let mut out = format!(
        "Duplicated lines: {} ({}%)\n",
        result.duplicated_lines,
        percent(result.duplicated_lines, result.total_lines)
    );

    if full {
        for stat in result.ranked_authors() {
            let _ = writeln!(
                out,
                "  {}: duplicates={} originals={} originals-copied-by-others={}",
                stat.author,
                stat.owned_lines_duplicate,
                stat.owned_lines_duplicate_original,
                stat.owned_lines_duplicate_original_others
            );
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::tests::{stat, three_author_result};
    use crate::model::{AuthorCluster, AuthorIdentity};

    #[test]
    fn test_short_report() {
        let out = format_ownership(&three_author_result(), false).expect("format short");
        assert!(out.contains("\nTotal authors: 3\nTotal files: 2\nAuthor clusters:\n"));
        assert!(out.contains("  [1] author3 <author3@mail.com>, author1 <author1@mail.com>\n"));
        assert!(!out.contains("Avg line age"));
        assert!(!out.contains("avg-age="));
    }

    #[test]
    fn test_full_report() {
        let out = format_ownership(&three_author_result(), true).expect("format full");
        assert!(out.contains("Total authors: 3\nTotal files: 2\nAvg line age: 0 days\nDuplicated lines: 0\n"));
        assert!(out.contains("  author3 <author3@mail.com>: 5 (71%) avg-age=0d dup=0 (0%)\n"));
    }

    #[test]
    fn test_short_report_exact() {
        let expected = "\n\
Total authors: 3\n\
Total files: 2\n\
Author clusters:\n  \
[1] author3 <author3@mail.com>, author1 <author1@mail.com>\n\
Top authors:\n  \
author3 <author3@mail.com>: 5 (71%)\n  \
author1 <author1@mail.com>: 1 (14%)\n  \
author2 <author2@mail.com>: 1 (14%)\n";
        let out = format_ownership(&three_author_result(), false).expect("format short");
        assert_eq!(out, expected);
    }

    #[test]
    fn test_ranking_is_input_order_independent() {
        let mut result = three_author_result();
        let before = format_ownership(&result, true).expect("format");
        result.authors.reverse();
        let after = format_ownership(&result, true).expect("format");
        assert_eq!(before, after);
    }

    #[test]
    fn test_avg_age_rounds() {
        let mut result = three_author_result();
        result.authors[0].owned_lines_age_days_sum = 10.0;
        result.authors[2].owned_lines_age_days_sum = 14.0;
        // 24 days over 7 lines is 3.43
        let out = format_ownership(&result, true).expect("format");
        assert!(out.contains("Avg line age: 3 days\n"));
    }

    #[test]
    fn test_empty_result() {
        let out = format_ownership(&OwnershipResult::default(), true).expect("format empty");
        assert_eq!(
            out,
            "\nTotal authors: 0\nTotal files: 0\nAvg line age: 0 days\nDuplicated lines: 0\nAuthor clusters:\nTop authors:\n"
        );
    }

    #[test]
    fn test_unknown_cluster_author() {
        let mut result = three_author_result();
        result.author_clusters.push(AuthorCluster {
            authors: vec![AuthorIdentity::new("ghost", "ghost@mail.com")],
        });
        let err = format_ownership(&result, false).unwrap_err();
        assert_eq!(
            err,
            FormatError::UnknownClusterAuthor {
                cluster: 2,
                author: AuthorIdentity::new("ghost", "ghost@mail.com"),
            }
        );
    }

    #[test]
    fn test_empty_cluster() {
        let mut result = three_author_result();
        result.author_clusters.insert(0, AuthorCluster::default());
        let out = format_ownership(&result, true).expect("format");
        assert!(out.contains("Author clusters:\n  [1] \n  [2] author3 <author3@mail.com>, author1 <author1@mail.com>\n"));

        let lone = OwnershipResult {
            author_clusters: vec![AuthorCluster::default()],
            ..Default::default()
        };
        let out = format_ownership(&lone, false).expect("format");
        assert_eq!(out, "\nTotal authors: 0\nTotal files: 0\nAuthor clusters:\n  [1] \nTop authors:\n");
    }

    #[test]
    fn test_duplicates_without_duplication() {
        let out = format_duplicates(&three_author_result(), true);
        assert!(out.starts_with("Duplicated lines: 0 (0%)\n"));
    }

    #[test]
    fn test_duplicates_without_lines() {
        let out = format_duplicates(&OwnershipResult::default(), false);
        assert_eq!(out, "Duplicated lines: 0 (0%)\n");
    }

    #[test]
    fn test_duplicates_full() {
        let mut result = three_author_result();
        result.duplicated_lines = 3;
        let mut dup = stat("author4", 5, 0.0);
        dup.owned_lines_duplicate = 3;
        dup.owned_lines_duplicate_original = 1;
        result.authors.push(dup);
        result.authors[2].owned_lines_duplicate_original_others = 2;
        result.total_lines = 12;

        let out = format_duplicates(&result, true);
        let expected = "Duplicated lines: 3 (25%)\n  \
author3 <author3@mail.com>: duplicates=0 originals=0 originals-copied-by-others=2\n  \
author4 <author4@mail.com>: duplicates=3 originals=1 originals-copied-by-others=0\n  \
author1 <author1@mail.com>: duplicates=0 originals=0 originals-copied-by-others=0\n  \
author2 <author2@mail.com>: duplicates=0 originals=0 originals-copied-by-others=0\n";
        assert_eq!(out, expected);

        let short = format_duplicates(&result, false);
        assert_eq!(short, "Duplicated lines: 3 (25%)\n");
    }
}
