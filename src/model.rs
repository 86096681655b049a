// src/model.rs

use serde::{Deserialize, Deserializer, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::path::PathBuf;

/// Uniquely identifies a contributor in the ownership report
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AuthorIdentity {
    pub author_name: String,
    pub author_mail: String,
}

#[cfg(test)]
impl AuthorIdentity {
    pub fn new(name: impl Into<String>, mail: impl Into<String>) -> Self {
        Self {
            author_name: name.into(),
            author_mail: mail.into(),
        }
    }
}

impl fmt::Display for AuthorIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} <{}>", self.author_name, self.author_mail)
    }
}

/// Line ownership counters for a single author
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AuthorStat {
    #[serde(flatten)]
    pub author: AuthorIdentity,
    pub owned_lines_total: u64,
    /// Sum of per-line ages, used to compute averages
    pub owned_lines_age_days_sum: f64,
    pub owned_lines_duplicate: u64,
    /// Lines that are the first-seen copy within a duplicate cluster
    pub owned_lines_duplicate_original: u64,
    /// Copies owned by other authors whose original belongs to this author
    pub owned_lines_duplicate_original_others: u64,
}

impl AuthorStat {
    pub fn avg_line_age_days(&self) -> u64 {
        avg_days(self.owned_lines_age_days_sum, self.owned_lines_total)
    }
}

/// Authors grouped by shared ownership of overlapping code.
/// Computed by the analysis engine, member order is canonical.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AuthorCluster {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub authors: Vec<AuthorIdentity>,
}

/// The complete results of one ownership analysis run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct OwnershipResult {
    pub commit_id: String,
    pub total_files: u64,
    pub total_authors: u64,
    pub total_lines: u64,
    pub duplicated_lines: u64,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub authors: Vec<AuthorStat>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub author_clusters: Vec<AuthorCluster>,
}

/// The engine writes an empty list as `null`
fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

impl OwnershipResult {
    /// Authors by owned lines, most first. Equal counts fall back to
    /// identity order so output never depends on engine ordering.
    pub fn ranked_authors(&self) -> Vec<&AuthorStat> {
        let mut ranked: Vec<&AuthorStat> = self.authors.iter().collect();
        ranked.sort_by(|a, b| rank_order(a, b));
        ranked
    }

    pub fn owned_lines_total(&self) -> u64 {
        self.authors.iter().map(|a| a.owned_lines_total).sum()
    }

    pub fn owned_lines_age_days_sum(&self) -> f64 {
        self.authors.iter().map(|a| a.owned_lines_age_days_sum).sum()
    }

    pub fn avg_line_age_days(&self) -> u64 {
        avg_days(self.owned_lines_age_days_sum(), self.owned_lines_total())
    }

    pub fn find_author(&self, identity: &AuthorIdentity) -> Option<&AuthorStat> {
        self.authors.iter().find(|a| &a.author == identity)
    }
}

fn rank_order(a: &AuthorStat, b: &AuthorStat) -> Ordering {
    b.owned_lines_total
        .cmp(&a.owned_lines_total)
        .then_with(|| a.author.cmp(&b.author))
}

fn avg_days(age_days_sum: f64, lines: u64) -> u64 {
    if lines == 0 {
        return 0;
    }
    (age_days_sum / lines as f64).round().max(0.0) as u64
}

/// Rounded percentage of `part` in `whole`, zero when `whole` is zero
pub fn percent(part: u64, whole: u64) -> u64 {
    if whole == 0 {
        return 0;
    }
    (100.0 * part as f64 / whole as f64).round() as u64
}

/// Options the analysis was run with. Built once from the command line,
/// then only read: the engine checks the commit pin and the graph view echoes them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct OwnershipOptions {
    pub repo_dir: PathBuf,
    pub branch: String,
    pub commit_id: String,
    pub files_regex: String,
    pub files_not_regex: String,
    pub authors_regex: String,
    pub authors_not_regex: String,
    pub min_duplicate_lines: u32,
}
