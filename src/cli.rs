// src/cli.rs

use crate::model::OwnershipOptions;
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use clap::{Args, Parser, Subcommand};
use std::net::{IpAddr, Ipv4Addr};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Show verbose logs during processing
    #[arg(long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Lines owned per author, author clusters and line age
    Ownership(OwnershipArgs),
    /// Duplicated lines and who owns the originals
    Duplicates(DuplicatesArgs),
}

/// Parameters of the analysis run, shared by all reports
#[derive(Args, Debug)]
pub struct AnalysisArgs {
    /// Repository path to analyse
    #[arg(long, default_value = ".")]
    pub repo: PathBuf,

    /// Branch name to analyse
    #[arg(long, default_value = "main")]
    pub branch: String,

    /// Date to do analysis in repo: 'now', YYYY-MM-DD or an RFC 3339 timestamp
    #[arg(long, default_value = "now", value_parser = parse_when)]
    pub when: DateTime<Utc>,

    /// Regex for selecting which file paths to include in analysis
    #[arg(long = "files", default_value = ".*")]
    pub files_regex: String,

    /// Regex for filtering out files from analysis
    #[arg(long = "files-not", default_value_t = String::new())]
    pub files_not_regex: String,

    /// Regex for selecting which authors to include in analysis
    #[arg(long = "authors", default_value = ".*")]
    pub authors_regex: String,

    /// Regex for filtering out authors from analysis
    #[arg(long = "authors-not", default_value_t = String::new())]
    pub authors_not_regex: String,

    /// Min number of similar lines in a row to be considered a duplicate
    #[arg(long = "min-dup-lines", default_value_t = 4)]
    pub min_duplicate_lines: u32,

    /// Analysis result exported by the ownership engine ('-' reads stdin)
    #[arg(long, env = "GIT_OWNERSHIP_RESULT")]
    pub result: PathBuf,
}

impl AnalysisArgs {
    /// Fold the flags into the options of a run pinned to `commit_id`
    pub fn to_options(&self, commit_id: String) -> OwnershipOptions {
        OwnershipOptions {
            repo_dir: self.repo.clone(),
            branch: self.branch.clone(),
            commit_id,
            files_regex: self.files_regex.clone(),
            files_not_regex: self.files_not_regex.clone(),
            authors_regex: self.authors_regex.clone(),
            authors_not_regex: self.authors_not_regex.clone(),
            min_duplicate_lines: self.min_duplicate_lines,
        }
    }
}

#[derive(Args, Debug)]
pub struct OwnershipArgs {
    #[command(flatten)]
    pub analysis: AnalysisArgs,

    /// Output format
    #[arg(long, value_enum, default_value_t = OwnershipFormat::Full)]
    pub format: OwnershipFormat,

    /// Address the graph server binds to
    #[arg(long, default_value_t = IpAddr::V4(Ipv4Addr::LOCALHOST))]
    pub host: IpAddr,

    /// Port for the graph server, 0 picks a free one
    #[arg(long, env = "GIT_OWNERSHIP_PORT", default_value_t = 0)]
    pub port: u16,
}

#[derive(Args, Debug)]
pub struct DuplicatesArgs {
    #[command(flatten)]
    pub analysis: AnalysisArgs,

    /// Output format
    #[arg(long, value_enum, default_value_t = DuplicatesFormat::Full)]
    pub format: DuplicatesFormat,
}

#[derive(clap::ValueEnum, Clone, Debug, Copy, PartialEq, Eq)]
pub enum OwnershipFormat {
    /// Totals, line age, duplication and the author ranking
    Full,
    /// Totals, author clusters and lines per author
    Short,
    /// Serve an interactive graph over HTTP
    Graph,
    /// Semicolon-delimited export, one row per author
    Csv,
}

#[derive(clap::ValueEnum, Clone, Debug, Copy, PartialEq, Eq)]
pub enum DuplicatesFormat {
    /// Duplication ratio plus per-author counters
    Full,
    /// Duplication ratio only
    Short,
}

/// Parse `--when`. A bare date means the end of that day in UTC.
fn parse_when(s: &str) -> Result<DateTime<Utc>, String> {
    if s.eq_ignore_ascii_case("now") {
        return Ok(Utc::now());
    }
    if let Ok(ts) = DateTime::parse_from_rfc3339(s) {
        return Ok(ts.with_timezone(&Utc));
    }
    if let Some(end_of_day) = NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(23, 59, 59))
    {
        return Ok(Utc.from_utc_datetime(&end_of_day));
    }
    Err(format!("'{}' is not 'now', a YYYY-MM-DD date or an RFC 3339 timestamp", s))
}
