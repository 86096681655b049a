// src/git.rs

use crate::error::CommitError;
use chrono::{DateTime, Utc};
use git2::{BranchType, Oid, Repository, Sort};
use std::path::Path;
use tracing::debug;

/// The commit an analysis run is pinned to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedCommit {
    pub commit_id: String,
    /// Commit time, seconds since the epoch
    pub time: i64,
}

/// Find the newest commit on `branch` whose commit time is not after `when`.
pub fn resolve_commit(repo_path: &Path, branch: &str, when: DateTime<Utc>) -> Result<ResolvedCommit, CommitError> {
    let repo = Repository::open(repo_path)?;
    let tip = branch_tip(&repo, branch)?;

    let mut revwalk = repo.revwalk()?;
    revwalk.push(tip)?;
    revwalk.set_sorting(Sort::TIME)?;

    let cutoff = when.timestamp();
    for oid in revwalk {
        let oid = oid?;
        let commit = repo.find_commit(oid)?;
        let time = commit.time().seconds();
        if time <= cutoff {
            debug!(branch, commit = %oid, time, "resolved analysis commit");
            return Ok(ResolvedCommit {
                commit_id: oid.to_string(),
                time,
            });
        }
    }

    Err(CommitError::NoCommitBefore {
        branch: branch.to_string(),
        when: when.to_rfc3339(),
    })
}

fn branch_tip(repo: &Repository, branch: &str) -> Result<Oid, CommitError> {
    if let Ok(local) = repo.find_branch(branch, BranchType::Local) {
        if let Some(oid) = local.get().target() {
            return Ok(oid);
        }
    }
    // Remote branches, tags and raw revspecs
    repo.revparse_single(branch)
        .and_then(|object| object.peel_to_commit())
        .map(|commit| commit.id())
        .map_err(|_| CommitError::BranchNotFound(branch.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use git2::{Signature, Time};
    use std::fs;
    use tempfile::TempDir;

    const FIRST: i64 = 1_600_000_000;
    const SECOND: i64 = 1_700_000_000;

    /// Two commits on `main`, authored at fixed times
    fn create_test_repo() -> Result<(TempDir, Oid, Oid), Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        let repo = Repository::init(dir.path())?;

        let commit_file = |content: &str, time: i64, parents: &[&git2::Commit]| -> Result<Oid, git2::Error> {
            fs::write(dir.path().join("a.txt"), content).map_err(|e| git2::Error::from_str(&e.to_string()))?;
            let mut index = repo.index()?;
            index.add_path(Path::new("a.txt"))?;
            index.write()?;
            let tree = repo.find_tree(index.write_tree()?)?;
            let sig = Signature::new("author1", "author1@mail.com", &Time::new(time, 0))?;
            repo.commit(Some("refs/heads/main"), &sig, &sig, "change", &tree, parents)
        };

        let first = commit_file("one\n", FIRST, &[])?;
        let parent = repo.find_commit(first)?;
        let second = commit_file("one\ntwo\n", SECOND, &[&parent])?;
        Ok((dir, first, second))
    }

    #[test]
    fn test_resolves_branch_head() {
        let (dir, _, second) = create_test_repo().expect("test repo");
        let resolved = resolve_commit(dir.path(), "main", Utc::now()).expect("resolve");
        assert_eq!(resolved.commit_id, second.to_string());
        assert_eq!(resolved.time, SECOND);
    }

    #[test]
    fn test_resolves_commit_before_when() {
        let (dir, first, _) = create_test_repo().expect("test repo");
        let when = Utc.timestamp_opt(FIRST + 3600, 0).unwrap();
        let resolved = resolve_commit(dir.path(), "main", when).expect("resolve");
        assert_eq!(resolved.commit_id, first.to_string());
    }

    #[test]
    fn test_no_commit_before_when() {
        let (dir, _, _) = create_test_repo().expect("test repo");
        let when = Utc.timestamp_opt(FIRST - 1, 0).unwrap();
        let err = resolve_commit(dir.path(), "main", when).unwrap_err();
        assert!(matches!(err, CommitError::NoCommitBefore { .. }));
    }

    #[test]
    fn test_unknown_branch() {
        let (dir, _, _) = create_test_repo().expect("test repo");
        let err = resolve_commit(dir.path(), "does-not-exist", Utc::now()).unwrap_err();
        assert!(matches!(err, CommitError::BranchNotFound(ref b) if b == "does-not-exist"));
    }

    #[test]
    fn test_not_a_repository() {
        let dir = tempfile::tempdir().expect("tempdir");
        let err = resolve_commit(dir.path(), "main", Utc::now()).unwrap_err();
        assert!(matches!(err, CommitError::Git(_)));
    }
}
