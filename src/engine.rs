// src/engine.rs

use crate::error::EngineError;
use crate::model::{OwnershipOptions, OwnershipResult};
use std::collections::HashSet;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Produces one ownership result per analysis run. Blame traversal, duplicate
/// detection and line ages happen on the engine side.
pub trait OwnershipEngine {
    fn analyse(&self, options: &OwnershipOptions) -> Result<OwnershipResult, EngineError>;
}

/// Reads a result the engine exported as JSON. A path of `-` reads stdin.
#[derive(Debug, Clone)]
pub struct ResultFileEngine {
    path: PathBuf,
}

impl ResultFileEngine {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn read_source(&self) -> Result<String, EngineError> {
        let read_err = |source: std::io::Error| EngineError::Read {
            path: self.path.clone(),
            source,
        };
        if self.path == Path::new("-") {
            let mut buf = String::new();
            std::io::stdin().read_to_string(&mut buf).map_err(read_err)?;
            Ok(buf)
        } else {
            std::fs::read_to_string(&self.path).map_err(read_err)
        }
    }
}

impl OwnershipEngine for ResultFileEngine {
    fn analyse(&self, options: &OwnershipOptions) -> Result<OwnershipResult, EngineError> {
        debug!(path = %self.path.display(), "loading analysis result");
        let result = parse_result(&self.read_source()?, options)?;
        info!(
            commit = %result.commit_id,
            authors = result.authors.len(),
            clusters = result.author_clusters.len(),
            "analysis result loaded"
        );
        Ok(result)
    }
}

/// Parse and check the engine's output against the options of this run
pub fn parse_result(json: &str, options: &OwnershipOptions) -> Result<OwnershipResult, EngineError> {
    let result: OwnershipResult = serde_json::from_str(json)?;

    let mut seen = HashSet::new();
    for stat in &result.authors {
        if !seen.insert(&stat.author) {
            return Err(EngineError::DuplicateAuthor(stat.author.clone()));
        }
    }

    if !options.commit_id.is_empty() && !result.commit_id.is_empty() && options.commit_id != result.commit_id {
        return Err(EngineError::CommitMismatch {
            expected: options.commit_id.clone(),
            found: result.commit_id.clone(),
        });
    }

    Ok(result)
}
