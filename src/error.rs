// src/error.rs

use crate::model::AuthorIdentity;
use std::net::SocketAddr;
use std::path::PathBuf;
use thiserror::Error;

/// The result structure is internally inconsistent
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FormatError {
    #[error("author cluster {cluster} references unknown author {author}")]
    UnknownClusterAuthor { cluster: usize, author: AuthorIdentity },
}

/// A CSV field cannot be written under the fixed, unquoted schema
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EncodingError {
    #[error("field {field} of author {author} contains a delimiter or line break")]
    DelimiterInField {
        field: &'static str,
        author: AuthorIdentity,
    },
}

#[derive(Error, Debug)]
pub enum ServeError {
    #[error("couldn't bind graph server to {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Format(#[from] FormatError),

    #[error("couldn't render graph data: {0}")]
    Render(#[from] serde_json::Error),
}

/// Errors reported at the boundary to the analysis engine
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("couldn't read analysis result {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed analysis result: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("author {0} appears more than once in the analysis result")]
    DuplicateAuthor(AuthorIdentity),

    #[error("analysis result is pinned to commit {found}, expected {expected}")]
    CommitMismatch { expected: String, found: String },
}

#[derive(Error, Debug)]
pub enum CommitError {
    #[error("branch {0} not found")]
    BranchNotFound(String),

    #[error("branch {branch} has no commit before {when}")]
    NoCommitBefore { branch: String, when: String },

    #[error("git error: {0}")]
    Git(#[from] git2::Error),
}

/// Failures surfaced by the command line, each with its exit code
#[derive(Error, Debug)]
pub enum CliError {
    #[error("Couldn't resolve analysis commit. err={0}")]
    Commit(#[from] CommitError),

    #[error("Failed to perform ownership analysis. err={0}")]
    Engine(#[from] EngineError),

    #[error("Couldn't format results. err={0}")]
    Format(#[from] FormatError),

    #[error("Couldn't format results as CSV. err={0}")]
    Encoding(#[from] EncodingError),

    #[error("Couldn't serve graph. err={0}")]
    Serve(#[from] ServeError),

    #[error("Couldn't start graph server runtime. err={0}")]
    Runtime(#[source] std::io::Error),
}

impl CliError {
    pub fn exit_code(&self) -> u8 {
        match self {
            CliError::Commit(_) => 1,
            CliError::Engine(_) => 2,
            CliError::Format(_) | CliError::Encoding(_) => 3,
            CliError::Serve(_) | CliError::Runtime(_) => 4,
        }
    }
}
