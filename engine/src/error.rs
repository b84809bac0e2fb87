//! Error types for the Grove engine.

use crate::{ContainerId, ProjectId, PullRequestId, SnippetId, UserId, VersionId};
use thiserror::Error;

/// All possible errors from the Grove engine.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    // Access errors
    #[error("user '{user}' is not a member of project {project}")]
    Forbidden { project: ProjectId, user: UserId },

    #[error("version {version} is not accessible in project {project}")]
    ForeignVersion {
        project: ProjectId,
        version: VersionId,
    },

    #[error("users cannot change their own membership in project {0}")]
    OwnMembership(ProjectId),

    // Lookup errors
    #[error("container not found: {0}")]
    ContainerNotFound(ContainerId),

    #[error("snippet not found: {0}")]
    SnippetNotFound(SnippetId),

    #[error("pull request not found: {0}")]
    PullRequestNotFound(PullRequestId),

    #[error("container {container} is not part of version {version}")]
    ContainerNotInVersion {
        container: ContainerId,
        version: VersionId,
    },

    #[error("snippet {snippet} is not part of version {version}")]
    SnippetNotInVersion {
        snippet: SnippetId,
        version: VersionId,
    },

    // State errors
    #[error("version is committed: {0}")]
    VersionCommitted(VersionId),

    #[error("container is not empty: {0}")]
    ContainerNotEmpty(ContainerId),

    #[error("container {container} cannot hold new nodes in version {version}: it is not part of that version")]
    DetachedContainer {
        container: ContainerId,
        version: VersionId,
    },

    #[error("version {0} cannot be its own merge parent")]
    SelfMerge(VersionId),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    // Store errors
    #[error("store rejected change set: {0}")]
    Store(String),

    #[error("invalid snapshot: {0}")]
    InvalidSnapshot(String),
}

/// Coarse classification used by callers to pick a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Requester is not allowed to see or touch the target
    Forbidden,
    /// The request is well-formed but the current state rejects it
    InvalidState,
    /// A referenced row does not exist, or is not part of the target version
    NotFound,
    /// The store failed or refused a change set
    StoreFailure,
}

impl Error {
    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Forbidden { .. } | Error::ForeignVersion { .. } | Error::OwnMembership(_) => {
                ErrorKind::Forbidden
            }
            Error::ContainerNotFound(_)
            | Error::SnippetNotFound(_)
            | Error::PullRequestNotFound(_)
            | Error::ContainerNotInVersion { .. }
            | Error::SnippetNotInVersion { .. } => ErrorKind::NotFound,
            Error::VersionCommitted(_)
            | Error::ContainerNotEmpty(_)
            | Error::DetachedContainer { .. }
            | Error::SelfMerge(_)
            | Error::InvalidInput(_) => ErrorKind::InvalidState,
            Error::Store(_) | Error::InvalidSnapshot(_) => ErrorKind::StoreFailure,
        }
    }
}

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, Error>;
