use thiserror::Error;

use super::site::SiteId;

/// The resolution was abandoned because its cancellation token fired.
///
/// Distinct from an empty resolution: a cancelled site has no answer yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("method reference resolution was cancelled")]
pub struct Cancelled;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MethodRefError {
    /// The site is detached from its tree or refers to declarations the environment does not
    /// know about. Logged and reported as an empty resolution.
    #[error("invalid method reference site {site:?}: {reason}")]
    InvalidState { site: SiteId, reason: String },
    #[error(transparent)]
    Cancelled(#[from] Cancelled),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RenameError {
    #[error("method reference has no name to rename")]
    MissingName,
    #[error("`{0}` is not a valid Java identifier")]
    InvalidIdentifier(String),
}
