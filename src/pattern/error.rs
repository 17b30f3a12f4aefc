// Wed Oct 14 2026 - Alex

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PatternError {
    #[error("Invalid pattern token '{0}'")]
    InvalidToken(String),
    #[error("Pattern is empty")]
    Empty,
    #[error("Pattern has no significant bytes")]
    AllWildcards,
}
