//! Shared error type.
//!
//! Raised by lookups and by parsing of shared settings.  `tb-train` wraps
//! it as one variant of its own error via `#[from]`.

use thiserror::Error;

use crate::CarId;

/// The top-level error type for `tb-core` and a common base for sub-crates.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("car {0} not found")]
    CarNotFound(CarId),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("parse error: {0}")]
    Parse(String),
}

/// Shorthand result type for `tb-core`.
pub type CoreResult<T> = Result<T, CoreError>;
