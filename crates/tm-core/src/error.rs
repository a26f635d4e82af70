//! Framework error type.
//!
//! Sub-crates define their own error enums and wrap `CoreError` as one
//! variant where they need it.

use thiserror::Error;

/// The base error type shared by `tm-*` crates.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("configuration error: {0}")]
    Config(String),
}

/// Shorthand result type for `tm-core`.
pub type CoreResult<T> = Result<T, CoreError>;
