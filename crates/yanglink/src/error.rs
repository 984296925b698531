//! Error types for yanglink operations.
//!
//! [`YanglinkError`] wraps everything a [`Linker`](crate::Linker) call can
//! fail with. Link failures keep their full [`LinkError`], so every
//! diagnostic collected in batch mode stays reachable.

use std::io;

use thiserror::Error;

use yanglink_resolve::LinkError;

/// The main error type for yanglink operations.
#[derive(Debug, Error)]
pub enum YanglinkError {
    #[error("link error: {0}")]
    Link(#[from] LinkError),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl YanglinkError {
    /// The link diagnostics, if this is a link failure.
    pub fn as_link_error(&self) -> Option<&LinkError> {
        match self {
            Self::Link(err) => Some(err),
            _ => None,
        }
    }
}
