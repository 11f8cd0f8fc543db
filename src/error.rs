//! Error types.
//!
//! Malformed Markdown is never an error: every construct degrades to literal
//! text or a plain paragraph. The variants here cover the few conditions that
//! really are fatal or that belong to configuration.

use thiserror::Error;

/// Errors surfaced by parsing, configuration, and rendering.
#[derive(Debug, Error)]
pub enum Error {
    /// The node arena hit its ceiling. The parse is aborted and no partial
    /// tree is returned.
    #[error("node arena exhausted: limit of {limit} nodes reached")]
    ArenaExhausted {
        /// The configured ceiling.
        limit: usize,
    },

    /// The options requested an extension the registry does not know.
    #[error("unknown extension: {0}")]
    UnknownExtension(String),

    /// An extension with the same name is already registered.
    #[error("extension already registered: {0}")]
    DuplicateExtension(String),

    /// Writing to the output sink failed.
    #[error("failed to write rendered output")]
    Format(#[from] std::fmt::Error),
}

/// Result alias used throughout the crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;
