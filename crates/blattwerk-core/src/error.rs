// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for Blattwerk.

use thiserror::Error;

/// Top-level error type for all Blattwerk operations.
#[derive(Debug, Error)]
pub enum BlattwerkError {
    // -- Document errors --
    #[error("document could not be loaded: {0}")]
    DocumentLoad(String),

    #[error("image could not be decoded: {0}")]
    ImageDecode(String),

    #[error("PDF could not be written: {0}")]
    PdfWrite(String),

    // -- User input --
    #[error("invalid input: {0}")]
    Validation(String),

    #[error("an export is already running for this document")]
    AssemblyInProgress,

    // -- Remote backend --
    #[error("remote operation failed: {0}")]
    RemoteOperation(String),

    #[error("remote backend unreachable (unknown error): {0}")]
    RemoteUnavailable(String),

    // -- Storage / persistence --
    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl BlattwerkError {
    /// Shorthand for building a [`BlattwerkError::Validation`].
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, BlattwerkError>;
