// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Error types for the shell layer

use std::fmt;

use thiserror::Error;

use crate::driver::DriverError;

/// Result type alias for shell operations
pub type ShellResult<T> = std::result::Result<T, ShellError>;

/// Main error type for shell operations
#[derive(Error, Debug)]
pub enum ShellError {
    /// Wrong connection or transaction state, or a malformed shell command
    #[error("{0}")]
    Command(String),

    /// Failure reported by the driver
    #[error("{0}")]
    Transport(TransportError),

    /// Execution was cancelled by an interrupt
    #[error("Execution interrupted")]
    Interrupted,

    /// The input stream is exhausted
    #[error("No more input")]
    NoMoreInput,

    /// A command asked the shell to terminate with the given code
    #[error("Exit requested with code {0}")]
    Exit(i32),

    /// Line editor errors
    #[error("Line editor error: {0}")]
    Readline(#[from] rustyline::error::ReadlineError),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ShellError {
    pub fn command<S: Into<String>>(message: S) -> Self {
        ShellError::Command(message.into())
    }

    /// Server-side error code, when the failure carries one
    pub fn code(&self) -> Option<&str> {
        match self {
            ShellError::Transport(err) => err.source.code(),
            _ => None,
        }
    }

    /// Secondary failures recorded while rolling back after this error
    pub fn suppressed(&self) -> &[DriverError] {
        match self {
            ShellError::Transport(err) => &err.suppressed,
            _ => &[],
        }
    }
}

impl From<DriverError> for ShellError {
    fn from(err: DriverError) -> Self {
        match err {
            DriverError::Interrupted => ShellError::Interrupted,
            other => ShellError::Transport(TransportError::new(other)),
        }
    }
}

impl From<TransportError> for ShellError {
    fn from(err: TransportError) -> Self {
        if err.suppressed.is_empty() {
            ShellError::from(err.source)
        } else {
            ShellError::Transport(err)
        }
    }
}

/// A driver failure together with the failures suppressed while cleaning up after it
#[derive(Debug)]
pub struct TransportError {
    pub source: DriverError,
    pub suppressed: Vec<DriverError>,
}

impl TransportError {
    pub fn new(source: DriverError) -> Self {
        Self {
            source,
            suppressed: Vec::new(),
        }
    }

    pub fn suppress(&mut self, secondary: DriverError) {
        self.suppressed.push(secondary);
    }
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.source)
    }
}

impl std::error::Error for TransportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.source)
    }
}
