// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Driver abstraction
//!
//! The shell never talks to the network directly. It goes through a
//! [`Driver`], which hands out [`DriverSession`]s. Sessions run statements,
//! run atomic write transactions, track bookmarks and can be reset from
//! another thread to abandon in-flight work.

pub mod http;

use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::Value;
use thiserror::Error;

use crate::config::ConnectionConfig;

pub use http::HttpDriver;

/// Error code the server uses for rejected credentials
pub const UNAUTHORIZED_CODE: &str = "Neo.ClientError.Security.Unauthorized";

/// Named query parameters
pub type Parameters = BTreeMap<String, Value>;

/// Builds a driver for a connection config
pub type DriverProvider =
    Box<dyn Fn(&ConnectionConfig) -> Result<Arc<dyn Driver>, DriverError> + Send + Sync>;

/// Errors raised by drivers and sessions
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DriverError {
    /// Credentials were rejected
    #[error("{0}")]
    Authentication(String),

    /// The server could not be reached
    #[error("{0}")]
    ServiceUnavailable(String),

    /// The session can no longer serve requests and has to be re-established
    #[error("{0}")]
    SessionExpired(String),

    /// The server rejected the statement
    #[error("{message}")]
    Server { code: String, message: String },

    /// Unexpected response or local driver failure
    #[error("{0}")]
    Protocol(String),

    /// The in-flight request was abandoned because the session was reset
    #[error("Execution interrupted")]
    Interrupted,
}

impl DriverError {
    /// Server-side status code, if any
    pub fn code(&self) -> Option<&str> {
        match self {
            DriverError::Server { code, .. } => Some(code.as_str()),
            DriverError::Authentication(_) => Some(UNAUTHORIZED_CODE),
            _ => None,
        }
    }

    pub fn is_authentication(&self) -> bool {
        matches!(self, DriverError::Authentication(_))
    }
}

/// A statement with its parameters
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    pub text: String,
    pub parameters: Parameters,
}

impl Query {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            parameters: Parameters::new(),
        }
    }

    pub fn with_parameters(text: impl Into<String>, parameters: Parameters) -> Self {
        Self {
            text: text.into(),
            parameters,
        }
    }
}

/// Opaque causal-consistency token handed from one session to the next
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Bookmark(pub Vec<String>);

impl Bookmark {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// How a session is opened
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionConfig {
    /// `None` targets the server's default database
    pub database: Option<String>,
    pub bookmark: Option<Bookmark>,
}

/// Metadata reported with every result
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultSummary {
    pub server_version: Option<String>,
    /// Database the statement actually ran against
    pub database: Option<String>,
}

/// Keys, records and summary of one executed statement
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryOutcome {
    pub keys: Vec<String>,
    pub records: Vec<Vec<Value>>,
    pub summary: ResultSummary,
}

/// Connection factory for one server
pub trait Driver: Send + Sync {
    /// Fails when the server cannot be reached or rejects the credentials
    fn verify_connectivity(&self) -> Result<(), DriverError>;

    fn session(&self, config: SessionConfig) -> Result<Arc<dyn DriverSession>, DriverError>;

    /// Stop whatever this driver or its sessions are waiting on, from any
    /// thread. Blocked and later calls return [`DriverError::Interrupted`]
    /// until [`Driver::clear_interrupt`].
    fn interrupt(&self);

    fn clear_interrupt(&self);

    fn close(&self) -> Result<(), DriverError>;
}

/// A logical session against one database
///
/// `reset` may be called from another thread while `run` or
/// `write_transaction` is blocked; the blocked call must then return
/// [`DriverError::Interrupted`] or complete normally.
pub trait DriverSession: Send + Sync {
    /// Run one statement in its own auto-commit transaction
    fn run(&self, query: &Query) -> Result<QueryOutcome, DriverError>;

    /// Run all queries in one atomic write transaction
    fn write_transaction(&self, queries: &[Query]) -> Result<Vec<QueryOutcome>, DriverError>;

    fn last_bookmark(&self) -> Option<Bookmark>;

    /// Abandon in-flight work and roll back anything open on the server
    fn reset(&self) -> Result<(), DriverError>;

    fn close(&self) -> Result<(), DriverError>;

    fn is_open(&self) -> bool;
}
