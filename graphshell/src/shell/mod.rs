// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Statement and command execution
//!
//! The interactive loop only sees the three capability traits below.
//! [`GraphShell`] implements all of them on top of a
//! [`ConnectionStateMachine`](crate::session::ConnectionStateMachine);
//! tests substitute their own stand-ins.

pub mod commands;
pub mod graph_shell;
pub mod messages;
pub mod params;

pub use commands::ShellCommand;
pub use graph_shell::GraphShell;
pub use params::ParameterMap;

use crate::driver::QueryOutcome;
use crate::error::ShellResult;

/// Runs statements and shell commands
pub trait Executor: Send + Sync {
    /// Fails with [`ShellError::Exit`](crate::ShellError::Exit) when a
    /// command asks the shell to stop
    fn execute(&self, statement: &str) -> ShellResult<()>;

    /// Error code of the most recent failed execution; callable any number of times
    fn last_error_code(&self) -> Option<String>;

    /// Abandon in-flight work. Called from the interrupt handler's thread
    /// and must not block on locks held during `execute`. Work started
    /// after the reset is abandoned too, until [`Executor::clear_reset`].
    fn reset(&self);

    /// Forget resets requested for earlier statements
    fn clear_reset(&self);
}

pub trait TransactionHandler: Send + Sync {
    fn begin_transaction(&self) -> ShellResult<()>;

    fn commit_transaction(&self) -> ShellResult<Vec<QueryOutcome>>;

    fn rollback_transaction(&self) -> ShellResult<()>;

    fn is_transaction_open(&self) -> bool;
}

pub trait DatabaseManager: Send + Sync {
    fn set_active_database(&self, name: &str) -> ShellResult<()>;

    /// Name requested by the user, empty for the server default
    fn active_database_name(&self) -> String;

    /// Name reported by the server, empty when unknown
    fn actual_database_name(&self) -> String;
}
