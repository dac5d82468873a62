// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! graphshell - an interactive shell for remote graph databases
//!
//! The crate is organised around three pieces:
//! - [`parser`]: turns a raw line stream into complete statements
//! - [`session`]: the connection/transaction state machine on top of a driver
//! - [`runner`]: the read-eval loop with prompts, history and interrupt handling
//!
//! [`shell::GraphShell`] ties the session to a statement executor and shell
//! commands, [`driver`] defines the driver seam plus an HTTP implementation.

pub mod config;
pub mod driver;
pub mod error;
pub mod output;
pub mod parser;
pub mod runner;
pub mod session;
pub mod shell;

pub use config::{ConnectionConfig, ErrorPolicy, Format, ShellConfig};
pub use error::{ShellError, ShellResult, TransportError};
pub use output::Printer;
pub use parser::StatementAccumulator;
pub use runner::{HistoryLog, InteractiveLoop, LoopConfig};
pub use session::ConnectionStateMachine;
pub use shell::{DatabaseManager, Executor, GraphShell, TransactionHandler};

/// Exit code for a graceful end of input
pub const EXIT_SUCCESS: i32 = 0;
/// Exit code for fatal errors and failed non-interactive runs
pub const EXIT_FAILURE: i32 = 1;

/// Version of this crate, reported by `--driver-version`
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
