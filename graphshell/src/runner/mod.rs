// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Interactive runner
//!
//! Reads lines, cuts them into statements, hands the statements to an
//! [`Executor`](crate::shell::Executor) and keeps the history.

pub mod history;
pub mod interactive;
pub mod reader;
pub mod signal;

pub use history::HistoryLog;
pub use interactive::{InteractiveLoop, InterruptHandler, LoopConfig, INTERRUPT_NOTICE};
pub use reader::{BufReadLines, EditorReader, LineReader, ReadOutcome};
pub use signal::InterruptGuard;
