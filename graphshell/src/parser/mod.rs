// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Incremental statement-boundary detection
//!
//! The accumulator does not understand the query language. It only tracks
//! enough lexical state (quotes, comments, brackets) to know where a
//! statement ends.

pub mod statement_parser;

pub use statement_parser::{Fed, StatementAccumulator, COMMAND_PREFIX, TERMINATOR};
