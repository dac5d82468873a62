// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! CLI module for graphshell
//!
//! Parses the command line, connects, and runs either a single query or
//! the interactive loop.

pub mod commands;
pub mod startup;

pub use commands::Cli;
pub use startup::run;
