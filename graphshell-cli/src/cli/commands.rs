// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! CLI command definitions for graphshell

use clap::{Parser, ValueEnum};
use std::path::PathBuf;

use graphshell::config::{
    default_history_file, ADDRESS_ENV_VAR, DATABASE_ENV_VAR, DEFAULT_ADDRESS,
    DEFAULT_PROMPT_WIDTH, PASSWORD_ENV_VAR, USERNAME_ENV_VAR,
};
use graphshell::{ConnectionConfig, ErrorPolicy, Format, ShellConfig};

/// Log level options
#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum LogLevel {
    /// Only errors
    Error,
    /// Warnings and errors
    Warn,
    /// Info, warnings, and errors
    Info,
    /// Debug messages and above (verbose)
    Debug,
    /// All messages including trace (very verbose)
    Trace,
    /// Disable all logging
    Off,
}

impl LogLevel {
    /// Convert to log::LevelFilter
    pub fn to_level_filter(self) -> log::LevelFilter {
        match self {
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
            LogLevel::Off => log::LevelFilter::Off,
        }
    }
}

/// Output format options
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Verbose on a terminal, plain otherwise
    Auto,
    /// Tables with a summary line
    Verbose,
    /// Comma separated values
    Plain,
}

impl OutputFormat {
    pub fn to_format(self) -> Format {
        match self {
            OutputFormat::Auto => Format::Auto,
            OutputFormat::Verbose => Format::Verbose,
            OutputFormat::Plain => Format::Plain,
        }
    }
}

/// graphshell - interactive shell for graph databases
#[derive(Parser, Debug)]
#[command(name = "graphshell")]
#[command(about = "graphshell - run graph queries against a remote database")]
#[command(version)]
pub struct Cli {
    /// Address of the server
    #[arg(short = 'a', long = "address", env = ADDRESS_ENV_VAR, default_value = DEFAULT_ADDRESS)]
    pub address: String,

    /// Username to connect as
    #[arg(short = 'u', long = "username", env = USERNAME_ENV_VAR, default_value = "")]
    pub username: String,

    /// Password to connect with (prompted for on a terminal if rejected)
    #[arg(
        short = 'p',
        long = "password",
        env = PASSWORD_ENV_VAR,
        default_value = "",
        hide_env_values = true
    )]
    pub password: String,

    /// Database to connect to, the server default when empty
    #[arg(short = 'd', long = "database", env = DATABASE_ENV_VAR, default_value = "")]
    pub database: String,

    /// Read statements from this file instead of standard input
    #[arg(short = 'f', long = "file")]
    pub file: Option<PathBuf>,

    /// Exit at the first failed statement (default without a terminal)
    #[arg(long = "fail-fast", conflicts_with = "fail_at_end")]
    pub fail_fast: bool,

    /// Run every statement, exiting with a failure code if any failed
    #[arg(long = "fail-at-end")]
    pub fail_at_end: bool,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Auto)]
    pub format: OutputFormat,

    /// Query parameter, `name => value` (repeatable)
    #[arg(short = 'P', long = "param", value_name = "NAME => VALUE")]
    pub params: Vec<String>,

    /// Set log level (error, warn, info, debug, trace, off)
    #[arg(short = 'l', long = "log-level", value_enum)]
    pub log_level: Option<LogLevel>,

    /// Verbose mode (equivalent to --log-level debug)
    #[arg(short = 'v', long = "verbose")]
    pub verbose: bool,

    /// Never read from a terminal, even when one is attached
    #[arg(long = "non-interactive")]
    pub non_interactive: bool,

    /// Where interactive history is kept
    #[arg(long = "history-file")]
    pub history_file: Option<PathBuf>,

    /// Print the driver version and exit
    #[arg(long = "driver-version")]
    pub driver_version: bool,

    /// Run this single statement and exit
    pub query: Option<String>,
}

impl Cli {
    pub fn level_filter(&self) -> log::LevelFilter {
        if self.verbose {
            log::LevelFilter::Debug
        } else {
            self.log_level
                .map(LogLevel::to_level_filter)
                .unwrap_or(log::LevelFilter::Warn)
        }
    }

    pub fn connection_config(&self) -> ConnectionConfig {
        ConnectionConfig::new(
            self.address.clone(),
            self.username.clone(),
            self.password.clone(),
            self.database.clone(),
        )
    }

    /// Whether the loop reads from a terminal
    pub fn is_interactive(&self, stdin_is_terminal: bool) -> bool {
        stdin_is_terminal && !self.non_interactive && self.file.is_none() && self.query.is_none()
    }

    pub fn error_policy(&self, interactive: bool) -> ErrorPolicy {
        if self.fail_at_end {
            ErrorPolicy::FailAtEnd
        } else if self.fail_fast || !interactive {
            ErrorPolicy::FailFast
        } else {
            ErrorPolicy::Continue
        }
    }

    pub fn shell_config(&self, interactive: bool) -> ShellConfig {
        ShellConfig {
            interactive,
            error_policy: self.error_policy(interactive),
            format: self.format.to_format(),
            prompt_width: DEFAULT_PROMPT_WIDTH,
            history_file: self.history_file.clone().or_else(default_history_file),
        }
    }
}
