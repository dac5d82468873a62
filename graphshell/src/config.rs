// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Connection and shell configuration

use std::path::PathBuf;

/// Database name meaning "whatever the server considers its default"
pub const ABSENT_DB_NAME: &str = "";
/// Name of the administrative database
pub const SYSTEM_DB_NAME: &str = "system";
/// Address used when none is configured
pub const DEFAULT_ADDRESS: &str = "http://localhost:7474";
/// Width above which the informative prompt wraps onto two lines
pub const DEFAULT_PROMPT_WIDTH: usize = 50;

pub const ADDRESS_ENV_VAR: &str = "GRAPHSHELL_ADDRESS";
pub const USERNAME_ENV_VAR: &str = "GRAPHSHELL_USERNAME";
pub const PASSWORD_ENV_VAR: &str = "GRAPHSHELL_PASSWORD";
pub const DATABASE_ENV_VAR: &str = "GRAPHSHELL_DATABASE";

/// Where and as whom to connect
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionConfig {
    pub address: String,
    pub username: String,
    pub password: String,
    /// Requested database, [`ABSENT_DB_NAME`] for the server default
    pub database: String,
}

impl ConnectionConfig {
    pub fn new(
        address: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
        database: impl Into<String>,
    ) -> Self {
        Self {
            address: address.into(),
            username: username.into(),
            password: password.into(),
            database: database.into(),
        }
    }

    pub fn has_credentials(&self) -> bool {
        !self.username.is_empty() && !self.password.is_empty()
    }
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self::new(DEFAULT_ADDRESS, "", "", ABSENT_DB_NAME)
    }
}

/// What the loop does when a statement fails
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorPolicy {
    /// Report the failure and keep going (interactive use)
    Continue,
    /// Stop at the first failure and exit with a failure code
    FailFast,
    /// Run to the end of input, then exit with a failure code if anything failed
    FailAtEnd,
}

/// How results are rendered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    /// `Verbose` for terminals, `Plain` otherwise
    Auto,
    /// Tables plus a summary line
    Verbose,
    /// Comma separated values, one record per line
    Plain,
}

impl Format {
    /// Resolve `Auto` against whether output goes to a terminal
    pub fn resolve(self, interactive_output: bool) -> Format {
        match self {
            Format::Auto if interactive_output => Format::Verbose,
            Format::Auto => Format::Plain,
            other => other,
        }
    }
}

impl std::str::FromStr for Format {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "auto" => Ok(Format::Auto),
            "verbose" => Ok(Format::Verbose),
            "plain" => Ok(Format::Plain),
            _ => Err(format!("Unknown output format: {}", s)),
        }
    }
}

/// Shell-wide settings
#[derive(Debug, Clone)]
pub struct ShellConfig {
    pub interactive: bool,
    pub error_policy: ErrorPolicy,
    pub format: Format,
    pub prompt_width: usize,
    pub history_file: Option<PathBuf>,
}

impl ShellConfig {
    pub fn interactive() -> Self {
        Self {
            interactive: true,
            error_policy: ErrorPolicy::Continue,
            format: Format::Verbose,
            prompt_width: DEFAULT_PROMPT_WIDTH,
            history_file: default_history_file(),
        }
    }

    pub fn non_interactive(error_policy: ErrorPolicy) -> Self {
        Self {
            interactive: false,
            error_policy,
            format: Format::Plain,
            prompt_width: DEFAULT_PROMPT_WIDTH,
            history_file: None,
        }
    }
}

/// `~/.graphshell/.graphshell_history`, when a home directory is known
pub fn default_history_file() -> Option<PathBuf> {
    std::env::var_os("HOME")
        .or_else(|| std::env::var_os("USERPROFILE"))
        .map(|home| PathBuf::from(home).join(".graphshell").join(".graphshell_history"))
}
