// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Colon-prefixed shell commands

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{ShellError, ShellResult};
use crate::parser::COMMAND_PREFIX;

use super::params::unquote_name;

/// `name => value`, with the older `name: value` form still accepted
static PARAM_ASSIGNMENT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?P<name>`[^`]+`|[\p{L}_][\p{L}\p{N}_]*)\s*(?:=>|:)\s*(?P<value>.+)$")
        .expect("parameter assignment pattern is valid")
});

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShellCommand {
    Exit,
    Begin,
    Commit,
    Rollback,
    /// Empty name switches to the server default
    Use(String),
    Param { name: String, value: String },
    ListParams,
    ClearParams,
    History,
    Help(Option<String>),
}

pub struct CommandHelp {
    pub name: &'static str,
    pub usage: &'static str,
    pub description: &'static str,
}

pub const COMMANDS: &[CommandHelp] = &[
    CommandHelp {
        name: ":begin",
        usage: "",
        description: "Open a transaction",
    },
    CommandHelp {
        name: ":commit",
        usage: "",
        description: "Commit the currently open transaction",
    },
    CommandHelp {
        name: ":exit",
        usage: "",
        description: "Exit the shell",
    },
    CommandHelp {
        name: ":help",
        usage: "[command]",
        description: "Show this help message or the help for a command",
    },
    CommandHelp {
        name: ":history",
        usage: "",
        description: "Print a list of the last commands executed",
    },
    CommandHelp {
        name: ":param",
        usage: "name => value",
        description: "Set the value of a query parameter",
    },
    CommandHelp {
        name: ":params",
        usage: "[clear]",
        description: "Print all query parameters, or clear them",
    },
    CommandHelp {
        name: ":quit",
        usage: "",
        description: "Exit the shell",
    },
    CommandHelp {
        name: ":rollback",
        usage: "",
        description: "Rollback the currently open transaction",
    },
    CommandHelp {
        name: ":use",
        usage: "[database]",
        description: "Set the active database, or the server default when none is given",
    },
];

impl ShellCommand {
    /// Parse a command line such as `:use movies`
    pub fn parse(line: &str) -> ShellResult<Self> {
        let line = line.trim();
        let (name, args) = match line.split_once(char::is_whitespace) {
            Some((name, args)) => (name, args.trim()),
            None => (line, ""),
        };
        if !name.starts_with(COMMAND_PREFIX) {
            return Err(ShellError::command(format!("Not a command: {}", line)));
        }

        let command = match name {
            ":exit" | ":quit" => {
                no_arguments(name, args)?;
                ShellCommand::Exit
            }
            ":begin" => {
                no_arguments(name, args)?;
                ShellCommand::Begin
            }
            ":commit" => {
                no_arguments(name, args)?;
                ShellCommand::Commit
            }
            ":rollback" => {
                no_arguments(name, args)?;
                ShellCommand::Rollback
            }
            ":history" => {
                no_arguments(name, args)?;
                ShellCommand::History
            }
            ":use" => ShellCommand::Use(unquote_name(args).to_string()),
            ":param" if args.is_empty() => ShellCommand::ListParams,
            ":param" => parse_param(args)?,
            ":params" => match args {
                "" => ShellCommand::ListParams,
                "clear" => ShellCommand::ClearParams,
                other => {
                    return Err(ShellError::command(format!(
                        "Incorrect usage of :params, unexpected argument '{}'",
                        other
                    )))
                }
            },
            ":help" => ShellCommand::Help(if args.is_empty() {
                None
            } else {
                Some(args.to_string())
            }),
            other => {
                return Err(ShellError::command(format!(
                    "Could not find command {}, use :help to see available commands",
                    other
                )))
            }
        };
        Ok(command)
    }
}

/// Help entry for `name`, with or without the leading colon
pub fn find_help(name: &str) -> Option<&'static CommandHelp> {
    let name = name.trim();
    let name = name.strip_prefix(COMMAND_PREFIX).unwrap_or(name);
    COMMANDS.iter().find(|c| &c.name[1..] == name)
}

fn parse_param(args: &str) -> ShellResult<ShellCommand> {
    let caps = PARAM_ASSIGNMENT.captures(args).ok_or_else(|| {
        ShellError::command("Incorrect usage of :param, expected :param name => value")
    })?;
    Ok(ShellCommand::Param {
        name: caps["name"].to_string(),
        value: caps["value"].trim().to_string(),
    })
}

fn no_arguments(name: &str, args: &str) -> ShellResult<()> {
    if args.is_empty() {
        Ok(())
    } else {
        Err(ShellError::command(format!(
            "Incorrect number of arguments for {}, it takes none",
            name
        )))
    }
}
