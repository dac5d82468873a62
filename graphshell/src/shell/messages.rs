// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Fixed user-facing texts

use crate::config::ConnectionConfig;

use super::commands::{CommandHelp, COMMANDS};

/// Printed by `:exit` and `:quit`
pub const EXIT_MESSAGE: &str = "Exiting. Bye bye.";
/// Printed when the input ends
pub const FAREWELL_MESSAGE: &str = "Bye!";
pub const USAGE_HINT: &str = "Type :help for a list of available commands or :exit to exit the shell.\n\
Note that statements must end with a semicolon.";

pub fn welcome(config: &ConnectionConfig, server_version: &str) -> String {
    let mut message = String::from("Connected to server");
    if !server_version.is_empty() {
        message.push(' ');
        message.push_str(server_version);
    }
    message.push_str(" at ");
    message.push_str(&config.address);
    if !config.username.is_empty() {
        message.push_str(" as user ");
        message.push_str(&config.username);
    }
    message.push('.');
    message
}

pub fn help_listing() -> String {
    let width = COMMANDS
        .iter()
        .map(|c| signature(c).len())
        .max()
        .unwrap_or(0);

    let mut lines = vec!["Available commands:".to_string()];
    for command in COMMANDS {
        lines.push(format!(
            "  {:width$}  {}",
            signature(command),
            command.description,
            width = width
        ));
    }
    lines.push(String::new());
    lines.push("For help on a specific command type:".to_string());
    lines.push("    :help command".to_string());
    lines.join("\n")
}

pub fn command_help(command: &CommandHelp) -> String {
    format!(
        "usage: {}\n\n{}",
        signature(command),
        command.description
    )
}

fn signature(command: &CommandHelp) -> String {
    if command.usage.is_empty() {
        command.name.to_string()
    } else {
        format!("{} {}", command.name, command.usage)
    }
}
