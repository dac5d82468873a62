// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Wiring of the shell from command-line arguments

use colored::Colorize;
use std::fs::File;
use std::io::{BufReader, IsTerminal, Write};
use std::sync::Arc;

use graphshell::driver::HttpDriver;
use graphshell::runner::{BufReadLines, EditorReader, LineReader};
use graphshell::{
    ConnectionConfig, ConnectionStateMachine, Executor, GraphShell, HistoryLog, InteractiveLoop,
    LoopConfig, Printer, ShellConfig, ShellError, ShellResult, EXIT_FAILURE, EXIT_SUCCESS,
};

use super::commands::Cli;

/// Run the shell, returning the process exit code
pub fn run(cli: Cli) -> i32 {
    if cli.driver_version {
        println!("graphshell driver {}", graphshell::VERSION);
        return EXIT_SUCCESS;
    }

    match start(&cli) {
        Ok(code) => code,
        Err(ShellError::Exit(code)) => code,
        Err(e) => {
            eprintln!("{}", e.to_string().red());
            EXIT_FAILURE
        }
    }
}

fn start(cli: &Cli) -> ShellResult<i32> {
    let stdin_terminal = std::io::stdin().is_terminal();
    let interactive = cli.is_interactive(stdin_terminal);
    let shell_config = cli.shell_config(interactive);
    log::debug!("Starting with {:?}", shell_config);

    let printer = Arc::new(Printer::stdio(shell_config.format));
    let machine = ConnectionStateMachine::new(HttpDriver::provider(), interactive);
    let shell = Arc::new(GraphShell::new(machine, Arc::clone(&printer)));

    let connection = connect_maybe_interactively(&shell, cli.connection_config(), stdin_terminal)?;

    for param in &cli.params {
        shell.execute(&format!(":param {}", param))?;
    }

    let code = match &cli.query {
        Some(query) => run_single(&shell, &printer, query),
        None => run_loop(cli, &shell, &shell_config, &connection)?,
    };

    shell.disconnect();
    Ok(code)
}

/// Connect, asking for credentials on a terminal when the server rejects
/// the ones given
fn connect_maybe_interactively(
    shell: &GraphShell,
    mut config: ConnectionConfig,
    terminal: bool,
) -> ShellResult<ConnectionConfig> {
    match shell.connect(&config) {
        Ok(()) => Ok(config),
        Err(e) if terminal && !config.has_credentials() && is_authentication_failure(&e) => {
            log::debug!("Connection rejected, asking for credentials: {}", e);
            if config.username.is_empty() {
                config.username = prompt_username()?;
            }
            if config.password.is_empty() {
                print!("Password: ");
                std::io::stdout().flush()?;
                config.password = rpassword::read_password()?;
            }
            shell.connect(&config)?;
            Ok(config)
        }
        Err(e) => Err(e),
    }
}

fn is_authentication_failure(err: &ShellError) -> bool {
    matches!(err, ShellError::Transport(e) if e.source.is_authentication())
}

fn prompt_username() -> ShellResult<String> {
    print!("Username: ");
    std::io::stdout().flush()?;
    let mut input = String::new();
    std::io::stdin().read_line(&mut input)?;
    Ok(input.trim().to_string())
}

fn run_single(shell: &GraphShell, printer: &Printer, query: &str) -> i32 {
    match shell.execute(query) {
        Ok(()) => EXIT_SUCCESS,
        Err(ShellError::Exit(code)) => code,
        Err(e) => {
            printer.print_error(&e);
            EXIT_FAILURE
        }
    }
}

fn run_loop(
    cli: &Cli,
    shell: &Arc<GraphShell>,
    shell_config: &ShellConfig,
    connection: &ConnectionConfig,
) -> ShellResult<i32> {
    let history = match (&shell_config.history_file, shell_config.interactive) {
        (Some(path), true) => HistoryLog::with_file(path).unwrap_or_else(|e| {
            log::warn!("Could not load history from {:?}: {}", path, e);
            HistoryLog::in_memory()
        }),
        _ => HistoryLog::in_memory(),
    };
    shell.set_history(history.clone());

    let reader: Box<dyn LineReader> = if let Some(path) = &cli.file {
        Box::new(BufReadLines::new(BufReader::new(File::open(path)?)))
    } else if shell_config.interactive {
        Box::new(EditorReader::new()?.with_history(&history.entries()))
    } else {
        Box::new(BufReadLines::new(std::io::stdin().lock()))
    };

    if shell_config.interactive {
        shell.print_welcome(connection);
    }

    let mut shell_loop = InteractiveLoop::new(
        reader,
        shell.clone(),
        shell.clone(),
        shell.clone(),
        history,
        Arc::clone(shell.printer()),
        LoopConfig::from_shell_config(shell_config, connection.username.clone()),
    );
    Ok(shell_loop.run_until_end())
}
