// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! The executor behind the interactive loop

use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::Value;

use crate::config::ConnectionConfig;
use crate::driver::QueryOutcome;
use crate::error::{ShellError, ShellResult};
use crate::output::Printer;
use crate::parser::COMMAND_PREFIX;
use crate::runner::HistoryLog;
use crate::session::{ConnectionStateMachine, ResetHandle};

use super::commands::{find_help, ShellCommand};
use super::messages;
use super::params::{parse_literal, unquote_name, ParameterMap};
use super::{DatabaseManager, Executor, TransactionHandler};

/// Runs statements against the connection and interprets shell commands
///
/// The state machine sits behind a mutex held for the duration of a
/// statement; [`Executor::reset`] goes through a [`ResetHandle`] instead,
/// so it can run while a statement is blocked.
pub struct GraphShell {
    state: Mutex<ConnectionStateMachine>,
    reset_handle: ResetHandle,
    parameters: Mutex<ParameterMap>,
    printer: Arc<Printer>,
    last_error: Mutex<Option<String>>,
    history: Mutex<Option<HistoryLog>>,
}

impl GraphShell {
    pub fn new(state: ConnectionStateMachine, printer: Arc<Printer>) -> Self {
        let reset_handle = state.reset_handle();
        Self {
            state: Mutex::new(state),
            reset_handle,
            parameters: Mutex::new(ParameterMap::new()),
            printer,
            last_error: Mutex::new(None),
            history: Mutex::new(None),
        }
    }

    pub fn printer(&self) -> &Arc<Printer> {
        &self.printer
    }

    /// History shown by `:history`
    pub fn set_history(&self, history: HistoryLog) {
        *self.history.lock() = Some(history);
    }

    pub fn connect(&self, config: &ConnectionConfig) -> ShellResult<()> {
        self.state.lock().connect(config)
    }

    pub fn disconnect(&self) {
        self.state.lock().disconnect();
    }

    pub fn is_connected(&self) -> bool {
        self.state.lock().is_connected()
    }

    pub fn server_version(&self) -> String {
        self.state.lock().server_version()
    }

    pub fn print_welcome(&self, config: &ConnectionConfig) {
        let version = self.server_version();
        self.printer
            .print_if_verbose(&messages::welcome(config, &version));
        self.printer.print_if_verbose(messages::USAGE_HINT);
    }

    pub fn parameters(&self) -> ParameterMap {
        self.parameters.lock().clone()
    }

    /// Evaluate `expression` and store it as parameter `name`
    ///
    /// JSON literals are taken as they are; anything else is evaluated by
    /// the server with `RETURN <expression> AS value`.
    pub fn set_parameter(&self, name: &str, expression: &str) -> ShellResult<Value> {
        let name = unquote_name(name.trim());
        let value = match parse_literal(expression) {
            Some(value) => value,
            None => self.evaluate_expression(expression)?,
        };
        self.parameters.lock().set(name, value.clone());
        Ok(value)
    }

    fn evaluate_expression(&self, expression: &str) -> ShellResult<Value> {
        let parameters = self.parameters.lock().values().clone();
        let outcome = self
            .state
            .lock()
            .evaluate(&format!("RETURN {} AS value", expression), &parameters)?;
        outcome
            .records
            .into_iter()
            .next()
            .and_then(|record| record.into_iter().next())
            .ok_or_else(|| {
                ShellError::command(format!("Could not evaluate parameter value: {}", expression))
            })
    }

    fn execute_query(&self, statement: &str) -> ShellResult<()> {
        let parameters = self.parameters.lock().values().clone();
        let outcome = self.state.lock().run_statement(statement, &parameters)?;
        if let Some(outcome) = outcome {
            self.printer.print_outcome(&outcome);
        }
        Ok(())
    }

    fn execute_command(&self, line: &str) -> ShellResult<()> {
        match ShellCommand::parse(line)? {
            ShellCommand::Exit => {
                self.printer.print_if_verbose(messages::EXIT_MESSAGE);
                Err(ShellError::Exit(crate::EXIT_SUCCESS))
            }
            ShellCommand::Begin => self.begin_transaction(),
            ShellCommand::Commit => {
                for outcome in self.commit_transaction()? {
                    self.printer.print_outcome(&outcome);
                }
                Ok(())
            }
            ShellCommand::Rollback => self.rollback_transaction(),
            ShellCommand::Use(database) => self.set_active_database(&database),
            ShellCommand::Param { name, value } => {
                let value = self.set_parameter(&name, &value)?;
                self.printer.print_if_verbose(&value.to_string());
                Ok(())
            }
            ShellCommand::ListParams => {
                for line in self.parameters.lock().describe() {
                    self.printer.print_out(&line);
                }
                Ok(())
            }
            ShellCommand::ClearParams => {
                self.parameters.lock().clear();
                Ok(())
            }
            ShellCommand::History => {
                let entries = self
                    .history
                    .lock()
                    .as_ref()
                    .map(|history| history.entries())
                    .unwrap_or_default();
                for (index, entry) in entries.iter().enumerate() {
                    self.printer.print_out(&format!("{:>3}  {}", index + 1, entry));
                }
                Ok(())
            }
            ShellCommand::Help(None) => {
                self.printer.print_out(&messages::help_listing());
                Ok(())
            }
            ShellCommand::Help(Some(name)) => {
                let help = find_help(&name).ok_or_else(|| {
                    ShellError::command(format!("No such command: {}", name))
                })?;
                self.printer.print_out(&messages::command_help(help));
                Ok(())
            }
        }
    }
}

impl Executor for GraphShell {
    fn execute(&self, statement: &str) -> ShellResult<()> {
        let trimmed = statement.trim();
        if trimmed.is_empty() {
            return Ok(());
        }

        let result = if trimmed.starts_with(COMMAND_PREFIX) {
            self.execute_command(trimmed)
        } else {
            self.execute_query(statement)
        };

        match &result {
            Ok(()) => *self.last_error.lock() = None,
            Err(ShellError::Exit(_)) => {}
            Err(err) => *self.last_error.lock() = err.code().map(str::to_string),
        }
        result
    }

    fn last_error_code(&self) -> Option<String> {
        self.last_error.lock().clone()
    }

    fn reset(&self) {
        self.reset_handle.reset();
    }

    fn clear_reset(&self) {
        self.reset_handle.clear();
    }
}

impl TransactionHandler for GraphShell {
    fn begin_transaction(&self) -> ShellResult<()> {
        self.state.lock().begin_transaction()
    }

    fn commit_transaction(&self) -> ShellResult<Vec<QueryOutcome>> {
        self.state.lock().commit_transaction()
    }

    fn rollback_transaction(&self) -> ShellResult<()> {
        self.state.lock().rollback_transaction()
    }

    fn is_transaction_open(&self) -> bool {
        self.state.lock().is_transaction_open()
    }
}

impl DatabaseManager for GraphShell {
    fn set_active_database(&self, name: &str) -> ShellResult<()> {
        self.state.lock().set_active_database(name)
    }

    fn active_database_name(&self) -> String {
        self.state.lock().active_database_name().to_string()
    }

    fn actual_database_name(&self) -> String {
        self.state
            .lock()
            .actual_database_name()
            .unwrap_or_default()
            .to_string()
    }
}
