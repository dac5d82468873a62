// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Read-eval loop

use std::sync::Arc;

use parking_lot::Mutex;

use crate::config::{ErrorPolicy, ShellConfig, DEFAULT_PROMPT_WIDTH};
use crate::error::{ShellError, ShellResult};
use crate::output::Printer;
use crate::parser::StatementAccumulator;
use crate::shell::messages::FAREWELL_MESSAGE;
use crate::shell::{DatabaseManager, Executor, TransactionHandler};
use crate::{EXIT_FAILURE, EXIT_SUCCESS};

use super::history::HistoryLog;
use super::reader::{LineReader, ReadOutcome};
use super::signal::InterruptGuard;

pub const INTERRUPT_NOTICE: &str = "Interrupted (Note that statements must end with a semicolon. \
Type :exit to exit the shell.)";

const PROMPT_SUFFIX: &str = "> ";
const TRANSACTION_PROMPT_SUFFIX: &str = "# ";

/// Loop settings
#[derive(Debug, Clone)]
pub struct LoopConfig {
    /// Shown in the prompt
    pub username: String,
    pub error_policy: ErrorPolicy,
    /// Identities longer than this put the prompt on its own line
    pub prompt_width: usize,
    /// Route SIGINT to the loop's [`InterruptHandler`] while it runs
    pub trap_interrupts: bool,
}

impl LoopConfig {
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            error_policy: ErrorPolicy::Continue,
            prompt_width: DEFAULT_PROMPT_WIDTH,
            trap_interrupts: false,
        }
    }

    pub fn from_shell_config(config: &ShellConfig, username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            error_policy: config.error_policy,
            prompt_width: config.prompt_width,
            trap_interrupts: config.interactive,
        }
    }
}

#[derive(Debug, Default)]
struct ExecutionState {
    executing: bool,
    cancel_requested: bool,
}

/// Reacts to interrupts on behalf of one loop
///
/// Safe to call from any thread. It only touches its own state, the
/// executor's `reset` and the printer, never the loop itself. Resets are
/// issued under the state lock, so none lands after a statement finished.
#[derive(Clone)]
pub struct InterruptHandler {
    state: Arc<Mutex<ExecutionState>>,
    executor: Arc<dyn Executor>,
    printer: Arc<Printer>,
}

impl InterruptHandler {
    fn new(executor: Arc<dyn Executor>, printer: Arc<Printer>) -> Self {
        Self {
            state: Arc::new(Mutex::new(ExecutionState::default())),
            executor,
            printer,
        }
    }

    /// Cancel the running statement, or remind the user how to end input.
    /// Every interrupt during a statement resets again.
    pub fn handle(&self) {
        {
            let mut state = self.state.lock();
            if state.executing {
                log::debug!("Interrupt during execution, resetting");
                state.cancel_requested = true;
                self.executor.reset();
                return;
            }
        }

        self.printer.print_error_msg(INTERRUPT_NOTICE);
        if let Some(code) = self.executor.last_error_code() {
            log::debug!("Last error code: {}", code);
        }
    }

    pub fn is_executing(&self) -> bool {
        self.state.lock().executing
    }

    fn begin_execution(&self) {
        let mut state = self.state.lock();
        self.executor.clear_reset();
        state.cancel_requested = false;
        state.executing = true;
    }

    /// Returns whether the execution was cancelled
    fn end_execution(&self) -> bool {
        let mut state = self.state.lock();
        state.executing = false;
        std::mem::take(&mut state.cancel_requested)
    }
}

pub struct InteractiveLoop {
    reader: Box<dyn LineReader>,
    parser: StatementAccumulator,
    executor: Arc<dyn Executor>,
    transactions: Arc<dyn TransactionHandler>,
    databases: Arc<dyn DatabaseManager>,
    history: HistoryLog,
    printer: Arc<Printer>,
    config: LoopConfig,
    interrupts: InterruptHandler,
    failed: bool,
}

impl InteractiveLoop {
    pub fn new(
        reader: Box<dyn LineReader>,
        executor: Arc<dyn Executor>,
        transactions: Arc<dyn TransactionHandler>,
        databases: Arc<dyn DatabaseManager>,
        history: HistoryLog,
        printer: Arc<Printer>,
        config: LoopConfig,
    ) -> Self {
        let interrupts = InterruptHandler::new(Arc::clone(&executor), Arc::clone(&printer));
        Self {
            reader,
            parser: StatementAccumulator::new(),
            executor,
            transactions,
            databases,
            history,
            printer,
            config,
            interrupts,
            failed: false,
        }
    }

    pub fn interrupt_handler(&self) -> InterruptHandler {
        self.interrupts.clone()
    }

    pub fn history(&self) -> &HistoryLog {
        &self.history
    }

    /// Read lines until at least one statement is complete
    ///
    /// Fails with [`ShellError::NoMoreInput`] at end of input, whether or
    /// not an unterminated statement was pending.
    pub fn read_until_statement(&mut self) -> ShellResult<Vec<String>> {
        loop {
            let prompt = self.update_and_get_prompt();
            match self.reader.read_line(&prompt)? {
                ReadOutcome::Line(line) => {
                    let fed = self.parser.feed(&line);
                    if !fed.statements.is_empty() {
                        for statement in &fed.statements {
                            self.record_history(statement);
                        }
                        return Ok(fed.statements);
                    }
                }
                ReadOutcome::Interrupted => {
                    self.parser.reset();
                    self.interrupts.handle();
                }
                ReadOutcome::Eof => {
                    if self.parser.has_pending_text() {
                        log::debug!(
                            "Input ended inside an unterminated statement: {:?}",
                            self.parser.pending_text()
                        );
                    }
                    return Err(ShellError::NoMoreInput);
                }
            }
        }
    }

    /// Run until input ends or a command asks to exit, returning the exit code
    pub fn run_until_end(&mut self) -> i32 {
        let _guard = if self.config.trap_interrupts {
            match InterruptGuard::install(self.interrupts.clone()) {
                Ok(guard) => Some(guard),
                Err(e) => {
                    log::warn!("Could not install interrupt handler: {}", e);
                    None
                }
            }
        } else {
            None
        };

        let code = loop {
            let last_error = self.executor.last_error_code();
            if let Some(code) = &last_error {
                log::debug!("Last error code: {}", code);
            }

            match self.read_until_statement() {
                Ok(statements) => {
                    if let Some(code) = self.execute_all(statements) {
                        break code;
                    }
                }
                Err(ShellError::NoMoreInput) => {
                    self.printer.print_if_verbose(FAREWELL_MESSAGE);
                    break self.end_of_input_code(last_error.is_some());
                }
                Err(ShellError::Exit(code)) => break code,
                Err(e) => {
                    self.printer.print_error(&e);
                    break EXIT_FAILURE;
                }
            }
        };

        if let Err(e) = self.flush_history() {
            log::warn!("Failed to save history: {}", e);
        }
        code
    }

    /// Prompt for the next line, reflecting transaction and parser state
    pub fn update_and_get_prompt(&self) -> String {
        let suffix = if self.transactions.is_transaction_open() {
            TRANSACTION_PROMPT_SUFFIX
        } else {
            PROMPT_SUFFIX
        };
        let identity = self.prompt_identity();
        let width = identity.chars().count();
        let wrapped = width > self.config.prompt_width;

        if self.parser.has_pending_text() {
            if wrapped {
                String::new()
            } else {
                " ".repeat(width + suffix.len())
            }
        } else if wrapped {
            format!("{}\n{}", identity, suffix)
        } else {
            format!("{}{}", identity, suffix)
        }
    }

    pub fn flush_history(&self) -> ShellResult<()> {
        self.history.flush()
    }

    fn prompt_identity(&self) -> String {
        let mut database = self.databases.actual_database_name();
        if database.is_empty() {
            database = self.databases.active_database_name();
        }

        let username = &self.config.username;
        match (username.is_empty(), database.is_empty()) {
            (_, true) => username.clone(),
            (true, false) => database,
            (false, false) => format!("{}@{}", username, database),
        }
    }

    fn record_history(&mut self, statement: &str) {
        if let Some(entry) = self.history.append(statement) {
            self.reader.add_history_entry(&entry);
        }
    }

    /// Returns the exit code when the loop has to stop
    fn execute_all(&mut self, statements: Vec<String>) -> Option<i32> {
        for statement in statements {
            match self.execute(&statement) {
                Ok(()) => {}
                Err(ShellError::Exit(code)) => return Some(code),
                Err(err) => {
                    self.failed = true;
                    self.printer.print_error(&err);
                    if self.config.error_policy == ErrorPolicy::FailFast {
                        return Some(EXIT_FAILURE);
                    }
                }
            }
        }
        None
    }

    fn execute(&self, statement: &str) -> ShellResult<()> {
        self.interrupts.begin_execution();
        let result = self.executor.execute(statement);
        let cancelled = self.interrupts.end_execution();

        match result {
            Err(err) if cancelled && !matches!(err, ShellError::Exit(_)) => {
                log::debug!("Statement cancelled: {}", err);
                Err(ShellError::Interrupted)
            }
            other => other,
        }
    }

    fn end_of_input_code(&self, last_failed: bool) -> i32 {
        match self.config.error_policy {
            ErrorPolicy::Continue => EXIT_SUCCESS,
            ErrorPolicy::FailFast | ErrorPolicy::FailAtEnd => {
                if self.failed || last_failed {
                    EXIT_FAILURE
                } else {
                    EXIT_SUCCESS
                }
            }
        }
    }
}
