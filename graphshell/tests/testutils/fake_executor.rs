// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Executor and session stand-ins for driving the loop directly

use std::io::Cursor;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use graphshell::driver::QueryOutcome;
use graphshell::output::MemoryWriter;
use graphshell::runner::BufReadLines;
use graphshell::{
    DatabaseManager, Executor, Format, HistoryLog, InteractiveLoop, LoopConfig, Printer,
    ShellError, ShellResult, TransactionHandler,
};

use super::Gate;

pub const FAKE_ERROR_CODE: &str = "Neo.ClientError.Statement.SyntaxError";

/// Records statements; `bad` fails, `exit N` exits with N, `block` waits for a reset
#[derive(Default)]
pub struct FakeExecutor {
    pub executed: Mutex<Vec<String>>,
    pub probes: AtomicUsize,
    pub resets: AtomicUsize,
    /// Resets a blocked statement waits for, one when zero
    pub resets_needed: AtomicUsize,
    pub clears: AtomicUsize,
    last_error: Mutex<Option<String>>,
    unblock: Gate,
}

impl FakeExecutor {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn executed(&self) -> Vec<String> {
        self.executed.lock().unwrap().clone()
    }

    fn run(&self, statement: &str) -> ShellResult<()> {
        let trimmed = statement.trim().trim_end_matches(';');
        if let Some(code) = trimmed.strip_prefix(":exit ") {
            let code = code
                .trim()
                .parse()
                .map_err(|_| ShellError::command("bad exit code"))?;
            return Err(ShellError::Exit(code));
        }
        match trimmed {
            "bad" => Err(ShellError::command("Found a bad line")),
            "block" => {
                if self.unblock.wait(Duration::from_secs(10)) {
                    Err(ShellError::Interrupted)
                } else {
                    Err(ShellError::command("never reset"))
                }
            }
            _ => Ok(()),
        }
    }
}

impl Executor for FakeExecutor {
    fn execute(&self, statement: &str) -> ShellResult<()> {
        self.executed.lock().unwrap().push(statement.to_string());
        let result = self.run(statement);
        match &result {
            Ok(()) => *self.last_error.lock().unwrap() = None,
            Err(ShellError::Exit(_)) => {}
            Err(_) => *self.last_error.lock().unwrap() = Some(FAKE_ERROR_CODE.to_string()),
        }
        result
    }

    fn last_error_code(&self) -> Option<String> {
        self.probes.fetch_add(1, Ordering::SeqCst);
        self.last_error.lock().unwrap().clone()
    }

    fn reset(&self) {
        let resets = self.resets.fetch_add(1, Ordering::SeqCst) + 1;
        if resets >= self.resets_needed.load(Ordering::SeqCst).max(1) {
            self.unblock.open();
        }
    }

    fn clear_reset(&self) {
        self.clears.fetch_add(1, Ordering::SeqCst);
        self.unblock.close();
    }
}

/// Transaction and database state as the prompt sees it
#[derive(Default)]
pub struct FakeSessionState {
    pub transaction_open: AtomicBool,
    pub active_database: Mutex<String>,
    pub actual_database: Mutex<String>,
}

impl FakeSessionState {
    pub fn with_database(name: &str) -> Arc<Self> {
        let state = Self::default();
        *state.actual_database.lock().unwrap() = name.to_string();
        Arc::new(state)
    }
}

impl TransactionHandler for FakeSessionState {
    fn begin_transaction(&self) -> ShellResult<()> {
        self.transaction_open.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn commit_transaction(&self) -> ShellResult<Vec<QueryOutcome>> {
        self.transaction_open.store(false, Ordering::SeqCst);
        Ok(Vec::new())
    }

    fn rollback_transaction(&self) -> ShellResult<()> {
        self.transaction_open.store(false, Ordering::SeqCst);
        Ok(())
    }

    fn is_transaction_open(&self) -> bool {
        self.transaction_open.load(Ordering::SeqCst)
    }
}

impl DatabaseManager for FakeSessionState {
    fn set_active_database(&self, name: &str) -> ShellResult<()> {
        *self.active_database.lock().unwrap() = name.to_string();
        Ok(())
    }

    fn active_database_name(&self) -> String {
        self.active_database.lock().unwrap().clone()
    }

    fn actual_database_name(&self) -> String {
        self.actual_database.lock().unwrap().clone()
    }
}

#[derive(Clone)]
pub struct LoopFixture {
    pub executor: Arc<FakeExecutor>,
    pub session: Arc<FakeSessionState>,
    pub history: HistoryLog,
    pub out: MemoryWriter,
    pub err: MemoryWriter,
}

impl LoopFixture {
    pub fn new() -> Self {
        Self {
            executor: FakeExecutor::new(),
            session: FakeSessionState::with_database("mydb"),
            history: HistoryLog::in_memory(),
            out: MemoryWriter::new(),
            err: MemoryWriter::new(),
        }
    }

    pub fn printer(&self, format: Format) -> Arc<Printer> {
        Arc::new(Printer::new(
            Box::new(self.out.clone()),
            Box::new(self.err.clone()),
            format,
            false,
        ))
    }

    /// Loop over `input` as user "myusername"
    pub fn build(&self, input: &str, config: LoopConfig) -> InteractiveLoop {
        InteractiveLoop::new(
            Box::new(BufReadLines::new(Cursor::new(input.to_string()))),
            self.executor.clone(),
            self.session.clone(),
            self.session.clone(),
            self.history.clone(),
            self.printer(Format::Verbose),
            config,
        )
    }
}

pub fn user_config() -> LoopConfig {
    LoopConfig::new("myusername")
}
