// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Scriptable in-process driver

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use graphshell::driver::{
    Bookmark, Driver, DriverError, DriverProvider, DriverSession, Parameters, Query, QueryOutcome,
    ResultSummary, SessionConfig,
};
use serde_json::json;

use super::Gate;

pub const SERVER_VERSION: &str = "Neo4j/5.12.0";
pub const DEFAULT_DATABASE: &str = "neo4j";
pub const DATABASE_NOT_FOUND: &str = "Neo.ClientError.Database.DatabaseNotFound";
pub const SYNTAX_ERROR: &str = "Neo.ClientError.Statement.SyntaxError";

#[derive(Debug, Clone, PartialEq)]
pub struct RunRecord {
    pub database: Option<String>,
    pub text: String,
    pub parameters: Parameters,
    pub bookmark: Option<Bookmark>,
}

#[derive(Default)]
pub struct ServerState {
    /// `verify_connectivity` fails while set
    pub unreachable: bool,
    /// The next this many connectivity checks fail
    pub fail_next_checks: usize,
    /// Probes against these databases fail
    pub unknown_databases: Vec<String>,
    /// The next this many user statements fail with an expired session
    pub expire_next_runs: usize,
    pub fail_commit: Option<DriverError>,
    pub fail_close: bool,
    /// Statements with this text block until the session is reset
    pub block_on: Option<String>,
    /// Database named in summaries of user statements instead of the session's
    pub reported_database: Option<String>,
    pub runs: Vec<RunRecord>,
    pub commits: Vec<Vec<String>>,
    pub sessions: Vec<SessionConfig>,
    pub resets: usize,
    pub interrupts: usize,
    pub interrupt_clears: usize,
    pub closed_sessions: usize,
    pub drivers_created: usize,
    next_bookmark: u64,
}

impl ServerState {
    /// User statements, without the connection probes
    pub fn statements(&self) -> Vec<String> {
        self.runs
            .iter()
            .map(|r| r.text.clone())
            .filter(|t| !is_probe(t))
            .collect()
    }

    fn bookmark(&mut self) -> Bookmark {
        self.next_bookmark += 1;
        Bookmark(vec![format!("bookmark:{}", self.next_bookmark)])
    }
}

#[derive(Clone, Default)]
pub struct FakeServer {
    state: Arc<Mutex<ServerState>>,
    unblock: Arc<Gate>,
}

impl FakeServer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> MutexGuard<'_, ServerState> {
        self.state.lock().unwrap()
    }

    pub fn provider(&self) -> DriverProvider {
        let server = self.clone();
        Box::new(move |_config| {
            server.state().drivers_created += 1;
            Ok(Arc::new(FakeDriver {
                server: server.clone(),
            }) as Arc<dyn Driver>)
        })
    }
}

pub struct FakeDriver {
    server: FakeServer,
}

impl Driver for FakeDriver {
    fn verify_connectivity(&self) -> Result<(), DriverError> {
        let mut state = self.server.state();
        if state.fail_next_checks > 0 {
            state.fail_next_checks -= 1;
            return Err(DriverError::ServiceUnavailable("Connection reset".into()));
        }
        if state.unreachable {
            return Err(DriverError::ServiceUnavailable("Connection refused".into()));
        }
        Ok(())
    }

    fn session(&self, config: SessionConfig) -> Result<Arc<dyn DriverSession>, DriverError> {
        self.server.state().sessions.push(config.clone());
        Ok(Arc::new(FakeSession {
            server: self.server.clone(),
            database: config.database,
            bookmark: Mutex::new(config.bookmark),
            open: AtomicBool::new(true),
        }))
    }

    fn interrupt(&self) {
        self.server.state().interrupts += 1;
        self.server.unblock.open();
    }

    fn clear_interrupt(&self) {
        self.server.state().interrupt_clears += 1;
        self.server.unblock.close();
    }

    fn close(&self) -> Result<(), DriverError> {
        if self.server.state().fail_close {
            return Err(DriverError::Protocol("driver close failed".into()));
        }
        Ok(())
    }
}

pub struct FakeSession {
    server: FakeServer,
    database: Option<String>,
    bookmark: Mutex<Option<Bookmark>>,
    open: AtomicBool,
}

impl FakeSession {
    fn summary(&self) -> ResultSummary {
        ResultSummary {
            server_version: Some(SERVER_VERSION.to_string()),
            database: Some(
                self.database
                    .clone()
                    .unwrap_or_else(|| DEFAULT_DATABASE.to_string()),
            ),
        }
    }

    fn outcome(&self) -> QueryOutcome {
        QueryOutcome {
            keys: vec!["value".into()],
            records: vec![vec![json!(1)]],
            summary: self.summary(),
        }
    }
}

impl DriverSession for FakeSession {
    fn run(&self, query: &Query) -> Result<QueryOutcome, DriverError> {
        if !self.is_open() {
            return Err(DriverError::SessionExpired("session closed".into()));
        }

        let block = {
            let mut state = self.server.state();
            state.runs.push(RunRecord {
                database: self.database.clone(),
                text: query.text.clone(),
                parameters: query.parameters.clone(),
                bookmark: self.bookmark.lock().unwrap().clone(),
            });

            if is_probe(&query.text) {
                let database = self.database.clone().unwrap_or_default();
                if state.unknown_databases.contains(&database) {
                    return Err(DriverError::Server {
                        code: DATABASE_NOT_FOUND.into(),
                        message: format!("Database does not exist: {}", database),
                    });
                }
                return Ok(self.outcome());
            }

            if state.expire_next_runs > 0 {
                state.expire_next_runs -= 1;
                return Err(DriverError::SessionExpired("No longer a leader".into()));
            }
            if query.text.contains("RETRUN") {
                return Err(DriverError::Server {
                    code: SYNTAX_ERROR.into(),
                    message: "Invalid input 'RETRUN'".into(),
                });
            }
            state.block_on.as_deref() == Some(query.text.trim())
        };

        if block {
            if self.server.unblock.wait(Duration::from_secs(10)) {
                return Err(DriverError::Interrupted);
            }
            return Err(DriverError::Protocol("never reset".into()));
        }

        let reported_database = {
            let mut state = self.server.state();
            *self.bookmark.lock().unwrap() = Some(state.bookmark());
            state.reported_database.clone()
        };
        let mut summary = self.summary();
        if reported_database.is_some() {
            summary.database = reported_database;
        }

        if let Some(literal) = query.text.strip_prefix("RETURN ").and_then(|t| t.strip_suffix(" AS value")) {
            let value = match literal {
                "1 + 2" => json!(3),
                other => json!(other),
            };
            return Ok(QueryOutcome {
                keys: vec!["value".into()],
                records: vec![vec![value]],
                summary,
            });
        }
        Ok(QueryOutcome {
            summary,
            ..self.outcome()
        })
    }

    fn write_transaction(&self, queries: &[Query]) -> Result<Vec<QueryOutcome>, DriverError> {
        let mut state = self.server.state();
        if let Some(err) = state.fail_commit.take() {
            return Err(err);
        }
        state
            .commits
            .push(queries.iter().map(|q| q.text.clone()).collect());
        let bookmark = state.bookmark();
        *self.bookmark.lock().unwrap() = Some(bookmark);
        Ok(queries.iter().map(|_| self.outcome()).collect())
    }

    fn last_bookmark(&self) -> Option<Bookmark> {
        self.bookmark.lock().unwrap().clone()
    }

    fn reset(&self) -> Result<(), DriverError> {
        self.server.state().resets += 1;
        self.server.unblock.open();
        Ok(())
    }

    fn close(&self) -> Result<(), DriverError> {
        self.open.store(false, Ordering::SeqCst);
        let mut state = self.server.state();
        state.closed_sessions += 1;
        if state.fail_close {
            return Err(DriverError::Protocol("session close failed".into()));
        }
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }
}

pub fn is_probe(text: &str) -> bool {
    text == "RETURN 1" || text == "SHOW DATABASES"
}
