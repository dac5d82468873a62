// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Connection/transaction state machine
//!
//! `Disconnected -> Connected -> Connected(tx open) -> Connected`. All
//! operations are synchronous and fail with a command error when called in
//! the wrong state. Transport failures propagate, except that an
//! auto-commit statement hitting an expired session reconnects and retries
//! once.

use std::sync::Arc;

use crate::config::{ConnectionConfig, ABSENT_DB_NAME, SYSTEM_DB_NAME};
use crate::driver::{
    Bookmark, DriverError, DriverProvider, DriverSession, Parameters, Query, QueryOutcome,
    SessionConfig,
};
use crate::error::{ShellError, ShellResult, TransportError};

use super::reset::{ResetHandle, SessionSlot};
use super::transaction_state::PendingTransaction;

const NOT_CONNECTED: &str = "Not connected to the database";
const ALREADY_CONNECTED: &str = "Already connected";
const TX_ALREADY_OPEN: &str = "There is already an open transaction";
const NO_TX_TO_COMMIT: &str = "There is no open transaction to commit";
const NO_TX_TO_ROLLBACK: &str = "There is no open transaction to rollback";
const TX_OPEN_ON_SWITCH: &str =
    "There is an open transaction. You need to close it before you can switch database.";

const SYSTEM_PROBE: &str = "SHOW DATABASES";
const DEFAULT_PROBE: &str = "RETURN 1";

/// Owns the driver, the live session and the pending transaction
pub struct ConnectionStateMachine {
    driver_provider: DriverProvider,
    slot: Arc<SessionSlot>,
    pending: Option<PendingTransaction>,
    /// Latest bookmark, kept while a reconnect has no session to read it from
    last_bookmark: Option<Bookmark>,
    version: Option<String>,
    active_database: String,
    actual_database: Option<String>,
    interactive: bool,
}

impl ConnectionStateMachine {
    /// `interactive` decides whether a failed database switch tries to
    /// restore the previous database
    pub fn new(driver_provider: DriverProvider, interactive: bool) -> Self {
        Self {
            driver_provider,
            slot: Arc::new(SessionSlot::new()),
            pending: None,
            last_bookmark: None,
            version: None,
            active_database: ABSENT_DB_NAME.to_string(),
            actual_database: None,
            interactive,
        }
    }

    /// Handle for resetting the session from another thread
    pub fn reset_handle(&self) -> ResetHandle {
        ResetHandle::new(Arc::clone(&self.slot))
    }

    pub fn is_connected(&self) -> bool {
        self.slot
            .current()
            .map(|session| session.is_open())
            .unwrap_or(false)
    }

    pub fn is_transaction_open(&self) -> bool {
        self.pending.is_some() && !self.slot.discard_requested()
    }

    /// Database requested by the user, [`ABSENT_DB_NAME`] for the default
    pub fn active_database_name(&self) -> &str {
        &self.active_database
    }

    /// Database the server reported for the last probe, statement or commit
    pub fn actual_database_name(&self) -> Option<&str> {
        self.actual_database.as_deref()
    }

    /// Reported server version without its product prefix, empty when disconnected
    pub fn server_version(&self) -> String {
        if !self.is_connected() {
            return String::new();
        }
        self.version
            .as_deref()
            .map(strip_product_prefix)
            .unwrap_or_default()
            .to_string()
    }

    pub fn connect(&mut self, config: &ConnectionConfig) -> ShellResult<()> {
        self.sync_reset();
        if self.is_connected() {
            return Err(ShellError::command(ALREADY_CONNECTED));
        }

        self.active_database = config.database.clone();
        log::debug!(
            "Connecting to {} (database '{}')",
            config.address,
            self.active_database
        );

        match self.open(config) {
            Ok(()) => Ok(()),
            Err(err) => {
                let mut err = TransportError::new(err);
                for secondary in self.silent_disconnect() {
                    err.suppress(secondary);
                }
                Err(err.into())
            }
        }
    }

    /// Close session and driver, logging teardown failures
    pub fn disconnect(&mut self) {
        for failure in self.silent_disconnect() {
            log::warn!("Error while disconnecting: {}", failure);
        }
    }

    pub fn set_active_database(&mut self, name: &str) -> ShellResult<()> {
        self.sync_reset();
        if self.is_transaction_open() {
            return Err(ShellError::command(TX_OPEN_ON_SWITCH));
        }

        let previous = std::mem::replace(&mut self.active_database, name.to_string());
        if !self.is_connected() {
            return Ok(());
        }

        if let Err(err) = self.reconnect() {
            let mut err = TransportError::new(err);
            if self.interactive {
                log::debug!("Switching to '{}' failed, restoring '{}'", name, previous);
                self.active_database = previous;
                if let Err(restore) = self.reconnect() {
                    err.suppress(restore);
                }
            }
            return Err(err.into());
        }
        Ok(())
    }

    pub fn begin_transaction(&mut self) -> ShellResult<()> {
        self.sync_reset();
        self.ensure_connected()?;
        if self.pending.is_some() {
            return Err(ShellError::command(TX_ALREADY_OPEN));
        }
        self.pending = Some(PendingTransaction::new());
        self.slot.set_transaction_open(true);
        Ok(())
    }

    /// Run every queued statement in one write transaction. The pending
    /// transaction is gone afterwards whatever the outcome.
    pub fn commit_transaction(&mut self) -> ShellResult<Vec<QueryOutcome>> {
        self.sync_reset();
        self.ensure_connected()?;
        let pending = self
            .pending
            .take()
            .ok_or_else(|| ShellError::command(NO_TX_TO_COMMIT))?;
        self.slot.set_transaction_open(false);

        if pending.is_empty() {
            return Ok(Vec::new());
        }

        let session = self.session()?;
        let outcomes = session.write_transaction(pending.queries())?;
        if let Some(database) = outcomes.last().and_then(|o| o.summary.database.clone()) {
            self.actual_database = Some(database);
        }
        Ok(outcomes)
    }

    pub fn rollback_transaction(&mut self) -> ShellResult<()> {
        self.sync_reset();
        self.ensure_connected()?;
        self.pending
            .take()
            .ok_or_else(|| ShellError::command(NO_TX_TO_ROLLBACK))?;
        self.slot.set_transaction_open(false);
        Ok(())
    }

    /// Queue the statement inside a transaction (returning `None`), otherwise
    /// run it as its own auto-commit transaction
    pub fn run_statement(
        &mut self,
        text: &str,
        parameters: &Parameters,
    ) -> ShellResult<Option<QueryOutcome>> {
        self.sync_reset();
        self.ensure_connected()?;

        let query = Query::with_parameters(text, parameters.clone());
        if let Some(pending) = self.pending.as_mut() {
            pending.push(query);
            return Ok(None);
        }

        self.run_with_retry(&query).map(Some)
    }

    /// Run a statement immediately, even inside an explicit transaction
    pub fn evaluate(&mut self, text: &str, parameters: &Parameters) -> ShellResult<QueryOutcome> {
        self.sync_reset();
        self.ensure_connected()?;
        self.run_with_retry(&Query::with_parameters(text, parameters.clone()))
    }

    /// Cancel in-flight server work and drop the pending transaction
    pub fn reset(&mut self) {
        self.slot.reset();
        self.slot.clear_interrupt();
        self.sync_reset();
    }

    fn open(&mut self, config: &ConnectionConfig) -> Result<(), DriverError> {
        let driver = (self.driver_provider)(config)?;
        self.slot.replace_driver(Some(driver));
        self.reconnect()
    }

    /// Replace the session with a fresh one against the active database,
    /// carrying the old session's bookmark, and run the probe query
    fn reconnect(&mut self) -> Result<(), DriverError> {
        let driver = self
            .slot
            .driver()
            .ok_or_else(|| DriverError::Protocol("Driver is not initialised".to_string()))?;

        let previous = self.slot.replace(None);
        let bookmark = previous
            .as_ref()
            .and_then(|session| session.last_bookmark())
            .or_else(|| self.last_bookmark.clone());
        self.last_bookmark = bookmark.clone();
        if let Some(previous) = previous {
            if let Err(e) = previous.close() {
                log::warn!("Failed to close previous session: {}", e);
            }
        }

        driver.verify_connectivity()?;

        let mut session_config = SessionConfig::default();
        if self.active_database != ABSENT_DB_NAME {
            session_config.database = Some(self.active_database.clone());
        }
        session_config.bookmark = bookmark;

        let session = driver.session(session_config)?;
        self.slot.replace(Some(Arc::clone(&session)));

        let probe = if self.active_database.eq_ignore_ascii_case(SYSTEM_DB_NAME) {
            SYSTEM_PROBE
        } else {
            DEFAULT_PROBE
        };
        let outcome = session.run(&Query::new(probe))?;
        self.version = outcome.summary.server_version;
        self.actual_database = outcome.summary.database;
        log::debug!(
            "Session ready (server {:?}, database {:?})",
            self.version,
            self.actual_database
        );
        Ok(())
    }

    fn run_with_retry(&mut self, query: &Query) -> ShellResult<QueryOutcome> {
        let session = self.session()?;
        let outcome = match session.run(query) {
            Ok(outcome) => outcome,
            Err(DriverError::SessionExpired(message)) => {
                log::debug!("Session expired ({}), reconnecting once", message);
                self.reconnect()?;
                self.session()?.run(query)?
            }
            Err(e) => return Err(e.into()),
        };
        if let Some(database) = &outcome.summary.database {
            self.actual_database = Some(database.clone());
        }
        Ok(outcome)
    }

    /// Tear everything down, returning the failures instead of raising them
    fn silent_disconnect(&mut self) -> Vec<DriverError> {
        let mut failures = Vec::new();
        if let Some(session) = self.slot.replace(None) {
            if let Err(e) = session.close() {
                failures.push(e);
            }
        }
        if let Some(driver) = self.slot.replace_driver(None) {
            if let Err(e) = driver.close() {
                failures.push(e);
            }
        }
        self.pending = None;
        self.slot.set_transaction_open(false);
        self.slot.take_discard_request();
        self.last_bookmark = None;
        self.version = None;
        self.actual_database = None;
        failures
    }

    /// Apply a reset requested through a [`ResetHandle`]
    fn sync_reset(&mut self) {
        if self.slot.take_discard_request() {
            if self.pending.take().is_some() {
                log::debug!("Discarded open transaction after reset");
            }
            self.slot.set_transaction_open(false);
        }
    }

    fn ensure_connected(&self) -> ShellResult<()> {
        if self.is_connected() {
            Ok(())
        } else {
            Err(ShellError::command(NOT_CONNECTED))
        }
    }

    fn session(&self) -> ShellResult<Arc<dyn DriverSession>> {
        self.slot
            .current()
            .filter(|session| session.is_open())
            .ok_or_else(|| ShellError::command(NOT_CONNECTED))
    }
}

/// `Neo4j/5.12.0` -> `5.12.0`; strings without a product prefix pass through
fn strip_product_prefix(version: &str) -> &str {
    match version.split_once('/') {
        Some((product, rest)) if product.starts_with(|c: char| c.is_ascii_alphabetic()) => rest,
        _ => version,
    }
}
