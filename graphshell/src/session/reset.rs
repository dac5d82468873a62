// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Cross-thread reset of the live session
//!
//! The interrupt handler runs while the loop thread may be blocked inside
//! a statement, holding the state machine. It therefore never touches the
//! state machine: it resets the session and interrupts the driver through
//! the shared [`SessionSlot`], and leaves a flag that the state machine
//! consumes on its next operation to drop the pending transaction. During
//! a reconnect no session is installed and only the driver interrupt applies.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;

use crate::driver::{Driver, DriverSession};

/// The live driver and session plus the flags shared with [`ResetHandle`]s
#[derive(Default)]
pub struct SessionSlot {
    driver: RwLock<Option<Arc<dyn Driver>>>,
    session: RwLock<Option<Arc<dyn DriverSession>>>,
    transaction_open: AtomicBool,
    discard_requested: AtomicBool,
}

impl SessionSlot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn driver(&self) -> Option<Arc<dyn Driver>> {
        self.driver.read().clone()
    }

    /// Swap the live driver, returning the previous one
    pub fn replace_driver(&self, driver: Option<Arc<dyn Driver>>) -> Option<Arc<dyn Driver>> {
        std::mem::replace(&mut *self.driver.write(), driver)
    }

    pub fn current(&self) -> Option<Arc<dyn DriverSession>> {
        self.session.read().clone()
    }

    /// Swap the live session, returning the previous one
    pub fn replace(
        &self,
        session: Option<Arc<dyn DriverSession>>,
    ) -> Option<Arc<dyn DriverSession>> {
        std::mem::replace(&mut *self.session.write(), session)
    }

    pub(crate) fn set_transaction_open(&self, open: bool) {
        self.transaction_open.store(open, Ordering::SeqCst);
    }

    /// Whether a reset asked for the pending transaction to be dropped
    pub(crate) fn discard_requested(&self) -> bool {
        self.discard_requested.load(Ordering::SeqCst)
    }

    pub(crate) fn take_discard_request(&self) -> bool {
        self.discard_requested.swap(false, Ordering::SeqCst)
    }

    /// Reset the live session, interrupt the driver and mark an open
    /// transaction for discarding
    pub fn reset(&self) {
        if self.transaction_open.load(Ordering::SeqCst) {
            self.discard_requested.store(true, Ordering::SeqCst);
        }

        if let Some(session) = self.current() {
            if let Err(e) = session.reset() {
                log::warn!("Failed to reset session: {}", e);
            }
        }
        if let Some(driver) = self.driver() {
            driver.interrupt();
        }
    }

    /// Let the driver serve requests again after a reset
    pub fn clear_interrupt(&self) {
        if let Some(driver) = self.driver() {
            driver.clear_interrupt();
        }
    }
}

/// Cloneable, thread-safe handle resetting the session of one state machine
#[derive(Clone)]
pub struct ResetHandle {
    slot: Arc<SessionSlot>,
}

impl ResetHandle {
    pub(crate) fn new(slot: Arc<SessionSlot>) -> Self {
        Self { slot }
    }

    pub fn reset(&self) {
        log::debug!("Resetting session from reset handle");
        self.slot.reset();
    }

    /// Forget earlier resets so the next statement runs normally
    pub fn clear(&self) {
        self.slot.clear_interrupt();
    }
}

impl std::fmt::Debug for ResetHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResetHandle")
            .field("connected", &self.slot.current().is_some())
            .finish()
    }
}
