// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Stand-ins shared by the integration tests

#![allow(dead_code)]

pub mod fake_driver;
pub mod fake_executor;

use std::sync::{Condvar, Mutex};
use std::time::Duration;

/// Latch that a reset opens and the next wait consumes
#[derive(Default)]
pub struct Gate {
    opened: Mutex<bool>,
    signal: Condvar,
}

impl Gate {
    pub fn open(&self) {
        *self.opened.lock().unwrap() = true;
        self.signal.notify_all();
    }

    /// Drop an opening nobody waited for
    pub fn close(&self) {
        *self.opened.lock().unwrap() = false;
    }

    /// Wait until opened, consuming the opening. False on timeout.
    pub fn wait(&self, timeout: Duration) -> bool {
        let opened = self.opened.lock().unwrap();
        let (mut opened, result) = self
            .signal
            .wait_timeout_while(opened, timeout, |opened| !*opened)
            .unwrap();
        if result.timed_out() {
            return false;
        }
        *opened = false;
        true
    }
}
