// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Scoped SIGINT registration
//!
//! [`InterruptGuard::install`] routes SIGINT to an [`InterruptHandler`] on a
//! dedicated thread until the guard is dropped.

use super::interactive::InterruptHandler;
use crate::error::ShellResult;

#[cfg(unix)]
pub struct InterruptGuard {
    handle: signal_hook::iterator::Handle,
    thread: Option<std::thread::JoinHandle<()>>,
}

#[cfg(unix)]
impl InterruptGuard {
    pub fn install(handler: InterruptHandler) -> ShellResult<Self> {
        use signal_hook::consts::SIGINT;
        use signal_hook::iterator::Signals;

        let mut signals = Signals::new([SIGINT])?;
        let handle = signals.handle();
        let thread = std::thread::Builder::new()
            .name("graphshell-sigint".to_string())
            .spawn(move || {
                for _ in signals.forever() {
                    handler.handle();
                }
            })?;

        log::debug!("Interrupt handler installed");
        Ok(Self {
            handle,
            thread: Some(thread),
        })
    }
}

#[cfg(unix)]
impl Drop for InterruptGuard {
    fn drop(&mut self) {
        self.handle.close();
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                log::warn!("Interrupt handler thread panicked");
            }
        }
        log::debug!("Interrupt handler removed");
    }
}

#[cfg(not(unix))]
pub struct InterruptGuard;

#[cfg(not(unix))]
impl InterruptGuard {
    pub fn install(_handler: InterruptHandler) -> ShellResult<Self> {
        Ok(Self)
    }
}
