// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! User-facing output
//!
//! Everything the user is meant to read goes through a [`Printer`]:
//! results and messages to the out sink, errors to the err sink.
//! Diagnostics go to the `log` facade instead.

pub mod format;

pub use format::ResultFormatter;

use std::io::{IsTerminal, Write};
use std::sync::Arc;

use colored::Colorize;
use parking_lot::Mutex;

use crate::config::Format;
use crate::driver::QueryOutcome;
use crate::error::ShellError;

type Sink = Mutex<Box<dyn Write + Send>>;

pub struct Printer {
    out: Sink,
    err: Sink,
    format: Format,
    colors: bool,
}

impl Printer {
    /// Printer on a pair of writers; `Auto` is resolved as non-interactive
    pub fn new(
        out: Box<dyn Write + Send>,
        err: Box<dyn Write + Send>,
        format: Format,
        colors: bool,
    ) -> Self {
        Self {
            out: Mutex::new(out),
            err: Mutex::new(err),
            format: format.resolve(false),
            colors,
        }
    }

    /// Printer on stdout/stderr, colouring and resolving `Auto` by whether
    /// stdout is a terminal
    pub fn stdio(format: Format) -> Self {
        let terminal = std::io::stdout().is_terminal();
        Self {
            out: Mutex::new(Box::new(std::io::stdout())),
            err: Mutex::new(Box::new(std::io::stderr())),
            format: format.resolve(terminal),
            colors: terminal,
        }
    }

    pub fn format(&self) -> Format {
        self.format
    }

    pub fn is_verbose(&self) -> bool {
        self.format == Format::Verbose
    }

    pub fn print_out(&self, text: &str) {
        write_line(&self.out, text);
    }

    pub fn print_if_verbose(&self, text: &str) {
        if self.is_verbose() {
            self.print_out(text);
        }
    }

    pub fn print_error(&self, err: &ShellError) {
        for secondary in err.suppressed() {
            log::debug!("Suppressed: {}", secondary);
        }
        match err.code() {
            Some(code) => log::debug!("{} ({})", err, code),
            None => log::debug!("{:?}", err),
        }
        self.print_error_msg(&err.to_string());
    }

    pub fn print_error_msg(&self, message: &str) {
        if self.colors {
            write_line(&self.err, &message.red().to_string());
        } else {
            write_line(&self.err, message);
        }
    }

    pub fn print_outcome(&self, outcome: &QueryOutcome) {
        let text = ResultFormatter::format(outcome, self.format);
        if !text.is_empty() {
            self.print_out(&text);
        }
    }
}

fn write_line(sink: &Sink, text: &str) {
    let mut sink = sink.lock();
    if let Err(e) = writeln!(sink, "{}", text).and_then(|_| sink.flush()) {
        log::warn!("Failed to write output: {}", e);
    }
}

/// In-memory sink whose contents can be read back
#[derive(Clone, Default)]
pub struct MemoryWriter {
    buffer: Arc<Mutex<Vec<u8>>>,
}

impl MemoryWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.buffer.lock()).into_owned()
    }
}

impl Write for MemoryWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.buffer.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}
