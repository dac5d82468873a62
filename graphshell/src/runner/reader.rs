// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Line sources for the interactive loop

use std::io::BufRead;

use rustyline::error::ReadlineError;
use rustyline::history::DefaultHistory;
use rustyline::{Config, EditMode, Editor};

use crate::error::ShellResult;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadOutcome {
    /// One physical line without its line terminator
    Line(String),
    /// The user pressed Ctrl-C while editing
    Interrupted,
    Eof,
}

pub trait LineReader {
    fn read_line(&mut self, prompt: &str) -> ShellResult<ReadOutcome>;

    /// Make `entry` available for recall; readers without recall ignore it
    fn add_history_entry(&mut self, _entry: &str) {}
}

/// Reads from any buffered reader and never shows a prompt
pub struct BufReadLines<R> {
    reader: R,
}

impl<R: BufRead> BufReadLines<R> {
    pub fn new(reader: R) -> Self {
        Self { reader }
    }
}

impl<R: BufRead> LineReader for BufReadLines<R> {
    fn read_line(&mut self, _prompt: &str) -> ShellResult<ReadOutcome> {
        let mut line = String::new();
        if self.reader.read_line(&mut line)? == 0 {
            return Ok(ReadOutcome::Eof);
        }
        if line.ends_with('\n') {
            line.pop();
            if line.ends_with('\r') {
                line.pop();
            }
        }
        Ok(ReadOutcome::Line(line))
    }
}

/// Terminal line editor
///
/// History is only added explicitly, once a statement is complete, and
/// the editor performs no expansion of its own, so every character
/// reaches the statement parser.
pub struct EditorReader {
    editor: Editor<(), DefaultHistory>,
}

impl EditorReader {
    pub fn new() -> ShellResult<Self> {
        let config = Config::builder()
            .edit_mode(EditMode::Emacs)
            .auto_add_history(false)
            .history_ignore_space(false)
            .build();
        let editor = Editor::<(), DefaultHistory>::with_config(config)?;
        Ok(Self { editor })
    }

    /// Seed recall with previously saved entries
    pub fn with_history(mut self, entries: &[String]) -> Self {
        for entry in entries {
            self.add_history_entry(entry);
        }
        self
    }
}

impl LineReader for EditorReader {
    fn read_line(&mut self, prompt: &str) -> ShellResult<ReadOutcome> {
        match self.editor.readline(prompt) {
            Ok(line) => Ok(ReadOutcome::Line(line)),
            Err(ReadlineError::Interrupted) => Ok(ReadOutcome::Interrupted),
            Err(ReadlineError::Eof) => Ok(ReadOutcome::Eof),
            Err(e) => Err(e.into()),
        }
    }

    fn add_history_entry(&mut self, entry: &str) {
        if let Err(e) = self.editor.add_history_entry(entry) {
            log::debug!("Could not add history entry: {}", e);
        }
    }
}
