// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Statement accumulator
//!
//! Lines are fed one at a time. A statement ends at a `;` that is outside of
//! quotes, comments and brackets. Lines starting with `:` are shell commands
//! and end at the end of their line.

use std::mem;

/// Character closing a statement
pub const TERMINATOR: char = ';';
/// First character of a shell command
pub const COMMAND_PREFIX: char = ':';

const ESCAPE: char = '\\';

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LexMode {
    Normal,
    SingleQuote,
    DoubleQuote,
    Backtick,
    LineComment,
    BlockComment,
}

/// Outcome of feeding text to the accumulator
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Fed {
    /// Statements completed by this call, in input order
    pub statements: Vec<String>,
    /// Whether nothing at all is buffered after this call
    pub buffer_empty: bool,
}

/// Accumulates raw lines until statement boundaries are found
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatementAccumulator {
    buffer: String,
    mode: LexMode,
    depth: usize,
    /// A non-whitespace character has been appended to the current statement
    started: bool,
    /// No line has been fed since the last reset, so the next one is not joined
    fresh: bool,
    /// The current statement is a shell command
    command: bool,
    /// The previous character was an unconsumed escape
    escaped: bool,
    /// Normal mode: the previous character was an unescaped `/`
    after_slash: bool,
    /// Block comment: the previous character was `*`
    after_star: bool,
}

impl Default for StatementAccumulator {
    fn default() -> Self {
        Self::new()
    }
}

impl StatementAccumulator {
    pub fn new() -> Self {
        Self {
            buffer: String::new(),
            mode: LexMode::Normal,
            depth: 0,
            started: false,
            fresh: true,
            command: false,
            escaped: false,
            after_slash: false,
            after_star: false,
        }
    }

    /// Feed one physical line (or several, separated by line breaks).
    ///
    /// Lines after the first one of the current buffer are joined with `\n`.
    /// A whitespace-only line arriving before the statement has started is
    /// dropped and the buffer goes back to its initial state.
    pub fn feed(&mut self, text: &str) -> Fed {
        let mut statements = Vec::new();
        if text.is_empty() {
            self.feed_line("", &mut statements);
        } else {
            for line in text.lines() {
                self.feed_line(line, &mut statements);
            }
        }

        Fed {
            statements,
            buffer_empty: self.buffer.is_empty(),
        }
    }

    /// True while an unterminated statement with non-whitespace content is buffered
    pub fn has_pending_text(&self) -> bool {
        self.started
    }

    /// The raw text buffered so far
    pub fn pending_text(&self) -> &str {
        &self.buffer
    }

    /// Drop everything buffered and forget the lexical state
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    fn feed_line(&mut self, line: &str, out: &mut Vec<String>) {
        if !self.started && line.trim().is_empty() {
            self.reset();
            return;
        }

        if !self.fresh {
            self.scan('\n', out);
        }
        self.fresh = false;

        for ch in line.chars() {
            self.scan(ch, out);
        }

        if self.command {
            let statement = self.take_statement();
            // the line break belongs to the command
            self.fresh = true;
            out.push(statement);
        }
    }

    fn scan(&mut self, ch: char, out: &mut Vec<String>) {
        self.buffer.push(ch);
        let escaped = mem::take(&mut self.escaped);

        if !self.started && !ch.is_whitespace() {
            self.started = true;
            self.command = ch == COMMAND_PREFIX;
        }
        if self.command {
            return;
        }

        match self.mode {
            LexMode::Normal => self.scan_normal(ch, escaped, out),
            LexMode::SingleQuote => self.scan_quoted(ch, escaped, '\''),
            LexMode::DoubleQuote => self.scan_quoted(ch, escaped, '"'),
            LexMode::Backtick => self.scan_quoted(ch, escaped, '`'),
            LexMode::LineComment => {
                if ch == '\n' {
                    self.mode = LexMode::Normal;
                }
            }
            LexMode::BlockComment => {
                if self.after_star && ch == '/' {
                    self.mode = LexMode::Normal;
                    self.after_star = false;
                } else {
                    self.after_star = ch == '*';
                }
            }
        }
    }

    fn scan_normal(&mut self, ch: char, escaped: bool, out: &mut Vec<String>) {
        let after_slash = mem::take(&mut self.after_slash);

        match ch {
            ESCAPE if !escaped => self.escaped = true,
            '\'' if !escaped => self.mode = LexMode::SingleQuote,
            '"' if !escaped => self.mode = LexMode::DoubleQuote,
            '`' if !escaped => self.mode = LexMode::Backtick,
            '/' if !escaped && after_slash => self.mode = LexMode::LineComment,
            '*' if !escaped && after_slash => {
                self.mode = LexMode::BlockComment;
                self.after_star = false;
            }
            '/' if !escaped => self.after_slash = true,
            '(' | '[' | '{' => self.depth += 1,
            ')' | ']' | '}' => self.depth = self.depth.saturating_sub(1),
            TERMINATOR if self.depth == 0 => {
                let statement = self.take_statement();
                out.push(statement);
            }
            _ => {}
        }
    }

    fn scan_quoted(&mut self, ch: char, escaped: bool, close: char) {
        if escaped {
            return;
        }
        if ch == ESCAPE {
            self.escaped = true;
        } else if ch == close {
            self.mode = LexMode::Normal;
        }
    }

    /// Hand out the buffered statement. Whatever follows on the same line
    /// starts the next buffer, which later lines are joined onto.
    fn take_statement(&mut self) -> String {
        let statement = mem::take(&mut self.buffer);
        self.mode = LexMode::Normal;
        self.depth = 0;
        self.started = false;
        self.fresh = false;
        self.command = false;
        self.escaped = false;
        self.after_slash = false;
        self.after_star = false;
        statement
    }
}
