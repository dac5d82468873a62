// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Statement history
//!
//! One entry per statement or command, holding its text as typed with the
//! surrounding whitespace trimmed. The file stores the entries one after
//! the other with their line breaks intact, and is read back by splitting
//! it at statement boundaries again.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::ShellResult;
use crate::parser::StatementAccumulator;

#[derive(Debug, Default)]
struct HistoryInner {
    entries: Vec<String>,
    path: Option<PathBuf>,
}

/// Shared, append-only history log
#[derive(Debug, Clone, Default)]
pub struct HistoryLog {
    inner: Arc<Mutex<HistoryInner>>,
}

impl HistoryLog {
    /// Log that is never persisted
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Log backed by `path`, starting with the entries already stored there
    pub fn with_file(path: impl Into<PathBuf>) -> ShellResult<Self> {
        let path = path.into();
        let entries = if path.exists() {
            read_entries(&path)?
        } else {
            Vec::new()
        };
        log::debug!("Loaded {} history entries from {}", entries.len(), path.display());

        Ok(Self {
            inner: Arc::new(Mutex::new(HistoryInner {
                entries,
                path: Some(path),
            })),
        })
    }

    /// Append a statement, returning the entry it became
    pub fn append(&self, statement: &str) -> Option<String> {
        let entry = statement.trim();
        if entry.is_empty() {
            return None;
        }
        self.inner.lock().entries.push(entry.to_string());
        Some(entry.to_string())
    }

    pub fn entries(&self) -> Vec<String> {
        self.inner.lock().entries.clone()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().entries.is_empty()
    }

    /// Write the whole log to its file, each entry followed by a line break
    pub fn flush(&self) -> ShellResult<()> {
        let inner = self.inner.lock();
        let Some(path) = inner.path.as_ref() else {
            return Ok(());
        };

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let mut contents = String::new();
        for entry in &inner.entries {
            contents.push_str(entry);
            contents.push('\n');
        }
        fs::write(path, contents)?;
        log::debug!("Saved {} history entries to {}", inner.entries.len(), path.display());
        Ok(())
    }
}

fn read_entries(path: &Path) -> ShellResult<Vec<String>> {
    let contents = fs::read_to_string(path)?;
    let mut parser = StatementAccumulator::new();
    let mut entries: Vec<String> = parser
        .feed(&contents)
        .statements
        .iter()
        .map(|statement| statement.trim().to_string())
        .collect();
    // a file cut off mid-statement keeps its tail
    if parser.has_pending_text() {
        entries.push(parser.pending_text().trim().to_string());
    }
    Ok(entries)
}
