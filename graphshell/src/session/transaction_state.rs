// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Statements queued inside an explicit transaction

use crate::driver::Query;

/// Ordered queue of statements waiting for `:commit`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PendingTransaction {
    queries: Vec<Query>,
}

impl PendingTransaction {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, query: Query) {
        self.queries.push(query);
    }

    pub fn queries(&self) -> &[Query] {
        &self.queries
    }

    pub fn len(&self) -> usize {
        self.queries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queries.is_empty()
    }
}
