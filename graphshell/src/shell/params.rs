// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Query parameters set with `:param`

use serde_json::Value;

use crate::driver::Parameters;

/// Named values sent along with every query
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParameterMap {
    values: Parameters,
}

impl ParameterMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, name: impl Into<String>, value: Value) {
        self.values.insert(name.into(), value);
    }

    pub fn clear(&mut self) {
        self.values.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn values(&self) -> &Parameters {
        &self.values
    }

    /// One `:param name => value` line per parameter, sorted by name
    pub fn describe(&self) -> Vec<String> {
        self.values
            .iter()
            .map(|(name, value)| format!(":param {} => {}", name, value))
            .collect()
    }
}

/// Parse a parameter expression that is already a JSON literal
///
/// Expressions the server has to evaluate (`date()`, `1 + 2`, ...) yield `None`.
pub fn parse_literal(expression: &str) -> Option<Value> {
    serde_json::from_str(expression.trim()).ok()
}

/// Strip the backticks around an escaped parameter name
pub fn unquote_name(name: &str) -> &str {
    name.strip_prefix('`')
        .and_then(|n| n.strip_suffix('`'))
        .unwrap_or(name)
}
