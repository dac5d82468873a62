// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Connection and transaction lifecycle
//!
//! - [`ConnectionStateMachine`] owns the driver, the live session and the
//!   pending explicit transaction
//! - [`ResetHandle`] lets another thread cancel in-flight work without
//!   touching the state machine itself
//! - [`PendingTransaction`] queues statements between `:begin` and `:commit`

pub mod manager;
pub mod reset;
pub mod transaction_state;

pub use manager::ConnectionStateMachine;
pub use reset::{ResetHandle, SessionSlot};
pub use transaction_state::PendingTransaction;
