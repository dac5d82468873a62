// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Tests for the connection/transaction state machine against a fake driver

#[path = "testutils/mod.rs"]
mod testutils;

use graphshell::driver::{Bookmark, DriverError, Parameters};
use graphshell::{ConnectionConfig, ConnectionStateMachine, ShellError};
use serde_json::json;
use testutils::fake_driver::{FakeServer, DATABASE_NOT_FOUND, DEFAULT_DATABASE};

fn config(database: &str) -> ConnectionConfig {
    ConnectionConfig::new("http://localhost:7474", "neo4j", "secret", database)
}

fn connected(server: &FakeServer, interactive: bool) -> ConnectionStateMachine {
    let mut machine = ConnectionStateMachine::new(server.provider(), interactive);
    machine
        .connect(&config(""))
        .expect("Failed to connect to fake server");
    machine
}

fn no_params() -> Parameters {
    Parameters::new()
}

#[test]
fn test_connect_probes_and_learns_server_details() {
    let server = FakeServer::new();
    let machine = connected(&server, true);

    assert!(machine.is_connected());
    assert_eq!(machine.server_version(), "5.12.0");
    assert_eq!(machine.actual_database_name(), Some(DEFAULT_DATABASE));

    let state = server.state();
    assert_eq!(state.runs.len(), 1);
    assert_eq!(state.runs[0].text, "RETURN 1");
    assert_eq!(state.sessions[0].database, None);
}

#[test]
fn test_connect_to_system_database_uses_show_databases() {
    let server = FakeServer::new();
    let mut machine = ConnectionStateMachine::new(server.provider(), true);
    machine.connect(&config("system")).unwrap();

    let state = server.state();
    assert_eq!(state.runs[0].text, "SHOW DATABASES");
    assert_eq!(state.runs[0].database.as_deref(), Some("system"));
}

#[test]
fn test_connect_twice_is_a_command_error() {
    let server = FakeServer::new();
    let mut machine = connected(&server, true);

    let err = machine.connect(&config("")).unwrap_err();
    assert!(matches!(err, ShellError::Command(_)));
    assert_eq!(err.to_string(), "Already connected");
}

#[test]
fn test_failed_connect_tears_down_and_keeps_the_original_error() {
    let server = FakeServer::new();
    {
        let mut state = server.state();
        state.unknown_databases.push("missing".into());
        state.fail_close = true;
    }

    let mut machine = ConnectionStateMachine::new(server.provider(), true);
    let err = machine.connect(&config("missing")).unwrap_err();

    assert_eq!(err.code(), Some(DATABASE_NOT_FOUND));
    // session close and driver close both failed during teardown
    assert_eq!(err.suppressed().len(), 2);
    assert!(!machine.is_connected());
    assert_eq!(machine.server_version(), "");
}

#[test]
fn test_unreachable_server_fails_connect() {
    let server = FakeServer::new();
    server.state().unreachable = true;

    let mut machine = ConnectionStateMachine::new(server.provider(), true);
    let err = machine.connect(&config("")).unwrap_err();

    assert_eq!(err.to_string(), "Connection refused");
    assert!(err.suppressed().is_empty());
    assert!(!machine.is_connected());
}

#[test]
fn test_statements_run_with_parameters() {
    let server = FakeServer::new();
    let mut machine = connected(&server, true);

    let mut params = Parameters::new();
    params.insert("name".into(), json!("Alice"));
    let outcome = machine
        .run_statement("MATCH (p {name: $name}) RETURN p;", &params)
        .unwrap();

    assert!(outcome.is_some());
    let state = server.state();
    let run = state.runs.last().unwrap();
    assert_eq!(run.text, "MATCH (p {name: $name}) RETURN p;");
    assert_eq!(run.parameters, params);
}

#[test]
fn test_expired_session_is_retried_once_with_bookmark() {
    let server = FakeServer::new();
    let mut machine = connected(&server, true);
    machine.run_statement("CREATE (:A);", &no_params()).unwrap();
    server.state().expire_next_runs = 1;

    let outcome = machine.run_statement("CREATE (:B);", &no_params()).unwrap();
    assert!(outcome.is_some());

    let state = server.state();
    assert_eq!(state.statements(), vec!["CREATE (:A);", "CREATE (:B);", "CREATE (:B);"]);
    assert_eq!(state.sessions.len(), 2);
    assert!(state.sessions[1].bookmark.is_some());
}

#[test]
fn test_second_expiry_is_propagated() {
    let server = FakeServer::new();
    let mut machine = connected(&server, true);
    server.state().expire_next_runs = 2;

    let err = machine.run_statement("CREATE (:B);", &no_params()).unwrap_err();
    assert!(matches!(
        err,
        ShellError::Transport(ref e) if matches!(e.source, DriverError::SessionExpired(_))
    ));
    assert_eq!(server.state().statements().len(), 2);
}

#[test]
fn test_server_errors_are_not_retried() {
    let server = FakeServer::new();
    let mut machine = connected(&server, true);

    let err = machine.run_statement("RETRUN 1;", &no_params()).unwrap_err();
    assert_eq!(err.code(), Some("Neo.ClientError.Statement.SyntaxError"));
    assert_eq!(server.state().statements().len(), 1);
}

#[test]
fn test_transaction_queues_until_commit() {
    let server = FakeServer::new();
    let mut machine = connected(&server, true);

    machine.begin_transaction().unwrap();
    assert!(machine.is_transaction_open());
    assert!(machine.run_statement("CREATE (:A);", &no_params()).unwrap().is_none());
    assert!(machine.run_statement("CREATE (:B);", &no_params()).unwrap().is_none());
    assert!(server.state().statements().is_empty());

    let outcomes = machine.commit_transaction().unwrap();
    assert_eq!(outcomes.len(), 2);
    assert!(!machine.is_transaction_open());
    assert_eq!(
        server.state().commits,
        vec![vec!["CREATE (:A);".to_string(), "CREATE (:B);".to_string()]]
    );
}

#[test]
fn test_empty_commit_returns_nothing_and_closes_the_transaction() {
    let server = FakeServer::new();
    let mut machine = connected(&server, true);

    machine.begin_transaction().unwrap();
    let outcomes = machine.commit_transaction().unwrap();

    assert!(outcomes.is_empty());
    assert!(!machine.is_transaction_open());
    assert!(server.state().commits.is_empty());
}

#[test]
fn test_failed_commit_still_closes_the_transaction() {
    let server = FakeServer::new();
    let mut machine = connected(&server, true);
    server.state().fail_commit = Some(DriverError::Server {
        code: "Neo.ClientError.Schema.ConstraintValidationFailed".into(),
        message: "Node already exists".into(),
    });

    machine.begin_transaction().unwrap();
    machine.run_statement("CREATE (:A);", &no_params()).unwrap();
    assert!(machine.commit_transaction().is_err());
    assert!(!machine.is_transaction_open());
}

#[test]
fn test_rollback_discards_without_contacting_the_server() {
    let server = FakeServer::new();
    let mut machine = connected(&server, true);

    machine.begin_transaction().unwrap();
    machine.run_statement("CREATE (:A);", &no_params()).unwrap();
    machine.rollback_transaction().unwrap();

    assert!(!machine.is_transaction_open());
    let state = server.state();
    assert!(state.commits.is_empty());
    assert!(state.statements().is_empty());
    assert_eq!(state.resets, 0);
}

#[test]
fn test_transaction_preconditions() {
    let server = FakeServer::new();
    let mut machine = connected(&server, true);

    assert_eq!(
        machine.commit_transaction().unwrap_err().to_string(),
        "There is no open transaction to commit"
    );
    assert_eq!(
        machine.rollback_transaction().unwrap_err().to_string(),
        "There is no open transaction to rollback"
    );

    machine.begin_transaction().unwrap();
    assert_eq!(
        machine.begin_transaction().unwrap_err().to_string(),
        "There is already an open transaction"
    );
    assert!(matches!(
        machine.set_active_database("other").unwrap_err(),
        ShellError::Command(_)
    ));
}

#[test]
fn test_switching_database_reconnects_with_bookmark() {
    let server = FakeServer::new();
    let mut machine = connected(&server, true);
    machine.run_statement("CREATE (:A);", &no_params()).unwrap();

    machine.set_active_database("movies").unwrap();

    assert_eq!(machine.active_database_name(), "movies");
    assert_eq!(machine.actual_database_name(), Some("movies"));
    let state = server.state();
    assert_eq!(state.sessions.len(), 2);
    assert_eq!(state.sessions[1].database.as_deref(), Some("movies"));
    assert!(state.sessions[1].bookmark.is_some());
    assert_eq!(state.closed_sessions, 1);
}

#[test]
fn test_failed_switch_restores_previous_database_when_interactive() {
    let server = FakeServer::new();
    let mut machine = connected(&server, true);
    server.state().unknown_databases.push("missing".into());

    let err = machine.set_active_database("missing").unwrap_err();

    assert_eq!(err.code(), Some(DATABASE_NOT_FOUND));
    assert!(err.suppressed().is_empty());
    assert_eq!(machine.active_database_name(), "");
    assert!(machine.is_connected());
    assert_eq!(machine.actual_database_name(), Some(DEFAULT_DATABASE));
}

#[test]
fn test_bookmark_survives_a_switch_that_never_reached_the_server() {
    let server = FakeServer::new();
    let mut machine = connected(&server, true);
    machine.run_statement("CREATE (:A);", &no_params()).unwrap();
    server.state().fail_next_checks = 1;

    let err = machine.set_active_database("movies").unwrap_err();

    assert_eq!(err.to_string(), "Connection reset");
    assert!(machine.is_connected());
    assert_eq!(machine.active_database_name(), "");
    let state = server.state();
    assert_eq!(state.sessions.len(), 2);
    assert_eq!(state.sessions[1].database, None);
    assert_eq!(
        state.sessions[1].bookmark,
        Some(Bookmark(vec!["bookmark:1".to_string()]))
    );
}

#[test]
fn test_auto_commit_statements_update_the_actual_database() {
    let server = FakeServer::new();
    let mut machine = connected(&server, true);
    assert_eq!(machine.actual_database_name(), Some(DEFAULT_DATABASE));

    server.state().reported_database = Some("movies".to_string());
    machine.run_statement("MATCH (n) RETURN n;", &no_params()).unwrap();
    assert_eq!(machine.actual_database_name(), Some("movies"));

    server.state().reported_database = None;
    machine.evaluate("RETURN 1 + 2 AS value", &no_params()).unwrap();
    assert_eq!(machine.actual_database_name(), Some(DEFAULT_DATABASE));
}

#[test]
fn test_reset_interrupts_the_driver_and_clears_it_again() {
    let server = FakeServer::new();
    let mut machine = connected(&server, true);

    machine.reset();

    let state = server.state();
    assert_eq!(state.resets, 1);
    assert_eq!(state.interrupts, 1);
    assert_eq!(state.interrupt_clears, 1);
}

#[test]
fn test_failed_restore_is_attached_to_the_original_error() {
    let server = FakeServer::new();
    let mut machine = connected(&server, true);
    machine.set_active_database("movies").unwrap();
    server
        .state()
        .unknown_databases
        .extend(["missing".to_string(), "movies".to_string()]);

    let err = machine.set_active_database("missing").unwrap_err();

    assert!(err.to_string().contains("missing"));
    assert_eq!(err.suppressed().len(), 1);
    assert!(err.suppressed()[0].to_string().contains("movies"));
    assert_eq!(machine.active_database_name(), "movies");
}

#[test]
fn test_failed_switch_is_not_restored_when_not_interactive() {
    let server = FakeServer::new();
    let mut machine = connected(&server, false);
    server.state().unknown_databases.push("missing".into());

    assert!(machine.set_active_database("missing").is_err());
    assert_eq!(machine.active_database_name(), "missing");
    // the previous session was closed, the new one failed its probe
    assert_eq!(server.state().sessions.len(), 2);
}

#[test]
fn test_reset_discards_open_transaction() {
    let server = FakeServer::new();
    let mut machine = connected(&server, true);

    machine.begin_transaction().unwrap();
    machine.run_statement("CREATE (:A);", &no_params()).unwrap();
    machine.reset();

    assert!(!machine.is_transaction_open());
    assert_eq!(server.state().resets, 1);
    assert!(machine.begin_transaction().is_ok());
}

#[test]
fn test_reset_handle_works_without_the_machine() {
    let server = FakeServer::new();
    let mut machine = connected(&server, true);
    let handle = machine.reset_handle();

    machine.begin_transaction().unwrap();
    std::thread::spawn(move || handle.reset()).join().unwrap();

    assert!(!machine.is_transaction_open());
    assert_eq!(server.state().resets, 1);
    assert_eq!(
        machine.commit_transaction().unwrap_err().to_string(),
        "There is no open transaction to commit"
    );
}

#[test]
fn test_disconnect_returns_to_disconnected() {
    let server = FakeServer::new();
    let mut machine = connected(&server, true);

    machine.disconnect();

    assert!(!machine.is_connected());
    assert_eq!(machine.server_version(), "");
    assert_eq!(
        machine.run_statement("RETURN 1;", &no_params()).unwrap_err().to_string(),
        "Not connected to the database"
    );
    assert!(machine.connect(&config("")).is_ok());
    assert_eq!(server.state().drivers_created, 2);
}
