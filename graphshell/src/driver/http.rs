// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Driver for the server's transactional HTTP endpoint
//!
//! Each statement (or each committed batch) is one `POST
//! /db/{database}/tx/commit` request. Requests run on a private tokio
//! runtime so the blocking [`DriverSession`] API can be served from the
//! shell's loop thread. An interrupt from another thread abandons the
//! in-flight request, and a request started while an interrupt is pending
//! is never sent.

use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use reqwest::header::ACCEPT;
use reqwest::{StatusCode, Url};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::runtime::Runtime;
use tokio::sync::watch;

use super::{
    Bookmark, Driver, DriverError, DriverProvider, DriverSession, Parameters, Query,
    QueryOutcome, ResultSummary, SessionConfig, UNAUTHORIZED_CODE,
};
use crate::config::ConnectionConfig;

/// Database used in request paths when the user did not pick one
pub const DEFAULT_DATABASE: &str = "neo4j";

/// Product prefix of the version string reported in summaries
const SERVER_AGENT_PRODUCT: &str = "Neo4j";

/// Codes after which the session has to be re-established
const SESSION_EXPIRED_CODES: &[&str] = &[
    "Neo.ClientError.Cluster.NotALeader",
    "Neo.ClientError.General.ForbiddenOnReadOnlyDatabase",
];

const JSON_MEDIA_TYPE: &str = "application/json;charset=UTF-8";

#[derive(Debug, Deserialize)]
struct Discovery {
    #[serde(default)]
    neo4j_version: Option<String>,
}

#[derive(Debug, Serialize)]
struct CommitRequest<'a> {
    statements: Vec<StatementPayload<'a>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    bookmarks: Vec<String>,
}

#[derive(Debug, Serialize)]
struct StatementPayload<'a> {
    statement: &'a str,
    parameters: &'a Parameters,
    #[serde(rename = "resultDataContents")]
    result_data_contents: [&'static str; 1],
}

#[derive(Debug, Deserialize)]
struct CommitResponse {
    #[serde(default)]
    results: Vec<ResultPayload>,
    #[serde(default)]
    errors: Vec<ErrorPayload>,
    #[serde(default, rename = "lastBookmarks")]
    last_bookmarks: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct ResultPayload {
    #[serde(default)]
    columns: Vec<String>,
    #[serde(default)]
    data: Vec<RowPayload>,
}

#[derive(Debug, Deserialize)]
struct RowPayload {
    #[serde(default)]
    row: Vec<Value>,
}

#[derive(Debug, Deserialize)]
struct ErrorPayload {
    code: String,
    #[serde(default)]
    message: String,
}

/// Interrupt requests shared by a driver and all of its sessions
///
/// An interrupt stays pending until cleared, so one requested before a
/// request starts still stops it.
struct Interrupts {
    requested: watch::Sender<u64>,
    cleared: AtomicU64,
}

impl Interrupts {
    fn new() -> Self {
        let (requested, _) = watch::channel(0);
        Self {
            requested,
            cleared: AtomicU64::new(0),
        }
    }

    fn interrupt(&self) {
        self.requested.send_modify(|epoch| *epoch = epoch.wrapping_add(1));
    }

    fn clear(&self) {
        let epoch = *self.requested.borrow();
        self.cleared.store(epoch, Ordering::SeqCst);
    }

    fn is_pending(&self, epoch: u64) -> bool {
        epoch != self.cleared.load(Ordering::SeqCst)
    }

    /// Resolves once an interrupt is pending
    async fn pending(&self) {
        let mut requested = self.requested.subscribe();
        loop {
            let epoch = *requested.borrow_and_update();
            if self.is_pending(epoch) {
                return;
            }
            if requested.changed().await.is_err() {
                return std::future::pending().await;
            }
        }
    }
}

struct HttpShared {
    base: Url,
    client: reqwest::Client,
    username: String,
    password: String,
    runtime: Runtime,
    server_version: Mutex<Option<String>>,
    interrupts: Interrupts,
}

impl HttpShared {
    /// Drive `request` to completion unless an interrupt is or becomes pending
    fn block_on<T>(
        &self,
        request: impl Future<Output = Result<T, DriverError>>,
    ) -> Result<T, DriverError> {
        self.runtime.block_on(async {
            tokio::select! {
                biased;
                _ = self.interrupts.pending() => Err(DriverError::Interrupted),
                result = request => result,
            }
        })
    }

    fn authorize(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        if self.username.is_empty() {
            builder
        } else {
            builder.basic_auth(&self.username, Some(&self.password))
        }
    }

    async fn discover(&self) -> Result<Discovery, DriverError> {
        let resp = self
            .authorize(self.client.get(self.base.clone()))
            .header(ACCEPT, JSON_MEDIA_TYPE)
            .send()
            .await
            .map_err(transport_error)?;

        let status = resp.status();
        if status == StatusCode::UNAUTHORIZED {
            return Err(DriverError::Authentication(
                "The client is unauthorized due to authentication failure.".to_string(),
            ));
        }
        if !status.is_success() {
            return Err(DriverError::ServiceUnavailable(format!(
                "Discovery request to {} failed: HTTP {}",
                self.base, status
            )));
        }

        resp.json::<Discovery>()
            .await
            .map_err(|e| DriverError::Protocol(format!("Invalid discovery document: {}", e)))
    }

    async fn commit(
        &self,
        database: &str,
        queries: &[Query],
        bookmark: Option<Bookmark>,
    ) -> Result<(Vec<QueryOutcome>, Vec<String>), DriverError> {
        let url = commit_url(&self.base, database)?;
        let body = CommitRequest {
            statements: queries
                .iter()
                .map(|q| StatementPayload {
                    statement: &q.text,
                    parameters: &q.parameters,
                    result_data_contents: ["row"],
                })
                .collect(),
            bookmarks: bookmark.map(|b| b.0).unwrap_or_default(),
        };

        log::debug!("POST {} ({} statement(s))", url, body.statements.len());
        let resp = self
            .authorize(self.client.post(url))
            .header(ACCEPT, JSON_MEDIA_TYPE)
            .json(&body)
            .send()
            .await
            .map_err(transport_error)?;

        let status = resp.status();
        let payload = match resp.json::<CommitResponse>().await {
            Ok(payload) => payload,
            Err(e) => return Err(status_error(status).unwrap_or_else(|| {
                DriverError::Protocol(format!("Invalid response from server: {}", e))
            })),
        };

        if let Some(err) = payload.errors.into_iter().next() {
            return Err(server_error(err));
        }
        if let Some(err) = status_error(status) {
            return Err(err);
        }

        let version = self.server_version.lock().clone();
        let outcomes = payload
            .results
            .into_iter()
            .map(|result| QueryOutcome {
                keys: result.columns,
                records: result.data.into_iter().map(|d| d.row).collect(),
                summary: ResultSummary {
                    server_version: version.clone(),
                    database: Some(database.to_string()),
                },
            })
            .collect();

        Ok((outcomes, payload.last_bookmarks))
    }
}

/// Driver talking to `http://` or `https://` addresses
pub struct HttpDriver {
    shared: Arc<HttpShared>,
}

impl HttpDriver {
    pub fn new(config: &ConnectionConfig) -> Result<Self, DriverError> {
        let base = Url::parse(&config.address).map_err(|e| {
            DriverError::Protocol(format!("Invalid address '{}': {}", config.address, e))
        })?;
        match base.scheme() {
            "http" | "https" => {}
            other => {
                return Err(DriverError::Protocol(format!(
                    "Unsupported scheme '{}', expected http or https",
                    other
                )))
            }
        }

        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .thread_name("graphshell-http")
            .enable_all()
            .build()
            .map_err(|e| DriverError::Protocol(format!("Failed to start runtime: {}", e)))?;
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| DriverError::Protocol(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            shared: Arc::new(HttpShared {
                base,
                client,
                username: config.username.clone(),
                password: config.password.clone(),
                runtime,
                server_version: Mutex::new(None),
                interrupts: Interrupts::new(),
            }),
        })
    }

    /// Provider building an [`HttpDriver`] per connect
    pub fn provider() -> DriverProvider {
        Box::new(|config| Ok(Arc::new(HttpDriver::new(config)?) as Arc<dyn Driver>))
    }
}

impl Driver for HttpDriver {
    fn verify_connectivity(&self) -> Result<(), DriverError> {
        let discovery = self.shared.block_on(self.shared.discover())?;
        let version = discovery
            .neo4j_version
            .map(|v| format!("{}/{}", SERVER_AGENT_PRODUCT, v));
        log::debug!("Server at {} reports version {:?}", self.shared.base, version);
        *self.shared.server_version.lock() = version;
        Ok(())
    }

    fn session(&self, config: SessionConfig) -> Result<Arc<dyn DriverSession>, DriverError> {
        Ok(Arc::new(HttpSession {
            shared: Arc::clone(&self.shared),
            database: config
                .database
                .unwrap_or_else(|| DEFAULT_DATABASE.to_string()),
            bookmark: Mutex::new(config.bookmark),
            open: AtomicBool::new(true),
        }))
    }

    fn interrupt(&self) {
        self.shared.interrupts.interrupt();
    }

    fn clear_interrupt(&self) {
        self.shared.interrupts.clear();
    }

    fn close(&self) -> Result<(), DriverError> {
        Ok(())
    }
}

/// Session bound to one database path
pub struct HttpSession {
    shared: Arc<HttpShared>,
    database: String,
    bookmark: Mutex<Option<Bookmark>>,
    open: AtomicBool,
}

impl HttpSession {
    fn execute(&self, queries: &[Query]) -> Result<Vec<QueryOutcome>, DriverError> {
        if !self.is_open() {
            return Err(DriverError::SessionExpired("Session is closed".to_string()));
        }

        let bookmark = self.bookmark.lock().clone();
        let (outcomes, bookmarks) = self
            .shared
            .block_on(self.shared.commit(&self.database, queries, bookmark))?;

        if !bookmarks.is_empty() {
            *self.bookmark.lock() = Some(Bookmark(bookmarks));
        }
        Ok(outcomes)
    }
}

impl DriverSession for HttpSession {
    fn run(&self, query: &Query) -> Result<QueryOutcome, DriverError> {
        self.execute(std::slice::from_ref(query))?
            .into_iter()
            .next()
            .ok_or_else(|| DriverError::Protocol("Server returned no result".to_string()))
    }

    fn write_transaction(&self, queries: &[Query]) -> Result<Vec<QueryOutcome>, DriverError> {
        if queries.is_empty() {
            return Ok(Vec::new());
        }
        self.execute(queries)
    }

    fn last_bookmark(&self) -> Option<Bookmark> {
        self.bookmark.lock().clone()
    }

    fn reset(&self) -> Result<(), DriverError> {
        // each request is its own transaction, so abandoning it is the whole reset
        self.shared.interrupts.interrupt();
        Ok(())
    }

    /// Closing leaves requests of other sessions on the same driver running
    fn close(&self) -> Result<(), DriverError> {
        self.open.store(false, Ordering::SeqCst);
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }
}

fn commit_url(base: &Url, database: &str) -> Result<Url, DriverError> {
    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|_| DriverError::Protocol(format!("Address '{}' cannot be a base URL", base)))?
        .pop_if_empty()
        .extend(["db", database, "tx", "commit"]);
    Ok(url)
}

fn transport_error(err: reqwest::Error) -> DriverError {
    if err.is_decode() {
        DriverError::Protocol(err.to_string())
    } else {
        DriverError::ServiceUnavailable(format!("Unable to reach the server: {}", err))
    }
}

fn status_error(status: StatusCode) -> Option<DriverError> {
    if status == StatusCode::UNAUTHORIZED {
        Some(DriverError::Authentication(
            "The client is unauthorized due to authentication failure.".to_string(),
        ))
    } else if !status.is_success() {
        Some(DriverError::ServiceUnavailable(format!(
            "Server responded with HTTP {}",
            status
        )))
    } else {
        None
    }
}

fn server_error(err: ErrorPayload) -> DriverError {
    if err.code == UNAUTHORIZED_CODE {
        DriverError::Authentication(err.message)
    } else if SESSION_EXPIRED_CODES.contains(&err.code.as_str()) {
        DriverError::SessionExpired(err.message)
    } else {
        DriverError::Server {
            code: err.code,
            message: err.message,
        }
    }
}
