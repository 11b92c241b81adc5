//! [`QueryConnector`] over the Trino REST statement protocol.
//!
//! A statement is `POST`ed to `/v1/statement`; the server answers with the
//! first page and a `nextUri`, which is followed with `GET` until it is
//! absent. Column metadata and row data may arrive on any page.

use crate::clients::query::{QueryConnector, QueryError, QueryResult, QuerySession};
use crate::config::QuerySessionSettings;
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, instrument, warn};

const STATEMENT_PATH: &str = "/v1/statement";
const ROLE_HEADER_VALUE: &str = "system=ROLE{sysadmin}";
const PROBE_STATEMENT: &str = "SELECT 1";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StatementResponse {
    #[serde(default)]
    next_uri: Option<String>,
    #[serde(default)]
    columns: Option<Vec<Column>>,
    #[serde(default)]
    data: Option<Vec<Vec<Value>>>,
    #[serde(default)]
    error: Option<StatementError>,
}

#[derive(Debug, Deserialize)]
struct Column {
    name: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StatementError {
    message: String,
    #[serde(default)]
    error_name: Option<String>,
}

/// Opens [`TrinoSession`]s.
#[derive(Debug, Clone, Default)]
pub struct TrinoConnector;

impl TrinoConnector {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl QueryConnector for TrinoConnector {
    type Session = TrinoSession;

    /// Builds the HTTP client and probes the server with a trivial query.
    #[instrument(skip(self, settings), fields(url = %settings.url()))]
    async fn connect(
        &self,
        settings: &QuerySessionSettings,
    ) -> Result<Option<TrinoSession>, QueryError> {
        let session = TrinoSession::new(settings)?;
        match session.execute(PROBE_STATEMENT).await {
            Ok(_) => Ok(Some(session)),
            Err(QueryError::Server { status, message }) if status == 401 || status == 403 => {
                warn!(status, %message, "Query engine rejected the session credentials");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }
}

/// A Trino client bound to one user, catalog and schema.
pub struct TrinoSession {
    http: reqwest::Client,
    base_url: String,
    user: String,
    password: Option<String>,
    closed: bool,
}

impl TrinoSession {
    fn new(settings: &QuerySessionSettings) -> Result<Self, QueryError> {
        let mut headers = HeaderMap::new();
        let header = |value: &str| {
            HeaderValue::from_str(value).map_err(|e| QueryError::Protocol(e.to_string()))
        };
        headers.insert("x-trino-user", header(&settings.user)?);
        headers.insert("x-trino-catalog", header(&settings.catalog)?);
        headers.insert("x-trino-schema", header(&settings.schema)?);
        headers.insert("x-trino-role", header(ROLE_HEADER_VALUE)?);

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .connect_timeout(settings.connect_timeout)
            .timeout(settings.read_timeout)
            .build()
            .map_err(|e| QueryError::Transport {
                url: settings.url(),
                message: e.to_string(),
            })?;

        // Basic auth over plain http is refused by Trino.
        let password = settings
            .protocol
            .is_tls()
            .then(|| settings.password.clone());

        Ok(Self {
            http,
            base_url: settings.url(),
            user: settings.user.clone(),
            password,
            closed: false,
        })
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.password {
            Some(password) => request.basic_auth(&self.user, Some(password)),
            None => request,
        }
    }

    async fn fetch(&self, request: reqwest::RequestBuilder, url: &str) -> Result<StatementResponse, QueryError> {
        let transport = |e: reqwest::Error| QueryError::Transport {
            url: url.to_string(),
            message: e.to_string(),
        };
        let response = self.authorize(request).send().await.map_err(transport)?;
        let status = response.status();
        if !status.is_success() {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(QueryError::Server {
                status: status.as_u16(),
                message,
            });
        }
        response
            .json::<StatementResponse>()
            .await
            .map_err(|e| QueryError::Protocol(e.to_string()))
    }
}

#[async_trait]
impl QuerySession for TrinoSession {
    #[instrument(skip(self))]
    async fn execute(&self, sql: &str) -> Result<QueryResult, QueryError> {
        if self.closed {
            return Err(QueryError::NotConnected);
        }
        let url = format!("{}{}", self.base_url, STATEMENT_PATH);
        let mut page = self
            .fetch(self.http.post(&url).body(sql.to_string()), &url)
            .await?;

        let mut result = QueryResult::default();
        let mut pages = 1usize;
        loop {
            if let Some(error) = page.error.take() {
                return Err(QueryError::Query {
                    name: error.error_name.unwrap_or_else(|| "UNKNOWN".to_string()),
                    message: error.message,
                });
            }
            if result.columns.is_empty() {
                if let Some(columns) = page.columns.take() {
                    result.columns = columns.into_iter().map(|c| c.name).collect();
                }
            }
            if let Some(rows) = page.data.take() {
                result.rows.extend(rows);
            }
            let Some(next) = page.next_uri.take() else {
                break;
            };
            pages += 1;
            page = self.fetch(self.http.get(&next), &next).await?;
        }

        debug!(pages, rows = result.rows.len(), "Statement finished");
        Ok(result)
    }

    async fn close(&mut self) -> Result<(), QueryError> {
        self.closed = true;
        Ok(())
    }
}
