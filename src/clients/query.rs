//! # Query Engine Interface
//!
//! A query engine is reached in two steps: a [`QueryConnector`] opens a
//! [`QuerySession`], and the session executes SQL until it is closed.
//! [`QuerySessionHandle`] owns both and tracks whether a session is live.

use crate::config::QuerySessionSettings;
use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, error, info, instrument};

#[derive(Debug, Error)]
pub enum QueryError {
    #[error("no query session is connected")]
    NotConnected,

    #[error("transport error talking to {url}: {message}")]
    Transport { url: String, message: String },

    #[error("server answered {status}: {message}")]
    Server { status: u16, message: String },

    #[error("query failed ({name}): {message}")]
    Query { name: String, message: String },

    #[error("unexpected response: {0}")]
    Protocol(String),
}

/// Rows returned by one statement.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryResult {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

impl QueryResult {
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Values of the named column, in row order.
    pub fn column_values(&self, name: &str) -> Vec<&Value> {
        let Some(index) = self.columns.iter().position(|c| c == name) else {
            return Vec::new();
        };
        self.rows.iter().filter_map(|row| row.get(index)).collect()
    }
}

/// A live session on the query engine.
#[async_trait]
pub trait QuerySession: Send + Sync {
    async fn execute(&self, sql: &str) -> Result<QueryResult, QueryError>;

    async fn close(&mut self) -> Result<(), QueryError>;
}

/// Opens sessions.
///
/// `Ok(None)` means the engine was reachable but refused to hand out a
/// session; `Err` means it could not be reached at all.
#[async_trait]
pub trait QueryConnector: Send + Sync {
    type Session: QuerySession;

    async fn connect(
        &self,
        settings: &QuerySessionSettings,
    ) -> Result<Option<Self::Session>, QueryError>;
}

/// Connection parameters plus the session, once there is one.
///
/// A `Some` session always means `connect` succeeded.
pub struct QuerySessionHandle<C: QueryConnector> {
    settings: QuerySessionSettings,
    connector: C,
    session: Option<C::Session>,
}

impl<C: QueryConnector> QuerySessionHandle<C> {
    pub fn new(settings: QuerySessionSettings, connector: C) -> Self {
        Self {
            settings,
            connector,
            session: None,
        }
    }

    pub fn settings(&self) -> &QuerySessionSettings {
        &self.settings
    }

    pub fn is_connected(&self) -> bool {
        self.session.is_some()
    }

    /// Opens a session. Failures are logged and leave the handle disconnected.
    #[instrument(skip(self), fields(url = %self.settings.url(), user = %self.settings.user))]
    pub async fn connect(&mut self) -> bool {
        if self.session.is_some() {
            debug!("Session already established");
            return true;
        }
        match self.connector.connect(&self.settings).await {
            Ok(Some(session)) => {
                info!(
                    catalog = %self.settings.catalog,
                    schema = %self.settings.schema,
                    "Query session established"
                );
                self.session = Some(session);
                true
            }
            Ok(None) => {
                error!("Query engine did not return a session");
                false
            }
            Err(e) => {
                error!(error = %e, "Could not connect to the query engine");
                false
            }
        }
    }

    #[instrument(skip(self))]
    pub async fn execute(&self, sql: &str) -> Result<QueryResult, QueryError> {
        let session = self.session.as_ref().ok_or(QueryError::NotConnected)?;
        debug!("Executing statement");
        session.execute(sql).await
    }

    /// Closes the session; the handle is disconnected afterwards even if
    /// closing failed.
    #[instrument(skip(self))]
    pub async fn disconnect(&mut self) -> Result<(), QueryError> {
        let mut session = self.session.take().ok_or(QueryError::NotConnected)?;
        let closed = session.close().await;
        match &closed {
            Ok(()) => info!("Query session closed"),
            Err(e) => error!(error = %e, "Query session did not close cleanly"),
        }
        closed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Protocol;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    struct EchoSession {
        closed: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl QuerySession for EchoSession {
        async fn execute(&self, sql: &str) -> Result<QueryResult, QueryError> {
            Ok(QueryResult {
                columns: vec!["sql".into()],
                rows: vec![vec![Value::String(sql.into())]],
            })
        }

        async fn close(&mut self) -> Result<(), QueryError> {
            self.closed.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    enum Behaviour {
        Accept,
        Refuse,
        Unreachable,
    }

    struct FakeConnector {
        behaviour: Behaviour,
        closed: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl QueryConnector for FakeConnector {
        type Session = EchoSession;

        async fn connect(
            &self,
            settings: &QuerySessionSettings,
        ) -> Result<Option<EchoSession>, QueryError> {
            match self.behaviour {
                Behaviour::Accept => Ok(Some(EchoSession {
                    closed: self.closed.clone(),
                })),
                Behaviour::Refuse => Ok(None),
                Behaviour::Unreachable => Err(QueryError::Transport {
                    url: settings.url(),
                    message: "connection refused".into(),
                }),
            }
        }
    }

    fn settings() -> QuerySessionSettings {
        QuerySessionSettings {
            protocol: Protocol::Http,
            host: "localhost".into(),
            port: 8080,
            user: "admin".into(),
            password: "pw".into(),
            catalog: "hive".into(),
            schema: "default".into(),
            connect_timeout: Duration::from_secs(1),
            read_timeout: Duration::from_secs(1),
        }
    }

    fn handle(behaviour: Behaviour) -> (QuerySessionHandle<FakeConnector>, Arc<AtomicUsize>) {
        let closed = Arc::new(AtomicUsize::new(0));
        let connector = FakeConnector {
            behaviour,
            closed: closed.clone(),
        };
        (QuerySessionHandle::new(settings(), connector), closed)
    }

    #[tokio::test]
    async fn test_execute_requires_a_session() {
        let (handle, _) = handle(Behaviour::Accept);
        assert!(matches!(handle.execute("SELECT 1").await, Err(QueryError::NotConnected)));
    }

    #[tokio::test]
    async fn test_connect_execute_disconnect() {
        let (mut handle, closed) = handle(Behaviour::Accept);
        assert!(handle.connect().await);
        assert!(handle.is_connected());

        let result = handle.execute("SELECT 1").await.unwrap();
        assert_eq!(result.column_values("sql"), vec![&Value::String("SELECT 1".into())]);

        handle.disconnect().await.unwrap();
        assert!(!handle.is_connected());
        assert_eq!(closed.load(Ordering::SeqCst), 1);
        assert!(matches!(handle.disconnect().await, Err(QueryError::NotConnected)));
    }

    #[tokio::test]
    async fn test_failed_connect_leaves_handle_disconnected() {
        let (mut refused, _) = handle(Behaviour::Refuse);
        assert!(!refused.connect().await);
        assert!(!refused.is_connected());

        let (mut unreachable, _) = handle(Behaviour::Unreachable);
        assert!(!unreachable.connect().await);
        assert!(matches!(unreachable.disconnect().await, Err(QueryError::NotConnected)));
    }
}
