//! An in-memory query engine that understands the demo's statements.

use crate::clients::query::{QueryConnector, QueryError, QueryResult, QuerySession};
use crate::config::QuerySessionSettings;
use crate::framework::{FrameworkError, ResourceActor, ResourceClient};
use crate::sim::catalog::{Schema, SchemaAction, SchemaCreate, Table, TableAction, TableCreate};
use crate::sim::statement::Statement;
use crate::sim::store::SimulatedObjectStore;
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info, instrument};

const CHANNEL_CAPACITY: usize = 32;

/// `(catalog_name, connector_name)` pairs served by default.
const DEFAULT_CATALOGS: &[(&str, &str)] = &[
    ("hive", "hive"),
    ("iceberg", "iceberg"),
    ("system", "system"),
];

struct EngineState {
    schemas: ResourceClient<Schema>,
    tables: ResourceClient<Table>,
    catalogs: Vec<(String, String)>,
}

/// Simulated Trino. Clones share the same catalogs, schemas and tables.
#[derive(Clone)]
pub struct SimulatedQueryEngine {
    state: Arc<EngineState>,
    refuse_connections: bool,
}

impl SimulatedQueryEngine {
    /// Start schema and table actors; tables read their data from `store`.
    pub fn spawn(store: SimulatedObjectStore) -> Self {
        let (schema_actor, schemas) = ResourceActor::<Schema>::new(CHANNEL_CAPACITY);
        let (table_actor, tables) = ResourceActor::<Table>::new(CHANNEL_CAPACITY);
        tokio::spawn(schema_actor.run(()));
        tokio::spawn(table_actor.run(store));

        let catalogs = DEFAULT_CATALOGS
            .iter()
            .map(|(name, connector)| (name.to_string(), connector.to_string()))
            .collect();
        Self {
            state: Arc::new(EngineState {
                schemas,
                tables,
                catalogs,
            }),
            refuse_connections: false,
        }
    }

    /// A connector to the same engine whose `connect` hands out no session.
    pub fn refusing_connections(&self) -> Self {
        Self {
            state: self.state.clone(),
            refuse_connections: true,
        }
    }
}

#[async_trait]
impl QueryConnector for SimulatedQueryEngine {
    type Session = SimulatedSession;

    #[instrument(skip(self, settings), fields(user = %settings.user))]
    async fn connect(
        &self,
        settings: &QuerySessionSettings,
    ) -> Result<Option<SimulatedSession>, QueryError> {
        if self.refuse_connections {
            info!("Refusing connection");
            return Ok(None);
        }
        Ok(Some(SimulatedSession {
            state: self.state.clone(),
            closed: false,
        }))
    }
}

pub struct SimulatedSession {
    state: Arc<EngineState>,
    closed: bool,
}

fn query_error(name: &str, message: String) -> QueryError {
    QueryError::Query {
        name: name.to_string(),
        message,
    }
}

/// `not_found` names the error reported when the target resource is missing.
fn map_error(error: FrameworkError, not_found: &str, already_exists: &str) -> QueryError {
    match error {
        FrameworkError::NotFound(id) => query_error(not_found, format!("'{id}' does not exist")),
        FrameworkError::AlreadyExists(id) => {
            query_error(already_exists, format!("'{id}' already exists"))
        }
        other => match other.into_entity_error::<QueryError>() {
            Ok(query) => query,
            Err(other) => query_error("GENERIC_INTERNAL_ERROR", other.to_string()),
        },
    }
}

impl SimulatedSession {
    fn require_catalog(&self, catalog: &str) -> Result<(), QueryError> {
        if self.state.catalogs.iter().any(|(name, _)| name == catalog) {
            Ok(())
        } else {
            Err(query_error(
                "CATALOG_NOT_FOUND",
                format!("Catalog '{catalog}' does not exist"),
            ))
        }
    }

    async fn run(&self, statement: Statement) -> Result<QueryResult, QueryError> {
        let state = &self.state;
        match statement {
            Statement::CreateSchema {
                name,
                if_not_exists,
                mut properties,
            } => {
                self.require_catalog(&name.catalog)?;
                let params = SchemaCreate {
                    location: properties.remove("location"),
                };
                match state.schemas.create(name, params).await {
                    Ok(()) => Ok(QueryResult::default()),
                    Err(FrameworkError::AlreadyExists(_)) if if_not_exists => Ok(QueryResult::default()),
                    Err(e) => Err(map_error(e, "SCHEMA_NOT_FOUND", "SCHEMA_ALREADY_EXISTS")),
                }
            }
            Statement::CreateTable {
                name,
                if_not_exists,
                columns,
                mut properties,
            } => {
                self.require_catalog(&name.catalog)?;
                let schema = name.schema_name();
                let schema_exists = state
                    .schemas
                    .exists(schema.clone())
                    .await
                    .map_err(|e| map_error(e, "SCHEMA_NOT_FOUND", "SCHEMA_ALREADY_EXISTS"))?;
                if !schema_exists {
                    return Err(query_error(
                        "SCHEMA_NOT_FOUND",
                        format!("Schema '{schema}' does not exist"),
                    ));
                }
                let Some(location) = properties
                    .remove("external_location")
                    .or_else(|| properties.remove("location"))
                else {
                    return Err(query_error(
                        "INVALID_TABLE_PROPERTY",
                        format!("table '{name}' needs an external_location or location property"),
                    ));
                };
                let params = TableCreate {
                    columns,
                    location,
                    format: properties.remove("format"),
                };
                match state.tables.create(name.clone(), params).await {
                    Ok(()) => {}
                    Err(FrameworkError::AlreadyExists(_)) if if_not_exists => {
                        return Ok(QueryResult::default())
                    }
                    Err(e) => return Err(map_error(e, "TABLE_NOT_FOUND", "TABLE_ALREADY_EXISTS")),
                }
                state
                    .schemas
                    .perform_action(schema, SchemaAction::AttachTable(name.table))
                    .await
                    .map_err(|e| map_error(e, "SCHEMA_NOT_FOUND", "SCHEMA_ALREADY_EXISTS"))?;
                Ok(QueryResult::default())
            }
            Statement::DropTable { name, if_exists } => {
                match state.tables.delete(name.clone()).await {
                    Ok(()) => {}
                    Err(FrameworkError::NotFound(_)) if if_exists => return Ok(QueryResult::default()),
                    Err(e) => return Err(map_error(e, "TABLE_NOT_FOUND", "TABLE_ALREADY_EXISTS")),
                }
                let schema = name.schema_name();
                state
                    .schemas
                    .perform_action(schema, SchemaAction::DetachTable(name.table))
                    .await
                    .map_err(|e| map_error(e, "SCHEMA_NOT_FOUND", "SCHEMA_ALREADY_EXISTS"))?;
                Ok(QueryResult::default())
            }
            Statement::DropSchema { name, if_exists } => match state.schemas.delete(name).await {
                Ok(()) => Ok(QueryResult::default()),
                Err(FrameworkError::NotFound(_)) if if_exists => Ok(QueryResult::default()),
                Err(e) => Err(map_error(e, "SCHEMA_NOT_FOUND", "SCHEMA_ALREADY_EXISTS")),
            },
            Statement::ListCatalogs => Ok(QueryResult {
                columns: vec!["catalog_name".to_string(), "connector_name".to_string()],
                rows: state
                    .catalogs
                    .iter()
                    .map(|(name, connector)| {
                        vec![Value::String(name.clone()), Value::String(connector.clone())]
                    })
                    .collect(),
            }),
            Statement::SelectAll { name, limit } => state
                .tables
                .perform_action(name, TableAction::Scan { limit })
                .await
                .map_err(|e| map_error(e, "TABLE_NOT_FOUND", "TABLE_ALREADY_EXISTS")),
            Statement::SelectLiteral(value) => Ok(QueryResult {
                columns: vec!["_col0".to_string()],
                rows: vec![vec![Value::from(value)]],
            }),
        }
    }
}

#[async_trait]
impl QuerySession for SimulatedSession {
    #[instrument(skip(self))]
    async fn execute(&self, sql: &str) -> Result<QueryResult, QueryError> {
        if self.closed {
            return Err(QueryError::NotConnected);
        }
        let statement = Statement::parse(sql)?;
        debug!(?statement, "Parsed");
        self.run(statement).await
    }

    async fn close(&mut self) -> Result<(), QueryError> {
        self.closed = true;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clients::object_store::ObjectStore;
    use crate::config::Protocol;
    use bytes::Bytes;
    use std::time::Duration;

    fn settings() -> QuerySessionSettings {
        QuerySessionSettings {
            protocol: Protocol::Http,
            host: "sim".into(),
            port: 8080,
            user: "admin".into(),
            password: "pw".into(),
            catalog: "hive".into(),
            schema: "default".into(),
            connect_timeout: Duration::from_secs(1),
            read_timeout: Duration::from_secs(1),
        }
    }

    async fn session() -> (SimulatedObjectStore, SimulatedSession) {
        let store = SimulatedObjectStore::spawn();
        let engine = SimulatedQueryEngine::spawn(store.clone());
        let session = engine.connect(&settings()).await.unwrap().unwrap();
        (store, session)
    }

    fn error_name(result: Result<QueryResult, QueryError>) -> String {
        match result {
            Err(QueryError::Query { name, .. }) => name,
            other => panic!("expected a query error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_table_lifecycle() {
        let (store, session) = session().await;
        store.create_bucket("lake", true).await.unwrap();
        store
            .put_object("lake", "hive/customer/f1", Bytes::from_static(b"{\"id\": 7}"))
            .await
            .unwrap();

        session
            .execute("CREATE SCHEMA IF NOT EXISTS hive.demo WITH (location = 's3a://lake/hive/')")
            .await
            .unwrap();
        session
            .execute(
                "CREATE TABLE IF NOT EXISTS hive.demo.customer (id bigint) \
                 WITH (external_location = 's3a://lake/hive/customer', format = 'PARQUET')",
            )
            .await
            .unwrap();

        let rows = session.execute("SELECT * FROM hive.demo.customer LIMIT 10").await.unwrap();
        assert_eq!(rows.rows, vec![vec![Value::from(7)]]);

        assert_eq!(
            error_name(session.execute("DROP SCHEMA IF EXISTS hive.demo").await),
            "SCHEMA_NOT_EMPTY"
        );
        session.execute("DROP TABLE IF EXISTS hive.demo.customer").await.unwrap();
        session.execute("DROP SCHEMA IF EXISTS hive.demo").await.unwrap();
        session.execute("DROP SCHEMA IF EXISTS hive.demo").await.unwrap();
    }

    #[tokio::test]
    async fn test_errors_for_missing_objects() {
        let (_store, session) = session().await;
        assert_eq!(
            error_name(session.execute("SELECT * FROM hive.demo.customer").await),
            "TABLE_NOT_FOUND"
        );
        assert_eq!(
            error_name(
                session
                    .execute("CREATE TABLE hive.nope.t (id bigint) WITH (location = 's3a://b/t')")
                    .await
            ),
            "SCHEMA_NOT_FOUND"
        );
        assert_eq!(
            error_name(session.execute("CREATE SCHEMA delta.demo").await),
            "CATALOG_NOT_FOUND"
        );
        assert_eq!(error_name(session.execute("DROP TABLE hive.demo.t").await), "TABLE_NOT_FOUND");
    }

    #[tokio::test]
    async fn test_catalog_listing_and_probe() {
        let (_store, session) = session().await;
        let catalogs = session.execute("select * from system.metadata.catalogs").await.unwrap();
        assert!(catalogs.column_values("catalog_name").contains(&&Value::from("hive")));

        let probe = session.execute("SELECT 1").await.unwrap();
        assert_eq!(probe.rows, vec![vec![Value::from(1)]]);
    }

    #[tokio::test]
    async fn test_closed_session_and_refused_connections() {
        let (store, mut session) = session().await;
        session.close().await.unwrap();
        assert!(matches!(session.execute("SELECT 1").await, Err(QueryError::NotConnected)));

        let refusing = SimulatedQueryEngine::spawn(store).refusing_connections();
        assert!(refusing.connect(&settings()).await.unwrap().is_none());
    }
}
