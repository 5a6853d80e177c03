//! Relational Storage Adapter
//!
//! Stores each collection in its own table through `sqlx`'s `Any` driver.
//! MySQL is the production dialect; SQLite is supported for local runs and
//! tests and shares every code path except DDL and type names.
//!
//! ## Table layout
//!
//! Every collection maps to the same two-column shape. Nested values are
//! kept whole in a serialized JSON blob column; filters, sorts, and indexes
//! reach into it through JSON path extraction.
//!
//! ```sql
//! -- MySQL
//! CREATE TABLE IF NOT EXISTS `staff` (
//!     id  BIGINT NOT NULL AUTO_INCREMENT PRIMARY KEY,
//!     doc LONGTEXT NOT NULL
//! ) DEFAULT CHARSET = utf8mb4;
//!
//! -- SQLite
//! CREATE TABLE IF NOT EXISTS "staff" (
//!     id  INTEGER PRIMARY KEY AUTOINCREMENT,
//!     doc TEXT NOT NULL
//! );
//! ```
//!
//! Values and JSON paths are always bound as parameters. Table, column, and
//! index names cannot be bound, so they are validated identifiers before they
//! are interpolated.

use async_trait::async_trait;
use serde_json::Value;
use sqlx::any::{AnyPoolOptions, AnyRow};
use sqlx::{AnyPool, Row};
use std::collections::HashSet;
use std::sync::{Mutex, Once};
use std::time::Duration;
use tokio::sync::RwLock;

use super::query::{BoundKind, Condition, QuerySpec, SortDirection};
use super::record::{validate_collection, validate_fields, Fields, Record, RecordSet};
use super::schema::{CollectionSpec, IndexSpec, SchemaSpec};
use super::traits::{AdapterKind, ProvisionReport, StorageAdapter, StoreError, StoreResult};
use crate::config::{RelationalDriver, RelationalTarget};

static INSTALL_DRIVERS: Once = Once::new();

fn install_drivers() {
    INSTALL_DRIVERS.call_once(sqlx::any::install_default_drivers);
}

/// Value bound to a `?` placeholder
#[derive(Debug, Clone, PartialEq)]
enum SqlParam {
    Text(String),
    Int(i64),
    Float(f64),
}

impl SqlParam {
    fn number(value: &serde_json::Number) -> Self {
        match value.as_i64() {
            Some(i) => SqlParam::Int(i),
            None => SqlParam::Float(value.as_f64().unwrap_or(f64::NAN)),
        }
    }
}

/// A statement plus its parameters, in placeholder order.
#[derive(Debug, Clone, Default, PartialEq)]
struct Statement {
    sql: String,
    params: Vec<SqlParam>,
}

fn bind_all<'q>(
    sql: &'q str,
    params: Vec<SqlParam>,
) -> sqlx::query::Query<'q, sqlx::Any, sqlx::any::AnyArguments<'q>> {
    let mut query = sqlx::query(sql);
    for param in params {
        query = match param {
            SqlParam::Text(s) => query.bind(s),
            SqlParam::Int(i) => query.bind(i),
            SqlParam::Float(f) => query.bind(f),
        };
    }
    query
}

/// Dialect-specific SQL
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Dialect(RelationalDriver);

impl Dialect {
    fn quote(&self, ident: &str) -> String {
        match self.0 {
            RelationalDriver::MySql => format!("`{}`", ident),
            RelationalDriver::Sqlite => format!("\"{}\"", ident),
        }
    }

    fn create_table(&self, table: &str) -> String {
        match self.0 {
            RelationalDriver::MySql => format!(
                "CREATE TABLE IF NOT EXISTS {} (id BIGINT NOT NULL AUTO_INCREMENT PRIMARY KEY, doc LONGTEXT NOT NULL) DEFAULT CHARSET = utf8mb4",
                self.quote(table)
            ),
            RelationalDriver::Sqlite => format!(
                "CREATE TABLE IF NOT EXISTS {} (id INTEGER PRIMARY KEY AUTOINCREMENT, doc TEXT NOT NULL)",
                self.quote(table)
            ),
        }
    }

    fn table_exists(&self) -> &'static str {
        match self.0 {
            RelationalDriver::MySql => {
                "SELECT COUNT(*) FROM information_schema.tables WHERE table_schema = DATABASE() AND table_name = ?"
            }
            RelationalDriver::Sqlite => {
                "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?"
            }
        }
    }

    fn index_exists(&self) -> &'static str {
        match self.0 {
            RelationalDriver::MySql => {
                "SELECT COUNT(*) FROM information_schema.statistics WHERE table_schema = DATABASE() AND table_name = ? AND index_name = ?"
            }
            RelationalDriver::Sqlite => {
                "SELECT COUNT(*) FROM sqlite_master WHERE type = 'index' AND tbl_name = ? AND name = ?"
            }
        }
    }

    /// Expression index over a JSON path. The field is a validated path, so
    /// it can be embedded in the DDL literal.
    fn create_index(&self, table: &str, index: &IndexSpec) -> String {
        let unique = if index.unique { "UNIQUE " } else { "" };
        let name = self.quote(&index.name_for(table));
        match self.0 {
            RelationalDriver::MySql => format!(
                "CREATE {}INDEX {} ON {} ((CAST(JSON_UNQUOTE(JSON_EXTRACT(doc, '$.{}')) AS CHAR(255)) COLLATE utf8mb4_bin))",
                unique,
                name,
                self.quote(table),
                index.field
            ),
            RelationalDriver::Sqlite => format!(
                "CREATE {}INDEX IF NOT EXISTS {} ON {} (json_extract(doc, '$.{}'))",
                unique,
                name,
                self.quote(table),
                index.field
            ),
        }
    }

    fn schema_objects(&self) -> &'static str {
        match self.0 {
            RelationalDriver::MySql => {
                "SELECT CAST(kind AS CHAR) AS kind, CAST(name AS CHAR) AS name FROM (\
                 SELECT 'table' AS kind, table_name AS name FROM information_schema.tables WHERE table_schema = DATABASE() \
                 UNION SELECT 'index' AS kind, index_name AS name FROM information_schema.statistics \
                 WHERE table_schema = DATABASE() AND index_name <> 'PRIMARY') objects ORDER BY kind, name"
            }
            RelationalDriver::Sqlite => {
                "SELECT type AS kind, name FROM sqlite_master \
                 WHERE type IN ('table', 'index') AND name NOT LIKE 'sqlite_%' ORDER BY kind, name"
            }
        }
    }

    fn insert(&self, table: &str) -> String {
        match self.0 {
            RelationalDriver::MySql => {
                format!("INSERT INTO {} (doc) VALUES (?)", self.quote(table))
            }
            // The Any driver does not report SQLite's last insert rowid.
            RelationalDriver::Sqlite => format!(
                "INSERT INTO {} (doc) VALUES (?) RETURNING id",
                self.quote(table)
            ),
        }
    }

    fn select_for_update(&self, table: &str) -> String {
        match self.0 {
            RelationalDriver::MySql => format!(
                "SELECT id, doc FROM {} WHERE id = ? FOR UPDATE",
                self.quote(table)
            ),
            RelationalDriver::Sqlite => {
                format!("SELECT id, doc FROM {} WHERE id = ?", self.quote(table))
            }
        }
    }

    /// SQL type tags for values of `kind`
    fn type_guard(&self, kind: TypeClass) -> &'static str {
        match (self.0, kind) {
            (RelationalDriver::MySql, TypeClass::Number) => {
                "JSON_TYPE(JSON_EXTRACT(doc, ?)) IN ('INTEGER', 'UNSIGNED INTEGER', 'DOUBLE', 'DECIMAL')"
            }
            (RelationalDriver::MySql, TypeClass::String) => {
                "JSON_TYPE(JSON_EXTRACT(doc, ?)) = 'STRING'"
            }
            (RelationalDriver::MySql, TypeClass::Bool) => {
                "JSON_TYPE(JSON_EXTRACT(doc, ?)) = 'BOOLEAN'"
            }
            (RelationalDriver::Sqlite, TypeClass::Number) => {
                "json_type(doc, ?) IN ('integer', 'real')"
            }
            (RelationalDriver::Sqlite, TypeClass::String) => "json_type(doc, ?) = 'text'",
            (RelationalDriver::Sqlite, TypeClass::Bool) => {
                "json_type(doc, ?) IN ('true', 'false')"
            }
        }
    }

    /// `<json value at path> <op> <bound value>`
    fn compare(&self, op: &str, path: &str, value: &Value, params: &mut Vec<SqlParam>) -> String {
        params.push(SqlParam::Text(path.to_string()));
        match self.0 {
            RelationalDriver::MySql => {
                params.push(SqlParam::Text(value.to_string()));
                format!("JSON_EXTRACT(doc, ?) {} CAST(? AS JSON)", op)
            }
            RelationalDriver::Sqlite => {
                match value {
                    Value::Number(n) => params.push(SqlParam::number(n)),
                    Value::String(s) => params.push(SqlParam::Text(s.clone())),
                    other => params.push(SqlParam::Text(other.to_string())),
                }
                format!("json_extract(doc, ?) {} ?", op)
            }
        }
    }

    fn predicate(&self, field: &str, condition: &Condition) -> (String, Vec<SqlParam>) {
        let path = json_path(field);
        let mut params = Vec::new();
        let sql = match condition {
            Condition::Eq(Value::Null) => {
                params.push(SqlParam::Text(path));
                match self.0 {
                    RelationalDriver::MySql => {
                        "COALESCE(JSON_TYPE(JSON_EXTRACT(doc, ?)), 'NULL') = 'NULL'".to_string()
                    }
                    RelationalDriver::Sqlite => {
                        "COALESCE(json_type(doc, ?), 'null') = 'null'".to_string()
                    }
                }
            }
            Condition::Eq(Value::Bool(b)) => {
                params.push(SqlParam::Text(path.clone()));
                match self.0 {
                    RelationalDriver::MySql => {
                        let cmp = self.compare("=", &path, &Value::Bool(*b), &mut params);
                        format!("{} AND {}", self.type_guard(TypeClass::Bool), cmp)
                    }
                    RelationalDriver::Sqlite => {
                        params.push(SqlParam::Text(b.to_string()));
                        "json_type(doc, ?) = ?".to_string()
                    }
                }
            }
            Condition::Eq(value) => {
                let class = match value {
                    Value::Number(_) => TypeClass::Number,
                    _ => TypeClass::String,
                };
                params.push(SqlParam::Text(path.clone()));
                let cmp = self.compare("=", &path, value, &mut params);
                format!("{} AND {}", self.type_guard(class), cmp)
            }
            Condition::Range(range) => {
                let bounds = range.bounds();
                let class = match bounds.first().and_then(|(_, v)| BoundKind::of(v)) {
                    Some(BoundKind::Number) => TypeClass::Number,
                    _ => TypeClass::String,
                };
                params.push(SqlParam::Text(path.clone()));
                let mut clauses = vec![self.type_guard(class).to_string()];
                for (op, bound) in bounds {
                    clauses.push(self.compare(op.sql(), &path, bound, &mut params));
                }
                clauses.join(" AND ")
            }
        };
        (format!("({})", sql), params)
    }

    fn select(&self, table: &str, query: &QuerySpec) -> Statement {
        let mut sql = format!("SELECT id, doc FROM {}", self.quote(table));
        let mut params = Vec::new();

        let mut predicates = Vec::new();
        for (field, condition) in &query.filter {
            let (clause, clause_params) = self.predicate(field, condition);
            predicates.push(clause);
            params.extend(clause_params);
        }
        if !predicates.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&predicates.join(" AND "));
        }

        match &query.sort {
            Some(sort) => {
                let direction = match sort.direction {
                    SortDirection::Asc => "ASC",
                    SortDirection::Desc => "DESC",
                };
                sql.push_str(&format!(
                    " ORDER BY JSON_EXTRACT(doc, ?) {}, id ASC",
                    direction
                ));
                params.push(SqlParam::Text(json_path(&sort.field)));
            }
            None => sql.push_str(" ORDER BY id ASC"),
        }

        if query.offset.is_some() || query.limit.is_some() {
            let limit = query
                .limit
                .map(|l| i64::try_from(l).unwrap_or(i64::MAX))
                .unwrap_or(i64::MAX);
            let offset = query
                .offset
                .map(|o| i64::try_from(o).unwrap_or(i64::MAX))
                .unwrap_or(0);
            sql.push_str(" LIMIT ? OFFSET ?");
            params.push(SqlParam::Int(limit));
            params.push(SqlParam::Int(offset));
        }

        Statement { sql, params }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TypeClass {
    Number,
    String,
    Bool,
}

fn json_path(field: &str) -> String {
    format!("$.{}", field)
}

/// Connection URL for `target`. Contains the password; never log it.
pub fn connection_url(target: &RelationalTarget) -> String {
    let endpoint = &target.endpoint;
    match target.driver {
        RelationalDriver::MySql => {
            let auth = if endpoint.user.is_empty() {
                String::new()
            } else if endpoint.password.is_empty() {
                format!("{}@", urlencoding::encode(&endpoint.user))
            } else {
                format!(
                    "{}:{}@",
                    urlencoding::encode(&endpoint.user),
                    urlencoding::encode(endpoint.password.expose())
                )
            };
            format!(
                "mysql://{}{}:{}/{}",
                auth,
                endpoint.host,
                endpoint.port,
                urlencoding::encode(&endpoint.database)
            )
        }
        RelationalDriver::Sqlite => {
            if endpoint.database == ":memory:" {
                "sqlite::memory:".to_string()
            } else {
                format!("sqlite://{}?mode=rwc", endpoint.database)
            }
        }
    }
}

fn row_to_record(row: &AnyRow) -> StoreResult<Record> {
    let id: i64 = row
        .try_get("id")
        .map_err(|e| StoreError::backend(e.to_string()))?;
    let doc: String = row
        .try_get("doc")
        .map_err(|e| StoreError::backend(e.to_string()))?;
    match serde_json::from_str::<Value>(&doc)? {
        Value::Object(fields) => Ok(Record::new(id.to_string(), fields)),
        _ => Err(StoreError::Serialization(format!(
            "row {} does not hold a JSON object",
            id
        ))),
    }
}

/// Only the canonical decimal form names a row: `"01"` and `"+1"` do not.
fn parse_id(id: &str) -> Option<i64> {
    id.parse::<i64>()
        .ok()
        .filter(|i| *i > 0 && i.to_string() == id)
}

fn db_err(e: sqlx::Error) -> StoreError {
    StoreError::backend(e.to_string())
}

/// Relational adapter over an `sqlx` `Any` pool.
pub struct RelationalAdapter {
    target: RelationalTarget,
    connect_timeout: Duration,
    pool: RwLock<Option<AnyPool>>,
    known_tables: Mutex<HashSet<String>>,
}

impl RelationalAdapter {
    /// Create an adapter for `target`. Nothing is opened until `connect`.
    pub fn new(target: RelationalTarget, connect_timeout: Duration) -> Self {
        Self {
            target,
            connect_timeout,
            pool: RwLock::new(None),
            known_tables: Mutex::new(HashSet::new()),
        }
    }

    /// SQL dialect this adapter speaks
    pub fn driver(&self) -> RelationalDriver {
        self.target.driver
    }

    /// Endpoint description with the password redacted.
    pub fn endpoint(&self) -> String {
        match self.target.driver {
            RelationalDriver::MySql => format!("mysql://{}", self.target.endpoint),
            RelationalDriver::Sqlite => format!("sqlite://{}", self.target.endpoint.database),
        }
    }

    fn dialect(&self) -> Dialect {
        Dialect(self.target.driver)
    }

    async fn pool(&self) -> StoreResult<AnyPool> {
        self.pool
            .read()
            .await
            .clone()
            .ok_or(StoreError::NotConnected("relational"))
    }

    fn is_known(&self, table: &str) -> bool {
        self.known_tables
            .lock()
            .map(|known| known.contains(table))
            .unwrap_or(false)
    }

    fn remember(&self, table: &str) {
        if let Ok(mut known) = self.known_tables.lock() {
            known.insert(table.to_string());
        }
    }

    async fn fetch_count(&self, pool: &AnyPool, sql: &str, params: Vec<SqlParam>) -> StoreResult<i64> {
        let row = bind_all(sql, params)
            .fetch_one(pool)
            .await
            .map_err(db_err)?;
        row.try_get::<i64, _>(0).map_err(db_err)
    }

    async fn table_exists(&self, pool: &AnyPool, table: &str) -> StoreResult<bool> {
        let found = self
            .fetch_count(
                pool,
                self.dialect().table_exists(),
                vec![SqlParam::Text(table.to_string())],
            )
            .await?;
        Ok(found > 0)
    }

    /// Whether the collection's table exists. Reads never create it.
    async fn has_table(&self, pool: &AnyPool, table: &str) -> StoreResult<bool> {
        if self.is_known(table) {
            return Ok(true);
        }
        let exists = self.table_exists(pool, table).await?;
        if exists {
            self.remember(table);
        }
        Ok(exists)
    }

    /// Create the collection's table on first write.
    async fn ensure_table(&self, pool: &AnyPool, table: &str) -> StoreResult<bool> {
        if self.is_known(table) {
            return Ok(false);
        }
        let existed = self.table_exists(pool, table).await?;
        if !existed {
            sqlx::query(&self.dialect().create_table(table))
                .execute(pool)
                .await
                .map_err(db_err)?;
        }
        self.remember(table);
        Ok(!existed)
    }

    async fn provision_collection(
        &self,
        pool: &AnyPool,
        collection: &CollectionSpec,
        report: &mut ProvisionReport,
    ) -> StoreResult<()> {
        let table = collection.name.as_str();
        if self.ensure_table(pool, table).await? {
            report.collections_created.push(table.to_string());
        }

        for index in &collection.indexes {
            let name = index.name_for(table);
            let exists = self
                .fetch_count(
                    pool,
                    self.dialect().index_exists(),
                    vec![SqlParam::Text(table.to_string()), SqlParam::Text(name.clone())],
                )
                .await?;
            if exists > 0 {
                continue;
            }
            sqlx::query(&self.dialect().create_index(table, index))
                .execute(pool)
                .await
                .map_err(|e| StoreError::Provision(format!("index {}: {}", name, e)))?;
            report.indexes_created.push(name);
        }
        Ok(())
    }

    /// Tables and indexes currently in the database, as `kind:name`.
    pub async fn schema_objects(&self) -> StoreResult<Vec<String>> {
        let pool = self.pool().await?;
        let rows = sqlx::query(self.dialect().schema_objects())
            .fetch_all(&pool)
            .await
            .map_err(db_err)?;
        rows.iter()
            .map(|row| {
                let kind: String = row.try_get("kind").map_err(db_err)?;
                let name: String = row.try_get("name").map_err(db_err)?;
                Ok(format!("{}:{}", kind, name))
            })
            .collect()
    }
}

#[async_trait]
impl StorageAdapter for RelationalAdapter {
    fn kind(&self) -> AdapterKind {
        AdapterKind::Relational
    }

    async fn connect(&self) -> StoreResult<()> {
        let mut guard = self.pool.write().await;
        if guard.is_some() {
            return Ok(());
        }

        install_drivers();
        let url = connection_url(&self.target);
        let max_connections = match self.target.driver {
            RelationalDriver::MySql => 10,
            RelationalDriver::Sqlite => 1,
        };
        let connecting = AnyPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(self.connect_timeout)
            .connect(&url);

        let pool = tokio::time::timeout(self.connect_timeout, connecting)
            .await
            .map_err(|_| {
                StoreError::Connection(format!(
                    "timed out after {:?} connecting to {}",
                    self.connect_timeout,
                    self.endpoint()
                ))
            })?
            .map_err(|e| StoreError::Connection(format!("{}: {}", self.endpoint(), e)))?;

        *guard = Some(pool);
        Ok(())
    }

    async fn health_check(&self) -> bool {
        let Ok(pool) = self.pool().await else {
            return false;
        };
        sqlx::query("SELECT 1").fetch_one(&pool).await.is_ok()
    }

    async fn list(&self, collection: &str, query: &QuerySpec) -> StoreResult<RecordSet> {
        validate_collection(collection)?;
        query.validate()?;
        let pool = self.pool().await?;
        if !self.has_table(&pool, collection).await? {
            return Ok(RecordSet::default());
        }

        let Statement { sql, params } = self.dialect().select(collection, query);
        let rows = bind_all(&sql, params)
            .fetch_all(&pool)
            .await
            .map_err(db_err)?;
        rows.iter().map(row_to_record).collect()
    }

    async fn get(&self, collection: &str, id: &str) -> StoreResult<Option<Record>> {
        validate_collection(collection)?;
        let pool = self.pool().await?;
        let Some(id) = parse_id(id) else {
            return Ok(None);
        };
        if !self.has_table(&pool, collection).await? {
            return Ok(None);
        }

        let sql = format!(
            "SELECT id, doc FROM {} WHERE id = ?",
            self.dialect().quote(collection)
        );
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&pool)
            .await
            .map_err(db_err)?;
        row.as_ref().map(row_to_record).transpose()
    }

    async fn create(&self, collection: &str, fields: Fields) -> StoreResult<Record> {
        validate_collection(collection)?;
        validate_fields(&fields)?;
        let pool = self.pool().await?;
        self.ensure_table(&pool, collection).await?;

        let doc = serde_json::to_string(&fields)?;
        let sql = self.dialect().insert(collection);
        let id = match self.target.driver {
            RelationalDriver::MySql => sqlx::query(&sql)
                .bind(doc)
                .execute(&pool)
                .await
                .map_err(db_err)?
                .last_insert_id()
                .ok_or_else(|| StoreError::backend("driver did not report the inserted id"))?,
            RelationalDriver::Sqlite => sqlx::query(&sql)
                .bind(doc)
                .fetch_one(&pool)
                .await
                .map_err(db_err)?
                .try_get::<i64, _>(0)
                .map_err(db_err)?,
        };

        Ok(Record::new(id.to_string(), fields))
    }

    async fn update(
        &self,
        collection: &str,
        id: &str,
        patch: Fields,
    ) -> StoreResult<Option<Record>> {
        validate_collection(collection)?;
        validate_fields(&patch)?;
        let pool = self.pool().await?;
        let Some(id) = parse_id(id) else {
            return Ok(None);
        };
        if !self.has_table(&pool, collection).await? {
            return Ok(None);
        }

        let mut tx = pool.begin().await.map_err(db_err)?;
        let row = sqlx::query(&self.dialect().select_for_update(collection))
            .bind(id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(db_err)?;
        let Some(row) = row else {
            tx.rollback().await.map_err(db_err)?;
            return Ok(None);
        };

        let mut record = row_to_record(&row)?;
        record.apply_patch(patch);
        let doc = serde_json::to_string(&record.fields)?;

        let sql = format!(
            "UPDATE {} SET doc = ? WHERE id = ?",
            self.dialect().quote(collection)
        );
        sqlx::query(&sql)
            .bind(doc)
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(db_err)?;
        tx.commit().await.map_err(db_err)?;

        Ok(Some(record))
    }

    async fn delete(&self, collection: &str, id: &str) -> StoreResult<bool> {
        validate_collection(collection)?;
        let pool = self.pool().await?;
        let Some(id) = parse_id(id) else {
            return Ok(false);
        };
        if !self.has_table(&pool, collection).await? {
            return Ok(false);
        }

        let sql = format!(
            "DELETE FROM {} WHERE id = ?",
            self.dialect().quote(collection)
        );
        let result = sqlx::query(&sql)
            .bind(id)
            .execute(&pool)
            .await
            .map_err(db_err)?;
        Ok(result.rows_affected() > 0)
    }

    async fn provision(&self, schema: &SchemaSpec) -> StoreResult<ProvisionReport> {
        schema.validate()?;
        let pool = self.pool().await?;

        let mut report = ProvisionReport::default();
        for collection in &schema.collections {
            self.provision_collection(&pool, collection, &mut report)
                .await
                .map_err(|e| match e {
                    StoreError::Provision(_) => e,
                    other => StoreError::Provision(format!("{}: {}", collection.name, other)),
                })?;
        }
        Ok(report)
    }

    async fn disconnect(&self) {
        let pool = self.pool.write().await.take();
        if let Some(pool) = pool {
            pool.close().await;
        }
        if let Ok(mut known) = self.known_tables.lock() {
            known.clear();
        }
    }
}
