//! A document store over an embedded SQLite database.
//!
//! The store URI names a directory, the database name selects a `.db` file
//! within it. Each collection is a table holding one JSON document per row;
//! equality filters go through `json_extract` on the document column.

use anyhow::{Context, format_err};
use crate::{
    errors::ImportError,
    Error,
    Result,
};
use rusqlite::{config::DbConfig, Connection, OpenFlags, Row};
use sea_query::{Alias, ColumnDef, enum_def, Expr, Func, Query, SqliteQueryBuilder, Table};
use sea_query_rusqlite::RusqliteBinder;
use serde_json::{Map, Value};
use std::{
    fs,
    path::Path,
    sync::{Mutex, MutexGuard},
    time::Duration,
};

/// How long an open connection waits on a locked database before failing.
pub const CONNECT_TIMEOUT: Duration = Duration::from_millis(5000);

#[derive(Clone, Debug)]
pub struct Options {
    /// Directory holding the store's databases.
    pub uri: String,

    /// Name of the database file within the store, without extension.
    pub database: String,
}

#[derive(Debug)]
pub struct Store {
    conn: Mutex<Connection>,
    opts: Options,
}

/// A named collection of documents within a [`Store`].
#[derive(Debug)]
pub struct Collection<'store> {
    store: &'store Store,
    name: String,
}

#[derive(Debug)]
#[enum_def]
#[allow(dead_code)] // DocumentIden (generated from this) is used.
struct Document {
    document_id: i64,
    doc: String,
}

impl Options {
    /// Open the database, creating the store directory and file if absent.
    ///
    /// Fails fast with [`ImportError::Connectivity`] when the store cannot be
    /// opened or does not answer a probe query.
    pub fn build(self) -> Result<Store> {
        let conn = self.open().map_err(|err| ImportError::Connectivity {
            uri: self.uri.clone(),
            reason: err.to_string(),
        })?;

        tracing::debug!(uri = self.uri.as_str(),
                        database = self.database.as_str(),
                        "document store opened");

        Ok(Store {
            conn: Mutex::new(conn),

            // This moves self into Store, so do that last.
            opts: self,
        })
    }

    fn open(&self) -> Result<Connection> {
        fs::create_dir_all(&self.uri)?;
        let db_path = Path::new(&self.uri).join(format!("{db}.db", db = self.database));

        let open_flags =
            OpenFlags::SQLITE_OPEN_READ_WRITE |
            OpenFlags::SQLITE_OPEN_CREATE |
            OpenFlags::SQLITE_OPEN_URI |
            OpenFlags::SQLITE_OPEN_NO_MUTEX;
        let conn = Connection::open_with_flags(db_path, open_flags)?;
        conn.busy_timeout(CONNECT_TIMEOUT)?;
        conn.set_db_config(DbConfig::SQLITE_DBCONFIG_DEFENSIVE, true)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;

        // Probe the database before reporting the store reachable.
        conn.query_row("SELECT 1", [], |row: &Row| row.get::<_, i64>(0))?;

        Ok(conn)
    }
}

impl Store {
    fn conn(&self) -> Result<MutexGuard<Connection>> {
        self.conn.lock()
            .map_err(|_e: std::sync::PoisonError<_>|
                     format_err!("PoisonError locking connection mutex in Store"))
    }

    pub fn uri(&self) -> &str {
        &self.opts.uri
    }

    /// Names of the existing collections, sorted.
    pub fn collection_names(&self) -> Result<Vec<String>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT name FROM sqlite_master \
             WHERE type = 'table' AND name NOT LIKE 'sqlite_%' \
             ORDER BY name")?;
        let names = stmt.query_map([], |row: &Row| row.get::<_, String>(0))?
                        .collect::<rusqlite::Result<Vec<String>>>()?;
        Ok(names)
    }

    pub fn create_collection(&self, name: &str) -> Result<()> {
        let schema_sql = Table::create()
            .table(Alias::new(name))
            .if_not_exists()
            .col(ColumnDef::new(DocumentIden::DocumentId)
                    .integer()
                    .not_null()
                    .primary_key())
            .col(ColumnDef::new(DocumentIden::Doc)
                    .text()
                    .not_null())
            .build(SqliteQueryBuilder);

        self.conn()?.execute_batch(&schema_sql)
            .with_context(|| format!("while creating collection '{name}'"))?;
        Ok(())
    }

    /// Look up a collection, creating it first if it does not exist.
    pub fn collection(&self, name: &str) -> Result<Collection<'_>> {
        if !self.collection_names()?.iter().any(|n| n == name) {
            self.create_collection(name)?;
        }

        Ok(Collection {
            store: self,
            name: name.to_string(),
        })
    }

    /// Release the connection. The store cannot be used afterwards.
    pub fn close(self) -> Result<()> {
        let conn = self.conn.into_inner()
            .map_err(|_e: std::sync::PoisonError<_>|
                     format_err!("PoisonError taking connection out of Store"))?;
        conn.close().map_err(|(_conn, err)| Error::from(err))?;
        Ok(())
    }
}

impl Collection<'_> {
    pub fn name(&self) -> &str {
        &self.name
    }

    fn table(&self) -> Alias {
        Alias::new(&self.name)
    }

    /// Count of all documents in the collection.
    pub fn count_all(&self) -> Result<u64> {
        let (sql, params) = Query::select()
            .from(self.table())
            .expr(Func::count(Expr::col(DocumentIden::DocumentId)))
            .build_rusqlite(SqliteQueryBuilder);

        let count = self.store.conn()?
            .query_row(&sql, &*params.as_params(), |row: &Row| row.get::<_, u64>(0))?;
        Ok(count)
    }

    /// Count of documents whose `field` equals `value`.
    pub fn count_by_field(&self, field: &str, value: &Value) -> Result<u64> {
        let (sql, params) = Query::select()
            .from(self.table())
            .expr(Func::count(Expr::col(DocumentIden::DocumentId)))
            .and_where(Expr::cust_with_values(
                "json_extract(doc, ?) = ?",
                [json_path(field).into(), bind_value(field, value)?]))
            .build_rusqlite(SqliteQueryBuilder);

        let count = self.store.conn()?
            .query_row(&sql, &*params.as_params(), |row: &Row| row.get::<_, u64>(0))?;
        Ok(count)
    }

    /// Documents whose `field` equals `value`, in insertion order.
    pub fn find_by_field(&self, field: &str, value: &Value) -> Result<Vec<Map<String, Value>>> {
        let (sql, params) = Query::select()
            .from(self.table())
            .column(DocumentIden::Doc)
            .and_where(Expr::cust_with_values(
                "json_extract(doc, ?) = ?",
                [json_path(field).into(), bind_value(field, value)?]))
            .build_rusqlite(SqliteQueryBuilder);

        let conn = self.store.conn()?;
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(&*params.as_params(), |row: &Row| row.get::<_, String>(0))?;

        let mut docs = Vec::new();
        for raw in rows {
            let doc: Map<String, Value> = serde_json::from_str(&raw?)
                .with_context(|| format!("while decoding a document from collection \
                                          '{name}'", name = self.name))?;
            docs.push(doc);
        }
        Ok(docs)
    }

    pub fn insert_one(&self, doc: &Map<String, Value>) -> Result<()> {
        let (sql, params) = Query::insert()
            .into_table(self.table())
            .columns([DocumentIden::Doc])
            .values([serde_json::to_string(doc)?.into()])?
            .build_rusqlite(SqliteQueryBuilder);

        self.store.conn()?.execute(&sql, &*params.as_params())
            .with_context(|| format!("while inserting into collection '{name}'",
                                     name = self.name))?;
        Ok(())
    }
}

/// JSON path addressing `field` at the top level of a document.
fn json_path(field: &str) -> String {
    format!("$.\"{field}\"")
}

/// Convert a JSON identity value to a bindable SQL value.
///
/// Only scalars can appear in an equality filter.
fn bind_value(field: &str, value: &Value) -> Result<sea_query::Value> {
    Ok(match value {
        Value::String(s) => s.clone().into(),
        Value::Bool(b) => (*b).into(),
        Value::Number(n) if n.is_i64() => n.as_i64().expect("i64 checked above").into(),
        Value::Number(n) if n.is_u64() => n.as_u64().expect("u64 checked above").into(),
        Value::Number(n) => n.as_f64().expect("JSON number fits f64").into(),
        Value::Null | Value::Array(_) | Value::Object(_) =>
            return Err(ImportError::NonScalarIdentity { field: field.to_string() }.into()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::TempDir;
    use serde_json::json;

    fn test_store(temp: &TempDir) -> Store {
        Options {
            uri: temp.path().unwrap().display().to_string(),
            database: "test".to_string(),
        }.build().unwrap()
    }

    fn doc(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("test doc must be an object"),
        }
    }

    #[test]
    fn create_and_list_collections() {
        let temp = TempDir::create(&std::env::temp_dir()).unwrap();
        let store = test_store(&temp);

        assert!(store.collection_names().unwrap().is_empty());

        store.create_collection("tweets").unwrap();
        store.create_collection("likes").unwrap();
        // Creating again is a no-op.
        store.create_collection("tweets").unwrap();

        assert_eq!(store.collection_names().unwrap(), ["likes", "tweets"]);
        store.close().unwrap();
    }

    #[test]
    fn insert_count_and_find() {
        let temp = TempDir::create(&std::env::temp_dir()).unwrap();
        let store = test_store(&temp);

        let coll = store.collection("tweets").unwrap();
        assert_eq!(coll.name(), "tweets");
        assert_eq!(coll.count_all().unwrap(), 0);

        coll.insert_one(&doc(json!({"id": "1", "text": "hi"}))).unwrap();
        coll.insert_one(&doc(json!({"id": "2", "text": "yo"}))).unwrap();

        assert_eq!(coll.count_all().unwrap(), 2);
        assert_eq!(coll.count_by_field("id", &json!("1")).unwrap(), 1);
        assert_eq!(coll.count_by_field("id", &json!("3")).unwrap(), 0);

        let found = coll.find_by_field("id", &json!("2")).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0]["text"], "yo");

        store.close().unwrap();
    }

    #[test]
    fn numeric_and_bool_filters() {
        let temp = TempDir::create(&std::env::temp_dir()).unwrap();
        let store = test_store(&temp);

        let coll = store.collection("events").unwrap();
        coll.insert_one(&doc(json!({"event_id": 7, "done": true}))).unwrap();
        coll.insert_one(&doc(json!({"event_id": 8, "done": false}))).unwrap();

        assert_eq!(coll.count_by_field("event_id", &json!(7)).unwrap(), 1);
        assert_eq!(coll.count_by_field("event_id", &json!(9)).unwrap(), 0);
        assert_eq!(coll.count_by_field("done", &json!(true)).unwrap(), 1);

        store.close().unwrap();
    }

    #[test]
    fn non_scalar_filter_value_errors() {
        let temp = TempDir::create(&std::env::temp_dir()).unwrap();
        let store = test_store(&temp);

        let coll = store.collection("events").unwrap();
        let err = coll.count_by_field("id", &json!(["nope"])).unwrap_err();
        assert!(matches!(err.downcast_ref::<ImportError>(),
                         Some(ImportError::NonScalarIdentity { .. })));

        store.close().unwrap();
    }

    #[test]
    fn documents_persist_across_reopen() {
        let temp = TempDir::create(&std::env::temp_dir()).unwrap();

        let store = test_store(&temp);
        store.collection("tweets").unwrap()
             .insert_one(&doc(json!({"id": "1"}))).unwrap();
        store.close().unwrap();

        let store = test_store(&temp);
        assert_eq!(store.collection("tweets").unwrap().count_all().unwrap(), 1);
        store.close().unwrap();
    }
}
