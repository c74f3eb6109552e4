//! Embedded SQLite backend.
//!
//! Four tables: `content` (keyed by `type, slug`), `taxonomy_terms` (keyed by
//! `taxonomy, slug`), `routes` (keyed by `path, type`) and `metadata`.
//! Taxonomy assignments and residual frontmatter are stored as JSON and
//! queried with `json_each` / `json_extract`. Filters, ordering and
//! pagination run in SQL; only relevance ranking runs in process, on the
//! already filtered and ordered candidate rows.

use super::{window_fits, Backend, BackendKind, DEFAULT_RECENT_LIMIT};
use crate::error::{Result, StoreError};
use crate::eval::{list_values, paginate};
use crate::scoring;
use folio_types::{
    ArchiveRoute, ExactRoute, FieldFilter, FieldValue, IndexBundle, IndexedItem, Operator,
    QueryParams, QueryResult, Redirect, RouteTable, SlugEntry, SortSpec, Status, TaxonomyRoute,
    TermEntry,
};
use parking_lot::Mutex;
use rusqlite::types::{Type, Value};
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

pub const SCHEMA_VERSION: i64 = 2;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS content (
    type TEXT NOT NULL,
    slug TEXT NOT NULL,
    id TEXT,
    title TEXT NOT NULL,
    status TEXT NOT NULL,
    date TEXT,
    updated TEXT,
    excerpt TEXT,
    template TEXT,
    file_path TEXT NOT NULL,
    relative_path TEXT NOT NULL,
    url TEXT NOT NULL,
    taxonomies TEXT NOT NULL DEFAULT '{}',
    fields TEXT NOT NULL DEFAULT '{}',
    body TEXT NOT NULL DEFAULT '',
    id_owner INTEGER NOT NULL DEFAULT 0,
    PRIMARY KEY (type, slug)
);
CREATE INDEX IF NOT EXISTS idx_content_type ON content(type);
CREATE INDEX IF NOT EXISTS idx_content_status ON content(status);
CREATE INDEX IF NOT EXISTS idx_content_type_status ON content(type, status);
CREATE INDEX IF NOT EXISTS idx_content_date ON content(date DESC);
CREATE INDEX IF NOT EXISTS idx_content_id ON content(id, id_owner);
CREATE INDEX IF NOT EXISTS idx_content_file_path ON content(file_path);
CREATE INDEX IF NOT EXISTS idx_content_relative_path ON content(relative_path);
CREATE TABLE IF NOT EXISTS taxonomy_terms (
    taxonomy TEXT NOT NULL,
    slug TEXT NOT NULL,
    name TEXT NOT NULL,
    description TEXT,
    parent TEXT,
    count INTEGER NOT NULL DEFAULT 0,
    items TEXT NOT NULL DEFAULT '[]',
    extra TEXT NOT NULL DEFAULT '{}',
    PRIMARY KEY (taxonomy, slug)
);
CREATE TABLE IF NOT EXISTS routes (
    path TEXT NOT NULL,
    type TEXT NOT NULL,
    data TEXT NOT NULL,
    PRIMARY KEY (path, type)
);
CREATE TABLE IF NOT EXISTS metadata (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
);
";

const DROP_SCHEMA: &str = "
DROP TABLE IF EXISTS content;
DROP TABLE IF EXISTS taxonomy_terms;
DROP TABLE IF EXISTS routes;
DROP TABLE IF EXISTS metadata;
";

const COLUMNS: &str = "type, slug, id, title, status, date, updated, excerpt, template, \
                       file_path, relative_path, url, taxonomies, fields, body";

const ROUTE_REDIRECT: &str = "redirect";
const ROUTE_EXACT: &str = "exact";
const ROUTE_ARCHIVE: &str = "archive";
// taxonomy rows use the taxonomy name as their path
const ROUTE_TAXONOMY: &str = "taxonomy";

pub struct SqliteBackend {
    path: PathBuf,
    recent_limit: usize,
    conn: Mutex<Option<Connection>>,
    routes: Mutex<Option<Arc<RouteTable>>>,
}

impl std::fmt::Debug for SqliteBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteBackend")
            .field("path", &self.path)
            .field("recent_limit", &self.recent_limit)
            .finish_non_exhaustive()
    }
}

impl SqliteBackend {
    /// Create a backend for the database at `path`. The connection opens
    /// lazily on first use.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            recent_limit: DEFAULT_RECENT_LIMIT,
            conn: Mutex::new(None),
            routes: Mutex::new(None),
        }
    }

    pub fn with_recent_limit(mut self, limit: usize) -> Self {
        self.recent_limit = limit.max(1);
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn open(&self) -> Result<Connection> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        tracing::debug!("Opening SQLite index at {}", self.path.display());
        let conn = Connection::open(&self.path)?;

        let mode: String =
            conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
        if !mode.eq_ignore_ascii_case("wal") {
            tracing::warn!("SQLite refused WAL journal mode, using {}", mode);
        }
        conn.pragma_update(None, "synchronous", "NORMAL")?;
        conn.pragma_update(None, "cache_size", -65_536)?;
        conn.pragma_update(None, "temp_store", "MEMORY")?;
        conn.pragma_update(None, "busy_timeout", 5_000)?;
        conn.pragma_update(None, "mmap_size", 268_435_456i64)?;

        if stored_schema_version(&conn)?.is_some_and(|v| v != SCHEMA_VERSION) {
            tracing::info!(
                "SQLite index {} has an old schema, recreating it",
                self.path.display()
            );
            conn.execute_batch(DROP_SCHEMA)?;
        }
        conn.execute_batch(SCHEMA)?;
        Ok(conn)
    }

    fn with_conn<T>(&self, f: impl FnOnce(&mut Connection) -> Result<T>) -> Result<T> {
        let mut guard = self.conn.lock();
        if guard.is_none() {
            *guard = Some(self.open()?);
        }
        match guard.as_mut() {
            Some(conn) => f(conn),
            None => Err(StoreError::Decode("SQLite connection unavailable".into())),
        }
    }

    fn metadata_list(&self, key: &str) -> Result<Vec<String>> {
        self.with_conn(|conn| {
            let raw: Option<String> = conn
                .query_row("SELECT value FROM metadata WHERE key = ?1", [key], |row| {
                    row.get(0)
                })
                .optional()?;
            Ok(match raw {
                Some(json) => serde_json::from_str(&json)
                    .map_err(|e| StoreError::Decode(format!("metadata {key}: {e}")))?,
                None => Vec::new(),
            })
        })
    }

    fn select_items(&self, sql: &str, bind: Vec<Value>) -> Result<Vec<IndexedItem>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(sql)?;
            let items = stmt
                .query_map(params_from_iter(bind.iter()), row_to_item)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(items)
        })
    }

    fn select_item(&self, clause: &str, bind: Vec<Value>) -> Result<Option<IndexedItem>> {
        let sql = format!("SELECT {COLUMNS} FROM content WHERE {clause} LIMIT 1");
        Ok(self.select_items(&sql, bind)?.into_iter().next())
    }

    fn load_routes(&self) -> Result<RouteTable> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare("SELECT path, type, data FROM routes ORDER BY path, type")?;
            let rows = stmt.query_map([], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                ))
            })?;

            let mut table = RouteTable::default();
            for row in rows {
                let (path, class, data) = row?;
                let bad = |e: serde_json::Error| StoreError::Decode(format!("route {path}: {e}"));
                match class.as_str() {
                    ROUTE_REDIRECT => {
                        let r: Redirect = serde_json::from_str(&data).map_err(bad)?;
                        table.redirects.insert(path, r);
                    }
                    ROUTE_EXACT => {
                        let r: ExactRoute = serde_json::from_str(&data).map_err(bad)?;
                        table.exact.insert(path, r);
                    }
                    ROUTE_ARCHIVE => {
                        let r: ArchiveRoute = serde_json::from_str(&data).map_err(bad)?;
                        table.archives.insert(path, r);
                    }
                    ROUTE_TAXONOMY => {
                        let r: TaxonomyRoute = serde_json::from_str(&data).map_err(bad)?;
                        table.taxonomy.insert(path, r);
                    }
                    other => tracing::warn!("Skipping unknown route class '{}'", other),
                }
            }
            Ok(table)
        })
    }
}

/// Schema version recorded by the last write, if the database has one.
fn stored_schema_version(conn: &Connection) -> Result<Option<i64>> {
    let has_metadata: bool = conn.query_row(
        "SELECT EXISTS (SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = 'metadata')",
        [],
        |row| row.get(0),
    )?;
    if !has_metadata {
        return Ok(None);
    }
    let raw: Option<String> = conn
        .query_row(
            "SELECT value FROM metadata WHERE key = 'schema_version'",
            [],
            |row| row.get(0),
        )
        .optional()?;
    Ok(raw.map(|v| v.parse().unwrap_or(0)))
}

fn json_column<T: serde::de::DeserializeOwned>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T> {
    let raw: String = row.get(idx)?;
    serde_json::from_str(&raw)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn row_to_item(row: &Row<'_>) -> rusqlite::Result<IndexedItem> {
    let fields: serde_json::Map<String, serde_json::Value> = json_column(row, 13)?;
    Ok(IndexedItem {
        content_type: row.get(0)?,
        slug: row.get(1)?,
        id: row.get(2)?,
        title: row.get(3)?,
        status: Status::parse(&row.get::<_, String>(4)?),
        date: row.get(5)?,
        updated: row.get(6)?,
        excerpt: row.get(7)?,
        template: row.get(8)?,
        file_path: row.get(9)?,
        relative_path: row.get(10)?,
        url: row.get(11)?,
        taxonomies: json_column(row, 12)?,
        fields: fields
            .iter()
            .map(|(k, v)| (k.clone(), FieldValue::from_json(v)))
            .collect(),
        body: row.get(14)?,
    })
}

fn row_to_term(row: &Row<'_>) -> rusqlite::Result<TermEntry> {
    let count: i64 = row.get(5)?;
    let extra: serde_json::Map<String, serde_json::Value> = json_column(row, 7)?;
    Ok(TermEntry {
        slug: row.get(1)?,
        name: row.get(2)?,
        description: row.get(3)?,
        parent: row.get(4)?,
        count: count.max(0) as usize,
        items: json_column(row, 6)?,
        extra: extra
            .iter()
            .map(|(k, v)| (k.clone(), FieldValue::from_json(v)))
            .collect(),
    })
}

fn fields_json(fields: &BTreeMap<String, FieldValue>) -> String {
    serde_json::Value::Object(
        fields
            .iter()
            .map(|(k, v)| (k.clone(), v.to_json()))
            .collect(),
    )
    .to_string()
}

fn sql_value(value: &FieldValue) -> Value {
    match value {
        FieldValue::Null => Value::Null,
        FieldValue::Bool(b) => Value::Integer(i64::from(*b)),
        FieldValue::Int(i) => Value::Integer(*i),
        FieldValue::Float(f) => Value::Real(*f),
        FieldValue::Text(s) => Value::Text(s.clone()),
        FieldValue::List(_) | FieldValue::Map(_) => Value::Text(value.to_json().to_string()),
    }
}

fn json_path(key: &str) -> String {
    format!("$.\"{}\"", key.replace('"', "\\\""))
}

/// SQL expression for a sortable/filterable field, pushing any bound
/// parameter it needs.
fn field_expr(field: &str, bind: &mut Vec<Value>) -> String {
    match field {
        "id" | "slug" | "title" | "status" | "date" | "updated" | "excerpt" | "template"
        | "url" => field.to_string(),
        "type" => "\"type\"".to_string(),
        "path" | "relative_path" => "relative_path".to_string(),
        other => {
            bind.push(Value::Text(json_path(other)));
            "json_extract(fields, ?)".to_string()
        }
    }
}

fn placeholders(n: usize) -> String {
    vec!["?"; n].join(", ")
}

fn filter_sql(filter: &FieldFilter, bind: &mut Vec<Value>) -> String {
    let comparison = |sql_op: &str, bind: &mut Vec<Value>| {
        let expr = field_expr(&filter.field, bind);
        bind.push(sql_value(&filter.value));
        format!("{expr} {sql_op} ?")
    };

    match &filter.op {
        Operator::Eq => comparison("=", bind),
        Operator::Ne => comparison("!=", bind),
        Operator::Gt => comparison(">", bind),
        Operator::Gte => comparison(">=", bind),
        Operator::Lt => comparison("<", bind),
        Operator::Lte => comparison("<=", bind),
        Operator::In | Operator::NotIn => {
            let values = list_values(&filter.value);
            let negated = filter.op == Operator::NotIn;
            if values.is_empty() {
                return if negated { "1" } else { "0" }.to_string();
            }
            let expr = field_expr(&filter.field, bind);
            bind.extend(values.iter().map(sql_value));
            let keyword = if negated { "NOT IN" } else { "IN" };
            format!("{expr} {keyword} ({})", placeholders(values.len()))
        }
        Operator::Like => {
            let Some(pattern) = filter.value.to_text() else {
                return "0".to_string();
            };
            let expr = field_expr(&filter.field, bind);
            bind.push(Value::Text(pattern));
            format!("CAST({expr} AS TEXT) LIKE ?")
        }
        Operator::Unknown(op) => {
            tracing::debug!("Unknown filter operator '{}' matches nothing", op);
            "0".to_string()
        }
    }
}

fn where_sql(params: &QueryParams, bind: &mut Vec<Value>) -> String {
    let mut clauses = Vec::new();
    if let Some(content_type) = &params.content_type {
        clauses.push("\"type\" = ?".to_string());
        bind.push(Value::Text(content_type.clone()));
    }
    if let Some(status) = &params.status {
        clauses.push("status = ?".to_string());
        bind.push(Value::Text(status.clone()));
    }
    for (taxonomy, term) in &params.taxonomies {
        clauses.push(
            "EXISTS (SELECT 1 FROM json_each(content.taxonomies, ?) WHERE json_each.value = ?)"
                .to_string(),
        );
        bind.push(Value::Text(json_path(taxonomy)));
        bind.push(Value::Text(term.clone()));
    }
    for filter in &params.filters {
        clauses.push(filter_sql(filter, bind));
    }

    if clauses.is_empty() {
        "1".to_string()
    } else {
        clauses.join(" AND ")
    }
}

fn order_sql(sort: &SortSpec, bind: &mut Vec<Value>) -> String {
    let null_check = field_expr(&sort.field, bind);
    let expr = field_expr(&sort.field, bind);
    format!(
        "({null_check}) IS NULL, {expr} {}, title ASC, slug ASC, \"type\" ASC",
        sort.direction.as_sql()
    )
}

fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}

impl Backend for SqliteBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Sqlite
    }

    fn write(&self, bundle: &IndexBundle) -> Result<()> {
        self.with_conn(|conn| {
            let tx = conn.transaction()?;
            tx.execute_batch(
                "DELETE FROM content; DELETE FROM taxonomy_terms; DELETE FROM routes; DELETE FROM metadata;",
            )?;

            {
                let mut stmt = tx.prepare(&format!(
                    "INSERT INTO content ({COLUMNS}, id_owner) \
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)"
                ))?;
                for items in bundle.content.by_type.values() {
                    for item in items.values() {
                        let taxonomies = serde_json::to_string(&item.taxonomies)?;
                        // only the item the index chose for a duplicated id answers id lookups
                        let owns_id = item
                            .id
                            .as_ref()
                            .and_then(|id| bundle.content.by_id.get(id))
                            .is_some_and(|key| *key == item.key());
                        stmt.execute(params![
                            item.content_type,
                            item.slug,
                            item.id,
                            item.title,
                            item.status.as_str(),
                            item.date,
                            item.updated,
                            item.excerpt,
                            item.template,
                            item.file_path,
                            item.relative_path,
                            item.url,
                            taxonomies,
                            fields_json(&item.fields),
                            item.body,
                            owns_id,
                        ])?;
                    }
                }
            }

            {
                let mut stmt = tx.prepare(
                    "INSERT INTO taxonomy_terms \
                     (taxonomy, slug, name, description, parent, count, items, extra) \
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                )?;
                for (taxonomy, terms) in &bundle.taxonomies {
                    for term in terms.values() {
                        stmt.execute(params![
                            taxonomy,
                            term.slug,
                            term.name,
                            term.description,
                            term.parent,
                            term.count as i64,
                            serde_json::to_string(&term.items)?,
                            fields_json(&term.extra),
                        ])?;
                    }
                }
            }

            {
                let mut stmt =
                    tx.prepare("INSERT INTO routes (path, type, data) VALUES (?1, ?2, ?3)")?;
                let routes = &bundle.routes;
                for (path, r) in &routes.redirects {
                    stmt.execute(params![path, ROUTE_REDIRECT, serde_json::to_string(r)?])?;
                }
                for (path, r) in &routes.exact {
                    stmt.execute(params![path, ROUTE_EXACT, serde_json::to_string(r)?])?;
                }
                for (path, r) in &routes.archives {
                    stmt.execute(params![path, ROUTE_ARCHIVE, serde_json::to_string(r)?])?;
                }
                for (name, r) in &routes.taxonomy {
                    stmt.execute(params![name, ROUTE_TAXONOMY, serde_json::to_string(r)?])?;
                }
            }

            {
                let types: Vec<&String> = bundle.content.by_type.keys().collect();
                let taxonomies: Vec<&String> = bundle.taxonomies.keys().collect();
                let mut stmt = tx.prepare("INSERT INTO metadata (key, value) VALUES (?1, ?2)")?;
                stmt.execute(params!["schema_version", SCHEMA_VERSION.to_string()])?;
                stmt.execute(params!["types", serde_json::to_string(&types)?])?;
                stmt.execute(params!["taxonomies", serde_json::to_string(&taxonomies)?])?;
                stmt.execute(params!["built_at", now_secs().to_string()])?;
            }

            tx.commit()?;
            Ok(())
        })?;

        *self.routes.lock() = None;
        tracing::debug!(
            "Wrote {} items to SQLite index {}",
            bundle.content.len(),
            self.path.display()
        );
        Ok(())
    }

    fn get_by_slug(&self, content_type: &str, slug: &str) -> Result<Option<IndexedItem>> {
        self.select_item(
            "\"type\" = ? AND slug = ?",
            vec![Value::Text(content_type.into()), Value::Text(slug.into())],
        )
    }

    fn get_by_id(&self, id: &str) -> Result<Option<IndexedItem>> {
        self.select_item("id = ? AND id_owner = 1", vec![Value::Text(id.into())])
    }

    fn get_by_path(&self, relative_path: &str) -> Result<Option<IndexedItem>> {
        self.select_item("relative_path = ?", vec![Value::Text(relative_path.into())])
    }

    fn all_raw(&self, content_type: &str) -> Result<Vec<IndexedItem>> {
        self.select_items(
            &format!("SELECT {COLUMNS} FROM content WHERE \"type\" = ? ORDER BY slug"),
            vec![Value::Text(content_type.into())],
        )
    }

    fn types(&self) -> Result<Vec<String>> {
        self.metadata_list("types")
    }

    fn count(&self, content_type: &str, status: Option<&str>) -> Result<usize> {
        self.with_conn(|conn| {
            let n: i64 = match status {
                Some(status) => conn.query_row(
                    "SELECT COUNT(*) FROM content WHERE \"type\" = ?1 AND status = ?2",
                    params![content_type, status],
                    |row| row.get(0),
                )?,
                None => conn.query_row(
                    "SELECT COUNT(*) FROM content WHERE \"type\" = ?1",
                    params![content_type],
                    |row| row.get(0),
                )?,
            };
            Ok(n.max(0) as usize)
        })
    }

    fn exists(&self, content_type: &str, slug: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let found: Option<i64> = conn
                .query_row(
                    "SELECT 1 FROM content WHERE \"type\" = ?1 AND slug = ?2",
                    params![content_type, slug],
                    |row| row.get(0),
                )
                .optional()?;
            Ok(found.is_some())
        })
    }

    fn slug_entry(&self, content_type: &str, slug: &str) -> Result<Option<SlugEntry>> {
        self.with_conn(|conn| {
            Ok(conn
                .query_row(
                    "SELECT file_path, id, status FROM content WHERE \"type\" = ?1 AND slug = ?2",
                    params![content_type, slug],
                    |row| {
                        Ok(SlugEntry {
                            file_path: row.get(0)?,
                            id: row.get(1)?,
                            status: Status::parse(&row.get::<_, String>(2)?),
                        })
                    },
                )
                .optional()?)
        })
    }

    fn query(&self, params: &QueryParams) -> Result<QueryResult> {
        let mut bind = Vec::new();
        let predicate = where_sql(params, &mut bind);

        if let Some(search) = params.active_search() {
            let order = order_sql(&params.sort, &mut bind);
            let sql = format!("SELECT {COLUMNS} FROM content WHERE {predicate} ORDER BY {order}");
            let candidates = self.select_items(&sql, bind)?;
            return Ok(paginate(scoring::rank(candidates, search), params));
        }

        let total: i64 = self.with_conn(|conn| {
            Ok(conn.query_row(
                &format!("SELECT COUNT(*) FROM content WHERE {predicate}"),
                params_from_iter(bind.iter()),
                |row| row.get(0),
            )?)
        })?;

        let order = order_sql(&params.sort, &mut bind);
        // SQLite treats a negative OFFSET as zero, so never let it wrap
        bind.push(Value::Integer(i64::try_from(params.per_page).unwrap_or(i64::MAX)));
        bind.push(Value::Integer(i64::try_from(params.offset()).unwrap_or(i64::MAX)));
        let sql = format!(
            "SELECT {COLUMNS} FROM content WHERE {predicate} ORDER BY {order} LIMIT ? OFFSET ?"
        );
        let items = self.select_items(&sql, bind)?;
        Ok(QueryResult {
            items,
            total: total.max(0) as usize,
        })
    }

    fn can_use_fast_cache(&self, content_type: &str, page: usize, per_page: usize) -> Result<bool> {
        if !self.types()?.iter().any(|t| t == content_type) {
            return Ok(false);
        }
        let cached = self
            .count(content_type, Some("published"))?
            .min(self.recent_limit);
        Ok(window_fits(cached, self.recent_limit, page, per_page))
    }

    fn recent_items(&self, content_type: &str, page: usize, per_page: usize) -> Result<QueryResult> {
        self.query(&QueryParams {
            content_type: Some(content_type.to_string()),
            status: Some("published".to_string()),
            page,
            per_page,
            ..QueryParams::default()
        })
    }

    fn terms(&self, taxonomy: &str) -> Result<Vec<TermEntry>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT taxonomy, slug, name, description, parent, count, items, extra \
                 FROM taxonomy_terms WHERE taxonomy = ?1 ORDER BY slug",
            )?;
            let terms = stmt
                .query_map([taxonomy], row_to_term)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(terms)
        })
    }

    fn term(&self, taxonomy: &str, slug: &str) -> Result<Option<TermEntry>> {
        self.with_conn(|conn| {
            Ok(conn
                .query_row(
                    "SELECT taxonomy, slug, name, description, parent, count, items, extra \
                     FROM taxonomy_terms WHERE taxonomy = ?1 AND slug = ?2",
                    params![taxonomy, slug],
                    row_to_term,
                )
                .optional()?)
        })
    }

    fn taxonomies(&self) -> Result<Vec<String>> {
        self.metadata_list("taxonomies")
    }

    fn routes(&self) -> Result<RouteTable> {
        let mut guard = self.routes.lock();
        if let Some(routes) = guard.as_ref() {
            return Ok((**routes).clone());
        }
        let routes = Arc::new(self.load_routes()?);
        *guard = Some(Arc::clone(&routes));
        Ok((*routes).clone())
    }

    fn clear_memory_cache(&self) {
        *self.routes.lock() = None;
        *self.conn.lock() = None;
    }
}
