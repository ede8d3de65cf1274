use std::sync::Arc;

use async_trait::async_trait;
use chrono::{NaiveDateTime, Utc};
use serde_json::Value;
use sqlx::{migrate::MigrateDatabase, FromRow, Pool, Sqlite, SqlitePool};
use tracing::info;

use crate::{
    slugify, ContentStore, HookRegistry, Item, ItemId, ItemStatus, ItemUpdate, Result,
    SaveContext, Term, TermId, TermOrder, TermQuery,
};

const DB_URL: &str = "sqlite://content.db";

#[derive(Debug, FromRow)]
struct ItemRow {
    id: i64,
    item_type: String,
    status: String,
    parent: Option<i64>,
    title: String,
    slug: String,
    created: NaiveDateTime,
    modified: NaiveDateTime,
}

impl From<ItemRow> for Item {
    fn from(row: ItemRow) -> Self {
        Item {
            id: ItemId(row.id),
            item_type: row.item_type,
            status: ItemStatus::parse(&row.status),
            parent: row.parent.map(ItemId),
            title: row.title,
            slug: row.slug,
            created: row.created,
            modified: row.modified,
        }
    }
}

#[derive(Debug, FromRow)]
struct TermRow {
    id: i64,
    taxonomy: String,
    name: String,
    slug: String,
    description: String,
}

impl From<TermRow> for Term {
    fn from(row: TermRow) -> Self {
        Term {
            id: TermId(row.id),
            taxonomy: row.taxonomy,
            name: row.name,
            slug: row.slug,
            description: row.description,
        }
    }
}

/// SQLite-backed content store.
pub struct SqliteStore {
    pool: Pool<Sqlite>,
    hooks: HookRegistry,
}

impl SqliteStore {
    /// Opens the default database file, creating it on first run.
    pub async fn initialize() -> Result<Self> {
        if !Sqlite::database_exists(DB_URL).await.unwrap_or(false) {
            Sqlite::create_database(DB_URL).await?;
        }
        Self::connect(DB_URL).await
    }

    /// Connects to an existing database and brings its schema up.
    pub async fn connect(url: &str) -> Result<Self> {
        let pool = SqlitePool::connect(url).await?;
        create_schema(&pool).await?;
        info!(url, "content store ready");
        Ok(Self {
            pool,
            hooks: HookRegistry::new(),
        })
    }

    /// Creates a published item of the given type.
    pub async fn create_item(&self, item_type: &str, title: &str) -> Result<Item> {
        let now = Utc::now().naive_utc();
        let slug = slugify(title);
        let result = sqlx::query(
            "INSERT INTO items (item_type, status, title, slug, created, modified)
             VALUES (?, 'published', ?, ?, ?, ?)",
        )
        .bind(item_type)
        .bind(title)
        .bind(&slug)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await?;
        Ok(Item {
            id: ItemId(result.last_insert_rowid()),
            item_type: item_type.to_owned(),
            status: ItemStatus::Published,
            parent: None,
            title: title.to_owned(),
            slug,
            created: now,
            modified: now,
        })
    }

    async fn find_or_create_term(&self, taxonomy: &str, name: &str) -> Result<TermId> {
        let slug = slugify(name);
        let existing: Option<(i64,)> =
            sqlx::query_as("SELECT id FROM terms WHERE taxonomy = ? AND (name = ? OR slug = ?)")
                .bind(taxonomy)
                .bind(name)
                .bind(&slug)
                .fetch_optional(&self.pool)
                .await?;
        if let Some((id,)) = existing {
            return Ok(TermId(id));
        }
        let result =
            sqlx::query("INSERT INTO terms (taxonomy, name, slug, description) VALUES (?, ?, ?, '')")
                .bind(taxonomy)
                .bind(name)
                .bind(&slug)
                .execute(&self.pool)
                .await?;
        Ok(TermId(result.last_insert_rowid()))
    }
}

async fn create_schema(pool: &Pool<Sqlite>) -> Result<()> {
    sqlx::query("PRAGMA foreign_keys = ON").execute(pool).await?;
    sqlx::query(
        "CREATE TABLE IF NOT EXISTS items (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            item_type TEXT NOT NULL,
            status TEXT NOT NULL DEFAULT 'draft',
            parent INTEGER REFERENCES items(id),
            title TEXT NOT NULL DEFAULT '',
            slug TEXT NOT NULL DEFAULT '',
            created DATETIME NOT NULL,
            modified DATETIME NOT NULL
        )",
    )
    .execute(pool)
    .await?;
    sqlx::query(
        "CREATE TABLE IF NOT EXISTS item_meta (
            item_id INTEGER NOT NULL REFERENCES items(id),
            key TEXT NOT NULL,
            value TEXT NOT NULL,
            PRIMARY KEY (item_id, key)
        )",
    )
    .execute(pool)
    .await?;
    sqlx::query(
        "CREATE TABLE IF NOT EXISTS terms (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            taxonomy TEXT NOT NULL,
            name TEXT NOT NULL,
            slug TEXT NOT NULL,
            description TEXT NOT NULL DEFAULT '',
            UNIQUE (taxonomy, slug)
        )",
    )
    .execute(pool)
    .await?;
    sqlx::query(
        "CREATE TABLE IF NOT EXISTS item_terms (
            item_id INTEGER NOT NULL,
            term_id INTEGER NOT NULL REFERENCES terms(id),
            taxonomy TEXT NOT NULL,
            PRIMARY KEY (item_id, term_id)
        )",
    )
    .execute(pool)
    .await?;
    Ok(())
}

#[async_trait]
impl ContentStore for SqliteStore {
    fn hooks(&self) -> &HookRegistry {
        &self.hooks
    }

    async fn fetch_item(&self, id: ItemId) -> Result<Option<Item>> {
        let row: Option<ItemRow> = sqlx::query_as(
            "SELECT id, item_type, status, parent, title, slug, created, modified
             FROM items WHERE id = ?",
        )
        .bind(id.0)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Item::from))
    }

    async fn update_item(&self, update: ItemUpdate, ctx: &SaveContext) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE items
             SET title = COALESCE(?, title), slug = COALESCE(?, slug), modified = ?
             WHERE id = ?",
        )
        .bind(update.title.as_deref())
        .bind(update.slug.as_deref())
        .bind(Utc::now().naive_utc())
        .bind(update.id.0)
        .execute(&self.pool)
        .await?;
        let found = result.rows_affected() > 0;
        if found {
            self.hooks.dispatch(update.id, Arc::new(ctx.clone())).await;
        }
        Ok(found)
    }

    async fn terms_for_taxonomy(&self, taxonomy: &str, query: &TermQuery) -> Result<Vec<Term>> {
        let assigned = "(SELECT COUNT(*) FROM item_terms it WHERE it.term_id = t.id)";
        let mut sql = String::from(
            "SELECT t.id, t.taxonomy, t.name, t.slug, t.description FROM terms t WHERE t.taxonomy = ?",
        );
        if !query.include_empty {
            sql.push_str(&format!(" AND {assigned} > 0"));
        }
        match query.order_by {
            TermOrder::Name => sql.push_str(" ORDER BY t.name"),
            TermOrder::Count => sql.push_str(&format!(" ORDER BY {assigned} DESC, t.name")),
        }
        if let Some(limit) = query.limit {
            sql.push_str(&format!(" LIMIT {limit}"));
        }
        let rows: Vec<TermRow> = sqlx::query_as(&sql)
            .bind(taxonomy)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(Term::from).collect())
    }

    async fn set_item_terms(&self, id: ItemId, taxonomy: &str, names: &[String]) -> Result<()> {
        let mut term_ids = Vec::with_capacity(names.len());
        for name in names {
            let name = name.trim();
            if name.is_empty() {
                continue;
            }
            term_ids.push(self.find_or_create_term(taxonomy, name).await?);
        }
        sqlx::query("DELETE FROM item_terms WHERE item_id = ? AND taxonomy = ?")
            .bind(id.0)
            .bind(taxonomy)
            .execute(&self.pool)
            .await?;
        for term_id in term_ids {
            sqlx::query(
                "INSERT OR IGNORE INTO item_terms (item_id, term_id, taxonomy) VALUES (?, ?, ?)",
            )
            .bind(id.0)
            .bind(term_id.0)
            .bind(taxonomy)
            .execute(&self.pool)
            .await?;
        }
        Ok(())
    }

    async fn item_terms(&self, id: ItemId, taxonomy: &str) -> Result<Vec<Term>> {
        let rows: Vec<TermRow> = sqlx::query_as(
            "SELECT t.id, t.taxonomy, t.name, t.slug, t.description
             FROM terms t JOIN item_terms it ON it.term_id = t.id
             WHERE it.item_id = ? AND it.taxonomy = ?
             ORDER BY t.name",
        )
        .bind(id.0)
        .bind(taxonomy)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Term::from).collect())
    }

    async fn item_meta(&self, id: ItemId, key: &str) -> Result<Option<Value>> {
        let row: Option<(String,)> =
            sqlx::query_as("SELECT value FROM item_meta WHERE item_id = ? AND key = ?")
                .bind(id.0)
                .bind(key)
                .fetch_optional(&self.pool)
                .await?;
        match row {
            Some((raw,)) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    async fn set_item_meta(&self, id: ItemId, key: &str, value: Value) -> Result<()> {
        let raw = serde_json::to_string(&value)?;
        sqlx::query(
            "INSERT INTO item_meta (item_id, key, value) VALUES (?, ?, ?)
             ON CONFLICT (item_id, key) DO UPDATE SET value = excluded.value",
        )
        .bind(id.0)
        .bind(key)
        .bind(raw)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn create_term(
        &self,
        taxonomy: &str,
        name: &str,
        slug: &str,
        description: &str,
    ) -> Result<Term> {
        let existing: Option<TermRow> = sqlx::query_as(
            "SELECT id, taxonomy, name, slug, description FROM terms
             WHERE taxonomy = ? AND slug = ?",
        )
        .bind(taxonomy)
        .bind(slug)
        .fetch_optional(&self.pool)
        .await?;
        if let Some(row) = existing {
            return Ok(row.into());
        }
        let result =
            sqlx::query("INSERT INTO terms (taxonomy, name, slug, description) VALUES (?, ?, ?, ?)")
                .bind(taxonomy)
                .bind(name)
                .bind(slug)
                .bind(description)
                .execute(&self.pool)
                .await?;
        Ok(Term {
            id: TermId(result.last_insert_rowid()),
            taxonomy: taxonomy.to_owned(),
            name: name.to_owned(),
            slug: slug.to_owned(),
            description: description.to_owned(),
        })
    }
}
