use async_trait::async_trait;

mod hooks;
mod item;
mod memory;
mod request;
mod sqlite;
mod term;

pub use hooks::{HookId, HookRegistry, HookSuspension, SaveHook};
pub use item::{Item, ItemId, ItemStatus, ItemUpdate, REVISION_TYPE};
pub use memory::MemoryStore;
pub use request::{FormPayload, FormValue, SaveContext, Session, UserId};
pub use sqlite::SqliteStore;
pub use term::{slugify, Term, TermId, TermOrder, TermQuery};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("metadata encoding error: {0}")]
    Encoding(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, StoreError>;

/// CRUD on typed content items, metadata blobs, taxonomy term assignment,
/// and save-event subscriptions.
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// The save-event subscriptions attached to this store.
    fn hooks(&self) -> &HookRegistry;

    async fn fetch_item(&self, id: ItemId) -> Result<Option<Item>>;

    /// Applies a partial update, then dispatches save hooks with `ctx`.
    /// Returns whether the item existed.
    async fn update_item(&self, update: ItemUpdate, ctx: &SaveContext) -> Result<bool>;

    async fn terms_for_taxonomy(&self, taxonomy: &str, query: &TermQuery) -> Result<Vec<Term>>;

    /// Replaces the item's term set in one taxonomy. Names are matched to
    /// existing terms by name or slug and created otherwise; names that are
    /// empty after trimming are ignored.
    async fn set_item_terms(&self, id: ItemId, taxonomy: &str, names: &[String]) -> Result<()>;

    /// The terms currently assigned to an item in one taxonomy.
    async fn item_terms(&self, id: ItemId, taxonomy: &str) -> Result<Vec<Term>>;

    async fn item_meta(&self, id: ItemId, key: &str) -> Result<Option<serde_json::Value>>;

    /// Stores a metadata blob under `key`, overwriting any previous value.
    async fn set_item_meta(&self, id: ItemId, key: &str, value: serde_json::Value) -> Result<()>;

    /// Creates a term, reusing an existing `(taxonomy, slug)` entry.
    async fn create_term(
        &self,
        taxonomy: &str,
        name: &str,
        slug: &str,
        description: &str,
    ) -> Result<Term>;
}
