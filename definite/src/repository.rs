use std::sync::{Arc, OnceLock};

use content_store::{
    slugify, ContentStore, HookId, Item, ItemId, ItemStatus, ItemUpdate, SaveContext, StoreError,
};
use thiserror::Error;
use tracing::debug;

use crate::meta::{EntryInput, EntryMeta};
use crate::{ENTRY_TYPE, META_KEY, PARTS_TAXONOMY, WORDS_TAXONOMY};

#[derive(Debug, Error)]
pub enum UpdateError {
    /// The id does not resolve to a usable dictionary entry.
    #[error("no dictionary entry with id {0}")]
    NotFound(ItemId),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Owns the mapping between an entry and its structured metadata, and the
/// taxonomy term assignments derived from it.
pub struct EntryRepository<S> {
    store: Arc<S>,
    save_hook: OnceLock<HookId>,
}

impl<S: ContentStore> EntryRepository<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self {
            store,
            save_hook: OnceLock::new(),
        }
    }

    /// Records the workflow's save-hook id so metadata updates can mute it
    /// while rewriting the entry title. Set once at install time; later
    /// calls are ignored.
    pub fn bind_save_hook(&self, id: HookId) {
        let _ = self.save_hook.set(id);
    }

    pub fn save_hook(&self) -> Option<HookId> {
        self.save_hook.get().copied()
    }

    /// Resolves `id` to a usable entry: revision snapshots resolve to their
    /// parent, and anything trashed or of another type is not an entry.
    pub async fn entry(&self, id: ItemId) -> Result<Option<Item>, StoreError> {
        let Some(mut item) = self.store.fetch_item(id).await? else {
            return Ok(None);
        };
        if let Some(parent) = item.revision_parent() {
            item = match self.store.fetch_item(parent).await? {
                Some(parent) => parent,
                None => return Ok(None),
            };
        }
        if item.item_type != ENTRY_TYPE || item.status == ItemStatus::Trashed {
            return Ok(None);
        }
        Ok(Some(item))
    }

    /// The stored metadata blob, or the defaults when none is stored yet.
    pub async fn meta(&self, id: ItemId) -> Result<EntryMeta, StoreError> {
        match self.store.item_meta(id, META_KEY).await? {
            Some(value) => Ok(serde_json::from_value(value)?),
            None => Ok(EntryMeta::default()),
        }
    }

    /// One metadata field by its form name; `None` when nothing is stored
    /// yet or the name is unknown.
    pub async fn meta_field(&self, id: ItemId, field: &str) -> Result<Option<String>, StoreError> {
        let Some(value) = self.store.item_meta(id, META_KEY).await? else {
            return Ok(None);
        };
        let meta: EntryMeta = serde_json::from_value(value)?;
        Ok(meta.field(field).map(str::to_owned))
    }

    /// Applies one metadata update: sanitize the input, reconcile both
    /// taxonomy term sets, store the blob, and rewrite the entry's title
    /// and slug to match.
    pub async fn update_meta(&self, id: ItemId, input: &EntryInput) -> Result<(), UpdateError> {
        let Some(entry) = self.entry(id).await? else {
            return Err(UpdateError::NotFound(id));
        };
        let id = entry.id;

        let meta = EntryMeta::sanitized(input);
        debug!(%id, word = %meta.word, part_of_speech = %meta.part_of_speech, "updating entry metadata");

        self.store
            .set_item_terms(id, WORDS_TAXONOMY, &[meta.word.clone()])
            .await?;
        self.store
            .set_item_terms(id, PARTS_TAXONOMY, &[meta.part_of_speech.clone()])
            .await?;

        let blob = serde_json::to_value(&meta).map_err(StoreError::from)?;
        self.store.set_item_meta(id, META_KEY, blob).await?;

        let update = ItemUpdate::new(id)
            .title(meta.word.clone())
            .slug(slugify(&format!("{}-{}", meta.word, meta.part_of_speech)));

        // the title write below fires the very save hook that calls into
        // this method; the guard mutes it and re-registers on every exit
        let _muted = self
            .save_hook
            .get()
            .map(|hook| self.store.hooks().suspend(*hook));
        self.store
            .update_item(update, &SaveContext::internal())
            .await?;

        Ok(())
    }
}
