//! A dictionary-entry content plugin: a "definition" item type whose
//! word/pronunciation/part-of-speech metadata drives its title, slug, and
//! taxonomy terms. Built on an abstract [`ContentStore`].

use std::sync::Arc;

use content_store::{ContentStore, HookId, SaveContext};
use futures::FutureExt;
use tracing::warn;

pub mod admin;
pub mod meta;
pub mod parts_of_speech;
pub mod repository;
pub mod sanitize;

pub use admin::{field_id, field_name, AdminWorkflow, EditPolicy, SaveOutcome, SkipReason};
pub use meta::{EntryInput, EntryMeta};
pub use repository::{EntryRepository, UpdateError};

/// Prefix for everything the plugin registers: form field groups, meta
/// keys, taxonomy names.
pub const ID_BASE: &str = "definite";
/// The content-item type for dictionary entries.
pub const ENTRY_TYPE: &str = "definite";
/// Meta key the entry metadata blob is stored under.
pub const META_KEY: &str = "definite";
/// Free-form taxonomy holding one term per distinct headword.
pub const WORDS_TAXONOMY: &str = "definite_words";
/// Fixed-vocabulary taxonomy for grammatical categories.
pub const PARTS_TAXONOMY: &str = "definite_partsofspeech";

/// The installed plugin: repository and admin workflow wired to one store.
pub struct Definite<S: ContentStore> {
    pub repository: Arc<EntryRepository<S>>,
    pub admin: Arc<AdminWorkflow<S>>,
    save_hook: HookId,
}

impl<S: ContentStore + 'static> Definite<S> {
    /// Constructs both components and registers the save-event handler.
    /// Everything is built once, here; nothing is resolved through globals.
    pub fn install(store: Arc<S>, policy: Arc<dyn EditPolicy>) -> Self {
        let repository = Arc::new(EntryRepository::new(Arc::clone(&store)));
        let admin = Arc::new(AdminWorkflow::new(
            Arc::clone(&store),
            Arc::clone(&repository),
            policy,
        ));

        let handler = Arc::clone(&admin);
        let save_hook = store.hooks().register(move |id, ctx: Arc<SaveContext>| {
            let handler = Arc::clone(&handler);
            async move {
                if let SaveOutcome::Failed(error) = handler.on_item_saved(id, &ctx).await {
                    warn!(%id, "definition save failed: {error}");
                }
            }
            .boxed()
        });
        repository.bind_save_hook(save_hook);

        Self {
            repository,
            admin,
            save_hook,
        }
    }

    /// The id of the workflow's registered save hook.
    pub fn save_hook(&self) -> HookId {
        self.save_hook
    }
}
