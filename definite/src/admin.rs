use std::collections::BTreeMap;
use std::sync::Arc;

use content_store::{
    ContentStore, ItemId, SaveContext, Session, StoreError, TermOrder, TermQuery,
};
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::meta::{EntryInput, EntryMeta};
use crate::parts_of_speech::PARTS_OF_SPEECH;
use crate::repository::{EntryRepository, UpdateError};
use crate::sanitize::{esc_attr, unslash};
use crate::{ID_BASE, PARTS_TAXONOMY};

/// Name of the hidden form field carrying the authenticity token.
pub const NONCE_FIELD: &str = "definite-nonce";
const NONCE_ACTION: &str = "definite-details";

/// Edit-permission seam; the host decides who may edit which item.
/// Implemented for plain closures.
pub trait EditPolicy: Send + Sync {
    fn can_edit(&self, session: &Session, item: ItemId) -> bool;
}

impl<F> EditPolicy for F
where
    F: Fn(&Session, ItemId) -> bool + Send + Sync,
{
    fn can_edit(&self, session: &Session, item: ItemId) -> bool {
        self(session, item)
    }
}

/// What became of one save event.
#[derive(Debug)]
pub enum SaveOutcome {
    /// All guards passed and the metadata update went through.
    Saved,
    /// The event was not an edit-form save of a dictionary entry.
    Skipped(SkipReason),
    /// Token or permission check failed.
    Unauthorized,
    /// The id no longer resolved to an entry when the update ran.
    NotFound,
    /// The store failed mid-update.
    Failed(StoreError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    Autosave,
    Revision,
    ForeignType,
    /// The payload carried no field group for this plugin.
    NoFields,
}

/// `name` attribute for a grouped form field.
pub fn field_name(field: &str) -> String {
    format!("{ID_BASE}[{field}]")
}

/// `id` attribute for a form field.
pub fn field_id(field: &str) -> String {
    format!("{ID_BASE}-{field}")
}

/// Gatekeeps save events before they reach the repository, and renders the
/// pieces of the details metabox that need store data.
pub struct AdminWorkflow<S> {
    store: Arc<S>,
    repository: Arc<EntryRepository<S>>,
    policy: Arc<dyn EditPolicy>,
}

impl<S: ContentStore> AdminWorkflow<S> {
    pub fn new(
        store: Arc<S>,
        repository: Arc<EntryRepository<S>>,
        policy: Arc<dyn EditPolicy>,
    ) -> Self {
        Self {
            store,
            repository,
            policy,
        }
    }

    /// Save-event handler. Most saves in a host are not ours: every guard
    /// rejection is deliberate silence, not an error.
    pub async fn on_item_saved(&self, id: ItemId, ctx: &SaveContext) -> SaveOutcome {
        if ctx.is_autosave {
            return SaveOutcome::Skipped(SkipReason::Autosave);
        }

        match self.store.fetch_item(id).await {
            Ok(Some(item)) if item.is_revision() => {
                return SaveOutcome::Skipped(SkipReason::Revision)
            }
            Ok(Some(_)) => {}
            Ok(None) => return SaveOutcome::Skipped(SkipReason::ForeignType),
            Err(error) => return SaveOutcome::Failed(error),
        }

        let entry = match self.repository.entry(id).await {
            Ok(Some(entry)) => entry,
            Ok(None) => return SaveOutcome::Skipped(SkipReason::ForeignType),
            Err(error) => return SaveOutcome::Failed(error),
        };

        let Some(session) = ctx.session.as_ref() else {
            return SaveOutcome::Unauthorized;
        };
        if !self.verify_nonce(ctx) {
            return SaveOutcome::Unauthorized;
        }
        if !self.policy.can_edit(session, entry.id) {
            return SaveOutcome::Unauthorized;
        }

        let Some(group) = ctx.payload.group(ID_BASE) else {
            return SaveOutcome::Skipped(SkipReason::NoFields);
        };
        let fields: BTreeMap<String, String> = group
            .iter()
            .map(|(name, value)| (name.clone(), unslash(value)))
            .collect();
        let input = EntryInput::from_fields(&fields);
        debug!(%id, "handling definition form save");

        match self.repository.update_meta(entry.id, &input).await {
            Ok(()) => SaveOutcome::Saved,
            Err(UpdateError::NotFound(_)) => SaveOutcome::NotFound,
            Err(UpdateError::Store(error)) => SaveOutcome::Failed(error),
        }
    }

    /// The per-session authenticity token for the details form.
    pub fn nonce(&self, session: &Session) -> String {
        let mut hasher = Sha256::new();
        hasher.update(NONCE_ACTION.as_bytes());
        hasher.update(session.token.as_bytes());
        hasher.update(session.user.0.to_le_bytes());
        let digest = hasher.finalize();
        let mut hex: String = digest.iter().map(|byte| format!("{byte:02x}")).collect();
        hex.truncate(10);
        hex
    }

    /// The hidden nonce input for the details metabox.
    pub fn nonce_field(&self, session: &Session) -> String {
        format!(
            r#"<input type="hidden" id="{NONCE_FIELD}" name="{NONCE_FIELD}" value="{}" />"#,
            self.nonce(session)
        )
    }

    pub fn verify_nonce(&self, ctx: &SaveContext) -> bool {
        let (Some(session), Some(submitted)) =
            (ctx.session.as_ref(), ctx.payload.text(NONCE_FIELD))
        else {
            return false;
        };
        submitted == self.nonce(session)
    }

    /// The part-of-speech terms for form rendering: `(slug, name)` pairs
    /// ordered by name.
    pub async fn parts_of_speech(&self) -> Result<Vec<(String, String)>, StoreError> {
        let query = TermQuery {
            order_by: TermOrder::Name,
            limit: Some(15),
            include_empty: true,
        };
        let terms = self.store.terms_for_taxonomy(PARTS_TAXONOMY, &query).await?;
        Ok(terms
            .into_iter()
            .map(|term| (term.slug, term.name))
            .collect())
    }

    /// Renders the part-of-speech `<select>` for the details metabox.
    pub async fn parts_of_speech_control(
        &self,
        field: &str,
        meta: &EntryMeta,
    ) -> Result<String, StoreError> {
        let parts = self.parts_of_speech().await?;
        let mut control = format!(
            r#"<select id="{}" name="{}">"#,
            field_id(field),
            field_name(field)
        );
        for (slug, name) in parts {
            let selected = if meta.field(field) == Some(slug.as_str()) {
                r#" selected="selected""#
            } else {
                ""
            };
            control.push_str(&format!(
                r#"<option value="{}"{selected}>{}</option>"#,
                esc_attr(&slug),
                esc_attr(&name)
            ));
        }
        control.push_str("</select>");
        Ok(control)
    }

    /// Seeds the nine default vocabulary terms. Safe to run repeatedly:
    /// existing `(taxonomy, slug)` terms are reused.
    pub async fn seed_parts_of_speech(&self) -> Result<(), StoreError> {
        for part in &PARTS_OF_SPEECH {
            self.store
                .create_term(PARTS_TAXONOMY, part.name, part.key, part.description)
                .await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Definite, ENTRY_TYPE, META_KEY};
    use content_store::{FormPayload, Item, MemoryStore};

    fn allow_all() -> Arc<dyn EditPolicy> {
        Arc::new(|_: &Session, _: ItemId| true)
    }

    fn setup() -> (Arc<MemoryStore>, Definite<MemoryStore>, Item, Session) {
        let store = Arc::new(MemoryStore::new());
        let plugin = Definite::install(Arc::clone(&store), allow_all());
        let entry = store.create_item(ENTRY_TYPE, "");
        let session = Session::new(7, "session-token");
        (store, plugin, entry, session)
    }

    fn form_payload(nonce: &str) -> FormPayload {
        FormPayload::new()
            .with_text(NONCE_FIELD, nonce)
            .with_field(ID_BASE, "word", "Run")
            .with_field(ID_BASE, "pronunciation", "roon")
            .with_field(ID_BASE, "partofspeech", "verb")
    }

    #[tokio::test]
    async fn autosaves_never_reach_the_repository() -> anyhow::Result<()> {
        let (store, plugin, entry, session) = setup();
        let nonce = plugin.admin.nonce(&session);
        let mut ctx = SaveContext::form(session, form_payload(&nonce));
        ctx.is_autosave = true;

        let outcome = plugin.admin.on_item_saved(entry.id, &ctx).await;
        assert!(matches!(outcome, SaveOutcome::Skipped(SkipReason::Autosave)));
        assert!(store.item_meta(entry.id, META_KEY).await?.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn revision_saves_are_skipped() {
        let (store, plugin, entry, session) = setup();
        let revision = store.create_revision(entry.id);
        let nonce = plugin.admin.nonce(&session);
        let ctx = SaveContext::form(session, form_payload(&nonce));

        let outcome = plugin.admin.on_item_saved(revision.id, &ctx).await;
        assert!(matches!(outcome, SaveOutcome::Skipped(SkipReason::Revision)));
    }

    #[tokio::test]
    async fn foreign_items_are_skipped() {
        let (store, plugin, _, session) = setup();
        let page = store.create_item("page", "About");
        let nonce = plugin.admin.nonce(&session);
        let ctx = SaveContext::form(session, form_payload(&nonce));

        let outcome = plugin.admin.on_item_saved(page.id, &ctx).await;
        assert!(matches!(
            outcome,
            SaveOutcome::Skipped(SkipReason::ForeignType)
        ));
    }

    #[tokio::test]
    async fn a_missing_nonce_is_unauthorized() -> anyhow::Result<()> {
        let (store, plugin, entry, session) = setup();
        let payload = FormPayload::new().with_field(ID_BASE, "word", "Run");
        let ctx = SaveContext::form(session, payload);

        let outcome = plugin.admin.on_item_saved(entry.id, &ctx).await;
        assert!(matches!(outcome, SaveOutcome::Unauthorized));
        assert!(store.item_meta(entry.id, META_KEY).await?.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn a_foreign_sessions_nonce_is_unauthorized() {
        let (_, plugin, entry, session) = setup();
        let foreign = Session::new(8, "other-token");
        let stolen_nonce = plugin.admin.nonce(&foreign);
        let ctx = SaveContext::form(session, form_payload(&stolen_nonce));

        let outcome = plugin.admin.on_item_saved(entry.id, &ctx).await;
        assert!(matches!(outcome, SaveOutcome::Unauthorized));
    }

    #[tokio::test]
    async fn the_edit_policy_can_deny_the_save() {
        let store = Arc::new(MemoryStore::new());
        let plugin = Definite::install(
            Arc::clone(&store),
            Arc::new(|_: &Session, _: ItemId| false),
        );
        let entry = store.create_item(ENTRY_TYPE, "");
        let session = Session::new(7, "session-token");
        let nonce = plugin.admin.nonce(&session);
        let ctx = SaveContext::form(session, form_payload(&nonce));

        let outcome = plugin.admin.on_item_saved(entry.id, &ctx).await;
        assert!(matches!(outcome, SaveOutcome::Unauthorized));
    }

    #[tokio::test]
    async fn a_payload_without_our_group_is_skipped() {
        let (_, plugin, entry, session) = setup();
        let nonce = plugin.admin.nonce(&session);
        let payload = FormPayload::new().with_text(NONCE_FIELD, &nonce);
        let ctx = SaveContext::form(session, payload);

        let outcome = plugin.admin.on_item_saved(entry.id, &ctx).await;
        assert!(matches!(outcome, SaveOutcome::Skipped(SkipReason::NoFields)));
    }

    #[tokio::test]
    async fn a_valid_submission_saves_metadata() -> anyhow::Result<()> {
        let (store, plugin, entry, session) = setup();
        let nonce = plugin.admin.nonce(&session);
        let ctx = SaveContext::form(session, form_payload(&nonce));

        let outcome = plugin.admin.on_item_saved(entry.id, &ctx).await;
        assert!(matches!(outcome, SaveOutcome::Saved));

        let meta = plugin.repository.meta(entry.id).await?;
        assert_eq!(meta.word, "Run");
        assert_eq!(meta.part_of_speech, "verb");

        let item = store.fetch_item(entry.id).await?.unwrap();
        assert_eq!(item.title, "Run");
        assert_eq!(item.slug, "run-verb");
        Ok(())
    }

    #[tokio::test]
    async fn transport_escaping_is_reversed_before_storing() -> anyhow::Result<()> {
        let (_, plugin, entry, session) = setup();
        let nonce = plugin.admin.nonce(&session);
        let payload = FormPayload::new()
            .with_text(NONCE_FIELD, &nonce)
            .with_field(ID_BASE, "word", r"O\'Brien")
            .with_field(ID_BASE, "partofspeech", "noun");
        let ctx = SaveContext::form(session, payload);

        plugin.admin.on_item_saved(entry.id, &ctx).await;
        assert_eq!(plugin.repository.meta(entry.id).await?.word, "O'Brien");
        Ok(())
    }

    #[tokio::test]
    async fn nonces_verify_for_their_own_session_only() {
        let (_, plugin, _, session) = setup();
        let nonce = plugin.admin.nonce(&session);
        assert_eq!(nonce.len(), 10);

        let field = plugin.admin.nonce_field(&session);
        assert!(field.contains(&nonce));
        assert!(field.contains(NONCE_FIELD));

        let good = SaveContext::form(
            session.clone(),
            FormPayload::new().with_text(NONCE_FIELD, &nonce),
        );
        assert!(plugin.admin.verify_nonce(&good));

        let other = Session::new(7, "different-token");
        let bad = SaveContext::form(
            other,
            FormPayload::new().with_text(NONCE_FIELD, &nonce),
        );
        assert!(!plugin.admin.verify_nonce(&bad));
    }

    #[tokio::test]
    async fn seeding_fills_the_vocabulary_taxonomy() -> anyhow::Result<()> {
        let (_, plugin, _, _) = setup();
        plugin.admin.seed_parts_of_speech().await?;
        // run twice: seeding is idempotent
        plugin.admin.seed_parts_of_speech().await?;

        let parts = plugin.admin.parts_of_speech().await?;
        assert_eq!(parts.len(), 9);
        let names: Vec<&str> = parts.iter().map(|(_, name)| name.as_str()).collect();
        assert_eq!(
            names,
            [
                "Adjective",
                "Adverb",
                "Article",
                "Conjunction",
                "Interjection",
                "Noun",
                "Preposition",
                "Pronoun",
                "Verb"
            ]
        );
        Ok(())
    }

    #[tokio::test]
    async fn the_select_control_marks_the_stored_value() -> anyhow::Result<()> {
        let (_, plugin, _, _) = setup();
        plugin.admin.seed_parts_of_speech().await?;

        let meta = EntryMeta {
            word: "Run".to_owned(),
            pronunciation: String::new(),
            part_of_speech: "verb".to_owned(),
        };
        let control = plugin
            .admin
            .parts_of_speech_control("partofspeech", &meta)
            .await?;

        assert!(control.starts_with(r#"<select id="definite-partofspeech" name="definite[partofspeech]">"#));
        assert!(control.contains(r#"<option value="verb" selected="selected">Verb</option>"#));
        assert!(control.contains(r#"<option value="noun">Noun</option>"#));
        assert!(control.ends_with("</select>"));
        Ok(())
    }

    #[test]
    fn form_field_naming_matches_the_group_layout() {
        assert_eq!(field_name("word"), "definite[word]");
        assert_eq!(field_id("word"), "definite-word");
    }
}
