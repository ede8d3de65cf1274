use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;

use crate::{
    slugify, ContentStore, HookRegistry, Item, ItemId, ItemStatus, ItemUpdate, Result,
    SaveContext, Term, TermId, TermOrder, TermQuery, REVISION_TYPE,
};

#[derive(Default)]
struct Tables {
    items: BTreeMap<ItemId, Item>,
    meta: BTreeMap<(ItemId, String), Value>,
    terms: BTreeMap<TermId, Term>,
    assignments: BTreeMap<(ItemId, String), Vec<TermId>>,
    next_item: i64,
    next_term: i64,
}

impl Tables {
    fn find_or_create_term(&mut self, taxonomy: &str, name: &str) -> TermId {
        let slug = slugify(name);
        let existing = self
            .terms
            .values()
            .find(|term| term.taxonomy == taxonomy && (term.name == name || term.slug == slug));
        if let Some(term) = existing {
            return term.id;
        }
        self.next_term += 1;
        let id = TermId(self.next_term);
        self.terms.insert(
            id,
            Term {
                id,
                taxonomy: taxonomy.to_owned(),
                name: name.to_owned(),
                slug,
                description: String::new(),
            },
        );
        id
    }

    fn assignment_count(&self, term: TermId) -> usize {
        self.assignments
            .values()
            .filter(|ids| ids.contains(&term))
            .count()
    }
}

/// In-memory content store. Backs the test suites and small hosts; clones
/// share the same underlying storage.
#[derive(Clone, Default)]
pub struct MemoryStore {
    tables: Arc<Mutex<Tables>>,
    hooks: HookRegistry,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a published item of the given type.
    pub fn create_item(&self, item_type: &str, title: &str) -> Item {
        let mut tables = self.tables.lock().unwrap();
        tables.next_item += 1;
        let now = Utc::now().naive_utc();
        let item = Item {
            id: ItemId(tables.next_item),
            item_type: item_type.to_owned(),
            status: ItemStatus::Published,
            parent: None,
            title: title.to_owned(),
            slug: slugify(title),
            created: now,
            modified: now,
        };
        tables.items.insert(item.id, item.clone());
        item
    }

    /// Creates a revision snapshot pointing at `parent`.
    pub fn create_revision(&self, parent: ItemId) -> Item {
        let mut tables = self.tables.lock().unwrap();
        let title = tables
            .items
            .get(&parent)
            .map(|item| item.title.clone())
            .unwrap_or_default();
        tables.next_item += 1;
        let now = Utc::now().naive_utc();
        let item = Item {
            id: ItemId(tables.next_item),
            item_type: REVISION_TYPE.to_owned(),
            status: ItemStatus::Draft,
            parent: Some(parent),
            title,
            slug: String::new(),
            created: now,
            modified: now,
        };
        tables.items.insert(item.id, item.clone());
        item
    }

    pub fn set_status(&self, id: ItemId, status: ItemStatus) {
        if let Some(item) = self.tables.lock().unwrap().items.get_mut(&id) {
            item.status = status;
        }
    }
}

#[async_trait]
impl ContentStore for MemoryStore {
    fn hooks(&self) -> &HookRegistry {
        &self.hooks
    }

    async fn fetch_item(&self, id: ItemId) -> Result<Option<Item>> {
        Ok(self.tables.lock().unwrap().items.get(&id).cloned())
    }

    async fn update_item(&self, update: ItemUpdate, ctx: &SaveContext) -> Result<bool> {
        let found = {
            let mut tables = self.tables.lock().unwrap();
            match tables.items.get_mut(&update.id) {
                Some(item) => {
                    if let Some(title) = update.title {
                        item.title = title;
                    }
                    if let Some(slug) = update.slug {
                        item.slug = slug;
                    }
                    item.modified = Utc::now().naive_utc();
                    true
                }
                None => false,
            }
        };
        if found {
            self.hooks.dispatch(update.id, Arc::new(ctx.clone())).await;
        }
        Ok(found)
    }

    async fn terms_for_taxonomy(&self, taxonomy: &str, query: &TermQuery) -> Result<Vec<Term>> {
        let tables = self.tables.lock().unwrap();
        let mut terms: Vec<Term> = tables
            .terms
            .values()
            .filter(|term| term.taxonomy == taxonomy)
            .filter(|term| query.include_empty || tables.assignment_count(term.id) > 0)
            .cloned()
            .collect();
        match query.order_by {
            TermOrder::Name => terms.sort_by(|a, b| a.name.cmp(&b.name)),
            TermOrder::Count => terms.sort_by(|a, b| {
                tables
                    .assignment_count(b.id)
                    .cmp(&tables.assignment_count(a.id))
                    .then_with(|| a.name.cmp(&b.name))
            }),
        }
        if let Some(limit) = query.limit {
            terms.truncate(limit as usize);
        }
        Ok(terms)
    }

    async fn set_item_terms(&self, id: ItemId, taxonomy: &str, names: &[String]) -> Result<()> {
        let mut tables = self.tables.lock().unwrap();
        let mut ids = Vec::with_capacity(names.len());
        for name in names {
            let name = name.trim();
            if name.is_empty() {
                continue;
            }
            ids.push(tables.find_or_create_term(taxonomy, name));
        }
        tables.assignments.insert((id, taxonomy.to_owned()), ids);
        Ok(())
    }

    async fn item_terms(&self, id: ItemId, taxonomy: &str) -> Result<Vec<Term>> {
        let tables = self.tables.lock().unwrap();
        let ids = tables
            .assignments
            .get(&(id, taxonomy.to_owned()))
            .cloned()
            .unwrap_or_default();
        Ok(ids
            .into_iter()
            .filter_map(|term_id| tables.terms.get(&term_id).cloned())
            .collect())
    }

    async fn item_meta(&self, id: ItemId, key: &str) -> Result<Option<Value>> {
        Ok(self
            .tables
            .lock()
            .unwrap()
            .meta
            .get(&(id, key.to_owned()))
            .cloned())
    }

    async fn set_item_meta(&self, id: ItemId, key: &str, value: Value) -> Result<()> {
        self.tables
            .lock()
            .unwrap()
            .meta
            .insert((id, key.to_owned()), value);
        Ok(())
    }

    async fn create_term(
        &self,
        taxonomy: &str,
        name: &str,
        slug: &str,
        description: &str,
    ) -> Result<Term> {
        let mut tables = self.tables.lock().unwrap();
        let existing = tables
            .terms
            .values()
            .find(|term| term.taxonomy == taxonomy && term.slug == slug)
            .cloned();
        if let Some(term) = existing {
            return Ok(term);
        }
        tables.next_term += 1;
        let term = Term {
            id: TermId(tables.next_term),
            taxonomy: taxonomy.to_owned(),
            name: name.to_owned(),
            slug: slug.to_owned(),
            description: description.to_owned(),
        };
        tables.terms.insert(term.id, term.clone());
        Ok(term)
    }
}
