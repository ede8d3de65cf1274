use std::fmt;

use chrono::NaiveDateTime;

/// Store-assigned content item identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ItemId(pub i64);

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Item type tag used for revision snapshots of other items.
pub const REVISION_TYPE: &str = "revision";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemStatus {
    Draft,
    Published,
    Trashed,
}

impl ItemStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemStatus::Draft => "draft",
            ItemStatus::Published => "published",
            ItemStatus::Trashed => "trashed",
        }
    }

    /// Parses a stored status tag; unknown tags read as drafts.
    pub fn parse(tag: &str) -> Self {
        match tag {
            "published" => ItemStatus::Published,
            "trashed" => ItemStatus::Trashed,
            _ => ItemStatus::Draft,
        }
    }
}

/// A typed content item.
#[derive(Debug, Clone)]
pub struct Item {
    pub id: ItemId,
    pub item_type: String,
    pub status: ItemStatus,
    /// Set on revision snapshots; points at the canonical item.
    pub parent: Option<ItemId>,
    pub title: String,
    pub slug: String,
    pub created: NaiveDateTime,
    pub modified: NaiveDateTime,
}

impl Item {
    pub fn is_revision(&self) -> bool {
        self.item_type == REVISION_TYPE
    }

    /// The canonical item a revision snapshot belongs to.
    pub fn revision_parent(&self) -> Option<ItemId> {
        if self.is_revision() {
            self.parent
        } else {
            None
        }
    }
}

/// Partial item update; `None` fields are left untouched.
#[derive(Debug, Clone)]
pub struct ItemUpdate {
    pub id: ItemId,
    pub title: Option<String>,
    pub slug: Option<String>,
}

impl ItemUpdate {
    pub fn new(id: ItemId) -> Self {
        Self {
            id,
            title: None,
            slug: None,
        }
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn slug(mut self, slug: impl Into<String>) -> Self {
        self.slug = Some(slug.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn item(item_type: &str, parent: Option<ItemId>) -> Item {
        let stamp = NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        Item {
            id: ItemId(1),
            item_type: item_type.to_owned(),
            status: ItemStatus::Published,
            parent,
            title: String::new(),
            slug: String::new(),
            created: stamp,
            modified: stamp,
        }
    }

    #[test]
    fn revision_parent_only_applies_to_revisions() {
        assert_eq!(
            item(REVISION_TYPE, Some(ItemId(7))).revision_parent(),
            Some(ItemId(7))
        );
        assert_eq!(item(REVISION_TYPE, None).revision_parent(), None);
        // a canonical item's parent is not a revision pointer
        assert_eq!(item("page", Some(ItemId(7))).revision_parent(), None);
    }

    #[test]
    fn status_tags_round_trip() {
        for status in [ItemStatus::Draft, ItemStatus::Published, ItemStatus::Trashed] {
            assert_eq!(ItemStatus::parse(status.as_str()), status);
        }
        assert_eq!(ItemStatus::parse("inherit"), ItemStatus::Draft);
    }
}
