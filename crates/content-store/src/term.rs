/// Taxonomy term identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TermId(pub i64);

/// One term in one taxonomy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Term {
    pub id: TermId,
    pub taxonomy: String,
    pub name: String,
    pub slug: String,
    pub description: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TermOrder {
    Name,
    /// Most-assigned first.
    Count,
}

/// Listing options for [`terms_for_taxonomy`](crate::ContentStore::terms_for_taxonomy).
#[derive(Debug, Clone)]
pub struct TermQuery {
    pub order_by: TermOrder,
    pub limit: Option<u32>,
    /// Whether to list terms with no items assigned.
    pub include_empty: bool,
}

impl Default for TermQuery {
    fn default() -> Self {
        Self {
            order_by: TermOrder::Name,
            limit: None,
            include_empty: false,
        }
    }
}

/// Lowercases a string and reduces it to dash-separated alphanumeric runs,
/// the form used for item and term slugs.
pub fn slugify(input: &str) -> String {
    let mut slug = String::with_capacity(input.len());
    let mut pending_dash = false;
    for ch in input.chars() {
        if ch.is_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            for lower in ch.to_lowercase() {
                slug.push(lower);
            }
        } else {
            pending_dash = true;
        }
    }
    slug
}
