use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UserId(pub i64);

/// The caller's identity for a save request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub user: UserId,
    /// Opaque per-login token; authenticity tokens are derived from it.
    pub token: String,
}

impl Session {
    pub fn new(user: i64, token: impl Into<String>) -> Self {
        Self {
            user: UserId(user),
            token: token.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormValue {
    Text(String),
    Group(BTreeMap<String, String>),
}

/// A typed form POST body: top-level text fields plus named field groups.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormPayload {
    values: BTreeMap<String, FormValue>,
}

impl FormPayload {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_text(mut self, name: &str, value: &str) -> Self {
        self.values
            .insert(name.to_owned(), FormValue::Text(value.to_owned()));
        self
    }

    pub fn with_field(mut self, group: &str, field: &str, value: &str) -> Self {
        let entry = self
            .values
            .entry(group.to_owned())
            .or_insert_with(|| FormValue::Group(BTreeMap::new()));
        if let FormValue::Group(fields) = entry {
            fields.insert(field.to_owned(), value.to_owned());
        }
        self
    }

    pub fn text(&self, name: &str) -> Option<&str> {
        match self.values.get(name) {
            Some(FormValue::Text(value)) => Some(value),
            _ => None,
        }
    }

    pub fn group(&self, name: &str) -> Option<&BTreeMap<String, String>> {
        match self.values.get(name) {
            Some(FormValue::Group(fields)) => Some(fields),
            _ => None,
        }
    }
}

/// Request-scoped context accompanying a save event.
#[derive(Debug, Clone, Default)]
pub struct SaveContext {
    /// Set when the save is an autosave snapshot rather than a submission.
    pub is_autosave: bool,
    pub session: Option<Session>,
    pub payload: FormPayload,
}

impl SaveContext {
    /// A programmatic save with no form data attached.
    pub fn internal() -> Self {
        Self::default()
    }

    /// A save triggered by an authenticated form submission.
    pub fn form(session: Session, payload: FormPayload) -> Self {
        Self {
            is_autosave: false,
            session: Some(session),
            payload,
        }
    }
}
