use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::parts_of_speech;
use crate::sanitize::strip_markup;

fn default_part_of_speech() -> String {
    parts_of_speech::DEFAULT_KEY.to_owned()
}

/// Sanitized entry metadata, stored as the entry's meta blob. The
/// serialized field names double as the edit form's field names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryMeta {
    #[serde(default)]
    pub word: String,
    #[serde(default)]
    pub pronunciation: String,
    #[serde(rename = "partofspeech", default = "default_part_of_speech")]
    pub part_of_speech: String,
}

impl Default for EntryMeta {
    fn default() -> Self {
        Self {
            word: String::new(),
            pronunciation: String::new(),
            part_of_speech: default_part_of_speech(),
        }
    }
}

impl EntryMeta {
    /// Sanitizes raw form input into storable metadata: markup is stripped
    /// from the text fields and an unrecognized part of speech falls back
    /// to the default key rather than failing the save.
    pub fn sanitized(input: &EntryInput) -> Self {
        let part_of_speech = if parts_of_speech::is_registered(&input.part_of_speech) {
            input.part_of_speech.clone()
        } else {
            default_part_of_speech()
        };
        Self {
            word: strip_markup(&input.word),
            pronunciation: strip_markup(&input.pronunciation),
            part_of_speech,
        }
    }

    /// Single-field access by form/meta name.
    pub fn field(&self, name: &str) -> Option<&str> {
        match name {
            "word" => Some(&self.word),
            "pronunciation" => Some(&self.pronunciation),
            "partofspeech" => Some(&self.part_of_speech),
            _ => None,
        }
    }
}

/// Raw submitted fields, before sanitization.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntryInput {
    pub word: String,
    pub pronunciation: String,
    pub part_of_speech: String,
}

impl EntryInput {
    /// Reads the expected fields out of a submitted field group; absent
    /// fields come through as empty strings.
    pub fn from_fields(fields: &BTreeMap<String, String>) -> Self {
        let field = |name: &str| fields.get(name).cloned().unwrap_or_default();
        Self {
            word: field("word"),
            pronunciation: field("pronunciation"),
            part_of_speech: field("partofspeech"),
        }
    }
}

impl From<EntryMeta> for EntryInput {
    fn from(meta: EntryMeta) -> Self {
        Self {
            word: meta.word,
            pronunciation: meta.pronunciation,
            part_of_speech: meta.part_of_speech,
        }
    }
}
